use anyhow::Result;
use log::{error, info, Level};
use streampulse_bridge_lib::config::BridgeConfig;
use streampulse_bridge_lib::core::{BluestTransport, BridgeManager};
use streampulse_bridge_lib::logging;
use streampulse_bridge_lib::publisher::{MqttPublisher, TopicPublisher};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(Level::Debug);

    let config = BridgeConfig::load().await?;

    let mqtt = config
        .mqtt
        .is_enabled()
        .then(|| MqttPublisher::new(&config.mqtt));
    let publisher = TopicPublisher::new(config.mqtt.topic_prefix.clone(), mqtt);

    let transport = BluestTransport::new(config.device.connect_timeout()).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    let manager = BridgeManager::new(transport, publisher, &config.device);
    let code = manager.run(shutdown).await;
    info!("Bridge stopped");
    std::process::exit(code);
}

/// Cancels `shutdown` on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!("Failed to listen for Ctrl-C: {}", e);
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
        }
    }
    #[cfg(not(unix))]
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}
