//! Notification subscription and dispatch
//! This module enables notifications on characteristics and routes incoming
//! payloads to the transform and callback bound to their handle.

use std::collections::HashMap;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::core::bluetooth::constants::ENABLE_NOTIFICATION_VALUE;
use crate::core::bluetooth::peripheral::PeripheralLink;
use crate::core::bluetooth::types::CharacteristicHandle;
use crate::error::LinkError;

/// Maps a raw payload to a scalar. `None` means the payload was too short.
pub type Transform = Box<dyn FnMut(&[u8]) -> Option<u8> + Send>;

/// Receives transformed values
pub type Callback = Box<dyn FnMut(u8) + Send>;

/// What to subscribe to and where its values go
pub struct Subscription {
    pub service: Uuid,
    pub characteristic: Uuid,
    pub transform: Transform,
    pub callback: Callback,
    /// Read the current value once right after enabling notifications
    pub initial_read: bool,
}

impl Subscription {
    pub fn new(
        service: Uuid,
        characteristic: Uuid,
        transform: Transform,
        callback: Callback,
        initial_read: bool,
    ) -> Self {
        Self {
            service,
            characteristic,
            transform,
            callback,
            initial_read,
        }
    }
}

struct Binding {
    characteristic: Uuid,
    transform: Transform,
    callback: Callback,
}

/// Dispatch table keyed by characteristic handle.
///
/// All notifications of a link arrive through one channel, so every payload is
/// routed strictly by its handle; unknown handles are dropped.
#[derive(Default)]
pub struct SubscriptionTable {
    bindings: HashMap<CharacteristicHandle, Binding>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Register a binding for `handle`, replacing any previous one.
    ///
    /// Returns true if a binding was replaced.
    pub fn register(
        &mut self,
        handle: CharacteristicHandle,
        characteristic: Uuid,
        transform: Transform,
        callback: Callback,
    ) -> bool {
        let previous = self.bindings.insert(
            handle,
            Binding {
                characteristic,
                transform,
                callback,
            },
        );
        if previous.is_some() {
            warn!("Replacing existing subscription on handle {}", handle);
        }
        previous.is_some()
    }

    /// Route a payload to the binding of `handle`.
    ///
    /// Returns false if no binding matches the handle.
    pub fn dispatch(&mut self, handle: CharacteristicHandle, data: &[u8]) -> bool {
        let Some(binding) = self.bindings.get_mut(&handle) else {
            debug!("Ignoring notification on unbound handle {}: {:02x?}", handle, data);
            return false;
        };

        match (binding.transform)(data) {
            Some(value) => (binding.callback)(value),
            None => warn!(
                "Malformed payload for {} on handle {}: {:02x?}",
                binding.characteristic, handle, data
            ),
        }
        true
    }

    /// Enable notifications for `subscription` on `link` and register its binding.
    ///
    /// With `initial_read` set, the current value is read and dispatched before
    /// returning, so the callback fires without waiting for the next notification.
    pub async fn bind<L>(&mut self, link: &mut L, subscription: Subscription) -> Result<(), LinkError>
    where
        L: PeripheralLink + ?Sized,
    {
        let Subscription {
            service,
            characteristic,
            transform,
            callback,
            initial_read,
        } = subscription;

        let resolved = link.characteristic(service, characteristic).await?;
        let descriptor = link.config_descriptor(&resolved).await?;

        self.register(resolved.handle, characteristic, transform, callback);

        info!("Enabling notifications for {} on handle {}", characteristic, resolved.handle);
        link.write_descriptor(descriptor, &ENABLE_NOTIFICATION_VALUE).await?;

        if initial_read {
            let value = link.read(&resolved).await?;
            debug!("Initial value of {}: {:02x?}", characteristic, value);
            self.dispatch(resolved.handle, &value);
        }

        Ok(())
    }
}
