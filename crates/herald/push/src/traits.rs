//! Push transport trait.

use herald_core::{NotificationPayload, Priority};

use crate::TransportError;

/// Delivers a payload to a single device token.
#[trait_variant::make(Send)]
pub trait Transport: Send + Sync {
    /// Send one message. Returns the provider's message identifier.
    async fn deliver(
        &self,
        token: &str,
        payload: &NotificationPayload,
        priority: Priority,
        access_token: &str,
    ) -> Result<String, TransportError>;
}
