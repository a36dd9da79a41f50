//! Service traits.

use herald_core::{
    BroadcastRecord, BroadcastSummary, NotificationPayload, Registration, TargetFilter,
};

/// Device registration.
#[trait_variant::make(Send)]
pub trait Registrar: Send + Sync {
    /// Register or refresh a device token.
    async fn register(&self, registration: &Registration) -> color_eyre::eyre::Result<()>;

    /// Deactivate a token owned by `user_id`.
    async fn unregister(&self, token: &str, user_id: &str) -> color_eyre::eyre::Result<()>;
}

/// A broadcast requested by an operator.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub payload: NotificationPayload,
    pub filter: TargetFilter,
    /// Operator identity recorded in the broadcast log.
    pub sent_by: Option<String>,
}

/// Broadcast entry point.
#[trait_variant::make(Send)]
pub trait Broadcaster: Send + Sync {
    /// Send a broadcast and record it in the log.
    async fn send_broadcast(
        &self,
        request: &BroadcastRequest,
    ) -> color_eyre::eyre::Result<BroadcastSummary>;

    /// Newest broadcast log entries.
    async fn recent_broadcasts(
        &self,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<BroadcastRecord>>;
}
