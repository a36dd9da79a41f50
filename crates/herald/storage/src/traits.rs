//! Storage traits.

use herald_core::{
    BroadcastRecord, BroadcastSummary, DeviceToken, NotificationPayload, Platform, Registration,
    TargetFilter,
};

/// Device token registry operations.
///
/// Mutation is upsert or deactivate only; rows are never deleted.
pub trait TokenRegistry: Send + Sync {
    /// Insert a token, or refresh and reactivate an existing one.
    fn upsert(
        &self,
        registration: &Registration,
        seen_at: chrono::DateTime<chrono::Utc>,
    ) -> color_eyre::eyre::Result<()>;

    /// Mark a token inactive. Unknown or inactive tokens are a no-op.
    fn deactivate(&self, token: &str) -> color_eyre::eyre::Result<()>;

    /// Mark a token inactive only if it belongs to `user_id`.
    fn deactivate_for_user(&self, token: &str, user_id: &str) -> color_eyre::eyre::Result<()>;

    /// Active tokens, most recently seen first.
    fn list_active(&self, filter: &TargetFilter) -> color_eyre::eyre::Result<Vec<String>>;

    /// Look up a single token.
    fn get_token(&self, token: &str) -> color_eyre::eyre::Result<Option<DeviceToken>>;
}

/// A broadcast about to be written to the log.
#[derive(Debug, Clone, Copy)]
pub struct BroadcastEntry<'a> {
    pub payload: &'a NotificationPayload,
    pub platform: Option<Platform>,
    pub summary: BroadcastSummary,
    pub sent_by: Option<&'a str>,
}

/// Broadcast log storage.
pub trait BroadcastLogStore: Send + Sync {
    /// Append a broadcast to the log.
    fn record_broadcast(&self, entry: &BroadcastEntry<'_>) -> color_eyre::eyre::Result<()>;

    /// Newest log entries first.
    fn recent_broadcasts(&self, limit: usize) -> color_eyre::eyre::Result<Vec<BroadcastRecord>>;
}

/// Combined storage trait.
pub trait AllStorage: TokenRegistry + BroadcastLogStore {}

impl<T> AllStorage for T where T: TokenRegistry + BroadcastLogStore {}
