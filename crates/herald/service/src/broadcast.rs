//! Broadcast orchestration.

use std::time::Duration;

use color_eyre::eyre::WrapErr as _;
use herald_auth::CredentialProvider;
use herald_core::{
    BroadcastRecord, BroadcastSummary, DispatchReport, NotificationPayload, Priority,
    TargetFilter, token_prefix,
};
use herald_push::{DispatchOptions, Dispatcher, Transport};
use herald_storage::{AllStorage, BroadcastEntry, BroadcastLogStore, TokenRegistry};
use tracing::Instrument as _;

use crate::{BroadcastRequest, Broadcaster};

/// Orchestrator policy.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Deactivate tokens the provider reports as permanently invalid.
    pub deactivate_invalid: bool,
    pub priority: Priority,
    /// Time budget for one broadcast, enforced between chunks.
    pub time_budget: Option<Duration>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            deactivate_invalid: true,
            priority: Priority::High,
            time_budget: None,
        }
    }
}

/// Resolves targets, dispatches, and reduces the result to a summary.
pub struct BroadcastService<S, C, T> {
    store: S,
    dispatcher: Dispatcher<C, T>,
    config: BroadcastConfig,
}

impl<S: Clone, C, T> Clone for BroadcastService<S, C, T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S, C, T> BroadcastService<S, C, T>
where
    S: TokenRegistry,
    C: CredentialProvider,
    T: Transport + 'static,
{
    pub fn new(store: S, dispatcher: Dispatcher<C, T>, config: BroadcastConfig) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// Broadcast to every active token matching `filter`.
    ///
    /// Fails only if the registry cannot be read; delivery failures are
    /// reported per token.
    pub async fn broadcast(
        &self,
        payload: &NotificationPayload,
        filter: &TargetFilter,
    ) -> color_eyre::eyre::Result<DispatchReport> {
        let span = tracing::info_span!("broadcast", id = %uuid::Uuid::new_v4());
        self.run(payload, filter).instrument(span).await
    }

    async fn run(
        &self,
        payload: &NotificationPayload,
        filter: &TargetFilter,
    ) -> color_eyre::eyre::Result<DispatchReport> {
        let tokens = self
            .store
            .list_active(filter)
            .wrap_err("failed to list active device tokens")?;

        tracing::info!(
            platform = ?filter.platform,
            limit = ?filter.limit,
            candidates = tokens.len(),
            "starting broadcast"
        );

        if tokens.is_empty() {
            return Ok(DispatchReport::default());
        }

        let options = DispatchOptions {
            priority: self.config.priority,
            deadline: self
                .config
                .time_budget
                .map(|budget| tokio::time::Instant::now() + budget),
        };

        let report = self.dispatcher.send(&tokens, payload, options).await;

        if self.config.deactivate_invalid {
            self.deactivate_invalid(&report);
        }

        Ok(report)
    }

    fn deactivate_invalid(&self, report: &DispatchReport) {
        for token in report.permanent_failures() {
            match self.store.deactivate(token) {
                Ok(()) => tracing::info!(token = %token_prefix(token), "deactivated invalid token"),
                Err(e) => tracing::warn!(
                    token = %token_prefix(token),
                    error = %e,
                    "failed to deactivate invalid token"
                ),
            }
        }
    }
}

impl<S, C, T> BroadcastService<S, C, T>
where
    S: AllStorage,
    C: CredentialProvider,
    T: Transport + 'static,
{
    async fn broadcast_and_log(
        &self,
        request: &BroadcastRequest,
    ) -> color_eyre::eyre::Result<BroadcastSummary> {
        let report = self.broadcast(&request.payload, &request.filter).await?;

        let entry = BroadcastEntry {
            payload: &request.payload,
            platform: request.filter.platform,
            summary: report.summary,
            sent_by: request.sent_by.as_deref(),
        };

        // The broadcast already went out; a log failure must not hide that.
        if let Err(e) = self.store.record_broadcast(&entry) {
            tracing::error!(error = %e, "failed to record broadcast");
        }

        Ok(report.summary)
    }
}

impl<S, C, T> Broadcaster for BroadcastService<S, C, T>
where
    S: AllStorage + Clone + 'static,
    C: CredentialProvider + 'static,
    T: Transport + 'static,
{
    /// Runs on its own task so that a dropped caller (client disconnect,
    /// proxy timeout) does not stop the fan-out, the deactivation pass or
    /// the log write.
    async fn send_broadcast(
        &self,
        request: &BroadcastRequest,
    ) -> color_eyre::eyre::Result<BroadcastSummary> {
        let service = self.clone();
        let request = request.clone();

        tokio::spawn(async move { service.broadcast_and_log(&request).await })
            .await
            .wrap_err("broadcast task failed")?
    }

    async fn recent_broadcasts(
        &self,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<BroadcastRecord>> {
        BroadcastLogStore::recent_broadcasts(&self.store, limit)
            .wrap_err("failed to list recent broadcasts")
    }
}
