//! Fan-out dispatcher.

use std::sync::Arc;
use std::time::Duration;

use herald_auth::{CredentialError, CredentialProvider};
use herald_core::{
    DispatchOutcome, DispatchReport, FailureKind, NotificationPayload, Priority, token_prefix,
};
use tokio::time::Instant;

use crate::{Transport, TransportError};

/// Maximum simultaneous transport calls.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 100;

/// Failure reason for tokens skipped once the deadline has passed.
pub const DEADLINE_EXCEEDED: &str = "broadcast deadline exceeded";

/// Dispatcher tuning.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Chunk size; every call in a chunk runs concurrently.
    pub concurrency_limit: usize,
    /// Upper bound on a single transport call.
    pub call_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Per-broadcast options.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    pub priority: Priority,
    /// Checked before each chunk; tokens not yet attempted fail once it passes.
    pub deadline: Option<Instant>,
}

impl DispatchOptions {
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Delivers one payload to many tokens.
///
/// Tokens are processed in consecutive chunks of `concurrency_limit`. Chunks
/// run one after another; calls within a chunk run as parallel tasks. One
/// credential is acquired per broadcast and shared by every call.
pub struct Dispatcher<C, T> {
    credentials: Arc<C>,
    transport: Arc<T>,
    config: DispatcherConfig,
}

impl<C, T> Clone for Dispatcher<C, T> {
    fn clone(&self) -> Self {
        Self {
            credentials: Arc::clone(&self.credentials),
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl<C, T> Dispatcher<C, T>
where
    C: CredentialProvider,
    T: Transport + 'static,
{
    pub fn new(credentials: C, transport: T) -> Self {
        Self::with_config(credentials, transport, DispatcherConfig::default())
    }

    pub fn with_config(credentials: C, transport: T, config: DispatcherConfig) -> Self {
        Self {
            credentials: Arc::new(credentials),
            transport: Arc::new(transport),
            config,
        }
    }

    /// Deliver `payload` to every token.
    ///
    /// Never fails as a whole: each token gets exactly one outcome, in input
    /// order. If no credential can be obtained every token fails with the
    /// credential error and no transport call is made.
    pub async fn send(
        &self,
        tokens: &[String],
        payload: &NotificationPayload,
        options: DispatchOptions,
    ) -> DispatchReport {
        if tokens.is_empty() {
            return DispatchReport::default();
        }

        let access_token: Arc<str> = match self.access_token().await {
            Ok(token) => token.into(),
            Err(e) => {
                tracing::error!(error = %e, tokens = tokens.len(), "no FCM credential, failing broadcast");
                let outcomes = tokens
                    .iter()
                    .map(|t| DispatchOutcome::failure(t.as_str(), FailureKind::Configuration, &e))
                    .collect();
                return DispatchReport::from_outcomes(outcomes);
            }
        };

        let payload = Arc::new(payload.clone());
        let limit = self.config.concurrency_limit.max(1);
        let mut outcomes = Vec::with_capacity(tokens.len());

        for (index, chunk) in tokens.chunks(limit).enumerate() {
            if options.deadline.is_some_and(|d| Instant::now() >= d) {
                let remaining = &tokens[outcomes.len()..];
                tracing::warn!(remaining = remaining.len(), "broadcast deadline exceeded");
                outcomes.extend(remaining.iter().map(|t| {
                    DispatchOutcome::failure(t.as_str(), FailureKind::Transient, DEADLINE_EXCEEDED)
                }));
                break;
            }

            tracing::debug!(chunk = index, size = chunk.len(), "dispatching chunk");

            let handles: Vec<_> = chunk
                .iter()
                .map(|token| {
                    self.spawn_delivery(token.clone(), &payload, &access_token, options.priority)
                })
                .collect();

            let results = futures::future::join_all(handles).await;

            for (token, result) in chunk.iter().zip(results) {
                outcomes.push(result.unwrap_or_else(|e| {
                    DispatchOutcome::failure(
                        token.as_str(),
                        FailureKind::Transient,
                        format!("delivery task failed: {e}"),
                    )
                }));
            }
        }

        let report = DispatchReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.summary.total_tokens,
            success = report.summary.success_count,
            failure = report.summary.failure_count,
            "broadcast dispatched"
        );
        report
    }

    /// Fetch the broadcast's bearer token, bounded by the call timeout.
    async fn access_token(&self) -> Result<String, CredentialError> {
        let request = self.credentials.access_token();
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or_else(|_| Err(CredentialError::TokenRequest("token request timed out".into()))),
            None => request.await,
        }
    }

    fn spawn_delivery(
        &self,
        token: String,
        payload: &Arc<NotificationPayload>,
        access_token: &Arc<str>,
        priority: Priority,
    ) -> tokio::task::JoinHandle<DispatchOutcome> {
        let transport = Arc::clone(&self.transport);
        let payload = Arc::clone(payload);
        let access_token = Arc::clone(access_token);
        let call_timeout = self.config.call_timeout;

        tokio::spawn(async move {
            let call = transport.deliver(&token, &payload, priority, &access_token);
            let result = match call_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or_else(|_| Err(TransportError::transient("request timed out"))),
                None => call.await,
            };

            match result {
                Ok(_) => DispatchOutcome::success(token),
                Err(e) => {
                    if e.is_permanent() {
                        tracing::info!(token = %token_prefix(&token), error = %e, "invalid token detected");
                    }
                    DispatchOutcome::failure(token, e.kind, e.message)
                }
            }
        })
    }
}
