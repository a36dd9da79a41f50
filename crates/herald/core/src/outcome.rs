//! Delivery outcome types.

/// Why a delivery failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// No credential could be obtained; nothing was sent.
    Configuration,
    /// Timeout, 5xx, network error or an unclassified rejection. The token
    /// stays active.
    Transient,
    /// The provider will never accept this token again.
    Permanent,
}

/// Result of delivering a broadcast to one token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DispatchOutcome {
    pub token: String,
    pub success: bool,
    /// Provider error text, verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl DispatchOutcome {
    /// Create a successful outcome.
    pub fn success(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            success: true,
            error: None,
            failure: None,
        }
    }

    /// Create a failed outcome.
    pub fn failure(
        token: impl Into<String>,
        kind: FailureKind,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            token: token.into(),
            success: false,
            error: Some(error.to_string()),
            failure: Some(kind),
        }
    }

    /// Check if the token was reported permanently invalid.
    pub fn is_permanent_failure(&self) -> bool {
        self.failure == Some(FailureKind::Permanent)
    }
}

/// Counts for one broadcast.
///
/// `success_count + failure_count == total_tokens` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastSummary {
    pub total_tokens: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl BroadcastSummary {
    /// Reduce per-token outcomes.
    pub fn from_outcomes(outcomes: &[DispatchOutcome]) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();

        Self {
            total_tokens: outcomes.len(),
            success_count,
            failure_count: outcomes.len() - success_count,
        }
    }
}

/// Summary plus per-token detail, valid for the duration of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub summary: BroadcastSummary,
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn from_outcomes(outcomes: Vec<DispatchOutcome>) -> Self {
        Self {
            summary: BroadcastSummary::from_outcomes(&outcomes),
            outcomes,
        }
    }

    /// Tokens the provider reported as permanently invalid.
    pub fn permanent_failures(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_permanent_failure())
            .map(|o| o.token.as_str())
    }
}

/// A logged broadcast.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRecord {
    pub id: i32,
    pub title: String,
    pub body: String,
    /// Metadata map as JSON text.
    pub data: String,
    /// Platform filter, `None` for all platforms.
    pub platform: Option<String>,
    pub summary: BroadcastSummary,
    pub sent_by: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
