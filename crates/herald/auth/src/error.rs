//! Credential errors.

/// Failure to obtain an access token.
///
/// Every variant is fatal for a whole broadcast: nothing can be sent
/// without a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("FCM service account not configured")]
    NotConfigured,

    #[error("invalid service account credentials: {0}")]
    InvalidCredentials(String),

    #[error("failed to sign token assertion: {0}")]
    Signing(String),

    #[error("access token request failed: {0}")]
    TokenRequest(String),

    #[error("invalid access token response: {0}")]
    TokenResponse(String),
}
