//! Service account loading.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use secrecy::Secret;

use crate::CredentialError;

/// Google OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// A Google service account key.
#[derive(Debug)]
pub struct ServiceAccount {
    pub client_email: String,
    pub project_id: Option<String>,
    pub token_uri: String,
    private_key: Secret<String>,
}

/// On-disk layout of a service account key file. Unused fields are ignored.
#[derive(serde::Deserialize)]
struct ServiceAccountFile {
    client_email: Option<String>,
    private_key: Option<String>,
    project_id: Option<String>,
    token_uri: Option<String>,
}

impl ServiceAccount {
    /// Create a service account from its parts.
    pub fn new(client_email: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            client_email: client_email.into(),
            project_id: None,
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            private_key: Secret::new(private_key.into()),
        }
    }

    /// Parse a service account key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let file: ServiceAccountFile = serde_json::from_str(json)
            .map_err(|e| CredentialError::InvalidCredentials(format!("malformed JSON: {e}")))?;

        let client_email = file
            .client_email
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CredentialError::InvalidCredentials("missing client_email".into()))?;
        let private_key = file
            .private_key
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CredentialError::InvalidCredentials("missing private_key".into()))?;

        let mut account = Self::new(client_email, private_key);
        account.project_id = file.project_id.filter(|s| !s.is_empty());
        if let Some(uri) = file.token_uri.filter(|s| !s.is_empty()) {
            account.token_uri = uri;
        }

        Ok(account)
    }

    /// Parse a base64-encoded service account key.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::InvalidCredentials(format!("malformed base64: {e}")))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| CredentialError::InvalidCredentials(format!("not UTF-8: {e}")))?;

        Self::from_json(&json)
    }

    /// Read a service account key file.
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CredentialError::InvalidCredentials(format!("cannot read {}: {e}", path.display()))
        })?;

        Self::from_json(&json)
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// PEM-encoded RSA private key.
    pub fn private_key(&self) -> &Secret<String> {
        &self.private_key
    }
}

/// Outcome of loading the service account at startup.
#[derive(Debug, Clone)]
pub enum Credentials {
    Loaded(Arc<ServiceAccount>),
    /// No source configured.
    Missing,
    /// A source was configured but could not be used.
    Invalid(String),
}

impl Credentials {
    /// Load from the first configured source: inline JSON, then base64, then
    /// a file path. Empty values count as not configured.
    pub fn resolve(json: Option<&str>, base64: Option<&str>, path: Option<&Path>) -> Self {
        let present = |s: &&str| !s.trim().is_empty();

        let loaded = if let Some(json) = json.filter(present) {
            ServiceAccount::from_json(json)
        } else if let Some(encoded) = base64.filter(present) {
            ServiceAccount::from_base64(encoded)
        } else if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            ServiceAccount::from_file(path)
        } else {
            return Self::Missing;
        };

        match loaded {
            Ok(account) => Self::Loaded(Arc::new(account)),
            Err(e) => Self::Invalid(e.to_string()),
        }
    }

    /// The loaded account, or the reason there is none.
    pub fn account(&self) -> Result<&Arc<ServiceAccount>, CredentialError> {
        match self {
            Self::Loaded(account) => Ok(account),
            Self::Missing => Err(CredentialError::NotConfigured),
            Self::Invalid(reason) => Err(CredentialError::InvalidCredentials(reason.clone())),
        }
    }

    /// Project id declared by the service account, if any.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Loaded(account) => account.project_id.as_deref(),
            _ => None,
        }
    }
}

impl From<ServiceAccount> for Credentials {
    fn from(account: ServiceAccount) -> Self {
        Self::Loaded(Arc::new(account))
    }
}
