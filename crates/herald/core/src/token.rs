//! Device token types.

use crate::{Platform, ValidationError};

/// A registered device token as stored by the registry.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeviceToken {
    /// Opaque identifier issued by the platform's push service.
    pub token: String,
    pub platform: Platform,
    /// Caller that registered the token.
    pub user_id: Option<String>,
    /// Client-reported device details (JSON text).
    pub device_info: Option<String>,
    pub app_version: Option<String>,
    /// Soft-delete flag. Tokens are deactivated, never removed.
    pub is_active: bool,
    /// Bumped on every registration; orders broadcast candidates.
    pub last_used_at: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Device details reported by a client at registration time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub platform: Platform,
    pub user_agent: String,
    pub language: String,
    pub timezone: String,
}

/// A validated registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub token: String,
    pub platform: Platform,
    pub user_id: Option<String>,
    pub device_info: Option<serde_json::Value>,
    pub app_version: Option<String>,
}

impl Registration {
    /// Validate raw registration fields.
    pub fn new(token: &str, platform: &str) -> Result<Self, ValidationError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::MissingField("device_token"));
        }
        if platform.trim().is_empty() {
            return Err(ValidationError::MissingField("platform"));
        }

        Ok(Self {
            token: token.to_string(),
            platform: platform.trim().parse()?,
            user_id: None,
            device_info: None,
            app_version: None,
        })
    }

    /// Set the owning user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Attach client device details.
    pub fn with_device_info(mut self, info: serde_json::Value) -> Self {
        if !info.is_null() {
            self.device_info = Some(info);
        }
        self
    }

    /// Attach the client app version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        if !version.is_empty() {
            self.app_version = Some(version);
        }
        self
    }
}

/// Short token prefix safe to put in logs.
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
