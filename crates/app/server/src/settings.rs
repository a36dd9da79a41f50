//! Server settings: a TOML file plus environment overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use herald_auth::Credentials;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub fcm: FcmSettings,
    pub dispatch: DispatchSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen_addr: SocketAddr,
    /// Bearer token for the admin routes. Unset disables them.
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:herald.db".to_string(),
            pool_size: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FcmSettings {
    /// Falls back to the service account's project id.
    pub project_id: Option<String>,
    pub service_account_json: Option<String>,
    pub service_account_path: Option<PathBuf>,
    pub service_account_base64: Option<String>,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for FcmSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            service_account_json: None,
            service_account_path: None,
            service_account_base64: None,
            endpoint: herald_push::DEFAULT_FCM_ENDPOINT.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl FcmSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load the service account from the first configured source.
    pub fn credentials(&self) -> Credentials {
        Credentials::resolve(
            self.service_account_json.as_deref(),
            self.service_account_base64.as_deref(),
            self.service_account_path.as_deref(),
        )
    }

    /// Explicit project id, else the one in the service account.
    pub fn resolve_project_id(&self, credentials: &Credentials) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| credentials.project_id().map(str::to_string))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub concurrency_limit: usize,
    pub deactivate_invalid: bool,
    /// Stop starting new chunks after this many seconds.
    pub time_budget_secs: Option<u64>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: herald_push::DEFAULT_CONCURRENCY_LIMIT,
            deactivate_invalid: true,
            time_budget_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` (missing file means defaults), then apply
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Override fields from environment variables, read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(addr) = var("HERALD_LISTEN_ADDR") {
            self.server.listen_addr = addr.parse().map_err(|e| ConfigError::Invalid {
                field: "HERALD_LISTEN_ADDR",
                reason: format!("{e}"),
            })?;
        }
        if let Some(token) = var("HERALD_ADMIN_TOKEN") {
            self.server.admin_token = Some(token);
        }
        if let Some(project) = var("FCM_PROJECT_ID") {
            self.fcm.project_id = Some(project);
        }
        if let Some(json) = var("FCM_SERVICE_ACCOUNT_JSON") {
            self.fcm.service_account_json = Some(json);
        }
        if let Some(path) = var("FCM_SERVICE_ACCOUNT_PATH") {
            self.fcm.service_account_path = Some(PathBuf::from(path));
        }
        if let Some(encoded) = var("FCM_SERVICE_ACCOUNT_BASE64") {
            self.fcm.service_account_base64 = Some(encoded);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.concurrency_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch.concurrency_limit",
                reason: "must be at least 1".into(),
            });
        }
        if self.fcm.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fcm.request_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid {
                field: "database.pool_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
