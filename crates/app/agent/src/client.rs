//! Registration client for the Herald server.

use color_eyre::eyre::WrapErr as _;
use herald_core::{DeviceInfo, token_prefix};

use crate::PushChannel;

/// Reported when no app version is configured.
pub const DEFAULT_APP_VERSION: &str = "1.0.0";

/// Registration client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, e.g. `https://api.example.com`.
    pub server_url: String,
    /// Identity forwarded as `x-user-id`.
    pub user_id: String,
    pub channel: PushChannel,
    pub app_version: String,
    pub user_agent: String,
    pub language: String,
    pub timezone: String,
}

impl ClientConfig {
    pub fn new(
        server_url: impl Into<String>,
        user_id: impl Into<String>,
        channel: PushChannel,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            user_id: user_id.into(),
            channel,
            app_version: DEFAULT_APP_VERSION.to_string(),
            user_agent: concat!("herald-agent/", env!("CARGO_PKG_VERSION")).to_string(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(serde::Serialize)]
struct RegisterBody<'a> {
    device_token: &'a str,
    platform: &'static str,
    device_info: &'a DeviceInfo,
    app_version: &'a str,
}

#[derive(serde::Serialize)]
struct UnregisterBody<'a> {
    device_token: &'a str,
}

/// Registers and unregisters this device's push token.
#[derive(Clone)]
pub struct RegistrationClient {
    http: reqwest::Client,
    endpoint: String,
    user_id: String,
    app_version: String,
    device_info: DeviceInfo,
}

impl RegistrationClient {
    pub fn new(config: ClientConfig) -> Self {
        let device_info = DeviceInfo {
            platform: config.channel.platform(),
            user_agent: config.user_agent,
            language: config.language,
            timezone: config.timezone,
        };

        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}/api/push/register",
                config.server_url.trim_end_matches('/')
            ),
            user_id: config.user_id,
            app_version: config.app_version,
            device_info,
        }
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    /// Register `token` with the server. Returns whether it was accepted.
    pub async fn register_token(&self, token: &str) -> bool {
        match self.try_register(token).await {
            Ok(()) => {
                tracing::info!(token = %token_prefix(token), "registered device token");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "error registering token");
                false
            }
        }
    }

    /// Unregister `token`. Returns whether the server accepted it.
    pub async fn unregister_token(&self, token: &str) -> bool {
        match self.try_unregister(token).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "error unregistering token");
                false
            }
        }
    }

    async fn try_register(&self, token: &str) -> color_eyre::eyre::Result<()> {
        let body = RegisterBody {
            device_token: token,
            platform: self.device_info.platform.as_str(),
            device_info: &self.device_info,
            app_version: &self.app_version,
        };

        self.http
            .post(&self.endpoint)
            .header("x-user-id", &self.user_id)
            .json(&body)
            .send()
            .await
            .wrap_err("register request failed")?
            .error_for_status()
            .wrap_err("server rejected device token")?;

        Ok(())
    }

    async fn try_unregister(&self, token: &str) -> color_eyre::eyre::Result<()> {
        self.http
            .delete(&self.endpoint)
            .header("x-user-id", &self.user_id)
            .json(&UnregisterBody {
                device_token: token,
            })
            .send()
            .await
            .wrap_err("unregister request failed")?
            .error_for_status()
            .wrap_err("server rejected unregister")?;

        Ok(())
    }
}
