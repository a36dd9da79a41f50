//! FCM HTTP v1 transport.

use std::collections::BTreeMap;
use std::time::Duration;

use color_eyre::eyre::WrapErr as _;
use herald_core::{FailureKind, NotificationPayload, Priority};

use crate::{Transport, TransportError, classify};

/// Production FCM API base URL.
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

#[derive(serde::Serialize)]
struct Envelope<'a> {
    message: Message<'a>,
}

#[derive(serde::Serialize)]
struct Message<'a> {
    token: &'a str,
    notification: Notification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a BTreeMap<String, String>>,
    android: AndroidConfig,
}

#[derive(serde::Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

#[derive(serde::Serialize)]
struct AndroidConfig {
    priority: &'static str,
}

#[derive(serde::Deserialize)]
struct SendResponse {
    name: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(serde::Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// FCM transport.
pub struct FcmTransport {
    client: reqwest::Client,
    send_url: Option<String>,
}

impl FcmTransport {
    /// Create a transport for `project_id`.
    ///
    /// Without a project id every delivery fails with a configuration error.
    pub fn new(
        endpoint: &str,
        project_id: Option<&str>,
        request_timeout: Duration,
    ) -> color_eyre::eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .wrap_err("failed to build FCM HTTP client")?;

        let send_url = project_id.filter(|p| !p.is_empty()).map(|project| {
            format!(
                "{}/v1/projects/{project}/messages:send",
                endpoint.trim_end_matches('/')
            )
        });

        Ok(Self { client, send_url })
    }

    pub fn send_url(&self) -> Option<&str> {
        self.send_url.as_deref()
    }
}

impl Transport for FcmTransport {
    async fn deliver(
        &self,
        token: &str,
        payload: &NotificationPayload,
        priority: Priority,
        access_token: &str,
    ) -> Result<String, TransportError> {
        let url = self.send_url.as_deref().ok_or_else(|| {
            TransportError::new(FailureKind::Configuration, "FCM_PROJECT_ID not configured")
        })?;

        let envelope = Envelope {
            message: Message {
                token,
                notification: Notification {
                    title: payload.title(),
                    body: payload.body(),
                    image: payload.image_url(),
                },
                data: Some(payload.data()).filter(|d| !d.is_empty()),
                android: AndroidConfig {
                    priority: priority.as_str(),
                },
            },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| TransportError::transient(request_failure(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::transient(request_failure(&e)).with_status(status.as_u16()))?;

        if status.is_success() {
            return serde_json::from_str::<SendResponse>(&text)
                .ok()
                .and_then(|r| r.name)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| TransportError::transient("Unknown error").with_status(status.as_u16()));
        }

        Err(error_from_body(status.as_u16(), &text))
    }
}

fn request_failure(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    }
}

/// Build a transport error from a non-2xx FCM response.
fn error_from_body(status: u16, text: &str) -> TransportError {
    let body = serde_json::from_str::<ErrorResponse>(text).ok().map(|r| r.error);

    let message = body
        .as_ref()
        .and_then(|b| b.message.clone())
        .filter(|m| !m.is_empty())
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| format!("HTTP {status}"));

    let canonical = body.as_ref().and_then(|b| b.status.as_deref());
    let codes: Vec<&str> = body
        .as_ref()
        .map(|b| b.details.iter().filter_map(|d| d.error_code.as_deref()).collect())
        .unwrap_or_default();

    let kind = classify(canonical, &codes, &message);
    let code = codes.first().map(|c| c.to_string()).or(canonical.map(str::to_string));

    let error = TransportError::new(kind, message).with_status(status);
    match code {
        Some(code) => error.with_code(code),
        None => error,
    }
}
