//! Admin broadcast handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use herald_core::{BroadcastRecord, BroadcastSummary, NotificationPayload, TargetFilter};
use herald_service::{BroadcastRequest, Broadcaster};
use serde::{Deserialize, Serialize};

use crate::{ApiError, caller_id};

const DEFAULT_LOG_LIMIT: usize = 20;
const MAX_LOG_LIMIT: usize = 100;

/// Body of `POST /api/admin/push/send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<serde_json::Map<String, serde_json::Value>>,
    pub image_url: Option<String>,
    /// `android`, `ios`, `web` or `all`.
    pub platform: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub message: &'static str,
    pub results: BroadcastSummary,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub broadcasts: Vec<BroadcastRecord>,
}

/// Broadcast a notification to every matching device.
pub async fn send_handler<B>(
    State(broadcaster): State<B>,
    headers: HeaderMap,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError>
where
    B: Broadcaster,
{
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let (Some(title), Some(message)) = (
        req.title.filter(|t| !t.trim().is_empty()),
        req.body.filter(|b| !b.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest("title and body are required".into()));
    };

    let mut payload = NotificationPayload::new(title, message)?;
    if let Some(url) = req.image_url.filter(|u| !u.trim().is_empty()) {
        payload = payload.with_image_url(url)?;
    }
    if let Some(data) = req.data {
        payload = payload.with_json_data(data)?;
    }

    let request = BroadcastRequest {
        payload,
        filter: TargetFilter::parse(req.platform.as_deref(), req.limit)?,
        sent_by: caller_id(&headers).map(str::to_string),
    };

    let summary = broadcaster
        .send_broadcast(&request)
        .await
        .map_err(|e| ApiError::internal("Failed to send push notification", e))?;

    Ok(Json(SendResponse {
        success: true,
        message: "Push notification sent",
        results: summary,
    }))
}

/// Recent broadcasts, newest first.
pub async fn log_handler<B>(
    State(broadcaster): State<B>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogResponse>, ApiError>
where
    B: Broadcaster,
{
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_LOG_LIMIT);

    let broadcasts = broadcaster
        .recent_broadcasts(limit)
        .await
        .map_err(|e| ApiError::internal("Failed to load broadcast log", e))?;

    Ok(Json(LogResponse { broadcasts }))
}
