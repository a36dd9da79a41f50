//! Device registration handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use herald_core::{Registration, ValidationError};
use herald_service::Registrar;
use serde::Deserialize;

use crate::{ApiError, MessageResponse, caller_id};

/// Body of `POST /api/push/register`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub device_token: Option<String>,
    pub platform: Option<String>,
    pub device_info: Option<serde_json::Value>,
    pub app_version: Option<String>,
}

/// Body of `DELETE /api/push/register`.
#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    pub device_token: Option<String>,
}

/// Register or refresh the caller's device token.
pub async fn register_handler<R>(
    State(registrar): State<R>,
    headers: HeaderMap,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError>
where
    R: Registrar,
{
    let user_id = caller_id(&headers).ok_or(ApiError::Unauthorized)?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let registration = Registration::new(
        req.device_token.as_deref().unwrap_or_default(),
        req.platform.as_deref().unwrap_or_default(),
    )
    .map_err(|e| match e {
        ValidationError::MissingField(_) => {
            ApiError::BadRequest("device_token and platform are required".into())
        }
        other => other.into(),
    })?
    .with_user(user_id);

    let registration = match req.device_info {
        Some(info) => registration.with_device_info(info),
        None => registration,
    };
    let registration = match req.app_version {
        Some(version) => registration.with_app_version(version),
        None => registration,
    };

    registrar
        .register(&registration)
        .await
        .map_err(|e| ApiError::internal("Failed to register device token", e))?;

    Ok(Json(MessageResponse::ok("Device token registered")))
}

/// Deactivate one of the caller's device tokens.
pub async fn unregister_handler<R>(
    State(registrar): State<R>,
    headers: HeaderMap,
    body: Result<Json<UnregisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError>
where
    R: Registrar,
{
    let user_id = caller_id(&headers).ok_or(ApiError::Unauthorized)?;
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let token = req
        .device_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("device_token is required".into()))?;

    registrar
        .unregister(token, user_id)
        .await
        .map_err(|e| ApiError::internal("Failed to unregister device token", e))?;

    Ok(Json(MessageResponse::ok("Device token unregistered")))
}
