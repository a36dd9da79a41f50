//! Herald Server - push notification registry and broadcast service.

pub mod settings;

use std::time::Duration;

use axum::Router;
use color_eyre::eyre::WrapErr as _;
use herald_auth::{Credentials, ServiceAccountProvider};
use herald_push::{Dispatcher, DispatcherConfig, FcmTransport};
use herald_service::{BroadcastConfig, BroadcastService, RegistrationService};
use herald_storage::SqliteStorage;
use tower_http::trace::TraceLayer;

pub use settings::{ConfigError, Settings};

/// Wire storage, credentials and transport into the HTTP application.
///
/// Missing or invalid FCM credentials do not prevent startup; every
/// broadcast then fails per token with the credential error.
pub fn build_app(settings: &Settings, storage: SqliteStorage) -> color_eyre::eyre::Result<Router> {
    let credentials = settings.fcm.credentials();
    match &credentials {
        Credentials::Loaded(account) => {
            tracing::info!(client_email = %account.client_email, "loaded FCM service account");
        }
        Credentials::Missing => {
            tracing::warn!("FCM service account not configured. Push notifications will not work.");
        }
        Credentials::Invalid(reason) => {
            tracing::warn!(%reason, "FCM service account invalid. Push notifications will not work.");
        }
    }

    let project_id = settings.fcm.resolve_project_id(&credentials);
    if project_id.is_none() {
        tracing::warn!("FCM project id not configured");
    }

    let timeout = settings.fcm.request_timeout();
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .wrap_err("failed to build HTTP client")?;

    let provider = ServiceAccountProvider::with_client(credentials, http);
    let transport = FcmTransport::new(&settings.fcm.endpoint, project_id.as_deref(), timeout)?;

    let dispatcher = Dispatcher::with_config(
        provider,
        transport,
        DispatcherConfig {
            concurrency_limit: settings.dispatch.concurrency_limit,
            call_timeout: Some(timeout),
        },
    );

    let broadcaster = BroadcastService::new(
        storage.clone(),
        dispatcher,
        BroadcastConfig {
            deactivate_invalid: settings.dispatch.deactivate_invalid,
            time_budget: settings.dispatch.time_budget_secs.map(Duration::from_secs),
            ..Default::default()
        },
    );

    let registrar = RegistrationService::new(storage);

    if settings.server.admin_token.is_none() {
        tracing::warn!("no admin token configured, admin routes are disabled");
    }

    Ok(Router::new()
        .merge(herald_http::registration_router(registrar))
        .merge(herald_http::admin_router(
            broadcaster,
            settings.server.admin_token.clone(),
        ))
        .layer(axum::middleware::from_fn(herald_http::logging_middleware))
        .layer(TraceLayer::new_for_http()))
}
