//! Device registration service.

use color_eyre::eyre::WrapErr as _;
use herald_core::{Registration, token_prefix};
use herald_storage::TokenRegistry;

use crate::Registrar;

/// Registration backed by the token registry.
#[derive(Clone)]
pub struct RegistrationService<S> {
    store: S,
}

impl<S> RegistrationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: TokenRegistry> Registrar for RegistrationService<S> {
    async fn register(&self, registration: &Registration) -> color_eyre::eyre::Result<()> {
        tracing::info!(
            token = %token_prefix(&registration.token),
            platform = %registration.platform,
            user_id = ?registration.user_id,
            "registering device token"
        );

        self.store
            .upsert(registration, chrono::Utc::now())
            .wrap_err("failed to register device token")
    }

    async fn unregister(&self, token: &str, user_id: &str) -> color_eyre::eyre::Result<()> {
        tracing::info!(token = %token_prefix(token), %user_id, "unregistering device token");

        self.store
            .deactivate_for_user(token, user_id)
            .wrap_err("failed to unregister device token")
    }
}
