//! Default push event handler.

use crate::{NotificationAction, PushHandler, PushNotification, RegistrationClient};

/// Registers tokens with the server and keeps the state a UI would render:
/// foreground notifications and the last navigation target.
pub struct DefaultHandler {
    client: RegistrationClient,
    token: Option<String>,
    registered: bool,
    notifications: Vec<PushNotification>,
    navigation: Option<String>,
}

impl DefaultHandler {
    pub fn new(client: RegistrationClient) -> Self {
        Self {
            client,
            token: None,
            registered: false,
            notifications: Vec::new(),
            navigation: None,
        }
    }

    /// Most recent token issued by the platform.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether the server accepted the most recent token.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Foreground notifications, oldest first.
    pub fn notifications(&self) -> &[PushNotification] {
        &self.notifications
    }

    /// Route requested by the last tapped notification.
    pub fn navigation_target(&self) -> Option<&str> {
        self.navigation.as_deref()
    }
}

impl PushHandler for DefaultHandler {
    async fn on_registered(&mut self, token: String) {
        self.registered = self.client.register_token(&token).await;
        self.token = Some(token);
    }

    async fn on_received(&mut self, notification: PushNotification) {
        tracing::info!(
            title = notification.title.as_deref().unwrap_or_default(),
            "push notification received"
        );
        self.notifications.push(notification);
    }

    async fn on_action_performed(&mut self, action: NotificationAction) {
        match action.navigation_target() {
            Some(url) => {
                tracing::info!(action = %action.action_id, url, "navigating");
                self.navigation = Some(url.to_string());
            }
            None => tracing::debug!(action = %action.action_id, "action without target"),
        }
    }
}
