//! Push events from the native bridge and their consumer loop.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Bus capacity used by the agent binary.
pub const DEFAULT_CAPACITY: usize = 64;

/// A notification as delivered to the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// The user tapped a notification or one of its actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAction {
    pub action_id: String,
    pub notification: PushNotification,
}

impl NotificationAction {
    /// In-app route carried in the notification's `url` data key.
    pub fn navigation_target(&self) -> Option<&str> {
        self.notification
            .data
            .get("url")
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum PushEvent {
    /// The platform issued (or rotated) this device's token.
    Registered(String),
    /// A notification arrived while the app was in the foreground.
    Received(PushNotification),
    ActionPerformed(NotificationAction),
}

/// Reacts to push events. Called from a single loop, one event at a time.
#[trait_variant::make(Send)]
pub trait PushHandler: Send {
    async fn on_registered(&mut self, token: String);

    async fn on_received(&mut self, notification: PushNotification);

    async fn on_action_performed(&mut self, action: NotificationAction);
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("push event bus closed")]
pub struct BusClosed;

/// Sending half handed to the native bridge.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<PushEvent>,
}

impl EventPublisher {
    /// Waits for room when the bus is full.
    pub async fn publish(&self, event: PushEvent) -> Result<(), BusClosed> {
        self.tx.send(event).await.map_err(|_| BusClosed)
    }
}

/// Receiving half consumed by [`run_event_loop`].
#[derive(Debug)]
pub struct EventBus {
    rx: mpsc::Receiver<PushEvent>,
}

/// Create a bounded event bus.
pub fn event_bus(capacity: usize) -> (EventPublisher, EventBus) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventPublisher { tx }, EventBus { rx })
}

/// Dispatch events to `handler` in arrival order until every publisher is
/// dropped. Returns the number of events handled.
pub async fn run_event_loop<H: PushHandler>(mut bus: EventBus, handler: &mut H) -> usize {
    let mut handled = 0;

    while let Some(event) = bus.rx.recv().await {
        match event {
            PushEvent::Registered(token) => handler.on_registered(token).await,
            PushEvent::Received(notification) => handler.on_received(notification).await,
            PushEvent::ActionPerformed(action) => handler.on_action_performed(action).await,
        }
        handled += 1;
    }

    tracing::debug!(handled, "push event bus drained");
    handled
}
