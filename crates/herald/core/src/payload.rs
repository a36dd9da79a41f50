//! Notification payload.

use std::collections::BTreeMap;

use crate::ValidationError;

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum body length, in characters.
pub const MAX_BODY_LEN: usize = 4096;

/// Data keys FCM reserves for itself. Keys starting with `google` or `gcm`
/// are reserved as well.
pub const RESERVED_DATA_KEYS: [&str; 3] = ["from", "notification", "message_type"];

/// Notification content shared read-only across one broadcast.
///
/// Built and validated once; there are no setters after construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    title: String,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    data: BTreeMap<String, String>,
}

impl NotificationPayload {
    /// Create a payload with a validated title and body.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        let body = body.into();

        check_text("title", &title, MAX_TITLE_LEN)?;
        check_text("body", &body, MAX_BODY_LEN)?;

        Ok(Self {
            title,
            body,
            image_url: None,
            data: BTreeMap::new(),
        })
    }

    /// Attach an image shown with the notification.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Result<Self, ValidationError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ValidationError::MissingField("image_url"));
        }
        self.image_url = Some(url);
        Ok(self)
    }

    /// Attach string metadata.
    ///
    /// FCM rejects a message carrying a reserved key for every recipient, so
    /// such keys are refused here.
    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Result<Self, ValidationError> {
        if let Some(key) = data.keys().find(|k| is_reserved_key(k)) {
            return Err(ValidationError::ReservedDataKey(key.clone()));
        }
        self.data.extend(data);
        Ok(self)
    }

    /// Attach arbitrary JSON metadata, stringifying non-string values.
    pub fn with_json_data(
        self,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ValidationError> {
        self.with_data(stringify_data(data))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// String-only metadata delivered alongside the notification.
    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }
}

/// Convert a JSON object into the string-only map the transport accepts.
///
/// Strings pass through untouched; every other value becomes its JSON text.
pub fn stringify_data(data: serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, String> {
    data.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}

fn is_reserved_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    RESERVED_DATA_KEYS.contains(&key.as_str()) || key.starts_with("google") || key.starts_with("gcm")
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Delivery priority hint passed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    High,
    Normal,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
        }
    }
}
