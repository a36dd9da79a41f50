//! Database models.

use diesel::prelude::*;

use crate::schema::{device_tokens, push_notifications_log};

/// Device token record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = device_tokens)]
pub struct DeviceTokenRow {
    pub id: i32,
    pub token: String,
    pub platform: String,
    pub user_id: Option<String>,
    pub device_info: Option<String>,
    pub app_version: Option<String>,
    pub is_active: bool,
    pub last_used_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

impl TryFrom<DeviceTokenRow> for herald_core::DeviceToken {
    type Error = color_eyre::eyre::Report;

    fn try_from(row: DeviceTokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            platform: row.platform.parse()?,
            token: row.token,
            user_id: row.user_id,
            device_info: row.device_info,
            app_version: row.app_version,
            is_active: row.is_active,
            last_used_at: row.last_used_at.and_utc(),
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
        })
    }
}

/// New device token for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = device_tokens)]
pub struct NewDeviceToken<'a> {
    pub token: &'a str,
    pub platform: &'a str,
    pub user_id: Option<&'a str>,
    pub device_info: Option<&'a str>,
    pub app_version: Option<&'a str>,
    pub is_active: bool,
    pub last_used_at: chrono::NaiveDateTime,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Broadcast log record.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = push_notifications_log)]
pub struct BroadcastLogRow {
    pub id: i32,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: String,
    pub platform: Option<String>,
    pub total_sent: i32,
    pub total_failed: i32,
    pub total_tokens: i32,
    pub sent_by: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<BroadcastLogRow> for herald_core::BroadcastRecord {
    fn from(row: BroadcastLogRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            body: row.body,
            data: row.data,
            platform: row.platform,
            summary: herald_core::BroadcastSummary {
                total_tokens: count(row.total_tokens),
                success_count: count(row.total_sent),
                failure_count: count(row.total_failed),
            },
            sent_by: row.sent_by,
            created_at: row.created_at.and_utc(),
        }
    }
}

fn count(value: i32) -> usize {
    usize::try_from(value).unwrap_or_default()
}

/// New broadcast log entry for insertion.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = push_notifications_log)]
pub struct NewBroadcastLog<'a> {
    pub notification_type: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub data: &'a str,
    pub platform: Option<&'a str>,
    pub total_sent: i32,
    pub total_failed: i32,
    pub total_tokens: i32,
    pub sent_by: Option<&'a str>,
    pub created_at: chrono::NaiveDateTime,
}
