//! SQLite storage implementation.

use color_eyre::eyre::WrapErr as _;
use diesel::connection::SimpleConnection as _;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;

use crate::models::*;
use crate::schema::*;
use crate::traits::*;
use herald_core::{BroadcastRecord, DeviceToken, Registration, TargetFilter};

type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Per-connection pragmas.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// SQLite-based storage.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database URL.
    ///
    /// A leading `sqlite:` or `sqlite://` scheme is accepted and stripped.
    pub fn new(database_url: &str, pool_size: u32) -> color_eyre::eyre::Result<Self> {
        let path = database_url
            .strip_prefix("sqlite://")
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        Self::with_pool(path, pool_size.max(1))
    }

    /// Create an isolated in-memory database.
    ///
    /// Uses a single pooled connection, since every SQLite `:memory:`
    /// connection is its own database. Migrations are applied.
    pub fn in_memory() -> color_eyre::eyre::Result<Self> {
        let storage = Self::with_pool(":memory:", 1)?;
        storage.run_migrations()?;
        Ok(storage)
    }

    fn with_pool(path: &str, max_size: u32) -> color_eyre::eyre::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(path);
        let pool = Pool::builder()
            .max_size(max_size)
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)
            .wrap_err("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Run migrations.
    pub fn run_migrations(&self) -> color_eyre::eyre::Result<()> {
        use diesel_migrations::MigrationHarness as _;

        let mut conn = self
            .pool
            .get()
            .wrap_err("failed to get connection for migrations")?;

        conn.run_pending_migrations(crate::MIGRATIONS)
            .map_err(|e| color_eyre::eyre::eyre!("migration failed: {}", e))?;

        Ok(())
    }

    fn conn(
        &self,
    ) -> color_eyre::eyre::Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>>
    {
        self.pool
            .get()
            .wrap_err("failed to get database connection")
    }
}

impl TokenRegistry for SqliteStorage {
    fn upsert(
        &self,
        registration: &Registration,
        seen_at: chrono::DateTime<chrono::Utc>,
    ) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let now = seen_at.naive_utc();
        let device_info = registration.device_info.as_ref().map(|v| v.to_string());

        let new_token = NewDeviceToken {
            token: &registration.token,
            platform: registration.platform.as_str(),
            user_id: registration.user_id.as_deref(),
            device_info: device_info.as_deref(),
            app_version: registration.app_version.as_deref(),
            is_active: true,
            last_used_at: now,
            created_at: now,
            updated_at: now,
        };

        // Re-registration refreshes and reactivates; created_at is kept.
        diesel::insert_into(device_tokens::table)
            .values(&new_token)
            .on_conflict(device_tokens::token)
            .do_update()
            .set((
                device_tokens::platform.eq(registration.platform.as_str()),
                device_tokens::user_id.eq(registration.user_id.as_deref()),
                device_tokens::device_info.eq(device_info.as_deref()),
                device_tokens::app_version.eq(registration.app_version.as_deref()),
                device_tokens::is_active.eq(true),
                device_tokens::last_used_at.eq(now),
                device_tokens::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .wrap_err("failed to upsert device token")?;

        Ok(())
    }

    fn deactivate(&self, token: &str) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        let updated = diesel::update(
            device_tokens::table
                .filter(device_tokens::token.eq(token))
                .filter(device_tokens::is_active.eq(true)),
        )
        .set((
            device_tokens::is_active.eq(false),
            device_tokens::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .wrap_err("failed to deactivate device token")?;

        tracing::debug!(
            token = %herald_core::token_prefix(token),
            updated,
            "deactivated device token"
        );

        Ok(())
    }

    fn deactivate_for_user(&self, token: &str, user_id: &str) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().naive_utc();

        diesel::update(
            device_tokens::table
                .filter(device_tokens::token.eq(token))
                .filter(device_tokens::user_id.eq(user_id))
                .filter(device_tokens::is_active.eq(true)),
        )
        .set((
            device_tokens::is_active.eq(false),
            device_tokens::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .wrap_err("failed to deactivate device token for user")?;

        Ok(())
    }

    fn list_active(&self, filter: &TargetFilter) -> color_eyre::eyre::Result<Vec<String>> {
        let mut conn = self.conn()?;

        let mut query = device_tokens::table
            .filter(device_tokens::is_active.eq(true))
            .order((device_tokens::last_used_at.desc(), device_tokens::id.desc()))
            .select(device_tokens::token)
            .into_boxed();

        if let Some(platform) = filter.platform {
            query = query.filter(device_tokens::platform.eq(platform.as_str()));
        }

        if let Some(limit) = filter.limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        query
            .load::<String>(&mut conn)
            .wrap_err("failed to list active device tokens")
    }

    fn get_token(&self, token: &str) -> color_eyre::eyre::Result<Option<DeviceToken>> {
        let mut conn = self.conn()?;

        let row: Option<DeviceTokenRow> = device_tokens::table
            .filter(device_tokens::token.eq(token))
            .select(DeviceTokenRow::as_select())
            .first(&mut conn)
            .optional()
            .wrap_err("failed to get device token")?;

        row.map(DeviceToken::try_from).transpose()
    }
}

impl BroadcastLogStore for SqliteStorage {
    fn record_broadcast(&self, entry: &BroadcastEntry<'_>) -> color_eyre::eyre::Result<()> {
        let mut conn = self.conn()?;
        let data = serde_json::to_string(entry.payload.data())
            .wrap_err("failed to serialize broadcast data")?;
        let to_i32 = |n: usize| i32::try_from(n).wrap_err("broadcast count out of range");

        let new_log = NewBroadcastLog {
            notification_type: "broadcast",
            title: entry.payload.title(),
            body: entry.payload.body(),
            data: &data,
            platform: entry.platform.map(|p| p.as_str()),
            total_sent: to_i32(entry.summary.success_count)?,
            total_failed: to_i32(entry.summary.failure_count)?,
            total_tokens: to_i32(entry.summary.total_tokens)?,
            sent_by: entry.sent_by,
            created_at: chrono::Utc::now().naive_utc(),
        };

        diesel::insert_into(push_notifications_log::table)
            .values(&new_log)
            .execute(&mut conn)
            .wrap_err("failed to record broadcast")?;

        Ok(())
    }

    fn recent_broadcasts(&self, limit: usize) -> color_eyre::eyre::Result<Vec<BroadcastRecord>> {
        let mut conn = self.conn()?;

        let rows: Vec<BroadcastLogRow> = push_notifications_log::table
            .order((
                push_notifications_log::created_at.desc(),
                push_notifications_log::id.desc(),
            ))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .select(BroadcastLogRow::as_select())
            .load(&mut conn)
            .wrap_err("failed to list broadcasts")?;

        Ok(rows.into_iter().map(BroadcastRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{BroadcastSummary, NotificationPayload, Platform};

    fn at(secs: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn register(store: &SqliteStorage, token: &str, platform: &str, secs: i64) {
        let reg = Registration::new(token, platform).unwrap();
        store.upsert(&reg, at(secs)).unwrap();
    }

    #[test]
    fn test_platform_filter_orders_by_last_used() {
        let store = SqliteStorage::in_memory().unwrap();

        register(&store, "android-1", "android", 1);
        register(&store, "ios-old", "ios", 2);
        register(&store, "android-2", "android", 3);
        register(&store, "web-1", "web", 4);
        register(&store, "ios-new", "ios", 5);
        register(&store, "android-3", "android", 6);

        let filter = TargetFilter::all().with_platform(Platform::Ios);
        assert_eq!(store.list_active(&filter).unwrap(), vec!["ios-new", "ios-old"]);

        let all = store.list_active(&TargetFilter::all()).unwrap();
        assert_eq!(
            all,
            vec!["android-3", "ios-new", "web-1", "android-2", "ios-old", "android-1"]
        );
    }

    #[test]
    fn test_limit_keeps_most_recent() {
        let store = SqliteStorage::in_memory().unwrap();
        for i in 0..5 {
            register(&store, &format!("tok-{i}"), "android", i);
        }

        let filter = TargetFilter::all().with_limit(2);
        assert_eq!(store.list_active(&filter).unwrap(), vec!["tok-4", "tok-3"]);
    }

    #[test]
    fn test_reregistration_is_idempotent() {
        let store = SqliteStorage::in_memory().unwrap();

        let first = Registration::new("tok", "android")
            .unwrap()
            .with_device_info(serde_json::json!({"model": "pixel"}));
        store.upsert(&first, at(10)).unwrap();

        let second = Registration::new("tok", "ios")
            .unwrap()
            .with_device_info(serde_json::json!({"model": "iphone"}));
        store.upsert(&second, at(20)).unwrap();

        let all = store.list_active(&TargetFilter::all()).unwrap();
        assert_eq!(all, vec!["tok"]);

        let row = store.get_token("tok").unwrap().unwrap();
        assert_eq!(row.platform, Platform::Ios);
        assert_eq!(row.last_used_at, at(20));
        assert_eq!(row.created_at, at(10));
        assert_eq!(row.device_info.as_deref(), Some(r#"{"model":"iphone"}"#));
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let store = SqliteStorage::in_memory().unwrap();
        register(&store, "tok", "web", 1);

        store.deactivate("tok").unwrap();
        store.deactivate("tok").unwrap();
        store.deactivate("never-registered").unwrap();

        assert!(store.list_active(&TargetFilter::all()).unwrap().is_empty());

        // Soft delete: the row is still there.
        let row = store.get_token("tok").unwrap().unwrap();
        assert!(!row.is_active);
    }

    #[test]
    fn test_reregistration_reactivates() {
        let store = SqliteStorage::in_memory().unwrap();
        register(&store, "tok", "android", 1);
        store.deactivate("tok").unwrap();
        register(&store, "tok", "android", 2);

        assert_eq!(store.list_active(&TargetFilter::all()).unwrap(), vec!["tok"]);
    }

    #[test]
    fn test_deactivate_for_user_checks_owner() {
        let store = SqliteStorage::in_memory().unwrap();
        let reg = Registration::new("tok", "ios").unwrap().with_user("alice");
        store.upsert(&reg, at(1)).unwrap();

        store.deactivate_for_user("tok", "mallory").unwrap();
        assert_eq!(store.list_active(&TargetFilter::all()).unwrap(), vec!["tok"]);

        store.deactivate_for_user("tok", "alice").unwrap();
        assert!(store.list_active(&TargetFilter::all()).unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_log() {
        let store = SqliteStorage::in_memory().unwrap();
        let payload = NotificationPayload::new("New release", "Watch it now")
            .unwrap()
            .with_json_data(serde_json::Map::from_iter([(
                "movie_id".to_string(),
                serde_json::json!(42),
            )]))
            .unwrap();

        let summary = BroadcastSummary {
            total_tokens: 3,
            success_count: 2,
            failure_count: 1,
        };

        store
            .record_broadcast(&BroadcastEntry {
                payload: &payload,
                platform: Some(Platform::Android),
                summary,
                sent_by: Some("admin-1"),
            })
            .unwrap();

        let records = store.recent_broadcasts(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "New release");
        assert_eq!(records[0].data, r#"{"movie_id":"42"}"#);
        assert_eq!(records[0].platform.as_deref(), Some("android"));
        assert_eq!(records[0].summary, summary);
        assert_eq!(records[0].sent_by.as_deref(), Some("admin-1"));
    }

    #[test]
    fn test_file_database_with_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("herald.db").display());

        let store = SqliteStorage::new(&url, 4).unwrap();
        store.run_migrations().unwrap();
        register(&store, "tok", "android", 1);

        // A second handle on the same file sees the row.
        let reopened = SqliteStorage::new(&url, 1).unwrap();
        reopened.run_migrations().unwrap();
        assert_eq!(reopened.list_active(&TargetFilter::all()).unwrap(), vec!["tok"]);
    }
}
