use crate::ads::{AnalyticsEvent, EventKind};
use crate::storage::{EventFilter, EventStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

pub struct SqliteEventStore {
    pool: Arc<SqlitePool>,
}

impl SqliteEventStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    event: String,
    ad_id: String,
    ad_type: String,
    timestamp: i64,
    user_agent: String,
    url: String,
    referrer: Option<String>,
    screen_resolution: Option<String>,
    viewport_size: Option<String>,
}

impl TryFrom<EventRow> for AnalyticsEvent {
    type Error = anyhow::Error;

    fn try_from(row: EventRow) -> Result<Self> {
        let event = row
            .event
            .parse::<EventKind>()
            .with_context(|| format!("corrupt event row for ad '{}'", row.ad_id))?;

        Ok(AnalyticsEvent {
            event,
            ad_id: row.ad_id,
            ad_type: row.ad_type,
            timestamp: row.timestamp,
            user_agent: row.user_agent,
            url: row.url,
            referrer: row.referrer,
            screen_resolution: row.screen_resolution,
            viewport_size: row.viewport_size,
        })
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ad_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event TEXT NOT NULL,
                ad_id TEXT NOT NULL,
                ad_type TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                user_agent TEXT NOT NULL,
                url TEXT NOT NULL,
                referrer TEXT,
                screen_resolution TEXT,
                viewport_size TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_events_timestamp ON ad_events(timestamp)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ad_events_ad_id ON ad_events(ad_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn insert(&self, event: &AnalyticsEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ad_events (
                event, ad_id, ad_type, timestamp, user_agent, url,
                referrer, screen_resolution, viewport_size
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.event.as_str())
        .bind(&event.ad_id)
        .bind(&event.ad_type)
        .bind(event.timestamp)
        .bind(&event.user_agent)
        .bind(&event.url)
        .bind(&event.referrer)
        .bind(&event.screen_resolution)
        .bind(&event.viewport_size)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<AnalyticsEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT event, ad_id, ad_type, timestamp, user_agent, url,
                   referrer, screen_resolution, viewport_size
            FROM ad_events
            WHERE timestamp >= ?
              AND (? IS NULL OR ad_id = ?)
              AND (? IS NULL OR ad_type = ?)
            ORDER BY id ASC
            "#,
        )
        .bind(filter.since_ms)
        .bind(filter.ad_id.as_deref())
        .bind(filter.ad_id.as_deref())
        .bind(filter.ad_type.as_deref())
        .bind(filter.ad_type.as_deref())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(AnalyticsEvent::try_from).collect()
    }
}
