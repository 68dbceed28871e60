//! Postgres implementation of the EventStore trait

use crate::{EventInfo, EventRecord, EventStore, EventStoreError};
use async_trait::async_trait;
use chrono::Utc;
use event_bus::EntityKind;
use sqlx::PgPool;

/// Production event store over sqlx/Postgres
///
/// One table holds every record; the primary key `(pk, sk)` carries the
/// partition/sort scheme and `(email, event_type, created_at)` is indexed
/// for the customer queries. Expiry is enforced at query time — expired
/// rows are invisible even before the sweep removes them.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the events table and its secondary index if absent.
    ///
    /// The orders and products services share this table inside one
    /// database, so the store owns its schema instead of hooking into
    /// either service's migration history.
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                pk          TEXT   NOT NULL,
                sk          TEXT   NOT NULL,
                ttl         BIGINT NOT NULL,
                email       TEXT   NOT NULL,
                created_at  BIGINT NOT NULL,
                request_id  TEXT   NOT NULL,
                event_type  TEXT   NOT NULL,
                info        JSONB  NOT NULL,
                PRIMARY KEY (pk, sk)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS events_email_event_type_idx
            ON events (email, event_type, created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        Ok(())
    }

    /// Delete rows whose ttl has passed. Queries already exclude them; the
    /// sweep only reclaims space and can run on any cadence.
    pub async fn sweep_expired(&self) -> Result<u64, EventStoreError> {
        let now_secs = Utc::now().timestamp();
        let result = sqlx::query("DELETE FROM events WHERE ttl < $1")
            .bind(now_secs)
            .execute(&self.pool)
            .await
            .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    pk: String,
    sk: String,
    ttl: i64,
    email: String,
    created_at: i64,
    request_id: String,
    event_type: String,
    info: serde_json::Value,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = EventStoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let info: EventInfo = serde_json::from_value(row.info)
            .map_err(|e| EventStoreError::Serialization(e.to_string()))?;
        Ok(EventRecord {
            pk: row.pk,
            sk: row.sk,
            ttl: row.ttl,
            email: row.email,
            created_at: row.created_at,
            request_id: row.request_id,
            event_type: row.event_type,
            info,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, record: EventRecord) -> Result<EventRecord, EventStoreError> {
        let info = serde_json::to_value(&record.info)
            .map_err(|e| EventStoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO events (pk, sk, ttl, email, created_at, request_id, event_type, info)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (pk, sk) DO UPDATE
            SET ttl = EXCLUDED.ttl,
                email = EXCLUDED.email,
                created_at = EXCLUDED.created_at,
                request_id = EXCLUDED.request_id,
                event_type = EXCLUDED.event_type,
                info = EXCLUDED.info
            "#,
        )
        .bind(&record.pk)
        .bind(&record.sk)
        .bind(record.ttl)
        .bind(&record.email)
        .bind(record.created_at)
        .bind(&record.request_id)
        .bind(&record.event_type)
        .bind(info)
        .execute(&self.pool)
        .await
        .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        Ok(record)
    }

    async fn query_by_entity(
        &self,
        kind: EntityKind,
        subject_id: &str,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let pk = EventRecord::partition_key(kind, subject_id);
        let now_secs = Utc::now().timestamp();

        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT pk, sk, ttl, email, created_at, request_id, event_type, info
            FROM events
            WHERE pk = $1 AND ttl >= $2
            ORDER BY sk ASC
            "#,
        )
        .bind(&pk)
        .bind(now_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    async fn query_by_customer(
        &self,
        email: &str,
        event_type_prefix: Option<&str>,
    ) -> Result<Vec<EventRecord>, EventStoreError> {
        let pattern = match event_type_prefix {
            Some(prefix) => format!("{prefix}%"),
            None => "%".to_string(),
        };
        let now_secs = Utc::now().timestamp();

        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT pk, sk, ttl, email, created_at, request_id, event_type, info
            FROM events
            WHERE email = $1 AND event_type LIKE $2 AND ttl >= $3
            ORDER BY event_type ASC, created_at ASC
            "#,
        )
        .bind(email)
        .bind(&pattern)
        .bind(now_secs)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EventStoreError::Unavailable(e.to_string()))?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }
}
