//! Persistent registry-payload cache — one SQLite table keyed by registry
//! ID (spec §6). Migration is an idempotent `CREATE TABLE IF NOT EXISTS`
//! run at construction, grounded on `original_source/ares_vr_client.py`'s
//! `ensure_ares_cache_schema`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::UboResult;

/// What the client found the last time it fetched `ico`, as stored.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    /// A successful 200 response body, verbatim.
    Ok(String),
    /// A definitive-absence response (HTTP 400/404), never retried on hit.
    Error { message: String },
}

pub struct RegistryCache {
    pool: SqlitePool,
}

impl RegistryCache {
    /// Opens (creating if necessary) the cache database at `path` and
    /// runs the idempotent schema migration.
    pub async fn open(path: &str) -> UboResult<Self> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        let cache = Self { pool };
        cache.migrate().await?;
        Ok(cache)
    }

    async fn migrate(&self) -> UboResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ares_vr_cache (
                ico TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                is_error INTEGER NOT NULL DEFAULT 0,
                fetched_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ares_vr_cache_fetched_at ON ares_vr_cache(fetched_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns the cached row for `ico`, if any. Reads do not block on a
    /// concurrent write once that write's transaction has committed.
    pub async fn get(&self, ico: &str) -> UboResult<Option<CachedPayload>> {
        let row = sqlx::query("SELECT payload, is_error FROM ares_vr_cache WHERE ico = ?")
            .bind(ico)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let payload: String = r.get("payload");
            let is_error: i64 = r.get("is_error");
            if is_error != 0 {
                CachedPayload::Error { message: payload }
            } else {
                CachedPayload::Ok(payload)
            }
        }))
    }

    /// Atomically upserts the payload for `ico`, stamping the fetch time.
    pub async fn put(&self, ico: &str, payload: &CachedPayload, fetched_at: DateTime<Utc>) -> UboResult<()> {
        let (body, is_error): (&str, i64) = match payload {
            CachedPayload::Ok(s) => (s.as_str(), 0),
            CachedPayload::Error { message } => (message.as_str(), 1),
        };

        sqlx::query(
            r#"
            INSERT INTO ares_vr_cache(ico, payload, is_error, fetched_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(ico) DO UPDATE SET
                payload = excluded.payload,
                is_error = excluded.is_error,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(ico)
        .bind(body)
        .bind(is_error)
        .bind(fetched_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_cache() -> RegistryCache {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let cache = RegistryCache { pool };
        cache.migrate().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn round_trips_ok_payload() {
        let cache = memory_cache().await;
        assert!(cache.get("00000001").await.unwrap().is_none());

        cache
            .put("00000001", &CachedPayload::Ok("{}".into()), Utc::now())
            .await
            .unwrap();

        assert_eq!(
            cache.get("00000001").await.unwrap(),
            Some(CachedPayload::Ok("{}".into()))
        );
    }

    #[tokio::test]
    async fn upsert_overwrites_previous_row() {
        let cache = memory_cache().await;
        cache
            .put("00000001", &CachedPayload::Ok("{\"a\":1}".into()), Utc::now())
            .await
            .unwrap();
        cache
            .put(
                "00000001",
                &CachedPayload::Error { message: "HTTP 404".into() },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(
            cache.get("00000001").await.unwrap(),
            Some(CachedPayload::Error { message: "HTTP 404".into() })
        );
    }
}
