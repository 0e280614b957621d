use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jetway_core::models::UserKey;
use jetway_core::repository::AttemptLog;
use jetway_core::CoreResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::db;

pub struct PgAttemptLog {
    pool: PgPool,
}

impl PgAttemptLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptLog for PgAttemptLog {
    async fn record_attempt(&self, flight_id: Uuid, user_key: &UserKey, at: DateTime<Utc>) -> CoreResult<()> {
        sqlx::query("INSERT INTO pricing_attempts (id, flight_id, user_key, attempted_at) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(flight_id)
            .bind(user_key.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }

    async fn count_recent_attempts(
        &self,
        flight_id: Uuid,
        user_key: &UserKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pricing_attempts \
             WHERE flight_id = $1 AND user_key = $2 AND attempted_at >= $3 AND attempted_at <= $4",
        )
        .bind(flight_id)
        .bind(user_key.as_str())
        .bind(now - window)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
