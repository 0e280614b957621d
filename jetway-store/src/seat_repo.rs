use jetway_core::{CabinClass, CoreError, CoreResult};
use sqlx::{Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use crate::error::db;

/// Seat state changes that must run inside the caller's booking transaction.
pub struct SeatAllocator;

impl SeatAllocator {
    /// Flips every requested seat to unavailable or none of them.
    ///
    /// The conditional update only matches seats that are still free, so a
    /// short row count means another transaction got there first.
    pub async fn allocate(
        tx: &mut Transaction<'_, Postgres>,
        flight_id: Uuid,
        cabin: CabinClass,
        seat_ids: &[Uuid],
    ) -> CoreResult<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }

        let taken: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE seats SET is_available = FALSE \
             WHERE id = ANY($1) AND flight_id = $2 AND cabin_class = $3 AND is_available = TRUE \
             RETURNING id",
        )
        .bind(seat_ids)
        .bind(flight_id)
        .bind(cabin.as_str())
        .fetch_all(&mut **tx)
        .await
        .map_err(db)?;

        if taken.len() != seat_ids.len() {
            let lost: Vec<Uuid> = seat_ids.iter().filter(|id| !taken.contains(id)).copied().collect();
            warn!(%flight_id, seats = ?lost, "Seat allocation lost to a concurrent booking");
            return Err(CoreError::SeatAlreadyTaken(lost));
        }
        Ok(())
    }

    pub async fn release(tx: &mut Transaction<'_, Postgres>, seat_ids: &[Uuid]) -> CoreResult<()> {
        if seat_ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE seats SET is_available = TRUE WHERE id = ANY($1)")
            .bind(seat_ids)
            .execute(&mut **tx)
            .await
            .map_err(db)?;
        Ok(())
    }
}
