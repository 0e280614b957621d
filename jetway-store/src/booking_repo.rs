use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use jetway_core::models::{Booking, BookingRecord, BookingStatus, Passenger, PaymentStatus, UserKey};
use jetway_core::repository::{BookingStore, NewBooking};
use jetway_core::{CoreError, CoreResult};
use jetway_shared::Masked;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{corrupt, db, is_unique_violation};
use crate::seat_repo::SeatAllocator;

const PNR_CONSTRAINT: &str = "bookings_pnr_key";

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    pnr: String,
    user_key: String,
    flight_id: Uuid,
    cabin_class: String,
    status: String,
    total_amount: Decimal,
    surge_applied: bool,
    payment_status: String,
    payment_method: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> CoreResult<Booking> {
        Ok(Booking {
            id: self.id,
            pnr: self.pnr,
            user_key: UserKey::from(self.user_key),
            flight_id: self.flight_id,
            cabin_class: self.cabin_class.parse().map_err(|e| corrupt("bookings", e))?,
            status: self.status.parse().map_err(|e| corrupt("bookings", e))?,
            total_amount: self.total_amount,
            surge_applied: self.surge_applied,
            payment_status: self.payment_status.parse().map_err(|e| corrupt("bookings", e))?,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: Uuid,
    booking_id: Uuid,
    title: String,
    first_name: String,
    last_name: String,
    date_of_birth: NaiveDate,
    passport_number: Option<String>,
    seat_id: Option<Uuid>,
}

impl From<PassengerRow> for Passenger {
    fn from(row: PassengerRow) -> Self {
        Passenger {
            id: row.id,
            booking_id: row.booking_id,
            title: row.title,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            passport_number: row.passport_number.map(Masked::new),
            seat_id: row.seat_id,
        }
    }
}

const BOOKING_COLUMNS: &str = "id, pnr, user_key, flight_id, cabin_class, status, total_amount, surge_applied, \
     payment_status, payment_method, created_at, updated_at";

impl PgBookingStore {
    async fn insert(tx: &mut Transaction<'_, Postgres>, new: &NewBooking) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO bookings (id, pnr, user_key, flight_id, cabin_class, status, total_amount, \
             surge_applied, payment_status, payment_method, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)",
        )
        .bind(new.id)
        .bind(&new.pnr)
        .bind(new.user_key.as_str())
        .bind(new.flight_id)
        .bind(new.cabin_class.as_str())
        .bind(BookingStatus::Confirmed.as_str())
        .bind(new.total_amount)
        .bind(new.surge_applied)
        .bind(PaymentStatus::Paid.as_str())
        .bind(&new.payment_method)
        .bind(new.created_at)
        .execute(&mut **tx)
        .await?;

        for p in &new.passengers {
            sqlx::query(
                "INSERT INTO passengers (id, booking_id, title, first_name, last_name, date_of_birth, \
                 passport_number, seat_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(p.id)
            .bind(new.id)
            .bind(&p.title)
            .bind(&p.first_name)
            .bind(&p.last_name)
            .bind(p.date_of_birth)
            .bind(p.passport_number.as_ref().map(|n| n.expose().as_str()))
            .bind(p.seat_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn attach_passengers(&self, bookings: Vec<Booking>) -> CoreResult<Vec<BookingRecord>> {
        let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let rows: Vec<PassengerRow> = sqlx::query_as(
            "SELECT id, booking_id, title, first_name, last_name, date_of_birth, passport_number, seat_id \
             FROM passengers WHERE booking_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut by_booking: HashMap<Uuid, Vec<Passenger>> = HashMap::new();
        for row in rows {
            by_booking.entry(row.booking_id).or_default().push(row.into());
        }

        Ok(bookings
            .into_iter()
            .map(|booking| BookingRecord {
                passengers: by_booking.remove(&booking.id).unwrap_or_default(),
                booking,
                price: None,
            })
            .collect())
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn commit_booking(&self, new: &NewBooking) -> CoreResult<BookingRecord> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        // Dropping `tx` on any early return rolls everything back.
        SeatAllocator::allocate(&mut tx, new.flight_id, new.cabin_class, &new.seat_ids()).await?;

        if let Err(e) = Self::insert(&mut tx, new).await {
            if is_unique_violation(&e, PNR_CONSTRAINT) {
                return Err(CoreError::PnrCollision(new.pnr.clone()));
            }
            return Err(db(e));
        }

        tx.commit().await.map_err(db)?;

        self.get_booking(new.id)
            .await?
            .ok_or(CoreError::BookingNotFound(new.id))
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut records = self.attach_passengers(vec![row.into_booking()?]).await?;
        Ok(records.pop())
    }

    async fn list_bookings(&self, user_key: Option<&UserKey>) -> CoreResult<Vec<BookingRecord>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE ($1::TEXT IS NULL OR user_key = $1) ORDER BY created_at DESC",
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(user_key.map(|k| k.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        let bookings = rows.into_iter().map(BookingRow::into_booking).collect::<CoreResult<Vec<_>>>()?;
        self.attach_passengers(bookings).await
    }

    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<Option<Vec<Uuid>>> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let updated = sqlx::query(
            "UPDATE bookings SET status = $1, payment_status = $2, updated_at = $3 \
             WHERE id = $4 AND status = $5",
        )
        .bind(BookingStatus::Cancelled.as_str())
        .bind(PaymentStatus::Refunded.as_str())
        .bind(at)
        .bind(id)
        .bind(BookingStatus::Confirmed.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let seat_ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT seat_id FROM passengers WHERE booking_id = $1 AND seat_id IS NOT NULL")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .map_err(db)?;

        SeatAllocator::release(&mut tx, &seat_ids).await?;
        tx.commit().await.map_err(db)?;
        Ok(Some(seat_ids))
    }

    async fn complete_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<bool> {
        let updated = sqlx::query("UPDATE bookings SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
            .bind(BookingStatus::Completed.as_str())
            .bind(at)
            .bind(id)
            .bind(BookingStatus::Confirmed.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(updated.rows_affected() == 1)
    }
}
