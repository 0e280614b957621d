use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use jetway_shared::events::BookingEvent;
use jetway_shared::Masked;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Airline, Airport, BookingRecord, CabinClass, FlightDetails, Seat, UserKey};
use crate::search::FlightSearchQuery;
use crate::CoreResult;

/// Read access to airports, airlines and flights.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>>;

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>>;

    async fn list_flights(&self) -> CoreResult<Vec<FlightDetails>>;

    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<FlightDetails>>;

    /// Unknown airport codes or an empty day yield an empty list, never an error.
    async fn search_flights(&self, query: &FlightSearchQuery) -> CoreResult<Vec<FlightDetails>>;
}

/// Read access to the seat map. Writes go through [`BookingStore`].
#[async_trait]
pub trait SeatInventory: Send + Sync {
    async fn seats_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Seat>>;

    /// Seats with the given ids, in no particular order. Unknown ids are skipped.
    async fn find_seats(&self, seat_ids: &[Uuid]) -> CoreResult<Vec<Seat>>;
}

#[derive(Debug, Clone)]
pub struct NewPassenger {
    pub id: Uuid,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub passport_number: Option<Masked<String>>,
    pub seat_id: Option<Uuid>,
}

/// Everything needed to persist a priced booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub pnr: String,
    pub user_key: UserKey,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub total_amount: Decimal,
    pub surge_applied: bool,
    pub payment_method: String,
    pub passengers: Vec<NewPassenger>,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn seat_ids(&self) -> Vec<Uuid> {
        self.passengers.iter().filter_map(|p| p.seat_id).collect()
    }
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Allocates every referenced seat, then inserts the booking (status
    /// `confirmed`, payment `paid`) and its passengers, all in one transaction.
    ///
    /// Fails with `SeatAlreadyTaken` if any seat is no longer available and with
    /// `PnrCollision` if the PNR is in use; in both cases nothing is written.
    async fn commit_booking(&self, booking: &NewBooking) -> CoreResult<BookingRecord>;

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>>;

    /// All bookings, or only those owned by `user_key`. Newest first.
    async fn list_bookings(&self, user_key: Option<&UserKey>) -> CoreResult<Vec<BookingRecord>>;

    /// Moves a `confirmed` booking to `cancelled` and releases its seats in one
    /// transaction. Returns the released seat ids, or `None` when the booking
    /// was no longer `confirmed` at write time.
    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<Option<Vec<Uuid>>>;

    /// Moves a `confirmed` booking to `completed`. Returns false when it was not `confirmed`.
    async fn complete_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<bool>;
}

/// Append-only log of booking attempts used as a sliding-window counter.
#[async_trait]
pub trait AttemptLog: Send + Sync {
    async fn record_attempt(&self, flight_id: Uuid, user_key: &UserKey, at: DateTime<Utc>) -> CoreResult<()>;

    /// Entries for the pair with `now - window <= attempted_at <= now`.
    async fn count_recent_attempts(
        &self,
        flight_id: Uuid,
        user_key: &UserKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> CoreResult<u32>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()>;
}

/// Publisher used when no broker is configured: events only reach the log.
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()> {
        tracing::info!(
            topic = event.topic(),
            booking_id = %event.booking_id(),
            "Booking event (no broker configured)"
        );
        Ok(())
    }
}
