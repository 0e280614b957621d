use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOPIC_BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const TOPIC_BOOKING_CANCELLED: &str = "booking.cancelled";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub pnr: String,
    pub flight_id: Uuid,
    pub user_key: String,
    pub seat_ids: Vec<Uuid>,
    pub total_amount: Decimal,
    pub surge_applied: bool,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub pnr: String,
    pub flight_id: Uuid,
    pub released_seat_ids: Vec<Uuid>,
    pub cancelled_at: DateTime<Utc>,
}

/// Pushed to seat-map subscribers whenever seats flip availability.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailabilityChanged {
    pub flight_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub is_available: bool,
    pub changed_at: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
}

impl BookingEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            BookingEvent::BookingConfirmed(_) => TOPIC_BOOKING_CONFIRMED,
            BookingEvent::BookingCancelled(_) => TOPIC_BOOKING_CANCELLED,
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::BookingConfirmed(e) => e.booking_id,
            BookingEvent::BookingCancelled(e) => e.booking_id,
        }
    }

    /// The seat-map change this event implies.
    pub fn seat_change(&self) -> SeatAvailabilityChanged {
        match self {
            BookingEvent::BookingConfirmed(e) => SeatAvailabilityChanged {
                flight_id: e.flight_id,
                seat_ids: e.seat_ids.clone(),
                is_available: false,
                changed_at: e.confirmed_at.timestamp(),
            },
            BookingEvent::BookingCancelled(e) => SeatAvailabilityChanged {
                flight_id: e.flight_id,
                seat_ids: e.released_seat_ids.clone(),
                is_available: true,
                changed_at: e.cancelled_at.timestamp(),
            },
        }
    }
}
