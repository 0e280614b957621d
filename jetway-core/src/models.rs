use chrono::{DateTime, NaiveDate, Utc};
use jetway_shared::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

use crate::pricing::PriceBreakdown;

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Airline {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Cancelled => "cancelled",
            FlightStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Ok(FlightStatus::Scheduled),
            "cancelled" => Ok(FlightStatus::Cancelled),
            "completed" => Ok(FlightStatus::Completed),
            other => Err(format!("unknown flight status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CabinClass {
    Economy,
    Business,
    #[serde(alias = "first_class")]
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 3] = [CabinClass::First, CabinClass::Business, CabinClass::Economy];

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "economy" => Ok(CabinClass::Economy),
            "business" => Ok(CabinClass::Business),
            "first" | "first_class" => Ok(CabinClass::First),
            other => Err(format!("unknown cabin class: {}", other)),
        }
    }
}

/// A scheduled departure. Fares other than economy may be missing on legacy rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub airline_id: Uuid,
    pub origin_airport_id: Uuid,
    pub destination_airport_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub economy_price: Decimal,
    pub business_price: Option<Decimal>,
    pub first_class_price: Option<Decimal>,
    pub economy_capacity: i32,
    pub business_capacity: i32,
    pub first_class_capacity: i32,
    pub aircraft_type: String,
    pub status: FlightStatus,
}

impl Flight {
    pub fn is_bookable(&self) -> bool {
        self.status == FlightStatus::Scheduled
    }
}

/// Flight with its airline and airports embedded, as the read API returns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetails {
    #[serde(flatten)]
    pub flight: Flight,
    pub airline: Airline,
    pub origin_airport: Airport,
    pub destination_airport: Airport,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub row: i32,
    pub column: String,
    pub seat_number: String,
    pub cabin_class: CabinClass,
    pub is_available: bool,
    pub price: Decimal,
}

impl Seat {
    pub fn new(flight_id: Uuid, row: i32, column: &str, cabin_class: CabinClass, price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id,
            row,
            column: column.to_string(),
            seat_number: format!("{}{}", row, column),
            cabin_class,
            is_available: true,
            price,
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// `confirmed -> cancelled` and `confirmed -> completed` are the only edges.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Identity every booking and pricing attempt is keyed on.
///
/// Token holders get `user:<sub>` or `guest:<sub>`. Callers without a token get
/// `anon:<ip>`, a namespace no token subject can reach.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    pub fn user(subject: &str) -> Self {
        Self(format!("user:{}", subject))
    }

    pub fn guest(session: &str) -> Self {
        Self(format!("guest:{}", session))
    }

    pub fn anonymous(addr: Option<IpAddr>) -> Self {
        match addr {
            Some(ip) => Self(format!("anon:{}", ip)),
            None => Self("anon:unknown".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_guest(&self) -> bool {
        self.0.starts_with("guest:")
    }
}

impl From<String> for UserKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub pnr: String,
    pub user_key: UserKey,
    pub flight_id: Uuid,
    pub cabin_class: CabinClass,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub surge_applied: bool,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub passport_number: Option<Masked<String>>,
    pub seat_id: Option<Uuid>,
}

/// A booking with its passengers. `price` is only present on the response to
/// the call that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<PriceBreakdown>,
}

impl BookingRecord {
    pub fn seat_ids(&self) -> Vec<Uuid> {
        self.passengers.iter().filter_map(|p| p.seat_id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingAttempt {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub user_key: UserKey,
    pub attempted_at: DateTime<Utc>,
}
