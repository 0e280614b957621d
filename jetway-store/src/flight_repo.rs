use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jetway_core::models::{Airline, Airport, CabinClass, Flight, FlightDetails, FlightStatus, Seat};
use jetway_core::repository::{FlightCatalog, SeatInventory};
use jetway_core::search::FlightSearchQuery;
use jetway_core::CoreResult;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{corrupt, db};

pub struct PgFlightCatalog {
    pool: PgPool,
}

impl PgFlightCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FLIGHT_SELECT: &str = r#"
    SELECT
        f.id, f.flight_number, f.airline_id, f.origin_airport_id, f.destination_airport_id,
        f.departure_time, f.arrival_time, f.economy_price, f.business_price, f.first_class_price,
        f.economy_capacity, f.business_capacity, f.first_class_capacity, f.aircraft_type, f.status,
        a.code AS airline_code, a.name AS airline_name, a.logo_url AS airline_logo_url,
        o.code AS origin_code, o.name AS origin_name, o.city AS origin_city,
        o.country AS origin_country, o.timezone AS origin_timezone,
        d.code AS destination_code, d.name AS destination_name, d.city AS destination_city,
        d.country AS destination_country, d.timezone AS destination_timezone
    FROM flights f
    JOIN airlines a ON a.id = f.airline_id
    JOIN airports o ON o.id = f.origin_airport_id
    JOIN airports d ON d.id = f.destination_airport_id
"#;

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    flight_number: String,
    airline_id: Uuid,
    origin_airport_id: Uuid,
    destination_airport_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    economy_price: Decimal,
    business_price: Option<Decimal>,
    first_class_price: Option<Decimal>,
    economy_capacity: i32,
    business_capacity: i32,
    first_class_capacity: i32,
    aircraft_type: String,
    status: String,
    airline_code: String,
    airline_name: String,
    airline_logo_url: Option<String>,
    origin_code: String,
    origin_name: String,
    origin_city: String,
    origin_country: String,
    origin_timezone: Option<String>,
    destination_code: String,
    destination_name: String,
    destination_city: String,
    destination_country: String,
    destination_timezone: Option<String>,
}

impl FlightRow {
    fn into_details(self) -> CoreResult<FlightDetails> {
        let status: FlightStatus = self.status.parse().map_err(|e| corrupt("flights", e))?;
        Ok(FlightDetails {
            airline: Airline {
                id: self.airline_id,
                code: self.airline_code,
                name: self.airline_name,
                logo_url: self.airline_logo_url,
            },
            origin_airport: Airport {
                id: self.origin_airport_id,
                code: self.origin_code,
                name: self.origin_name,
                city: self.origin_city,
                country: self.origin_country,
                timezone: self.origin_timezone,
            },
            destination_airport: Airport {
                id: self.destination_airport_id,
                code: self.destination_code,
                name: self.destination_name,
                city: self.destination_city,
                country: self.destination_country,
                timezone: self.destination_timezone,
            },
            flight: Flight {
                id: self.id,
                flight_number: self.flight_number,
                airline_id: self.airline_id,
                origin_airport_id: self.origin_airport_id,
                destination_airport_id: self.destination_airport_id,
                departure_time: self.departure_time,
                arrival_time: self.arrival_time,
                economy_price: self.economy_price,
                business_price: self.business_price,
                first_class_price: self.first_class_price,
                economy_capacity: self.economy_capacity,
                business_capacity: self.business_capacity,
                first_class_capacity: self.first_class_capacity,
                aircraft_type: self.aircraft_type,
                status,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SeatRow {
    id: Uuid,
    flight_id: Uuid,
    seat_row: i32,
    seat_column: String,
    seat_number: String,
    cabin_class: String,
    is_available: bool,
    price: Decimal,
}

impl SeatRow {
    pub(crate) fn into_seat(self) -> CoreResult<Seat> {
        let cabin_class: CabinClass = self.cabin_class.parse().map_err(|e| corrupt("seats", e))?;
        Ok(Seat {
            id: self.id,
            flight_id: self.flight_id,
            row: self.seat_row,
            column: self.seat_column,
            seat_number: self.seat_number,
            cabin_class,
            is_available: self.is_available,
            price: self.price,
        })
    }
}

#[async_trait]
impl FlightCatalog for PgFlightCatalog {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, String, String, Option<String>)>(
            "SELECT id, code, name, city, country, timezone FROM airports ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name, city, country, timezone)| Airport {
                id,
                code,
                name,
                city,
                country,
                timezone,
            })
            .collect())
    }

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, Option<String>)>(
            "SELECT id, code, name, logo_url FROM airlines ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name, logo_url)| Airline { id, code, name, logo_url })
            .collect())
    }

    async fn list_flights(&self) -> CoreResult<Vec<FlightDetails>> {
        let sql = format!("{} ORDER BY f.departure_time", FLIGHT_SELECT);
        let rows: Vec<FlightRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await.map_err(db)?;
        rows.into_iter().map(FlightRow::into_details).collect()
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<FlightDetails>> {
        let sql = format!("{} WHERE f.id = $1", FLIGHT_SELECT);
        let row: Option<FlightRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(FlightRow::into_details).transpose()
    }

    async fn search_flights(&self, query: &FlightSearchQuery) -> CoreResult<Vec<FlightDetails>> {
        let (start, end) = query.departure_window();
        let sql = format!(
            "{} WHERE UPPER(o.code) = UPPER($1) AND UPPER(d.code) = UPPER($2) \
             AND f.departure_time >= $3 AND f.departure_time < $4 \
             ORDER BY f.departure_time",
            FLIGHT_SELECT
        );
        let rows: Vec<FlightRow> = sqlx::query_as(&sql)
            .bind(query.origin.trim())
            .bind(query.destination.trim())
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(FlightRow::into_details).collect()
    }
}

#[async_trait]
impl SeatInventory for PgFlightCatalog {
    async fn seats_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Seat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT id, flight_id, seat_row, seat_column, seat_number, cabin_class, is_available, price \
             FROM seats WHERE flight_id = $1 ORDER BY seat_row, seat_column",
        )
        .bind(flight_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        rows.into_iter().map(SeatRow::into_seat).collect()
    }

    async fn find_seats(&self, seat_ids: &[Uuid]) -> CoreResult<Vec<Seat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            "SELECT id, flight_id, seat_row, seat_column, seat_number, cabin_class, is_available, price \
             FROM seats WHERE id = ANY($1)",
        )
        .bind(seat_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;
        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}
