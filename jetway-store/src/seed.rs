use chrono::{Duration, NaiveDate, NaiveTime};
use jetway_core::memory::InMemoryStore;
use jetway_core::models::{Airline, Airport, CabinClass, Flight, FlightStatus, Seat};
use jetway_core::seats::{build_seat_map, standard_layout};
use jetway_core::CoreResult;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::db;

/// Demo network: every ordered airport pair gets two daily departures.
pub struct DemoCatalog {
    pub airports: Vec<Airport>,
    pub airlines: Vec<Airline>,
    pub flights: Vec<(Flight, Vec<Seat>)>,
}

const AIRPORTS: [(&str, &str, &str, &str, &str); 5] = [
    ("BOM", "Chhatrapati Shivaji", "Mumbai", "India", "Asia/Kolkata"),
    ("DEL", "Indira Gandhi", "Delhi", "India", "Asia/Kolkata"),
    ("BLR", "Kempegowda", "Bangalore", "India", "Asia/Kolkata"),
    ("JFK", "John F. Kennedy", "New York", "USA", "America/New_York"),
    ("LHR", "Heathrow", "London", "United Kingdom", "Europe/London"),
];

const AIRLINES: [(&str, &str); 3] = [("AI", "Air India"), ("6E", "IndiGo"), ("EK", "Emirates")];

const DEPARTURE_HOURS: [u32; 2] = [10, 18];

pub fn demo_catalog(first_day: NaiveDate, days: u32) -> DemoCatalog {
    let airports: Vec<Airport> = AIRPORTS
        .iter()
        .map(|(code, name, city, country, tz)| Airport {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            timezone: Some(tz.to_string()),
        })
        .collect();
    let airlines: Vec<Airline> = AIRLINES
        .iter()
        .map(|(code, name)| Airline {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: name.to_string(),
            logo_url: None,
        })
        .collect();

    let layout = standard_layout();
    let capacity = |cabin: CabinClass| layout.iter().filter(|c| c.cabin == cabin).map(|c| c.capacity()).sum::<i32>();

    let mut flights = Vec::new();
    for day in 0..days {
        let date = first_day + Duration::days(i64::from(day));
        for (o, origin) in airports.iter().enumerate() {
            for (d, destination) in airports.iter().enumerate() {
                if o == d {
                    continue;
                }
                for (slot, hour) in DEPARTURE_HOURS.iter().enumerate() {
                    let airline = &airlines[(o + d + slot) % airlines.len()];
                    let Some(time) = NaiveTime::from_hms_opt(*hour, 0, 0) else {
                        continue;
                    };
                    let departure = date.and_time(time).and_utc();
                    let economy = Decimal::from(4000 + 250 * (o + d) as i64 + 500 * slot as i64);
                    let flight = Flight {
                        id: Uuid::new_v4(),
                        flight_number: format!("{}{}{}{}", airline.code, o + 1, d + 1, 100 + slot),
                        airline_id: airline.id,
                        origin_airport_id: origin.id,
                        destination_airport_id: destination.id,
                        departure_time: departure,
                        arrival_time: departure + Duration::hours(4),
                        economy_price: economy,
                        business_price: Some(Decimal::from(15000)),
                        first_class_price: Some(Decimal::from(35000)),
                        economy_capacity: capacity(CabinClass::Economy),
                        business_capacity: capacity(CabinClass::Business),
                        first_class_capacity: capacity(CabinClass::First),
                        aircraft_type: "Boeing 737".to_string(),
                        status: FlightStatus::Scheduled,
                    };
                    let seats = build_seat_map(flight.id, &layout);
                    flights.push((flight, seats));
                }
            }
        }
    }

    DemoCatalog {
        airports,
        airlines,
        flights,
    }
}

pub fn seed_memory(store: &InMemoryStore, catalog: DemoCatalog) {
    for airport in catalog.airports {
        store.insert_airport(airport);
    }
    for airline in catalog.airlines {
        store.insert_airline(airline);
    }
    let count = catalog.flights.len();
    for (flight, seats) in catalog.flights {
        store.add_flight(flight, seats);
    }
    info!(flights = count, "Seeded in-memory catalog");
}

/// Loads the catalog unless flights already exist. Returns the number of flights inserted.
pub async fn seed_postgres(pool: &PgPool, catalog: DemoCatalog) -> CoreResult<usize> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flights")
        .fetch_one(pool)
        .await
        .map_err(db)?;
    if existing > 0 {
        info!(existing, "Flights present, skipping seed");
        return Ok(0);
    }

    let mut tx = pool.begin().await.map_err(db)?;
    // Codes may already exist from an earlier run; keep their ids.
    let mut ids: HashMap<Uuid, Uuid> = HashMap::new();

    for a in &catalog.airports {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO airports (id, code, name, city, country, timezone) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name RETURNING id",
        )
        .bind(a.id)
        .bind(&a.code)
        .bind(&a.name)
        .bind(&a.city)
        .bind(&a.country)
        .bind(&a.timezone)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        ids.insert(a.id, id);
    }

    for a in &catalog.airlines {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO airlines (id, code, name, logo_url) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name RETURNING id",
        )
        .bind(a.id)
        .bind(&a.code)
        .bind(&a.name)
        .bind(&a.logo_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        ids.insert(a.id, id);
    }

    let remap = |id: Uuid| ids.get(&id).copied().unwrap_or(id);
    let count = catalog.flights.len();

    for (f, seats) in &catalog.flights {
        sqlx::query(
            "INSERT INTO flights (id, flight_number, airline_id, origin_airport_id, destination_airport_id, \
             departure_time, arrival_time, economy_price, business_price, first_class_price, economy_capacity, \
             business_capacity, first_class_capacity, aircraft_type, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (flight_number, departure_time) DO NOTHING",
        )
        .bind(f.id)
        .bind(&f.flight_number)
        .bind(remap(f.airline_id))
        .bind(remap(f.origin_airport_id))
        .bind(remap(f.destination_airport_id))
        .bind(f.departure_time)
        .bind(f.arrival_time)
        .bind(f.economy_price)
        .bind(f.business_price)
        .bind(f.first_class_price)
        .bind(f.economy_capacity)
        .bind(f.business_capacity)
        .bind(f.first_class_capacity)
        .bind(&f.aircraft_type)
        .bind(f.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        for s in seats {
            sqlx::query(
                "INSERT INTO seats (id, flight_id, seat_row, seat_column, seat_number, cabin_class, is_available, price) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (flight_id, seat_number) DO NOTHING",
            )
            .bind(s.id)
            .bind(s.flight_id)
            .bind(s.row)
            .bind(&s.column)
            .bind(&s.seat_number)
            .bind(s.cabin_class.as_str())
            .bind(s.is_available)
            .bind(s.price)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }
    }

    tx.commit().await.map_err(db)?;
    info!(flights = count, "Seeded demo catalog");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jetway_core::repository::{FlightCatalog, SeatInventory};
    use jetway_core::search::FlightSearchQuery;

    #[test]
    fn test_demo_catalog_shape() {
        let day = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let catalog = demo_catalog(day, 2);
        // 5 airports -> 20 ordered pairs, two departures each, two days
        assert_eq!(catalog.flights.len(), 80);
        for (flight, seats) in &catalog.flights {
            assert_ne!(flight.origin_airport_id, flight.destination_airport_id);
            assert_eq!(seats.len(), 80);
            assert!(seats.iter().all(|s| s.flight_id == flight.id));
        }
        let numbers: std::collections::HashSet<_> = catalog
            .flights
            .iter()
            .map(|(f, _)| (f.flight_number.clone(), f.departure_time))
            .collect();
        assert_eq!(numbers.len(), catalog.flights.len());
    }

    #[tokio::test]
    async fn test_seed_memory_is_searchable() {
        let day = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        let store = InMemoryStore::new();
        seed_memory(&store, demo_catalog(day, 1));

        assert_eq!(store.list_airports().await.unwrap().len(), 5);
        let query = FlightSearchQuery {
            origin: "BOM".into(),
            destination: "DEL".into(),
            date: day,
        };
        let found = store.search_flights(&query).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].flight.aircraft_type, "Boeing 737");
        assert_eq!(found[0].origin_airport.city, "Mumbai");

        let seats = store.seats_for_flight(found[0].flight.id).await.unwrap();
        assert_eq!(seats.len(), 80);
    }
}
