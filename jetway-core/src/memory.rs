use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jetway_shared::events::BookingEvent;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Airline, Airport, Booking, BookingRecord, BookingStatus, CabinClass, Flight, FlightDetails, FlightStatus,
    Passenger, PaymentStatus, PricingAttempt, Seat, UserKey,
};
use crate::repository::{AttemptLog, BookingStore, EventPublisher, FlightCatalog, NewBooking, SeatInventory};
use crate::search::FlightSearchQuery;
use crate::seats::{allocate_all, build_seat_map, release_all, standard_layout};
use crate::{CoreError, CoreResult};

#[derive(Default)]
struct MemoryState {
    airports: Vec<Airport>,
    airlines: Vec<Airline>,
    flights: HashMap<Uuid, Flight>,
    seats: HashMap<Uuid, Seat>,
    bookings: HashMap<Uuid, Booking>,
    passengers: Vec<Passenger>,
    attempts: Vec<PricingAttempt>,
}

impl MemoryState {
    fn details(&self, flight: &Flight) -> Option<FlightDetails> {
        let airline = self.airlines.iter().find(|a| a.id == flight.airline_id)?;
        let origin = self.airports.iter().find(|a| a.id == flight.origin_airport_id)?;
        let destination = self.airports.iter().find(|a| a.id == flight.destination_airport_id)?;
        Some(FlightDetails {
            flight: flight.clone(),
            airline: airline.clone(),
            origin_airport: origin.clone(),
            destination_airport: destination.clone(),
        })
    }

    fn record(&self, booking: &Booking) -> BookingRecord {
        BookingRecord {
            booking: booking.clone(),
            passengers: self
                .passengers
                .iter()
                .filter(|p| p.booking_id == booking.id)
                .cloned()
                .collect(),
            price: None,
        }
    }
}

/// Process-local implementation of every repository trait.
///
/// One mutex guards all tables, so seat allocation and booking insertion are a
/// single critical section, matching the transactional guarantees of the SQL store.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the existing id when the code is already known.
    pub fn add_airport(&self, code: &str, name: &str, city: &str, country: &str) -> Uuid {
        let mut state = self.state();
        if let Some(existing) = state.airports.iter().find(|a| a.code == code) {
            return existing.id;
        }
        let id = Uuid::new_v4();
        state.airports.push(Airport {
            id,
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            country: country.to_string(),
            timezone: None,
        });
        id
    }

    pub fn add_airline(&self, code: &str, name: &str) -> Uuid {
        let mut state = self.state();
        if let Some(existing) = state.airlines.iter().find(|a| a.code == code) {
            return existing.id;
        }
        let id = Uuid::new_v4();
        state.airlines.push(Airline {
            id,
            code: code.to_string(),
            name: name.to_string(),
            logo_url: None,
        });
        id
    }

    pub fn insert_airport(&self, airport: Airport) {
        let mut state = self.state();
        state.airports.retain(|a| a.code != airport.code);
        state.airports.push(airport);
    }

    pub fn insert_airline(&self, airline: Airline) {
        let mut state = self.state();
        state.airlines.retain(|a| a.code != airline.code);
        state.airlines.push(airline);
    }

    pub fn add_flight(&self, flight: Flight, seats: Vec<Seat>) {
        let mut state = self.state();
        for seat in seats {
            state.seats.insert(seat.id, seat);
        }
        state.flights.insert(flight.id, flight);
    }

    /// Scheduled flight departing tomorrow at 10:00 UTC with the standard seat map.
    pub fn add_demo_flight(&self, number: &str, origin: &str, destination: &str, economy_price: Decimal) -> Uuid {
        let departure = (Utc::now() + Duration::days(1))
            .date_naive()
            .and_hms_opt(10, 0, 0)
            .unwrap_or_default()
            .and_utc();
        self.add_flight_departing(number, origin, destination, economy_price, departure)
    }

    pub fn add_flight_departing(
        &self,
        number: &str,
        origin: &str,
        destination: &str,
        economy_price: Decimal,
        departure_time: DateTime<Utc>,
    ) -> Uuid {
        let airline_id = self.add_airline("JW", "Jetway Airlines");
        let origin_id = self.add_airport(origin, origin, origin, "");
        let destination_id = self.add_airport(destination, destination, destination, "");

        let layout = standard_layout();
        let capacity = |cabin: CabinClass| {
            layout
                .iter()
                .filter(|c| c.cabin == cabin)
                .map(|c| c.capacity())
                .sum::<i32>()
        };
        let flight = Flight {
            id: Uuid::new_v4(),
            flight_number: number.to_string(),
            airline_id,
            origin_airport_id: origin_id,
            destination_airport_id: destination_id,
            departure_time,
            arrival_time: departure_time + Duration::hours(4),
            economy_price,
            business_price: Some(economy_price * Decimal::from(3)),
            first_class_price: Some(economy_price * Decimal::from(7)),
            economy_capacity: capacity(CabinClass::Economy),
            business_capacity: capacity(CabinClass::Business),
            first_class_capacity: capacity(CabinClass::First),
            aircraft_type: "Airbus A320".to_string(),
            status: FlightStatus::Scheduled,
        };
        let id = flight.id;
        let seats = build_seat_map(id, &layout);
        self.add_flight(flight, seats);
        id
    }

    pub fn set_flight_status(&self, flight_id: Uuid, status: FlightStatus) {
        if let Some(flight) = self.state().flights.get_mut(&flight_id) {
            flight.status = status;
        }
    }

    pub fn seat(&self, seat_id: Uuid) -> Option<Seat> {
        self.state().seats.get(&seat_id).cloned()
    }

    pub fn seat_by_number(&self, flight_id: Uuid, seat_number: &str) -> Option<Seat> {
        self.state()
            .seats
            .values()
            .find(|s| s.flight_id == flight_id && s.seat_number == seat_number)
            .cloned()
    }

    pub fn set_seat_price(&self, seat_id: Uuid, price: Decimal) {
        if let Some(seat) = self.state().seats.get_mut(&seat_id) {
            seat.price = price;
        }
    }

    /// Available seats of one cabin, front to back.
    pub fn available_seats(&self, flight_id: Uuid, cabin: CabinClass) -> Vec<Seat> {
        let mut seats: Vec<Seat> = self
            .state()
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id && s.cabin_class == cabin && s.is_available)
            .cloned()
            .collect();
        seats.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));
        seats
    }
}

#[async_trait]
impl FlightCatalog for InMemoryStore {
    async fn list_airports(&self) -> CoreResult<Vec<Airport>> {
        let mut airports = self.state().airports.clone();
        airports.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(airports)
    }

    async fn list_airlines(&self) -> CoreResult<Vec<Airline>> {
        let mut airlines = self.state().airlines.clone();
        airlines.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(airlines)
    }

    async fn list_flights(&self) -> CoreResult<Vec<FlightDetails>> {
        let state = self.state();
        let mut flights: Vec<FlightDetails> = state.flights.values().filter_map(|f| state.details(f)).collect();
        flights.sort_by_key(|d| d.flight.departure_time);
        Ok(flights)
    }

    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<FlightDetails>> {
        let state = self.state();
        Ok(state.flights.get(&id).and_then(|f| state.details(f)))
    }

    async fn search_flights(&self, query: &FlightSearchQuery) -> CoreResult<Vec<FlightDetails>> {
        let (start, end) = query.departure_window();
        let state = self.state();
        let mut flights: Vec<FlightDetails> = state
            .flights
            .values()
            .filter(|f| f.departure_time >= start && f.departure_time < end)
            .filter_map(|f| state.details(f))
            .filter(|d| query.matches_route(&d.origin_airport.code, &d.destination_airport.code))
            .collect();
        flights.sort_by_key(|d| d.flight.departure_time);
        Ok(flights)
    }
}

#[async_trait]
impl SeatInventory for InMemoryStore {
    async fn seats_for_flight(&self, flight_id: Uuid) -> CoreResult<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .state()
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));
        Ok(seats)
    }

    async fn find_seats(&self, seat_ids: &[Uuid]) -> CoreResult<Vec<Seat>> {
        let state = self.state();
        Ok(seat_ids.iter().filter_map(|id| state.seats.get(id).cloned()).collect())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn commit_booking(&self, new: &NewBooking) -> CoreResult<BookingRecord> {
        let mut state = self.state();

        if state.bookings.values().any(|b| b.pnr == new.pnr) {
            return Err(CoreError::PnrCollision(new.pnr.clone()));
        }
        allocate_all(&mut state.seats, new.flight_id, new.cabin_class, &new.seat_ids())?;

        let booking = Booking {
            id: new.id,
            pnr: new.pnr.clone(),
            user_key: new.user_key.clone(),
            flight_id: new.flight_id,
            cabin_class: new.cabin_class,
            status: BookingStatus::Confirmed,
            total_amount: new.total_amount,
            surge_applied: new.surge_applied,
            payment_status: PaymentStatus::Paid,
            payment_method: new.payment_method.clone(),
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        for p in &new.passengers {
            state.passengers.push(Passenger {
                id: p.id,
                booking_id: booking.id,
                title: p.title.clone(),
                first_name: p.first_name.clone(),
                last_name: p.last_name.clone(),
                date_of_birth: p.date_of_birth,
                passport_number: p.passport_number.clone(),
                seat_id: p.seat_id,
            });
        }
        state.bookings.insert(booking.id, booking.clone());
        Ok(state.record(&booking))
    }

    async fn get_booking(&self, id: Uuid) -> CoreResult<Option<BookingRecord>> {
        let state = self.state();
        Ok(state.bookings.get(&id).map(|b| state.record(b)))
    }

    async fn list_bookings(&self, user_key: Option<&UserKey>) -> CoreResult<Vec<BookingRecord>> {
        let state = self.state();
        let mut bookings: Vec<&Booking> = state
            .bookings
            .values()
            .filter(|b| user_key.map_or(true, |key| &b.user_key == key))
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings.into_iter().map(|b| state.record(b)).collect())
    }

    async fn cancel_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<Option<Vec<Uuid>>> {
        let mut state = self.state();
        let Some(booking) = state.bookings.get_mut(&id) else {
            return Ok(None);
        };
        if booking.status != BookingStatus::Confirmed {
            return Ok(None);
        }
        booking.status = BookingStatus::Cancelled;
        booking.payment_status = PaymentStatus::Refunded;
        booking.updated_at = at;

        let seat_ids: Vec<Uuid> = state
            .passengers
            .iter()
            .filter(|p| p.booking_id == id)
            .filter_map(|p| p.seat_id)
            .collect();
        release_all(&mut state.seats, &seat_ids);
        Ok(Some(seat_ids))
    }

    async fn complete_booking(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<bool> {
        let mut state = self.state();
        match state.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Confirmed => {
                booking.status = BookingStatus::Completed;
                booking.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl AttemptLog for InMemoryStore {
    async fn record_attempt(&self, flight_id: Uuid, user_key: &UserKey, at: DateTime<Utc>) -> CoreResult<()> {
        self.state().attempts.push(PricingAttempt {
            id: Uuid::new_v4(),
            flight_id,
            user_key: user_key.clone(),
            attempted_at: at,
        });
        Ok(())
    }

    async fn count_recent_attempts(
        &self,
        flight_id: Uuid,
        user_key: &UserKey,
        window: Duration,
        now: DateTime<Utc>,
    ) -> CoreResult<u32> {
        let since = now - window;
        let count = self
            .state()
            .attempts
            .iter()
            .filter(|a| a.flight_id == flight_id && &a.user_key == user_key)
            .filter(|a| a.attempted_at >= since && a.attempted_at <= now)
            .count();
        Ok(count as u32)
    }
}

/// Keeps published events in memory for assertions.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<BookingEvent> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_search_matches_route_and_day() {
        let store = InMemoryStore::new();
        let day = Utc.with_ymd_and_hms(2025, 12, 21, 10, 0, 0).unwrap();
        store.add_flight_departing("JW1", "BOM", "DEL", dec!(45.00), day);
        store.add_flight_departing("JW2", "BOM", "DEL", dec!(55.00), day + Duration::hours(5));
        store.add_flight_departing("JW3", "BOM", "DEL", dec!(45.00), day + Duration::days(1));
        store.add_flight_departing("JW4", "DEL", "BOM", dec!(45.00), day);

        let query = FlightSearchQuery {
            origin: "bom".into(),
            destination: "DEL".into(),
            date: NaiveDate::from_ymd_opt(2025, 12, 21).unwrap(),
        };
        let found = store.search_flights(&query).await.unwrap();
        let numbers: Vec<&str> = found.iter().map(|d| d.flight.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["JW1", "JW2"]);
        assert_eq!(found[0].origin_airport.code, "BOM");
        assert_eq!(found[0].airline.code, "JW");

        let none = FlightSearchQuery {
            origin: "JFK".into(),
            destination: "LHR".into(),
            date: NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
        };
        assert!(store.search_flights(&none).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_reads() {
        let store = InMemoryStore::new();
        let id = store.add_demo_flight("JW9", "BLR", "JFK", dec!(80.00));
        assert_eq!(store.list_airports().await.unwrap().len(), 2);
        assert_eq!(store.list_airlines().await.unwrap().len(), 1);

        let details = store.get_flight(id).await.unwrap().unwrap();
        assert_eq!(details.flight.business_price, Some(dec!(240.00)));
        assert_eq!(details.flight.economy_capacity, 60);
        assert!(store.get_flight(Uuid::new_v4()).await.unwrap().is_none());

        let seats = store.seats_for_flight(id).await.unwrap();
        assert_eq!(seats.len(), 80);
        assert_eq!(seats[0].seat_number, "1A");
    }
}
