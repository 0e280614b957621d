use chrono::{NaiveDate, Utc};
use jetway_shared::events::{BookingCancelledEvent, BookingConfirmedEvent, BookingEvent};
use jetway_shared::Masked;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::fare::resolve_fare;
use crate::models::{Booking, BookingRecord, BookingStatus, CabinClass, UserKey};
use crate::pnr::generate_pnr;
use crate::pricing::PriceBreakdown;
use crate::repository::{AttemptLog, BookingStore, EventPublisher, FlightCatalog, NewBooking, NewPassenger, SeatInventory};
use crate::seats::validate_selection;
use crate::surge::{SurgeEvaluator, SurgePolicy};
use crate::{CoreError, CoreResult};

/// Tunables for booking creation, loaded from `business_rules` config.
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub tax_rate: Decimal,
    pub surge: SurgePolicy,
    pub pnr_max_attempts: u32,
    pub require_seat_selection: bool,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(12, 2),
            surge: SurgePolicy::default(),
            pnr_max_attempts: 5,
            require_seat_selection: true,
        }
    }
}

// Column widths of the bookings and passengers tables.
const MAX_TITLE_LEN: usize = 16;
const MAX_NAME_LEN: usize = 255;
const MAX_PASSPORT_LEN: usize = 32;
const MAX_PAYMENT_METHOD_LEN: usize = 64;
const MAX_USER_KEY_LEN: usize = 255;

fn check_length(field: &str, value: &str, max: usize) -> CoreResult<()> {
    if value.chars().count() > max {
        return Err(CoreError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerInput {
    #[serde(default)]
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub passport_number: Option<Masked<String>>,
}

/// Body of `POST /bookings`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub flight_id: Uuid,
    #[serde(default = "default_cabin")]
    pub cabin_class: CabinClass,
    pub passengers: Vec<PassengerInput>,
    #[serde(default)]
    pub seat_ids: Vec<Uuid>,
    pub payment_method: String,
}

fn default_cabin() -> CabinClass {
    CabinClass::Economy
}

/// Who is asking. Admins may read and cancel any booking.
#[derive(Debug, Clone)]
pub struct Requester {
    pub key: UserKey,
    pub is_admin: bool,
}

impl Requester {
    pub fn new(key: UserKey) -> Self {
        Self { key, is_admin: false }
    }

    pub fn admin(key: UserKey) -> Self {
        Self { key, is_admin: true }
    }

    pub fn can_manage(&self, booking: &Booking) -> bool {
        self.is_admin || booking.user_key == self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled { released_seats: Vec<Uuid> },
    AlreadyCancelled,
}

type PnrSource = Box<dyn Fn() -> String + Send + Sync>;

pub struct BookingService {
    catalog: Arc<dyn FlightCatalog>,
    seats: Arc<dyn SeatInventory>,
    store: Arc<dyn BookingStore>,
    surge: SurgeEvaluator,
    events: Arc<dyn EventPublisher>,
    rules: BookingRules,
    pnr_source: PnrSource,
}

impl BookingService {
    pub fn new(
        catalog: Arc<dyn FlightCatalog>,
        seats: Arc<dyn SeatInventory>,
        store: Arc<dyn BookingStore>,
        attempts: Arc<dyn AttemptLog>,
        events: Arc<dyn EventPublisher>,
        rules: BookingRules,
    ) -> Self {
        Self {
            catalog,
            seats,
            store,
            surge: SurgeEvaluator::new(attempts, rules.surge.clone()),
            events,
            rules,
            pnr_source: Box::new(generate_pnr),
        }
    }

    /// Replaces the random PNR generator, e.g. to force collisions.
    pub fn with_pnr_source(mut self, source: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.pnr_source = Box::new(source);
        self
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub async fn create_booking(&self, req: CreateBooking, user_key: &UserKey) -> CoreResult<BookingRecord> {
        let now = Utc::now();

        let details = self
            .catalog
            .get_flight(req.flight_id)
            .await?
            .ok_or(CoreError::FlightNotFound(req.flight_id))?;
        let flight = details.flight;
        if !flight.is_bookable() {
            return Err(CoreError::FlightNotBookable(flight.id, flight.status));
        }

        self.validate_request(&req, user_key, now.date_naive())?;

        let surge = self.surge.evaluate(flight.id, user_key, now).await?;
        let base_fare = resolve_fare(&flight, req.cabin_class);

        let seats = if req.seat_ids.is_empty() {
            Vec::new()
        } else {
            let found = self.seats.find_seats(&req.seat_ids).await?;
            validate_selection(flight.id, req.cabin_class, &req.seat_ids, found)?
        };
        let seat_prices: Vec<Decimal> = seats.iter().map(|s| s.price).collect();

        let price = PriceBreakdown::compute(
            base_fare,
            req.passengers.len() as u32,
            &seat_prices,
            self.rules.tax_rate,
            &surge,
        );

        let passengers: Vec<NewPassenger> = req
            .passengers
            .iter()
            .enumerate()
            .map(|(i, p)| NewPassenger {
                id: Uuid::new_v4(),
                title: p.title.trim().to_string(),
                first_name: p.first_name.trim().to_string(),
                last_name: p.last_name.trim().to_string(),
                date_of_birth: p.date_of_birth,
                passport_number: p.passport_number.clone(),
                seat_id: req.seat_ids.get(i).copied(),
            })
            .collect();

        let mut attempt = 0;
        let mut record = loop {
            attempt += 1;
            let booking = NewBooking {
                id: Uuid::new_v4(),
                pnr: (self.pnr_source)(),
                user_key: user_key.clone(),
                flight_id: flight.id,
                cabin_class: req.cabin_class,
                total_amount: price.total,
                surge_applied: surge.applied,
                payment_method: req.payment_method.trim().to_string(),
                passengers: passengers.clone(),
                created_at: now,
            };

            match self.store.commit_booking(&booking).await {
                Ok(record) => break record,
                Err(CoreError::PnrCollision(pnr)) => {
                    warn!(%pnr, attempt, "PNR collision, regenerating");
                    if attempt >= self.rules.pnr_max_attempts {
                        return Err(CoreError::PnrGenerationFailed(attempt));
                    }
                }
                Err(CoreError::SeatAlreadyTaken(ids)) => {
                    warn!(flight_id = %flight.id, seats = ?ids, "Seat conflict, booking aborted");
                    return Err(CoreError::SeatAlreadyTaken(ids));
                }
                Err(e) => return Err(e),
            }
        };

        if let Err(e) = self.surge.record(flight.id, user_key, now).await {
            warn!(flight_id = %flight.id, "Failed to record pricing attempt: {}", e);
        }

        let event = BookingEvent::BookingConfirmed(BookingConfirmedEvent {
            booking_id: record.booking.id,
            pnr: record.booking.pnr.clone(),
            flight_id: flight.id,
            user_key: user_key.to_string(),
            seat_ids: record.seat_ids(),
            total_amount: record.booking.total_amount,
            surge_applied: record.booking.surge_applied,
            confirmed_at: now,
        });
        self.publish(&event).await;

        info!(
            pnr = %record.booking.pnr,
            flight_id = %flight.id,
            total = %record.booking.total_amount,
            surge = surge.applied,
            "Booking confirmed"
        );

        record.price = Some(price);
        Ok(record)
    }

    fn validate_request(&self, req: &CreateBooking, user_key: &UserKey, today: NaiveDate) -> CoreResult<()> {
        if req.passengers.is_empty() {
            return Err(CoreError::ValidationError("At least one passenger is required".into()));
        }
        if req.payment_method.trim().is_empty() {
            return Err(CoreError::ValidationError("Payment method is required".into()));
        }
        check_length("paymentMethod", &req.payment_method, MAX_PAYMENT_METHOD_LEN)?;
        check_length("requester", user_key.as_str(), MAX_USER_KEY_LEN)?;
        for p in &req.passengers {
            check_length("title", &p.title, MAX_TITLE_LEN)?;
            check_length("firstName", &p.first_name, MAX_NAME_LEN)?;
            check_length("lastName", &p.last_name, MAX_NAME_LEN)?;
            if let Some(passport) = &p.passport_number {
                check_length("passportNumber", passport.expose(), MAX_PASSPORT_LEN)?;
            }
        }
        for (i, p) in req.passengers.iter().enumerate() {
            if p.first_name.trim().is_empty() || p.last_name.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("Passenger {} is missing a name", i + 1)));
            }
            if p.date_of_birth > today {
                return Err(CoreError::ValidationError(format!(
                    "Passenger {} has a date of birth in the future",
                    i + 1
                )));
            }
        }

        let seats = req.seat_ids.len();
        let passengers = req.passengers.len();
        let seat_check = seats > 0 || self.rules.require_seat_selection;
        if seat_check && seats != passengers {
            return Err(CoreError::SeatPassengerMismatch { passengers, seats });
        }
        Ok(())
    }

    pub async fn cancel_booking(&self, booking_id: Uuid, requester: &Requester) -> CoreResult<CancelOutcome> {
        let record = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;

        if !requester.can_manage(&record.booking) {
            warn!(%booking_id, requester = %requester.key, "Cancel refused: not the booking owner");
            return Err(CoreError::NotBookingOwner(booking_id));
        }

        match record.booking.status {
            BookingStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            status if !status.can_transition_to(BookingStatus::Cancelled) => {
                return Err(CoreError::InvalidTransition {
                    from: status,
                    to: BookingStatus::Cancelled,
                })
            }
            _ => {}
        }

        let now = Utc::now();
        let Some(released) = self.store.cancel_booking(booking_id, now).await? else {
            // Lost a race with another status change; report what won.
            let current = self
                .store
                .get_booking(booking_id)
                .await?
                .ok_or(CoreError::BookingNotFound(booking_id))?;
            return match current.booking.status {
                BookingStatus::Cancelled => Ok(CancelOutcome::AlreadyCancelled),
                status => Err(CoreError::InvalidTransition {
                    from: status,
                    to: BookingStatus::Cancelled,
                }),
            };
        };

        let event = BookingEvent::BookingCancelled(BookingCancelledEvent {
            booking_id,
            pnr: record.booking.pnr.clone(),
            flight_id: record.booking.flight_id,
            released_seat_ids: released.clone(),
            cancelled_at: now,
        });
        self.publish(&event).await;

        info!(pnr = %record.booking.pnr, released = released.len(), "Booking cancelled");
        Ok(CancelOutcome::Cancelled { released_seats: released })
    }

    /// `confirmed -> completed`, driven by flight completion outside the booking flow.
    pub async fn complete_booking(&self, booking_id: Uuid) -> CoreResult<()> {
        let record = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        let from = record.booking.status;
        if !from.can_transition_to(BookingStatus::Completed) || !self.store.complete_booking(booking_id, Utc::now()).await? {
            return Err(CoreError::InvalidTransition {
                from,
                to: BookingStatus::Completed,
            });
        }
        Ok(())
    }

    pub async fn get_booking(&self, booking_id: Uuid, requester: &Requester) -> CoreResult<BookingRecord> {
        let record = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(CoreError::BookingNotFound(booking_id))?;
        if !requester.can_manage(&record.booking) {
            return Err(CoreError::NotBookingOwner(booking_id));
        }
        Ok(record)
    }

    pub async fn list_bookings_for(&self, user_key: &UserKey) -> CoreResult<Vec<BookingRecord>> {
        self.store.list_bookings(Some(user_key)).await
    }

    pub async fn list_all_bookings(&self) -> CoreResult<Vec<BookingRecord>> {
        self.store.list_bookings(None).await
    }

    async fn publish(&self, event: &BookingEvent) {
        if let Err(e) = self.events.publish(event).await {
            warn!(topic = event.topic(), "Failed to publish booking event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryStore, RecordingPublisher};
    use crate::models::{FlightStatus, PaymentStatus};
    use crate::pnr::is_valid_pnr;
    use crate::ErrorKind;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        store: Arc<InMemoryStore>,
        events: Arc<RecordingPublisher>,
        service: BookingService,
        flight_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let flight_id = store.add_demo_flight("JW100", "JFK", "LHR", dec!(100.00));
        let events = Arc::new(RecordingPublisher::default());
        let service = BookingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            events.clone(),
            BookingRules::default(),
        );
        Fixture { store, events, service, flight_id }
    }

    fn passenger(first: &str) -> PassengerInput {
        PassengerInput {
            title: "Ms".into(),
            first_name: first.into(),
            last_name: "Traveller".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
            passport_number: Some(Masked::new("X1234567".into())),
        }
    }

    fn request(flight_id: Uuid, seat_ids: Vec<Uuid>) -> CreateBooking {
        let passengers = (0..seat_ids.len()).map(|i| passenger(&format!("P{}", i))).collect();
        CreateBooking {
            flight_id,
            cabin_class: CabinClass::Economy,
            passengers,
            seat_ids,
            payment_method: "card".into(),
        }
    }

    #[tokio::test]
    async fn test_worked_example_total() {
        let f = fixture();
        let a = f.store.seat_by_number(f.flight_id, "10A").unwrap();
        let b = f.store.seat_by_number(f.flight_id, "10B").unwrap();
        f.store.set_seat_price(a.id, dec!(10.00));
        f.store.set_seat_price(b.id, dec!(15.00));

        let record = f
            .service
            .create_booking(request(f.flight_id, vec![a.id, b.id]), &UserKey::user("alice"))
            .await
            .unwrap();

        assert_eq!(record.booking.total_amount, dec!(252.00));
        assert!(!record.booking.surge_applied);
        assert_eq!(record.booking.status, BookingStatus::Confirmed);
        assert_eq!(record.booking.payment_status, PaymentStatus::Paid);
        assert!(is_valid_pnr(&record.booking.pnr));
        assert_eq!(record.passengers.len(), 2);
        assert_eq!(record.passengers[0].seat_id, Some(a.id));

        let price = record.price.unwrap();
        assert_eq!(price.subtotal, dec!(225.00));
        assert_eq!(price.taxes, dec!(27.00));

        assert!(!f.store.seat(a.id).unwrap().is_available);
        assert!(!f.store.seat(b.id).unwrap().is_available);
        assert_eq!(f.events.published().len(), 1);
    }

    #[tokio::test]
    async fn test_surge_applies_from_third_prior_attempt() {
        let f = fixture();
        let user = UserKey::user("bot");
        let seats = f.store.available_seats(f.flight_id, CabinClass::Economy);

        for (i, seat) in seats.iter().take(3).enumerate() {
            let record = f.service.create_booking(request(f.flight_id, vec![seat.id]), &user).await.unwrap();
            assert!(!record.booking.surge_applied, "attempt {} should not surge", i + 1);
        }

        let fourth = f.service.create_booking(request(f.flight_id, vec![seats[3].id]), &user).await.unwrap();
        assert!(fourth.booking.surge_applied);
        assert_eq!(fourth.price.as_ref().unwrap().surge_multiplier, dec!(1.10));

        // Another guest on the same flight is not affected
        let other = f
            .service
            .create_booking(request(f.flight_id, vec![seats[4].id]), &UserKey::guest("10.0.0.9"))
            .await
            .unwrap();
        assert!(!other.booking.surge_applied);
    }

    #[tokio::test]
    async fn test_old_attempts_expire() {
        let f = fixture();
        let user = UserKey::user("carol");
        let old = Utc::now() - Duration::minutes(10);
        for _ in 0..5 {
            f.store.record_attempt(f.flight_id, &user, old).await.unwrap();
        }
        let seat = f.store.seat_by_number(f.flight_id, "11A").unwrap();
        let record = f.service.create_booking(request(f.flight_id, vec![seat.id]), &user).await.unwrap();
        assert!(!record.booking.surge_applied);
    }

    #[tokio::test]
    async fn test_seat_conflict_leaves_no_trace() {
        let f = fixture();
        let taken = f.store.seat_by_number(f.flight_id, "12A").unwrap();
        let free = f.store.seat_by_number(f.flight_id, "12B").unwrap();
        f.service
            .create_booking(request(f.flight_id, vec![taken.id]), &UserKey::user("first"))
            .await
            .unwrap();

        let err = f
            .service
            .create_booking(request(f.flight_id, vec![free.id, taken.id]), &UserKey::user("second"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SeatAlreadyTaken(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assert!(f.store.seat(free.id).unwrap().is_available, "no partial allocation");
        assert_eq!(f.store.list_bookings(None).await.unwrap().len(), 1);
        assert_eq!(f.events.published().len(), 1);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let f = fixture();
        let user = UserKey::user("dave");
        let seat = f.store.seat_by_number(f.flight_id, "13A").unwrap();

        let mut req = request(f.flight_id, vec![seat.id]);
        req.passengers.push(passenger("Extra"));
        let err = f.service.create_booking(req, &user).await.unwrap_err();
        assert!(matches!(err, CoreError::SeatPassengerMismatch { passengers: 2, seats: 1 }));

        let mut req = request(f.flight_id, vec![]);
        req.passengers.push(passenger("Solo"));
        let err = f.service.create_booking(req, &user).await.unwrap_err();
        assert!(matches!(err, CoreError::SeatPassengerMismatch { .. }));

        let err = f.service.create_booking(request(f.flight_id, vec![]), &user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = f
            .service
            .create_booking(request(Uuid::new_v4(), vec![seat.id]), &user)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::FlightNotFound(_)));

        let business = f.store.available_seats(f.flight_id, CabinClass::Business)[0].clone();
        let err = f
            .service
            .create_booking(request(f.flight_id, vec![business.id]), &user)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SeatClassMismatch { .. }));
    }

    #[tokio::test]
    async fn test_over_length_fields_are_rejected() {
        let f = fixture();
        let user = UserKey::user("gwen");
        let seat = f.store.seat_by_number(f.flight_id, "13B").unwrap();

        let mut req = request(f.flight_id, vec![seat.id]);
        req.passengers[0].title = "T".repeat(20);
        let err = f.service.create_booking(req, &user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut req = request(f.flight_id, vec![seat.id]);
        req.payment_method = "m".repeat(100);
        let err = f.service.create_booking(req, &user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut req = request(f.flight_id, vec![seat.id]);
        req.passengers[0].passport_number = Some(Masked::new("9".repeat(33)));
        let err = f.service.create_booking(req, &user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut req = request(f.flight_id, vec![seat.id]);
        req.passengers[0].last_name = "é".repeat(255);
        let record = f.service.create_booking(req, &user).await.unwrap();
        assert_eq!(record.passengers.len(), 1);

        let other = f.store.seat_by_number(f.flight_id, "13C").unwrap();
        let err = f
            .service
            .create_booking(request(f.flight_id, vec![other.id]), &UserKey::user(&"s".repeat(300)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(f.store.seat(other.id).unwrap().is_available);
    }

    #[tokio::test]
    async fn test_unseated_booking_when_selection_optional() {
        let store = Arc::new(InMemoryStore::new());
        let flight_id = store.add_demo_flight("JW200", "BOM", "DEL", dec!(50.00));
        let rules = BookingRules {
            require_seat_selection: false,
            ..BookingRules::default()
        };
        let service = BookingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(RecordingPublisher::default()),
            rules,
        );
        let mut req = request(flight_id, vec![]);
        req.passengers = vec![passenger("A"), passenger("B")];

        let record = service.create_booking(req, &UserKey::user("erin")).await.unwrap();
        // (50 * 2) * 1.12
        assert_eq!(record.booking.total_amount, dec!(112.00));
        assert!(record.passengers.iter().all(|p| p.seat_id.is_none()));
    }

    #[tokio::test]
    async fn test_unbookable_flight() {
        let f = fixture();
        f.store.set_flight_status(f.flight_id, FlightStatus::Cancelled);
        let seat = f.store.seat_by_number(f.flight_id, "14A").unwrap();
        let err = f
            .service
            .create_booking(request(f.flight_id, vec![seat.id]), &UserKey::user("fay"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::FlightNotBookable(_, FlightStatus::Cancelled)));
    }

    #[tokio::test]
    async fn test_pnr_collisions_retry_then_give_up() {
        let f = fixture();
        let seat = f.store.seat_by_number(f.flight_id, "15A").unwrap();
        f.service
            .create_booking(request(f.flight_id, vec![seat.id]), &UserKey::user("gus"))
            .await
            .unwrap();
        let existing = f.store.list_bookings(None).await.unwrap()[0].booking.pnr.clone();

        // Collides twice, then succeeds
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let colliding = existing.clone();
        let service = BookingService::new(
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.events.clone(),
            BookingRules::default(),
        )
        .with_pnr_source(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                colliding.clone()
            } else {
                "ZZZ999".to_string()
            }
        });
        let seat = f.store.seat_by_number(f.flight_id, "15B").unwrap();
        let record = service
            .create_booking(request(f.flight_id, vec![seat.id]), &UserKey::user("hal"))
            .await
            .unwrap();
        assert_eq!(record.booking.pnr, "ZZZ999");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        // Always collides
        let stuck = BookingService::new(
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.store.clone(),
            f.events.clone(),
            BookingRules::default(),
        )
        .with_pnr_source(move || existing.clone());
        let seat = f.store.seat_by_number(f.flight_id, "15C").unwrap();
        let err = stuck
            .create_booking(request(f.flight_id, vec![seat.id]), &UserKey::user("ivy"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PnrGenerationFailed(5)));
        assert!(f.store.seat(seat.id).unwrap().is_available);
    }

    #[tokio::test]
    async fn test_cancel_releases_seats_once() {
        let f = fixture();
        let owner = UserKey::user("jo");
        let a = f.store.seat_by_number(f.flight_id, "16A").unwrap();
        let b = f.store.seat_by_number(f.flight_id, "16B").unwrap();
        let record = f
            .service
            .create_booking(request(f.flight_id, vec![a.id, b.id]), &owner)
            .await
            .unwrap();
        let id = record.booking.id;

        let err = f
            .service
            .cancel_booking(id, &Requester::new(UserKey::user("mallory")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(f.store.get_booking(id).await.unwrap().unwrap().booking.status, BookingStatus::Confirmed);
        assert!(!f.store.seat(a.id).unwrap().is_available);

        let outcome = f.service.cancel_booking(id, &Requester::new(owner.clone())).await.unwrap();
        assert!(matches!(outcome, CancelOutcome::Cancelled { ref released_seats } if released_seats.len() == 2));
        assert!(f.store.seat(a.id).unwrap().is_available);
        assert!(f.store.seat(b.id).unwrap().is_available);

        let cancelled = f.store.get_booking(id).await.unwrap().unwrap();
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.booking.payment_status, PaymentStatus::Refunded);

        // Someone else books seat A again; a second cancel must not free it.
        f.service
            .create_booking(request(f.flight_id, vec![a.id]), &UserKey::user("kim"))
            .await
            .unwrap();
        let again = f.service.cancel_booking(id, &Requester::new(owner)).await.unwrap();
        assert_eq!(again, CancelOutcome::AlreadyCancelled);
        assert!(!f.store.seat(a.id).unwrap().is_available);
    }

    #[tokio::test]
    async fn test_admin_can_cancel_and_completed_is_terminal() {
        let f = fixture();
        let seat = f.store.seat_by_number(f.flight_id, "17A").unwrap();
        let record = f
            .service
            .create_booking(request(f.flight_id, vec![seat.id]), &UserKey::user("lee"))
            .await
            .unwrap();
        let admin = Requester::admin(UserKey::user("ops"));
        f.service.get_booking(record.booking.id, &admin).await.unwrap();

        f.service.complete_booking(record.booking.id).await.unwrap();
        let err = f.service.cancel_booking(record.booking.id, &admin).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition { from: BookingStatus::Completed, to: BookingStatus::Cancelled }
        ));

        let err = f.service.cancel_booking(Uuid::new_v4(), &admin).await.unwrap_err();
        assert!(matches!(err, CoreError::BookingNotFound(_)));
    }

    #[tokio::test]
    async fn test_bookings_are_listed_per_requester() {
        let f = fixture();
        let seats = f.store.available_seats(f.flight_id, CabinClass::Economy);
        let mia = UserKey::guest("session-1");
        let ned = UserKey::guest("session-2");
        f.service.create_booking(request(f.flight_id, vec![seats[0].id]), &mia).await.unwrap();
        f.service.create_booking(request(f.flight_id, vec![seats[1].id]), &ned).await.unwrap();

        assert_eq!(f.service.list_bookings_for(&mia).await.unwrap().len(), 1);
        assert_eq!(f.service.list_all_bookings().await.unwrap().len(), 2);
    }
}
