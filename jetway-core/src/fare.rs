use rust_decimal::Decimal;

use crate::models::{CabinClass, Flight};

/// Per-passenger base fare for a cabin. Legacy rows without a business or first
/// fare fall back to the economy fare.
pub fn resolve_fare(flight: &Flight, cabin: CabinClass) -> Decimal {
    let stored = match cabin {
        CabinClass::Economy => Some(flight.economy_price),
        CabinClass::Business => flight.business_price,
        CabinClass::First => flight.first_class_price,
    };
    stored.unwrap_or(flight.economy_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FlightStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn flight(business: Option<Decimal>, first: Option<Decimal>) -> Flight {
        Flight {
            id: Uuid::new_v4(),
            flight_number: "JW100".into(),
            airline_id: Uuid::new_v4(),
            origin_airport_id: Uuid::new_v4(),
            destination_airport_id: Uuid::new_v4(),
            departure_time: Utc::now(),
            arrival_time: Utc::now(),
            economy_price: dec!(100.00),
            business_price: business,
            first_class_price: first,
            economy_capacity: 12,
            business_capacity: 4,
            first_class_capacity: 4,
            aircraft_type: "A320".into(),
            status: FlightStatus::Scheduled,
        }
    }

    #[test]
    fn test_stored_fares() {
        let f = flight(Some(dec!(350.00)), Some(dec!(900.00)));
        assert_eq!(resolve_fare(&f, CabinClass::Economy), dec!(100.00));
        assert_eq!(resolve_fare(&f, CabinClass::Business), dec!(350.00));
        assert_eq!(resolve_fare(&f, CabinClass::First), dec!(900.00));
    }

    #[test]
    fn test_missing_cabin_falls_back_to_economy() {
        let f = flight(None, None);
        assert_eq!(resolve_fare(&f, CabinClass::Business), dec!(100.00));
        assert_eq!(resolve_fare(&f, CabinClass::First), dec!(100.00));
    }
}
