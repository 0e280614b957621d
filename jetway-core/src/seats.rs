use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use uuid::Uuid;

use crate::models::{CabinClass, Seat};
use crate::{CoreError, CoreResult};

/// Cabin layout used when a flight's seat inventory is created.
#[derive(Debug, Clone)]
pub struct CabinLayout {
    pub cabin: CabinClass,
    pub rows: RangeInclusive<i32>,
    pub columns: &'static [&'static str],
    pub surcharge: Decimal,
}

impl CabinLayout {
    pub fn capacity(&self) -> i32 {
        self.rows.clone().count() as i32 * self.columns.len() as i32
    }
}

/// Narrow-body layout: 4-abreast first and business, 6-abreast economy from row 10.
pub fn standard_layout() -> Vec<CabinLayout> {
    vec![
        CabinLayout {
            cabin: CabinClass::First,
            rows: 1..=2,
            columns: &["A", "B", "C", "D"],
            surcharge: Decimal::new(10000, 2),
        },
        CabinLayout {
            cabin: CabinClass::Business,
            rows: 3..=5,
            columns: &["A", "B", "C", "D"],
            surcharge: Decimal::new(5000, 2),
        },
        CabinLayout {
            cabin: CabinClass::Economy,
            rows: 10..=19,
            columns: &["A", "B", "C", "D", "E", "F"],
            surcharge: Decimal::new(1000, 2),
        },
    ]
}

/// One available seat row per physical seat.
pub fn build_seat_map(flight_id: Uuid, layout: &[CabinLayout]) -> Vec<Seat> {
    layout
        .iter()
        .flat_map(|cabin| {
            cabin.rows.clone().flat_map(move |row| {
                cabin
                    .columns
                    .iter()
                    .map(move |col| Seat::new(flight_id, row, col, cabin.cabin, cabin.surcharge))
            })
        })
        .collect()
}

/// Checks a requested seat set against the rows the inventory returned.
///
/// Availability is not checked here: it can only be trusted inside the
/// allocating transaction. Returns the seats in request order.
pub fn validate_selection(
    flight_id: Uuid,
    cabin: CabinClass,
    requested: &[Uuid],
    found: Vec<Seat>,
) -> CoreResult<Vec<Seat>> {
    let mut unique = HashSet::with_capacity(requested.len());
    if let Some(dup) = requested.iter().find(|id| !unique.insert(**id)) {
        return Err(CoreError::ValidationError(format!("Seat {} selected more than once", dup)));
    }

    let mut by_id: HashMap<Uuid, Seat> = found.into_iter().map(|s| (s.id, s)).collect();
    let mut ordered = Vec::with_capacity(requested.len());

    for seat_id in requested {
        let seat = match by_id.remove(seat_id) {
            Some(seat) if seat.flight_id == flight_id => seat,
            _ => return Err(CoreError::SeatNotFound(*seat_id)),
        };
        if seat.cabin_class != cabin {
            return Err(CoreError::SeatClassMismatch {
                seat_id: seat.id,
                expected: cabin,
                actual: seat.cabin_class,
            });
        }
        ordered.push(seat);
    }

    Ok(ordered)
}

/// Flips every seat in `seat_ids` to unavailable, or none of them.
///
/// Used by in-process inventories; the SQL store performs the same
/// check-and-set with one conditional `UPDATE`. Seats outside `cabin` are refused.
pub fn allocate_all(
    seats: &mut HashMap<Uuid, Seat>,
    flight_id: Uuid,
    cabin: CabinClass,
    seat_ids: &[Uuid],
) -> CoreResult<()> {
    let mut taken = Vec::new();
    for seat_id in seat_ids {
        match seats.get(seat_id) {
            Some(seat) if seat.flight_id == flight_id => {
                if seat.cabin_class != cabin {
                    return Err(CoreError::SeatClassMismatch {
                        seat_id: *seat_id,
                        expected: cabin,
                        actual: seat.cabin_class,
                    });
                }
                if !seat.is_available {
                    taken.push(*seat_id);
                }
            }
            _ => return Err(CoreError::SeatNotFound(*seat_id)),
        }
    }
    if !taken.is_empty() {
        return Err(CoreError::SeatAlreadyTaken(taken));
    }

    for seat_id in seat_ids {
        if let Some(seat) = seats.get_mut(seat_id) {
            seat.is_available = false;
        }
    }
    Ok(())
}

pub fn release_all(seats: &mut HashMap<Uuid, Seat>, seat_ids: &[Uuid]) {
    for seat_id in seat_ids {
        if let Some(seat) = seats.get_mut(seat_id) {
            seat.is_available = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seat(flight_id: Uuid, row: i32, col: &str, cabin: CabinClass) -> Seat {
        Seat::new(flight_id, row, col, cabin, dec!(10.00))
    }

    #[test]
    fn test_standard_seat_map() {
        let flight_id = Uuid::new_v4();
        let layout = standard_layout();
        let seats = build_seat_map(flight_id, &layout);

        assert_eq!(seats.len(), 8 + 12 + 60);
        assert_eq!(layout.iter().map(|c| c.capacity()).sum::<i32>(), 80);
        assert!(seats.iter().all(|s| s.flight_id == flight_id && s.is_available));

        let first_row = seats.iter().find(|s| s.seat_number == "1A").unwrap();
        assert_eq!(first_row.cabin_class, CabinClass::First);
        let economy = seats.iter().find(|s| s.seat_number == "19F").unwrap();
        assert_eq!(economy.cabin_class, CabinClass::Economy);
        assert_eq!(economy.price, dec!(10.00));
    }

    #[test]
    fn test_valid_selection_keeps_request_order() {
        let flight_id = Uuid::new_v4();
        let a = seat(flight_id, 10, "A", CabinClass::Economy);
        let b = seat(flight_id, 10, "B", CabinClass::Economy);
        let ids = vec![b.id, a.id];

        let ordered = validate_selection(flight_id, CabinClass::Economy, &ids, vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(ordered[0].id, b.id);
        assert_eq!(ordered[1].id, a.id);
    }

    #[test]
    fn test_rejects_foreign_missing_duplicate_and_wrong_cabin() {
        let flight_id = Uuid::new_v4();
        let mine = seat(flight_id, 10, "A", CabinClass::Economy);
        let foreign = seat(Uuid::new_v4(), 10, "A", CabinClass::Economy);
        let business = seat(flight_id, 3, "A", CabinClass::Business);

        let err = validate_selection(flight_id, CabinClass::Economy, &[foreign.id], vec![foreign.clone()]).unwrap_err();
        assert!(matches!(err, CoreError::SeatNotFound(id) if id == foreign.id));

        let missing = Uuid::new_v4();
        let err = validate_selection(flight_id, CabinClass::Economy, &[missing], vec![]).unwrap_err();
        assert!(matches!(err, CoreError::SeatNotFound(id) if id == missing));

        let err = validate_selection(flight_id, CabinClass::Economy, &[mine.id, mine.id], vec![mine.clone()]).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let err = validate_selection(flight_id, CabinClass::Economy, &[business.id], vec![business.clone()]).unwrap_err();
        assert!(matches!(err, CoreError::SeatClassMismatch { actual: CabinClass::Business, .. }));
    }

    #[test]
    fn test_allocate_is_all_or_nothing() {
        let flight_id = Uuid::new_v4();
        let mut a = seat(flight_id, 10, "A", CabinClass::Economy);
        let b = seat(flight_id, 10, "B", CabinClass::Economy);
        a.is_available = false;
        let mut seats: HashMap<Uuid, Seat> = [(a.id, a.clone()), (b.id, b.clone())].into_iter().collect();

        let err = allocate_all(&mut seats, flight_id, CabinClass::Economy, &[b.id, a.id]).unwrap_err();
        assert!(matches!(err, CoreError::SeatAlreadyTaken(ref ids) if ids == &vec![a.id]));
        assert!(seats[&b.id].is_available, "no partial allocation");

        release_all(&mut seats, &[a.id]);
        allocate_all(&mut seats, flight_id, CabinClass::Economy, &[a.id, b.id]).unwrap();
        assert!(!seats[&a.id].is_available);
        assert!(!seats[&b.id].is_available);
    }

    #[test]
    fn test_allocate_refuses_other_cabin() {
        let flight_id = Uuid::new_v4();
        let economy = seat(flight_id, 11, "C", CabinClass::Economy);
        let business = seat(flight_id, 3, "A", CabinClass::Business);
        let mut seats: HashMap<Uuid, Seat> =
            [(economy.id, economy.clone()), (business.id, business.clone())].into_iter().collect();

        let err = allocate_all(&mut seats, flight_id, CabinClass::Economy, &[economy.id, business.id]).unwrap_err();
        assert!(matches!(err, CoreError::SeatClassMismatch { actual: CabinClass::Business, .. }));
        assert!(seats[&economy.id].is_available);
        assert!(seats[&business.id].is_available);
    }
}
