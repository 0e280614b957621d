pub mod models;
pub mod search;
pub mod fare;
pub mod pricing;
pub mod surge;
pub mod pnr;
pub mod seats;
pub mod repository;
pub mod booking;
pub mod memory;

use uuid::Uuid;

pub use booking::{BookingService, BookingRules, CancelOutcome, CreateBooking, PassengerInput, Requester};
pub use models::{BookingStatus, CabinClass, FlightStatus, UserKey};
pub use pricing::PriceBreakdown;
pub use surge::{SurgeDecision, SurgePolicy};

/// Coarse error taxonomy the HTTP boundary maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unauthorized,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),
    #[error("Flight {0} is not open for booking (status {1})")]
    FlightNotBookable(Uuid, FlightStatus),
    #[error("Seat not found: {0}")]
    SeatNotFound(Uuid),
    #[error("Seat already taken: {0:?}")]
    SeatAlreadyTaken(Vec<Uuid>),
    #[error("Seat {seat_id} is {actual}, requested cabin is {expected}")]
    SeatClassMismatch {
        seat_id: Uuid,
        expected: CabinClass,
        actual: CabinClass,
    },
    #[error("{passengers} passengers but {seats} seats selected")]
    SeatPassengerMismatch { passengers: usize, seats: usize },
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),
    #[error("Requester does not own booking {0}")]
    NotBookingOwner(Uuid),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    #[error("PNR already in use: {0}")]
    PnrCollision(String),
    #[error("Could not generate a unique PNR after {0} attempts")]
    PnrGenerationFailed(u32),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::FlightNotFound(_)
            | CoreError::SeatNotFound(_)
            | CoreError::BookingNotFound(_) => ErrorKind::NotFound,
            CoreError::SeatAlreadyTaken(_)
            | CoreError::InvalidTransition { .. }
            | CoreError::PnrCollision(_)
            | CoreError::PnrGenerationFailed(_) => ErrorKind::Conflict,
            CoreError::FlightNotBookable(..)
            | CoreError::SeatClassMismatch { .. }
            | CoreError::SeatPassengerMismatch { .. }
            | CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::NotBookingOwner(_) => ErrorKind::Unauthorized,
            CoreError::StorageError(_) => ErrorKind::Internal,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        let id = Uuid::new_v4();
        assert_eq!(CoreError::FlightNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::SeatNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::SeatAlreadyTaken(vec![id]).kind(), ErrorKind::Conflict);
        assert_eq!(CoreError::PnrGenerationFailed(5).kind(), ErrorKind::Conflict);
        assert_eq!(
            CoreError::SeatPassengerMismatch { passengers: 2, seats: 1 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(CoreError::NotBookingOwner(id).kind(), ErrorKind::Unauthorized);
        assert_eq!(CoreError::StorageError("boom".into()).kind(), ErrorKind::Internal);
    }
}
