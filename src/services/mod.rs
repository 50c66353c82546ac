//! Booking core: seat bounds, availability, single-seat admission and
//! all-or-nothing reservation creation.

pub mod admission;
pub mod availability;
pub mod booking;
pub mod seat_validator;

pub use admission::{admit, AdmissionError, SeatRequest};
pub use availability::available_seats;
pub use booking::{BookedReservation, BookingService};
pub use seat_validator::{validate, SeatValidationError};
