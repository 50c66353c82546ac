//! Storage seam for the booking core.
//!
//! Everything that touches tickets and reservations during a booking goes
//! through [`BookingStore`] and [`BookingTx`]. Production uses
//! [`postgres::PgBookingStore`]; tests run the same logic against
//! [`memory::MemoryBookingStore`], which enforces the same
//! `(session, row, seat)` uniqueness rule.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{DomeGeometry, NewTicket, Reservation, Ticket};

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The `(session, row, seat)` unique constraint rejected a write.
    #[error("seat (row {row}, seat {seat}) is already booked for session {session_id}")]
    SeatConflict { session_id: i64, row: i32, seat: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Dome grid of a session together with the live number of sold tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOccupancy {
    pub geometry: DomeGeometry,
    pub tickets_sold: i64,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Opens a transaction. Dropping it without `commit` discards every write.
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError>;

    /// Reads the current occupancy of a session, `None` if the session does not exist.
    async fn session_occupancy(&self, session_id: i64) -> Result<Option<SessionOccupancy>, StoreError>;
}

#[async_trait]
pub trait BookingTx: Send {
    async fn session_geometry(&mut self, session_id: i64) -> Result<Option<DomeGeometry>, StoreError>;

    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError>;

    /// Advisory occupancy check. The unique constraint behind `insert_ticket` is authoritative.
    async fn seat_taken(&mut self, session_id: i64, row: i32, seat: i32) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::SeatConflict`] when the seat is already claimed.
    async fn insert_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
