use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A claim on one seat of one session. `row` and `seat` are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session_id: i64,
    pub reservation_id: i64,
}

/// Ticket row before it has been assigned an id by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTicket {
    pub show_session_id: i64,
    pub reservation_id: i64,
    pub row: i32,
    pub seat: i32,
}
