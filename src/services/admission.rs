use serde::Deserialize;

use super::seat_validator::{self, SeatValidationError};
use crate::models::{NewTicket, Reservation, Ticket};
use crate::storage::{BookingTx, StoreError};

/// One requested seat: `row` and `seat` in the dome of `session_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeatRequest {
    pub row: i32,
    pub seat: i32,
    #[serde(rename = "show_session")]
    pub session_id: i64,
}

impl SeatRequest {
    pub const fn new(row: i32, seat: i32, session_id: i64) -> Self {
        Self { row, seat, session_id }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    OutOfRange(#[from] SeatValidationError),

    #[error("seat (row {row}, seat {seat}) is already taken for session {session_id}")]
    SeatTaken { session_id: i64, row: i32, seat: i32 },

    #[error("a reservation needs at least one ticket")]
    EmptyReservation,

    #[error("show session {0} does not exist")]
    SessionNotFound(i64),

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for AdmissionError {
    fn from(err: StoreError) -> Self {
        match err {
            // Гонку проиграли на уровне БД: для клиента это то же самое, что занятое место
            StoreError::SeatConflict { session_id, row, seat } => {
                Self::SeatTaken { session_id, row, seat }
            }
            other => Self::Storage(other),
        }
    }
}

/// Validates the seat against the session's dome and claims it for `reservation`.
///
/// The `seat_taken` lookup only gives a clean early error; a concurrent
/// booking that slips past it is caught by the store's unique constraint
/// and reported as [`AdmissionError::SeatTaken`] all the same.
pub async fn admit(
    tx: &mut dyn BookingTx,
    request: SeatRequest,
    reservation: &Reservation,
) -> Result<Ticket, AdmissionError> {
    let geometry = tx
        .session_geometry(request.session_id)
        .await?
        .ok_or(AdmissionError::SessionNotFound(request.session_id))?;

    seat_validator::validate(request.row, request.seat, &geometry)?;

    if tx.seat_taken(request.session_id, request.row, request.seat).await? {
        return Err(AdmissionError::SeatTaken {
            session_id: request.session_id,
            row: request.row,
            seat: request.seat,
        });
    }

    let ticket = tx
        .insert_ticket(NewTicket {
            show_session_id: request.session_id,
            reservation_id: reservation.id,
            row: request.row,
            seat: request.seat,
        })
        .await?;

    tracing::debug!(
        "ticket {} admitted: session={} row={} seat={}",
        ticket.id, ticket.show_session_id, ticket.row, ticket.seat
    );
    Ok(ticket)
}
