use std::sync::Arc;
use tracing::{error, info, warn};

use super::admission::{self, AdmissionError, SeatRequest};
use crate::models::{Reservation, Ticket};
use crate::storage::{BookingStore, BookingTx};

/// A committed reservation with the tickets it owns, in request order.
#[derive(Debug, Clone)]
pub struct BookedReservation {
    pub reservation: Reservation,
    pub tickets: Vec<Ticket>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Creates a reservation for `user_id` with one ticket per request.
    ///
    /// All or nothing: if any seat is rejected the transaction is rolled
    /// back, no reservation or ticket from this call survives, and the
    /// first rejection is returned.
    pub async fn create_reservation(
        &self,
        user_id: i64,
        requests: &[SeatRequest],
    ) -> Result<BookedReservation, AdmissionError> {
        if requests.is_empty() {
            return Err(AdmissionError::EmptyReservation);
        }

        let mut tx = self.store.begin().await?;

        match admit_all(&mut *tx, user_id, requests).await {
            Ok(booked) => {
                tx.commit().await?;
                info!(
                    "reservation {} created for user {} with {} tickets",
                    booked.reservation.id, user_id, booked.tickets.len()
                );
                Ok(booked)
            }
            Err(e) => {
                warn!("reservation for user {} rejected: {}", user_id, e);
                if let Err(rollback_err) = tx.rollback().await {
                    error!("failed to roll back reservation for user {}: {:?}", user_id, rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Free seats of a session, recomputed from the store on every call.
    /// `None` if the session does not exist.
    pub async fn available_seats(&self, session_id: i64) -> Result<Option<i64>, AdmissionError> {
        let occupancy = self.store.session_occupancy(session_id).await?;
        Ok(occupancy.map(|o| o.available_seats()))
    }
}

async fn admit_all(
    tx: &mut dyn BookingTx,
    user_id: i64,
    requests: &[SeatRequest],
) -> Result<BookedReservation, AdmissionError> {
    let reservation = tx.insert_reservation(user_id).await?;

    let mut tickets = Vec::with_capacity(requests.len());
    for request in requests {
        tickets.push(admission::admit(tx, *request, &reservation).await?);
    }

    Ok(BookedReservation { reservation, tickets })
}
