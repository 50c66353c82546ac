//! In-process booking store.
//!
//! Transactions stage their writes privately and publish them on commit.
//! The seat uniqueness rule is checked both on insert (against committed
//! rows and the transaction's own staged rows) and again on commit, so two
//! overlapping transactions that both pass the advisory check still end
//! with exactly one winner, the same way PostgreSQL behaves.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{BookingStore, BookingTx, SessionOccupancy, StoreError};
use crate::models::{DomeGeometry, NewTicket, Reservation, Ticket};

#[derive(Debug, Default)]
struct Tables {
    next_reservation_id: i64,
    next_ticket_id: i64,
    sessions: HashMap<i64, DomeGeometry>,
    reservations: BTreeMap<i64, Reservation>,
    tickets: BTreeMap<i64, Ticket>,
}

impl Tables {
    fn seat_claimed(&self, session_id: i64, row: i32, seat: i32) -> bool {
        self.tickets
            .values()
            .any(|t| t.show_session_id == session_id && t.row == row && t.seat == seat)
    }
}

#[derive(Clone, Default)]
pub struct MemoryBookingStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session(&self, session_id: i64, geometry: DomeGeometry) {
        self.lock().sessions.insert(session_id, geometry);
    }

    pub fn reservation_count(&self) -> usize {
        self.lock().reservations.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.lock().tickets.len()
    }

    pub fn tickets_for_session(&self, session_id: i64) -> Vec<Ticket> {
        self.lock()
            .tickets
            .values()
            .filter(|t| t.show_session_id == session_id)
            .cloned()
            .collect()
    }

    /// Deletes a reservation together with its tickets.
    pub fn delete_reservation(&self, reservation_id: i64) -> bool {
        let mut tables = self.lock();
        tables.tickets.retain(|_, t| t.reservation_id != reservation_id);
        tables.reservations.remove(&reservation_id).is_some()
    }

    /// Deletes a session together with its tickets.
    pub fn delete_session(&self, session_id: i64) -> bool {
        let mut tables = self.lock();
        tables.tickets.retain(|_, t| t.show_session_id != session_id);
        tables.sessions.remove(&session_id).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        Ok(Box::new(MemoryBookingTx {
            tables: Arc::clone(&self.tables),
            reservations: Vec::new(),
            tickets: Vec::new(),
        }))
    }

    async fn session_occupancy(&self, session_id: i64) -> Result<Option<SessionOccupancy>, StoreError> {
        let tables = self.lock();
        Ok(tables.sessions.get(&session_id).map(|geometry| SessionOccupancy {
            geometry: *geometry,
            tickets_sold: tables
                .tickets
                .values()
                .filter(|t| t.show_session_id == session_id)
                .count() as i64,
        }))
    }
}

pub struct MemoryBookingTx {
    tables: Arc<Mutex<Tables>>,
    reservations: Vec<Reservation>,
    tickets: Vec<Ticket>,
}

impl MemoryBookingTx {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn staged_claim(&self, session_id: i64, row: i32, seat: i32) -> bool {
        self.tickets
            .iter()
            .any(|t| t.show_session_id == session_id && t.row == row && t.seat == seat)
    }
}

#[async_trait]
impl BookingTx for MemoryBookingTx {
    async fn session_geometry(&mut self, session_id: i64) -> Result<Option<DomeGeometry>, StoreError> {
        Ok(self.lock().sessions.get(&session_id).copied())
    }

    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let id = {
            let mut tables = self.lock();
            tables.next_reservation_id += 1;
            tables.next_reservation_id
        };
        let reservation = Reservation {
            id,
            user_id,
            created_at: Utc::now(),
        };
        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    async fn seat_taken(&mut self, session_id: i64, row: i32, seat: i32) -> Result<bool, StoreError> {
        Ok(self.staged_claim(session_id, row, seat) || self.lock().seat_claimed(session_id, row, seat))
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let conflict = StoreError::SeatConflict {
            session_id: ticket.show_session_id,
            row: ticket.row,
            seat: ticket.seat,
        };
        if self.staged_claim(ticket.show_session_id, ticket.row, ticket.seat) {
            return Err(conflict);
        }

        let id = {
            let mut tables = self.lock();
            if tables.seat_claimed(ticket.show_session_id, ticket.row, ticket.seat) {
                return Err(conflict);
            }
            tables.next_ticket_id += 1;
            tables.next_ticket_id
        };

        let ticket = Ticket {
            id,
            row: ticket.row,
            seat: ticket.seat,
            show_session_id: ticket.show_session_id,
            reservation_id: ticket.reservation_id,
        };
        self.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut tables = self.lock();

        // Кто-то мог закоммитить то же место, пока мы держали его в staging
        if let Some(t) = self
            .tickets
            .iter()
            .find(|t| tables.seat_claimed(t.show_session_id, t.row, t.seat))
        {
            return Err(StoreError::SeatConflict {
                session_id: t.show_session_id,
                row: t.row,
                seat: t.seat,
            });
        }

        for reservation in &self.reservations {
            tables.reservations.insert(reservation.id, reservation.clone());
        }
        for ticket in &self.tickets {
            tables.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
