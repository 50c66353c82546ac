use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{BookingStore, BookingTx, SessionOccupancy, StoreError};
use crate::models::{DomeGeometry, NewTicket, Reservation, Ticket};

// Имя уникального индекса из миграции, по нему отличаем гонку за место от прочих ошибок
const TICKET_SEAT_CONSTRAINT: &str = "tickets_session_row_seat_key";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBookingTx { tx }))
    }

    async fn session_occupancy(&self, session_id: i64) -> Result<Option<SessionOccupancy>, StoreError> {
        let row = sqlx::query_as::<_, (i32, i32, i64)>(
            r#"
            SELECT d.rows, d.seats_in_row, COUNT(t.id)
            FROM show_sessions s
            JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
            LEFT JOIN tickets t ON t.show_session_id = s.id
            WHERE s.id = $1
            GROUP BY d.rows, d.seats_in_row
            "#
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(rows, seats_in_row, tickets_sold)| SessionOccupancy {
            geometry: DomeGeometry::new(rows, seats_in_row),
            tickets_sold,
        }))
    }
}

pub struct PgBookingTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn session_geometry(&mut self, session_id: i64) -> Result<Option<DomeGeometry>, StoreError> {
        // FOR SHARE держит купол неизменным до конца транзакции
        let row = sqlx::query_as::<_, (i32, i32)>(
            r#"
            SELECT d.rows, d.seats_in_row
            FROM show_sessions s
            JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
            WHERE s.id = $1
            FOR SHARE OF d
            "#
        )
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|(rows, seats_in_row)| DomeGeometry::new(rows, seats_in_row)))
    }

    async fn insert_reservation(&mut self, user_id: i64) -> Result<Reservation, StoreError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (user_id) VALUES ($1) RETURNING id, user_id, created_at"
        )
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(reservation)
    }

    async fn seat_taken(&mut self, session_id: i64, row: i32, seat: i32) -> Result<bool, StoreError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM tickets WHERE show_session_id = $1 AND row = $2 AND seat = $3)"
        )
        .bind(session_id)
        .bind(row)
        .bind(seat)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(taken)
    }

    async fn insert_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (row, seat, show_session_id, reservation_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, row, seat, show_session_id, reservation_id
            "#
        )
        .bind(ticket.row)
        .bind(ticket.seat)
        .bind(ticket.show_session_id)
        .bind(ticket.reservation_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_seat_conflict(&e) {
                StoreError::SeatConflict {
                    session_id: ticket.show_session_id,
                    row: ticket.row,
                    seat: ticket.seat,
                }
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// Встречные брони одних и тех же мест ([A,B] против [B,A]) взаимно ждут друг
// друга на уникальном индексе, и Postgres обрывает одну из них по deadlock.
// Проигравшая транзакция всегда ждала место, которое держит другая.
fn is_seat_conflict(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => {
            let unique = db_err.is_unique_violation()
                && db_err.constraint().map_or(true, |c| c == TICKET_SEAT_CONSTRAINT);
            unique || db_err.code().as_deref() == Some(DEADLOCK_DETECTED)
        }
        _ => false,
    }
}
