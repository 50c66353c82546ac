use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::sessions::{SessionListItem, SESSION_LIST_GROUP_BY, SESSION_LIST_SELECT};
use crate::config::PaginationConfig;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::{Reservation, Ticket};
use crate::services::{BookedReservation, SeatRequest};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reservations", get(list_reservations).post(create_reservation))
}

/* ---------- projections ---------- */

/// Ticket inside a freshly created reservation: session as an id.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: i64,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketResponse>,
}

/// Ticket inside the reservations list: session in its list shape.
#[derive(Debug, Serialize)]
pub struct TicketListItem {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session: Option<SessionListItem>,
}

#[derive(Debug, Serialize)]
pub struct ReservationListItem {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketListItem>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub results: Vec<T>,
}

pub fn reservation_view(booked: &BookedReservation) -> ReservationResponse {
    ReservationResponse {
        id: booked.reservation.id,
        created_at: booked.reservation.created_at,
        tickets: booked
            .tickets
            .iter()
            .map(|t| TicketResponse {
                id: t.id,
                row: t.row,
                seat: t.seat,
                show_session: t.show_session_id,
            })
            .collect(),
    }
}

pub fn reservation_list_item(
    reservation: &Reservation,
    tickets: Vec<Ticket>,
    sessions: &HashMap<i64, SessionListItem>,
) -> ReservationListItem {
    ReservationListItem {
        id: reservation.id,
        created_at: reservation.created_at,
        tickets: tickets
            .into_iter()
            .map(|t| TicketListItem {
                id: t.id,
                row: t.row,
                seat: t.seat,
                show_session: sessions.get(&t.show_session_id).cloned(),
            })
            .collect(),
    }
}

/* ---------- pagination ---------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
}

impl PageWindow {
    pub fn resolve(page: Option<u32>, page_size: Option<u32>, config: &PaginationConfig) -> Self {
        let max = config.reservations_max_page_size.max(1);
        PageWindow {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(config.reservations_page_size)
                .clamp(1, max),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn next_page(&self, count: i64) -> Option<u32> {
        (self.offset() + (self.page_size as i64) < count).then(|| self.page + 1)
    }

    pub fn previous_page(&self) -> Option<u32> {
        (self.page > 1).then(|| self.page - 1)
    }
}

/* ---------- handlers ---------- */

#[derive(Debug, Deserialize)]
struct ReservationsQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

// GET /api/planetarium/reservations
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ReservationsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = PageWindow::resolve(params.page, params.page_size, &state.config.pagination);

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reservations WHERE user_id = $1"
    )
    .bind(user.user_id)
    .fetch_one(&state.db.pool)
    .await?;

    if window.page > 1 && window.offset() >= count {
        return Err(ApiError::NotFound);
    }

    let reservations = sqlx::query_as::<_, Reservation>(
        "SELECT id, user_id, created_at FROM reservations
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3"
    )
    .bind(user.user_id)
    .bind(window.page_size as i64)
    .bind(window.offset())
    .fetch_all(&state.db.pool)
    .await?;

    let reservation_ids: Vec<i64> = reservations.iter().map(|r| r.id).collect();

    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT id, row, seat, show_session_id, reservation_id FROM tickets
         WHERE reservation_id = ANY($1)
         ORDER BY row, seat"
    )
    .bind(&reservation_ids)
    .fetch_all(&state.db.pool)
    .await?;

    let mut session_ids: Vec<i64> = tickets.iter().map(|t| t.show_session_id).collect();
    session_ids.sort_unstable();
    session_ids.dedup();

    let q = format!("{SESSION_LIST_SELECT} WHERE s.id = ANY($1) {SESSION_LIST_GROUP_BY}");
    let sessions: HashMap<i64, SessionListItem> = sqlx::query_as::<_, SessionListItem>(&q)
        .bind(&session_ids)
        .fetch_all(&state.db.pool)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut tickets_by_reservation: HashMap<i64, Vec<Ticket>> = HashMap::new();
    for ticket in tickets {
        tickets_by_reservation.entry(ticket.reservation_id).or_default().push(ticket);
    }

    let results: Vec<ReservationListItem> = reservations
        .iter()
        .map(|r| {
            let tickets = tickets_by_reservation.remove(&r.id).unwrap_or_default();
            reservation_list_item(r, tickets, &sessions)
        })
        .collect();

    Ok(Json(Page {
        count,
        next_page: window.next_page(count),
        previous_page: window.previous_page(),
        results,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    #[serde(default)]
    tickets: Vec<SeatRequest>,
}

// POST /api/planetarium/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booked = state
        .booking
        .create_reservation(user.user_id, &req.tickets)
        .await?;

    Ok((StatusCode::CREATED, Json(reservation_view(&booked))))
}
