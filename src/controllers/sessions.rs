use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::domes::{dome_view, DomeResponse};
use super::foreign_key_as_field;
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{AstronomyShow, Dome, ShowSession};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route(
            "/sessions/{id}",
            get(get_session)
                .put(update_session)
                .patch(patch_session)
                .delete(delete_session),
        )
}

/* ---------- projections ---------- */

/// List shape. `tickets_available` comes from one aggregate join; it equals
/// capacity minus sold tickets because `(session, row, seat)` is unique.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionListItem {
    pub id: i64,
    pub astronomy_show_title: String,
    pub planetarium_dome_name: String,
    pub planetarium_dome_capacity: i64,
    pub show_time: DateTime<Utc>,
    pub tickets_available: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub id: i64,
    pub astronomy_show: AstronomyShow,
    pub planetarium_dome: DomeResponse,
    pub show_time: DateTime<Utc>,
    pub tickets_available: i64,
    pub taken_places: Vec<TakenPlace>,
}

// Общий SELECT для списка сеансов, используется и в бронированиях
pub(crate) const SESSION_LIST_SELECT: &str = r#"
    SELECT s.id,
           a.title AS astronomy_show_title,
           d.name AS planetarium_dome_name,
           (d.rows::BIGINT * d.seats_in_row::BIGINT) AS planetarium_dome_capacity,
           s.show_time,
           GREATEST((d.rows::BIGINT * d.seats_in_row::BIGINT) - COUNT(t.id), 0) AS tickets_available
    FROM show_sessions s
    JOIN astronomy_shows a ON a.id = s.astronomy_show_id
    JOIN planetarium_domes d ON d.id = s.planetarium_dome_id
    LEFT JOIN tickets t ON t.show_session_id = s.id
"#;

pub(crate) const SESSION_LIST_GROUP_BY: &str =
    " GROUP BY s.id, a.title, d.name, d.rows, d.seats_in_row, s.show_time";

fn parse_date_filter(date: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::field("date", "Date has wrong format. Use YYYY-MM-DD.")),
        None => Ok(None),
    }
}

/* ---------- handlers ---------- */

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    date: Option<String>,
}

// GET /api/planetarium/sessions
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date_filter(params.date.as_deref())?;

    let q = format!(
        "{SESSION_LIST_SELECT}
         WHERE ($1::DATE IS NULL OR (s.show_time AT TIME ZONE 'UTC')::DATE = $1)
         {SESSION_LIST_GROUP_BY}
         ORDER BY s.show_time DESC"
    );

    let sessions = sqlx::query_as::<_, SessionListItem>(&q)
        .bind(date)
        .fetch_all(&state.db.pool)
        .await?;

    Ok(Json(sessions))
}

// GET /api/planetarium/sessions/{id}
async fn get_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = sqlx::query_as::<_, ShowSession>(
        "SELECT id, astronomy_show_id, planetarium_dome_id, show_time FROM show_sessions WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "SELECT id, title, description FROM astronomy_shows WHERE id = $1"
    )
    .bind(session.astronomy_show_id)
    .fetch_one(&state.db.pool)
    .await?;

    let dome = sqlx::query_as::<_, Dome>(
        "SELECT id, name, rows, seats_in_row FROM planetarium_domes WHERE id = $1"
    )
    .bind(session.planetarium_dome_id)
    .fetch_one(&state.db.pool)
    .await?;

    let taken_places = sqlx::query_as::<_, TakenPlace>(
        "SELECT row, seat FROM tickets WHERE show_session_id = $1 ORDER BY row, seat"
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    let tickets_available = state
        .booking
        .available_seats(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(SessionDetail {
        id: session.id,
        astronomy_show: show,
        planetarium_dome: dome_view(&dome),
        show_time: session.show_time,
        tickets_available,
        taken_places,
    }))
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    astronomy_show: i64,
    planetarium_dome: i64,
    show_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    id: i64,
    astronomy_show: i64,
    planetarium_dome: i64,
    show_time: DateTime<Utc>,
}

impl From<ShowSession> for SessionResponse {
    fn from(s: ShowSession) -> Self {
        SessionResponse {
            id: s.id,
            astronomy_show: s.astronomy_show_id,
            planetarium_dome: s.planetarium_dome_id,
            show_time: s.show_time,
        }
    }
}

// Какое именно FK нарушено, видно по имени ограничения
fn session_fk_error(err: sqlx::Error) -> ApiError {
    let field = match &err {
        sqlx::Error::Database(db_err) if db_err.constraint().is_some_and(|c| c.contains("planetarium_dome")) => {
            "planetarium_dome"
        }
        _ => "astronomy_show",
    };
    foreign_key_as_field(err, field)
}

// POST /api/planetarium/sessions
async fn create_session(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = sqlx::query_as::<_, ShowSession>(
        "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time)
         VALUES ($1, $2, $3)
         RETURNING id, astronomy_show_id, planetarium_dome_id, show_time"
    )
    .bind(req.astronomy_show)
    .bind(req.planetarium_dome)
    .bind(req.show_time)
    .fetch_one(&state.db.pool)
    .await
    .map_err(session_fk_error)?;

    tracing::info!("session {} created by {}", session.id, admin.email);
    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

// PUT /api/planetarium/sessions/{id}
async fn update_session(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = sqlx::query_as::<_, ShowSession>(
        "UPDATE show_sessions
         SET astronomy_show_id = $2, planetarium_dome_id = $3, show_time = $4
         WHERE id = $1
         RETURNING id, astronomy_show_id, planetarium_dome_id, show_time"
    )
    .bind(id)
    .bind(req.astronomy_show)
    .bind(req.planetarium_dome)
    .bind(req.show_time)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(session_fk_error)?
    .ok_or(ApiError::NotFound)?;

    tracing::info!("session {} updated by {}", session.id, admin.email);
    Ok(Json(SessionResponse::from(session)))
}

#[derive(Debug, Deserialize)]
struct PatchSessionRequest {
    astronomy_show: Option<i64>,
    planetarium_dome: Option<i64>,
    show_time: Option<DateTime<Utc>>,
}

// PATCH /api/planetarium/sessions/{id}
async fn patch_session(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<PatchSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = sqlx::query_as::<_, ShowSession>(
        "UPDATE show_sessions SET
            astronomy_show_id = COALESCE($2, astronomy_show_id),
            planetarium_dome_id = COALESCE($3, planetarium_dome_id),
            show_time = COALESCE($4, show_time)
         WHERE id = $1
         RETURNING id, astronomy_show_id, planetarium_dome_id, show_time"
    )
    .bind(id)
    .bind(req.astronomy_show)
    .bind(req.planetarium_dome)
    .bind(req.show_time)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(session_fk_error)?
    .ok_or(ApiError::NotFound)?;

    tracing::info!("session {} patched by {}", session.id, admin.email);
    Ok(Json(SessionResponse::from(session)))
}

// DELETE /api/planetarium/sessions/{id}
async fn delete_session(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    // билеты сеанса удаляются каскадом
    let deleted = sqlx::query("DELETE FROM show_sessions WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }

    tracing::info!("session {} deleted by {}", id, admin.email);
    Ok(StatusCode::NO_CONTENT)
}
