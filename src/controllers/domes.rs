use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::contains_pattern;
use crate::error::{unique_violation_as_field, ApiError};
use crate::middleware::{AdminUser, AuthUser};
use crate::models::Dome;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/domes", get(list_domes).post(create_dome))
}

#[derive(Debug, Serialize)]
pub struct DomeResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

pub fn dome_view(dome: &Dome) -> DomeResponse {
    DomeResponse {
        id: dome.id,
        name: dome.name.clone(),
        rows: dome.rows,
        seats_in_row: dome.seats_in_row,
        capacity: dome.capacity(),
    }
}

#[derive(Debug, Deserialize)]
struct DomesQuery {
    name: Option<String>,
}

// GET /api/planetarium/domes
async fn list_domes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<DomesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let domes = sqlx::query_as::<_, Dome>(
        "SELECT id, name, rows, seats_in_row FROM planetarium_domes
         WHERE ($1::TEXT IS NULL OR name ILIKE $1)
         ORDER BY id"
    )
    .bind(contains_pattern(params.name.as_deref()))
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<DomeResponse> = domes.iter().map(dome_view).collect();
    Ok(Json(payload))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateDomeRequest {
    #[validate(length(min = 1, max = 63))]
    name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    rows: i32,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    seats_in_row: i32,
}

impl CreateDomeRequest {
    // Валидируем уже обрезанное имя, иначе "   " прошло бы как непустое
    fn trimmed(self) -> Self {
        Self { name: self.name.trim().to_string(), ..self }
    }
}

// POST /api/planetarium/domes
async fn create_dome(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateDomeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.trimmed();
    req.validate()?;

    let dome = sqlx::query_as::<_, Dome>(
        "INSERT INTO planetarium_domes (name, rows, seats_in_row)
         VALUES ($1, $2, $3)
         RETURNING id, name, rows, seats_in_row"
    )
    .bind(&req.name)
    .bind(req.rows)
    .bind(req.seats_in_row)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| unique_violation_as_field(
        e,
        "planetarium_domes_name_key",
        "name",
        "planetarium dome with this name already exists.",
    ))?;

    tracing::info!("dome {} ({}x{}) created by {}", dome.name, dome.rows, dome.seats_in_row, admin.email);
    Ok((StatusCode::CREATED, Json(dome_view(&dome))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateDomeRequest {
        CreateDomeRequest { name: name.to_string(), rows: 5, seats_in_row: 10 }
    }

    #[test]
    fn blank_name_is_rejected_after_trimming() {
        let errors = request("   ").trimmed().validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn name_is_stored_trimmed() {
        let req = request("  Main Dome ").trimmed();
        assert!(req.validate().is_ok());
        assert_eq!(req.name, "Main Dome");
    }
}
