use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use super::contains_pattern;
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::ShowTheme;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show_themes", get(list_themes).post(create_theme))
}

#[derive(Debug, Deserialize)]
struct ThemesQuery {
    name: Option<String>,
}

// GET /api/planetarium/show_themes
async fn list_themes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ThemesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let themes = sqlx::query_as::<_, ShowTheme>(
        "SELECT id, name FROM show_themes
         WHERE ($1::TEXT IS NULL OR name ILIKE $1)
         ORDER BY id"
    )
    .bind(contains_pattern(params.name.as_deref()))
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(themes))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateThemeRequest {
    #[validate(length(min = 1, max = 63))]
    name: String,
}

impl CreateThemeRequest {
    fn trimmed(self) -> Self {
        Self { name: self.name.trim().to_string() }
    }
}

// POST /api/planetarium/show_themes
async fn create_theme(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateThemeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req.trimmed();
    req.validate()?;

    let theme = sqlx::query_as::<_, ShowTheme>(
        "INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name"
    )
    .bind(&req.name)
    .fetch_one(&state.db.pool)
    .await?;

    tracing::info!("show theme {} created by {}", theme.id, admin.email);
    Ok((StatusCode::CREATED, Json(theme)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_theme_name_is_rejected() {
        let req = CreateThemeRequest { name: " \t ".to_string() }.trimmed();
        assert!(req.validate().is_err());

        let req = CreateThemeRequest { name: " Galaxies ".to_string() }.trimmed();
        assert!(req.validate().is_ok());
        assert_eq!(req.name, "Galaxies");
    }
}
