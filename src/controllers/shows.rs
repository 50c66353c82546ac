use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use super::{contains_pattern, foreign_key_as_field};
use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::{AstronomyShow, ShowTheme};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows", get(list_shows).post(create_show))
        .route("/shows/{id}", get(get_show).put(update_show).patch(patch_show))
}

/* ---------- projections ---------- */

#[derive(Debug, Serialize)]
pub struct ShowListItem {
    pub id: i64,
    pub title: String,
    #[serde(rename = "theme")]
    pub themes: Vec<ShowTheme>,
}

#[derive(Debug, Serialize)]
pub struct ShowDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "theme")]
    pub themes: Vec<String>,
}

/// Write shape: themes as ids.
#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(rename = "theme")]
    pub themes: Vec<i64>,
}

fn show_list_item(show: AstronomyShow, themes: Vec<ShowTheme>) -> ShowListItem {
    ShowListItem { id: show.id, title: show.title, themes }
}

fn show_detail(show: AstronomyShow, themes: Vec<ShowTheme>) -> ShowDetail {
    ShowDetail {
        id: show.id,
        title: show.title,
        description: show.description,
        themes: themes.into_iter().map(|t| t.name).collect(),
    }
}

/* ---------- helpers ---------- */

#[derive(sqlx::FromRow)]
struct ShowThemeLink {
    astronomy_show_id: i64,
    id: i64,
    name: String,
}

async fn themes_by_show(pool: &sqlx::PgPool, show_ids: &[i64]) -> sqlx::Result<HashMap<i64, Vec<ShowTheme>>> {
    let links = sqlx::query_as::<_, ShowThemeLink>(
        r#"
        SELECT st.astronomy_show_id, t.id, t.name
        FROM astronomy_show_themes st
        JOIN show_themes t ON t.id = st.show_theme_id
        WHERE st.astronomy_show_id = ANY($1)
        ORDER BY t.id
        "#
    )
    .bind(show_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<i64, Vec<ShowTheme>> = HashMap::new();
    for link in links {
        map.entry(link.astronomy_show_id)
            .or_default()
            .push(ShowTheme { id: link.id, name: link.name });
    }
    Ok(map)
}

async fn replace_show_themes(
    tx: &mut sqlx::PgConnection,
    show_id: i64,
    theme_ids: &[i64],
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM astronomy_show_themes WHERE astronomy_show_id = $1")
        .bind(show_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO astronomy_show_themes (astronomy_show_id, show_theme_id)
         SELECT $1, theme_id FROM UNNEST($2::BIGINT[]) AS theme_id
         ON CONFLICT DO NOTHING"
    )
    .bind(show_id)
    .bind(theme_ids)
    .execute(&mut *tx)
    .await
    .map_err(|e| foreign_key_as_field(e, "themes"))?;

    Ok(())
}

/* ---------- handlers ---------- */

#[derive(Debug, Deserialize)]
struct ShowsQuery {
    theme: Option<String>,
    title: Option<String>,
}

// GET /api/planetarium/shows
async fn list_shows(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ShowsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let shows = sqlx::query_as::<_, AstronomyShow>(
        r#"
        SELECT a.id, a.title, a.description
        FROM astronomy_shows a
        WHERE ($1::TEXT IS NULL OR a.title ILIKE $1)
          AND ($2::TEXT IS NULL OR EXISTS(
                SELECT 1
                FROM astronomy_show_themes st
                JOIN show_themes t ON t.id = st.show_theme_id
                WHERE st.astronomy_show_id = a.id AND t.name ILIKE $2
          ))
        ORDER BY a.id
        "#
    )
    .bind(contains_pattern(params.title.as_deref()))
    .bind(contains_pattern(params.theme.as_deref()))
    .fetch_all(&state.db.pool)
    .await?;

    let ids: Vec<i64> = shows.iter().map(|s| s.id).collect();
    let mut themes = themes_by_show(&state.db.pool, &ids).await?;

    let payload: Vec<ShowListItem> = shows
        .into_iter()
        .map(|show| {
            let show_themes = themes.remove(&show.id).unwrap_or_default();
            show_list_item(show, show_themes)
        })
        .collect();

    Ok(Json(payload))
}

// GET /api/planetarium/shows/{id}
async fn get_show(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let show = sqlx::query_as::<_, AstronomyShow>(
        "SELECT id, title, description FROM astronomy_shows WHERE id = $1"
    )
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    let themes = themes_by_show(&state.db.pool, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();

    Ok(Json(show_detail(show, themes)))
}

#[derive(Debug, Deserialize, Validate)]
struct ShowRequest {
    #[validate(length(min = 1, max = 255))]
    title: String,
    description: String,
    #[serde(default, rename = "theme")]
    themes: Vec<i64>,
}

// POST /api/planetarium/shows
async fn create_show(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(req): Json<ShowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ($1, $2)
         RETURNING id, title, description"
    )
    .bind(&req.title)
    .bind(&req.description)
    .fetch_one(&mut *tx)
    .await?;

    replace_show_themes(&mut tx, show.id, &req.themes).await?;
    tx.commit().await?;

    tracing::info!("astronomy show {} created by {}", show.id, admin.email);
    Ok((
        StatusCode::CREATED,
        Json(ShowResponse {
            id: show.id,
            title: show.title,
            description: show.description,
            themes: req.themes,
        }),
    ))
}

// PUT /api/planetarium/shows/{id}
async fn update_show(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<ShowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "UPDATE astronomy_shows SET title = $2, description = $3
         WHERE id = $1
         RETURNING id, title, description"
    )
    .bind(id)
    .bind(&req.title)
    .bind(&req.description)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound)?;

    replace_show_themes(&mut tx, show.id, &req.themes).await?;
    tx.commit().await?;

    tracing::info!("astronomy show {} updated by {}", show.id, admin.email);
    Ok(Json(ShowResponse {
        id: show.id,
        title: show.title,
        description: show.description,
        themes: req.themes,
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct PatchShowRequest {
    #[validate(length(min = 1, max = 255))]
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "theme")]
    themes: Option<Vec<i64>>,
}

// PATCH /api/planetarium/shows/{id}
async fn patch_show(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<PatchShowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;

    let show = sqlx::query_as::<_, AstronomyShow>(
        "UPDATE astronomy_shows SET
            title = COALESCE($2, title),
            description = COALESCE($3, description)
         WHERE id = $1
         RETURNING id, title, description"
    )
    .bind(id)
    .bind(req.title)
    .bind(req.description)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound)?;

    // темы не переданы - связи остаются как были
    if let Some(theme_ids) = &req.themes {
        replace_show_themes(&mut tx, show.id, theme_ids).await?;
    }
    let themes = sqlx::query_scalar::<_, i64>(
        "SELECT show_theme_id FROM astronomy_show_themes WHERE astronomy_show_id = $1 ORDER BY show_theme_id"
    )
    .bind(show.id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!("astronomy show {} patched by {}", show.id, admin.email);
    Ok(Json(ShowResponse {
        id: show.id,
        title: show.title,
        description: show.description,
        themes,
    }))
}
