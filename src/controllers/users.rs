use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation_as_field, ApiError};
use crate::middleware::{token_digest, AuthUser};
use crate::models::{user::hash_password, User};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(obtain_token))
        .route("/me", get(get_me).patch(update_me))
}

const EMAIL_TAKEN: &str = "user with this email already exists.";

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_staff: user.is_staff,
        }
    }
}

fn hashing_failed(e: anyhow::Error) -> ApiError {
    tracing::error!("password hashing failed: {:?}", e);
    ApiError::Internal
}

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

// POST /api/user/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let password_hash = hash_password(&req.password).await.map_err(hashing_failed)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, first_name, last_name)
         VALUES ($1, $2, $3, $4)
         RETURNING id, email, password_hash, first_name, last_name, is_staff, is_active, date_joined"
    )
    .bind(req.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| unique_violation_as_field(e, "users_email_key", "email", EMAIL_TAKEN))?;

    tracing::info!("user {} registered", user.id);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

// POST /api/user/token
async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let bad_credentials = || ApiError::non_field("Unable to log in with provided credentials.");

    let user = User::find_by_email(&req.email.trim().to_lowercase(), &state.db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(bad_credentials)?;

    if !user.verify_password(&req.password).await {
        return Err(bad_credentials());
    }

    // Новый ключ при каждом входе, старый перестаёт работать
    let key = Uuid::new_v4().simple().to_string();
    sqlx::query(
        "INSERT INTO auth_tokens (user_id, key_digest)
         VALUES ($1, $2)
         ON CONFLICT (user_id) DO UPDATE SET key_digest = EXCLUDED.key_digest, created_at = NOW()"
    )
    .bind(user.id)
    .bind(token_digest(&key))
    .execute(&state.db.pool)
    .await?;

    Ok(Json(TokenResponse { token: key }))
}

// GET /api/user/me
async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(auth.user_id, &state.db)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(UserResponse::from(user)))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateMeRequest {
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

// PATCH /api/user/me
async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_password(password).await.map_err(hashing_failed)?),
        None => None,
    };

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET
            email = COALESCE($2, email),
            password_hash = COALESCE($3, password_hash),
            first_name = COALESCE($4, first_name),
            last_name = COALESCE($5, last_name)
         WHERE id = $1
         RETURNING id, email, password_hash, first_name, last_name, is_staff, is_active, date_joined"
    )
    .bind(auth.user_id)
    .bind(req.email.map(|e| e.trim().to_lowercase()))
    .bind(password_hash)
    .bind(req.first_name)
    .bind(req.last_name)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| unique_violation_as_field(e, "users_email_key", "email", EMAIL_TAKEN))?;

    Ok(Json(UserResponse::from(user)))
}
