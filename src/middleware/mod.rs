use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

/// Authenticated user that is also staff. Write access to the catalogue.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

// Структура для результата из БД
#[derive(sqlx::FromRow)]
struct TokenOwnerRow {
    id: i64,
    email: String,
    is_staff: bool,
}

/// Токены храним только в виде sha256, сам ключ видит лишь клиент
pub fn token_digest(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Extracts the key from `Authorization: Token <key>`.
pub fn parse_token_header(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    if scheme.eq_ignore_ascii_case("token") && !key.is_empty() && !key.contains(' ') {
        Some(key)
    } else {
        None
    }
}

// Token auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?;

        let key = parse_token_header(header_value)
            .ok_or_else(|| ApiError::unauthorized("Invalid token header."))?;

        let row: Option<TokenOwnerRow> = sqlx::query_as(
            "SELECT u.id, u.email, u.is_staff
             FROM auth_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.key_digest = $1 AND u.is_active = true"
        )
        .bind(token_digest(key))
        .fetch_optional(&state.db.pool)
        .await?;

        let user = row.ok_or_else(|| ApiError::unauthorized("Invalid token."))?;

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            is_staff: user.is_staff,
        })
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_scheme() {
        assert_eq!(parse_token_header("Token abc123"), Some("abc123"));
        assert_eq!(parse_token_header("token   abc123 "), Some("abc123"));
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(parse_token_header("Bearer abc123"), None);
        assert_eq!(parse_token_header("Token"), None);
        assert_eq!(parse_token_header("Token a b"), None);
        assert_eq!(parse_token_header(""), None);
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = token_digest("abc");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
