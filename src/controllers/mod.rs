pub mod domes;
pub mod reservations;
pub mod sessions;
pub mod shows;
pub mod themes;
pub mod users;

use axum::Router;
use std::sync::Arc;

use crate::error::ApiError;

/// Routes under `/api/planetarium`.
pub fn planetarium_routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(themes::routes())
        .merge(shows::routes())
        .merge(domes::routes())
        .merge(sessions::routes())
        .merge(reservations::routes())
}

/// Routes under `/api/user`.
pub fn user_routes() -> Router<Arc<crate::AppState>> {
    users::routes()
}

/* ---------- helpers ---------- */

// ILIKE-шаблон для фильтра "содержит", спецсимволы экранируем
pub(crate) fn contains_pattern(value: Option<&str>) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    Some(escaped)
}

/// Turns a foreign-key violation into a 400 on `field`.
pub(crate) fn foreign_key_as_field(err: sqlx::Error, field: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            return ApiError::field(field, "Invalid pk - object does not exist.");
        }
    }
    ApiError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_wraps_and_escapes() {
        assert_eq!(contains_pattern(Some("moon")).as_deref(), Some("%moon%"));
        assert_eq!(contains_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }

    #[test]
    fn blank_filter_is_ignored() {
        assert_eq!(contains_pattern(None), None);
        assert_eq!(contains_pattern(Some("   ")), None);
    }
}
