use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Темы хранятся отдельно (astronomy_show_themes), тут только сама запись
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AstronomyShow {
    pub id: i64,
    pub title: String,
    pub description: String,
}
