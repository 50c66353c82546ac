use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Dome {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl Dome {
    pub fn geometry(&self) -> DomeGeometry {
        DomeGeometry::new(self.rows, self.seats_in_row)
    }

    pub fn capacity(&self) -> i64 {
        self.geometry().capacity()
    }
}

/// Seating grid of a dome: `rows` rows of `seats_in_row` seats each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomeGeometry {
    pub rows: i32,
    pub seats_in_row: i32,
}

impl DomeGeometry {
    pub const fn new(rows: i32, seats_in_row: i32) -> Self {
        Self { rows, seats_in_row }
    }

    pub const fn capacity(&self) -> i64 {
        self.rows as i64 * self.seats_in_row as i64
    }
}
