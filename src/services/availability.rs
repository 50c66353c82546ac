use crate::models::DomeGeometry;
use crate::storage::SessionOccupancy;

/// Free seats left in a session: capacity minus sold tickets, never negative.
///
/// The clamp only matters if a dome was shrunk after tickets were sold on it.
pub fn available_seats(geometry: &DomeGeometry, tickets_sold: i64) -> i64 {
    (geometry.capacity() - tickets_sold).max(0)
}

impl SessionOccupancy {
    pub fn available_seats(&self) -> i64 {
        available_seats(&self.geometry, self.tickets_sold)
    }
}
