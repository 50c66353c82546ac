pub mod dome;
pub mod reservation;
pub mod session;
pub mod show;
pub mod theme;
pub mod ticket;
pub mod user;

pub use dome::{Dome, DomeGeometry};
pub use reservation::Reservation;
pub use session::ShowSession;
pub use show::AstronomyShow;
pub use theme::ShowTheme;
pub use ticket::{NewTicket, Ticket};
pub use user::User;
