pub mod ids;

pub use ids::{Email, Role, UserId};
