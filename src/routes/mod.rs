pub mod api;
pub mod error;
pub mod health;

pub use api::{api_routes, not_found};
pub use error::ApiError;
