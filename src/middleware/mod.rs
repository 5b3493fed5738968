mod preflight;
mod rate_limit;

pub use preflight::preflight_middleware;
pub use rate_limit::{RateLimitError, extract_client_ip, rate_limit_middleware};
