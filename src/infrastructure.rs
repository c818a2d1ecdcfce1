//! Infrastructure layer: configuration, logging, HTTP, rate limiting and
//! persistence.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod rate_limiter;
pub mod repository;

pub use config::AppConfig;
pub use http_client::{FetchError, HttpClient, HttpClientConfig};
pub use rate_limiter::RateLimiter;
pub use repository::{ReviewFilter, ReviewRepository, ReviewStatistics};
