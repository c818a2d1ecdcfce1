//! review-harvester: customer-review collection for supported retail sites.
//!
//! The crate fetches product pages under a shared sliding-window rate limit,
//! extracts reviews with per-retailer strategy pipelines, fingerprints each
//! review for deduplication and persists everything to SQLite. The
//! [`orchestrator::ScrapeOrchestrator`] ties the layers together.

pub mod domain;
pub mod extraction;
pub mod infrastructure;
pub mod orchestrator;
pub mod utils;

pub use domain::review::{ReviewRecord, ScrapeOutcome, ScrapeSummary};
pub use domain::services::{PageFetcher, ReviewStore};
pub use domain::source::SourceId;
pub use extraction::{default_scrapers, SourceScraper};
pub use infrastructure::{
    AppConfig, FetchError, HttpClient, RateLimiter, ReviewFilter, ReviewRepository,
};
pub use orchestrator::{OrchestratorConfig, ScrapeOrchestrator};
