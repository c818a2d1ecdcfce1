//! Domain module - core entities and collaborator contracts.

pub mod fingerprint;
pub mod review;
pub mod services;
pub mod source;

pub use fingerprint::review_fingerprint;
pub use review::{ReviewRecord, ScrapeOutcome, ScrapeSummary, ANONYMOUS_REVIEWER};
pub use services::{PageFetcher, ReviewStore};
pub use source::SourceId;
