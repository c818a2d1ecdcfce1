//! Boundary traits for the orchestrator's collaborators.
//!
//! The engine consumes transport and storage through trait objects so that
//! tests can substitute stubs and the concrete implementations stay
//! replaceable without touching orchestration logic.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::review::{ReviewRecord, ScrapeOutcome};
use crate::infrastructure::http_client::FetchError;

/// HTTP GET capability returning decoded page markup or a typed failure.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Storage collaborator. `save_reviews` must be idempotent per fingerprint
/// and safe under concurrent invocation; the engine only writes, never
/// queries, during a batch.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist records, returning how many were newly stored. Records whose
    /// fingerprint is already known count as zero.
    async fn save_reviews(&self, reviews: &[ReviewRecord]) -> Result<u32>;

    /// Record a per-URL outcome for monitoring.
    async fn record_outcome(&self, outcome: &ScrapeOutcome) -> Result<()>;
}
