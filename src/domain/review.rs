//! Core data model: normalized review records and per-run scrape results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::source::SourceId;

/// Placeholder used when a page does not expose the reviewer's name.
pub const ANONYMOUS_REVIEWER: &str = "Anonymous";

/// A normalized customer review, immutable once constructed by an extraction
/// pipeline.
///
/// Invariants upheld by the pipeline: `product_id` and `review_id` are
/// non-empty, `rating` lies in (0, 5], and at least one of `review_title` /
/// `review_text` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Content fingerprint; the deduplication key.
    pub review_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_url: String,
    pub reviewer_name: String,
    pub rating: f64,
    pub review_title: Option<String>,
    pub review_text: Option<String>,
    /// Free-text or ISO date, as found in the markup.
    pub review_date: String,
    pub verified_purchase: bool,
    pub helpful_votes: u32,
    #[serde(rename = "retailer")]
    pub source: SourceId,
    pub scraped_at: DateTime<Utc>,
}

/// Result of one attempted URL, produced by the orchestrator whether the
/// attempt succeeded, yielded nothing, or failed. Never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    #[serde(rename = "retailer", serialize_with = "serialize_source_label")]
    pub source: Option<SourceId>,
    pub product_url: String,
    pub total_reviews: u32,
    pub new_reviews: u32,
    pub errors: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock seconds spent on this attempt.
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl ScrapeOutcome {
    pub fn success(
        source: SourceId,
        product_url: impl Into<String>,
        total_reviews: u32,
        new_reviews: u32,
        processing_time: f64,
    ) -> Self {
        Self {
            source: Some(source),
            product_url: product_url.into(),
            total_reviews,
            new_reviews,
            errors: 0,
            error: None,
            processing_time,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        source: Option<SourceId>,
        product_url: impl Into<String>,
        error: impl Into<String>,
        processing_time: f64,
    ) -> Self {
        Self {
            source,
            product_url: product_url.into(),
            total_reviews: 0,
            new_reviews: 0,
            errors: 1,
            error: Some(error.into()),
            processing_time,
            timestamp: Utc::now(),
        }
    }

    /// Label used in serialized summaries and stored monitoring rows.
    pub fn source_label(&self) -> &'static str {
        self.source.map_or("unknown", SourceId::label)
    }
}

/// Aggregate over one `scrape_all` invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub total_scraped: u32,
    pub total_new_reviews: u32,
    pub errors: u32,
    /// Wall-clock seconds for the whole run.
    pub processing_time: f64,
    pub results: Vec<ScrapeOutcome>,
}

impl ScrapeSummary {
    /// Fold per-URL outcomes into the aggregate. Counts are sums and
    /// therefore independent of completion order within a batch.
    pub fn from_outcomes(results: Vec<ScrapeOutcome>, processing_time: f64) -> Self {
        let total_scraped = results.iter().map(|r| r.total_reviews).sum();
        let total_new_reviews = results.iter().map(|r| r.new_reviews).sum();
        let errors = results.iter().map(|r| r.errors).sum();
        Self {
            total_scraped,
            total_new_reviews,
            errors,
            processing_time,
            results,
        }
    }
}

fn serialize_source_label<S>(source: &Option<SourceId>, ser: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match source {
        Some(id) => ser.serialize_str(id.label()),
        None => ser.serialize_str("unknown"),
    }
}
