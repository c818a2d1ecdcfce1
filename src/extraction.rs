//! Per-source review extraction.
//!
//! Each retailer gets a [`SourceScraper`] implementation that runs a fixed
//! sequence of extraction strategies over a fetched page. Shared machinery
//! (candidate finalization, rating resolution, structured-data walking) lives
//! in the submodules.

pub mod embedded;
pub mod pipeline;
pub mod rating;
pub mod structured;
pub mod target;
pub mod ulta;
pub mod walmart;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::source::SourceId;

pub use pipeline::{ReviewCandidate, SourceScraper, SubjectContext};
pub use target::TargetScraper;
pub use ulta::UltaScraper;
pub use walmart::WalmartScraper;

/// Scraper registry covering every supported source.
pub fn default_scrapers() -> HashMap<SourceId, Arc<dyn SourceScraper>> {
    let scrapers: [Arc<dyn SourceScraper>; 3] = [
        Arc::new(WalmartScraper),
        Arc::new(TargetScraper),
        Arc::new(UltaScraper),
    ];
    scrapers
        .into_iter()
        .map(|scraper| (scraper.source(), scraper))
        .collect()
}
