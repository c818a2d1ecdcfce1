//! Batch scrape orchestration.
//!
//! URLs are processed in sequential batches; inside a batch, attempts run
//! concurrently under a semaphore. Every per-URL failure is absorbed into a
//! [`ScrapeOutcome`] so one bad page never aborts a run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::domain::review::{ScrapeOutcome, ScrapeSummary};
use crate::domain::services::{PageFetcher, ReviewStore};
use crate::domain::source::SourceId;
use crate::extraction::SourceScraper;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// URLs per sequential batch.
    pub batch_size: usize,
    /// Concurrent attempts within a batch.
    pub concurrent_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            concurrent_limit: 3,
        }
    }
}

#[derive(Clone)]
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ReviewStore>,
    scrapers: Arc<HashMap<SourceId, Arc<dyn SourceScraper>>>,
    config: OrchestratorConfig,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ReviewStore>,
        scrapers: HashMap<SourceId, Arc<dyn SourceScraper>>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            scrapers: Arc::new(scrapers),
            config,
        }
    }

    /// Scrape every URL, batch by batch, and fold the outcomes into a
    /// summary. Outcome order follows input order.
    pub async fn scrape_all(&self, urls: &[String]) -> ScrapeSummary {
        let run_start = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrent_limit.max(1)));

        info!(urls = urls.len(), batch_size, "starting scrape run");

        let mut outcomes = Vec::with_capacity(urls.len());
        for (batch_index, batch) in urls.chunks(batch_size).enumerate() {
            info!(batch = batch_index + 1, urls = batch.len(), "processing batch");

            let handles: Vec<_> = batch
                .iter()
                .map(|url| {
                    let orchestrator = self.clone();
                    let semaphore = Arc::clone(&semaphore);
                    let url = url.clone();
                    tokio::spawn(async move {
                        // Closed only on shutdown; treat as a failed attempt.
                        let _permit = match semaphore.acquire().await {
                            Ok(permit) => permit,
                            Err(_) => {
                                return ScrapeOutcome::failure(
                                    None,
                                    url,
                                    "scrape cancelled",
                                    0.0,
                                )
                            }
                        };
                        orchestrator.scrape_one(&url).await
                    })
                })
                .collect();

            for (url, joined) in batch.iter().zip(join_all(handles).await) {
                match joined {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) => {
                        error!(url = %url, %err, "scrape task panicked");
                        outcomes.push(ScrapeOutcome::failure(
                            None,
                            url.clone(),
                            format!("task failed: {err}"),
                            0.0,
                        ));
                    }
                }
            }
        }

        let summary = ScrapeSummary::from_outcomes(outcomes, run_start.elapsed().as_secs_f64());
        info!(
            total = summary.total_scraped,
            new = summary.total_new_reviews,
            errors = summary.errors,
            elapsed_secs = summary.processing_time,
            "scrape run finished"
        );
        summary
    }

    /// One URL end to end: resolve, fetch, extract, persist, record.
    pub async fn scrape_one(&self, url: &str) -> ScrapeOutcome {
        let start = Instant::now();

        let outcome = match SourceId::resolve(url) {
            Some(source) => self.scrape_resolved(source, url, start).await,
            None => {
                warn!(url, "no scraper matches this URL");
                ScrapeOutcome::failure(
                    None,
                    url,
                    "unsupported retailer",
                    start.elapsed().as_secs_f64(),
                )
            }
        };

        // Monitoring data must not fail the scrape itself.
        if let Err(err) = self.store.record_outcome(&outcome).await {
            warn!(url, %err, "failed to record scrape result");
        }

        outcome
    }

    async fn scrape_resolved(&self, source: SourceId, url: &str, start: Instant) -> ScrapeOutcome {
        let Some(scraper) = self.scrapers.get(&source) else {
            return ScrapeOutcome::failure(
                Some(source),
                url,
                format!("no scraper registered for {source}"),
                start.elapsed().as_secs_f64(),
            );
        };

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(err) => {
                warn!(url, %err, "fetch failed");
                return ScrapeOutcome::failure(
                    Some(source),
                    url,
                    err.to_string(),
                    start.elapsed().as_secs_f64(),
                );
            }
        };

        let reviews = scraper.extract_reviews(&html, url);
        if reviews.is_empty() {
            info!(url, source = %source, "page yielded no reviews");
            return ScrapeOutcome::success(source, url, 0, 0, start.elapsed().as_secs_f64());
        }

        match self.store.save_reviews(&reviews).await {
            Ok(new_reviews) => {
                info!(
                    url,
                    source = %source,
                    total = reviews.len(),
                    new = new_reviews,
                    "scraped page"
                );
                ScrapeOutcome::success(
                    source,
                    url,
                    reviews.len() as u32,
                    new_reviews,
                    start.elapsed().as_secs_f64(),
                )
            }
            Err(err) => {
                error!(url, %err, "failed to save reviews");
                ScrapeOutcome::failure(
                    Some(source),
                    url,
                    format!("storage error: {err}"),
                    start.elapsed().as_secs_f64(),
                )
            }
        }
    }
}
