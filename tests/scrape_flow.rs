//! End-to-end scrape flow against an in-memory database and a stub fetcher.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use review_harvester::extraction::default_scrapers;
use review_harvester::infrastructure::{FetchError, ReviewFilter, ReviewRepository};
use review_harvester::orchestrator::{OrchestratorConfig, ScrapeOrchestrator};
use review_harvester::{PageFetcher, SourceId};

const WALMART_URL: &str = "https://www.walmart.com/ip/gel-nail-strips/577305050";
const TARGET_URL: &str = "https://www.target.com/p/nail-art-kit/-/A-87654321";

const WALMART_PAGE: &str = r#"
<html>
<body>
    <h1 data-automation-id="product-title">Gel Nail Strips</h1>
    <div class="review-item">
        <span class="review-author">Morgan</span>
        <span data-rating="5"></span>
        <p class="review-text">Best strips I have tried.</p>
    </div>
    <div class="review-item">
        <span class="review-author">Casey</span>
        <span data-rating="4"></span>
        <p class="review-text">Good value for the price.</p>
    </div>
</body>
</html>
"#;

const TARGET_PAGE: &str = r#"
<html>
<body>
    <h1 data-test="product-title">Nail Art Kit</h1>
    <div data-test="review-content">
        <span class="review-author">Alex</span>
        <span aria-label="3 out of 5 stars"></span>
        <p class="review-text">Decent for the price.</p>
        <span class="review-date">2026-06-12</span>
    </div>
</body>
</html>
"#;

struct StubFetcher {
    pages: HashMap<String, String>,
}

impl StubFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

fn orchestrator(fetcher: StubFetcher, repo: ReviewRepository) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(
        Arc::new(fetcher),
        Arc::new(repo),
        default_scrapers(),
        OrchestratorConfig {
            batch_size: 2,
            concurrent_limit: 2,
        },
    )
}

#[tokio::test]
async fn scrapes_extracts_and_persists_across_retailers() {
    let repo = ReviewRepository::in_memory().await.unwrap();
    let fetcher = StubFetcher::new(&[(WALMART_URL, WALMART_PAGE), (TARGET_URL, TARGET_PAGE)]);
    let orchestrator = orchestrator(fetcher, repo.clone());

    let urls = vec![WALMART_URL.to_string(), TARGET_URL.to_string()];
    let summary = orchestrator.scrape_all(&urls).await;

    assert_eq!(summary.total_scraped, 3);
    assert_eq!(summary.total_new_reviews, 3);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.results.len(), 2);
    // Outcome order follows input order.
    assert_eq!(summary.results[0].product_url, WALMART_URL);
    assert_eq!(summary.results[1].product_url, TARGET_URL);

    let stored = repo.get_reviews(&ReviewFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 3);
    let walmart = repo
        .get_reviews(&ReviewFilter {
            source: Some(SourceId::Walmart),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(walmart.len(), 2);
    let ids: std::collections::HashSet<_> = stored.iter().map(|r| r.review_id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn rescraping_the_same_pages_adds_nothing() {
    let repo = ReviewRepository::in_memory().await.unwrap();
    let fetcher = StubFetcher::new(&[(WALMART_URL, WALMART_PAGE)]);
    let orchestrator = orchestrator(fetcher, repo.clone());

    let urls = vec![WALMART_URL.to_string()];
    let first = orchestrator.scrape_all(&urls).await;
    assert_eq!(first.total_new_reviews, 2);

    let second = orchestrator.scrape_all(&urls).await;
    assert_eq!(second.total_scraped, 2);
    assert_eq!(second.total_new_reviews, 0);
    assert_eq!(second.errors, 0);

    let stored = repo.get_reviews(&ReviewFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn failures_become_outcomes_not_aborts() {
    let repo = ReviewRepository::in_memory().await.unwrap();
    let fetcher = StubFetcher::new(&[(WALMART_URL, WALMART_PAGE)]);
    let orchestrator = orchestrator(fetcher, repo.clone());

    let urls = vec![
        WALMART_URL.to_string(),
        "https://www.example.com/p/unsupported".to_string(),
        TARGET_URL.to_string(), // stub returns 404
    ];
    let summary = orchestrator.scrape_all(&urls).await;

    assert_eq!(summary.results.len(), 3);
    assert_eq!(summary.total_scraped, 2);
    assert_eq!(summary.errors, 2);

    let unsupported = &summary.results[1];
    assert_eq!(unsupported.source_label(), "unknown");
    assert!(unsupported.error.as_deref().unwrap().contains("unsupported"));

    let not_found = &summary.results[2];
    assert_eq!(not_found.source_label(), "Target");
    assert!(not_found.error.as_deref().unwrap().contains("404"));

    // The good URL still landed in storage.
    let stored = repo.get_reviews(&ReviewFilter::default()).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn empty_pages_count_as_clean_runs() {
    let repo = ReviewRepository::in_memory().await.unwrap();
    let fetcher = StubFetcher::new(&[(WALMART_URL, "<html><body>no reviews here</body></html>")]);
    let orchestrator = orchestrator(fetcher, repo.clone());

    let summary = orchestrator.scrape_all(&[WALMART_URL.to_string()]).await;
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.total_scraped, 0);
    assert_eq!(summary.results[0].source_label(), "Walmart");
}
