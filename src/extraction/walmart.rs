//! Walmart product pages.
//!
//! Four strategies in order: JSON-LD, generic containers, Walmart-specific
//! containers, embedded application state. Walmart renders relative review
//! dates, so the date stays out of the fingerprint.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::domain::review::ReviewRecord;
use crate::domain::source::SourceId;

use super::pipeline::{
    extract_from_containers, extract_product_name, finalize_candidates, SourceScraper,
    SubjectContext, GENERIC_CONTAINER_SELECTORS,
};
use super::{embedded, structured};

static ITEM_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/ip/[^/]+/(\d+)").expect("hardcoded regex"));
static ID_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=(\d+)").expect("hardcoded regex"));

const PRODUCT_NAME_SELECTORS: &[&str] = &[
    r#"h1[data-automation-id="product-title"]"#,
    r#"[data-testid="product-title"]"#,
    "h1.f1",
    ".product-title h1",
    "h1",
];

const REVIEW_CONTAINER_SELECTORS: &[&str] = &[
    r#"[data-testid*="review"]"#,
    r#"[data-automation-id*="review"]"#,
    r#"[class*="review-card"]"#,
];

pub struct WalmartScraper;

impl SourceScraper for WalmartScraper {
    fn source(&self) -> SourceId {
        SourceId::Walmart
    }

    /// `/ip/<slug>/<digits>` first, then an `id` query parameter, then the
    /// last numeric path segment.
    fn subject_id(&self, url: &str) -> Option<String> {
        if let Some(caps) = ITEM_PATH_RE.captures(url) {
            return Some(caps[1].to_string());
        }
        if let Some(caps) = ID_QUERY_RE.captures(url) {
            return Some(caps[1].to_string());
        }
        url.split('?')
            .next()
            .unwrap_or(url)
            .trim_end_matches('/')
            .rsplit('/')
            .find(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
    }

    fn extract_reviews(&self, html: &str, product_url: &str) -> Vec<ReviewRecord> {
        let Some(product_id) = self.subject_id(product_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let ctx = SubjectContext {
            source: SourceId::Walmart,
            product_id,
            product_name: extract_product_name(&document, PRODUCT_NAME_SELECTORS, product_url),
            product_url: product_url.to_string(),
            date_in_fingerprint: false,
        };

        let mut candidates = structured::extract_json_ld(&document);
        candidates.extend(extract_from_containers(&document, GENERIC_CONTAINER_SELECTORS));
        candidates.extend(extract_from_containers(&document, REVIEW_CONTAINER_SELECTORS));
        candidates.extend(embedded::extract_embedded(&document));

        finalize_candidates(&ctx, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_prefers_item_path() {
        let scraper = WalmartScraper;
        assert_eq!(
            scraper.subject_id("https://www.walmart.com/ip/gel-nail-strips/577305050"),
            Some("577305050".to_string())
        );
        assert_eq!(
            scraper.subject_id("https://www.walmart.com/reviews/product?id=12345"),
            Some("12345".to_string())
        );
        assert_eq!(
            scraper.subject_id("https://www.walmart.com/some/path/98765"),
            Some("98765".to_string())
        );
        assert_eq!(
            scraper.subject_id("https://www.walmart.com/browse/beauty"),
            None
        );
    }

    #[test]
    fn extracts_reviews_from_a_full_page() {
        let html = r#"
            <html>
            <head>
                <script type="application/ld+json">
                {"@type": "Product", "review": [
                    {"@type": "Review", "author": "Morgan",
                     "reviewRating": {"ratingValue": 5},
                     "reviewBody": "Best strips I have tried.",
                     "datePublished": "2026-07-01"}
                ]}
                </script>
            </head>
            <body>
                <h1 data-automation-id="product-title">Gel Nail Strips</h1>
                <div data-testid="review-card-1">
                    <span class="review-author">Casey</span>
                    <span data-rating="4"></span>
                    <p class="review-text">Good value for the price.</p>
                </div>
            </body>
            </html>
        "#;
        let records = WalmartScraper
            .extract_reviews(html, "https://www.walmart.com/ip/gel-nail-strips/577305050");

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.product_id == "577305050"));
        assert!(records.iter().all(|r| r.product_name == "Gel Nail Strips"));
        assert!(records.iter().all(|r| r.source == SourceId::Walmart));
        assert_eq!(records[0].reviewer_name, "Morgan");
        assert_eq!(records[1].reviewer_name, "Casey");
        assert_ne!(records[0].review_id, records[1].review_id);
    }

    #[test]
    fn unresolvable_product_id_yields_nothing() {
        let records =
            WalmartScraper.extract_reviews("<html></html>", "https://www.walmart.com/browse/beauty");
        assert!(records.is_empty());
    }
}
