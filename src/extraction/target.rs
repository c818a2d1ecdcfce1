//! Target product pages.
//!
//! Strategies: JSON-LD, generic containers, Target-specific `data-test`
//! containers. Target shows absolute review dates, which therefore join the
//! fingerprint.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::domain::review::ReviewRecord;
use crate::domain::source::SourceId;

use super::pipeline::{
    extract_from_containers, extract_product_name, finalize_candidates, SourceScraper,
    SubjectContext, GENERIC_CONTAINER_SELECTORS,
};
use super::structured;

static TCIN_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/A-(\d+)").expect("hardcoded regex"));
static TCIN_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]tcin=(\d+)").expect("hardcoded regex"));

const PRODUCT_NAME_SELECTORS: &[&str] = &[
    r#"h1[data-test="product-title"]"#,
    r#"[data-test="product-title"]"#,
    "h1",
];

const REVIEW_CONTAINER_SELECTORS: &[&str] = &[
    r#"[data-test*="review"]"#,
    ".guest-review",
    ".review-list-item",
];

pub struct TargetScraper;

impl SourceScraper for TargetScraper {
    fn source(&self) -> SourceId {
        SourceId::Target
    }

    /// The TCIN: `/A-<digits>` in the path, or a `tcin` query parameter.
    fn subject_id(&self, url: &str) -> Option<String> {
        if let Some(caps) = TCIN_PATH_RE.captures(url) {
            return Some(caps[1].to_string());
        }
        TCIN_QUERY_RE.captures(url).map(|caps| caps[1].to_string())
    }

    fn extract_reviews(&self, html: &str, product_url: &str) -> Vec<ReviewRecord> {
        let Some(product_id) = self.subject_id(product_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let ctx = SubjectContext {
            source: SourceId::Target,
            product_id,
            product_name: extract_product_name(&document, PRODUCT_NAME_SELECTORS, product_url),
            product_url: product_url.to_string(),
            date_in_fingerprint: true,
        };

        let mut candidates = structured::extract_json_ld(&document);
        candidates.extend(extract_from_containers(&document, GENERIC_CONTAINER_SELECTORS));
        candidates.extend(extract_from_containers(&document, REVIEW_CONTAINER_SELECTORS));

        finalize_candidates(&ctx, candidates)
    }
}
