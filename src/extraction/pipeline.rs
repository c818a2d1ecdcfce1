//! Extraction pipeline shared by every source scraper.
//!
//! Scrapers produce loose [`ReviewCandidate`]s from whatever strategy found
//! them; [`finalize_candidates`] applies the validity rules, fills defaults,
//! fingerprints each survivor and deduplicates keeping the first occurrence.
//! Strategy order therefore decides which duplicate wins.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::domain::fingerprint::review_fingerprint;
use crate::domain::review::{ReviewRecord, ANONYMOUS_REVIEWER};
use crate::domain::source::SourceId;
use crate::utils::sanitize_text;

/// One retailer's extraction logic. Implementations are stateless and
/// synchronous; HTML parsing never crosses an await point.
pub trait SourceScraper: Send + Sync {
    fn source(&self) -> SourceId;

    /// Pull the retailer's product identifier out of a product URL.
    fn subject_id(&self, url: &str) -> Option<String>;

    /// Run every extraction strategy over the page and return finalized,
    /// deduplicated records.
    fn extract_reviews(&self, html: &str, product_url: &str) -> Vec<ReviewRecord>;
}

/// Raw review data as found in the markup, before validation.
#[derive(Debug, Clone, Default)]
pub struct ReviewCandidate {
    pub reviewer_name: Option<String>,
    /// 0.0 means no strategy resolved a rating; finalization discards it.
    pub rating: f64,
    pub title: Option<String>,
    pub text: Option<String>,
    pub date: Option<String>,
    pub verified_purchase: bool,
    pub helpful_votes: u32,
}

/// Product-level context threaded through finalization.
#[derive(Debug, Clone)]
pub struct SubjectContext {
    pub source: SourceId,
    pub product_id: String,
    pub product_name: String,
    pub product_url: String,
    /// Whether the review date participates in the fingerprint. Retailers
    /// whose pages render relative dates ("3 days ago") keep it out so the
    /// same review does not refingerprint on every visit.
    pub date_in_fingerprint: bool,
}

/// Validate, normalize and fingerprint candidates, then drop duplicate
/// fingerprints keeping the earliest occurrence.
pub fn finalize_candidates(
    ctx: &SubjectContext,
    candidates: Vec<ReviewCandidate>,
) -> Vec<ReviewRecord> {
    let scraped_at = Utc::now();
    let fallback_date = scraped_at.format("%Y-%m-%d").to_string();

    let mut seen = std::collections::HashSet::new();
    let mut records = Vec::new();

    for candidate in candidates {
        if candidate.rating <= 0.0 || candidate.rating > 5.0 {
            continue;
        }

        let title = candidate
            .title
            .map(|t| sanitize_text(&t))
            .filter(|t| !t.is_empty());
        let text = candidate
            .text
            .map(|t| sanitize_text(&t))
            .filter(|t| !t.is_empty());
        if title.is_none() && text.is_none() {
            continue;
        }

        let reviewer_name = candidate
            .reviewer_name
            .map(|n| sanitize_text(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS_REVIEWER.to_string());
        let review_date = candidate
            .date
            .map(|d| sanitize_text(&d))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| fallback_date.clone());

        let fingerprint_date = ctx.date_in_fingerprint.then_some(review_date.as_str());
        let review_id = review_fingerprint(
            &ctx.product_id,
            &reviewer_name,
            text.as_deref().unwrap_or_default(),
            fingerprint_date,
        );

        if !seen.insert(review_id.clone()) {
            continue;
        }

        records.push(ReviewRecord {
            review_id,
            product_id: ctx.product_id.clone(),
            product_name: ctx.product_name.clone(),
            product_url: ctx.product_url.clone(),
            reviewer_name,
            rating: candidate.rating,
            review_title: title,
            review_text: text,
            review_date,
            verified_purchase: candidate.verified_purchase,
            helpful_votes: candidate.helpful_votes,
            source: ctx.source,
            scraped_at,
        });
    }

    debug!(
        source = %ctx.source,
        product_id = %ctx.product_id,
        records = records.len(),
        "finalized review candidates"
    );
    records
}

/// Ranked review-container selectors that work across retailers. Tried in
/// order; the first selector with any matches wins.
pub const GENERIC_CONTAINER_SELECTORS: &[&str] = &[
    r#"[data-testid*="review"]"#,
    ".review-item",
    r#"[class*="review-item"]"#,
    r#"[class*="customer-review"]"#,
    ".review",
    r#"[itemprop="review"]"#,
];

const REVIEWER_SELECTORS: &[&str] = &[
    r#"[data-testid*="author"]"#,
    ".review-author",
    ".reviewer-name",
    r#"[class*="author"]"#,
    r#"[class*="nickname"]"#,
    r#"[itemprop="author"]"#,
];

const TITLE_SELECTORS: &[&str] = &[
    ".review-title",
    r#"[class*="review-title"]"#,
    r#"[data-testid*="title"]"#,
    "h3",
    "h4",
];

const TEXT_SELECTORS: &[&str] = &[
    ".review-text",
    r#"[class*="review-text"]"#,
    r#"[class*="review-body"]"#,
    r#"[data-testid*="text"]"#,
    r#"[itemprop="reviewBody"]"#,
    "p",
];

const DATE_SELECTORS: &[&str] = &[
    ".review-date",
    r#"[class*="date"]"#,
    "time",
    r#"[data-testid*="date"]"#,
];

const VERIFIED_SELECTORS: &[&str] = &[
    r#"[class*="verified"]"#,
    r#"[data-testid*="verified"]"#,
];

const HELPFUL_SELECTORS: &[&str] = &[
    r#"[data-testid*="helpful"]"#,
    ".helpful-count",
    ".votes-helpful",
];

static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("hardcoded regex"));

/// Helpful-vote count from text like "12 people found this helpful".
fn helpful_votes(container: ElementRef<'_>) -> u32 {
    select_first_text(container, HELPFUL_SELECTORS)
        .and_then(|text| COUNT_RE.captures(&text).and_then(|c| c[1].parse().ok()))
        .unwrap_or(0)
}

fn compile(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

/// First non-empty text content under `element` for the ranked selectors.
pub fn select_first_text(element: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Some(selector) = compile(raw) else { continue };
        for found in element.select(&selector) {
            let text = found.text().collect::<String>();
            let text = sanitize_text(&text);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Containers under the document root for the first matching selector.
pub fn select_containers<'a>(document: &'a Html, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in selectors {
        let Some(selector) = compile(raw) else { continue };
        let found: Vec<_> = document.root_element().select(&selector).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Build a candidate from a review container using the shared ranked field
/// selectors. Works for retailer-specific containers too.
pub fn candidate_from_container(container: ElementRef<'_>) -> ReviewCandidate {
    let verified_purchase = VERIFIED_SELECTORS
        .iter()
        .filter_map(|raw| compile(raw))
        .any(|selector| container.select(&selector).next().is_some());

    ReviewCandidate {
        reviewer_name: select_first_text(container, REVIEWER_SELECTORS),
        rating: super::rating::parse_rating(container),
        title: select_first_text(container, TITLE_SELECTORS),
        text: select_first_text(container, TEXT_SELECTORS),
        date: select_first_text(container, DATE_SELECTORS),
        verified_purchase,
        helpful_votes: helpful_votes(container),
    }
}

/// Strategy over DOM containers: retailer-specific selectors first when
/// given, then the generic table.
pub fn extract_from_containers(document: &Html, selectors: &[&str]) -> Vec<ReviewCandidate> {
    select_containers(document, selectors)
        .into_iter()
        .map(candidate_from_container)
        .collect()
}

/// Product display name via ranked selectors with a URL-derived fallback.
pub fn extract_product_name(document: &Html, selectors: &[&str], product_url: &str) -> String {
    if let Some(name) = select_first_text(document.root_element(), selectors) {
        return name;
    }

    // Derive something readable from the URL slug.
    let slug = product_url
        .trim_end_matches('/')
        .rsplit('/')
        .find(|segment| segment.chars().any(|c| c.is_ascii_alphabetic()))
        .unwrap_or_default();
    let name = sanitize_text(&slug.replace(['-', '_'], " "));
    if name.is_empty() {
        "Unknown Product".to_string()
    } else {
        name
    }
}
