//! Ulta product pages.
//!
//! Ulta serves reviews through the PowerReviews widget, so the specific
//! selectors target its `pr-` class scheme. Strategies: JSON-LD, generic
//! containers, PowerReviews containers. Dates are absolute and join the
//! fingerprint.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::domain::review::ReviewRecord;
use crate::domain::source::SourceId;

use super::pipeline::{
    candidate_from_container, extract_from_containers, extract_product_name, finalize_candidates,
    select_containers, select_first_text, ReviewCandidate, SourceScraper, SubjectContext,
    GENERIC_CONTAINER_SELECTORS,
};
use super::{rating, structured};

static PIMPROD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"pimprod(\d+)").expect("hardcoded regex"));
static SKU_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]sku=(\d+)").expect("hardcoded regex"));

const PRODUCT_NAME_SELECTORS: &[&str] = &[
    r#"[data-test="product-title"]"#,
    ".ProductInformation__title",
    "h1",
];

const PR_CONTAINER_SELECTORS: &[&str] = &[
    ".pr-review",
    ".pr-review-wrap",
    "[data-pr-review-id]",
];

const PR_REVIEWER_SELECTORS: &[&str] = &[".pr-review-author-name", ".pr-rd-author-nickname"];
const PR_TITLE_SELECTORS: &[&str] = &[".pr-rd-review-headline", ".pr-review-title"];
const PR_TEXT_SELECTORS: &[&str] = &[".pr-rd-description-text", ".pr-review-text"];
const PR_DATE_SELECTORS: &[&str] = &[".pr-rd-author-submission-date", ".pr-review-date"];

pub struct UltaScraper;

fn pr_candidate(container: ElementRef<'_>) -> ReviewCandidate {
    // PowerReviews fields first, shared table as fallback.
    let shared = candidate_from_container(container);
    ReviewCandidate {
        reviewer_name: select_first_text(container, PR_REVIEWER_SELECTORS)
            .or(shared.reviewer_name),
        rating: rating::parse_rating(container),
        title: select_first_text(container, PR_TITLE_SELECTORS).or(shared.title),
        text: select_first_text(container, PR_TEXT_SELECTORS).or(shared.text),
        date: select_first_text(container, PR_DATE_SELECTORS).or(shared.date),
        verified_purchase: shared.verified_purchase,
        helpful_votes: shared.helpful_votes,
    }
}

impl SourceScraper for UltaScraper {
    fn source(&self) -> SourceId {
        SourceId::Ulta
    }

    /// `pimprod<digits>` anywhere in the URL, or a `sku` query parameter.
    fn subject_id(&self, url: &str) -> Option<String> {
        if let Some(caps) = PIMPROD_RE.captures(url) {
            return Some(caps[1].to_string());
        }
        SKU_QUERY_RE.captures(url).map(|caps| caps[1].to_string())
    }

    fn extract_reviews(&self, html: &str, product_url: &str) -> Vec<ReviewRecord> {
        let Some(product_id) = self.subject_id(product_url) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        let ctx = SubjectContext {
            source: SourceId::Ulta,
            product_id,
            product_name: extract_product_name(&document, PRODUCT_NAME_SELECTORS, product_url),
            product_url: product_url.to_string(),
            date_in_fingerprint: true,
        };

        let mut candidates = structured::extract_json_ld(&document);
        candidates.extend(extract_from_containers(&document, GENERIC_CONTAINER_SELECTORS));
        candidates.extend(
            select_containers(&document, PR_CONTAINER_SELECTORS)
                .into_iter()
                .map(pr_candidate),
        );

        finalize_candidates(&ctx, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_reads_pimprod_or_sku() {
        let scraper = UltaScraper;
        assert_eq!(
            scraper.subject_id("https://www.ulta.com/p/gel-strips-pimprod2034567"),
            Some("2034567".to_string())
        );
        assert_eq!(
            scraper.subject_id("https://www.ulta.com/reviews?sku=2599999"),
            Some("2599999".to_string())
        );
        assert_eq!(scraper.subject_id("https://www.ulta.com/shop/nails"), None);
    }

    #[test]
    fn extracts_powerreviews_containers() {
        let html = r#"
            <html><body>
                <h1>Gloss Gel Polish</h1>
                <div class="pr-review">
                    <span class="pr-review-author-name">Quinn</span>
                    <div class="pr-snippet-stars" aria-label="Rated 4.6 out of 5 stars"></div>
                    <h3 class="pr-rd-review-headline">Shiny finish</h3>
                    <p class="pr-rd-description-text">Two coats and it looks salon done.</p>
                    <time class="pr-rd-author-submission-date">2026-05-20</time>
                </div>
            </body></html>
        "#;
        let records =
            UltaScraper.extract_reviews(html, "https://www.ulta.com/p/gloss-gel-pimprod2034567");

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.product_id, "2034567");
        assert_eq!(r.product_name, "Gloss Gel Polish");
        assert_eq!(r.reviewer_name, "Quinn");
        assert_eq!(r.rating, 4.6);
        assert_eq!(r.review_title.as_deref(), Some("Shiny finish"));
        assert_eq!(r.review_date, "2026-05-20");
        assert_eq!(r.source, SourceId::Ulta);
    }

    #[test]
    fn filled_star_glyphs_resolve_the_rating() {
        let html = r#"
            <div class="pr-review">
                <span class="pr-review-author-name">Reese</span>
                <i class="pr-star-v4-100-filled"></i>
                <i class="pr-star-v4-100-filled"></i>
                <i class="pr-star-v4-100-filled"></i>
                <i class="pr-star-v4-100-filled"></i>
                <p class="pr-rd-description-text">Dries fast.</p>
            </div>
        "#;
        let records =
            UltaScraper.extract_reviews(html, "https://www.ulta.com/p/gloss-gel-pimprod2034567");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 4.0);
    }
}
