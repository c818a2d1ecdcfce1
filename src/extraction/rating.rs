//! Star-rating resolution for DOM review containers.
//!
//! Three strategies, tried in order of reliability: explicit numeric data
//! attributes, aria-label phrases ("Rated 4.2 out of 5 stars"), and finally
//! counting filled-star glyph elements. Returns 0.0 when nothing resolves;
//! finalization treats that as "no rating" and drops the candidate.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

const RATING_ATTRS: &[&str] = &["data-rating", "data-value", "data-score", "data-star-rating"];

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("hardcoded regex"));

static ANY_ELEMENT: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("*").ok());

static FILLED_STAR: Lazy<Option<Selector>> = Lazy::new(|| {
    Selector::parse(
        r#".star-filled, .filled, [class*="star-fill"], [class*="rating-filled"], .pr-star-v4-100-filled"#,
    )
    .ok()
});

fn in_range(value: f64) -> Option<f64> {
    (value > 0.0 && value <= 5.0).then_some(value)
}

fn attr_rating(element: ElementRef<'_>) -> Option<f64> {
    for attr in RATING_ATTRS {
        if let Some(raw) = element.value().attr(attr) {
            if let Some(rating) = raw.trim().parse::<f64>().ok().and_then(in_range) {
                return Some(rating);
            }
        }
    }
    None
}

fn aria_rating(element: ElementRef<'_>) -> Option<f64> {
    let label = element.value().attr("aria-label")?;
    let lower = label.to_ascii_lowercase();
    if !lower.contains("star") && !lower.contains("rating") {
        return None;
    }
    let capture = NUMBER_RE.captures(label)?;
    capture[1].parse::<f64>().ok().and_then(in_range)
}

/// Resolve a rating for the container, scanning the container itself and its
/// descendants.
pub fn parse_rating(container: ElementRef<'_>) -> f64 {
    let descendants = || {
        ANY_ELEMENT
            .as_ref()
            .into_iter()
            .flat_map(|s| container.select(s))
    };

    if let Some(rating) = attr_rating(container).or_else(|| descendants().find_map(attr_rating)) {
        return rating;
    }

    if let Some(rating) = aria_rating(container).or_else(|| descendants().find_map(aria_rating)) {
        return rating;
    }

    if let Some(selector) = FILLED_STAR.as_ref() {
        let filled = container.select(selector).count();
        if (1..=5).contains(&filled) {
            return filled as f64;
        }
    }

    0.0
}
