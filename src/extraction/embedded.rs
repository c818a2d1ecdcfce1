//! Opportunistic extraction from inline application state.
//!
//! Walmart pages hydrate reviews from JSON embedded in plain `<script>`
//! blocks. A precise parse of that state is brittle across deployments, so
//! this strategy just regex-scans script bodies for small brace-delimited
//! fragments mentioning "review" and tries to parse each one as JSON. Most
//! fragments fail to parse or carry nothing useful; that is expected and
//! silent.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::pipeline::ReviewCandidate;

// Flat fragments only: nested braces are not captured, which is fine for the
// shallow per-review objects this targets.
static FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\{[^}]*"review"[^}]*\}"#).expect("hardcoded regex"));

static SCRIPT: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("script").ok());

/// Scan inline scripts for parseable review fragments.
pub fn extract_embedded(document: &Html) -> Vec<ReviewCandidate> {
    let Some(selector) = SCRIPT.as_ref() else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for script in document.root_element().select(selector) {
        if script.value().attr("type") == Some("application/ld+json") {
            continue;
        }
        let body = script.text().collect::<String>();
        if !body.to_ascii_lowercase().contains("review") {
            continue;
        }
        for fragment in FRAGMENT_RE.find_iter(&body) {
            if let Ok(value) = serde_json::from_str::<Value>(fragment.as_str()) {
                if let Some(candidate) = map_fragment(&value) {
                    candidates.push(candidate);
                }
            }
        }
    }
    candidates
}

fn map_fragment(value: &Value) -> Option<ReviewCandidate> {
    let obj = value.as_object()?;

    let rating = ["rating", "overallRating", "ratingValue"]
        .iter()
        .find_map(|key| obj.get(*key))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .unwrap_or(0.0);

    let text = string_field(obj, &["reviewText", "review", "text"]);
    let title = string_field(obj, &["reviewTitle", "title"]);
    let reviewer_name = string_field(obj, &["userNickname", "authorName", "nickname"]);
    let date = string_field(obj, &["submissionTime", "reviewSubmissionTime", "date"]);

    if text.is_none() && title.is_none() {
        return None;
    }

    Some(ReviewCandidate {
        reviewer_name,
        rating,
        title,
        text,
        date,
        verified_purchase: false,
        helpful_votes: 0,
    })
}

fn string_field(
    obj: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> Option<String> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}
