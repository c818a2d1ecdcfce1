//! JSON-LD structured-data extraction.
//!
//! Product pages commonly embed schema.org blocks in
//! `<script type="application/ld+json">`. Reviews appear either as objects
//! with `@type: "Review"` or nested under a `review` key of a Product node.
//! Real-world blocks are sloppy, so every lookup is tolerant: ratings may be
//! strings or numbers, authors strings or Person objects, and malformed
//! blocks are skipped rather than failing the page.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::trace;

use super::pipeline::ReviewCandidate;

static LD_JSON: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).ok());

/// Extract review candidates from every JSON-LD block in the document.
pub fn extract_json_ld(document: &Html) -> Vec<ReviewCandidate> {
    let Some(selector) = LD_JSON.as_ref() else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for script in document.root_element().select(selector) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => collect_reviews(&value, &mut candidates),
            Err(err) => trace!(%err, "skipping malformed JSON-LD block"),
        }
    }
    candidates
}

/// Recursively walk a JSON-LD value collecting review nodes.
fn collect_reviews(value: &Value, out: &mut Vec<ReviewCandidate>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_reviews(item, out);
            }
        }
        Value::Object(map) => {
            if is_review_type(map.get("@type")) {
                if let Some(candidate) = map_review(value) {
                    out.push(candidate);
                }
                return;
            }
            if let Some(nested) = map.get("review") {
                collect_reviews(nested, out);
            }
            if let Some(graph) = map.get("@graph") {
                collect_reviews(graph, out);
            }
        }
        _ => {}
    }
}

fn is_review_type(type_field: Option<&Value>) -> bool {
    match type_field {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("review"),
        Some(Value::Array(items)) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case("review"))),
        _ => false,
    }
}

fn map_review(value: &Value) -> Option<ReviewCandidate> {
    let rating = value
        .get("reviewRating")
        .and_then(|r| r.get("ratingValue"))
        .or_else(|| value.get("rating"))
        .and_then(as_number)
        .unwrap_or(0.0);

    let text = string_field(value, &["reviewBody", "description"]);
    let title = string_field(value, &["name", "headline"]);
    let date = string_field(value, &["datePublished", "dateCreated"]);
    let reviewer_name = value.get("author").and_then(author_name);
    let verified_purchase = value
        .get("verifiedPurchase")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if rating <= 0.0 && text.is_none() && title.is_none() {
        return None;
    }

    Some(ReviewCandidate {
        reviewer_name,
        rating,
        title,
        text,
        date,
        verified_purchase,
        helpful_votes: 0,
    })
}

/// Numbers arrive as JSON numbers or as strings like `"4.5"`.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `author` is either a plain string or a Person object with a `name`.
fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}
