//! Content-based review fingerprints for deduplication.
//!
//! A fingerprint is a pure function of the fields that identify a review, so
//! repeated scrapes of the same page produce identical fingerprints and the
//! storage layer can treat inserts as idempotent.

/// Joins fields before hashing. Sanitized text never contains control
/// characters, so the separator cannot occur inside a field.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Derive the stable hex fingerprint for a review.
///
/// The review date participates only for sources whose markup repeats the
/// same reviewer/body pair across date-stamped entries.
pub fn review_fingerprint(
    product_id: &str,
    reviewer_name: &str,
    review_text: &str,
    review_date: Option<&str>,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(product_id.as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(reviewer_name.as_bytes());
    hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
    hasher.update(review_text.as_bytes());
    if let Some(date) = review_date {
        hasher.update(FIELD_SEPARATOR.to_string().as_bytes());
        hasher.update(date.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = review_fingerprint("123", "Jane", "Great polish", None);
        let b = review_fingerprint("123", "Jane", "Great polish", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_changes_with_any_input() {
        let base = review_fingerprint("123", "Jane", "Great polish", None);
        assert_ne!(base, review_fingerprint("124", "Jane", "Great polish", None));
        assert_ne!(base, review_fingerprint("123", "Joan", "Great polish", None));
        assert_ne!(base, review_fingerprint("123", "Jane", "Great polish!", None));
        assert_ne!(
            base,
            review_fingerprint("123", "Jane", "Great polish", Some("2024-01-01"))
        );
    }

    #[test]
    fn date_variants_are_distinct() {
        let with_a = review_fingerprint("9", "A", "text", Some("2024-01-01"));
        let with_b = review_fingerprint("9", "A", "text", Some("2024-01-02"));
        assert_ne!(with_a, with_b);
    }

    #[test]
    fn concatenation_cannot_collide_across_fields() {
        // "ab" + "c" must not hash like "a" + "bc".
        let left = review_fingerprint("ab", "c", "x", None);
        let right = review_fingerprint("a", "bc", "x", None);
        assert_ne!(left, right);
    }
}
