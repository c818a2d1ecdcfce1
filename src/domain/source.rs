//! Supported review sources and URL-to-source resolution.
//!
//! The resolver classifies a product URL by matching its host against a fixed
//! domain table. Unsupported and malformed URLs are valid outcomes, never
//! errors: the orchestrator records them and moves on.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// A supported retailer. Adding a source means adding a variant here plus one
/// `SourceScraper` implementation; no other component changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Walmart,
    Target,
    Ulta,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::Walmart, SourceId::Target, SourceId::Ulta];

    /// Canonical domain suffix consulted by [`SourceId::resolve`].
    pub fn domain(self) -> &'static str {
        match self {
            SourceId::Walmart => "walmart.com",
            SourceId::Target => "target.com",
            SourceId::Ulta => "ulta.com",
        }
    }

    /// Human-readable retailer name used in stored rows and summaries.
    pub fn label(self) -> &'static str {
        match self {
            SourceId::Walmart => "Walmart",
            SourceId::Target => "Target",
            SourceId::Ulta => "ULTA",
        }
    }

    /// Classify a URL by host. Returns `None` for malformed URLs and
    /// unmatched hosts.
    pub fn resolve(url: &str) -> Option<SourceId> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        Self::ALL.into_iter().find(|source| {
            let domain = source.domain();
            host == domain || host.ends_with(&format!(".{domain}"))
        })
    }

    /// Parse a stored label back into a source id.
    pub fn from_label(label: &str) -> Option<SourceId> {
        Self::ALL
            .into_iter()
            .find(|source| source.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
