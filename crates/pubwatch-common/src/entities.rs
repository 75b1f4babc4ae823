//! Core entity types shared by the ingestion, enrichment and notification stages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Publication identifier
// ---------------------------------------------------------------------------

/// Stable catalog identifier of a publication.
///
/// The catalog hands ids out as strings (`"2754321"`) while the ledger file
/// stores them as plain integers, so both are normalised to a `u64` before any
/// membership test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(u64);

impl PublicationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Coerce a JSON value (number or numeric string) into an id.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().and_then(integral_f64)),
            serde_json::Value::String(s) => s.parse().ok().map(|id: PublicationId| id.0),
            _ => None,
        }
        .map(Self)
    }
}

/// Accepts `103.0` but rejects `103.5`, negatives and non-finite values.
fn integral_f64(f: f64) -> Option<u64> {
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError(String);

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a numeric publication id: {:?}", self.0)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for PublicationId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_f64))
            .map(Self)
            .ok_or_else(|| ParseIdError(s.to_string()))
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PublicationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

// ---------------------------------------------------------------------------
// Publication record
// ---------------------------------------------------------------------------

/// One bibliographic entry as projected from the catalog response.
/// Only `id` is guaranteed; every other field degrades to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: PublicationId,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub arxiv_eprint: Option<String>,
    pub document_url: Option<String>,
    pub citation_count: Option<u64>,
    pub number_of_pages: Option<u32>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl PublicationRecord {
    pub fn new(id: impl Into<PublicationId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            abstract_text: None,
            arxiv_eprint: None,
            document_url: None,
            citation_count: None,
            number_of_pages: None,
            created: None,
            updated: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_document_url(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }

    /// Title for display; empty when the catalog had none.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Enrichment
// ---------------------------------------------------------------------------

/// Outcome of the generative stage for one publication. `None` marks a
/// recoverable failure for that field only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub summary: Option<String>,
    pub suggestion_email: Option<String>,
}

impl EnrichmentResult {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.suggestion_email.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_and_integer_ids_compare_equal() {
        let from_str = PublicationId::from_json(&json!("103")).unwrap();
        let from_int = PublicationId::from_json(&json!(103)).unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_str, PublicationId::new(103));
    }

    #[test]
    fn test_id_coercion_tolerates_whitespace_and_integral_floats() {
        assert_eq!(" 42 ".parse::<PublicationId>().unwrap(), PublicationId::new(42));
        assert_eq!("42.0".parse::<PublicationId>().unwrap(), PublicationId::new(42));
        assert_eq!(PublicationId::from_json(&json!(42.0)), Some(PublicationId::new(42)));
    }

    #[test]
    fn test_id_coercion_rejects_non_numeric() {
        assert!("abc".parse::<PublicationId>().is_err());
        assert!("4.5".parse::<PublicationId>().is_err());
        assert!("-7".parse::<PublicationId>().is_err());
        assert_eq!(PublicationId::from_json(&json!(null)), None);
        assert_eq!(PublicationId::from_json(&json!({"id": 1})), None);
    }

    #[test]
    fn test_display_title_defaults_to_empty() {
        let record = PublicationRecord::new(7u64);
        assert_eq!(record.display_title(), "");
        assert_eq!(record.with_title("X").display_title(), "X");
    }

    #[test]
    fn test_enrichment_empty() {
        assert!(EnrichmentResult::default().is_empty());
        let partial = EnrichmentResult { summary: Some("s".into()), suggestion_email: None };
        assert!(!partial.is_empty());
    }
}
