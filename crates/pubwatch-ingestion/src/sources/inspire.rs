//! INSPIRE-HEP literature API client.
//!
//! Endpoint: https://inspirehep.net/api/literature
//! Query:    `q=a <author-identifier>&sort=mostrecent&size=<n>&page=1`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pubwatch_common::sandbox::SandboxClient as Client;
use pubwatch_common::{PublicationId, PublicationRecord, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::PublicationSource;

pub const INSPIRE_LITERATURE_URL: &str = "https://inspirehep.net/api/literature";
pub const ARXIV_PDF_BASE: &str = "https://arxiv.org/pdf/";

pub struct InspireClient {
    client: Client,
    base_url: String,
    sort: String,
    document_base: String,
}

impl InspireClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: INSPIRE_LITERATURE_URL.to_string(),
            sort: "mostrecent".to_string(),
            document_base: ARXIV_PDF_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Prefix joined with an e-print identifier to form the document link.
    pub fn with_document_base(mut self, document_base: impl Into<String>) -> Self {
        self.document_base = document_base.into();
        self
    }
}

#[async_trait]
impl PublicationSource for InspireClient {
    #[instrument(skip(self))]
    async fn author_publications(&self, author: &str, max_results: usize) -> Result<Vec<PublicationRecord>> {
        let query = format!("a {author}");
        let size = max_results.to_string();
        let params = [
            ("sort", self.sort.as_str()),
            ("size", size.as_str()),
            ("page", "1"),
            ("q", query.as_str()),
        ];

        let resp = self.client
            .get(&self.base_url)?
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        let records = project_hits(&resp, &self.document_base);
        debug!(count = records.len(), "INSPIRE search returned records");
        Ok(records)
    }
}

/// Map the nested INSPIRE response onto typed records, in response order.
///
/// Every field access is optional. Only a hit without a coercible id is
/// dropped, since it could never be recognised as already processed.
pub fn project_hits(resp: &Value, document_base: &str) -> Vec<PublicationRecord> {
    let Some(hits) = resp["hits"]["hits"].as_array() else {
        warn!("INSPIRE response has no hits array; treating as empty");
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| {
            let id = PublicationId::from_json(&hit["id"])
                .or_else(|| PublicationId::from_json(&hit["metadata"]["control_number"]));
            match id {
                Some(id) => Some(project_hit(id, hit, document_base)),
                None => {
                    warn!(raw_id = %hit["id"], "Skipping hit without a numeric id");
                    None
                }
            }
        })
        .collect()
}

fn project_hit(id: PublicationId, hit: &Value, document_base: &str) -> PublicationRecord {
    let metadata = &hit["metadata"];
    let arxiv_eprint = first_str(&metadata["arxiv_eprints"], "value");

    PublicationRecord {
        id,
        title: first_str(&metadata["titles"], "title"),
        abstract_text: first_str(&metadata["abstracts"], "value"),
        document_url: arxiv_eprint.as_deref().map(|e| document_url(document_base, e)),
        arxiv_eprint,
        citation_count: metadata["citation_count"].as_u64(),
        number_of_pages: metadata["number_of_pages"]
            .as_u64()
            .and_then(|n| u32::try_from(n).ok()),
        created: timestamp(&hit["created"]),
        updated: timestamp(&hit["updated"]),
    }
}

/// `list[0][field]` as a non-empty string.
fn first_str(list: &Value, field: &str) -> Option<String> {
    list.as_array()?
        .first()?
        .get(field)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn document_url(base: &str, eprint: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), eprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "hits": {
                "total": 3,
                "hits": [
                    {
                        "id": "2754321",
                        "created": "2024-01-20T09:00:00.123456+00:00",
                        "updated": "2024-02-01T10:30:00+00:00",
                        "metadata": {
                            "titles": [{ "title": "Parton distributions from lattice QCD", "source": "arXiv" }],
                            "abstracts": [{ "value": "We compute ...", "source": "arXiv" }],
                            "arxiv_eprints": [{ "value": "2401.10101", "categories": ["hep-lat"] }],
                            "citation_count": 4,
                            "number_of_pages": 12
                        }
                    },
                    {
                        "id": 2700000,
                        "metadata": { "titles": "not-a-list", "abstracts": [] }
                    },
                    { "id": "not-a-number", "metadata": {} }
                ]
            }
        })
    }

    #[test]
    fn test_full_hit_projection() {
        let records = project_hits(&sample(), ARXIV_PDF_BASE);
        let r = &records[0];
        assert_eq!(r.id, PublicationId::new(2754321));
        assert_eq!(r.title.as_deref(), Some("Parton distributions from lattice QCD"));
        assert_eq!(r.abstract_text.as_deref(), Some("We compute ..."));
        assert_eq!(r.arxiv_eprint.as_deref(), Some("2401.10101"));
        assert_eq!(r.document_url.as_deref(), Some("https://arxiv.org/pdf/2401.10101"));
        assert_eq!(r.citation_count, Some(4));
        assert_eq!(r.number_of_pages, Some(12));
        assert!(r.created.is_some());
        assert!(r.updated.is_some());
    }

    #[test]
    fn test_malformed_fields_degrade_to_none() {
        let records = project_hits(&sample(), ARXIV_PDF_BASE);
        let r = &records[1];
        assert_eq!(r.id, PublicationId::new(2700000));
        assert_eq!(r.title, None);
        assert_eq!(r.abstract_text, None);
        assert_eq!(r.document_url, None);
        assert_eq!(r.created, None);
    }

    #[test]
    fn test_uncoercible_id_is_dropped_and_order_kept() {
        let records = project_hits(&sample(), ARXIV_PDF_BASE);
        let ids: Vec<u64> = records.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![2754321, 2700000]);
    }

    #[test]
    fn test_control_number_fallback() {
        let resp = json!({ "hits": { "hits": [{ "metadata": { "control_number": 55 } }] } });
        let records = project_hits(&resp, ARXIV_PDF_BASE);
        assert_eq!(records[0].id, PublicationId::new(55));
    }

    #[test]
    fn test_missing_hits_is_empty() {
        assert!(project_hits(&json!({}), ARXIV_PDF_BASE).is_empty());
        assert!(project_hits(&json!({ "hits": { "hits": null } }), ARXIV_PDF_BASE).is_empty());
    }

    #[test]
    fn test_document_url_join() {
        assert_eq!(document_url("https://arxiv.org/pdf", "2401.1"), "https://arxiv.org/pdf/2401.1");
        assert_eq!(document_url("https://arxiv.org/pdf/", "2401.1"), "https://arxiv.org/pdf/2401.1");
    }
}
