//! Generative enrichment of new arrivals.
//!
//! For each record, sequentially:
//!   1. Download the full-text artifact behind `document_url`
//!   2. Ask the model for a plain-language summary
//!   3. Independently ask it for a feedback email draft in HTML
//!
//! Any failure only blanks the affected field(s) of that record.

use std::sync::Arc;
use std::time::Instant;

use pubwatch_common::{EnrichmentResult, PublicationRecord};
use pubwatch_llm::audit::LlmAuditEntry;
use pubwatch_llm::backend::{LlmBackend, LlmRequest, Message};
use tracing::{info, warn};

use crate::artifact::{ArtifactFetcher, EncodedArtifact};

pub const SUMMARY_PROMPT: &str = "Summarize this as if you're the author trying to explain it to a \
five year old, call them \"little scientist.\" Keep it simple, fun, and as if you're giving a crash \
course for someone who barely remembers anything from high school physics.";

/// Instruction for the feedback email, addressed to the author by name.
pub fn suggestion_prompt(author_display_name: &str) -> String {
    format!(
        "Based on the article's content, draft an email to the author, {author_display_name}. \
         Begin the email by expressing appreciation for the article, highlighting specific aspects \
         you found insightful or engaging. After the positive introduction, kindly offer constructive \
         suggestions for improvement. Focus on areas such as structure, clarity, and any missing \
         details or explanations that could enhance understanding and accessibility of the topic. \
         Conclude the email with a thoughtful Albert Einstein quote, prefacing it like this: \
         \"Remember what Einstein said,\" Please format your response in HTML."
    )
}

pub struct Enricher {
    fetcher: Arc<dyn ArtifactFetcher>,
    llm: Arc<dyn LlmBackend>,
    suggestion_prompt: String,
}

impl Enricher {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        llm: Arc<dyn LlmBackend>,
        author_display_name: &str,
    ) -> Self {
        Self {
            fetcher,
            llm,
            suggestion_prompt: suggestion_prompt(author_display_name),
        }
    }

    /// Enrich every record in order; the output is index-aligned with the input.
    pub async fn enrich_all(&self, records: &[PublicationRecord]) -> Vec<EnrichmentResult> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(self.enrich(record).await);
        }
        results
    }

    pub async fn enrich(&self, record: &PublicationRecord) -> EnrichmentResult {
        let Some(url) = record.document_url.as_deref() else {
            warn!(id = %record.id, title = ?record.title, "No document link; skipping enrichment");
            return EnrichmentResult::default();
        };

        info!(id = %record.id, url = %url, "Processing document");
        let artifact = match self.fetcher.fetch(url).await {
            Ok(a) => a,
            Err(e) => {
                warn!(id = %record.id, url = %url, error = %e, "Artifact retrieval failed");
                return EnrichmentResult::default();
            }
        };

        let summary = self.generate(record, &artifact, SUMMARY_PROMPT, "summary").await;
        let suggestion_email = self
            .generate(record, &artifact, &self.suggestion_prompt, "suggestion")
            .await;

        EnrichmentResult { summary, suggestion_email }
    }

    async fn generate(
        &self,
        record: &PublicationRecord,
        artifact: &EncodedArtifact,
        prompt: &str,
        purpose: &str,
    ) -> Option<String> {
        let req = LlmRequest::new(vec![
            Message::user(prompt).with_attachment(artifact.attachment()),
        ]);

        let t0 = Instant::now();
        match self.llm.complete(req).await {
            Ok(resp) => {
                LlmAuditEntry::new(record.id.to_string(), purpose, &resp, t0.elapsed().as_millis() as u64)
                    .record();
                Some(resp.content)
            }
            Err(e) => {
                warn!(id = %record.id, purpose, error = %e, "Generation failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::encode_artifact;
    use async_trait::async_trait;
    use pubwatch_common::PubwatchError;
    use pubwatch_llm::backend::{LlmError, LlmResponse};
    use std::sync::Mutex;

    struct FakeFetcher {
        failing_urls: Vec<&'static str>,
    }

    #[async_trait]
    impl ArtifactFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> pubwatch_common::Result<EncodedArtifact> {
            if self.failing_urls.iter().any(|u| *u == url) {
                return Err(PubwatchError::Artifact(format!("HTTP 404 Not Found for {url}")));
            }
            Ok(encode_artifact(url, b"%PDF", None))
        }
    }

    /// Answers with the prompt kind, or fails for prompts containing `fail_on`.
    struct FakeLlm {
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for FakeLlm {
        async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
            let msg = &req.messages[0];
            assert_eq!(msg.attachments.len(), 1);
            self.calls.lock().unwrap().push(msg.content.clone());
            if let Some(needle) = self.fail_on {
                if msg.content.contains(needle) {
                    return Err(LlmError::ApiError { status: 429, message: "quota".into() });
                }
            }
            let content = if msg.content.contains("five year old") { "summary" } else { "<p>email</p>" };
            Ok(LlmResponse {
                content: content.to_string(),
                model: "fake".into(),
                prompt_tokens: 1,
                completion_tokens: 1,
            })
        }
        fn model_id(&self) -> &str { "fake" }
        fn max_output_tokens(&self) -> usize { 1024 }
    }

    fn enricher(failing_urls: Vec<&'static str>, fail_on: Option<&'static str>) -> (Enricher, Arc<FakeLlm>) {
        let llm = Arc::new(FakeLlm { fail_on, calls: Mutex::new(Vec::new()) });
        let e = Enricher::new(Arc::new(FakeFetcher { failing_urls }), llm.clone(), "Joseph");
        (e, llm)
    }

    fn record(id: u64) -> PublicationRecord {
        PublicationRecord::new(id).with_document_url(format!("https://arxiv.org/pdf/{id}"))
    }

    #[tokio::test]
    async fn test_both_fields_populated() {
        let (e, llm) = enricher(vec![], None);
        let r = e.enrich(&record(1)).await;
        assert_eq!(r.summary.as_deref(), Some("summary"));
        assert_eq!(r.suggestion_email.as_deref(), Some("<p>email</p>"));
        assert_eq!(llm.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_retrieval_isolated_to_item() {
        let (e, llm) = enricher(vec!["https://arxiv.org/pdf/2"], None);
        let results = e.enrich_all(&[record(1), record(2), record(3)]).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].summary.is_some() && results[0].suggestion_email.is_some());
        assert!(results[1].is_empty());
        assert!(results[2].summary.is_some() && results[2].suggestion_email.is_some());
        // no model calls for the failed item
        assert_eq!(llm.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_summary_failure_does_not_block_suggestion() {
        let (e, _) = enricher(vec![], Some("five year old"));
        let r = e.enrich(&record(1)).await;
        assert_eq!(r.summary, None);
        assert_eq!(r.suggestion_email.as_deref(), Some("<p>email</p>"));
    }

    #[tokio::test]
    async fn test_suggestion_failure_keeps_summary() {
        let (e, _) = enricher(vec![], Some("Einstein"));
        let r = e.enrich(&record(1)).await;
        assert_eq!(r.summary.as_deref(), Some("summary"));
        assert_eq!(r.suggestion_email, None);
    }

    #[tokio::test]
    async fn test_missing_link_yields_empty_result() {
        let (e, llm) = enricher(vec![], None);
        let r = e.enrich(&PublicationRecord::new(9u64)).await;
        assert!(r.is_empty());
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_suggestion_prompt_names_author() {
        let p = suggestion_prompt("Joseph");
        assert!(p.contains("to the author, Joseph."));
        assert!(p.contains("Remember what Einstein said,"));
        assert!(p.contains("HTML"));
    }
}
