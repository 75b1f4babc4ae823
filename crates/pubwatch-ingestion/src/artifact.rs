//! Full-text artifact retrieval.
//!
//! The document behind a record's `document_url` is downloaded and
//! base64-encoded so it can travel inline in a generative-model request.

use async_trait::async_trait;
use base64::Engine;
use pubwatch_common::sandbox::SandboxClient as Client;
use pubwatch_common::{PubwatchError, Result};
use pubwatch_llm::backend::Attachment;
use tracing::{debug, instrument};

pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    pub url: String,
    pub mime_type: String,
    pub data_base64: String,
    pub byte_len: usize,
}

impl EncodedArtifact {
    pub fn attachment(&self) -> Attachment {
        Attachment {
            mime_type: self.mime_type.clone(),
            data_base64: self.data_base64.clone(),
        }
    }
}

/// Encode raw bytes; the MIME type comes from the response header when it
/// names one, otherwise PDF is assumed.
pub fn encode_artifact(url: &str, bytes: &[u8], content_type: Option<&str>) -> EncodedArtifact {
    let mime_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(str::trim)
        .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
        .unwrap_or(DEFAULT_MIME_TYPE)
        .to_string();

    EncodedArtifact {
        url: url.to_string(),
        mime_type,
        data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        byte_len: bytes.len(),
    }
}

#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<EncodedArtifact>;
}

pub struct HttpArtifactFetcher {
    client: Client,
}

impl HttpArtifactFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<EncodedArtifact> {
        let resp = self.client.get(url)?.send().await?;
        if !resp.status().is_success() {
            return Err(PubwatchError::Artifact(format!("HTTP {} for {}", resp.status(), url)));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(PubwatchError::Artifact(format!("empty body for {url}")));
        }

        debug!(bytes = bytes.len(), content_type = ?content_type, "Artifact downloaded");
        Ok(encode_artifact(url, &bytes, content_type.as_deref()))
    }
}
