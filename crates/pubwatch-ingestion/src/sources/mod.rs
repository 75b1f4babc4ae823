//! Publication source clients.

pub mod inspire;

use async_trait::async_trait;
use pubwatch_common::{PublicationRecord, Result};

/// Common interface for catalog clients.
#[async_trait]
pub trait PublicationSource: Send + Sync {
    /// Return the author's publications, most recent first, at most
    /// `max_results` of them. A transport failure here is fatal to the run.
    async fn author_publications(
        &self,
        author: &str,
        max_results: usize,
    ) -> Result<Vec<PublicationRecord>>;
}
