//! pubwatch-common — Shared types, errors, and the outbound HTTP client used
//! across all pubwatch crates.

pub mod error;
pub mod entities;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{EnrichmentResult, PublicationId, PublicationRecord};
pub use error::{PubwatchError, Result};
