//! pubwatch-ingestion — Incremental publication monitoring pipeline.
//! - Publication discovery (INSPIRE literature API)
//! - New-arrival detection against the persisted ledger
//! - Full-text retrieval and generative enrichment
//! - Run orchestration: enrich → notify → commit

pub mod sources;
pub mod dedup;
pub mod ledger;
pub mod artifact;
pub mod enrichment;
pub mod pipeline;
