//! End-to-end monitoring run.
//!
//! Orchestrates one run for a single author:
//!   1. Load the ledger of processed ids
//!   2. Fetch the current publication list (fatal on failure)
//!   3. Diff against the ledger; stop here when nothing is new
//!   4. Enrich each new arrival (artifact + two generative calls)
//!   5. Render and deliver one notification per new arrival
//!   6. Commit ids to the ledger according to the commit policy
//!
//! Per-item enrichment and delivery failures are logged and never abort the
//! run; only the catalog fetch and the ledger I/O can.

use std::sync::Arc;

use pubwatch_common::{PublicationId, Result};
use pubwatch_notify::{deliver_all, render_notification, DeliveryReport, Mailer, RenderSettings};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::dedup::new_arrivals;
use crate::enrichment::Enricher;
use crate::ledger::{commit_ids, LedgerStore};
use crate::sources::PublicationSource;

/// Which new-arrival ids are written to the ledger at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Every new arrival, whether or not its notification got out. An item
    /// whose delivery failed is therefore never retried.
    #[default]
    AllNewArrivals,
    /// Only ids whose notification the transport accepted; the rest are
    /// picked up again by the next run.
    DeliveredOnly,
}

/// Parameters for a monitoring run.
#[derive(Debug, Clone)]
pub struct MonitorJob {
    pub author: String,
    pub max_results: usize,
    pub commit_policy: CommitPolicy,
    pub render: RenderSettings,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub fetched: usize,
    pub new_arrivals: Vec<PublicationId>,
    pub summarised: usize,
    pub suggested: usize,
    pub delivered: usize,
    pub delivery_failed: usize,
    pub delivery_skipped: usize,
    /// Ids newly written to the ledger; `None` when no commit happened.
    pub committed: Option<usize>,
    pub duration_ms: u64,
}

impl RunReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            fetched: 0,
            new_arrivals: Vec::new(),
            summarised: 0,
            suggested: 0,
            delivered: 0,
            delivery_failed: 0,
            delivery_skipped: 0,
            committed: None,
            duration_ms: 0,
        }
    }
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

pub struct MonitorPipeline {
    source: Arc<dyn PublicationSource>,
    enricher: Enricher,
    mailer: Arc<dyn Mailer>,
    ledger: Arc<dyn LedgerStore>,
}

impl MonitorPipeline {
    pub fn new(
        source: Arc<dyn PublicationSource>,
        enricher: Enricher,
        mailer: Arc<dyn Mailer>,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        Self { source, enricher, mailer, ledger }
    }

    /// Runs the pipeline once. Returns an error only for fatal failures
    /// (ledger unreadable, catalog fetch failed, ledger write failed).
    #[instrument(skip(self, job), fields(author = %job.author))]
    pub async fn run_once(&self, job: &MonitorJob) -> Result<RunReport> {
        let t0 = std::time::Instant::now();
        let mut report = RunReport::new(Uuid::new_v4());

        let mut known = self.ledger.load()?;
        let current = self.source.author_publications(&job.author, job.max_results).await?;
        report.fetched = current.len();

        let arrivals = new_arrivals(&current, &known);
        report.new_arrivals = arrivals.iter().map(|r| r.id).collect();
        if arrivals.is_empty() {
            report.duration_ms = t0.elapsed().as_millis() as u64;
            info!(run_id = %report.run_id, fetched = report.fetched, "No publications to process");
            return Ok(report);
        }
        info!(run_id = %report.run_id, count = arrivals.len(), "New publications found");

        let enrichments = self.enricher.enrich_all(&arrivals).await;
        report.summarised = enrichments.iter().filter(|e| e.summary.is_some()).count();
        report.suggested = enrichments.iter().filter(|e| e.suggestion_email.is_some()).count();

        let notifications: Vec<_> = arrivals
            .iter()
            .zip(&enrichments)
            .map(|(record, enrichment)| render_notification(record, enrichment, &job.render))
            .collect();
        let delivery = deliver_all(self.mailer.as_ref(), &notifications).await;
        report.delivered = delivery.delivered();
        report.delivery_failed = delivery.failed();
        report.delivery_skipped = delivery.skipped();

        let to_commit = ids_to_commit(job.commit_policy, &report.new_arrivals, &delivery);
        report.committed = Some(commit_ids(self.ledger.as_ref(), &mut known, to_commit)?);
        report.duration_ms = t0.elapsed().as_millis() as u64;

        info!(
            run_id           = %report.run_id,
            fetched          = report.fetched,
            new              = report.new_arrivals.len(),
            summarised       = report.summarised,
            suggested        = report.suggested,
            delivered        = report.delivered,
            delivery_failed  = report.delivery_failed,
            delivery_skipped = report.delivery_skipped,
            committed        = ?report.committed,
            duration_ms      = report.duration_ms,
            "Monitoring run complete"
        );

        Ok(report)
    }
}

fn ids_to_commit(policy: CommitPolicy, arrivals: &[PublicationId], delivery: &DeliveryReport) -> Vec<PublicationId> {
    match policy {
        CommitPolicy::AllNewArrivals => arrivals.to_vec(),
        CommitPolicy::DeliveredOnly => delivery.delivered_ids(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
