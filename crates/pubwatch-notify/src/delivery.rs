//! Delivery phase: one session per run, one message per publication.

use pubwatch_common::PublicationId;
use tracing::{error, info, warn};

use crate::render::NotificationRecord;
use crate::transport::{MailSession, Mailer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// This message failed; the session stayed usable (or just broke).
    Failed(String),
    /// Never attempted because no usable session was available.
    Skipped(String),
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<(PublicationId, DeliveryOutcome)>,
}

impl DeliveryReport {
    pub fn delivered_ids(&self) -> Vec<PublicationId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DeliveryOutcome::Delivered)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn delivered(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Delivered))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DeliveryOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&DeliveryOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Deliver every notification in order over a single session.
///
/// The session is closed on every path out of this function. A failure to
/// open it, or a connection-level failure mid-loop, skips the remaining
/// messages but is not an error: the caller still commits state.
pub async fn deliver_all(mailer: &dyn Mailer, notifications: &[NotificationRecord]) -> DeliveryReport {
    if notifications.is_empty() {
        return DeliveryReport::default();
    }

    let mut session = match mailer.open_session().await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to open mail session; skipping all deliveries");
            let reason = e.to_string();
            return DeliveryReport {
                outcomes: notifications
                    .iter()
                    .map(|n| (n.publication_id, DeliveryOutcome::Skipped(reason.clone())))
                    .collect(),
            };
        }
    };

    let report = send_each(session.as_mut(), notifications).await;
    session.close().await;
    report
}

async fn send_each(session: &mut dyn MailSession, notifications: &[NotificationRecord]) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    let mut broken: Option<String> = None;

    for n in notifications {
        if let Some(reason) = &broken {
            report.outcomes.push((n.publication_id, DeliveryOutcome::Skipped(reason.clone())));
            continue;
        }

        match session.send(n).await {
            Ok(()) => {
                info!(id = %n.publication_id, subject = %n.subject, "Notification sent");
                report.outcomes.push((n.publication_id, DeliveryOutcome::Delivered));
            }
            Err(e) if e.is_session_fatal() => {
                error!(id = %n.publication_id, error = %e, "Mail session lost; aborting delivery phase");
                broken = Some(e.to_string());
                report.outcomes.push((n.publication_id, DeliveryOutcome::Failed(e.to_string())));
            }
            Err(e) => {
                warn!(id = %n.publication_id, error = %e, "Notification failed");
                report.outcomes.push((n.publication_id, DeliveryOutcome::Failed(e.to_string())));
            }
        }
    }

    report
}
