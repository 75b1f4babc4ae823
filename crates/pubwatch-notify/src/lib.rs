//! pubwatch-notify — Notification rendering and delivery.
//!
//! One HTML message is rendered per new publication and delivered over a
//! single authenticated mail session that is opened once per run and always
//! closed afterwards.

pub mod render;
pub mod transport;
pub mod delivery;

pub use delivery::{deliver_all, DeliveryOutcome, DeliveryReport};
pub use render::{render_notification, NotificationRecord, RenderSettings};
pub use transport::{MailSession, Mailer, NotifyError, SmtpMailer};
