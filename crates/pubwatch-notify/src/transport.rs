//! Mail transport: a `Mailer` opens one authenticated `MailSession` per run.
//!
//! The SMTP implementation uses lettre's async transport with a single pooled
//! connection, so every message of a run goes over the same STARTTLS login.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::render::NotificationRecord;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("could not open mail session: {0}")]
    Connect(String),

    #[error("message rejected by server: {0}")]
    Rejected(String),

    #[error("mail session unusable: {0}")]
    SessionUnusable(String),
}

impl NotifyError {
    /// True when the session itself is gone and further sends are pointless.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, NotifyError::SessionUnusable(_) | NotifyError::Connect(_))
    }
}

/// Opens authenticated sessions.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn MailSession>, NotifyError>;
}

/// A live, authenticated session. `close` must be called once sending is done.
#[async_trait]
pub trait MailSession: Send {
    async fn send(&mut self, notification: &NotificationRecord) -> Result<(), NotifyError>;
    async fn close(&mut self);
}

// ── SMTP ──────────────────────────────────────────────────────────────────────

pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
        from: &str,
    ) -> Result<Self, NotifyError> {
        Ok(Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            from: parse_mailbox(from)?,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse::<Mailbox>().map_err(|e| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self), fields(host = %self.host, port = self.port))]
    async fn open_session(&self) -> Result<Box<dyn MailSession>, NotifyError> {
        let credentials = Credentials::new(
            self.username.clone(),
            self.password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| NotifyError::Connect(e.to_string()))?
            .port(self.port)
            .credentials(credentials)
            .pool_config(PoolConfig::new().max_size(1))
            .build();

        // Forces the connect + STARTTLS + login now instead of on first send.
        match transport.test_connection().await {
            Ok(true) => {}
            Ok(false) => return Err(NotifyError::Connect("server did not accept the connection".into())),
            Err(e) => return Err(NotifyError::Connect(e.to_string())),
        }
        info!("Logged in to mail server");

        Ok(Box::new(SmtpSession { transport: Some(transport), from: self.from.clone() }))
    }
}

struct SmtpSession {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

#[async_trait]
impl MailSession for SmtpSession {
    async fn send(&mut self, notification: &NotificationRecord) -> Result<(), NotifyError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| NotifyError::SessionUnusable("session already closed".into()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&notification.recipient)?)
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(notification.html_body.clone())?;

        match transport.send(message).await {
            Ok(response) => {
                debug!(code = %response.code(), "Message accepted");
                Ok(())
            }
            Err(e) => Err(classify_send_error(e.status().map(u16::from), e.to_string())),
        }
    }

    async fn close(&mut self) {
        // shutdown sends QUIT on the pooled connection before returning
        if let Some(transport) = self.transport.take() {
            transport.shutdown().await;
            info!("Mail session closed");
        }
    }
}

impl Drop for SmtpSession {
    fn drop(&mut self) {
        // Reached without `close` only when a send panicked. lettre then
        // releases the connection from a background task.
        if self.transport.is_some() {
            warn!("Mail session dropped without close");
        }
    }
}

/// A negative SMTP reply concerns this message only, except 421 (service
/// closing the channel). No reply code at all (I/O, TLS, timeout) means the
/// connection is gone.
fn classify_send_error(status: Option<u16>, message: String) -> NotifyError {
    match status {
        Some(421) | None => NotifyError::SessionUnusable(message),
        Some(_) => NotifyError::Rejected(message),
    }
}
