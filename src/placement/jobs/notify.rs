use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

/// Plain-text email handed to the notification sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Outbound email hook (SMTP relay, log sink, test double).
pub trait Notifier: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid address '{0}'")]
    Address(String),
    #[error("email transport unavailable: {0}")]
    Transport(String),
}

/// Single best-effort attempt off the request path. Failures are logged only.
pub fn dispatch<N>(notifier: Arc<N>, message: EmailMessage) -> JoinHandle<()>
where
    N: Notifier + ?Sized + 'static,
{
    tracing::debug!(recipient = %message.recipient, "queueing email");
    tokio::spawn(async move {
        let recipient = message.recipient.clone();
        let result = tokio::task::spawn_blocking(move || notifier.send(&message)).await;
        match result {
            Ok(Ok(())) => tracing::info!(%recipient, "email sent"),
            Ok(Err(err)) => tracing::warn!(%recipient, error = %err, "could not send email"),
            Err(err) => tracing::warn!(%recipient, error = %err, "email task failed to execute"),
        }
    })
}

/// Sink used when no SMTP relay is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "email delivery disabled; message logged only"
        );
        Ok(())
    }
}
