use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::MailConfig;

const CONFIRMATION_SUBJECT: &str = "Welcome to KanairoXO Waitlist!";

#[derive(Template)]
#[template(path = "email/waitlist_welcome.html")]
struct WelcomeHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/waitlist_welcome.txt")]
struct WelcomeText<'a> {
    name: &'a str,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, name: &str, email: &str) -> Result<(), MailError>;
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpNotifier {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self {
            mailer,
            sender: config.sender.clone(),
        })
    }
}

/// Builds the multipart confirmation message for one recipient.
fn confirmation_message(sender: &str, name: &str, email: &str) -> Result<Message, MailError> {
    let html = WelcomeHtml { name }.render()?;
    let text = WelcomeText { name }.render()?;

    let message = Message::builder()
        .from(
            sender
                .parse()
                .map_err(|_| MailError::InvalidAddress(sender.to_string()))?,
        )
        .to(email
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to_string()))?)
        .subject(CONFIRMATION_SUBJECT)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html),
                ),
        )?;
    Ok(message)
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(&self, name: &str, email: &str) -> Result<(), MailError> {
        let message = confirmation_message(&self.sender, name, email)?;
        self.mailer.send(message).await?;
        tracing::info!(to = %email, "confirmation email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_confirmation(&self, _name: &str, email: &str) -> Result<(), MailError> {
        tracing::debug!(to = %email, "mail disabled; skipping confirmation email");
        Ok(())
    }
}

/// Sends the confirmation email on a detached task. One attempt; errors are
/// logged and never reach the caller.
pub fn dispatch_confirmation(notifier: Arc<dyn Notifier>, name: String, email: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.send_confirmation(&name, &email).await {
            tracing::error!(error = %e, to = %email, "failed to send confirmation email");
        }
    });
}
