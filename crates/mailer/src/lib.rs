//! Outbound email delivery: multipart/alternative (plain + derived HTML)
//! over implicit-TLS SMTP.

pub mod html;

use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use showtally_core::config::EmailConfig;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("could not build email message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp relay setup failed: {0}")]
    Relay(#[source] lettre::transport::smtp::Error),
    #[error("smtp send failed: {0}")]
    Send(#[source] lettre::transport::smtp::Error),
}

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl Mailer {
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let from = parse_mailbox(&config.user)?;
        let to = config.to.iter().map(|addr| parse_mailbox(addr)).collect::<Result<_, _>>()?;

        let credentials = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(MailError::Relay)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self { transport, from, to })
    }

    /// Send the report as plain text plus the derived HTML rendering.
    pub async fn send(&self, subject: &str, plain_body: &str) -> Result<(), MailError> {
        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let message = builder.multipart(MultiPart::alternative_plain_html(
            plain_body.to_string(),
            html::render_html(plain_body),
        ))?;

        self.transport.send(message).await.map_err(MailError::Send)?;
        info!(
            event_name = "mail.sent",
            recipients = self.to.len(),
            subject,
            "summary email delivered"
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse()
        .map_err(|source| MailError::Address { address: address.to_string(), source })
}
