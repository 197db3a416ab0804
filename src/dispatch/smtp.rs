use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::debug;

use super::MailDispatch;
use crate::config::SmtpConfig;

/// Mail dispatcher backed by lettre's blocking SMTP transport.
///
/// The transport carries a finite timeout from the configuration; a stuck
/// submission surfaces as an error to the engine instead of wedging the
/// event loop forever.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = if config.starttls {
            SmtpTransport::starttls_relay(&config.host)
                .with_context(|| format!("failed to set up STARTTLS relay for {}", config.host))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ));
        }

        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid smtp from address '{}'", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl MailDispatch for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("invalid destination address '{to}'"))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("failed to build mail message")?;

        debug!(subject, "submitting mail");
        self.transport
            .send(&message)
            .context("smtp submission failed")?;
        Ok(())
    }
}
