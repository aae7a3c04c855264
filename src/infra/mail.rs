//! SMTP adapter for the outbound mail port.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::Mailbox,
    transport::smtp::authentication::Credentials,
};
use tracing::debug;

use crate::application::mailer::{MailError, Mailer, OutgoingEmail};
use crate::config::MailSettings;
use crate::infra::error::InfraError;

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_settings(settings: &MailSettings) -> Result<Self, InfraError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|err| InfraError::mail(format!("invalid sender address: {err}")))?;

        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
                .map_err(|err| InfraError::mail(err.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
        };
        builder = builder.port(settings.smtp_port);

        if let (Some(username), Some(password)) =
            (settings.username.as_ref(), settings.password.as_ref())
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|err: lettre::address::AddressError| {
                MailError::invalid_address(&email.to, err.to_string())
            })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .body(email.body)
            .map_err(|err| MailError::transport(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| MailError::transport(err.to_string()))?;

        debug!(target = "brezza::mail", to = %email.to, "smtp message accepted");
        Ok(())
    }
}
