//! Fire-and-forget email notifications.
//!
//! Dispatch runs on a spawned task bounded by the SMTP connection timeout.
//! Failures are logged and never surface to the triggering request; nothing
//! is retried.

use crate::config::SmtpConfig;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

#[derive(Clone)]
pub struct Notifier {
    inner: Option<Arc<Inner>>,
}

struct Inner {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Notifier {
    pub fn from_config(smtp: &SmtpConfig) -> Self {
        if !smtp.enabled() {
            tracing::info!("SMTP not configured; email notifications disabled");
            return Self { inner: None };
        }

        match build_transport(smtp) {
            Ok((transport, from)) => Self {
                inner: Some(Arc::new(Inner { transport, from })),
            },
            Err(err) => {
                tracing::warn!("invalid SMTP configuration, notifications disabled: {err}");
                Self { inner: None }
            }
        }
    }

    /// Queue a notification without blocking the caller.
    pub fn queue(&self, to: &str, subject: &str, body: &str) {
        let Some(inner) = self.inner.clone() else {
            return;
        };

        let to = to.trim().to_string();
        if to.is_empty() {
            return;
        }
        let subject = subject.to_string();
        let body = body.to_string();

        tokio::spawn(async move {
            if let Err(err) = send(&inner, &to, &subject, &body).await {
                tracing::warn!("failed to send email notification to {to}: {err}");
            }
        });
    }
}

async fn send(inner: &Inner, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
    let message = Message::builder()
        .from(inner.from.clone())
        .to(to.parse::<Mailbox>()?)
        .subject(subject)
        .body(body.to_string())?;
    inner.transport.send(message).await?;
    Ok(())
}

fn build_transport(
    smtp: &SmtpConfig,
) -> anyhow::Result<(AsyncSmtpTransport<Tokio1Executor>, Mailbox)> {
    let mut builder = if smtp.use_ssl {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)?
    } else if smtp.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
    };

    builder = builder.port(smtp.port).timeout(Some(smtp.timeout));
    if !smtp.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ));
    }

    Ok((builder.build(), smtp.from.parse::<Mailbox>()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_yields_inert_notifier() {
        let notifier = Notifier::from_config(&SmtpConfig::disabled());
        assert!(notifier.inner.is_none());
    }

    #[tokio::test]
    async fn bad_from_address_disables_notifier() {
        let smtp = SmtpConfig {
            host: "smtp.example.org".to_string(),
            from: "not an address".to_string(),
            ..SmtpConfig::disabled()
        };
        let notifier = Notifier::from_config(&smtp);
        assert!(notifier.inner.is_none());
    }
}
