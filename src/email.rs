use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::EmailConfig;

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, username: &str, password: &str, from: &str) -> anyhow::Result<Self> {
        let transport = if username.is_empty() {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(port)
                .build()
        } else {
            let creds = Credentials::new(username.to_string(), password.to_string());
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .with_context(|| format!("smtp relay {host}"))?
                .port(port)
                .credentials(creds)
                .build()
        };
        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse::<Mailbox>().context("parse from address")?)
            .to(email.to.parse::<Mailbox>().context("parse recipient address")?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .context("build email")?;
        self.transport.send(message).await.context("smtp send")?;
        Ok(())
    }
}

/// Used when no SMTP host is configured. Bodies are not logged since they
/// may carry reset links.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "email not sent (smtp disabled)");
        Ok(())
    }
}

pub fn from_config(cfg: &EmailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    Ok(match &cfg.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(
            &smtp.host,
            smtp.port,
            &smtp.username,
            &smtp.password,
            &cfg.from,
        )?),
        None => Arc::new(LogMailer),
    })
}

pub mod messages {
    use super::OutgoingEmail;

    pub fn welcome(to: &str, login_url: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "Welcome to DevPort".into(),
            body: format!(
                "Your account has been created.\n\n\
                 Fill in your profile and add your first project:\n{login_url}\n"
            ),
        }
    }

    pub fn reset_password(to: &str, full_name: &str, reset_url: &str) -> OutgoingEmail {
        let greeting = if full_name.trim().is_empty() {
            "Hi,".to_string()
        } else {
            format!("Hi {full_name},")
        };
        OutgoingEmail {
            to: to.to_string(),
            subject: "Your password reset token (valid for 20 minutes)".into(),
            body: format!(
                "{greeting}\n\n\
                 Forgot your password? Set a new one here:\n{reset_url}\n\n\
                 If you didn't ask for this, ignore this email.\n"
            ),
        }
    }

    pub fn contact_us(to: &str, name: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            subject: "We received your message".into(),
            body: format!("Hi {name},\n\nThanks for reaching out. We'll get back to you soon.\n"),
        }
    }

    /// Copy of a contact-us message for the team inbox.
    pub fn feedback(team: &str, name: &str, sender: &str, message: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: team.to_string(),
            subject: format!("Feedback from {name}"),
            body: format!("From: {name} <{sender}>\n\n{message}\n"),
        }
    }
}
