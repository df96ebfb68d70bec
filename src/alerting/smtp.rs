//! SMTP transport for alert e-mails.
//!
//! Each delivery opens a fresh connection, upgrades it with STARTTLS, logs in
//! and sends a single message. There is no connection pool.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

use super::notifier::{AlertMessage, MailTransport, NotifyError};
use crate::config::defaults::SMTP_AUTH_FAILURE_CODES;
use crate::config::SmtpConfig;

/// lettre-backed [`MailTransport`].
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    relay: String,
}

impl SmtpMailer {
    /// Build a STARTTLS mailer for the configured relay.
    ///
    /// `timeout` bounds the connect and every SMTP command.
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, lettre::transport::smtp::Error> {
        let credentials = Credentials::new(
            config.effective_username().to_string(),
            config.password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            relay: format!("{}:{}", config.host, config.port),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&mut self, message: &AlertMessage) -> Result<(), NotifyError> {
        let email = build_email(message)?;
        let response = self.transport.send(email).await.map_err(classify)?;
        debug!(relay = %self.relay, code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }

    fn transport_name(&self) -> &str {
        &self.relay
    }
}

fn build_email(message: &AlertMessage) -> Result<Message, NotifyError> {
    let from: Mailbox = message
        .sender
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("sender '{}': {e}", message.sender)))?;
    let to: Mailbox = message
        .recipient
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("recipient '{}': {e}", message.recipient)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| NotifyError::InvalidMessage(e.to_string()))
}

/// Map a lettre error onto the retry taxonomy.
fn classify(err: lettre::transport::smtp::Error) -> NotifyError {
    let code = err.status().map(|c| c.to_string());
    if is_auth_failure(code.as_deref()) {
        NotifyError::Auth(err.to_string())
    } else {
        NotifyError::Transient(err.to_string())
    }
}

fn is_auth_failure(code: Option<&str>) -> bool {
    code.is_some_and(|c| SMTP_AUTH_FAILURE_CODES.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, recipient: &str) -> AlertMessage {
        AlertMessage {
            subject: "Person Detected - Bus BT123".to_string(),
            body: "Number of People Detected: 1\n".to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
        }
    }

    #[test]
    fn auth_codes_are_recognised() {
        assert!(is_auth_failure(Some("535")));
        assert!(is_auth_failure(Some("530")));
        assert!(!is_auth_failure(Some("421")));
        assert!(!is_auth_failure(Some("550")));
        assert!(!is_auth_failure(None));
    }

    #[test]
    fn builds_plain_text_email() {
        let email = build_email(&message("Depot Camera <cam@example.com>", "ops@example.com"))
            .expect("valid message");
        let raw = String::from_utf8(email.formatted()).expect("utf8");
        assert!(raw.contains("Subject: Person Detected - Bus BT123"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Number of People Detected: 1"));
    }

    #[test]
    fn bad_recipient_is_invalid_message() {
        let result = build_email(&message("cam@example.com", "nobody"));
        assert!(matches!(result, Err(NotifyError::InvalidMessage(_))));
    }

    #[tokio::test]
    async fn mailer_builds_for_relay() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            sender: "cam@example.com".to_string(),
            recipient: "ops@example.com".to_string(),
            password: "secret".to_string(),
            ..SmtpConfig::default()
        };
        let mailer = SmtpMailer::new(&config, Duration::from_secs(10)).expect("mailer");
        assert_eq!(mailer.transport_name(), "smtp.example.com:587");
    }
}
