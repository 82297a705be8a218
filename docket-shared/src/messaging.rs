/// Outbound notifications carrying verification codes
///
/// The lifecycle services only see the [`Mailer`] trait. [`SmtpMailer`]
/// delivers through an SMTP relay, [`LogMailer`] writes messages to the log
/// when no relay is configured, and [`MemoryMailer`] keeps them in memory so
/// tests can read the codes back.
///
/// # Example
///
/// ```
/// use docket_shared::messaging::{Mailer, MemoryMailer, Notification};
/// use docket_shared::verification::CodePurpose;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mailer = MemoryMailer::new();
/// mailer.notify(&Notification::new("a@example.com", CodePurpose::Register, "123456")).await?;
///
/// assert_eq!(mailer.last_code_for("a@example.com").await.as_deref(), Some("123456"));
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::verification::CodePurpose;

/// Error type for message delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to deliver message: {0}")]
    Delivery(String),
}

/// A code-bearing message for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub purpose: CodePurpose,
    pub code: String,

    /// Company the recipient is invited to
    pub company_name: Option<String>,

    /// Where the recipient sets a password after an invite
    pub link: Option<String>,
}

impl Notification {
    pub fn new(to: impl Into<String>, purpose: CodePurpose, code: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            purpose,
            code: code.into(),
            company_name: None,
            link: None,
        }
    }

    pub fn with_invite(mut self, company_name: Option<String>, link: String) -> Self {
        self.company_name = company_name;
        self.link = Some(link);
        self
    }

    pub fn subject(&self) -> String {
        match self.purpose {
            CodePurpose::Register => "Verify your account".to_string(),
            CodePurpose::Reset => "Password reset".to_string(),
            CodePurpose::Invite => match &self.company_name {
                Some(company) => format!("You have been invited to join {}", company),
                None => "You have been invited to join a company".to_string(),
            },
        }
    }

    pub fn body(&self) -> String {
        match self.purpose {
            CodePurpose::Register => format!(
                "Welcome! Your verification code is {}. Enter it in the app to activate your account.",
                self.code
            ),
            CodePurpose::Reset => format!(
                "Your password reset code is {}. If you did not request a reset, ignore this message.",
                self.code
            ),
            CodePurpose::Invite => {
                let company = self.company_name.as_deref().unwrap_or("a company");
                let mut body = format!(
                    "You have been invited to join {}. Your access code is {}.",
                    company, self.code
                );
                if let Some(link) = &self.link {
                    body.push_str(&format!(" Set your password at {}", link));
                }
                body
            }
        }
    }
}

/// Delivers notifications
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError>;
}

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// Relay host; the connection is upgraded with STARTTLS
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,

    /// Sender mailbox, e.g. `Docket <no-reply@example.com>`
    pub from: String,

    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            credentials: None,
            from: from.into(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Sends notifications through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Delivery(format!("Invalid sender {}: {}", config.from, e)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Delivery(format!("Invalid SMTP relay: {}", e)))?
            .port(config.port)
            .timeout(Some(config.timeout));
        if let Some((username, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

/// Builds the plain-text message for a notification
pub fn compose(from: &Mailbox, notification: &Notification) -> Result<Message, MailError> {
    let to = notification.to.parse::<Mailbox>().map_err(|e| {
        MailError::Delivery(format!("Invalid recipient {}: {}", notification.to, e))
    })?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(notification.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.body())
        .map_err(|e| MailError::Delivery(format!("Failed to build message: {}", e)))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError> {
        let message = compose(&self.from, notification)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;

        tracing::info!(
            to = %notification.to,
            purpose = notification.purpose.as_str(),
            "Notification sent"
        );
        Ok(())
    }
}

/// Writes notifications to the log instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError> {
        tracing::info!(
            to = %notification.to,
            purpose = notification.purpose.as_str(),
            subject = %notification.subject(),
            "Notification logged"
        );
        tracing::debug!(body = %notification.body(), "Notification body");
        Ok(())
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose deliveries always fail
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Code of the most recent notification addressed to `email`
    pub async fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|n| n.to == email)
            .map(|n| n.code.clone())
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn notify(&self, notification: &Notification) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("mailer configured to fail".to_string()));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_carry_code() {
        let register = Notification::new("a@example.com", CodePurpose::Register, "654321");
        assert_eq!(register.subject(), "Verify your account");
        assert!(register.body().contains("654321"));

        let reset = Notification::new("a@example.com", CodePurpose::Reset, "111111");
        assert_eq!(reset.subject(), "Password reset");
        assert!(reset.body().contains("111111"));
    }

    #[test]
    fn test_invite_template_names_company_and_link() {
        let invite = Notification::new("g@example.com", CodePurpose::Invite, "222222").with_invite(
            Some("Acme SL".into()),
            "http://localhost:3000/auth/reset".into(),
        );

        assert_eq!(invite.subject(), "You have been invited to join Acme SL");
        let body = invite.body();
        assert!(body.contains("222222"));
        assert!(body.contains("http://localhost:3000/auth/reset"));
    }

    #[test]
    fn test_compose_plain_text_message() {
        let from: Mailbox = "Docket <no-reply@example.com>".parse().unwrap();
        let notification = Notification::new("a@example.com", CodePurpose::Reset, "333333");

        let message = compose(&from, &notification).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: a@example.com"));
        assert!(raw.contains("Subject: Password reset"));
        assert!(raw.contains("333333"));
    }

    #[test]
    fn test_compose_rejects_bad_recipient() {
        let from: Mailbox = "no-reply@example.com".parse().unwrap();
        let notification = Notification::new("not an address", CodePurpose::Register, "444444");

        assert!(matches!(
            compose(&from, &notification),
            Err(MailError::Delivery(_))
        ));
    }

    #[test]
    fn test_smtp_mailer_rejects_bad_sender() {
        let config = SmtpConfig::new("smtp.example.com", "nobody");
        assert!(SmtpMailer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let result = LogMailer
            .notify(&Notification::new("a@example.com", CodePurpose::Register, "555555"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_memory_mailer_records() {
        let mailer = MemoryMailer::new();
        mailer
            .notify(&Notification::new("a@example.com", CodePurpose::Register, "100000"))
            .await
            .unwrap();
        mailer
            .notify(&Notification::new("a@example.com", CodePurpose::Reset, "200000"))
            .await
            .unwrap();

        assert_eq!(mailer.sent().await.len(), 2);
        assert_eq!(mailer.last_code_for("a@example.com").await.as_deref(), Some("200000"));
        assert_eq!(mailer.last_code_for("b@example.com").await, None);
    }

    #[tokio::test]
    async fn test_failing_mailer() {
        let mailer = MemoryMailer::failing();
        let result = mailer
            .notify(&Notification::new("a@example.com", CodePurpose::Register, "100000"))
            .await;
        assert!(result.is_err());
        assert!(mailer.sent().await.is_empty());
    }
}
