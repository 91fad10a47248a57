//! Best-effort email relay for stored contact submissions.
//!
//! Message construction is pure and lives on [`ContactNotifier`]; the network hop is behind
//! [`MailTransport`] so tests can swap in recording or failing transports. Each call makes
//! exactly one delivery attempt; there is no retry and no outbound queue.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::{HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use tracing::{error, info};

use super::domain::ContactSubmission;
use crate::config::MailConfig;

const SUBJECT_PREFIX: &str = "New Contact Form Submission";
const IMPLICIT_TLS_PORT: u16 = 465;
const TEST_SUBJECT: &str = "Test Email";
const TEST_BODY: &str = "This is a test email to verify the email configuration.";

/// A fully addressed message ready to hand to a transport.
///
/// Mailboxes are already parsed, so display names are quoted by lettre when the
/// header is rendered rather than re-parsed from a formatted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: Mailbox,
    pub to: Mailbox,
    pub reply_to: Option<Mailbox>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub high_priority: bool,
}

/// What the relay said when it accepted a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub response: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("mail transport unavailable: {0}")]
    Transport(String),
}

/// Outbound hop to a mail relay.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError>;

    /// Connect and authenticate without sending anything.
    async fn verify(&self) -> Result<(), DeliveryError>;
}

/// SMTP relay transport, STARTTLS by default and implicit TLS on port 465.
#[derive(Clone)]
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        let credentials = Credentials::new(config.account.to_string(), config.secret.clone());

        let relay = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        };
        let builder =
            relay.map_err(|e| DeliveryError::Transport(format!("SMTP relay error: {e}")))?;

        let mailer = builder
            .credentials(credentials)
            .port(config.smtp_port)
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, email: OutboundEmail) -> Result<DeliveryReceipt, DeliveryError> {
        let message = build_message(&email)?;
        let response = self
            .mailer
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(format!("SMTP send failed: {e}")))?;

        let lines: Vec<&str> = response.message().collect();
        Ok(DeliveryReceipt {
            response: lines.join(" "),
        })
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DeliveryError::Transport(
                "relay refused the connection".to_string(),
            )),
            Err(e) => Err(DeliveryError::Transport(format!("SMTP connection error: {e}"))),
        }
    }
}

fn priority_header(name: &'static str, value: &str) -> HeaderValue {
    HeaderValue::new(HeaderName::new_from_ascii_str(name), value.to_string())
}

pub(crate) fn build_message(email: &OutboundEmail) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(email.from.clone())
        .to(email.to.clone())
        .subject(email.subject.clone());

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(reply_to.clone());
    }

    if email.high_priority {
        builder = builder
            .raw_header(priority_header("X-Priority", "1"))
            .raw_header(priority_header("X-MSMail-Priority", "High"))
            .raw_header(priority_header("Importance", "high"));
    }

    let body = MultiPart::alternative()
        .singlepart(SinglePart::plain(email.text.clone()))
        .singlepart(SinglePart::html(email.html.clone()));

    builder
        .multipart(body)
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

/// Addresses used for every outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailIdentity {
    pub account: Address,
    pub recipient: Address,
    pub sender_name: String,
}

impl From<&MailConfig> for MailIdentity {
    fn from(config: &MailConfig) -> Self {
        Self {
            account: config.account.clone(),
            recipient: config.recipient.clone(),
            sender_name: config.sender_name.clone(),
        }
    }
}

/// Builds operator notifications and hands them to the transport.
pub struct ContactNotifier<T> {
    transport: Arc<T>,
    identity: MailIdentity,
}

impl<T> ContactNotifier<T>
where
    T: MailTransport + 'static,
{
    pub fn new(transport: Arc<T>, identity: MailIdentity) -> Self {
        Self {
            transport,
            identity,
        }
    }

    pub fn identity(&self) -> &MailIdentity {
        &self.identity
    }

    /// Operator notification for a stored submission.
    pub fn contact_email(&self, submission: &ContactSubmission) -> OutboundEmail {
        let text = format!(
            "Name: {}\nEmail: {}\nSubject: {}\nMessage: {}",
            submission.name, submission.email, submission.subject, submission.message
        );
        let html = format!(
            "<h3>{SUBJECT_PREFIX}</h3>\
             <p><b>Name:</b> {}</p>\
             <p><b>Email:</b> {}</p>\
             <p><b>Subject:</b> {}</p>\
             <p><b>Message:</b><br/>{}</p>",
            escape_html(&submission.name),
            escape_html(&submission.email),
            escape_html(&submission.subject),
            escape_html(&submission.message),
        );

        let reply_to = submission.email.parse::<Mailbox>().ok();

        OutboundEmail {
            from: Mailbox::new(
                Some(self.identity.sender_name.clone()),
                self.identity.account.clone(),
            ),
            to: Mailbox::new(None, self.identity.recipient.clone()),
            reply_to,
            subject: format!("{SUBJECT_PREFIX}: {}", submission.subject),
            text,
            html,
            high_priority: true,
        }
    }

    /// Fixed diagnostic message sent from the account to the operator mailbox.
    pub fn test_email(&self) -> OutboundEmail {
        OutboundEmail {
            from: Mailbox::new(None, self.identity.account.clone()),
            to: Mailbox::new(None, self.identity.recipient.clone()),
            reply_to: None,
            subject: TEST_SUBJECT.to_string(),
            text: TEST_BODY.to_string(),
            html: format!("<h3>{TEST_SUBJECT}</h3><p>{TEST_BODY}</p>"),
            high_priority: false,
        }
    }

    pub async fn notify(
        &self,
        submission: &ContactSubmission,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let email = self.contact_email(submission);
        info!(
            contact_id = %submission.id,
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            "sending contact notification"
        );

        let to = email.to.clone();
        let subject = email.subject.clone();
        match self.transport.deliver(email).await {
            Ok(receipt) => {
                info!(
                    contact_id = %submission.id,
                    response = %receipt.response,
                    "contact notification sent"
                );
                Ok(receipt)
            }
            Err(err) => {
                error!(
                    contact_id = %submission.id,
                    %to,
                    %subject,
                    error = %err,
                    "contact notification failed"
                );
                Err(err)
            }
        }
    }

    pub async fn send_test(&self) -> Result<DeliveryReceipt, DeliveryError> {
        info!(to = %self.identity.recipient, "sending test email");
        match self.transport.deliver(self.test_email()).await {
            Ok(receipt) => {
                info!(response = %receipt.response, "test email sent");
                Ok(receipt)
            }
            Err(err) => {
                error!(to = %self.identity.recipient, error = %err, "test email failed");
                Err(err)
            }
        }
    }

    pub async fn verify(&self) -> Result<(), DeliveryError> {
        self.transport.verify().await
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
