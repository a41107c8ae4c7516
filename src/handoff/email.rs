//! Email hand-off: the website contact form and consultation transcripts,
//! delivered to the sales inbox over SMTP.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Local;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{HandoffChannel, HandoffReceipt, HandoffRequest};
use crate::error::{ChannelError, FieldError};

const CHANNEL_NAME: &str = "email";

// ── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    /// Inbox that receives contact requests and transcripts.
    pub sales_address: String,
}

impl EmailConfig {
    /// Returns `None` if `EMAIL_SMTP_HOST` is not set (channel disabled).
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("EMAIL_SMTP_HOST").ok()?;

        let smtp_port: u16 = std::env::var("EMAIL_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("EMAIL_USERNAME").unwrap_or_default();
        let password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());
        let sales_address =
            std::env::var("EMAIL_SALES_ADDRESS").unwrap_or_else(|_| from_address.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
            sales_address,
        })
    }
}

// ── Contact form ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub company: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(default)]
    pub solution_interest: Option<String>,
    pub message: String,
    #[serde(default)]
    pub privacy_consent: bool,
}

impl ContactForm {
    pub fn validate(&self) -> Result<(), ChannelError> {
        let mut errors = Vec::new();
        let required = [
            ("company", &self.company),
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("message", &self.message),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "이 필드는 필수입니다."));
            }
        }
        if !self.email.trim().is_empty() && !is_email(self.email.trim()) {
            errors.push(FieldError::new("email", "올바른 이메일 주소를 입력해주세요."));
        }
        if !self.privacy_consent {
            errors.push(FieldError::new("privacy_consent", "개인정보 수집에 동의해주세요."));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::Validation(errors))
        }
    }

    /// Subject and body of the notification mail.
    pub fn render(&self, submitted_at: &str) -> (String, String) {
        let interest = self
            .solution_interest
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("선택하지 않음");
        let subject = format!("[강운] 상담 문의: {} ({})", self.company.trim(), self.name.trim());
        let body = format!(
            "회사명: {}\n담당자: {}\n연락처: {}\n이메일: {}\n관심 솔루션: {}\n접수 시간: {}\n\n{}",
            self.company.trim(),
            self.name.trim(),
            self.phone.trim(),
            self.email.trim(),
            interest,
            submitted_at,
            self.message.trim()
        );
        (subject, body)
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

// ── Channel ─────────────────────────────────────────────────────────

pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Validate the form and mail it to the sales inbox.
    pub async fn submit_contact(&self, form: &ContactForm) -> Result<HandoffReceipt, ChannelError> {
        form.validate()?;
        let submitted_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let (subject, body) = form.render(&submitted_at);
        self.deliver(subject, body).await
    }

    async fn deliver(&self, subject: String, body: String) -> Result<HandoffReceipt, ChannelError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || send_email(&config, &subject, &body))
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("SMTP task failed: {e}"),
            })??;
        Ok(HandoffReceipt {
            channel: CHANNEL_NAME.to_string(),
            reference: None,
        })
    }
}

/// Blocking SMTP send.
fn send_email(config: &EmailConfig, subject: &str, body: &str) -> Result<(), ChannelError> {
    let email = build_message(config, subject, body)?;
    let creds = Credentials::new(config.username.clone(), config.password.clone());

    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("SMTP relay error: {e}"),
        })?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    transport.send(&email).map_err(|e| ChannelError::SendFailed {
        name: CHANNEL_NAME.into(),
        reason: format!("SMTP send failed: {e}"),
    })?;

    tracing::info!("Email sent to {}", config.sales_address);
    Ok(())
}

fn build_message(config: &EmailConfig, subject: &str, body: &str) -> Result<Message, ChannelError> {
    Message::builder()
        .from(config.from_address.parse().map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("Invalid from address: {e}"),
        })?)
        .to(config.sales_address.parse().map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("Invalid to address: {e}"),
        })?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: format!("Failed to build email: {e}"),
        })
}

#[async_trait]
impl HandoffChannel for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn open_contact(&self, request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError> {
        let subject = format!("[강운] {} ({})", request.source, request.locale);
        self.deliver(subject, request.message.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.example.com".into(),
            smtp_port: 587,
            username: "bot@example.com".into(),
            password: "pw".into(),
            from_address: "bot@example.com".into(),
            sales_address: "sales@example.com".into(),
        }
    }

    fn form() -> ContactForm {
        ContactForm {
            company: "강운".into(),
            name: "홍길동".into(),
            phone: "010-1111-2222".into(),
            email: "hong@example.com".into(),
            solution_interest: None,
            message: "RAG 도입 문의".into(),
            privacy_consent: true,
        }
    }

    #[test]
    fn complete_form_is_valid() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn missing_fields_and_bad_email() {
        let bad = ContactForm {
            company: "  ".into(),
            email: "not-an-email".into(),
            privacy_consent: false,
            ..form()
        };
        let Err(ChannelError::Validation(errors)) = bad.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["company", "email", "privacy_consent"]);
        assert_eq!(errors[1].message, "올바른 이메일 주소를 입력해주세요.");
    }

    #[test]
    fn email_pattern() {
        assert!(is_email("hong@example.com"));
        assert!(is_email("sales@kangwoon.co.kr"));
        assert!(!is_email("hong@example"));
        assert!(!is_email("hong @example.com"));
    }

    #[test]
    fn render_defaults_solution_interest() {
        let (subject, body) = form().render("2026-01-01 09:00:00");
        assert!(subject.contains("강운") && subject.contains("홍길동"));
        assert!(body.contains("관심 솔루션: 선택하지 않음"));
        assert!(body.contains("접수 시간: 2026-01-01 09:00:00"));
        assert!(body.ends_with("RAG 도입 문의"));
    }

    #[test]
    fn message_builds_with_configured_addresses() {
        assert!(build_message(&config(), "s", "b").is_ok());

        let broken = EmailConfig {
            sales_address: "nope".into(),
            ..config()
        };
        assert!(matches!(
            build_message(&broken, "s", "b"),
            Err(ChannelError::SendFailed { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_smtp() {
        let channel = EmailChannel::new(config());
        let err = channel
            .submit_contact(&ContactForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Validation(_)));
    }
}
