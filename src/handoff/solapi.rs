//! Solapi messaging: KakaoTalk Alimtalk lead notifications with SMS
//! fallback, and LMS delivery of consultation transcripts.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Datelike, Local, SecondsFormat, Timelike, Utc, Weekday};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::Sha256;

use super::{HandoffChannel, HandoffReceipt, HandoffRequest};
use crate::error::{ChannelError, FieldError};

const CHANNEL_NAME: &str = "solapi";
const BUSINESS_OPEN_HOUR: u32 = 9;
const BUSINESS_CLOSE_HOUR: u32 = 17;

/// Solapi credentials and routing.
#[derive(Debug, Clone)]
pub struct SolapiConfig {
    pub api_key: String,
    pub api_secret: SecretString,
    pub sender_phone: String,
    pub template_id: String,
    /// Operator number that receives consultation transcripts.
    pub operator_phone: Option<String>,
    pub base_url: String,
    /// KakaoTalk channel (`pfId`).
    pub channel_id: String,
}

impl SolapiConfig {
    /// `None` unless key, secret, sender and template are all set.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("SOLAPI_API_KEY").ok()?;
        let api_secret = std::env::var("SOLAPI_API_SECRET").ok()?;
        let sender_phone = std::env::var("SOLAPI_SENDER_PHONE").ok()?;
        let template_id = std::env::var("SOLAPI_TEMPLATE_ID").ok()?;
        let operator_phone = std::env::var("SOLAPI_OPERATOR_PHONE").ok();
        let base_url = std::env::var("SOLAPI_BASE_URL")
            .unwrap_or_else(|_| "https://api.solapi.com".to_string());
        let channel_id =
            std::env::var("SOLAPI_CHANNEL_ID").unwrap_or_else(|_| "@popupworld".to_string());

        Some(Self {
            api_key,
            api_secret: SecretString::from(api_secret),
            sender_phone,
            template_id,
            operator_phone,
            base_url,
            channel_id,
        })
    }
}

// ── Lead form ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InquiryType {
    #[default]
    General,
    AiAgent,
    Rag,
    Sllm,
    Chatbot,
    Voice,
    Consulting,
}

impl InquiryType {
    pub fn label(self) -> &'static str {
        match self {
            Self::General => "일반 문의",
            Self::AiAgent => "AI Agent 솔루션",
            Self::Rag => "RAG 애플리케이션",
            Self::Sllm => "Private sLLM",
            Self::Chatbot => "노코드 챗봇",
            Self::Voice => "STT/TTS 솔루션",
            Self::Consulting => "종합 컨설팅",
        }
    }

    /// Unknown codes map to a general inquiry.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(Value::String(code.to_string())).unwrap_or_default()
    }
}

/// Consultation request submitted from the KakaoTalk form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadForm {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub inquiry: InquiryType,
    #[serde(default)]
    pub privacy_consent: bool,
}

impl LeadForm {
    pub fn validate(&self) -> Result<(), ChannelError> {
        let mut errors = Vec::new();
        if self.name.trim().chars().count() < 2 {
            errors.push(FieldError::new("name", "이름을 2글자 이상 입력해주세요."));
        }
        if !is_mobile_number(&self.phone) {
            errors.push(FieldError::new("phone", "010-0000-0000 형식으로 입력해주세요."));
        }
        if !self.privacy_consent {
            errors.push(FieldError::new(
                "privacy_consent",
                "개인정보 수집·이용에 동의해주세요.",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::Validation(errors))
        }
    }

    fn company_or_default(&self) -> &str {
        self.company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("미입력")
    }
}

static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^010-\d{4}-\d{4}$").expect("valid mobile number regex"));

fn is_mobile_number(phone: &str) -> bool {
    MOBILE_RE.is_match(phone)
}

/// Weekdays 09:00 to 17:00.
pub fn is_business_hours<T: Datelike + Timelike>(at: &T) -> bool {
    let weekday = !matches!(at.weekday(), Weekday::Sat | Weekday::Sun);
    weekday && (BUSINESS_OPEN_HOUR..BUSINESS_CLOSE_HOUR).contains(&at.hour())
}

// ── Request signing and payloads ────────────────────────────────────

type HmacSha256 = Hmac<Sha256>;

/// `Authorization` header value: HMAC-SHA256 over `date + salt`.
pub fn authorization_header(api_key: &str, api_secret: &str, date: &str, salt: &str) -> String {
    let signature = match HmacSha256::new_from_slice(api_secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(date.as_bytes());
            mac.update(salt.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        Err(_) => String::new(),
    };
    format!("HMAC-SHA256 apiKey={api_key}, date={date}, salt={salt}, signature={signature}")
}

fn new_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn alimtalk_payload(config: &SolapiConfig, form: &LeadForm, submitted_at: &str) -> Value {
    let inquiry = form.inquiry.label();
    json!({
        "message": {
            "to": form.phone.replace('-', ""),
            "from": config.sender_phone,
            "kakaoOptions": {
                "pfId": config.channel_id,
                "templateId": config.template_id,
                "variables": {
                    "#{이름}": form.name.trim(),
                    "#{연락처}": form.phone,
                    "#{회사명}": form.company_or_default(),
                    "#{문의유형}": inquiry,
                    "#{접수시간}": submitted_at,
                }
            },
            "autoTypeDetect": true,
            "fallbackConfig": {
                "type": "SMS",
                "content": format!(
                    "[강운] {}님의 무료상담 신청이 접수되었습니다. 곧 연락드리겠습니다. (문의: {})",
                    form.name.trim(),
                    inquiry
                )
            }
        }
    })
}

fn transcript_payload(config: &SolapiConfig, to: &str, request: &HandoffRequest) -> Value {
    json!({
        "message": {
            "to": to.replace('-', ""),
            "from": config.sender_phone,
            "type": "LMS",
            "subject": format!("[강운] {}", request.source),
            "text": request.message,
        }
    })
}

// ── Channel ─────────────────────────────────────────────────────────

pub struct SolapiChannel {
    config: SolapiConfig,
    client: reqwest::Client,
}

impl SolapiChannel {
    pub fn new(config: SolapiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Validate and send a consultation request as an Alimtalk message.
    pub async fn submit_lead(&self, form: &LeadForm) -> Result<HandoffReceipt, ChannelError> {
        form.validate()?;
        if !is_business_hours(&Local::now()) {
            tracing::info!("Lead received outside business hours, follow-up next business day");
        }
        let submitted_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let payload = alimtalk_payload(&self.config, form, &submitted_at);
        self.send(&payload).await
    }

    async fn send(&self, payload: &Value) -> Result<HandoffReceipt, ChannelError> {
        let date = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let auth = authorization_header(
            &self.config.api_key,
            self.config.api_secret.expose_secret(),
            &date,
            &new_salt(),
        );
        let url = format!(
            "{}/messages/v4/send",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", auth)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let reference = ["messageId", "groupId"]
            .iter()
            .find_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::to_string);
        tracing::info!(reference = ?reference, "Solapi message sent");
        Ok(HandoffReceipt {
            channel: CHANNEL_NAME.to_string(),
            reference,
        })
    }
}

#[async_trait]
impl HandoffChannel for SolapiChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn open_contact(&self, request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError> {
        let Some(operator) = self.config.operator_phone.as_deref() else {
            return Err(ChannelError::Disabled {
                name: CHANNEL_NAME.to_string(),
            });
        };
        let payload = transcript_payload(&self.config, operator, request);
        self.send(&payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn config() -> SolapiConfig {
        SolapiConfig {
            api_key: "KEY".into(),
            api_secret: SecretString::from("SECRET".to_string()),
            sender_phone: "0212345678".into(),
            template_id: "TPL".into(),
            operator_phone: None,
            base_url: "https://api.solapi.com".into(),
            channel_id: "@popupworld".into(),
        }
    }

    fn form() -> LeadForm {
        LeadForm {
            name: "김강운".into(),
            phone: "010-1234-5678".into(),
            company: None,
            inquiry: InquiryType::Rag,
            privacy_consent: true,
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(form().validate().is_ok());
    }

    #[test]
    fn invalid_form_lists_every_field() {
        let bad = LeadForm {
            name: " 김 ".into(),
            phone: "01012345678".into(),
            privacy_consent: false,
            ..form()
        };
        let Err(ChannelError::Validation(errors)) = bad.validate() else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "phone", "privacy_consent"]);
    }

    #[test]
    fn mobile_number_pattern() {
        assert!(is_mobile_number("010-1234-5678"));
        assert!(is_mobile_number("010-9999-0000"));
        assert!(!is_mobile_number("011-1234-5678"));
        assert!(!is_mobile_number("010-1234-56789"));
    }

    #[test]
    fn inquiry_codes() {
        assert_eq!(InquiryType::from_code("ai-agent"), InquiryType::AiAgent);
        assert_eq!(InquiryType::from_code("unknown"), InquiryType::General);
        assert_eq!(InquiryType::Voice.label(), "STT/TTS 솔루션");
    }

    #[test]
    fn business_hours_window() {
        // 2026-10-14 is a Wednesday, 2026-10-17 a Saturday.
        let wed = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let sat = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert!(is_business_hours(&wed.and_hms_opt(9, 0, 0).unwrap()));
        assert!(is_business_hours(&wed.and_hms_opt(16, 59, 0).unwrap()));
        assert!(!is_business_hours(&wed.and_hms_opt(17, 0, 0).unwrap()));
        assert!(!is_business_hours(&wed.and_hms_opt(8, 59, 0).unwrap()));
        assert!(!is_business_hours(&sat.and_hms_opt(10, 0, 0).unwrap()));
    }

    #[test]
    fn signature_is_hmac_of_date_and_salt() {
        let header = authorization_header("KEY", "SECRET", "2026-01-01T00:00:00.000Z", "abc");
        let mut mac = HmacSha256::new_from_slice(b"SECRET").unwrap();
        mac.update(b"2026-01-01T00:00:00.000Zabc");
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(
            header,
            format!(
                "HMAC-SHA256 apiKey=KEY, date=2026-01-01T00:00:00.000Z, salt=abc, signature={expected}"
            )
        );
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn alimtalk_payload_fills_template_and_fallback() {
        let payload = alimtalk_payload(&config(), &form(), "2026-01-01 10:00:00");
        let msg = &payload["message"];
        assert_eq!(msg["to"], "01012345678");
        assert_eq!(msg["kakaoOptions"]["pfId"], "@popupworld");
        assert_eq!(msg["kakaoOptions"]["variables"]["#{회사명}"], "미입력");
        assert_eq!(msg["kakaoOptions"]["variables"]["#{문의유형}"], "RAG 애플리케이션");
        assert_eq!(msg["fallbackConfig"]["type"], "SMS");
        assert!(
            msg["fallbackConfig"]["content"]
                .as_str()
                .unwrap()
                .contains("김강운님")
        );
    }

    #[test]
    fn salt_is_random_alphanumeric() {
        let a = new_salt();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, new_salt());
    }

    #[tokio::test]
    async fn transcript_needs_operator_phone() {
        let channel = SolapiChannel::new(config());
        let err = channel
            .open_contact(&HandoffRequest::from_consultation("t", crate::i18n::Locale::Ko))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Disabled { .. }));
    }
}
