//! Hand-off to a human consultant.
//!
//! After the consultation the transcript is forwarded through a contact
//! channel: KakaoTalk/SMS via Solapi, or email. With no channel configured
//! the visitor is sent to the public contact link instead.

pub mod email;
pub mod solapi;

pub use email::{ContactForm, EmailChannel, EmailConfig};
pub use solapi::{LeadForm, SolapiChannel, SolapiConfig};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChannelError;
use crate::i18n::Locale;

/// Public KakaoTalk channel used when no hand-off channel is available.
pub const DEFAULT_CONTACT_URL: &str = "http://pf.kakao.com/_Mxmxakn";

/// Source tag for transcripts coming from the consultation dialogue.
pub const SOURCE_AI_CONSULTATION: &str = "ai_consultation";

/// A preformatted message to pass on to a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffRequest {
    pub message: String,
    pub source: String,
    pub locale: Locale,
}

impl HandoffRequest {
    pub fn from_consultation(message: impl Into<String>, locale: Locale) -> Self {
        Self {
            message: message.into(),
            source: SOURCE_AI_CONSULTATION.to_string(),
            locale,
        }
    }
}

/// Acknowledgement from a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffReceipt {
    pub channel: String,
    /// Provider-side id, when the provider returns one.
    pub reference: Option<String>,
}

#[async_trait]
pub trait HandoffChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn open_contact(&self, request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError>;
}

/// Tries each channel in order until one accepts the request.
pub struct HandoffRouter {
    channels: Vec<Arc<dyn HandoffChannel>>,
}

impl HandoffRouter {
    pub fn new(channels: Vec<Arc<dyn HandoffChannel>>) -> Self {
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl HandoffChannel for HandoffRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn open_contact(&self, request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError> {
        let mut last_error = ChannelError::Disabled {
            name: self.name().to_string(),
        };
        for channel in &self.channels {
            match channel.open_contact(request).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    tracing::warn!(channel = channel.name(), "Hand-off failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        ok: bool,
    }

    #[async_trait]
    impl HandoffChannel for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn open_contact(&self, _request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError> {
            if self.ok {
                Ok(HandoffReceipt {
                    channel: self.name.to_string(),
                    reference: None,
                })
            } else {
                Err(ChannelError::SendFailed {
                    name: self.name.to_string(),
                    reason: "down".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn router_uses_first_working_channel() {
        let router = HandoffRouter::new(vec![
            Arc::new(Fixed { name: "solapi", ok: false }),
            Arc::new(Fixed { name: "email", ok: true }),
        ]);
        let receipt = router
            .open_contact(&HandoffRequest::from_consultation("hi", Locale::Ko))
            .await
            .unwrap();
        assert_eq!(receipt.channel, "email");
    }

    #[tokio::test]
    async fn empty_router_is_disabled() {
        let router = HandoffRouter::new(Vec::new());
        assert!(router.is_empty());
        let err = router
            .open_contact(&HandoffRequest::from_consultation("hi", Locale::Ko))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Disabled { .. }));
    }

    #[test]
    fn consultation_request_is_tagged() {
        let req = HandoffRequest::from_consultation("transcript", Locale::En);
        assert_eq!(req.source, "ai_consultation");
    }
}
