//! Text-generation collaborator for the consultation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, Role};

use super::session::AnswerRecord;

/// Turns a prompt plus the collected answers into advice text.
///
/// Implementations must be callable while unconfigured; they report that as
/// an error and the engine falls back to its offline recommendation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        answers: &HashMap<String, AnswerRecord>,
    ) -> Result<String, LlmError>;

    /// Forget any conversation retained from earlier calls.
    async fn clear_context(&self);

    async fn check_availability(&self) -> bool;
}

const HISTORY_WINDOW: usize = 4;

const ADVISOR_SYSTEM_PROMPT: &str = "\
You are the AI consultant of KANGWOON (강운).

About KANGWOON:
- Leads AI adoption for manufacturers and small and mid-sized businesses.
- Delivers AI solutions that raise productivity, cut costs and sharpen competitiveness.
- Focuses on lower operating costs, more valuable work for employees and data security.

Solutions:
1. AI Agent: work automation (production management, inventory, equipment monitoring)
2. RAG application: document search and knowledge management
3. Private sLLM: custom AI with on-premise data security
4. No-code chatbot builder: easy chatbot construction
5. STT/TTS: speech recognition and synthesis for smart-factory control rooms

Goal: understand the customer's business problem and needs, recommend the best fitting \
solution and lay out a concrete adoption plan.

Guidelines:
- Friendly, professional tone.
- Tailor the recommendation to the customer's industry and size.
- Give concrete ROI and expected impact.
- Explain business value rather than technology.
- Offer a free consultation when it helps.
- Answer in the language the customer's prompt is written in.";

/// Consultant persona over an [`LlmProvider`].
///
/// Plain chat turns are kept so later calls see the last few exchanges.
/// Recommendation requests (non-empty answer map) are not added to the
/// history.
pub struct AdvisorGenerator {
    llm: Option<Arc<dyn LlmProvider>>,
    history: Mutex<Vec<ChatMessage>>,
}

impl AdvisorGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm: Some(llm),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Generator without a backend; every call fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self {
            llm: None,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    fn context_block(history: &[ChatMessage]) -> String {
        if history.is_empty() {
            return "New consultation".to_string();
        }
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        history[start..]
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::User => "Customer",
                    _ => "AI",
                };
                format!("{who}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextGenerator for AdvisorGenerator {
    async fn generate(
        &self,
        prompt: &str,
        answers: &HashMap<String, AnswerRecord>,
    ) -> Result<String, LlmError> {
        let llm = self.llm.as_ref().ok_or(LlmError::NotConfigured)?;
        let is_recommendation = !answers.is_empty();

        let system = {
            let mut history = self.history.lock().await;
            if !is_recommendation {
                history.push(ChatMessage::user(prompt));
            }
            format!(
                "{ADVISOR_SYSTEM_PROMPT}\n\nConversation so far:\n{}",
                Self::context_block(&history)
            )
        };

        tracing::debug!(model = llm.model_name(), is_recommendation, "Requesting advice");
        let request = CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(prompt)])
            .with_temperature(0.7)
            .with_top_k(40)
            .with_top_p(0.95)
            .with_max_tokens(1024);

        let response = llm.complete(request).await?;
        let content = response.content.trim().to_string();
        if content.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: llm.model_name().to_string(),
                reason: "empty completion".to_string(),
            });
        }

        if !is_recommendation {
            self.history
                .lock()
                .await
                .push(ChatMessage::assistant(content.clone()));
        }
        Ok(content)
    }

    async fn clear_context(&self) {
        self.history.lock().await.clear();
    }

    async fn check_availability(&self) -> bool {
        if !self.is_configured() {
            tracing::info!("Text generation not configured, offline recommendations only");
            return false;
        }
        match self.generate("안녕하세요", &HashMap::new()).await {
            Ok(reply) => !reply.is_empty(),
            Err(e) => {
                tracing::warn!("Text generation availability check failed: {e}");
                false
            }
        }
    }
}
