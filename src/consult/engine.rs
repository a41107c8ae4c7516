//! The dialogue engine: drives the fixed question sequence and produces the
//! final recommendation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DialogueError;
use crate::i18n::{ActiveLocale, Localizer};

use super::generator::TextGenerator;
use super::prompts::{
    customer_summary, fallback_recommendation, handoff_transcript, recommendation_prompt,
};
use super::question::{QuestionSpec, ResolvedQuestion};
use super::session::{AnswerRecord, Session};

pub const DEFAULT_RECOMMENDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// What the dialogue is currently asking, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrentQuestion {
    Question(ResolvedQuestion),
    Complete,
}

/// Outcome of an accepted answer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Turn {
    NextQuestion {
        question: ResolvedQuestion,
        progress: u8,
    },
    Recommendation(Recommendation),
}

/// Final advice for a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub solution_narrative: String,
    pub source_answers: HashMap<String, AnswerRecord>,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
    /// Set when the text generator failed and the offline template was used.
    pub is_fallback: bool,
}

/// Owns one [`Session`] and walks it through the configured questions.
pub struct DialogueEngine {
    questions: Vec<QuestionSpec>,
    session: Session,
    localizer: Arc<dyn Localizer>,
    locale: ActiveLocale,
    generator: Arc<dyn TextGenerator>,
    recommendation_timeout: Duration,
    recommendation: Option<Recommendation>,
}

impl DialogueEngine {
    pub fn new(
        questions: Vec<QuestionSpec>,
        localizer: Arc<dyn Localizer>,
        locale: ActiveLocale,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            questions,
            session: Session::new(),
            localizer,
            locale,
            generator,
            recommendation_timeout: DEFAULT_RECOMMENDATION_TIMEOUT,
            recommendation: None,
        }
    }

    pub fn with_recommendation_timeout(mut self, timeout: Duration) -> Self {
        self.recommendation_timeout = timeout;
        self
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn questions(&self) -> &[QuestionSpec] {
        &self.questions
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn locale(&self) -> &ActiveLocale {
        &self.locale
    }

    pub fn localizer(&self) -> &Arc<dyn Localizer> {
        &self.localizer
    }

    /// Recommendation of the completed session, if any.
    pub fn recommendation(&self) -> Option<&Recommendation> {
        self.recommendation.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.session.current_step() >= self.questions.len()
    }

    /// Begin a fresh session and return its first question.
    pub fn start(&mut self) -> Result<ResolvedQuestion, DialogueError> {
        if self.questions.is_empty() {
            return Err(DialogueError::ConfigurationMissing);
        }
        self.session = Session::new();
        self.recommendation = None;
        tracing::info!(session = %self.session.id, "Consultation started");
        match self.current_question() {
            CurrentQuestion::Question(q) => Ok(q),
            CurrentQuestion::Complete => Err(DialogueError::ConfigurationMissing),
        }
    }

    /// Start over and drop whatever the text generator remembers.
    pub async fn restart(&mut self) -> Result<ResolvedQuestion, DialogueError> {
        self.generator.clear_context().await;
        self.start()
    }

    pub fn current_question(&self) -> CurrentQuestion {
        match self.questions.get(self.session.current_step()) {
            Some(spec) => {
                CurrentQuestion::Question(spec.resolve(self.localizer.as_ref(), self.locale.get()))
            }
            None => CurrentQuestion::Complete,
        }
    }

    /// Percentage of questions answered, 0..=100.
    pub fn progress(&self) -> u8 {
        percent(self.session.current_step(), self.questions.len())
    }

    /// Record `raw_answer` for the current question and move on.
    ///
    /// Empty answers are accepted as-is. The last answer triggers the
    /// recommendation, exactly once per session.
    pub async fn submit_answer(&mut self, raw_answer: &str) -> Result<Turn, DialogueError> {
        if self.questions.is_empty() {
            return Err(DialogueError::ConfigurationMissing);
        }
        let question = match self.current_question() {
            CurrentQuestion::Question(q) => q,
            CurrentQuestion::Complete => return Err(DialogueError::SessionComplete),
        };

        self.session
            .advance(AnswerRecord::new(question.id, question.prompt, raw_answer));
        tracing::debug!(
            session = %self.session.id,
            step = self.session.current_step(),
            "Answer recorded"
        );

        match self.current_question() {
            CurrentQuestion::Question(next) => Ok(Turn::NextQuestion {
                question: next,
                progress: self.progress(),
            }),
            CurrentQuestion::Complete => {
                let recommendation = self.generate_recommendation().await;
                self.recommendation = Some(recommendation.clone());
                Ok(Turn::Recommendation(recommendation))
            }
        }
    }

    /// Ask the text generator for advice, falling back to the offline
    /// template on any error or timeout. Single attempt.
    pub async fn generate_recommendation(&self) -> Recommendation {
        let locale = self.locale.get();
        let localizer = self.localizer.as_ref();
        let answers = self.session.answers();

        let summary = customer_summary(localizer, locale, answers);
        let prompt = recommendation_prompt(localizer, locale, &summary);
        tracing::debug!(%prompt, "Recommendation prompt");

        let outcome = tokio::time::timeout(
            self.recommendation_timeout,
            self.generator.generate(&prompt, answers),
        )
        .await;

        let (solution_narrative, is_fallback) = match outcome {
            Ok(Ok(text)) => (text, false),
            Ok(Err(e)) => {
                tracing::warn!("Text generation failed, using offline recommendation: {e}");
                (fallback_recommendation(localizer, locale, answers), true)
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.recommendation_timeout,
                    "Text generation timed out, using offline recommendation"
                );
                (fallback_recommendation(localizer, locale, answers), true)
            }
        };

        tracing::info!(session = %self.session.id, is_fallback, "Recommendation generated");
        Recommendation {
            solution_narrative,
            source_answers: answers.clone(),
            summary,
            generated_at: Utc::now(),
            is_fallback,
        }
    }

    pub async fn check_generator(&self) -> bool {
        self.generator.check_availability().await
    }

    /// Transcript of the session for a human consultant.
    pub fn handoff_message(&self) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        handoff_transcript(
            self.localizer.as_ref(),
            self.locale.get(),
            &self.questions,
            self.session.answers(),
            &timestamp,
        )
    }
}

fn percent(step: usize, count: usize) -> u8 {
    if count == 0 {
        return 0;
    }
    let pct = (step as f64 / count as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
