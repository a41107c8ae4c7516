//! UI controller for the consultation widget.
//!
//! Owns the [`DialogueEngine`] and translates user events into engine calls
//! and view updates. All rendering goes through [`DialogueView`], so the same
//! controller drives the terminal REPL and the tests.

use std::sync::Arc;

use serde::Serialize;

use crate::error::DialogueError;
use crate::handoff::{HandoffChannel, HandoffReceipt, HandoffRequest};
use crate::i18n::MessageKey;
use crate::i18n::keys::UiText;

use super::engine::{DialogueEngine, Recommendation, Turn};
use super::question::ResolvedQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiState {
    Closed,
    AwaitingChoice,
    AwaitingFreeText,
    Loading,
    ShowingRecommendation,
    Error,
}

impl UiState {
    fn accepts_answers(self) -> bool {
        matches!(self, Self::AwaitingChoice | Self::AwaitingFreeText)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    fn bot(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Bot,
            text: text.into(),
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }
}

/// Input coming from the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Open,
    Close,
    Escape,
    OutsideClick,
    SelectOption(String),
    SubmitText(String),
    Retry,
    Handoff,
    Restart,
}

/// Rendering side of the widget.
pub trait DialogueView {
    fn append_message(&mut self, entry: &TranscriptEntry);
    fn show_options(&mut self, options: &[String]);
    fn show_text_input(&mut self);
    fn set_loading(&mut self, loading: bool);
    fn set_progress(&mut self, percent: u8);
    fn show_recommendation(&mut self, recommendation: &Recommendation);
    fn hide_recommendation(&mut self);
    /// Drop the rendered transcript.
    fn clear(&mut self);
    fn set_visible(&mut self, visible: bool);
    fn open_link(&mut self, url: &str);
}

/// Recovery choice offered in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorAction {
    Retry,
    Handoff,
}

/// Work to redo when the visitor presses retry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Start,
    Answer(String),
}

pub struct DialogueController<V: DialogueView> {
    engine: DialogueEngine,
    view: V,
    handoff: Option<Arc<dyn HandoffChannel>>,
    contact_url: String,
    state: UiState,
    /// State to return to when a closed widget is reopened.
    resume_state: UiState,
    active: bool,
    transcript: Vec<TranscriptEntry>,
    pending: Option<Pending>,
    /// Error options as rendered, so a later language switch keeps them valid.
    error_actions: Vec<(String, ErrorAction)>,
}

impl<V: DialogueView> DialogueController<V> {
    pub fn new(engine: DialogueEngine, view: V, contact_url: impl Into<String>) -> Self {
        Self {
            engine,
            view,
            handoff: None,
            contact_url: contact_url.into(),
            state: UiState::Closed,
            resume_state: UiState::Closed,
            active: false,
            transcript: Vec::new(),
            pending: None,
            error_actions: Vec::new(),
        }
    }

    pub fn with_handoff(mut self, channel: Arc<dyn HandoffChannel>) -> Self {
        self.handoff = Some(channel);
        self
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn engine(&self) -> &DialogueEngine {
        &self.engine
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub async fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Open => self.open().await,
            UiEvent::Close => self.close(),
            UiEvent::Escape | UiEvent::OutsideClick => {
                if self.state != UiState::Closed {
                    self.close();
                }
            }
            UiEvent::SelectOption(option) => self.select_option(&option).await,
            UiEvent::SubmitText(text) => self.submit_text(&text).await,
            UiEvent::Retry => self.retry().await,
            UiEvent::Handoff => {
                self.handoff().await;
            }
            UiEvent::Restart => self.restart().await,
        }
    }

    /// Show the widget; the first open starts the consultation.
    pub async fn open(&mut self) {
        if self.state != UiState::Closed {
            return;
        }
        self.view.set_visible(true);
        if self.active {
            self.state = self.resume_state;
            return;
        }

        self.active = true;
        let available = self.engine.check_generator().await;
        tracing::info!(available, "Text generation availability");
        self.begin();
    }

    /// Hide the widget, keeping the session.
    pub fn close(&mut self) {
        if self.state == UiState::Closed {
            return;
        }
        self.resume_state = self.state;
        self.state = UiState::Closed;
        self.view.set_visible(false);
    }

    pub async fn select_option(&mut self, option: &str) {
        match self.state {
            UiState::AwaitingChoice => self.answer(option.to_string()).await,
            UiState::Error => {
                let action = self
                    .error_actions
                    .iter()
                    .find(|(label, _)| label == option)
                    .map(|(_, action)| *action);
                match action {
                    Some(ErrorAction::Retry) => self.retry().await,
                    Some(ErrorAction::Handoff) => {
                        self.handoff().await;
                    }
                    None => tracing::debug!(option, "Unknown error option"),
                }
            }
            _ => tracing::debug!(state = ?self.state, "Option ignored"),
        }
    }

    pub async fn submit_text(&mut self, text: &str) {
        let text = text.trim();
        if self.state != UiState::AwaitingFreeText || text.is_empty() {
            tracing::debug!(state = ?self.state, "Text input ignored");
            return;
        }
        self.answer(text.to_string()).await;
    }

    /// Redo the step that failed.
    pub async fn retry(&mut self) {
        if self.state != UiState::Error {
            return;
        }
        match self.pending.clone() {
            Some(Pending::Answer(raw)) => self.run_answer(raw).await,
            Some(Pending::Start) | None => self.restart().await,
        }
    }

    pub async fn restart(&mut self) {
        if self.state == UiState::Loading {
            return;
        }
        if self.state == UiState::Closed {
            self.view.set_visible(true);
        }
        self.transcript.clear();
        self.view.clear();
        self.view.hide_recommendation();
        self.view.set_progress(0);
        self.active = true;
        self.pending = Some(Pending::Start);

        match self.engine.restart().await {
            Ok(question) => self.present_question(question),
            Err(e) => self.fail(UiText::StartFailed, e),
        }
    }

    /// Pass the transcript to a human and close the widget.
    ///
    /// Without a working channel the contact link is opened instead.
    pub async fn handoff(&mut self) -> Option<HandoffReceipt> {
        if !matches!(self.state, UiState::ShowingRecommendation | UiState::Error) {
            return None;
        }
        let request =
            HandoffRequest::from_consultation(self.engine.handoff_message(), self.engine.locale().get());
        self.close();

        if let Some(channel) = &self.handoff {
            match channel.open_contact(&request).await {
                Ok(receipt) => {
                    tracing::info!(channel = %receipt.channel, "Consultation handed off");
                    return Some(receipt);
                }
                Err(e) => tracing::warn!("Hand-off failed, opening contact link: {e}"),
            }
        }
        self.view.open_link(&self.contact_url);
        None
    }

    // ── Internals ───────────────────────────────────────────────────

    fn begin(&mut self) {
        self.pending = Some(Pending::Start);
        match self.engine.start() {
            Ok(question) => self.present_question(question),
            Err(e) => self.fail(UiText::StartFailed, e),
        }
    }

    async fn answer(&mut self, raw: String) {
        if !self.state.accepts_answers() {
            return;
        }
        self.push(TranscriptEntry::user(raw.clone()));
        self.pending = Some(Pending::Answer(raw.clone()));
        self.run_answer(raw).await;
    }

    async fn run_answer(&mut self, raw: String) {
        self.state = UiState::Loading;
        self.view.set_loading(true);
        let outcome = self.engine.submit_answer(&raw).await;
        self.view.set_loading(false);

        match outcome {
            Ok(Turn::NextQuestion { question, progress }) => {
                self.present_question(question);
                self.view.set_progress(progress);
            }
            Ok(Turn::Recommendation(recommendation)) => {
                self.pending = None;
                self.view.set_progress(100);
                self.push(TranscriptEntry::bot(recommendation.solution_narrative.clone()));
                self.view.show_recommendation(&recommendation);
                self.state = UiState::ShowingRecommendation;
            }
            Err(e) => self.fail(UiText::AnswerFailed, e),
        }
    }

    fn present_question(&mut self, question: ResolvedQuestion) {
        self.pending = None;
        self.push(TranscriptEntry::bot(question.prompt));
        self.view.set_progress(self.engine.progress());
        if question.kind.has_options() {
            self.view.show_options(&question.options);
            self.state = UiState::AwaitingChoice;
        } else {
            self.view.show_text_input();
            self.state = UiState::AwaitingFreeText;
        }
    }

    fn fail(&mut self, notice: UiText, error: DialogueError) {
        tracing::warn!("Consultation step failed: {error}");
        let notice = match error {
            DialogueError::ConfigurationMissing => UiText::QuestionUnavailable,
            _ => notice,
        };
        self.push(TranscriptEntry::bot(self.ui_text(notice)));
        self.error_actions = vec![
            (self.ui_text(UiText::Retry), ErrorAction::Retry),
            (self.ui_text(UiText::Handoff), ErrorAction::Handoff),
        ];
        let options: Vec<String> = self.error_actions.iter().map(|(l, _)| l.clone()).collect();
        self.view.show_options(&options);
        self.state = UiState::Error;
    }

    fn push(&mut self, entry: TranscriptEntry) {
        self.view.append_message(&entry);
        self.transcript.push(entry);
    }

    fn ui_text(&self, text: UiText) -> String {
        self.engine
            .localizer()
            .text(self.engine.locale().get(), MessageKey::Ui(text))
    }
}
