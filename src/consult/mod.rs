//! The lead-qualification consultation: question sequence, session state,
//! recommendation and the widget controller on top.

pub mod controller;
pub mod engine;
pub mod generator;
pub mod prompts;
pub mod question;
pub mod session;

pub use controller::{DialogueController, DialogueView, Speaker, TranscriptEntry, UiEvent, UiState};
pub use engine::{CurrentQuestion, DialogueEngine, Recommendation, Turn};
pub use generator::{AdvisorGenerator, TextGenerator};
pub use question::{QuestionKind, QuestionSpec, ResolvedQuestion, Topic, default_questions};
pub use session::{AnswerRecord, Session};
