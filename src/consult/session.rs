//! One visitor's run through the consultation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::question::Topic;

/// A single captured response. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    /// Prompt text exactly as it was shown when the answer was given.
    pub prompt: String,
    pub raw_answer: String,
    pub captured_at: DateTime<Utc>,
}

impl AnswerRecord {
    pub fn new(
        question_id: impl Into<String>,
        prompt: impl Into<String>,
        raw_answer: impl Into<String>,
    ) -> Self {
        Self {
            question_id: question_id.into(),
            prompt: prompt.into(),
            raw_answer: raw_answer.into(),
            captured_at: Utc::now(),
        }
    }
}

/// Step counter plus collected answers.
///
/// `current_step` only moves through [`Session::advance`], one step per
/// accepted answer.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    current_step: usize,
    answers: HashMap<String, AnswerRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            current_step: 0,
            answers: HashMap::new(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn answers(&self) -> &HashMap<String, AnswerRecord> {
        &self.answers
    }

    pub fn answer_for(&self, topic: Topic) -> Option<&str> {
        self.answers
            .get(topic.id())
            .map(|record| record.raw_answer.as_str())
    }

    /// Store `record` and move to the next step.
    pub(crate) fn advance(&mut self, record: AnswerRecord) {
        self.answers.insert(record.question_id.clone(), record);
        self.current_step += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_records_and_steps() {
        let mut session = Session::new();
        session.advance(AnswerRecord::new("business_problem", "Q?", "인력 부족"));
        assert_eq!(session.current_step(), 1);
        assert_eq!(session.answer_for(Topic::BusinessProblem), Some("인력 부족"));
        assert_eq!(session.answer_for(Topic::Timeline), None);
    }

    #[test]
    fn new_sessions_get_distinct_ids() {
        assert_ne!(Session::new().id, Session::new().id);
    }
}
