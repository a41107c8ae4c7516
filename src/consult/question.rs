//! The fixed question sequence of the consultation.

use serde::{Deserialize, Serialize};

use crate::i18n::{Locale, Localizer, MessageKey};

/// What a question is about. Doubles as the question id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Greeting,
    BusinessProblem,
    CompanySize,
    BudgetRange,
    Timeline,
    AutomationInterest,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Greeting,
        Topic::BusinessProblem,
        Topic::CompanySize,
        Topic::BudgetRange,
        Topic::Timeline,
        Topic::AutomationInterest,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::BusinessProblem => "business_problem",
            Self::CompanySize => "company_size",
            Self::BudgetRange => "budget_range",
            Self::Timeline => "timeline",
            Self::AutomationInterest => "automation_interest",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Confirm,
    MultipleChoice,
    FreeText,
}

impl QuestionKind {
    /// Whether the user answers by picking one of the options.
    pub fn has_options(self) -> bool {
        !matches!(self, Self::FreeText)
    }
}

/// Unresolved question: what to ask and how the user answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSpec {
    pub topic: Topic,
    pub kind: QuestionKind,
}

impl QuestionSpec {
    pub const fn new(topic: Topic, kind: QuestionKind) -> Self {
        Self { topic, kind }
    }

    pub fn id(&self) -> &'static str {
        self.topic.id()
    }

    /// Resolve prompt and options for `locale`.
    pub fn resolve(&self, localizer: &dyn Localizer, locale: Locale) -> ResolvedQuestion {
        let options = if self.kind.has_options() {
            localizer.list(locale, MessageKey::QuestionOptions(self.topic))
        } else {
            Vec::new()
        };
        ResolvedQuestion {
            id: self.id().to_string(),
            kind: self.kind,
            prompt: localizer.text(locale, MessageKey::QuestionText(self.topic)),
            options,
        }
    }
}

/// The consultation as published on the site.
pub fn default_questions() -> Vec<QuestionSpec> {
    vec![
        QuestionSpec::new(Topic::Greeting, QuestionKind::Confirm),
        QuestionSpec::new(Topic::BusinessProblem, QuestionKind::MultipleChoice),
        QuestionSpec::new(Topic::CompanySize, QuestionKind::MultipleChoice),
        QuestionSpec::new(Topic::BudgetRange, QuestionKind::MultipleChoice),
        QuestionSpec::new(Topic::Timeline, QuestionKind::MultipleChoice),
        QuestionSpec::new(Topic::AutomationInterest, QuestionKind::MultipleChoice),
    ]
}

/// A question with its text in a specific locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuestion {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;

    #[test]
    fn default_sequence_order() {
        let ids: Vec<_> = default_questions().iter().map(|q| q.id()).collect();
        assert_eq!(
            ids,
            vec![
                "greeting",
                "business_problem",
                "company_size",
                "budget_range",
                "timeline",
                "automation_interest"
            ]
        );
        assert_eq!(default_questions()[0].kind, QuestionKind::Confirm);
    }

    #[test]
    fn resolve_fills_prompt_and_options() {
        let catalog = Catalog::builtin().unwrap();
        let q = QuestionSpec::new(Topic::BusinessProblem, QuestionKind::MultipleChoice)
            .resolve(&catalog, Locale::Ko);
        assert_eq!(q.id, "business_problem");
        assert!(q.options.iter().any(|o| o == "인력 부족"));
    }

    #[test]
    fn free_text_has_no_options() {
        let catalog = Catalog::builtin().unwrap();
        let q = QuestionSpec::new(Topic::BusinessProblem, QuestionKind::FreeText)
            .resolve(&catalog, Locale::En);
        assert!(q.options.is_empty());
        assert!(!q.prompt.is_empty());
    }

    #[test]
    fn topic_display_matches_serde() {
        for topic in Topic::ALL {
            let json = serde_json::to_string(&topic).unwrap();
            assert_eq!(format!("\"{topic}\""), json);
        }
    }
}
