//! Typed message keys.
//!
//! Every string the consultation flow shows comes from a dictionary entry.
//! Call sites name entries through [`MessageKey`]; only this module knows the
//! dotted path each key lives under in the locale JSON files.

use crate::consult::question::Topic;

/// One of the five solutions the consultancy sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Solution {
    AiAgent,
    RagApplication,
    PrivateSllm,
    NocodeChatbot,
    SttTts,
}

impl Solution {
    pub const ALL: [Solution; 5] = [
        Solution::AiAgent,
        Solution::RagApplication,
        Solution::PrivateSllm,
        Solution::NocodeChatbot,
        Solution::SttTts,
    ];

    fn slug(self) -> &'static str {
        match self {
            Self::AiAgent => "ai_agent",
            Self::RagApplication => "rag_application",
            Self::PrivateSllm => "private_sllm",
            Self::NocodeChatbot => "nocode_chatbot",
            Self::SttTts => "stt_tts",
        }
    }
}

/// Row labels of the customer summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    MainProblem,
    CompanySize,
    BudgetRange,
    Timeline,
    InterestArea,
    Unspecified,
}

/// Fragments used to assemble the recommendation prompt and the offline
/// recommendation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPart {
    Intro,
    RecommendationHeader,
    CustomerSummary,
    SolutionOptions,
    ResponseFormat,
    FormatSolution,
    FormatReason,
    FormatEffect,
    FormatRoi,
    FormatImplementation,
    FormatNextStep,
    NextStepText,
    ReasonTemplate,
    EffectTime,
    EffectCost,
    EffectAccuracy,
    RoiShort,
    RoiMedium,
    RoiLong,
    Step1,
    Step2,
    Step3,
    Step4,
    DetailedProposal,
}

/// Lines of the hand-off transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffPart {
    ConsultationComplete,
    AnswerPrefix,
    Timestamp,
    ExpertFollowup,
}

/// Controller chrome: error notices and recovery buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiText {
    StartFailed,
    AnswerFailed,
    QuestionUnavailable,
    Retry,
    Handoff,
}

/// SEO fields under the `meta` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Title,
    Description,
    Keywords,
    Robots,
    Author,
    OgTitle,
    OgDescription,
    OgImage,
    TwitterTitle,
    TwitterDescription,
}

/// A dictionary entry, resolved to a dotted path by [`MessageKey::path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    QuestionText(Topic),
    QuestionOptions(Topic),
    Label(Label),
    Prompt(PromptPart),
    Solution(Solution),
    Handoff(HandoffPart),
    Ui(UiText),
    Meta(MetaField),
}

impl MessageKey {
    /// Dotted path of this entry inside a locale dictionary.
    pub fn path(self) -> String {
        match self {
            Self::QuestionText(topic) => {
                format!("ai_consultant.questions.{}.text", topic.id())
            }
            Self::QuestionOptions(topic) => {
                format!("ai_consultant.questions.{}.options", topic.id())
            }
            Self::Label(label) => format!("ai_consultant.labels.{}", label_slug(label)),
            Self::Prompt(part) => format!("ai_consultant.prompts.{}", prompt_slug(part)),
            Self::Solution(solution) => format!("ai_consultant.solutions.{}", solution.slug()),
            Self::Handoff(part) => format!("ai_consultant.messages.{}", handoff_slug(part)),
            Self::Ui(text) => format!("ai_consultant.ui.{}", ui_slug(text)),
            Self::Meta(field) => format!("meta.{}", meta_slug(field)),
        }
    }
}

fn label_slug(label: Label) -> &'static str {
    match label {
        Label::MainProblem => "main_problem",
        Label::CompanySize => "company_size",
        Label::BudgetRange => "budget_range",
        Label::Timeline => "timeline",
        Label::InterestArea => "interest_area",
        Label::Unspecified => "unspecified",
    }
}

fn prompt_slug(part: PromptPart) -> &'static str {
    match part {
        PromptPart::Intro => "intro",
        PromptPart::RecommendationHeader => "recommendation_header",
        PromptPart::CustomerSummary => "customer_summary",
        PromptPart::SolutionOptions => "solution_options",
        PromptPart::ResponseFormat => "response_format",
        PromptPart::FormatSolution => "format_solution",
        PromptPart::FormatReason => "format_reason",
        PromptPart::FormatEffect => "format_effect",
        PromptPart::FormatRoi => "format_roi",
        PromptPart::FormatImplementation => "format_implementation",
        PromptPart::FormatNextStep => "format_next_step",
        PromptPart::NextStepText => "next_step_text",
        PromptPart::ReasonTemplate => "reason_template",
        PromptPart::EffectTime => "effect_time",
        PromptPart::EffectCost => "effect_cost",
        PromptPart::EffectAccuracy => "effect_accuracy",
        PromptPart::RoiShort => "roi_short",
        PromptPart::RoiMedium => "roi_medium",
        PromptPart::RoiLong => "roi_long",
        PromptPart::Step1 => "step1",
        PromptPart::Step2 => "step2",
        PromptPart::Step3 => "step3",
        PromptPart::Step4 => "step4",
        PromptPart::DetailedProposal => "detailed_proposal",
    }
}

fn handoff_slug(part: HandoffPart) -> &'static str {
    match part {
        HandoffPart::ConsultationComplete => "consultation_complete",
        HandoffPart::AnswerPrefix => "answer_prefix",
        HandoffPart::Timestamp => "timestamp",
        HandoffPart::ExpertFollowup => "expert_followup",
    }
}

fn ui_slug(text: UiText) -> &'static str {
    match text {
        UiText::StartFailed => "start_failed",
        UiText::AnswerFailed => "answer_failed",
        UiText::QuestionUnavailable => "question_unavailable",
        UiText::Retry => "retry",
        UiText::Handoff => "handoff",
    }
}

fn meta_slug(field: MetaField) -> &'static str {
    match field {
        MetaField::Title => "title",
        MetaField::Description => "description",
        MetaField::Keywords => "keywords",
        MetaField::Robots => "robots",
        MetaField::Author => "author",
        MetaField::OgTitle => "ogTitle",
        MetaField::OgDescription => "ogDescription",
        MetaField::OgImage => "ogImage",
        MetaField::TwitterTitle => "twitterTitle",
        MetaField::TwitterDescription => "twitterDescription",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_paths_use_topic_id() {
        assert_eq!(
            MessageKey::QuestionText(Topic::BusinessProblem).path(),
            "ai_consultant.questions.business_problem.text"
        );
        assert_eq!(
            MessageKey::QuestionOptions(Topic::Greeting).path(),
            "ai_consultant.questions.greeting.options"
        );
    }

    #[test]
    fn section_paths() {
        assert_eq!(
            MessageKey::Label(Label::Unspecified).path(),
            "ai_consultant.labels.unspecified"
        );
        assert_eq!(
            MessageKey::Solution(Solution::AiAgent).path(),
            "ai_consultant.solutions.ai_agent"
        );
        assert_eq!(
            MessageKey::Handoff(HandoffPart::AnswerPrefix).path(),
            "ai_consultant.messages.answer_prefix"
        );
        assert_eq!(MessageKey::Meta(MetaField::OgTitle).path(), "meta.ogTitle");
    }
}
