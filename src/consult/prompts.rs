//! Text assembled from the collected answers: customer summary, the
//! recommendation prompt, the offline recommendation and the hand-off
//! transcript.

use std::collections::HashMap;

use crate::i18n::keys::{HandoffPart, Label, PromptPart, Solution};
use crate::i18n::{Locale, Localizer, MessageKey};

use super::question::{QuestionSpec, Topic};
use super::session::AnswerRecord;

/// Summary rows in their fixed order.
const SUMMARY_ROWS: [(Label, Topic); 5] = [
    (Label::MainProblem, Topic::BusinessProblem),
    (Label::CompanySize, Topic::CompanySize),
    (Label::BudgetRange, Topic::BudgetRange),
    (Label::Timeline, Topic::Timeline),
    (Label::InterestArea, Topic::AutomationInterest),
];

fn answer<'a>(answers: &'a HashMap<String, AnswerRecord>, topic: Topic) -> Option<&'a str> {
    answers.get(topic.id()).map(|r| r.raw_answer.as_str())
}

/// Customer summary followed by the list of solutions on offer.
pub fn customer_summary(
    localizer: &dyn Localizer,
    locale: Locale,
    answers: &HashMap<String, AnswerRecord>,
) -> String {
    let t = |key| localizer.text(locale, key);
    let unspecified = t(MessageKey::Label(Label::Unspecified));

    let mut out = t(MessageKey::Prompt(PromptPart::CustomerSummary));
    out.push('\n');
    for (label, topic) in SUMMARY_ROWS {
        let value = answer(answers, topic)
            .filter(|a| !a.is_empty())
            .unwrap_or(unspecified.as_str());
        out.push_str(&format!("- {} {}\n", t(MessageKey::Label(label)), value));
    }

    out.push('\n');
    out.push_str(&t(MessageKey::Prompt(PromptPart::SolutionOptions)));
    out.push('\n');
    for (i, solution) in Solution::ALL.into_iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, t(MessageKey::Solution(solution))));
    }
    out
}

/// Prompt asking the text generator for a formatted recommendation.
pub fn recommendation_prompt(localizer: &dyn Localizer, locale: Locale, summary: &str) -> String {
    let p = |part| localizer.text(locale, MessageKey::Prompt(part));
    [
        p(PromptPart::Intro),
        p(PromptPart::RecommendationHeader),
        summary.trim_end().to_string(),
        p(PromptPart::ResponseFormat),
        p(PromptPart::FormatSolution),
        p(PromptPart::FormatReason),
        p(PromptPart::FormatEffect),
        p(PromptPart::FormatRoi),
        p(PromptPart::FormatImplementation),
        format!(
            "{}\n{}",
            p(PromptPart::FormatNextStep),
            p(PromptPart::NextStepText)
        ),
    ]
    .join("\n\n")
}

/// Keyword match over the business problem and interest answers.
///
/// Categories are checked in a fixed order and at most two solutions are
/// kept. Matching is case-sensitive substring search.
pub fn match_solutions(problem: &str, interest: &str) -> Vec<Solution> {
    let any = |text: &str, words: &[&str]| words.iter().any(|w| text.contains(w));

    let mut picked = Vec::new();
    if any(problem, &["인력", "Staff"]) || any(interest, &["자동화", "automation"]) {
        picked.push(Solution::AiAgent);
    }
    if any(problem, &["품질", "quality", "데이터", "data"]) || any(interest, &["지식", "knowledge"])
    {
        picked.push(Solution::RagApplication);
    }
    if any(problem, &["고객", "customer"]) || any(interest, &["상담", "consultation"]) {
        picked.push(Solution::NocodeChatbot);
    }
    if any(interest, &["음성", "voice", "제어", "control"]) {
        picked.push(Solution::SttTts);
    }
    if picked.is_empty() {
        picked = vec![Solution::RagApplication, Solution::AiAgent];
    }
    picked.truncate(2);
    picked
}

/// ROI paragraph chosen from the budget answer.
pub fn roi_tier(budget: &str) -> PromptPart {
    if budget.contains("500") {
        PromptPart::RoiShort
    } else if budget.contains("2,000") {
        PromptPart::RoiMedium
    } else {
        PromptPart::RoiLong
    }
}

/// Deterministic recommendation used when the text generator is unavailable.
pub fn fallback_recommendation(
    localizer: &dyn Localizer,
    locale: Locale,
    answers: &HashMap<String, AnswerRecord>,
) -> String {
    let p = |part| localizer.text(locale, MessageKey::Prompt(part));
    let problem = answer(answers, Topic::BusinessProblem).unwrap_or("");
    let budget = answer(answers, Topic::BudgetRange).unwrap_or("");
    let interest = answer(answers, Topic::AutomationInterest).unwrap_or("");

    let solutions = match_solutions(problem, interest)
        .into_iter()
        .map(|s| localizer.text(locale, MessageKey::Solution(s)))
        .collect::<Vec<_>>()
        .join(", ");

    let reason = p(PromptPart::ReasonTemplate)
        .replacen("{businessProblem}", problem, 1)
        .replacen("{interest}", interest, 1);

    let sections = [
        (PromptPart::FormatSolution, solutions),
        (PromptPart::FormatReason, reason),
        (
            PromptPart::FormatEffect,
            [
                PromptPart::EffectTime,
                PromptPart::EffectCost,
                PromptPart::EffectAccuracy,
            ]
            .into_iter()
            .map(|e| format!("• {}", p(e)))
            .collect::<Vec<_>>()
            .join("\n"),
        ),
        (PromptPart::FormatRoi, p(roi_tier(budget))),
        (
            PromptPart::FormatImplementation,
            [
                PromptPart::Step1,
                PromptPart::Step2,
                PromptPart::Step3,
                PromptPart::Step4,
            ]
            .into_iter()
            .map(p)
            .collect::<Vec<_>>()
            .join("\n"),
        ),
        (
            PromptPart::FormatNextStep,
            format!(
                "{}\n{}",
                p(PromptPart::NextStepText),
                p(PromptPart::DetailedProposal)
            ),
        ),
    ];

    sections
        .into_iter()
        .map(|(header, body)| format!("**{}**\n{}", p(header), body))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Human-readable transcript for a consultant, answers in question order.
pub fn handoff_transcript(
    localizer: &dyn Localizer,
    locale: Locale,
    questions: &[QuestionSpec],
    answers: &HashMap<String, AnswerRecord>,
    timestamp: &str,
) -> String {
    let h = |part| localizer.text(locale, MessageKey::Handoff(part));
    let prefix = h(HandoffPart::AnswerPrefix);

    let body = questions
        .iter()
        .filter_map(|q| answers.get(q.id()))
        .map(|r| format!("{}\n{} {}", r.prompt, prefix, r.raw_answer))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\n{}\n\n{} {}\n\n{}",
        h(HandoffPart::ConsultationComplete),
        body,
        h(HandoffPart::Timestamp),
        timestamp,
        h(HandoffPart::ExpertFollowup)
    )
}
