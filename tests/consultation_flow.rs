//! End-to-end tests over the public API.
//!
//! The HTTP tests spin up an Axum server on a random port and exercise the
//! real REST contract with a stub text generator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use kangwoon_consult::api::{AppState, routes};
use kangwoon_consult::consult::{
    AnswerRecord, DialogueController, DialogueEngine, DialogueView, Recommendation,
    TextGenerator, TranscriptEntry, UiEvent, UiState, default_questions,
};
use kangwoon_consult::error::{ChannelError, LlmError};
use kangwoon_consult::handoff::{HandoffChannel, HandoffReceipt, HandoffRequest};
use kangwoon_consult::i18n::{ActiveLocale, Catalog, Locale};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub generator for integration tests (no real API calls).
struct StubGenerator {
    reply: Option<&'static str>,
    calls: AtomicUsize,
}

impl StubGenerator {
    fn new(reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        _answers: &HashMap<String, AnswerRecord>,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
            .map(str::to_string)
            .ok_or(LlmError::NotConfigured)
    }

    async fn clear_context(&self) {}

    async fn check_availability(&self) -> bool {
        self.reply.is_some()
    }
}

fn engine(generator: Arc<StubGenerator>) -> DialogueEngine {
    DialogueEngine::new(
        default_questions(),
        Arc::new(Catalog::builtin().unwrap()),
        ActiveLocale::new(Locale::Ko),
        generator,
    )
}

/// Start an Axum server on a random port, return its base URL.
async fn start_server(generator: Arc<StubGenerator>) -> String {
    let state = AppState::new(
        move |locale| {
            let engine = engine(generator.clone());
            engine.locale().set(locale);
            engine
        },
        Locale::Ko,
        "https://kangwoon.kr",
        "http://pf.kakao.com/_Mxmxakn",
    );
    let app = routes(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

const ENGLISH_ANSWERS: [&str; 6] = [
    "Yes, let's start",
    "Staff shortage",
    "10-50 employees",
    "Under 5M KRW",
    "Within 3 months",
    "Work automation",
];

#[tokio::test]
async fn http_consultation_in_english() {
    timeout(TEST_TIMEOUT, async {
        let generator = StubGenerator::new(Some("We recommend an AI Agent."));
        let base = start_server(generator.clone()).await;
        let client = reqwest::Client::new();

        let first: Value = client
            .get(format!("{base}/api/consult/question?lang=en"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first["question"]["id"], "greeting");
        assert!(first["question"]["options"].as_array().unwrap().len() >= 2);
        let session = first["session"].as_str().unwrap().to_string();

        let mut last = Value::Null;
        for answer in ENGLISH_ANSWERS {
            last = client
                .post(format!("{base}/api/consult/answer"))
                .json(&json!({ "session": session, "answer": answer, "lang": "en" }))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        }

        assert_eq!(last["type"], "recommendation");
        assert_eq!(last["is_fallback"], false);
        assert_eq!(last["solution_narrative"], "We recommend an AI Agent.");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

        let record = &last["source_answers"]["business_problem"];
        assert_eq!(record["raw_answer"], "Staff shortage");

        let rejected = client
            .post(format!("{base}/api/consult/answer"))
            .json(&json!({ "session": session, "answer": "again" }))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), reqwest::StatusCode::CONFLICT);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn http_site_metadata() {
    timeout(TEST_TIMEOUT, async {
        let base = start_server(StubGenerator::new(None)).await;
        let client = reqwest::Client::new();

        let meta: Value = client
            .get(format!("{base}/api/site/meta?lang=vi"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(meta["tags"]["canonical"], "https://kangwoon.kr/vi");
        assert_eq!(meta["tags"]["alternates"].as_array().unwrap().len(), 8);

        let health: Value = client
            .get(format!("{base}/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
    })
    .await
    .expect("test timed out");
}

// ── Controller ──────────────────────────────────────────────────────

#[derive(Default)]
struct ScriptView {
    options: Vec<String>,
    messages: Vec<TranscriptEntry>,
    recommendation: Option<Recommendation>,
    links: Vec<String>,
}

impl DialogueView for ScriptView {
    fn append_message(&mut self, entry: &TranscriptEntry) {
        self.messages.push(entry.clone());
    }
    fn show_options(&mut self, options: &[String]) {
        self.options = options.to_vec();
    }
    fn show_text_input(&mut self) {
        self.options.clear();
    }
    fn set_loading(&mut self, _loading: bool) {}
    fn set_progress(&mut self, _percent: u8) {}
    fn show_recommendation(&mut self, recommendation: &Recommendation) {
        self.recommendation = Some(recommendation.clone());
    }
    fn hide_recommendation(&mut self) {
        self.recommendation = None;
    }
    fn clear(&mut self) {
        self.messages.clear();
    }
    fn set_visible(&mut self, _visible: bool) {}
    fn open_link(&mut self, url: &str) {
        self.links.push(url.to_string());
    }
}

struct Inbox(std::sync::Mutex<Vec<HandoffRequest>>);

#[async_trait]
impl HandoffChannel for Inbox {
    fn name(&self) -> &str {
        "inbox"
    }

    async fn open_contact(&self, request: &HandoffRequest) -> Result<HandoffReceipt, ChannelError> {
        self.0.lock().unwrap().push(request.clone());
        Ok(HandoffReceipt {
            channel: "inbox".into(),
            reference: None,
        })
    }
}

#[tokio::test]
async fn controller_offline_consultation_and_handoff() {
    timeout(TEST_TIMEOUT, async {
        let inbox = Arc::new(Inbox(std::sync::Mutex::new(Vec::new())));
        let mut controller = DialogueController::new(
            engine(StubGenerator::new(None)),
            ScriptView::default(),
            "http://pf.kakao.com/_Mxmxakn",
        )
        .with_handoff(inbox.clone());

        controller.handle(UiEvent::Open).await;
        let picks = ["네, 시작할게요", "인력 부족", "", "", "", "업무 자동화"];
        for pick in picks {
            let choice = if pick.is_empty() {
                controller.view().options[0].clone()
            } else {
                pick.to_string()
            };
            controller.handle(UiEvent::SelectOption(choice)).await;
        }

        assert_eq!(controller.state(), UiState::ShowingRecommendation);
        let recommendation = controller.view().recommendation.clone().unwrap();
        assert!(recommendation.is_fallback);
        assert!(recommendation.solution_narrative.contains("AI Agent"));

        controller.handle(UiEvent::Handoff).await;
        assert_eq!(controller.state(), UiState::Closed);
        assert!(controller.view().links.is_empty());

        let sent = inbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("[AI 사전 상담 완료]"));
        assert!(sent[0].message.contains("답변: 업무 자동화"));
    })
    .await
    .expect("test timed out");
}
