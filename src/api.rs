//! HTTP surface: consultation endpoints, site metadata and the contact
//! forms.
//!
//! Every visitor gets their own [`DialogueEngine`], keyed by the session id
//! returned from `GET /api/consult/question` or `POST /api/consult/restart`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::ACCEPT_LANGUAGE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consult::DialogueEngine;
use crate::error::{ChannelError, DialogueError};
use crate::handoff::{
    ContactForm, EmailChannel, HandoffChannel, HandoffRequest, LeadForm, SOURCE_AI_CONSULTATION,
    SolapiChannel,
};
use crate::i18n::{DetectionRequest, Locale, Localizer, request_language};
use crate::site::{MetaTags, legal::legal_links};

/// Open consultations kept in memory; the oldest is dropped beyond this.
pub const MAX_SESSIONS: usize = 1024;

/// Builds a fresh engine, with its own generator context, for one visitor.
pub type EngineFactory = Arc<dyn Fn(Locale) -> DialogueEngine + Send + Sync>;

type SharedEngine = Arc<Mutex<DialogueEngine>>;

struct SessionEntry {
    engine: SharedEngine,
    touched: Instant,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    new_engine: EngineFactory,
    pub localizer: Arc<dyn Localizer>,
    pub default_locale: Locale,
    pub site_base_url: String,
    pub contact_url: String,
    pub handoff: Option<Arc<dyn HandoffChannel>>,
    pub email: Option<Arc<EmailChannel>>,
    pub solapi: Option<Arc<SolapiChannel>>,
}

impl AppState {
    pub fn new(
        new_engine: impl Fn(Locale) -> DialogueEngine + Send + Sync + 'static,
        default_locale: Locale,
        site_base_url: impl Into<String>,
        contact_url: impl Into<String>,
    ) -> Self {
        let localizer = Arc::clone(new_engine(default_locale).localizer());
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            new_engine: Arc::new(new_engine),
            localizer,
            default_locale,
            site_base_url: site_base_url.into(),
            contact_url: contact_url.into(),
            handoff: None,
            email: None,
            solapi: None,
        }
    }

    pub fn with_handoff(mut self, channel: Arc<dyn HandoffChannel>) -> Self {
        self.handoff = Some(channel);
        self
    }

    pub fn with_email(mut self, channel: Arc<EmailChannel>) -> Self {
        self.email = Some(channel);
        self
    }

    pub fn with_solapi(mut self, channel: Arc<SolapiChannel>) -> Self {
        self.solapi = Some(channel);
        self
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    fn locale_for(&self, lang: Option<&str>, headers: &HeaderMap) -> Locale {
        requested_locale(lang, headers).unwrap_or(self.default_locale)
    }

    async fn session(&self, id: Uuid) -> Result<SharedEngine, Response> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.touched = Instant::now();
                Ok(Arc::clone(&entry.engine))
            }
            None => Err(unknown_session(id)),
        }
    }

    async fn open_session(&self, locale: Locale) -> (Uuid, SharedEngine) {
        let engine = (self.new_engine)(locale);
        let id = engine.session().id;
        let engine = Arc::new(Mutex::new(engine));
        self.insert(id, Arc::clone(&engine)).await;
        info!(session = %id, %locale, "Consultation session opened");
        (id, engine)
    }

    async fn insert(&self, id: Uuid, engine: SharedEngine) {
        let mut sessions = self.sessions.lock().await;
        if sessions.len() >= MAX_SESSIONS {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session = %oldest, "Evicted idle consultation session");
            }
        }
        sessions.insert(
            id,
            SessionEntry {
                engine,
                touched: Instant::now(),
            },
        );
    }

    async fn remove(&self, id: Uuid) -> Option<SharedEngine> {
        self.sessions.lock().await.remove(&id).map(|entry| entry.engine)
    }
}

/// Language the visitor asked for: `lang` parameter, then `Accept-Language`.
fn requested_locale(lang: Option<&str>, headers: &HeaderMap) -> Option<Locale> {
    let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
    request_language(DetectionRequest {
        explicit: lang,
        accept_language,
    })
}

/// Build the Axum router with every endpoint.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/consult/question", get(current_question))
        .route("/api/consult/answer", post(submit_answer))
        .route("/api/consult/restart", post(restart))
        .route("/api/consult/progress", get(progress))
        .route("/api/consult/handoff", get(handoff_message).post(send_handoff))
        .route("/api/site/meta", get(site_meta))
        .route("/api/site/legal", get(site_legal))
        .route("/api/contact", post(submit_contact))
        .route("/api/lead", post(submit_lead))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct LangQuery {
    lang: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ConsultQuery {
    session: Option<Uuid>,
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session: Uuid,
}

#[derive(Debug, Deserialize)]
struct AnswerBody {
    session: Uuid,
    answer: String,
    #[serde(default)]
    lang: Option<String>,
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "kangwoon-consult"
    }))
}

// ── Consultation ────────────────────────────────────────────────────

/// Current question of `session`, or of a new session when none is given.
async fn current_question(
    State(state): State<AppState>,
    Query(query): Query<ConsultQuery>,
    headers: HeaderMap,
) -> Response {
    let requested = requested_locale(query.lang.as_deref(), &headers);
    let (id, engine) = match query.session {
        Some(id) => match state.session(id).await {
            Ok(engine) => (id, engine),
            Err(response) => return response,
        },
        None => {
            state
                .open_session(requested.unwrap_or(state.default_locale))
                .await
        }
    };

    let engine = engine.lock().await;
    if let Some(locale) = requested {
        engine.locale().set(locale);
    }
    Json(json!({
        "session": id,
        "locale": engine.locale().get(),
        "question": engine.current_question(),
        "progress": engine.progress(),
    }))
    .into_response()
}

async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AnswerBody>,
) -> Response {
    let engine = match state.session(body.session).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let mut engine = engine.lock().await;
    if let Some(locale) = requested_locale(body.lang.as_deref(), &headers) {
        engine.locale().set(locale);
    }
    match engine.submit_answer(&body.answer).await {
        Ok(turn) => Json(turn).into_response(),
        Err(e) => dialogue_error(e),
    }
}

/// Start over. The session gets a new id; unknown or missing ids open a
/// new session.
async fn restart(
    State(state): State<AppState>,
    Query(query): Query<ConsultQuery>,
    headers: HeaderMap,
) -> Response {
    let requested = requested_locale(query.lang.as_deref(), &headers);
    let previous = match query.session {
        Some(id) => state.remove(id).await,
        None => None,
    };
    let engine = previous.unwrap_or_else(|| {
        Arc::new(Mutex::new((state.new_engine)(
            requested.unwrap_or(state.default_locale),
        )))
    });

    let mut guard = engine.lock().await;
    if let Some(locale) = requested {
        guard.locale().set(locale);
    }
    let question = match guard.restart().await {
        Ok(question) => question,
        Err(e) => return dialogue_error(e),
    };
    let id = guard.session().id;
    let body = json!({
        "session": id,
        "locale": guard.locale().get(),
        "question": question,
        "progress": guard.progress(),
    });
    drop(guard);

    state.insert(id, engine).await;
    Json(body).into_response()
}

async fn progress(State(state): State<AppState>, Query(query): Query<SessionQuery>) -> Response {
    let engine = match state.session(query.session).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let engine = engine.lock().await;
    Json(json!({
        "progress": engine.progress(),
        "step": engine.session().current_step(),
        "total": engine.question_count(),
        "complete": engine.is_complete(),
    }))
    .into_response()
}

async fn handoff_message(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let engine = match state.session(query.session).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let message = engine.lock().await.handoff_message();
    Json(json!({
        "message": message,
        "source": SOURCE_AI_CONSULTATION,
        "contact_url": state.contact_url,
    }))
    .into_response()
}

/// Forward the transcript to the configured channel, or hand back the
/// contact link for the client to open.
async fn send_handoff(State(state): State<AppState>, Query(query): Query<SessionQuery>) -> Response {
    let engine = match state.session(query.session).await {
        Ok(engine) => engine,
        Err(response) => return response,
    };
    let request = {
        let engine = engine.lock().await;
        HandoffRequest::from_consultation(engine.handoff_message(), engine.locale().get())
    };

    if let Some(channel) = &state.handoff {
        match channel.open_contact(&request).await {
            Ok(receipt) => {
                info!(channel = %receipt.channel, session = %query.session, "Consultation handed off");
                return Json(json!({ "status": "sent", "receipt": receipt })).into_response();
            }
            Err(e) => warn!("Hand-off failed: {e}"),
        }
    }
    Json(json!({ "status": "open_link", "contact_url": state.contact_url })).into_response()
}

// ── Site metadata ───────────────────────────────────────────────────

async fn site_meta(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let locale = state.locale_for(query.lang.as_deref(), &headers);
    let tags = MetaTags::build(
        state.localizer.as_ref(),
        locale,
        query.page.as_deref().unwrap_or(""),
        &state.site_base_url,
    );
    let html = tags.render_html();
    Json(json!({ "tags": tags, "html": html }))
}

async fn site_legal(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let locale = state.locale_for(query.lang.as_deref(), &headers);
    Json(json!({ "locale": locale, "links": legal_links(locale) }))
}

// ── Contact forms ───────────────────────────────────────────────────

async fn submit_contact(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Response {
    let Some(channel) = &state.email else {
        return channel_disabled("email");
    };
    match channel.submit_contact(&form).await {
        Ok(receipt) => (StatusCode::ACCEPTED, Json(json!({ "receipt": receipt }))).into_response(),
        Err(e) => channel_error(e),
    }
}

async fn submit_lead(State(state): State<AppState>, Json(form): Json<LeadForm>) -> Response {
    let Some(channel) = &state.solapi else {
        return channel_disabled("solapi");
    };
    match channel.submit_lead(&form).await {
        Ok(receipt) => (StatusCode::ACCEPTED, Json(json!({ "receipt": receipt }))).into_response(),
        Err(e) => channel_error(e),
    }
}

// ── Errors ──────────────────────────────────────────────────────────

fn dialogue_error(error: DialogueError) -> Response {
    let status = match error {
        DialogueError::ConfigurationMissing => StatusCode::SERVICE_UNAVAILABLE,
        DialogueError::SessionComplete => StatusCode::CONFLICT,
        DialogueError::ValidationRejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn unknown_session(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown consultation session {id}") })),
    )
        .into_response()
}

fn channel_disabled(name: &str) -> Response {
    channel_error(ChannelError::Disabled {
        name: name.to_string(),
    })
}

fn channel_error(error: ChannelError) -> Response {
    match error {
        ChannelError::Validation(fields) => {
            let fields: Vec<_> = fields
                .iter()
                .map(|f| json!({ "field": f.field, "message": f.message }))
                .collect();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "validation", "fields": fields })),
            )
                .into_response()
        }
        ChannelError::Disabled { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        other => {
            warn!("Contact form delivery failed: {other}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consult::{AdvisorGenerator, default_questions};
    use crate::i18n::{ActiveLocale, Catalog};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn state(default_locale: Locale) -> AppState {
        let catalog: Arc<dyn Localizer> = Arc::new(Catalog::builtin().unwrap());
        AppState::new(
            move |locale| {
                DialogueEngine::new(
                    default_questions(),
                    Arc::clone(&catalog),
                    ActiveLocale::new(locale),
                    Arc::new(AdvisorGenerator::unconfigured()),
                )
            },
            default_locale,
            "https://kangwoon.kr",
            "http://pf.kakao.com/_Mxmxakn",
        )
    }

    fn app() -> Router {
        routes(state(Locale::Ko))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn open(app: &Router, uri: &str) -> String {
        let (status, body) = send(app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        body["session"].as_str().unwrap().to_string()
    }

    async fn answer(app: &Router, session: &str, answer: &str) -> (StatusCode, Value) {
        send(
            app,
            post_json(
                "/api/consult/answer",
                json!({ "session": session, "answer": answer }),
            ),
        )
        .await
    }

    #[tokio::test]
    async fn question_follows_requested_language() {
        let app = app();
        let (status, body) = send(&app, get("/api/consult/question?lang=en")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["locale"], "en");
        assert_eq!(body["question"]["type"], "question");
        assert_eq!(body["question"]["id"], "greeting");
        assert_eq!(body["progress"], 0);
        assert!(body["session"].is_string());
    }

    #[tokio::test]
    async fn accept_language_picks_locale() {
        let app = app();
        let request = Request::builder()
            .uri("/api/consult/question")
            .header("accept-language", "en-US,en;q=0.9")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, request).await;
        assert_eq!(body["locale"], "en");
    }

    #[tokio::test]
    async fn accept_language_beats_server_default() {
        let app = routes(state(Locale::Ja));
        let request = Request::builder()
            .uri("/api/site/legal")
            .header("accept-language", "en-US")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(&app, request).await;
        assert_eq!(body["locale"], "en");

        let (_, body) = send(&app, get("/api/site/legal")).await;
        assert_eq!(body["locale"], "ja");
    }

    #[tokio::test]
    async fn visitors_do_not_share_sessions() {
        let app = app();
        let a = open(&app, "/api/consult/question?lang=ja").await;
        let b = open(&app, "/api/consult/question").await;
        assert_ne!(a, b);

        answer(&app, &a, "네").await;
        let (_, turn) = answer(&app, &a, "인력 부족").await;
        assert_eq!(turn["progress"], 33);

        let (_, body) = send(&app, get(&format!("/api/consult/question?session={b}"))).await;
        assert_eq!(body["locale"], "ko");
        assert_eq!(body["question"]["id"], "greeting");
        assert_eq!(body["progress"], 0);

        let (_, turn) = answer(&app, &b, "네").await;
        assert_eq!(turn["progress"], 17);

        let (_, handoff) = send(&app, get(&format!("/api/consult/handoff?session={b}"))).await;
        assert!(!handoff["message"].as_str().unwrap().contains("인력 부족"));
        let (_, handoff) = send(&app, get(&format!("/api/consult/handoff?session={a}"))).await;
        assert!(handoff["message"].as_str().unwrap().contains("인력 부족"));

        let (_, progress) = send(&app, get(&format!("/api/consult/progress?session={a}"))).await;
        assert_eq!(progress["step"], 2);
    }

    #[tokio::test]
    async fn unknown_or_missing_session_is_rejected() {
        let app = app();
        let stranger = Uuid::new_v4();
        let (status, _) = answer(&app, &stranger.to_string(), "네").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get(&format!("/api/consult/handoff?session={stranger}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/api/consult/progress")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn answers_run_to_fallback_recommendation() {
        let app = app();
        let session = open(&app, "/api/consult/question").await;
        let answers = ["네", "인력 부족", "10~50명", "500만원 미만", "3개월 이내", "업무 자동화"];
        for a in &answers[..5] {
            let (status, body) = answer(&app, &session, a).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["type"], "next_question");
        }
        let (_, body) = answer(&app, &session, answers[5]).await;
        assert_eq!(body["type"], "recommendation");
        assert_eq!(body["is_fallback"], true);
        assert_eq!(body["source_answers"].as_object().unwrap().len(), 6);

        let (status, _) = answer(&app, &session, "x").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, progress) =
            send(&app, get(&format!("/api/consult/progress?session={session}"))).await;
        assert_eq!(progress["progress"], 100);
        assert_eq!(progress["complete"], true);

        let (_, handoff) =
            send(&app, get(&format!("/api/consult/handoff?session={session}"))).await;
        assert_eq!(handoff["source"], "ai_consultation");
        assert!(handoff["message"].as_str().unwrap().contains("답변: 인력 부족"));
    }

    #[tokio::test]
    async fn restart_resets_progress_under_new_id() {
        let state = state(Locale::Ko);
        let app = routes(state.clone());
        let session = open(&app, "/api/consult/question").await;
        answer(&app, &session, "네").await;

        let (status, body) = send(
            &app,
            post_json(&format!("/api/consult/restart?session={session}"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question"]["id"], "greeting");
        assert_eq!(body["progress"], 0);
        let renewed = body["session"].as_str().unwrap();
        assert_ne!(renewed, session);
        assert_eq!(state.session_count().await, 1);

        let (status, _) = answer(&app, &session, "네").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = answer(&app, renewed, "네").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn handoff_without_channel_returns_link() {
        let app = app();
        let session = open(&app, "/api/consult/question").await;
        let (_, body) = send(
            &app,
            post_json(&format!("/api/consult/handoff?session={session}"), json!({})),
        )
        .await;
        assert_eq!(body["status"], "open_link");
        assert_eq!(body["contact_url"], "http://pf.kakao.com/_Mxmxakn");
    }

    #[tokio::test]
    async fn site_meta_and_legal() {
        let app = app();
        let (_, meta) = send(&app, get("/api/site/meta?lang=ja&page=about")).await;
        assert_eq!(meta["tags"]["canonical"], "https://kangwoon.kr/ja/about");
        assert!(meta["html"].as_str().unwrap().contains("hreflang=\"x-default\""));

        let (_, legal) = send(&app, get("/api/site/legal?lang=en")).await;
        assert_eq!(legal["links"]["privacy"], "/privacy-policy-en.html");
    }

    #[tokio::test]
    async fn contact_forms_need_configured_channels() {
        let app = app();
        let (status, _) = send(
            &app,
            post_json(
                "/api/lead",
                json!({ "name": "김강운", "phone": "010-1234-5678", "privacy_consent": true }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
