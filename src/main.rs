use std::sync::Arc;

use anyhow::Context;
use kangwoon_consult::api::{AppState, routes};
use kangwoon_consult::cli::{TerminalView, run_repl};
use kangwoon_consult::config::AppConfig;
use kangwoon_consult::consult::{
    AdvisorGenerator, DialogueController, DialogueEngine, TextGenerator, default_questions,
};
use kangwoon_consult::handoff::{
    EmailChannel, EmailConfig, HandoffChannel, HandoffRouter, SolapiChannel, SolapiConfig,
};
use kangwoon_consult::i18n::{
    ActiveLocale, Catalog, DetectionRequest, IpGeoLookup, LanguageDetector, Localizer,
    PreferenceStore,
};
use kangwoon_consult::llm::{LlmConfig, LlmProvider, create_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Warning: rustls crypto provider was already installed");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🤝 KANGWOON consult v{}", env!("CARGO_PKG_VERSION"));

    // ── Localization ────────────────────────────────────────────────
    let catalog: Arc<dyn Localizer> = Arc::new(match &config.locales_dir {
        Some(dir) => Catalog::load_dir(dir)
            .with_context(|| format!("loading dictionaries from {}", dir.display()))?,
        None => Catalog::builtin().context("loading built-in dictionaries")?,
    });

    let store = Arc::new(
        PreferenceStore::open(&config.state_path)
            .with_context(|| format!("opening {}", config.state_path.display()))?,
    );
    eprintln!("   State: {}", config.state_path.display());

    // Stored preference and geolocation only apply to the local terminal.
    let mut detector = LanguageDetector::new(Arc::clone(&store), config.default_locale);
    if config.geo_lookup {
        detector = detector.with_geo(Arc::new(IpGeoLookup::new()));
    }

    // `ko_KR.UTF-8` -> `ko-KR`
    let lang_env = std::env::var("LANG")
        .ok()
        .and_then(|l| l.split('.').next().map(|t| t.replace('_', "-")));
    let locale = detector
        .detect(DetectionRequest {
            explicit: None,
            accept_language: lang_env.as_deref(),
        })
        .await;
    eprintln!("   Language: {}", locale.native_name());

    // ── Text generation ─────────────────────────────────────────────
    let provider: Option<Arc<dyn LlmProvider>> = match LlmConfig::from_env() {
        Some(llm_config) => {
            eprintln!("   Model: {}", llm_config.model);
            Some(create_provider(&llm_config)?)
        }
        None => {
            eprintln!("   Model: none (GEMINI_API_KEY not set, offline recommendations)");
            None
        }
    };

    // ── Hand-off channels ───────────────────────────────────────────
    let solapi = SolapiConfig::from_env().map(|c| Arc::new(SolapiChannel::new(c)));
    let email = EmailConfig::from_env().map(|c| Arc::new(EmailChannel::new(c)));

    let mut channels: Vec<Arc<dyn HandoffChannel>> = Vec::new();
    if let Some(channel) = &solapi {
        channels.push(channel.clone());
    }
    if let Some(channel) = &email {
        channels.push(channel.clone());
    }
    let names: Vec<&str> = channels.iter().map(|c| c.name()).collect();
    eprintln!(
        "   Hand-off: {}",
        if names.is_empty() {
            format!("contact link ({})", config.contact_url)
        } else {
            names.join(", ")
        }
    );
    let router = HandoffRouter::new(channels);
    let handoff: Option<Arc<dyn HandoffChannel>> =
        (!router.is_empty()).then(|| Arc::new(router) as Arc<dyn HandoffChannel>);

    // Each engine gets its own generator so chat context stays per visitor.
    let new_engine = {
        let catalog = Arc::clone(&catalog);
        let timeout = config.recommendation_timeout;
        move |locale| {
            let generator: Arc<dyn TextGenerator> = match &provider {
                Some(llm) => Arc::new(AdvisorGenerator::new(Arc::clone(llm))),
                None => Arc::new(AdvisorGenerator::unconfigured()),
            };
            DialogueEngine::new(
                default_questions(),
                Arc::clone(&catalog),
                ActiveLocale::new(locale),
                generator,
            )
            .with_recommendation_timeout(timeout)
        }
    };

    // ── HTTP surface ────────────────────────────────────────────────
    if let Some(port) = config.http_port {
        let mut state = AppState::new(
            new_engine.clone(),
            config.default_locale,
            config.site_base_url.clone(),
            config.contact_url.clone(),
        );
        if let Some(channel) = &handoff {
            state = state.with_handoff(Arc::clone(channel));
        }
        if let Some(channel) = &email {
            state = state.with_email(Arc::clone(channel));
        }
        if let Some(channel) = &solapi {
            state = state.with_solapi(Arc::clone(channel));
        }
        let app = routes(state);

        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("binding HTTP port {port}"))?;
        eprintln!("   HTTP: http://0.0.0.0:{port}/api/consult/question");
        tokio::spawn(async move {
            tracing::info!(port, "HTTP server started");
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("HTTP server stopped: {e}");
            }
        });
    }

    eprintln!("   Type /help for commands.\n");

    // ── Terminal consultation ───────────────────────────────────────
    let mut controller =
        DialogueController::new(new_engine(locale), TerminalView::new(), config.contact_url.clone());
    if let Some(channel) = handoff {
        controller = controller.with_handoff(channel);
    }
    run_repl(&mut controller, &store).await?;

    Ok(())
}
