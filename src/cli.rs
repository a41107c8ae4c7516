//! Terminal front-end: a stdin/stdout REPL driving a [`DialogueController`].

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::consult::{DialogueController, DialogueView, Recommendation, Speaker, TranscriptEntry, UiEvent};
use crate::i18n::{Locale, PreferenceStore};

/// Renders the dialogue as plain text.
#[derive(Debug, Default)]
pub struct TerminalView {
    options: Vec<String>,
    free_text: bool,
    visible: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn expects_free_text(&self) -> bool {
        self.free_text
    }
}

impl DialogueView for TerminalView {
    fn append_message(&mut self, entry: &TranscriptEntry) {
        match entry.speaker {
            Speaker::Bot => println!("\n🤖 {}", entry.text),
            Speaker::User => println!("🙋 {}", entry.text),
        }
    }

    fn show_options(&mut self, options: &[String]) {
        self.options = options.to_vec();
        self.free_text = false;
        for (i, option) in options.iter().enumerate() {
            println!("  [{}] {option}", i + 1);
        }
    }

    fn show_text_input(&mut self) {
        self.options.clear();
        self.free_text = true;
        println!("  (type your answer)");
    }

    fn set_loading(&mut self, loading: bool) {
        if loading {
            eprintln!("  ...");
        }
    }

    fn set_progress(&mut self, percent: u8) {
        eprintln!("  progress {percent}%");
    }

    fn show_recommendation(&mut self, recommendation: &Recommendation) {
        self.options.clear();
        self.free_text = false;
        if recommendation.is_fallback {
            eprintln!("  (offline recommendation)");
        }
        println!("\n  /handoff to talk to a consultant, /restart to start over");
    }

    fn hide_recommendation(&mut self) {}

    fn clear(&mut self) {
        self.options.clear();
        self.free_text = false;
        println!("\n────────────────────────────────────────");
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            println!("  (consultation closed, /open to resume)");
        }
    }

    fn open_link(&mut self, url: &str) {
        println!("  Contact us: {url}");
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Event(UiEvent),
    Lang(String),
    Help,
    Quit,
    Unknown(String),
}

/// Numbers pick an offered option; `/`-prefixed words are commands;
/// anything else is answer text.
pub fn parse_line(line: &str, options: &[String]) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();
        let command = match name {
            "open" => Command::Event(UiEvent::Open),
            "close" => Command::Event(UiEvent::Close),
            "esc" => Command::Event(UiEvent::Escape),
            "restart" => Command::Event(UiEvent::Restart),
            "retry" => Command::Event(UiEvent::Retry),
            "handoff" => Command::Event(UiEvent::Handoff),
            "lang" => Command::Lang(arg.to_string()),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        return Some(command);
    }

    if let Ok(n) = line.parse::<usize>()
        && let Some(option) = n.checked_sub(1).and_then(|i| options.get(i))
    {
        return Some(Command::Event(UiEvent::SelectOption(option.clone())));
    }

    if options.iter().any(|o| o == line) {
        return Some(Command::Event(UiEvent::SelectOption(line.to_string())));
    }
    Some(Command::Event(UiEvent::SubmitText(line.to_string())))
}

const HELP: &str = "\
  number     pick an option
  text       answer a free-text question
  /open /close /esc /restart /retry /handoff
  /lang <ko|en|zh|vi|ja|th|id>
  /quit";

/// Read commands from stdin until `/quit` or EOF.
pub async fn run_repl(
    controller: &mut DialogueController<TerminalView>,
    store: &PreferenceStore,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    controller.handle(UiEvent::Open).await;
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line, controller.view().options()) else {
            eprint!("> ");
            continue;
        };

        match command {
            Command::Event(event) => controller.handle(event).await,
            Command::Lang(code) => match Locale::from_code(&code) {
                Some(locale) => {
                    controller.engine().locale().set(locale);
                    if let Err(e) = store.save_locale(locale) {
                        tracing::warn!("Failed to save language preference: {e}");
                    }
                    println!("  Language: {}", locale.native_name());
                }
                None => println!("  Unsupported language '{code}'"),
            },
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Unknown(name) => println!("  Unknown command /{name}, try /help"),
        }
        eprint!("> ");
    }
    Ok(())
}
