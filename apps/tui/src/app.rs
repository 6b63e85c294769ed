//! Core TUI application state and event loop.

use std::io;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;

use researchkit_core::chat::{ChatSettings, Conversation};
use researchkit_llm::OpenAiClient;
use researchkit_shared::{load_config, resolve_api_key};

use crate::ui;

const READY: &str = "Ready. Enter to send, PgUp/PgDn to scroll, Esc to quit";

/// Application state.
pub(crate) struct App {
    /// Full conversation, system message included.
    pub conversation: Conversation,
    /// Text being typed.
    pub input: String,
    /// Assistant reply currently streaming in.
    pub pending: Option<String>,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_back: u16,
    /// Whether the app should quit.
    pub should_quit: bool,
}

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Send(String),
}

impl App {
    pub(crate) fn new(system_prompt: &str) -> Self {
        Self {
            conversation: Conversation::new(system_prompt),
            input: String::new(),
            pending: None,
            status: READY.to_string(),
            scroll_back: 0,
            should_quit: false,
        }
    }

    pub(crate) fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Action {
        match code {
            KeyCode::Char('c') | KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => {
                let text = self.input.trim().to_string();
                self.input.clear();
                if text.is_empty() {
                    self.status = "(Please type something...)".to_string();
                } else {
                    self.scroll_back = 0;
                    return Action::Send(text);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(5),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(5),
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
        Action::None
    }

    /// Begin an assistant turn for `text`.
    pub(crate) fn start_turn(&mut self, text: &str) {
        self.conversation.push_user(text);
        self.pending = Some(String::new());
        self.status = "Thinking...".to_string();
    }

    pub(crate) fn push_delta(&mut self, delta: &str) {
        if let Some(pending) = &mut self.pending {
            pending.push_str(delta);
        }
    }

    /// Commit the streamed reply to the history.
    pub(crate) fn finish_turn(&mut self) {
        if let Some(reply) = self.pending.take() {
            self.conversation.push_assistant(reply);
        }
        self.status = READY.to_string();
    }

    /// Drop a failed reply; the user message stays in the history.
    pub(crate) fn fail_turn(&mut self, error: &str) {
        self.pending = None;
        self.status = format!("Error: {error}");
    }
}

/// Connection to the model, owned by the event loop.
struct ChatSession {
    client: OpenAiClient,
    settings: ChatSettings,
    runtime: Runtime,
}

/// Entry point: resolves config and credentials, sets up terminal, runs
/// event loop, restores terminal.
pub(crate) fn run() -> Result<()> {
    // Credentials are checked before the terminal is taken over.
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;
    let session = ChatSession {
        client: OpenAiClient::from_config(&config.openai, api_key)?,
        settings: ChatSettings {
            model: config.openai.model.clone(),
            temperature: Some(config.chat.temperature),
        },
        runtime: tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?,
    };
    let mut app = App::new(&config.chat.system_prompt);

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app, &session);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    session: &ChatSession,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Action::Send(text) = app.handle_key(key.code, key.modifiers) {
                        stream_reply(terminal, app, session, &text)?;
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Send the history and redraw after every streamed fragment.
fn stream_reply(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    session: &ChatSession,
    text: &str,
) -> Result<()> {
    app.start_turn(text);
    terminal.draw(|f| ui::draw(f, app))?;

    let request = app.conversation.request(&session.settings);
    let mut stream = match session.runtime.block_on(session.client.stream(&request)) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "chat request failed");
            app.fail_turn(&e.to_string());
            return Ok(());
        }
    };

    loop {
        match session.runtime.block_on(stream.next_delta()) {
            Ok(Some(delta)) => {
                app.push_delta(&delta);
                terminal.draw(|f| ui::draw(f, app))?;
            }
            Ok(None) => {
                app.finish_turn();
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat stream failed");
                app.fail_turn(&e.to_string());
                break;
            }
        }
    }

    Ok(())
}
