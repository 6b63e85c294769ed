//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use researchkit_core::chat::{ChatSettings, Conversation};
use researchkit_core::pipeline::{
    self, ProgressReporter, ResearchConfig, ResearchResult, validate_bullets,
};
use researchkit_llm::OpenAiClient;
use researchkit_shared::{AppConfig, Topic, init_config, load_config, resolve_api_key};
use tracing::{info, warn};

/// Width of the `=====` separators around console output.
const RULE_WIDTH: usize = 60;

/// History lines are cut to this many characters in the `history` listing.
const HISTORY_PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ResearchKit: AI-powered topic summaries as Markdown.
#[derive(Parser)]
#[command(
    name = "researchkit",
    version,
    about = "Research a topic with an LLM and save the summary as Markdown.",
    long_about = None,
    args_conflicts_with_subcommands = true,
    after_help = "Examples:\n  \
        researchkit --topic \"Black Holes\"\n  \
        researchkit --topic \"Quantum Computing\" --bullets 5\n  \
        researchkit -t \"Climate Change\" -o ./research/\n  \
        researchkit chat",
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub research: ResearchArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Flags for the default research command.
#[derive(Args, Debug, Default)]
pub(crate) struct ResearchArgs {
    /// The topic to research (e.g., "Machine Learning").
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Number of key points to generate, 1-10 (default from config: 3).
    #[arg(short, long)]
    pub bullets: Option<u8>,

    /// Output directory for the Markdown file (default from config: current directory).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print to console only, don't save to file.
    #[arg(short, long)]
    pub print_only: bool,

    /// Model override (default from config).
    #[arg(long)]
    pub model: Option<String>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Subcommands besides the default research run.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Chat with the model; the whole conversation is resent every turn.
    Chat {
        /// Model override (default from config).
        #[arg(long)]
        model: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "researchkit=warn",
        1 => "researchkit=info",
        2 => "researchkit=debug",
        _ => "researchkit=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => cmd_research(cli.research).await,
        Some(Command::Chat { model }) => cmd_chat(model).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// Merge config-file defaults with command-line flags.
fn research_config(config: &AppConfig, args: ResearchArgs) -> ResearchConfig {
    let mut research = ResearchConfig::from_app_config(config, args.topic.unwrap_or_default());

    if let Some(bullets) = args.bullets {
        research.bullets = bullets;
    }
    if let Some(model) = args.model {
        research.model = model;
    }
    research.output_dir = if args.print_only {
        None
    } else {
        Some(PathBuf::from(
            args.output.unwrap_or_else(|| config.defaults.output_dir.clone()),
        ))
    };

    research
}

async fn cmd_research(args: ResearchArgs) -> Result<()> {
    let config = load_config()?;
    let research = research_config(&config, args);

    // Bad input is reported before credentials are even looked at.
    Topic::new(&research.topic)?;
    validate_bullets(research.bullets)?;

    let api_key = resolve_api_key(&config)?;
    let client = OpenAiClient::from_config(&config.openai, api_key)?;

    info!(
        topic = %research.topic,
        bullets = research.bullets,
        model = %research.model,
        "starting research"
    );

    rule();
    println!("  CLI Research Assistant");
    rule();
    println!("  Topic:      {}", research.topic.trim());
    println!("  Key Points: {}", research.bullets);
    println!();

    let reporter = CliProgress::new();
    let outcome = pipeline::research(&research, &client, &reporter).await;
    reporter.clear();
    let result = outcome?;

    rule();
    println!("  RESEARCH RESULTS");
    rule();
    println!();
    println!("{}", result.completion.text);
    println!();

    if let Some(path) = &result.report_path {
        rule();
        println!("  Saved to: {}", path.display());
        rule();
    }
    if let Some(usage) = result.completion.usage {
        println!(
            "  Tokens:     {} in / {} out",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();
    println!("Research complete!");

    Ok(())
}

fn rule() {
    println!("{}", "=".repeat(RULE_WIDTH));
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(match name {
            "Researching" => "Researching... (this may take a few seconds)".to_string(),
            other => other.to_string(),
        });
    }

    fn done(&self, _result: &ResearchResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// What a line typed at the chat prompt means.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Quit,
    Empty,
    History,
    Message(&'a str),
}

fn classify(line: &str) -> ReplInput<'_> {
    let input = line.trim();
    match input.to_lowercase().as_str() {
        "" => ReplInput::Empty,
        "quit" | "exit" | "q" => ReplInput::Quit,
        "history" => ReplInput::History,
        _ => ReplInput::Message(input),
    }
}

async fn cmd_chat(model: Option<String>) -> Result<()> {
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;
    let client = OpenAiClient::from_config(&config.openai, api_key)?;

    let settings = ChatSettings {
        model: model.unwrap_or_else(|| config.openai.model.clone()),
        temperature: Some(config.chat.temperature),
    };
    let mut conversation = Conversation::new(config.chat.system_prompt.clone());

    info!(model = %settings.model, "starting chat session");

    rule();
    println!("  Chatbot with Memory");
    rule();
    println!("  This chatbot remembers your conversation.");
    println!("  Type 'quit' or 'exit' to end the conversation.");
    println!("  Type 'history' to see the full conversation history.");
    rule();
    println!();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("You: ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\n\nGoodbye!");
            break;
        }

        match classify(&line) {
            ReplInput::Quit => {
                println!("\nGoodbye! Thanks for chatting!");
                break;
            }
            ReplInput::Empty => {
                println!("(Please type something...)\n");
            }
            ReplInput::History => {
                println!("\nConversation History:");
                println!("{}", "-".repeat(40));
                for entry in conversation.history_preview(HISTORY_PREVIEW_CHARS) {
                    println!("{entry}");
                }
                println!("{}", "-".repeat(40));
                println!();
            }
            ReplInput::Message(text) => match conversation.send(&client, &settings, text).await {
                Ok(reply) => println!("AI: {reply}\n"),
                Err(e) => {
                    warn!(error = %e, "chat turn failed");
                    eprintln!("Error: {e}\n");
                }
            },
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
