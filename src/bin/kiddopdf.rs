//! CLI binary for kiddopdf.
//!
//! A thin shim over the library crate that maps CLI flags to `StoryConfig`,
//! drives one pipeline cycle and prints the resulting view.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use kiddopdf::pipeline::input::resolve_input;
use kiddopdf::{
    error_banner, export_story, Credential, GenerationResult, Pipeline, PipelineObserver,
    PipelineState, ProgressCallback, StoryConfig, StoryOutline, StoryOutput, View,
    PROCESSING_MESSAGE,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Prints the confirm line on selection and runs a spinner while the story
/// is being made.
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn start_spinner(&self, name: &str) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.magenta} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["✨", "🌟", "⭐", "💫", "🌈"]),
        );
        bar.set_prefix(name.to_string());
        bar.set_message(PROCESSING_MESSAGE);
        bar.enable_steady_tick(Duration::from_millis(120));
        *self.bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(bar);
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            bar.finish_and_clear();
        }
    }
}

impl PipelineObserver for CliObserver {
    fn on_state_change(&self, state: &PipelineState) {
        match state {
            PipelineState::HasCandidate(_) => {
                eprintln!("{}", bold(&View::from_state(state).headline()));
            }
            PipelineState::Processing(c) => self.start_spinner(c.name()),
            PipelineState::Resolved { .. } => self.stop_spinner(),
            PipelineState::Idle => {}
        }
    }

    fn on_generation_start(&self, _name: &str, mime_type: &str, payload_len: usize) {
        if let Some(ref bar) = *self.bar.lock().unwrap_or_else(|e| e.into_inner()) {
            bar.println(format!(
                "  {} sending {} ({})",
                dim("→"),
                mime_type,
                dim(&format!("{:.2} MB base64", payload_len as f64 / 1024.0 / 1024.0))
            ));
        }
    }

    fn on_generation_complete(&self, elapsed_ms: u64, success: bool) {
        if let Some(ref bar) = *self.bar.lock().unwrap_or_else(|e| e.into_inner()) {
            bar.println(format!(
                "  {} answer after {}",
                if success { green("✓") } else { red("✗") },
                dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
            ));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Story on stdout
  kiddopdf lesson.pdf

  # Story to a file (print it from there)
  kiddopdf worksheet.png -o story.md

  # From a URL, with a local time limit
  kiddopdf https://example.com/chapter3.pdf --api-timeout 300

  # Another provider through edgequake-llm
  kiddopdf --provider openai --model gpt-4.1-mini page.jpg

  # JSON with the page outline
  kiddopdf --json lesson.pdf > story.json

ACCEPTED FILES:
  .pdf  .png  .jpg  .jpeg   (one file per run)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  MISTRAL_API_KEY         Mistral API key
  KIDDOPDF_API_KEY        Key for any other provider
  RUST_LOG                Overrides the log filter
"#;

/// Turn a PDF or picture into a story a 5-year-old can follow.
#[derive(Parser, Debug)]
#[command(
    name = "kiddopdf",
    version,
    about = "Turn a PDF or picture into a complete Hinglish story for kids",
    long_about = "Reads a PDF, PNG or JPEG (local file or URL), sends it to a generative model \
in a single request and prints a page-by-page Hinglish story written for a 5-year-old. \
Uses Google Gemini by default; any edgequake-llm provider can be selected instead.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/PNG/JPEG path or HTTP/HTTPS URL.
    input: String,

    /// Write the story to this file instead of stdout.
    #[arg(short, long, env = "KIDDOPDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Provider: gemini (native), or any edgequake-llm provider name.
    #[arg(long, env = "KIDDOPDF_PROVIDER", default_value = kiddopdf::config::DEFAULT_PROVIDER)]
    provider: String,

    /// Model ID.
    #[arg(long, env = "KIDDOPDF_MODEL", default_value = kiddopdf::config::DEFAULT_MODEL)]
    model: String,

    /// API key. Defaults to the provider's usual environment variable.
    #[arg(long)]
    api_key: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "KIDDOPDF_ENDPOINT", default_value = kiddopdf::config::DEFAULT_GEMINI_BASE_URL)]
    endpoint: String,

    /// Path to a text file replacing the built-in story instruction.
    #[arg(long, env = "KIDDOPDF_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0). Model default when unset.
    #[arg(long, env = "KIDDOPDF_TEMPERATURE")]
    temperature: Option<f32>,

    /// Cap on output tokens. Unlimited when unset; low caps cut stories short.
    #[arg(long, env = "KIDDOPDF_MAX_OUTPUT_TOKENS")]
    max_output_tokens: Option<u32>,

    /// Local time limit for the generation call in seconds. None when unset.
    #[arg(long, env = "KIDDOPDF_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "KIDDOPDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (story, outline, stats) instead of Markdown.
    #[arg(long, env = "KIDDOPDF_JSON")]
    json: bool,

    /// Print the page outline to stderr after the story.
    #[arg(long)]
    outline: bool,

    /// Disable the spinner.
    #[arg(long, env = "KIDDOPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "KIDDOPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "KIDDOPDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO logs
    // out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", red("✘"), e);
            ExitCode::FAILURE
        }
    }
}

/// One select → submit cycle. `Ok(false)` means the story failed and the
/// error view was already printed.
async fn run(cli: &Cli, show_progress: bool) -> Result<bool> {
    let observer: Option<ProgressCallback> = if show_progress {
        Some(CliObserver::new() as Arc<dyn PipelineObserver>)
    } else {
        None
    };
    let config = build_config(cli, observer).await?;

    let start = Instant::now();
    let candidate = match resolve_input(&cli.input, config.download_timeout_secs).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", red(&error_banner(&e.to_string())));
            return Ok(false);
        }
    };
    let pipeline = Pipeline::from_config(&config).context("Could not set up the story maker")?;

    pipeline.select(candidate.clone())?;
    if !show_progress && !cli.quiet && !cli.json {
        eprintln!("{}", View::from_state(&pipeline.state()).headline());
    }

    let story = match pipeline.submit().await? {
        GenerationResult::Success(story) => story,
        GenerationResult::Failure(_) => {
            let view = View::from_state(&pipeline.state());
            eprintln!("{}", red(&view.headline()));
            return Ok(false);
        }
    };
    let output = StoryOutput::from_story(&candidate, story, start.elapsed());

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        match cli.output {
            Some(ref path) => export_story(&json, path).await?,
            None => println!("{json}"),
        }
    } else if let Some(ref path) = cli.output {
        export_story(&output.story, path).await?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.story.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.story.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{}  {}",
            View::from_state(&pipeline.state()).headline(),
            dim(&format!("{}ms", output.stats.duration_ms))
        );
    }
    if cli.outline {
        print_outline(&output.outline);
    }
    Ok(true)
}

fn print_outline(outline: &StoryOutline) {
    if outline.sections.is_empty() {
        eprintln!("{}", dim("(no page markers found)"));
    }
    for section in &outline.sections {
        eprintln!(
            "  page {:>3}  {}",
            section.page,
            dim(&format!("{} chars", section.body.chars().count()))
        );
    }
    eprintln!(
        "  completion proof: {}",
        if outline.has_completion_proof {
            green("yes")
        } else {
            red("no")
        }
    );
}

/// Map CLI args to `StoryConfig`.
async fn build_config(cli: &Cli, observer: Option<ProgressCallback>) -> Result<StoryConfig> {
    let mut builder = StoryConfig::builder()
        .provider_name(&cli.provider)
        .model(&cli.model)
        .api_base_url(&cli.endpoint)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.credential(Credential::new(key));
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_output_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(obs) = observer {
        builder = builder.observer(obs);
    }

    builder.build().context("Invalid configuration")
}
