//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use post_scorer_core::pipeline::{self, PipelineConfig, PipelineSummary, ProgressReporter};
use post_scorer_core::{LinkPolicy, ReportFormat, ScoreContext};
use post_scorer_openai::{OpenAiScorer, ScorerConfig};
use post_scorer_shared::{
    AppConfig, init_config, load_config, load_config_from, read_prompt, resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// post-scorer: rate discussion posts for relevance.
#[derive(Parser)]
#[command(
    name = "post-scorer",
    version,
    about = "Load posts and comments from CSV and score each post with an LLM.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv). Overrides LOG_LEVEL.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.post-scorer/post-scorer.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Report output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load, link, score and print posts.
    Score(ScoreArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `score`. Unset options fall back to the config file.
#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Posts CSV (`id,title,body`).
    #[arg(long)]
    pub posts: Option<PathBuf>,

    /// Comments CSV (`post_id,body`).
    #[arg(long)]
    pub comments: Option<PathBuf>,

    /// Prompt file with the scoring instructions.
    #[arg(long)]
    pub prompt: Option<PathBuf>,

    /// Chat model to score with.
    #[arg(long)]
    pub model: Option<String>,

    /// Posts per API request.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Give up on scoring after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fail on comments that reference an unknown post.
    #[arg(long)]
    pub strict: bool,

    /// Report format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
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

/// Map a `LOG_LEVEL` value to a filter level. Unknown or unset means `error`.
pub(crate) fn log_level(value: Option<&str>) -> &'static str {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        _ => "error",
    }
}

/// Initialize tracing based on CLI flags and `LOG_LEVEL`.
///
/// Logs go to stderr; stdout carries only the report.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => log_level(std::env::var("LOG_LEVEL").ok().as_deref()),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("post_scorer={level}")));

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
        Command::Score(args) => cmd_score(cli.config, args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config),
        },
    }
}

fn resolve_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(&p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn cmd_score(config_path: Option<PathBuf>, args: ScoreArgs) -> Result<()> {
    let config = resolve_config(config_path)?;

    // Startup preconditions: credential and prompt must exist before scoring.
    let api_key = resolve_api_key(&config)?;
    let prompt_path = args
        .prompt
        .unwrap_or_else(|| PathBuf::from(&config.scoring.prompt_file));
    let prompt_text = read_prompt(&prompt_path).wrap_err("reading prompt file")?;

    let scorer = OpenAiScorer::new(ScorerConfig {
        api_key,
        prompt_text,
        model: args.model.unwrap_or_else(|| config.openai.model.clone()),
        base_url: config.openai.base_url.clone(),
        batch_size: args.batch_size.unwrap_or(config.scoring.batch_size),
        timeout_secs: config.openai.request_timeout_secs,
    })
    .wrap_err("failed to create scorer")?;

    let mut ctx = ScoreContext::new();
    if let Some(secs) = args.timeout.or(config.scoring.timeout_secs) {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }

    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            canceller.cancel();
        }
    });

    let link_policy = if args.strict || config.input.strict_comments {
        LinkPolicy::Strict
    } else {
        LinkPolicy::Lenient
    };

    let pipeline_config = PipelineConfig {
        posts_path: args
            .posts
            .unwrap_or_else(|| PathBuf::from(&config.input.posts_file)),
        comments_path: args
            .comments
            .unwrap_or_else(|| PathBuf::from(&config.input.comments_file)),
        link_policy,
        format: args.format.into(),
    };

    info!(
        posts = %pipeline_config.posts_path.display(),
        comments = %pipeline_config.comments_path.display(),
        prompt = %prompt_path.display(),
        ?link_policy,
        "scoring posts"
    );

    // Rendered into a buffer so the spinner is gone before anything hits stdout.
    let mut report = Vec::new();
    {
        let reporter = CliProgress::new();
        pipeline::run_pipeline(&pipeline_config, &ctx, &scorer, &mut report, &reporter).await?;
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&report)?;
    stdout.flush()?;

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let (path, created) = init_config()?;
    if created {
        println!("Config initialized at: {}", path.display());
    } else {
        println!("Config already exists at: {} (left unchanged)", path.display());
    }
    Ok(())
}

fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, summary: &PipelineSummary) {
        self.spinner.finish_and_clear();
        info!(
            posts = summary.posts,
            scored = summary.scored,
            comments_dropped = summary.comments_dropped,
            "done in {:.1}s",
            summary.elapsed.as_secs_f64()
        );
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_level_mapping() {
        assert_eq!(log_level(Some("DEBUG")), "debug");
        assert_eq!(log_level(Some("info")), "info");
        assert_eq!(log_level(Some("Warn")), "warn");
        assert_eq!(log_level(Some("error")), "error");
        assert_eq!(log_level(Some("verbose")), "error");
        assert_eq!(log_level(None), "error");
    }

    #[test]
    fn score_args_parse() {
        let cli = Cli::try_parse_from([
            "post-scorer",
            "-v",
            "score",
            "--posts",
            "p.csv",
            "--comments",
            "c.csv",
            "--batch-size",
            "5",
            "--strict",
            "--format",
            "json",
        ])
        .expect("parse");

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Score(args) => {
                assert_eq!(args.posts, Some(PathBuf::from("p.csv")));
                assert_eq!(args.batch_size, Some(5));
                assert!(args.strict);
                assert_eq!(ReportFormat::from(args.format), ReportFormat::Json);
                assert!(args.prompt.is_none());
            }
            Command::Config { .. } => panic!("expected score"),
        }
    }
}
