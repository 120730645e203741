//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadscout_agents::{Collaborators, GeminiClient, LinkdClient, OutreachComposer};
use leadscout_core::{ProgressReporter, RunOutcome};
use leadscout_shared::{
    AppConfig, EventDescription, PipelineConfig, config_file_path, init_config, load_config,
    resolve_api_key, validate_api_keys,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Leadscout — find sponsors and speakers for your event.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Turn an event description into a ranked shortlist of outreach leads.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the discovery pipeline for an event.
    Discover {
        /// Path to an event description JSON file.
        event: Option<PathBuf>,

        /// Use the built-in sample event instead of a file.
        #[arg(long)]
        sample: bool,

        /// Number of leads to return.
        #[arg(long)]
        top_n: Option<usize>,

        /// Maximum refinement rounds.
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Maximum results requested per search query.
        #[arg(long)]
        limit: Option<u32>,

        /// Skip drafting outreach messages for the final leads.
        #[arg(long)]
        no_outreach: bool,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Discover {
            event,
            sample,
            top_n,
            max_rounds,
            limit,
            no_outreach,
        } => {
            cmd_discover(
                event.as_deref(),
                sample,
                top_n,
                max_rounds,
                limit,
                no_outreach,
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_discover(
    event_path: Option<&std::path::Path>,
    sample: bool,
    top_n: Option<usize>,
    max_rounds: Option<u32>,
    limit: Option<u32>,
    no_outreach: bool,
) -> Result<()> {
    // Validate API keys before doing anything
    let config = load_config()?;
    validate_api_keys(&config)?;

    let event = match (event_path, sample) {
        (_, true) => sample_event(),
        (Some(path), false) => load_event(path)?,
        (None, false) => {
            return Err(eyre!(
                "no event given: pass a JSON file or use --sample"
            ));
        }
    };

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(n) = top_n {
        pipeline_config.top_n = n;
    }
    if let Some(rounds) = max_rounds {
        pipeline_config.max_rounds = rounds.max(1);
    }
    if let Some(limit) = limit {
        pipeline_config.search_limit = limit;
    }

    let gemini = build_gemini(&config)?;
    let linkd = LinkdClient::new(&config.linkd, resolve_api_key(&config.linkd.api_key_env, "Linkd")?)?;
    let collaborators = Collaborators::production(gemini.clone(), linkd);

    info!(event = %event.name, "starting discovery");

    let reporter = CliProgress::new();
    let outcome = leadscout_core::run(&pipeline_config, &collaborators, &event, &reporter).await?;

    print_summary(&outcome);

    if no_outreach || outcome.leads.is_empty() {
        return Ok(());
    }

    let reporter = CliProgress::new();
    reporter.phase("Drafting outreach messages");
    for (rank, lead) in outcome.leads.iter().enumerate() {
        match gemini.compose(&lead.profile, &event, &lead.explanation).await {
            Ok(message) => {
                reporter.spinner.suspend(|| {
                    println!("--- Message for #{} {} ---", rank + 1, display_name(lead));
                    println!("{message}");
                    println!();
                });
            }
            Err(error) => {
                tracing::warn!(lead = %display_name(lead), %error, "outreach draft failed");
            }
        }
    }
    reporter.spinner.finish_and_clear();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build_gemini(config: &AppConfig) -> Result<GeminiClient> {
    let key = resolve_api_key(&config.gemini.api_key_env, "Gemini")?;
    Ok(GeminiClient::new(&config.gemini, key)?)
}

fn load_event(path: &std::path::Path) -> Result<EventDescription> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read event file '{}': {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| eyre!("invalid event JSON in '{}': {e}", path.display()))
}

/// Built-in demo event for trying the tool without writing JSON.
fn sample_event() -> EventDescription {
    EventDescription {
        name: "AI & Ethics Symposium".into(),
        date: "2026-05-18".into(),
        location: "UCLA, Los Angeles".into(),
        format: "in-person".into(),
        audience_size: "300 students and faculty".into(),
        target_groups: "CS and philosophy students, AI researchers, tech policy folks".into(),
        funding_need: "$15,000 across sponsorship tiers".into(),
        in_kind_needs: "catering, recording equipment".into(),
        speakers_needed: "keynote on AI governance plus two panelists from industry".into(),
        past_sponsors: "Anthropic, UCLA Samueli School of Engineering".into(),
        theme: "Building AI that deserves public trust".into(),
    }
}

fn display_name(lead: &leadscout_shared::ScoredCandidate) -> &str {
    lead.profile.name.as_deref().unwrap_or("(unnamed)")
}

fn print_summary(outcome: &RunOutcome) {
    println!();
    println!("  Discovery complete!");
    println!("  Run:        {}", outcome.run_id);
    println!("  Started:    {}", outcome.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Rounds:     {}", outcome.rounds);
    println!("  Candidates: {}", outcome.candidates_seen);
    println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    for (rank, lead) in outcome.leads.iter().enumerate() {
        println!("  #{} {} (score {})", rank + 1, display_name(lead), lead.score);
        if let Some(headline) = lead.profile.headline.as_deref() {
            if !headline.is_empty() {
                println!("     {headline}");
            }
        }
        if let Some(url) = lead.profile.linkedin_url.as_deref() {
            println!("     {url}");
        }
        if !lead.explanation.is_empty() {
            println!("     {}", lead.explanation);
        }
        println!();
    }
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
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn round_finished(&self, round: u32, candidates: usize) {
        self.spinner
            .set_message(format!("Round {round}: {candidates} unique candidates"));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}
