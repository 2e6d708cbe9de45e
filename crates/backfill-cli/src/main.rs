//! Backfill - synthesized commit history CLI
//!
//! The `backfill` command fills a repository with a plausible, backdated
//! commit history and force-pushes it to a remote.
//!
//! ## Commands
//!
//! - `run`: initialize (once), replay a synthesized history, push
//! - `preview`: print the commit script that `run` would execute
//! - `create-repo`: create the remote repository through the provider API
//! - `publish`: `create-repo` followed by `run`

use anyhow::{Context, Result};
use backfill_core::{
    BackfillConfig, BackfillError, GitBackend, Orchestrator, RandomSource, RunReport, ScriptFormat,
    TOKEN_ENV,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use forge_client::{
    Creation, ForgeClient, ForgeConfig, NewRepository, RepositoryProvider, DEFAULT_API_BASE,
};
use std::path::PathBuf;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "backfill")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Synthesize a backdated commit history and publish it", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Provider API token
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the repository if needed, replay a synthesized history, and force-push
    Run {
        #[command(flatten)]
        history: HistoryArgs,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the generated commit script without touching any repository
    Preview {
        #[command(flatten)]
        history: HistoryArgs,
    },

    /// Create the remote repository (an existing one counts as success)
    CreateRepo {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        provider: ProviderArgs,
    },

    /// Create the remote repository, then run
    Publish {
        #[command(flatten)]
        history: HistoryArgs,

        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        provider: ProviderArgs,
    },
}

/// Options shaping the synthesized history.
#[derive(Args, Debug)]
struct HistoryArgs {
    /// Repository working directory
    #[arg(long)]
    repo: Option<PathBuf>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the range (YYYY-MM-DD, default: today)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Seed for a reproducible history
    #[arg(long)]
    seed: Option<u64>,

    /// Author and committer name
    #[arg(long)]
    author_name: Option<String>,

    /// Author and committer email
    #[arg(long)]
    author_email: Option<String>,

    /// Branch to create and push
    #[arg(long)]
    branch: Option<String>,

    /// Script dialect: sh or cmd
    #[arg(long)]
    format: Option<ScriptFormat>,
}

/// Where the history goes.
#[derive(Args, Debug)]
struct TargetArgs {
    /// Push URL (overrides owner/repo-name; no token needed)
    #[arg(long)]
    remote_url: Option<String>,

    /// Repository owner on the provider
    #[arg(long)]
    owner: Option<String>,

    /// Repository name on the provider
    #[arg(long)]
    repo_name: Option<String>,
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// Repository description
    #[arg(long)]
    description: Option<String>,

    /// Create a private repository
    #[arg(long)]
    private: bool,

    /// Provider API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    api_url: String,
}

impl HistoryArgs {
    fn apply(&self, cfg: &mut BackfillConfig) {
        if let Some(repo) = &self.repo {
            cfg.repo_path = repo.clone();
        }
        if let Some(start) = self.start {
            cfg.start = start;
        }
        if let Some(end) = self.end {
            cfg.end = Some(end);
        }
        if let Some(name) = &self.author_name {
            cfg.identity.name = name.clone();
        }
        if let Some(email) = &self.author_email {
            cfg.identity.email = email.clone();
        }
        if let Some(branch) = &self.branch {
            cfg.branch = branch.clone();
        }
        if let Some(format) = self.format {
            cfg.script_format = format;
        }
    }
}

impl TargetArgs {
    fn apply(&self, cfg: &mut BackfillConfig) {
        if let Some(url) = &self.remote_url {
            cfg.remote_url = Some(url.clone());
        }
        if let Some(owner) = &self.owner {
            cfg.owner = Some(owner.clone());
        }
        if let Some(name) = &self.repo_name {
            cfg.repo_name = Some(name.clone());
        }
    }
}

impl ProviderArgs {
    fn apply(&self, cfg: &mut BackfillConfig) {
        if let Some(description) = &self.description {
            cfg.description = description.clone();
        }
        if self.private {
            cfg.private = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    backfill_core::init_tracing(cli.json, level);

    let mut cfg = BackfillConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let today = chrono::Local::now().date_naive();
    let token = cli.token.as_deref();

    match cli.command {
        Commands::Run { history, target } => {
            history.apply(&mut cfg);
            target.apply(&mut cfg);
            cmd_run(&cfg, token, history.seed, today)
        }
        Commands::Preview { history } => {
            history.apply(&mut cfg);
            cmd_preview(&cfg, history.seed, today)
        }
        Commands::CreateRepo { target, provider } => {
            target.apply(&mut cfg);
            provider.apply(&mut cfg);
            cmd_create_repo(&cfg, token, &provider.api_url).await
        }
        Commands::Publish {
            history,
            target,
            provider,
        } => {
            history.apply(&mut cfg);
            target.apply(&mut cfg);
            provider.apply(&mut cfg);
            // Check the push target before creating anything remotely.
            cfg.resolve_remote_url(token)?;
            cfg.validate(today)?;
            cmd_create_repo(&cfg, token, &provider.api_url).await?;
            cmd_run(&cfg, token, history.seed, today)
        }
    }
}

fn random_source(seed: Option<u64>) -> RandomSource {
    match seed {
        Some(seed) => RandomSource::seeded(seed),
        None => RandomSource::from_entropy(),
    }
}

/// Run the orchestrator against the configured repository.
fn cmd_run(
    cfg: &BackfillConfig,
    token: Option<&str>,
    seed: Option<u64>,
    today: NaiveDate,
) -> Result<()> {
    // Configuration problems (including a missing token) stop us here,
    // before the repository is touched.
    let remote_url = cfg.resolve_remote_url(token)?;
    let settings = cfg.orchestrator_settings(today, remote_url)?;
    let synthesizer = cfg.synthesizer()?;

    std::fs::create_dir_all(&cfg.repo_path)
        .context(format!("Failed to create {:?}", cfg.repo_path))?;

    info!(
        "Backfilling {:?} from {} to {}",
        cfg.repo_path,
        settings.range.start(),
        settings.range.end()
    );

    let mut orchestrator = Orchestrator::new(
        GitBackend::new(&cfg.repo_path),
        settings,
        synthesizer,
        cfg.materializer(),
    );
    let report = orchestrator.run(&mut random_source(seed))?;

    print_report(&report, cfg);

    if !report.succeeded() {
        anyhow::bail!(
            "run ended in state '{}' with {} failed command(s)",
            report.final_state,
            report.failures.len()
        );
    }
    Ok(())
}

fn print_report(report: &RunReport, cfg: &BackfillConfig) {
    println!("Run {}", report.run_id);
    println!("State:          {}", report.final_state);
    println!(
        "Initialized:    {}",
        if report.initialized_now { "yes" } else { "already" }
    );
    println!("Synthesized:    {} commits", report.commit_events);
    if let Some(len) = report.history_length {
        println!("History length: {len}");
    }
    if let Some(path) = &report.script_path {
        println!("Script:         {} (removed)", path.display());
    }
    if report.succeeded() {
        if let Some(url) = cfg.repository_web_url() {
            println!("Repository:     {url}");
        }
    }

    for failure in &report.failures {
        eprintln!("FAILED {failure}");
        let stdout = failure.failure.stdout.trim();
        if !stdout.is_empty() {
            eprintln!("  stdout: {stdout}");
        }
    }
}

/// Print the script a run would execute.
fn cmd_preview(cfg: &BackfillConfig, seed: Option<u64>, today: NaiveDate) -> Result<()> {
    cfg.validate(today)?;
    let events = backfill_core::synthesize_history(
        cfg.date_range(today)?,
        cfg.distribution,
        &cfg.synthesizer()?,
        &mut random_source(seed),
    )?;

    info!("Previewing {} synthesized commits", events.len());
    print!("{}", cfg.materializer().render(&events, &cfg.identity));
    Ok(())
}

/// Create the remote repository through the provider API.
async fn cmd_create_repo(cfg: &BackfillConfig, token: Option<&str>, api_url: &str) -> Result<()> {
    let token = token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| BackfillError::MissingCredential(TOKEN_ENV.to_string()))?;
    let name = cfg
        .repo_name
        .as_deref()
        .ok_or_else(|| BackfillError::Configuration("repo_name must be set".to_string()))?;

    let client = ForgeClient::new(ForgeConfig::new(api_url, token))
        .context("Failed to build provider client")?;
    let request = NewRepository::new(name, &cfg.description, cfg.private);

    match client
        .create_repository(&request)
        .await
        .context("Repository creation failed")?
    {
        Creation::Created => println!("Created repository '{name}'"),
        Creation::AlreadyExists { message } => {
            println!("Repository '{name}' already exists ({message})")
        }
    }
    Ok(())
}
