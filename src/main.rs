use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use settle::{JobCode, SettlementDate};

mod cmd;

#[derive(Parser)]
#[command(name = "settle")]
#[command(version, about = "Batch settlement workflow console")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Path to settle.toml (defaults to ./settle.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL. Overrides settle.toml and SETTLE_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the jobs of a settlement date
    Jobs {
        /// Settlement date (YYYYMMDD, YYYY/MM/DD or YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<SettlementDate>,
    },
    /// Create the batch for a date without running it
    Init {
        #[arg(short, long)]
        date: Option<SettlementDate>,
    },
    /// Initiate and run the whole batch, stopping at the first failed job
    Batch {
        #[arg(short, long)]
        date: Option<SettlementDate>,

        /// Wait after initiation and after each step, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// UI output mode: full, json
        #[arg(long, default_value = "full")]
        ui: String,
    },
    /// Run a single job, whatever its current state
    Step {
        code: JobCode,

        #[arg(short, long)]
        date: Option<SettlementDate>,
    },
    /// Download a job's output file
    Download {
        code: JobCode,

        #[arg(short, long)]
        date: Option<SettlementDate>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// View or create configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default settle.toml file
    Init,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "settle=debug" } else { "settle=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let today = SettlementDate::today;

    match &cli.command {
        Commands::Jobs { date } => {
            cmd::cmd_jobs(&cli, &project_dir, date.unwrap_or_else(today)).await?
        }
        Commands::Init { date } => {
            cmd::cmd_init(&cli, &project_dir, date.unwrap_or_else(today)).await?
        }
        Commands::Batch {
            date,
            pacing_ms,
            ui,
        } => {
            cmd::cmd_batch(
                &cli,
                &project_dir,
                date.unwrap_or_else(today),
                *pacing_ms,
                ui.parse().unwrap_or_default(),
            )
            .await?
        }
        Commands::Step { code, date } => {
            cmd::cmd_step(&cli, &project_dir, date.unwrap_or_else(today), *code).await?
        }
        Commands::Download { code, date, out } => {
            cmd::cmd_download(&cli, &project_dir, date.unwrap_or_else(today), *code, out).await?
        }
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    }

    Ok(())
}
