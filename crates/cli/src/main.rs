//! Settle CLI - settle command

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use settle_core::DebounceConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// Settle - run things once the input goes quiet
#[derive(Parser)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./settle.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Debounce stdin lines: emit the last line of each burst
    Pipe {
        #[command(flatten)]
        timing: TimingArgs,

        /// Shell command to run instead of printing (line in $SETTLE_LINE)
        #[arg(long)]
        exec: Option<String>,
    },
    /// Watch a directory and report coalesced change batches
    Watch {
        /// Directory to watch
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        timing: TimingArgs,

        /// Print batches as JSON lines
        #[arg(long)]
        json: bool,

        /// Shell command to run after each batch (paths in $SETTLE_PATHS)
        #[arg(long)]
        exec: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

/// Timing overrides shared by pipe and watch
#[derive(Args)]
struct TimingArgs {
    /// Quiet period before firing, in milliseconds
    #[arg(short = 'd', long)]
    delay_ms: Option<u64>,

    /// Fire at least this often under continuous input, in milliseconds
    #[arg(long)]
    max_wait_ms: Option<u64>,
}

impl TimingArgs {
    fn apply(&self, mut config: DebounceConfig) -> Result<DebounceConfig> {
        if let Some(delay_ms) = self.delay_ms {
            config.delay = Duration::from_millis(delay_ms);
        }
        if let Some(max_wait_ms) = self.max_wait_ms {
            config.max_wait = Some(Duration::from_millis(max_wait_ms));
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    let (config, source) = settle_cli::config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Pipe { timing, exec } => {
            cmd::pipe::run(timing.apply(config.debounce)?, exec).await
        }
        Commands::Watch { path, timing, json, exec } => {
            let debounce = timing.apply(config.debounce)?;
            cmd::watch::run(&path, config.watch, debounce, json, exec).await
        }
        Commands::Config => cmd::config::run(&config, source.as_deref()),
    }
}
