//! DirShare CLI — process entry point for the per-participant
//! synchronisation engine.
//!
//! This binary owns everything the engine itself treats as an external
//! collaborator: argv parsing, directory validation, logging
//! initialization, configuration loading, and process lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use dirshare_core::config::Config;
use dirshare_engine::transport::LoopbackTransport;
use dirshare_engine::EngineLoop;

#[derive(Parser)]
#[command(
    name = "dirshare",
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Peer-to-peer directory synchronisation engine",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file path (default: platform config dir)
    #[arg(long, global = true, env = "DIRSHARE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and synchronise it with connected peers
    Run(RunArgs),

    /// Print the resolved configuration and exit
    Config(ConfigArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Directory to share and keep in sync
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Directory-scan polling interval in seconds
    #[arg(long)]
    scan_interval: Option<u64>,

    /// Transport backend to use ("loopback" is the only built-in value;
    /// it runs an in-memory bus local to this process and is intended for
    /// local testing and demos, not cross-host sync)
    #[arg(long, default_value = "loopback")]
    transport: String,
}

#[derive(Args)]
struct ConfigArgs {
    /// Print the sample/default configuration instead of the resolved one
    #[arg(long)]
    sample: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Run(args) => run_engine(args, config).await,
        Commands::Config(args) => run_config(args, config),
    }
}

fn setup_logging(cli: &Cli) {
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose >= 2)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => Ok(Config::load_from(path)?),
        None => Ok(Config::load()),
    }
}

async fn run_engine(args: &RunArgs, config: Config) -> anyhow::Result<()> {
    if !args.path.is_dir() {
        error!("not a directory: {}", args.path.display());
        anyhow::bail!("shared directory does not exist or is not a directory: {}", args.path.display());
    }

    if args.transport != "loopback" {
        anyhow::bail!(
            "unknown transport {:?}; only \"loopback\" is built in (a real deployment supplies its own dirshare_engine::transport::Transport impl)",
            args.transport
        );
    }

    let scan_interval = Duration::from_secs(args.scan_interval.unwrap_or(config.scan.scan_interval_secs));

    let bus = LoopbackTransport::new();
    let (participant, inbound) = bus.participant();

    let engine = EngineLoop::new(args.path.canonicalize()?, Arc::new(participant), inbound, scan_interval);
    info!(
        "{}: watching {} (transport=loopback, scan_interval={:?})",
        engine.participant_id(),
        args.path.display(),
        scan_interval
    );

    engine.run().await;
    info!("shutdown complete");
    Ok(())
}

fn run_config(args: &ConfigArgs, config: Config) -> anyhow::Result<()> {
    let rendered = if args.sample {
        Config::sample()
    } else {
        toml::to_string_pretty(&config)?
    };
    println!("{}", rendered);
    Ok(())
}
