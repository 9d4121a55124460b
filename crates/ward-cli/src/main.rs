//! Ward CLI.
//!
//! Drives the wallet from a terminal: account creation, chain lookups,
//! and interactive signing through an in-process relay.

mod commands;
mod context;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use ward_types::Result;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Ward, a smart-contract account wallet for Cosmos chains.
#[derive(Parser)]
#[command(name = "ward", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Wallet configuration file (JSON). Defaults to the Injective testnet.
    #[arg(long, global = true, env = "WARD_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the credential store.
    #[arg(long, global = true, env = "WARD_DATA_DIR", default_value = ".ward")]
    data_dir: PathBuf,

    /// Overrides the host chain REST endpoint from the config.
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or import the wallet account.
    Init(commands::account::InitArgs),
    /// Show the address a mnemonic derives, without storing anything.
    Preview(commands::account::PreviewArgs),
    /// Show the local address and, optionally, its contracts.
    Address(commands::account::AddressArgs),
    /// Show account number and sequence on a chain.
    Sequence(commands::chain::SequenceArgs),
    /// Show slave contract balances on every configured chain.
    Balances,
    /// Show the host contract's recovery pool.
    Recovery,
    /// Sign a sign doc through the interactive prompt.
    Sign(commands::sign::SignArgs),
    /// Broadcast signed transaction bytes.
    Broadcast(commands::chain::BroadcastArgs),
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub config: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let opts = GlobalOpts {
        json: cli.json,
        config: cli.config,
        data_dir: cli.data_dir,
        endpoint: cli.endpoint,
    };

    if let Err(e) = dispatch(&opts, cli.command).await {
        output::print_error(&e.to_string(), opts.json);
        std::process::exit(1);
    }
}

async fn dispatch(opts: &GlobalOpts, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => commands::account::init(args, opts).await,
        Commands::Preview(args) => commands::account::preview(args, opts),
        Commands::Address(args) => commands::account::address(args, opts).await,
        Commands::Sequence(args) => commands::chain::sequence(args, opts).await,
        Commands::Balances => commands::chain::balances(opts).await,
        Commands::Recovery => commands::chain::recovery(opts).await,
        Commands::Sign(args) => commands::sign::run(args, opts).await,
        Commands::Broadcast(args) => commands::chain::broadcast(args, opts).await,
    }
}
