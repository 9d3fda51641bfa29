//! CLI for auction-house invoice normalization and ledger submission.

mod commands;
mod ledger_http;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, map, normalize, submit, validate};

/// lotbill - Turn extracted auction invoices into ledger bills
#[derive(Parser)]
#[command(name = "lotbill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an extraction payload into a canonical invoice
    Normalize(normalize::NormalizeArgs),

    /// Map an extraction payload to a draft ledger bill
    Map(map::MapArgs),

    /// Report review issues for an extraction payload
    Validate(validate::ValidateArgs),

    /// Normalize and map multiple payloads
    Batch(batch::BatchArgs),

    /// Submit a payload to the ledger as a draft bill
    Submit(submit::SubmitArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Normalize(args) => normalize::run(args).await,
        Commands::Map(args) => map::run(args, config_path).await,
        Commands::Validate(args) => validate::run(args).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Submit(args) => submit::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
