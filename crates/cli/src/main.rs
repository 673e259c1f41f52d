use clap::{Parser, Subcommand};

mod commands;
mod service;

use commands::{CheckConfigArgs, HistoryArgs, PollOnceArgs};
use price_alert_core::config_loader::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "price-alert")]
#[command(about = "Stock price monitor with threshold and jump alerts", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor with the HTTP API until SIGINT/SIGTERM
    Run,
    /// Run a single polling cycle and print its report
    PollOnce(PollOnceArgs),
    /// Print stored price history for a symbol
    History(HistoryArgs),
    /// Load and validate the configuration, then print what it resolves to
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if let Some(path) = &cli.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }

    match cli.command {
        Commands::Run => {
            service::run_service(&cli.config).await?;
        }
        Commands::PollOnce(args) => {
            commands::run_poll_once(&cli.config, args).await?;
        }
        Commands::History(args) => {
            commands::run_history(&cli.config, args).await?;
        }
        Commands::CheckConfig(args) => {
            commands::run_check_config(&cli.config, &args)?;
        }
    }

    Ok(())
}
