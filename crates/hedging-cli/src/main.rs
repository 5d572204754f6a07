mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::compare::CompareArgs;
use commands::hedge_ratio::HedgeRatioArgs;
use commands::risk::RiskArgs;
use commands::sensitivity::SensitivityArgs;

/// Commodity hedging strategy analytics
#[derive(Parser)]
#[command(
    name = "hedge",
    version,
    about = "Compare commodity hedging strategies",
    long_about = "A CLI for comparing commodity hedging strategies on spot and futures \
                  price history with decimal precision. Supports no-hedge, naive, fixed-ratio, \
                  rolling minimum-variance and basis-risk hedges, VaR/CVaR risk metrics, and \
                  sensitivity sweeps."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation details to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare all five hedging strategies on a price file
    Compare(CompareArgs),
    /// Rolling minimum-variance hedge ratio series
    HedgeRatio(HedgeRatioArgs),
    /// Volatility, VaR, CVaR and drawdown of a return series
    Risk(RiskArgs),
    /// Sweep configuration values and read one strategy metric
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compare(args) => commands::compare::run_compare(args),
        Commands::HedgeRatio(args) => commands::hedge_ratio::run_hedge_ratio(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("hedge {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
