mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::defaults::DefaultsArgs;
use commands::irr::IrrArgs;
use commands::periods::PeriodsArgs;
use commands::portfolio::PortfolioArgs;
use commands::project_finance::ProjectFinanceArgs;
use commands::sizing::SizeDebtArgs;

/// Renewable energy project finance and debt sizing
#[derive(Parser)]
#[command(
    name = "rfm",
    version,
    about = "Renewable energy project finance and debt sizing",
    long_about = "A CLI for sizing sculpted project debt against DSCR targets and building \
                  equity returns for solar, wind and storage assets with decimal precision. \
                  Supports single assets, portfolios, period calendars and IRR checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level (off, error, warn, info, debug, trace); overrides RFM_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Size debt and compute equity returns for one asset
    ProjectFinance(ProjectFinanceArgs),
    /// Run only the debt sizing search for one asset
    SizeDebt(SizeDebtArgs),
    /// Finance several assets and aggregate their equity cash flows
    Portfolio(PortfolioArgs),
    /// List the analysis periods for a start date and horizon
    Periods(PeriodsArgs),
    /// Internal rate of return of a cash flow series
    Irr(IrrArgs),
    /// Default financing terms for a technology
    Defaults(DefaultsArgs),
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

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.as_deref()) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(2);
    }

    let result: commands::CommandResult = match cli.command {
        Commands::ProjectFinance(args) => commands::project_finance::run_project_finance(args),
        Commands::SizeDebt(args) => commands::sizing::run_size_debt(args),
        Commands::Portfolio(args) => commands::portfolio::run_portfolio(args),
        Commands::Periods(args) => commands::periods::run_periods(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Defaults(args) => commands::defaults::run_defaults(args),
        Commands::Version => {
            println!("rfm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
