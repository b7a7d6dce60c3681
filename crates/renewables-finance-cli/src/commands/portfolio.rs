use clap::Args;

use renewables_finance_core::portfolio::{compute_portfolio, PortfolioInput};

use super::{log_warnings, CommandResult};
use crate::input;

/// Arguments for a multi-asset portfolio run
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_portfolio(args: PortfolioArgs) -> CommandResult {
    let portfolio: PortfolioInput = input::require(args.input.as_deref(), "portfolio")?;
    log::info!(
        "Running portfolio '{}' with {} assets",
        portfolio.portfolio_name,
        portfolio.assets.len()
    );
    let output = compute_portfolio(&portfolio)?;
    log_warnings(&portfolio.portfolio_name, &output.warnings);
    Ok(serde_json::to_value(output)?)
}
