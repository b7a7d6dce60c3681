use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;

use renewables_finance_core::time_value::{self, DEFAULT_IRR_GUESS};

use super::CommandResult;

/// Arguments for a standalone IRR calculation
#[derive(Args)]
pub struct IrrArgs {
    /// Periodic cash flows (comma-separated, e.g. "-10,3,3,3,3,3")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Initial Newton-Raphson guess
    #[arg(long)]
    pub guess: Option<Decimal>,

    /// Periods per year, for the annualised rate
    #[arg(long, default_value_t = 1)]
    pub periods_per_year: u32,
}

pub fn run_irr(args: IrrArgs) -> CommandResult {
    if args.periods_per_year == 0 {
        return Err("--periods-per-year must be at least 1".into());
    }
    let rate = time_value::irr(&args.cash_flows, args.guess.unwrap_or(DEFAULT_IRR_GUESS))?;
    let npv_at_rate = time_value::npv(rate, &args.cash_flows)?;
    Ok(json!({
        "result": {
            "irr": rate,
            "irr_annualised": time_value::annualize(rate, args.periods_per_year),
            "npv_at_irr": npv_at_rate,
            "periods": args.cash_flows.len(),
        }
    }))
}
