use clap::Args;
use rust_decimal::Decimal;

use renewables_finance_core::project_finance::FinancialParameters;

use super::{CommandResult, TechnologyArg};

/// Arguments for technology default financing terms
#[derive(Args)]
pub struct DefaultsArgs {
    #[arg(long, value_enum)]
    pub technology: TechnologyArg,

    /// Total capex the defaults are scaled to
    #[arg(long, default_value = "100")]
    pub capex: Decimal,
}

pub fn run_defaults(args: DefaultsArgs) -> CommandResult {
    let params = FinancialParameters::for_technology(args.technology.into(), args.capex);
    params.validate()?;
    Ok(serde_json::to_value(params)?)
}
