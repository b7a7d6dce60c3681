use clap::Args;

use renewables_finance_core::periods::generate_periods;

use super::{CommandResult, FrequencyArg};

/// Arguments for period generation
#[derive(Args)]
pub struct PeriodsArgs {
    /// Commercial operation date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: String,

    /// Months of construction before the start date
    #[arg(long, default_value_t = 0)]
    pub construction_months: i32,

    /// Operational years after the start date
    #[arg(long, default_value_t = 25)]
    pub horizon_years: u32,

    #[arg(long, value_enum, default_value = "monthly")]
    pub frequency: FrequencyArg,
}

pub fn run_periods(args: PeriodsArgs) -> CommandResult {
    let periods = generate_periods(
        &args.start_date,
        args.construction_months,
        args.horizon_years,
        args.frequency.into(),
    )?;
    log::info!("Generated {} periods", periods.len());
    Ok(serde_json::to_value(periods)?)
}
