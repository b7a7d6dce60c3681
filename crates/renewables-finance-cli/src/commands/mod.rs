pub mod defaults;
pub mod irr;
pub mod periods;
pub mod portfolio;
pub mod project_finance;
pub mod sizing;

use clap::ValueEnum;

use renewables_finance_core::periods::PeriodFrequency;
use renewables_finance_core::project_finance::Technology;

/// Result type shared by every subcommand.
pub type CommandResult = Result<serde_json::Value, Box<dyn std::error::Error>>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Monthly,
    Quarterly,
    Annual,
}

impl From<FrequencyArg> for PeriodFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Monthly => PeriodFrequency::Monthly,
            FrequencyArg::Quarterly => PeriodFrequency::Quarterly,
            FrequencyArg::Annual => PeriodFrequency::Annual,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TechnologyArg {
    Solar,
    Wind,
    Storage,
}

impl From<TechnologyArg> for Technology {
    fn from(arg: TechnologyArg) -> Self {
        match arg {
            TechnologyArg::Solar => Technology::Solar,
            TechnologyArg::Wind => Technology::Wind,
            TechnologyArg::Storage => Technology::Storage,
        }
    }
}

/// Re-emit the warnings of a computation envelope through the logger.
pub fn log_warnings(context: &str, warnings: &[String]) {
    for warning in warnings {
        log::warn!("{context}: {warning}");
    }
}
