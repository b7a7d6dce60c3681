use clap::Args;
use serde_json::json;

use renewables_finance_core::project_finance::{size_debt_for, ProjectFinanceInput};

use super::project_finance::{input_from_flags, ProjectFinanceArgs};
use super::CommandResult;
use crate::input;

/// Arguments for debt sizing only
#[derive(Args)]
pub struct SizeDebtArgs {
    #[command(flatten)]
    pub asset: ProjectFinanceArgs,

    /// Include the full debt service schedule in the output
    #[arg(long)]
    pub schedule: bool,
}

pub fn run_size_debt(args: SizeDebtArgs) -> CommandResult {
    let pf_input: ProjectFinanceInput = match input::load(args.asset.input.as_deref(), "debt sizing")? {
        Some(pf_input) => pf_input,
        None => input_from_flags(&args.asset)?,
    };
    let params = &pf_input.financial_parameters;
    let sizing = size_debt_for(&pf_input)?;
    log::info!(
        "'{}': debt {} after {} probes ({:?})",
        pf_input.asset_name,
        sizing.debt_amount,
        sizing.iterations,
        sizing.method
    );
    if !sizing.solved {
        log::warn!(
            "'{}': no feasible debt level, reporting {}",
            pf_input.asset_name,
            sizing.debt_amount
        );
    }
    for probe in &sizing.probes {
        log::debug!(
            "probe {}: debt {} feasible={} final_balance={}",
            probe.iteration,
            probe.debt_amount,
            probe.feasible,
            probe.final_balance
        );
    }

    let mut value = json!({
        "result": {
            "asset_name": pf_input.asset_name,
            "debt_amount": sizing.debt_amount,
            "max_debt": params.max_debt(),
            "gearing": sizing.debt_amount / params.total_capex,
            "solved": sizing.solved,
            "method": sizing.method,
            "iterations": sizing.iterations,
            "fully_repaid": sizing.simulation.feasibility.fully_repaid,
            "final_balance": sizing.simulation.feasibility.final_balance,
            "min_dscr": sizing.simulation.feasibility.min_dscr,
            "capitalized_interest": sizing.simulation.capitalized_interest(),
            "probes": sizing.probes,
        }
    });
    if args.schedule {
        value["result"]["debt_service_schedule"] = serde_json::to_value(&sizing.simulation.schedule)?;
    }
    Ok(value)
}
