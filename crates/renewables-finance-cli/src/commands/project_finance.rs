use chrono::Datelike;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use renewables_finance_core::periods::{parse_month_start, PeriodFrequency};
use renewables_finance_core::project_finance::{
    model_project_finance, FinanceConfig, FinancialParameters, ProjectFinanceInput, RevenuePoint,
    RevenueSchedule,
};

use super::{log_warnings, CommandResult, FrequencyArg, TechnologyArg};
use crate::input;

/// Arguments for a full project finance run
#[derive(Args)]
pub struct ProjectFinanceArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Asset technology used to seed financing defaults
    #[arg(long, value_enum, default_value = "solar")]
    pub technology: TechnologyArg,

    /// Total capex
    #[arg(long)]
    pub capex: Option<Decimal>,

    /// Flat annual revenue
    #[arg(long)]
    pub annual_revenue: Option<Decimal>,

    /// Share of revenue under contract (0-1)
    #[arg(long, default_value = "1")]
    pub contracted_share: Decimal,

    /// Commercial operation date (YYYY-MM-DD)
    #[arg(long, default_value = "2027-01-01")]
    pub start_date: String,

    /// Operational years to model
    #[arg(long, default_value_t = 25)]
    pub horizon_years: u32,

    /// Period length
    #[arg(long, value_enum, default_value = "monthly")]
    pub frequency: FrequencyArg,

    /// Gear at the cap instead of searching for the DSCR-feasible maximum
    #[arg(long)]
    pub fixed_gearing: bool,
}

pub fn run_project_finance(args: ProjectFinanceArgs) -> CommandResult {
    let pf_input: ProjectFinanceInput = match input::load(args.input.as_deref(), "project finance")? {
        Some(pf_input) => pf_input,
        None => input_from_flags(&args)?,
    };

    log::info!(
        "Modelling '{}' from {} over {} years",
        pf_input.asset_name,
        pf_input.asset_start_date,
        pf_input.analysis_horizon_years
    );
    let output = model_project_finance(&pf_input)?;
    log::info!(
        "Sized debt {} ({:?}, {} iterations)",
        output.result.debt_amount,
        output.result.sizing_method,
        output.result.iterations
    );
    log_warnings(&pf_input.asset_name, &output.warnings);
    Ok(serde_json::to_value(output)?)
}

/// Build a single-asset input with flat revenue from command-line flags.
pub fn input_from_flags(args: &ProjectFinanceArgs) -> Result<ProjectFinanceInput, Box<dyn std::error::Error>> {
    let capex = args
        .capex
        .ok_or("--capex is required (or provide --input)")?;
    let annual_revenue = args
        .annual_revenue
        .ok_or("--annual-revenue is required (or provide --input)")?;
    if args.contracted_share < Decimal::ZERO || args.contracted_share > Decimal::ONE {
        return Err("--contracted-share must be between 0 and 1".into());
    }

    let frequency: PeriodFrequency = args.frequency.into();
    let start = parse_month_start(&args.start_date)?;
    let financial_parameters = FinancialParameters::for_technology(args.technology.into(), capex);

    let monthly = annual_revenue / dec!(12);
    let point = RevenuePoint::new(
        monthly * args.contracted_share,
        monthly * (Decimal::ONE - args.contracted_share),
    );
    let first_year = start.year();
    let mut revenue = RevenueSchedule::new();
    for year in first_year..=first_year + args.horizon_years as i32 {
        for month in 1..=12 {
            revenue.insert(year, Some(month), point.clone());
        }
    }

    Ok(ProjectFinanceInput {
        asset_name: format!("{:?} asset", args.technology),
        asset_start_date: args.start_date.clone(),
        analysis_horizon_years: args.horizon_years,
        financial_parameters,
        config: FinanceConfig {
            solve_optimal_gearing: !args.fixed_gearing,
            frequency,
            ..FinanceConfig::default()
        },
        revenue,
    })
}
