use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::cash_flows::{build_period_cash_flows, PeriodCashFlow};
use super::equity::{
    assemble_equity_cash_flows, equity_irr, equity_multiple, project_cash_flows, series_irr,
    terminal_value_credit, ConstructionCashFlow, EquityCashFlow,
};
use super::parameters::{FinanceConfig, FinancialParameters};
use super::revenue::{RevenueProvider, RevenueSchedule};
use super::simulator::{
    CapitalizationEntry, DebtPhase, DebtScheduleEntry, DebtSimulation, DebtTerms,
};
use super::sizing::{fixed_gearing_debt, size_debt, DebtSizing, SizingMethod, SizingProbe};
use crate::error::RenewablesFinanceError;
use crate::periods::{construction_period_count, generate_periods, validate_periods, Period};
use crate::time_value::{annualize, npv};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::RenewablesFinanceResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Serialisable description of a single asset run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFinanceInput {
    pub asset_name: String,
    /// Commercial operation date, `YYYY-MM-DD`
    pub asset_start_date: String,
    /// Operational years modelled after the start date
    pub analysis_horizon_years: u32,
    pub financial_parameters: FinancialParameters,
    #[serde(default)]
    pub config: FinanceConfig,
    /// Revenue by calendar slot; missing periods earn nothing
    #[serde(default)]
    pub revenue: RevenueSchedule,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Aggregate debt statistics for the sized schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSummary {
    pub capitalized_interest: Money,
    pub total_interest_paid: Money,
    pub total_principal_repaid: Money,
    pub final_balance: Money,
    /// Mean of the positive sculpted-period DSCRs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_dscr: Option<Decimal>,
    pub max_debt_service: Money,
    /// PV of operating cash flow over the loan life / balance at operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llcr: Option<Decimal>,
}

impl DebtSummary {
    pub fn from_simulation(simulation: &DebtSimulation, periodic_rate: Rate) -> Self {
        let sculpted: Vec<Decimal> = simulation
            .schedule
            .iter()
            .filter(|e| e.debt_phase == DebtPhase::Sculpting)
            .filter_map(|e| e.actual_dscr)
            .filter(|d| *d > Decimal::ZERO)
            .collect();
        let average_dscr = if sculpted.is_empty() {
            None
        } else {
            Some(sculpted.iter().copied().sum::<Decimal>() / Decimal::from(sculpted.len() as u64))
        };

        let max_debt_service = simulation
            .schedule
            .iter()
            .map(|e| e.debt_service)
            .max()
            .unwrap_or(Decimal::ZERO);

        DebtSummary {
            capitalized_interest: simulation.capitalized_interest(),
            total_interest_paid: simulation.total_interest_paid(),
            total_principal_repaid: simulation.total_principal_repaid(),
            final_balance: simulation.feasibility.final_balance,
            average_dscr,
            max_debt_service,
            llcr: loan_life_coverage(simulation, periodic_rate),
        }
    }
}

/// LLCR over the simulated tenor, discounted at the periodic debt rate.
fn loan_life_coverage(simulation: &DebtSimulation, periodic_rate: Rate) -> Option<Decimal> {
    let balance = simulation.balance_at_operations();
    if balance <= Decimal::ZERO || simulation.schedule.is_empty() {
        return None;
    }
    let cash: Vec<Money> = simulation
        .schedule
        .iter()
        .map(|e| e.operating_cash_flow)
        .collect();
    npv(periodic_rate, &cash).ok().map(|pv| pv / balance)
}

/// Capital structure, schedules and returns for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectFinanceResult {
    pub debt_amount: Money,
    pub equity_amount: Money,
    /// Debt / total capex
    pub calculated_gearing: Rate,
    pub fully_repaid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dscr: Option<Decimal>,
    pub debt_service_schedule: Vec<DebtScheduleEntry>,
    pub capitalization_schedule: Vec<CapitalizationEntry>,
    pub construction_cash_flows: Vec<ConstructionCashFlow>,
    pub equity_cash_flows: Vec<EquityCashFlow>,
    /// Per-period equity IRR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_irr_annualised: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_irr_annualised: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_multiple: Option<Multiple>,
    /// Terminal value credited to the equity series
    pub terminal_value: Money,
    pub iterations: u32,
    pub solved: bool,
    pub sizing_method: SizingMethod,
    pub sizing_probes: Vec<SizingProbe>,
    pub debt_summary: DebtSummary,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size debt and build the equity returns for one asset.
///
/// Periods, revenue, OPEX and target DSCRs are resolved once; the debt
/// search then only varies the debt amount. Infeasible debt and a missing
/// IRR are reported as warnings, never as errors.
pub fn compute_project_finance<R>(
    periods: &[Period],
    params: &FinancialParameters,
    revenue: &R,
    config: &FinanceConfig,
) -> RenewablesFinanceResult<ComputationOutput<ProjectFinanceResult>>
where
    R: RevenueProvider + ?Sized,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let frequency = config.frequency;
    let (flows, terms) = prepare(periods, params, revenue, config)?;

    let construction_periods = construction_period_count(periods);
    let operational_periods = periods.len() - construction_periods;
    if periods.len() < terms.tenor_periods {
        warnings.push(format!(
            "Analysis covers {} periods, shorter than the {}-period debt tenor",
            periods.len(),
            terms.tenor_periods
        ));
    }

    let sizing = run_sizing(params, &flows, &terms, config);
    push_sizing_warnings(&sizing, &mut warnings);

    let DebtSizing {
        debt_amount,
        simulation,
        iterations,
        solved,
        method,
        probes,
    } = sizing;

    let assembled =
        assemble_equity_cash_flows(&flows, &simulation, params, config.include_terminal_value);
    let terminal_value = terminal_value_credit(params, config.include_terminal_value);

    let periods_per_year = frequency.periods_per_year();
    let equity_irr_periodic = equity_irr(&assembled.equity, frequency);
    let equity_irr_annualised = equity_irr_periodic.and_then(|r| annualize(r, periods_per_year));
    if equity_irr_periodic.is_none() {
        warnings.push(equity_irr_warning(&assembled.net_cash_flows()));
    }

    let project_series = project_cash_flows(&flows, params.total_capex, terminal_value);
    let project_irr_annualised =
        series_irr(&project_series, frequency).and_then(|r| annualize(r, periods_per_year));

    let min_dscr = simulation.feasibility.min_dscr;
    if let Some(dscr) = min_dscr {
        if dscr < dec!(1.2) {
            warnings.push(format!(
                "Minimum DSCR of {} is below 1.2x (lender covenant risk)",
                dscr.round_dp(4)
            ));
        }
    }

    let calculated_gearing = debt_amount / params.total_capex;
    let debt_summary = DebtSummary::from_simulation(&simulation, terms.periodic_rate);

    let output = ProjectFinanceResult {
        debt_amount,
        equity_amount: assembled.equity_amount,
        calculated_gearing,
        fully_repaid: simulation.feasibility.fully_repaid,
        min_dscr,
        debt_service_schedule: simulation.schedule,
        capitalization_schedule: simulation.capitalization,
        equity_multiple: equity_multiple(&assembled.equity),
        construction_cash_flows: assembled.construction,
        equity_cash_flows: assembled.equity,
        equity_irr: equity_irr_periodic,
        equity_irr_annualised,
        project_irr_annualised,
        terminal_value,
        iterations,
        solved,
        sizing_method: method,
        sizing_probes: probes,
        debt_summary,
    };

    Ok(with_metadata(
        "Renewables Project Finance (DSCR-sculpted debt sizing)",
        &serde_json::json!({
            "total_capex": params.total_capex.to_string(),
            "max_gearing": params.max_gearing.to_string(),
            "interest_rate": params.interest_rate.to_string(),
            "tenor_years": params.tenor_years,
            "construction_periods": construction_periods,
            "operational_periods": operational_periods,
            "frequency": format!("{frequency:?}"),
            "equity_timing": format!("{:?}", params.equity_timing),
            "solve_optimal_gearing": config.solve_optimal_gearing,
            "grace_periods": terms.grace_periods,
        }),
        warnings,
        start,
        output,
    ))
}

/// Generate periods from a serialisable input, then run
/// [`compute_project_finance`] against its revenue schedule.
pub fn model_project_finance(
    input: &ProjectFinanceInput,
) -> RenewablesFinanceResult<ComputationOutput<ProjectFinanceResult>> {
    let periods = input_periods(input)?;
    compute_project_finance(
        &periods,
        &input.financial_parameters,
        &input.revenue,
        &input.config,
    )
}

/// Size the debt for an input without assembling equity returns.
///
/// Applies the same validation and solve-or-fixed-gearing choice as
/// [`model_project_finance`].
pub fn size_debt_for(input: &ProjectFinanceInput) -> RenewablesFinanceResult<DebtSizing> {
    let periods = input_periods(input)?;
    let params = &input.financial_parameters;
    let (flows, terms) = prepare(&periods, params, &input.revenue, &input.config)?;
    Ok(run_sizing(params, &flows, &terms, &input.config))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn input_periods(input: &ProjectFinanceInput) -> RenewablesFinanceResult<Vec<Period>> {
    if input.revenue.is_empty() {
        return Err(RenewablesFinanceError::InsufficientData(format!(
            "No revenue supplied for asset '{}'",
            input.asset_name
        )));
    }
    generate_periods(
        &input.asset_start_date,
        input.financial_parameters.construction_duration_months,
        input.analysis_horizon_years,
        input.config.frequency,
    )
}

/// Validate the inputs and resolve the per-period cash flows and debt terms
/// that every debt probe shares.
fn prepare<R>(
    periods: &[Period],
    params: &FinancialParameters,
    revenue: &R,
    config: &FinanceConfig,
) -> RenewablesFinanceResult<(Vec<PeriodCashFlow>, DebtTerms)>
where
    R: RevenueProvider + ?Sized,
{
    params.validate()?;
    config.validate()?;
    validate_periods(periods, config.frequency)?;

    let flows = build_period_cash_flows(periods, revenue, params, config.frequency)?;
    Ok((flows, DebtTerms::new(params, config.frequency)))
}

fn run_sizing(
    params: &FinancialParameters,
    flows: &[PeriodCashFlow],
    terms: &DebtTerms,
    config: &FinanceConfig,
) -> DebtSizing {
    if config.solve_optimal_gearing {
        size_debt(params.max_debt(), flows, terms, &config.solver)
    } else {
        fixed_gearing_debt(params.max_debt(), flows, terms)
    }
}

fn push_sizing_warnings(sizing: &DebtSizing, warnings: &mut Vec<String>) {
    let feasibility = &sizing.simulation.feasibility;
    match sizing.method {
        SizingMethod::Fallback => warnings.push(format!(
            "No feasible debt level found after {} iterations; using fallback debt of {}",
            sizing.iterations, sizing.debt_amount
        )),
        SizingMethod::FixedGearing if !feasibility.feasible => warnings.push(format!(
            "Debt of {} at maximum gearing is not feasible (final balance {}, min DSCR {})",
            sizing.debt_amount,
            feasibility.final_balance.round_dp(6),
            feasibility
                .min_dscr
                .map(|d| d.round_dp(4).to_string())
                .unwrap_or_else(|| "n/a".into())
        )),
        _ => {}
    }
    if !feasibility.fully_repaid && sizing.method != SizingMethod::Solved {
        warnings.push(format!(
            "Debt not fully repaid within tenor: {} outstanding",
            feasibility.final_balance.round_dp(6)
        ));
    }
}

fn equity_irr_warning(net_cash_flows: &[Money]) -> String {
    if crate::time_value::has_sign_change(net_cash_flows) {
        "Equity IRR did not converge".to_string()
    } else {
        "Equity IRR undefined: cash flows have no sign change".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::PeriodFrequency;
    use crate::project_finance::parameters::Technology;
    use crate::project_finance::revenue::RevenuePoint;
    use rust_decimal_macros::dec;

    fn solar_input(monthly_revenue: Money) -> ProjectFinanceInput {
        let mut params = FinancialParameters::for_technology(Technology::Solar, dec!(100));
        params.construction_duration_months = 12;
        params.annual_opex = dec!(1.5);
        params.terminal_value = dec!(10);

        let mut revenue = RevenueSchedule::new();
        for year in 2028..2053 {
            for month in 1..=12 {
                revenue.insert(year, Some(month), RevenuePoint::new(monthly_revenue * dec!(0.7), monthly_revenue * dec!(0.3)));
            }
        }

        ProjectFinanceInput {
            asset_name: "Test Solar".into(),
            asset_start_date: "2028-01-01".into(),
            analysis_horizon_years: 25,
            financial_parameters: params,
            config: FinanceConfig::default(),
            revenue,
        }
    }

    #[test]
    fn test_full_run_produces_consistent_structure() {
        let output = model_project_finance(&solar_input(dec!(1.1))).unwrap();
        let r = &output.result;

        assert!(r.solved);
        assert_eq!(r.sizing_method, SizingMethod::Solved);
        assert!(r.debt_amount > Decimal::ZERO);
        assert!(r.debt_amount <= dec!(70));
        assert_eq!(r.debt_amount + r.equity_amount, dec!(100));
        assert_eq!(r.calculated_gearing, r.debt_amount / dec!(100));
        assert_eq!(r.capitalization_schedule.len(), 12);
        assert_eq!(r.construction_cash_flows.len(), 12);
        assert_eq!(r.equity_cash_flows.len(), 12 + 300);
        // 18-year tenor counted from the first construction month
        assert_eq!(r.debt_service_schedule.len(), 18 * 12 - 12);
        assert!(r.fully_repaid);
        assert!(r.equity_irr.is_some());
        assert!(r.equity_irr_annualised.unwrap() > r.equity_irr.unwrap());
        assert_eq!(r.sizing_probes.len() as u32, r.iterations);
        assert_eq!(r.terminal_value, dec!(10));
    }

    #[test]
    fn test_debt_summary_matches_schedule() {
        let output = model_project_finance(&solar_input(dec!(1.1))).unwrap();
        let r = &output.result;
        let summary = &r.debt_summary;

        let interest: Money = r.debt_service_schedule.iter().map(|e| e.interest).sum();
        assert_eq!(summary.total_interest_paid, interest);
        assert!(
            (summary.total_principal_repaid - r.debt_amount - summary.capitalized_interest).abs()
                < dec!(0.001)
        );
        assert!(summary.average_dscr.unwrap() >= r.min_dscr.unwrap());
        assert!(summary.llcr.unwrap() > Decimal::ONE);
    }

    #[test]
    fn test_fixed_gearing_mode() {
        let mut input = solar_input(dec!(1.1));
        input.config.solve_optimal_gearing = false;
        let output = model_project_finance(&input).unwrap();
        let r = &output.result;

        assert_eq!(r.sizing_method, SizingMethod::FixedGearing);
        assert_eq!(r.iterations, 1);
        assert_eq!(r.debt_amount, dec!(70));
        assert_eq!(r.solved, r.fully_repaid && r.min_dscr.map_or(true, |d| d >= Decimal::ONE));
    }

    #[test]
    fn test_no_revenue_uses_fallback_with_warning() {
        let input = solar_input(Decimal::ZERO);
        let output = model_project_finance(&input).unwrap();
        let r = &output.result;

        assert!(!r.solved);
        assert_eq!(r.sizing_method, SizingMethod::Fallback);
        assert_eq!(r.debt_amount, dec!(35));
        assert!(output.warnings.iter().any(|w| w.contains("fallback")));
    }

    #[test]
    fn test_terminal_value_can_be_excluded() {
        let mut input = solar_input(dec!(1.1));
        input.config.include_terminal_value = false;
        let output = model_project_finance(&input).unwrap();
        assert_eq!(output.result.terminal_value, Decimal::ZERO);
        assert!(output
            .result
            .equity_cash_flows
            .iter()
            .all(|e| e.terminal_value.is_zero()));
    }

    #[test]
    fn test_closure_revenue_provider() {
        let params = FinancialParameters::for_technology(Technology::Wind, dec!(200));
        let periods = generate_periods("2027-06-01", 18, 20, PeriodFrequency::Quarterly).unwrap();
        let config = FinanceConfig {
            frequency: PeriodFrequency::Quarterly,
            ..FinanceConfig::default()
        };
        let provider = |_: &Period| RevenuePoint::contracted(dec!(6));
        let output = compute_project_finance(&periods, &params, &provider, &config).unwrap();

        assert_eq!(output.result.capitalization_schedule.len(), 6);
        assert!(output.result.debt_amount > Decimal::ZERO);
        assert!(output.result.min_dscr.unwrap() >= dec!(1.35) - dec!(0.0001));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut input = solar_input(dec!(1.1));
        input.financial_parameters.max_gearing = dec!(1.5);
        assert!(matches!(
            model_project_finance(&input),
            Err(RenewablesFinanceError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_periods_must_match_configured_frequency() {
        let params = FinancialParameters::for_technology(Technology::Solar, dec!(100));
        let monthly = generate_periods("2027-01-01", 12, 25, PeriodFrequency::Monthly).unwrap();
        let annual = FinanceConfig {
            frequency: PeriodFrequency::Annual,
            ..FinanceConfig::default()
        };
        let provider = |_: &Period| RevenuePoint::merchant(dec!(1));
        match compute_project_finance(&monthly, &params, &provider, &annual) {
            Err(RenewablesFinanceError::InvalidConfiguration { field, .. }) => {
                assert_eq!(field, "periods");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_tenor_rejected_without_panicking() {
        let mut input = solar_input(dec!(1.1));
        input.financial_parameters.tenor_years = 400_000_000;
        assert!(matches!(
            model_project_finance(&input),
            Err(RenewablesFinanceError::InvalidConfiguration { .. })
        ));
        assert!(size_debt_for(&input).is_err());
    }

    #[test]
    fn test_size_debt_for_matches_full_model() {
        let input = solar_input(dec!(1.1));
        let sizing = size_debt_for(&input).unwrap();
        let output = model_project_finance(&input).unwrap();
        assert_eq!(sizing.debt_amount, output.result.debt_amount);
        assert_eq!(sizing.iterations, output.result.iterations);
        assert_eq!(sizing.method, output.result.sizing_method);

        let mut fixed = input.clone();
        fixed.config.solve_optimal_gearing = false;
        let sizing = size_debt_for(&fixed).unwrap();
        assert_eq!(sizing.method, SizingMethod::FixedGearing);
        assert_eq!(sizing.debt_amount, dec!(70));
    }

    #[test]
    fn test_size_debt_for_requires_revenue() {
        let mut input = solar_input(dec!(1.1));
        input.revenue = RevenueSchedule::new();
        assert!(matches!(
            size_debt_for(&input),
            Err(RenewablesFinanceError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_empty_revenue_schedule_rejected() {
        let mut input = solar_input(dec!(1.1));
        input.revenue = RevenueSchedule::new();
        assert!(matches!(
            model_project_finance(&input),
            Err(RenewablesFinanceError::InsufficientData(_))
        ));
    }
}
