use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use renewables_finance_core::periods::{generate_periods as build_periods, PeriodFrequency};
use renewables_finance_core::portfolio::{compute_portfolio as run_portfolio, PortfolioInput};
use renewables_finance_core::project_finance::{
    model_project_finance, size_debt_for, FinancialParameters, ProjectFinanceInput, Technology,
};
use renewables_finance_core::time_value::{annualize, irr, DEFAULT_IRR_GUESS};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: for<'de> Deserialize<'de>>(input_json: &str) -> NapiResult<T> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

fn render<T: Serialize>(output: &T) -> NapiResult<String> {
    serde_json::to_string(output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Asset and portfolio runs
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_project_finance(input_json: String) -> NapiResult<String> {
    let input: ProjectFinanceInput = parse(&input_json)?;
    let output = model_project_finance(&input).map_err(to_napi_error)?;
    render(&output)
}

#[napi]
pub fn size_debt(input_json: String) -> NapiResult<String> {
    let input: ProjectFinanceInput = parse(&input_json)?;
    let sizing = size_debt_for(&input).map_err(to_napi_error)?;
    render(&sizing)
}

#[napi]
pub fn compute_portfolio(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = parse(&input_json)?;
    let output = run_portfolio(&input).map_err(to_napi_error)?;
    render(&output)
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PeriodsRequest {
    asset_start_date: String,
    #[serde(default)]
    construction_duration_months: i32,
    analysis_horizon_years: u32,
    #[serde(default)]
    frequency: PeriodFrequency,
}

#[napi]
pub fn generate_periods(input_json: String) -> NapiResult<String> {
    let req: PeriodsRequest = parse(&input_json)?;
    let periods = build_periods(
        &req.asset_start_date,
        req.construction_duration_months,
        req.analysis_horizon_years,
        req.frequency,
    )
    .map_err(to_napi_error)?;
    render(&periods)
}

#[derive(Deserialize)]
struct IrrRequest {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    guess: Option<Decimal>,
    #[serde(default)]
    periods_per_year: Option<u32>,
}

#[derive(Serialize)]
struct IrrResponse {
    irr: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    irr_annualised: Option<Decimal>,
}

#[napi]
pub fn equity_irr(input_json: String) -> NapiResult<String> {
    let req: IrrRequest = parse(&input_json)?;
    let rate = irr(&req.cash_flows, req.guess.unwrap_or(DEFAULT_IRR_GUESS)).map_err(to_napi_error)?;
    render(&IrrResponse {
        irr: rate,
        irr_annualised: req
            .periods_per_year
            .filter(|n| *n > 0)
            .and_then(|n| annualize(rate, n)),
    })
}

#[derive(Deserialize)]
struct DefaultsRequest {
    technology: Technology,
    total_capex: Decimal,
}

#[napi]
pub fn technology_defaults(input_json: String) -> NapiResult<String> {
    let req: DefaultsRequest = parse(&input_json)?;
    let params = FinancialParameters::for_technology(req.technology, req.total_capex);
    render(&params)
}
