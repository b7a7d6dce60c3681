#![cfg(feature = "portfolio")]

use renewables_finance_core::periods::PeriodFrequency;
use renewables_finance_core::portfolio::{compute_portfolio, PortfolioInput};
use renewables_finance_core::project_finance::{
    model_project_finance, FinanceConfig, FinancialParameters, ProjectFinanceInput, RevenuePoint,
    RevenueSchedule, Technology,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn asset(name: &str, technology: Technology, start: &str, monthly_revenue: Decimal) -> ProjectFinanceInput {
    let start_year: i32 = start[..4].parse().unwrap();
    let mut revenue = RevenueSchedule::new();
    for year in start_year..start_year + 25 {
        for month in 1..=12 {
            revenue.insert(
                year,
                Some(month),
                RevenuePoint::new(monthly_revenue * dec!(0.8), monthly_revenue * dec!(0.2)),
            );
        }
    }
    ProjectFinanceInput {
        asset_name: name.into(),
        asset_start_date: start.into(),
        analysis_horizon_years: 25,
        financial_parameters: FinancialParameters::for_technology(technology, dec!(100)),
        config: FinanceConfig::default(),
        revenue,
    }
}

fn portfolio() -> PortfolioInput {
    PortfolioInput {
        portfolio_name: "Northern Renewables".into(),
        assets: vec![
            asset("Solar Farm A", Technology::Solar, "2027-01-01", dec!(1.2)),
            asset("Wind Farm B", Technology::Wind, "2027-07-01", dec!(1.3)),
            asset("Battery C", Technology::Storage, "2028-01-01", dec!(1.6)),
        ],
    }
}

// ===========================================================================
// Portfolio runs
// ===========================================================================

#[test]
fn test_portfolio_matches_standalone_runs() {
    let input = portfolio();
    let output = compute_portfolio(&input).unwrap();
    let result = &output.result;

    assert_eq!(result.assets.len(), 3);
    for (outcome, asset) in result.assets.iter().zip(&input.assets) {
        let standalone = model_project_finance(asset).unwrap();
        assert_eq!(outcome.asset_name, asset.asset_name);
        assert_eq!(outcome.result.debt_amount, standalone.result.debt_amount);
        assert_eq!(outcome.result.equity_irr, standalone.result.equity_irr);
    }
}

#[test]
fn test_capital_structure_aggregates() {
    let output = compute_portfolio(&portfolio()).unwrap();
    let result = &output.result;

    let debt: Decimal = result.assets.iter().map(|a| a.result.debt_amount).sum();
    assert_eq!(result.total_debt, debt);
    assert_eq!(result.total_capex, dec!(300));
    assert_eq!(result.total_debt + result.total_equity, dec!(300));
    assert_eq!(result.portfolio_gearing, debt / dec!(300));

    let lowest = result
        .assets
        .iter()
        .filter_map(|a| a.result.min_dscr)
        .min();
    assert_eq!(result.min_dscr, lowest);
}

#[test]
fn test_equity_flows_aligned_by_calendar_date() {
    let output = compute_portfolio(&portfolio()).unwrap();
    let result = &output.result;

    for pair in result.equity_cash_flows.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
    let asset_total: Decimal = result
        .assets
        .iter()
        .flat_map(|a| a.result.equity_cash_flows.iter().map(|e| e.net_cash_flow))
        .sum();
    let portfolio_total: Decimal = result.equity_cash_flows.iter().map(|c| c.net_cash_flow).sum();
    assert_eq!(asset_total, portfolio_total);
    assert!(result.equity_irr.is_some());
    assert!(result.equity_irr_annualised.unwrap() > Decimal::ZERO);
}

#[test]
fn test_mixed_frequencies_are_rejected() {
    let mut input = portfolio();
    input.assets[1].config.frequency = PeriodFrequency::Quarterly;
    assert!(compute_portfolio(&input).is_err());
}
