use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::runner::AssetOutcome;
use crate::error::RenewablesFinanceError;
use crate::periods::PeriodFrequency;
use crate::project_finance::equity::series_irr;
use crate::time_value::annualize;
use crate::types::{Money, Rate};
use crate::RenewablesFinanceResult;

/// Portfolio equity flow for one calendar period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedCashFlow {
    pub date: NaiveDate,
    pub net_cash_flow: Money,
}

/// Consolidated capital structure and equity returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioResult {
    pub assets: Vec<AssetOutcome>,
    pub total_capex: Money,
    pub total_debt: Money,
    pub total_equity: Money,
    /// Total debt / total capex
    pub portfolio_gearing: Rate,
    /// Lowest minimum DSCR across assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dscr: Option<Decimal>,
    pub unsolved_assets: usize,
    pub equity_cash_flows: Vec<DatedCashFlow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_irr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_irr_annualised: Option<Rate>,
}

pub(crate) fn aggregate(
    assets: Vec<AssetOutcome>,
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<PortfolioResult> {
    let total_debt: Money = assets.iter().map(|a| a.result.debt_amount).sum();
    let total_equity: Money = assets.iter().map(|a| a.result.equity_amount).sum();
    let total_capex = total_debt + total_equity;
    let portfolio_gearing = if total_capex > Decimal::ZERO {
        total_debt / total_capex
    } else {
        Decimal::ZERO
    };

    let min_dscr = assets.iter().filter_map(|a| a.result.min_dscr).min();
    let unsolved_assets = assets.iter().filter(|a| !a.result.solved).count();

    let equity_cash_flows = align_equity_cash_flows(&assets, frequency)?;
    let series: Vec<Money> = equity_cash_flows.iter().map(|c| c.net_cash_flow).collect();
    let equity_irr = series_irr(&series, frequency);
    let equity_irr_annualised = equity_irr.and_then(|r| annualize(r, frequency.periods_per_year()));

    Ok(PortfolioResult {
        assets,
        total_capex,
        total_debt,
        total_equity,
        portfolio_gearing,
        min_dscr,
        unsolved_assets,
        equity_cash_flows,
        equity_irr,
        equity_irr_annualised,
    })
}

/// Sum every asset's equity flows by period start date and fill the gaps so
/// the result is a contiguous series at `frequency`.
///
/// Fails when asset period grids are offset from one another (for example
/// quarters starting in January and February).
pub fn align_equity_cash_flows(
    assets: &[AssetOutcome],
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<Vec<DatedCashFlow>> {
    let mut by_date: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    for asset in assets {
        for entry in &asset.result.equity_cash_flows {
            *by_date.entry(entry.start_date).or_insert(Decimal::ZERO) += entry.net_cash_flow;
        }
    }

    let (Some(first), Some(last)) = (
        by_date.keys().next().copied(),
        by_date.keys().next_back().copied(),
    ) else {
        return Ok(Vec::new());
    };

    let step = Months::new(frequency.months_per_period());
    let mut aligned = Vec::with_capacity(by_date.len());
    let mut date = first;
    while date <= last {
        aligned.push(DatedCashFlow {
            date,
            net_cash_flow: by_date.get(&date).copied().unwrap_or(Decimal::ZERO),
        });
        date = date.checked_add_months(step).ok_or_else(|| {
            RenewablesFinanceError::DateError(format!("period after {date} is out of range"))
        })?;
    }

    let on_grid = aligned.iter().filter(|c| by_date.contains_key(&c.date)).count();
    if on_grid != by_date.len() {
        return Err(RenewablesFinanceError::invalid(
            "assets",
            format!("asset {frequency:?} period start dates do not share a common calendar grid"),
        ));
    }

    Ok(aligned)
}
