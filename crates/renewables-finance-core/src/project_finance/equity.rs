use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cash_flows::PeriodCashFlow;
use super::parameters::{EquityTiming, FinancialParameters};
use super::simulator::DebtSimulation;
use crate::periods::{PeriodFrequency, Phase};
use crate::time_value::{has_sign_change, irr, DEFAULT_IRR_GUESS};
use crate::types::{Money, Multiple, Rate};

/// Funding of one construction period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionCashFlow {
    pub period_index: usize,
    pub start_date: NaiveDate,
    pub capex_spend: Money,
    pub equity_contribution: Money,
    pub debt_drawdown: Money,
    pub capitalized_interest: Money,
    pub closing_debt_balance: Money,
}

/// Equity holder's position in one period.
///
/// `equity_contribution` is the positive amount injected; `net_cash_flow` is
/// signed from the equity holder's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCashFlow {
    pub period_index: usize,
    pub start_date: NaiveDate,
    pub phase: Phase,
    pub operating_cash_flow: Money,
    pub debt_service: Money,
    pub equity_contribution: Money,
    pub terminal_value: Money,
    pub net_cash_flow: Money,
}

/// Construction funding and the full equity series for one debt level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityCashFlows {
    pub equity_amount: Money,
    pub construction: Vec<ConstructionCashFlow>,
    pub equity: Vec<EquityCashFlow>,
}

impl EquityCashFlows {
    pub fn net_cash_flows(&self) -> Vec<Money> {
        self.equity.iter().map(|e| e.net_cash_flow).collect()
    }
}

/// Equity needed to close the funding gap, never negative.
pub fn equity_amount(total_capex: Money, debt_amount: Money) -> Money {
    (total_capex - debt_amount).max(Decimal::ZERO)
}

/// Terminal value credited to the final operational period, if any.
pub fn terminal_value_credit(params: &FinancialParameters, include_terminal_value: bool) -> Money {
    if include_terminal_value && params.terminal_value > Decimal::ZERO {
        params.terminal_value
    } else {
        Decimal::ZERO
    }
}

/// Build the construction funding table and the equity cash flow series.
///
/// Equity goes in during construction, either all in the first period
/// (`Upfront`) or evenly (`ProRata`); debt drawdown and capex are always
/// reported evenly. With no construction periods the contribution is netted
/// into the first operational period. Operational periods distribute
/// operating cash flow less debt service, plus the terminal value on the
/// final period.
pub fn assemble_equity_cash_flows(
    flows: &[PeriodCashFlow],
    simulation: &DebtSimulation,
    params: &FinancialParameters,
    include_terminal_value: bool,
) -> EquityCashFlows {
    let debt_amount = simulation.feasibility.debt_amount;
    let equity = equity_amount(params.total_capex, debt_amount);
    let construction_flows: Vec<&PeriodCashFlow> =
        flows.iter().filter(|f| f.period.is_construction()).collect();
    let n = construction_flows.len();

    let mut construction = Vec::with_capacity(n);
    let mut entries = Vec::with_capacity(flows.len());

    if n > 0 {
        let count = Decimal::from(n as u64);
        let capex_spend = params.total_capex / count;
        let debt_drawdown = debt_amount / count;

        for (i, flow) in construction_flows.iter().enumerate() {
            let contribution = match params.equity_timing {
                EquityTiming::Upfront if i == 0 => equity,
                EquityTiming::Upfront => Decimal::ZERO,
                EquityTiming::ProRata => equity / count,
            };
            let capitalized = simulation.capitalization.get(i);

            construction.push(ConstructionCashFlow {
                period_index: flow.period.index,
                start_date: flow.period.start_date,
                capex_spend,
                equity_contribution: contribution,
                debt_drawdown,
                capitalized_interest: capitalized
                    .map(|c| c.capitalized_interest)
                    .unwrap_or(Decimal::ZERO),
                closing_debt_balance: capitalized
                    .map(|c| c.closing_balance)
                    .unwrap_or(debt_drawdown * Decimal::from(i as u64 + 1)),
            });
            entries.push(EquityCashFlow {
                period_index: flow.period.index,
                start_date: flow.period.start_date,
                phase: Phase::Construction,
                operating_cash_flow: Decimal::ZERO,
                debt_service: Decimal::ZERO,
                equity_contribution: contribution,
                terminal_value: Decimal::ZERO,
                net_cash_flow: -contribution,
            });
        }
    }

    let terminal_value = terminal_value_credit(params, include_terminal_value);
    let last_operational = flows.iter().rposition(|f| f.period.is_operational());
    let mut equity_pending = if n == 0 { equity } else { Decimal::ZERO };

    for (pos, flow) in flows.iter().enumerate() {
        if flow.period.is_construction() {
            continue;
        }
        let debt_service = simulation.debt_service_at(flow.period.index);
        let contribution = std::mem::take(&mut equity_pending);
        let tv = if Some(pos) == last_operational {
            terminal_value
        } else {
            Decimal::ZERO
        };

        entries.push(EquityCashFlow {
            period_index: flow.period.index,
            start_date: flow.period.start_date,
            phase: Phase::Operations,
            operating_cash_flow: flow.operating_cash_flow,
            debt_service,
            equity_contribution: contribution,
            terminal_value: tv,
            net_cash_flow: flow.operating_cash_flow - debt_service + tv - contribution,
        });
    }

    EquityCashFlows {
        equity_amount: equity,
        construction,
        equity: entries,
    }
}

/// Unlevered project series: capex spent evenly over construction (or in
/// the first period without construction), then operating cash flow plus
/// terminal value.
pub fn project_cash_flows(
    flows: &[PeriodCashFlow],
    total_capex: Money,
    terminal_value: Money,
) -> Vec<Money> {
    let n = flows.iter().filter(|f| f.period.is_construction()).count();
    let last = flows.len().saturating_sub(1);

    flows
        .iter()
        .enumerate()
        .map(|(pos, flow)| {
            let mut cf = if flow.period.is_construction() {
                -total_capex / Decimal::from(n as u64)
            } else {
                flow.operating_cash_flow
            };
            if n == 0 && pos == 0 {
                cf -= total_capex;
            }
            if pos == last {
                cf += terminal_value;
            }
            cf
        })
        .collect()
}

/// Starting point for Newton iteration: the 10% guess scaled to one period
/// the same way annual interest rates are.
pub fn periodic_irr_guess(frequency: PeriodFrequency) -> Rate {
    DEFAULT_IRR_GUESS * Decimal::from(frequency.months_per_period()) / Decimal::from(12)
}

/// Periodic IRR of a series, `None` when there is no sign change or Newton
/// iteration does not converge.
///
/// Starts from [`periodic_irr_guess`]. For the plain textbook iteration from
/// a fixed 0.10 guess, call [`crate::time_value::irr`] directly.
pub fn series_irr(cash_flows: &[Money], frequency: PeriodFrequency) -> Option<Rate> {
    if !has_sign_change(cash_flows) {
        return None;
    }
    irr(cash_flows, periodic_irr_guess(frequency)).ok()
}

/// Periodic IRR of the equity series.
pub fn equity_irr(entries: &[EquityCashFlow], frequency: PeriodFrequency) -> Option<Rate> {
    let flows: Vec<Money> = entries.iter().map(|e| e.net_cash_flow).collect();
    series_irr(&flows, frequency)
}

/// Total distributions over total contributions, measured on net flows.
pub fn equity_multiple(entries: &[EquityCashFlow]) -> Option<Multiple> {
    let (inflows, outflows) = entries.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(inflows, outflows), e| {
            if e.net_cash_flow > Decimal::ZERO {
                (inflows + e.net_cash_flow, outflows)
            } else {
                (inflows, outflows - e.net_cash_flow)
            }
        },
    );
    if outflows.is_zero() {
        None
    } else {
        Some(inflows / outflows)
    }
}
