use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::cash_flows::PeriodCashFlow;
use super::parameters::FinancialParameters;
use crate::periods::{Period, PeriodFrequency};
use crate::types::{Money, Rate};

/// Operational ramp-up window serviced interest-only.
pub const GRACE_PERIOD_MONTHS: u32 = 3;

/// Balance below which the debt counts as fully repaid.
pub const FEASIBILITY_EPSILON: Money = dec!(0.001);

/// Coverage every sculpted period must achieve for a debt level to be feasible.
pub const MIN_FEASIBLE_DSCR: Decimal = Decimal::ONE;

// ---------------------------------------------------------------------------
// Terms and state
// ---------------------------------------------------------------------------

/// Debt terms converted to the analysis period length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtTerms {
    /// Interest rate per period (annual rate * months / 12)
    pub periodic_rate: Rate,
    /// Periods, counted from the first period of the stream, within which
    /// the debt must be repaid
    pub tenor_periods: usize,
    /// Leading operational periods serviced interest-only
    pub grace_periods: usize,
}

impl DebtTerms {
    pub fn new(params: &FinancialParameters, frequency: PeriodFrequency) -> Self {
        let months = frequency.months_per_period();
        DebtTerms {
            periodic_rate: params.interest_rate * Decimal::from(months) / dec!(12),
            tenor_periods: params.tenor_years.saturating_mul(frequency.periods_per_year()) as usize,
            grace_periods: frequency.periods_covering(GRACE_PERIOD_MONTHS) as usize,
        }
    }
}

/// Debt position after one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebtState {
    pub outstanding_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    /// Interest was added to the balance instead of paid
    pub is_capitalized: bool,
}

/// Which rule governs debt service in a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebtPhase {
    /// Construction: interest accrues onto the balance
    Capitalizing,
    /// Operational ramp-up: interest-only, balance unchanged
    GracePeriod,
    /// Steady state: principal shaped to the target DSCR
    Sculpting,
}

/// Outcome of applying a [`DebtPhase`] to one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebtStep {
    pub state: DebtState,
    pub actual_dscr: Option<Decimal>,
}

impl DebtPhase {
    /// Phase for a period given its position among operational periods.
    pub fn for_period(period: &Period, operational_index: usize, grace_periods: usize) -> Self {
        if period.is_construction() {
            DebtPhase::Capitalizing
        } else if operational_index < grace_periods {
            DebtPhase::GracePeriod
        } else {
            DebtPhase::Sculpting
        }
    }

    pub fn step(self, balance: Money, flow: &PeriodCashFlow, periodic_rate: Rate) -> DebtStep {
        match self {
            DebtPhase::Capitalizing => capitalize(balance, periodic_rate),
            DebtPhase::GracePeriod => service_interest_only(balance, flow, periodic_rate),
            DebtPhase::Sculpting => sculpt(balance, flow, periodic_rate),
        }
    }
}

fn capitalize(balance: Money, periodic_rate: Rate) -> DebtStep {
    let interest = balance * periodic_rate;
    DebtStep {
        state: DebtState {
            outstanding_balance: balance + interest,
            interest,
            principal: Decimal::ZERO,
            debt_service: Decimal::ZERO,
            is_capitalized: true,
        },
        actual_dscr: None,
    }
}

fn service_interest_only(balance: Money, flow: &PeriodCashFlow, periodic_rate: Rate) -> DebtStep {
    let interest = balance * periodic_rate;
    let actual_dscr = if flow.operating_cash_flow > Decimal::ZERO && interest > Decimal::ZERO {
        Some(flow.operating_cash_flow / interest)
    } else {
        None
    };
    DebtStep {
        state: DebtState {
            outstanding_balance: balance,
            interest,
            principal: Decimal::ZERO,
            debt_service: interest,
            is_capitalized: false,
        },
        actual_dscr,
    }
}

fn sculpt(balance: Money, flow: &PeriodCashFlow, periodic_rate: Rate) -> DebtStep {
    let interest = balance * periodic_rate;
    let cash = flow.operating_cash_flow;

    let principal = if cash <= Decimal::ZERO || flow.target_dscr <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        let max_debt_service = cash / flow.target_dscr;
        (max_debt_service - interest).max(Decimal::ZERO).min(balance)
    };

    let debt_service = interest + principal;
    let actual_dscr = if debt_service > Decimal::ZERO {
        Some(cash / debt_service)
    } else {
        None
    };

    DebtStep {
        state: DebtState {
            outstanding_balance: (balance - principal).max(Decimal::ZERO),
            interest,
            principal,
            debt_service,
            is_capitalized: false,
        },
        actual_dscr,
    }
}

// ---------------------------------------------------------------------------
// Simulation output
// ---------------------------------------------------------------------------

/// One operational period of the debt schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtScheduleEntry {
    pub period_index: usize,
    pub start_date: NaiveDate,
    pub debt_phase: DebtPhase,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub closing_balance: Money,
    pub operating_cash_flow: Money,
    pub target_dscr: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_dscr: Option<Decimal>,
}

impl DebtScheduleEntry {
    pub fn in_grace_period(&self) -> bool {
        self.debt_phase == DebtPhase::GracePeriod
    }
}

/// Interest capitalised in one construction period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalizationEntry {
    pub period_index: usize,
    pub start_date: NaiveDate,
    pub opening_balance: Money,
    pub capitalized_interest: Money,
    pub closing_balance: Money,
}

/// Whether a candidate debt amount can be carried by the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityResult {
    pub debt_amount: Money,
    pub fully_repaid: bool,
    pub final_balance: Money,
    /// Lowest positive DSCR across sculpted periods
    pub min_dscr: Option<Decimal>,
    pub feasible: bool,
}

/// Full result of simulating one debt amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSimulation {
    pub feasibility: FeasibilityResult,
    pub capitalization: Vec<CapitalizationEntry>,
    pub schedule: Vec<DebtScheduleEntry>,
}

impl DebtSimulation {
    pub fn capitalized_interest(&self) -> Money {
        self.capitalization
            .iter()
            .map(|c| c.capitalized_interest)
            .sum()
    }

    pub fn total_interest_paid(&self) -> Money {
        self.schedule.iter().map(|e| e.interest).sum()
    }

    pub fn total_principal_repaid(&self) -> Money {
        self.schedule.iter().map(|e| e.principal).sum()
    }

    /// Balance carried into the first operational period.
    pub fn balance_at_operations(&self) -> Money {
        self.capitalization
            .last()
            .map(|c| c.closing_balance)
            .unwrap_or(self.feasibility.debt_amount)
    }

    /// Debt service paid in a period (zero outside the simulated tenor).
    pub fn debt_service_at(&self, period_index: usize) -> Money {
        self.schedule
            .binary_search_by_key(&period_index, |e| e.period_index)
            .map(|pos| self.schedule[pos].debt_service)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Simulate interest, capitalisation and sculpted repayment of `debt_amount`.
///
/// The full amount is outstanding from the first period. Construction
/// periods capitalise interest, the first operational periods are
/// interest-only, and the remainder sculpt principal to the target DSCR
/// until the tenor ends or the periods run out. The tenor counts every
/// period from the start of the stream, construction included.
pub fn simulate_debt(
    debt_amount: Money,
    flows: &[PeriodCashFlow],
    terms: &DebtTerms,
) -> DebtSimulation {
    let mut balance = debt_amount.max(Decimal::ZERO);
    let mut capitalization = Vec::new();
    let mut schedule = Vec::with_capacity(terms.tenor_periods.min(flows.len()));
    let mut min_dscr: Option<Decimal> = None;
    let mut operational_index = 0usize;

    for flow in flows.iter().take(terms.tenor_periods) {

        let phase = DebtPhase::for_period(&flow.period, operational_index, terms.grace_periods);
        let step = phase.step(balance, flow, terms.periodic_rate);
        let opening = balance;
        balance = step.state.outstanding_balance;

        if phase == DebtPhase::Capitalizing {
            capitalization.push(CapitalizationEntry {
                period_index: flow.period.index,
                start_date: flow.period.start_date,
                opening_balance: opening,
                capitalized_interest: step.state.interest,
                closing_balance: balance,
            });
            continue;
        }

        if phase == DebtPhase::Sculpting {
            if let Some(dscr) = step.actual_dscr.filter(|d| *d > Decimal::ZERO) {
                min_dscr = Some(min_dscr.map_or(dscr, |current| current.min(dscr)));
            }
        }

        schedule.push(DebtScheduleEntry {
            period_index: flow.period.index,
            start_date: flow.period.start_date,
            debt_phase: phase,
            opening_balance: opening,
            interest: step.state.interest,
            principal: step.state.principal,
            debt_service: step.state.debt_service,
            closing_balance: balance,
            operating_cash_flow: flow.operating_cash_flow,
            target_dscr: flow.target_dscr,
            actual_dscr: step.actual_dscr,
        });
        operational_index += 1;
    }

    let fully_repaid = balance < FEASIBILITY_EPSILON;
    let feasible = fully_repaid && min_dscr.map_or(true, |d| d >= MIN_FEASIBLE_DSCR);

    DebtSimulation {
        feasibility: FeasibilityResult {
            debt_amount,
            fully_repaid,
            final_balance: balance,
            min_dscr,
            feasible,
        },
        capitalization,
        schedule,
    }
}
