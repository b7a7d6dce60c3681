use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::cash_flows::PeriodCashFlow;
use super::parameters::SolverConfig;
use super::simulator::{simulate_debt, DebtSimulation, DebtTerms};
use crate::types::Money;

/// Share of the gearing cap accepted when no feasible debt level exists.
pub const FALLBACK_DEBT_FRACTION: Decimal = dec!(0.5);

/// How the final debt amount was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingMethod {
    /// Binary search found a feasible maximum
    Solved,
    /// Search found nothing feasible; conservative share of the gearing cap
    Fallback,
    /// Search skipped; debt set at the gearing cap
    FixedGearing,
}

/// One simulator pass made by the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingProbe {
    pub iteration: u32,
    pub debt_amount: Money,
    pub feasible: bool,
    pub final_balance: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_dscr: Option<Decimal>,
}

impl SizingProbe {
    fn record(iteration: u32, simulation: &DebtSimulation) -> Self {
        let f = &simulation.feasibility;
        SizingProbe {
            iteration,
            debt_amount: f.debt_amount,
            feasible: f.feasible,
            final_balance: f.final_balance,
            min_dscr: f.min_dscr,
        }
    }
}

/// Chosen debt amount together with its simulated schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSizing {
    pub debt_amount: Money,
    pub simulation: DebtSimulation,
    /// Simulator passes spent choosing the amount
    pub iterations: u32,
    pub solved: bool,
    pub method: SizingMethod,
    pub probes: Vec<SizingProbe>,
}

/// Binary search for the largest debt amount in `[0, max_debt]` that the
/// simulator reports feasible.
///
/// Assumes feasibility is monotone in the debt amount: feasible probes raise
/// the lower bound, infeasible probes lower the upper bound. Stops when the
/// bracket is within `solver.tolerance` or after `solver.max_iterations`
/// passes. If no probe is feasible the result falls back to
/// [`FALLBACK_DEBT_FRACTION`] of `max_debt` with `solved = false`; the
/// fallback schedule is returned even though it fails the constraints.
pub fn size_debt(
    max_debt: Money,
    flows: &[PeriodCashFlow],
    terms: &DebtTerms,
    solver: &SolverConfig,
) -> DebtSizing {
    if max_debt <= Decimal::ZERO {
        let simulation = simulate_debt(Decimal::ZERO, flows, terms);
        return DebtSizing {
            debt_amount: Decimal::ZERO,
            solved: simulation.feasibility.feasible,
            simulation,
            iterations: 0,
            method: SizingMethod::Solved,
            probes: Vec::new(),
        };
    }

    let mut lower = Decimal::ZERO;
    let mut upper = max_debt;
    let mut best: Option<DebtSimulation> = None;
    let mut probes = Vec::new();
    let mut iterations = 0u32;

    while iterations < solver.max_iterations && upper - lower > solver.tolerance {
        let candidate = (lower + upper) / dec!(2);
        let simulation = simulate_debt(candidate, flows, terms);
        iterations += 1;
        probes.push(SizingProbe::record(iterations, &simulation));

        if simulation.feasibility.feasible {
            lower = candidate;
            best = Some(simulation);
        } else {
            upper = candidate;
        }
    }

    match best {
        Some(simulation) => DebtSizing {
            debt_amount: simulation.feasibility.debt_amount,
            simulation,
            iterations,
            solved: true,
            method: SizingMethod::Solved,
            probes,
        },
        None => {
            let fallback = max_debt * FALLBACK_DEBT_FRACTION;
            let simulation = simulate_debt(fallback, flows, terms);
            DebtSizing {
                debt_amount: fallback,
                simulation,
                iterations,
                solved: false,
                method: SizingMethod::Fallback,
                probes,
            }
        }
    }
}

/// Gear at the cap without searching; `solved` reports whether that debt
/// level is feasible.
pub fn fixed_gearing_debt(
    max_debt: Money,
    flows: &[PeriodCashFlow],
    terms: &DebtTerms,
) -> DebtSizing {
    let debt_amount = max_debt.max(Decimal::ZERO);
    let simulation = simulate_debt(debt_amount, flows, terms);
    DebtSizing {
        debt_amount,
        solved: simulation.feasibility.feasible,
        probes: vec![SizingProbe::record(1, &simulation)],
        simulation,
        iterations: 1,
        method: SizingMethod::FixedGearing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::{generate_periods, PeriodFrequency, Phase};
    use crate::project_finance::revenue::RevenuePoint;
    use rust_decimal_macros::dec;

    fn flat_flows(years: u32, monthly_cash: Money, target: Decimal) -> Vec<PeriodCashFlow> {
        generate_periods("2027-01-01", 0, years, PeriodFrequency::Monthly)
            .unwrap()
            .into_iter()
            .map(|period| {
                assert_eq!(period.phase, Phase::Operations);
                PeriodCashFlow {
                    period,
                    revenue: RevenuePoint::merchant(monthly_cash),
                    opex: Decimal::ZERO,
                    operating_cash_flow: monthly_cash,
                    target_dscr: target,
                }
            })
            .collect()
    }

    fn terms() -> DebtTerms {
        DebtTerms {
            periodic_rate: dec!(0.005),
            tenor_periods: 180,
            grace_periods: 3,
        }
    }

    #[test]
    fn test_dscr_constrained_search() {
        let flows = flat_flows(25, dec!(8) / dec!(12), dec!(2.00));
        let sizing = size_debt(dec!(70), &flows, &terms(), &SolverConfig::default());

        assert!(sizing.solved);
        assert_eq!(sizing.method, SizingMethod::Solved);
        assert!(sizing.debt_amount > dec!(30) && sizing.debt_amount < dec!(45));
        assert!(sizing.simulation.feasibility.feasible);
        assert!(sizing.iterations <= 50);
        assert_eq!(sizing.probes.len() as u32, sizing.iterations);
    }

    #[test]
    fn test_search_never_exceeds_an_infeasible_probe() {
        let flows = flat_flows(25, dec!(8) / dec!(12), dec!(2.00));
        let sizing = size_debt(dec!(70), &flows, &terms(), &SolverConfig::default());

        for probe in sizing.probes.iter().filter(|p| !p.feasible) {
            assert!(
                sizing.debt_amount < probe.debt_amount,
                "solution {} exceeds infeasible probe {}",
                sizing.debt_amount,
                probe.debt_amount
            );
        }
        // Nudging the solution up by more than the tolerance must break it
        let above = simulate_debt(sizing.debt_amount + dec!(0.01), &flows, &terms());
        assert!(!above.feasibility.feasible);
    }

    #[test]
    fn test_gearing_constrained_search_converges_to_cap() {
        let flows = flat_flows(25, dec!(10), dec!(1.35));
        let sizing = size_debt(dec!(70), &flows, &terms(), &SolverConfig::default());
        assert!(sizing.solved);
        assert!(dec!(70) - sizing.debt_amount <= dec!(0.001));
    }

    #[test]
    fn test_no_cash_falls_back_to_half_of_cap() {
        let flows = flat_flows(25, Decimal::ZERO, dec!(2.00));
        let sizing = size_debt(dec!(70), &flows, &terms(), &SolverConfig::default());

        assert!(!sizing.solved);
        assert_eq!(sizing.method, SizingMethod::Fallback);
        assert_eq!(sizing.debt_amount, dec!(35));
        assert!(!sizing.simulation.feasibility.feasible);
        assert!(sizing.probes.iter().all(|p| !p.feasible));
    }

    #[test]
    fn test_iteration_cap_respected() {
        let flows = flat_flows(25, dec!(8) / dec!(12), dec!(2.00));
        let solver = SolverConfig {
            tolerance: dec!(0.000000001),
            max_iterations: 5,
        };
        let sizing = size_debt(dec!(70), &flows, &terms(), &solver);
        assert_eq!(sizing.iterations, 5);
    }

    #[test]
    fn test_zero_cap_sizes_zero_debt() {
        let flows = flat_flows(5, dec!(1), dec!(2.00));
        let sizing = size_debt(Decimal::ZERO, &flows, &terms(), &SolverConfig::default());
        assert!(sizing.solved);
        assert_eq!(sizing.debt_amount, Decimal::ZERO);
        assert_eq!(sizing.iterations, 0);
    }

    #[test]
    fn test_fixed_gearing_runs_once() {
        let flows = flat_flows(25, dec!(8) / dec!(12), dec!(2.00));
        let sizing = fixed_gearing_debt(dec!(70), &flows, &terms());
        assert_eq!(sizing.iterations, 1);
        assert_eq!(sizing.debt_amount, dec!(70));
        assert_eq!(sizing.method, SizingMethod::FixedGearing);
        assert!(!sizing.solved);
    }
}
