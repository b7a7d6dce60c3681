use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RenewablesFinanceError;
use crate::periods::{PeriodFrequency, MAX_CONSTRUCTION_MONTHS};
use crate::types::{Money, Rate};
use crate::RenewablesFinanceResult;

/// Longest debt tenor accepted.
pub const MAX_TENOR_YEARS: u32 = 100;

// ---------------------------------------------------------------------------
// Asset financing inputs
// ---------------------------------------------------------------------------

/// When sponsors contribute their equity during construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquityTiming {
    /// Full equity amount in the first construction period
    Upfront,
    /// Equity spread evenly across all construction periods
    #[default]
    ProRata,
}

/// Asset technology, used to seed default financing terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technology {
    Solar,
    Wind,
    Storage,
}

/// Per-asset financing assumptions.
///
/// All rates are annual decimals (0.06 = 6%), including the OPEX escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialParameters {
    /// Total construction cost of the asset
    pub total_capex: Money,
    /// Maximum debt / capex ratio (0-1)
    pub max_gearing: Rate,
    /// Months of construction before the operational start date
    pub construction_duration_months: i32,
    /// Sponsor equity contribution profile
    #[serde(default)]
    pub equity_timing: EquityTiming,
    /// Annual interest rate on senior debt
    pub interest_rate: Rate,
    /// Debt tenor measured from the operational start
    pub tenor_years: u32,
    /// Target DSCR for fully contracted revenue
    pub target_dscr_contract: Decimal,
    /// Target DSCR for fully merchant revenue
    pub target_dscr_merchant: Decimal,
    /// Base year OPEX
    pub annual_opex: Money,
    /// Annual OPEX escalation rate
    pub opex_escalation: Rate,
    /// Residual value recognised in the final operational period
    #[serde(default)]
    pub terminal_value: Money,
}

impl FinancialParameters {
    /// Default financing terms for a technology at the given capex.
    ///
    /// OPEX defaults to a fixed share of capex; callers normally override it
    /// with asset-specific figures.
    pub fn for_technology(technology: Technology, total_capex: Money) -> Self {
        let (gearing, rate, tenor, dscr_contract, dscr_merchant, opex_share, construction) =
            match technology {
                Technology::Solar => (dec!(0.70), dec!(0.060), 18, dec!(1.35), dec!(2.00), dec!(0.015), 12),
                Technology::Wind => (dec!(0.70), dec!(0.060), 18, dec!(1.35), dec!(2.00), dec!(0.020), 18),
                Technology::Storage => (dec!(0.60), dec!(0.065), 15, dec!(1.40), dec!(1.80), dec!(0.025), 12),
            };

        FinancialParameters {
            total_capex,
            max_gearing: gearing,
            construction_duration_months: construction,
            equity_timing: EquityTiming::ProRata,
            interest_rate: rate,
            tenor_years: tenor,
            target_dscr_contract: dscr_contract,
            target_dscr_merchant: dscr_merchant,
            annual_opex: total_capex * opex_share,
            opex_escalation: dec!(0.025),
            terminal_value: Decimal::ZERO,
        }
    }

    /// Largest debt amount the gearing cap allows.
    pub fn max_debt(&self) -> Money {
        self.total_capex * self.max_gearing
    }

    /// Validate all input constraints.
    pub fn validate(&self) -> RenewablesFinanceResult<()> {
        if self.total_capex <= Decimal::ZERO {
            return Err(RenewablesFinanceError::invalid(
                "total_capex",
                "Total capex must be positive",
            ));
        }
        if self.max_gearing < Decimal::ZERO || self.max_gearing > Decimal::ONE {
            return Err(RenewablesFinanceError::invalid(
                "max_gearing",
                format!("must be between 0 and 1, got {}", self.max_gearing),
            ));
        }
        if !(0..=MAX_CONSTRUCTION_MONTHS).contains(&self.construction_duration_months) {
            return Err(RenewablesFinanceError::invalid(
                "construction_duration_months",
                format!(
                    "must be between 0 and {MAX_CONSTRUCTION_MONTHS}, got {}",
                    self.construction_duration_months
                ),
            ));
        }
        if self.interest_rate <= dec!(-1) {
            return Err(RenewablesFinanceError::invalid(
                "interest_rate",
                "Interest rate must be greater than -100%",
            ));
        }
        if self.tenor_years == 0 || self.tenor_years > MAX_TENOR_YEARS {
            return Err(RenewablesFinanceError::invalid(
                "tenor_years",
                format!(
                    "Debt tenor must be between 1 and {MAX_TENOR_YEARS} years, got {}",
                    self.tenor_years
                ),
            ));
        }
        if self.target_dscr_contract <= Decimal::ZERO || self.target_dscr_merchant <= Decimal::ZERO
        {
            return Err(RenewablesFinanceError::invalid(
                "target_dscr",
                "Target DSCRs must be positive",
            ));
        }
        if self.annual_opex < Decimal::ZERO {
            return Err(RenewablesFinanceError::invalid(
                "annual_opex",
                "Annual OPEX cannot be negative",
            ));
        }
        if self.opex_escalation <= dec!(-1) {
            return Err(RenewablesFinanceError::invalid(
                "opex_escalation",
                "OPEX escalation must be greater than -100%",
            ));
        }
        if self.terminal_value < Decimal::ZERO {
            return Err(RenewablesFinanceError::invalid(
                "terminal_value",
                "Terminal value cannot be negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Binary search controls for debt sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Stop once the search bracket is this narrow (1e-3 = $1,000 in $M)
    pub tolerance: Money,
    /// Hard cap on simulator passes
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: dec!(0.001),
            max_iterations: 50,
        }
    }
}

/// Options for a single project finance run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceConfig {
    /// Search for the maximum DSCR-feasible debt; otherwise gear at `max_gearing`
    pub solve_optimal_gearing: bool,
    /// Add the terminal value to the final operational equity flow
    pub include_terminal_value: bool,
    pub frequency: PeriodFrequency,
    pub solver: SolverConfig,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        FinanceConfig {
            solve_optimal_gearing: true,
            include_terminal_value: true,
            frequency: PeriodFrequency::Monthly,
            solver: SolverConfig::default(),
        }
    }
}

impl FinanceConfig {
    pub fn validate(&self) -> RenewablesFinanceResult<()> {
        if self.solver.tolerance <= Decimal::ZERO {
            return Err(RenewablesFinanceError::invalid(
                "solver.tolerance",
                "Solver tolerance must be positive",
            ));
        }
        if self.solver.max_iterations == 0 {
            return Err(RenewablesFinanceError::invalid(
                "solver.max_iterations",
                "Solver needs at least one iteration",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solar() -> FinancialParameters {
        FinancialParameters::for_technology(Technology::Solar, dec!(100))
    }

    #[test]
    fn test_technology_defaults_are_valid() {
        for tech in [Technology::Solar, Technology::Wind, Technology::Storage] {
            FinancialParameters::for_technology(tech, dec!(250)).validate().unwrap();
        }
    }

    #[test]
    fn test_max_debt() {
        assert_eq!(solar().max_debt(), dec!(70));
    }

    #[test]
    fn test_gearing_above_one_rejected() {
        let mut params = solar();
        params.max_gearing = dec!(1.2);
        let err = params.validate().unwrap_err();
        match err {
            RenewablesFinanceError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "max_gearing");
            }
            other => panic!("Expected InvalidConfiguration, got: {other:?}"),
        }
    }

    #[test]
    fn test_zero_tenor_rejected() {
        let mut params = solar();
        params.tenor_years = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_negative_construction_rejected() {
        let mut params = solar();
        params.construction_duration_months = -3;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_oversized_terms_rejected() {
        let mut params = solar();
        params.tenor_years = 400_000_000;
        match params.validate().unwrap_err() {
            RenewablesFinanceError::InvalidConfiguration { field, .. } => {
                assert_eq!(field, "tenor_years");
            }
            other => panic!("Expected InvalidConfiguration, got: {other:?}"),
        }

        let mut params = solar();
        params.construction_duration_months = i32::MAX;
        assert!(params.validate().is_err());

        let mut params = solar();
        params.tenor_years = MAX_TENOR_YEARS;
        params.construction_duration_months = MAX_CONSTRUCTION_MONTHS;
        params.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: FinanceConfig =
            serde_json::from_str(r#"{"solve_optimal_gearing": false}"#).unwrap();
        assert!(!config.solve_optimal_gearing);
        assert!(config.include_terminal_value);
        assert_eq!(config.solver.max_iterations, 50);
        assert_eq!(config.frequency, PeriodFrequency::Monthly);
    }
}
