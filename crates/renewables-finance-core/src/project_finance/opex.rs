use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::RenewablesFinanceError;
use crate::periods::{Period, PeriodFrequency};
use crate::types::{Money, Rate};
use crate::RenewablesFinanceResult;

/// OPEX charged in one period.
///
/// `annual_opex / 12 * months_per_period * (1 + escalation)^(elapsed_months / 12)`,
/// with elapsed months counted from the first analysis period. The exponent is
/// fractional, so escalation accrues smoothly month by month rather than in
/// annual steps. Construction periods carry no OPEX.
pub fn period_opex(
    period: &Period,
    annual_opex: Money,
    opex_escalation: Rate,
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<Money> {
    if period.is_construction() || annual_opex.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let months = frequency.months_per_period();
    let base = annual_opex / dec!(12) * Decimal::from(months);
    let elapsed_months = Decimal::from(period.index as u64 * months as u64);

    Ok(base * escalation_factor(opex_escalation, elapsed_months)?)
}

/// `(1 + escalation)^(elapsed_months / 12)`
fn escalation_factor(escalation: Rate, elapsed_months: Decimal) -> RenewablesFinanceResult<Decimal> {
    if escalation.is_zero() || elapsed_months.is_zero() {
        return Ok(Decimal::ONE);
    }
    let years = elapsed_months / dec!(12);
    (Decimal::ONE + escalation)
        .checked_powd(years)
        .ok_or_else(|| RenewablesFinanceError::invalid(
            "opex_escalation",
            format!("escalation of {escalation} over {years} years overflows"),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::{generate_periods, Phase};
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_month_is_unescalated() {
        let periods = generate_periods("2027-01-01", 0, 2, PeriodFrequency::Monthly).unwrap();
        let opex = period_opex(&periods[0], dec!(1.2), dec!(0.03), PeriodFrequency::Monthly).unwrap();
        assert_eq!(opex, dec!(0.1));
    }

    #[test]
    fn test_escalation_after_one_year() {
        let periods = generate_periods("2027-01-01", 0, 2, PeriodFrequency::Monthly).unwrap();
        let opex =
            period_opex(&periods[12], dec!(1.2), dec!(0.03), PeriodFrequency::Monthly).unwrap();
        assert!((opex - dec!(0.103)).abs() < dec!(0.0000001), "got {opex}");
    }

    #[test]
    fn test_escalation_is_continuous_within_year() {
        let periods = generate_periods("2027-01-01", 0, 2, PeriodFrequency::Monthly).unwrap();
        let month_six =
            period_opex(&periods[6], dec!(1.2), dec!(0.03), PeriodFrequency::Monthly).unwrap();
        // 0.1 * 1.03^0.5 ≈ 0.101489
        assert!(month_six > dec!(0.1) && month_six < dec!(0.103));
        assert!((month_six - dec!(0.1014889)).abs() < dec!(0.000001), "got {month_six}");
    }

    #[test]
    fn test_elapsed_time_counts_construction() {
        let periods = generate_periods("2027-01-01", 12, 2, PeriodFrequency::Monthly).unwrap();
        assert_eq!(periods[12].phase, Phase::Operations);
        let first_operational =
            period_opex(&periods[12], dec!(1.2), dec!(0.03), PeriodFrequency::Monthly).unwrap();
        assert!((first_operational - dec!(0.103)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_construction_has_no_opex() {
        let periods = generate_periods("2027-01-01", 6, 1, PeriodFrequency::Monthly).unwrap();
        let opex = period_opex(&periods[0], dec!(12), dec!(0.03), PeriodFrequency::Monthly).unwrap();
        assert_eq!(opex, Decimal::ZERO);
    }

    #[test]
    fn test_quarterly_period_charges_three_months() {
        let periods = generate_periods("2027-01-01", 0, 1, PeriodFrequency::Quarterly).unwrap();
        let opex =
            period_opex(&periods[0], dec!(1.2), dec!(0.03), PeriodFrequency::Quarterly).unwrap();
        assert_eq!(opex, dec!(0.3));
    }
}
