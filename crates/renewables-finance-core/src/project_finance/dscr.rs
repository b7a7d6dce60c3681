use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::parameters::FinancialParameters;
use super::revenue::RevenuePoint;

/// Lenders never accept a blended target below this coverage.
pub const MIN_TARGET_DSCR: Decimal = dec!(1.05);

/// Revenue-mix weighted target DSCR for a period.
///
/// Blends the contract and merchant tiers by contracted share and floors the
/// result at [`MIN_TARGET_DSCR`]. Without positive revenue the period is
/// treated as fully merchant and the merchant tier is returned as-is.
pub fn target_dscr(revenue: &RevenuePoint, params: &FinancialParameters) -> Decimal {
    let (Some(contracted), Some(merchant)) = (revenue.contracted_share(), revenue.merchant_share())
    else {
        return params.target_dscr_merchant;
    };

    let blended = contracted * params.target_dscr_contract + merchant * params.target_dscr_merchant;
    blended.max(MIN_TARGET_DSCR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_finance::parameters::Technology;

    fn params() -> FinancialParameters {
        let mut p = FinancialParameters::for_technology(Technology::Solar, dec!(100));
        p.target_dscr_contract = dec!(1.35);
        p.target_dscr_merchant = dec!(2.00);
        p
    }

    #[test]
    fn test_fully_merchant_uses_merchant_tier() {
        assert_eq!(target_dscr(&RevenuePoint::merchant(dec!(1)), &params()), dec!(2.00));
    }

    #[test]
    fn test_fully_contracted_uses_contract_tier() {
        assert_eq!(target_dscr(&RevenuePoint::contracted(dec!(1)), &params()), dec!(1.35));
    }

    #[test]
    fn test_mixed_revenue_is_blended() {
        let revenue = RevenuePoint::new(dec!(0.6), dec!(0.4));
        // 0.6 * 1.35 + 0.4 * 2.00 = 1.61
        assert_eq!(target_dscr(&revenue, &params()), dec!(1.61));
    }

    #[test]
    fn test_floor_applies() {
        let mut p = params();
        p.target_dscr_contract = dec!(1.00);
        p.target_dscr_merchant = dec!(1.02);
        assert_eq!(target_dscr(&RevenuePoint::contracted(dec!(1)), &p), MIN_TARGET_DSCR);
    }

    #[test]
    fn test_no_revenue_falls_back_to_merchant_unfloored() {
        let mut p = params();
        p.target_dscr_merchant = dec!(1.01);
        assert_eq!(target_dscr(&RevenuePoint::default(), &p), dec!(1.01));
    }
}
