use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dscr::target_dscr;
use super::opex::period_opex;
use super::parameters::FinancialParameters;
use super::revenue::{RevenuePoint, RevenueProvider};
use crate::periods::{Period, PeriodFrequency};
use crate::types::Money;
use crate::RenewablesFinanceResult;

/// Operating position of the asset in one period.
///
/// Built once per run; every debt sizing probe reads the same slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodCashFlow {
    pub period: Period,
    pub revenue: RevenuePoint,
    pub opex: Money,
    /// Revenue less OPEX (cash flow available for debt service)
    pub operating_cash_flow: Money,
    pub target_dscr: Decimal,
}

/// Resolve revenue, OPEX, operating cash flow and target DSCR for every
/// period. Construction periods earn and spend nothing.
pub fn build_period_cash_flows<R>(
    periods: &[Period],
    revenue: &R,
    params: &FinancialParameters,
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<Vec<PeriodCashFlow>>
where
    R: RevenueProvider + ?Sized,
{
    periods
        .iter()
        .map(|period| {
            let point = if period.is_operational() {
                revenue.revenue_over(period, frequency.months_per_period())
            } else {
                RevenuePoint::default()
            };
            let opex = period_opex(period, params.annual_opex, params.opex_escalation, frequency)?;
            let target = target_dscr(&point, params);
            Ok(PeriodCashFlow {
                operating_cash_flow: point.total_revenue - opex,
                period: period.clone(),
                revenue: point,
                opex,
                target_dscr: target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::generate_periods;
    use crate::project_finance::parameters::Technology;
    use rust_decimal_macros::dec;

    #[test]
    fn test_operating_cash_flow_is_revenue_less_opex() {
        let periods = generate_periods("2027-01-01", 3, 1, PeriodFrequency::Monthly).unwrap();
        let mut params = FinancialParameters::for_technology(Technology::Wind, dec!(100));
        params.annual_opex = dec!(1.2);
        params.opex_escalation = Decimal::ZERO;

        let provider = |_: &Period| RevenuePoint::contracted(dec!(0.5));
        let flows =
            build_period_cash_flows(&periods, &provider, &params, PeriodFrequency::Monthly).unwrap();

        assert_eq!(flows.len(), 15);
        for flow in &flows[..3] {
            assert_eq!(flow.operating_cash_flow, Decimal::ZERO);
            assert_eq!(flow.revenue, RevenuePoint::default());
        }
        for flow in &flows[3..] {
            assert_eq!(flow.opex, dec!(0.1));
            assert_eq!(flow.operating_cash_flow, dec!(0.4));
            assert_eq!(flow.target_dscr, params.target_dscr_contract);
        }
    }
}
