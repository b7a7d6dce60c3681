use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::periods::Period;
use crate::types::{Money, Rate};

/// Revenue earned by an asset in one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub total_revenue: Money,
    pub contracted_revenue: Money,
    pub merchant_revenue: Money,
    /// Generated (or discharged) energy volume, informational only
    #[serde(default)]
    pub generation_volume: Decimal,
}

impl RevenuePoint {
    pub fn new(contracted_revenue: Money, merchant_revenue: Money) -> Self {
        RevenuePoint {
            total_revenue: contracted_revenue + merchant_revenue,
            contracted_revenue,
            merchant_revenue,
            generation_volume: Decimal::ZERO,
        }
    }

    /// Build a point from the green certificate / energy revenue breakdown.
    pub fn from_components(
        contracted_green: Money,
        contracted_energy: Money,
        merchant_green: Money,
        merchant_energy: Money,
        generation_volume: Decimal,
    ) -> Self {
        RevenuePoint {
            generation_volume,
            ..RevenuePoint::new(
                contracted_green + contracted_energy,
                merchant_green + merchant_energy,
            )
        }
    }

    /// Fully merchant revenue.
    pub fn merchant(amount: Money) -> Self {
        RevenuePoint::new(Decimal::ZERO, amount)
    }

    /// Fully contracted revenue.
    pub fn contracted(amount: Money) -> Self {
        RevenuePoint::new(amount, Decimal::ZERO)
    }

    /// Contracted share of total revenue clamped to [0, 1];
    /// `None` when there is no positive total to divide by.
    pub fn contracted_share(&self) -> Option<Rate> {
        if self.total_revenue <= Decimal::ZERO {
            return None;
        }
        let share = self.contracted_revenue / self.total_revenue;
        Some(share.clamp(Decimal::ZERO, Decimal::ONE))
    }

    pub fn merchant_share(&self) -> Option<Rate> {
        self.contracted_share().map(|share| Decimal::ONE - share)
    }
}

/// Source of per-period revenue for an asset.
///
/// The engine calls this once per period before debt sizing starts; it is
/// never consulted from inside the simulation loop.
pub trait RevenueProvider {
    fn revenue(&self, period: &Period) -> RevenuePoint;

    /// Revenue for a period spanning `months` calendar months. Providers
    /// that already answer per period can rely on the default.
    fn revenue_over(&self, period: &Period, _months: u32) -> RevenuePoint {
        self.revenue(period)
    }
}

impl<F> RevenueProvider for F
where
    F: Fn(&Period) -> RevenuePoint,
{
    fn revenue(&self, period: &Period) -> RevenuePoint {
        self(period)
    }
}

/// One calendar entry of a materialised revenue schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatedRevenue {
    pub year: i32,
    /// Omit for annual schedules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(flatten)]
    pub revenue: RevenuePoint,
}

/// Materialised revenue keyed by calendar year and month.
///
/// Periods without an entry earn nothing. For quarterly and annual periods
/// the monthly entries that fall inside the period are summed; an entry with
/// no month matches any annual period of the same year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<DatedRevenue>", into = "Vec<DatedRevenue>")]
pub struct RevenueSchedule {
    entries: BTreeMap<(i32, Option<u32>), RevenuePoint>,
}

impl RevenueSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or accumulate into) the entry for a calendar slot.
    pub fn insert(&mut self, year: i32, month: Option<u32>, revenue: RevenuePoint) {
        let slot = self.entries.entry((year, month)).or_default();
        slot.total_revenue += revenue.total_revenue;
        slot.contracted_revenue += revenue.contracted_revenue;
        slot.merchant_revenue += revenue.merchant_revenue;
        slot.generation_volume += revenue.generation_volume;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Revenue for a period spanning `months` calendar months.
    pub fn revenue_for(&self, period: &Period, months: u32) -> RevenuePoint {
        let mut total = RevenuePoint::default();
        let mut add = |point: &RevenuePoint| {
            total.total_revenue += point.total_revenue;
            total.contracted_revenue += point.contracted_revenue;
            total.merchant_revenue += point.merchant_revenue;
            total.generation_volume += point.generation_volume;
        };

        match period.month {
            Some(first_month) => {
                let mut year = period.year;
                let mut month = first_month;
                for _ in 0..months.max(1) {
                    if let Some(point) = self.entries.get(&(year, Some(month))) {
                        add(point);
                    }
                    month += 1;
                    if month > 12 {
                        month = 1;
                        year += 1;
                    }
                }
            }
            None => {
                for ((_, _), point) in self
                    .entries
                    .range((period.year, None)..=(period.year, Some(12)))
                {
                    add(point);
                }
            }
        }

        total
    }
}

impl RevenueProvider for RevenueSchedule {
    fn revenue(&self, period: &Period) -> RevenuePoint {
        let months = match period.month {
            Some(_) => 1,
            None => 12,
        };
        self.revenue_for(period, months)
    }

    fn revenue_over(&self, period: &Period, months: u32) -> RevenuePoint {
        self.revenue_for(period, months)
    }
}

impl From<Vec<DatedRevenue>> for RevenueSchedule {
    fn from(entries: Vec<DatedRevenue>) -> Self {
        let mut schedule = RevenueSchedule::new();
        for entry in entries {
            schedule.insert(entry.year, entry.month, entry.revenue);
        }
        schedule
    }
}

impl From<RevenueSchedule> for Vec<DatedRevenue> {
    fn from(schedule: RevenueSchedule) -> Self {
        schedule
            .entries
            .into_iter()
            .map(|((year, month), revenue)| DatedRevenue {
                year,
                month,
                revenue,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periods::Phase;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn monthly_period(year: i32, month: u32) -> Period {
        Period {
            index: 0,
            start_date: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            year,
            month: Some(month),
            phase: Phase::Operations,
        }
    }

    #[test]
    fn test_shares() {
        let point = RevenuePoint::new(dec!(3), dec!(1));
        assert_eq!(point.total_revenue, dec!(4));
        assert_eq!(point.contracted_share(), Some(dec!(0.75)));
        assert_eq!(point.merchant_share(), Some(dec!(0.25)));
    }

    #[test]
    fn test_share_undefined_without_revenue() {
        assert_eq!(RevenuePoint::default().contracted_share(), None);
        assert_eq!(RevenuePoint::merchant(dec!(-2)).merchant_share(), None);
    }

    #[test]
    fn test_from_components() {
        let point =
            RevenuePoint::from_components(dec!(0.2), dec!(0.5), dec!(0.1), dec!(0.3), dec!(850));
        assert_eq!(point.contracted_revenue, dec!(0.7));
        assert_eq!(point.merchant_revenue, dec!(0.4));
        assert_eq!(point.total_revenue, dec!(1.1));
        assert_eq!(point.generation_volume, dec!(850));
    }

    #[test]
    fn test_schedule_lookup_and_missing_periods() {
        let mut schedule = RevenueSchedule::new();
        schedule.insert(2027, Some(3), RevenuePoint::contracted(dec!(1.5)));

        assert_eq!(
            schedule.revenue(&monthly_period(2027, 3)).total_revenue,
            dec!(1.5)
        );
        assert_eq!(
            schedule.revenue(&monthly_period(2027, 4)),
            RevenuePoint::default()
        );
    }

    #[test]
    fn test_quarter_sums_months_across_year_end() {
        let mut schedule = RevenueSchedule::new();
        schedule.insert(2027, Some(11), RevenuePoint::merchant(dec!(1)));
        schedule.insert(2027, Some(12), RevenuePoint::merchant(dec!(2)));
        schedule.insert(2028, Some(1), RevenuePoint::merchant(dec!(4)));
        schedule.insert(2028, Some(2), RevenuePoint::merchant(dec!(8)));

        let quarter = schedule.revenue_for(&monthly_period(2027, 11), 3);
        assert_eq!(quarter.total_revenue, dec!(7));
    }

    #[test]
    fn test_annual_period_sums_whole_year() {
        let mut schedule = RevenueSchedule::new();
        schedule.insert(2030, None, RevenuePoint::contracted(dec!(5)));
        schedule.insert(2030, Some(6), RevenuePoint::merchant(dec!(1)));
        schedule.insert(2031, Some(1), RevenuePoint::merchant(dec!(9)));

        let mut period = monthly_period(2030, 1);
        period.month = None;
        let annual = schedule.revenue(&period);
        assert_eq!(annual.total_revenue, dec!(6));
        assert_eq!(annual.contracted_revenue, dec!(5));
    }

    #[test]
    fn test_schedule_deserializes_from_list() {
        let json = r#"[
            {"year": 2027, "month": 1, "total_revenue": "1.0", "contracted_revenue": "0.6", "merchant_revenue": "0.4"},
            {"year": 2027, "month": 2, "total_revenue": 2, "contracted_revenue": 2, "merchant_revenue": 0}
        ]"#;
        let schedule: RevenueSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(
            schedule.revenue(&monthly_period(2027, 2)).contracted_revenue,
            dec!(2)
        );
    }

    #[test]
    fn test_closure_provider() {
        let provider = |_: &Period| RevenuePoint::merchant(dec!(0.5));
        assert_eq!(
            provider.revenue(&monthly_period(2030, 1)).merchant_revenue,
            dec!(0.5)
        );
    }
}
