use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RenewablesFinanceError;
use crate::RenewablesFinanceResult;

/// Input date format for asset start dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest operational horizon a period grid is built for.
pub const MAX_ANALYSIS_HORIZON_YEARS: u32 = 100;

/// Longest construction phase accepted before operations start.
pub const MAX_CONSTRUCTION_MONTHS: i32 = 240;

/// Lifecycle phase of an analysis period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Construction,
    Operations,
}

/// Length of each analysis period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodFrequency {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl PeriodFrequency {
    pub fn months_per_period(self) -> u32 {
        match self {
            PeriodFrequency::Monthly => 1,
            PeriodFrequency::Quarterly => 3,
            PeriodFrequency::Annual => 12,
        }
    }

    pub fn periods_per_year(self) -> u32 {
        12 / self.months_per_period()
    }

    /// Number of whole periods needed to cover `months` (rounded up).
    pub fn periods_covering(self, months: u32) -> u32 {
        months.div_ceil(self.months_per_period())
    }
}

/// A single analysis period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// 0-based sequential position in the analysis
    pub index: usize,
    /// First day of the period
    pub start_date: NaiveDate,
    pub year: i32,
    /// Calendar month 1-12; `None` for annual periods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub phase: Phase,
}

impl Period {
    pub fn is_construction(&self) -> bool {
        self.phase == Phase::Construction
    }

    pub fn is_operational(&self) -> bool {
        self.phase == Phase::Operations
    }
}

/// Parse a `YYYY-MM-DD` date and snap it to the first of its month.
pub fn parse_month_start(date: &str) -> RenewablesFinanceResult<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).map_err(|e| {
        RenewablesFinanceError::invalid(
            "asset_start_date",
            format!("'{date}' is not a valid {DATE_FORMAT} date: {e}"),
        )
    })?;
    parsed.with_day(1).ok_or_else(|| {
        RenewablesFinanceError::DateError(format!("cannot take month start of {parsed}"))
    })
}

/// Build the ordered list of analysis periods.
///
/// Periods run from `asset_start - construction_duration_months` up to (but
/// excluding) `asset_start + analysis_horizon_years`. Each period is tagged
/// `Construction` when it starts before the asset's operational start date.
pub fn generate_periods(
    asset_start_date: &str,
    construction_duration_months: i32,
    analysis_horizon_years: u32,
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<Vec<Period>> {
    let asset_start = parse_month_start(asset_start_date)?;

    if !(0..=MAX_CONSTRUCTION_MONTHS).contains(&construction_duration_months) {
        return Err(RenewablesFinanceError::invalid(
            "construction_duration_months",
            format!(
                "must be between 0 and {MAX_CONSTRUCTION_MONTHS}, got {construction_duration_months}"
            ),
        ));
    }
    if analysis_horizon_years == 0 || analysis_horizon_years > MAX_ANALYSIS_HORIZON_YEARS {
        return Err(RenewablesFinanceError::invalid(
            "analysis_horizon_years",
            format!(
                "Analysis horizon must be between 1 and {MAX_ANALYSIS_HORIZON_YEARS} years, got \
                 {analysis_horizon_years}"
            ),
        ));
    }

    let step = frequency.months_per_period();
    let construction_periods = frequency.periods_covering(construction_duration_months as u32);
    let operational_periods = analysis_horizon_years * frequency.periods_per_year();

    let first_start = asset_start
        .checked_sub_months(Months::new(construction_periods * step))
        .ok_or_else(|| {
            RenewablesFinanceError::DateError(format!(
                "construction start before {asset_start} is out of range"
            ))
        })?;

    let total = (construction_periods + operational_periods) as usize;
    let mut periods = Vec::with_capacity(total);

    for index in 0..total {
        let start_date = first_start
            .checked_add_months(Months::new(index as u32 * step))
            .ok_or_else(|| {
                RenewablesFinanceError::DateError(format!(
                    "period {index} after {first_start} is out of range"
                ))
            })?;
        let phase = if start_date < asset_start {
            Phase::Construction
        } else {
            Phase::Operations
        };
        periods.push(Period {
            index,
            start_date,
            year: start_date.year(),
            month: match frequency {
                PeriodFrequency::Annual => None,
                _ => Some(start_date.month()),
            },
            phase,
        });
    }

    Ok(periods)
}

/// Check the invariants of a caller-supplied period list: contiguous
/// 0-based indices, start dates exactly one `frequency` step apart, month
/// labels matching the frequency, a single construction to operations
/// transition and at least one operational period.
pub fn validate_periods(
    periods: &[Period],
    frequency: PeriodFrequency,
) -> RenewablesFinanceResult<()> {
    if periods.is_empty() {
        return Err(RenewablesFinanceError::invalid(
            "periods",
            "At least one period is required",
        ));
    }

    let step = frequency.months_per_period();
    let mut seen_operations = false;
    for (i, period) in periods.iter().enumerate() {
        if period.index != i {
            return Err(RenewablesFinanceError::invalid(
                "periods",
                format!("period at position {i} has index {}", period.index),
            ));
        }
        let expected_month = match frequency {
            PeriodFrequency::Annual => None,
            _ => Some(period.start_date.month()),
        };
        if period.month != expected_month {
            return Err(RenewablesFinanceError::invalid(
                "periods",
                format!(
                    "period {i} has month {:?} but {frequency:?} periods starting {} expect {:?}",
                    period.month, period.start_date, expected_month
                ),
            ));
        }
        if i > 0 {
            let previous = periods[i - 1].start_date;
            let expected = previous.checked_add_months(Months::new(step));
            if expected != Some(period.start_date) {
                return Err(RenewablesFinanceError::invalid(
                    "periods",
                    format!(
                        "period {i} starts {} but {frequency:?} periods after {previous} start {}",
                        period.start_date,
                        expected.map_or_else(|| "out of range".to_string(), |d| d.to_string())
                    ),
                ));
            }
        }
        match period.phase {
            Phase::Operations => seen_operations = true,
            Phase::Construction if seen_operations => {
                return Err(RenewablesFinanceError::invalid(
                    "periods",
                    format!("construction period {i} follows an operational period"),
                ));
            }
            Phase::Construction => {}
        }
    }

    if !seen_operations {
        return Err(RenewablesFinanceError::invalid(
            "periods",
            "No operational periods in the analysis horizon",
        ));
    }

    Ok(())
}

/// Number of leading construction periods.
pub fn construction_period_count(periods: &[Period]) -> usize {
    periods.iter().take_while(|p| p.is_construction()).count()
}
