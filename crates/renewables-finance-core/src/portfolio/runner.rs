use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Instant;

use super::aggregation::{aggregate, PortfolioResult};
use crate::error::RenewablesFinanceError;
use crate::periods::PeriodFrequency;
use crate::project_finance::model::{model_project_finance, ProjectFinanceInput, ProjectFinanceResult};
use crate::types::{with_metadata, ComputationOutput};
use crate::RenewablesFinanceResult;

/// A set of independently financed assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioInput {
    pub portfolio_name: String,
    pub assets: Vec<ProjectFinanceInput>,
}

/// One asset's run inside a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetOutcome {
    pub asset_name: String,
    pub result: ProjectFinanceResult,
    pub warnings: Vec<String>,
}

/// Finance every asset on its own worker thread and aggregate the results.
///
/// Assets share nothing, so each run is independent. The first asset that
/// fails validation aborts the whole portfolio.
pub fn compute_portfolio(
    input: &PortfolioInput,
) -> RenewablesFinanceResult<ComputationOutput<PortfolioResult>> {
    let start = Instant::now();
    let frequency = common_frequency(input)?;

    let runs: Vec<RenewablesFinanceResult<AssetOutcome>> = thread::scope(|scope| {
        let handles: Vec<_> = input
            .assets
            .iter()
            .map(|asset| scope.spawn(move || run_asset(asset)))
            .collect();

        handles
            .into_iter()
            .zip(&input.assets)
            .map(|(handle, asset)| {
                handle.join().unwrap_or_else(|_| {
                    Err(RenewablesFinanceError::InsufficientData(format!(
                        "asset '{}': worker terminated before producing a result",
                        asset.asset_name
                    )))
                })
            })
            .collect()
    });
    let outcomes = runs.into_iter().collect::<RenewablesFinanceResult<Vec<_>>>()?;

    let mut warnings: Vec<String> = outcomes
        .iter()
        .flat_map(|o| o.warnings.iter().map(move |w| format!("{}: {w}", o.asset_name)))
        .collect();

    let result = aggregate(outcomes, frequency)?;
    if result.unsolved_assets > 0 {
        warnings.push(format!(
            "{} of {} assets fell back to a conservative debt level",
            result.unsolved_assets,
            result.assets.len()
        ));
    }
    if result.equity_irr.is_none() {
        warnings.push("Portfolio equity IRR undefined or did not converge".to_string());
    }

    Ok(with_metadata(
        "Renewables Portfolio (independent asset financing, calendar-aligned equity)",
        &serde_json::json!({
            "portfolio_name": input.portfolio_name,
            "asset_count": input.assets.len(),
            "frequency": format!("{frequency:?}"),
        }),
        warnings,
        start,
        result,
    ))
}

fn run_asset(asset: &ProjectFinanceInput) -> RenewablesFinanceResult<AssetOutcome> {
    let (result, warnings) = model_project_finance(asset)
        .map_err(|e| name_asset(&asset.asset_name, e))?
        .into_parts();
    Ok(AssetOutcome {
        asset_name: asset.asset_name.clone(),
        result,
        warnings,
    })
}

/// Prefix an asset error with the asset it came from.
fn name_asset(asset_name: &str, error: RenewablesFinanceError) -> RenewablesFinanceError {
    match error {
        RenewablesFinanceError::InvalidConfiguration { field, reason } => {
            RenewablesFinanceError::InvalidConfiguration {
                field: format!("{asset_name}.{field}"),
                reason,
            }
        }
        RenewablesFinanceError::InsufficientData(msg) => {
            RenewablesFinanceError::InsufficientData(format!("asset '{asset_name}': {msg}"))
        }
        RenewablesFinanceError::DateError(msg) => {
            RenewablesFinanceError::DateError(format!("asset '{asset_name}': {msg}"))
        }
        other => other,
    }
}

/// All assets must share a period frequency for their equity flows to align.
fn common_frequency(input: &PortfolioInput) -> RenewablesFinanceResult<PeriodFrequency> {
    let first = input.assets.first().ok_or_else(|| {
        RenewablesFinanceError::invalid("assets", "Portfolio needs at least one asset")
    })?;
    let frequency = first.config.frequency;

    if let Some(odd) = input
        .assets
        .iter()
        .find(|a| a.config.frequency != frequency)
    {
        return Err(RenewablesFinanceError::invalid(
            "config.frequency",
            format!(
                "asset '{}' uses {:?} periods but '{}' uses {:?}",
                odd.asset_name, odd.config.frequency, first.asset_name, frequency
            ),
        ));
    }
    Ok(frequency)
}
