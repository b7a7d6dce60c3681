pub mod aggregation;
pub mod runner;

pub use aggregation::{DatedCashFlow, PortfolioResult};
pub use runner::{compute_portfolio, AssetOutcome, PortfolioInput};
