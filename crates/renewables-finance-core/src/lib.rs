pub mod error;
pub mod periods;
pub mod time_value;
pub mod types;

#[cfg(feature = "project_finance")]
pub mod project_finance;

#[cfg(feature = "portfolio")]
pub mod portfolio;

pub use error::RenewablesFinanceError;
pub use types::*;

/// Standard result type for all renewables-finance operations
pub type RenewablesFinanceResult<T> = Result<T, RenewablesFinanceError>;
