use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenewablesFinanceError {
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RenewablesFinanceError {
    /// Shorthand for the configuration errors raised by input validation.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RenewablesFinanceError::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RenewablesFinanceError {
    fn from(e: serde_json::Error) -> Self {
        RenewablesFinanceError::SerializationError(e.to_string())
    }
}
