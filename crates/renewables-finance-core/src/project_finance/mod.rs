pub mod cash_flows;
pub mod dscr;
pub mod equity;
pub mod model;
pub mod opex;
pub mod parameters;
pub mod revenue;
pub mod simulator;
pub mod sizing;

pub use model::{
    compute_project_finance, model_project_finance, size_debt_for, ProjectFinanceInput,
    ProjectFinanceResult,
};
pub use parameters::{EquityTiming, FinanceConfig, FinancialParameters, SolverConfig, Technology};
pub use revenue::{RevenuePoint, RevenueProvider, RevenueSchedule};
