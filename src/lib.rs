//! Retirement Projection - year-by-year household retirement engine for Canadian retirees
//!
//! This library provides:
//! - Deterministic projections of two alternative scenarios (A and B)
//! - CPP, OAS, and GIS benefits with OAS clawback
//! - Withdrawal sequencing with RRIF minimums and LIF maximums
//! - Federal and provincial income tax, including the Ontario surtax and capital gains inclusion
//! - Pension income splitting optimization
//! - Monte Carlo analysis of final assets under randomized returns

pub mod error;
pub mod household;
pub mod monte_carlo;
pub mod projection;
pub mod scenario;
pub mod tables;
pub mod tax;

// Re-export commonly used types
pub use error::{EngineError, Result};
pub use household::{Accounts, AccountType, PersistedState, Person, ScenarioId, ScenarioInput};
pub use monte_carlo::{MonteCarloConfig, MonteCarloEngine, MonteCarloMode, MonteCarloSummary};
pub use projection::{ProjectionConfig, ProjectionEngine, ProjectionResult, YearRecord};
pub use scenario::{ScenarioComparison, ScenarioRunner};
pub use tables::TaxTables;
pub use tax::PensionSplitMode;
