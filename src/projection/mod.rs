//! Year-by-year household projection: growth, income, expenses, withdrawals, taxes

mod engine;
mod expenses;
mod income;
mod records;
mod returns;
mod state;
mod withdrawals;

pub use engine::{ProjectionConfig, ProjectionEngine, YearStrategy};
pub use expenses::{household_expenses, person_expenses, shortfall};
pub use income::{gis_payment, IncomeCalculator, PersonIncome, PENSION_AGE};
pub use records::{CombinedYear, PersonYear, ProjectionResult, ProjectionSummary, YearRecord};
pub use returns::{FixedReturns, ReturnPath, ReturnSource};
pub use state::{HouseholdState, PersonState};
pub use withdrawals::{execute_withdrawals, AccountPool, WithdrawalOutcome};
