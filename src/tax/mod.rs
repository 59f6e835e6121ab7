//! Income tax: single-person calculator, household tax engine, and pension-split optimizer

mod calculator;
mod engine;
mod split;

pub use calculator::{
    bracket_tax, credit_base, tax_for_jurisdiction, TaxBreakdown, TaxCalculator, TaxProfile,
};
pub use engine::{
    oas_clawback, realized_gain, HouseholdTaxResult, PersonTaxInput, PersonTaxResult, TaxEngine,
};
pub use split::{
    eligible_pension_sources, split_fractions, PensionSplit, PensionSplitMode, SplitOptimizer,
};
