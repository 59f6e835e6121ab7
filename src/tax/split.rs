//! Pension income splitting optimizer
//!
//! Searches a discrete grid of split fractions (0% to 50% of the transferor's
//! eligible pension income, in either direction) for the lowest household bill.

use serde::{Deserialize, Serialize};

use super::engine::{HouseholdTaxResult, PersonTaxInput, TaxEngine};
use crate::error::{EngineError, Result};
use crate::household::Owner;

/// Largest share of eligible pension income that may be transferred
pub const MAX_SPLIT_FRACTION: f64 = 0.5;

/// Pension income moved from one spouse to the other
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PensionSplit {
    /// Spouse transferring income
    pub from: Owner,
    pub amount: f64,
}

/// Whether and how finely to optimize pension splitting each year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PensionSplitMode {
    #[default]
    Off,
    /// Search `grid_points` evenly spaced fractions from 0 to 50%
    Optimize { grid_points: usize },
}

impl PensionSplitMode {
    /// 1% steps, used by the deterministic projection
    pub const FULL_GRID: usize = 51;
    /// Coarse grid used inside Monte Carlo trials
    pub const FAST_GRID: usize = 10;

    pub fn full() -> Self {
        PensionSplitMode::Optimize { grid_points: Self::FULL_GRID }
    }

    pub fn fast() -> Self {
        PensionSplitMode::Optimize { grid_points: Self::FAST_GRID }
    }

    /// A grid needs both endpoints to search anything
    pub fn validate(&self) -> Result<()> {
        match self {
            PensionSplitMode::Optimize { grid_points } if *grid_points < 2 => {
                Err(EngineError::InvalidOptimizer(format!(
                    "split grid needs at least 2 points, got {}",
                    grid_points
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Evenly spaced split fractions from 0 to `MAX_SPLIT_FRACTION`
pub fn split_fractions(grid_points: usize) -> Vec<f64> {
    if grid_points < 2 {
        return vec![0.0];
    }
    let steps = (grid_points - 1) as f64;
    (0..grid_points)
        .map(|i| MAX_SPLIT_FRACTION * i as f64 / steps)
        .collect()
}

/// Spouses with pension income that may be split, with the eligible amount
pub fn eligible_pension_sources(user: &PersonTaxInput, spouse: &PersonTaxInput) -> Vec<(Owner, f64)> {
    [(Owner::User, user), (Owner::Spouse, spouse)]
        .into_iter()
        .map(|(owner, input)| (owner, input.eligible_pension_income()))
        .filter(|(_, eligible)| *eligible > 0.0)
        .collect()
}

/// Grid search over pension splits for one year
#[derive(Debug, Clone, Copy)]
pub struct SplitOptimizer<'a> {
    engine: TaxEngine<'a>,
    grid_points: usize,
}

impl<'a> SplitOptimizer<'a> {
    pub fn new(engine: TaxEngine<'a>, grid_points: usize) -> Self {
        Self { engine, grid_points }
    }

    /// Split with the lowest income tax plus OAS recovery; ties keep the earlier candidate
    pub fn optimal_split(
        &self,
        user: &PersonTaxInput,
        spouse: &PersonTaxInput,
    ) -> (Option<PensionSplit>, HouseholdTaxResult) {
        let mut best_split = None;
        let mut best = self.engine.household_tax(user, Some(spouse), None);

        for (from, eligible) in eligible_pension_sources(user, spouse) {
            for fraction in split_fractions(self.grid_points).into_iter().skip(1) {
                let split = PensionSplit { from, amount: eligible * fraction };
                let candidate = self.engine.household_tax(user, Some(spouse), Some(split));
                if candidate.amount_due() < best.amount_due() - 1e-9 {
                    best = candidate;
                    best_split = Some(split);
                }
            }
        }

        (best_split, best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::TaxTables;

    #[test]
    fn test_split_fractions() {
        let fast = split_fractions(PensionSplitMode::FAST_GRID);
        assert_eq!(fast.len(), 10);
        assert_eq!(fast[0], 0.0);
        assert!((fast[9] - 0.5).abs() < 1e-12);

        let full = split_fractions(PensionSplitMode::FULL_GRID);
        assert_eq!(full.len(), 51);
        assert!((full[1] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_mode_validation() {
        assert!(PensionSplitMode::Off.validate().is_ok());
        assert!(PensionSplitMode::fast().validate().is_ok());
        assert!(matches!(
            PensionSplitMode::Optimize { grid_points: 1 }.validate(),
            Err(EngineError::InvalidOptimizer(_))
        ));
    }

    #[test]
    fn test_eligible_sources_require_age_65() {
        let user = PersonTaxInput { age: 70, registered_withdrawals: 30_000.0, ..Default::default() };
        let spouse = PersonTaxInput { age: 62, registered_withdrawals: 10_000.0, ..Default::default() };
        let sources = eligible_pension_sources(&user, &spouse);
        assert_eq!(sources, vec![(Owner::User, 30_000.0)]);
    }

    #[test]
    fn test_optimizer_splits_unequal_incomes() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let optimizer = SplitOptimizer::new(engine, PensionSplitMode::FULL_GRID);

        let user = PersonTaxInput { age: 72, registered_withdrawals: 120_000.0, ..Default::default() };
        let spouse = PersonTaxInput { age: 70, ..Default::default() };

        let baseline = engine.household_tax(&user, Some(&spouse), None);
        let (split, result) = optimizer.optimal_split(&user, &spouse);

        let split = split.expect("splitting should help");
        assert_eq!(split.from, Owner::User);
        assert!(split.amount > 0.0 && split.amount <= 60_000.0 + 1e-9);
        assert!(result.amount_due() < baseline.amount_due());
    }

    #[test]
    fn test_optimizer_keeps_no_split_for_equal_incomes() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let optimizer = SplitOptimizer::new(engine, PensionSplitMode::FAST_GRID);

        let person = PersonTaxInput { age: 70, registered_withdrawals: 50_000.0, ..Default::default() };
        let (split, _) = optimizer.optimal_split(&person, &person);
        assert!(split.is_none());
    }
}
