//! Sources of annual account returns for the growth step

use crate::household::Accounts;

/// Supplies the return applied to each account type in a simulated year
pub trait ReturnSource {
    /// Returns for the `year_index`-th simulated year (0-based)
    fn returns_for(&mut self, year_index: usize, year: i32) -> Accounts;
}

/// The scenario's configured mean returns, every year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedReturns(pub Accounts);

impl ReturnSource for FixedReturns {
    fn returns_for(&mut self, _year_index: usize, _year: i32) -> Accounts {
        self.0
    }
}

/// A pre-drawn path of returns, one entry per simulated year
///
/// Years past the end of the path repeat the last entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReturnPath {
    pub years: Vec<Accounts>,
}

impl ReturnPath {
    pub fn new(years: Vec<Accounts>) -> Self {
        Self { years }
    }
}

impl ReturnSource for ReturnPath {
    fn returns_for(&mut self, year_index: usize, _year: i32) -> Accounts {
        self.years
            .get(year_index)
            .or_else(|| self.years.last())
            .copied()
            .unwrap_or_default()
    }
}
