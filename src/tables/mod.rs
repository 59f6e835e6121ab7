//! Read-only tax and benefit tables consumed by the engine
//!
//! All dollar amounts are in base-year dollars and are indexed forward by the
//! scenario's global COLA at the point of use.

mod benefits;
mod jurisdiction;
mod withdrawal_limits;
pub mod loader;

pub use benefits::{BenefitTables, CapitalGainsRules, GisRates};
pub use jurisdiction::{JurisdictionTable, Surtax, TaxBracket, TaxCredits};
pub use loader::LoadedTables;
pub use withdrawal_limits::{LifMaximumTable, RrifMinimumTable};

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Base year of the built-in tables
pub const DEFAULT_BASE_YEAR: i32 = 2024;

/// Compound `rate` from `from_year` to `to_year`
pub fn inflation_factor(rate: f64, from_year: i32, to_year: i32) -> f64 {
    (1.0 + rate).powi(to_year - from_year)
}

/// Container for every table the engine reads
#[derive(Debug, Clone)]
pub struct TaxTables {
    /// Year the dollar amounts are expressed in
    pub base_year: i32,
    pub federal: JurisdictionTable,
    /// Provincial schedules keyed by province code
    pub provinces: HashMap<String, JurisdictionTable>,
    pub benefits: BenefitTables,
    pub rrif: RrifMinimumTable,
    pub lif: LifMaximumTable,
}

impl TaxTables {
    /// Built-in 2024 federal, ON, BC, and AB tables
    pub fn canada_2024() -> Self {
        let provinces = [
            JurisdictionTable::ontario_2024(),
            JurisdictionTable::british_columbia_2024(),
            JurisdictionTable::alberta_2024(),
        ]
        .into_iter()
        .map(|t| (t.code.clone(), t))
        .collect();

        Self {
            base_year: DEFAULT_BASE_YEAR,
            federal: JurisdictionTable::federal_2024(),
            provinces,
            benefits: BenefitTables::canada_2024(),
            rrif: RrifMinimumTable::default(),
            lif: LifMaximumTable::default(),
        }
    }

    /// Load tables from CSV files in the default location (data/tax_tables/)
    pub fn from_csv() -> Result<Self> {
        Self::from_csv_path(Path::new(loader::DEFAULT_TABLES_PATH))
    }

    /// Load tables from CSV files in a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let loaded = LoadedTables::load_from(path)?;
        loaded.into_tables()
    }

    /// Provincial schedule for `code`, if modelled
    pub fn province(&self, code: &str) -> Option<&JurisdictionTable> {
        self.provinces.get(code)
    }

    pub fn has_province(&self, code: &str) -> bool {
        self.provinces.contains_key(code)
    }

    /// Index factor from the base year to `year` at `cola`
    pub fn index_to(&self, cola: f64, year: i32) -> f64 {
        inflation_factor(cola, self.base_year, year)
    }
}

impl Default for TaxTables {
    fn default() -> Self {
        Self::canada_2024()
    }
}
