//! Government benefit parameters: CPP adjustments, OAS, GIS, and capital-gains inclusion

use serde::{Deserialize, Serialize};

/// GIS parameters for one household type (base-year dollars)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GisRates {
    /// Maximum annual payment (combined for couples)
    pub max_payment: f64,
    /// Prior-year income at or above which no GIS is paid
    pub income_threshold: f64,
    /// Income exempt from the reduction
    pub exemption: f64,
}

/// Capital gains inclusion rules (not indexed)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsRules {
    /// Realized gains per person per year taxed at the lower inclusion rate
    pub threshold: f64,
    pub lower_inclusion: f64,
    pub upper_inclusion: f64,
}

impl CapitalGainsRules {
    /// Taxable portion of a year's realized gains
    pub fn taxable_amount(&self, realized: f64) -> f64 {
        if realized <= 0.0 {
            return 0.0;
        }
        let lower = realized.min(self.threshold);
        let upper = (realized - self.threshold).max(0.0);
        lower * self.lower_inclusion + upper * self.upper_inclusion
    }
}

impl Default for CapitalGainsRules {
    fn default() -> Self {
        Self {
            threshold: 250_000.0,
            lower_inclusion: 0.5,
            upper_inclusion: 2.0 / 3.0,
        }
    }
}

/// Benefit program parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitTables {
    /// CPP reduction per month taken before 65
    pub cpp_early_reduction_per_month: f64,
    /// CPP increase per month deferred past 65
    pub cpp_late_increase_per_month: f64,

    /// Full-residency OAS annual payment at 65
    pub oas_annual_max: f64,
    /// Residency years required for full OAS
    pub oas_full_residency_years: u32,
    /// OAS increase per month deferred past 65
    pub oas_deferral_bonus_per_month: f64,
    /// Age at which the OAS boost starts
    pub oas_boost_age: u32,
    pub oas_boost_rate: f64,
    /// Net income above which OAS is recovered
    pub oas_clawback_threshold: f64,
    pub oas_clawback_rate: f64,

    pub gis_single: GisRates,
    pub gis_couple: GisRates,
    /// Reduction per dollar of income above the exemption
    pub gis_reduction_rate: f64,

    pub capital_gains: CapitalGainsRules,
}

impl BenefitTables {
    /// 2024 program parameters
    pub fn canada_2024() -> Self {
        Self {
            cpp_early_reduction_per_month: 0.006,
            cpp_late_increase_per_month: 0.007,
            oas_annual_max: 8_560.0,
            oas_full_residency_years: 40,
            oas_deferral_bonus_per_month: 0.006,
            oas_boost_age: 75,
            oas_boost_rate: 0.10,
            oas_clawback_threshold: 90_997.0,
            oas_clawback_rate: 0.15,
            gis_single: GisRates {
                max_payment: 12_785.64,
                income_threshold: 21_624.0,
                exemption: 5_000.0,
            },
            gis_couple: GisRates {
                max_payment: 15_392.16,
                income_threshold: 28_560.0,
                exemption: 5_000.0,
            },
            gis_reduction_rate: 0.5,
            capital_gains: CapitalGainsRules::default(),
        }
    }
}

impl Default for BenefitTables {
    fn default() -> Self {
        Self::canada_2024()
    }
}
