//! Tax brackets, non-refundable credits, and surtax rules per jurisdiction

use serde::{Deserialize, Serialize};

/// One marginal bracket. `up_to = None` marks the final, unbounded bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Upper bound of taxable income for this bracket (inclusive)
    pub up_to: Option<f64>,
    /// Marginal rate applied to income inside the bracket
    pub rate: f64,
}

impl TaxBracket {
    pub const fn upto(up_to: f64, rate: f64) -> Self {
        Self { up_to: Some(up_to), rate }
    }

    pub const fn over(rate: f64) -> Self {
        Self { up_to: None, rate }
    }
}

/// Non-refundable credit amounts (base-year dollars)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxCredits {
    /// Basic personal amount
    pub bpa: f64,
    /// Age amount available at 65+
    pub age_amount: f64,
    /// Net income above which the age amount is reduced by 15%
    pub age_amount_threshold: f64,
    /// Maximum pension income amount
    pub pension_income_amount: f64,
    /// Cap on the 3%-of-income medical expense threshold
    pub medical_expense_threshold_limit: f64,
}

/// Two-tier surtax levied on the tax amount itself (Ontario)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surtax {
    pub first_threshold: f64,
    pub first_rate: f64,
    pub second_threshold: f64,
    pub second_rate: f64,
}

impl Surtax {
    /// Surtax owed on `basic_tax`, with thresholds scaled by `inflation`
    pub fn on_tax(&self, basic_tax: f64, inflation: f64) -> f64 {
        let first = (basic_tax - self.first_threshold * inflation).max(0.0) * self.first_rate;
        let second = (basic_tax - self.second_threshold * inflation).max(0.0) * self.second_rate;
        first + second
    }
}

/// Complete tax schedule for one jurisdiction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionTable {
    /// Jurisdiction code ("FED", "ON", "BC", ...)
    pub code: String,
    /// Brackets in ascending order; last entry is unbounded
    pub brackets: Vec<TaxBracket>,
    pub credits: TaxCredits,
    #[serde(default)]
    pub surtax: Option<Surtax>,
}

impl JurisdictionTable {
    /// Rate of the lowest bracket, used to convert credits to tax dollars
    pub fn lowest_rate(&self) -> f64 {
        self.brackets.first().map(|b| b.rate).unwrap_or(0.0)
    }

    /// 2024 federal schedule
    pub fn federal_2024() -> Self {
        Self {
            code: "FED".to_string(),
            brackets: vec![
                TaxBracket::upto(55_867.0, 0.15),
                TaxBracket::upto(111_733.0, 0.205),
                TaxBracket::upto(173_205.0, 0.26),
                TaxBracket::upto(246_752.0, 0.29),
                TaxBracket::over(0.33),
            ],
            credits: TaxCredits {
                bpa: 15_705.0,
                age_amount: 8_790.0,
                age_amount_threshold: 44_325.0,
                pension_income_amount: 2_000.0,
                medical_expense_threshold_limit: 2_759.0,
            },
            surtax: None,
        }
    }

    /// 2024 Ontario schedule, including the provincial surtax
    pub fn ontario_2024() -> Self {
        Self {
            code: "ON".to_string(),
            brackets: vec![
                TaxBracket::upto(51_446.0, 0.0505),
                TaxBracket::upto(102_894.0, 0.0915),
                TaxBracket::upto(150_000.0, 0.1116),
                TaxBracket::upto(220_000.0, 0.1216),
                TaxBracket::over(0.1316),
            ],
            credits: TaxCredits {
                bpa: 12_399.0,
                age_amount: 6_223.0,
                age_amount_threshold: 46_330.0,
                pension_income_amount: 1_762.0,
                medical_expense_threshold_limit: 2_759.0,
            },
            surtax: Some(Surtax {
                first_threshold: 5_554.0,
                first_rate: 0.20,
                second_threshold: 7_108.0,
                second_rate: 0.36,
            }),
        }
    }

    /// 2024 British Columbia schedule
    pub fn british_columbia_2024() -> Self {
        Self {
            code: "BC".to_string(),
            brackets: vec![
                TaxBracket::upto(47_937.0, 0.0506),
                TaxBracket::upto(95_875.0, 0.077),
                TaxBracket::upto(110_076.0, 0.105),
                TaxBracket::upto(133_664.0, 0.1229),
                TaxBracket::upto(181_232.0, 0.147),
                TaxBracket::upto(252_752.0, 0.168),
                TaxBracket::over(0.205),
            ],
            credits: TaxCredits {
                bpa: 12_580.0,
                age_amount: 5_373.0,
                age_amount_threshold: 40_007.0,
                pension_income_amount: 1_000.0,
                medical_expense_threshold_limit: 2_689.0,
            },
            surtax: None,
        }
    }

    /// 2024 Alberta schedule
    pub fn alberta_2024() -> Self {
        Self {
            code: "AB".to_string(),
            brackets: vec![
                TaxBracket::upto(148_269.0, 0.10),
                TaxBracket::upto(177_922.0, 0.12),
                TaxBracket::upto(237_230.0, 0.13),
                TaxBracket::upto(355_845.0, 0.14),
                TaxBracket::over(0.15),
            ],
            credits: TaxCredits {
                bpa: 21_885.0,
                age_amount: 6_221.0,
                age_amount_threshold: 46_308.0,
                pension_income_amount: 1_653.0,
                medical_expense_threshold_limit: 2_835.0,
            },
            surtax: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_are_ascending_and_terminated() {
        for table in [
            JurisdictionTable::federal_2024(),
            JurisdictionTable::ontario_2024(),
            JurisdictionTable::british_columbia_2024(),
            JurisdictionTable::alberta_2024(),
        ] {
            let bounded: Vec<f64> = table.brackets.iter().filter_map(|b| b.up_to).collect();
            assert!(bounded.windows(2).all(|w| w[0] < w[1]), "{} not ascending", table.code);
            assert!(table.brackets.last().unwrap().up_to.is_none(), "{} missing final bracket", table.code);
        }
    }

    #[test]
    fn test_ontario_surtax_tiers() {
        let surtax = JurisdictionTable::ontario_2024().surtax.unwrap();

        assert_eq!(surtax.on_tax(5_000.0, 1.0), 0.0);
        // Only first tier: 20% of (6,000 - 5,554)
        assert!((surtax.on_tax(6_000.0, 1.0) - 89.2).abs() < 1e-9);
        // Both tiers: 20% of 2,446 + 36% of 892
        assert!((surtax.on_tax(8_000.0, 1.0) - (489.2 + 321.12)).abs() < 1e-9);
        // Thresholds scale with inflation
        assert_eq!(surtax.on_tax(6_000.0, 1.1), 0.0);
    }
}
