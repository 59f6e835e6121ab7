//! Single-person income tax for one jurisdiction

use log::error;
use serde::{Deserialize, Serialize};

use crate::tables::{JurisdictionTable, TaxTables};

/// Medical expenses above this share of income earn the credit (subject to the cap)
pub const MEDICAL_INCOME_SHARE: f64 = 0.03;
/// Age amount reduction per dollar of income above the threshold
pub const AGE_AMOUNT_REDUCTION_RATE: f64 = 0.15;
/// Age from which the age and pension amounts are claimable
pub const SENIOR_CREDIT_AGE: u32 = 65;

/// Everything the calculator needs to know about one person's year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxProfile {
    /// Taxable income after splitting and OAS clawback
    pub taxable_income: f64,
    pub age: u32,
    /// Own eligible pension income remaining after any split out
    pub eligible_pension_income: f64,
    /// Eligible pension income received from the spouse
    pub split_pension_received: f64,
    /// Medical expenses claimed this year
    pub medical_expenses: f64,
}

/// Tax for one jurisdiction, before and after credits
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Marginal-bracket tax before credits
    pub basic_tax: f64,
    /// Credits in tax dollars
    pub credits: f64,
    pub surtax: f64,
    /// Tax payable, never negative
    pub total: f64,
}

/// Marginal tax on `income` walking ascending brackets with thresholds scaled by `inflation`
pub fn bracket_tax(income: f64, table: &JurisdictionTable, inflation: f64) -> f64 {
    let mut tax = 0.0;
    let mut previous_ceiling = 0.0;

    for bracket in &table.brackets {
        let ceiling = bracket.up_to.map(|u| u * inflation).unwrap_or(f64::INFINITY);
        if income > previous_ceiling {
            tax += (income.min(ceiling) - previous_ceiling) * bracket.rate;
        }
        if income <= ceiling {
            break;
        }
        previous_ceiling = ceiling;
    }

    tax
}

/// Non-refundable credit base (dollars of credit, before the lowest-rate conversion)
pub fn credit_base(profile: &TaxProfile, table: &JurisdictionTable, inflation: f64) -> f64 {
    let credits = &table.credits;
    let income = profile.taxable_income.max(0.0);

    let mut base = credits.bpa * inflation;

    if profile.age >= SENIOR_CREDIT_AGE {
        let clawdown =
            (income - credits.age_amount_threshold * inflation).max(0.0) * AGE_AMOUNT_REDUCTION_RATE;
        base += (credits.age_amount * inflation - clawdown).max(0.0);

        let pension = profile.eligible_pension_income + profile.split_pension_received;
        base += pension.max(0.0).min(credits.pension_income_amount);
    }

    let medical_floor =
        (income * MEDICAL_INCOME_SHARE).min(credits.medical_expense_threshold_limit * inflation);
    base += (profile.medical_expenses - medical_floor).max(0.0);

    base
}

/// Tax payable in one jurisdiction
pub fn tax_for_jurisdiction(
    profile: &TaxProfile,
    table: &JurisdictionTable,
    inflation: f64,
) -> TaxBreakdown {
    let income = profile.taxable_income.max(0.0);
    let basic_tax = bracket_tax(income, table, inflation);
    let credits = credit_base(profile, table, inflation) * table.lowest_rate();
    let after_credits = (basic_tax - credits).max(0.0);

    let surtax = table
        .surtax
        .as_ref()
        .map(|s| s.on_tax(after_credits, inflation))
        .unwrap_or(0.0);

    TaxBreakdown {
        basic_tax,
        credits,
        surtax,
        total: after_credits + surtax,
    }
}

/// Table-backed calculator resolving jurisdictions by code
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'a> {
    tables: &'a TaxTables,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(tables: &'a TaxTables) -> Self {
        Self { tables }
    }

    pub fn federal(&self, profile: &TaxProfile, inflation: f64) -> TaxBreakdown {
        tax_for_jurisdiction(profile, &self.tables.federal, inflation)
    }

    /// Provincial tax; a missing table is logged and yields zero tax
    pub fn provincial(&self, province: &str, profile: &TaxProfile, inflation: f64) -> TaxBreakdown {
        match self.tables.province(province) {
            Some(table) => tax_for_jurisdiction(profile, table, inflation),
            None => {
                error!("no tax data for jurisdiction {}; provincial tax set to 0", province);
                TaxBreakdown::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn profile(income: f64, age: u32) -> TaxProfile {
        TaxProfile {
            taxable_income: income,
            age,
            ..Default::default()
        }
    }

    #[test]
    fn test_bracket_walk() {
        let fed = JurisdictionTable::federal_2024();

        assert_eq!(bracket_tax(0.0, &fed, 1.0), 0.0);
        assert_abs_diff_eq!(bracket_tax(50_000.0, &fed, 1.0), 7_500.0, epsilon = 1e-9);

        // 55,867 at 15% + 4,133 at 20.5%
        let expected = 55_867.0 * 0.15 + 4_133.0 * 0.205;
        assert_abs_diff_eq!(bracket_tax(60_000.0, &fed, 1.0), expected, epsilon = 1e-9);

        // Top bracket is unbounded
        let top = bracket_tax(300_000.0, &fed, 1.0);
        let below = bracket_tax(246_752.0, &fed, 1.0);
        assert_abs_diff_eq!(top - below, (300_000.0 - 246_752.0) * 0.33, epsilon = 1e-6);
    }

    #[test]
    fn test_bracket_thresholds_inflate() {
        let fed = JurisdictionTable::federal_2024();
        // With 10% indexing, 60,000 sits entirely inside the first bracket
        assert_abs_diff_eq!(bracket_tax(60_000.0, &fed, 1.1), 9_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_income_below_bpa_pays_nothing() {
        let fed = JurisdictionTable::federal_2024();
        let result = tax_for_jurisdiction(&profile(15_000.0, 60), &fed, 1.0);
        assert_eq!(result.total, 0.0);
    }

    #[test]
    fn test_age_amount_only_at_65() {
        let fed = JurisdictionTable::federal_2024();
        let young = tax_for_jurisdiction(&profile(40_000.0, 64), &fed, 1.0);
        let senior = tax_for_jurisdiction(&profile(40_000.0, 65), &fed, 1.0);

        // Full age amount below the threshold
        assert_abs_diff_eq!(young.total - senior.total, 8_790.0 * 0.15, epsilon = 1e-6);
    }

    #[test]
    fn test_age_amount_clawdown() {
        let fed = JurisdictionTable::federal_2024();
        let p = profile(60_000.0, 70);
        let base = credit_base(&p, &fed, 1.0);
        let expected_age = 8_790.0 - (60_000.0 - 44_325.0) * 0.15;
        assert_abs_diff_eq!(base, 15_705.0 + expected_age, epsilon = 1e-6);

        // Fully clawed back at high income
        let rich = credit_base(&profile(200_000.0, 70), &fed, 1.0);
        assert_abs_diff_eq!(rich, 15_705.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pension_credit_capped_and_age_gated() {
        let fed = JurisdictionTable::federal_2024();
        let mut p = profile(50_000.0, 66);
        let without = credit_base(&p, &fed, 1.0);

        p.eligible_pension_income = 1_200.0;
        assert_abs_diff_eq!(credit_base(&p, &fed, 1.0) - without, 1_200.0, epsilon = 1e-9);

        p.split_pension_received = 5_000.0;
        assert_abs_diff_eq!(credit_base(&p, &fed, 1.0) - without, 2_000.0, epsilon = 1e-9);

        p.age = 64;
        let young_without = credit_base(&profile(50_000.0, 64), &fed, 1.0);
        assert_abs_diff_eq!(credit_base(&p, &fed, 1.0), young_without, epsilon = 1e-9);
    }

    #[test]
    fn test_medical_expense_credit() {
        let fed = JurisdictionTable::federal_2024();
        let mut p = profile(50_000.0, 60);
        let without = credit_base(&p, &fed, 1.0);

        // 3% of 50,000 = 1,500 is below the 2,759 cap
        p.medical_expenses = 4_000.0;
        assert_abs_diff_eq!(credit_base(&p, &fed, 1.0) - without, 2_500.0, epsilon = 1e-9);

        // At 200,000 income the cap binds
        let mut rich = profile(200_000.0, 60);
        let rich_without = credit_base(&rich, &fed, 1.0);
        rich.medical_expenses = 4_000.0;
        assert_abs_diff_eq!(credit_base(&rich, &fed, 1.0) - rich_without, 1_241.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ontario_surtax_applies_to_tax_amount() {
        let on = JurisdictionTable::ontario_2024();
        let result = tax_for_jurisdiction(&profile(150_000.0, 60), &on, 1.0);

        let after_credits = result.basic_tax - result.credits;
        let expected_surtax =
            (after_credits - 5_554.0).max(0.0) * 0.20 + (after_credits - 7_108.0).max(0.0) * 0.36;
        assert!(result.surtax > 0.0);
        assert_abs_diff_eq!(result.surtax, expected_surtax, epsilon = 1e-9);
        assert_abs_diff_eq!(result.total, after_credits + expected_surtax, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_province_returns_zero() {
        let tables = TaxTables::canada_2024();
        let calculator = TaxCalculator::new(&tables);
        let result = calculator.provincial("NU", &profile(100_000.0, 70), 1.0);
        assert_eq!(result, TaxBreakdown::default());

        assert!(calculator.federal(&profile(100_000.0, 70), 1.0).total > 0.0);
    }
}
