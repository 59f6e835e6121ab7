//! Year-end household taxation: capital gains, OAS clawback, federal + provincial tax

use serde::{Deserialize, Serialize};

use super::calculator::{TaxCalculator, TaxProfile, SENIOR_CREDIT_AGE};
use super::split::PensionSplit;
use crate::household::Owner;
use crate::tables::TaxTables;

/// One person's income for the year, gathered from the income and withdrawal steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonTaxInput {
    pub age: u32,
    pub cpp: f64,
    /// OAS before clawback
    pub oas_gross: f64,
    /// Other taxable income items
    pub other_income: f64,
    /// RRIF (RRSP) plus LIF withdrawals
    pub registered_withdrawals: f64,
    /// Capital gains realized on non-registered withdrawals
    pub realized_gains: f64,
    pub medical_expenses: f64,
}

impl PersonTaxInput {
    /// Pension income eligible for the pension credit and for splitting
    pub fn eligible_pension_income(&self) -> f64 {
        if self.age >= SENIOR_CREDIT_AGE {
            self.registered_withdrawals
        } else {
            0.0
        }
    }
}

/// Step 5 result for one person
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonTaxResult {
    pub realized_gains: f64,
    pub taxable_gains: f64,
    /// Net income before GIS and before OAS recovery
    pub net_income_for_clawback: f64,
    pub oas_clawback: f64,
    /// OAS kept after clawback
    pub oas_net: f64,
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub provincial_tax: f64,
    pub total_tax: f64,
    /// Pension income transferred to the spouse
    pub pension_split_out: f64,
    /// Pension income received from the spouse
    pub pension_split_in: f64,
}

/// Step 5 result for the household
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseholdTaxResult {
    pub user: PersonTaxResult,
    pub spouse: Option<PersonTaxResult>,
    /// Income tax payable by the household
    pub total_tax: f64,
    pub total_clawback: f64,
    /// Household net income excluding OAS and GIS, carried to next year's GIS test
    pub gis_income: f64,
}

impl HouseholdTaxResult {
    /// Amount due with next year's bill: income tax plus OAS recovery
    pub fn amount_due(&self) -> f64 {
        self.total_tax + self.total_clawback
    }
}

/// Realized gain on a non-registered withdrawal, pro rata to the embedded gain
pub fn realized_gain(withdrawal: f64, unrealized_gain: f64, balance_before_withdrawal: f64) -> f64 {
    if withdrawal <= 0.0 || unrealized_gain <= 0.0 || balance_before_withdrawal <= 0.0 {
        return 0.0;
    }
    let ratio = (unrealized_gain / balance_before_withdrawal).min(1.0);
    (withdrawal * ratio).min(unrealized_gain)
}

/// OAS recovery tax on income above the indexed threshold
pub fn oas_clawback(oas: f64, net_income: f64, threshold: f64, rate: f64) -> f64 {
    ((net_income - threshold) * rate).min(oas).max(0.0)
}

/// Tax engine for one province and calendar year
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    tables: &'a TaxTables,
    province: &'a str,
    /// Global COLA index from the base year to this year
    inflation: f64,
}

impl<'a> TaxEngine<'a> {
    pub fn new(tables: &'a TaxTables, province: &'a str, inflation: f64) -> Self {
        Self { tables, province, inflation }
    }

    /// Tax one person given the pension income moved out of and into their return
    pub fn person_tax(&self, input: &PersonTaxInput, split_out: f64, split_in: f64) -> PersonTaxResult {
        let benefits = &self.tables.benefits;
        let taxable_gains = benefits.capital_gains.taxable_amount(input.realized_gains);

        let net_income_for_clawback = input.cpp
            + input.oas_gross
            + input.other_income
            + input.registered_withdrawals
            + taxable_gains
            - split_out
            + split_in;

        let clawback = oas_clawback(
            input.oas_gross,
            net_income_for_clawback,
            benefits.oas_clawback_threshold * self.inflation,
            benefits.oas_clawback_rate,
        );
        let taxable_income = (net_income_for_clawback - clawback).max(0.0);

        let profile = TaxProfile {
            taxable_income,
            age: input.age,
            eligible_pension_income: (input.eligible_pension_income() - split_out).max(0.0),
            split_pension_received: split_in,
            medical_expenses: input.medical_expenses,
        };
        let calculator = TaxCalculator::new(self.tables);
        let federal = calculator.federal(&profile, self.inflation);
        let provincial = calculator.provincial(self.province, &profile, self.inflation);

        PersonTaxResult {
            realized_gains: input.realized_gains,
            taxable_gains,
            net_income_for_clawback,
            oas_clawback: clawback,
            oas_net: input.oas_gross - clawback,
            taxable_income,
            federal_tax: federal.total,
            provincial_tax: provincial.total,
            total_tax: federal.total + provincial.total,
            pension_split_out: split_out,
            pension_split_in: split_in,
        }
    }

    /// Tax the household, optionally moving pension income between spouses
    pub fn household_tax(
        &self,
        user: &PersonTaxInput,
        spouse: Option<&PersonTaxInput>,
        split: Option<PensionSplit>,
    ) -> HouseholdTaxResult {
        let (user_out, user_in) = match (split, spouse) {
            (Some(s), Some(_)) => match s.from {
                Owner::User => (s.amount, 0.0),
                Owner::Spouse => (0.0, s.amount),
            },
            _ => (0.0, 0.0),
        };

        let user_result = self.person_tax(user, user_out, user_in);
        let spouse_result = spouse.map(|s| self.person_tax(s, user_in, user_out));

        let mut total_tax = user_result.total_tax;
        let mut total_clawback = user_result.oas_clawback;
        let mut gis_income = user_result.taxable_income - user_result.oas_net;
        if let Some(s) = &spouse_result {
            total_tax += s.total_tax;
            total_clawback += s.oas_clawback;
            gis_income += s.taxable_income - s.oas_net;
        }

        HouseholdTaxResult {
            user: user_result,
            spouse: spouse_result,
            total_tax,
            total_clawback,
            gis_income: gis_income.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_oas_clawback_example() {
        // $100,000 net income against the $90,997 base-year threshold
        let clawback = oas_clawback(8_560.0, 100_000.0, 90_997.0, 0.15);
        assert_abs_diff_eq!(clawback, 1_350.45, epsilon = 1e-6);

        // Never more than the OAS received
        assert_eq!(oas_clawback(8_560.0, 500_000.0, 90_997.0, 0.15), 8_560.0);
        // Nothing below the threshold
        assert_eq!(oas_clawback(8_560.0, 50_000.0, 90_997.0, 0.15), 0.0);
    }

    #[test]
    fn test_realized_gain_pro_rata() {
        // Half the balance is gain: a 10,000 withdrawal realizes 5,000
        assert_abs_diff_eq!(realized_gain(10_000.0, 50_000.0, 100_000.0), 5_000.0, epsilon = 1e-9);
        assert_eq!(realized_gain(10_000.0, 0.0, 100_000.0), 0.0);
        assert_eq!(realized_gain(0.0, 50_000.0, 100_000.0), 0.0);
        // Capped at the embedded gain
        assert!(realized_gain(100_000.0, 50_000.0, 100_000.0) <= 50_000.0);
    }

    #[test]
    fn test_person_tax_applies_clawback_before_tax() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let input = PersonTaxInput {
            age: 70,
            cpp: 15_000.0,
            oas_gross: 8_560.0,
            registered_withdrawals: 76_440.0,
            ..Default::default()
        };

        let result = engine.person_tax(&input, 0.0, 0.0);
        assert_abs_diff_eq!(result.net_income_for_clawback, 100_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.oas_clawback, 1_350.45, epsilon = 1e-6);
        assert_abs_diff_eq!(result.taxable_income, 100_000.0 - 1_350.45, epsilon = 1e-6);
        assert_abs_diff_eq!(result.total_tax, result.federal_tax + result.provincial_tax, epsilon = 1e-9);
        assert!(result.provincial_tax > 0.0);
    }

    #[test]
    fn test_capital_gains_fold_into_taxable_income() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "AB", 1.0);
        let input = PersonTaxInput {
            age: 60,
            realized_gains: 300_000.0,
            ..Default::default()
        };
        let result = engine.person_tax(&input, 0.0, 0.0);
        assert_abs_diff_eq!(result.taxable_gains, 158_333.333_333, epsilon = 1e-3);
        assert_abs_diff_eq!(result.taxable_income, result.taxable_gains, epsilon = 1e-9);
    }

    #[test]
    fn test_pension_split_moves_income() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let user = PersonTaxInput {
            age: 70,
            registered_withdrawals: 80_000.0,
            ..Default::default()
        };
        let spouse = PersonTaxInput {
            age: 68,
            ..Default::default()
        };

        let unsplit = engine.household_tax(&user, Some(&spouse), None);
        let split = engine.household_tax(
            &user,
            Some(&spouse),
            Some(PensionSplit { from: Owner::User, amount: 40_000.0 }),
        );

        assert_abs_diff_eq!(split.user.taxable_income, 40_000.0, epsilon = 1e-9);
        let spouse_split = split.spouse.unwrap();
        assert_abs_diff_eq!(spouse_split.taxable_income, 40_000.0, epsilon = 1e-9);
        assert_eq!(spouse_split.pension_split_in, 40_000.0);
        assert!(split.total_tax < unsplit.total_tax);
    }

    #[test]
    fn test_split_ignored_without_spouse() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let user = PersonTaxInput {
            age: 70,
            registered_withdrawals: 80_000.0,
            ..Default::default()
        };
        let result = engine.household_tax(
            &user,
            None,
            Some(PensionSplit { from: Owner::User, amount: 40_000.0 }),
        );
        assert_eq!(result.user.pension_split_out, 0.0);
        assert_abs_diff_eq!(result.user.taxable_income, 80_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gis_income_excludes_oas() {
        let tables = TaxTables::canada_2024();
        let engine = TaxEngine::new(&tables, "ON", 1.0);
        let user = PersonTaxInput {
            age: 70,
            cpp: 6_000.0,
            oas_gross: 8_560.0,
            other_income: 2_000.0,
            ..Default::default()
        };
        let result = engine.household_tax(&user, None, None);
        assert_abs_diff_eq!(result.gis_income, 8_000.0, epsilon = 1e-9);
        assert_eq!(result.amount_due(), result.total_tax);
    }
}
