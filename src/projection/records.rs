//! Year record output structures for projections

use serde::{Deserialize, Serialize};

use crate::household::{AccountType, Accounts};

/// One person's slice of a simulated year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonYear {
    pub age: u32,

    // Balances
    pub opening: Accounts,
    pub growth: Accounts,
    pub withdrawals: Accounts,
    pub closing: Accounts,

    // Income (OAS shown after clawback)
    pub cpp: f64,
    pub oas: f64,
    pub oas_gross: f64,
    pub oas_clawback: f64,
    pub gis: f64,
    pub other_income: f64,
    pub medical_expenses: f64,

    // Non-registered gains
    pub realized_gains: f64,
    pub taxable_gains: f64,
    /// Unrealized gain left after this year's withdrawals
    pub unrealized_gain: f64,

    // Pension splitting
    pub pension_split_out: f64,
    pub pension_split_in: f64,

    // Tax
    pub taxable_income: f64,
    pub federal_tax: f64,
    pub provincial_tax: f64,
    pub tax: f64,
}

impl PersonYear {
    pub fn new(age: u32) -> Self {
        Self {
            age,
            ..Default::default()
        }
    }

    /// Cash income received this year, with OAS before clawback
    pub fn cash_income(&self) -> f64 {
        self.cpp + self.oas_gross + self.gis + self.other_income
    }

    /// Close the year's balances: opening + growth - withdrawals
    pub fn close(&mut self) {
        self.closing = self.opening.plus(&self.growth);
        for account in AccountType::ALL {
            *self.closing.get_mut(account) -= self.withdrawals.get(account);
        }
    }
}

/// Household totals per account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedYear {
    pub opening: Accounts,
    pub growth: Accounts,
    pub withdrawals: Accounts,
    pub closing: Accounts,
}

/// A single simulated year for one scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: i32,
    pub user_age: u32,
    pub spouse_age: Option<u32>,

    pub user: PersonYear,
    pub spouse: Option<PersonYear>,
    pub combined: CombinedYear,

    // Cash need
    pub total_income: f64,
    pub expenses: f64,
    /// Prior year's tax and OAS recovery, paid this year
    pub last_year_tax: f64,
    pub shortfall: f64,
    pub unmet_shortfall: f64,

    // Tax
    pub tax_total: f64,
    pub oas_clawback_total: f64,
    pub realized_gains_total: f64,
    pub taxable_gains_total: f64,

    /// Income plus withdrawals less expenses and prior-year tax
    pub net_cash_flow: f64,
}

impl YearRecord {
    pub fn new(year: i32, user_age: u32, spouse_age: Option<u32>) -> Self {
        Self {
            year,
            user_age,
            spouse_age,
            user: PersonYear::new(user_age),
            spouse: spouse_age.map(PersonYear::new),
            ..Default::default()
        }
    }

    /// Iterate the people present this year
    pub fn people(&self) -> impl Iterator<Item = &PersonYear> {
        std::iter::once(&self.user).chain(self.spouse.iter())
    }

    /// Close balances and fill in household totals
    pub fn finalize(&mut self) {
        self.user.close();
        if let Some(spouse) = self.spouse.as_mut() {
            spouse.close();
        }

        let mut combined = CombinedYear::default();
        let mut income = 0.0;
        let mut realized = 0.0;
        let mut taxable = 0.0;
        for person in std::iter::once(&self.user).chain(self.spouse.iter()) {
            combined.opening = combined.opening.plus(&person.opening);
            combined.growth = combined.growth.plus(&person.growth);
            combined.withdrawals = combined.withdrawals.plus(&person.withdrawals);
            combined.closing = combined.closing.plus(&person.closing);
            income += person.cash_income();
            realized += person.realized_gains;
            taxable += person.taxable_gains;
        }
        self.combined = combined;
        self.total_income = income;
        self.realized_gains_total = realized;
        self.taxable_gains_total = taxable;
        self.net_cash_flow =
            income + self.combined.withdrawals.total() - self.expenses - self.last_year_tax;
    }

    /// Household assets at year end
    pub fn total_assets(&self) -> f64 {
        self.combined.closing.total()
    }
}

/// Complete deterministic projection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub records: Vec<YearRecord>,
}

impl ProjectionResult {
    pub fn new(records: Vec<YearRecord>) -> Self {
        Self { records }
    }

    /// Household assets after the last simulated year
    pub fn final_assets(&self) -> f64 {
        self.records.last().map(|r| r.total_assets()).unwrap_or(0.0)
    }

    /// Get summary statistics
    pub fn summary(&self) -> ProjectionSummary {
        let total_withdrawals: f64 = self.records.iter().map(|r| r.combined.withdrawals.total()).sum();
        let total_tax: f64 = self.records.iter().map(|r| r.tax_total).sum();
        let total_clawback: f64 = self.records.iter().map(|r| r.oas_clawback_total).sum();
        let total_unmet_shortfall: f64 = self.records.iter().map(|r| r.unmet_shortfall).sum();
        let depletion_year = self
            .records
            .iter()
            .find(|r| r.total_assets() <= 0.0)
            .map(|r| r.year);

        ProjectionSummary {
            years: self.records.len() as u32,
            first_year: self.records.first().map(|r| r.year),
            last_year: self.records.last().map(|r| r.year),
            total_withdrawals,
            total_tax,
            total_clawback,
            total_unmet_shortfall,
            depletion_year,
            final_assets: self.final_assets(),
        }
    }
}

/// Summary statistics for a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSummary {
    pub years: u32,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub total_withdrawals: f64,
    pub total_tax: f64,
    pub total_clawback: f64,
    pub total_unmet_shortfall: f64,
    /// First year ending with no assets
    pub depletion_year: Option<i32>,
    pub final_assets: f64,
}
