//! Government benefits and other income streams

use crate::household::{ItemKind, Person};
use crate::tables::{inflation_factor, GisRates, TaxTables};

/// Standard benefit age for CPP, OAS, and GIS
pub const PENSION_AGE: u32 = 65;

/// Benefits and income items for one person in one year
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersonIncome {
    pub cpp: f64,
    /// OAS before any clawback
    pub oas: f64,
    pub other_income: f64,
    /// Medical expense items, for the credit
    pub medical_expenses: f64,
}

/// Computes step 2 of the year for one scenario
#[derive(Debug, Clone, Copy)]
pub struct IncomeCalculator<'a> {
    tables: &'a TaxTables,
    /// Global COLA
    cola: f64,
}

impl<'a> IncomeCalculator<'a> {
    pub fn new(tables: &'a TaxTables, cola: f64) -> Self {
        Self { tables, cola }
    }

    /// CPP for `year`
    ///
    /// The age-65 estimate is indexed to the start year, adjusted once for early
    /// or late take-up, then indexed again to the current year.
    pub fn cpp(&self, person: &Person, year: i32) -> f64 {
        let age = person.age_in(year);
        if age < person.cpp_start_age || person.cpp_at_65 <= 0.0 {
            return 0.0;
        }
        let benefits = &self.tables.benefits;
        let start_year = person.birth_year + person.cpp_start_age as i32;
        let at_start = person.cpp_at_65 * inflation_factor(self.cola, self.tables.base_year, start_year);

        let months = (person.cpp_start_age as f64 - PENSION_AGE as f64) * 12.0;
        let adjustment = if months < 0.0 {
            1.0 + months * benefits.cpp_early_reduction_per_month
        } else {
            1.0 + months * benefits.cpp_late_increase_per_month
        };

        at_start * adjustment * inflation_factor(self.cola, start_year, year)
    }

    /// Gross OAS for `year`, before clawback
    pub fn oas(&self, person: &Person, year: i32) -> f64 {
        let age = person.age_in(year);
        if age < PENSION_AGE || age < person.oas_start_age {
            return 0.0;
        }
        let benefits = &self.tables.benefits;
        let full_years = benefits.oas_full_residency_years as f64;
        let residency = person
            .years_in_canada
            .map(|years| (years as f64 / full_years).min(1.0))
            .unwrap_or(1.0);

        let deferred_months = (person.oas_start_age - PENSION_AGE) as f64 * 12.0;
        let deferral = 1.0 + deferred_months * benefits.oas_deferral_bonus_per_month;

        let mut amount = benefits.oas_annual_max
            * residency
            * deferral
            * self.tables.index_to(self.cola, year);
        if age >= benefits.oas_boost_age {
            amount *= 1.0 + benefits.oas_boost_rate;
        }
        amount
    }

    /// Active income items and medical expenses, each indexed by its own COLA
    pub fn items(&self, person: &Person, year: i32) -> (f64, f64) {
        let age = person.age_in(year);
        let mut income = 0.0;
        let mut medical = 0.0;
        for item in person.items.iter().filter(|i| i.is_active(age)) {
            let amount = item.amount_in(year, self.tables.base_year);
            match item.kind {
                ItemKind::Income => income += amount,
                ItemKind::Expense if item.medical => medical += amount,
                ItemKind::Expense => {}
            }
        }
        (income, medical)
    }

    /// CPP, OAS, and item income for one person; GIS is filled in at household level
    pub fn person_income(&self, person: &Person, year: i32) -> PersonIncome {
        let (other_income, medical_expenses) = self.items(person, year);
        PersonIncome {
            cpp: self.cpp(person, year),
            oas: self.oas(person, year),
            other_income,
            medical_expenses,
        }
    }

    /// GIS for the household, tested against the previous year's income
    ///
    /// Returns the user's and spouse's shares. Two pensioners share the couple
    /// rate evenly; a lone pensioner gets the single rate.
    pub fn gis(
        &self,
        user: (u32, f64),
        spouse: Option<(u32, f64)>,
        prior_year_income: f64,
        year: i32,
    ) -> (f64, f64) {
        let eligible = |(age, oas): (u32, f64)| age >= PENSION_AGE && oas > 0.0;
        let user_eligible = eligible(user);
        let spouse_eligible = spouse.map(eligible).unwrap_or(false);
        let benefits = &self.tables.benefits;

        let rates = match (user_eligible, spouse_eligible) {
            (true, true) => benefits.gis_couple,
            (true, false) | (false, true) => benefits.gis_single,
            (false, false) => return (0.0, 0.0),
        };
        let payment = gis_payment(
            &rates,
            benefits.gis_reduction_rate,
            prior_year_income,
            self.tables.index_to(self.cola, year),
        );

        match (user_eligible, spouse_eligible) {
            (true, true) => (payment / 2.0, payment / 2.0),
            (true, false) => (payment, 0.0),
            _ => (0.0, payment),
        }
    }
}

/// Income-tested GIS payment at `inflation` times base-year rates
pub fn gis_payment(rates: &GisRates, reduction_rate: f64, prior_year_income: f64, inflation: f64) -> f64 {
    if prior_year_income >= rates.income_threshold * inflation {
        return 0.0;
    }
    let reduction = (prior_year_income - rates.exemption * inflation).max(0.0) * reduction_rate;
    (rates.max_payment * inflation - reduction).max(0.0)
}
