//! Household spending and the year's cash shortfall

use crate::household::{ItemKind, Person};

/// Active expense items for one person in `year`, each indexed by its own COLA
pub fn person_expenses(person: &Person, year: i32, base_year: i32) -> f64 {
    let age = person.age_in(year);
    person
        .items
        .iter()
        .filter(|item| item.kind == ItemKind::Expense && item.is_active(age))
        .map(|item| item.amount_in(year, base_year))
        .sum()
}

/// Household expenses; each item is tested against its owner's age
pub fn household_expenses(user: &Person, spouse: Option<&Person>, year: i32, base_year: i32) -> f64 {
    person_expenses(user, year, base_year)
        + spouse.map(|s| person_expenses(s, year, base_year)).unwrap_or(0.0)
}

/// Cash the accounts must supply this year
pub fn shortfall(expenses: f64, last_year_tax: f64, income: f64) -> f64 {
    (expenses + last_year_tax - income).max(0.0)
}
