//! Household state carried from one simulated year to the next

use crate::household::{AccountType, Accounts, Person, ScenarioInput};

/// Mutable per-person balances during a run
#[derive(Debug, Clone, PartialEq)]
pub struct PersonState {
    /// Current account balances, updated in place by growth and withdrawals
    pub balances: Accounts,
    /// Unrealized gain embedded in the non-registered account (never negative)
    pub unrealized_gain: f64,
}

impl PersonState {
    /// Initialize from a person's opening assets
    pub fn from_person(person: &Person) -> Self {
        Self {
            balances: person.assets,
            unrealized_gain: person.initial_unrealized_gain(),
        }
    }

    /// Apply one year's growth in place, returning the growth per account
    pub fn apply_growth(&mut self, returns: &Accounts) -> Accounts {
        let mut growth = Accounts::default();
        for account in AccountType::ALL {
            // A loss can wipe out an account but never push it negative
            let rate = returns.get(account).max(-1.0);
            let amount = self.balances.get(account) * rate;
            *growth.get_mut(account) = amount;
            *self.balances.get_mut(account) += amount;
        }
        self.unrealized_gain = (self.unrealized_gain + growth.nonreg).max(0.0);
        growth
    }

    /// Remove gains realized by this year's withdrawals
    pub fn realize(&mut self, realized: f64) {
        self.unrealized_gain = (self.unrealized_gain - realized).max(0.0);
    }
}

/// State of the household between years
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdState {
    pub user: PersonState,
    pub spouse: Option<PersonState>,
    /// Income tax plus OAS recovery from the previous year, paid this year
    pub last_year_tax: f64,
    /// Previous year's household income for the GIS test
    pub last_year_gis_income: f64,
}

impl HouseholdState {
    /// Fresh state for a run; balances are copied so repeated runs never alias
    pub fn from_scenario(scenario: &ScenarioInput) -> Self {
        Self {
            user: PersonState::from_person(&scenario.user),
            spouse: scenario.spouse.as_ref().map(PersonState::from_person),
            last_year_tax: 0.0,
            last_year_gis_income: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Person {
        let mut person = Person::new(1960);
        person.assets = Accounts::new(100_000.0, 50_000.0, 80_000.0, 20_000.0);
        person.nonreg_acb = 60_000.0;
        person
    }

    #[test]
    fn test_initial_state() {
        let state = PersonState::from_person(&person());
        assert_eq!(state.balances.total(), 250_000.0);
        assert_eq!(state.unrealized_gain, 20_000.0);
    }

    #[test]
    fn test_growth_updates_unrealized_gain() {
        let mut state = PersonState::from_person(&person());
        let growth = state.apply_growth(&Accounts::uniform(0.10));

        assert!((growth.nonreg - 8_000.0).abs() < 1e-9);
        assert!((state.balances.nonreg - 88_000.0).abs() < 1e-9);
        assert!((state.unrealized_gain - 28_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_losses_floor_gain_and_balance() {
        let mut state = PersonState::from_person(&person());
        state.apply_growth(&Accounts::uniform(-0.5));
        assert_eq!(state.unrealized_gain, 0.0);

        state.apply_growth(&Accounts::uniform(-3.0));
        assert_eq!(state.balances.total(), 0.0);
    }

    #[test]
    fn test_realize_floors_at_zero() {
        let mut state = PersonState::from_person(&person());
        state.realize(5_000.0);
        assert_eq!(state.unrealized_gain, 15_000.0);
        state.realize(50_000.0);
        assert_eq!(state.unrealized_gain, 0.0);
    }
}
