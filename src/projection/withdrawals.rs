//! Withdrawal engine: phase draw order plus legislated RRIF/LIF limits
//!
//! Each person's pool caps a draw at the remaining request, the balance after
//! growth, and (for the LIF) the room left below the legislated maximum. The
//! maximum and the minimums are both based on the start-of-year balance.

use log::debug;

use crate::household::{AccountType, Accounts};
use crate::tables::TaxTables;

/// One person's accounts during step 4
#[derive(Debug)]
pub struct AccountPool<'s> {
    pub age: u32,
    /// Start-of-year balances
    opening: Accounts,
    /// Live balances, already grown for the year
    balances: &'s mut Accounts,
    /// Amounts drawn so far this year
    withdrawn: Accounts,
    /// Legislated LIF maximum for the year
    lif_maximum: f64,
}

impl<'s> AccountPool<'s> {
    pub fn new(age: u32, opening: Accounts, balances: &'s mut Accounts, tables: &TaxTables) -> Self {
        Self {
            age,
            opening,
            balances,
            withdrawn: Accounts::default(),
            lif_maximum: tables.lif.maximum_withdrawal(opening.lif, age),
        }
    }

    pub fn withdrawn(&self) -> Accounts {
        self.withdrawn
    }

    /// LIF amount that may still be drawn this year
    pub fn lif_room(&self) -> f64 {
        (self.lif_maximum - self.withdrawn.lif).max(0.0)
    }

    /// Draw up to `requested` from `account`; returns the amount drawn
    pub fn draw(&mut self, account: AccountType, requested: f64) -> f64 {
        let mut amount = requested.min(self.balances.get(account));
        if account == AccountType::Lif {
            amount = amount.min(self.lif_room());
        }
        if amount <= 0.0 {
            return 0.0;
        }
        *self.balances.get_mut(account) -= amount;
        *self.withdrawn.get_mut(account) += amount;
        amount
    }

    /// Top up RRIF and LIF withdrawals to the legislated minimum
    ///
    /// Returns the extra amount forced out.
    pub fn apply_minimums(&mut self, tables: &TaxTables) -> f64 {
        let mut forced = 0.0;
        for account in [AccountType::Rrsp, AccountType::Lif] {
            let minimum = tables.rrif.minimum_withdrawal(self.opening.get(account), self.age);
            let missing = minimum - self.withdrawn.get(account);
            if missing > 0.0 {
                forced += self.draw(account, missing);
            }
        }
        forced
    }
}

/// Result of step 4
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WithdrawalOutcome {
    pub user: Accounts,
    pub spouse: Option<Accounts>,
    /// Shortfall left after every account in the order was tried
    pub unmet_shortfall: f64,
    /// Withdrawals forced by RRIF/LIF minimums beyond the shortfall draws
    pub forced_minimums: f64,
}

impl WithdrawalOutcome {
    pub fn total(&self) -> f64 {
        self.user.total() + self.spouse.map(|s| s.total()).unwrap_or(0.0)
    }
}

/// Cover `shortfall` in `order`, user before spouse for each account, then apply minimums
pub fn execute_withdrawals(
    shortfall: f64,
    order: &[AccountType],
    user: &mut AccountPool<'_>,
    mut spouse: Option<&mut AccountPool<'_>>,
    tables: &TaxTables,
) -> WithdrawalOutcome {
    let mut remaining = shortfall.max(0.0);

    for &account in order {
        if remaining <= 0.0 {
            break;
        }
        remaining -= user.draw(account, remaining);
        if let Some(pool) = spouse.as_deref_mut() {
            if remaining > 0.0 {
                remaining -= pool.draw(account, remaining);
            }
        }
    }

    let mut forced = user.apply_minimums(tables);
    if let Some(pool) = spouse.as_deref_mut() {
        forced += pool.apply_minimums(tables);
    }
    if forced > 0.0 {
        debug!("RRIF/LIF minimums forced {:.2} of extra withdrawals", forced);
    }

    WithdrawalOutcome {
        user: user.withdrawn(),
        spouse: spouse.map(|pool| pool.withdrawn()),
        unmet_shortfall: remaining.max(0.0),
        forced_minimums: forced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ORDER: [AccountType; 4] = [
        AccountType::Tfsa,
        AccountType::Nonreg,
        AccountType::Rrsp,
        AccountType::Lif,
    ];

    #[test]
    fn test_draw_in_order_user_then_spouse() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 10_000.0, 0.0, 0.0);
        let mut user_balances = opening;
        let mut spouse_balances = opening;
        let mut user = AccountPool::new(65, opening, &mut user_balances, &tables);
        let mut spouse = AccountPool::new(65, opening, &mut spouse_balances, &tables);

        let outcome = execute_withdrawals(15_000.0, &ORDER, &mut user, Some(&mut spouse), &tables);

        assert_eq!(outcome.user.tfsa, 10_000.0);
        assert_eq!(outcome.spouse.unwrap().tfsa, 5_000.0);
        assert_eq!(outcome.unmet_shortfall, 0.0);
        assert_eq!(user_balances.tfsa, 0.0);
        assert_eq!(spouse_balances.tfsa, 5_000.0);
    }

    #[test]
    fn test_unmet_shortfall_reported() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 3_000.0, 0.0, 0.0);
        let mut balances = opening;
        let mut user = AccountPool::new(65, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(10_000.0, &ORDER, &mut user, None, &tables);
        assert_eq!(outcome.total(), 3_000.0);
        assert_eq!(outcome.unmet_shortfall, 7_000.0);
    }

    #[test]
    fn test_lif_capped_at_maximum() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 0.0, 0.0, 100_000.0);
        let mut balances = opening;
        let mut user = AccountPool::new(65, opening, &mut balances, &tables);
        let maximum = tables.lif.maximum_withdrawal(100_000.0, 65);

        let outcome = execute_withdrawals(90_000.0, &[AccountType::Lif], &mut user, None, &tables);
        assert_abs_diff_eq!(outcome.user.lif, maximum, epsilon = 1e-9);
        assert!(outcome.unmet_shortfall > 0.0);
    }

    #[test]
    fn test_locked_lif_below_55() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 0.0, 0.0, 100_000.0);
        let mut balances = opening;
        let mut user = AccountPool::new(50, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(10_000.0, &[AccountType::Lif], &mut user, None, &tables);
        assert_eq!(outcome.user.lif, 0.0);
        assert_eq!(outcome.unmet_shortfall, 10_000.0);
    }

    #[test]
    fn test_rrif_minimum_without_shortfall() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(200_000.0, 50_000.0, 0.0, 0.0);
        let mut balances = opening;
        let mut user = AccountPool::new(75, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(0.0, &ORDER, &mut user, None, &tables);
        let minimum = tables.rrif.minimum_withdrawal(200_000.0, 75);
        assert!(minimum > 0.0);
        assert_abs_diff_eq!(outcome.user.rrsp, minimum, epsilon = 1e-9);
        assert_abs_diff_eq!(outcome.forced_minimums, minimum, epsilon = 1e-9);
        assert_eq!(outcome.user.tfsa, 0.0);
    }

    #[test]
    fn test_minimum_counts_shortfall_draws() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(200_000.0, 0.0, 0.0, 0.0);
        let mut balances = opening;
        let mut user = AccountPool::new(75, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(50_000.0, &ORDER, &mut user, None, &tables);
        assert_eq!(outcome.user.rrsp, 50_000.0);
        assert_eq!(outcome.forced_minimums, 0.0);
    }

    #[test]
    fn test_lif_minimum_respects_maximum() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 0.0, 0.0, 100_000.0);
        let mut balances = opening;
        let mut user = AccountPool::new(80, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(1_000_000.0, &ORDER, &mut user, None, &tables);
        let maximum = tables.lif.maximum_withdrawal(100_000.0, 80);
        assert!(outcome.user.lif <= maximum + 1e-9);
        assert!(outcome.user.lif >= tables.rrif.minimum_withdrawal(100_000.0, 80) - 1e-9);
    }

    #[test]
    fn test_lif_minimum_without_shortfall() {
        let tables = TaxTables::canada_2024();
        let opening = Accounts::new(0.0, 0.0, 0.0, 150_000.0);
        let mut balances = opening;
        let mut user = AccountPool::new(75, opening, &mut balances, &tables);

        let outcome = execute_withdrawals(0.0, &ORDER, &mut user, None, &tables);
        let minimum = tables.rrif.minimum_withdrawal(150_000.0, 75);
        assert!(minimum > 0.0);
        assert!(minimum < tables.lif.maximum_withdrawal(150_000.0, 75));
        assert_abs_diff_eq!(outcome.user.lif, minimum, epsilon = 1e-9);
        assert_abs_diff_eq!(outcome.forced_minimums, minimum, epsilon = 1e-9);
        assert_abs_diff_eq!(balances.lif, 150_000.0 - minimum, epsilon = 1e-9);
        assert_eq!(outcome.unmet_shortfall, 0.0);
    }
}
