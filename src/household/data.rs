//! Strict, validated household input model

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::tables::inflation_factor;

/// Maximum number of withdrawal phases in a strategy
pub const MAX_PHASES: usize = 3;
/// Maximum number of accounts in one phase's draw order
pub const MAX_ACCOUNTS_PER_PHASE: usize = 4;

/// Account pools held by each person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// RRSP, treated as a RRIF for minimum withdrawals
    Rrsp,
    /// Tax-free savings
    Tfsa,
    /// Non-registered; withdrawals realize capital gains
    Nonreg,
    /// Locked-in; subject to legislated minimum and maximum
    Lif,
}

impl AccountType {
    pub const ALL: [AccountType; 4] = [
        AccountType::Rrsp,
        AccountType::Tfsa,
        AccountType::Nonreg,
        AccountType::Lif,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Rrsp => "rrsp",
            AccountType::Tfsa => "tfsa",
            AccountType::Nonreg => "nonreg",
            AccountType::Lif => "lif",
        }
    }
}

/// One amount per account type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accounts {
    pub rrsp: f64,
    pub tfsa: f64,
    pub nonreg: f64,
    pub lif: f64,
}

impl Accounts {
    pub fn new(rrsp: f64, tfsa: f64, nonreg: f64, lif: f64) -> Self {
        Self { rrsp, tfsa, nonreg, lif }
    }

    /// Same value for every account
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn get(&self, account: AccountType) -> f64 {
        match account {
            AccountType::Rrsp => self.rrsp,
            AccountType::Tfsa => self.tfsa,
            AccountType::Nonreg => self.nonreg,
            AccountType::Lif => self.lif,
        }
    }

    pub fn get_mut(&mut self, account: AccountType) -> &mut f64 {
        match account {
            AccountType::Rrsp => &mut self.rrsp,
            AccountType::Tfsa => &mut self.tfsa,
            AccountType::Nonreg => &mut self.nonreg,
            AccountType::Lif => &mut self.lif,
        }
    }

    pub fn total(&self) -> f64 {
        self.rrsp + self.tfsa + self.nonreg + self.lif
    }

    /// Registered (RRIF + LIF) portion
    pub fn registered(&self) -> f64 {
        self.rrsp + self.lif
    }

    pub fn plus(&self, other: &Accounts) -> Accounts {
        Accounts::new(
            self.rrsp + other.rrsp,
            self.tfsa + other.tfsa,
            self.nonreg + other.nonreg,
            self.lif + other.lif,
        )
    }
}

/// Whether a cash flow item adds income or consumes it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Legacy items without a type are income
    #[default]
    Income,
    Expense,
}

/// Person a cash flow item belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    #[default]
    User,
    Spouse,
}

/// An income or expense stream with its own COLA
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowItem {
    pub kind: ItemKind,
    pub description: String,
    /// Annual amount in base-year dollars
    pub amount: f64,
    /// First age (inclusive) at which the item applies
    pub start_age: u32,
    /// Last age (inclusive) at which the item applies
    pub end_age: u32,
    pub owner: Owner,
    /// Item-specific annual indexation
    pub cola: f64,
    /// Counts toward the medical expense credit
    pub medical: bool,
}

impl CashFlowItem {
    pub fn income(description: &str, amount: f64, start_age: u32, end_age: u32, cola: f64) -> Self {
        Self {
            kind: ItemKind::Income,
            description: description.to_string(),
            amount,
            start_age,
            end_age,
            owner: Owner::User,
            cola,
            medical: false,
        }
    }

    pub fn expense(description: &str, amount: f64, start_age: u32, end_age: u32, cola: f64) -> Self {
        Self {
            kind: ItemKind::Expense,
            ..Self::income(description, amount, start_age, end_age, cola)
        }
    }

    pub fn owned_by(mut self, owner: Owner) -> Self {
        self.owner = owner;
        self
    }

    pub fn as_medical(mut self) -> Self {
        self.medical = true;
        self
    }

    pub fn is_active(&self, owner_age: u32) -> bool {
        owner_age >= self.start_age && owner_age <= self.end_age
    }

    /// Amount in `year` dollars, indexed by the item's own COLA
    pub fn amount_in(&self, year: i32, base_year: i32) -> f64 {
        self.amount * inflation_factor(self.cola, base_year, year)
    }

    fn validate(&self, who: &str) -> Result<()> {
        if !self.amount.is_finite() {
            return Err(EngineError::invalid(format!(
                "{}: item '{}' amount is not a number",
                who, self.description
            )));
        }
        if !self.cola.is_finite() || self.cola <= -1.0 {
            return Err(EngineError::invalid(format!(
                "{}: item '{}' COLA {} is not a valid rate",
                who, self.description, self.cola
            )));
        }
        if self.end_age < self.start_age {
            return Err(EngineError::invalid(format!(
                "{}: item '{}' ends at {} before it starts at {}",
                who, self.description, self.end_age, self.start_age
            )));
        }
        Ok(())
    }
}

/// One member of the household
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub birth_year: i32,
    /// Age CPP starts (60-70)
    pub cpp_start_age: u32,
    /// Estimated annual CPP at 65, base-year dollars
    pub cpp_at_65: f64,
    /// Age OAS starts (65-70)
    pub oas_start_age: u32,
    /// Years of Canadian residency after 18; `None` means full residency
    pub years_in_canada: Option<u32>,
    /// Opening account balances
    pub assets: Accounts,
    /// Adjusted cost base of the non-registered account
    pub nonreg_acb: f64,
    /// Income and expense items owned by this person
    pub items: Vec<CashFlowItem>,
}

impl Person {
    /// Person with only a birth year; benefits start at 65
    pub fn new(birth_year: i32) -> Self {
        Self {
            birth_year,
            cpp_start_age: 65,
            cpp_at_65: 0.0,
            oas_start_age: 65,
            years_in_canada: None,
            assets: Accounts::default(),
            nonreg_acb: 0.0,
            items: Vec::new(),
        }
    }

    pub fn age_in(&self, year: i32) -> u32 {
        (year - self.birth_year).max(0) as u32
    }

    /// Unrealized gain at simulation start
    pub fn initial_unrealized_gain(&self) -> f64 {
        (self.assets.nonreg - self.nonreg_acb).max(0.0)
    }

    fn validate(&self, who: &str) -> Result<()> {
        if !(60..=70).contains(&self.cpp_start_age) {
            return Err(EngineError::invalid(format!(
                "{}: CPP start age {} outside 60-70",
                who, self.cpp_start_age
            )));
        }
        if !(65..=70).contains(&self.oas_start_age) {
            return Err(EngineError::invalid(format!(
                "{}: OAS start age {} outside 65-70",
                who, self.oas_start_age
            )));
        }
        if let Some(years) = self.years_in_canada {
            if years > 40 {
                return Err(EngineError::invalid(format!(
                    "{}: years in Canada {} exceeds 40",
                    who, years
                )));
            }
        }
        for account in AccountType::ALL {
            let balance = self.assets.get(account);
            if !balance.is_finite() || balance < 0.0 {
                return Err(EngineError::invalid(format!(
                    "{}: {} balance must be a non-negative number",
                    who,
                    account.as_str()
                )));
            }
        }
        if self.nonreg_acb < 0.0 {
            return Err(EngineError::invalid(format!("{}: negative non-registered ACB", who)));
        }
        if self.cpp_at_65 < 0.0 {
            return Err(EngineError::invalid(format!("{}: negative CPP estimate", who)));
        }
        for item in &self.items {
            item.validate(who)?;
        }
        Ok(())
    }
}

/// Age-bounded draw order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalPhase {
    pub start_age: u32,
    pub end_age: u32,
    /// Accounts to draw from, in order
    pub order: Vec<AccountType>,
}

impl WithdrawalPhase {
    pub fn new(start_age: u32, end_age: u32, order: Vec<AccountType>) -> Self {
        Self { start_age, end_age, order }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.start_age && age <= self.end_age
    }
}

/// Ordered list of withdrawal phases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalStrategy {
    pub phases: Vec<WithdrawalPhase>,
}

impl WithdrawalStrategy {
    /// Single phase covering every age
    pub fn single(order: Vec<AccountType>) -> Self {
        Self {
            phases: vec![WithdrawalPhase::new(0, u32::MAX, order)],
        }
    }

    /// First phase whose window contains `user_age`
    pub fn phase_for(&self, user_age: u32) -> Option<&WithdrawalPhase> {
        self.phases.iter().find(|p| p.contains(user_age))
    }
}

/// Immutable per-run configuration for one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    /// Province code for provincial tax
    pub province: String,
    /// Global annual COLA
    pub cola: f64,
    /// Life expectancy of the user; last simulated age
    pub max_age: u32,
    pub retirement_age: u32,
    /// Nominal annual return per account type
    pub returns: Accounts,
    pub user: Person,
    pub spouse: Option<Person>,
    pub strategy: WithdrawalStrategy,
}

impl ScenarioInput {
    /// First simulated calendar year
    pub fn start_year(&self) -> i32 {
        self.user.birth_year + self.retirement_age as i32
    }

    /// Last simulated calendar year (inclusive)
    pub fn end_year(&self) -> i32 {
        self.user.birth_year + self.max_age as i32
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.max_age <= self.retirement_age {
            return Err(EngineError::InvalidPeriod {
                retirement_age: self.retirement_age,
                max_age: self.max_age,
            });
        }
        if !self.cola.is_finite() || self.cola <= -1.0 {
            return Err(EngineError::invalid(format!("COLA {} is not a valid rate", self.cola)));
        }
        if self.strategy.phases.len() > MAX_PHASES {
            return Err(EngineError::invalid(format!(
                "withdrawal strategy has {} phases; at most {} allowed",
                self.strategy.phases.len(),
                MAX_PHASES
            )));
        }
        for (i, phase) in self.strategy.phases.iter().enumerate() {
            if phase.order.len() > MAX_ACCOUNTS_PER_PHASE {
                return Err(EngineError::invalid(format!(
                    "phase {} lists {} accounts; at most {} allowed",
                    i + 1,
                    phase.order.len(),
                    MAX_ACCOUNTS_PER_PHASE
                )));
            }
            if phase.start_age > phase.end_age {
                return Err(EngineError::invalid(format!(
                    "phase {} starts at {} after it ends at {}",
                    i + 1,
                    phase.start_age,
                    phase.end_age
                )));
            }
        }
        for account in AccountType::ALL {
            if !self.returns.get(account).is_finite() {
                return Err(EngineError::invalid(format!(
                    "{} return is not a number",
                    account.as_str()
                )));
            }
        }
        self.user.validate("user")?;
        if let Some(spouse) = &self.spouse {
            spouse.validate("spouse")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scenario() -> ScenarioInput {
        let mut user = Person::new(1960);
        user.assets = Accounts::new(500_000.0, 0.0, 0.0, 0.0);
        ScenarioInput {
            province: "ON".to_string(),
            cola: 0.02,
            max_age: 90,
            retirement_age: 65,
            returns: Accounts::uniform(0.05),
            user,
            spouse: None,
            strategy: WithdrawalStrategy::single(vec![AccountType::Rrsp]),
        }
    }

    #[test]
    fn test_simulation_years() {
        let scenario = sample_scenario();
        assert_eq!(scenario.start_year(), 2025);
        assert_eq!(scenario.end_year(), 2050);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_invalid_period_rejected() {
        let mut scenario = sample_scenario();
        scenario.max_age = 65;
        assert!(matches!(
            scenario.validate(),
            Err(EngineError::InvalidPeriod { retirement_age: 65, max_age: 65 })
        ));
    }

    #[test]
    fn test_strategy_limits() {
        let mut scenario = sample_scenario();
        scenario.strategy.phases = vec![WithdrawalPhase::new(0, 100, vec![AccountType::Rrsp]); 4];
        assert!(scenario.validate().is_err());

        let mut scenario = sample_scenario();
        scenario.strategy = WithdrawalStrategy::single(vec![AccountType::Rrsp; 5]);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_residency_zero_is_distinct_from_unset() {
        let mut scenario = sample_scenario();
        scenario.user.years_in_canada = Some(0);
        assert!(scenario.validate().is_ok());

        scenario.user.years_in_canada = Some(41);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_item_activity_and_indexation() {
        let item = CashFlowItem::income("Pension", 10_000.0, 65, 70, 0.03);
        assert!(!item.is_active(64));
        assert!(item.is_active(65));
        assert!(item.is_active(70));
        assert!(!item.is_active(71));
        assert!((item.amount_in(2026, 2024) - 10_609.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_items_rejected() {
        let mut scenario = sample_scenario();
        scenario.user.items = vec![CashFlowItem::expense("Living", f64::NAN, 65, 90, 0.0)];
        assert!(matches!(scenario.validate(), Err(EngineError::InvalidInput(_))));

        scenario.user.items = vec![CashFlowItem::expense("Living", 40_000.0, 65, 90, f64::INFINITY)];
        assert!(scenario.validate().is_err());

        scenario.user.items = vec![CashFlowItem::income("Pension", 12_000.0, 80, 70, 0.0)];
        assert!(scenario.validate().is_err());

        let mut spouse = Person::new(1962);
        spouse.items = vec![CashFlowItem::expense("Car", 5_000.0, 70, 60, 0.0).owned_by(Owner::Spouse)];
        scenario.user.items.clear();
        scenario.spouse = Some(spouse);
        assert!(scenario.validate().is_err());

        scenario.spouse = None;
        scenario.user.items = vec![CashFlowItem::income("Pension", 12_000.0, 70, 70, 0.0)];
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_phase_selection() {
        let strategy = WithdrawalStrategy {
            phases: vec![
                WithdrawalPhase::new(60, 70, vec![AccountType::Nonreg]),
                WithdrawalPhase::new(71, 120, vec![AccountType::Rrsp]),
            ],
        };
        assert_eq!(strategy.phase_for(65).unwrap().order, vec![AccountType::Nonreg]);
        assert_eq!(strategy.phase_for(71).unwrap().order, vec![AccountType::Rrsp]);
        assert!(strategy.phase_for(59).is_none());
    }
}
