//! Household input model and persisted-state loading

mod data;
pub mod persisted;

pub use data::{
    Accounts, AccountType, CashFlowItem, ItemKind, Owner, Person, ScenarioInput,
    WithdrawalPhase, WithdrawalStrategy, MAX_ACCOUNTS_PER_PHASE, MAX_PHASES,
};
pub use persisted::{PersistedState, ScenarioId};
