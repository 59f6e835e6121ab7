//! Persisted JSON state and its conversion into validated scenario inputs
//!
//! The layout matches the import/export format of the planner UI. Every raw field
//! is optional; `gather_inputs` fills defaults once and validates the result.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use super::{
    Accounts, AccountType, CashFlowItem, ItemKind, Owner, Person, ScenarioInput,
    WithdrawalPhase, WithdrawalStrategy,
};
use crate::error::{EngineError, Result};
use crate::tables::TaxTables;

/// Global COLA used when the state omits one
pub const DEFAULT_COLA: f64 = 0.02;

/// Which of the two scenarios to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioId {
    A,
    B,
}

impl ScenarioId {
    pub fn label(&self) -> &'static str {
        match self {
            ScenarioId::A => "A",
            ScenarioId::B => "B",
        }
    }
}

/// Per-account values as stored (returns or standard deviations)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAccounts {
    pub rrsp: Option<f64>,
    pub tfsa: Option<f64>,
    pub nonreg: Option<f64>,
    pub lif: Option<f64>,
}

impl RawAccounts {
    fn resolve(&self) -> Accounts {
        Accounts::new(
            self.rrsp.unwrap_or(0.0),
            self.tfsa.unwrap_or(0.0),
            self.nonreg.unwrap_or(0.0),
            self.lif.unwrap_or(0.0),
        )
    }
}

/// Person as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPerson {
    pub birth_year: Option<i32>,
    pub cpp_start_age: Option<u32>,
    #[serde(alias = "cppAmount")]
    pub cpp_at_65: Option<f64>,
    pub oas_start_age: Option<u32>,
    /// Kept optional: 0 is a real answer, absence means full residency
    pub years_in_canada: Option<u32>,
    pub rrsp: Option<f64>,
    pub tfsa: Option<f64>,
    pub nonreg: Option<f64>,
    /// Non-registered ACB; missing means no embedded gain
    pub nonreg_acb: Option<f64>,
    pub lif: Option<f64>,
}

impl RawPerson {
    fn into_person(self, who: &str) -> Result<Person> {
        let birth_year = self
            .birth_year
            .ok_or_else(|| EngineError::invalid(format!("{}: birthYear is required", who)))?;
        let nonreg = self.nonreg.unwrap_or(0.0);

        Ok(Person {
            birth_year,
            cpp_start_age: self.cpp_start_age.unwrap_or(65),
            cpp_at_65: self.cpp_at_65.unwrap_or(0.0),
            oas_start_age: self.oas_start_age.unwrap_or(65),
            years_in_canada: self.years_in_canada,
            assets: Accounts::new(
                self.rrsp.unwrap_or(0.0),
                self.tfsa.unwrap_or(0.0),
                nonreg,
                self.lif.unwrap_or(0.0),
            ),
            nonreg_acb: self.nonreg_acb.unwrap_or(nonreg),
            items: Vec::new(),
        })
    }
}

/// Scenario-level data (`scenarioAData` / `scenarioBData`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawScenarioData {
    pub retirement_age: Option<u32>,
    pub returns: RawAccounts,
    pub user: RawPerson,
    pub spouse: Option<RawPerson>,
}

/// Income/expense item as stored (`otherIncomes_a` / `otherIncomes_b`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawItem {
    #[serde(rename = "type")]
    pub kind: Option<ItemKind>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub start_age: Option<u32>,
    pub end_age: Option<u32>,
    pub owner: Option<Owner>,
    pub cola: Option<f64>,
    #[serde(alias = "medical")]
    pub is_medical: Option<bool>,
}

impl RawItem {
    fn into_item(self, global_cola: f64) -> CashFlowItem {
        CashFlowItem {
            kind: self.kind.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            amount: self.amount.unwrap_or(0.0),
            start_age: self.start_age.unwrap_or(0),
            end_age: self.end_age.unwrap_or(u32::MAX),
            owner: self.owner.unwrap_or_default(),
            cola: self.cola.unwrap_or(global_cola),
            medical: self.is_medical.unwrap_or(false),
        }
    }
}

/// Withdrawal phase as stored (`strategy_a` / `strategy_b`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPhase {
    pub start_age: Option<u32>,
    pub end_age: Option<u32>,
    pub order: Vec<AccountType>,
}

/// Top-level persisted state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub province: Option<String>,
    #[serde(rename = "lifeExpectancy")]
    pub life_expectancy: Option<u32>,
    pub cola: Option<f64>,
    pub stdevs: RawAccounts,
    pub stdevs_b: RawAccounts,
    #[serde(rename = "scenarioAData")]
    pub scenario_a_data: RawScenarioData,
    #[serde(rename = "otherIncomes_a")]
    pub other_incomes_a: Vec<RawItem>,
    pub strategy_a: Vec<RawPhase>,
    #[serde(rename = "scenarioBData")]
    pub scenario_b_data: RawScenarioData,
    #[serde(rename = "otherIncomes_b")]
    pub other_incomes_b: Vec<RawItem>,
    pub strategy_b: Vec<RawPhase>,
    #[serde(rename = "hasSpouse")]
    pub has_spouse: bool,
    #[serde(rename = "hasSpouse_b")]
    pub has_spouse_b: bool,
}

impl PersistedState {
    /// Parse a state from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a state from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Return standard deviations for a scenario's Monte Carlo run
    pub fn stdevs_for(&self, id: ScenarioId) -> Accounts {
        match id {
            ScenarioId::A => self.stdevs.resolve(),
            ScenarioId::B => self.stdevs_b.resolve(),
        }
    }

    /// Build and validate the strict input for one scenario
    pub fn gather_inputs(&self, id: ScenarioId, tables: &TaxTables) -> Result<ScenarioInput> {
        let (data, items, phases, has_spouse) = match id {
            ScenarioId::A => (&self.scenario_a_data, &self.other_incomes_a, &self.strategy_a, self.has_spouse),
            ScenarioId::B => (&self.scenario_b_data, &self.other_incomes_b, &self.strategy_b, self.has_spouse_b),
        };

        let province = self
            .province
            .clone()
            .ok_or_else(|| EngineError::invalid("province is required"))?;
        if !tables.has_province(&province) {
            return Err(EngineError::invalid(format!("no tax tables for province {}", province)));
        }
        let max_age = self
            .life_expectancy
            .ok_or_else(|| EngineError::invalid("lifeExpectancy is required"))?;
        let retirement_age = data.retirement_age.ok_or_else(|| {
            EngineError::invalid(format!("scenario {}: retirementAge is required", id.label()))
        })?;
        let cola = self.cola.unwrap_or(DEFAULT_COLA);

        let mut user = data.user.clone().into_person("user")?;
        let mut spouse = match (&data.spouse, has_spouse) {
            (Some(raw), true) => Some(raw.clone().into_person("spouse")?),
            (None, true) => {
                return Err(EngineError::invalid(format!(
                    "scenario {}: hasSpouse is set but no spouse data",
                    id.label()
                )))
            }
            (_, false) => None,
        };

        for raw in items {
            let item = raw.clone().into_item(cola);
            match (item.owner, spouse.as_mut()) {
                (Owner::User, _) => user.items.push(item),
                (Owner::Spouse, Some(s)) => s.items.push(item),
                (Owner::Spouse, None) => {
                    warn!(
                        "scenario {}: dropping spouse item '{}' with no spouse",
                        id.label(),
                        item.description
                    );
                }
            }
        }

        let strategy = WithdrawalStrategy {
            phases: phases
                .iter()
                .map(|p| WithdrawalPhase {
                    start_age: p.start_age.unwrap_or(0),
                    end_age: p.end_age.unwrap_or(u32::MAX),
                    order: p.order.clone(),
                })
                .collect(),
        };

        let scenario = ScenarioInput {
            province,
            cola,
            max_age,
            retirement_age,
            returns: data.returns.resolve(),
            user,
            spouse,
            strategy,
        };
        scenario.validate()?;
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"{
        "province": "ON",
        "lifeExpectancy": 92,
        "cola": 0.025,
        "stdevs": {"rrsp": 0.12, "tfsa": 0.12, "nonreg": 0.10, "lif": 0.08},
        "scenarioAData": {
            "retirementAge": 65,
            "returns": {"rrsp": 0.05, "tfsa": 0.05, "nonreg": 0.04, "lif": 0.04},
            "user": {"birthYear": 1960, "cppStartAge": 70, "cppAt65": 12000,
                     "yearsInCanada": 0, "rrsp": 400000, "nonreg": 100000, "nonregAcb": 60000},
            "spouse": {"birthYear": 1962, "tfsa": 80000}
        },
        "otherIncomes_a": [
            {"type": "expense", "description": "Living", "amount": 60000, "startAge": 60, "endAge": 100},
            {"description": "Rental", "amount": 8000, "startAge": 65, "endAge": 80, "cola": 0.0},
            {"type": "expense", "description": "Care", "amount": 3000, "startAge": 80, "endAge": 100,
             "owner": "spouse", "isMedical": true}
        ],
        "strategy_a": [
            {"startAge": 65, "endAge": 71, "order": ["nonreg", "tfsa"]},
            {"startAge": 72, "endAge": 120, "order": ["rrsp", "lif", "tfsa", "nonreg"]}
        ],
        "scenarioBData": {"retirementAge": 60, "user": {"birthYear": 1960}},
        "hasSpouse": true,
        "hasSpouse_b": false
    }"#;

    #[test]
    fn test_gather_scenario_a() {
        let state = PersistedState::from_json(STATE).expect("state parses");
        let tables = TaxTables::canada_2024();
        let scenario = state.gather_inputs(ScenarioId::A, &tables).expect("scenario A valid");

        assert_eq!(scenario.province, "ON");
        assert_eq!(scenario.max_age, 92);
        assert_eq!(scenario.retirement_age, 65);
        assert_eq!(scenario.returns.nonreg, 0.04);
        assert_eq!(scenario.user.cpp_start_age, 70);
        assert_eq!(scenario.user.years_in_canada, Some(0));
        assert_eq!(scenario.user.nonreg_acb, 60_000.0);
        assert_eq!(scenario.strategy.phases.len(), 2);

        // Items are routed by owner; missing COLA falls back to the global rate
        assert_eq!(scenario.user.items.len(), 2);
        assert_eq!(scenario.user.items[0].kind, ItemKind::Expense);
        assert_eq!(scenario.user.items[0].cola, 0.025);
        assert_eq!(scenario.user.items[1].kind, ItemKind::Income);
        assert_eq!(scenario.user.items[1].cola, 0.0);

        let spouse = scenario.spouse.expect("spouse present");
        assert_eq!(spouse.years_in_canada, None);
        assert_eq!(spouse.assets.tfsa, 80_000.0);
        assert!(spouse.items[0].medical);

        let stdevs = state.stdevs_for(ScenarioId::A);
        assert_eq!(stdevs.lif, 0.08);
    }

    #[test]
    fn test_gather_scenario_b_without_spouse() {
        let state = PersistedState::from_json(STATE).unwrap();
        let scenario = state
            .gather_inputs(ScenarioId::B, &TaxTables::canada_2024())
            .expect("scenario B valid");

        assert!(scenario.spouse.is_none());
        assert!(scenario.user.items.is_empty());
        assert_eq!(scenario.retirement_age, 60);
        assert_eq!(state.stdevs_for(ScenarioId::B), Accounts::default());
    }

    #[test]
    fn test_unknown_province_rejected() {
        let mut state = PersistedState::from_json(STATE).unwrap();
        state.province = Some("ZZ".to_string());
        let result = state.gather_inputs(ScenarioId::A, &TaxTables::canada_2024());
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_retirement_at_life_expectancy_rejected() {
        let mut state = PersistedState::from_json(STATE).unwrap();
        state.life_expectancy = Some(65);
        let result = state.gather_inputs(ScenarioId::A, &TaxTables::canada_2024());
        assert!(matches!(result, Err(EngineError::InvalidPeriod { .. })));
    }
}
