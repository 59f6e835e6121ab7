//! Core projection engine for year-by-year household projections

use std::ops::ControlFlow;

use log::{debug, info, warn};

use super::expenses::{household_expenses, shortfall};
use super::income::{IncomeCalculator, PersonIncome};
use super::records::{PersonYear, ProjectionResult, YearRecord};
use super::returns::{FixedReturns, ReturnSource};
use super::state::HouseholdState;
use super::withdrawals::{execute_withdrawals, AccountPool};
use crate::error::Result;
use crate::household::{AccountType, Accounts, ScenarioInput};
use crate::tables::TaxTables;
use crate::tax::{
    realized_gain, PensionSplitMode, PersonTaxInput, PersonTaxResult, SplitOptimizer, TaxEngine,
};

/// Configuration for a projection run
#[derive(Debug, Clone, Default)]
pub struct ProjectionConfig {
    /// Pension splitting in the deterministic projection
    pub pension_split: PensionSplitMode,

    /// Log every simulated year at debug level
    pub log_years: bool,
}

impl ProjectionConfig {
    pub fn with_pension_split(mut self, mode: PensionSplitMode) -> Self {
        self.pension_split = mode;
        self
    }
}

/// Per-run hooks that vary between the deterministic and Monte Carlo loops
pub struct YearStrategy<'r> {
    /// Returns applied in the growth step
    pub returns: &'r mut dyn ReturnSource,
    /// Pension splitting applied in the tax step
    pub pension_split: PensionSplitMode,
}

/// Main projection engine
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    tables: TaxTables,
    config: ProjectionConfig,
}

impl ProjectionEngine {
    /// Create a new projection engine with given tables and config
    pub fn new(tables: TaxTables, config: ProjectionConfig) -> Self {
        Self { tables, config }
    }

    pub fn tables(&self) -> &TaxTables {
        &self.tables
    }

    /// Deterministic projection of one scenario at its configured returns
    pub fn simulate_scenario(&self, scenario: &ScenarioInput) -> Result<Vec<YearRecord>> {
        info!(
            "Projecting {}-{} in {} (spouse: {}, pension split: {:?})",
            scenario.start_year(),
            scenario.end_year(),
            scenario.province,
            scenario.spouse.is_some(),
            self.config.pension_split
        );

        let mut returns = FixedReturns(scenario.returns);
        let mut strategy = YearStrategy {
            returns: &mut returns,
            pension_split: self.config.pension_split,
        };
        let mut records = Vec::new();
        self.run_years(scenario, &mut strategy, |record| {
            records.push(record);
            ControlFlow::Continue(())
        })?;

        let final_assets = records.last().map(|r| r.total_assets()).unwrap_or(0.0);
        info!("Projected {} years; final assets {:.2}", records.len(), final_assets);
        Ok(records)
    }

    /// Deterministic projection wrapped with summary helpers
    pub fn project(&self, scenario: &ScenarioInput) -> Result<ProjectionResult> {
        Ok(ProjectionResult::new(self.simulate_scenario(scenario)?))
    }

    /// Shared year loop: growth, income, expenses, withdrawals, taxes
    ///
    /// `on_year` receives each finished record and may stop the run early.
    pub fn run_years<F>(&self, scenario: &ScenarioInput, strategy: &mut YearStrategy<'_>, mut on_year: F) -> Result<()>
    where
        F: FnMut(YearRecord) -> ControlFlow<()>,
    {
        scenario.validate()?;
        strategy.pension_split.validate()?;

        let mut state = HouseholdState::from_scenario(scenario);

        for (index, year) in (scenario.start_year()..=scenario.end_year()).enumerate() {
            let user_age = scenario.user.age_in(year);
            if user_age > scenario.max_age {
                break;
            }
            if user_age < scenario.retirement_age {
                continue;
            }

            let returns = strategy.returns.returns_for(index, year);
            let record = self.simulate_year(scenario, &mut state, year, &returns, strategy.pension_split);

            if self.config.log_years {
                debug!(
                    "{} age {}: income {:.2} expenses {:.2} withdrawals {:.2} tax {:.2} assets {:.2}",
                    record.year,
                    record.user_age,
                    record.total_income,
                    record.expenses,
                    record.combined.withdrawals.total(),
                    record.tax_total,
                    record.total_assets()
                );
            }

            if on_year(record).is_break() {
                break;
            }
        }

        Ok(())
    }

    /// Run the five steps of a single year
    fn simulate_year(
        &self,
        scenario: &ScenarioInput,
        state: &mut HouseholdState,
        year: i32,
        returns: &Accounts,
        pension_split: PensionSplitMode,
    ) -> YearRecord {
        let spouse_age = scenario.spouse.as_ref().map(|s| s.age_in(year));
        let mut record = YearRecord::new(year, scenario.user.age_in(year), spouse_age);

        self.apply_growth(state, returns, &mut record);
        self.calculate_income(scenario, state, &mut record);
        self.calculate_expenses(scenario, state, &mut record);
        self.apply_withdrawals(scenario, state, &mut record);
        self.calculate_taxes(scenario, state, pension_split, &mut record);

        record.finalize();
        record
    }

    /// Step 1: grow each account by its return
    fn apply_growth(&self, state: &mut HouseholdState, returns: &Accounts, record: &mut YearRecord) {
        record.user.opening = state.user.balances;
        record.user.growth = state.user.apply_growth(returns);

        if let (Some(person), Some(row)) = (state.spouse.as_mut(), record.spouse.as_mut()) {
            row.opening = person.balances;
            row.growth = person.apply_growth(returns);
        }
    }

    /// Step 2: CPP, OAS, income items, and GIS from last year's income
    fn calculate_income(&self, scenario: &ScenarioInput, state: &HouseholdState, record: &mut YearRecord) {
        let calculator = IncomeCalculator::new(&self.tables, scenario.cola);
        let user_income = calculator.person_income(&scenario.user, record.year);
        let spouse_income = scenario
            .spouse
            .as_ref()
            .map(|s| calculator.person_income(s, record.year));

        let (user_gis, spouse_gis) = calculator.gis(
            (record.user_age, user_income.oas),
            record.spouse_age.zip(spouse_income.map(|i| i.oas)),
            state.last_year_gis_income,
            record.year,
        );

        fill_income(&mut record.user, &user_income, user_gis);
        if let (Some(row), Some(income)) = (record.spouse.as_mut(), spouse_income) {
            fill_income(row, &income, spouse_gis);
        }
    }

    /// Step 3: spending plus last year's tax, less this year's income
    fn calculate_expenses(&self, scenario: &ScenarioInput, state: &HouseholdState, record: &mut YearRecord) {
        record.expenses = household_expenses(
            &scenario.user,
            scenario.spouse.as_ref(),
            record.year,
            self.tables.base_year,
        );
        record.last_year_tax = state.last_year_tax;
        record.total_income = record.people().map(|p| p.cash_income()).sum();
        record.shortfall = shortfall(record.expenses, record.last_year_tax, record.total_income);
    }

    /// Step 4: cover the shortfall in phase order, then apply RRIF/LIF minimums
    fn apply_withdrawals(&self, scenario: &ScenarioInput, state: &mut HouseholdState, record: &mut YearRecord) {
        let order: &[AccountType] = match scenario.strategy.phase_for(record.user_age) {
            Some(phase) => &phase.order,
            None => {
                warn!("{}: no withdrawal phase covers age {}", record.year, record.user_age);
                &[]
            }
        };

        let spouse_opening = record.spouse.as_ref().map(|row| (row.age, row.opening));
        let mut user_pool = AccountPool::new(
            record.user_age,
            record.user.opening,
            &mut state.user.balances,
            &self.tables,
        );
        let mut spouse_pool = match (state.spouse.as_mut(), spouse_opening) {
            (Some(person), Some((age, opening))) => {
                Some(AccountPool::new(age, opening, &mut person.balances, &self.tables))
            }
            _ => None,
        };

        let outcome = execute_withdrawals(
            record.shortfall,
            order,
            &mut user_pool,
            spouse_pool.as_mut(),
            &self.tables,
        );

        record.user.withdrawals = outcome.user;
        if let Some(row) = record.spouse.as_mut() {
            row.withdrawals = outcome.spouse.unwrap_or_default();
        }
        record.unmet_shortfall = outcome.unmet_shortfall;
        if outcome.unmet_shortfall > 0.0 {
            warn!(
                "{}: unmet shortfall of {:.2} after exhausting the withdrawal order",
                record.year, outcome.unmet_shortfall
            );
        }
    }

    /// Step 5: realize gains, OAS clawback, and federal + provincial tax
    fn calculate_taxes(
        &self,
        scenario: &ScenarioInput,
        state: &mut HouseholdState,
        pension_split: PensionSplitMode,
        record: &mut YearRecord,
    ) {
        let inflation = self.tables.index_to(scenario.cola, record.year);
        let engine = TaxEngine::new(&self.tables, &scenario.province, inflation);

        let user_realized = realized_gain(
            record.user.withdrawals.nonreg,
            state.user.unrealized_gain,
            record.user.opening.nonreg + record.user.growth.nonreg,
        );
        let user_input = tax_input(&record.user, user_realized);

        let spouse_realized = match (state.spouse.as_ref(), record.spouse.as_ref()) {
            (Some(person), Some(row)) => realized_gain(
                row.withdrawals.nonreg,
                person.unrealized_gain,
                row.opening.nonreg + row.growth.nonreg,
            ),
            _ => 0.0,
        };
        let spouse_input = record.spouse.as_ref().map(|row| tax_input(row, spouse_realized));

        let (split, result) = match (pension_split, spouse_input.as_ref()) {
            (PensionSplitMode::Optimize { grid_points }, Some(spouse)) => {
                SplitOptimizer::new(engine, grid_points).optimal_split(&user_input, spouse)
            }
            _ => (None, engine.household_tax(&user_input, spouse_input.as_ref(), None)),
        };
        if let Some(split) = split {
            debug!("{}: splitting {:.2} of pension income from {:?}", record.year, split.amount, split.from);
        }

        fill_tax(&mut record.user, &result.user);
        state.user.realize(user_realized);
        record.user.unrealized_gain = state.user.unrealized_gain;

        if let (Some(row), Some(person), Some(tax)) =
            (record.spouse.as_mut(), state.spouse.as_mut(), result.spouse.as_ref())
        {
            fill_tax(row, tax);
            person.realize(spouse_realized);
            row.unrealized_gain = person.unrealized_gain;
        }

        record.tax_total = result.total_tax;
        record.oas_clawback_total = result.total_clawback;

        state.last_year_tax = result.amount_due();
        state.last_year_gis_income = result.gis_income;
    }
}

impl Default for ProjectionEngine {
    fn default() -> Self {
        Self::new(TaxTables::default(), ProjectionConfig::default())
    }
}

fn fill_income(row: &mut PersonYear, income: &PersonIncome, gis: f64) {
    row.cpp = income.cpp;
    row.oas_gross = income.oas;
    row.oas = income.oas;
    row.gis = gis;
    row.other_income = income.other_income;
    row.medical_expenses = income.medical_expenses;
}

fn tax_input(row: &PersonYear, realized_gains: f64) -> PersonTaxInput {
    PersonTaxInput {
        age: row.age,
        cpp: row.cpp,
        oas_gross: row.oas_gross,
        other_income: row.other_income,
        registered_withdrawals: row.withdrawals.registered(),
        realized_gains,
        medical_expenses: row.medical_expenses,
    }
}

fn fill_tax(row: &mut PersonYear, tax: &PersonTaxResult) {
    row.realized_gains = tax.realized_gains;
    row.taxable_gains = tax.taxable_gains;
    row.oas_clawback = tax.oas_clawback;
    row.oas = tax.oas_net;
    row.taxable_income = tax.taxable_income;
    row.federal_tax = tax.federal_tax;
    row.provincial_tax = tax.provincial_tax;
    row.tax = tax.total_tax;
    row.pension_split_out = tax.pension_split_out;
    row.pension_split_in = tax.pension_split_in;
}
