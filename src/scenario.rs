//! Scenario runner for side-by-side A/B projections
//!
//! Holds one projection engine (tables loaded once) and evaluates the two
//! scenarios of a persisted state. The scenarios share only read-only tables,
//! so A and B run in parallel.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::household::{PersistedState, ScenarioId, ScenarioInput};
use crate::monte_carlo::{MonteCarloConfig, MonteCarloEngine, MonteCarloMode, MonteCarloProgress, MonteCarloSummary};
use crate::projection::{ProjectionConfig, ProjectionEngine, ProjectionResult};
use crate::tables::TaxTables;

/// Projections of both scenarios
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioComparison {
    pub a: ProjectionResult,
    pub b: ProjectionResult,
}

impl ScenarioComparison {
    pub fn get(&self, id: ScenarioId) -> &ProjectionResult {
        match id {
            ScenarioId::A => &self.a,
            ScenarioId::B => &self.b,
        }
    }

    /// Final assets of B minus final assets of A
    pub fn final_difference(&self) -> f64 {
        self.b.final_assets() - self.a.final_assets()
    }
}

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_csv()?;
/// let state = PersistedState::load("household.json")?;
/// let comparison = runner.compare_persisted(&state)?;
/// println!("B - A: {:.2}", comparison.final_difference());
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    engine: ProjectionEngine,
}

impl ScenarioRunner {
    /// Create runner with the built-in tables
    pub fn new() -> Self {
        Self::with_tables(TaxTables::default(), ProjectionConfig::default())
    }

    /// Create runner by loading tables from the default CSV directory
    pub fn from_csv() -> Result<Self> {
        Ok(Self::with_tables(TaxTables::from_csv()?, ProjectionConfig::default()))
    }

    /// Create runner from a specific tables directory
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        Ok(Self::with_tables(TaxTables::from_csv_path(path)?, ProjectionConfig::default()))
    }

    pub fn with_tables(tables: TaxTables, config: ProjectionConfig) -> Self {
        Self {
            engine: ProjectionEngine::new(tables, config),
        }
    }

    pub fn engine(&self) -> &ProjectionEngine {
        &self.engine
    }

    pub fn tables(&self) -> &TaxTables {
        self.engine.tables()
    }

    /// Deterministic projection of one scenario
    pub fn run(&self, scenario: &ScenarioInput) -> Result<ProjectionResult> {
        self.engine.project(scenario)
    }

    /// Build one scenario from a persisted state and project it
    pub fn run_persisted(&self, state: &PersistedState, id: ScenarioId) -> Result<ProjectionResult> {
        let scenario = state.gather_inputs(id, self.tables())?;
        self.run(&scenario)
    }

    /// Project both scenarios in parallel
    pub fn compare(&self, a: &ScenarioInput, b: &ScenarioInput) -> Result<ScenarioComparison> {
        let (a, b) = rayon::join(|| self.run(a), || self.run(b));
        Ok(ScenarioComparison { a: a?, b: b? })
    }

    /// Build and project both scenarios of a persisted state
    pub fn compare_persisted(&self, state: &PersistedState) -> Result<ScenarioComparison> {
        let a = state.gather_inputs(ScenarioId::A, self.tables())?;
        let b = state.gather_inputs(ScenarioId::B, self.tables())?;
        self.compare(&a, &b)
    }

    /// Monte Carlo for one scenario using the state's standard deviations
    pub fn monte_carlo<P>(
        &self,
        state: &PersistedState,
        id: ScenarioId,
        num_runs: usize,
        mode: MonteCarloMode,
        seed: Option<u64>,
        progress: P,
    ) -> Result<MonteCarloSummary>
    where
        P: FnMut(MonteCarloProgress),
    {
        let scenario = state.gather_inputs(id, self.tables())?;
        let config = MonteCarloConfig {
            num_runs,
            stdevs: state.stdevs_for(id),
            mode,
            seed,
        };
        MonteCarloEngine::new(&self.engine).run(&scenario, &config, progress)
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new()
    }
}
