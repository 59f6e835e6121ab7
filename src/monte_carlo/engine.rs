//! Monte Carlo driver: randomized return paths through the shared year loop

use std::ops::ControlFlow;

use log::info;
use serde::{Deserialize, Serialize};

use super::sampler::{BoxMuller, NormalSampler};
use crate::error::{EngineError, Result};
use crate::household::{AccountType, Accounts, ScenarioInput};
use crate::projection::{ProjectionEngine, ReturnPath, YearStrategy};
use crate::tax::PensionSplitMode;

/// Whether trials optimize pension splitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonteCarloMode {
    /// No pension splitting
    #[default]
    Plain,
    /// Pension splitting searched on the coarse grid
    Optimized,
}

impl MonteCarloMode {
    pub fn pension_split(&self) -> PensionSplitMode {
        match self {
            MonteCarloMode::Plain => PensionSplitMode::Off,
            MonteCarloMode::Optimized => PensionSplitMode::fast(),
        }
    }
}

/// Configuration for a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of independent trials
    pub num_runs: usize,
    /// Annual return standard deviation per account type
    pub stdevs: Accounts,
    pub mode: MonteCarloMode,
    /// Seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
}

impl MonteCarloConfig {
    pub fn new(num_runs: usize, stdevs: Accounts) -> Self {
        Self {
            num_runs,
            stdevs,
            mode: MonteCarloMode::Plain,
            seed: None,
        }
    }

    pub fn with_mode(mut self, mode: MonteCarloMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Trials completed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonteCarloProgress {
    pub completed: usize,
    pub total: usize,
}

impl MonteCarloProgress {
    pub fn fraction(&self) -> f64 {
        self.completed as f64 / self.total as f64
    }
}

/// Distribution of final household assets across trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub num_runs: usize,
    /// Share of trials ending with positive assets
    pub success_rate: f64,
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
}

/// Trials between progress reports: at most 50, about 1% of the run
pub fn progress_interval(num_runs: usize) -> usize {
    (num_runs / 100).clamp(1, 50)
}

/// Value at `sorted[floor(n * p)]`, clamped to the last element
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Summarize final assets from every trial
pub fn summarize(mut finals: Vec<f64>) -> MonteCarloSummary {
    finals.sort_by(|a, b| a.total_cmp(b));
    let num_runs = finals.len();
    let successes = finals.iter().filter(|v| **v > 0.0).count();

    MonteCarloSummary {
        num_runs,
        success_rate: if num_runs == 0 { 0.0 } else { successes as f64 / num_runs as f64 },
        median: percentile(&finals, 0.5),
        p10: percentile(&finals, 0.1),
        p90: percentile(&finals, 0.9),
    }
}

/// Draw one return path: mean + stdev * z per account per year
pub fn sample_path(
    means: &Accounts,
    stdevs: &Accounts,
    years: usize,
    sampler: &mut dyn NormalSampler,
) -> ReturnPath {
    let path = (0..years)
        .map(|_| {
            let mut returns = Accounts::default();
            for account in AccountType::ALL {
                *returns.get_mut(account) =
                    means.get(account) + stdevs.get(account) * sampler.standard_normal();
            }
            returns
        })
        .collect();
    ReturnPath::new(path)
}

/// Runs Monte Carlo trials on top of a projection engine
#[derive(Debug, Clone, Copy)]
pub struct MonteCarloEngine<'e> {
    engine: &'e ProjectionEngine,
}

impl<'e> MonteCarloEngine<'e> {
    pub fn new(engine: &'e ProjectionEngine) -> Self {
        Self { engine }
    }

    /// Run with a Box-Muller sampler, seeded from the config when a seed is given
    pub fn run<P>(&self, scenario: &ScenarioInput, config: &MonteCarloConfig, progress: P) -> Result<MonteCarloSummary>
    where
        P: FnMut(MonteCarloProgress),
    {
        match config.seed {
            Some(seed) => self.run_with_sampler(scenario, config, &mut BoxMuller::seeded(seed), progress),
            None => self.run_with_sampler(scenario, config, &mut BoxMuller::from_entropy(), progress),
        }
    }

    /// Run with an injected sampler
    pub fn run_with_sampler<P>(
        &self,
        scenario: &ScenarioInput,
        config: &MonteCarloConfig,
        sampler: &mut dyn NormalSampler,
        mut progress: P,
    ) -> Result<MonteCarloSummary>
    where
        P: FnMut(MonteCarloProgress),
    {
        if config.num_runs == 0 {
            return Err(EngineError::InvalidRunCount);
        }
        scenario.validate()?;
        let pension_split = config.mode.pension_split();
        pension_split.validate()?;
        for account in AccountType::ALL {
            let stdev = config.stdevs.get(account);
            if !stdev.is_finite() || stdev < 0.0 {
                return Err(EngineError::invalid(format!(
                    "{} standard deviation {} must be a non-negative number",
                    account.as_str(),
                    stdev
                )));
            }
        }

        let years = (scenario.end_year() - scenario.start_year() + 1) as usize;
        let interval = progress_interval(config.num_runs);
        info!(
            "Running {} Monte Carlo trials over {} years ({:?})",
            config.num_runs, years, config.mode
        );

        let mut finals = Vec::with_capacity(config.num_runs);
        for trial in 0..config.num_runs {
            let path = sample_path(&scenario.returns, &config.stdevs, years, sampler);
            finals.push(self.run_trial(scenario, path, pension_split)?);

            let completed = trial + 1;
            if completed % interval == 0 || completed == config.num_runs {
                progress(MonteCarloProgress {
                    completed,
                    total: config.num_runs,
                });
            }
        }

        let summary = summarize(finals);
        info!(
            "Monte Carlo success rate {:.1}%, median final assets {:.2}",
            summary.success_rate * 100.0,
            summary.median
        );
        Ok(summary)
    }

    /// Final household assets for one path; 0 as soon as assets run out
    fn run_trial(&self, scenario: &ScenarioInput, mut path: ReturnPath, pension_split: PensionSplitMode) -> Result<f64> {
        let mut final_assets = 0.0;
        let mut strategy = YearStrategy {
            returns: &mut path,
            pension_split,
        };
        self.engine.run_years(scenario, &mut strategy, |record| {
            let total = record.total_assets();
            if total <= 0.0 {
                final_assets = 0.0;
                ControlFlow::Break(())
            } else {
                final_assets = total;
                ControlFlow::Continue(())
            }
        })?;
        Ok(final_assets)
    }
}

/// Plain Monte Carlo: no pension splitting
pub fn run_monte_carlo_simulation<P>(
    engine: &ProjectionEngine,
    scenario: &ScenarioInput,
    stdevs: Accounts,
    num_runs: usize,
    progress: P,
) -> Result<MonteCarloSummary>
where
    P: FnMut(MonteCarloProgress),
{
    let config = MonteCarloConfig::new(num_runs, stdevs);
    MonteCarloEngine::new(engine).run(scenario, &config, progress)
}

/// Monte Carlo with pension splitting optimized each year on the coarse grid
pub fn run_optimized_monte_carlo_simulation<P>(
    engine: &ProjectionEngine,
    scenario: &ScenarioInput,
    stdevs: Accounts,
    num_runs: usize,
    progress: P,
) -> Result<MonteCarloSummary>
where
    P: FnMut(MonteCarloProgress),
{
    let config = MonteCarloConfig::new(num_runs, stdevs).with_mode(MonteCarloMode::Optimized);
    MonteCarloEngine::new(engine).run(scenario, &config, progress)
}
