//! Monte Carlo analysis of final household assets

mod engine;
mod sampler;

pub use engine::{
    percentile, progress_interval, run_monte_carlo_simulation, run_optimized_monte_carlo_simulation,
    sample_path, summarize, MonteCarloConfig, MonteCarloEngine, MonteCarloMode, MonteCarloProgress,
    MonteCarloSummary,
};
pub use sampler::{BoxMuller, NormalSampler, ZeroNoise};
