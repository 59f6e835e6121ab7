//! Retirement Projection CLI
//!
//! Runs the A/B projections (and optionally Monte Carlo) for a saved household state

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use retirement_projection::monte_carlo::MonteCarloProgress;
use retirement_projection::{
    MonteCarloMode, MonteCarloSummary, PensionSplitMode, PersistedState, ProjectionConfig,
    ProjectionResult, ScenarioId, ScenarioRunner, TaxTables,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioChoice {
    A,
    B,
    Both,
}

impl ScenarioChoice {
    fn ids(&self) -> Vec<ScenarioId> {
        match self {
            ScenarioChoice::A => vec![ScenarioId::A],
            ScenarioChoice::B => vec![ScenarioId::B],
            ScenarioChoice::Both => vec![ScenarioId::A, ScenarioId::B],
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "retirement-projection")]
#[command(about = "Project a household's retirement finances year by year")]
struct Args {
    /// Saved household state (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Scenario(s) to project
    #[arg(short, long, value_enum, default_value = "both")]
    scenario: ScenarioChoice,

    /// Number of Monte Carlo trials to run per scenario
    #[arg(long)]
    monte_carlo: Option<usize>,

    /// RNG seed for reproducible Monte Carlo runs
    #[arg(long)]
    seed: Option<u64>,

    /// Optimize pension income splitting each year
    #[arg(long)]
    optimize_split: bool,

    /// Directory of tax table CSV files (built-in 2024 tables when omitted)
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let tables = match &args.tables {
        Some(dir) => TaxTables::from_csv_path(dir)
            .with_context(|| format!("loading tax tables from {}", dir.display()))?,
        None => TaxTables::default(),
    };
    let pension_split = if args.optimize_split {
        PensionSplitMode::full()
    } else {
        PensionSplitMode::Off
    };
    let runner = ScenarioRunner::with_tables(
        tables,
        ProjectionConfig::default().with_pension_split(pension_split),
    );

    let state = PersistedState::load(&args.input)
        .with_context(|| format!("reading household state {}", args.input.display()))?;

    let ids = args.scenario.ids();
    let results = if ids.len() == 2 {
        let comparison = runner
            .compare_persisted(&state)
            .context("projecting scenarios A and B")?;
        vec![(ScenarioId::A, comparison.a), (ScenarioId::B, comparison.b)]
    } else {
        ids.iter()
            .map(|&id| {
                runner
                    .run_persisted(&state, id)
                    .map(|result| (id, result))
                    .with_context(|| format!("projecting scenario {}", id.label()))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut monte_carlo = Vec::new();
    if let Some(runs) = args.monte_carlo {
        let mode = if args.optimize_split {
            MonteCarloMode::Optimized
        } else {
            MonteCarloMode::Plain
        };
        for &id in &ids {
            let summary = runner
                .monte_carlo(&state, id, runs, mode, args.seed, |p: MonteCarloProgress| {
                    log::info!("scenario {}: {}/{} trials", id.label(), p.completed, p.total)
                })
                .with_context(|| format!("Monte Carlo for scenario {}", id.label()))?;
            monte_carlo.push((id, summary));
        }
    }

    if args.json {
        print_json(&results, &monte_carlo)?;
    } else {
        for (id, result) in &results {
            print_projection(*id, result);
        }
        for (id, summary) in &monte_carlo {
            print_monte_carlo(*id, summary);
        }
        if results.len() == 2 {
            println!(
                "\nFinal assets B - A: ${:.2}",
                results[1].1.final_assets() - results[0].1.final_assets()
            );
        }
    }

    Ok(())
}

fn print_json(
    results: &[(ScenarioId, ProjectionResult)],
    monte_carlo: &[(ScenarioId, MonteCarloSummary)],
) -> Result<()> {
    let mut output = serde_json::Map::new();
    for (id, result) in results {
        let mut entry = serde_json::Map::new();
        entry.insert("records".to_string(), serde_json::to_value(&result.records)?);
        entry.insert("summary".to_string(), serde_json::to_value(result.summary())?);
        if let Some((_, summary)) = monte_carlo.iter().find(|(mc_id, _)| mc_id == id) {
            entry.insert("monteCarlo".to_string(), serde_json::to_value(summary)?);
        }
        output.insert(id.label().to_string(), serde_json::Value::Object(entry));
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_projection(id: ScenarioId, result: &ProjectionResult) {
    println!("\nScenario {} ({} years):", id.label(), result.records.len());
    println!(
        "{:>5} {:>4} {:>4} {:>12} {:>12} {:>12} {:>12} {:>10} {:>14}",
        "Year", "Age", "Sp", "Income", "Expenses", "Withdrawn", "Tax", "Unmet", "Assets"
    );
    println!("{}", "-".repeat(95));

    for record in &result.records {
        let spouse_age = record
            .spouse_age
            .map(|age| age.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5} {:>4} {:>4} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>10.2} {:>14.2}",
            record.year,
            record.user_age,
            spouse_age,
            record.total_income,
            record.expenses,
            record.combined.withdrawals.total(),
            record.tax_total,
            record.unmet_shortfall,
            record.total_assets(),
        );
    }

    let summary = result.summary();
    println!("\nSummary:");
    println!("  Total Withdrawals: ${:.2}", summary.total_withdrawals);
    println!("  Total Tax: ${:.2}", summary.total_tax);
    println!("  Total OAS Clawback: ${:.2}", summary.total_clawback);
    println!("  Total Unmet Shortfall: ${:.2}", summary.total_unmet_shortfall);
    match summary.depletion_year {
        Some(year) => println!("  Assets Depleted: {}", year),
        None => println!("  Assets Depleted: never"),
    }
    println!("  Final Assets: ${:.2}", summary.final_assets);
}

fn print_monte_carlo(id: ScenarioId, summary: &MonteCarloSummary) {
    println!("\nScenario {} Monte Carlo ({} runs):", id.label(), summary.num_runs);
    println!("  Success Rate: {:.1}%", summary.success_rate * 100.0);
    println!("  10th Percentile: ${:.2}", summary.p10);
    println!("  Median: ${:.2}", summary.median);
    println!("  90th Percentile: ${:.2}", summary.p90);
}
