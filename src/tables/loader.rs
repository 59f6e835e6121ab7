//! CSV-based table loader
//!
//! Loads tax and benefit tables from CSV files in data/tax_tables/

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use super::{
    BenefitTables, CapitalGainsRules, GisRates, JurisdictionTable, LifMaximumTable,
    RrifMinimumTable, Surtax, TaxBracket, TaxCredits, TaxTables, DEFAULT_BASE_YEAR,
};
use crate::error::{EngineError, Result};

/// Default path to the tables directory
pub const DEFAULT_TABLES_PATH: &str = "data/tax_tables";

/// Code used for the federal schedule in the bracket and credit files
pub const FEDERAL_CODE: &str = "FED";

#[derive(Debug, Deserialize)]
struct BracketRow {
    jurisdiction: String,
    /// Empty for the final, unbounded bracket
    up_to: Option<f64>,
    rate: f64,
}

#[derive(Debug, Deserialize)]
struct CreditRow {
    jurisdiction: String,
    bpa: f64,
    age_amount: f64,
    age_amount_threshold: f64,
    pension_income_amount: f64,
    medical_expense_threshold_limit: f64,
}

#[derive(Debug, Deserialize)]
struct SurtaxRow {
    jurisdiction: String,
    first_threshold: f64,
    first_rate: f64,
    second_threshold: f64,
    second_rate: f64,
}

fn parse_error(file: &str, message: impl Into<String>) -> EngineError {
    EngineError::Parse {
        file: file.to_string(),
        message: message.into(),
    }
}

/// Load brackets from CSV
/// Returns jurisdiction code -> brackets in file order
pub fn load_brackets(path: &Path) -> Result<HashMap<String, Vec<TaxBracket>>> {
    let file = File::open(path.join("tax_brackets.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut brackets: HashMap<String, Vec<TaxBracket>> = HashMap::new();
    for result in reader.deserialize() {
        let row: BracketRow = result?;
        brackets
            .entry(row.jurisdiction)
            .or_default()
            .push(TaxBracket { up_to: row.up_to, rate: row.rate });
    }

    Ok(brackets)
}

/// Load credit amounts from CSV
pub fn load_credits(path: &Path) -> Result<HashMap<String, TaxCredits>> {
    let file = File::open(path.join("tax_credits.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut credits = HashMap::new();
    for result in reader.deserialize() {
        let row: CreditRow = result?;
        credits.insert(
            row.jurisdiction,
            TaxCredits {
                bpa: row.bpa,
                age_amount: row.age_amount,
                age_amount_threshold: row.age_amount_threshold,
                pension_income_amount: row.pension_income_amount,
                medical_expense_threshold_limit: row.medical_expense_threshold_limit,
            },
        );
    }

    Ok(credits)
}

/// Load surtax rules from CSV
pub fn load_surtaxes(path: &Path) -> Result<HashMap<String, Surtax>> {
    let file = File::open(path.join("surtax.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut surtaxes = HashMap::new();
    for result in reader.deserialize() {
        let row: SurtaxRow = result?;
        surtaxes.insert(
            row.jurisdiction,
            Surtax {
                first_threshold: row.first_threshold,
                first_rate: row.first_rate,
                second_threshold: row.second_threshold,
                second_rate: row.second_rate,
            },
        );
    }

    Ok(surtaxes)
}

/// Load benefit parameters from CSV
/// Returns HashMap<parameter_name, value>
pub fn load_benefit_parameters(path: &Path) -> Result<HashMap<String, f64>> {
    let file = File::open(path.join("benefits.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut parameters = HashMap::new();
    for result in reader.records() {
        let record = result?;
        let name = record[0].to_string();
        let value: f64 = record[1]
            .parse()
            .map_err(|e| parse_error("benefits.csv", format!("{}: {}", name, e)))?;
        parameters.insert(name, value);
    }

    Ok(parameters)
}

/// Load an age,rate table from CSV
pub fn load_age_rates(path: &Path, file_name: &str) -> Result<Vec<(u32, f64)>> {
    let file = File::open(path.join(file_name))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut rates = Vec::new();
    for result in reader.records() {
        let record = result?;
        let age: u32 = record[0]
            .parse()
            .map_err(|e| parse_error(file_name, format!("age {:?}: {}", &record[0], e)))?;
        let rate: f64 = record[1]
            .parse()
            .map_err(|e| parse_error(file_name, format!("rate {:?}: {}", &record[1], e)))?;
        rates.push((age, rate));
    }

    Ok(rates)
}

/// Raw contents of a tables directory
pub struct LoadedTables {
    pub brackets: HashMap<String, Vec<TaxBracket>>,
    pub credits: HashMap<String, TaxCredits>,
    pub surtaxes: HashMap<String, Surtax>,
    pub benefit_parameters: HashMap<String, f64>,
    pub rrif_minimum: Vec<(u32, f64)>,
    pub lif_maximum: Vec<(u32, f64)>,
}

impl LoadedTables {
    /// Load all tables from the default path
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_TABLES_PATH))
    }

    /// Load all tables from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self {
            brackets: load_brackets(path)?,
            credits: load_credits(path)?,
            surtaxes: load_surtaxes(path)?,
            benefit_parameters: load_benefit_parameters(path)?,
            rrif_minimum: load_age_rates(path, "rrif_minimum.csv")?,
            lif_maximum: load_age_rates(path, "lif_maximum.csv")?,
        })
    }

    /// Assemble the typed tables, checking every jurisdiction is complete
    pub fn into_tables(mut self) -> Result<TaxTables> {
        let mut jurisdictions = HashMap::new();
        for (code, brackets) in self.brackets.drain() {
            let credits = self.credits.remove(&code).ok_or_else(|| {
                parse_error("tax_credits.csv", format!("no credits for jurisdiction {}", code))
            })?;
            match brackets.last() {
                Some(last) if last.up_to.is_none() => {}
                _ => {
                    return Err(parse_error(
                        "tax_brackets.csv",
                        format!("jurisdiction {} has no unbounded final bracket", code),
                    ))
                }
            }
            let surtax = self.surtaxes.remove(&code);
            jurisdictions.insert(code.clone(), JurisdictionTable { code, brackets, credits, surtax });
        }

        let federal = jurisdictions.remove(FEDERAL_CODE).ok_or_else(|| {
            parse_error("tax_brackets.csv", format!("missing {} brackets", FEDERAL_CODE))
        })?;

        let benefits = benefit_tables_from(&self.benefit_parameters)?;
        let base_year = self
            .benefit_parameters
            .get("base_year")
            .map(|y| *y as i32)
            .unwrap_or(DEFAULT_BASE_YEAR);

        Ok(TaxTables {
            base_year,
            federal,
            provinces: jurisdictions,
            benefits,
            rrif: RrifMinimumTable::from_loaded(&self.rrif_minimum),
            lif: LifMaximumTable::from_loaded(&self.lif_maximum),
        })
    }
}

fn benefit_tables_from(parameters: &HashMap<String, f64>) -> Result<BenefitTables> {
    let get = |name: &str| -> Result<f64> {
        parameters
            .get(name)
            .copied()
            .ok_or_else(|| parse_error("benefits.csv", format!("missing parameter {}", name)))
    };

    Ok(BenefitTables {
        cpp_early_reduction_per_month: get("cpp_early_reduction_per_month")?,
        cpp_late_increase_per_month: get("cpp_late_increase_per_month")?,
        oas_annual_max: get("oas_annual_max")?,
        oas_full_residency_years: get("oas_full_residency_years")? as u32,
        oas_deferral_bonus_per_month: get("oas_deferral_bonus_per_month")?,
        oas_boost_age: get("oas_boost_age")? as u32,
        oas_boost_rate: get("oas_boost_rate")?,
        oas_clawback_threshold: get("oas_clawback_threshold")?,
        oas_clawback_rate: get("oas_clawback_rate")?,
        gis_single: GisRates {
            max_payment: get("gis_single_max_payment")?,
            income_threshold: get("gis_single_income_threshold")?,
            exemption: get("gis_single_exemption")?,
        },
        gis_couple: GisRates {
            max_payment: get("gis_couple_max_payment")?,
            income_threshold: get("gis_couple_income_threshold")?,
            exemption: get("gis_couple_exemption")?,
        },
        gis_reduction_rate: get("gis_reduction_rate")?,
        capital_gains: CapitalGainsRules {
            threshold: get("capital_gains_threshold")?,
            lower_inclusion: get("capital_gains_lower_inclusion")?,
            upper_inclusion: get("capital_gains_upper_inclusion")?,
        },
    })
}
