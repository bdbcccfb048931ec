//! Deterministic pharmacogenomic risk engine.
//!
//! Phenotype table and rule catalog are reference data: loaded once at
//! startup, shared read-only, and only reachable through their lookup
//! interfaces.

pub(crate) mod data;
pub mod phenotype;
pub mod rules;
pub mod evaluator;

pub use evaluator::{split_drug_list, RiskEvaluator};
pub use phenotype::PhenotypeTable;
pub use rules::{CatalogDrug, ClinicalRule, RuleCatalog, RuleLookup};

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::models::enums::Phenotype;

pub const PHENOTYPES_FILE: &str = "phenotypes.json";
pub const DRUG_RULES_FILE: &str = "drug_rules.json";

#[derive(Error, Debug)]
pub enum ReferenceError {
    #[error("Cannot read reference data {0}: {1}")]
    ReferenceDataLoad(String, String),

    #[error("Malformed reference data {0}: {1}")]
    ReferenceDataParse(String, String),

    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid rule {drug}/{gene}/{phenotype}: {reason}")]
    InvalidRule {
        drug: String,
        gene: String,
        phenotype: String,
        reason: String,
    },

    #[error("Drug listed twice: {0}")]
    DuplicateDrug(String),

    #[error("Rule listed twice: {drug}/{gene}/{phenotype}")]
    DuplicateRule {
        drug: String,
        gene: String,
        phenotype: Phenotype,
    },

    #[error("Diplotype listed twice for {gene}: {diplotype}")]
    DuplicateDiplotype { gene: String, diplotype: String },
}

/// Build the evaluator from a reference directory, or from the built-in
/// CPIC tables when none is configured.
///
/// A configured directory must contain both files; failing to load either
/// is fatal for the service.
pub fn load_evaluator(reference_dir: Option<&Path>) -> Result<RiskEvaluator, ReferenceError> {
    let Some(dir) = reference_dir else {
        let evaluator = RiskEvaluator::cpic_default();
        tracing::info!(
            diplotypes = evaluator.phenotypes().len(),
            rules = evaluator.catalog().rule_count(),
            "Using built-in CPIC reference data"
        );
        return Ok(evaluator);
    };

    let phenotypes = PhenotypeTable::load(&dir.join(PHENOTYPES_FILE))?;
    let catalog = RuleCatalog::load(&dir.join(DRUG_RULES_FILE))?;
    tracing::info!(
        dir = %dir.display(),
        diplotypes = phenotypes.len(),
        rules = catalog.rule_count(),
        "Loaded reference data"
    );

    Ok(RiskEvaluator::new(Arc::new(phenotypes), Arc::new(catalog)))
}
