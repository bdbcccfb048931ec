use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::data::DRUG_RULES;
use super::phenotype::{file_name, normalize_gene};
use super::ReferenceError;
use crate::models::enums::{Phenotype, RiskLabel, Severity};

/// CPIC-style guidance for one (drug, gene, phenotype) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRule {
    pub risk_label: RiskLabel,
    pub severity: Severity,
    pub dose_adjustment: String,
    pub monitoring: String,
    pub confidence_score: f64,
}

/// Outcome of a catalog lookup. Every miss is a valid state, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleLookup<'a> {
    Matched(&'a ClinicalRule),
    UnknownDrug,
    UnknownGene,
    NoRuleForPhenotype,
}

/// A drug and the genes the catalog holds guidance for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDrug {
    pub drug: String,
    pub genes: Vec<String>,
}

#[derive(Debug, Clone)]
struct DrugEntry {
    /// Display name as written in the reference data.
    name: String,
    genes: HashMap<String, HashMap<Phenotype, ClinicalRule>>,
}

/// Immutable drug → gene → phenotype → rule mapping.
///
/// Drug names match case-insensitively; gene symbols are canonicalized the
/// same way as in the phenotype table.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    drugs: HashMap<String, DrugEntry>,
}

type RawCatalog = HashMap<String, HashMap<String, HashMap<String, ClinicalRule>>>;

impl RuleCatalog {
    /// Built-in CPIC rules.
    pub fn cpic_default() -> Self {
        let mut catalog = Self::default();
        for row in DRUG_RULES {
            let inserted = catalog.insert(
                row.drug,
                row.gene,
                row.phenotype,
                ClinicalRule {
                    risk_label: row.risk_label,
                    severity: row.severity,
                    dose_adjustment: row.dose_adjustment.to_string(),
                    monitoring: row.monitoring.to_string(),
                    confidence_score: row.confidence_score,
                },
            );
            if let Err(e) = inserted {
                tracing::warn!(error = %e, "Skipping built-in rule row");
            }
        }
        catalog
    }

    /// Load from a JSON file shaped like the built-in table:
    /// `{"Drug": {"GENE": {"Poor Metabolizer": {rule}}}}`.
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReferenceError::ReferenceDataLoad(path.display().to_string(), e.to_string())
        })?;
        let raw: RawCatalog = serde_json::from_str(&json)
            .map_err(|e| ReferenceError::ReferenceDataParse(file_name(path), e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalog) -> Result<Self, ReferenceError> {
        let mut catalog = Self::default();
        let mut seen = HashSet::new();
        for (drug, genes) in raw {
            if !seen.insert(drug_key(&drug)) {
                return Err(ReferenceError::DuplicateDrug(drug));
            }
            for (gene, phenotypes) in genes {
                for (label, rule) in phenotypes {
                    let phenotype: Phenotype = label.parse()?;
                    if !(0.0..=1.0).contains(&rule.confidence_score) {
                        return Err(ReferenceError::InvalidRule {
                            drug,
                            gene,
                            phenotype: label,
                            reason: format!(
                                "confidence_score {} outside [0, 1]",
                                rule.confidence_score
                            ),
                        });
                    }
                    catalog.insert(&drug, &gene, phenotype, rule)?;
                }
            }
        }
        Ok(catalog)
    }

    /// Add one rule. Gene symbols that normalize to one already holding a
    /// rule for `phenotype` are rejected.
    fn insert(
        &mut self,
        drug: &str,
        gene: &str,
        phenotype: Phenotype,
        rule: ClinicalRule,
    ) -> Result<(), ReferenceError> {
        let gene_key = normalize_gene(gene);
        let entry = self.drugs.entry(drug_key(drug)).or_insert_with(|| DrugEntry {
            name: drug.trim().to_string(),
            genes: HashMap::new(),
        });
        match entry.genes.entry(gene_key.clone()).or_default().entry(phenotype) {
            Entry::Occupied(_) => Err(ReferenceError::DuplicateRule {
                drug: entry.name.clone(),
                gene: gene_key,
                phenotype,
            }),
            Entry::Vacant(slot) => {
                slot.insert(rule);
                Ok(())
            }
        }
    }

    /// Three-level lookup: drug, then gene, then phenotype.
    pub fn lookup(&self, drug: &str, gene: &str, phenotype: Phenotype) -> RuleLookup<'_> {
        let Some(entry) = self.drugs.get(&drug_key(drug)) else {
            return RuleLookup::UnknownDrug;
        };
        let Some(rules) = entry.genes.get(&normalize_gene(gene)) else {
            return RuleLookup::UnknownGene;
        };
        match rules.get(&phenotype) {
            Some(rule) => RuleLookup::Matched(rule),
            None => RuleLookup::NoRuleForPhenotype,
        }
    }

    /// Whether any guidance exists for this drug/gene pair.
    pub fn covers(&self, drug: &str, gene: &str) -> bool {
        self.drugs
            .get(&drug_key(drug))
            .is_some_and(|entry| entry.genes.contains_key(&normalize_gene(gene)))
    }

    /// All drugs with their genes, sorted by drug name.
    pub fn drugs(&self) -> Vec<CatalogDrug> {
        let mut drugs: Vec<CatalogDrug> = self
            .drugs
            .values()
            .map(|entry| CatalogDrug {
                drug: entry.name.clone(),
                genes: entry
                    .genes
                    .keys()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            })
            .collect();
        drugs.sort_by(|a, b| a.drug.cmp(&b.drug));
        drugs
    }

    pub fn rule_count(&self) -> usize {
        self.drugs
            .values()
            .flat_map(|entry| entry.genes.values())
            .map(HashMap::len)
            .sum()
    }
}

fn drug_key(drug: &str) -> String {
    drug.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_row_is_retrievable() {
        let catalog = RuleCatalog::cpic_default();
        assert_eq!(catalog.rule_count(), DRUG_RULES.len());

        for row in DRUG_RULES {
            match catalog.lookup(row.drug, row.gene, row.phenotype) {
                RuleLookup::Matched(rule) => {
                    assert_eq!(rule.risk_label, row.risk_label);
                    assert_eq!(rule.severity, row.severity);
                    assert_eq!(rule.confidence_score, row.confidence_score);
                    assert_eq!(rule.dose_adjustment, row.dose_adjustment);
                    assert_eq!(rule.monitoring, row.monitoring);
                }
                other => panic!("{} {} {}: {other:?}", row.drug, row.gene, row.phenotype),
            }
        }
    }

    #[test]
    fn lookup_distinguishes_each_miss() {
        let catalog = RuleCatalog::cpic_default();
        assert_eq!(
            catalog.lookup("Aspirin", "CYP2C19", Phenotype::PoorMetabolizer),
            RuleLookup::UnknownDrug
        );
        assert_eq!(
            catalog.lookup("Clopidogrel", "CYP2D6", Phenotype::PoorMetabolizer),
            RuleLookup::UnknownGene
        );
        assert_eq!(
            catalog.lookup("Clopidogrel", "CYP2C19", Phenotype::Indeterminate),
            RuleLookup::NoRuleForPhenotype
        );
    }

    #[test]
    fn drug_lookup_ignores_case() {
        let catalog = RuleCatalog::cpic_default();
        assert!(matches!(
            catalog.lookup("clopidogrel", "cyp2c19", Phenotype::PoorMetabolizer),
            RuleLookup::Matched(_)
        ));
        assert!(catalog.covers("WARFARIN", "CYP2C9"));
        assert!(!catalog.covers("Warfarin", "CYP2C19"));
    }

    #[test]
    fn drugs_listing_is_sorted() {
        let catalog = RuleCatalog::cpic_default();
        let drugs = catalog.drugs();
        let names: Vec<&str> = drugs.iter().map(|d| d.drug.as_str()).collect();
        assert_eq!(
            names,
            vec!["Azathioprine", "Clopidogrel", "Codeine", "Fluorouracil", "Simvastatin", "Warfarin"]
        );
        assert_eq!(drugs[0].genes, vec!["TPMT".to_string()]);
    }

    #[test]
    fn load_rejects_out_of_range_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drug_rules.json");
        std::fs::write(
            &path,
            r#"{"Warfarin": {"CYP2C9": {"Poor Metabolizer": {
                "risk_label": "Adjust Dosage", "severity": "high",
                "dose_adjustment": "Reduce.", "monitoring": "INR.",
                "confidence_score": 1.5}}}}"#,
        )
        .unwrap();

        let err = RuleCatalog::load(&path).unwrap_err();
        assert!(matches!(err, ReferenceError::InvalidRule { .. }));
    }

    #[test]
    fn load_reads_nested_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drug_rules.json");
        std::fs::write(
            &path,
            r#"{"Tacrolimus": {"CYP3A5": {"Normal Metabolizer": {
                "risk_label": "Adjust Dosage", "severity": "moderate",
                "dose_adjustment": "Increase starting dose 1.5 to 2 times.",
                "monitoring": "Therapeutic drug monitoring.",
                "confidence_score": 0.9}}}}"#,
        )
        .unwrap();

        let catalog = RuleCatalog::load(&path).unwrap();
        match catalog.lookup("tacrolimus", "CYP3A5", Phenotype::NormalMetabolizer) {
            RuleLookup::Matched(rule) => assert_eq!(rule.severity, Severity::Moderate),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn load_rejects_case_duplicate_genes_with_same_phenotype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drug_rules.json");
        std::fs::write(
            &path,
            r#"{"Warfarin": {
                "CYP2C9": {"Poor Metabolizer": {
                    "risk_label": "Safe", "severity": "low",
                    "dose_adjustment": "Standard dosing.", "monitoring": "Standard monitoring.",
                    "confidence_score": 0.9}},
                "cyp2c9": {"Poor Metabolizer": {
                    "risk_label": "Toxic", "severity": "critical",
                    "dose_adjustment": "Avoid.", "monitoring": "Monitor bleeding.",
                    "confidence_score": 0.9}}}}"#,
        )
        .unwrap();

        let err = RuleCatalog::load(&path).unwrap_err();
        match err {
            ReferenceError::DuplicateRule { drug, gene, phenotype } => {
                assert_eq!(drug, "Warfarin");
                assert_eq!(gene, "CYP2C9");
                assert_eq!(phenotype, Phenotype::PoorMetabolizer);
            }
            other => panic!("expected duplicate rule, got {other:?}"),
        }
    }

    #[test]
    fn case_variant_genes_with_distinct_phenotypes_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drug_rules.json");
        std::fs::write(
            &path,
            r#"{"Warfarin": {
                "CYP2C9": {"Poor Metabolizer": {
                    "risk_label": "Adjust Dosage", "severity": "high",
                    "dose_adjustment": "Reduce.", "monitoring": "INR.",
                    "confidence_score": 0.9}},
                "cyp2c9": {"Normal Metabolizer": {
                    "risk_label": "Safe", "severity": "low",
                    "dose_adjustment": "Standard dosing.", "monitoring": "Standard monitoring.",
                    "confidence_score": 0.9}}}}"#,
        )
        .unwrap();

        let catalog = RuleCatalog::load(&path).unwrap();
        assert_eq!(catalog.rule_count(), 2);
    }

    #[test]
    fn load_rejects_case_duplicate_drugs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drug_rules.json");
        std::fs::write(&path, r#"{"Codeine": {}, "codeine": {}}"#).unwrap();

        let err = RuleCatalog::load(&path).unwrap_err();
        assert!(matches!(err, ReferenceError::DuplicateDrug(_)));
    }
}
