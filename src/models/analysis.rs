use serde::{Deserialize, Serialize};

use super::enums::{Phenotype, RiskLabel, Severity};

/// Input to both evaluation entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub patient_id: String,
    /// Gene symbol (e.g., CYP2C19)
    pub gene: String,
    /// Diplotype (e.g., *1/*2)
    pub diplotype: String,
    /// Drug name (e.g., Clopidogrel)
    pub drug: String,
}

/// One genotyped locus of a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genotype {
    pub gene: String,
    pub diplotype: String,
}

/// Several drugs evaluated against a patient's genotype panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelRequest {
    pub patient_id: String,
    #[serde(default)]
    pub genotypes: Vec<Genotype>,
    /// Drug names; each entry may itself be a comma-separated list.
    pub drugs: Vec<String>,
}

/// Risk verdict for a drug given the genotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_label: RiskLabel,
    /// Between 0 and 1.
    pub confidence_score: f64,
    pub severity: Severity,
}

impl RiskAssessment {
    /// Assessment used whenever no catalog rule matches.
    pub fn fallback() -> Self {
        Self {
            risk_label: RiskLabel::Unknown,
            confidence_score: 0.5,
            severity: Severity::Low,
        }
    }
}

/// Resolved phenotype next to the raw input it was resolved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacogenomicProfile {
    pub primary_gene: String,
    pub diplotype: String,
    pub phenotype: Phenotype,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecommendation {
    pub dose_adjustment: String,
    pub monitoring: String,
}

pub const NO_GUIDELINE_DOSE_ADJUSTMENT: &str =
    "No specific guideline found for this phenotype/drug combination.";
pub const STANDARD_MONITORING: &str = "Standard monitoring.";
pub const UNRECOGNIZED_DIPLOTYPE_DOSE_ADJUSTMENT: &str =
    "Diplotype not recognized. Improved genetic data required.";

impl ClinicalRecommendation {
    pub fn fallback() -> Self {
        Self {
            dose_adjustment: NO_GUIDELINE_DOSE_ADJUSTMENT.to_string(),
            monitoring: STANDARD_MONITORING.to_string(),
        }
    }

    /// One-line form used when prompting the generation backend.
    pub fn summary(&self) -> String {
        format!("{} {}", self.dose_adjustment, self.monitoring)
    }
}

/// Deterministic result of a single drug evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub patient_id: String,
    pub drug: String,
    pub risk_assessment: RiskAssessment,
    pub pharmacogenomic_profile: PharmacogenomicProfile,
    pub clinical_recommendation: ClinicalRecommendation,
}
