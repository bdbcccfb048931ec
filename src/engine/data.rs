//! Built-in CPIC reference data.
//!
//! Diplotype keys follow PharmVar star-allele notation; phenotype labels use
//! CPIC standardized terms. Used whenever no reference directory is
//! configured.

use crate::models::enums::{Phenotype, RiskLabel, Severity};

use crate::models::enums::Phenotype::*;

pub(crate) type GeneDiplotypes = (&'static str, &'static [(&'static str, Phenotype)]);

pub(crate) const PHENOTYPES: &[GeneDiplotypes] = &[
    (
        "CYP2C19",
        &[
            ("*1/*1", NormalMetabolizer),
            ("*1/*2", IntermediateMetabolizer),
            ("*1/*3", IntermediateMetabolizer),
            ("*2/*2", PoorMetabolizer),
            ("*2/*3", PoorMetabolizer),
            ("*3/*3", PoorMetabolizer),
            ("*1/*17", RapidMetabolizer),
            ("*17/*17", UltrarapidMetabolizer),
            ("*2/*17", IntermediateMetabolizer),
        ],
    ),
    (
        "CYP2C9",
        &[
            ("*1/*1", NormalMetabolizer),
            ("*1/*2", IntermediateMetabolizer),
            ("*1/*3", IntermediateMetabolizer),
            ("*2/*2", PoorMetabolizer),
            ("*2/*3", PoorMetabolizer),
            ("*3/*3", PoorMetabolizer),
        ],
    ),
    (
        "CYP2D6",
        &[
            ("*1/*1", NormalMetabolizer),
            ("*1/*2", NormalMetabolizer),
            ("*1/*4", IntermediateMetabolizer),
            ("*1/*5", IntermediateMetabolizer),
            ("*4/*4", PoorMetabolizer),
            ("*4/*5", PoorMetabolizer),
            ("*5/*5", PoorMetabolizer),
            ("*1/*1xN", UltrarapidMetabolizer),
            ("*2/*2xN", UltrarapidMetabolizer),
        ],
    ),
    (
        "SLCO1B1",
        &[
            ("*1/*1", NormalFunction),
            ("*1/*5", DecreasedFunction),
            ("*5/*5", PoorMetabolizer),
            ("*1/*15", DecreasedFunction),
            ("*15/*15", PoorMetabolizer),
        ],
    ),
    (
        "TPMT",
        &[
            ("*1/*1", NormalMetabolizer),
            ("*1/*3A", IntermediateMetabolizer),
            ("*1/*3C", IntermediateMetabolizer),
            ("*3A/*3A", PoorMetabolizer),
            ("*3A/*3C", PoorMetabolizer),
            ("*3C/*3C", PoorMetabolizer),
        ],
    ),
    (
        "DPYD",
        &[
            ("*1/*1", NormalMetabolizer),
            ("*1/*2A", IntermediateMetabolizer),
            ("*1/*13", IntermediateMetabolizer),
            ("*2A/*2A", PoorMetabolizer),
            ("*13/*13", PoorMetabolizer),
        ],
    ),
];

/// One (drug, gene, phenotype) guideline row.
pub(crate) struct RuleRow {
    pub drug: &'static str,
    pub gene: &'static str,
    pub phenotype: Phenotype,
    pub risk_label: RiskLabel,
    pub severity: Severity,
    pub confidence_score: f64,
    pub dose_adjustment: &'static str,
    pub monitoring: &'static str,
}

#[allow(clippy::too_many_arguments)]
const fn row(
    drug: &'static str,
    gene: &'static str,
    phenotype: Phenotype,
    risk_label: RiskLabel,
    severity: Severity,
    confidence_score: f64,
    dose_adjustment: &'static str,
    monitoring: &'static str,
) -> RuleRow {
    RuleRow {
        drug,
        gene,
        phenotype,
        risk_label,
        severity,
        confidence_score,
        dose_adjustment,
        monitoring,
    }
}

const ALT_ANTIPLATELET: &str =
    "Avoid clopidogrel. Use alternative antiplatelet therapy (e.g., prasugrel, ticagrelor).";
const LABEL_DOSING: &str = "Standard dosing. Use label-recommended dosage.";
const STANDARD_DOSING: &str = "Standard dosing.";
const STANDARD_MONITORING: &str = "Standard monitoring.";

pub(crate) const DRUG_RULES: &[RuleRow] = &[
    // Clopidogrel / CYP2C19
    row("Clopidogrel", "CYP2C19", PoorMetabolizer, RiskLabel::Ineffective, Severity::High, 0.95,
        ALT_ANTIPLATELET, "Monitor for adverse cardiovascular events."),
    row("Clopidogrel", "CYP2C19", IntermediateMetabolizer, RiskLabel::Ineffective, Severity::Moderate, 0.90,
        ALT_ANTIPLATELET, "Monitor for adverse cardiovascular events."),
    row("Clopidogrel", "CYP2C19", RapidMetabolizer, RiskLabel::Safe, Severity::Low, 0.85,
        LABEL_DOSING, "Monitor for bleeding."),
    row("Clopidogrel", "CYP2C19", UltrarapidMetabolizer, RiskLabel::Safe, Severity::Low, 0.85,
        LABEL_DOSING, "Monitor for bleeding."),
    row("Clopidogrel", "CYP2C19", NormalMetabolizer, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, STANDARD_MONITORING),
    // Warfarin / CYP2C9
    row("Warfarin", "CYP2C9", PoorMetabolizer, RiskLabel::AdjustDosage, Severity::High, 0.95,
        "Reduce daily dose by 30-50%. Consider alternative agents.",
        "Monitor INR extremely closely. Slower time to stable INR."),
    row("Warfarin", "CYP2C9", IntermediateMetabolizer, RiskLabel::AdjustDosage, Severity::Moderate, 0.90,
        "Reduce daily dose by 10-30%.", "Monitor INR closely."),
    row("Warfarin", "CYP2C9", NormalMetabolizer, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, "Standard INR monitoring."),
    // Simvastatin / SLCO1B1
    row("Simvastatin", "SLCO1B1", PoorMetabolizer, RiskLabel::Toxic, Severity::High, 0.95,
        "Prescribe a lower dose or alternative statin (e.g., rosuvastatin). High risk of myopathy.",
        "Monitor for muscle pain/weakness (CK levels)."),
    row("Simvastatin", "SLCO1B1", DecreasedFunction, RiskLabel::AdjustDosage, Severity::Moderate, 0.90,
        "Prescribe a lower dose or alternative statin. Moderate risk of myopathy.",
        "Monitor for muscle pain/weakness."),
    row("Simvastatin", "SLCO1B1", NormalFunction, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, STANDARD_MONITORING),
    // Azathioprine / TPMT
    row("Azathioprine", "TPMT", PoorMetabolizer, RiskLabel::Toxic, Severity::Critical, 0.98,
        "Drastic dose reduction (10% of standard) or avoid. Life-threatening myelosuppression risk.",
        "Frequent CBC monitoring required."),
    row("Azathioprine", "TPMT", IntermediateMetabolizer, RiskLabel::AdjustDosage, Severity::High, 0.95,
        "Reduce starting dose by 30-70%.", "Monitor CBC closely for myelosuppression."),
    row("Azathioprine", "TPMT", NormalMetabolizer, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, STANDARD_MONITORING),
    // Fluorouracil / DPYD
    row("Fluorouracil", "DPYD", PoorMetabolizer, RiskLabel::Toxic, Severity::Critical, 0.98,
        "Avoid usage. Use alternative drug. Extremely high risk of severe toxicity.",
        "N/A if avoided."),
    row("Fluorouracil", "DPYD", IntermediateMetabolizer, RiskLabel::AdjustDosage, Severity::High, 0.95,
        "Reduce starting dose by 50%.", "Monitor for severe toxicity (neutropenia, mucositis)."),
    row("Fluorouracil", "DPYD", NormalMetabolizer, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, STANDARD_MONITORING),
    // Codeine / CYP2D6
    row("Codeine", "CYP2D6", PoorMetabolizer, RiskLabel::Ineffective, Severity::Moderate, 0.95,
        "Avoid codeine. Use alternative analgesic (e.g., morphine, not tramadol).",
        "Monitor for lack of efficacy."),
    row("Codeine", "CYP2D6", UltrarapidMetabolizer, RiskLabel::Toxic, Severity::High, 0.95,
        "Avoid codeine. Use alternative analgesic (e.g., non-opioid). High risk of respiratory depression.",
        "Monitor for signs of opioid overdose."),
    row("Codeine", "CYP2D6", IntermediateMetabolizer, RiskLabel::Safe, Severity::Low, 0.85,
        "Standard dosing. Monitor for efficacy.", "Monitor for reduced efficacy."),
    row("Codeine", "CYP2D6", NormalMetabolizer, RiskLabel::Safe, Severity::Low, 1.0,
        STANDARD_DOSING, STANDARD_MONITORING),
];
