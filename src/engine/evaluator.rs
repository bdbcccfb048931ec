use std::sync::Arc;

use super::phenotype::PhenotypeTable;
use super::rules::{RuleCatalog, RuleLookup};
use crate::models::*;

/// Deterministic risk evaluation over the phenotype table and rule catalog.
///
/// Pure with respect to its inputs: the same request always yields the same
/// result, and no input value makes it fail.
#[derive(Debug, Clone)]
pub struct RiskEvaluator {
    phenotypes: Arc<PhenotypeTable>,
    catalog: Arc<RuleCatalog>,
}

impl RiskEvaluator {
    pub fn new(phenotypes: Arc<PhenotypeTable>, catalog: Arc<RuleCatalog>) -> Self {
        Self {
            phenotypes,
            catalog,
        }
    }

    /// Evaluator over the built-in CPIC tables.
    pub fn cpic_default() -> Self {
        Self::new(
            Arc::new(PhenotypeTable::cpic_default()),
            Arc::new(RuleCatalog::cpic_default()),
        )
    }

    pub fn phenotypes(&self) -> &PhenotypeTable {
        &self.phenotypes
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Resolve the phenotype, then walk drug → gene → phenotype in the catalog.
    ///
    /// Any miss yields the fallback assessment and recommendation. A miss caused
    /// by an unrecognized diplotype (phenotype `Indeterminate`) reports that
    /// explicitly in the dose adjustment instead of the generic "no guideline"
    /// text, but only once drug and gene are both known.
    pub fn evaluate(
        &self,
        patient_id: &str,
        gene: &str,
        diplotype: &str,
        drug: &str,
    ) -> AnalysisResult {
        let phenotype = self.phenotypes.resolve(gene, diplotype);

        let (risk_assessment, clinical_recommendation) =
            match self.catalog.lookup(drug, gene, phenotype) {
                RuleLookup::Matched(rule) => (
                    RiskAssessment {
                        risk_label: rule.risk_label,
                        confidence_score: rule.confidence_score,
                        severity: rule.severity,
                    },
                    ClinicalRecommendation {
                        dose_adjustment: rule.dose_adjustment.clone(),
                        monitoring: rule.monitoring.clone(),
                    },
                ),
                RuleLookup::NoRuleForPhenotype if phenotype.is_indeterminate() => {
                    tracing::debug!(%gene, %diplotype, "Diplotype not recognized");
                    (
                        RiskAssessment::fallback(),
                        ClinicalRecommendation {
                            dose_adjustment: UNRECOGNIZED_DIPLOTYPE_DOSE_ADJUSTMENT.to_string(),
                            monitoring: STANDARD_MONITORING.to_string(),
                        },
                    )
                }
                miss => {
                    tracing::debug!(%drug, %gene, %phenotype, ?miss, "No catalog rule, using fallback");
                    (RiskAssessment::fallback(), ClinicalRecommendation::fallback())
                }
            };

        AnalysisResult {
            patient_id: patient_id.to_string(),
            drug: drug.to_string(),
            risk_assessment,
            pharmacogenomic_profile: PharmacogenomicProfile {
                primary_gene: gene.to_string(),
                diplotype: diplotype.to_string(),
                phenotype,
            },
            clinical_recommendation,
        }
    }

    pub fn evaluate_request(&self, request: &AnalyzeRequest) -> AnalysisResult {
        self.evaluate(
            &request.patient_id,
            &request.gene,
            &request.diplotype,
            &request.drug,
        )
    }

    /// Evaluate several drugs against a genotype panel.
    ///
    /// Each drug is paired with the first genotype whose gene the catalog has
    /// guidance for; when none applies the first genotype is used, and an empty
    /// panel evaluates against gene and diplotype "Unknown".
    pub fn evaluate_panel(&self, request: &PanelRequest) -> Vec<AnalysisResult> {
        split_drug_list(&request.drugs)
            .iter()
            .map(|drug| {
                let genotype = request
                    .genotypes
                    .iter()
                    .find(|g| self.catalog.covers(drug, &g.gene))
                    .or_else(|| request.genotypes.first());

                match genotype {
                    Some(g) => self.evaluate(&request.patient_id, &g.gene, &g.diplotype, drug),
                    None => self.evaluate(&request.patient_id, "Unknown", "Unknown", drug),
                }
            })
            .collect()
    }
}

/// Flatten comma-separated drug entries, trimming and dropping empties.
pub fn split_drug_list(drugs: &[String]) -> Vec<String> {
    drugs
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::data::DRUG_RULES;

    fn evaluator() -> RiskEvaluator {
        RiskEvaluator::cpic_default()
    }

    #[test]
    fn clopidogrel_poor_metabolizer_is_ineffective() {
        let result = evaluator().evaluate("P1", "CYP2C19", "*2/*2", "Clopidogrel");
        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Ineffective);
        assert_eq!(result.risk_assessment.severity, Severity::High);
        assert_eq!(result.risk_assessment.confidence_score, 0.95);
        assert_eq!(result.pharmacogenomic_profile.phenotype, Phenotype::PoorMetabolizer);
        assert_eq!(result.patient_id, "P1");
    }

    #[test]
    fn azathioprine_normal_metabolizer_is_safe() {
        let result = evaluator().evaluate("P2", "TPMT", "*1/*1", "Azathioprine");
        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Safe);
        assert_eq!(result.risk_assessment.severity, Severity::Low);
        assert_eq!(result.risk_assessment.confidence_score, 1.0);
    }

    #[test]
    fn unrecognized_diplotype_reports_bad_genetic_data() {
        let result = evaluator().evaluate("P3", "CYP2C19", "*9/*9", "Clopidogrel");
        assert_eq!(result.pharmacogenomic_profile.phenotype, Phenotype::Indeterminate);
        assert_eq!(result.risk_assessment, RiskAssessment::fallback());
        assert!(result
            .clinical_recommendation
            .dose_adjustment
            .contains("Diplotype not recognized"));
        assert_eq!(result.clinical_recommendation.monitoring, STANDARD_MONITORING);
    }

    #[test]
    fn unknown_drug_uses_literal_fallback() {
        let result = evaluator().evaluate("P4", "CYP2C19", "*2/*2", "Aspirin");
        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Unknown);
        assert_eq!(result.risk_assessment.severity, Severity::Low);
        assert_eq!(result.risk_assessment.confidence_score, 0.5);
        assert_eq!(result.clinical_recommendation, ClinicalRecommendation::fallback());
    }

    #[test]
    fn unknown_drug_with_unrecognized_diplotype_keeps_generic_text() {
        let result = evaluator().evaluate("P5", "CYP2C19", "*9/*9", "Aspirin");
        assert_eq!(
            result.clinical_recommendation.dose_adjustment,
            NO_GUIDELINE_DOSE_ADJUSTMENT
        );
    }

    #[test]
    fn known_drug_unrelated_gene_uses_fallback() {
        let result = evaluator().evaluate("P6", "CYP2D6", "*4/*4", "Clopidogrel");
        assert_eq!(result.pharmacogenomic_profile.phenotype, Phenotype::PoorMetabolizer);
        assert_eq!(result.risk_assessment, RiskAssessment::fallback());
        assert_eq!(result.clinical_recommendation, ClinicalRecommendation::fallback());
    }

    #[test]
    fn recognized_phenotype_without_rule_uses_generic_text() {
        let mut raw = std::collections::HashMap::new();
        raw.insert(
            "CYP2D6".to_string(),
            [("*1/*41".to_string(), Phenotype::RapidMetabolizer)].into_iter().collect(),
        );
        let eval = RiskEvaluator::new(
            Arc::new(PhenotypeTable::from_map(raw).unwrap()),
            Arc::new(RuleCatalog::cpic_default()),
        );

        let result = eval.evaluate("P7", "CYP2D6", "*1/*41", "Codeine");
        assert_eq!(result.pharmacogenomic_profile.phenotype, Phenotype::RapidMetabolizer);
        assert_eq!(result.risk_assessment, RiskAssessment::fallback());
        assert_eq!(result.clinical_recommendation, ClinicalRecommendation::fallback());
    }

    #[test]
    fn every_rule_is_reachable_through_evaluate() {
        let eval = evaluator();
        for row in DRUG_RULES {
            let Some(diplotype) = find_diplotype(row.gene, row.phenotype) else {
                continue;
            };

            let result = eval.evaluate("PX", row.gene, diplotype, row.drug);
            assert_eq!(result.risk_assessment.risk_label, row.risk_label);
            assert_eq!(result.risk_assessment.confidence_score, row.confidence_score);
            assert_eq!(result.clinical_recommendation.dose_adjustment, row.dose_adjustment);
            assert_eq!(result.clinical_recommendation.monitoring, row.monitoring);
        }
    }

    fn find_diplotype(gene: &str, phenotype: Phenotype) -> Option<&'static str> {
        crate::engine::data::PHENOTYPES
            .iter()
            .find(|(g, _)| *g == gene)?
            .1
            .iter()
            .find(|(_, p)| *p == phenotype)
            .map(|(d, _)| *d)
    }

    #[test]
    fn evaluate_is_idempotent() {
        let eval = evaluator();
        let a = eval.evaluate("P1", "CYP2D6", "*4/*4", "Codeine");
        let b = eval.evaluate("P1", "CYP2D6", "*4/*4", "Codeine");
        assert_eq!(a, b);
    }

    #[test]
    fn profile_echoes_raw_input() {
        let result = evaluator().evaluate("P8", "cyp2c19", "*2 / *2", "clopidogrel");
        assert_eq!(result.pharmacogenomic_profile.primary_gene, "cyp2c19");
        assert_eq!(result.pharmacogenomic_profile.diplotype, "*2 / *2");
        assert_eq!(result.drug, "clopidogrel");
        assert_eq!(result.risk_assessment.risk_label, RiskLabel::Ineffective);
    }

    #[test]
    fn split_drug_list_flattens_commas() {
        let drugs = vec!["Warfarin, Clopidogrel".to_string(), " ".to_string(), "Codeine".to_string()];
        assert_eq!(split_drug_list(&drugs), vec!["Warfarin", "Clopidogrel", "Codeine"]);
    }

    #[test]
    fn panel_pairs_each_drug_with_its_gene() {
        let request = PanelRequest {
            patient_id: "P9".into(),
            genotypes: vec![
                Genotype { gene: "CYP2C9".into(), diplotype: "*3/*3".into() },
                Genotype { gene: "CYP2C19".into(), diplotype: "*1/*2".into() },
            ],
            drugs: vec!["Clopidogrel, Warfarin".into(), "Aspirin".into()],
        };

        let results = evaluator().evaluate_panel(&request);
        assert_eq!(results.len(), 3);

        assert_eq!(results[0].pharmacogenomic_profile.primary_gene, "CYP2C19");
        assert_eq!(results[0].risk_assessment.severity, Severity::Moderate);

        assert_eq!(results[1].pharmacogenomic_profile.primary_gene, "CYP2C9");
        assert_eq!(results[1].risk_assessment.risk_label, RiskLabel::AdjustDosage);

        // No guidance for Aspirin: first genotype, fallback verdict.
        assert_eq!(results[2].pharmacogenomic_profile.primary_gene, "CYP2C9");
        assert_eq!(results[2].risk_assessment, RiskAssessment::fallback());
    }

    #[test]
    fn empty_panel_evaluates_against_unknown() {
        let request = PanelRequest {
            patient_id: "P10".into(),
            genotypes: vec![],
            drugs: vec!["Codeine".into()],
        };
        let results = evaluator().evaluate_panel(&request);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].pharmacogenomic_profile.phenotype, Phenotype::Indeterminate);
        assert_eq!(results[0].risk_assessment.risk_label, RiskLabel::Unknown);
    }
}
