use std::time::Duration;

use super::generator::{ExplanationGenerator, LlmGenerate};
use super::prompt::{build_retrieval_query, ExplanationRequest};
use super::retrieval::{ContextSource, DEFAULT_TOP_K};
use super::ExplainError;
use crate::engine::RiskEvaluator;
use crate::models::analysis::AnalyzeRequest;
use crate::models::explanation::ExplainedAnalysisResult;

/// Explained evaluation pipeline.
///
/// Coordinates: evaluate → query → retrieve → generate → attach.
/// The verdict is computed first and copied into the result unchanged;
/// generator output only ever fills the explanation.
pub struct ExplanationOrchestrator<R: ContextSource, G: LlmGenerate> {
    evaluator: RiskEvaluator,
    retriever: R,
    generator: ExplanationGenerator<G>,
    top_k: usize,
}

impl<R: ContextSource, G: LlmGenerate> ExplanationOrchestrator<R, G> {
    pub fn new(evaluator: RiskEvaluator, retriever: R, llm: G) -> Self {
        Self {
            evaluator,
            retriever,
            generator: ExplanationGenerator::new(llm),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn evaluator(&self) -> &RiskEvaluator {
        &self.evaluator
    }

    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    pub fn generator(&self) -> &ExplanationGenerator<G> {
        &self.generator
    }

    pub async fn explain(
        &self,
        patient_id: &str,
        gene: &str,
        diplotype: &str,
        drug: &str,
    ) -> ExplainedAnalysisResult {
        let analysis = self.evaluator.evaluate(patient_id, gene, diplotype, drug);
        let phenotype = analysis.pharmacogenomic_profile.phenotype;

        let query = build_retrieval_query(drug, gene, phenotype);
        let context = self.retriever.retrieve_context(&query, self.top_k).await;
        tracing::debug!(%query, passages = context.passages.len(), "Context retrieved");

        let rule_summary = analysis.clinical_recommendation.summary();
        let request = ExplanationRequest {
            drug,
            gene,
            phenotype,
            risk_label: analysis.risk_assessment.risk_label,
            rule_summary: &rule_summary,
        };
        let explanation = self.generator.generate(&request, &context).await;

        ExplainedAnalysisResult {
            analysis,
            llm_generated_explanation: explanation,
        }
    }

    pub async fn explain_request(&self, request: &AnalyzeRequest) -> ExplainedAnalysisResult {
        self.explain(
            &request.patient_id,
            &request.gene,
            &request.diplotype,
            &request.drug,
        )
        .await
    }

    /// `explain` bounded by `deadline`. In-flight backend calls are dropped
    /// when it passes and no partial result is returned.
    pub async fn explain_within(
        &self,
        deadline: Duration,
        request: &AnalyzeRequest,
    ) -> Result<ExplainedAnalysisResult, ExplainError> {
        tokio::time::timeout(deadline, self.explain_request(request))
            .await
            .map_err(|_| {
                tracing::warn!(
                    patient_id = %request.patient_id,
                    drug = %request.drug,
                    ?deadline,
                    "Explanation deadline exceeded"
                );
                ExplainError::DeadlineExceeded(deadline)
            })
    }
}
