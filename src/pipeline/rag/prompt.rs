use crate::models::enums::{Phenotype, RiskLabel};

pub const EXPLANATION_SYSTEM_PROMPT: &str = "You are a pharmacogenomics clinical assistant.
Only use provided context.
Do not hallucinate.
Do not override deterministic risk.
You must return the output as valid JSON.";

/// Verdict facts handed to the generator.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationRequest<'a> {
    pub drug: &'a str,
    pub gene: &'a str,
    pub phenotype: Phenotype,
    pub risk_label: RiskLabel,
    /// Dose adjustment followed by monitoring.
    pub rule_summary: &'a str,
}

/// Semantic search query for the guidance behind a verdict.
pub fn build_retrieval_query(drug: &str, gene: &str, phenotype: Phenotype) -> String {
    format!("CPIC guideline for {drug} and {gene} phenotype {phenotype}")
}

/// User prompt: verdict, retrieved guidelines, then the output contract.
pub fn build_explanation_prompt(request: &ExplanationRequest<'_>, context: &str) -> String {
    let ExplanationRequest {
        drug,
        gene,
        phenotype,
        risk_label,
        rule_summary,
    } = request;

    format!(
        "CONTEXT:
- Drug: {drug}
- Gene: {gene}
- Phenotype: {phenotype}
- DETERMINISTIC RISK LABEL: {risk_label}
- Clinical Rule: {rule_summary}

RETRIEVED GUIDELINES (CPIC):
{context}

INSTRUCTIONS:
1. Explain why this phenotype affects {drug} metabolism.
2. Align with the risk label: {risk_label}.
3. Use the guidelines provided.
4. Return VALID JSON with keys: \"summary\", \"biological_mechanism\", \"clinical_reasoning\", \"citations\".
"
    )
}
