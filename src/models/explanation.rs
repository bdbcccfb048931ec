use serde::{Deserialize, Serialize};

use super::analysis::AnalysisResult;

/// Generated clinical explanation attached to a deterministic verdict.
///
/// Prose only. There is no risk field, so nothing produced by the
/// generation backend can flow back into the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Explanation {
    pub summary: String,
    pub biological_mechanism: String,
    pub clinical_reasoning: String,
    pub citations: String,
}

impl Explanation {
    /// Generation backend unreachable, timed out, or answered with an error status.
    pub fn backend_unavailable(error: impl Into<String>) -> Self {
        Self {
            summary: "Local AI unavailable.".into(),
            biological_mechanism: "Check if generation backend is running.".into(),
            clinical_reasoning: error.into(),
            citations: "N/A".into(),
        }
    }

    /// Backend answered but the text is not the expected four-field object.
    pub fn unparseable() -> Self {
        Self {
            summary: "AI generation failed parsing.".into(),
            biological_mechanism: "Invalid response.".into(),
            clinical_reasoning: "N/A".into(),
            citations: "N/A".into(),
        }
    }
}

/// Deterministic result plus its generated explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainedAnalysisResult {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub llm_generated_explanation: Explanation,
}
