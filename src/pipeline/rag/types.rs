use serde::Serialize;

use crate::pipeline::storage::types::ScoredPassage;

/// Prompt text when the reference index could not be initialized.
pub const RAG_NOT_INITIALIZED: &str = "RAG Engine not initialized.";
/// Prompt text when the search returned nothing.
pub const NO_GUIDELINES_FOUND: &str = "No relevant guidelines found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextStatus {
    Found,
    NoMatches,
    /// The index never became ready.
    Unavailable,
    /// The index is ready but this query failed.
    Failed(String),
}

/// Outcome of a retrieval: passages ordered most relevant first, or the
/// reason there are none.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub passages: Vec<ScoredPassage>,
    pub status: ContextStatus,
}

impl RetrievedContext {
    pub fn found(passages: Vec<ScoredPassage>) -> Self {
        let status = if passages.is_empty() {
            ContextStatus::NoMatches
        } else {
            ContextStatus::Found
        };
        Self { passages, status }
    }

    pub fn unavailable() -> Self {
        Self {
            passages: Vec::new(),
            status: ContextStatus::Unavailable,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            passages: Vec::new(),
            status: ContextStatus::Failed(error.into()),
        }
    }

    /// Text placed in the prompt: the passages separated by blank lines,
    /// or the sentinel for the status.
    pub fn prompt_text(&self) -> String {
        match &self.status {
            ContextStatus::Found => self
                .passages
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            ContextStatus::NoMatches => NO_GUIDELINES_FOUND.to_string(),
            ContextStatus::Unavailable => RAG_NOT_INITIALIZED.to_string(),
            ContextStatus::Failed(e) => format!("Error retrieving context: {e}"),
        }
    }
}

/// Lifecycle of the reference index, as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexStatus {
    NotInitialized,
    Ready {
        passages: usize,
        embedding_model: String,
    },
    Unavailable {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            id: "0".into(),
            text: text.into(),
            score,
        }
    }

    #[test]
    fn found_joins_passages_with_blank_lines() {
        let ctx = RetrievedContext::found(vec![passage("first", 0.9), passage("second", 0.5)]);
        assert_eq!(ctx.status, ContextStatus::Found);
        assert_eq!(ctx.prompt_text(), "first\n\nsecond");
    }

    #[test]
    fn empty_result_is_no_matches() {
        let ctx = RetrievedContext::found(vec![]);
        assert_eq!(ctx.status, ContextStatus::NoMatches);
        assert_eq!(ctx.prompt_text(), "No relevant guidelines found.");
    }

    #[test]
    fn sentinels_match_prompt_contract() {
        assert_eq!(RetrievedContext::unavailable().prompt_text(), "RAG Engine not initialized.");
        assert_eq!(
            RetrievedContext::failed("backend down").prompt_text(),
            "Error retrieving context: backend down"
        );
    }

    #[test]
    fn index_status_serializes_tagged() {
        let ready = serde_json::to_value(IndexStatus::Ready {
            passages: 12,
            embedding_model: "all-minilm".into(),
        })
        .unwrap();
        assert_eq!(ready["state"], "ready");
        assert_eq!(ready["passages"], 12);

        let idle = serde_json::to_value(IndexStatus::NotInitialized).unwrap();
        assert_eq!(idle["state"], "not_initialized");
    }
}
