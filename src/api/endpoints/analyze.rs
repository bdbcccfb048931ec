//! Evaluation endpoints.
//!
//! - `POST /api/v1/analyze`: deterministic verdict only
//! - `POST /api/v1/analyze-with-explanation`: verdict plus generated explanation
//! - `POST /api/v1/analyze-panel`: several drugs against a genotype panel

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::engine::split_drug_list;
use crate::models::{AnalysisResult, AnalyzeRequest, ExplainedAnalysisResult, PanelRequest};

pub async fn analyze(
    State(ctx): State<ApiContext>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(request) = body?;
    validate(&request)?;

    let result = ctx.evaluator().evaluate_request(&request);
    tracing::info!(
        patient_id = %request.patient_id,
        drug = %request.drug,
        risk = %result.risk_assessment.risk_label,
        "Analysis complete"
    );
    Ok(Json(result))
}

pub async fn analyze_with_explanation(
    State(ctx): State<ApiContext>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ExplainedAnalysisResult>, ApiError> {
    let Json(request) = body?;
    validate(&request)?;

    let result = match ctx.explain_deadline {
        Some(deadline) => ctx.orchestrator.explain_within(deadline, &request).await?,
        None => ctx.orchestrator.explain_request(&request).await,
    };
    tracing::info!(
        patient_id = %request.patient_id,
        drug = %request.drug,
        risk = %result.analysis.risk_assessment.risk_label,
        "Explained analysis complete"
    );
    Ok(Json(result))
}

pub async fn analyze_panel(
    State(ctx): State<ApiContext>,
    body: Result<Json<PanelRequest>, JsonRejection>,
) -> Result<Json<Vec<AnalysisResult>>, ApiError> {
    let Json(request) = body?;
    require("patient_id", &request.patient_id)?;
    if split_drug_list(&request.drugs).is_empty() {
        return Err(ApiError::BadRequest("drugs is required".into()));
    }
    for genotype in &request.genotypes {
        require("genotypes.gene", &genotype.gene)?;
        require("genotypes.diplotype", &genotype.diplotype)?;
    }

    Ok(Json(ctx.evaluator().evaluate_panel(&request)))
}

fn validate(request: &AnalyzeRequest) -> Result<(), ApiError> {
    require("patient_id", &request.patient_id)?;
    require("gene", &request.gene)?;
    require("diplotype", &request.diplotype)?;
    require("drug", &request.drug)
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}
