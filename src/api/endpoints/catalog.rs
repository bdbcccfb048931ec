use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::engine::CatalogDrug;

#[derive(Serialize)]
pub struct CatalogResponse {
    pub drugs: Vec<CatalogDrug>,
    pub genes: Vec<String>,
}

/// `GET /api/v1/catalog`: drugs with guidance and the genes the phenotype
/// table covers.
pub async fn list(State(ctx): State<ApiContext>) -> Json<CatalogResponse> {
    let evaluator = ctx.evaluator();
    Json(CatalogResponse {
        drugs: evaluator.catalog().drugs(),
        genes: evaluator
            .phenotypes()
            .genes()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
