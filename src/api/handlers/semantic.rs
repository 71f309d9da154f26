use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;
use crate::models::{BusinessMetric, GlossaryTerm, SemanticModel, SemanticTable};
use crate::services::SemanticOverlay;

#[derive(Debug, Deserialize)]
pub struct MetricParams {
    #[serde(default)]
    pub business_area: Option<String>,
}

/// Full semantic model for a connection
pub async fn get_semantic_model(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SemanticModel>, AppError> {
    let overlay = SemanticOverlay::new(state.registry.clone());
    let model = overlay.model(&id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Connection '{}' has no semantic model", id))
    })?;
    Ok(Json(model))
}

/// Semantic description of one table
pub async fn get_semantic_table(
    State(state): State<AppState>,
    Path((id, table_name)): Path<(String, String)>,
) -> Result<Json<SemanticTable>, AppError> {
    let overlay = SemanticOverlay::new(state.registry.clone());
    let table = overlay.table(&id, &table_name).await?.ok_or_else(|| {
        AppError::NotFound(format!(
            "No semantic description for table '{}'",
            table_name
        ))
    })?;
    Ok(Json(table))
}

/// Business glossary; empty when no model is configured
pub async fn get_glossary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HashMap<String, GlossaryTerm>>, AppError> {
    let overlay = SemanticOverlay::new(state.registry.clone());
    Ok(Json(overlay.glossary(&id).await?))
}

/// Business metrics, optionally filtered by business area
pub async fn get_metrics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<MetricParams>,
) -> Result<Json<Vec<BusinessMetric>>, AppError> {
    let overlay = SemanticOverlay::new(state.registry.clone());
    Ok(Json(
        overlay
            .metrics(&id, params.business_area.as_deref())
            .await?,
    ))
}
