use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;
use crate::models::{QueryRequest, QueryResult, SampleParams};
use crate::services::QueryExecutor;
use crate::validation::QuerySafetyValidator;

/// Execute a read statement against a connection
pub async fn execute_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResult>, AppError> {
    if payload.query.trim().is_empty() {
        return Err(AppError::Validation("Query cannot be empty".to_string()));
    }

    let validator = QuerySafetyValidator::new(state.registry.clone());
    if !validator.is_safe(&id, &payload.query).await {
        return Err(AppError::Validation(
            "Query was rejected: only read statements are allowed on this connection".to_string(),
        ));
    }

    let max_rows = payload
        .max_rows
        .unwrap_or(state.config.query.default_max_rows);
    let executor = QueryExecutor::new(
        state.registry.clone(),
        Duration::from_secs(state.config.query.statement_timeout_secs),
    );
    tracing::info!(connection_id = %id, max_rows, "executing query");

    Ok(Json(executor.execute(&id, &payload.query, max_rows).await?))
}

/// Return sample rows from one table
pub async fn sample_table(
    State(state): State<AppState>,
    Path((id, table_name)): Path<(String, String)>,
    Query(params): Query<SampleParams>,
) -> Result<Json<QueryResult>, AppError> {
    let max_rows = params
        .max_rows
        .unwrap_or(state.config.query.default_max_rows);
    let executor = QueryExecutor::new(
        state.registry.clone(),
        Duration::from_secs(state.config.query.statement_timeout_secs),
    );

    Ok(Json(
        executor
            .sample(&id, &table_name, params.schema.as_deref(), max_rows)
            .await?,
    ))
}
