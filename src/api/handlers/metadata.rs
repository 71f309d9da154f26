use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;
use crate::models::{
    DatabaseMetadata, FunctionMetadata, StoredProcedureMetadata, TableMetadata, ViewMetadata,
};
use crate::services::MetadataIntrospector;

/// Full schema snapshot for a connection
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DatabaseMetadata>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    Ok(Json(introspector.database_metadata(&id).await?))
}

/// List tables with columns, keys and indexes
pub async fn list_tables(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TableMetadata>>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    Ok(Json(introspector.tables(&id).await?))
}

/// Fetch one table by name (case-insensitive)
pub async fn get_table(
    State(state): State<AppState>,
    Path((id, table_name)): Path<(String, String)>,
) -> Result<Json<TableMetadata>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    let table = introspector
        .table(&id, &table_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Table '{}' not found", table_name)))?;
    Ok(Json(table))
}

/// List views
pub async fn list_views(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ViewMetadata>>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    Ok(Json(introspector.views(&id).await?))
}

/// Fetch one view by name (case-insensitive)
pub async fn get_view(
    State(state): State<AppState>,
    Path((id, view_name)): Path<(String, String)>,
) -> Result<Json<ViewMetadata>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    let view = introspector
        .view(&id, &view_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("View '{}' not found", view_name)))?;
    Ok(Json(view))
}

/// List stored procedures
pub async fn list_procedures(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StoredProcedureMetadata>>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    Ok(Json(introspector.stored_procedures(&id).await?))
}

/// List functions
pub async fn list_functions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FunctionMetadata>>, AppError> {
    let introspector = MetadataIntrospector::new(state.registry.clone());
    Ok(Json(introspector.functions(&id).await?))
}
