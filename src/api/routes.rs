use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::connection::AppState;
use crate::api::handlers::{connection, metadata, query, semantic};
use crate::config::Config;
use crate::storage::ConnectionRegistry;

/// Create router with application state
pub fn create_router_with_state(registry: Arc<ConnectionRegistry>, config: Config) -> Router {
    let state = AppState { registry, config };

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/connections",
            get(connection::list_connections).post(connection::create_connection),
        )
        .route(
            "/api/connections/{id}",
            get(connection::get_connection)
                .put(connection::update_connection)
                .delete(connection::delete_connection),
        )
        .route(
            "/api/connections/{id}/metadata",
            get(metadata::get_metadata),
        )
        .route(
            "/api/connections/{id}/metadata/tables",
            get(metadata::list_tables),
        )
        .route(
            "/api/connections/{id}/metadata/tables/{table}",
            get(metadata::get_table),
        )
        .route(
            "/api/connections/{id}/metadata/views",
            get(metadata::list_views),
        )
        .route(
            "/api/connections/{id}/metadata/views/{view}",
            get(metadata::get_view),
        )
        .route(
            "/api/connections/{id}/metadata/procedures",
            get(metadata::list_procedures),
        )
        .route(
            "/api/connections/{id}/metadata/functions",
            get(metadata::list_functions),
        )
        .route("/api/connections/{id}/query", post(query::execute_query))
        .route(
            "/api/connections/{id}/tables/{table}/sample",
            get(query::sample_table),
        )
        .route(
            "/api/connections/{id}/semantic-model",
            get(semantic::get_semantic_model),
        )
        .route(
            "/api/connections/{id}/semantic-model/tables/{table}",
            get(semantic::get_semantic_table),
        )
        .route(
            "/api/connections/{id}/semantic-model/glossary",
            get(semantic::get_glossary),
        )
        .route(
            "/api/connections/{id}/semantic-model/metrics",
            get(semantic::get_metrics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
