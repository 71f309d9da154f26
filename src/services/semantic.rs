// Semantic model loading. The overlay is best-effort: a connection without
// a model path, a missing file or a malformed document all resolve to
// "no model" rather than an error.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::middleware::AppError;
use crate::models::{BusinessMetric, GlossaryTerm, SemanticModel, SemanticTable};
use crate::storage::ConnectionRegistry;

pub struct SemanticOverlay {
    registry: Arc<ConnectionRegistry>,
}

impl SemanticOverlay {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Load the semantic model for a connection, if it has one. An unknown
    /// connection resolves to no model as well.
    pub async fn model(&self, connection_id: &str) -> Result<Option<SemanticModel>, AppError> {
        let Some(descriptor) = self.registry.get(connection_id).await else {
            debug!(connection_id, "no such connection, no semantic model");
            return Ok(None);
        };

        let Some(path) = descriptor.semantic_model_path else {
            debug!(connection_id, "no semantic model path configured");
            return Ok(None);
        };

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(connection_id, %path, "semantic model unreadable: {}", e);
                return Ok(None);
            }
        };

        match serde_yaml::from_str::<SemanticModel>(&contents) {
            Ok(model) => Ok(Some(model)),
            Err(e) => {
                warn!(connection_id, %path, "semantic model failed to parse: {}", e);
                Ok(None)
            }
        }
    }

    /// Semantic description of one table, matched case-insensitively when
    /// no exact key exists.
    pub async fn table(
        &self,
        connection_id: &str,
        table_name: &str,
    ) -> Result<Option<SemanticTable>, AppError> {
        let Some(model) = self.model(connection_id).await? else {
            return Ok(None);
        };
        if let Some(table) = model.tables.get(table_name) {
            return Ok(Some(table.clone()));
        }
        Ok(model
            .tables
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table_name))
            .map(|(_, table)| table.clone()))
    }

    pub async fn glossary(
        &self,
        connection_id: &str,
    ) -> Result<HashMap<String, GlossaryTerm>, AppError> {
        Ok(self
            .model(connection_id)
            .await?
            .map(|m| m.business_glossary)
            .unwrap_or_default())
    }

    /// Business metrics, optionally filtered to one business area
    /// (case-insensitive).
    pub async fn metrics(
        &self,
        connection_id: &str,
        business_area: Option<&str>,
    ) -> Result<Vec<BusinessMetric>, AppError> {
        let metrics = self
            .model(connection_id)
            .await?
            .map(|m| m.business_metrics)
            .unwrap_or_default();

        Ok(match business_area {
            Some(area) => metrics
                .into_iter()
                .filter(|m| {
                    m.business_area
                        .as_deref()
                        .is_some_and(|a| a.eq_ignore_ascii_case(area))
                })
                .collect(),
            None => metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionDescriptor, EngineKind};
    use tempfile::TempDir;

    const MODEL_YAML: &str = r#"
connectionId: sales
databaseName: sales
description: Sales reporting database
tables:
  Orders:
    displayName: Orders
    description: One row per customer order
    businessArea: Sales
businessMetrics:
  - name: revenue
    displayName: Revenue
    businessArea: Sales
    formula: SUM(amount)
  - name: headcount
    displayName: Headcount
    businessArea: HR
businessGlossary:
  churn:
    term: Churn
    definition: Customers lost in a period
"#;

    async fn overlay(dir: &TempDir, model_path: Option<String>) -> SemanticOverlay {
        let registry = Arc::new(ConnectionRegistry::load(dir.path().join("connections.json")).await);
        let mut descriptor = ConnectionDescriptor::new(
            "sales".to_string(),
            EngineKind::Sqlite,
            "sqlite::memory:".to_string(),
        );
        descriptor.semantic_model_path = model_path;
        registry.add(descriptor).await.unwrap();
        SemanticOverlay::new(registry)
    }

    #[tokio::test]
    async fn model_parses_camel_case_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.yaml");
        tokio::fs::write(&path, MODEL_YAML).await.unwrap();
        let overlay = overlay(&dir, Some(path.display().to_string())).await;

        let model = overlay.model("sales").await.unwrap().unwrap();
        assert_eq!(model.connection_id, "sales");
        assert_eq!(model.tables.len(), 1);
        assert_eq!(model.business_metrics.len(), 2);
        assert_eq!(model.business_glossary["churn"].term, "Churn");
    }

    #[tokio::test]
    async fn absent_path_and_missing_file_resolve_to_none() {
        let no_path_dir = TempDir::new().unwrap();
        let no_path = overlay(&no_path_dir, None).await;
        assert!(no_path.model("sales").await.unwrap().is_none());

        let bad_path_dir = TempDir::new().unwrap();
        let bad_path =
            overlay(&bad_path_dir, Some("/nonexistent/model.yaml".to_string())).await;
        assert!(bad_path.model("sales").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_yaml_resolves_to_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        tokio::fs::write(&path, "tables: [not: {a map").await.unwrap();
        let overlay = overlay(&dir, Some(path.display().to_string())).await;
        assert!(overlay.model("sales").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn table_lookup_falls_back_to_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.yaml");
        tokio::fs::write(&path, MODEL_YAML).await.unwrap();
        let overlay = overlay(&dir, Some(path.display().to_string())).await;

        let table = overlay.table("sales", "ORDERS").await.unwrap().unwrap();
        assert_eq!(table.display_name, "Orders");
        assert!(overlay.table("sales", "invoices").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn metrics_filter_by_business_area() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.yaml");
        tokio::fs::write(&path, MODEL_YAML).await.unwrap();
        let overlay = overlay(&dir, Some(path.display().to_string())).await;

        let all = overlay.metrics("sales", None).await.unwrap();
        assert_eq!(all.len(), 2);
        let sales = overlay.metrics("sales", Some("sales")).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].name, "revenue");
    }

    #[tokio::test]
    async fn unknown_connection_has_no_model() {
        let dir = TempDir::new().unwrap();
        let overlay = overlay(&dir, None).await;
        assert!(overlay.model("ghost").await.unwrap().is_none());
        assert!(overlay.glossary("ghost").await.unwrap().is_empty());
        assert!(overlay.metrics("ghost", None).await.unwrap().is_empty());
    }
}
