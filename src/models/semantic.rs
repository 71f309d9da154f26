use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Human-authored business semantics layered over a connection's schema.
/// Loaded on demand from a YAML document with camelCase keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SemanticModel {
    pub connection_id: String,
    pub database_name: String,
    pub description: Option<String>,
    pub tables: HashMap<String, SemanticTable>,
    pub business_metrics: Vec<BusinessMetric>,
    pub business_glossary: HashMap<String, GlossaryTerm>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SemanticTable {
    pub display_name: String,
    pub description: Option<String>,
    pub business_area: Option<String>,
    pub update_frequency: Option<String>,
    pub columns: HashMap<String, SemanticColumn>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SemanticColumn {
    pub display_name: String,
    pub description: Option<String>,
    pub business_definition: Option<String>,
    pub data_type: Option<String>,
    pub format: Option<String>,
    pub example: Option<String>,
    pub is_primary_key: bool,
    pub foreign_key: Option<ForeignKeyReference>,
    pub allowed_values: Option<Vec<String>>,
    pub contains_pii: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForeignKeyReference {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessMetric {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub business_area: Option<String>,
    pub formula: Option<String>,
    pub sql_definition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    pub business_area: Option<String>,
}
