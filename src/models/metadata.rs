use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engine-agnostic snapshot of a database schema. Recomputed on every
/// request, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub database_name: String,
    pub database_version: Option<String>,
    pub tables: Vec<TableMetadata>,
    pub views: Vec<ViewMetadata>,
    pub stored_procedures: Vec<StoredProcedureMetadata>,
    pub functions: Vec<FunctionMetadata>,
    pub extracted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub row_count: Option<i64>,
    pub size_in_bytes: Option<i64>,
    pub columns: Vec<ColumnMetadata>,
    pub indexes: Vec<IndexMetadata>,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    pub primary_key_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub ordinal_position: Option<i64>,
    pub default_value: Option<String>,
    pub description: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub character_maximum_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
}

/// One foreign-key constraint; a single constraint may span several
/// column pairs, grouped here under the constraint name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKeyMetadata {
    pub name: String,
    pub referenced_table_name: String,
    pub referenced_table_schema: Option<String>,
    pub column_pairs: Vec<ForeignKeyColumnPair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyColumnPair {
    pub column_name: String,
    pub referenced_column_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub is_unique: bool,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewMetadata {
    pub name: String,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub definition: Option<String>,
    pub columns: Vec<ColumnMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredProcedureMetadata {
    pub name: String,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionMetadata {
    pub name: String,
    pub schema: Option<String>,
    pub description: Option<String>,
    pub definition: Option<String>,
    pub return_type: Option<String>,
}
