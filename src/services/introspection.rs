// Schema introspection built on the per-engine script bundles plus the
// catalog detail statements.
use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::api::middleware::AppError;
use crate::models::{
    ColumnMetadata, ConnectionDescriptor, DatabaseMetadata, EngineKind, ForeignKeyColumnPair,
    ForeignKeyMetadata, FunctionMetadata, IndexMetadata, StoredProcedureMetadata, TableMetadata,
    ViewMetadata,
};
use crate::services::database::{DatabaseSession, DriverFactory, SqlRow};
use crate::services::scripts::{extract_section, metadata_script};
use crate::storage::ConnectionRegistry;

pub struct MetadataIntrospector {
    registry: Arc<ConnectionRegistry>,
}

impl MetadataIntrospector {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Full schema snapshot: listings, database name and server version.
    pub async fn database_metadata(
        &self,
        connection_id: &str,
    ) -> Result<DatabaseMetadata, AppError> {
        let (descriptor, mut session) = self.open_session(connection_id).await?;
        let kind = descriptor.database_type;

        let database_version = match session.query(kind.version_sql()).await {
            Ok(rows) => rows.first().and_then(|r| r.text("database_version")),
            Err(e) => {
                warn!(connection_id, "version query failed: {}", e);
                None
            }
        };

        Ok(DatabaseMetadata {
            database_name: session.database_name().to_string(),
            database_version,
            tables: Self::collect_tables(&descriptor, session.as_mut()).await?,
            views: Self::collect_views(&descriptor, session.as_mut()).await?,
            stored_procedures: Self::collect_procedures(&descriptor, session.as_mut()).await?,
            functions: Self::collect_functions(&descriptor, session.as_mut()).await?,
            extracted_at: Some(Utc::now()),
        })
    }

    pub async fn tables(&self, connection_id: &str) -> Result<Vec<TableMetadata>, AppError> {
        let (descriptor, mut session) = self.open_session(connection_id).await?;
        Self::collect_tables(&descriptor, session.as_mut()).await
    }

    pub async fn table(
        &self,
        connection_id: &str,
        table_name: &str,
    ) -> Result<Option<TableMetadata>, AppError> {
        Ok(self
            .tables(connection_id)
            .await?
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(table_name)))
    }

    pub async fn views(&self, connection_id: &str) -> Result<Vec<ViewMetadata>, AppError> {
        let (descriptor, mut session) = self.open_session(connection_id).await?;
        Self::collect_views(&descriptor, session.as_mut()).await
    }

    pub async fn view(
        &self,
        connection_id: &str,
        view_name: &str,
    ) -> Result<Option<ViewMetadata>, AppError> {
        Ok(self
            .views(connection_id)
            .await?
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(view_name)))
    }

    pub async fn stored_procedures(
        &self,
        connection_id: &str,
    ) -> Result<Vec<StoredProcedureMetadata>, AppError> {
        let (descriptor, mut session) = self.open_session(connection_id).await?;
        Self::collect_procedures(&descriptor, session.as_mut()).await
    }

    pub async fn functions(
        &self,
        connection_id: &str,
    ) -> Result<Vec<FunctionMetadata>, AppError> {
        let (descriptor, mut session) = self.open_session(connection_id).await?;
        Self::collect_functions(&descriptor, session.as_mut()).await
    }

    async fn open_session(
        &self,
        connection_id: &str,
    ) -> Result<(ConnectionDescriptor, Box<dyn DatabaseSession>), AppError> {
        let descriptor = self.registry.get(connection_id).await.ok_or_else(|| {
            AppError::NotFound(format!("Connection '{}' not found", connection_id))
        })?;
        let session = DriverFactory::build(&descriptor)?.open().await?;
        Ok((descriptor, session))
    }

    fn section_sql(kind: EngineKind, section: &str) -> Result<String, AppError> {
        extract_section(metadata_script(kind), section).ok_or_else(|| {
            AppError::Introspection(format!(
                "Metadata script for {} has no '{}' section",
                kind.as_str(),
                section
            ))
        })
    }

    async fn collect_tables(
        descriptor: &ConnectionDescriptor,
        session: &mut dyn DatabaseSession,
    ) -> Result<Vec<TableMetadata>, AppError> {
        let kind = descriptor.database_type;
        let sql = Self::section_sql(kind, "Tables Metadata")?;
        let rows = session
            .query(&sql)
            .await
            .map_err(|e| AppError::Introspection(format!("Table listing failed: {}", e)))?;

        let mut tables = Vec::new();
        for row in rows {
            let Some(name) = row.text("table_name") else {
                continue;
            };
            let mut table = TableMetadata {
                name,
                schema: row
                    .text("table_schema")
                    .or_else(|| descriptor.schema_name.clone()),
                description: row.text("table_description"),
                row_count: row.integer("row_count"),
                size_in_bytes: row.integer("size_in_bytes"),
                ..Default::default()
            };
            // One broken table must not sink the whole listing; it comes
            // back with empty detail lists instead.
            if let Err(e) = Self::populate_details(kind, session, &mut table).await {
                warn!(table = %table.name, "table detail extraction failed: {}", e);
            }
            tables.push(table);
        }
        Ok(tables)
    }

    async fn populate_details(
        kind: EngineKind,
        session: &mut dyn DatabaseSession,
        table: &mut TableMetadata,
    ) -> Result<(), AppError> {
        let schema = table.schema.clone();
        let schema = schema.as_deref();

        let column_rows = session.query(&kind.columns_sql(&table.name, schema)).await?;
        table.columns = column_rows.iter().map(column_from_row).collect();

        let pk_rows = session
            .query(&kind.primary_keys_sql(&table.name, schema))
            .await?;
        table.primary_key_columns = pk_rows
            .iter()
            .filter_map(|r| r.text("column_name"))
            .collect();

        let fk_rows = session
            .query(&kind.foreign_keys_sql(&table.name, schema))
            .await?;
        table.foreign_keys = group_foreign_keys(&fk_rows);

        let index_rows = session.query(&kind.indexes_sql(&table.name, schema)).await?;
        table.indexes = group_indexes(&index_rows);

        let fk_columns: HashSet<&str> = table
            .foreign_keys
            .iter()
            .flat_map(|fk| fk.column_pairs.iter().map(|p| p.column_name.as_str()))
            .collect();
        for column in &mut table.columns {
            column.is_primary_key = table.primary_key_columns.contains(&column.name);
            column.is_foreign_key = fk_columns.contains(column.name.as_str());
        }
        Ok(())
    }

    async fn collect_views(
        descriptor: &ConnectionDescriptor,
        session: &mut dyn DatabaseSession,
    ) -> Result<Vec<ViewMetadata>, AppError> {
        let sql = Self::section_sql(descriptor.database_type, "Views")?;
        let rows = session
            .query(&sql)
            .await
            .map_err(|e| AppError::Introspection(format!("View listing failed: {}", e)))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(ViewMetadata {
                    name: row.text("view_name")?,
                    schema: row
                        .text("view_schema")
                        .or_else(|| descriptor.schema_name.clone()),
                    description: row.text("view_description"),
                    definition: row.text("view_definition"),
                    columns: Vec::new(),
                })
            })
            .collect())
    }

    async fn collect_procedures(
        descriptor: &ConnectionDescriptor,
        session: &mut dyn DatabaseSession,
    ) -> Result<Vec<StoredProcedureMetadata>, AppError> {
        let sql = Self::section_sql(descriptor.database_type, "Stored Procedures")?;
        let rows = session
            .query(&sql)
            .await
            .map_err(|e| AppError::Introspection(format!("Procedure listing failed: {}", e)))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(StoredProcedureMetadata {
                    name: row.text("procedure_name")?,
                    schema: row
                        .text("procedure_schema")
                        .or_else(|| descriptor.schema_name.clone()),
                    description: row.text("procedure_description"),
                    definition: row.text("procedure_definition"),
                })
            })
            .collect())
    }

    async fn collect_functions(
        descriptor: &ConnectionDescriptor,
        session: &mut dyn DatabaseSession,
    ) -> Result<Vec<FunctionMetadata>, AppError> {
        let sql = Self::section_sql(descriptor.database_type, "Functions")?;
        let rows = session
            .query(&sql)
            .await
            .map_err(|e| AppError::Introspection(format!("Function listing failed: {}", e)))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(FunctionMetadata {
                    name: row.text("function_name")?,
                    schema: row
                        .text("function_schema")
                        .or_else(|| descriptor.schema_name.clone()),
                    description: row.text("function_description"),
                    definition: row.text("function_definition"),
                    return_type: row.text("return_type"),
                })
            })
            .collect())
    }
}

fn column_from_row(row: &SqlRow) -> ColumnMetadata {
    ColumnMetadata {
        name: row.text("column_name").unwrap_or_default(),
        data_type: row.text("data_type").unwrap_or_default(),
        is_nullable: row.flag("is_nullable"),
        ordinal_position: row.integer("ordinal_position"),
        default_value: row.text("default_value"),
        description: row.text("description"),
        is_primary_key: false,
        is_foreign_key: false,
        character_maximum_length: row.integer("character_maximum_length"),
        numeric_precision: row.integer("numeric_precision"),
        numeric_scale: row.integer("numeric_scale"),
    }
}

/// Collapse one-row-per-column constraint listings into one entry per
/// constraint name, preserving first-seen order.
pub(crate) fn group_foreign_keys(rows: &[SqlRow]) -> Vec<ForeignKeyMetadata> {
    let mut grouped: Vec<ForeignKeyMetadata> = Vec::new();
    for row in rows {
        let Some(name) = row.text("constraint_name") else {
            continue;
        };
        let pair = ForeignKeyColumnPair {
            column_name: row.text("column_name").unwrap_or_default(),
            referenced_column_name: row.text("referenced_column_name").unwrap_or_default(),
        };
        if let Some(existing) = grouped.iter_mut().find(|fk| fk.name == name) {
            existing.column_pairs.push(pair);
        } else {
            grouped.push(ForeignKeyMetadata {
                name,
                referenced_table_name: row.text("referenced_table_name").unwrap_or_default(),
                referenced_table_schema: row.text("referenced_table_schema"),
                column_pairs: vec![pair],
            });
        }
    }
    grouped
}

/// Collapse one-row-per-key-column index listings into one entry per index
/// name; rows arrive in key-ordinal order.
pub(crate) fn group_indexes(rows: &[SqlRow]) -> Vec<IndexMetadata> {
    let mut grouped: Vec<IndexMetadata> = Vec::new();
    for row in rows {
        let Some(name) = row.text("index_name") else {
            continue;
        };
        let Some(column) = row.text("column_name") else {
            continue;
        };
        if let Some(existing) = grouped.iter_mut().find(|ix| ix.name == name) {
            existing.column_names.push(column);
        } else {
            grouped.push(IndexMetadata {
                name,
                is_unique: row.flag("is_unique"),
                column_names: vec![column],
            });
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn fk_row(constraint: &str, column: &str, ref_table: &str, ref_column: &str) -> SqlRow {
        SqlRow::new(
            Arc::new(vec![
                "constraint_name".to_string(),
                "column_name".to_string(),
                "referenced_table_name".to_string(),
                "referenced_column_name".to_string(),
            ]),
            vec![
                json!(constraint),
                json!(column),
                json!(ref_table),
                json!(ref_column),
            ],
        )
    }

    #[test]
    fn foreign_keys_group_by_constraint_name() {
        let rows = vec![
            fk_row("fk_a", "order_id", "orders", "id"),
            fk_row("fk_a", "order_line", "orders", "line"),
            fk_row("fk_b", "customer_id", "customers", "id"),
        ];
        let grouped = group_foreign_keys(&rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].name, "fk_a");
        assert_eq!(grouped[0].column_pairs.len(), 2);
        assert_eq!(grouped[0].referenced_table_name, "orders");
        assert_eq!(grouped[1].name, "fk_b");
        assert_eq!(grouped[1].column_pairs.len(), 1);
    }

    #[test]
    fn indexes_group_by_name_keeping_column_order() {
        let columns = Arc::new(vec![
            "index_name".to_string(),
            "is_unique".to_string(),
            "column_name".to_string(),
        ]);
        let rows = vec![
            SqlRow::new(columns.clone(), vec![json!("ix_ab"), json!(1), json!("a")]),
            SqlRow::new(columns.clone(), vec![json!("ix_ab"), json!(1), json!("b")]),
            SqlRow::new(columns.clone(), vec![json!("ix_c"), json!(0), json!("c")]),
        ];
        let grouped = group_indexes(&rows);
        assert_eq!(grouped.len(), 2);
        assert!(grouped[0].is_unique);
        assert_eq!(grouped[0].column_names, vec!["a", "b"]);
        assert!(!grouped[1].is_unique);
    }

    async fn library_registry(dir: &TempDir) -> Arc<ConnectionRegistry> {
        let db_path = dir.path().join("library.db");
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE books (
                 id INTEGER PRIMARY KEY,
                 author_id INTEGER NOT NULL REFERENCES authors(id),
                 title TEXT NOT NULL,
                 year INTEGER
             );
             CREATE INDEX idx_books_author ON books(author_id);
             CREATE UNIQUE INDEX idx_books_title ON books(title);
             CREATE VIEW recent_books AS SELECT title FROM books WHERE year >= 2000;",
        )
        .unwrap();
        drop(conn);

        let registry = Arc::new(ConnectionRegistry::load(dir.path().join("connections.json")).await);
        registry
            .add(ConnectionDescriptor::new(
                "library".to_string(),
                EngineKind::Sqlite,
                format!("sqlite:{}", db_path.display()),
            ))
            .await
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn sqlite_tables_carry_columns_keys_and_indexes() {
        let dir = TempDir::new().unwrap();
        let introspector = MetadataIntrospector::new(library_registry(&dir).await);

        let tables = introspector.tables("library").await.unwrap();
        assert_eq!(tables.len(), 2);

        let books = tables.iter().find(|t| t.name == "books").unwrap();
        assert_eq!(books.columns.len(), 4);
        assert_eq!(books.primary_key_columns, vec!["id"]);
        assert_eq!(books.foreign_keys.len(), 1);
        assert_eq!(books.foreign_keys[0].referenced_table_name, "authors");
        assert_eq!(books.indexes.len(), 2);

        let id = books.columns.iter().find(|c| c.name == "id").unwrap();
        assert!(id.is_primary_key);
        let author_id = books.columns.iter().find(|c| c.name == "author_id").unwrap();
        assert!(author_id.is_foreign_key);
    }

    #[tokio::test]
    async fn view_lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let introspector = MetadataIntrospector::new(library_registry(&dir).await);

        let view = introspector
            .view("library", "Recent_Books")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.name, "recent_books");
        assert!(view.definition.is_some());

        let missing = introspector.view("library", "nope").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn unknown_connection_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ConnectionRegistry::load(dir.path().join("c.json")).await);
        let introspector = MetadataIntrospector::new(registry);
        assert!(matches!(
            introspector.tables("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn database_metadata_aggregates_listings() {
        let dir = TempDir::new().unwrap();
        let introspector = MetadataIntrospector::new(library_registry(&dir).await);

        let metadata = introspector.database_metadata("library").await.unwrap();
        assert_eq!(metadata.database_name, "library");
        assert!(metadata.database_version.is_some());
        assert_eq!(metadata.tables.len(), 2);
        assert_eq!(metadata.views.len(), 1);
        assert!(metadata.stored_procedures.is_empty());
        assert!(metadata.functions.is_empty());
        assert!(metadata.extracted_at.is_some());
    }
}
