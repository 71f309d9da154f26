// Row-capped query execution with a fixed statement timeout.
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::api::middleware::AppError;
use crate::models::{ConnectionDescriptor, QueryResult};
use crate::services::database::DriverFactory;
use crate::storage::ConnectionRegistry;

/// Identifier charset accepted for sampling. Dollar and hash cover Oracle
/// and SQL Server naming; a dot separates schema from table.
static SAMPLE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_$#.]+$").unwrap());

pub struct QueryExecutor {
    registry: Arc<ConnectionRegistry>,
    statement_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(registry: Arc<ConnectionRegistry>, statement_timeout: Duration) -> Self {
        Self {
            registry,
            statement_timeout,
        }
    }

    /// Run a statement against the named connection, reading at most
    /// `max_rows` rows. Reported execution time covers the statement only,
    /// not connection setup.
    pub async fn execute(
        &self,
        connection_id: &str,
        sql: &str,
        max_rows: usize,
    ) -> Result<QueryResult, AppError> {
        let descriptor = self.registry.get(connection_id).await.ok_or_else(|| {
            AppError::NotFound(format!("Connection '{}' not found", connection_id))
        })?;
        self.run(&descriptor, sql, max_rows).await
    }

    /// `SELECT *` over one table with the engine's row-limit syntax. The
    /// table and schema names are caller input, so they must pass the
    /// identifier guard before being spliced into SQL.
    pub async fn sample(
        &self,
        connection_id: &str,
        table: &str,
        schema: Option<&str>,
        max_rows: usize,
    ) -> Result<QueryResult, AppError> {
        let descriptor = self.registry.get(connection_id).await.ok_or_else(|| {
            AppError::NotFound(format!("Connection '{}' not found", connection_id))
        })?;

        let qualified = match schema {
            Some(s) => format!("{}.{}", s, table),
            None => table.to_string(),
        };
        if !SAMPLE_IDENTIFIER.is_match(&qualified) {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid table identifier",
                qualified
            )));
        }

        let sql = descriptor.database_type.limited_select(&qualified, max_rows);
        self.run(&descriptor, &sql, max_rows).await
    }

    async fn run(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
        max_rows: usize,
    ) -> Result<QueryResult, AppError> {
        let mut session = DriverFactory::build(descriptor)?.open().await?;

        let start = Instant::now();
        let capped = tokio::time::timeout(
            self.statement_timeout,
            session.query_capped(sql, max_rows),
        )
        .await
        .map_err(|_| {
            AppError::Execution(format!(
                "Query timed out after {} seconds",
                self.statement_timeout.as_secs()
            ))
        })??;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        Ok(QueryResult {
            columns: capped.columns,
            row_count: capped.rows.len(),
            rows: capped.rows,
            truncated: capped.truncated,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineKind;
    use tempfile::TempDir;

    async fn executor_with_sqlite(dir: &TempDir) -> QueryExecutor {
        let db_path = dir.path().join("shop.db");
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO items (id, name)
             VALUES (1, 'a'), (2, 'b'), (3, 'c'), (4, 'd'), (5, 'e');",
        )
        .unwrap();
        drop(conn);

        let registry = Arc::new(ConnectionRegistry::load(dir.path().join("connections.json")).await);
        registry
            .add(ConnectionDescriptor::new(
                "shop".to_string(),
                EngineKind::Sqlite,
                format!("sqlite:{}", db_path.display()),
            ))
            .await
            .unwrap();
        QueryExecutor::new(registry, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn rows_beyond_the_cap_set_truncated() {
        let dir = TempDir::new().unwrap();
        let executor = executor_with_sqlite(&dir).await;

        let result = executor
            .execute("shop", "SELECT id, name FROM items ORDER BY id", 2)
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn result_fitting_the_cap_is_not_truncated() {
        let dir = TempDir::new().unwrap();
        let executor = executor_with_sqlite(&dir).await;

        let result = executor
            .execute("shop", "SELECT id FROM items", 5)
            .await
            .unwrap();
        assert_eq!(result.row_count, 5);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn sample_limits_rows_via_engine_syntax() {
        let dir = TempDir::new().unwrap();
        let executor = executor_with_sqlite(&dir).await;

        let result = executor.sample("shop", "items", None, 3).await.unwrap();
        assert_eq!(result.row_count, 3);
    }

    #[tokio::test]
    async fn sample_rejects_hostile_identifiers() {
        let dir = TempDir::new().unwrap();
        let executor = executor_with_sqlite(&dir).await;

        let result = executor
            .sample("shop", "items; DROP TABLE items", None, 3)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_connection_is_not_found() {
        let dir = TempDir::new().unwrap();
        let executor = executor_with_sqlite(&dir).await;
        assert!(matches!(
            executor.execute("ghost", "SELECT 1", 10).await,
            Err(AppError::NotFound(_))
        ));
    }
}
