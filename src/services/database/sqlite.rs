// SQLite session backed by rusqlite. The connection is moved into a
// blocking task for each statement and moved back afterwards, so the
// synchronous driver never blocks the async executor.
use rusqlite::types::ValueRef;
use serde_json::{json, Value};

use crate::api::middleware::AppError;
use crate::services::database::session::{CappedRows, DatabaseSession};

pub struct SqliteSession {
    conn: Option<rusqlite::Connection>,
    database: String,
}

impl SqliteSession {
    pub fn new(conn: rusqlite::Connection, database: String) -> Self {
        Self {
            conn: Some(conn),
            database,
        }
    }
}

#[async_trait::async_trait]
impl DatabaseSession for SqliteSession {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Connection("SQLite session is no longer usable".to_string()))?;
        let sql = sql.to_string();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = run_capped(&conn, &sql, max_rows);
            (conn, result)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?;

        self.conn = Some(conn);
        result
    }
}

fn run_capped(
    conn: &rusqlite::Connection,
    sql: &str,
    max_rows: usize,
) -> Result<CappedRows, AppError> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::Execution(format!("Query preparation failed: {}", e)))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let column_count = stmt.column_count();

    let mut rows = stmt
        .query([])
        .map_err(|e| AppError::Execution(format!("Query execution failed: {}", e)))?;

    let mut out = CappedRows {
        columns,
        ..Default::default()
    };
    while let Some(row) = rows
        .next()
        .map_err(|e| AppError::Execution(format!("Row fetch failed: {}", e)))?
    {
        if out.rows.len() >= max_rows {
            out.truncated = true;
            break;
        }
        out.rows.push(
            (0..column_count)
                .map(|idx| sqlite_value_to_json(row.get_ref(idx)))
                .collect(),
        );
    }

    Ok(out)
}

fn sqlite_value_to_json(value: rusqlite::Result<ValueRef<'_>>) -> Value {
    match value {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => json!(i),
        Ok(ValueRef::Real(f)) => json!(f),
        Ok(ValueRef::Text(t)) => json!(String::from_utf8_lossy(t)),
        Ok(ValueRef::Blob(b)) => json!(format!("<blob {} bytes>", b.len())),
        Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SqliteSession {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO items (id, name) VALUES (1, 'one'), (2, 'two'), (3, 'three');",
        )
        .unwrap();
        SqliteSession::new(conn, "memory".to_string())
    }

    #[tokio::test]
    async fn capped_read_reports_truncation() {
        let mut s = session();
        let capped = s
            .query_capped("SELECT id, name FROM items ORDER BY id", 2)
            .await
            .unwrap();
        assert_eq!(capped.columns, vec!["id", "name"]);
        assert_eq!(capped.rows.len(), 2);
        assert!(capped.truncated);
    }

    #[tokio::test]
    async fn exact_cap_is_not_truncated() {
        let mut s = session();
        let capped = s
            .query_capped("SELECT id FROM items ORDER BY id", 3)
            .await
            .unwrap();
        assert_eq!(capped.rows.len(), 3);
        assert!(!capped.truncated);
    }

    #[tokio::test]
    async fn session_survives_a_failed_statement() {
        let mut s = session();
        assert!(s.query_capped("SELECT * FROM missing", 10).await.is_err());
        let rows = s.query("SELECT COUNT(*) AS n FROM items").await.unwrap();
        assert_eq!(rows[0].integer("n"), Some(3));
    }
}
