// Oracle session backed by the blocking `oracle` driver, bridged onto the
// async executor the same way as SQLite: move the connection into a
// blocking task per statement, then move it back.
use oracle::sql_type::OracleType;
use serde_json::{json, Value};

use crate::api::middleware::AppError;
use crate::services::database::session::{CappedRows, DatabaseSession};

pub struct OracleSession {
    conn: Option<oracle::Connection>,
    database: String,
}

impl OracleSession {
    pub fn new(conn: oracle::Connection, database: String) -> Self {
        Self {
            conn: Some(conn),
            database,
        }
    }
}

#[async_trait::async_trait]
impl DatabaseSession for OracleSession {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Connection("Oracle session is no longer usable".to_string()))?;
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
    conn: &oracle::Connection,
    sql: &str,
    max_rows: usize,
) -> Result<CappedRows, AppError> {
    let rows = conn
        .query(sql, &[])
        .map_err(|e| AppError::Execution(format!("Query execution failed: {}", e)))?;

    let mut out = CappedRows {
        columns: rows
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        ..Default::default()
    };

    for row in rows {
        let row = row.map_err(|e| AppError::Execution(format!("Row fetch failed: {}", e)))?;
        if out.rows.len() >= max_rows {
            out.truncated = true;
            break;
        }
        out.rows
            .push(row.sql_values().iter().map(oracle_value_to_json).collect());
    }

    Ok(out)
}

fn oracle_value_to_json(value: &oracle::SqlValue) -> Value {
    match value.is_null() {
        Ok(false) => {}
        Ok(true) | Err(_) => return Value::Null,
    }

    let converted = match value.oracle_type() {
        Ok(OracleType::Number(_, 0)) | Ok(OracleType::Int64) | Ok(OracleType::UInt64) => {
            value.get::<i64>().map(|n| json!(n)).ok()
        }
        Ok(OracleType::Number(_, _))
        | Ok(OracleType::Float(_))
        | Ok(OracleType::BinaryFloat)
        | Ok(OracleType::BinaryDouble) => value.get::<f64>().map(|f| json!(f)).ok(),
        // Dates, timestamps, CLOBs and everything else stringify.
        _ => value.get::<String>().map(|s| json!(s)).ok(),
    };

    converted.unwrap_or(Value::Null)
}
