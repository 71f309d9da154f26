use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::middleware::AppError;

/// One decoded result row with name-based field access.
///
/// Lookup is an exact column-name match first, then a case-insensitive
/// fallback, so driver-reported naming conventions don't need to match the
/// names our catalog statements use.
#[derive(Debug, Clone)]
pub struct SqlRow {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl SqlRow {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        if let Some(idx) = self.columns.iter().position(|c| c == name) {
            return self.values.get(idx);
        }
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))?;
        self.values.get(idx)
    }

    pub fn value_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.field(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness across driver conventions: booleans, nonzero numbers and
    /// the usual YES/Y/TRUE/T/1 string spellings.
    pub fn flag(&self, name: &str) -> bool {
        match self.field(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Some(Value::String(s)) => {
                matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "yes" | "y" | "true" | "t" | "1"
                )
            }
            _ => false,
        }
    }
}

/// Result of a bounded read: rows up to the cap plus whether at least one
/// more row existed beyond it.
#[derive(Debug, Default)]
pub struct CappedRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub truncated: bool,
}

/// An open, engine-specific database session. Dropping the session
/// releases the underlying connection, so release happens on every exit
/// path.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Name of the database this session is attached to.
    fn database_name(&self) -> &str;

    /// Execute a statement, reading at most `max_rows` rows. After the cap
    /// is reached exactly one more read attempt decides `truncated`; the
    /// extra row is not materialized into the result.
    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError>;

    /// Execute a statement and decode every row.
    async fn query(&mut self, sql: &str) -> Result<Vec<SqlRow>, AppError> {
        let capped = self.query_capped(sql, usize::MAX).await?;
        let columns = Arc::new(capped.columns);
        Ok(capped
            .rows
            .into_iter()
            .map(|values| SqlRow::new(columns.clone(), values))
            .collect())
    }
}
