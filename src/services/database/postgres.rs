// PostgreSQL session backed by tokio-postgres with streamed row decoding
use futures::{pin_mut, TryStreamExt};
use serde_json::{json, Value};
use tokio_postgres::types::{Kind, ToSql, Type};

use crate::api::middleware::AppError;
use crate::services::database::session::{CappedRows, DatabaseSession};

pub struct PostgresSession {
    client: tokio_postgres::Client,
    database: String,
}

impl PostgresSession {
    pub fn new(client: tokio_postgres::Client, database: String) -> Self {
        Self { client, database }
    }
}

#[async_trait::async_trait]
impl DatabaseSession for PostgresSession {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError> {
        // Prepare first so column names are known even for empty results.
        let statement = self.client.prepare(sql).await.map_err(|e| {
            let details = if let Some(db_error) = e.as_db_error() {
                format!("Code: {}, Message: {}", db_error.code().code(), db_error.message())
            } else {
                format!("{}", e)
            };
            AppError::Execution(format!("Query preparation failed: {}", details))
        })?;

        let mut out = CappedRows {
            columns: statement
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            ..Default::default()
        };

        let stream = self
            .client
            .query_raw(&statement, std::iter::empty::<&(dyn ToSql + Sync)>())
            .await
            .map_err(|e| AppError::Execution(format!("Query execution failed: {}", e)))?;
        pin_mut!(stream);

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| AppError::Execution(format!("Row fetch failed: {}", e)))?
        {
            if out.rows.len() >= max_rows {
                out.truncated = true;
                break;
            }
            out.rows
                .push((0..row.len()).map(|idx| pg_value_to_json(&row, idx)).collect());
        }

        Ok(out)
    }
}

/// Resolve domain types (information_schema reports `cardinal_number`,
/// `sql_identifier` and friends) down to their base type before matching.
fn base_type(ty: &Type) -> &Type {
    match ty.kind() {
        Kind::Domain(inner) => base_type(inner),
        _ => ty,
    }
}

fn pg_value_to_json(row: &tokio_postgres::Row, idx: usize) -> Value {
    let column = &row.columns()[idx];
    match *base_type(column.type_()) {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(|v| json!(v))
            .unwrap_or(Value::Null),
        _ => {
            // TEXT, VARCHAR, NAME and everything else that decodes as text.
            match row.try_get::<_, Option<String>>(idx) {
                Ok(Some(v)) => json!(v),
                Ok(None) => Value::Null,
                Err(_) => json!(format!("<{}>", column.type_().name())),
            }
        }
    }
}
