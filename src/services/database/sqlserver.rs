// SQL Server session backed by tiberius over a tokio TcpStream.
use futures::TryStreamExt;
use serde_json::{json, Value};
use tiberius::{Client, ColumnData, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use crate::api::middleware::AppError;
use crate::services::database::session::{CappedRows, DatabaseSession};

pub struct SqlServerSession {
    client: Client<Compat<TcpStream>>,
    database: String,
}

impl SqlServerSession {
    pub fn new(client: Client<Compat<TcpStream>>, database: String) -> Self {
        Self { client, database }
    }
}

#[async_trait::async_trait]
impl DatabaseSession for SqlServerSession {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError> {
        let mut stream = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| AppError::Execution(format!("Query execution failed: {}", e)))?;

        let mut out = CappedRows::default();
        let mut capped = false;

        while let Some(item) = stream
            .try_next()
            .await
            .map_err(|e| AppError::Execution(format!("Row fetch failed: {}", e)))?
        {
            match item {
                QueryItem::Metadata(meta) => {
                    if out.columns.is_empty() {
                        out.columns = meta
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                }
                QueryItem::Row(row) => {
                    if capped {
                        // TDS has no mid-stream cancel here, so drain the
                        // remainder without materializing it.
                        continue;
                    }
                    if out.rows.len() >= max_rows {
                        out.truncated = true;
                        capped = true;
                        continue;
                    }
                    out.rows
                        .push(row.into_iter().map(sqlserver_value_to_json).collect());
                }
            }
        }

        Ok(out)
    }
}

fn sqlserver_value_to_json(data: ColumnData<'static>) -> Value {
    match data {
        ColumnData::Bit(v) => v.map(|b| json!(b)).unwrap_or(Value::Null),
        ColumnData::U8(v) => v.map(|n| json!(n)).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(|n| json!(n)).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(|n| json!(n)).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(|n| json!(n)).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(|f| json!(f)).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(|f| json!(f)).unwrap_or(Value::Null),
        ColumnData::String(v) => v.map(|s| json!(s.into_owned())).unwrap_or(Value::Null),
        ColumnData::Guid(v) => v.map(|g| json!(g.to_string())).unwrap_or(Value::Null),
        ColumnData::Numeric(v) => v.map(|n| json!(n.to_string())).unwrap_or(Value::Null),
        other => json!(format!("{:?}", other)),
    }
}
