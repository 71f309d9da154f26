// MySQL session backed by mysql_async with streamed row decoding
use mysql_async::{prelude::*, Conn, Value as MySqlValue};
use serde_json::{json, Value};

use crate::api::middleware::AppError;
use crate::services::database::session::{CappedRows, DatabaseSession};

pub struct MySqlSession {
    conn: Conn,
    database: String,
}

impl MySqlSession {
    pub fn new(conn: Conn, database: String) -> Self {
        Self { conn, database }
    }
}

#[async_trait::async_trait]
impl DatabaseSession for MySqlSession {
    fn database_name(&self) -> &str {
        &self.database
    }

    async fn query_capped(&mut self, sql: &str, max_rows: usize) -> Result<CappedRows, AppError> {
        let mut result = self
            .conn
            .query_iter(sql)
            .await
            .map_err(|e| AppError::Execution(format!("Query execution failed: {}", e)))?;

        let mut out = CappedRows::default();
        if let Some(columns) = result.columns() {
            out.columns = columns.iter().map(|c| c.name_str().to_string()).collect();
        }

        while let Some(row) = result
            .next()
            .await
            .map_err(|e| AppError::Execution(format!("Row fetch failed: {}", e)))?
        {
            if out.rows.len() >= max_rows {
                out.truncated = true;
                break;
            }
            let values = (0..row.len())
                .map(|idx| match row.get_opt::<MySqlValue, usize>(idx) {
                    Some(Ok(mysql_val)) => mysql_value_to_json(mysql_val),
                    _ => Value::Null,
                })
                .collect();
            out.rows.push(values);
        }

        // An unconsumed result marks the connection dirty; the driver drains
        // it before the next command.
        drop(result);

        Ok(out)
    }
}

fn mysql_value_to_json(mysql_val: MySqlValue) -> Value {
    match mysql_val {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => json!(s),
            Err(_) => Value::Null,
        },
        MySqlValue::Int(i) => json!(i),
        MySqlValue::UInt(u) => json!(u),
        MySqlValue::Float(f) => json!(f),
        MySqlValue::Double(d) => json!(d),
        MySqlValue::Date(y, m, d, h, min, s, _) => {
            json!(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
        }
        MySqlValue::Time(is_neg, d, h, m, s, _) => {
            let sign = if is_neg { "-" } else { "" };
            let total_hours = d * 24 + h as u32;
            json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_values_convert_to_json() {
        assert_eq!(mysql_value_to_json(MySqlValue::NULL), Value::Null);
        assert_eq!(
            mysql_value_to_json(MySqlValue::Bytes(b"hello".to_vec())),
            json!("hello")
        );
        assert_eq!(mysql_value_to_json(MySqlValue::Int(-7)), json!(-7));
        assert_eq!(
            mysql_value_to_json(MySqlValue::Date(2024, 3, 1, 12, 30, 0, 0)),
            json!("2024-03-01 12:30:00")
        );
    }
}
