//! Per-engine catalog statements for table detail introspection.
//!
//! Placeholder syntax differs across the supported drivers, so these
//! builders inline the table and schema names as escaped string literals.
//! The names come from the engine's own catalog listings or pass the
//! sample-identifier guard before they reach this module.

use crate::models::EngineKind;

/// Double embedded single quotes so a name is safe inside a SQL string
/// literal.
pub(crate) fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

impl EngineKind {
    /// Column listing for one table, normalized to the shared column
    /// aliases (`column_name`, `data_type`, `is_nullable`, ...).
    pub fn columns_sql(&self, table: &str, schema: Option<&str>) -> String {
        let table = escape_literal(table);
        match self {
            EngineKind::PostgreSql => {
                let schema = escape_literal(schema.unwrap_or("public"));
                format!(
                    "SELECT \
                       c.column_name AS column_name, \
                       c.data_type AS data_type, \
                       c.is_nullable AS is_nullable, \
                       c.ordinal_position AS ordinal_position, \
                       c.column_default AS default_value, \
                       c.character_maximum_length AS character_maximum_length, \
                       c.numeric_precision AS numeric_precision, \
                       c.numeric_scale AS numeric_scale \
                     FROM information_schema.columns c \
                     WHERE c.table_schema = '{schema}' AND c.table_name = '{table}' \
                     ORDER BY c.ordinal_position"
                )
            }
            EngineKind::MySql => {
                let schema_expr = mysql_schema_expr(schema);
                format!(
                    "SELECT \
                       c.COLUMN_NAME AS column_name, \
                       c.DATA_TYPE AS data_type, \
                       c.IS_NULLABLE AS is_nullable, \
                       c.ORDINAL_POSITION AS ordinal_position, \
                       c.COLUMN_DEFAULT AS default_value, \
                       c.COLUMN_COMMENT AS description, \
                       c.CHARACTER_MAXIMUM_LENGTH AS character_maximum_length, \
                       c.NUMERIC_PRECISION AS numeric_precision, \
                       c.NUMERIC_SCALE AS numeric_scale \
                     FROM information_schema.COLUMNS c \
                     WHERE c.TABLE_SCHEMA = {schema_expr} AND c.TABLE_NAME = '{table}' \
                     ORDER BY c.ORDINAL_POSITION"
                )
            }
            EngineKind::Sqlite => format!(
                "SELECT \
                   name AS column_name, \
                   type AS data_type, \
                   CASE WHEN \"notnull\" = 0 THEN 'YES' ELSE 'NO' END AS is_nullable, \
                   cid + 1 AS ordinal_position, \
                   dflt_value AS default_value \
                 FROM pragma_table_info('{table}') \
                 ORDER BY cid"
            ),
            EngineKind::SqlServer => {
                let object = sqlserver_object(&table, schema);
                format!(
                    "SELECT \
                       c.name AS column_name, \
                       ty.name AS data_type, \
                       CASE WHEN c.is_nullable = 1 THEN 'YES' ELSE 'NO' END AS is_nullable, \
                       c.column_id AS ordinal_position, \
                       dc.definition AS default_value, \
                       CAST(ep.value AS NVARCHAR(4000)) AS description, \
                       c.max_length AS character_maximum_length, \
                       c.precision AS numeric_precision, \
                       c.scale AS numeric_scale \
                     FROM sys.columns c \
                     JOIN sys.types ty ON ty.user_type_id = c.user_type_id \
                     LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
                     LEFT JOIN sys.extended_properties ep \
                       ON ep.major_id = c.object_id AND ep.minor_id = c.column_id \
                      AND ep.name = 'MS_Description' \
                     WHERE c.object_id = OBJECT_ID('{object}') \
                     ORDER BY c.column_id"
                )
            }
            EngineKind::Oracle => {
                let owner = oracle_owner_expr(schema);
                let table = table.to_uppercase();
                format!(
                    "SELECT \
                       c.column_name AS column_name, \
                       c.data_type AS data_type, \
                       CASE WHEN c.nullable = 'Y' THEN 'YES' ELSE 'NO' END AS is_nullable, \
                       c.column_id AS ordinal_position, \
                       c.data_default AS default_value, \
                       cc.comments AS description, \
                       c.char_length AS character_maximum_length, \
                       c.data_precision AS numeric_precision, \
                       c.data_scale AS numeric_scale \
                     FROM all_tab_columns c \
                     LEFT JOIN all_col_comments cc \
                       ON cc.owner = c.owner AND cc.table_name = c.table_name \
                      AND cc.column_name = c.column_name \
                     WHERE c.owner = {owner} AND c.table_name = '{table}' \
                     ORDER BY c.column_id"
                )
            }
        }
    }

    /// Primary key columns of one table, in key order.
    pub fn primary_keys_sql(&self, table: &str, schema: Option<&str>) -> String {
        let table = escape_literal(table);
        match self {
            EngineKind::PostgreSql => {
                let schema = escape_literal(schema.unwrap_or("public"));
                format!(
                    "SELECT kcu.column_name AS column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON kcu.constraint_name = tc.constraint_name \
                      AND kcu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'PRIMARY KEY' \
                       AND tc.table_schema = '{schema}' AND tc.table_name = '{table}' \
                     ORDER BY kcu.ordinal_position"
                )
            }
            EngineKind::MySql => {
                let schema_expr = mysql_schema_expr(schema);
                format!(
                    "SELECT kcu.COLUMN_NAME AS column_name \
                     FROM information_schema.KEY_COLUMN_USAGE kcu \
                     WHERE kcu.CONSTRAINT_NAME = 'PRIMARY' \
                       AND kcu.TABLE_SCHEMA = {schema_expr} AND kcu.TABLE_NAME = '{table}' \
                     ORDER BY kcu.ORDINAL_POSITION"
                )
            }
            EngineKind::Sqlite => format!(
                "SELECT name AS column_name \
                 FROM pragma_table_info('{table}') \
                 WHERE pk > 0 \
                 ORDER BY pk"
            ),
            EngineKind::SqlServer => {
                let object = sqlserver_object(&table, schema);
                format!(
                    "SELECT col.name AS column_name \
                     FROM sys.indexes i \
                     JOIN sys.index_columns ic \
                       ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                     JOIN sys.columns col \
                       ON col.object_id = ic.object_id AND col.column_id = ic.column_id \
                     WHERE i.is_primary_key = 1 AND i.object_id = OBJECT_ID('{object}') \
                     ORDER BY ic.key_ordinal"
                )
            }
            EngineKind::Oracle => {
                let owner = oracle_owner_expr(schema);
                let table = table.to_uppercase();
                format!(
                    "SELECT acc.column_name AS column_name \
                     FROM all_constraints ac \
                     JOIN all_cons_columns acc \
                       ON acc.owner = ac.owner AND acc.constraint_name = ac.constraint_name \
                     WHERE ac.constraint_type = 'P' \
                       AND ac.owner = {owner} AND ac.table_name = '{table}' \
                     ORDER BY acc.position"
                )
            }
        }
    }

    /// Foreign key column pairs of one table. One row per participating
    /// column; callers group rows by `constraint_name`.
    pub fn foreign_keys_sql(&self, table: &str, schema: Option<&str>) -> String {
        let table = escape_literal(table);
        match self {
            EngineKind::PostgreSql => {
                let schema = escape_literal(schema.unwrap_or("public"));
                format!(
                    "SELECT \
                       tc.constraint_name AS constraint_name, \
                       kcu.column_name AS column_name, \
                       ccu.table_name AS referenced_table_name, \
                       ccu.table_schema AS referenced_table_schema, \
                       ccu.column_name AS referenced_column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON kcu.constraint_name = tc.constraint_name \
                      AND kcu.table_schema = tc.table_schema \
                     JOIN information_schema.constraint_column_usage ccu \
                       ON ccu.constraint_name = tc.constraint_name \
                      AND ccu.table_schema = tc.table_schema \
                     WHERE tc.constraint_type = 'FOREIGN KEY' \
                       AND tc.table_schema = '{schema}' AND tc.table_name = '{table}' \
                     ORDER BY tc.constraint_name, kcu.ordinal_position"
                )
            }
            EngineKind::MySql => {
                let schema_expr = mysql_schema_expr(schema);
                format!(
                    "SELECT \
                       kcu.CONSTRAINT_NAME AS constraint_name, \
                       kcu.COLUMN_NAME AS column_name, \
                       kcu.REFERENCED_TABLE_NAME AS referenced_table_name, \
                       kcu.REFERENCED_TABLE_SCHEMA AS referenced_table_schema, \
                       kcu.REFERENCED_COLUMN_NAME AS referenced_column_name \
                     FROM information_schema.KEY_COLUMN_USAGE kcu \
                     WHERE kcu.TABLE_SCHEMA = {schema_expr} AND kcu.TABLE_NAME = '{table}' \
                       AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
                     ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION"
                )
            }
            // SQLite constraints are unnamed; synthesize a stable name from
            // the foreign key id so multi-column keys group correctly.
            EngineKind::Sqlite => format!(
                "SELECT \
                   'fk_' || id AS constraint_name, \
                   \"from\" AS column_name, \
                   \"table\" AS referenced_table_name, \
                   \"to\" AS referenced_column_name \
                 FROM pragma_foreign_key_list('{table}') \
                 ORDER BY id, seq"
            ),
            EngineKind::SqlServer => {
                let object = sqlserver_object(&table, schema);
                format!(
                    "SELECT \
                       fk.name AS constraint_name, \
                       pc.name AS column_name, \
                       rt.name AS referenced_table_name, \
                       SCHEMA_NAME(rt.schema_id) AS referenced_table_schema, \
                       rc.name AS referenced_column_name \
                     FROM sys.foreign_keys fk \
                     JOIN sys.foreign_key_columns fkc \
                       ON fkc.constraint_object_id = fk.object_id \
                     JOIN sys.columns pc \
                       ON pc.object_id = fkc.parent_object_id \
                      AND pc.column_id = fkc.parent_column_id \
                     JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id \
                     JOIN sys.columns rc \
                       ON rc.object_id = fkc.referenced_object_id \
                      AND rc.column_id = fkc.referenced_column_id \
                     WHERE fk.parent_object_id = OBJECT_ID('{object}') \
                     ORDER BY fk.name, fkc.constraint_column_id"
                )
            }
            EngineKind::Oracle => {
                let owner = oracle_owner_expr(schema);
                let table = table.to_uppercase();
                format!(
                    "SELECT \
                       ac.constraint_name AS constraint_name, \
                       acc.column_name AS column_name, \
                       rc.table_name AS referenced_table_name, \
                       rc.owner AS referenced_table_schema, \
                       rcc.column_name AS referenced_column_name \
                     FROM all_constraints ac \
                     JOIN all_cons_columns acc \
                       ON acc.owner = ac.owner AND acc.constraint_name = ac.constraint_name \
                     JOIN all_constraints rc \
                       ON rc.owner = ac.r_owner AND rc.constraint_name = ac.r_constraint_name \
                     JOIN all_cons_columns rcc \
                       ON rcc.owner = rc.owner AND rcc.constraint_name = rc.constraint_name \
                      AND rcc.position = acc.position \
                     WHERE ac.constraint_type = 'R' \
                       AND ac.owner = {owner} AND ac.table_name = '{table}' \
                     ORDER BY ac.constraint_name, acc.position"
                )
            }
        }
    }

    /// Index columns of one table, excluding the primary key index. One row
    /// per key column; callers group rows by `index_name` and keep
    /// `key_ordinal` order.
    pub fn indexes_sql(&self, table: &str, schema: Option<&str>) -> String {
        let table = escape_literal(table);
        match self {
            EngineKind::PostgreSql => {
                let schema = escape_literal(schema.unwrap_or("public"));
                format!(
                    "SELECT \
                       i.relname AS index_name, \
                       ix.indisunique AS is_unique, \
                       a.attname AS column_name, \
                       k.ord AS key_ordinal \
                     FROM pg_class t \
                     JOIN pg_namespace n ON n.oid = t.relnamespace \
                     JOIN pg_index ix ON ix.indrelid = t.oid \
                     JOIN pg_class i ON i.oid = ix.indexrelid \
                     JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true \
                     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                     WHERE NOT ix.indisprimary \
                       AND n.nspname = '{schema}' AND t.relname = '{table}' \
                     ORDER BY i.relname, k.ord"
                )
            }
            EngineKind::MySql => {
                let schema_expr = mysql_schema_expr(schema);
                format!(
                    "SELECT \
                       s.INDEX_NAME AS index_name, \
                       CASE WHEN s.NON_UNIQUE = 0 THEN 1 ELSE 0 END AS is_unique, \
                       s.COLUMN_NAME AS column_name, \
                       s.SEQ_IN_INDEX AS key_ordinal \
                     FROM information_schema.STATISTICS s \
                     WHERE s.TABLE_SCHEMA = {schema_expr} AND s.TABLE_NAME = '{table}' \
                       AND s.INDEX_NAME <> 'PRIMARY' \
                     ORDER BY s.INDEX_NAME, s.SEQ_IN_INDEX"
                )
            }
            EngineKind::Sqlite => format!(
                "SELECT \
                   il.name AS index_name, \
                   il.\"unique\" AS is_unique, \
                   ii.name AS column_name, \
                   ii.seqno + 1 AS key_ordinal \
                 FROM pragma_index_list('{table}') il \
                 JOIN pragma_index_info(il.name) ii \
                 WHERE il.origin <> 'pk' \
                 ORDER BY il.name, ii.seqno"
            ),
            EngineKind::SqlServer => {
                let object = sqlserver_object(&table, schema);
                format!(
                    "SELECT \
                       i.name AS index_name, \
                       i.is_unique AS is_unique, \
                       col.name AS column_name, \
                       ic.key_ordinal AS key_ordinal \
                     FROM sys.indexes i \
                     JOIN sys.index_columns ic \
                       ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                     JOIN sys.columns col \
                       ON col.object_id = ic.object_id AND col.column_id = ic.column_id \
                     WHERE i.object_id = OBJECT_ID('{object}') \
                       AND i.is_primary_key = 0 AND i.name IS NOT NULL \
                     ORDER BY i.name, ic.key_ordinal"
                )
            }
            EngineKind::Oracle => {
                let owner = oracle_owner_expr(schema);
                let table = table.to_uppercase();
                format!(
                    "SELECT \
                       ic.index_name AS index_name, \
                       CASE WHEN i.uniqueness = 'UNIQUE' THEN 1 ELSE 0 END AS is_unique, \
                       ic.column_name AS column_name, \
                       ic.column_position AS key_ordinal \
                     FROM all_ind_columns ic \
                     JOIN all_indexes i \
                       ON i.owner = ic.index_owner AND i.index_name = ic.index_name \
                     WHERE ic.table_owner = {owner} AND ic.table_name = '{table}' \
                     ORDER BY ic.index_name, ic.column_position"
                )
            }
        }
    }

    /// `SELECT *` over a table with the engine's row-limit syntax.
    pub fn limited_select(&self, table: &str, max_rows: usize) -> String {
        match self {
            EngineKind::SqlServer => format!("SELECT TOP {max_rows} * FROM {table}"),
            EngineKind::Oracle => format!("SELECT * FROM {table} WHERE ROWNUM <= {max_rows}"),
            _ => format!("SELECT * FROM {table} LIMIT {max_rows}"),
        }
    }

    /// Server version string, aliased to `database_version`.
    pub fn version_sql(&self) -> &'static str {
        match self {
            EngineKind::PostgreSql => "SELECT version() AS database_version",
            EngineKind::MySql => "SELECT VERSION() AS database_version",
            EngineKind::Sqlite => "SELECT sqlite_version() AS database_version",
            EngineKind::SqlServer => "SELECT @@VERSION AS database_version",
            EngineKind::Oracle => {
                "SELECT banner AS database_version FROM v$version WHERE ROWNUM = 1"
            }
        }
    }
}

fn mysql_schema_expr(schema: Option<&str>) -> String {
    match schema {
        Some(s) => format!("'{}'", escape_literal(s)),
        None => "DATABASE()".to_string(),
    }
}

fn oracle_owner_expr(schema: Option<&str>) -> String {
    match schema {
        Some(s) => format!("'{}'", escape_literal(&s.to_uppercase())),
        None => "USER".to_string(),
    }
}

fn sqlserver_object(table: &str, schema: Option<&str>) -> String {
    match schema {
        Some(s) => format!("{}.{}", escape_literal(s), table),
        None => table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_escaped() {
        let sql = EngineKind::PostgreSql.columns_sql("o'brien", Some("pub'lic"));
        assert!(sql.contains("'o''brien'"));
        assert!(sql.contains("'pub''lic'"));
    }

    #[test]
    fn mysql_defaults_to_current_database() {
        let sql = EngineKind::MySql.columns_sql("orders", None);
        assert!(sql.contains("DATABASE()"));
        let sql = EngineKind::MySql.columns_sql("orders", Some("sales"));
        assert!(sql.contains("'sales'"));
    }

    #[test]
    fn oracle_uppercases_catalog_names() {
        let sql = EngineKind::Oracle.primary_keys_sql("orders", Some("sales"));
        assert!(sql.contains("'ORDERS'"));
        assert!(sql.contains("'SALES'"));
    }

    #[test]
    fn limited_select_uses_engine_syntax() {
        assert_eq!(
            EngineKind::SqlServer.limited_select("dbo.orders", 5),
            "SELECT TOP 5 * FROM dbo.orders"
        );
        assert_eq!(
            EngineKind::Oracle.limited_select("orders", 5),
            "SELECT * FROM orders WHERE ROWNUM <= 5"
        );
        assert_eq!(
            EngineKind::Sqlite.limited_select("orders", 5),
            "SELECT * FROM orders LIMIT 5"
        );
    }
}
