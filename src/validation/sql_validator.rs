// Lexical query-safety screening.
//
// This is deliberately a coarse text heuristic, not a SQL parser: it has
// to behave identically across five engine dialects, and the engines
// themselves remain the last line of defense. Connections marked
// read-only are trusted to enforce that at the database level, so their
// statements pass without inspection.
use std::sync::{Arc, LazyLock};

use regex::{Regex, RegexSet};
use tracing::debug;

use crate::storage::ConnectionRegistry;

static LINE_COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)--.*$").unwrap());
static BLOCK_COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Substring patterns indicating a write or DDL statement. Matched against
/// the normalized (comment-stripped, lowercased) statement text.
static WRITE_INDICATORS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"insert\s",
        r"update\s",
        r"delete\s",
        r"truncate\s",
        r"drop\s",
        r"alter\s",
        r"create\s",
        r"grant\s",
        r"revoke\s",
        r"set\s",
        r"exec\s",
        r"execute\s",
        r"call\s",
        r"begin\s",
        r"merge\s",
        r"with\s.*\s(update|delete|insert)\s",
    ])
    .unwrap()
});

pub struct QuerySafetyValidator {
    registry: Arc<ConnectionRegistry>,
}

impl QuerySafetyValidator {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Whether a statement may run against the named connection.
    ///
    /// Read-only connections accept any statement without inspection; the
    /// database account enforces the restriction. Writable connections get
    /// the lexical screen. An unknown connection is never safe.
    pub async fn is_safe(&self, connection_id: &str, sql: &str) -> bool {
        match self.registry.get(connection_id).await {
            Some(descriptor) if descriptor.read_only => true,
            Some(_) => {
                let unsafe_statement = Self::has_write_indicators(sql);
                if unsafe_statement {
                    debug!(connection_id, "statement rejected by write screen");
                }
                !unsafe_statement
            }
            None => false,
        }
    }

    pub fn has_write_indicators(sql: &str) -> bool {
        WRITE_INDICATORS.is_match(&Self::normalize(sql))
    }

    /// Strip comments, collapse whitespace, lowercase.
    fn normalize(sql: &str) -> String {
        let stripped = BLOCK_COMMENTS.replace_all(sql, " ");
        let stripped = LINE_COMMENTS.replace_all(&stripped, " ");
        let collapsed = WHITESPACE.replace_all(&stripped, " ");
        collapsed.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionDescriptor, EngineKind};
    use tempfile::TempDir;

    async fn validator(read_only: bool) -> (TempDir, QuerySafetyValidator) {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(ConnectionRegistry::load(dir.path().join("connections.json")).await);
        let mut descriptor = ConnectionDescriptor::new(
            "db".to_string(),
            EngineKind::Sqlite,
            "sqlite:app.db".to_string(),
        );
        descriptor.read_only = read_only;
        registry.add(descriptor).await.unwrap();
        (dir, QuerySafetyValidator::new(registry))
    }

    #[tokio::test]
    async fn read_only_connections_skip_inspection() {
        let (_dir, v) = validator(true).await;
        assert!(v.is_safe("db", "DROP TABLE users").await);
        assert!(v.is_safe("db", "SELECT 1").await);
    }

    #[tokio::test]
    async fn writable_connections_are_screened() {
        let (_dir, v) = validator(false).await;
        assert!(v.is_safe("db", "SELECT * FROM users").await);
        assert!(!v.is_safe("db", "INSERT INTO users VALUES (1)").await);
        assert!(!v.is_safe("db", "update users set name = 'x'").await);
        assert!(!v.is_safe("db", "DELETE FROM users").await);
        assert!(!v.is_safe("db", "TRUNCATE users; SELECT 1").await);
        assert!(
            !v.is_safe("db", "WITH c AS (SELECT 1) UPDATE t SET x = 1")
                .await
        );
    }

    #[tokio::test]
    async fn unknown_connection_is_never_safe() {
        let (_dir, v) = validator(true).await;
        assert!(!v.is_safe("ghost", "SELECT 1").await);
    }

    #[test]
    fn comments_do_not_hide_or_fake_writes() {
        // A write keyword inside a comment is not a write.
        assert!(!QuerySafetyValidator::has_write_indicators(
            "SELECT * FROM orders -- drop table orders"
        ));
        assert!(!QuerySafetyValidator::has_write_indicators(
            "/* update below */ SELECT 1"
        ));
        // A write split across lines still matches after collapsing.
        assert!(QuerySafetyValidator::has_write_indicators(
            "DELETE\n  FROM orders"
        ));
    }

    #[test]
    fn lookalike_identifiers_pass() {
        assert!(!QuerySafetyValidator::has_write_indicators(
            "SELECT updated_at, created_by FROM audit_log"
        ));
    }

    #[test]
    fn normalization_is_idempotent() {
        let sql = "  SELECT  1 /* c */ -- tail\n FROM t  ";
        let once = QuerySafetyValidator::normalize(sql);
        let twice = QuerySafetyValidator::normalize(&once);
        assert_eq!(once, twice);
    }
}
