use crate::models::EngineKind;

/// Embedded metadata script bundle for an engine. One resource per engine,
/// named `<engine>_metadata.sql`.
pub fn metadata_script(kind: EngineKind) -> &'static str {
    match kind {
        EngineKind::PostgreSql => include_str!("scripts/postgresql_metadata.sql"),
        EngineKind::SqlServer => include_str!("scripts/sqlserver_metadata.sql"),
        EngineKind::MySql => include_str!("scripts/mysql_metadata.sql"),
        EngineKind::Oracle => include_str!("scripts/oracle_metadata.sql"),
        EngineKind::Sqlite => include_str!("scripts/sqlite_metadata.sql"),
    }
}

/// Extract one named statement from a script bundle.
///
/// A section begins at a comment line naming it (`-- <name>` or
/// `/* <name>`) and ends at the next comment line that is not part of a
/// SQL clause (heuristically: a `--` line that does not contain
/// `FROM`/`WHERE`/`JOIN`). Non-comment, non-blank lines in between are
/// concatenated in order into the executable statement.
pub fn extract_section(script: &str, section_name: &str) -> Option<String> {
    let line_marker = format!("-- {}", section_name);
    let block_marker = format!("/* {}", section_name);

    let mut in_section = false;
    let mut statement = String::new();

    for raw in script.lines() {
        let line = raw.trim_end_matches('\r');

        if line.contains(&line_marker) || line.contains(&block_marker) {
            in_section = true;
            continue;
        }

        if in_section
            && line.starts_with("--")
            && !line.contains("FROM")
            && !line.contains("WHERE")
            && !line.contains("JOIN")
        {
            break;
        }

        if in_section && !line.starts_with("--") && !line.trim().is_empty() {
            statement.push_str(line);
            statement.push('\n');
        }
    }

    if statement.trim().is_empty() {
        None
    } else {
        Some(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTIONS: [&str; 4] = ["Tables Metadata", "Views", "Stored Procedures", "Functions"];

    #[test]
    fn extracts_section_between_sentinels() {
        let script = "\
-- bundle header

-- Tables Metadata
SELECT a
FROM t
WHERE x = 1

-- Views
SELECT b
FROM v
";
        let tables = extract_section(script, "Tables Metadata").unwrap();
        assert_eq!(tables, "SELECT a\nFROM t\nWHERE x = 1\n");

        let views = extract_section(script, "Views").unwrap();
        assert_eq!(views, "SELECT b\nFROM v\n");
    }

    #[test]
    fn comment_lines_with_sql_clauses_do_not_end_a_section() {
        let script = "\
-- Tables Metadata
SELECT a
-- FROM comment continues the section
FROM t
-- done
SELECT never_reached
";
        let tables = extract_section(script, "Tables Metadata").unwrap();
        // The clause-bearing comment is skipped but does not terminate.
        assert_eq!(tables, "SELECT a\nFROM t\n");
    }

    #[test]
    fn missing_section_returns_none() {
        assert!(extract_section("SELECT 1", "Tables Metadata").is_none());
    }

    #[test]
    fn every_bundle_carries_all_four_sections() {
        for kind in [
            EngineKind::PostgreSql,
            EngineKind::SqlServer,
            EngineKind::MySql,
            EngineKind::Oracle,
            EngineKind::Sqlite,
        ] {
            let script = metadata_script(kind);
            for section in SECTIONS {
                let sql = extract_section(script, section).unwrap_or_else(|| {
                    panic!("{} bundle is missing section '{}'", kind.as_str(), section)
                });
                assert!(
                    sql.contains("FROM"),
                    "{} section '{}' is not a runnable statement",
                    kind.as_str(),
                    section
                );
            }
        }
    }
}
