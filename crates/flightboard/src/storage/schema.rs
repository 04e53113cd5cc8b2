//! `SQLite` schema definitions for flightboard.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the board's key/value entries table.
///
/// Mirrors browser local storage: string keys, string values.
pub const CREATE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for internal bookkeeping.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_ENTRIES_TABLE, CREATE_METADATA_TABLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_entries_table_structure() {
        assert!(CREATE_ENTRIES_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_ENTRIES_TABLE.contains("value TEXT NOT NULL"));
        assert!(CREATE_ENTRIES_TABLE.contains("updated_at TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
