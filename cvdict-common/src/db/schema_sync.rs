//! Additive schema synchronization
//!
//! Additive, idempotent schema maintenance for stores created by older
//! tooling. Expected columns are declared in code; any column missing from
//! the live table is added with `ALTER TABLE ... ADD COLUMN` and a NULL
//! default. Safe to run on every invocation.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct DictionaryTableSchema;
//!
//! impl TableSchema for DictionaryTableSchema {
//!     fn table_name() -> &'static str { "dictionary" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("source", "TEXT"),
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<DictionaryTableSchema>(&pool).await?;
//! ```
//!
//! **Cannot fix (logged only):** type changes, constraint changes, column
//! removal. Those need a hand-written migration.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "TIMESTAMP")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// DEFAULT value (SQL literal)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause for `ALTER TABLE ... ADD COLUMN`
    ///
    /// SQLite refuses PRIMARY KEY on added columns and NOT NULL without a
    /// default, so those constraints are dropped here.
    fn add_column_clause(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.sql_type);
        match (&self.default_value, self.not_null) {
            (Some(default), true) => clause.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => clause.push_str(&format!(" DEFAULT {}", default)),
            (None, _) => clause.push_str(" DEFAULT NULL"),
        }
        clause
    }
}

/// Actual column from `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub pk: bool,
}

/// Difference between declared and live schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from database (auto-fixed)
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (requires manual migration)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Live column lacks a declared constraint (requires manual migration)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Declared schema for a table
pub trait TableSchema {
    fn table_name() -> &'static str;

    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Result of one sync pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Columns added during this pass
    pub added_columns: Vec<String>,
    /// Drift that could not be fixed automatically
    pub unresolved: Vec<SchemaDrift>,
}

/// Schema introspection via PRAGMA
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read live columns, ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Declared-vs-live comparison
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for col in expected {
            let Some(live) = actual.iter().find(|a| a.name.eq_ignore_ascii_case(&col.name)) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&col.sql_type, &live.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: col.name.clone(),
                    expected: col.sql_type.clone(),
                    actual: live.type_name.clone(),
                });
            }

            if col.not_null && !live.not_null && !live.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if col.primary_key && !live.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// SQLite affinity-level compatibility
    fn types_compatible(expected: &str, actual: &str) -> bool {
        fn affinity(t: &str) -> &'static str {
            let t = t.to_uppercase();
            if t.contains("INT") {
                "INTEGER"
            } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
                "TEXT"
            } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
                "REAL"
            } else if t.is_empty() || t.contains("BLOB") {
                "BLOB"
            } else {
                "NUMERIC"
            }
        }

        // Untyped legacy columns accept anything
        actual.trim().is_empty() || affinity(expected) == affinity(actual)
    }
}

/// Apply additive schema changes
pub struct SchemaSync;

impl SchemaSync {
    /// Synchronize one table; a missing table is left to its CREATE statement
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<SyncReport> {
        let table_name = T::table_name();
        let mut report = SyncReport::default();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Schema sync: table '{}' does not exist, skipping", table_name);
            return Ok(report);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema up to date for '{}'", table_name);
            return Ok(report);
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, &table, &column).await?;
                    report.added_columns.push(column.name);
                }
                other => {
                    warn!("Schema drift needs manual migration: {:?}", other);
                    report.unresolved.push(other);
                }
            }
        }

        Ok(report)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        if column.primary_key {
            warn!(
                "Cannot add PRIMARY KEY column {}.{} via ALTER TABLE; adding as plain column",
                table, column.name
            );
        }

        let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column.add_column_clause());
        info!("Adding column: {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
