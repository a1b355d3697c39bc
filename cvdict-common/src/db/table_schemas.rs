//! Declared schemas for tables that older stores may lack columns for
//!
//! Seed-era dictionaries predate the provenance and duplicate-form columns
//! (`traditional`, `simplified`, `cedict_definitions`, `source`) and the
//! `grammar_info` sidecar. Syncing adds them with NULL defaults.

use super::schema_sync::{ColumnDefinition, SchemaSync, SyncReport, TableSchema};
use crate::Result;
use sqlx::SqlitePool;

/// Primary Store `dictionary` table
pub struct DictionaryTableSchema;

impl TableSchema for DictionaryTableSchema {
    fn table_name() -> &'static str {
        "dictionary"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("word", "TEXT").not_null(),
            ColumnDefinition::new("traditional", "TEXT"),
            ColumnDefinition::new("simplified", "TEXT"),
            ColumnDefinition::new("pinyin", "TEXT"),
            ColumnDefinition::new("zhuyin", "TEXT"),
            ColumnDefinition::new("vi_meaning", "TEXT").not_null().default("''"),
            ColumnDefinition::new("en_meaning", "TEXT"),
            ColumnDefinition::new("part_of_speech", "TEXT"),
            ColumnDefinition::new("hsk_level", "INTEGER"),
            ColumnDefinition::new("tocfl_level", "INTEGER"),
            ColumnDefinition::new("frequency_rank", "INTEGER"),
            ColumnDefinition::new("hanviet_reading", "TEXT"),
            ColumnDefinition::new("cedict_definitions", "TEXT"),
            ColumnDefinition::new("source", "TEXT"),
            ColumnDefinition::new("grammar_info", "TEXT"),
            ColumnDefinition::new("created_at", "TIMESTAMP"),
            ColumnDefinition::new("updated_at", "TIMESTAMP"),
        ]
    }
}

/// Bring the `dictionary` table up to the current column set
///
/// Also creates the lookup indexes on the duplicate-form and provenance
/// columns. Idempotent.
pub async fn sync_dictionary_schema(pool: &SqlitePool) -> Result<SyncReport> {
    let report = SchemaSync::sync_table::<DictionaryTableSchema>(pool).await?;

    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_traditional ON dictionary(traditional)",
        "CREATE INDEX IF NOT EXISTS idx_simplified ON dictionary(simplified)",
        "CREATE INDEX IF NOT EXISTS idx_source ON dictionary(source)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(report)
}
