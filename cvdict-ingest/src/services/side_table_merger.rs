//! Pronunciation side-table merger
//!
//! Copies readings from small auxiliary SQLite files into the Primary
//! Store: `zhuyin(word, zhuyin)` fills `dictionary.zhuyin`, and
//! `hanviet(word, cn_vi)` fills `dictionary.hanviet_reading`. Only empty
//! targets are written; the first side-table row per word wins.

use cvdict_common::db::{EntryPatch, LexicalEntry};
use cvdict_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::db::entries;

/// Supported side tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SideTable {
    Zhuyin,
    Hanviet,
}

impl SideTable {
    fn select_sql(self) -> &'static str {
        match self {
            SideTable::Zhuyin => "SELECT word, zhuyin FROM zhuyin ORDER BY rowid",
            SideTable::Hanviet => "SELECT word, cn_vi FROM hanviet ORDER BY rowid",
        }
    }

    /// Patch carrying `value` in this table's target column
    fn patch(self, value: &str) -> EntryPatch {
        let value = Some(value.to_string());
        match self {
            SideTable::Zhuyin => EntryPatch {
                zhuyin: value,
                ..Default::default()
            },
            SideTable::Hanviet => EntryPatch {
                hanviet_reading: value,
                ..Default::default()
            },
        }
    }
}

pub struct SideTableMerger {
    primary: SqlitePool,
}

impl SideTableMerger {
    pub fn new(primary: SqlitePool) -> Self {
        Self { primary }
    }

    /// Read `table` from the SQLite file at `path` and merge it
    pub async fn merge_file(&self, table: SideTable, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Side table database not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::new().filename(path).read_only(true);
        let side = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let rows: Vec<(String, Option<String>)> = sqlx::query_as(table.select_sql())
            .fetch_all(&side)
            .await?;
        side.close().await;

        info!("Read {} {:?} rows from {}", rows.len(), table, path.display());
        self.merge_rows(table, rows).await
    }

    /// Merge (word, value) rows; returns the number of entries updated
    pub async fn merge_rows<I>(&self, table: SideTable, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut readings: HashMap<String, String> = HashMap::new();
        for (word, value) in rows {
            if let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                readings.entry(word).or_insert(value);
            }
        }

        let entries: Vec<LexicalEntry> = entries::load_all_entries(&self.primary).await?;
        let mut tx = self.primary.begin().await?;
        let mut updated = 0;

        for entry in &entries {
            let Some(value) = readings.get(&entry.word) else {
                continue;
            };

            let patch = table.patch(value).restricted_to_empty(entry);
            if patch.is_empty() {
                continue;
            }

            entries::apply_patch(&mut *tx, entry.id, &patch).await?;
            updated += 1;
        }

        tx.commit().await?;
        info!("Updated {:?} for {} entries", table, updated);
        Ok(updated)
    }
}
