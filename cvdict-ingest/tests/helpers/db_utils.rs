//! Store fixtures
//!
//! Both stores are real on-disk SQLite files inside a temporary directory,
//! created through the same initialization path the binary uses.

use cvdict_common::db::{create_primary_store, create_source_store, LexicalEntry};
use cvdict_ingest::db::entries::{self, NewEntry};
use cvdict_ingest::db::sources::{self, NewSourceEntry};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

/// Primary and Source Store in a temporary root folder
///
/// `dir` must be kept alive for the duration of the test.
pub struct TestStores {
    pub dir: TempDir,
    pub primary: SqlitePool,
    pub source: SqlitePool,
}

impl TestStores {
    pub fn primary_path(&self) -> PathBuf {
        self.dir.path().join("primary.db")
    }

    pub fn source_path(&self) -> PathBuf {
        self.dir.path().join("cedict.db")
    }
}

pub async fn create_test_stores() -> TestStores {
    let dir = TempDir::new().unwrap();
    let primary = create_primary_store(&dir.path().join("primary.db"))
        .await
        .unwrap();
    let source = create_source_store(&dir.path().join("cedict.db"))
        .await
        .unwrap();

    TestStores {
        dir,
        primary,
        source,
    }
}

/// Insert a Primary Store entry with the given Vietnamese meaning
pub async fn add_entry(pool: &SqlitePool, word: &str, vi_meaning: &str) -> i64 {
    entries::insert_entry(
        pool,
        &NewEntry {
            word: word.to_string(),
            vi_meaning: vi_meaning.to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap()
}

/// Insert a Source Store entry; definitions are split from `english` on "; "
pub async fn add_source(
    pool: &SqlitePool,
    traditional: &str,
    simplified: &str,
    pinyin: &str,
    english: &str,
) {
    let definitions: Vec<&str> = english.split("; ").collect();
    let inserted = sources::insert_source_entry(
        pool,
        &NewSourceEntry {
            traditional: traditional.to_string(),
            simplified: simplified.to_string(),
            pinyin: pinyin.to_string(),
            english: english.to_string(),
            definitions: serde_json::to_string(&definitions).unwrap(),
        },
    )
    .await
    .unwrap();
    assert!(inserted, "duplicate source fixture {}", simplified);
}

/// All Primary Store entries with the given word, in id order
pub async fn entry_by_word(pool: &SqlitePool, word: &str) -> Vec<LexicalEntry> {
    entries::load_all_entries(pool)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.word == word)
        .collect()
}
