//! Store initialization
//!
//! Two SQLite stores take part in every run:
//! - **Primary Store**: the bilingual `dictionary` table, its five child
//!   collections and the FTS5 mirror kept in sync by triggers.
//! - **Source Store**: read-mostly CC-CEDICT entries keyed by
//!   (traditional, simplified, pinyin).
//!
//! `create_*` functions create missing files and tables (importers use them).
//! `open_*` functions require the file to exist already; a missing file is a
//! setup error for the command that asked for it.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::table_schemas::sync_dictionary_schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

async fn connect(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    Ok(pool)
}

fn require_existing(db_path: &Path, role: &str) -> Result<()> {
    if db_path.exists() {
        Ok(())
    } else {
        Err(Error::NotFound(format!(
            "{} database not found: {}",
            role,
            db_path.display()
        )))
    }
}

/// Open or create the Primary Store and make sure every table exists
pub async fn create_primary_store(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = connect(db_path, true).await?;

    if newly_created {
        info!("Initialized new primary store: {}", db_path.display());
    } else {
        info!("Opened existing primary store: {}", db_path.display());
    }

    init_primary_schema(&pool).await?;
    Ok(pool)
}

/// Open an existing Primary Store
///
/// Runs the additive column sync so stores written by older tooling gain
/// the provenance and sidecar columns.
pub async fn open_primary_store(db_path: &Path) -> Result<SqlitePool> {
    require_existing(db_path, "Primary")?;
    let pool = connect(db_path, false).await?;
    sync_dictionary_schema(&pool).await?;
    info!("Opened primary store: {}", db_path.display());
    Ok(pool)
}

/// Open or create the Source Store
pub async fn create_source_store(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = connect(db_path, true).await?;
    init_source_schema(&pool).await?;
    info!("Source store ready: {}", db_path.display());
    Ok(pool)
}

/// Open an existing Source Store
pub async fn open_source_store(db_path: &Path) -> Result<SqlitePool> {
    require_existing(db_path, "Source")?;
    let pool = connect(db_path, false).await?;
    info!("Opened source store: {}", db_path.display());
    Ok(pool)
}

/// Create all Primary Store tables, indexes, the FTS mirror and its triggers
///
/// Idempotent. Also runs the column sync for pre-existing `dictionary`
/// tables created without the newer columns.
pub async fn init_primary_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dictionary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word TEXT NOT NULL,
            traditional TEXT,
            simplified TEXT,
            pinyin TEXT,
            zhuyin TEXT,
            vi_meaning TEXT NOT NULL DEFAULT '',
            en_meaning TEXT,
            part_of_speech TEXT,
            hsk_level INTEGER,
            tocfl_level INTEGER,
            frequency_rank INTEGER,
            hanviet_reading TEXT,
            cedict_definitions TEXT,
            source TEXT,
            grammar_info TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sync_dictionary_schema(pool).await?;

    create_child_tables(pool).await?;
    create_search_index(pool).await?;

    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_dictionary_word ON dictionary(word)",
        "CREATE INDEX IF NOT EXISTS idx_dictionary_pinyin ON dictionary(pinyin)",
        "CREATE INDEX IF NOT EXISTS idx_dictionary_hsk ON dictionary(hsk_level)",
        "CREATE INDEX IF NOT EXISTS idx_dictionary_tocfl ON dictionary(tocfl_level)",
        "CREATE INDEX IF NOT EXISTS idx_examples_word ON examples(word_id)",
        "CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag)",
        "CREATE INDEX IF NOT EXISTS idx_tags_category ON tags(category)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_child_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS examples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word_id INTEGER NOT NULL,
            chinese TEXT NOT NULL,
            pinyin TEXT,
            vietnamese TEXT,
            english TEXT,
            source TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (word_id) REFERENCES dictionary (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // synonyms, antonyms and measure_words share one shape
    for (table, column) in [
        ("synonyms", "synonym"),
        ("antonyms", "antonym"),
        ("measure_words", "measure_word"),
    ] {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word_id INTEGER NOT NULL,
                {column} TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (word_id) REFERENCES dictionary (id) ON DELETE CASCADE
            )
            "#
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word_id INTEGER NOT NULL,
            tag TEXT NOT NULL,
            category TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (word_id, tag, category),
            FOREIGN KEY (word_id) REFERENCES dictionary (id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_search_index(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS dictionary_fts USING fts5(
            word,
            pinyin,
            vi_meaning,
            en_meaning,
            hanviet_reading,
            tokenize = 'unicode61 remove_diacritics 2'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS dictionary_ai AFTER INSERT ON dictionary
        BEGIN
            INSERT INTO dictionary_fts (rowid, word, pinyin, vi_meaning, en_meaning, hanviet_reading)
            VALUES (new.id, new.word, new.pinyin, new.vi_meaning, new.en_meaning, new.hanviet_reading);
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS dictionary_ad AFTER DELETE ON dictionary
        BEGIN
            DELETE FROM dictionary_fts WHERE rowid = old.id;
        END
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS dictionary_au AFTER UPDATE ON dictionary
        BEGIN
            UPDATE dictionary_fts SET
                word = new.word,
                pinyin = new.pinyin,
                vi_meaning = new.vi_meaning,
                en_meaning = new.en_meaning,
                hanviet_reading = new.hanviet_reading
            WHERE rowid = old.id;
        END
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Rebuild the FTS mirror from the `dictionary` table
///
/// Used after bulk imports into stores whose triggers were missing when
/// the rows were written.
pub async fn rebuild_search_index(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM dictionary_fts")
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO dictionary_fts (rowid, word, pinyin, vi_meaning, en_meaning, hanviet_reading)
        SELECT id, word, pinyin, vi_meaning, en_meaning, hanviet_reading FROM dictionary
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;
    info!("Search index rebuilt ({} rows)", inserted);
    Ok(inserted)
}

/// Create the Source Store table and indexes
pub async fn init_source_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cedict_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            traditional TEXT NOT NULL,
            simplified TEXT NOT NULL,
            pinyin TEXT NOT NULL,
            english TEXT NOT NULL,
            definitions TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (traditional, simplified, pinyin)
        )
        "#,
    )
    .execute(pool)
    .await?;

    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_cedict_traditional ON cedict_entries(traditional)",
        "CREATE INDEX IF NOT EXISTS idx_cedict_simplified ON cedict_entries(simplified)",
        "CREATE INDEX IF NOT EXISTS idx_cedict_pinyin ON cedict_entries(pinyin)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_primary_store_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = open_primary_store(&dir.path().join("missing.db")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_missing_source_store_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = open_source_store(&dir.path().join("cedict.db")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fts_follows_inserts_and_updates() {
        let dir = TempDir::new().unwrap();
        let pool = create_primary_store(&dir.path().join("dict.db")).await.unwrap();

        sqlx::query("INSERT INTO dictionary (word, vi_meaning) VALUES ('学生', '')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE dictionary SET vi_meaning = 'học sinh' WHERE word = '学生'")
            .execute(&pool)
            .await
            .unwrap();

        let hits: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dictionary_fts WHERE dictionary_fts MATCH '\"hoc sinh\"'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn test_child_rows_cascade_with_entry() {
        let dir = TempDir::new().unwrap();
        let pool = create_primary_store(&dir.path().join("dict.db")).await.unwrap();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO dictionary (word, vi_meaning) VALUES ('书', 'sách') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO measure_words (word_id, measure_word) VALUES (?, '本')")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query("DELETE FROM dictionary WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM measure_words")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_primary_schema_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dict.db");

        let pool = create_primary_store(&path).await.unwrap();
        init_primary_schema(&pool).await.unwrap();
        drop(pool);

        assert!(open_primary_store(&path).await.is_ok());
    }
}
