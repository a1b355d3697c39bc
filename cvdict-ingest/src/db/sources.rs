//! Source Store (CC-CEDICT) operations

use cvdict_common::db::SourceEntry;
use cvdict_common::Result;
use sqlx::{SqliteExecutor, SqlitePool};

const SOURCE_COLUMNS: &str = "id, traditional, simplified, pinyin, english, definitions";

/// Row to be written into `cedict_entries`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSourceEntry {
    pub traditional: String,
    pub simplified: String,
    pub pinyin: String,
    pub english: String,
    /// JSON array of discrete definitions
    pub definitions: String,
}

/// Every source entry in id order (import order)
pub async fn load_all_sources(pool: &SqlitePool) -> Result<Vec<SourceEntry>> {
    let sql = format!("SELECT {} FROM cedict_entries ORDER BY id", SOURCE_COLUMNS);
    let entries = sqlx::query_as::<_, SourceEntry>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(entries)
}

/// One page of insertion candidates: shortest forms first, then lexical order
pub async fn load_candidate_page(
    pool: &SqlitePool,
    offset: i64,
    limit: i64,
) -> Result<Vec<SourceEntry>> {
    let sql = format!(
        "SELECT {} FROM cedict_entries ORDER BY LENGTH(simplified), simplified, id LIMIT ? OFFSET ?",
        SOURCE_COLUMNS
    );
    let entries = sqlx::query_as::<_, SourceEntry>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    Ok(entries)
}

/// Insert unless the (traditional, simplified, pinyin) triple already exists
///
/// Returns true when a row was written.
pub async fn insert_source_entry<'e, E>(executor: E, entry: &NewSourceEntry) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO cedict_entries (traditional, simplified, pinyin, english, definitions)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.traditional)
    .bind(&entry.simplified)
    .bind(&entry.pinyin)
    .bind(&entry.english)
    .bind(&entry.definitions)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn count_sources(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cedict_entries")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Distinct values of `simplified` and `traditional`
pub async fn count_distinct_forms(pool: &SqlitePool) -> Result<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(DISTINCT simplified), COUNT(DISTINCT traditional) FROM cedict_entries",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}
