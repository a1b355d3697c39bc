//! Primary Store entry operations
//!
//! All field writes go through [`apply_patch`], whose statement assigns
//! every column with a fill-only expression. The typed
//! `EntryPatch::restricted_to_empty` filter and the SQL agree, so a stale
//! in-memory row can never clobber a value written since it was read.

use cvdict_common::db::{EntryPatch, ExampleSentence, LexicalEntry, Tag, ENTRY_COLUMNS};
use cvdict_common::Result;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashSet;

/// New `dictionary` row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEntry {
    pub word: String,
    pub traditional: Option<String>,
    pub simplified: Option<String>,
    pub pinyin: Option<String>,
    pub vi_meaning: String,
    pub en_meaning: Option<String>,
    pub hsk_level: Option<i64>,
    pub tocfl_level: Option<i64>,
    pub frequency_rank: Option<i64>,
    pub cedict_definitions: Option<String>,
    pub source: Option<String>,
}

/// Entry selected for enrichment, with its example-presence flag
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichmentCandidate {
    #[sqlx(flatten)]
    pub entry: LexicalEntry,
    pub has_examples: bool,
}

pub async fn count_entries(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM dictionary")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Every entry, in id order
pub async fn load_all_entries(pool: &SqlitePool) -> Result<Vec<LexicalEntry>> {
    let sql = format!("SELECT {} FROM dictionary ORDER BY id", ENTRY_COLUMNS);
    let entries = sqlx::query_as::<_, LexicalEntry>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(entries)
}

pub async fn load_entry(pool: &SqlitePool, id: i64) -> Result<Option<LexicalEntry>> {
    let sql = format!("SELECT {} FROM dictionary WHERE id = ?", ENTRY_COLUMNS);
    let entry = sqlx::query_as::<_, LexicalEntry>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(entry)
}

/// Seed-path identity: same word with the same Vietnamese meaning
pub async fn find_by_word_and_meaning<'e, E>(
    executor: E,
    word: &str,
    vi_meaning: &str,
) -> Result<Option<LexicalEntry>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM dictionary WHERE word = ? AND vi_meaning = ? ORDER BY id LIMIT 1",
        ENTRY_COLUMNS
    );
    let entry = sqlx::query_as::<_, LexicalEntry>(&sql)
        .bind(word)
        .bind(vi_meaning)
        .fetch_optional(executor)
        .await?;
    Ok(entry)
}

/// Distinct identity strings currently in the store
pub async fn existing_identities(pool: &SqlitePool) -> Result<HashSet<String>> {
    let words: Vec<String> = sqlx::query_scalar("SELECT DISTINCT word FROM dictionary")
        .fetch_all(pool)
        .await?;
    Ok(words.into_iter().collect())
}

/// Insert a new entry, returning its id
pub async fn insert_entry<'e, E>(executor: E, entry: &NewEntry) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let id = sqlx::query(
        r#"
        INSERT INTO dictionary (
            word, traditional, simplified, pinyin, vi_meaning, en_meaning,
            hsk_level, tocfl_level, frequency_rank, cedict_definitions, source,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(&entry.word)
    .bind(&entry.traditional)
    .bind(&entry.simplified)
    .bind(&entry.pinyin)
    .bind(&entry.vi_meaning)
    .bind(&entry.en_meaning)
    .bind(entry.hsk_level)
    .bind(entry.tocfl_level)
    .bind(entry.frequency_rank)
    .bind(&entry.cedict_definitions)
    .bind(&entry.source)
    .execute(executor)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Write a patch to one entry and stamp `updated_at`
///
/// Each column keeps its current value unless it is NULL or blank, in which
/// case the patch value (if any) lands. Returns the affected row count.
pub async fn apply_patch<'e, E>(executor: E, id: i64, patch: &EntryPatch) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let affected = sqlx::query(
        r#"
        UPDATE dictionary SET
            pinyin = CASE WHEN TRIM(COALESCE(pinyin, '')) = '' THEN COALESCE(?, pinyin) ELSE pinyin END,
            zhuyin = CASE WHEN TRIM(COALESCE(zhuyin, '')) = '' THEN COALESCE(?, zhuyin) ELSE zhuyin END,
            hanviet_reading = CASE WHEN TRIM(COALESCE(hanviet_reading, '')) = '' THEN COALESCE(?, hanviet_reading) ELSE hanviet_reading END,
            vi_meaning = CASE WHEN TRIM(COALESCE(vi_meaning, '')) = '' THEN COALESCE(?, vi_meaning) ELSE vi_meaning END,
            en_meaning = CASE WHEN TRIM(COALESCE(en_meaning, '')) = '' THEN COALESCE(?, en_meaning) ELSE en_meaning END,
            traditional = CASE WHEN TRIM(COALESCE(traditional, '')) = '' THEN COALESCE(?, traditional) ELSE traditional END,
            simplified = CASE WHEN TRIM(COALESCE(simplified, '')) = '' THEN COALESCE(?, simplified) ELSE simplified END,
            part_of_speech = CASE WHEN TRIM(COALESCE(part_of_speech, '')) = '' THEN COALESCE(?, part_of_speech) ELSE part_of_speech END,
            cedict_definitions = CASE WHEN TRIM(COALESCE(cedict_definitions, '')) = '' THEN COALESCE(?, cedict_definitions) ELSE cedict_definitions END,
            grammar_info = CASE WHEN TRIM(COALESCE(grammar_info, '')) = '' THEN COALESCE(?, grammar_info) ELSE grammar_info END,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(&patch.pinyin)
    .bind(&patch.zhuyin)
    .bind(&patch.hanviet_reading)
    .bind(&patch.vi_meaning)
    .bind(&patch.en_meaning)
    .bind(&patch.traditional)
    .bind(&patch.simplified)
    .bind(&patch.part_of_speech)
    .bind(&patch.cedict_definitions)
    .bind(&patch.grammar_info)
    .bind(id)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected)
}

/// Fill proficiency levels that are still NULL
pub async fn fill_levels<'e, E>(
    executor: E,
    id: i64,
    hsk_level: Option<i64>,
    tocfl_level: Option<i64>,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE dictionary SET
            hsk_level = COALESCE(hsk_level, ?),
            tocfl_level = COALESCE(tocfl_level, ?)
        WHERE id = ?
        "#,
    )
    .bind(hsk_level)
    .bind(tocfl_level)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Entries missing zhuyin, Vietnamese meaning or Hán-Việt reading
///
/// Ordered by descending frequency rank, then ascending id. Ids in
/// `exclude` are skipped.
pub async fn select_incomplete(
    pool: &SqlitePool,
    limit: i64,
    exclude: &[i64],
) -> Result<Vec<EnrichmentCandidate>> {
    let sql = format!(
        r#"
        SELECT {},
            EXISTS(SELECT 1 FROM examples e WHERE e.word_id = dictionary.id) AS has_examples
        FROM dictionary
        WHERE (TRIM(COALESCE(zhuyin, '')) = ''
           OR TRIM(COALESCE(vi_meaning, '')) = ''
           OR TRIM(COALESCE(hanviet_reading, '')) = '')
          AND id NOT IN (SELECT value FROM json_each(?))
        ORDER BY frequency_rank DESC, id ASC
        LIMIT ?
        "#,
        ENTRY_COLUMNS
    );

    let candidates = sqlx::query_as::<_, EnrichmentCandidate>(&sql)
        .bind(serde_json::to_string(exclude)?)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(candidates)
}

/// Append example sentences to an entry
pub async fn insert_examples(
    conn: &mut SqliteConnection,
    word_id: i64,
    examples: &[ExampleSentence],
) -> Result<u64> {
    let mut inserted = 0;

    for example in examples {
        inserted += sqlx::query(
            r#"
            INSERT INTO examples (word_id, chinese, pinyin, vietnamese, english, source)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(word_id)
        .bind(&example.chinese)
        .bind(&example.pinyin)
        .bind(&example.vietnamese)
        .bind(&example.english)
        .bind(&example.source)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }

    Ok(inserted)
}

/// Add a tag; returns false when the (entry, tag, category) row already exists
pub async fn add_tag<'e, E>(executor: E, word_id: i64, tag: &str, category: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let affected = sqlx::query(
        "INSERT OR IGNORE INTO tags (word_id, tag, category) VALUES (?, ?, ?)",
    )
    .bind(word_id)
    .bind(tag)
    .bind(category)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

pub async fn load_examples(pool: &SqlitePool, word_id: i64) -> Result<Vec<ExampleSentence>> {
    let examples = sqlx::query_as::<_, ExampleSentence>(
        r#"
        SELECT chinese, pinyin, vietnamese, english, source
        FROM examples WHERE word_id = ? ORDER BY id
        "#,
    )
    .bind(word_id)
    .fetch_all(pool)
    .await?;
    Ok(examples)
}

pub async fn load_tags(pool: &SqlitePool, word_id: i64) -> Result<Vec<Tag>> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT tag, category FROM tags WHERE word_id = ? ORDER BY id",
    )
    .bind(word_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// Single-column child collection (synonyms, antonyms, measure words)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordList {
    Synonyms,
    Antonyms,
    MeasureWords,
}

impl WordList {
    fn table_and_column(self) -> (&'static str, &'static str) {
        match self {
            WordList::Synonyms => ("synonyms", "synonym"),
            WordList::Antonyms => ("antonyms", "antonym"),
            WordList::MeasureWords => ("measure_words", "measure_word"),
        }
    }
}

pub async fn load_word_list(pool: &SqlitePool, word_id: i64, list: WordList) -> Result<Vec<String>> {
    let (table, column) = list.table_and_column();
    let sql = format!("SELECT {column} FROM {table} WHERE word_id = ? ORDER BY id");
    let words: Vec<String> = sqlx::query_scalar(&sql)
        .bind(word_id)
        .fetch_all(pool)
        .await?;
    Ok(words)
}
