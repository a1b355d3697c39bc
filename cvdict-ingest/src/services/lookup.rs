//! Read-only dictionary lookup
//!
//! Search cascade: exact match on word, Vietnamese meaning or pinyin; then
//! the FTS5 mirror (queries longer than one character, matched as a phrase);
//! then a ranked substring match.

use cvdict_common::db::{ExampleSentence, LexicalEntry, Tag, ENTRY_COLUMNS};
use cvdict_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::entries::{self, WordList};

/// Entry with all of its child collections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryDetails {
    pub entry: LexicalEntry,
    pub examples: Vec<ExampleSentence>,
    pub synonyms: Vec<String>,
    pub antonyms: Vec<String>,
    pub measure_words: Vec<String>,
    pub tags: Vec<Tag>,
}

/// Level and topic distribution of the Primary Store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LexiconStats {
    pub total_words: i64,
    pub hsk_distribution: Vec<(i64, i64)>,
    pub tocfl_distribution: Vec<(i64, i64)>,
    /// Tag category → distinct entry count, largest first
    pub categories: Vec<(String, i64)>,
}

pub struct Lookup {
    pool: SqlitePool,
}

impl Lookup {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<LexicalEntry>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let exact = self.search_exact(query, limit).await?;
        if !exact.is_empty() {
            debug!(query, hits = exact.len(), "Exact match");
            return Ok(exact);
        }

        if query.chars().count() > 1 {
            let full_text = self.search_full_text(query, limit).await?;
            if !full_text.is_empty() {
                debug!(query, hits = full_text.len(), "Full-text match");
                return Ok(full_text);
            }
        }

        self.search_substring(query, limit).await
    }

    async fn search_exact(&self, query: &str, limit: i64) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            r#"
            SELECT {} FROM dictionary
            WHERE word = ?1 OR vi_meaning = ?1 OR pinyin = ?1
            ORDER BY frequency_rank ASC, hsk_level ASC, id ASC
            LIMIT ?2
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn search_full_text(&self, query: &str, limit: i64) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            r#"
            SELECT {} FROM dictionary
            JOIN (
                SELECT rowid AS fts_id, rank AS fts_rank
                FROM dictionary_fts WHERE dictionary_fts MATCH ?
            ) m ON dictionary.id = m.fts_id
            ORDER BY m.fts_rank, frequency_rank ASC, hsk_level ASC
            LIMIT ?
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(fts_phrase(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn search_substring(&self, query: &str, limit: i64) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            r#"
            SELECT {} FROM dictionary
            WHERE word LIKE ?1 OR vi_meaning LIKE ?1 OR pinyin LIKE ?1
            ORDER BY
                CASE
                    WHEN word LIKE ?2 THEN 1
                    WHEN vi_meaning LIKE ?2 THEN 2
                    WHEN pinyin LIKE ?2 THEN 3
                    ELSE 4
                END,
                frequency_rank ASC, hsk_level ASC, id ASC
            LIMIT ?3
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(format!("%{query}%"))
            .bind(format!("{query}%"))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn by_hsk_level(&self, level: i64, limit: i64) -> Result<Vec<LexicalEntry>> {
        self.by_level("hsk_level", level, limit).await
    }

    pub async fn by_tocfl_level(&self, level: i64, limit: i64) -> Result<Vec<LexicalEntry>> {
        self.by_level("tocfl_level", level, limit).await
    }

    async fn by_level(&self, column: &'static str, level: i64, limit: i64) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            "SELECT {} FROM dictionary WHERE {column} = ? ORDER BY frequency_rank ASC, id ASC LIMIT ?",
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(level)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Entries whose tag or tag category contains `category`
    pub async fn by_category(&self, category: &str, limit: i64) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            r#"
            SELECT {} FROM dictionary
            WHERE id IN (SELECT word_id FROM tags WHERE tag LIKE ?1 OR category LIKE ?1)
            ORDER BY frequency_rank ASC, hsk_level ASC, id ASC
            LIMIT ?2
            "#,
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(format!("%{}%", category.trim()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn details(&self, id: i64) -> Result<Option<EntryDetails>> {
        let Some(entry) = entries::load_entry(&self.pool, id).await? else {
            return Ok(None);
        };

        Ok(Some(EntryDetails {
            examples: entries::load_examples(&self.pool, id).await?,
            synonyms: entries::load_word_list(&self.pool, id, WordList::Synonyms).await?,
            antonyms: entries::load_word_list(&self.pool, id, WordList::Antonyms).await?,
            measure_words: entries::load_word_list(&self.pool, id, WordList::MeasureWords).await?,
            tags: entries::load_tags(&self.pool, id).await?,
            entry,
        }))
    }

    pub async fn random_entries(&self, limit: i64, hsk_level: Option<i64>) -> Result<Vec<LexicalEntry>> {
        let sql = format!(
            "SELECT {} FROM dictionary WHERE (?1 IS NULL OR hsk_level = ?1) ORDER BY RANDOM() LIMIT ?2",
            ENTRY_COLUMNS
        );

        let rows = sqlx::query_as::<_, LexicalEntry>(&sql)
            .bind(hsk_level)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn statistics(&self) -> Result<LexiconStats> {
        let total_words = entries::count_entries(&self.pool).await?;

        let hsk_distribution: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT hsk_level, COUNT(*) FROM dictionary WHERE hsk_level IS NOT NULL \
             GROUP BY hsk_level ORDER BY hsk_level",
        )
        .fetch_all(&self.pool)
        .await?;

        let tocfl_distribution: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT tocfl_level, COUNT(*) FROM dictionary WHERE tocfl_level IS NOT NULL \
             GROUP BY tocfl_level ORDER BY tocfl_level",
        )
        .fetch_all(&self.pool)
        .await?;

        let categories: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(DISTINCT word_id) AS n FROM tags WHERE category IS NOT NULL \
             GROUP BY category ORDER BY n DESC, category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(LexiconStats {
            total_words,
            hsk_distribution,
            tocfl_distribution,
            categories,
        })
    }
}

/// Quote a user query as one FTS5 phrase
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}
