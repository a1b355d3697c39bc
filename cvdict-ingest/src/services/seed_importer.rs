//! Seed vocabulary importer
//!
//! Loads hand-curated vocabulary lists (JSON arrays of
//! `{"w", "p", "m", "m_en", "unit"}` items) into the Primary Store.
//! Proficiency levels and the topic tag come from the file name:
//! `hsk_3_tu_vung_gia_dinh.json` → HSK 3, topic "hsk 3 gia dinh".

use cvdict_common::db::{rebuild_search_index, EntryPatch};
use cvdict_common::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db::entries::{self, NewEntry};

const TOPIC_CATEGORY: &str = "topic";
const PROGRESS_INTERVAL: usize = 1000;

/// One vocabulary item as found in the seed files
#[derive(Debug, Clone, Default, Deserialize)]
struct SeedItem {
    #[serde(default)]
    w: Option<String>,
    #[serde(default)]
    p: Option<String>,
    #[serde(default)]
    m: Option<String>,
    #[serde(default)]
    m_en: Option<String>,
    /// Textbook unit; some lists store it as a string
    #[serde(default)]
    unit: Option<serde_json::Value>,
}

impl SeedItem {
    fn unit(&self) -> Option<i64> {
        match self.unit.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Attributes derived from a seed file's name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub hsk_level: Option<i64>,
    pub tocfl_level: Option<i64>,
    pub category: Option<String>,
}

/// Import counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedImportStats {
    pub files: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl SeedImportStats {
    fn add(&mut self, other: &SeedImportStats) {
        self.files += other.files;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

pub struct SeedImporter {
    pool: SqlitePool,
    hsk_pattern: Regex,
    tocfl_pattern: Regex,
    whitespace: Regex,
    disallowed: Regex,
}

impl SeedImporter {
    pub fn new(pool: SqlitePool) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::Internal(format!("Invalid pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            pool,
            hsk_pattern: compile(r"hsk_(\d+)")?,
            tocfl_pattern: compile(r"tocfl_(\d+)")?,
            whitespace: compile(r"\s+")?,
            disallowed: compile(r"[^\w\s\-.,;:!?()]")?,
        })
    }

    /// Collapse whitespace and drop characters outside the allowed set
    pub fn clean_vietnamese(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text.trim(), " ");
        self.disallowed.replace_all(&collapsed, "").trim().to_string()
    }

    pub fn file_attributes(&self, path: &Path) -> FileAttributes {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let level = |pattern: &Regex| {
            pattern
                .captures(&file_name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<i64>().ok())
        };

        let category = path
            .file_stem()
            .map(|s| {
                s.to_string_lossy()
                    .replace('_', " ")
                    .replace("tu vung", "")
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|c| !c.is_empty());

        FileAttributes {
            hsk_level: level(&self.hsk_pattern),
            tocfl_level: level(&self.tocfl_pattern),
            category,
        }
    }

    /// Import every `*.json` file under `dir` (recursive, sorted by path)
    pub async fn import_directory(&self, dir: &Path) -> Result<SeedImportStats> {
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "Seed directory not found: {}",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        info!("Found {} seed files in {}", files.len(), dir.display());

        let mut stats = SeedImportStats::default();
        for path in &files {
            match self.import_file(path).await {
                Ok(file_stats) => stats.add(&file_stats),
                Err(e) => warn!(file = %path.display(), "Seed file skipped: {}", e),
            }
        }

        rebuild_search_index(&self.pool).await?;

        info!(
            files = stats.files,
            inserted = stats.inserted,
            updated = stats.updated,
            skipped = stats.skipped,
            "Seed import complete"
        );
        Ok(stats)
    }

    /// Import one file inside a single transaction
    ///
    /// Counts describe committed rows only; a failed file reports nothing.
    async fn import_file(&self, path: &Path) -> Result<SeedImportStats> {
        let content = tokio::fs::read_to_string(path).await?;
        let items: Vec<serde_json::Value> = match serde_json::from_str(&content)? {
            serde_json::Value::Array(items) => items,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "{} does not contain a list",
                    path.display()
                )))
            }
        };

        let attributes = self.file_attributes(path);
        let mut tx = self.pool.begin().await?;
        let mut stats = SeedImportStats {
            files: 1,
            ..Default::default()
        };

        for value in items {
            let Ok(item) = serde_json::from_value::<SeedItem>(value) else {
                stats.skipped += 1;
                continue;
            };

            let word = item.w.as_deref().unwrap_or_default().trim().to_string();
            let vi_meaning = self.clean_vietnamese(item.m.as_deref().unwrap_or_default());
            if word.is_empty() || vi_meaning.is_empty() {
                stats.skipped += 1;
                continue;
            }

            let pinyin = non_blank(item.p.as_deref());
            let en_meaning = non_blank(item.m_en.as_deref());

            let word_id = match entries::find_by_word_and_meaning(&mut *tx, &word, &vi_meaning)
                .await?
            {
                Some(existing) => {
                    let patch = EntryPatch {
                        pinyin,
                        en_meaning,
                        ..Default::default()
                    }
                    .restricted_to_empty(&existing);

                    if !patch.is_empty() {
                        entries::apply_patch(&mut *tx, existing.id, &patch).await?;
                    }
                    entries::fill_levels(
                        &mut *tx,
                        existing.id,
                        attributes.hsk_level,
                        attributes.tocfl_level,
                    )
                    .await?;
                    stats.updated += 1;
                    existing.id
                }
                None => {
                    let id = entries::insert_entry(
                        &mut *tx,
                        &NewEntry {
                            word,
                            pinyin,
                            vi_meaning,
                            en_meaning,
                            hsk_level: attributes.hsk_level,
                            tocfl_level: attributes.tocfl_level,
                            frequency_rank: item.unit(),
                            ..Default::default()
                        },
                    )
                    .await?;
                    stats.inserted += 1;

                    if stats.inserted % PROGRESS_INTERVAL == 0 {
                        info!(file = %path.display(), "Imported {} seed entries...", stats.inserted);
                    }
                    id
                }
            };

            if let Some(category) = &attributes.category {
                entries::add_tag(&mut *tx, word_id, category, TOPIC_CATEGORY).await?;
            }
        }

        tx.commit().await?;
        debug!(file = %path.display(), inserted = stats.inserted, "Seed file imported");
        Ok(stats)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn importer() -> SeedImporter {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SeedImporter::new(pool).unwrap()
    }

    #[tokio::test]
    async fn test_clean_vietnamese() {
        let importer = importer().await;

        assert_eq!(importer.clean_vietnamese("  xin   chào! "), "xin chào!");
        assert_eq!(importer.clean_vietnamese("học sinh; \"trò\""), "học sinh; trò");
        assert_eq!(importer.clean_vietnamese("(danh từ) sách*"), "(danh từ) sách");
    }

    #[tokio::test]
    async fn test_file_attributes() {
        let importer = importer().await;

        let hsk = importer.file_attributes(Path::new("/seed/hsk_3_tu_vung_gia_dinh.json"));
        assert_eq!(hsk.hsk_level, Some(3));
        assert_eq!(hsk.tocfl_level, None);
        assert_eq!(hsk.category.as_deref(), Some("hsk 3 gia dinh"));

        let tocfl = importer.file_attributes(Path::new("tocfl_2.json"));
        assert_eq!(tocfl.tocfl_level, Some(2));
        assert_eq!(tocfl.category.as_deref(), Some("tocfl 2"));
    }
}
