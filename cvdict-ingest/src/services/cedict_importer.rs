//! CC-CEDICT importer
//!
//! Reads a CC-CEDICT text file, plain or gzip-compressed, and fills the
//! Source Store. [`download_cedict`] fetches the current MDBG export.
//! Line format:
//!
//! ```text
//! 學生 学生 [xue2 sheng5] /student/schoolchild/
//! ```
//!
//! Lines starting with `#` are comments.

use cvdict_common::{Error, Result};
use flate2::read::GzDecoder;
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::db::sources::{self, NewSourceEntry};

const BATCH_SIZE: usize = 1000;

/// MDBG export of the full dictionary (traditional and simplified, UTF-8)
pub const CEDICT_URL: &str =
    "https://www.mdbg.net/chinese/export/cedict/cedict_1_0_ts_utf-8_mdbg.txt.gz";

/// File name the download is stored under
pub const CEDICT_ARCHIVE_NAME: &str = "cedict_1_0_ts_utf-8_mdbg.txt.gz";

/// Download the gzip export from `url` into `dest_dir`, returning the file path
pub async fn download_cedict(
    client: &reqwest::Client,
    url: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    info!("Downloading CC-CEDICT from {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::Network(format!("CC-CEDICT download failed: {}", e)))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(format!("CC-CEDICT download interrupted: {}", e)))?;

    tokio::fs::create_dir_all(dest_dir).await?;
    let path = dest_dir.join(CEDICT_ARCHIVE_NAME);
    tokio::fs::write(&path, &bytes).await?;

    info!(bytes = bytes.len(), "Saved {}", path.display());
    Ok(path)
}

/// Inflate a gzip archive into UTF-8 text
pub fn decompress_gzip(compressed: &[u8]) -> Result<String> {
    let mut text = String::new();
    GzDecoder::new(compressed).read_to_string(&mut text)?;
    Ok(text)
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// One parsed dictionary line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CedictRecord {
    pub traditional: String,
    pub simplified: String,
    pub pinyin: String,
    pub definitions: Vec<String>,
}

impl CedictRecord {
    /// Combined English gloss
    pub fn english(&self) -> String {
        self.definitions.join("; ")
    }

    fn to_source_entry(&self) -> Result<NewSourceEntry> {
        Ok(NewSourceEntry {
            traditional: self.traditional.clone(),
            simplified: self.simplified.clone(),
            pinyin: self.pinyin.clone(),
            english: self.english(),
            definitions: serde_json::to_string(&self.definitions)?,
        })
    }
}

/// Parse one CC-CEDICT line; comments, blanks and malformed lines yield None
pub fn parse_cedict_line(line: &str) -> Option<CedictRecord> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (traditional, rest) = line.split_once(char::is_whitespace)?;
    let (simplified, rest) = rest.trim_start().split_once(char::is_whitespace)?;

    let rest = rest.trim_start().strip_prefix('[')?;
    let (pinyin, rest) = rest.split_once(']')?;

    let body = rest.trim().strip_prefix('/')?.strip_suffix('/')?;
    let definitions: Vec<String> = body
        .split('/')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();

    if definitions.is_empty() || pinyin.trim().is_empty() {
        return None;
    }

    Some(CedictRecord {
        traditional: traditional.to_string(),
        simplified: simplified.to_string(),
        pinyin: pinyin.trim().to_string(),
        definitions,
    })
}

/// Import counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Lines read
    pub lines: usize,
    /// Lines that parsed into a record
    pub parsed: usize,
    /// New Source Store rows
    pub inserted: usize,
    /// Records already present (or rejected by the store)
    pub skipped: usize,
}

/// Source Store summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub total_entries: i64,
    pub unique_simplified: i64,
    pub unique_traditional: i64,
}

pub async fn source_stats(pool: &SqlitePool) -> Result<SourceStats> {
    let total_entries = sources::count_sources(pool).await?;
    let (unique_simplified, unique_traditional) = sources::count_distinct_forms(pool).await?;

    Ok(SourceStats {
        total_entries,
        unique_simplified,
        unique_traditional,
    })
}

/// Streams a CC-CEDICT file into the Source Store
pub struct CedictImporter {
    pool: SqlitePool,
}

impl CedictImporter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Import every record in `path`; a `.gz` file is inflated first
    ///
    /// Rows are written with `INSERT OR IGNORE` in one transaction per
    /// 1000 records, so re-importing the same file only counts skips.
    pub async fn import_file(&self, path: &Path) -> Result<ImportStats> {
        info!("Importing CC-CEDICT file: {}", path.display());

        if is_gzip(path) {
            let compressed = tokio::fs::read(path).await?;
            let text = decompress_gzip(&compressed)?;
            debug!(bytes = text.len(), "Inflated {}", path.display());
            return self.import_lines(text.as_bytes()).await;
        }

        let file = tokio::fs::File::open(path).await?;
        self.import_lines(BufReader::new(file)).await
    }

    async fn import_lines<R: AsyncBufRead + Unpin>(&self, reader: R) -> Result<ImportStats> {
        let mut lines = reader.lines();
        let mut stats = ImportStats::default();
        let mut batch: Vec<CedictRecord> = Vec::with_capacity(BATCH_SIZE);

        while let Some(line) = lines.next_line().await? {
            stats.lines += 1;

            let Some(record) = parse_cedict_line(&line) else {
                continue;
            };
            stats.parsed += 1;
            batch.push(record);

            if batch.len() >= BATCH_SIZE {
                self.write_batch(&batch, &mut stats).await?;
                batch.clear();
                info!("Imported {} entries...", stats.parsed);
            }
        }

        if !batch.is_empty() {
            self.write_batch(&batch, &mut stats).await?;
        }

        info!(
            lines = stats.lines,
            parsed = stats.parsed,
            inserted = stats.inserted,
            skipped = stats.skipped,
            "CC-CEDICT import complete"
        );
        Ok(stats)
    }

    async fn write_batch(&self, batch: &[CedictRecord], stats: &mut ImportStats) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in batch {
            let entry = record.to_source_entry()?;
            match sources::insert_source_entry(&mut *tx, &entry).await {
                Ok(true) => stats.inserted += 1,
                Ok(false) => stats.skipped += 1,
                Err(e) => {
                    warn!(word = %record.simplified, "Insert failed: {}", e);
                    stats.skipped += 1;
                }
            }
        }

        tx.commit().await?;
        debug!("Committed batch of {} records", batch.len());
        Ok(())
    }
}
