//! Completion reporting
//!
//! Read-only coverage and quality statistics over the Primary Store, and the
//! plain-text before/after report produced by the completion workflow.

use chrono::Local;
use cvdict_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use super::reconciler::IntegrationSummary;

const RULE_WIDTH: usize = 60;

/// Populated-field counts for the five tracked fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CoverageStats {
    pub total_entries: i64,
    pub with_english: i64,
    pub with_vietnamese: i64,
    pub with_pinyin: i64,
    pub with_zhuyin: i64,
    pub with_hanviet: i64,
}

impl CoverageStats {
    fn rate(&self, count: i64) -> f64 {
        if self.total_entries == 0 {
            0.0
        } else {
            count as f64 / self.total_entries as f64 * 100.0
        }
    }

    pub fn english_rate(&self) -> f64 {
        self.rate(self.with_english)
    }

    pub fn vietnamese_rate(&self) -> f64 {
        self.rate(self.with_vietnamese)
    }

    pub fn pinyin_rate(&self) -> f64 {
        self.rate(self.with_pinyin)
    }

    pub fn zhuyin_rate(&self) -> f64 {
        self.rate(self.with_zhuyin)
    }

    pub fn hanviet_rate(&self) -> f64 {
        self.rate(self.with_hanviet)
    }

    /// (label, rate) for every tracked field, in report order
    pub fn rates(&self) -> [(&'static str, f64); 5] {
        [
            ("English Meaning", self.english_rate()),
            ("Vietnamese Meaning", self.vietnamese_rate()),
            ("Pinyin", self.pinyin_rate()),
            ("Zhuyin", self.zhuyin_rate()),
            ("Hanviet", self.hanviet_rate()),
        ]
    }

    /// Unweighted mean of the five rates
    pub fn overall_score(&self) -> f64 {
        self.rates().iter().map(|(_, rate)| rate).sum::<f64>() / 5.0
    }
}

pub async fn coverage(pool: &SqlitePool) -> Result<CoverageStats> {
    let stats = sqlx::query_as::<_, CoverageStats>(
        r#"
        SELECT
            COUNT(*) AS total_entries,
            COALESCE(SUM(TRIM(COALESCE(en_meaning, '')) != ''), 0) AS with_english,
            COALESCE(SUM(TRIM(COALESCE(vi_meaning, '')) != ''), 0) AS with_vietnamese,
            COALESCE(SUM(TRIM(COALESCE(pinyin, '')) != ''), 0) AS with_pinyin,
            COALESCE(SUM(TRIM(COALESCE(zhuyin, '')) != ''), 0) AS with_zhuyin,
            COALESCE(SUM(TRIM(COALESCE(hanviet_reading, '')) != ''), 0) AS with_hanviet
        FROM dictionary
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(stats)
}

/// Gap counts after a completion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualityCheck {
    /// No pinyin or no English meaning
    pub missing_critical: i64,
    /// Neither pinyin nor zhuyin
    pub no_pronunciation: i64,
    /// Neither English nor Vietnamese meaning
    pub no_translation: i64,
    /// Entry count per provenance tag
    pub source_counts: Vec<(String, i64)>,
}

pub async fn quality_check(pool: &SqlitePool) -> Result<QualityCheck> {
    let (missing_critical, no_pronunciation, no_translation): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(TRIM(COALESCE(pinyin, '')) = '' OR TRIM(COALESCE(en_meaning, '')) = ''), 0),
            COALESCE(SUM(TRIM(COALESCE(pinyin, '')) = '' AND TRIM(COALESCE(zhuyin, '')) = ''), 0),
            COALESCE(SUM(TRIM(COALESCE(en_meaning, '')) = '' AND TRIM(COALESCE(vi_meaning, '')) = ''), 0)
        FROM dictionary
        "#,
    )
    .fetch_one(pool)
    .await?;

    let source_counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT source, COUNT(*) FROM dictionary WHERE source IS NOT NULL GROUP BY source ORDER BY source",
    )
    .fetch_all(pool)
    .await?;

    Ok(QualityCheck {
        missing_critical,
        no_pronunciation,
        no_translation,
        source_counts,
    })
}

/// Before/after summary of one completion run
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReport {
    pub initial: CoverageStats,
    pub final_stats: CoverageStats,
    pub quality: QualityCheck,
    /// None when reconciliation was skipped
    pub integration: Option<IntegrationSummary>,
    pub enhanced: usize,
}

impl CompletionReport {
    /// Overall score change, in percentage points
    pub fn improvement(&self) -> f64 {
        self.final_stats.overall_score() - self.initial.overall_score()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Save the rendered report as `completion_report_YYYYMMDD_HHMMSS.txt`
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!(
            "completion_report_{}.txt",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, self.render()).await?;

        info!("Report saved to {}", path.display());
        Ok(path)
    }
}

impl fmt::Display for CompletionReport {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let integration = self.integration.unwrap_or_default();

        writeln!(out, "{rule}")?;
        writeln!(out, "CHINESE-VIETNAMESE DICTIONARY COMPLETION REPORT")?;
        writeln!(out, "{rule}\n")?;

        writeln!(out, "OVERVIEW:")?;
        writeln!(out, "Initial entries: {}", group_thousands(self.initial.total_entries))?;
        writeln!(out, "Final entries: {}", group_thousands(self.final_stats.total_entries))?;
        writeln!(
            out,
            "New entries added: {}\n",
            group_thousands(self.final_stats.total_entries - self.initial.total_entries)
        )?;

        writeln!(out, "CC-CEDICT INTEGRATION:")?;
        if self.integration.is_none() {
            writeln!(out, "(skipped)")?;
        }
        writeln!(
            out,
            "Matched entries updated: {}",
            group_thousands(integration.updated_count as i64)
        )?;
        writeln!(
            out,
            "New entries from CC-CEDICT: {}\n",
            group_thousands(integration.inserted_count as i64)
        )?;

        writeln!(out, "AI ENHANCEMENT:")?;
        writeln!(out, "Entries enhanced by AI: {}\n", group_thousands(self.enhanced as i64))?;

        writeln!(out, "COMPLETION RATES:")?;
        writeln!(out, "                    Before    After    Improvement")?;
        for ((label, before), (_, after)) in self.initial.rates().iter().zip(self.final_stats.rates()) {
            writeln!(
                out,
                "{:<20}{:5.1}%   {:5.1}%   {:+5.1}%",
                format!("{label}:"),
                before,
                after,
                after - before
            )?;
        }
        writeln!(out)?;

        writeln!(out, "QUALITY CHECK:")?;
        writeln!(
            out,
            "Entries missing critical info: {}",
            group_thousands(self.quality.missing_critical)
        )?;
        writeln!(
            out,
            "Entries with no pronunciation: {}",
            group_thousands(self.quality.no_pronunciation)
        )?;
        writeln!(
            out,
            "Entries with no translation: {}\n",
            group_thousands(self.quality.no_translation)
        )?;

        if !self.quality.source_counts.is_empty() {
            writeln!(out, "ENTRIES BY SOURCE:")?;
            for (source, count) in &self.quality.source_counts {
                writeln!(out, "  {}: {}", source, group_thousands(*count))?;
            }
        }
        writeln!(out)?;

        writeln!(
            out,
            "OVERALL COMPLETION SCORE: {:.1}%\n",
            self.final_stats.overall_score()
        )?;
        write!(out, "{rule}")
    }
}

/// 1234567 → "1,234,567"
fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
