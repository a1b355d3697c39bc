//! Combined completion workflow
//!
//! initial coverage → reconciliation → AI enrichment → quality check →
//! final coverage → report. Reconciliation is skipped when no Source Store
//! is available and enrichment when no client is configured; a failing
//! step is logged and the workflow moves on.

use cvdict_common::Result;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::completion_reporter::{self, CompletionReport};
use super::enrichment_client::EnrichmentClient;
use super::enrichment_scheduler::EnrichmentScheduler;
use super::reconciler::{IntegrationSummary, Reconciler};

/// Entries per enrichment selection query
pub const AI_BATCH_SIZE: usize = 20;

/// Workflow limit presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Quick,
    Standard,
}

impl Preset {
    /// Maximum new entries inserted from CC-CEDICT
    pub fn cedict_limit(self) -> usize {
        match self {
            Preset::Quick => 1_000,
            Preset::Standard => 10_000,
        }
    }

    /// Maximum entries processed by the enrichment scheduler
    pub fn ai_limit(self) -> usize {
        match self {
            Preset::Quick => 100,
            Preset::Standard => 1_000,
        }
    }
}

/// Per-run overrides
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    pub cedict_limit: Option<usize>,
    pub ai_limit: Option<usize>,
    /// Where to save the report; None keeps it in memory only
    pub report_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub report: CompletionReport,
    pub report_path: Option<PathBuf>,
    pub elapsed: Duration,
}

pub struct CompletionWorkflow {
    primary: SqlitePool,
    source: Option<SqlitePool>,
    scheduler: Option<EnrichmentScheduler>,
}

impl CompletionWorkflow {
    pub fn new(primary: SqlitePool, source: Option<SqlitePool>, client: Option<EnrichmentClient>) -> Self {
        let scheduler = client.map(|c| EnrichmentScheduler::new(primary.clone(), c));
        Self {
            primary,
            source,
            scheduler,
        }
    }

    pub async fn run(&self, preset: Preset, options: WorkflowOptions) -> Result<WorkflowOutcome> {
        let started = Instant::now();
        let cedict_limit = options.cedict_limit.unwrap_or_else(|| preset.cedict_limit());
        let ai_limit = options.ai_limit.unwrap_or_else(|| preset.ai_limit());

        info!(?preset, cedict_limit, ai_limit, "Starting dictionary completion workflow");

        let initial = completion_reporter::coverage(&self.primary).await?;
        info!(
            "Initial state: {} entries, English {:.1}%, Vietnamese {:.1}%",
            initial.total_entries,
            initial.english_rate(),
            initial.vietnamese_rate()
        );

        let integration = self.integrate(cedict_limit).await;
        let enhanced = self.enhance(ai_limit).await;

        let quality = completion_reporter::quality_check(&self.primary).await?;
        let final_stats = completion_reporter::coverage(&self.primary).await?;

        let report = CompletionReport {
            initial,
            final_stats,
            quality,
            integration,
            enhanced,
        };

        let report_path = match &options.report_dir {
            Some(dir) => Some(report.write_to(dir).await?),
            None => None,
        };

        let elapsed = started.elapsed();
        info!(
            "Workflow completed in {:.1} seconds (overall score {:+.1} points)",
            elapsed.as_secs_f64(),
            report.improvement()
        );

        Ok(WorkflowOutcome {
            report,
            report_path,
            elapsed,
        })
    }

    async fn integrate(&self, capacity: usize) -> Option<IntegrationSummary> {
        let Some(source) = &self.source else {
            warn!("Source store not available, skipping CC-CEDICT integration");
            return None;
        };

        let reconciler = Reconciler::new(self.primary.clone(), source.clone());
        match reconciler.integrate(capacity).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("CC-CEDICT integration failed: {}", e);
                None
            }
        }
    }

    async fn enhance(&self, max_entries: usize) -> usize {
        let Some(scheduler) = &self.scheduler else {
            warn!("No API key configured, skipping AI enhancement");
            return 0;
        };

        match scheduler.enhance_batch(AI_BATCH_SIZE, max_entries).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                error!("AI enhancement failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Preset::Quick.cedict_limit(), 1_000);
        assert_eq!(Preset::Quick.ai_limit(), 100);
        assert_eq!(Preset::Standard.cedict_limit(), 10_000);
        assert_eq!(Preset::Standard.ai_limit(), 1_000);
    }
}
