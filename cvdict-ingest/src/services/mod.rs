//! Service modules for the dictionary completion pipeline
//!
//! Importers fill the stores, the reconciler and enrichment scheduler
//! complete entries, and the reporter and lookup read the result.

pub mod cedict_importer;
pub mod completion_backend;
pub mod completion_reporter;
pub mod enrichment_client;
pub mod enrichment_scheduler;
pub mod lookup;
pub mod rate_limiter;
pub mod reconciler;
pub mod response_extractor;
pub mod seed_importer;
pub mod side_table_merger;
pub mod workflow;

pub use cedict_importer::{parse_cedict_line, CedictImporter, CedictRecord, ImportStats, SourceStats};
pub use completion_backend::{CompletionBackend, CompletionRequest, DeepSeekBackend};
pub use completion_reporter::{CompletionReport, CoverageStats, QualityCheck};
pub use enrichment_client::{
    EnrichError, Enrichment, EnrichmentClient, FieldKind, FieldRequest, GrammarInfo, Pronunciation,
};
pub use enrichment_scheduler::EnrichmentScheduler;
pub use lookup::{EntryDetails, LexiconStats, Lookup};
pub use rate_limiter::RateLimiter;
pub use reconciler::{IntegrationSummary, Reconciler, SourceIndex};
pub use response_extractor::{extract_json, Bracket, ExtractError};
pub use seed_importer::{SeedImportStats, SeedImporter};
pub use side_table_merger::{SideTable, SideTableMerger};
pub use workflow::{CompletionWorkflow, Preset, WorkflowOptions, WorkflowOutcome};
