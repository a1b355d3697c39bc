//! CC-CEDICT Reconciler
//!
//! Merges Source Store knowledge into the Primary Store in three phases:
//!
//! 1. **Match**: bind each Primary entry to at most one Source entry by
//!    simplified-form equality, falling back to traditional-form equality.
//!    Pure over two read-only snapshots ([`SourceIndex`], entry list).
//! 2. **Update**: per bound pair, build an [`EntryPatch`] and write it only
//!    to empty fields. One failing pair is logged and skipped.
//! 3. **Insert**: walk Source entries shortest-first and insert up to
//!    `capacity` whose forms are not yet an identity in the Primary Store.
//!    Translation stays empty for the enrichment scheduler.
//!
//! Merge strategy: fill-only. Never overwrites, never deletes.

use cvdict_common::db::{
    sync_dictionary_schema, EntryPatch, LexicalEntry, SourceEntry, CEDICT_SOURCE,
};
use cvdict_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::db::{entries, sources};

const CANDIDATE_PAGE_SIZE: i64 = 500;
const INSERT_COMMIT_INTERVAL: usize = 100;
const MATCH_PROGRESS_INTERVAL: usize = 1000;
const UPDATE_PROGRESS_INTERVAL: usize = 100;

/// Read-only lookup over Source Store entries
///
/// When several entries share a form, the first one in load order wins.
#[derive(Debug, Default)]
pub struct SourceIndex {
    entries: Vec<SourceEntry>,
    by_simplified: HashMap<String, usize>,
    by_traditional: HashMap<String, usize>,
}

impl SourceIndex {
    pub fn new(entries: Vec<SourceEntry>) -> Self {
        let mut by_simplified = HashMap::new();
        let mut by_traditional = HashMap::new();

        for (i, entry) in entries.iter().enumerate() {
            by_simplified.entry(entry.simplified.clone()).or_insert(i);
            by_traditional.entry(entry.traditional.clone()).or_insert(i);
        }

        Self {
            entries,
            by_simplified,
            by_traditional,
        }
    }

    /// Snapshot the Source Store in id order
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        Ok(Self::new(sources::load_all_sources(pool).await?))
    }

    /// Simplified match first, traditional as fallback
    pub fn lookup(&self, word: &str) -> Option<&SourceEntry> {
        self.by_simplified
            .get(word)
            .or_else(|| self.by_traditional.get(word))
            .map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A Primary entry bound to the Source entry it matched
#[derive(Debug, Clone, Copy)]
pub struct BoundPair<'a> {
    pub entry: &'a LexicalEntry,
    pub source: &'a SourceEntry,
}

/// Bind every entry to at most one Source entry
pub fn match_entries<'a>(entries: &'a [LexicalEntry], index: &'a SourceIndex) -> Vec<BoundPair<'a>> {
    let mut pairs = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        if i > 0 && i % MATCH_PROGRESS_INTERVAL == 0 {
            info!("Processed {}/{} entries for matching...", i, entries.len());
        }

        if let Some(source) = index.lookup(&entry.word) {
            pairs.push(BoundPair { entry, source });
        }
    }

    pairs
}

/// Candidate field values a Source entry offers
///
/// Duplicate forms are only offered when they actually differ. The caller
/// restricts the patch to the entry's empty fields.
pub fn source_patch(source: &SourceEntry) -> EntryPatch {
    let differs = source.traditional != source.simplified;

    EntryPatch {
        en_meaning: Some(source.english.clone()),
        pinyin: Some(source.pinyin.clone()),
        traditional: differs.then(|| source.traditional.clone()),
        simplified: differs.then(|| source.simplified.clone()),
        cedict_definitions: (!source.definition_list().is_empty())
            .then(|| source.definitions.clone()),
        ..Default::default()
    }
}

/// New Primary entry built from a Source entry
pub fn new_entry_from_source(source: &SourceEntry) -> entries::NewEntry {
    entries::NewEntry {
        word: source.simplified.clone(),
        traditional: source.distinct_traditional().map(str::to_string),
        simplified: Some(source.simplified.clone()),
        pinyin: Some(source.pinyin.clone()),
        // Left for the enrichment scheduler
        vi_meaning: String::new(),
        en_meaning: Some(source.english.clone()),
        cedict_definitions: Some(source.definitions.clone()),
        source: Some(CEDICT_SOURCE.to_string()),
        ..Default::default()
    }
}

/// Outcome of one `integrate` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationSummary {
    pub matched_count: usize,
    pub updated_count: usize,
    pub inserted_count: usize,
    pub total_before: i64,
    pub total_after: i64,
}

/// Primary/Source reconciliation
pub struct Reconciler {
    primary: SqlitePool,
    source: SqlitePool,
}

impl Reconciler {
    pub fn new(primary: SqlitePool, source: SqlitePool) -> Self {
        Self { primary, source }
    }

    /// Run match, update and insert phases
    ///
    /// Only store-level faults (schema sync, snapshot reads) are returned as
    /// errors; per-record faults are logged and skipped.
    pub async fn integrate(&self, capacity: usize) -> Result<IntegrationSummary> {
        info!("Starting CC-CEDICT integration (capacity {})", capacity);

        let sync = sync_dictionary_schema(&self.primary).await?;
        if !sync.added_columns.is_empty() {
            info!("Added dictionary columns: {}", sync.added_columns.join(", "));
        }

        let total_before = entries::count_entries(&self.primary).await?;
        let index = SourceIndex::load(&self.source).await?;
        info!(
            "Primary store: {} entries, source store: {} entries",
            total_before,
            index.len()
        );

        let snapshot = entries::load_all_entries(&self.primary).await?;
        let pairs = match_entries(&snapshot, &index);
        info!("Found {} matching entries", pairs.len());

        let updated_count = self.update_matches(&pairs).await;
        let inserted_count = self.insert_new_entries(capacity).await?;

        let total_after = entries::count_entries(&self.primary).await?;

        let summary = IntegrationSummary {
            matched_count: pairs.len(),
            updated_count,
            inserted_count,
            total_before,
            total_after,
        };
        info!(?summary, "Integration complete");

        Ok(summary)
    }

    /// Update phase; returns the number of entries that received new values
    async fn update_matches(&self, pairs: &[BoundPair<'_>]) -> usize {
        let mut updated = 0;

        for (i, pair) in pairs.iter().enumerate() {
            if i > 0 && i % UPDATE_PROGRESS_INTERVAL == 0 {
                debug!("Updated {}/{} matched entries...", i, pairs.len());
            }

            let patch = source_patch(pair.source).restricted_to_empty(pair.entry);
            if patch.is_empty() {
                continue;
            }

            match entries::apply_patch(&self.primary, pair.entry.id, &patch).await {
                Ok(_) => {
                    debug!(
                        word = %pair.entry.word,
                        fields = ?patch.field_names(),
                        "Merged CC-CEDICT fields"
                    );
                    updated += 1;
                }
                Err(e) => {
                    warn!(word = %pair.entry.word, stage = "update", "Merge failed: {}", e);
                }
            }
        }

        info!("Updated {} entries with CC-CEDICT data", updated);
        updated
    }

    /// Insert phase; returns the number of new entries
    async fn insert_new_entries(&self, capacity: usize) -> Result<usize> {
        if capacity == 0 {
            return Ok(0);
        }

        let mut identities: HashSet<String> = entries::existing_identities(&self.primary).await?;
        let mut inserted = 0;
        let mut offset = 0;
        let mut tx = self.primary.begin().await?;

        'pages: loop {
            let page =
                sources::load_candidate_page(&self.source, offset, CANDIDATE_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len() as i64;

            for source in &page {
                if identities.contains(&source.simplified) || identities.contains(&source.traditional)
                {
                    continue;
                }

                match entries::insert_entry(&mut *tx, &new_entry_from_source(source)).await {
                    Ok(_) => {
                        identities.insert(source.simplified.clone());
                        identities.insert(source.traditional.clone());
                        inserted += 1;

                        if inserted % INSERT_COMMIT_INTERVAL == 0 {
                            tx.commit().await?;
                            info!("Added {} new entries...", inserted);
                            tx = self.primary.begin().await?;
                        }
                    }
                    Err(e) => {
                        warn!(word = %source.simplified, stage = "insert", "Insert failed: {}", e);
                    }
                }

                if inserted >= capacity {
                    break 'pages;
                }
            }
        }

        tx.commit().await?;
        info!("Added {} new entries from CC-CEDICT", inserted);
        Ok(inserted)
    }
}
