//! Enrichment scheduler
//!
//! Pulls incomplete entries in priority order (descending frequency rank,
//! then id) and fills them through the [`EnrichmentClient`]. Each entry gets
//! up to four calls (pronunciation, translation, examples, grammar), each
//! only when the target field or collection is still empty. Results are
//! merged fill-only and committed in one transaction per entry.
//!
//! Entries attempted during a run are not selected again in that run, so a
//! record the model cannot help with does not consume the whole budget.

use cvdict_common::db::{is_blank, sync_dictionary_schema, EntryPatch};
use cvdict_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::enrichment_client::EnrichmentClient;
use crate::db::entries::{self, EnrichmentCandidate};

const PROGRESS_INTERVAL: usize = 10;

pub struct EnrichmentScheduler {
    pool: SqlitePool,
    client: EnrichmentClient,
}

impl EnrichmentScheduler {
    pub fn new(pool: SqlitePool, client: EnrichmentClient) -> Self {
        Self { pool, client }
    }

    /// Enrich up to `max_entries` entries, `batch_size` per selection query
    ///
    /// Stops when no candidates remain or the budget is spent. Returns the
    /// number of entries that received at least one new field or example.
    pub async fn enhance_batch(&self, batch_size: usize, max_entries: usize) -> Result<usize> {
        if batch_size == 0 || max_entries == 0 {
            return Ok(0);
        }

        sync_dictionary_schema(&self.pool).await?;
        info!(
            "Starting enrichment: batch size {}, max entries {}",
            batch_size, max_entries
        );

        let mut attempted: Vec<i64> = Vec::new();
        let mut processed = 0;
        let mut enhanced = 0;

        loop {
            if processed >= max_entries {
                info!("Reached max entries limit ({})", max_entries);
                break;
            }

            let limit = batch_size.min(max_entries - processed);
            let batch = entries::select_incomplete(&self.pool, limit as i64, &attempted).await?;
            if batch.is_empty() {
                info!("No more entries need enhancement");
                break;
            }

            debug!("Selected batch of {} entries", batch.len());

            for candidate in &batch {
                attempted.push(candidate.entry.id);

                match self.enhance_entry(candidate).await {
                    Ok(true) => enhanced += 1,
                    Ok(false) => {
                        debug!(word = %candidate.entry.word, "Nothing to add");
                    }
                    Err(e) => {
                        warn!(
                            word = %candidate.entry.word,
                            stage = "enrichment",
                            "Entry enhancement failed: {}",
                            e
                        );
                    }
                }

                processed += 1;
                if processed % PROGRESS_INTERVAL == 0 {
                    info!("Progress: {} processed, {} enhanced", processed, enhanced);
                }
            }
        }

        info!(processed, enhanced, "Enrichment complete");
        Ok(enhanced)
    }

    /// Enrich one entry; true when anything was written
    pub async fn enhance_entry(&self, candidate: &EnrichmentCandidate) -> Result<bool> {
        let entry = &candidate.entry;
        let word = entry.word.as_str();
        let mut patch = EntryPatch::default();

        if is_blank(&entry.pinyin) || is_blank(&entry.zhuyin) || is_blank(&entry.hanviet_reading) {
            if let Some(pronunciation) = self.client.pronunciation(word).await {
                patch.pinyin = pronunciation.marked_pinyin();
                patch.zhuyin = pronunciation.zhuyin;
                patch.hanviet_reading = pronunciation.hanviet;
            }
        }

        if is_blank(&entry.vi_meaning) {
            patch.vi_meaning = self
                .client
                .translation(word, entry.en_meaning.as_deref())
                .await;
        }

        let examples = if candidate.has_examples {
            Vec::new()
        } else {
            let translation = [&patch.vi_meaning, &entry.vi_meaning]
                .into_iter()
                .find(|v| !is_blank(v))
                .and_then(|v| v.as_deref());
            self.client.examples(word, translation).await
        };

        if is_blank(&entry.grammar_info) {
            if let Some(grammar) = self.client.grammar(word).await {
                patch.part_of_speech = grammar.part_of_speech.clone();
                patch.grammar_info = Some(serde_json::to_string(&grammar)?);
            }
        }

        let patch = patch.restricted_to_empty(entry);
        if patch.is_empty() && examples.is_empty() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        if !patch.is_empty() {
            entries::apply_patch(&mut *tx, entry.id, &patch).await?;
        }
        if !examples.is_empty() {
            entries::insert_examples(&mut *tx, entry.id, &examples).await?;
        }
        tx.commit().await?;

        info!(
            word = %word,
            fields = ?patch.field_names(),
            examples = examples.len(),
            "Enhanced entry"
        );
        Ok(true)
    }
}
