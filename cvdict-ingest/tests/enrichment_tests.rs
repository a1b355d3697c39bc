//! Enrichment scheduler integration tests
//!
//! The generative API is replaced by a scripted backend; the Primary Store
//! is a real SQLite file.

mod helpers;

use cvdict_common::db::AI_SOURCE;
use cvdict_ingest::db::entries::{self, NewEntry};
use cvdict_ingest::services::EnrichmentScheduler;
use helpers::{add_entry, create_test_stores, entry_by_word, ScriptedBackend};
use std::collections::HashSet;

#[tokio::test]
async fn test_budget_limits_processed_entries() {
    let stores = create_test_stores().await;
    for i in 0..25 {
        add_entry(&stores.primary, &format!("词{i:02}"), "").await;
    }

    let backend = ScriptedBackend::well_formed();
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(10, 15)
        .await
        .unwrap();

    assert_eq!(enhanced, 15);

    // Four calls per entry, each entry visited once
    let requests = backend.requests();
    assert_eq!(requests.len(), 60);
    let words: HashSet<String> = entries::load_all_entries(&stores.primary)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| requests.iter().any(|r| r.prompt.contains(&e.word)))
        .map(|e| e.word)
        .collect();
    assert_eq!(words.len(), 15);

    let all = entries::load_all_entries(&stores.primary).await.unwrap();
    let translated = all
        .iter()
        .filter(|e| e.vi_meaning.as_deref() == Some("học sinh"))
        .count();
    assert_eq!(translated, 15);

    // Ascending id within equal frequency rank
    assert_eq!(all[0].vi_meaning.as_deref(), Some("học sinh"));
    assert_eq!(all[24].vi_meaning.as_deref(), Some(""));

    let remaining = entries::select_incomplete(&stores.primary, 100, &[]).await.unwrap();
    assert_eq!(remaining.len(), 10);
}

#[tokio::test]
async fn test_enriched_entry_gets_every_field() {
    let stores = create_test_stores().await;
    let id = add_entry(&stores.primary, "学生", "").await;

    let backend = ScriptedBackend::well_formed();
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(20, 100)
        .await
        .unwrap();

    assert_eq!(enhanced, 1);
    let entry = entries::load_entry(&stores.primary, id).await.unwrap().unwrap();
    assert_eq!(entry.pinyin.as_deref(), Some("xué sheng"));
    assert_eq!(entry.zhuyin.as_deref(), Some("ㄒㄩㄝˊ ˙ㄕㄥ"));
    assert_eq!(entry.hanviet_reading.as_deref(), Some("học sinh"));
    assert_eq!(entry.vi_meaning.as_deref(), Some("học sinh"));
    assert_eq!(entry.part_of_speech.as_deref(), Some("noun"));
    assert!(entry.grammar_info.unwrap().contains("neutral"));

    let examples = entries::load_examples(&stores.primary, id).await.unwrap();
    assert_eq!(examples.len(), 1);
    assert_eq!(examples[0].chinese, "他是学生。");
    assert_eq!(examples[0].source.as_deref(), Some(AI_SOURCE));

    // The examples prompt carries the fresh translation as context
    let requests = backend.requests();
    let examples_prompt = requests
        .iter()
        .find(|r| r.prompt.contains("JSON array"))
        .unwrap();
    assert!(examples_prompt.prompt.contains("Vietnamese meaning: học sinh"));
}

#[tokio::test]
async fn test_existing_values_survive_enrichment() {
    let stores = create_test_stores().await;
    let id = entries::insert_entry(
        &stores.primary,
        &NewEntry {
            word: "你好".to_string(),
            pinyin: Some("nǐ hǎo".to_string()),
            vi_meaning: "xin chào".to_string(),
            en_meaning: Some("hello".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let backend = ScriptedBackend::well_formed();
    EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(20, 100)
        .await
        .unwrap();

    let entry = entries::load_entry(&stores.primary, id).await.unwrap().unwrap();
    assert_eq!(entry.pinyin.as_deref(), Some("nǐ hǎo"));
    assert_eq!(entry.vi_meaning.as_deref(), Some("xin chào"));
    assert_eq!(entry.en_meaning.as_deref(), Some("hello"));
    assert_eq!(entry.zhuyin.as_deref(), Some("ㄒㄩㄝˊ ˙ㄕㄥ"));

    // Translation already present, so no translation request
    assert!(!backend
        .requests()
        .iter()
        .any(|r| r.prompt.contains("Vietnamese translation")));
}

#[tokio::test]
async fn test_malformed_output_writes_nothing() {
    let stores = create_test_stores().await;
    add_entry(&stores.primary, "学生", "học sinh").await;

    let backend = ScriptedBackend::replying("Sorry, I cannot help with that. no json here");
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(20, 100)
        .await
        .unwrap();

    assert_eq!(enhanced, 0);
    // Pronunciation, examples and grammar; each entry only once
    assert_eq!(backend.request_count(), 3);

    let entry = entry_by_word(&stores.primary, "学生").await.remove(0);
    assert!(entry.zhuyin.is_none());
    assert!(entry.hanviet_reading.is_none());
    assert!(entry.grammar_info.is_none());
    assert!(entries::load_examples(&stores.primary, entry.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unreachable_api_is_absorbed() {
    let stores = create_test_stores().await;
    for word in ["一", "二", "三"] {
        add_entry(&stores.primary, word, "").await;
    }

    let backend = ScriptedBackend::unreachable();
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(2, 10)
        .await
        .unwrap();

    assert_eq!(enhanced, 0);
    assert_eq!(backend.request_count(), 12);
    for entry in entries::load_all_entries(&stores.primary).await.unwrap() {
        assert_eq!(entry.vi_meaning.as_deref(), Some(""));
        assert!(entry.updated_at == entry.created_at);
    }
}

#[tokio::test]
async fn test_zero_budget_makes_no_calls() {
    let stores = create_test_stores().await;
    add_entry(&stores.primary, "学生", "").await;

    let backend = ScriptedBackend::well_formed();
    let scheduler = EnrichmentScheduler::new(stores.primary.clone(), backend.client());

    assert_eq!(scheduler.enhance_batch(20, 0).await.unwrap(), 0);
    assert_eq!(scheduler.enhance_batch(0, 20).await.unwrap(), 0);
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_failed_write_rolls_back_that_entry_only() {
    let stores = create_test_stores().await;
    let blocked = add_entry(&stores.primary, "一", "").await;
    let open = add_entry(&stores.primary, "二", "").await;
    sqlx::query(
        "CREATE TRIGGER block_update BEFORE UPDATE ON dictionary WHEN NEW.word = '一' \
         BEGIN SELECT RAISE(ABORT, 'blocked'); END",
    )
    .execute(&stores.primary)
    .await
    .unwrap();

    let backend = ScriptedBackend::well_formed();
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(5, 10)
        .await
        .unwrap();

    assert_eq!(enhanced, 1);

    let entry = entries::load_entry(&stores.primary, blocked).await.unwrap().unwrap();
    assert_eq!(entry.vi_meaning.as_deref(), Some(""));
    assert!(entries::load_examples(&stores.primary, blocked)
        .await
        .unwrap()
        .is_empty());

    let entry = entries::load_entry(&stores.primary, open).await.unwrap().unwrap();
    assert_eq!(entry.vi_meaning.as_deref(), Some("học sinh"));
    assert_eq!(
        entries::load_examples(&stores.primary, open).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_refusal_is_not_stored_as_translation() {
    let stores = create_test_stores().await;
    add_entry(&stores.primary, "学生", "").await;

    let backend = ScriptedBackend::replying("Sorry, I cannot translate this word.");
    let enhanced = EnrichmentScheduler::new(stores.primary.clone(), backend.client())
        .enhance_batch(20, 100)
        .await
        .unwrap();

    assert_eq!(enhanced, 0);
    let entry = entry_by_word(&stores.primary, "学生").await.remove(0);
    assert_eq!(entry.vi_meaning.as_deref(), Some(""));
}
