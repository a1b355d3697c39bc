//! Completion workflow integration tests

mod helpers;

use cvdict_ingest::services::{CompletionWorkflow, Preset, WorkflowOptions};
use helpers::{add_entry, add_source, create_test_stores, ScriptedBackend};

#[tokio::test]
async fn test_workflow_without_source_or_client_only_reports() {
    let stores = create_test_stores().await;
    add_entry(&stores.primary, "你好", "xin chào").await;

    let outcome = CompletionWorkflow::new(stores.primary.clone(), None, None)
        .run(Preset::Quick, WorkflowOptions::default())
        .await
        .unwrap();

    let report = &outcome.report;
    assert!(report.integration.is_none());
    assert_eq!(report.enhanced, 0);
    assert_eq!(report.initial.total_entries, 1);
    assert_eq!(report.final_stats.total_entries, 1);
    assert_eq!(report.improvement(), 0.0);
    assert!(outcome.report_path.is_none());
    assert!(report.render().contains("(skipped)"));
}

#[tokio::test]
async fn test_full_workflow_improves_coverage_and_saves_report() {
    let stores = create_test_stores().await;
    add_entry(&stores.primary, "你好", "").await;
    add_source(&stores.source, "你好", "你好", "ni3 hao3", "hello").await;
    add_source(&stores.source, "學生", "学生", "xue2 sheng5", "student").await;

    let backend = ScriptedBackend::well_formed();
    let report_dir = stores.dir.path().join("reports");

    let outcome = CompletionWorkflow::new(
        stores.primary.clone(),
        Some(stores.source.clone()),
        Some(backend.client()),
    )
    .run(
        Preset::Quick,
        WorkflowOptions {
            cedict_limit: Some(10),
            ai_limit: Some(5),
            report_dir: Some(report_dir.clone()),
        },
    )
    .await
    .unwrap();

    let report = &outcome.report;
    let integration = report.integration.unwrap();
    assert_eq!(integration.matched_count, 1);
    assert_eq!(integration.inserted_count, 1);
    assert_eq!(report.enhanced, 2);
    assert_eq!(report.final_stats.total_entries, 2);
    assert!(report.improvement() > 0.0);
    assert_eq!(report.final_stats.vietnamese_rate(), 100.0);

    let path = outcome.report_path.unwrap();
    assert!(path.starts_with(&report_dir));
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("completion_report_") && name.ends_with(".txt"));

    let saved = std::fs::read_to_string(&path).unwrap();
    assert_eq!(saved, report.render());
    assert!(saved.contains("OVERALL COMPLETION SCORE"));
}
