//! S3/S4 — filename detection, normalization, and remediation.

use crate::prelude::*;
use std::fs;
use syncd_core::{check_name, normalize_name, Clock, IssueKind, JobStatus, SystemClock};
use syncd_engine::preflight::{rename_all_pending, rename_issue};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn detection_flags_the_expected_names() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("report:final.txt", 10);
    ws.write_source_file("notes *draft", 10);
    ws.write_source_file("trailing ", 10);
    ws.write_source_file("ok.txt", 10);
    let id = ws.job("s3", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let issues = ws.engine.issue_store().for_job(&id);
    assert_eq!(issues.len(), 3);
    let kind_of = |name: &str| issues.iter().find(|i| i.file_name == name).map(|i| i.kind);
    assert_eq!(kind_of("report:final.txt"), Some(IssueKind::Colon));
    assert_eq!(kind_of("notes *draft"), Some(IssueKind::Asterisk));
    assert_eq!(kind_of("trailing "), Some(IssueKind::TrailingSpace));
    assert_eq!(kind_of("ok.txt"), None);

    let suggested = |name: &str| {
        issues
            .iter()
            .find(|i| i.file_name == name)
            .and_then(|i| i.suggested_name.clone())
    };
    assert_eq!(suggested("report:final.txt").as_deref(), Some("report-final.txt"));
    assert_eq!(suggested("notes *draft").as_deref(), Some("notes _draft"));
    assert_eq!(suggested("trailing ").as_deref(), Some("trailing"));
}

#[test]
fn normalization_edge_cases() {
    assert_eq!(normalize_name("???"), "___");
    assert_eq!(normalize_name("   "), "_renamed_");
    assert!(check_name("___").is_none());
    assert!(check_name("_renamed_").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sweep_renames_every_pending_issue() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("a:b", 10);
    ws.write_source_file("c|d", 10);
    let id = ws.job("sweep", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let store = ws.engine.issue_store();
    let summary = rename_all_pending(store, Some(&id), SystemClock.now_utc());
    assert_eq!(summary.total, 2);
    assert_eq!(summary.renamed, 2);
    assert_eq!(summary.failed, 0);
    assert!(ws.source.join("a-b").exists());
    assert!(ws.source.join("c-d").exists());
    assert!(!ws.source.join("a:b").exists());

    // A re-scan finds a clean tree
    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;
    assert!(store.for_job(&id).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn explicit_rename_overrides_the_suggestion() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("bad<name", 10);
    let id = ws.job("explicit", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    let store = ws.engine.issue_store();
    let issue = store.for_job(&id).remove(0);
    rename_issue(store, &issue.id, Some("good-name"), SystemClock.now_utc()).unwrap();
    assert!(ws.source.join("good-name").exists());

    // Remediation persisted to the issue file
    let reloaded = syncd_storage::IssueStore::load(ws.dir.path().join("filename_issues.json"));
    assert_eq!(
        reloaded.get(&issue.id).unwrap().status,
        syncd_core::IssueStatus::Renamed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn issues_do_not_block_the_sync() {
    let ws = Workspace::new("exit 0");
    ws.write_source_file("report:final.txt", 10);
    let id = ws.job("advisory", 1, &[]);

    ws.engine.start(&id).unwrap();
    ws.wait_terminal(&id).await;

    assert_eq!(
        ws.engine.job_store().get(&id).unwrap().status,
        JobStatus::Completed
    );
}
