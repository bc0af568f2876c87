//! Integration tests for [`DetailController`] driven by a [`MockBackend`].

use std::sync::Arc;

use labo_core::backend::MockBackend;
use labo_core::{
    DetailController, DetailError, DetailOutcome, DetailPhase, ReportId, TransportError,
    UNKNOWN_AUTHOR, UNTITLED,
};
use serde_json::json;

fn controller(mock: MockBackend, id: &str) -> (Arc<MockBackend>, DetailController) {
    let mock = Arc::new(mock);
    let controller = DetailController::new(mock.clone(), ReportId::from(id));
    (mock, controller)
}

#[tokio::test]
async fn loads_and_normalizes_detail_fields() {
    let record = json!({
        "record_no": 12,
        "r_title": "Sandbox afternoon",
        "r_date": "2024-06-01T09:30:00Z",
        "video_url": "https://cdn.example/clips/12.MP4",
        "r_content": "Played calmly with peers.",
        "highlights": [{"start": 12, "end": 18, "label": "shares toy"}],
        "behavior_stats": {"smiles": 4}
    });
    let (_, mut c) = controller(MockBackend::with_records(vec![]).with_detail(12u64, record), "12");

    let vm = c.load_one().await.unwrap();
    assert_eq!(vm.phase, DetailPhase::Ready);
    let report = vm.report.unwrap();
    assert_eq!(report.report.title, "Sandbox afternoon");
    assert!(vm.is_video_media);
    assert_eq!(vm.display_date, "2024-06-01");
    assert_eq!(vm.summary_text, "Played calmly with peers.");
    assert_eq!(vm.highlight_captions, vec!["[12s ~ 18s] shares toy"]);
    assert_eq!(report.behavior_stats["smiles"], 4);
}

#[tokio::test]
async fn record_without_fields_uses_route_id() {
    let (_, mut c) = controller(MockBackend::with_records(vec![]).with_detail("abc", json!({})), "abc");

    let vm = c.load_one().await.unwrap();
    let report = vm.report.unwrap();
    assert_eq!(report.report.id.as_str(), "abc");
    assert_eq!(report.report.title, UNTITLED);
    assert_eq!(report.report.author, UNKNOWN_AUTHOR);
    assert_eq!(report.video_url, "");
    assert!(!vm.is_video_media);
    assert_eq!(vm.display_date, "-");
    assert_eq!(vm.summary_text, "No summary available.");
    assert!(vm.highlight_captions.is_empty());
}

#[tokio::test]
async fn thumbnail_is_not_video() {
    let record = json!({"thumbnail_url": "https://cdn.example/thumb.png"});
    let (_, mut c) = controller(MockBackend::with_records(vec![]).with_detail(3u64, record), "3");
    let vm = c.load_one().await.unwrap();
    assert!(!vm.is_video_media);
    assert_eq!(vm.report.unwrap().video_url, "https://cdn.example/thumb.png");
}

#[tokio::test]
async fn not_found_enters_error() {
    let (_, mut c) = controller(MockBackend::with_records(vec![]), "404");
    let err = c.load_one().await.unwrap_err();
    assert!(matches!(err, DetailError::Transport(TransportError::NotFound(_))));
    assert!(matches!(c.phase(), DetailPhase::Error { .. }));
    assert!(c.view_model().report.is_none());
}

#[tokio::test]
async fn delete_navigates_back() {
    let (mock, mut c) = controller(
        MockBackend::with_records(vec![]).with_detail(5u64, json!({"id": 5})),
        "5",
    );
    c.load_one().await.unwrap();
    assert_eq!(c.delete_one().await.unwrap(), DetailOutcome::NavigateToList);
    assert_eq!(mock.deleted(), vec![ReportId::from(5u64)]);
}

#[tokio::test]
async fn failed_delete_keeps_report_displayed() {
    let (_, mut c) = controller(
        MockBackend::with_records(vec![])
            .with_detail(5u64, json!({"id": 5, "title": "Keep me"}))
            .failing_delete(5u64),
        "5",
    );
    c.load_one().await.unwrap();

    assert!(matches!(c.delete_one().await, Err(DetailError::Transport(_))));
    let vm = c.view_model();
    assert_eq!(vm.phase, DetailPhase::Ready);
    assert_eq!(vm.report.unwrap().report.title, "Keep me");
    assert_eq!(vm.notice.as_deref(), Some("Could not delete the report."));
}

#[tokio::test]
async fn delete_before_load_is_rejected() {
    let (mock, mut c) = controller(MockBackend::with_records(vec![]), "5");
    assert!(matches!(
        c.delete_one().await,
        Err(DetailError::NotReady { phase: "loading" })
    ));
    assert_eq!(mock.delete_calls(), 0);
}

#[tokio::test]
async fn transport_error_on_fetch() {
    let (_, mut c) = controller(MockBackend::with_records(vec![]).with_fetch_error("reset"), "1");
    assert!(matches!(
        c.load_one().await,
        Err(DetailError::Transport(TransportError::Backend(_)))
    ));
}
