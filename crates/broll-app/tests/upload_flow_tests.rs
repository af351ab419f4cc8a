//! Integration tests for the upload/plan flow through the app orchestration.

mod common;

use broll_api_contract::{SERVER_RETRY_SUFFIX, TIMEOUT_MESSAGE, TransportFailure};
use broll_app::submit_upload;
use broll_auth::{MemorySessionStore, SessionStore, TOKEN_KEY};
use broll_core::MediaFile;
use broll_ui::{Affordance, EditorState, ResultView, SubmitBlocked};
use common::{ScriptedUpload, ready_editor, upload_client};

const ONE_INSERTION: &str = r#"{
    "status": "Success",
    "data": {
        "plan": {"insertions": [
            {"start_sec": 3.5, "duration_sec": 2.0, "broll_id": "city.mp4", "reason": "context"}
        ]},
        "meta": {"processing_time_ms": 8100, "clip_count": 2}
    }
}"#;

fn plan_view(editor: &EditorState) -> broll_ui::PlanView {
    match editor.result_view() {
        ResultView::Plan(view) => view,
        other => panic!("expected a plan, got {other:?}"),
    }
}

#[test]
fn upload_flow_tests_blocked_submits_send_nothing() {
    let transport = ScriptedUpload::replying(Ok(ONE_INSERTION.to_string()));
    let client = upload_client(transport.clone());
    let store = MemorySessionStore::default();

    let mut editor = EditorState::new();
    assert_eq!(
        submit_upload(&mut editor, &client, &store, &mut |_| {}),
        Err(SubmitBlocked::MissingPrimary)
    );

    editor.set_primary(MediaFile::from_bytes("talk.mp4", vec![0; 4]));
    assert_eq!(
        submit_upload(&mut editor, &client, &store, &mut |_| {}),
        Err(SubmitBlocked::MissingSecondary)
    );

    let mut busy = ready_editor();
    busy.begin_submission().expect("first submit should start");
    assert_eq!(
        submit_upload(&mut busy, &client, &store, &mut |_| {}),
        Err(SubmitBlocked::AlreadySubmitting)
    );

    assert_eq!(transport.request_count(), 0);
}

#[test]
fn upload_flow_tests_single_insertion_offers_preview_and_export() {
    let transport = ScriptedUpload::replying(Ok(ONE_INSERTION.to_string()));
    let client = upload_client(transport.clone());
    let store = MemorySessionStore::default();
    store.set(TOKEN_KEY, "T").expect("set should work");
    let mut editor = ready_editor();
    let mut seen = Vec::new();

    submit_upload(&mut editor, &client, &store, &mut |percent| seen.push(percent))
        .expect("ready editor should submit");

    let view = plan_view(&editor);
    assert_eq!(view.degradation, None);
    assert_eq!(
        view.affordances,
        vec![Affordance::Preview, Affordance::Export]
    );
    assert_eq!(view.processing_time.as_deref(), Some("8.1s"));
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        transport.tokens.lock().expect("tokens lock").as_slice(),
        &[Some("T".to_string())]
    );
}

#[test]
fn upload_flow_tests_empty_insertions_degrade_to_retry() {
    let transport = ScriptedUpload::replying(Ok(
        r#"{"status":"Success","data":{"plan":{"insertions":[]}}}"#.to_string(),
    ));
    let client = upload_client(transport.clone());
    let store = MemorySessionStore::default();
    let mut editor = ready_editor();

    submit_upload(&mut editor, &client, &store, &mut |_| {}).expect("ready editor should submit");

    let view = plan_view(&editor);
    assert!(view.degradation.is_some());
    assert_eq!(view.affordances, vec![Affordance::Retry]);
    assert_eq!(transport.tokens.lock().expect("tokens lock")[0], None);
}

#[test]
fn upload_flow_tests_server_error_without_body_suggests_retry() {
    let transport = ScriptedUpload::replying(Err(TransportFailure::status(500, None)));
    let client = upload_client(transport);
    let store = MemorySessionStore::default();
    let mut editor = ready_editor();

    submit_upload(&mut editor, &client, &store, &mut |_| {}).expect("ready editor should submit");

    let banner = editor.error_banner().expect("failure should be shown");
    assert!(banner.ends_with(SERVER_RETRY_SUFFIX));
    assert!(!editor.is_submitting());
    assert_eq!(editor.progress(), 0);
}

#[test]
fn upload_flow_tests_progress_is_republished_and_reset() {
    let transport = ScriptedUpload::with_progress(
        Err(TransportFailure::timeout("timed out")),
        vec![(0, 200), (100, 200), (200, 200)],
    );
    let client = upload_client(transport);
    let store = MemorySessionStore::default();
    let mut editor = ready_editor();
    let mut seen = Vec::new();

    submit_upload(&mut editor, &client, &store, &mut |percent| seen.push(percent))
        .expect("ready editor should submit");

    assert_eq!(seen, vec![0, 50, 100]);
    assert_eq!(editor.progress(), 0);
    assert_eq!(editor.error_banner(), Some(TIMEOUT_MESSAGE));
    assert!(editor.selection().is_complete());
}
