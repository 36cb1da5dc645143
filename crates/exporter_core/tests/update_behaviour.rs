use std::sync::Once;

use exporter_core::{update, Effect, ExportPhase, ExportState, FailedPost, Msg};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(exporter_logging::initialize_for_tests);
}

fn started() -> ExportState {
    let (state, _) = update(
        ExportState::new(),
        Msg::ExportStarted {
            site: "writer".to_string(),
            offset: 10,
            limit: 5,
        },
    );
    state
}

#[test]
fn start_moves_idle_to_retrieving() {
    init_logging();
    let mut state = started();
    let view = state.view();

    assert_eq!(view.phase, ExportPhase::Retrieving);
    assert_eq!(view.site.as_deref(), Some("writer"));
    assert_eq!(view.offset, 10);
    assert_eq!(view.limit, 5);
    assert_eq!(view.summary_line(), "loading index");
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn retrieval_outcomes_are_counted_and_logged() {
    init_logging();
    let (state, _) = update(started(), Msg::IndexLoaded { count: 3 });
    let (state, effects) = update(
        state,
        Msg::PostRetrieved {
            slug: "first".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LogRetrieved {
            slug: "first".to_string()
        }]
    );

    let (state, effects) = update(
        state,
        Msg::PostFailed {
            slug: "second".to_string(),
            error: "http status 500".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LogFailure {
            slug: "second".to_string(),
            error: "http status 500".to_string(),
        }]
    );

    let view = state.view();
    assert_eq!(view.retrieved, 1);
    assert_eq!(view.failed, 1);
    assert_eq!(view.settled(), 2);
    assert_eq!(
        view.failures,
        vec![FailedPost {
            slug: "second".to_string(),
            error: "http status 500".to_string(),
        }]
    );
    assert_eq!(view.summary_line(), "retrieving 2/3 posts");
}

#[test]
fn start_is_ignored_while_running() {
    init_logging();
    let state = started();
    let (next, effects) = update(
        state.clone(),
        Msg::ExportStarted {
            site: "other".to_string(),
            offset: 0,
            limit: 1,
        },
    );

    assert_eq!(next, state);
    assert!(effects.is_empty());
}

#[test]
fn nothing_to_export_ends_in_empty_phase() {
    init_logging();
    let (state, _) = update(
        started(),
        Msg::PostFailed {
            slug: "only".to_string(),
            error: "timeout".to_string(),
        },
    );
    let (state, effects) = update(state, Msg::NothingToExport);

    assert_eq!(effects, vec![Effect::AnnounceEmpty { failed: 1 }]);
    assert_eq!(state.view().phase, ExportPhase::Empty);
    assert_eq!(state.view().summary_line(), "nothing to export (1 failed)");
}

#[test]
fn index_failure_is_logged_and_explains_the_empty_run() {
    init_logging();
    let (state, effects) = update(
        started(),
        Msg::IndexFailed {
            error: "http status 503: 503".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LogIndexFailure {
            error: "http status 503: 503".to_string(),
        }]
    );
    assert_eq!(state.view().index_size, Some(0));
    assert_eq!(state.view().summary_line(), "retrieving 0/0 posts");

    let (state, effects) = update(state, Msg::NothingToExport);
    assert_eq!(effects, vec![Effect::AnnounceEmpty { failed: 0 }]);
    assert_eq!(
        state.view().summary_line(),
        "nothing to export (index failed: http status 503: 503)"
    );
}

#[test]
fn a_finished_run_can_be_restarted() {
    init_logging();
    let (state, _) = update(started(), Msg::NothingToExport);
    let (state, _) = update(
        state,
        Msg::ExportStarted {
            site: "again".to_string(),
            offset: 0,
            limit: 2,
        },
    );

    let view = state.view();
    assert_eq!(view.phase, ExportPhase::Retrieving);
    assert_eq!(view.site.as_deref(), Some("again"));
    assert_eq!(view.failed, 0);
}
