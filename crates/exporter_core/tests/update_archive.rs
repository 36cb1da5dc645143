use exporter_core::{update, Effect, ExportPhase, ExportState, Msg};
use pretty_assertions::assert_eq;

fn retrieved(slugs: &[&str]) -> ExportState {
    let (mut state, _) = update(
        ExportState::new(),
        Msg::ExportStarted {
            site: "writer".to_string(),
            offset: 0,
            limit: 50,
        },
    );
    for slug in slugs {
        let (next, _) = update(
            state,
            Msg::PostRetrieved {
                slug: slug.to_string(),
            },
        );
        state = next;
    }
    state
}

fn entry(percent: u8, entry_index: usize) -> Msg {
    Msg::EntryWritten {
        percent,
        entry_index,
        name: format!("{entry_index}.md"),
    }
}

#[test]
fn entry_progress_switches_to_archiving() {
    let (state, effects) = update(retrieved(&["a", "b"]), entry(50, 0));

    assert_eq!(state.view().phase, ExportPhase::Archiving);
    assert_eq!(state.view().entries_written, 1);
    assert_eq!(
        effects,
        vec![Effect::ShowArchiveProgress {
            percent: 50,
            name: "0.md".to_string(),
        }]
    );
    assert_eq!(state.view().summary_line(), "archiving 50%");
}

#[test]
fn unchanged_percentage_emits_no_progress_effect() {
    let (state, _) = update(retrieved(&["a"]), entry(33, 0));
    let (state, effects) = update(state, entry(33, 1));

    assert!(effects.is_empty());
    assert_eq!(state.view().entries_written, 2);
}

#[test]
fn archive_ready_finishes_and_announces() {
    let (state, _) = update(retrieved(&["a", "b"]), entry(50, 0));
    let (state, _) = update(state, entry(100, 1));
    let (state, effects) = update(
        state,
        Msg::ArchiveReady {
            archive_name: "writer-posts-0-2-1.zip".to_string(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::AnnounceArchive {
            archive_name: "writer-posts-0-2-1.zip".to_string(),
            entries: 2,
            failed: 0,
        }]
    );
    let view = state.view();
    assert_eq!(view.phase, ExportPhase::Finished);
    assert_eq!(view.percent, 100);
    assert_eq!(
        view.summary_line(),
        "2 posts exported to writer-posts-0-2-1.zip (0 failed)"
    );
}

#[test]
fn late_messages_after_finish_are_ignored() {
    let (state, _) = update(retrieved(&["a"]), entry(100, 0));
    let (state, _) = update(
        state,
        Msg::ArchiveReady {
            archive_name: "done.zip".to_string(),
        },
    );

    let (next, effects) = update(state.clone(), entry(100, 5));
    assert_eq!(next, state);
    assert!(effects.is_empty());

    let (next, effects) = update(
        state.clone(),
        Msg::PostFailed {
            slug: "late".to_string(),
            error: "x".to_string(),
        },
    );
    assert_eq!(next, state);
    assert!(effects.is_empty());
}
