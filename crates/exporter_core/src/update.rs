use crate::{Effect, ExportPhase, ExportState, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not belong to the current phase are dropped without
/// touching the state, so late progress from a finished run cannot reopen it.
pub fn update(mut state: ExportState, msg: Msg) -> (ExportState, Vec<Effect>) {
    let phase = state.phase();
    let effects = match msg {
        Msg::ExportStarted { site, offset, limit } => {
            if phase.is_running() {
                return (state, Vec::new());
            }
            state.start(site, offset, limit);
            Vec::new()
        }
        Msg::IndexLoaded { count } => {
            if phase != ExportPhase::Retrieving {
                return (state, Vec::new());
            }
            state.set_index_size(count);
            Vec::new()
        }
        Msg::IndexFailed { error } => {
            if phase != ExportPhase::Retrieving {
                return (state, Vec::new());
            }
            state.record_index_failure(error.clone());
            vec![Effect::LogIndexFailure { error }]
        }
        Msg::PostRetrieved { slug } => {
            if phase != ExportPhase::Retrieving {
                return (state, Vec::new());
            }
            state.record_retrieved(slug.clone());
            vec![Effect::LogRetrieved { slug }]
        }
        Msg::PostFailed { slug, error } => {
            if phase != ExportPhase::Retrieving {
                return (state, Vec::new());
            }
            state.record_failure(slug.clone(), error.clone());
            vec![Effect::LogFailure { slug, error }]
        }
        Msg::EntryWritten {
            percent,
            entry_index,
            name,
        } => {
            if !phase.is_running() {
                return (state, Vec::new());
            }
            if state.record_entry(percent, entry_index) {
                vec![Effect::ShowArchiveProgress { percent, name }]
            } else {
                Vec::new()
            }
        }
        Msg::ArchiveReady { archive_name } => {
            if !phase.is_running() {
                return (state, Vec::new());
            }
            let entries = state.finish(archive_name.clone());
            vec![Effect::AnnounceArchive {
                archive_name,
                entries,
                failed: state.failed_count(),
            }]
        }
        Msg::NothingToExport => {
            if phase != ExportPhase::Retrieving {
                return (state, Vec::new());
            }
            state.finish_empty();
            vec![Effect::AnnounceEmpty {
                failed: state.failed_count(),
            }]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
