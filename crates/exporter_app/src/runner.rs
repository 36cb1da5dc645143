//! Console shell around the `exporter_core` state machine.
//!
//! Engine events become [`Msg`]s, `update` decides what changed, and the
//! returned effects are rendered as lines on the output stream.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use exporter_core::{update, Effect, ExportState, ExportViewModel, Msg};
use exporter_engine::{ExportEvent, ProgressSink, RetrievalOutcome};
use exporter_logging::{export_debug, export_warn};

pub struct ConsoleProgress<W: Write + Send> {
    inner: Mutex<Inner<W>>,
    quiet: bool,
}

struct Inner<W> {
    state: ExportState,
    out: W,
}

impl ConsoleProgress<io::Stdout> {
    pub fn stdout(quiet: bool) -> Self {
        Self::new(io::stdout(), quiet)
    }
}

impl<W: Write + Send> ConsoleProgress<W> {
    pub fn new(out: W, quiet: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ExportState::new(),
                out,
            }),
            quiet,
        }
    }

    /// Applies `msg` and renders the resulting effects.
    pub fn dispatch(&self, msg: Msg) {
        let mut inner = self.lock();
        let state = std::mem::take(&mut inner.state);
        let (next, effects) = update(state, msg);
        inner.state = next;
        if !inner.state.consume_dirty() {
            return;
        }
        let view = inner.state.view();
        for effect in effects {
            let line = self.render(effect, &view);
            if let Some(line) = line {
                if let Err(err) = writeln!(inner.out, "{line}") {
                    export_warn!("Failed to write progress: {}", err);
                }
            }
        }
    }

    pub fn view(&self) -> ExportViewModel {
        self.lock().state.view()
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }

    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, effect: Effect, view: &ExportViewModel) -> Option<String> {
        match effect {
            Effect::LogIndexFailure { error } => {
                (!self.quiet).then(|| format!("[index failed] {error}"))
            }
            Effect::LogRetrieved { slug } => {
                export_debug!("Retrieved {}", slug);
                (!self.quiet).then(|| format!("[{}] {}", view.summary_line(), slug))
            }
            Effect::LogFailure { slug, error } => {
                export_warn!("Skipping {}: {}", slug, error);
                (!self.quiet)
                    .then(|| format!("[{}] {} failed: {}", view.summary_line(), slug, error))
            }
            Effect::ShowArchiveProgress { percent, name } => {
                (!self.quiet).then(|| format!("[archiving {percent:>3}%] {name}"))
            }
            Effect::AnnounceArchive { .. } | Effect::AnnounceEmpty { .. } => {
                Some(view.summary_line())
            }
        }
    }
}

impl<W: Write + Send> ProgressSink for ConsoleProgress<W> {
    fn emit(&self, event: ExportEvent) {
        self.dispatch(msg_for(event));
    }
}

pub fn msg_for(event: ExportEvent) -> Msg {
    match event {
        ExportEvent::IndexLoaded { count } => Msg::IndexLoaded { count },
        ExportEvent::IndexFailed { error } => Msg::IndexFailed {
            error: error.to_string(),
        },
        ExportEvent::Retrieved(RetrievalOutcome::Success { post }) => {
            Msg::PostRetrieved { slug: post.slug }
        }
        ExportEvent::Retrieved(RetrievalOutcome::Failure { slug, error }) => Msg::PostFailed {
            slug,
            error: error.to_string(),
        },
        ExportEvent::EntryWritten { percent, progress } => Msg::EntryWritten {
            percent,
            entry_index: progress.entry_index,
            name: progress.name,
        },
        ExportEvent::Completed { archive_name } => Msg::ArchiveReady { archive_name },
    }
}
