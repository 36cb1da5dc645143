use crate::view_model::ExportViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    Retrieving,
    Archiving,
    Finished,
    /// The run ended without any retrievable post.
    Empty,
}

impl ExportPhase {
    pub fn is_running(self) -> bool {
        matches!(self, ExportPhase::Retrieving | ExportPhase::Archiving)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPost {
    pub slug: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportState {
    phase: ExportPhase,
    site: Option<String>,
    offset: u32,
    limit: u32,
    index_size: Option<usize>,
    index_error: Option<String>,
    retrieved: Vec<String>,
    failures: Vec<FailedPost>,
    percent: u8,
    entries_written: usize,
    archive_name: Option<String>,
    dirty: bool,
}

impl ExportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn view(&self) -> ExportViewModel {
        ExportViewModel {
            phase: self.phase,
            site: self.site.clone(),
            offset: self.offset,
            limit: self.limit,
            index_size: self.index_size,
            index_error: self.index_error.clone(),
            retrieved: self.retrieved.len(),
            failed: self.failures.len(),
            failures: self.failures.clone(),
            percent: self.percent,
            entries_written: self.entries_written,
            archive_name: self.archive_name.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn start(&mut self, site: String, offset: u32, limit: u32) {
        *self = Self {
            phase: ExportPhase::Retrieving,
            site: Some(site),
            offset,
            limit,
            ..Self::default()
        };
        self.mark_dirty();
    }

    pub(crate) fn set_index_size(&mut self, count: usize) {
        self.index_size = Some(count);
        self.mark_dirty();
    }

    pub(crate) fn record_index_failure(&mut self, error: String) {
        self.index_size = Some(0);
        self.index_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn record_retrieved(&mut self, slug: String) {
        self.retrieved.push(slug);
        self.mark_dirty();
    }

    pub(crate) fn record_failure(&mut self, slug: String, error: String) {
        self.failures.push(FailedPost { slug, error });
        self.mark_dirty();
    }

    pub(crate) fn failed_count(&self) -> usize {
        self.failures.len()
    }

    /// Records a written entry and returns whether the whole percentage moved.
    pub(crate) fn record_entry(&mut self, percent: u8, entry_index: usize) -> bool {
        self.phase = ExportPhase::Archiving;
        self.entries_written = self.entries_written.max(entry_index + 1);
        let changed = self.percent != percent;
        self.percent = percent;
        self.mark_dirty();
        changed
    }

    pub(crate) fn finish(&mut self, archive_name: String) -> usize {
        self.phase = ExportPhase::Finished;
        self.percent = 100;
        self.archive_name = Some(archive_name);
        self.mark_dirty();
        self.entries_written
    }

    pub(crate) fn finish_empty(&mut self) {
        self.phase = ExportPhase::Empty;
        self.mark_dirty();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
