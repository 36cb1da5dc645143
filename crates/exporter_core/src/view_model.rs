use crate::{ExportPhase, FailedPost};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportViewModel {
    pub phase: ExportPhase,
    pub site: Option<String>,
    pub offset: u32,
    pub limit: u32,
    pub index_size: Option<usize>,
    pub index_error: Option<String>,
    pub retrieved: usize,
    pub failed: usize,
    pub failures: Vec<FailedPost>,
    pub percent: u8,
    pub entries_written: usize,
    pub archive_name: Option<String>,
    pub dirty: bool,
}

impl ExportViewModel {
    /// Posts that finished retrieval, successfully or not.
    pub fn settled(&self) -> usize {
        self.retrieved + self.failed
    }

    /// One-line human summary of the run.
    pub fn summary_line(&self) -> String {
        match self.phase {
            ExportPhase::Idle => "idle".to_string(),
            ExportPhase::Retrieving => match self.index_size {
                Some(total) => format!("retrieving {}/{} posts", self.settled(), total),
                None => "loading index".to_string(),
            },
            ExportPhase::Archiving => format!("archiving {}%", self.percent),
            ExportPhase::Finished => format!(
                "{} posts exported to {} ({} failed)",
                self.entries_written,
                self.archive_name.as_deref().unwrap_or("archive"),
                self.failed
            ),
            ExportPhase::Empty => match &self.index_error {
                Some(error) => format!("nothing to export (index failed: {error})"),
                None => format!("nothing to export ({} failed)", self.failed),
            },
        }
    }
}
