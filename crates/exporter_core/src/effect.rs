#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LogIndexFailure { error: String },
    LogRetrieved { slug: String },
    LogFailure { slug: String, error: String },
    ShowArchiveProgress { percent: u8, name: String },
    AnnounceArchive {
        archive_name: String,
        entries: usize,
        failed: usize,
    },
    AnnounceEmpty { failed: usize },
}
