#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A new export run was started for `site`.
    ExportStarted {
        site: String,
        offset: u32,
        limit: u32,
    },
    /// The index page was fetched and lists `count` posts.
    IndexLoaded { count: usize },
    /// The index page could not be fetched.
    IndexFailed { error: String },
    /// A full post record was retrieved.
    PostRetrieved { slug: String },
    /// A post could not be retrieved; it is left out of the archive.
    PostFailed { slug: String, error: String },
    /// The archive engine finished writing one entry.
    EntryWritten {
        percent: u8,
        entry_index: usize,
        name: String,
    },
    /// The archive was fully written.
    ArchiveReady { archive_name: String },
    /// No post was retrieved, so no archive is produced.
    NothingToExport,
    /// Fallback for placeholder wiring.
    NoOp,
}
