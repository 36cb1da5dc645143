//! Exporter engine: retrieval, conversion and archive assembly.
mod archive;
mod checksum;
mod convert;
mod export;
mod fetch;
mod filename;
mod frontmatter;
mod persist;
mod pipeline;
mod presets;
mod site;
mod types;

pub use archive::{
    ArchiveBuilder, ArchiveEntry, ArchiveError, ArchiveSummary, CompressionMethod, Compressor,
    DeflateCompressor, DosDateTime, EntryProgress, EntryStatus, StoreCompressor,
    CENTRAL_HEADER_LEN, END_RECORD_LEN, LOCAL_HEADER_LEN,
};
pub use checksum::{checksum, Crc32};
pub use convert::{Converter, MarkdownConverter};
pub use export::{
    apply_replacements, Clock, ExportError, ExportOptions, ExportSummary, Exporter,
    DEFAULT_IDENTITY,
};
pub use fetch::{FetchSettings, PostSource, ReqwestPostSource};
pub use filename::entry_stem;
pub use frontmatter::{encode, FrontMatterError, FrontMatterValue, YamlDocument};
pub use persist::{ensure_output_dir, ArchiveFile, PersistError};
pub use pipeline::{
    retrieve_posts, ConfigError, PipelineConfig, PipelineConfigBuilder, Retrieval,
    DEFAULT_LIMIT, DEFAULT_OFFSET,
};
pub use presets::{FrontMatterMapper, FrontMatterPreset, FrontMatterSource, UnknownPreset};
pub use site::{SiteAddress, SiteError};
pub use types::{
    ExportEvent, FailureKind, FetchError, NullProgressSink, PostRecord, PostSummary, PostTag,
    ProgressSink, RetrievalOutcome,
};
