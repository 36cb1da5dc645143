use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use exporter_logging::{export_debug, export_info};

use crate::archive::{ArchiveBuilder, ArchiveEntry, ArchiveError, Compressor, DeflateCompressor};
use crate::convert::{Converter, MarkdownConverter};
use crate::filename::entry_stem;
use crate::frontmatter::{FrontMatterError, YamlDocument};
use crate::persist::{ArchiveFile, PersistError};
use crate::pipeline::{retrieve_posts, ConfigError, PipelineConfig};
use crate::presets::FrontMatterSource;
use crate::{ExportEvent, PostRecord, PostSource, ProgressSink};

pub const DEFAULT_IDENTITY: &str = "substack";

pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("front matter error for {slug}: {source}")]
    FrontMatter {
        slug: String,
        #[source]
        source: FrontMatterError,
    },
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("no posts were retrieved, nothing to export")]
    NothingToExport,
}

/// How retrieved posts become archive entries.
#[derive(Clone)]
pub struct ExportOptions {
    pub front_matter: FrontMatterSource,
    /// Inline `[a, b]` collections in front matter instead of `- ` blocks.
    pub inline_arrays: bool,
    pub compress: bool,
    /// Leading part of the archive name.
    pub identity: String,
    pub clock: Clock,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            front_matter: FrontMatterSource::default(),
            inline_arrays: true,
            compress: true,
            identity: DEFAULT_IDENTITY.to_string(),
            clock: Arc::new(Local::now),
        }
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("front_matter", &self.front_matter)
            .field("inline_arrays", &self.inline_arrays)
            .field("compress", &self.compress)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub archive_name: String,
    pub entry_count: usize,
    pub failed_count: usize,
    pub bytes_written: u64,
}

pub struct Exporter {
    source: Arc<dyn PostSource>,
    config: PipelineConfig,
    options: ExportOptions,
    converter: Arc<dyn Converter>,
    compressor: Arc<dyn Compressor>,
}

impl Exporter {
    pub fn new(
        source: Arc<dyn PostSource>,
        config: PipelineConfig,
        options: ExportOptions,
    ) -> Self {
        Self {
            source,
            config,
            options,
            converter: Arc::new(MarkdownConverter),
            compressor: Arc::new(DeflateCompressor::default()),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Retrieves every post and streams the archive into `sink`.
    ///
    /// Nothing is written when no post could be retrieved, including when
    /// the index page itself failed.
    pub async fn zip_posts<W: Write>(
        &self,
        sink: W,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<ExportSummary, ExportError> {
        let summary = self.write_archive(sink, &progress).await?;
        announce(progress.as_ref(), &summary);
        Ok(summary)
    }

    /// Like [`Self::zip_posts`], writing `{dir}/{archive_name}` atomically.
    ///
    /// Completion is reported only once the archive is in place.
    pub async fn zip_posts_to_dir(
        &self,
        dir: &Path,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<(PathBuf, ExportSummary), ExportError> {
        let mut file = ArchiveFile::create_in(dir)?;
        let summary = self.write_archive(&mut file, &progress).await?;
        let path = file.commit(&summary.archive_name)?;
        announce(progress.as_ref(), &summary);
        Ok((path, summary))
    }

    async fn write_archive<W: Write>(
        &self,
        sink: W,
        progress: &Arc<dyn ProgressSink>,
    ) -> Result<ExportSummary, ExportError> {
        let retrieval =
            retrieve_posts(Arc::clone(&self.source), &self.config, Arc::clone(progress)).await;
        if retrieval.posts.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        let entries = self.build_entries(&retrieval.posts).await?;
        let mut builder = ArchiveBuilder::with_compressor(Arc::clone(&self.compressor));
        builder.add_all(entries);

        let archive = builder.write_to(sink, |percent, entry| {
            progress.emit(ExportEvent::EntryWritten {
                percent,
                progress: entry.clone(),
            });
        })?;

        let archive_name = self.archive_name(archive.entry_count, (self.options.clock)());
        export_info!(
            "archive {} holds {} entries ({} bytes, {} posts failed)",
            archive_name,
            archive.entry_count,
            archive.total_bytes,
            retrieval.failed
        );

        Ok(ExportSummary {
            archive_name,
            entry_count: archive.entry_count,
            failed_count: retrieval.failed,
            bytes_written: archive.total_bytes,
        })
    }

    /// One Markdown document with front matter per post, in the given order.
    pub async fn build_entries(
        &self,
        posts: &[PostRecord],
    ) -> Result<Vec<ArchiveEntry>, ExportError> {
        let modified_at = (self.options.clock)().naive_local();
        let mut entries = Vec::with_capacity(posts.len());
        for (index, post) in posts.iter().enumerate() {
            let matter = self.options.front_matter.resolve(post).await;
            let document = YamlDocument::new(matter)
                .map_err(|source| ExportError::FrontMatter {
                    slug: post.slug.clone(),
                    source,
                })?
                .inline(self.options.inline_arrays);

            let markdown = self.converter.to_markdown(&post.body_html);
            let body = apply_replacements(&markdown, self.config.text_replacements());
            let name = self.entry_name(index, post);
            export_debug!("prepared {} ({} bytes of markdown)", name, body.len());

            entries.push(
                ArchiveEntry::new(name, document.front_matter(&body))
                    .with_modified_at(modified_at)
                    .with_compression(self.options.compress),
            );
        }
        Ok(entries)
    }

    /// `{offset+index+1}.{slug}.md` with numbering, else `{slug}.md`.
    pub fn entry_name(&self, index: usize, post: &PostRecord) -> String {
        let stem = entry_stem(&post.slug, &post.title);
        if self.config.numbering() {
            let number = u64::from(self.config.offset()) + index as u64 + 1;
            format!("{number}.{stem}.md")
        } else {
            format!("{stem}.md")
        }
    }

    pub fn archive_name(&self, count: usize, at: DateTime<Local>) -> String {
        let from = u64::from(self.config.offset());
        let to = from + count as u64;
        format!(
            "{}-posts-{}-{}-{}.zip",
            self.options.identity,
            from,
            to,
            at.timestamp_millis()
        )
    }
}

fn announce(progress: &dyn ProgressSink, summary: &ExportSummary) {
    progress.emit(ExportEvent::Completed {
        archive_name: summary.archive_name.clone(),
    });
}

/// Applies each literal pair in order, replacing every occurrence.
pub fn apply_replacements(text: &str, pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .filter(|(search, _)| !search.is_empty())
        .fold(text.to_string(), |acc, (search, replace)| acc.replace(search.as_str(), replace))
}
