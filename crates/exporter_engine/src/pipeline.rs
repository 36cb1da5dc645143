//! Index fetch followed by per-post detail fetches under an optional
//! concurrency ceiling.

use std::num::NonZeroUsize;
use std::sync::Arc;

use exporter_logging::{export_debug, export_error, export_info, export_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::{
    ExportEvent, PostRecord, PostSource, PostSummary, ProgressSink, RetrievalOutcome,
};

pub const DEFAULT_OFFSET: u32 = 0;
pub const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("limit must be at least 1")]
    ZeroLimit,
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}

/// Validated, immutable settings for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    base_url: Url,
    offset: u32,
    limit: u32,
    concurrency_limit: Option<NonZeroUsize>,
    numbering: bool,
    text_replacements: Vec<(String, String)>,
}

impl PipelineConfig {
    pub fn builder(base_url: impl Into<String>) -> PipelineConfigBuilder {
        PipelineConfigBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// `None` means posts are fetched one after another.
    pub fn concurrency_limit(&self) -> Option<NonZeroUsize> {
        self.concurrency_limit
    }

    pub fn numbering(&self) -> bool {
        self.numbering
    }

    pub fn text_replacements(&self) -> &[(String, String)] {
        &self.text_replacements
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    base_url: String,
    offset: u32,
    limit: u32,
    concurrency_limit: Option<usize>,
    numbering: bool,
    text_replacements: Vec<(String, String)>,
}

impl PipelineConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            offset: DEFAULT_OFFSET,
            limit: DEFAULT_LIMIT,
            concurrency_limit: None,
            numbering: false,
            text_replacements: Vec::new(),
        }
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn concurrency_limit(mut self, limit: Option<usize>) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn numbering(mut self, enabled: bool) -> Self {
        self.numbering = enabled;
        self
    }

    /// Appends one literal `search` -> `replace` pair; pairs apply in order.
    pub fn replace(mut self, search: impl Into<String>, replace: impl Into<String>) -> Self {
        self.text_replacements.push((search.into(), replace.into()));
        self
    }

    pub fn text_replacements(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.text_replacements.extend(pairs);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let base_url = Url::parse(self.base_url.trim()).map_err(|err| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url,
                reason: "expected an http(s) url with a host".to_string(),
            });
        }
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        let concurrency_limit = match self.concurrency_limit {
            None => None,
            Some(n) => Some(NonZeroUsize::new(n).ok_or(ConfigError::ZeroConcurrency)?),
        };
        Ok(PipelineConfig {
            base_url,
            offset: self.offset,
            limit: self.limit,
            concurrency_limit,
            numbering: self.numbering,
            text_replacements: self.text_replacements,
        })
    }
}

/// Posts that were retrieved, oldest first, plus how many fetches failed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Retrieval {
    pub posts: Vec<PostRecord>,
    pub failed: usize,
}

/// Fetches the index page, then every listed post.
///
/// Failures are reported to `sink` and dropped. A failed index page yields
/// an empty retrieval after an [`ExportEvent::IndexFailed`].
pub async fn retrieve_posts(
    source: Arc<dyn PostSource>,
    config: &PipelineConfig,
    sink: Arc<dyn ProgressSink>,
) -> Retrieval {
    let summaries = match source.fetch_index(config.offset(), config.limit()).await {
        Ok(summaries) => summaries,
        Err(error) => {
            export_error!("index fetch failed: {}", error);
            sink.emit(ExportEvent::IndexFailed { error });
            return Retrieval::default();
        }
    };
    export_info!(
        "index page at offset {} lists {} posts",
        config.offset(),
        summaries.len()
    );
    sink.emit(ExportEvent::IndexLoaded {
        count: summaries.len(),
    });

    let listed = summaries.len();
    let mut retrieved = match config.concurrency_limit() {
        None => retrieve_sequential(source.as_ref(), summaries, sink.as_ref()).await,
        Some(limit) => retrieve_bounded(source, summaries, sink, limit).await,
    };

    // Index is newest first.
    retrieved.sort_by_key(|(index, _)| *index);
    let mut posts: Vec<PostRecord> = retrieved.into_iter().map(|(_, post)| post).collect();
    posts.reverse();

    let failed = listed - posts.len();
    export_info!("retrieved {} posts, {} failed", posts.len(), failed);
    Retrieval { posts, failed }
}

async fn retrieve_sequential(
    source: &dyn PostSource,
    summaries: Vec<PostSummary>,
    sink: &dyn ProgressSink,
) -> Vec<(usize, PostRecord)> {
    let mut retrieved = Vec::with_capacity(summaries.len());
    for (index, summary) in summaries.into_iter().enumerate() {
        if let Some(post) = retrieve_one(source, summary.slug, sink).await {
            retrieved.push((index, post));
        }
    }
    retrieved
}

async fn retrieve_bounded(
    source: Arc<dyn PostSource>,
    summaries: Vec<PostSummary>,
    sink: Arc<dyn ProgressSink>,
    limit: NonZeroUsize,
) -> Vec<(usize, PostRecord)> {
    let semaphore = Arc::new(Semaphore::new(limit.get()));
    let mut tasks = JoinSet::new();

    for (index, summary) in summaries.into_iter().enumerate() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let source = Arc::clone(&source);
        let sink = Arc::clone(&sink);
        tasks.spawn(async move {
            let post = retrieve_one(source.as_ref(), summary.slug, sink.as_ref()).await;
            drop(permit);
            post.map(|post| (index, post))
        });
    }

    let mut retrieved = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(entry)) => retrieved.push(entry),
            Ok(None) => {}
            Err(err) => export_error!("retrieval task aborted: {}", err),
        }
    }
    retrieved
}

async fn retrieve_one(
    source: &dyn PostSource,
    slug: String,
    sink: &dyn ProgressSink,
) -> Option<PostRecord> {
    export_debug!("fetching post {}", slug);
    match source.fetch_post(&slug).await {
        Ok(post) => {
            sink.emit(ExportEvent::Retrieved(RetrievalOutcome::Success {
                post: post.clone(),
            }));
            Some(post)
        }
        Err(error) => {
            export_warn!("failed to fetch post {}: {}", slug, error);
            sink.emit(ExportEvent::Retrieved(RetrievalOutcome::Failure { slug, error }));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = PipelineConfig::builder("https://writer.substack.com").build().unwrap();
        assert_eq!(config.offset(), 0);
        assert_eq!(config.limit(), 50);
        assert_eq!(config.concurrency_limit(), None);
        assert!(!config.numbering());
        assert!(config.text_replacements().is_empty());
    }

    #[test]
    fn zero_values_are_rejected_before_any_io() {
        assert_eq!(
            PipelineConfig::builder("https://writer.substack.com")
                .limit(0)
                .build()
                .unwrap_err(),
            ConfigError::ZeroLimit
        );
        assert_eq!(
            PipelineConfig::builder("https://writer.substack.com")
                .concurrency_limit(Some(0))
                .build()
                .unwrap_err(),
            ConfigError::ZeroConcurrency
        );
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(matches!(
            PipelineConfig::builder("not a url").build(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            PipelineConfig::builder("ftp://example.com").build(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn replacements_keep_their_order() {
        let config = PipelineConfig::builder("https://writer.substack.com")
            .replace("a", "b")
            .text_replacements(vec![("c".to_string(), "d".to_string())])
            .build()
            .unwrap();
        assert_eq!(
            config.text_replacements(),
            &[("a".to_string(), "b".to_string()), ("c".to_string(), "d".to_string())]
        );
    }
}
