use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::archive::EntryProgress;

/// Full post record as returned by `GET /api/v1/posts/{slug}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub slug: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_html: String,
    #[serde(default, rename = "postTags", deserialize_with = "null_as_default")]
    pub tags: Vec<PostTag>,
    #[serde(default)]
    pub post_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Every other field of the platform payload, for custom front matter.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostRecord {
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTag {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// Index-page item from `GET /api/v1/archive`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Success { post: PostRecord },
    Failure { slug: String, error: FetchError },
}

impl RetrievalOutcome {
    pub fn slug(&self) -> &str {
        match self {
            RetrievalOutcome::Success { post } => &post.slug,
            RetrievalOutcome::Failure { slug, .. } => slug,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetrievalOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    IndexLoaded { count: usize },
    /// The index page could not be fetched; no post will follow.
    IndexFailed { error: FetchError },
    Retrieved(RetrievalOutcome),
    EntryWritten { percent: u8, progress: EntryProgress },
    Completed { archive_name: String },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ExportEvent) + Send + Sync,
{
    fn emit(&self, event: ExportEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ExportEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Decode => write!(f, "invalid json"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_record_tolerates_nulls_and_keeps_unknown_fields() {
        let post: PostRecord = serde_json::from_str(
            r#"{
                "slug": "hello",
                "title": null,
                "body_html": null,
                "postTags": [{"name": "rust", "id": 1}, {"name": "zip"}],
                "post_date": "2024-05-01T10:00:00.000Z",
                "cover_image": null,
                "subtitle": "Sub",
                "audience": "everyone"
            }"#,
        )
        .unwrap();

        assert_eq!(post.slug, "hello");
        assert_eq!(post.title, "");
        assert_eq!(post.body_html, "");
        assert_eq!(post.tag_names(), vec!["rust", "zip"]);
        assert_eq!(post.post_date.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        assert_eq!(post.description, None);
        assert_eq!(post.cover_image, None);
        assert_eq!(post.extra.get("subtitle"), Some(&Value::from("Sub")));
        assert_eq!(post.extra.get("audience"), Some(&Value::from("everyone")));
    }

    #[test]
    fn failure_display_includes_kind_and_message() {
        let err = FetchError::new(FailureKind::HttpStatus(404), "404 Not Found");
        assert_eq!(err.to_string(), "http status 404: 404 Not Found");
    }
}
