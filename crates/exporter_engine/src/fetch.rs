use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use crate::{FailureKind, FetchError, PostRecord, PostSummary};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec!["application/json".to_string()],
        }
    }
}

/// Remote catalogue of posts: one index page plus per-post detail records.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Newest-first summaries starting at `offset`.
    async fn fetch_index(&self, offset: u32, limit: u32) -> Result<Vec<PostSummary>, FetchError>;

    async fn fetch_post(&self, slug: &str) -> Result<PostRecord, FetchError>;
}

/// [`PostSource`] over the public `/api/v1` endpoints of a site.
#[derive(Debug, Clone)]
pub struct ReqwestPostSource {
    base_url: Url,
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestPostSource {
    pub fn new(base_url: Url, settings: FetchSettings) -> Result<Self, FetchError> {
        if base_url.cannot_be_a_base() {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("{base_url} cannot be used as a base url"),
            ));
        }
        let client = build_client(&settings)?;
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn index_url(&self, offset: u32, limit: u32) -> Result<Url, FetchError> {
        let mut url = self.endpoint(&["api", "v1", "archive"])?;
        url.query_pairs_mut()
            .append_pair("sort", "new")
            .append_pair("search", "")
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    pub fn post_url(&self, slug: &str) -> Result<Url, FetchError> {
        self.endpoint(&["api", "v1", "posts", slug])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| {
                FetchError::new(FailureKind::InvalidUrl, "base url cannot take a path")
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        if let Some(ct) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl PostSource for ReqwestPostSource {
    async fn fetch_index(&self, offset: u32, limit: u32) -> Result<Vec<PostSummary>, FetchError> {
        let url = self.index_url(offset, limit)?;
        self.get_json(url).await
    }

    async fn fetch_post(&self, slug: &str) -> Result<PostRecord, FetchError> {
        let url = self.post_url(slug)?;
        self.get_json(url).await
    }
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, FetchError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .user_agent(concat!("post-exporter/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
