use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;

use crate::frontmatter::FrontMatterValue;
use crate::types::PostRecord;

/// Named front-matter layouts for common static-site and blogging targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontMatterPreset {
    Hashnode,
    Hugo,
    Jekyll,
    Astro,
    #[default]
    Default,
}

impl FrontMatterPreset {
    pub const ALL: [FrontMatterPreset; 5] = [
        FrontMatterPreset::Hashnode,
        FrontMatterPreset::Hugo,
        FrontMatterPreset::Jekyll,
        FrontMatterPreset::Astro,
        FrontMatterPreset::Default,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FrontMatterPreset::Hashnode => "hashnode",
            FrontMatterPreset::Hugo => "hugo",
            FrontMatterPreset::Jekyll => "jekyll",
            FrontMatterPreset::Astro => "astro",
            FrontMatterPreset::Default => "default",
        }
    }

    pub fn map(self, post: &PostRecord) -> FrontMatterValue {
        let tags = post.tag_names();
        match self {
            FrontMatterPreset::Hashnode => json!({
                "title": post.title,
                "slug": post.slug,
                "tags": tags,
                "date": post.post_date,
                "image": post.cover_image,
            }),
            FrontMatterPreset::Hugo => json!({
                "title": post.title,
                "slug": post.slug,
                "date": post.post_date,
                "draft": false,
                "tags": tags,
                "description": post.description,
                "cover": post.cover_image,
            }),
            FrontMatterPreset::Jekyll => json!({
                "layout": "post",
                "title": post.title,
                "slug": post.slug,
                "date": post.post_date,
                "categories": tags,
                "description": post.description,
                "image": post.cover_image,
            }),
            FrontMatterPreset::Astro => json!({
                "title": post.title,
                "pubDate": post.post_date,
                "description": post.description.clone().unwrap_or_default(),
                "tags": tags,
                "heroImage": post.cover_image,
            }),
            FrontMatterPreset::Default => json!({
                "title": post.title,
                "slug": post.slug,
                "date": post.post_date,
                "description": post.description,
                "image": post.cover_image,
            }),
        }
    }
}

impl fmt::Display for FrontMatterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown front matter preset {0:?} (expected hashnode, hugo, jekyll, astro or default)")]
pub struct UnknownPreset(pub String);

impl FromStr for FrontMatterPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// Caller-supplied front matter, possibly computed asynchronously.
#[async_trait::async_trait]
pub trait FrontMatterMapper: Send + Sync {
    async fn map(&self, post: &PostRecord) -> FrontMatterValue;
}

struct FnMapper<F>(F);

#[async_trait::async_trait]
impl<F> FrontMatterMapper for FnMapper<F>
where
    F: Fn(&PostRecord) -> FrontMatterValue + Send + Sync,
{
    async fn map(&self, post: &PostRecord) -> FrontMatterValue {
        (self.0)(post)
    }
}

#[derive(Clone)]
pub enum FrontMatterSource {
    Preset(FrontMatterPreset),
    Custom(Arc<dyn FrontMatterMapper>),
}

impl FrontMatterSource {
    pub fn custom(mapper: impl FrontMatterMapper + 'static) -> Self {
        FrontMatterSource::Custom(Arc::new(mapper))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&PostRecord) -> FrontMatterValue + Send + Sync + 'static,
    {
        FrontMatterSource::Custom(Arc::new(FnMapper(f)))
    }

    pub async fn resolve(&self, post: &PostRecord) -> FrontMatterValue {
        match self {
            FrontMatterSource::Preset(preset) => preset.map(post),
            FrontMatterSource::Custom(mapper) => mapper.map(post).await,
        }
    }
}

impl Default for FrontMatterSource {
    fn default() -> Self {
        FrontMatterSource::Preset(FrontMatterPreset::Default)
    }
}

impl From<FrontMatterPreset> for FrontMatterSource {
    fn from(preset: FrontMatterPreset) -> Self {
        FrontMatterSource::Preset(preset)
    }
}

impl fmt::Debug for FrontMatterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontMatterSource::Preset(preset) => f.debug_tuple("Preset").field(preset).finish(),
            FrontMatterSource::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
