//! Shared types used across all pipeline stages.
//!
//! A [`Post`] is built once by the content store and then only borrowed: the
//! grouper, sequencer, and route generator all hold `&Post` references into
//! the same vector, so the whole build shares a single immutable snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// One published or draft content unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// URL path (`/hello-world/`, `/zh-hans/hello-world/`). `None` when the
    /// file name gives nothing to derive it from.
    pub slug: Option<String>,
    /// Language tag, always a member of the configured locale set.
    pub lang: String,
    /// Directory name shared by every language variant of this post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_group: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub draft: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Plain-text opening of the body, used when `description` is empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    /// Raw markup after the front-matter.
    #[serde(skip)]
    pub body: String,
    /// Source path relative to the posts directory.
    pub source: PathBuf,
}

impl Post {
    /// Description, falling back to the excerpt.
    pub fn summary(&self) -> &str {
        if self.description.is_empty() {
            &self.excerpt
        } else {
            &self.description
        }
    }
}

/// Compact reference to another post, carried in route contexts for
/// previous/next links and index listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostLink {
    pub slug: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl PostLink {
    /// Build a link from a post. Posts without a slug cannot be linked to.
    pub fn from_post(post: &Post) -> Option<Self> {
        Some(Self {
            slug: post.slug.clone()?,
            title: post.title.clone(),
            date: post.date,
            description: post.summary().to_string(),
        })
    }
}
