//! Syndication feed.
//!
//! Builds a [JSON Feed 1.1](https://www.jsonfeed.org/version/1.1/) document
//! from default-language posts. Drafts are excluded and items run newest
//! first, so the feed mirrors the default-locale index.

use crate::config::SiteConfig;
use crate::sequence::SequencedPost;
use crate::types::Post;
use serde::Serialize;

pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    pub version: &'static str,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub language: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<FeedAuthor>,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,
    pub content_text: String,
    pub date_published: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Build the feed from sequenced default-language posts.
///
/// `sequenced` is already newest first; posts without a slug are skipped
/// (route generation rejects them before the feed is written).
pub fn build_feed(config: &SiteConfig, sequenced: &[SequencedPost<'_>]) -> Feed {
    let limit = match config.feed.limit {
        0 => usize::MAX,
        n => n,
    };
    let items = feed_posts(sequenced)
        .filter_map(|post| feed_item(config, post))
        .take(limit)
        .collect();

    let has_origin = !config.site.url.is_empty();
    let feed_path = format!("/{}", config.feed.path.trim_start_matches('/'));

    Feed {
        version: JSON_FEED_VERSION,
        title: config.site.title.clone(),
        home_page_url: has_origin.then(|| config.site.absolute_url("/")),
        feed_url: has_origin.then(|| config.site.absolute_url(&feed_path)),
        description: config.site.description.clone(),
        language: config.locales.default.clone(),
        authors: Some(config.site.author.trim())
            .filter(|a| !a.is_empty())
            .map(|name| FeedAuthor {
                name: name.to_string(),
            })
            .into_iter()
            .collect(),
        items,
    }
}

/// Posts eligible for the feed: non-draft, in sequence order.
pub fn feed_posts<'a, 'b>(
    sequenced: &'b [SequencedPost<'a>],
) -> impl Iterator<Item = &'a Post> {
    sequenced.iter().map(|s| s.post).filter(|p| !p.draft)
}

fn feed_item(config: &SiteConfig, post: &Post) -> Option<FeedItem> {
    let url = config.site.absolute_url(post.slug.as_deref()?);
    Some(FeedItem {
        id: url.clone(),
        url,
        title: post.title.clone(),
        summary: post.summary().to_string(),
        content_text: post.body.trim().to_string(),
        date_published: post.date.to_rfc3339(),
        tags: post.tags.clone(),
    })
}
