//! Route generation.
//!
//! Stage 4 of the build pipeline. Turns grouped and sequenced posts into a
//! flat, ordered list of [`Route`]s:
//!
//! | Route | Path | Template | Context |
//! |-------|------|----------|---------|
//! | Default-locale index | `/` | `blog-index` | `lang`, post listing |
//! | Other-locale index | `/<lang>/` | `blog-index` | `lang`, post listing |
//! | Default-language post | slug | `blog-post` | `slug`, `lang`, `translations`, `previous`, `next` |
//! | Translated post | slug | `blog-post` | `slug`, `lang` |
//!
//! Translated posts carry no navigation or translation list; they link back
//! to the original rather than sideways. Previous/next links step over
//! drafts, so published page data never exposes an unlisted URL.
//!
//! Output order is index routes in locale order, then default-language posts
//! newest first, then translated posts in input order.
//!
//! ## Validation
//!
//! Generation is all-or-nothing. A post without a slug or two routes sharing
//! a path abort the whole run and no routes are returned.

use crate::config::LocalesConfig;
use crate::locale::TranslationIndex;
use crate::sequence::{self, SequencedPost};
use crate::types::{Post, PostLink};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RouteError {
    #[error("Post has no resolvable slug: {0}")]
    MissingSlug(PathBuf),
    #[error("Duplicate route path {path}: {first} and {second}")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },
}

/// Page template a route renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Template {
    BlogIndex,
    BlogPost,
}

impl Template {
    pub fn as_str(self) -> &'static str {
        match self {
            Template::BlogIndex => "blog-index",
            Template::BlogPost => "blog-post",
        }
    }
}

/// Data handed to the template. Serialized as a flat key-value map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteContext {
    Index {
        lang: String,
        posts: Vec<PostLink>,
    },
    Post {
        slug: String,
        lang: String,
        translations: Vec<String>,
        previous: Option<PostLink>,
        next: Option<PostLink>,
    },
    Translated {
        slug: String,
        lang: String,
    },
}

impl RouteContext {
    pub fn lang(&self) -> &str {
        match self {
            RouteContext::Index { lang, .. }
            | RouteContext::Post { lang, .. }
            | RouteContext::Translated { lang, .. } => lang,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub path: String,
    pub template: Template,
    pub context: RouteContext,
}

impl Route {
    /// Directory key for per-route output: the path without surrounding
    /// slashes, or `index` for the site root.
    pub fn key(&self) -> String {
        route_key(&self.path)
    }
}

/// See [`Route::key`].
pub fn route_key(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "index".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Index path for a locale.
pub fn index_path(lang: &str, locales: &LocalesConfig) -> String {
    if locales.is_default(lang) {
        "/".to_string()
    } else {
        format!("/{lang}/")
    }
}

/// Generate the full route set.
pub fn generate(
    locales: &LocalesConfig,
    sequenced: &[SequencedPost<'_>],
    other_posts: &[&Post],
    translations: &TranslationIndex,
) -> Result<Vec<Route>, RouteError> {
    // Fail before producing anything if a slug is missing.
    for post in sequenced.iter().map(|s| s.post).chain(other_posts.iter().copied()) {
        require_slug(post)?;
    }

    let mut registry = PathRegistry::default();
    let mut routes = Vec::with_capacity(locales.all().len() + sequenced.len() + other_posts.len());

    for lang in locales.all() {
        let path = index_path(lang, locales);
        registry.claim(&path, format!("index page for {lang}"))?;
        routes.push(Route {
            path,
            template: Template::BlogIndex,
            context: RouteContext::Index {
                lang: lang.to_string(),
                posts: index_listing(lang, locales, sequenced, other_posts),
            },
        });
    }

    for (i, item) in sequenced.iter().enumerate() {
        let post = item.post;
        let nav = sequence::published_navigation(sequenced, i);
        let slug = require_slug(post)?;
        registry.claim(slug, post.source.display().to_string())?;
        routes.push(Route {
            path: slug.to_string(),
            template: Template::BlogPost,
            context: RouteContext::Post {
                slug: slug.to_string(),
                lang: post.lang.clone(),
                translations: translations.translations_for(post, locales),
                previous: nav.previous.and_then(PostLink::from_post),
                next: nav.next.and_then(PostLink::from_post),
            },
        });
    }

    for post in other_posts {
        let slug = require_slug(post)?;
        registry.claim(slug, post.source.display().to_string())?;
        routes.push(Route {
            path: slug.to_string(),
            template: Template::BlogPost,
            context: RouteContext::Translated {
                slug: slug.to_string(),
                lang: post.lang.clone(),
            },
        });
    }

    Ok(routes)
}

fn require_slug(post: &Post) -> Result<&str, RouteError> {
    post.slug
        .as_deref()
        .ok_or_else(|| RouteError::MissingSlug(post.source.clone()))
}

/// Non-draft posts of one locale, newest first.
fn index_listing(
    lang: &str,
    locales: &LocalesConfig,
    sequenced: &[SequencedPost<'_>],
    other_posts: &[&Post],
) -> Vec<PostLink> {
    if locales.is_default(lang) {
        return sequenced
            .iter()
            .filter(|s| !s.post.draft)
            .filter_map(|s| PostLink::from_post(s.post))
            .collect();
    }
    let mut posts: Vec<&Post> = other_posts
        .iter()
        .copied()
        .filter(|p| p.lang == lang && !p.draft)
        .collect();
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    posts.into_iter().filter_map(PostLink::from_post).collect()
}

/// Tracks which origin claimed each path.
#[derive(Default)]
struct PathRegistry {
    claimed: HashMap<String, String>,
}

impl PathRegistry {
    fn claim(&mut self, path: &str, origin: String) -> Result<(), RouteError> {
        if let Some(first) = self.claimed.get(path) {
            return Err(RouteError::DuplicatePath {
                path: path.to_string(),
                first: first.clone(),
                second: origin,
            });
        }
        self.claimed.insert(path.to_string(), origin);
        Ok(())
    }
}
