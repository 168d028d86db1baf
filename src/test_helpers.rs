//! Shared test utilities for the polypost test suite.
//!
//! Provides a [`PostBuilder`] for in-memory posts, fixture setup for tests
//! that need a real site on disk, and small extractors for assertions.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let posts = vec![
//!     PostBuilder::new("hello").group("hello").date("2020-01-02").build(),
//!     PostBuilder::new("hello").group("hello").lang("zh-hans").build(),
//! ];
//! let groups = locale::group(&posts, &bilingual_locales());
//! assert_eq!(slugs(&groups.other_posts), vec!["/zh-hans/hello/"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{LocalesConfig, SiteConfig};
use crate::content::parse_date;
use crate::routes::Route;
use crate::types::Post;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write a post file under `<root>/content/blog/<rel>`, creating parents.
pub fn write_post(root: &Path, rel: &str, contents: &str) {
    let path = root.join("content/blog").join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

// =========================================================================
// Config
// =========================================================================

/// `en` default with a `zh-hans` translation.
pub fn bilingual_locales() -> LocalesConfig {
    LocalesConfig {
        default: "en".into(),
        translations: vec!["zh-hans".into()],
    }
}

pub fn bilingual_config() -> SiteConfig {
    SiteConfig {
        locales: bilingual_locales(),
        ..SiteConfig::default()
    }
}

// =========================================================================
// Post builder
// =========================================================================

/// Builds a [`Post`] the way the content store would, assuming `en` is the
/// default locale. The slug is derived from the name and language unless
/// [`PostBuilder::no_slug`] is called.
pub struct PostBuilder {
    name: String,
    lang: String,
    group: Option<String>,
    date: String,
    draft: bool,
    description: String,
    excerpt: String,
    source: Option<PathBuf>,
    with_slug: bool,
}

impl PostBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: "en".to_string(),
            group: None,
            date: "2020-01-01".to_string(),
            draft: false,
            description: String::new(),
            excerpt: String::new(),
            source: None,
            with_slug: true,
        }
    }

    pub fn lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn excerpt(mut self, excerpt: &str) -> Self {
        self.excerpt = excerpt.to_string();
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = Some(PathBuf::from(source));
        self
    }

    pub fn no_slug(mut self) -> Self {
        self.with_slug = false;
        self
    }

    pub fn build(self) -> Post {
        let slug = self.with_slug.then(|| {
            if self.lang == "en" {
                format!("/{}/", self.name)
            } else {
                format!("/{}/{}/", self.lang, self.name)
            }
        });
        let source = self.source.unwrap_or_else(|| {
            let file = if self.lang == "en" {
                "index.md".to_string()
            } else {
                format!("index.{}.md", self.lang)
            };
            PathBuf::from(&self.name).join(file)
        });
        Post {
            slug,
            lang: self.lang,
            translation_group: self.group,
            title: self.name,
            description: self.description,
            date: parse_date(&self.date)
                .unwrap_or_else(|| panic!("bad test date {:?}", self.date)),
            draft: self.draft,
            tags: Vec::new(),
            excerpt: self.excerpt,
            body: String::new(),
            source,
        }
    }
}

// =========================================================================
// Extractors
// =========================================================================

/// Slugs of a post list, in order. Panics on a post without a slug.
pub fn slugs<'a>(posts: &[&'a Post]) -> Vec<&'a str> {
    posts
        .iter()
        .copied()
        .map(|p| {
            p.slug
                .as_deref()
                .unwrap_or_else(|| panic!("post {} has no slug", p.source.display()))
        })
        .collect()
}

/// Route paths, in generation order.
pub fn route_paths(routes: &[Route]) -> Vec<&str> {
    routes.iter().map(|r| r.path.as_str()).collect()
}
