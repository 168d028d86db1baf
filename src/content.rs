//! Content store: post discovery and front-matter parsing.
//!
//! Stage 1 of the build pipeline. Walks the posts directory, parses every
//! post file into a [`Post`], and returns them in discovery order.
//!
//! ## Directory Structure
//!
//! ```text
//! content/blog/                      # posts_dir
//! ├── hello-world/                   # translation group "hello-world"
//! │   ├── index.md                   # /hello-world/            (default locale)
//! │   ├── index.zh-hans.md           # /zh-hans/hello-world/
//! │   └── cover.jpg                  # ignored (not a post extension)
//! ├── notes.md                       # /notes/                  (no group)
//! └── .drafts/                       # hidden, skipped
//! ```
//!
//! See [`crate::naming`] for the filename convention.
//!
//! ## Front-matter
//!
//! YAML between `---` fences at the top of the file:
//!
//! ```yaml
//! ---
//! title: Hello World
//! date: 2020-01-02
//! description: First post   # or `spoiler:`
//! draft: false
//! tags: [meta]
//! lang: en                  # overrides the filename infix
//! ---
//! ```
//!
//! `title` and `date` are required. Dates accept RFC 3339,
//! `YYYY-MM-DD HH:MM:SS`, and `YYYY-MM-DD` (midnight UTC).
//!
//! ## Validation
//!
//! Every failure here is fatal and names the offending file:
//! - missing or malformed front-matter
//! - unparseable `date`
//! - a language tag outside the configured locale set
//!
//! ## Ordering
//!
//! Files are discovered in file-name order and parsed in parallel with rayon.
//! The returned vector always follows discovery order, which is the tie-break
//! order the sequencer relies on for posts sharing a date.

use crate::config::{LocalesConfig, SiteConfig};
use crate::naming;
use crate::types::Post;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use pulldown_cmark::{Event, Parser, TagEnd};
use rayon::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to walk posts directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Posts directory not found: {0}")]
    PostsDirMissing(PathBuf),
    #[error("No front-matter found in {0}")]
    MissingFrontMatter(PathBuf),
    #[error("Malformed front-matter in {path}: {message}")]
    MalformedFrontMatter { path: PathBuf, message: String },
    #[error("Unparseable date {value:?} in {path}")]
    BadDate { path: PathBuf, value: String },
    #[error("Unknown locale {tag:?} in {path} (configured: {configured})")]
    UnknownLocale {
        path: PathBuf,
        tag: String,
        configured: String,
    },
}

/// Raw front-matter as written in the file.
#[derive(Debug, Deserialize)]
struct FrontMatter {
    title: String,
    date: String,
    #[serde(default, alias = "spoiler")]
    description: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    lang: Option<String>,
}

/// Load every post under the configured posts directory.
pub fn load_posts(root: &Path, config: &SiteConfig) -> Result<Vec<Post>, ContentError> {
    let posts_dir = root.join(&config.content.posts_dir);
    if !posts_dir.is_dir() {
        return Err(ContentError::PostsDirMissing(posts_dir));
    }

    let files = discover_post_files(&posts_dir, &config.content.extensions)?;
    debug!(count = files.len(), dir = %posts_dir.display(), "discovered post files");

    files
        .par_iter()
        .map(|rel| {
            let raw = fs::read_to_string(posts_dir.join(rel)).map_err(|source| {
                ContentError::Io {
                    path: rel.clone(),
                    source,
                }
            })?;
            parse_post(rel, &raw, &config.locales, config.content.excerpt_length)
        })
        .collect()
}

/// List post files under `posts_dir`, relative to it, in file-name order.
///
/// Hidden files and directories (leading `.`) are skipped.
pub fn discover_post_files(
    posts_dir: &Path,
    extensions: &[String],
) -> Result<Vec<PathBuf>, ContentError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(posts_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_post_extension(entry.path(), extensions) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(posts_dir) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}

fn has_post_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy();
            extensions.iter().any(|x| x.eq_ignore_ascii_case(&e))
        })
        .unwrap_or(false)
}

/// Parse one post from its relative path and raw file contents.
pub fn parse_post(
    rel_path: &Path,
    raw: &str,
    locales: &LocalesConfig,
    excerpt_length: usize,
) -> Result<Post, ContentError> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(raw);
    let data = parsed
        .data
        .ok_or_else(|| ContentError::MissingFrontMatter(rel_path.to_path_buf()))?;
    let fm: FrontMatter =
        data.deserialize()
            .map_err(|e| ContentError::MalformedFrontMatter {
                path: rel_path.to_path_buf(),
                message: e.to_string(),
            })?;

    let date = parse_date(&fm.date).ok_or_else(|| ContentError::BadDate {
        path: rel_path.to_path_buf(),
        value: fm.date.clone(),
    })?;

    let name = naming::parse_post_path(rel_path);
    let lang = fm
        .lang
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .or(name.lang)
        .unwrap_or_else(|| locales.default.clone());
    if !locales.contains(&lang) {
        return Err(ContentError::UnknownLocale {
            path: rel_path.to_path_buf(),
            tag: lang,
            configured: locales.all().join(", "),
        });
    }

    let slug = name.name.map(|n| {
        if locales.is_default(&lang) {
            format!("/{n}/")
        } else {
            format!("/{lang}/{n}/")
        }
    });

    let body = parsed.content;
    let excerpt = excerpt(&body, excerpt_length);

    Ok(Post {
        slug,
        lang,
        translation_group: name.group,
        title: fm.title,
        description: fm.description.trim().to_string(),
        date,
        draft: fm.draft,
        tags: fm.tags,
        excerpt,
        body,
        source: rel_path.to_path_buf(),
    })
}

/// Parse a front-matter date into a UTC timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (UTC), and
/// `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Plain text from the start of a markdown body, cut at a word boundary.
///
/// Only text and inline code contribute; markup, HTML, and MDX imports are
/// dropped. Truncated excerpts end with `…`.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let prose: String = body
        .lines()
        .filter(|line| !is_mdx_statement(line))
        .flat_map(|line| [line, "\n"])
        .collect();

    let mut text = String::new();
    for event in Parser::new(&prose) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                text.push(' ')
            }
            _ => {}
        }
        if text.chars().count() > max_chars {
            break;
        }
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let cut: String = collapsed.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end_matches([',', '.', ';', ':']))
}

/// Top-level MDX `import`/`export` lines.
fn is_mdx_statement(line: &str) -> bool {
    line.starts_with("import ") || line.starts_with("export ")
}
