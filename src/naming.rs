//! Centralized filename parsing for post files.
//!
//! Every post file follows the same pattern: a stem, an optional language
//! infix, and an extension.
//!
//! ```text
//! hello-world/index.md          → post "hello-world", group "hello-world"
//! hello-world/index.zh-hans.md  → post "hello-world", group "hello-world", lang "zh-hans"
//! notes.md                      → post "notes", no group
//! notes.fr.mdx                  → post "notes", no group, lang "fr"
//! ```
//!
//! A file called `index` takes its name from the directory that contains it,
//! and that directory name doubles as the translation group shared by every
//! language variant inside it. Files with any other stem are standalone posts.

use std::path::Path;

/// Stem that marks a post named after its containing directory.
pub const INDEX_STEM: &str = "index";

/// Result of parsing a post path relative to the posts directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPostName {
    /// Post name used to build the slug. `None` when the file is an `index`
    /// with no containing directory inside the posts directory.
    pub name: Option<String>,
    /// Language infix from the filename (`index.zh-hans.md` → `zh-hans`).
    pub lang: Option<String>,
    /// Containing directory name for `index` files.
    pub group: Option<String>,
}

/// Split a file name into `(stem, lang infix)`, dropping the extension.
///
/// - `"index.md"` → `("index", None)`
/// - `"index.zh-hans.md"` → `("index", Some("zh-hans"))`
/// - `"notes"` → `("notes", None)`
pub fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    let without_ext = match file_name.rfind('.') {
        Some(pos) if pos > 0 => &file_name[..pos],
        _ => file_name,
    };
    match without_ext.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < without_ext.len() => {
            (&without_ext[..pos], Some(&without_ext[pos + 1..]))
        }
        _ => (without_ext, None),
    }
}

/// Parse a post path (relative to the posts directory).
pub fn parse_post_path(rel_path: &Path) -> ParsedPostName {
    let file_name = rel_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (stem, lang) = split_file_name(&file_name);
    let lang = lang.map(str::to_string);

    if stem == INDEX_STEM {
        let group = rel_path
            .parent()
            .and_then(Path::file_name)
            .map(|d| d.to_string_lossy().into_owned())
            .filter(|d| !d.is_empty());
        ParsedPostName {
            name: group.clone(),
            lang,
            group,
        }
    } else {
        ParsedPostName {
            name: Some(stem.to_string()).filter(|s| !s.is_empty()),
            lang,
            group: None,
        }
    }
}
