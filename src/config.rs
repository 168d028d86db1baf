//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized into a TOML table and the user's file is merged on top of it, so
//! a config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! my-blog/
//! ├── config.toml              # Site config (optional)
//! └── content/
//!     └── blog/
//!         ├── hello-world/
//!         │   ├── index.md
//!         │   └── index.zh-hans.md
//!         └── notes.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [site]
//! title = "My Blog"
//! description = ""
//! author = ""
//! url = ""                  # Origin for feed links, e.g. "https://example.com"
//!
//! [locales]
//! default = "en"            # Unprefixed paths
//! translations = []         # Prefixed paths: /<lang>/<slug>/
//!
//! [content]
//! posts_dir = "content/blog"
//! extensions = ["md", "mdx"]
//! excerpt_length = 140
//!
//! [feed]
//! enabled = true
//! path = "feed.json"
//! limit = 0                 # 0 = every post
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 8000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site identity used by the feed.
    pub site: SiteMeta,
    /// Default locale and its translations.
    pub locales: LocalesConfig,
    /// Where posts live and how they are read.
    pub content: ContentConfig,
    /// Syndication feed output.
    pub feed: FeedConfig,
    /// Settings for `dev` and `preview`.
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.locales.validate()?;
        let url = self.site.url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "site.url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.content.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "content.extensions must not be empty".into(),
            ));
        }
        if self.feed.enabled {
            self.feed.validate()?;
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("serve.port must be non-zero".into()));
        }
        Ok(())
    }
}

impl FeedConfig {
    /// The feed is written into the output directory next to the route
    /// artifacts, so its path must stay inside and not collide with them.
    fn validate(&self) -> Result<(), ConfigError> {
        let path = Path::new(self.path.trim());
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "feed.path must not be empty when the feed is enabled".into(),
            ));
        }
        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(ConfigError::Validation(format!(
                "feed.path must be a relative path inside the output directory, got {:?}",
                self.path
            )));
        }
        let reserved = path == Path::new(crate::site::ROUTES_FILENAME)
            || path.starts_with(crate::site::PAGE_DATA_DIR);
        if reserved {
            return Err(ConfigError::Validation(format!(
                "feed.path {:?} collides with the route artifacts",
                self.path
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    pub author: String,
    /// Site origin without trailing slash. Empty means feed links are
    /// emitted as root-relative paths.
    pub url: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            title: "My Blog".to_string(),
            description: String::new(),
            author: String::new(),
            url: String::new(),
        }
    }
}

impl SiteMeta {
    /// Join the site origin with a route path.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

/// Locale set. The default locale is canonical and gets unprefixed paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalesConfig {
    pub default: String,
    pub translations: Vec<String>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            translations: Vec::new(),
        }
    }
}

impl LocalesConfig {
    /// All configured locales, default first, then translations in
    /// declaration order.
    pub fn all(&self) -> Vec<&str> {
        std::iter::once(self.default.as_str())
            .chain(self.translations.iter().map(String::as_str))
            .collect()
    }

    pub fn is_default(&self, tag: &str) -> bool {
        self.default == tag
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.is_default(tag) || self.translations.iter().any(|t| t == tag)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<&str> = Vec::new();
        for tag in self.all() {
            if !is_valid_locale_tag(tag) {
                return Err(ConfigError::Validation(format!(
                    "invalid locale tag {tag:?}: use lowercase letters, digits and '-'"
                )));
            }
            if seen.contains(&tag) {
                return Err(ConfigError::Validation(if tag == self.default {
                    format!("default locale {tag:?} must not be listed in locales.translations")
                } else {
                    format!("locale {tag:?} is listed twice in locales.translations")
                }));
            }
            seen.push(tag);
        }
        Ok(())
    }
}

/// Locale tags double as path segments and filename infixes, so they are
/// restricted to lowercase ASCII alphanumerics separated by single dashes.
pub fn is_valid_locale_tag(tag: &str) -> bool {
    !tag.is_empty()
        && !tag.starts_with('-')
        && !tag.ends_with('-')
        && !tag.contains("--")
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Posts directory, relative to the site root.
    pub posts_dir: String,
    /// File extensions treated as posts (case-insensitive).
    pub extensions: Vec<String>,
    /// Maximum characters of body text used as an excerpt.
    pub excerpt_length: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            posts_dir: "content/blog".to_string(),
            extensions: vec!["md".to_string(), "mdx".to_string()],
            excerpt_length: 140,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub enabled: bool,
    /// Output path of the feed document, relative to the output directory.
    pub path: String,
    /// Maximum number of items. `0` keeps every post.
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "feed.json".to_string(),
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub interface: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the site root, falling back to the
/// stock defaults when the file is absent.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# polypost configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site identity (used by the feed)
# ---------------------------------------------------------------------------
[site]
title = "My Blog"
description = ""
author = ""
# Origin prepended to post paths in feed links, e.g. "https://example.com".
# Leave empty to emit root-relative links.
url = ""

# ---------------------------------------------------------------------------
# Locales
# ---------------------------------------------------------------------------
[locales]
# Canonical language. Its posts and index live at unprefixed paths.
default = "en"
# Additional languages, e.g. ["zh-hans"]. Their posts live under /<lang>/.
# A translation is written next to the original as index.<lang>.md.
translations = []

# ---------------------------------------------------------------------------
# Content
# ---------------------------------------------------------------------------
[content]
# Directory holding posts, relative to the site root.
posts_dir = "content/blog"
# File extensions treated as posts.
extensions = ["md", "mdx"]
# Characters of body text used when a post has no description.
excerpt_length = 140

# ---------------------------------------------------------------------------
# Feed (JSON Feed 1.1, default-language posts only, drafts excluded)
# ---------------------------------------------------------------------------
[feed]
enabled = true
path = "feed.json"
# Maximum number of items; 0 keeps every post.
limit = 0

# ---------------------------------------------------------------------------
# Development server (dev / preview)
# ---------------------------------------------------------------------------
[serve]
interface = "127.0.0.1"
port = 8000
"##
}
