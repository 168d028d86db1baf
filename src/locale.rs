//! Locale grouping.
//!
//! Stage 2 of the build pipeline. Splits posts into default-language and
//! translated posts, and records which translations exist for each
//! translation group.
//!
//! The pass is single and order-insensitive for the index itself; the two
//! partitions keep input order so later stages can rely on it for tie-breaks.

use crate::config::LocalesConfig;
use crate::types::Post;
use std::collections::BTreeMap;

/// Translation group → non-default language tags present, in first-seen
/// order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationIndex {
    groups: BTreeMap<String, Vec<String>>,
}

impl TranslationIndex {
    /// Record that `group` has a variant in `lang`.
    pub fn insert(&mut self, group: &str, lang: &str) {
        let langs = self.groups.entry(group.to_string()).or_default();
        if !langs.iter().any(|l| l == lang) {
            langs.push(lang.to_string());
        }
    }

    /// Languages recorded for a group. `None` means the group has no
    /// translated variants at all.
    pub fn get(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Resolve the translations of a post, ordered by configured locale order.
    ///
    /// Posts without a group, and groups nobody translated, resolve to an
    /// empty list.
    pub fn translations_for(&self, post: &Post, locales: &LocalesConfig) -> Vec<String> {
        let Some(found) = post.translation_group.as_deref().and_then(|g| self.get(g)) else {
            return Vec::new();
        };
        locales
            .translations
            .iter()
            .filter(|tag| found.contains(*tag))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Output of [`group`].
#[derive(Debug, Clone, Default)]
pub struct LocaleGroups<'a> {
    pub default_posts: Vec<&'a Post>,
    pub other_posts: Vec<&'a Post>,
    pub translations: TranslationIndex,
}

/// Partition posts by language and build the translation index.
pub fn group<'a>(posts: &'a [Post], locales: &LocalesConfig) -> LocaleGroups<'a> {
    let mut out = LocaleGroups::default();
    for post in posts {
        if locales.is_default(&post.lang) {
            out.default_posts.push(post);
            continue;
        }
        if let Some(group) = &post.translation_group {
            out.translations.insert(group, &post.lang);
        }
        out.other_posts.push(post);
    }
    out
}
