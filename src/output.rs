//! CLI output formatting for the build pipeline.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every post leads with
//! its positional index and title; the source file and derived facts follow
//! as indented context lines, so the listing reads as a content inventory
//! while still letting users trace entries back to files.
//!
//! # Output Format
//!
//! ## Content
//!
//! ```text
//! Posts (en)
//! 001 Hello World
//!     Source: hello-world/index.md
//!     Translations: zh-hans
//! 002 Loose Notes
//!     Source: notes.md
//!
//! Posts (zh-hans)
//! 001 你好，世界
//!     Source: hello-world/index.zh-hans.md
//!
//! Config
//!     config.toml
//! ```
//!
//! ## Routes
//!
//! ```text
//! / → blog-index (en, 2 posts)
//! /hello-world/ → blog-post (en)
//!     Previous: /notes/
//!     Translations: zh-hans
//! /zh-hans/hello-world/ → blog-post (zh-hans)
//!
//! Generated 4 routes, feed.json (2 items)
//! ```
//!
//! ## Summary
//!
//! ```text
//! 2 posts in en, 1 in zh-hans (1 draft, 1 translated group)
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::routes::{Route, RouteContext};
use crate::site::SitePlan;
use crate::types::Post;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a post header: positional index + title, with a draft marker.
///
/// ```text
/// 001 Hello World
/// 002 Work in Progress (draft)
/// ```
fn post_header(index: usize, post: &Post) -> String {
    let marker = if post.draft { " (draft)" } else { "" };
    format!("{} {}{}", format_index(index), post.title, marker)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Content
// ============================================================================

/// Format discovered posts, grouped by locale in configured order, newest
/// first within each locale.
pub fn format_content_output(plan: &SitePlan, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let locales = &plan.config.locales;

    for (section, lang) in locales.all().into_iter().enumerate() {
        if section > 0 {
            lines.push(String::new());
        }
        lines.push(format!("Posts ({lang})"));

        let mut posts: Vec<&Post> = plan.posts.iter().filter(|p| p.lang == lang).collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date));

        if posts.is_empty() {
            lines.push(format!("{}(none)", indent(1)));
        }
        for (i, post) in posts.iter().enumerate() {
            lines.push(post_header(i + 1, post));
            lines.push(format!(
                "{}Source: {}",
                indent(1),
                post.source.display()
            ));
            let summary = truncate_desc(post.summary().trim(), 60);
            if !summary.is_empty() {
                lines.push(format!("{}{}", indent(1), summary));
            }
            if locales.is_default(lang) {
                let translations = plan.translations.translations_for(post, locales);
                if !translations.is_empty() {
                    lines.push(format!(
                        "{}Translations: {}",
                        indent(1),
                        translations.join(", ")
                    ));
                }
            }
        }
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if source_root.join(crate::config::CONFIG_FILENAME).exists() {
        lines.push(format!("{}{}", indent(1), crate::config::CONFIG_FILENAME));
    } else {
        lines.push(format!("{}(stock defaults)", indent(1)));
    }

    lines
}

/// Print content output to stdout.
pub fn print_content_output(plan: &SitePlan, source_root: &Path) {
    for line in format_content_output(plan, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Format the route table followed by a one-line summary.
pub fn format_route_output(plan: &SitePlan) -> Vec<String> {
    let mut lines: Vec<String> = plan.routes.iter().flat_map(route_lines).collect();

    lines.push(String::new());
    let mut summary = format!("Generated {}", plural(plan.routes.len(), "route"));
    if let Some(feed) = &plan.feed {
        summary.push_str(&format!(
            ", {} ({})",
            plan.config.feed.path,
            plural(feed.items.len(), "item")
        ));
    }
    lines.push(summary);
    lines
}

fn route_lines(route: &Route) -> Vec<String> {
    let arrow = "\u{2192}";
    let template = route.template.as_str();
    match &route.context {
        RouteContext::Index { lang, posts } => vec![format!(
            "{} {arrow} {template} ({lang}, {})",
            route.path,
            plural(posts.len(), "post")
        )],
        RouteContext::Post {
            lang,
            translations,
            previous,
            next,
            ..
        } => {
            let mut lines = vec![format!("{} {arrow} {template} ({lang})", route.path)];
            if let Some(prev) = previous {
                lines.push(format!("{}Previous: {}", indent(1), prev.slug));
            }
            if let Some(next) = next {
                lines.push(format!("{}Next: {}", indent(1), next.slug));
            }
            if !translations.is_empty() {
                lines.push(format!(
                    "{}Translations: {}",
                    indent(1),
                    translations.join(", ")
                ));
            }
            lines
        }
        RouteContext::Translated { lang, .. } => {
            vec![format!("{} {arrow} {template} ({lang})", route.path)]
        }
    }
}

/// Print the route table to stdout.
pub fn print_route_output(plan: &SitePlan) {
    for line in format_route_output(plan) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// One line of post counts per locale.
pub fn format_build_summary(plan: &SitePlan) -> String {
    let counts: Vec<String> = plan
        .config
        .locales
        .all()
        .into_iter()
        .enumerate()
        .map(|(i, lang)| {
            let n = plan.post_count(lang);
            if i == 0 {
                format!("{} in {lang}", plural(n, "post"))
            } else {
                format!("{n} in {lang}")
            }
        })
        .collect();
    format!(
        "{} ({}, {} translated {})",
        counts.join(", "),
        plural(plan.draft_count(), "draft"),
        plan.translations.len(),
        if plan.translations.len() == 1 { "group" } else { "groups" }
    )
}
