//! # Polypost
//!
//! A build tool for bilingual markdown blogs. Posts live as markdown/MDX files
//! with YAML front-matter; translations sit next to the original as
//! `index.<lang>.md`. Polypost turns that directory into a route table with
//! per-page data and a JSON feed, ready for any front-end to render.
//!
//! # Architecture: An Explicit Pipeline
//!
//! Each stage is a plain function over in-memory data, called in order by
//! [`site::plan`]:
//!
//! ```text
//! 1. Content Store    content/blog/  →  Vec<Post>          (parse + validate)
//! 2. Locale Grouper   Vec<Post>      →  LocaleGroups       (default / other + translation index)
//! 3. Sequencer        default posts  →  Vec<SequencedPost> (newest first, prev/next)
//! 4. Route Generator  all of above   →  Vec<Route>         (unique paths, page contexts)
//!    Feed Builder     sequenced      →  Feed               (JSON Feed 1.1)
//! ```
//!
//! There is no hook registry or plugin lifecycle: the dependency order is
//! the call order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`content`] | Stage 1: discovers post files, parses front-matter, derives slugs |
//! | [`locale`] | Stage 2: splits posts by locale and builds the translation index |
//! | [`sequence`] | Stage 3: date ordering and previous/next links |
//! | [`routes`] | Stage 4: route table with duplicate-path detection |
//! | [`feed`] | JSON Feed built from the sequenced default-locale posts |
//! | [`site`] | Pipeline wiring and the all-or-nothing artifact writer |
//! | [`serve`] | `preview` HTTP server and the `dev` watch-and-rebuild loop |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`naming`] | Post path convention: `name/index.<lang>.md` |
//! | [`types`] | `Post` and the `PostLink` summaries embedded in routes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Filesystem Names the Translation
//!
//! A post's translation group is the directory holding its `index` file, and
//! its language is the filename infix (`index.zh-hans.md`) unless front-matter
//! says otherwise. Two files in the same directory are translations of each
//! other; nothing else links them. Loose files (`notes.md`) are posts without
//! translations.
//!
//! ## Only the Default Locale Is Sequenced
//!
//! Previous/next navigation and the feed cover default-language posts only.
//! A translated page links back to its original through the translation
//! index instead of carrying its own navigation.
//!
//! ## All or Nothing
//!
//! Every error (bad front-matter, unparseable date, unknown locale, two posts
//! claiming one path) aborts the build before anything is written. The
//! artifact is staged beside the output directory and swapped in only when
//! complete, so a failed build never leaves a half-written site.
//!
//! ## Drafts Are Unlisted, Not Hidden
//!
//! A draft still gets its route so it can be reviewed by URL, but it stays
//! out of index listings and the feed.

pub mod config;
pub mod content;
pub mod feed;
pub mod locale;
pub mod naming;
pub mod output;
pub mod routes;
pub mod sequence;
pub mod serve;
pub mod site;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
