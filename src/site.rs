//! Build pipeline and artifact writer.
//!
//! Wires the stages together as plain function calls:
//!
//! ```text
//! config::load_config → content::load_posts → locale::group
//!     → sequence::sequence → routes::generate → feed::build_feed
//! ```
//!
//! Planning is pure and produces a [`SitePlan`] held entirely in memory.
//! Nothing is written until planning succeeds, and the artifact is assembled
//! in a staging directory next to the output before being swapped into place,
//! so a failed build leaves the previous output untouched.
//!
//! ## Output Structure
//!
//! ```text
//! public/
//! ├── routes.json
//! ├── feed.json                         # when [feed] enabled
//! └── page-data/
//!     ├── index/page-data.json          # /
//!     ├── zh-hans/page-data.json        # /zh-hans/
//!     ├── hello-world/page-data.json    # /hello-world/
//!     └── zh-hans/hello-world/page-data.json
//! ```

use crate::config::{self, SiteConfig};
use crate::content::{self, ContentError};
use crate::feed::{self, Feed};
use crate::locale::{self, TranslationIndex};
use crate::routes::{self, Route, RouteError};
use crate::sequence;
use crate::types::Post;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ROUTES_FILENAME: &str = "routes.json";
pub const PAGE_DATA_DIR: &str = "page-data";
pub const PAGE_DATA_FILENAME: &str = "page-data.json";

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Route error: {0}")]
    Route(#[from] RouteError),
    #[error("Refusing to write output to {0}: it contains the site sources")]
    UnsafeOutput(PathBuf),
}

/// Everything a build produces, before it touches the disk.
#[derive(Debug)]
pub struct SitePlan {
    pub config: SiteConfig,
    pub posts: Vec<Post>,
    pub routes: Vec<Route>,
    pub translations: TranslationIndex,
    pub feed: Option<Feed>,
}

impl SitePlan {
    pub fn post_count(&self, lang: &str) -> usize {
        self.posts.iter().filter(|p| p.lang == lang).count()
    }

    pub fn draft_count(&self) -> usize {
        self.posts.iter().filter(|p| p.draft).count()
    }
}

/// Run the pipeline over posts already in memory.
pub fn plan_posts(
    posts: &[Post],
    config: &SiteConfig,
) -> Result<(Vec<Route>, TranslationIndex, Option<Feed>), RouteError> {
    let groups = locale::group(posts, &config.locales);
    debug!(
        default = groups.default_posts.len(),
        translated = groups.other_posts.len(),
        groups = groups.translations.len(),
        "grouped posts by locale"
    );

    let sequenced = sequence::sequence(&groups.default_posts);
    let routes = routes::generate(
        &config.locales,
        &sequenced,
        &groups.other_posts,
        &groups.translations,
    )?;
    let feed = config
        .feed
        .enabled
        .then(|| feed::build_feed(config, &sequenced));

    Ok((routes, groups.translations, feed))
}

/// Load config and content from the site root and plan the build.
pub fn plan(root: &Path) -> Result<SitePlan, SiteError> {
    let config = config::load_config(root)?;
    let posts = content::load_posts(root, &config)?;
    let (routes, translations, feed) = plan_posts(&posts, &config)?;
    info!(posts = posts.len(), routes = routes.len(), "planned site");
    Ok(SitePlan {
        config,
        posts,
        routes,
        translations,
        feed,
    })
}

/// Plan and write the artifact. Returns the plan for reporting.
pub fn build(root: &Path, output_dir: &Path) -> Result<SitePlan, SiteError> {
    let plan = plan(root)?;
    write(&plan, root, output_dir)?;
    Ok(plan)
}

/// Write a plan to `output_dir`, replacing whatever was there.
pub fn write(plan: &SitePlan, root: &Path, output_dir: &Path) -> Result<(), SiteError> {
    check_output_dir(root, &plan.config, output_dir)?;

    let staging = staging_dir(output_dir)?;
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    if let Err(e) = write_artifact(plan, &staging) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if output_dir.exists() {
        fs::remove_dir_all(output_dir)?;
    }
    fs::rename(&staging, output_dir)?;
    info!(output = %output_dir.display(), "wrote site");
    Ok(())
}

fn write_artifact(plan: &SitePlan, dir: &Path) -> Result<(), SiteError> {
    fs::write(
        dir.join(ROUTES_FILENAME),
        serde_json::to_string_pretty(&plan.routes)?,
    )?;

    for route in &plan.routes {
        let path = page_data_path(dir, route);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(route)?)?;
    }

    if let Some(feed) = &plan.feed {
        let path = dir.join(plan.config.feed.path.trim());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(feed)?)?;
    }
    Ok(())
}

/// Location of a route's page data inside an output directory.
pub fn page_data_path(output_dir: &Path, route: &Route) -> PathBuf {
    output_dir
        .join(PAGE_DATA_DIR)
        .join(route.key())
        .join(PAGE_DATA_FILENAME)
}

/// `public` → `public.partial`, alongside the output directory.
pub fn staging_dir(output_dir: &Path) -> Result<PathBuf, SiteError> {
    let name = output_dir
        .file_name()
        .ok_or_else(|| SiteError::UnsafeOutput(output_dir.to_path_buf()))?;
    let mut staged = name.to_os_string();
    staged.push(".partial");
    Ok(output_dir.with_file_name(staged))
}

/// The output directory is deleted on every build, so it must not be or
/// contain the site root, the posts directory, or the config file.
fn check_output_dir(root: &Path, config: &SiteConfig, output_dir: &Path) -> Result<(), SiteError> {
    if !output_dir.exists() {
        return Ok(());
    }
    let output = output_dir.canonicalize()?;
    let sources = [
        root.to_path_buf(),
        root.join(&config.content.posts_dir),
        root.join(config::CONFIG_FILENAME),
    ];
    for source in sources.iter().filter(|p| p.exists()) {
        if source.canonicalize()?.starts_with(&output) {
            return Err(SiteError::UnsafeOutput(output_dir.to_path_buf()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteContext;
    use crate::test_helpers::{PostBuilder, bilingual_config, setup_fixtures, write_post};
    use tempfile::TempDir;

    #[test]
    fn plan_posts_runs_full_pipeline() {
        let posts = vec![
            PostBuilder::new("g1").group("g1").date("2020-01-02").build(),
            PostBuilder::new("g1")
                .group("g1")
                .lang("zh-hans")
                .date("2020-01-02")
                .build(),
            PostBuilder::new("c").date("2020-01-01").build(),
        ];
        let (routes, translations, feed) = plan_posts(&posts, &bilingual_config()).unwrap();

        assert_eq!(routes.len(), 5);
        assert_eq!(translations.get("g1"), Some(&["zh-hans".to_string()][..]));
        assert_eq!(feed.unwrap().items.len(), 2);
    }

    #[test]
    fn disabled_feed_is_not_planned() {
        let mut config = bilingual_config();
        config.feed.enabled = false;
        let (_, _, feed) = plan_posts(&[], &config).unwrap();
        assert!(feed.is_none());
    }

    #[test]
    fn build_fixtures_writes_artifact() {
        let site = setup_fixtures();
        let out = TempDir::new().unwrap();
        let output = out.path().join("public");

        let plan = build(site.path(), &output).unwrap();

        assert!(output.join(ROUTES_FILENAME).is_file());
        assert!(output.join("feed.json").is_file());
        for route in &plan.routes {
            assert!(
                page_data_path(&output, route).is_file(),
                "missing page data for {}",
                route.path
            );
        }
        assert!(!out.path().join("public.partial").exists());
    }

    #[test]
    fn fixture_translation_is_linked() {
        let site = setup_fixtures();
        let plan = plan(site.path()).unwrap();

        let hello = plan
            .routes
            .iter()
            .find(|r| r.path == "/hello-world/")
            .unwrap();
        match &hello.context {
            RouteContext::Post { translations, .. } => {
                assert_eq!(translations, &vec!["zh-hans".to_string()]);
            }
            other => panic!("unexpected context {other:?}"),
        }
        assert!(plan.routes.iter().any(|r| r.path == "/zh-hans/hello-world/"));
    }

    #[test]
    fn page_data_round_trips_route_json() {
        let site = setup_fixtures();
        let out = TempDir::new().unwrap();
        let output = out.path().join("public");
        let plan = build(site.path(), &output).unwrap();

        let root = plan.routes.iter().find(|r| r.path == "/").unwrap();
        let written = fs::read_to_string(output.join("page-data/index/page-data.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value, serde_json::to_value(root).unwrap());
    }

    #[test]
    fn failed_build_keeps_previous_output() {
        let site = setup_fixtures();
        let out = TempDir::new().unwrap();
        let output = out.path().join("public");
        build(site.path(), &output).unwrap();
        let before = fs::read_to_string(output.join(ROUTES_FILENAME)).unwrap();

        // A second default-language post with the same slug.
        write_post(
            site.path(),
            "2021/hello-world/index.md",
            "---\ntitle: Again\ndate: 2021-01-01\n---\n",
        );
        let err = build(site.path(), &output).unwrap_err();
        assert!(matches!(err, SiteError::Route(RouteError::DuplicatePath { .. })));

        let after = fs::read_to_string(output.join(ROUTES_FILENAME)).unwrap();
        assert_eq!(before, after);
        assert!(!out.path().join("public.partial").exists());
    }

    #[test]
    fn failed_first_build_writes_nothing() {
        let site = setup_fixtures();
        write_post(
            site.path(),
            "2021/hello-world/index.md",
            "---\ntitle: Again\ndate: 2021-01-01\n---\n",
        );
        let out = TempDir::new().unwrap();
        let output = out.path().join("public");

        assert!(build(site.path(), &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn output_containing_sources_is_refused() {
        let site = setup_fixtures();
        let err = build(site.path(), site.path()).unwrap_err();
        assert!(matches!(err, SiteError::UnsafeOutput(_)));
        assert!(site.path().join("config.toml").exists());
    }

    #[test]
    fn output_holding_the_posts_is_refused() {
        let site = setup_fixtures();
        let post = site.path().join("content/blog/hello-world/index.md");

        for output in [site.path().join("content"), site.path().join("content/blog")] {
            let err = build(site.path(), &output).unwrap_err();
            assert!(matches!(err, SiteError::UnsafeOutput(_)), "{}", output.display());
            assert!(post.is_file());
        }
    }

    #[test]
    fn output_beside_the_sources_is_allowed() {
        let site = setup_fixtures();
        let output = site.path().join("public");
        build(site.path(), &output).unwrap();
        // The second build replaces an existing output inside the site root.
        build(site.path(), &output).unwrap();
        assert!(output.join(ROUTES_FILENAME).is_file());
    }

    #[test]
    fn escaping_feed_path_fails_before_writing() {
        let site = setup_fixtures();
        let config = site.path().join("config.toml");
        let mut raw = fs::read_to_string(&config).unwrap();
        raw.push_str("\n[feed]\npath = \"../escaped.json\"\n");
        fs::write(&config, raw).unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("public");

        let err = build(site.path(), &output).unwrap_err();
        assert!(matches!(err, SiteError::Config(_)));
        assert!(!out.path().join("escaped.json").exists());
        assert!(!output.exists());
    }

    #[test]
    fn counts() {
        let site = setup_fixtures();
        let plan = plan(site.path()).unwrap();
        assert_eq!(plan.post_count("zh-hans"), 1);
        assert_eq!(plan.draft_count(), 1);
    }
}
