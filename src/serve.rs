//! Local preview server and watch-and-rebuild loop.
//!
//! `preview` serves an existing build output over HTTP. `dev` builds once,
//! watches the site root for changes on a background thread and rebuilds,
//! while the main thread serves the output:
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │   Main Thread   │     │  Watcher Thread  │
//! │  (HTTP Server)  │     │  (notify events) │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//!    serve public/          debounce → site::build
//! ```
//!
//! There is no HTML rendering, so a route path such as `/hello-world/`
//! resolves to its page data (`page-data/hello-world/page-data.json`) when
//! no file exists at that path. A failed rebuild is logged and the previous
//! output keeps being served.

use crate::config::ServeConfig;
use crate::routes::route_key;
use crate::site::{self, PAGE_DATA_DIR, PAGE_DATA_FILENAME};
use maud::{DOCTYPE, Markup, html};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{error, info, warn};

const MAX_PORT_RETRIES: u16 = 10;
const DEBOUNCE_MS: u64 = 300;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid serve.interface {0:?}")]
    Interface(String),
    #[error("failed to bind after {attempts} attempts (ports {first}-{last}): {message}")]
    Bind {
        attempts: u16,
        first: u16,
        last: u16,
        message: String,
    },
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("{0}")]
    Site(#[from] site::SiteError),
}

// ============================================================================
// Entry points
// ============================================================================

/// Serve `output_dir` until the process is interrupted.
pub fn preview(output_dir: &Path, config: &ServeConfig) -> Result<(), ServeError> {
    let interface: IpAddr = config
        .interface
        .parse()
        .map_err(|_| ServeError::Interface(config.interface.clone()))?;
    let (server, addr) = try_bind_port(interface, config.port, MAX_PORT_RETRIES)?;
    println!("Serving {} at http://{}", output_dir.display(), addr);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, output_dir) {
            warn!("request error: {e}");
        }
    }
    Ok(())
}

/// Build, then serve while rebuilding on every change under `root`.
///
/// A failing initial build is reported but does not stop the server, so the
/// author can fix the content and let the watcher pick it up.
pub fn dev(root: &Path, output_dir: &Path) -> Result<(), ServeError> {
    let config = crate::config::load_config(root).map_err(site::SiteError::from)?;
    rebuild(root, output_dir, "initial build");

    let watch_root = std::path::absolute(root)?;
    let ignored = ignored_dirs(output_dir)?;
    let build_root = root.to_path_buf();
    let build_output = output_dir.to_path_buf();
    std::thread::spawn(move || {
        if let Err(e) = watch_for_changes(&watch_root, &ignored, || {
            rebuild(&build_root, &build_output, "change detected")
        }) {
            error!("watcher stopped: {e}");
        }
    });

    preview(output_dir, &config.serve)
}

fn rebuild(root: &Path, output_dir: &Path, reason: &str) {
    let started = Instant::now();
    match site::build(root, output_dir) {
        Ok(plan) => println!(
            "Rebuilt ({reason}): {} posts, {} routes in {:.0?}",
            plan.posts.len(),
            plan.routes.len(),
            started.elapsed()
        ),
        Err(e) => error!("build failed ({reason}): {e}"),
    }
}

/// Bind to `base_port`, moving up one port at a time while it is taken.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr), ServeError> {
    let mut last_error = String::new();
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    info!("port {base_port} in use, using {port} instead");
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = e.to_string(),
        }
    }
    Err(ServeError::Bind {
        attempts: max_retries,
        first: base_port,
        last: base_port.saturating_add(max_retries.saturating_sub(1)),
        message: last_error,
    })
}

// ============================================================================
// Request handling
// ============================================================================

fn handle_request(request: Request, output_dir: &Path) -> std::io::Result<()> {
    let url = urlencoding::decode(request.url())
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| request.url().to_string());

    match resolve_request(output_dir, &url) {
        Some(path) => {
            let body = fs::read(&path)?;
            respond(request, 200, guess_content_type(&path), body)
        }
        None => {
            let page = not_found_page(&url).into_string();
            respond(request, 404, "text/html; charset=utf-8", page.into_bytes())
        }
    }
}

fn respond(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> std::io::Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    if let Ok(header) = Header::from_bytes("Content-Type", content_type) {
        response.add_header(header);
    }
    request.respond(response)
}

/// Map a request URL to a file in the output directory.
///
/// Resolution order:
/// 1. Exact file match
/// 2. Directory with `index.html`
/// 3. Page data for the route at that path
///
/// URLs that try to leave the output directory resolve to nothing.
pub fn resolve_request(output_dir: &Path, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let relative = Path::new(path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let local = output_dir.join(relative);
    if local.is_file() {
        return Some(local);
    }
    let index = local.join("index.html");
    if index.is_file() {
        return Some(index);
    }
    let page_data = output_dir
        .join(PAGE_DATA_DIR)
        .join(route_key(path))
        .join(PAGE_DATA_FILENAME);
    page_data.is_file().then_some(page_data)
}

/// Guess MIME content type from file extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md" | "mdx") => "text/markdown; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn not_found_page(url: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Not found" }
            }
            body {
                h1 { "404" }
                p { "Nothing is built at " code { (url) } "." }
                p { a href="/" { "Back to the index" } }
            }
        }
    }
}

// ============================================================================
// Watching
// ============================================================================

/// Output and staging directories, as absolute paths. Changes inside them
/// come from our own builds and must not trigger another one.
fn ignored_dirs(output_dir: &Path) -> Result<Vec<PathBuf>, ServeError> {
    let output = std::path::absolute(output_dir)?;
    let staging = site::staging_dir(&output)?;
    Ok(vec![output, staging])
}

/// Editor swap files, backups and dotfiles.
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext, "bak" | "swp" | "swo" | "tmp") || name.ends_with('~') || name.starts_with('.')
}

/// Whether a changed path should trigger a rebuild.
pub fn is_watched_path(path: &Path, ignored: &[PathBuf]) -> bool {
    !is_temp_file(path) && !ignored.iter().any(|dir| path.starts_with(dir))
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Batches rapid file events into a single rebuild.
struct Debouncer {
    pending: HashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: HashSet::new(),
            last_event: None,
        }
    }

    /// Every non-empty batch restarts the quiet period, repeats included.
    fn add(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut any = false;
        for path in paths {
            self.pending.insert(path);
            any = true;
        }
        if any {
            self.last_event = Some(Instant::now());
        }
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

/// Block on file events under `root`, calling `on_change` once per settled
/// batch of relevant changes.
fn watch_for_changes(
    root: &Path,
    ignored: &[PathBuf],
    mut on_change: impl FnMut(),
) -> Result<(), ServeError> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "watching for changes");

    let mut debouncer = Debouncer::new();
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                debouncer.add(
                    event
                        .paths
                        .into_iter()
                        .filter(|p| is_watched_path(p, ignored)),
                );
            }
            Ok(Err(e)) => warn!("watch error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed = debouncer.take();
                info!(files = changed.len(), "rebuilding");
                on_change();
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_fixtures;
    use tempfile::TempDir;

    fn built_site() -> (TempDir, PathBuf) {
        let site = setup_fixtures();
        let output = site.path().join("public");
        site::build(site.path(), &output).unwrap();
        (site, output)
    }

    // =========================================================================
    // Request resolution
    // =========================================================================

    #[test]
    fn root_resolves_to_index_page_data() {
        let (_site, output) = built_site();
        let resolved = resolve_request(&output, "/").unwrap();
        assert_eq!(resolved, output.join("page-data/index/page-data.json"));
    }

    #[test]
    fn route_path_resolves_to_page_data() {
        let (_site, output) = built_site();
        assert_eq!(
            resolve_request(&output, "/zh-hans/hello-world/").unwrap(),
            output.join("page-data/zh-hans/hello-world/page-data.json")
        );
        assert_eq!(
            resolve_request(&output, "/hello-world").unwrap(),
            output.join("page-data/hello-world/page-data.json")
        );
    }

    #[test]
    fn existing_files_win() {
        let (_site, output) = built_site();
        assert_eq!(
            resolve_request(&output, "/routes.json?t=1").unwrap(),
            output.join("routes.json")
        );
    }

    #[test]
    fn directory_index_html_is_served() {
        let (_site, output) = built_site();
        fs::create_dir_all(output.join("about")).unwrap();
        fs::write(output.join("about/index.html"), "<p>hi</p>").unwrap();
        assert_eq!(
            resolve_request(&output, "/about/").unwrap(),
            output.join("about/index.html")
        );
    }

    #[test]
    fn unknown_and_escaping_paths_resolve_to_nothing() {
        let (_site, output) = built_site();
        assert_eq!(resolve_request(&output, "/no-such-post/"), None);
        assert_eq!(resolve_request(&output, "/../config.toml"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(
            guess_content_type(Path::new("routes.json")),
            "application/json; charset=utf-8"
        );
        assert_eq!(
            guess_content_type(Path::new("a/index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            guess_content_type(Path::new("blob")),
            "application/octet-stream"
        );
    }

    #[test]
    fn not_found_page_escapes_url() {
        let page = not_found_page("/<script>/").into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    // =========================================================================
    // Watching
    // =========================================================================

    #[test]
    fn output_and_staging_changes_are_ignored() {
        let ignored = vec![PathBuf::from("/site/public"), PathBuf::from("/site/public.partial")];
        assert!(!is_watched_path(Path::new("/site/public/routes.json"), &ignored));
        assert!(!is_watched_path(
            Path::new("/site/public.partial/feed.json"),
            &ignored
        ));
        assert!(is_watched_path(
            Path::new("/site/content/blog/a/index.md"),
            &ignored
        ));
        assert!(is_watched_path(Path::new("/site/config.toml"), &ignored));
    }

    #[test]
    fn editor_artifacts_are_ignored() {
        assert!(!is_watched_path(Path::new("/site/content/a.md~"), &[]));
        assert!(!is_watched_path(Path::new("/site/content/.a.md.swp"), &[]));
    }

    #[test]
    fn ignored_dirs_include_staging() {
        let dirs = ignored_dirs(Path::new("/site/public")).unwrap();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/site/public"),
                PathBuf::from("/site/public.partial")
            ]
        );
    }

    #[test]
    fn debouncer_waits_for_quiet_period() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));

        debouncer.add([PathBuf::from("a.md"), PathBuf::from("a.md")]);
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_millis(DEBOUNCE_MS));

        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), vec![PathBuf::from("a.md")]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn repeated_saves_extend_quiet_period() {
        let mut debouncer = Debouncer::new();
        debouncer.add([PathBuf::from("a.md")]);
        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        assert!(debouncer.ready());

        debouncer.add([PathBuf::from("a.md")]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn empty_batch_does_not_extend_quiet_period() {
        let mut debouncer = Debouncer::new();
        debouncer.add([PathBuf::from("a.md")]);
        std::thread::sleep(Duration::from_millis(DEBOUNCE_MS + 20));
        debouncer.add(std::iter::empty());
        assert!(debouncer.ready());
    }
}
