//! Stylesheet configuration context.
//!
//! A base [`CssConfig`] is built programmatically (CLI flags, host
//! application) and a per-file context is derived from it when a
//! stylesheet is parsed: the root becomes the file's directory and
//! comment annotations of the form
//!
//! ```css
//! /* spritemapper.sprite_dirs: icons buttons */
//! /* spritemapper.recursive: false */
//! /* spritemapper.base_url: /sprites */
//! ```
//!
//! override the inherited settings for that file only.

use std::path::{Component, Path, PathBuf};

use crate::css::{Event, EventKind};

/// Prefix for comment annotations.
const ANNOTATION_PREFIX: &str = "spritemapper.";

/// Configuration governing sprite grouping and URL resolution for one
/// stylesheet (or as a session-wide base).
#[derive(Debug, Clone)]
pub struct CssConfig {
    /// Directories whose images are grouped into spritemaps, in match
    /// order. `None` means one spritemap per source directory.
    pub sprite_dirs: Option<Vec<PathBuf>>,
    /// Whether nested directories under a sprite dir form distinct maps.
    pub recursive: bool,
    /// Published URL prefix for generated spritemap images.
    pub base_url: Option<String>,
    /// Directory that relative URLs resolve against.
    pub root: PathBuf,
}

impl Default for CssConfig {
    fn default() -> Self {
        Self { sprite_dirs: None, recursive: true, base_url: None, root: PathBuf::from(".") }
    }
}

impl CssConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a per-file config: `base` settings, rooted at `root`, with
    /// comment annotations from the event stream applied on top.
    pub fn derive(base: &CssConfig, events: &[Event], root: &Path) -> Self {
        let mut conf = base.clone();
        conf.root = root.to_path_buf();
        for ev in events {
            if ev.kind == EventKind::Comment {
                conf.apply_comment(&ev.text);
            }
        }
        conf
    }

    fn apply_comment(&mut self, comment: &str) {
        let body = comment.trim_start_matches("/*").trim_end_matches("*/");
        for line in body.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            let Some(rest) = line.strip_prefix(ANNOTATION_PREFIX) else { continue };
            let Some((key, value)) = rest.split_once(':') else { continue };
            self.apply_option(key.trim(), value.trim());
        }
    }

    fn apply_option(&mut self, key: &str, value: &str) {
        match key {
            "sprite_dirs" => {
                let dirs = value
                    .split_whitespace()
                    .map(|d| normalize(&self.root.join(d)))
                    .collect::<Vec<_>>();
                self.sprite_dirs = if dirs.is_empty() { None } else { Some(dirs) };
            }
            "recursive" => {
                if let Ok(flag) = value.parse::<bool>() {
                    self.recursive = flag;
                }
            }
            "base_url" => {
                self.base_url = Some(value.to_string());
            }
            // Unknown keys are ignored so stylesheets stay forward-compatible
            _ => {}
        }
    }

    /// Resolve a declaration URL into a normalized filesystem path.
    ///
    /// Relative URLs resolve against the config root; a leading `/` pins
    /// the URL to the root as well (the root acts as the document root).
    /// Query strings and fragments are dropped.
    pub fn normpath(&self, url: &str) -> PathBuf {
        let url = url.split(['?', '#']).next().unwrap_or(url);
        let rel = url.trim_start_matches('/');
        normalize(&self.root.join(rel))
    }

    /// Published URL for a spritemap's output image.
    ///
    /// The output image is the map identity with a `.png` extension added
    /// when it carries none. With a `base_url` configured, the image is
    /// published under it by file name; otherwise the path itself is used.
    pub fn spritemap_url(&self, smap: &Path) -> String {
        let mut image = smap.to_path_buf();
        if image.extension().is_none() {
            image.set_extension("png");
        }
        match &self.base_url {
            Some(base) => {
                let name = image
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{}/{}", base.trim_end_matches('/'), name)
            }
            None => image.to_string_lossy().into_owned(),
        }
    }
}

/// Lexically normalize a path: collapse `.` and resolve `..` against
/// preceding components without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
