//! Extraction of sprite references from declaration values.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::CssConfig;
use crate::css::{split_declaration, Event, EventKind};
use crate::models::SpriteRef;

/// Image suffixes considered spriteable.
const IMAGE_SUFFIXES: [&str; 4] = [".png", ".gif", ".jpg", ".jpeg"];

/// URL schemes that can never be local sprite images.
const EXTERNAL_PREFIXES: [&str; 4] = ["http://", "https://", "//", "data:"];

fn url_re() -> &'static Regex {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    URL_RE.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?([^'")]+?)['"]?\s*\)"#).expect("url regex")
    })
}

/// Extract a spriteable background image URL from a declaration value.
///
/// Returns `None` when the value carries no `url(...)`, references an
/// external resource, or does not name an image file. A `None` here is
/// the expected "no sprite in this declaration" outcome, not an error.
pub fn get_background_url(value: &str) -> Option<&str> {
    let caps = url_re().captures(value)?;
    let url = caps.get(1)?.as_str().trim();
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if EXTERNAL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return None;
    }
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    if !IMAGE_SUFFIXES.iter().any(|s| path.ends_with(s)) {
        return None;
    }
    Some(url)
}

/// Collect sprite references from a stylesheet's event stream.
///
/// Only `background` declarations participate; their URLs are resolved
/// against the stylesheet's configuration context.
pub fn find_sprite_refs(events: &[Event], source: &Path, conf: &CssConfig) -> Vec<SpriteRef> {
    let mut srefs = Vec::new();
    for ev in events {
        if ev.kind != EventKind::Declaration {
            continue;
        }
        let Some((prop, val)) = split_declaration(&ev.text) else { continue };
        if prop != "background" {
            continue;
        }
        if let Some(url) = get_background_url(val) {
            srefs.push(SpriteRef::new(conf.normpath(url), source));
        }
    }
    srefs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;
    use std::path::PathBuf;

    #[test]
    fn test_get_background_url_variants() {
        assert_eq!(get_background_url("url(icons/x.png) no-repeat"), Some("icons/x.png"));
        assert_eq!(get_background_url("url('icons/x.png')"), Some("icons/x.png"));
        assert_eq!(get_background_url("url(\"icons/x.png\")"), Some("icons/x.png"));
        assert_eq!(get_background_url("url( icons/x.png )"), Some("icons/x.png"));
        assert_eq!(get_background_url("#fff url(x.gif) top left"), Some("x.gif"));
    }

    #[test]
    fn test_get_background_url_rejects_non_sprites() {
        assert_eq!(get_background_url("#fff"), None);
        assert_eq!(get_background_url("url(http://cdn.example/x.png)"), None);
        assert_eq!(get_background_url("url(//cdn.example/x.png)"), None);
        assert_eq!(get_background_url("url(data:image/png;base64,AAAA)"), None);
        assert_eq!(get_background_url("url(font.woff2)"), None);
    }

    #[test]
    fn test_find_sprite_refs_only_background() {
        let src = "a {\n\
                   \x20 background: url(icons/x.png) no-repeat;\n\
                   \x20 background-image: url(icons/skip.png);\n\
                   \x20 color: red;\n\
                   }";
        let events = parse_stylesheet(src).unwrap();
        let conf = CssConfig { root: PathBuf::from("css"), ..CssConfig::default() };

        let srefs = find_sprite_refs(&events, Path::new("css/a.css"), &conf);
        assert_eq!(srefs.len(), 1);
        assert_eq!(srefs[0].fname(), Path::new("css/icons/x.png"));
        assert_eq!(srefs[0].source(), Path::new("css/a.css"));
    }

    #[test]
    fn test_find_sprite_refs_resolves_relative_urls() {
        let events = parse_stylesheet("a { background: url(../img/x.png); }").unwrap();
        let conf = CssConfig { root: PathBuf::from("site/css"), ..CssConfig::default() };

        let srefs = find_sprite_refs(&events, Path::new("site/css/a.css"), &conf);
        assert_eq!(srefs[0].fname(), Path::new("site/img/x.png"));
    }
}
