//! Grouping policy: deciding which spritemap a sprite reference belongs to.

use std::path::{Path, PathBuf};

use crate::config::{normalize, CssConfig};
use crate::models::SpriteRef;

/// Decides the output spritemap for a sprite reference.
///
/// `None` means the reference is not covered by this mapper; the caller
/// decides what to do with such references (the collector skips them).
pub trait SpriteMapper {
    fn map_ref(&self, sref: &SpriteRef) -> Option<PathBuf>;
}

/// Maps sprites to spritemaps by their containing sprite directory.
///
/// Configured directories are scanned in order and the first one whose
/// path is a prefix of the image path wins. This is deliberately not a
/// longest-prefix match: with overlapping directories the configured
/// order is the contract.
///
/// The claim test is a plain string common-prefix check, so a configured
/// `icons` also claims `icons-hi/x.png`. The output identity is then
/// computed component-wise against the matched directory, so such a
/// claim still resolves to the real `icons-hi` directory rather than a
/// phantom subgroup under `icons`.
#[derive(Debug, Clone)]
pub struct SpriteDirsMapper {
    sprite_dirs: Option<Vec<PathBuf>>,
    recursive: bool,
}

impl Default for SpriteDirsMapper {
    fn default() -> Self {
        Self { sprite_dirs: None, recursive: true }
    }
}

impl SpriteDirsMapper {
    pub fn new(sprite_dirs: Option<Vec<PathBuf>>, recursive: bool) -> Self {
        Self { sprite_dirs, recursive }
    }

    /// Default mapper for a stylesheet's configuration context.
    pub fn from_conf(conf: &CssConfig) -> Self {
        Self::new(conf.sprite_dirs.clone(), conf.recursive)
    }
}

impl SpriteMapper for SpriteDirsMapper {
    fn map_ref(&self, sref: &SpriteRef) -> Option<PathBuf> {
        let Some(dirs) = &self.sprite_dirs else {
            // Unconfigured: one spritemap per source directory.
            return Some(sref.fname().parent().unwrap_or_else(|| Path::new("")).to_path_buf());
        };

        let fname = sref.fname().to_string_lossy();
        for dir in dirs {
            let prefix = dir.to_string_lossy();
            if !fname.starts_with(prefix.as_ref()) {
                continue;
            }
            if !self.recursive {
                return Some(normalize(dir));
            }
            // The spritemap for a nested image is its subdirectory under
            // the matched sprite dir, relative component-wise so a
            // partial-component claim lands on the real directory.
            let rel = relpath(sref.fname(), dir);
            let submap = rel.parent().unwrap_or_else(|| Path::new(""));
            return Some(normalize(&dir.join(submap)));
        }
        None
    }
}

/// Lexical relative path from `base` to `path`: shared leading components
/// are dropped, remaining `base` components become `..`.
fn relpath(path: &Path, base: &Path) -> PathBuf {
    let mut path_comps = path.components().peekable();
    let mut base_comps = base.components().peekable();
    while let (Some(p), Some(b)) = (path_comps.peek(), base_comps.peek()) {
        if p != b {
            break;
        }
        path_comps.next();
        base_comps.next();
    }
    let mut rel = PathBuf::new();
    for _ in base_comps {
        rel.push("..");
    }
    for comp in path_comps {
        rel.push(comp.as_os_str());
    }
    rel
}
