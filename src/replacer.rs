//! Rewriting of sprite declarations against packed positions.
//!
//! Once every spritemap has been placed, a [`SpriteReplacer`] rewrites a
//! stylesheet's event stream: each `background` declaration whose value
//! resolves to a collected sprite is replaced with a declaration pointing
//! at the spritemap's published URL plus the sprite's pixel offset. All
//! other events pass through unchanged, in order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::css::{split_declaration, CssFile, Event, EventKind};
use crate::finder::get_background_url;
use crate::mapper::SpriteMapper;
use crate::models::{Position, SpriteMap, SpriteRef};

/// Error type for rewrite failures.
///
/// All variants indicate that the aggregation and rewrite passes disagree
/// about the registry contents; rewriting the file must abort rather than
/// emit an incorrect declaration.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ReplaceError {
    /// A spritemap was handed to the replacer before being placed
    #[error("spritemap '{}' has no placements yet", .0.display())]
    Unplaced(PathBuf),
    /// A reference mapped to a spritemap the replacer does not know
    #[error("sprite '{}' maps to unknown spritemap '{}'", .sprite.display(), .smap.display())]
    UnknownSpritemap { smap: PathBuf, sprite: PathBuf },
    /// A reference is mapped to a known spritemap but was never placed in it
    #[error("sprite '{}' has no placement in spritemap '{}'", .sprite.display(), .smap.display())]
    MissingPlacement { smap: PathBuf, sprite: PathBuf },
}

/// Replaces references to sprites with offsetted background declarations.
#[derive(Debug, Clone)]
pub struct SpriteReplacer {
    smaps: HashMap<PathBuf, HashMap<PathBuf, Position>>,
}

impl SpriteReplacer {
    /// Build position maps from placed spritemaps.
    ///
    /// Every map must already be placed; handing over a collecting-phase
    /// map is an error.
    pub fn new<'a, I>(spritemaps: I) -> Result<Self, ReplaceError>
    where
        I: IntoIterator<Item = &'a SpriteMap>,
    {
        let mut smaps = HashMap::new();
        for smap in spritemaps {
            let placements = smap
                .placements()
                .ok_or_else(|| ReplaceError::Unplaced(smap.fname().to_path_buf()))?;
            let pos_map: HashMap<PathBuf, Position> = placements
                .iter()
                .map(|(pos, sref)| (sref.fname().to_path_buf(), pos.clone()))
                .collect();
            smaps.insert(smap.fname().to_path_buf(), pos_map);
        }
        Ok(Self { smaps })
    }

    /// Lazily rewrite a stylesheet's event stream.
    ///
    /// The iterator borrows the input events and re-derives on every
    /// invocation; it is not cached or restartable. The mapper must be the
    /// same one used during aggregation so both passes agree on which
    /// spritemap a reference belongs to.
    pub fn rewrite<'a>(
        &'a self,
        css: &'a CssFile,
        mapper: &'a dyn SpriteMapper,
    ) -> impl Iterator<Item = Result<Event, ReplaceError>> + 'a {
        css.events.iter().map(move |ev| {
            if ev.kind == EventKind::Declaration {
                self.replace_ev(css, mapper, ev)
            } else {
                Ok(ev.clone())
            }
        })
    }

    fn replace_ev(
        &self,
        css: &CssFile,
        mapper: &dyn SpriteMapper,
        ev: &Event,
    ) -> Result<Event, ReplaceError> {
        let Some((prop, val)) = split_declaration(&ev.text) else {
            return Ok(ev.clone());
        };
        if prop != "background" {
            return Ok(ev.clone());
        }
        // No sprite URL in the value is the expected pass-through case.
        let Some(url) = get_background_url(val) else {
            return Ok(ev.clone());
        };
        let sref = SpriteRef::new(css.conf.normpath(url), css.path.clone());
        // A reference this mapper cannot claim was skipped during
        // aggregation too, so it keeps its original declaration.
        let Some(smap_fname) = mapper.map_ref(&sref) else {
            return Ok(ev.clone());
        };
        let val = self.replace_val(css, &smap_fname, &sref)?;
        Ok(Event::declaration(format!("{}: {}", prop, val)))
    }

    fn replace_val(
        &self,
        css: &CssFile,
        smap_fname: &Path,
        sref: &SpriteRef,
    ) -> Result<String, ReplaceError> {
        let pos_map = self.smaps.get(smap_fname).ok_or_else(|| {
            ReplaceError::UnknownSpritemap {
                smap: smap_fname.to_path_buf(),
                sprite: sref.fname().to_path_buf(),
            }
        })?;
        let pos = pos_map.get(sref.fname()).ok_or_else(|| {
            ReplaceError::MissingPlacement {
                smap: smap_fname.to_path_buf(),
                sprite: sref.fname().to_path_buf(),
            }
        })?;

        let mut parts = vec![
            format!("url('{}')", css.conf.spritemap_url(smap_fname)),
            "no-repeat".to_string(),
        ];
        // Negation is textual: positions are distances into the sheet, so
        // a signed negative component renders with a doubled minus.
        for &r in pos {
            parts.push(if r != 0 { format!("-{}px", r) } else { "0".to_string() });
        }
        Ok(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CssConfig;
    use crate::css::{parse_stylesheet, write_events};
    use crate::mapper::SpriteDirsMapper;

    fn placed_map(fname: &str, placements: &[(&str, Vec<i32>)]) -> SpriteMap {
        let mut smap = SpriteMap::new(fname);
        for (img, _) in placements {
            smap.push(SpriteRef::new(*img, "style.css")).unwrap();
        }
        let placed = placements
            .iter()
            .map(|(img, pos)| (pos.clone(), SpriteRef::new(*img, "style.css")))
            .collect();
        smap.place(placed).unwrap();
        smap
    }

    fn css_file(src: &str, conf: CssConfig) -> CssFile {
        CssFile {
            path: PathBuf::from("style.css"),
            events: parse_stylesheet(src).unwrap(),
            conf,
        }
    }

    fn rewrite_to_string(
        replacer: &SpriteReplacer,
        css: &CssFile,
        mapper: &dyn SpriteMapper,
    ) -> String {
        let events: Result<Vec<Event>, ReplaceError> =
            replacer.rewrite(css, mapper).collect();
        write_events(&events.unwrap())
    }

    #[test]
    fn test_end_to_end_rewrite() {
        let smap = placed_map("icons", &[("icons/x.png", vec![0, 20])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();

        let conf = CssConfig { base_url: Some("/sprites".to_string()), ..CssConfig::default() };
        let css = css_file("a { background: url(icons/x.png) no-repeat; }", conf);
        let mapper = SpriteDirsMapper::default();

        assert_eq!(
            rewrite_to_string(&replacer, &css, &mapper),
            "a { background: url('/sprites/icons.png') no-repeat 0 -20px; }"
        );
    }

    #[test]
    fn test_offset_rendering() {
        let smap = placed_map(
            "icons",
            &[("icons/zero.png", vec![0, 0]), ("icons/off.png", vec![3, 15])],
        );
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        let conf = CssConfig { base_url: Some("/s".to_string()), ..CssConfig::default() };
        let css = css_file(
            "a { background: url(icons/zero.png); }\nb { background: url(icons/off.png); }",
            conf,
        );

        let out = rewrite_to_string(&replacer, &css, &mapper);
        assert!(out.contains("background: url('/s/icons.png') no-repeat 0 0;"));
        assert!(out.contains("background: url('/s/icons.png') no-repeat -3px -15px;"));
    }

    #[test]
    fn test_negative_position_component_negates_textually() {
        // Positions are unsigned distances in practice; a packer that
        // hands over a negative component gets it negated like any other.
        let smap = placed_map("icons", &[("icons/x.png", vec![-5, 8])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        let conf = CssConfig { base_url: Some("/s".to_string()), ..CssConfig::default() };
        let css = css_file("a { background: url(icons/x.png); }", conf);

        let out = rewrite_to_string(&replacer, &css, &mapper);
        assert!(out.contains("background: url('/s/icons.png') no-repeat --5px -8px;"));
    }

    #[test]
    fn test_pass_through_is_byte_identical() {
        let smap = placed_map("icons", &[("icons/x.png", vec![0, 0])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        let src = "/* note */\na {\n  color: red;\n  background: #fff;\n  border: url(edge.woff);\n}\n";
        let css = css_file(src, CssConfig::default());

        assert_eq!(rewrite_to_string(&replacer, &css, &mapper), src);
    }

    #[test]
    fn test_unmappable_reference_passes_through() {
        let smap = placed_map("icons", &[("icons/x.png", vec![0, 0])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        // Mapper only claims icons/; img/ was never aggregated
        let mapper = SpriteDirsMapper::new(Some(vec![PathBuf::from("icons/")]), true);

        let src = "a { background: url(img/outside.png) no-repeat; }";
        let css = css_file(src, CssConfig::default());

        assert_eq!(rewrite_to_string(&replacer, &css, &mapper), src);
    }

    #[test]
    fn test_missing_placement_is_fatal() {
        let smap = placed_map("icons", &[("icons/x.png", vec![0, 0])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        // y.png maps into "icons" but was never aggregated or placed
        let css = css_file("a { background: url(icons/y.png); }", CssConfig::default());
        let err = replacer
            .rewrite(&css, &mapper)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(
            err,
            ReplaceError::MissingPlacement {
                smap: PathBuf::from("icons"),
                sprite: PathBuf::from("icons/y.png"),
            }
        );
    }

    #[test]
    fn test_unknown_spritemap_is_fatal() {
        let smap = placed_map("icons", &[("icons/x.png", vec![0, 0])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        let css = css_file("a { background: url(buttons/ok.png); }", CssConfig::default());
        let err = replacer
            .rewrite(&css, &mapper)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert!(matches!(err, ReplaceError::UnknownSpritemap { .. }));
    }

    #[test]
    fn test_unplaced_map_is_rejected_up_front() {
        let mut smap = SpriteMap::new("icons");
        smap.push(SpriteRef::new("icons/x.png", "style.css")).unwrap();

        let err = SpriteReplacer::new([&smap]).unwrap_err();
        assert_eq!(err, ReplaceError::Unplaced(PathBuf::from("icons")));
    }

    #[test]
    fn test_rewritten_value_round_trips_through_finder() {
        // The rewritten declaration should no longer look like a local
        // sprite to the finder (absolute published URL), but its tokens
        // must match the placement exactly.
        let smap = placed_map("icons", &[("icons/x.png", vec![3, 15])]);
        let replacer = SpriteReplacer::new([&smap]).unwrap();
        let mapper = SpriteDirsMapper::default();

        let conf = CssConfig { base_url: Some("/sprites".to_string()), ..CssConfig::default() };
        let css = css_file("a { background: url(icons/x.png); }", conf);

        let out = rewrite_to_string(&replacer, &css, &mapper);
        let reparsed = parse_stylesheet(&out).unwrap();
        let decl = reparsed
            .iter()
            .find(|ev| ev.kind == EventKind::Declaration)
            .unwrap();
        let (prop, val) = split_declaration(&decl.text).unwrap();
        assert_eq!(prop, "background");
        assert_eq!(val, "url('/sprites/icons.png') no-repeat -3px -15px");
    }
}
