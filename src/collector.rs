//! Spritemap collection: folding sprite references into a registry.
//!
//! The collector owns the session registry of spritemaps. Aggregation is
//! idempotent (re-observing a reference is a no-op) and insertion-ordered
//! on both levels: registry iteration follows first appearance of each
//! spritemap, and each map's members follow first appearance of each
//! image across the whole session.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use crate::config::CssConfig;
use crate::css::{CssError, CssFile};
use crate::finder::find_sprite_refs;
use crate::mapper::{SpriteDirsMapper, SpriteMapper};
use crate::models::{SpriteMap, SpriteMapError, SpriteRef};

/// Error type for aggregation failures
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MapError {
    /// The stylesheet could not be read or tokenized
    #[error(transparent)]
    Css(#[from] CssError),
    /// A reference arrived for a spritemap that has already been placed
    #[error(transparent)]
    SpriteMap(#[from] SpriteMapError),
}

/// Collects spritemap listings from sprite references.
#[derive(Debug, Default)]
pub struct SpriteMapCollector {
    conf: CssConfig,
    maps: IndexMap<PathBuf, SpriteMap>,
    skipped: Vec<SpriteRef>,
}

impl SpriteMapCollector {
    /// Create a collector with a default base configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collector with the given base configuration.
    pub fn with_conf(conf: CssConfig) -> Self {
        Self { conf, ..Self::default() }
    }

    /// Base configuration that per-file contexts derive from.
    pub fn conf(&self) -> &CssConfig {
        &self.conf
    }

    /// Fold references into the registry using the given mapper.
    ///
    /// Unmappable references are recorded and skipped, never inserted.
    /// Re-observing a reference that is already a member is a no-op.
    pub fn map_refs<I>(&mut self, srefs: I, mapper: &dyn SpriteMapper) -> Result<(), MapError>
    where
        I: IntoIterator<Item = SpriteRef>,
    {
        for sref in srefs {
            let Some(fname) = mapper.map_ref(&sref) else {
                self.skipped.push(sref);
                continue;
            };
            let smap = self
                .maps
                .entry(fname.clone())
                .or_insert_with(|| SpriteMap::new(fname));
            smap.push(sref)?;
        }
        Ok(())
    }

    /// Map the sprites of one stylesheet with the config-derived mapper.
    pub fn map_file(&mut self, path: &Path) -> Result<(), MapError> {
        self.map_file_inner(path, None)
    }

    /// Map the sprites of one stylesheet with a caller-supplied mapper.
    pub fn map_file_with(
        &mut self,
        path: &Path,
        mapper: &dyn SpriteMapper,
    ) -> Result<(), MapError> {
        self.map_file_inner(path, Some(mapper))
    }

    fn map_file_inner(
        &mut self,
        path: &Path,
        mapper: Option<&dyn SpriteMapper>,
    ) -> Result<(), MapError> {
        let css = CssFile::parse(path, &self.conf)?;
        let srefs = find_sprite_refs(&css.events, &css.path, &css.conf);
        match mapper {
            Some(mapper) => self.map_refs(srefs, mapper),
            None => self.map_refs(srefs, &SpriteDirsMapper::from_conf(&css.conf)),
        }
    }

    /// Spritemaps in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteMap> {
        self.maps.values()
    }

    /// Mutable access for the packer to record placements.
    pub fn maps_mut(&mut self) -> impl Iterator<Item = &mut SpriteMap> {
        self.maps.values_mut()
    }

    /// Look up one spritemap by output identity.
    pub fn get(&self, fname: &Path) -> Option<&SpriteMap> {
        self.maps.get(fname)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// References no mapper claimed, in observation order.
    pub fn skipped(&self) -> &[SpriteRef] {
        &self.skipped
    }

    /// Consume the collector, yielding the spritemaps in registry order.
    pub fn into_maps(self) -> Vec<SpriteMap> {
        self.maps.into_values().collect()
    }

    /// Listing of `(map, members)` string pairs in registry order.
    pub fn listing(&self) -> Vec<(String, Vec<String>)> {
        self.maps
            .values()
            .map(|smap| {
                (
                    smap.fname().display().to_string(),
                    smap.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect()
    }

    /// Listing sorted by spritemap name, for deterministic printing.
    pub fn sorted_listing(&self) -> Vec<(String, Vec<String>)> {
        let mut listing = self.listing();
        listing.sort_by(|a, b| a.0.cmp(&b.0));
        listing
    }
}
