//! Core data model for sprite references and spritemaps.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A pixel offset assigned by the packer, one component per dimension.
/// Commonly two components: x and y.
pub type Position = Vec<i32>;

/// One usage of an image inside a stylesheet declaration.
///
/// Two references are equal iff their normalized image paths are equal;
/// the source stylesheet is carried for diagnostics only.
#[derive(Debug, Clone)]
pub struct SpriteRef {
    fname: PathBuf,
    source: PathBuf,
}

impl SpriteRef {
    pub fn new(fname: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self { fname: fname.into(), source: source.into() }
    }

    /// Normalized filesystem path of the referenced image.
    pub fn fname(&self) -> &Path {
        &self.fname
    }

    /// Path of the stylesheet that referenced the image.
    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl PartialEq for SpriteRef {
    fn eq(&self, other: &Self) -> bool {
        self.fname == other.fname
    }
}

impl Eq for SpriteRef {}

impl Hash for SpriteRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fname.hash(state);
    }
}

impl fmt::Display for SpriteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fname.display())
    }
}

/// Error type for spritemap phase violations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SpriteMapError {
    /// Membership mutation attempted after placement
    #[error("spritemap '{}' is already placed; membership is frozen", .0.display())]
    AlreadyPlaced(PathBuf),
    /// Placements do not cover exactly the collected members
    #[error("placements do not match the members of spritemap '{}'", .0.display())]
    PlacementMismatch(PathBuf),
}

/// An ordered, duplicate-free group of sprite references sharing one
/// output identity.
///
/// A spritemap is in the "collecting" phase until [`SpriteMap::place`] is
/// called with the packer's output, after which membership is frozen and
/// the map carries placements. The transition is one-way.
#[derive(Debug, Clone)]
pub struct SpriteMap {
    fname: PathBuf,
    refs: Vec<SpriteRef>,
    placements: Option<Vec<(Position, SpriteRef)>>,
}

impl SpriteMap {
    /// Create an empty spritemap with the given output identity.
    pub fn new(fname: impl Into<PathBuf>) -> Self {
        Self { fname: fname.into(), refs: Vec::new(), placements: None }
    }

    /// Output identity of this spritemap.
    pub fn fname(&self) -> &Path {
        &self.fname
    }

    /// Append a reference unless it is already a member.
    ///
    /// Returns `Ok(true)` if the reference was inserted, `Ok(false)` if it
    /// was already present, and an error if the map has been placed.
    pub fn push(&mut self, sref: SpriteRef) -> Result<bool, SpriteMapError> {
        if self.placements.is_some() {
            return Err(SpriteMapError::AlreadyPlaced(self.fname.clone()));
        }
        if self.refs.contains(&sref) {
            return Ok(false);
        }
        self.refs.push(sref);
        Ok(true)
    }

    /// Membership test by `SpriteRef` equality (image path).
    pub fn contains(&self, sref: &SpriteRef) -> bool {
        self.refs.contains(sref)
    }

    /// Members in first-observed order.
    pub fn iter(&self) -> impl Iterator<Item = &SpriteRef> {
        self.refs.iter()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Whether the external packer has assigned positions yet.
    pub fn is_placed(&self) -> bool {
        self.placements.is_some()
    }

    /// Record the packer's output and freeze membership.
    ///
    /// The set of references in `placements` must be exactly the set of
    /// collected members; anything else indicates the packer and the
    /// collector disagreed about this map's contents.
    pub fn place(
        &mut self,
        placements: Vec<(Position, SpriteRef)>,
    ) -> Result<(), SpriteMapError> {
        if self.placements.is_some() {
            return Err(SpriteMapError::AlreadyPlaced(self.fname.clone()));
        }
        let placed: HashSet<&Path> = placements.iter().map(|(_, s)| s.fname()).collect();
        let members: HashSet<&Path> = self.refs.iter().map(|s| s.fname()).collect();
        if placements.len() != self.refs.len() || placed != members {
            return Err(SpriteMapError::PlacementMismatch(self.fname.clone()));
        }
        self.placements = Some(placements);
        Ok(())
    }

    /// Placements in packer order, if this map has been placed.
    pub fn placements(&self) -> Option<&[(Position, SpriteRef)]> {
        self.placements.as_deref()
    }
}
