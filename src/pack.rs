// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Sound packs: a directory with a `pack.json` manifest and audio assets.
//!
//! A `SoundPack` is only ever built whole by the loader. It is immutable once
//! built; reloading a pack produces a new `SoundPack` with a new id.

mod error;
mod loader;
mod manifest;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::code::{Code, Device, Phase};

pub use error::LoadError;
pub use loader::{discover, load};
pub use manifest::MANIFEST_FILE;

/// Global pack ID counter.
static NEXT_PACK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one loaded instance of a pack. Used as the ownership key in the clip cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackId(u64);

impl PackId {
    /// Allocates a fresh id.
    pub fn next() -> PackId {
        PackId(NEXT_PACK_ID.fetch_add(1, Ordering::SeqCst))
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A millisecond range inside an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub start: Duration,
    pub duration: Duration,
}

/// A reference to the audio for one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRef {
    /// Absolute path of the asset inside the pack directory.
    path: PathBuf,
    /// Range of the asset to play. None plays the whole file.
    segment: Option<Segment>,
}

impl ClipRef {
    pub fn new(path: PathBuf, segment: Option<Segment>) -> ClipRef {
        ClipRef { path, segment }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segment(&self) -> Option<Segment> {
        self.segment
    }
}

/// A non-empty, ordered list of alternative clips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variants(Vec<ClipRef>);

impl Variants {
    /// Returns None for an empty list.
    pub fn new(clips: Vec<ClipRef>) -> Option<Variants> {
        if clips.is_empty() {
            None
        } else {
            Some(Variants(clips))
        }
    }

    /// The variant used when random selection is off.
    pub fn first(&self) -> &ClipRef {
        &self.0[0]
    }

    pub fn get(&self, index: usize) -> Option<&ClipRef> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClipRef> {
        self.0.iter()
    }
}

/// The sound for one (code, phase).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    pub code: Code,
    pub phase: Phase,
    pub variants: Variants,
}

/// A fully validated sound pack.
#[derive(Debug)]
pub struct SoundPack {
    id: PackId,
    name: String,
    dir: PathBuf,
    /// Pack volume, 0.0 to 1.0.
    volume: f32,
    /// Definitions in manifest order.
    definitions: Vec<KeyDefinition>,
    /// (code, phase) to index into `definitions`.
    index: HashMap<(Code, Phase), usize>,
    /// Fallback variants for unmapped keyboard keys.
    defaults: HashMap<Phase, Variants>,
}

impl SoundPack {
    pub(crate) fn new(
        name: String,
        dir: PathBuf,
        volume: f32,
        definitions: Vec<KeyDefinition>,
        defaults: HashMap<Phase, Variants>,
    ) -> SoundPack {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| ((d.code, d.phase), i))
            .collect();

        SoundPack {
            id: PackId::next(),
            name,
            dir,
            volume,
            definitions,
            index,
            defaults,
        }
    }

    pub fn id(&self) -> PackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn definitions(&self) -> &[KeyDefinition] {
        &self.definitions
    }

    /// The explicit definition for (code, phase), if any.
    pub fn lookup(&self, code: Code, phase: Phase) -> Option<&KeyDefinition> {
        self.index.get(&(code, phase)).map(|&i| &self.definitions[i])
    }

    /// The fallback variants for unmapped keyboard keys in this phase.
    pub fn default_for(&self, phase: Phase) -> Option<&Variants> {
        self.defaults.get(&phase)
    }

    /// Resolves the variants to play: the explicit definition, else the
    /// default for keyboard keys. Unmapped mouse buttons stay silent.
    pub fn resolve(&self, code: Code, phase: Phase) -> Option<&Variants> {
        match self.lookup(code, phase) {
            Some(definition) => Some(&definition.variants),
            None if code.device() == Device::Keyboard => self.default_for(phase),
            None => None,
        }
    }

    /// Every clip reference in the pack, definitions first, then defaults.
    pub fn clip_refs(&self) -> impl Iterator<Item = &ClipRef> {
        self.definitions
            .iter()
            .flat_map(|d| d.variants.iter())
            .chain(self.defaults.values().flat_map(|v| v.iter()))
    }

    /// The distinct asset files the pack uses.
    pub fn assets(&self) -> BTreeSet<&Path> {
        self.clip_refs().map(|c| c.path()).collect()
    }
}

impl fmt::Display for SoundPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Definitions={}, Assets={}) ({})",
            self.name,
            self.definitions.len(),
            self.assets().len(),
            self.dir.display()
        )
    }
}
