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
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// The name of the manifest file at the root of every pack directory.
pub const MANIFEST_FILE: &str = "pack.json";

/// A JSON representation of a pack manifest. Nothing here is validated;
/// the loader turns it into a `SoundPack` or rejects it.
#[derive(Deserialize, Debug)]
pub(super) struct Manifest {
    /// Display name. Defaults to the directory name.
    pub name: Option<String>,

    /// Pack volume, 0.0 to 1.0.
    pub volume: Option<f32>,

    /// The combined audio file that segment variants without a file refer to.
    pub sprite: Option<String>,

    /// Sounds for keyboard keys the pack does not map explicitly.
    pub default: Option<PhaseEntries>,

    /// Key definitions in manifest order. Names may list several codes
    /// separated by whitespace.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub keys: Vec<(String, PhaseEntries)>,
}

/// The variants for each phase of one manifest entry.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub(super) struct PhaseEntries {
    pub down: Option<Vec<VariantSpec>>,
    pub up: Option<Vec<VariantSpec>>,
}

/// One variant: a whole file, or a millisecond range of a file or the sprite.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub(super) enum VariantSpec {
    File(String),
    Segment {
        file: Option<String>,
        start: u64,
        duration: u64,
    },
}

/// Keeps manifest order and repeated names, which a map type would drop.
fn ordered_entries<'de, D>(deserializer: D) -> Result<Vec<(String, PhaseEntries)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, PhaseEntries)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of key codes to phase definitions")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, PhaseEntries>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}
