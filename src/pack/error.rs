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
use std::path::PathBuf;

use crate::clips::DecodeError;

/// Typed error for pack loads so the shell can tell the user what is wrong
/// with a pack without string matching. A failed load never replaces the
/// active pack.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("malformed manifest in {}: {reason}", .path.display())]
    MalformedManifest { path: PathBuf, reason: String },

    #[error("pack {} references missing asset {}", .pack.display(), .asset.display())]
    MissingAsset { pack: PathBuf, asset: PathBuf },

    #[error("pack {} defines no sounds", .0.display())]
    EmptyPack(PathBuf),

    #[error("unable to read pack {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pack asset failed to decode: {0}")]
    Decode(#[from] DecodeError),
}

impl LoadError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> LoadError {
        LoadError::MalformedManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
