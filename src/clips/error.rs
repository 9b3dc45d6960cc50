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

/// Error types for clip decoding. Cloneable so that one failed decode can be
/// handed to every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unable to open {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("unable to decode {}: {message}", .path.display())]
    Format { path: PathBuf, message: String },

    #[error("{} contains no audio track", .0.display())]
    NoTrack(PathBuf),

    #[error("{} contains no samples", .0.display())]
    Empty(PathBuf),

    #[error("decoder panicked while reading {}", .0.display())]
    Panicked(PathBuf),

    #[error("{} is not cached for an evicted pack", .0.display())]
    Retired(PathBuf),
}
