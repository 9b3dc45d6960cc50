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

//! Decoded audio clips and the cache that owns them.
//!
//! This module provides:
//! - In-memory clips shared between voices without copying
//! - Decoding of pack assets at the output sample rate
//! - A single-flight cache keyed by file path with per-pack ownership

mod cache;
mod clip;
mod decoder;
mod error;

pub use cache::ClipCache;
pub use clip::Clip;
pub use decoder::{Decoder, SymphoniaDecoder};
pub use error::DecodeError;
