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

//! Turns playback requests into voices.
//!
//! A trigger never waits for playback: it resolves the clip, hands a voice to
//! the sink and returns. Overlapping triggers produce independent voices.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::audio::{Sink, Voice};
use crate::clips::ClipCache;
use crate::code::Phase;
use crate::input::PlaybackRequest;
use crate::pack::{ClipRef, SoundPack, Variants};
use crate::state::ToggleState;

/// What a trigger did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A voice was submitted.
    Played { voice: u64, source: PathBuf },
    /// Sounds are muted.
    Muted,
    /// A release while release sounds are off.
    KeyupDisabled,
    /// The pack has no sound for this code and phase.
    Unmapped,
    /// The router dropped the event.
    Ignored,
    /// There is no active pack.
    NoPack,
    /// The clip could not be decoded or the voice could not be submitted.
    Failed,
}

impl Outcome {
    pub fn played(&self) -> bool {
        matches!(self, Outcome::Played { .. })
    }
}

/// Resolves requests against a pack and submits voices.
pub struct PlaybackEngine {
    cache: Arc<ClipCache>,
    sink: Arc<dyn Sink>,
    rng: Mutex<StdRng>,
}

impl PlaybackEngine {
    pub fn new(cache: Arc<ClipCache>, sink: Arc<dyn Sink>) -> PlaybackEngine {
        PlaybackEngine {
            cache,
            sink,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates an engine whose variant selection is reproducible.
    pub fn with_seed(cache: Arc<ClipCache>, sink: Arc<dyn Sink>, seed: u64) -> PlaybackEngine {
        PlaybackEngine {
            cache,
            sink,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn cache(&self) -> &Arc<ClipCache> {
        &self.cache
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Plays the sound `pack` defines for `request`. Errors are logged and
    /// reported as `Outcome::Failed`, never raised.
    pub fn trigger(&self, request: &PlaybackRequest, pack: &SoundPack, toggles: &ToggleState) -> Outcome {
        if toggles.muted {
            return Outcome::Muted;
        }
        if request.phase == Phase::Up && !toggles.keyup_enabled {
            return Outcome::KeyupDisabled;
        }

        let Some(variants) = pack.resolve(request.code, request.phase) else {
            trace!(code = %request.code, phase = %request.phase, "No sound mapped");
            return Outcome::Unmapped;
        };
        let clip_ref = self.select(variants, toggles.random_sounds_enabled);

        let clip = match self.cache.get(clip_ref.path(), pack.id()) {
            Ok(clip) => clip,
            Err(e) => {
                warn!(code = %request.code, error = %e, "Unable to play clip");
                return Outcome::Failed;
            }
        };
        let clip = match clip_ref.segment() {
            Some(segment) => match clip.segment(segment.start, segment.duration) {
                Some(clip) => clip,
                None => {
                    warn!(
                        path = ?clip_ref.path(),
                        start = ?segment.start,
                        "Segment starts past the end of the clip"
                    );
                    return Outcome::Failed;
                }
            },
            None => clip,
        };

        let voice = Voice::new(
            clip_ref.path().to_path_buf(),
            clip,
            pack.volume() * toggles.volume,
        );
        let id = voice.id();
        match self.sink.submit(voice) {
            Ok(()) => {
                debug!(
                    code = %request.code,
                    phase = %request.phase,
                    voice = id,
                    path = ?clip_ref.path(),
                    "Triggered"
                );
                Outcome::Played {
                    voice: id,
                    source: clip_ref.path().to_path_buf(),
                }
            }
            Err(e) => {
                warn!(code = %request.code, error = %e, "Unable to submit voice");
                Outcome::Failed
            }
        }
    }

    /// Picks a variant: uniformly at random, or always the first.
    fn select<'a>(&self, variants: &'a Variants, random: bool) -> &'a ClipRef {
        if !random || variants.len() == 1 {
            return variants.first();
        }
        let index = self.rng.lock().gen_range(0..variants.len());
        variants.get(index).unwrap_or_else(|| variants.first())
    }
}
