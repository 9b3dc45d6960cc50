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

//! Voice mixing, independent of any audio backend.
//!
//! The mixer is owned by whichever thread renders audio. Voices arrive over a
//! channel and are summed until they run out of frames.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Receiver;
use tracing::warn;

use crate::clips::Clip;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// One playing instance of a clip.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The asset the clip was decoded from.
    source: PathBuf,
    clip: Clip,
    /// Linear gain applied to every sample.
    gain: f32,
    /// Next frame to render.
    position: usize,
}

impl Voice {
    pub fn new(source: PathBuf, clip: Clip, gain: f32) -> Voice {
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            source,
            clip,
            gain,
            position: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.clip.frames()
    }
}

/// Sums active voices into an interleaved output buffer.
pub struct Mixer {
    /// Active voices, oldest first.
    voices: VecDeque<Voice>,
    /// Number of output channels.
    channels: u16,
    /// Voices beyond this steal the oldest.
    max_voices: usize,
}

impl Mixer {
    pub fn new(channels: u16, max_voices: usize) -> Mixer {
        Mixer {
            voices: VecDeque::with_capacity(max_voices),
            channels: channels.max(1),
            max_voices: max_voices.max(1),
        }
    }

    /// Adds a voice. If the mixer is full the oldest voice is dropped and returned.
    pub fn add_voice(&mut self, voice: Voice) -> Option<Voice> {
        let stolen = if self.voices.len() >= self.max_voices {
            let stolen = self.voices.pop_front();
            if let Some(stolen) = &stolen {
                warn!(
                    max_voices = self.max_voices,
                    stolen = stolen.id,
                    "Voice limit reached, stealing oldest"
                );
            }
            stolen
        } else {
            None
        };
        self.voices.push_back(voice);
        stolen
    }

    /// Adds every voice waiting on the channel without blocking.
    pub fn drain(&mut self, receiver: &Receiver<Voice>) {
        while let Ok(voice) = receiver.try_recv() {
            self.add_voice(voice);
        }
    }

    /// Overwrites `output` (interleaved, `channels` wide) with the next frames of
    /// every active voice, then drops finished voices. A clip channel is mapped to
    /// the output channel of the same index; output channels past the clip's last
    /// channel repeat it, so mono clips play on every channel.
    pub fn mix_into(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.channels as usize;

        for voice in self.voices.iter_mut() {
            let remaining = voice.clip.frames() - voice.position.min(voice.clip.frames());
            for (offset, frame) in output.chunks_exact_mut(channels).take(remaining).enumerate() {
                let position = voice.position + offset;
                for (channel, sample) in frame.iter_mut().enumerate() {
                    *sample += voice.clip.sample(position, channel as u16) * voice.gain;
                }
            }
            voice.position += (output.len() / channels).min(remaining);
        }

        self.voices.retain(|voice| !voice.is_finished());
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
