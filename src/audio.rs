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
use std::error::Error;
use std::sync::Arc;

pub mod cpal;
pub mod mixer;
pub mod mock;

pub use mixer::{Mixer, Voice};

/// The default number of voices the mixer plays at once.
pub const DEFAULT_MAX_VOICES: usize = 32;

/// Errors raised when handing a voice to the audio output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("audio output has shut down")]
    Closed,
}

/// Somewhere voices can be sent to be played. Submission never waits for the
/// voice to finish.
pub trait Sink: Send + Sync {
    /// Queues a voice for playback.
    fn submit(&self, voice: Voice) -> Result<(), SinkError>;

    /// The sample rate clips must be decoded to.
    fn sample_rate(&self) -> u32;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<cpal::Device>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Opens the named output (the default output device if None) with the given
/// voice limit. Names starting with "mock" open a recording sink that plays
/// nothing.
pub fn open_sink(device: Option<&str>, max_voices: usize) -> Result<Arc<dyn Sink>, Box<dyn Error>> {
    if let Some(name) = device {
        if name.starts_with("mock") {
            return Ok(Arc::new(mock::RecordingSink::new(mock::MOCK_SAMPLE_RATE)));
        }
    }

    Ok(Arc::new(cpal::Device::get(device)?.open(max_voices)?))
}
