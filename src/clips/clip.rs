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
use std::sync::Arc;
use std::time::Duration;

/// A decoded clip. The sample data is stored in an Arc for efficient sharing
/// between voices; a clip may be a frame range (segment) of a larger buffer.
#[derive(Clone)]
pub struct Clip {
    /// Interleaved f32 samples for the whole decoded file.
    data: Arc<Vec<f32>>,
    /// Number of channels in the sample data.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
    /// First frame of this clip within `data`.
    start_frame: usize,
    /// One past the last frame of this clip within `data`.
    end_frame: usize,
}

impl Clip {
    /// Creates a clip covering all of the given interleaved samples.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Clip {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count as usize;
        Clip {
            data: Arc::new(samples),
            channel_count,
            sample_rate,
            start_frame: 0,
            end_frame: frames,
        }
    }

    /// Returns a view of `duration` starting at `start`, sharing this clip's buffer.
    /// The end is clamped to the clip. Returns None if `start` is at or past the end.
    pub fn segment(&self, start: Duration, duration: Duration) -> Option<Clip> {
        let start_frame = self.start_frame + self.frames_for(start);
        if start_frame >= self.end_frame {
            return None;
        }
        let end_frame = (start_frame + self.frames_for(duration)).min(self.end_frame);

        Some(Clip {
            data: self.data.clone(),
            channel_count: self.channel_count,
            sample_rate: self.sample_rate,
            start_frame,
            end_frame,
        })
    }

    fn frames_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * self.sample_rate as f64).round() as usize
    }

    /// The interleaved samples of this clip.
    pub fn samples(&self) -> &[f32] {
        let channels = self.channel_count as usize;
        &self.data[self.start_frame * channels..self.end_frame * channels]
    }

    /// Returns the sample for the given frame (relative to this clip) and channel.
    /// Frames past the end of the clip are silent.
    #[inline]
    pub fn sample(&self, frame: usize, channel: u16) -> f32 {
        if frame >= self.frames() {
            return 0.0;
        }
        let channels = self.channel_count as usize;
        let channel = (channel as usize).min(channels - 1);
        self.data
            .get((self.start_frame + frame) * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the number of frames in this clip.
    pub fn frames(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns true if both clips view the same decoded buffer.
    pub fn shares_buffer_with(&self, other: &Clip) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Returns the memory size in bytes of the underlying buffer.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("channels", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .field("start_frame", &self.start_frame)
            .finish()
    }
}
