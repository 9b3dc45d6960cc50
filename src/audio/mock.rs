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
use std::time::Instant;

use parking_lot::Mutex;
use tracing::info;

use super::{Sink, SinkError, Voice};
use crate::clips::Clip;

/// The sample rate reported by mock sinks.
pub const MOCK_SAMPLE_RATE: u32 = 44100;

/// One voice handed to a `RecordingSink`.
#[derive(Debug, Clone)]
pub struct Submission {
    pub voice_id: u64,
    pub source: PathBuf,
    pub clip: Clip,
    pub gain: f32,
    pub at: Instant,
}

impl Submission {
    /// True while the voice would still be audible on a real device.
    pub fn in_flight(&self, now: Instant) -> bool {
        now.duration_since(self.at) < self.clip.duration()
    }
}

/// A sink that plays nothing and records every submission.
#[derive(Debug)]
pub struct RecordingSink {
    sample_rate: u32,
    submissions: Mutex<Vec<Submission>>,
    closed: Mutex<bool>,
}

impl RecordingSink {
    pub fn new(sample_rate: u32) -> RecordingSink {
        RecordingSink {
            sample_rate,
            submissions: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    /// Every submission so far, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Submissions that would still be playing at `now`.
    pub fn in_flight(&self, now: Instant) -> usize {
        self.submissions
            .lock()
            .iter()
            .filter(|s| s.in_flight(now))
            .count()
    }

    /// Makes every later submission fail as if the output had shut down.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn clear(&self) {
        self.submissions.lock().clear();
    }
}

impl Sink for RecordingSink {
    fn submit(&self, voice: Voice) -> Result<(), SinkError> {
        if *self.closed.lock() {
            return Err(SinkError::Closed);
        }

        info!(
            voice = voice.id(),
            source = ?voice.source(),
            duration = ?voice.clip().duration(),
            "Playing voice (mock)"
        );
        self.submissions.lock().push(Submission {
            voice_id: voice.id(),
            source: voice.source().to_path_buf(),
            clip: voice.clip().clone(),
            gain: voice.gain(),
            at: Instant::now(),
        });
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
