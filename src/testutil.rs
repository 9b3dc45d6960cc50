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
use std::{
    error::Error,
    fs::{self, File},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
    thread,
    time::{Duration, SystemTime},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use crate::clips::{Clip, DecodeError, Decoder};
use crate::pack::MANIFEST_FILE;

/// Sample rate of clips produced by the fake decoders.
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Wait for the given predicate to return true or fail.
#[inline]
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed();
        if elapsed.is_err() {
            panic!("System time error");
        }
        let elapsed = elapsed.unwrap();

        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

/// Writes a 32 bit float WAV file. `samples` holds one Vec per channel.
pub fn write_wav(path: &Path, samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;

    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        file,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;

    let frames = samples.iter().map(|c| c.len()).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in &samples {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0.0))?;
        }
    }
    writer.finalize()?;

    Ok(())
}

/// One second of mono silence.
fn silence() -> Clip {
    Clip::new(vec![0.0; TEST_SAMPLE_RATE as usize], 1, TEST_SAMPLE_RATE)
}

/// A decoder that never touches the filesystem and takes `delay` per decode.
pub struct SlowDecoder {
    delay: Duration,
}

impl SlowDecoder {
    pub fn new(delay: Duration) -> SlowDecoder {
        SlowDecoder { delay }
    }
}

impl Decoder for SlowDecoder {
    fn decode(&self, _: &Path) -> Result<Clip, DecodeError> {
        thread::sleep(self.delay);
        Ok(silence())
    }
}

/// A decoder that fails its first `failures` decodes and succeeds after that.
pub struct FailingDecoder {
    remaining: AtomicU32,
    delay: Duration,
}

impl FailingDecoder {
    pub fn new(failures: u32) -> FailingDecoder {
        FailingDecoder {
            remaining: AtomicU32::new(failures),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> FailingDecoder {
        self.delay = delay;
        self
    }
}

impl Decoder for FailingDecoder {
    fn decode(&self, path: &Path) -> Result<Clip, DecodeError> {
        thread::sleep(self.delay);
        let failed = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(DecodeError::Format {
                path: path.to_path_buf(),
                message: "injected failure".to_string(),
            })
        } else {
            Ok(silence())
        }
    }
}

/// A pack directory in a temp dir with a manifest and short WAV assets.
pub struct PackFixture {
    dir: TempDir,
}

impl PackFixture {
    /// Writes `manifest` as the pack manifest and a 100ms WAV file for each asset.
    pub fn new(manifest: &str, assets: &[&str]) -> PackFixture {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        for asset in assets {
            write_test_asset(&dir.path().join(asset));
        }
        PackFixture { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The path the loader resolves `name` to.
    pub fn asset(&self, name: &str) -> PathBuf {
        self.dir.path().canonicalize().unwrap().join(name)
    }

    /// Replaces the manifest.
    pub fn write_manifest(&self, manifest: &str) {
        fs::write(self.dir.path().join(MANIFEST_FILE), manifest).unwrap();
    }
}

/// Writes 100ms of a quiet mono tone.
pub fn write_test_asset(path: &Path) {
    write_asset(path, Duration::from_millis(100));
}

/// Writes a quiet mono tone lasting `duration`.
pub fn write_asset(path: &Path, duration: Duration) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let frames = (duration.as_secs_f64() * TEST_SAMPLE_RATE as f64).round() as usize;
    write_wav(path, vec![vec![0.1; frames]], TEST_SAMPLE_RATE).unwrap();
}
