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

//! Decoding of pack assets into memory.
//!
//! Clips are decoded entirely into memory for zero-latency playback.

use std::fs::File;
use std::io;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::clip::Clip;
use super::error::DecodeError;

/// Turns a file into a clip.
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Clip, DecodeError>;
}

/// Decodes anything symphonia understands (WAV, Ogg Vorbis, MP3, FLAC, ...) and
/// converts it to the output sample rate.
pub struct SymphoniaDecoder {
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SymphoniaDecoder {
    pub fn new(target_sample_rate: u32) -> Self {
        SymphoniaDecoder { target_sample_rate }
    }

    /// Reads every packet of the first audio track into interleaved f32 samples.
    fn read_samples(path: &Path) -> Result<(Vec<f32>, u16, u32), DecodeError> {
        let format_error = |e: SymphoniaError| DecodeError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let file = File::open(path).map_err(|e| DecodeError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(format_error)?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoTrack(path.to_path_buf()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(format_error)?;

        let mut samples = Vec::new();
        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(format_error(e)),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // A corrupt packet loses a few milliseconds, not the clip.
                    debug!(path = ?path, error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(format_error(e)),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count() as u16);

            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }

        match (channels, sample_rate) {
            (Some(channels), Some(sample_rate))
                if channels > 0 && sample_rate > 0 && !samples.is_empty() =>
            {
                Ok((samples, channels, sample_rate))
            }
            _ => Err(DecodeError::Empty(path.to_path_buf())),
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> Result<Clip, DecodeError> {
        info!(path = ?path, "Decoding clip into memory");

        let (samples, channel_count, source_sample_rate) = Self::read_samples(path)?;

        let samples = if source_sample_rate != self.target_sample_rate {
            debug!(
                source_rate = source_sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding clip"
            );
            transcode(
                &samples,
                channel_count,
                source_sample_rate,
                self.target_sample_rate,
            )
        } else {
            samples
        };

        let clip = Clip::new(samples, channel_count, self.target_sample_rate);
        info!(
            path = ?path,
            channels = channel_count,
            sample_rate = self.target_sample_rate,
            duration_ms = clip.duration().as_millis(),
            memory_kb = clip.memory_size() / 1024,
            "Clip decoded"
        );
        Ok(clip)
    }
}

/// Resamples interleaved samples with linear interpolation. That is enough for
/// clicks and clacks a few dozen milliseconds long.
fn transcode(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let channels = channel_count.max(1) as usize;
    let frames: Vec<&[f32]> = samples.chunks_exact(channels).collect();
    let Some(last) = frames.last() else {
        return Vec::new();
    };
    let step = source_rate as f64 / target_rate as f64;
    let target_frames =
        (frames.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for n in 0..target_frames {
        let position = n as f64 * step;
        let index = position as usize;
        let weight = (position - index as f64) as f32;
        let current = frames.get(index).unwrap_or(last);
        let next = frames.get(index + 1).unwrap_or(current);
        output.extend(
            current
                .iter()
                .zip(next.iter())
                .map(|(a, b)| a + (b - a) * weight),
        );
    }
    output
}
