//! Decoder boundary.
//!
//! The engine only ever sees fixed-length interleaved float buffers;
//! producing one from a file is this module's job. [`Decoder`] is a trait
//! so the track store can be exercised with a stub in tests. [`WavDecoder`]
//! is the production implementation backed by hound.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::Sample;

/// Errors from the decoder boundary.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("cannot open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("cannot read samples from {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("unsupported sample format in {path}: {detail}")]
    UnsupportedFormat { path: PathBuf, detail: String },
}

/// One decoded audio file: interleaved float samples plus format info.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frame count declared by the file header.
    pub frames: u64,
    /// Interleaved samples; `frames * channels` entries when complete.
    pub samples: Vec<Sample>,
}

/// Turns a file path into a [`DecodedAudio`] buffer.
pub trait Decoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError>;
}

/// WAV file decoder.
///
/// Integer samples are normalized to [-1.0, 1.0).
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        let reader = hound::WavReader::open(path).map_err(|e| DecodeError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let spec = reader.spec();
        let frames = reader.duration() as u64;

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DecodeError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample > 32 {
                    return Err(DecodeError::UnsupportedFormat {
                        path: path.to_path_buf(),
                        detail: format!("{}-bit integer samples", spec.bits_per_sample),
                    });
                }
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| DecodeError::Read {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?
            }
        };

        Ok(DecodedAudio {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            frames,
            samples,
        })
    }
}

/// Stub decoder for tests: serves pre-built buffers by path.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StubDecoder {
    files: std::collections::HashMap<PathBuf, DecodedAudio>,
}

#[cfg(test)]
impl StubDecoder {
    pub(crate) fn with(mut self, path: &str, audio: DecodedAudio) -> Self {
        self.files.insert(PathBuf::from(path), audio);
        self
    }
}

#[cfg(test)]
impl Decoder for StubDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| DecodeError::Open {
                path: path.to_path_buf(),
                reason: "no such stub file".into(),
            })
    }
}

/// Mono ramp where sample `n` has value `n`; handy for order-sensitive tests.
#[cfg(test)]
pub(crate) fn ramp(frames: u64, channels: u16, sample_rate: u32) -> DecodedAudio {
    let samples = (0..frames * channels as u64).map(|n| n as f32).collect();
    DecodedAudio {
        channels,
        sample_rate,
        frames,
        samples,
    }
}
