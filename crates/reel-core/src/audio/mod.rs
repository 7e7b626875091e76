//! CPAL output stream around the playback engine.
//!
//! The engine never owns the device; this module negotiates a fixed-size
//! f32 output stream, then invokes [`PlaybackEngine::render`] once per
//! quantum from the device callback. The callback renders into a scratch
//! buffer pre-allocated for [`MAX_BUFFER_SIZE`] frames and interleaves
//! into the device layout, so it performs no allocation itself.

mod error;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, Stream, StreamConfig};

pub use error::{AudioError, AudioResult};

use crate::engine::PlaybackEngine;
use crate::types::MAX_BUFFER_SIZE;

/// Lock-free CPU load meter: fraction of the callback deadline spent
/// rendering, written by the audio thread, read by the display.
pub struct CpuLoad(AtomicU32);

impl CpuLoad {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    pub fn set(&self, fraction: f32) {
        self.0.store(fraction.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for CpuLoad {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps the output stream alive. Drop it to stop audio.
pub struct StreamHandle {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
    cpu_load: Arc<CpuLoad>,
}

impl StreamHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Negotiated quantum in frames.
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    pub fn cpu_load(&self) -> Arc<CpuLoad> {
        Arc::clone(&self.cpu_load)
    }

    /// One-way output latency in milliseconds.
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Open the default (or named) output device and start streaming.
///
/// The stream runs at the track set's sample rate with a fixed quantum of
/// `buffer_frames`; no sample-rate conversion is performed.
pub fn start_stream(
    engine: PlaybackEngine,
    sample_rate: u32,
    device_name: Option<&str>,
    buffer_frames: u32,
) -> AudioResult<StreamHandle> {
    let track_channels = engine.channels();
    if track_channels == 0 {
        return Err(AudioError::ConfigError("no tracks loaded".into()));
    }

    let host = cpal::default_host();
    let device = match device_name {
        Some(name) => host
            .output_devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?,
        None => host.default_output_device().ok_or(AudioError::NoDevice)?,
    };
    log::info!(
        "using audio device: {}",
        device.name().unwrap_or_else(|_| "unknown".into())
    );

    let supported = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| c.channels() as usize >= track_channels)
        .find(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .ok_or_else(|| {
            AudioError::ConfigError(format!(
                "device has no f32 output config at {} Hz with {} channels",
                sample_rate, track_channels
            ))
        })?;

    let buffer_frames = buffer_frames.clamp(64, MAX_BUFFER_SIZE as u32);
    let config = StreamConfig {
        channels: supported.channels(),
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Fixed(buffer_frames),
    };
    log::info!(
        "audio config: {} channels, {} Hz, {} frames (~{:.1}ms latency)",
        config.channels,
        sample_rate,
        buffer_frames,
        (buffer_frames as f32 / sample_rate as f32) * 1000.0
    );

    let cpu_load = Arc::new(CpuLoad::new());
    let stream = build_output_stream(&device, &config, engine, Arc::clone(&cpu_load))?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;
    log::info!("audio stream started");

    Ok(StreamHandle {
        _stream: stream,
        sample_rate,
        buffer_size: buffer_frames,
        cpu_load,
    })
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    engine: PlaybackEngine,
    cpu_load: Arc<CpuLoad>,
) -> AudioResult<Stream> {
    let out_channels = config.channels as usize;
    let track_channels = engine.channels();
    let sample_rate = config.sample_rate.0;

    // Scratch quantum in track layout; sized once, sliced per callback.
    let mut scratch = vec![0.0f32; MAX_BUFFER_SIZE * track_channels];

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let started = Instant::now();

                let frames = (data.len() / out_channels).min(MAX_BUFFER_SIZE);
                let span = frames * track_channels;
                engine.render(&mut scratch[..span]);

                for (frame, src) in data
                    .chunks_mut(out_channels)
                    .zip(scratch[..span].chunks(track_channels))
                {
                    frame[0] = src[0];
                    if out_channels > 1 {
                        // Mono tracks play on both device channels.
                        frame[1] = if track_channels > 1 { src[1] } else { src[0] };
                    }
                    for ch in frame.iter_mut().skip(2) {
                        *ch = 0.0;
                    }
                }
                for frame in data.chunks_mut(out_channels).skip(frames) {
                    frame.fill(0.0);
                }

                let budget = frames as f32 / sample_rate as f32;
                if budget > 0.0 {
                    cpu_load.set(started.elapsed().as_secs_f32() / budget);
                }
            },
            move |err| {
                log::error!("audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}
