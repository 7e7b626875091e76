//! Track store: immutable decoded PCM buffers plus per-track cursor state.
//!
//! The store is populated once at startup and owns every sample buffer for
//! the process lifetime. All tracks must agree on channel count and sample
//! rate; any disagreement is fatal at load time, before the audio stream
//! opens.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::decode::{DecodeError, Decoder};
use crate::transport::Cursor;
use crate::types::{Sample, MAX_CHANNELS, MAX_TRACKS};

/// Fatal startup errors from track loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("{path}: {channels} channels exceeds the supported maximum of 2")]
    ChannelCountExceeded { path: PathBuf, channels: u16 },

    #[error("{path}: {found} channels, but the first track has {expected}")]
    ChannelMismatch {
        path: PathBuf,
        expected: u16,
        found: u16,
    },

    #[error("{path}: {found} Hz, but the first track is {expected} Hz")]
    SampleRateMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },

    #[error("{path}: decoded {read} frames, header declares {declared}")]
    ReadIncomplete {
        path: PathBuf,
        declared: u64,
        read: u64,
    },
}

/// One loaded track: immutable samples plus its playback cursor.
#[derive(Debug)]
pub struct Track {
    title: String,
    channels: u16,
    sample_rate: u32,
    total_frames: u64,
    samples: Box<[Sample]>,
    cursor: Cursor,
}

impl Track {
    /// Display label (file stem of the source path).
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Total playable frames.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Interleaved samples, `total_frames * channels` long.
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// This track's playback cursor.
    #[inline]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Track duration in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        self.total_frames / self.sample_rate as u64
    }
}

/// The fixed-capacity set of loaded tracks.
#[derive(Debug)]
pub struct TrackSet {
    tracks: Vec<Track>,
    channels: u16,
    sample_rate: u32,
}

impl TrackSet {
    /// Decode and load `paths`, in order, up to [`MAX_TRACKS`] entries
    /// (longer lists are truncated, not an error).
    ///
    /// Every track must have at most [`MAX_CHANNELS`] channels and must
    /// match the first track's channel count and sample rate. A decoded
    /// buffer shorter than its header's frame count is rejected.
    pub fn load<D: Decoder>(paths: &[PathBuf], decoder: &D) -> Result<TrackSet, LoadError> {
        let mut set = TrackSet {
            tracks: Vec::with_capacity(paths.len().min(MAX_TRACKS)),
            channels: 0,
            sample_rate: 0,
        };

        if paths.len() > MAX_TRACKS {
            log::warn!(
                "playlist has {} entries; loading the first {}",
                paths.len(),
                MAX_TRACKS
            );
        }

        for path in paths.iter().take(MAX_TRACKS) {
            let audio = decoder.decode(path)?;

            if audio.channels > MAX_CHANNELS {
                return Err(LoadError::ChannelCountExceeded {
                    path: path.clone(),
                    channels: audio.channels,
                });
            }

            if set.tracks.is_empty() {
                set.channels = audio.channels;
                set.sample_rate = audio.sample_rate;
            } else {
                if audio.channels != set.channels {
                    return Err(LoadError::ChannelMismatch {
                        path: path.clone(),
                        expected: set.channels,
                        found: audio.channels,
                    });
                }
                if audio.sample_rate != set.sample_rate {
                    return Err(LoadError::SampleRateMismatch {
                        path: path.clone(),
                        expected: set.sample_rate,
                        found: audio.sample_rate,
                    });
                }
            }

            let read_frames = audio.samples.len() as u64 / audio.channels as u64;
            if read_frames != audio.frames {
                return Err(LoadError::ReadIncomplete {
                    path: path.clone(),
                    declared: audio.frames,
                    read: read_frames,
                });
            }

            let title = title_of(path);
            log::info!(
                "track {}: \"{}\" - {} frames, {} ch, {} Hz",
                set.tracks.len(),
                title,
                audio.frames,
                audio.channels,
                audio.sample_rate
            );

            set.tracks.push(Track {
                title,
                channels: audio.channels,
                sample_rate: audio.sample_rate,
                total_frames: audio.frames,
                samples: audio.samples.into_boxed_slice(),
                cursor: Cursor::new(),
            });
        }

        Ok(set)
    }

    /// Number of loaded tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Channel count shared by every loaded track.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate shared by every loaded track.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn title_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ramp, StubDecoder};

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn loads_matching_tracks_in_order() {
        let decoder = StubDecoder::default()
            .with("a.wav", ramp(4096, 2, 44100))
            .with("b.wav", ramp(2048, 2, 44100));

        let set = TrackSet::load(&paths(&["a.wav", "b.wav"]), &decoder).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.channels(), 2);
        assert_eq!(set.sample_rate(), 44100);
        assert_eq!(set.get(0).unwrap().title(), "a");
        assert_eq!(set.get(1).unwrap().total_frames(), 2048);
        assert_eq!(set.get(1).unwrap().samples().len(), 2048 * 2);
    }

    #[test]
    fn rejects_more_than_two_channels() {
        let decoder = StubDecoder::default().with("quad.wav", ramp(64, 4, 44100));
        let err = TrackSet::load(&paths(&["quad.wav"]), &decoder).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ChannelCountExceeded { channels: 4, .. }
        ));
    }

    #[test]
    fn rejects_channel_mismatch_against_first_track() {
        let decoder = StubDecoder::default()
            .with("stereo.wav", ramp(64, 2, 44100))
            .with("mono.wav", ramp(64, 1, 44100));
        let err = TrackSet::load(&paths(&["stereo.wav", "mono.wav"]), &decoder).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ChannelMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn rejects_sample_rate_mismatch_against_first_track() {
        let decoder = StubDecoder::default()
            .with("a.wav", ramp(64, 1, 44100))
            .with("b.wav", ramp(64, 1, 48000));
        let err = TrackSet::load(&paths(&["a.wav", "b.wav"]), &decoder).unwrap_err();
        assert!(matches!(
            err,
            LoadError::SampleRateMismatch {
                expected: 44100,
                found: 48000,
                ..
            }
        ));
    }

    #[test]
    fn rejects_short_read() {
        let mut audio = ramp(64, 2, 44100);
        audio.samples.truncate(100);
        let decoder = StubDecoder::default().with("short.wav", audio);
        let err = TrackSet::load(&paths(&["short.wav"]), &decoder).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ReadIncomplete {
                declared: 64,
                read: 50,
                ..
            }
        ));
    }

    #[test]
    fn truncates_playlist_at_capacity() {
        let mut decoder = StubDecoder::default();
        let names: Vec<String> = (0..12).map(|i| format!("t{i}.wav")).collect();
        for name in &names {
            decoder = decoder.with(name, ramp(16, 1, 8000));
        }
        let list: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        let set = TrackSet::load(&list, &decoder).unwrap();
        assert_eq!(set.len(), MAX_TRACKS);
    }

    #[test]
    fn decode_failure_propagates() {
        let decoder = StubDecoder::default();
        let err = TrackSet::load(&paths(&["missing.wav"]), &decoder).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
    }
}
