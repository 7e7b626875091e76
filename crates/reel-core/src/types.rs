//! Common types and limits for the transport engine.

/// Audio sample type (32-bit float, channel-interleaved).
pub type Sample = f32;

/// Track store capacity. Playlists longer than this are truncated.
pub const MAX_TRACKS: usize = 8;

/// Maximum supported channel count per track.
pub const MAX_CHANNELS: u16 = 2;

/// Default output quantum requested from the audio device, in frames.
pub const DEFAULT_FRAMES_PER_BUFFER: u32 = 1024;

/// Largest quantum the backend pre-allocates for.
///
/// Covers all common device buffer sizes (64 .. 4096 frames).
/// Pre-allocating to this size eliminates allocations in the audio callback.
pub const MAX_BUFFER_SIZE: usize = 8192;
