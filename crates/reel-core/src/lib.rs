//! Reel Core - sample-accurate multi-track audio transport engine
//!
//! Tracks are decoded to fixed-size PCM buffers once at startup and never
//! touched again; a real-time callback renders the selected track into the
//! device buffer while a non-real-time controller mutates the shared
//! transport state through atomics. No locks, no allocation, and no I/O
//! happen on the audio thread.

pub mod audio;
pub mod control;
pub mod decode;
pub mod engine;
pub mod store;
pub mod transport;
pub mod types;

pub use types::*;
