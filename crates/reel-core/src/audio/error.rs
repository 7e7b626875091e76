//! Audio backend error types

use thiserror::Error;

/// Errors from the audio-I/O host boundary. All fatal: the process never
/// keeps running with a half-open stream.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no audio output devices found")]
    NoDevice,

    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to get device config: {0}")]
    ConfigError(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlayError(String),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
