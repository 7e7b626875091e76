//! Non-real-time transport command processing.
//!
//! The controller runs on the control thread, translating discrete
//! commands into transport-state mutations. Malformed input (out-of-range
//! selection, direction toggles while paused) is absorbed as a no-op;
//! nothing at this layer can fail once the stream is running.

use std::sync::Arc;

use crate::audio::CpuLoad;
use crate::store::TrackSet;
use crate::transport::{Direction, Jump, TransportState};

/// Discrete transport commands, as produced by the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    /// Switch the active track. Ignored unless the index is loaded.
    Select(usize),
    TogglePlayPause,
    Stop,
    ToggleRewind,
    ToggleFastForward,
    JumpBack,
    JumpForward,
    ToggleLoop,
    /// Handled by the UI loop; a no-op on the transport itself.
    Quit,
}

/// Read-only snapshot for display.
#[derive(Debug, Clone, Copy)]
pub struct TransportStatus {
    pub selection: Option<usize>,
    pub playing: bool,
    pub direction: Direction,
    pub looping: bool,
    /// Buffer-quanta elapsed on the selected track.
    pub frame_count: u64,
    pub total_frames: u64,
    pub sample_rate: u32,
    pub frames_per_buffer: u32,
    /// Fraction of the callback deadline spent rendering.
    pub cpu_load: f32,
}

impl TransportStatus {
    /// Coarse playback position in whole seconds.
    pub fn position_secs(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frame_count * self.frames_per_buffer as u64 / self.sample_rate as u64
    }

    /// Selected track duration in whole seconds.
    pub fn duration_secs(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.total_frames / self.sample_rate as u64
    }
}

/// Applies transport commands and serves status queries.
pub struct TransportController {
    tracks: Arc<TrackSet>,
    state: Arc<TransportState>,
    frames_per_buffer: u32,
    cpu_load: Arc<CpuLoad>,
}

impl TransportController {
    pub fn new(
        tracks: Arc<TrackSet>,
        state: Arc<TransportState>,
        frames_per_buffer: u32,
        cpu_load: Arc<CpuLoad>,
    ) -> Self {
        Self {
            tracks,
            state,
            frames_per_buffer,
            cpu_load,
        }
    }

    /// Apply one command to the transport state machine.
    pub fn apply(&self, command: TransportCommand) {
        match command {
            TransportCommand::Select(index) => {
                if index < self.tracks.len() {
                    self.state.set_selection(index);
                }
            }
            TransportCommand::TogglePlayPause => {
                self.state.clear_stopped();
                // In rewind or fast-forward mode the toggle cancels the
                // mode and resumes normal playback instead of pausing.
                if self.state.direction() != Direction::Forward {
                    self.state.set_direction(Direction::Forward);
                } else {
                    self.state.set_playing(!self.state.playing());
                }
            }
            TransportCommand::Stop => {
                self.state.set_playing(false);
                self.state.pulse_stopped();
                // Cursor reset is safe here: playing is already false, so
                // the audio thread is no longer writing it.
                if let Some(track) = self.state.selection().and_then(|i| self.tracks.get(i)) {
                    track.cursor().reset();
                }
            }
            TransportCommand::ToggleRewind => {
                if self.state.playing() {
                    let next = match self.state.direction() {
                        Direction::Rewind => Direction::Forward,
                        _ => Direction::Rewind,
                    };
                    self.state.set_direction(next);
                }
            }
            TransportCommand::ToggleFastForward => {
                if self.state.playing() {
                    let next = match self.state.direction() {
                        Direction::FastForward => Direction::Forward,
                        _ => Direction::FastForward,
                    };
                    self.state.set_direction(next);
                }
            }
            TransportCommand::JumpBack => {
                if self.state.playing() {
                    self.state.request_jump(Jump::Back);
                }
            }
            TransportCommand::JumpForward => {
                if self.state.playing() {
                    self.state.request_jump(Jump::Forward);
                }
            }
            TransportCommand::ToggleLoop => {
                self.state.set_looping(!self.state.looping());
            }
            TransportCommand::Quit => {}
        }
    }

    /// Consume the one-shot stopped notice for display.
    pub fn take_stopped_notice(&self) -> bool {
        self.state.take_stopped()
    }

    /// Snapshot the transport for display. A read that briefly lags the
    /// audio thread is fine; nothing here is correctness-critical.
    pub fn status(&self) -> TransportStatus {
        let selection = self.state.selection();
        let (frame_count, total_frames) = selection
            .and_then(|i| self.tracks.get(i))
            .map(|t| (t.cursor().frame_count(), t.total_frames()))
            .unwrap_or((0, 0));

        TransportStatus {
            selection,
            playing: self.state.playing(),
            direction: self.state.direction(),
            looping: self.state.looping(),
            frame_count,
            total_frames,
            sample_rate: self.tracks.sample_rate(),
            frames_per_buffer: self.frames_per_buffer,
            cpu_load: self.cpu_load.get(),
        }
    }
}
