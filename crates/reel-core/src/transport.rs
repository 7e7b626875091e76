//! Transport state shared between the control thread and the audio callback.
//!
//! Every field written by one thread and read by the other is an atomic,
//! so neither side can observe a torn value and neither side ever blocks.
//! All operations use `Ordering::Relaxed`: the fields are independent
//! flags where we only need visibility, not synchronization with other
//! memory operations.
//!
//! The {rewind, fast-forward} exclusion invariant is held by construction:
//! direction is a single `AtomicU8` rather than two booleans. Likewise the
//! one-shot jump request is a single-slot value consumed with `swap`, so a
//! request fires exactly once and back/forward can never both be pending.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};

/// Sentinel stored in `selection` when no track is selected.
const NO_SELECTION: i64 = -1;

/// Playback direction sub-state, cycled by the rewind/forward toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    Forward = 0,
    Rewind = 1,
    FastForward = 2,
}

impl Direction {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Direction::Rewind,
            2 => Direction::FastForward,
            _ => Direction::Forward,
        }
    }
}

/// Pending one-second jump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Jump {
    #[default]
    None = 0,
    Back = 1,
    Forward = 2,
}

impl Jump {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Jump::Back,
            2 => Jump::Forward,
            _ => Jump::None,
        }
    }
}

/// The process-wide transport state.
///
/// Initialized once before the stream starts (no selection, everything
/// off) and lives until shutdown. The controller mutates it in response
/// to commands; the engine reads it every quantum and writes back the
/// end-of-track transitions (stopped, playing, direction).
pub struct TransportState {
    /// Selected track index, or [`NO_SELECTION`]. Read once per callback.
    selection: AtomicI64,
    /// Whether audio should be emitted at all.
    playing: AtomicBool,
    /// One-shot end-of-track / explicit-stop notice, consumed by the controller.
    stopped: AtomicBool,
    /// Direction sub-state, see [`Direction`].
    direction: AtomicU8,
    /// Single-slot jump request, consumed by the engine.
    jump: AtomicU8,
    /// Whether end-of-track restarts at frame 0 instead of stopping.
    looping: AtomicBool,
}

impl TransportState {
    pub fn new() -> Self {
        Self {
            selection: AtomicI64::new(NO_SELECTION),
            playing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            direction: AtomicU8::new(Direction::Forward as u8),
            jump: AtomicU8::new(Jump::None as u8),
            looping: AtomicBool::new(false),
        }
    }

    /// Currently selected track index, if any.
    #[inline]
    pub fn selection(&self) -> Option<usize> {
        match self.selection.load(Ordering::Relaxed) {
            NO_SELECTION => None,
            idx => Some(idx as usize),
        }
    }

    #[inline]
    pub fn set_selection(&self, index: usize) {
        self.selection.store(index as i64, Ordering::Relaxed);
    }

    #[inline]
    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    /// Raise the one-shot stopped notice.
    #[inline]
    pub fn pulse_stopped(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    /// Consume the stopped notice, returning whether it was raised.
    #[inline]
    pub fn take_stopped(&self) -> bool {
        self.stopped.swap(false, Ordering::Relaxed)
    }

    #[inline]
    pub fn clear_stopped(&self) {
        self.stopped.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        Direction::from_u8(self.direction.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_direction(&self, direction: Direction) {
        self.direction.store(direction as u8, Ordering::Relaxed);
    }

    /// Replace any pending jump with `jump`. Later requests win.
    #[inline]
    pub fn request_jump(&self, jump: Jump) {
        self.jump.store(jump as u8, Ordering::Relaxed);
    }

    /// Consume the pending jump request, if any. Engine-only.
    #[inline]
    pub fn take_jump(&self) -> Jump {
        Jump::from_u8(self.jump.swap(Jump::None as u8, Ordering::Relaxed))
    }

    #[inline]
    pub fn looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-track playback position.
///
/// Written by the engine while the track may be selected; the controller
/// only reads it for display and resets it on stop, after `playing` has
/// been cleared. A display read that briefly lags the audio thread is
/// acceptable.
#[derive(Debug)]
pub struct Cursor {
    /// Index of the next frame to emit.
    next_frame: AtomicU64,
    /// Buffer-quanta elapsed since the last reset; coarse position display only.
    frame_count: AtomicU64,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            next_frame: AtomicU64::new(0),
            frame_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn next_frame(&self) -> u64 {
        self.next_frame.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store_next_frame(&self, frame: u64) {
        self.next_frame.store(frame, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn store_frame_count(&self, count: u64) {
        self.frame_count.store(count, Ordering::Relaxed);
    }

    /// Rewind to the start of the track.
    pub fn reset(&self) {
        self.next_frame.store(0, Ordering::Relaxed);
        self.frame_count.store(0, Ordering::Relaxed);
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_idle() {
        let state = TransportState::new();
        assert_eq!(state.selection(), None);
        assert!(!state.playing());
        assert!(!state.take_stopped());
        assert_eq!(state.direction(), Direction::Forward);
        assert_eq!(state.take_jump(), Jump::None);
        assert!(!state.looping());
    }

    #[test]
    fn jump_request_fires_exactly_once() {
        let state = TransportState::new();
        state.request_jump(Jump::Back);
        assert_eq!(state.take_jump(), Jump::Back);
        assert_eq!(state.take_jump(), Jump::None);
    }

    #[test]
    fn later_jump_request_replaces_pending_one() {
        let state = TransportState::new();
        state.request_jump(Jump::Back);
        state.request_jump(Jump::Forward);
        assert_eq!(state.take_jump(), Jump::Forward);
        assert_eq!(state.take_jump(), Jump::None);
    }

    #[test]
    fn stopped_notice_is_one_shot() {
        let state = TransportState::new();
        state.pulse_stopped();
        assert!(state.take_stopped());
        assert!(!state.take_stopped());
    }

    #[test]
    fn cursor_reset_zeroes_both_fields() {
        let cursor = Cursor::new();
        cursor.store_next_frame(4096);
        cursor.store_frame_count(4);
        cursor.reset();
        assert_eq!(cursor.next_frame(), 0);
        assert_eq!(cursor.frame_count(), 0);
    }
}
