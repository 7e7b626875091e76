//! The real-time playback callback.
//!
//! [`PlaybackEngine::render`] runs on the audio thread under a deadline:
//! no allocation, no locks, no I/O. The only synchronization with the
//! control thread is atomic loads/stores on [`TransportState`] and the
//! selected track's [`Cursor`]. The selection is read exactly once per
//! quantum, so the active track cannot change underneath a render.

use std::sync::Arc;

use crate::store::TrackSet;
use crate::transport::{Direction, Jump, TransportState};
use crate::types::Sample;

/// Frames in the quantized one-second jump: the largest whole number of
/// quanta that fits in one second of audio.
#[inline]
pub fn quantized_second(sample_rate: u32, frames_per_buffer: u64) -> u64 {
    (sample_rate as u64 / frames_per_buffer) * frames_per_buffer
}

/// Renders the selected track into the host's output buffer, one quantum
/// at a time.
pub struct PlaybackEngine {
    tracks: Arc<TrackSet>,
    state: Arc<TransportState>,
}

impl PlaybackEngine {
    pub fn new(tracks: Arc<TrackSet>, state: Arc<TransportState>) -> Self {
        Self { tracks, state }
    }

    /// Channel count of the rendered stream.
    pub fn channels(&self) -> usize {
        self.tracks.channels() as usize
    }

    /// Fill one output quantum.
    ///
    /// `output` is `framesPerBuffer * channels` interleaved samples, fully
    /// overwritten on every call. Invoked by the audio host once per
    /// quantum; also callable directly from tests with a plain buffer.
    pub fn render(&self, output: &mut [Sample]) {
        if output.is_empty() {
            return;
        }
        let Some(track) = self
            .state
            .selection()
            .filter(|_| self.state.playing())
            .and_then(|idx| self.tracks.get(idx))
        else {
            output.fill(0.0);
            return;
        };

        let channels = track.channels() as u64;
        let frames = output.len() as u64 / channels;
        let total = track.total_frames();
        let cursor = track.cursor();
        let mut next = cursor.next_frame();

        // End of track: rewind to frame 0 before emitting. Without loop
        // this also stops the transport and resets the direction mode, so
        // a later play starts fresh forward.
        let mut stopping = false;
        if next + frames >= total {
            if !self.state.looping() {
                stopping = true;
                self.state.pulse_stopped();
                self.state.set_playing(false);
                self.state.set_direction(Direction::Forward);
            }
            next = 0;
            cursor.reset();
        }

        // `next` is in [0, total) here; a track shorter than one quantum
        // still gets a bounded window, zero-padded at the end.
        let base = (next * channels) as usize;
        let span = (output.len()).min(track.samples().len() - base);
        let window = &track.samples()[base..base + span];

        if self.state.direction() == Direction::Rewind {
            // Reverse frame order, channels within each frame reversed too:
            // a straight sample-order reversal of the window.
            for (out, src) in output[..span].iter_mut().zip(window.iter().rev()) {
                *out = *src;
            }
        } else {
            output[..span].copy_from_slice(window);
        }
        output[span..].fill(0.0);

        // A quantum that stopped the transport leaves the cursor at 0.
        if !stopping {
            self.advance(cursor, next, frames, track.sample_rate());
        }
    }

    /// Apply exactly one position update, jump requests first. Each jump
    /// is consumed as it is observed, so it fires exactly once. Backward
    /// moves saturate at frame 0.
    fn advance(
        &self,
        cursor: &crate::transport::Cursor,
        next: u64,
        frames: u64,
        sample_rate: u32,
    ) {
        let count = cursor.frame_count();
        let quanta_per_second = sample_rate as u64 / frames;
        let jump_frames = quantized_second(sample_rate, frames);

        match self.state.take_jump() {
            Jump::Back => {
                cursor.store_next_frame(next.saturating_sub(jump_frames));
                cursor.store_frame_count(count.saturating_sub(quanta_per_second));
            }
            Jump::Forward => {
                cursor.store_next_frame(next + jump_frames);
                cursor.store_frame_count(count + quanta_per_second);
            }
            Jump::None => match self.state.direction() {
                Direction::Rewind => {
                    cursor.store_next_frame(next.saturating_sub(2 * frames));
                    cursor.store_frame_count(count.saturating_sub(2));
                }
                Direction::FastForward => {
                    cursor.store_next_frame(next + 2 * frames);
                    cursor.store_frame_count(count + 2);
                }
                Direction::Forward => {
                    cursor.store_next_frame(next + frames);
                    cursor.store_frame_count(count + 1);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{ramp, StubDecoder};
    use std::path::PathBuf;

    const FPB: usize = 1024;

    /// One mono ramp track (sample n == n) in a fresh engine.
    fn engine_with_ramp(frames: u64, sample_rate: u32) -> (PlaybackEngine, Arc<TransportState>) {
        let decoder = StubDecoder::default().with("ramp.wav", ramp(frames, 1, sample_rate));
        let tracks = Arc::new(
            TrackSet::load(&[PathBuf::from("ramp.wav")], &decoder).unwrap(),
        );
        let state = Arc::new(TransportState::new());
        (PlaybackEngine::new(tracks, Arc::clone(&state)), state)
    }

    fn render(engine: &PlaybackEngine) -> Vec<Sample> {
        // Pre-fill with a sentinel so silence is observable.
        let mut out = vec![7.0; FPB];
        engine.render(&mut out);
        out
    }

    fn cursor_of(engine: &PlaybackEngine) -> (u64, u64) {
        let cursor = engine.tracks.get(0).unwrap().cursor();
        (cursor.next_frame(), cursor.frame_count())
    }

    #[test]
    fn silence_without_selection() {
        let (engine, _state) = engine_with_ramp(44100, 44100);
        assert!(render(&engine).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn silence_while_paused() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        let out = render(&engine);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(cursor_of(&engine), (0, 0));
    }

    #[test]
    fn forward_quantum_emits_window_and_advances() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);

        let out = render(&engine);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[FPB - 1], (FPB - 1) as f32);
        assert_eq!(cursor_of(&engine), (FPB as u64, 1));

        let out = render(&engine);
        assert_eq!(out[0], FPB as f32);
        assert_eq!(cursor_of(&engine), (2 * FPB as u64, 2));
    }

    #[test]
    fn runs_to_end_then_stops_exactly_once() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);

        // 43 quanta fit before the window would run past end-of-track.
        for _ in 0..43 {
            render(&engine);
            assert!(!state.take_stopped());
        }
        assert_eq!(cursor_of(&engine), (43 * FPB as u64, 43));

        // 44th quantum crosses the end: reset, stop, emit from frame 0.
        let out = render(&engine);
        assert!(state.take_stopped());
        assert!(!state.playing());
        assert_eq!(state.direction(), Direction::Forward);
        assert_eq!(cursor_of(&engine), (0, 0));
        assert_eq!(out[5], 5.0);

        // Subsequent quanta are silent and do not re-raise the notice.
        let out = render(&engine);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(!state.take_stopped());
    }

    #[test]
    fn loop_wraps_without_stopping() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);
        state.set_looping(true);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(44032);
        cursor.store_frame_count(43);

        let out = render(&engine);
        assert!(!state.take_stopped());
        assert!(state.playing());
        assert_eq!(out[0], 0.0);
        assert_eq!(cursor_of(&engine), (FPB as u64, 1));
    }

    #[test]
    fn rewind_emits_reversed_window_and_steps_back_two() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);
        state.set_direction(Direction::Rewind);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(10240);
        cursor.store_frame_count(10);

        let out = render(&engine);
        assert_eq!(out[0], (10240 + FPB - 1) as f32);
        assert_eq!(out[FPB - 1], 10240.0);
        assert_eq!(cursor_of(&engine), (8192, 8));
    }

    #[test]
    fn rewind_saturates_at_track_start() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);
        state.set_direction(Direction::Rewind);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(FPB as u64);
        cursor.store_frame_count(1);

        render(&engine);
        assert_eq!(cursor_of(&engine), (0, 0));
    }

    #[test]
    fn fast_forward_steps_two_quanta() {
        let (engine, state) = engine_with_ramp(44100, 44100);
        state.set_selection(0);
        state.set_playing(true);
        state.set_direction(Direction::FastForward);

        render(&engine);
        assert_eq!(cursor_of(&engine), (2 * FPB as u64, 2));
    }

    #[test]
    fn jump_back_then_forward_round_trips() {
        let (engine, state) = engine_with_ramp(100_000, 44100);
        state.set_selection(0);
        state.set_playing(true);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(50176);
        cursor.store_frame_count(49);

        state.request_jump(Jump::Back);
        render(&engine);
        // quantized second at 44100/1024 = 43 quanta = 44032 frames
        assert_eq!(cursor_of(&engine), (50176 - 44032, 49 - 43));

        state.request_jump(Jump::Forward);
        render(&engine);
        assert_eq!(cursor_of(&engine), (50176, 49));
    }

    #[test]
    fn jump_takes_precedence_over_direction_mode() {
        let (engine, state) = engine_with_ramp(200_000, 44100);
        state.set_selection(0);
        state.set_playing(true);
        state.set_direction(Direction::FastForward);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(50176);
        cursor.store_frame_count(49);

        state.request_jump(Jump::Forward);
        render(&engine);
        assert_eq!(cursor_of(&engine), (50176 + 44032, 49 + 43));

        // Jump consumed; the next quantum falls back to fast-forward.
        render(&engine);
        assert_eq!(
            cursor_of(&engine),
            (50176 + 44032 + 2 * FPB as u64, 49 + 43 + 2)
        );
    }

    #[test]
    fn jump_back_saturates_at_track_start() {
        let (engine, state) = engine_with_ramp(100_000, 44100);
        state.set_selection(0);
        state.set_playing(true);

        let cursor = engine.tracks.get(0).unwrap().cursor();
        cursor.store_next_frame(FPB as u64);
        cursor.store_frame_count(1);

        state.request_jump(Jump::Back);
        render(&engine);
        assert_eq!(cursor_of(&engine), (0, 0));
    }

    #[test]
    fn track_shorter_than_quantum_is_zero_padded() {
        let (engine, state) = engine_with_ramp(100, 44100);
        state.set_selection(0);
        state.set_playing(true);

        let out = render(&engine);
        assert!(state.take_stopped());
        assert_eq!(out[99], 99.0);
        assert!(out[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stereo_quantum_interleaves_both_channels() {
        let decoder = StubDecoder::default().with("st.wav", ramp(44100, 2, 44100));
        let tracks = Arc::new(TrackSet::load(&[PathBuf::from("st.wav")], &decoder).unwrap());
        let state = Arc::new(TransportState::new());
        let engine = PlaybackEngine::new(tracks, Arc::clone(&state));
        state.set_selection(0);
        state.set_playing(true);

        let mut out = vec![0.0; FPB * 2];
        engine.render(&mut out);
        // Interleaved ramp: sample k == k.
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 1.0);
        assert_eq!(out[2 * FPB - 1], (2 * FPB - 1) as f32);
        let cursor = engine.tracks.get(0).unwrap().cursor();
        assert_eq!(cursor.next_frame(), FPB as u64);
    }

    #[test]
    fn quantized_second_is_whole_quanta() {
        assert_eq!(quantized_second(44100, 1024), 43 * 1024);
        assert_eq!(quantized_second(48000, 1024), 46 * 1024);
        assert_eq!(quantized_second(44100, 44100), 44100);
        // Quantum longer than a second: no whole quantum fits.
        assert_eq!(quantized_second(8000, 16000), 0);
    }
}
