//! Reel Player - terminal transport for pre-loaded PCM tracks
//!
//! Startup order matters: tracks are decoded fully into memory first, the
//! audio stream opens second, and only then does the terminal UI take
//! over. Any load or device failure is fatal before the stream starts;
//! after that the transport absorbs bad input as no-ops.

mod playlist;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use reel_core::audio::start_stream;
use reel_core::control::TransportController;
use reel_core::decode::WavDecoder;
use reel_core::engine::PlaybackEngine;
use reel_core::store::TrackSet;
use reel_core::transport::TransportState;
use reel_core::DEFAULT_FRAMES_PER_BUFFER;

#[derive(Parser)]
#[command(name = "reel-player", about = "Multi-track audio transport player")]
struct Cli {
    /// Playlist file: one audio file path per line (max 8 used)
    playlist: PathBuf,

    /// Output quantum in frames
    #[arg(long, default_value_t = DEFAULT_FRAMES_PER_BUFFER)]
    buffer_size: u32,

    /// Output device name (default: system default output)
    #[arg(long)]
    device: Option<String>,
}

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output; logs go to stderr so they can
    // be redirected away from the TUI.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let paths = playlist::read(&cli.playlist)
        .with_context(|| format!("cannot read playlist {}", cli.playlist.display()))?;
    if paths.is_empty() {
        bail!("playlist {} lists no tracks", cli.playlist.display());
    }

    let tracks = Arc::new(TrackSet::load(&paths, &WavDecoder).context("track load failed")?);

    let state = Arc::new(TransportState::new());
    // Track 0 starts selected; playback begins paused.
    state.set_selection(0);

    let engine = PlaybackEngine::new(Arc::clone(&tracks), Arc::clone(&state));
    let handle = start_stream(
        engine,
        tracks.sample_rate(),
        cli.device.as_deref(),
        cli.buffer_size,
    )
    .context("cannot open audio stream")?;
    log::info!(
        "stream up: {} Hz, {} frames (~{:.1}ms)",
        handle.sample_rate(),
        handle.buffer_size(),
        handle.latency_ms()
    );

    let controller = TransportController::new(
        Arc::clone(&tracks),
        state,
        handle.buffer_size(),
        handle.cpu_load(),
    );

    let mut terminal = ratatui::init();
    let result = ui::run(&mut terminal, &controller, &tracks);
    ratatui::restore();

    // Stream stops when the handle drops, after the terminal is restored.
    drop(handle);
    result
}
