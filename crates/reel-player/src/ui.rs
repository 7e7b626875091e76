//! Terminal UI: key polling and status rendering.
//!
//! Runs the control loop at display cadence. Input is polled with a
//! timeout so the loop never blocks waiting for a key, and the transport
//! status is re-rendered every cycle.

use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Row, Table},
    DefaultTerminal,
};

use reel_core::control::{TransportCommand, TransportController, TransportStatus};
use reel_core::store::TrackSet;
use reel_core::transport::Direction;

/// How long the one-shot STOPPED notice stays on screen.
const STOPPED_FLASH: Duration = Duration::from_secs(1);

/// Map a key press to a transport command, mirroring the classic tape
/// deck bindings: space play/pause, s stop, a rew, d ffwd, , and .
/// skip, l loop, digits select, q quit.
fn command_for(code: KeyCode) -> Option<TransportCommand> {
    match code {
        KeyCode::Char(' ') => Some(TransportCommand::TogglePlayPause),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(TransportCommand::Stop),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(TransportCommand::ToggleRewind),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(TransportCommand::ToggleFastForward),
        KeyCode::Char(',') | KeyCode::Char('<') => Some(TransportCommand::JumpBack),
        KeyCode::Char('.') | KeyCode::Char('>') => Some(TransportCommand::JumpForward),
        KeyCode::Char('l') | KeyCode::Char('L') => Some(TransportCommand::ToggleLoop),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(TransportCommand::Quit),
        KeyCode::Char(c) if c.is_ascii_digit() => {
            Some(TransportCommand::Select(c.to_digit(10).unwrap() as usize))
        }
        _ => None,
    }
}

/// Control loop: poll a key, apply it, render. Returns on quit.
pub fn run(
    terminal: &mut DefaultTerminal,
    controller: &TransportController,
    tracks: &TrackSet,
) -> Result<()> {
    let mut stopped_at: Option<Instant> = None;

    loop {
        if controller.take_stopped_notice() {
            stopped_at = Some(Instant::now());
        }
        let flash = stopped_at.is_some_and(|t| t.elapsed() < STOPPED_FLASH);

        let status = controller.status();
        terminal.draw(|frame| render(frame, &status, tracks, flash))?;

        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match command_for(key.code) {
                    Some(TransportCommand::Quit) => return Ok(()),
                    Some(cmd) => controller.apply(cmd),
                    None => {}
                }
            }
        }
    }
}

fn render(frame: &mut Frame, status: &TransportStatus, tracks: &TrackSet, flash: bool) {
    let layout = Layout::vertical([
        Constraint::Length(3),                     // header
        Constraint::Min(tracks.len() as u16 + 2),  // track table
        Constraint::Length(3),                     // position
        Constraint::Length(3),                     // help
    ])
    .split(frame.area());

    let header = Paragraph::new(format!(
        "{}   CPU: {:>5.1}%",
        status_label(status, flash),
        status.cpu_load * 100.0
    ))
    .block(Block::default().borders(Borders::ALL).title("reel-player"));
    frame.render_widget(header, layout[0]);

    let rows: Vec<Row> = tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let marker = if status.selection == Some(i) { ">" } else { " " };
            Row::new([
                marker.to_string(),
                format!("{i}"),
                track.title().to_string(),
                mmss(track.duration_secs()),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Min(20),
            Constraint::Length(6),
        ],
    )
    .header(Row::new(["", "#", "Track", "Len"]).style(Style::default().bold()))
    .block(Block::default().borders(Borders::ALL).title("Tracks"));
    frame.render_widget(table, layout[1]);

    let position = Paragraph::new(format!(
        "{}/{}",
        mmss(status.position_secs()),
        mmss(status.duration_secs())
    ))
    .block(Block::default().borders(Borders::ALL).title("Position"));
    frame.render_widget(position, layout[2]);

    let help = Paragraph::new(
        "[Space] Play/Pause  [S] Stop  [A] Rew  [D] Ffwd  [,/.] Skip 1s  [L] Loop  [0-7] Track  [Q] Quit",
    )
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, layout[3]);
}

fn status_label(status: &TransportStatus, flash: bool) -> String {
    let base = if flash {
        "STOPPED"
    } else if status.selection.is_none() {
        "NO TRACK"
    } else if !status.playing {
        "PAUSED"
    } else {
        match status.direction {
            Direction::Forward => "PLAYING",
            Direction::Rewind => "REW",
            Direction::FastForward => "FFWD",
        }
    };
    if status.looping {
        format!("{base} [LOOP]")
    } else {
        base.to_string()
    }
}

fn mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bindings_map_to_commands() {
        assert_eq!(
            command_for(KeyCode::Char(' ')),
            Some(TransportCommand::TogglePlayPause)
        );
        assert_eq!(command_for(KeyCode::Char('s')), Some(TransportCommand::Stop));
        assert_eq!(
            command_for(KeyCode::Char(',')),
            Some(TransportCommand::JumpBack)
        );
        assert_eq!(
            command_for(KeyCode::Char('3')),
            Some(TransportCommand::Select(3))
        );
        assert_eq!(command_for(KeyCode::Esc), Some(TransportCommand::Quit));
        assert_eq!(command_for(KeyCode::Up), None);
    }

    #[test]
    fn mmss_formats_minutes_and_seconds() {
        assert_eq!(mmss(0), "00:00");
        assert_eq!(mmss(61), "01:01");
        assert_eq!(mmss(600), "10:00");
    }
}
