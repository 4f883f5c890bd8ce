use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{debug, info, warn};

use crate::app::{App, Direction, View};
use crate::audio::{AudioCmd, AudioPlayer, PlaybackInfo};
use crate::config;
use crate::library::{self, AudioFileRef, FolderGrouping, ScanSummary};
use crate::ui;

pub type ScanResult = (FolderGrouping, ScanSummary);

/// What a key press asks the runtime to do.
#[derive(Debug, PartialEq)]
pub enum KeyOutcome {
    Nothing,
    Audio(AudioCmd),
    Rescan,
    Quit,
}

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Track the cursor last followed, so a user-moved cursor is left alone
    /// until playback moves on.
    last_followed: Option<AudioFileRef>,
}

impl EventLoopState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Start a scan on a background thread unless one is already running.
pub fn request_scan(
    app: &mut App,
    settings: &config::LibrarySettings,
    scan_tx: &mpsc::Sender<ScanResult>,
) {
    if !app.begin_scan() {
        debug!("scan already in flight");
        return;
    }
    let settings = settings.clone();
    let tx = scan_tx.clone();
    let spawned = thread::Builder::new()
        .name("quaver-scan".to_string())
        .spawn(move || {
            let _ = tx.send(library::discover(&settings));
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not spawn scan thread");
        app.scanning = false;
    }
}

/// Main terminal event loop: handles input, UI drawing, scan results and
/// playback snapshots. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    scan_tx: &mpsc::Sender<ScanResult>,
    scan_rx: &mpsc::Receiver<ScanResult>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        while let Ok((grouping, summary)) = scan_rx.try_recv() {
            info!(
                folders = grouping.len(),
                tracks = grouping.track_count(),
                "library updated"
            );
            app.set_library(grouping, summary);
        }

        let info = app.playback();
        follow_playback(app, &info, state);

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key_event(key, settings, app, &info, state) {
                    KeyOutcome::Nothing => {}
                    KeyOutcome::Audio(cmd) => {
                        if let Err(e) = audio_player.send(cmd) {
                            warn!(cmd = ?e.0, "audio thread is gone");
                        }
                    }
                    KeyOutcome::Rescan => request_scan(app, &settings.library, scan_tx),
                    KeyOutcome::Quit => break,
                }
            }
        }
    }

    Ok(())
}

/// Keep the track cursor on the playing track when it changes.
pub(crate) fn follow_playback(app: &mut App, info: &PlaybackInfo, state: &mut EventLoopState) {
    let playing = info.current.as_ref().or(info.loading.as_ref());
    if playing != state.last_followed.as_ref() {
        if let Some(file) = playing {
            app.follow(file);
        }
        state.last_followed = playing.cloned();
    }
}

pub(crate) fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    info: &PlaybackInfo,
    state: &mut EventLoopState,
) -> KeyOutcome {
    let was_gg = std::mem::take(&mut state.pending_gg);
    let playing = info.current.as_ref().or(info.loading.as_ref());

    match key.code {
        KeyCode::Char('q') => KeyOutcome::Quit,
        KeyCode::Char('j') | KeyCode::Down => {
            app.next();
            KeyOutcome::Nothing
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.prev();
            KeyOutcome::Nothing
        }
        KeyCode::Char('g') => {
            if was_gg {
                app.select_first();
            } else {
                state.pending_gg = true;
            }
            KeyOutcome::Nothing
        }
        KeyCode::Char('G') => {
            app.select_last();
            KeyOutcome::Nothing
        }
        KeyCode::Enter => match app.view {
            View::Folders => {
                app.open_selected_folder();
                KeyOutcome::Nothing
            }
            View::Tracks => match app.selected_track() {
                Some(track) => KeyOutcome::Audio(AudioCmd::PlayOrToggle(track.clone())),
                None => KeyOutcome::Nothing,
            },
        },
        KeyCode::Esc => {
            if info.notice.is_some() {
                KeyOutcome::Audio(AudioCmd::DismissNotice)
            } else {
                app.back();
                KeyOutcome::Nothing
            }
        }
        KeyCode::Char('h') | KeyCode::Left => {
            app.back();
            KeyOutcome::Nothing
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            match info.current.as_ref().or_else(|| app.selected_track()) {
                Some(track) => KeyOutcome::Audio(AudioCmd::PlayOrToggle(track.clone())),
                None => KeyOutcome::Nothing,
            }
        }
        KeyCode::Char('n') => match app.adjacent_track(playing, Direction::Next) {
            Some(track) => KeyOutcome::Audio(AudioCmd::PlayOrToggle(track)),
            None => KeyOutcome::Nothing,
        },
        KeyCode::Char('N') => match app.adjacent_track(playing, Direction::Previous) {
            Some(track) => KeyOutcome::Audio(AudioCmd::PlayOrToggle(track)),
            None => KeyOutcome::Nothing,
        },
        KeyCode::Char('L') => {
            KeyOutcome::Audio(AudioCmd::SeekBy(settings.controls.seek_step_seconds as f64))
        }
        KeyCode::Char('H') => {
            KeyOutcome::Audio(AudioCmd::SeekBy(-(settings.controls.seek_step_seconds as f64)))
        }
        KeyCode::Char(c @ '0'..='9') => match c.to_digit(10) {
            // Digits jump to tenths of the track; needs a known duration.
            Some(d) if info.total_duration > 0.0 => {
                KeyOutcome::Audio(AudioCmd::Seek(info.total_duration * d as f64 / 10.0))
            }
            _ => KeyOutcome::Nothing,
        },
        KeyCode::Char('s') => KeyOutcome::Audio(AudioCmd::Stop),
        KeyCode::Char('r') => KeyOutcome::Rescan,
        _ => KeyOutcome::Nothing,
    }
}
