use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::AudioPlayer;

mod event_loop;
mod settings;
mod startup;


pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, settings_problem) = settings::load_settings();

    // Keep the guard alive until exit so buffered log lines are flushed.
    let _log_guard = match startup::init_logging(&settings.log) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("quaver: file logging disabled: {e}");
            None
        }
    };
    if let Some(problem) = settings_problem {
        warn!("{problem}");
    }
    info!(roots = ?settings.library.roots, "starting");

    let audio_player = AudioPlayer::new(&settings.playback);
    let mut app = App::new();
    app.set_playback_handle(audio_player.playback_handle());

    let (scan_tx, scan_rx) = mpsc::channel::<event_loop::ScanResult>();
    event_loop::request_scan(&mut app, &settings.library, &scan_tx);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::new();

        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &audio_player,
            &scan_tx,
            &scan_rx,
            &mut state,
        )
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Stops playback and releases the output even when the loop failed.
    audio_player.quit();
    info!("bye");

    run_result
}
