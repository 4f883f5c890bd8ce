use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use rodio::OutputStreamBuilder;
use tracing::{debug, error, warn};

use crate::config::PlaybackSettings;

use super::controller::{Controller, LoadRequest};
use super::output::{OutputBackend, UnavailableBackend};
use super::sink::RodioBackend;
use super::types::{AudioCmd, Msg, PlaybackHandle};

/// Spawn the audio thread on the default output device.
///
/// If no device can be opened the thread still runs; every load then fails
/// with a device error that the UI shows as a notice.
pub(super) fn spawn_audio_thread(
    rx: Receiver<Msg>,
    tx: Sender<Msg>,
    playback_info: PlaybackHandle,
    settings: PlaybackSettings,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when OutputStream is dropped; the TUI owns stderr.
                stream.log_on_drop(false);
                Some(stream)
            }
            Err(e) => {
                error!(error = %e, "no audio output device");
                None
            }
        };

        let backend: Arc<dyn OutputBackend> = match &stream {
            Some(s) => Arc::new(RodioBackend::new(s.mixer().clone())),
            None => Arc::new(UnavailableBackend::new("no audio output device")),
        };

        run_event_loop(Controller::new(&settings), backend, rx, tx, playback_info);
    })
}

/// Serve commands until `Quit` (or until every sender is gone).
///
/// All controller transitions happen here, one message at a time. The wait
/// on the queue is bounded by the poll timer while a track is playing and
/// unbounded otherwise.
pub(super) fn run_event_loop(
    mut controller: Controller,
    backend: Arc<dyn OutputBackend>,
    rx: Receiver<Msg>,
    tx: Sender<Msg>,
    playback_info: PlaybackHandle,
) {
    loop {
        let msg = match controller.poll_timeout(Instant::now()) {
            Some(wait) => match rx.recv_timeout(wait) {
                Ok(msg) => Some(msg),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(msg) => Some(msg),
                Err(_) => break,
            },
        };

        if !dispatch(&mut controller, &backend, &tx, msg, Instant::now()) {
            break;
        }
        publish(&controller, &playback_info);
    }

    controller.shutdown();
    publish(&controller, &playback_info);
    debug!("audio thread exiting");
}

/// Apply one queue item (or a timeout, `None`) to the controller. Returns
/// false on `Quit`.
///
/// A busy queue never times out, so the timer is checked after every item.
pub(super) fn dispatch(
    controller: &mut Controller,
    backend: &Arc<dyn OutputBackend>,
    tx: &Sender<Msg>,
    msg: Option<Msg>,
    now: Instant,
) -> bool {
    match msg {
        None => {}
        Some(Msg::Loaded { ticket, result }) => controller.finish_load(ticket, result),
        Some(Msg::Cmd(cmd)) => match cmd {
            AudioCmd::PlayOrToggle(file) => {
                if let Some(request) = controller.play_or_toggle(&file) {
                    spawn_loader(backend.clone(), request, tx.clone());
                }
            }
            AudioCmd::Seek(seconds) => controller.seek(seconds),
            AudioCmd::SeekBy(delta) => controller.seek_by(delta),
            AudioCmd::Stop => controller.stop(),
            AudioCmd::DismissNotice => controller.dismiss_notice(),
            AudioCmd::Quit => return false,
        },
    }
    controller.on_timer(now);
    true
}

fn publish(controller: &Controller, playback_info: &PlaybackHandle) {
    if let Ok(mut info) = playback_info.lock() {
        *info = controller.snapshot();
    }
}

/// Acquire a handle off the audio thread and post the result back onto its
/// queue.
fn spawn_loader(backend: Arc<dyn OutputBackend>, request: LoadRequest, tx: Sender<Msg>) {
    let spawned = thread::Builder::new()
        .name(format!("quaver-load-{}", request.ticket))
        .spawn(move || {
            let result = backend.open(&request.path);
            if tx
                .send(Msg::Loaded {
                    ticket: request.ticket,
                    result,
                })
                .is_err()
            {
                debug!(ticket = request.ticket, "audio thread gone before load finished");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not spawn loader thread");
    }
}
