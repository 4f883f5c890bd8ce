use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::debug;

use crate::config::PlaybackSettings;

use super::thread::spawn_audio_thread;
use super::types::{AudioCmd, Msg, PlaybackHandle, PlaybackInfo};

/// Front-end handle to the audio thread.
pub struct AudioPlayer {
    tx: Sender<Msg>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    pub fn new(settings: &PlaybackSettings) -> Self {
        let (tx, rx) = mpsc::channel::<Msg>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let audio_handle =
            spawn_audio_thread(rx, tx.clone(), playback_info.clone(), settings.clone());

        Self {
            tx,
            playback: playback_info,
            join: Mutex::new(Some(audio_handle)),
        }
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    /// Queue a command. Fails only once the audio thread has exited.
    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioCmd>> {
        self.tx.send(Msg::Cmd(cmd)).map_err(|e| match e.0 {
            Msg::Cmd(cmd) => mpsc::SendError(cmd),
            Msg::Loaded { .. } => mpsc::SendError(AudioCmd::Quit),
        })
    }

    /// Stop playback, release the output and wait for the audio thread.
    pub fn quit(&self) {
        let _ = self.send(AudioCmd::Quit);

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
                debug!("audio thread joined");
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
impl AudioPlayer {
    /// Run the audio loop on `backend` instead of the default device.
    pub(super) fn with_backend(
        backend: Arc<dyn super::output::OutputBackend>,
        settings: &PlaybackSettings,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Msg>();
        let playback: PlaybackHandle = Arc::default();
        let controller = super::controller::Controller::new(settings);
        let join = {
            let tx = tx.clone();
            let info = playback.clone();
            std::thread::spawn(move || {
                super::thread::run_event_loop(controller, backend, rx, tx, info)
            })
        };
        Self {
            tx,
            playback,
            join: Mutex::new(Some(join)),
        }
    }
}
