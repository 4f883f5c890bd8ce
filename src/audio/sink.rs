//! `rodio`-backed output handles.
//!
//! Each handle wraps a paused `Sink` connected to the default output
//! stream's mixer. Duration comes from the decoder when it knows it and from
//! the container's properties (via `lofty`) otherwise.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::AudioFile;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};
use tracing::debug;

use crate::error::OutputError;

use super::output::{Finish, OutputBackend, OutputHandle};

pub struct RodioBackend {
    mixer: Mixer,
}

impl RodioBackend {
    pub fn new(mixer: Mixer) -> Self {
        Self { mixer }
    }
}

impl OutputBackend for RodioBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn OutputHandle>, OutputError> {
        let file = File::open(path)?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| OutputError::Decode(e.to_string()))?;
        let duration = source.total_duration().or_else(|| probe_duration(path));

        let sink = Sink::connect_new(&self.mixer);
        sink.append(source);
        sink.pause();
        debug!(path = %path.display(), ?duration, "sink ready");

        Ok(Box::new(RodioHandle {
            sink,
            duration,
            path: path.to_path_buf(),
        }))
    }
}

fn probe_duration(path: &Path) -> Option<Duration> {
    lofty::read_from_path(path)
        .ok()
        .map(|tagged| tagged.properties().duration())
        .filter(|d| !d.is_zero())
}

pub struct RodioHandle {
    sink: Sink,
    duration: Option<Duration>,
    path: PathBuf,
}

impl OutputHandle for RodioHandle {
    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, seconds: f64) -> Result<Duration, OutputError> {
        let mut target = Duration::try_from_secs_f64(seconds.max(0.0))
            .map_err(|e| OutputError::Seek(e.to_string()))?;
        if let Some(total) = self.duration {
            target = target.min(total);
        }
        self.sink
            .try_seek(target)
            .map_err(|e| OutputError::Seek(e.to_string()))?;
        Ok(target)
    }

    fn position(&self) -> Duration {
        self.sink.get_pos()
    }

    fn finished(&self) -> Option<Finish> {
        self.sink.empty().then_some(Finish::Completed)
    }

    fn release(&mut self) {
        self.sink.stop();
        debug!(path = %self.path.display(), "sink stopped");
    }
}
