//! The capability set the controller needs from an audio output device.

use std::path::Path;
use std::time::Duration;

use crate::error::OutputError;

/// How a handle's playback came to an end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    Completed,
    Failed(String),
}

/// One loaded, playable sound. Owned exclusively by the controller.
pub trait OutputHandle: Send {
    /// Total length, if the decoder or container reports one.
    fn duration(&self) -> Option<Duration>;

    fn play(&mut self);

    fn pause(&mut self);

    /// Reposition to `seconds`. Range handling is up to the implementation;
    /// returns the position actually reached.
    fn seek(&mut self, seconds: f64) -> Result<Duration, OutputError>;

    fn position(&self) -> Duration;

    /// `Some` once playback has ended on its own.
    fn finished(&self) -> Option<Finish>;

    /// Stop output and free the device resources. Called exactly once.
    fn release(&mut self);
}

/// Creates output handles. Shared with loader threads.
pub trait OutputBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn OutputHandle>, OutputError>;
}

/// Backend used when no audio device could be opened: every load fails.
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl OutputBackend for UnavailableBackend {
    fn open(&self, _path: &Path) -> Result<Box<dyn OutputHandle>, OutputError> {
        Err(OutputError::Device(self.reason.clone()))
    }
}
