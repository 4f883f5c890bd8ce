//! Audio-related small types and handles.
//!
//! This module defines the commands accepted by the audio thread and the
//! playback snapshot it publishes for the UI.

use std::sync::{Arc, Mutex};

use crate::error::{OutputError, PlaybackError};
use crate::library::AudioFileRef;

use super::output::OutputHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCmd {
    /// Play `file`, or pause/resume it if it is already the current track.
    PlayOrToggle(AudioFileRef),
    /// Seek the current track to an absolute position in seconds.
    Seek(f64),
    /// Seek relative to the current position (seconds, positive or negative).
    SeekBy(f64),
    /// Stop playback and release the current track.
    Stop,
    /// Clear the last reported error.
    DismissNotice,
    /// Stop playback and end the audio thread.
    Quit,
}

/// Messages consumed by the audio thread: user intents plus completions of
/// background work, all serialized onto one queue.
pub(super) enum Msg {
    Cmd(AudioCmd),
    Loaded {
        ticket: u64,
        result: Result<Box<dyn OutputHandle>, OutputError>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// An output handle was requested and has not been confirmed yet.
    Loading,
    Playing,
    Paused,
}

/// Runtime playback information shared with the UI.
#[derive(Debug, Clone, Default)]
pub struct PlaybackInfo {
    pub status: Status,
    /// The track that owns the output handle, if any.
    pub current: Option<AudioFileRef>,
    /// The track being loaded while `status == Loading`.
    pub loading: Option<AudioFileRef>,
    pub current_time: f64,
    /// Zero until the output handle reports a duration.
    pub total_duration: f64,
    /// Last load/playback/seek failure, until dismissed or replaced.
    pub notice: Option<PlaybackError>,
}

impl PlaybackInfo {
    pub fn is_playing(&self) -> bool {
        self.status == Status::Playing
    }

    /// Fraction of the track played so far, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.total_duration > 0.0 {
            (self.current_time / self.total_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
