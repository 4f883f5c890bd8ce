//! Error types shared by the library scanner and the playback controller.

use std::path::PathBuf;

use thiserror::Error;

/// A single directory (or entry) that could not be read during a scan.
///
/// These never abort a scan: the offending subtree simply contributes no
/// files and the error is logged.
#[derive(Error, Debug)]
#[error("cannot read {}: {source}", .path.display())]
pub struct ScanDirectoryError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Failures reported by an audio output backend.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("cannot open file: {0}")]
    Open(#[from] std::io::Error),

    #[error("cannot decode audio: {0}")]
    Decode(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("seek not supported: {0}")]
    Seek(String),
}

/// Playback failures as seen by the caller of the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("could not load {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    #[error("playback of {} stopped: {reason}", .path.display())]
    Playback { path: PathBuf, reason: String },

    #[error("seek to {target:.1}s rejected: {reason}")]
    Seek { target: f64, reason: String },
}

impl PlaybackError {
    pub fn load(path: impl Into<PathBuf>, err: &OutputError) -> Self {
        Self::Load {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
