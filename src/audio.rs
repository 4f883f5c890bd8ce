//! Playback: a single-track controller running on its own thread.
//!
//! The UI talks to it through [`AudioPlayer`] and reads the published
//! [`PlaybackInfo`] snapshot. Output devices sit behind the `OutputBackend`
//! and `OutputHandle` traits.

mod controller;
mod output;
mod player;
mod sink;
mod thread;
mod timer;
mod types;

pub use player::AudioPlayer;
pub use types::{AudioCmd, PlaybackHandle, PlaybackInfo, Status};

#[cfg(test)]
mod tests;
