//! Single-track playback state machine.
//!
//! The controller owns at most one output handle (inside an [`ActiveTrack`])
//! and the poll timer. Every transition runs on the audio thread; handle
//! acquisition happens elsewhere and is reported back via
//! [`Controller::finish_load`].

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::PlaybackSettings;
use crate::error::{OutputError, PlaybackError};
use crate::library::AudioFileRef;

use super::output::{Finish, OutputHandle};
use super::timer::PollTimer;
use super::types::{PlaybackInfo, Status};

/// A load the caller must perform off-thread and report back with the same
/// ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: u64,
    pub path: PathBuf,
}

struct PendingLoad {
    ticket: u64,
    file: AudioFileRef,
}

/// The current track together with its output handle. Dropping it releases
/// the handle, so every way out of "a track is active" goes through here.
struct ActiveTrack {
    file: AudioFileRef,
    handle: Box<dyn OutputHandle>,
    playing: bool,
}

impl Drop for ActiveTrack {
    fn drop(&mut self) {
        self.handle.release();
        debug!(path = %self.file.path.display(), "output handle released");
    }
}

pub struct Controller {
    active: Option<ActiveTrack>,
    pending: Option<PendingLoad>,
    next_ticket: u64,
    current_time: f64,
    total_duration: f64,
    end_tolerance: f64,
    timer: PollTimer,
    notice: Option<PlaybackError>,
}

impl Controller {
    pub fn new(settings: &PlaybackSettings) -> Self {
        Self {
            active: None,
            pending: None,
            next_ticket: 0,
            current_time: 0.0,
            total_duration: 0.0,
            end_tolerance: Duration::from_millis(settings.end_tolerance_ms()).as_secs_f64(),
            timer: PollTimer::new(Duration::from_millis(settings.poll_interval_ms)),
            notice: None,
        }
    }

    pub fn status(&self) -> Status {
        match (&self.active, &self.pending) {
            (Some(a), _) if a.playing => Status::Playing,
            (Some(_), _) => Status::Paused,
            (None, Some(_)) => Status::Loading,
            (None, None) => Status::Idle,
        }
    }

    pub fn current(&self) -> Option<&AudioFileRef> {
        self.active.as_ref().map(|a| &a.file)
    }

    pub fn snapshot(&self) -> PlaybackInfo {
        PlaybackInfo {
            status: self.status(),
            current: self.current().cloned(),
            loading: self.pending.as_ref().map(|p| p.file.clone()),
            current_time: self.current_time,
            total_duration: self.total_duration,
            notice: self.notice.clone(),
        }
    }

    /// Play `file`, or toggle pause if it is already the current track.
    ///
    /// Returns a [`LoadRequest`] when a new handle has to be acquired.
    pub fn play_or_toggle(&mut self, file: &AudioFileRef) -> Option<LoadRequest> {
        if let Some(active) = self.active.as_mut().filter(|a| &a.file == file) {
            if active.playing {
                active.handle.pause();
                active.playing = false;
                self.timer.stop();
                debug!(path = %file.path.display(), at = self.current_time, "paused");
            } else {
                active.handle.play();
                active.playing = true;
                self.timer.start(Instant::now());
                debug!(path = %file.path.display(), at = self.current_time, "resumed");
            }
            return None;
        }

        self.stop();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending = Some(PendingLoad {
            ticket,
            file: file.clone(),
        });
        debug!(ticket, path = %file.path.display(), "loading");
        Some(LoadRequest {
            ticket,
            path: file.path.clone(),
        })
    }

    /// Deliver the outcome of a [`LoadRequest`].
    ///
    /// Results for a ticket that is no longer pending (the user moved on or
    /// stopped) are released straight away.
    pub fn finish_load(
        &mut self,
        ticket: u64,
        result: Result<Box<dyn OutputHandle>, OutputError>,
    ) {
        let pending = match self.pending.take() {
            Some(p) if p.ticket == ticket => p,
            other => {
                self.pending = other;
                if let Ok(mut stale) = result {
                    stale.release();
                }
                debug!(ticket, "dropping stale load result");
                return;
            }
        };

        match result {
            Ok(mut handle) => {
                self.total_duration = handle.duration().map_or(0.0, |d| d.as_secs_f64());
                self.current_time = 0.0;
                handle.play();
                info!(
                    path = %pending.file.path.display(),
                    duration = self.total_duration,
                    "now playing"
                );
                self.active = Some(ActiveTrack {
                    file: pending.file,
                    handle,
                    playing: true,
                });
                self.timer.start(Instant::now());
            }
            Err(e) => {
                warn!(path = %pending.file.path.display(), error = %e, "load failed");
                self.notice = Some(PlaybackError::load(&pending.file.path, &e));
                self.stop();
            }
        }
    }

    /// Seek the current track. The position only changes once the handle
    /// acknowledges the request.
    pub fn seek(&mut self, seconds: f64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match active.handle.seek(seconds) {
            Ok(reached) => {
                self.current_time = reached.as_secs_f64();
                debug!(target = seconds, reached = self.current_time, "seeked");
            }
            Err(e) => {
                warn!(target = seconds, error = %e, "seek rejected");
                self.notice = Some(PlaybackError::Seek {
                    target: seconds,
                    reason: e.to_string(),
                });
            }
        }
    }

    pub fn seek_by(&mut self, delta: f64) {
        if self.active.is_some() {
            self.seek(self.current_time + delta);
        }
    }

    /// Return to idle: stop polling, release any handle, forget any pending
    /// load and reset the position. Safe to call at any time.
    pub fn stop(&mut self) {
        self.timer.stop();
        if let Some(p) = self.pending.take() {
            debug!(ticket = p.ticket, "pending load abandoned");
        }
        if self.active.take().is_some() {
            debug!("stopped");
        }
        self.current_time = 0.0;
        self.total_duration = 0.0;
    }

    /// One poll: refresh the position and detect the end of the track.
    pub fn tick(&mut self) {
        let Some(active) = self.active.as_ref().filter(|a| a.playing) else {
            return;
        };

        match active.handle.finished() {
            Some(Finish::Failed(reason)) => {
                let path = active.file.path.clone();
                warn!(path = %path.display(), %reason, "playback failed");
                self.notice = Some(PlaybackError::Playback { path, reason });
                self.stop();
                return;
            }
            Some(Finish::Completed) => {
                debug!(path = %active.file.path.display(), "output reported completion");
                self.stop();
                return;
            }
            None => {}
        }

        let position = active.handle.position().as_secs_f64();
        self.current_time = position;
        if self.total_duration > 0.0 && position >= self.total_duration - self.end_tolerance {
            debug!(position, duration = self.total_duration, "end of track");
            self.stop();
        }
    }

    /// How long the audio thread may block before the next poll is due.
    pub fn poll_timeout(&self, now: Instant) -> Option<Duration> {
        self.timer.remaining(now)
    }

    /// Called when the wait returned by [`poll_timeout`](Self::poll_timeout) elapsed.
    pub fn on_timer(&mut self, now: Instant) {
        if self.timer.fire(now) {
            self.tick();
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn shutdown(&mut self) {
        self.stop();
        info!(
            timer_starts = self.timer.starts(),
            timer_stops = self.timer.stops(),
            "playback controller shut down"
        );
    }
}

#[cfg(test)]
impl Controller {
    pub fn is_playing(&self) -> bool {
        self.status() == Status::Playing
    }

    pub fn has_handle(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn timer(&self) -> &PollTimer {
        &self.timer
    }
}
