use std::time::{Duration, Instant};

use tracing::{trace, warn};

/// Deadline-based periodic timer driving position polls.
///
/// The audio thread waits on its command queue for at most `remaining()`;
/// when that elapses it calls `fire()`. A stopped timer has no deadline, so
/// the thread blocks until the next command.
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    next_due: Option<Instant>,
    starts: u64,
    stops: u64,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
            starts: 0,
            stops: 0,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            warn!("poll timer start requested while already running");
            return;
        }
        trace!("poll timer started");
        self.next_due = Some(now + self.interval);
        self.starts += 1;
    }

    pub fn stop(&mut self) {
        if self.next_due.take().is_some() {
            trace!("poll timer stopped");
            self.stops += 1;
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Time left until the next tick; `None` while stopped.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Returns true when a tick is due and schedules the next one.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                // Skip missed ticks instead of bursting to catch up.
                let next = due + self.interval;
                self.next_due = Some(if next > now { next } else { now + self.interval });
                true
            }
            _ => false,
        }
    }

    pub fn starts(&self) -> u64 {
        self.starts
    }

    pub fn stops(&self) -> u64 {
        self.stops
    }
}
