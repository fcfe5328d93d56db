//! When to ask the receiver for its status
//!
//! Two cadences share one deadline: a slow resync while something plays,
//! and a burst of quick checks after an action so the screen catches up
//! with the receiver. The app calls [`StatusSchedule::take_due`] from its
//! tick; nothing here touches the clock on its own.

use std::time::{Duration, Instant};

use crate::models::{PlaybackStatus, PlayerState};

/// Gap between quick checks after an action
pub const FAST_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Quick checks before giving up on confirmation
pub const FAST_POLL_ATTEMPTS: u8 = 5;

#[derive(Debug, Clone)]
pub struct StatusSchedule {
    /// Slow resync interval; `None` disables it
    interval: Option<Duration>,
    due: Option<Instant>,
    fast_left: u8,
}

impl StatusSchedule {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            due: None,
            fast_left: 0,
        }
    }

    /// Next deadline, if any check is scheduled
    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    /// True while quick post-action checks remain
    pub fn is_fast_polling(&self) -> bool {
        self.fast_left > 0
    }

    /// One check as soon as possible (device selected)
    pub fn check_now(&mut self, now: Instant) {
        self.fast_left = 0;
        self.due = Some(now);
    }

    /// Quick checks after a cast or control, starting right away
    pub fn after_action(&mut self, now: Instant) {
        self.fast_left = FAST_POLL_ATTEMPTS;
        self.due = Some(now);
    }

    /// Nothing left to watch (stopped)
    pub fn clear(&mut self) {
        self.fast_left = 0;
        self.due = None;
    }

    /// Consume the deadline if it has passed and book the next one
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {}
            _ => return false,
        }
        self.fast_left = self.fast_left.saturating_sub(1);
        self.due = if self.fast_left > 0 {
            Some(now + FAST_POLL_INTERVAL)
        } else {
            self.interval.map(|i| now + i)
        };
        true
    }

    /// Adjust the cadence to what the receiver reported
    pub fn on_status(&mut self, now: Instant, status: &PlaybackStatus) {
        let live = status.has_media()
            || matches!(
                status.state,
                PlayerState::Playing | PlayerState::Paused | PlayerState::Buffering
            );

        if live {
            // confirmed; back to the slow cadence
            self.fast_left = 0;
            self.due = self.interval.map(|i| now + i);
        } else if self.fast_left == 0 {
            self.due = None;
        }
    }
}
