//! Press-edge detection for the enable button.

use core::time::Duration;

use crate::clock::{ControlInstant, deadline_reached};

/// Result of feeding one button sample to the debouncer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ToggleSample {
    /// No press edge this sample.
    Idle,
    /// Accepted press edge; the settle window is now open.
    Edge,
    /// Press edge that arrived inside the settle window and was dropped.
    Bounce { since_last_edge: Option<Duration> },
}

/// Accepts a press only after a released sample, then ignores further edges
/// until the settle window has elapsed. The level is tracked on every sample,
/// settle window or not.
#[derive(Copy, Clone, Debug)]
pub struct ToggleDebouncer<I> {
    settle: Duration,
    last_pressed: bool,
    settle_until: Option<I>,
    last_edge_at: Option<I>,
}

impl<I: ControlInstant> ToggleDebouncer<I> {
    /// Starts as if the button were held, so a press held through power-up
    /// does not count until it is released once.
    pub const fn new(settle: Duration) -> Self {
        Self {
            settle,
            last_pressed: true,
            settle_until: None,
            last_edge_at: None,
        }
    }

    pub fn sample(&mut self, pressed: bool, now: I) -> ToggleSample {
        let edge = pressed && !self.last_pressed;
        self.last_pressed = pressed;
        if !edge {
            return ToggleSample::Idle;
        }

        if !deadline_reached(self.settle_until, now) {
            let since_last_edge = self
                .last_edge_at
                .map(|at| now.saturating_duration_since(at));
            return ToggleSample::Bounce { since_last_edge };
        }

        self.settle_until = Some(now + self.settle);
        self.last_edge_at = Some(now);
        ToggleSample::Edge
    }

    /// Returns `true` while edges are being ignored.
    pub fn is_settling(&self, now: I) -> bool {
        !deadline_reached(self.settle_until, now)
    }

    pub fn last_level(&self) -> bool {
        self.last_pressed
    }
}
