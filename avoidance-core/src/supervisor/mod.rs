//! Global enable/disable state driven by the debounced toggle button.

use core::fmt;
use core::time::Duration;

use crate::clock::ControlInstant;
use crate::config::SupervisorConfig;

pub mod debounce;

pub use debounce::{ToggleDebouncer, ToggleSample};

/// Whether the control pipeline runs.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum SupervisorState {
    #[default]
    Disabled,
    Enabled,
}

impl SupervisorState {
    pub const fn is_enabled(self) -> bool {
        matches!(self, SupervisorState::Enabled)
    }

    /// Banner shown when the system enters this state.
    pub const fn banner(self) -> &'static str {
        match self {
            SupervisorState::Enabled => "System: ON",
            SupervisorState::Disabled => "System: OFF",
        }
    }

    const fn toggled(self) -> Self {
        match self {
            SupervisorState::Enabled => SupervisorState::Disabled,
            SupervisorState::Disabled => SupervisorState::Enabled,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupervisorState::Enabled => "enabled",
            SupervisorState::Disabled => "disabled",
        })
    }
}

/// What a toggle poll changed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ToggleOutcome {
    Unchanged,
    Enabled,
    Disabled,
    Bounced { since_last_edge: Option<Duration> },
}

/// Owns the enable flag and the previous-cycle obstacle flag.
///
/// Both reset together when the system is disabled; the motor side of the
/// reset is carried out by the caller through the arbiter.
#[derive(Copy, Clone, Debug)]
pub struct SystemSupervisor<I> {
    state: SupervisorState,
    debouncer: ToggleDebouncer<I>,
    previous_obstacle: bool,
}

impl<I: ControlInstant> SystemSupervisor<I> {
    pub const fn new(config: SupervisorConfig) -> Self {
        Self {
            state: SupervisorState::Disabled,
            debouncer: ToggleDebouncer::new(config.debounce_settle),
            previous_obstacle: false,
        }
    }

    /// Feeds one button sample and flips the state on an accepted press.
    pub fn poll_toggle(&mut self, pressed: bool, now: I) -> ToggleOutcome {
        match self.debouncer.sample(pressed, now) {
            ToggleSample::Idle => ToggleOutcome::Unchanged,
            ToggleSample::Bounce { since_last_edge } => ToggleOutcome::Bounced { since_last_edge },
            ToggleSample::Edge => {
                self.state = self.state.toggled();
                if self.state.is_enabled() {
                    ToggleOutcome::Enabled
                } else {
                    self.reset();
                    ToggleOutcome::Disabled
                }
            }
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// Blocked flag recorded at the end of the previous enabled cycle.
    pub fn previous_obstacle(&self) -> bool {
        self.previous_obstacle
    }

    pub fn record_obstacle(&mut self, blocked: bool) {
        self.previous_obstacle = blocked;
    }

    /// Clears the per-run flags. Called on every transition to disabled.
    pub fn reset(&mut self) {
        self.previous_obstacle = false;
    }
}

impl<I: ControlInstant> Default for SystemSupervisor<I> {
    fn default() -> Self {
        Self::new(SupervisorConfig::default())
    }
}
