//! Obstacle classification over a single cycle's readings.
//!
//! The classifier is a pure function of the snapshot: the front channel is
//! checked first and wins over the side channels, so a vehicle boxed in on
//! every side still brakes rather than swerving.

use core::fmt;

use crate::config::ClassifierConfig;
use crate::ranging::{ChannelId, Reading};

/// Blockage classification for one cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ObstacleState {
    Clear,
    FrontBlocked,
    SideBlocked,
}

impl ObstacleState {
    /// Collapses the classification to a blocked/clear flag.
    pub const fn is_blocked(self) -> bool {
        !matches!(self, ObstacleState::Clear)
    }
}

impl fmt::Display for ObstacleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObstacleState::Clear => "clear",
            ObstacleState::FrontBlocked => "front-blocked",
            ObstacleState::SideBlocked => "side-blocked",
        })
    }
}

/// Readings taken once per cycle and shared by every downstream decision.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ReadingSet {
    pub front: Reading,
    pub left: Reading,
    pub right: Reading,
}

impl ReadingSet {
    pub const fn new(front: Reading, left: Reading, right: Reading) -> Self {
        Self { front, left, right }
    }

    /// Snapshot with every channel at the supplied distance.
    pub const fn uniform(centimeters: f32) -> Self {
        Self {
            front: Reading::new(ChannelId::Front, centimeters),
            left: Reading::new(ChannelId::Left, centimeters),
            right: Reading::new(ChannelId::Right, centimeters),
        }
    }

    /// Returns the reading for `channel`.
    pub const fn get(&self, channel: ChannelId) -> &Reading {
        match channel {
            ChannelId::Front => &self.front,
            ChannelId::Left => &self.left,
            ChannelId::Right => &self.right,
        }
    }

    /// Iterates the readings in channel order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        [&self.front, &self.left, &self.right].into_iter()
    }
}

/// Threshold classifier with front-first priority.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ObstacleClassifier {
    config: ClassifierConfig,
}

impl ObstacleClassifier {
    pub const fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub const fn threshold_cm(&self) -> f32 {
        self.config.threshold_cm
    }

    pub fn classify(&self, front: &Reading, left: &Reading, right: &Reading) -> ObstacleState {
        let threshold = self.config.threshold_cm;
        if front.centimeters < threshold {
            ObstacleState::FrontBlocked
        } else if left.centimeters < threshold || right.centimeters < threshold {
            ObstacleState::SideBlocked
        } else {
            ObstacleState::Clear
        }
    }

    pub fn classify_set(&self, readings: &ReadingSet) -> ObstacleState {
        self.classify(&readings.front, &readings.left, &readings.right)
    }
}

impl Default for ObstacleClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
