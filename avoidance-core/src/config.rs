//! Named tuning constants and the configuration records built from them.
//!
//! The defaults describe the stock chassis: a 40 cm obstacle threshold, a
//! 2-400 cm trusted sensor window, a crawl speed of 100 and a 5-unit / 100 ms
//! ramp. Every value can be overridden so tests and alternative chassis can
//! inject their own numbers.

use core::fmt;
use core::time::Duration;

use crate::ranging::SensorFailurePolicy;
use crate::signal::ToneSpec;

/// Distance below which a channel reports an obstacle (centimeters).
pub const OBSTACLE_THRESHOLD_CM: f32 = 40.0;
/// Closest distance the ranger reports reliably (centimeters).
pub const MIN_RANGE_CM: f32 = 2.0;
/// Farthest distance the ranger reports reliably (centimeters).
pub const MAX_RANGE_CM: f32 = 400.0;
/// Speed of sound expressed in centimeters per microsecond.
pub const SOUND_CM_PER_US: f32 = 0.034;
/// Longest echo wait before a channel is treated as "no object".
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(30);

/// Highest duty value accepted by the drive actuator.
pub const MAX_SPEED: u8 = 255;
/// Speed held while a side obstacle is being avoided.
pub const CRAWL_SPEED: u8 = 100;
/// Speed removed per ramp step.
pub const RAMP_STEP: u8 = 5;
/// Minimum spacing between two ramp steps.
pub const RAMP_INTERVAL: Duration = Duration::from_millis(100);
/// Full-scale raw value produced by the throttle potentiometer.
pub const THROTTLE_RAW_MAX: u16 = 1023;

/// Steering angle while driving straight.
pub const STEERING_NEUTRAL_DEG: u8 = 0;
/// Steering angle used to swerve away from a side obstacle.
pub const STEERING_AVOID_DEG: u8 = 45;
/// Steering angle used when the front is blocked.
pub const STEERING_BLOCKING_DEG: u8 = 90;

/// Settle window opened after an accepted toggle edge.
pub const DEBOUNCE_SETTLE: Duration = Duration::from_millis(300);
/// Nominal spacing between two control cycles.
pub const CYCLE_PERIOD: Duration = Duration::from_millis(50);

/// Tone played when an obstacle first appears.
pub const OBSTACLE_APPEARED_TONE: ToneSpec = ToneSpec::new(1_000, Duration::from_millis(200));
/// Tone played when the path clears again.
pub const OBSTACLE_CLEARED_TONE: ToneSpec = ToneSpec::new(1_200, Duration::from_millis(200));

/// Ranger conversion and filtering parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RangeConfig {
    pub min_cm: f32,
    pub max_cm: f32,
    pub sound_cm_per_us: f32,
    pub echo_timeout: Duration,
    pub failure_policy: SensorFailurePolicy,
}

impl RangeConfig {
    pub const fn new() -> Self {
        Self {
            min_cm: MIN_RANGE_CM,
            max_cm: MAX_RANGE_CM,
            sound_cm_per_us: SOUND_CM_PER_US,
            echo_timeout: ECHO_TIMEOUT,
            failure_policy: SensorFailurePolicy::FailOpen,
        }
    }

    /// Returns a copy using the supplied failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: SensorFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Obstacle classification parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClassifierConfig {
    pub threshold_cm: f32,
}

impl ClassifierConfig {
    pub const fn new(threshold_cm: f32) -> Self {
        Self { threshold_cm }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::new(OBSTACLE_THRESHOLD_CM)
    }
}

/// Servo angles for each steering position.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SteeringConfig {
    pub neutral_deg: u8,
    pub avoid_deg: u8,
    pub blocking_deg: u8,
}

impl SteeringConfig {
    pub const fn new() -> Self {
        Self {
            neutral_deg: STEERING_NEUTRAL_DEG,
            avoid_deg: STEERING_AVOID_DEG,
            blocking_deg: STEERING_BLOCKING_DEG,
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive speed limits and ramp pacing.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MotorConfig {
    pub max_speed: u8,
    pub crawl_speed: u8,
    pub ramp_step: u8,
    pub ramp_interval: Duration,
    pub throttle_raw_max: u16,
    pub steering: SteeringConfig,
}

impl MotorConfig {
    pub const fn new() -> Self {
        Self {
            max_speed: MAX_SPEED,
            crawl_speed: CRAWL_SPEED,
            ramp_step: RAMP_STEP,
            ramp_interval: RAMP_INTERVAL,
            throttle_raw_max: THROTTLE_RAW_MAX,
            steering: SteeringConfig::new(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Acknowledgment tones for each signal edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SignalConfig {
    pub appeared: ToneSpec,
    pub cleared: ToneSpec,
}

impl SignalConfig {
    pub const fn new() -> Self {
        Self {
            appeared: OBSTACLE_APPEARED_TONE,
            cleared: OBSTACLE_CLEARED_TONE,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Toggle debounce parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SupervisorConfig {
    pub debounce_settle: Duration,
}

impl SupervisorConfig {
    pub const fn new(debounce_settle: Duration) -> Self {
        Self { debounce_settle }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new(DEBOUNCE_SETTLE)
    }
}

/// Complete controller configuration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ControllerConfig {
    pub range: RangeConfig,
    pub classifier: ClassifierConfig,
    pub motor: MotorConfig,
    pub signal: SignalConfig,
    pub supervisor: SupervisorConfig,
}

impl ControllerConfig {
    pub const fn new() -> Self {
        Self {
            range: RangeConfig::new(),
            classifier: ClassifierConfig::new(OBSTACLE_THRESHOLD_CM),
            motor: MotorConfig::new(),
            signal: SignalConfig::new(),
            supervisor: SupervisorConfig::new(DEBOUNCE_SETTLE),
        }
    }

    /// Checks the cross-field invariants the control logic relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let range = &self.range;
        if !(range.min_cm > 0.0 && range.min_cm < range.max_cm) {
            return Err(ConfigError::RangeBoundsInverted);
        }
        if range.sound_cm_per_us <= 0.0 {
            return Err(ConfigError::NonPositiveSoundSpeed);
        }
        if range.echo_timeout.is_zero() {
            return Err(ConfigError::ZeroEchoTimeout);
        }

        let threshold = self.classifier.threshold_cm;
        if threshold <= range.min_cm || threshold > range.max_cm {
            return Err(ConfigError::ThresholdOutsideRange);
        }

        let motor = &self.motor;
        if motor.ramp_step == 0 {
            return Err(ConfigError::ZeroRampStep);
        }
        if motor.crawl_speed > motor.max_speed {
            return Err(ConfigError::CrawlAboveMax);
        }
        if motor.throttle_raw_max == 0 {
            return Err(ConfigError::ZeroThrottleSpan);
        }

        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons a [`ControllerConfig`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    RangeBoundsInverted,
    NonPositiveSoundSpeed,
    ZeroEchoTimeout,
    ThresholdOutsideRange,
    ZeroRampStep,
    CrawlAboveMax,
    ZeroThrottleSpan,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ConfigError::RangeBoundsInverted => "range bounds must satisfy 0 < min < max",
            ConfigError::NonPositiveSoundSpeed => "sound speed must be positive",
            ConfigError::ZeroEchoTimeout => "echo timeout must be non-zero",
            ConfigError::ThresholdOutsideRange => "obstacle threshold must sit inside the range",
            ConfigError::ZeroRampStep => "ramp step must be non-zero",
            ConfigError::CrawlAboveMax => "crawl speed exceeds max speed",
            ConfigError::ZeroThrottleSpan => "throttle span must be non-zero",
        };
        f.write_str(message)
    }
}
