//! H-bridge drive motor and steering servo.

use avoidance_core::capabilities::{Direction, DriveActuator, SteeringActuator};
use embassy_stm32::gpio::Output;
use embassy_stm32::peripherals::{TIM2, TIM3};
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;

/// Servo pulse width at 0 degrees, in microseconds.
const SERVO_MIN_PULSE_US: u32 = 544;
/// Servo pulse width at 180 degrees, in microseconds.
const SERVO_MAX_PULSE_US: u32 = 2_400;
/// Servo frame length at 50 Hz.
const SERVO_FRAME_US: u16 = 20_000;
const SERVO_MAX_DEGREES: u8 = 180;

/// Enable line on PWM plus two direction lines.
pub struct DriveMotor<'d> {
    enable: SimplePwmChannel<'d, TIM3>,
    in1: Output<'d>,
    in2: Output<'d>,
}

impl<'d> DriveMotor<'d> {
    pub fn new(mut enable: SimplePwmChannel<'d, TIM3>, in1: Output<'d>, in2: Output<'d>) -> Self {
        enable.set_duty_cycle_fully_off();
        enable.enable();
        Self { enable, in1, in2 }
    }
}

impl DriveActuator for DriveMotor<'_> {
    fn set_speed(&mut self, direction: Direction, magnitude: u8) {
        match direction {
            Direction::Coast => {
                self.in1.set_low();
                self.in2.set_low();
                self.enable.set_duty_cycle_fully_off();
            }
            Direction::Forward => {
                self.in1.set_high();
                self.in2.set_low();
                self.enable
                    .set_duty_cycle_fraction(u16::from(magnitude), u16::from(u8::MAX));
            }
        }
    }
}

/// Hobby servo on a 50 Hz PWM channel.
pub struct SteeringServo<'d> {
    channel: SimplePwmChannel<'d, TIM2>,
}

impl<'d> SteeringServo<'d> {
    pub fn new(mut channel: SimplePwmChannel<'d, TIM2>) -> Self {
        channel.enable();
        Self { channel }
    }
}

fn pulse_width_us(degrees: u8) -> u16 {
    let degrees = u32::from(degrees.min(SERVO_MAX_DEGREES));
    let span = SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US;
    let pulse = SERVO_MIN_PULSE_US + degrees * span / u32::from(SERVO_MAX_DEGREES);
    u16::try_from(pulse).unwrap_or(SERVO_FRAME_US)
}

impl SteeringActuator for SteeringServo<'_> {
    fn set_angle(&mut self, degrees: u8) {
        self.channel
            .set_duty_cycle_fraction(pulse_width_us(degrees), SERVO_FRAME_US);
    }
}
