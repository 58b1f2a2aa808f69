//! Everything the control cycle reads or notifies besides the actuators.

use core::time::Duration;

use avoidance_core::capabilities::{
    AlertSink, Indication, ManualInput, Ranger, StatusDisplay,
};
use avoidance_core::clock::deadline_reached;
use avoidance_core::ranging::{ChannelId, EchoSample};
use embassy_stm32::adc::{Adc, AnyAdcChannel};
use embassy_stm32::gpio::{Input, Output};
use embassy_stm32::peripherals::{ADC1, TIM14};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;

use super::lcd::Lcd;
use super::sonar::SonarArray;
use crate::clock::FirmwareInstant;
use crate::telemetry;

const BUZZER_DUTY_PERCENT: u8 = 50;

/// Piezo buzzer on a PWM channel. A tone runs until its deadline, which
/// [`Buzzer::service`] checks once per cycle.
pub struct Buzzer<'d> {
    pwm: SimplePwm<'d, TIM14>,
    silence_at: Option<FirmwareInstant>,
}

impl<'d> Buzzer<'d> {
    pub fn new(mut pwm: SimplePwm<'d, TIM14>) -> Self {
        pwm.ch1().disable();
        Self {
            pwm,
            silence_at: None,
        }
    }

    fn start(&mut self, frequency_hz: u16, duration: Duration, now: FirmwareInstant) {
        self.pwm.set_frequency(Hertz(u32::from(frequency_hz)));
        let mut channel = self.pwm.ch1();
        channel.set_duty_cycle_percent(BUZZER_DUTY_PERCENT);
        channel.enable();
        self.silence_at = Some(now + duration);
    }

    /// Stops a tone whose deadline has passed.
    pub fn service(&mut self, now: FirmwareInstant) {
        if self.silence_at.is_some() && deadline_reached(self.silence_at, now) {
            self.pwm.ch1().disable();
            self.silence_at = None;
        }
    }
}

/// Throttle potentiometer and enable button.
pub struct OperatorInputs<'d> {
    adc: Adc<'d, ADC1>,
    throttle: AnyAdcChannel<ADC1>,
    button: Input<'d>,
}

impl<'d> OperatorInputs<'d> {
    /// `adc` must already be configured for 10-bit samples.
    pub fn new(adc: Adc<'d, ADC1>, throttle: AnyAdcChannel<ADC1>, button: Input<'d>) -> Self {
        Self {
            adc,
            throttle,
            button,
        }
    }
}

/// Red/green status lamp.
pub struct StatusLamp<'d> {
    red: Output<'d>,
    green: Output<'d>,
}

impl<'d> StatusLamp<'d> {
    pub fn new(red: Output<'d>, green: Output<'d>) -> Self {
        Self { red, green }
    }
}

pub struct Panel<'d> {
    pub sonars: SonarArray<'d>,
    pub lcd: Lcd<'d>,
    pub buzzer: Buzzer<'d>,
    pub inputs: OperatorInputs<'d>,
    pub lamp: StatusLamp<'d>,
}

impl Ranger for Panel<'_> {
    fn trigger_and_measure(&mut self, channel: ChannelId) -> EchoSample {
        self.sonars.trigger_and_measure(channel)
    }
}

impl StatusDisplay for Panel<'_> {
    fn show_status(&mut self, line1: &str, line2: &str) {
        telemetry::log_display(line1, line2);
        if self.lcd.show(line1, line2).is_err() {
            telemetry::log_display_fault();
        }
    }

    fn set_indication(&mut self, indication: Indication) {
        match indication {
            Indication::Safe => {
                self.lamp.red.set_low();
                self.lamp.green.set_high();
            }
            Indication::Warning => {
                self.lamp.red.set_high();
                self.lamp.green.set_low();
            }
        }
    }
}

impl AlertSink for Panel<'_> {
    fn emit(&mut self, frequency_hz: u16, duration: Duration) {
        self.buzzer
            .start(frequency_hz, duration, FirmwareInstant::now());
    }
}

impl ManualInput for Panel<'_> {
    fn read_throttle(&mut self) -> u16 {
        self.inputs.adc.blocking_read(&mut self.inputs.throttle)
    }

    fn read_toggle(&mut self) -> bool {
        self.inputs.button.is_low()
    }
}
