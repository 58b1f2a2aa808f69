use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel, Resolution};
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::time::{hz, khz};
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};

use avoidance_core::config::ControllerConfig;
use avoidance_core::controller::AvoidanceController;

use crate::clock::FirmwareInstant;
use crate::hw::lcd::{LCD_ADDRESS, Lcd};
use crate::hw::panel::{Buzzer, OperatorInputs, StatusLamp};
use crate::hw::sonar::{Sonar, SonarArray};
use crate::hw::{DriveMotor, Panel, SteeringServo};

mod control_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type Controller =
    AvoidanceController<FirmwareInstant, DriveMotor<'static>, SteeringServo<'static>>;

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA4,
        PA5,
        PA6,
        PA7,
        PA8,
        PA9,
        PA15,
        PB0,
        PB1,
        PB2,
        PB4,
        PB5,
        PB6,
        PB8,
        PB9,
        ADC1,
        I2C1,
        TIM2,
        TIM3,
        TIM14,
        ..
    } = hal::init(config);

    let controller_config = ControllerConfig::default();

    let sonars = SonarArray::new(
        [
            Sonar::new(
                Output::new(PA0, Level::Low, Speed::Low),
                Input::new(PA5, Pull::Down),
            ),
            Sonar::new(
                Output::new(PA1, Level::Low, Speed::Low),
                Input::new(PA6, Pull::Down),
            ),
            Sonar::new(
                Output::new(PA4, Level::Low, Speed::Low),
                Input::new(PA7, Pull::Down),
            ),
        ],
        controller_config.range.echo_timeout,
    );

    let drive_pwm = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PB4, OutputType::PushPull)),
        None,
        None,
        None,
        khz(1),
        CountingMode::EdgeAlignedUp,
    );
    let drive = DriveMotor::new(
        drive_pwm.split().ch1,
        Output::new(PB5, Level::Low, Speed::Low),
        Output::new(PB6, Level::Low, Speed::Low),
    );

    let servo_pwm = SimplePwm::new(
        TIM2,
        Some(PwmPin::new(PA15, OutputType::PushPull)),
        None,
        None,
        None,
        hz(50),
        CountingMode::EdgeAlignedUp,
    );
    let steering = SteeringServo::new(servo_pwm.split().ch1);

    let buzzer_pwm = SimplePwm::new(
        TIM14,
        Some(PwmPin::new(PB1, OutputType::PushPull)),
        None,
        None,
        None,
        khz(1),
        CountingMode::EdgeAlignedUp,
    );

    let mut adc = Adc::new(ADC1);
    adc.set_resolution(Resolution::BITS10);
    let inputs = OperatorInputs::new(adc, PB0.degrade_adc(), Input::new(PB2, Pull::Up));

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = khz(100);
    let mut lcd = Lcd::new(I2c::new_blocking(I2C1, PB8, PB9, i2c_config), LCD_ADDRESS);
    if lcd.init().is_err() {
        defmt::warn!("display init failed; continuing without it");
    }

    let panel = Panel {
        sonars,
        lcd,
        buzzer: Buzzer::new(buzzer_pwm),
        inputs,
        lamp: StatusLamp::new(
            Output::new(PA8, Level::Low, Speed::Low),
            Output::new(PA9, Level::Low, Speed::Low),
        ),
    };

    let controller = Controller::new(controller_config, drive, steering)
        .expect("default controller config is valid");

    spawner
        .spawn(control_task::run(controller, panel))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}
