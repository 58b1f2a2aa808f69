//! Board bindings for the core capability traits.
//!
//! Pin map (STM32G0B1KE):
//!
//! | Function | Pins |
//! |---|---|
//! | Sonar triggers front/left/right | PA0 / PA1 / PA4 |
//! | Sonar echoes front/left/right | PA5 / PA6 / PA7 |
//! | Drive enable PWM (TIM3 CH1) | PB4 |
//! | Drive direction IN1 / IN2 | PB5 / PB6 |
//! | Steering servo PWM (TIM2 CH1) | PA15 |
//! | Buzzer PWM (TIM14 CH1) | PB1 |
//! | Throttle potentiometer (ADC1) | PB0 |
//! | Enable button, active low | PB2 |
//! | Status lamp red / green | PA8 / PA9 |
//! | LCD backpack (I2C1 SCL / SDA) | PB8 / PB9 |

#![cfg(target_os = "none")]

pub mod drive;
pub mod lcd;
pub mod panel;
pub mod sonar;

pub use drive::{DriveMotor, SteeringServo};
pub use panel::Panel;
