#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;

// Shared control logic for the obstacle-avoiding vehicle.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and reaching every sensor and actuator through the
// capability traits in [`capabilities`].

pub mod capabilities;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod controller;
pub mod motor;
pub mod ranging;
pub mod repl;
pub mod signal;
pub mod supervisor;
pub mod telemetry;
