//! # MZ ECU Control Core
//!
//! Interrupt-driven ignition controller for a single-cylinder motorcycle
//! engine. The core senses crankshaft rotation through two crank-position
//! edges per revolution, estimates engine speed and acceleration from a
//! rolling half-revolution window, selects an ignition advance from a
//! programmable 4×16 map, and schedules the spark through a hardware
//! countdown timer. A rev limiter and an anti-theft interlock gate every
//! coil decision.
//!
//! ## Architecture
//!
//! 1. **`crank`** — rolling half-revolution timing, RPM, acceleration
//! 2. **`ignition`** — the safety-critical per-revolution scheduler
//! 3. **`immo`** — immobilizer interlock fed by a secondary byte stream
//! 4. **`store`** — persisted map / parameters / keys over a generic
//!    non-volatile block store
//! 5. **`interface`** — line-oriented diagnostic command dispatcher
//! 6. **`ecu`** — the owning aggregate wiring events to components
//!
//! ## Concurrency model
//!
//! Edge, stall and countdown handlers are mutually exclusive and run to
//! completion (the platform masks interrupts while a handler runs); they
//! take `&mut` on the [`ecu::Ecu`] aggregate. The diagnostic foreground
//! reads runtime telemetry only through [`state::SharedTelemetry`], a
//! single packed atomic word, so multi-byte values can never tear. The
//! event path performs no heap allocation and no logging.

#![deny(clippy::disallowed_types)]

pub mod crank;
pub mod ecu;
pub mod error;
pub mod hal;
pub mod ignition;
pub mod immo;
pub mod interface;
pub mod state;
pub mod store;

pub use ecu::Ecu;

/// Firmware version reported by the `v` diagnostic command.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
