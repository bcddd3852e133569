//! Pixelrail Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that are implemented
//! by chip-specific HALs. The LED engine, command dispatcher and watchdog
//! in `pixelrail-core` are written against these traits only, which is what
//! lets them run (and be tested) on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  pixelrail-firmware (control loop)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pixelrail-core (engine, protocol)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  pixelrail-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!            ┌──────────────────┐
//!            │ pixelrail-hal-   │
//!            │     rp2040       │
//!            └──────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Single digital output (power rail relay)
//! - [`gpio::OutputPort`] - Masked set/clear on a shared I/O port
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication
//! - [`time::Clock`], [`time::CycleDelay`] - Timekeeping and busy-wait delays

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod time;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{OutputPin, OutputPort};
pub use time::{Clock, CycleDelay};
pub use uart::{UartRx, UartTx};
