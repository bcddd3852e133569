//! Board-agnostic core logic for the LED strip firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Configuration types (channels, color order, link, backend)
//! - Channel table and the shared pixel buffer
//! - Waveform engine: bit timing, frame plans, the [`Serializer`] seam and
//!   the software bit-bang backend
//! - Resource planning for the hardware (state machine + DMA) backend
//! - Watchdog and the command dispatcher that ties it all together
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   bytes   ┌────────────┐  writes   ┌─────────────┐
//! │   Link    │ ────────► │ Controller │ ────────► │ PixelBuffer │
//! │ (UART +   │ ◄──────── │            │           └──────┬──────┘
//! │  Clock)   │    ACK    └─────┬──────┘                  │
//! └───────────┘                 │ emit()                  │
//!                               ▼                         ▼
//!                         ┌────────────┐  waveform  ┌──────────┐
//!                         │ Serializer │ ─────────► │  strips  │
//!                         └────────────┘            └──────────┘
//! ```
//!
//! [`Serializer`]: traits::Serializer

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod controller;
pub mod engine;
pub mod link;
pub mod pixel;
pub mod safety;
pub mod state;
pub mod traits;

#[cfg(test)]
mod sim;

pub use controller::{Controller, ControllerError, PollOutcome};
pub use state::EngineState;
