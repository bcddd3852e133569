//! Pixelrail host link protocol
//!
//! This crate defines the byte-level protocol between the host (the PC
//! software rendering frames) and the LED firmware. The protocol is
//! deliberately tiny: one opcode byte, followed by a payload whose length is
//! implied by the opcode and the firmware's fixed channel layout.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌────────┬──────────────────────────────┐
//! │ OPCODE │ PAYLOAD                      │
//! │ 1B     │ 0, 1 or N bytes (implicit)   │
//! └────────┴──────────────────────────────┘
//! ```
//!
//! There is no start byte, no length prefix and no checksum. Framing relies on
//! both ends agreeing on the total pixel buffer size `N`. The only reply is a
//! single [`ACK`] byte after every Commit, which the host must wait for before
//! sending the next frame.
//!
//! On boot the firmware sends one [`READY`] byte once it is listening.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod host;
pub mod opcode;

pub use host::{EncodeError, HostCommand};
pub use opcode::{Opcode, ACK, READY};
