//! RP2040-specific HAL for the LED strip firmware
//!
//! This crate provides RP2040-specific implementations of the shared
//! `pixelrail-hal` traits, plus the hardware-assisted serializer:
//!
//! - SIO output port for the bit-bang backend ([`gpio::SioPort`])
//! - Power rail relay pin ([`gpio::RelayPin`])
//! - Host link over a buffered UART ([`uart::SerialLink`])
//! - Millisecond clock on top of `embassy-time` ([`time::EmbassyClock`])
//! - Per-color-order PIO programs ([`pio::Ws2812Program`])
//! - PIO + DMA serializer ([`ws2812::PioSerializer`])

#![no_std]

pub mod gpio;
pub mod pio;
pub mod time;
pub mod uart;
pub mod ws2812;

pub use gpio::{RelayPin, SioPort};
pub use time::EmbassyClock;
pub use uart::SerialLink;
pub use ws2812::{PioBlock, PioLane, PioSerializer};
