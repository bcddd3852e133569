//! Configuration type definitions
//!
//! These types describe the strip wiring and the host link. The firmware's
//! build script turns `strips.toml` into a `&[ChannelConfig]` constant plus a
//! [`LinkConfig`]; host tests build them by hand.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pixel::ColorOrder;
use crate::safety::DEFAULT_TIMEOUT_MS;

/// Maximum number of strip channels
pub const MAX_CHANNELS: usize = 8;

/// Bytes per pixel on the wire
pub const BYTES_PER_PIXEL: usize = 3;

/// Default host link rate
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Static description of one strip channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// GPIO number of the data line
    pub pin: u8,
    /// Number of pixels on the strip
    pub pixels: u16,
    /// Byte order the strip expects
    pub order: ColorOrder,
}

impl ChannelConfig {
    /// Create a channel description
    pub const fn new(pin: u8, pixels: u16, order: ColorOrder) -> Self {
        Self { pin, pixels, order }
    }

    /// Size of this channel's range in the pixel buffer
    pub const fn byte_len(&self) -> usize {
        self.pixels as usize * BYTES_PER_PIXEL
    }
}

/// Which waveform backend drives the strips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Backend {
    /// Cycle-counted GPIO toggling with interrupts disabled
    BitBang,
    /// One PIO state machine per channel, fed by DMA
    #[default]
    Pio,
}

impl Backend {
    /// Parse the name used in `strips.toml`
    pub fn from_str_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("bitbang") {
            Some(Backend::BitBang)
        } else if name.eq_ignore_ascii_case("pio") {
            Some(Backend::Pio)
        } else {
            None
        }
    }
}

/// Host link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Serial rate in bits per second (8N1)
    pub baud_rate: u32,
    /// Silence after which the strips are blanked and powered off
    pub watchdog_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            watchdog_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No channels configured
    NoChannels,
    /// More than [`MAX_CHANNELS`] channels
    TooManyChannels,
    /// Channel with zero pixels
    EmptyChannel { index: u8 },
    /// Two channels share a data pin
    DuplicatePin { pin: u8 },
    /// Pin number outside the GPIO bank
    InvalidPin { pin: u8 },
    /// Total buffer size overflows
    BufferTooLarge,
    /// Pixel storage smaller than the channel table needs
    StorageTooSmall { needed: usize, available: usize },
    /// Bit timing phases are not ordered or do not fit the period
    InvalidTiming,
    /// More channels than the bit-bang backend can interleave
    TooManyLanes,
}
