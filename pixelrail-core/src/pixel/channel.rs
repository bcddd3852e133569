//! Channel table
//!
//! Built once at boot from the static channel configuration. Each channel
//! owns a contiguous range of the pixel buffer; ranges follow declaration
//! order and tile the buffer exactly.
//!
//! ```text
//! buffer: [ ch0: pixels0*3 bytes ][ ch1: pixels1*3 bytes ][ ... ]
//!         ^ offset 0              ^ offset len0
//! ```

use core::ops::Range;

use heapless::Vec;

use crate::config::{ChannelConfig, ConfigError, MAX_CHANNELS};
use crate::pixel::ColorOrder;

/// Highest GPIO number a data line can use
pub const MAX_PIN: u8 = 31;

/// One configured strip and its range in the pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    /// GPIO number of the data line
    pub pin: u8,
    /// Number of pixels
    pub pixels: u16,
    /// First byte of this channel in the buffer
    pub offset: usize,
    /// Number of bytes (`pixels * 3`)
    pub len: usize,
    /// Byte order the strip expects
    pub order: ColorOrder,
}

impl Channel {
    /// Byte range of this channel within the buffer
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Single-bit mask of the data pin on its GPIO port
    pub fn pin_mask(&self) -> u32 {
        1u32 << self.pin
    }
}

/// Immutable table of all channels
#[derive(Debug, Clone)]
pub struct ChannelTable {
    channels: Vec<Channel, MAX_CHANNELS>,
    total_len: usize,
}

impl ChannelTable {
    /// Build the table, assigning buffer offsets in declaration order
    pub fn new(configs: &[ChannelConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if configs.len() > MAX_CHANNELS {
            return Err(ConfigError::TooManyChannels);
        }

        let mut channels: Vec<Channel, MAX_CHANNELS> = Vec::new();
        let mut offset = 0usize;

        for (index, config) in configs.iter().enumerate() {
            if config.pixels == 0 {
                return Err(ConfigError::EmptyChannel { index: index as u8 });
            }
            if config.pin > MAX_PIN {
                return Err(ConfigError::InvalidPin { pin: config.pin });
            }
            if channels.iter().any(|c| c.pin == config.pin) {
                return Err(ConfigError::DuplicatePin { pin: config.pin });
            }

            let len = config.byte_len();
            let channel = Channel {
                pin: config.pin,
                pixels: config.pixels,
                offset,
                len,
                order: config.order,
            };
            offset = offset
                .checked_add(len)
                .ok_or(ConfigError::BufferTooLarge)?;
            channels
                .push(channel)
                .map_err(|_| ConfigError::TooManyChannels)?;
        }

        Ok(Self {
            channels,
            total_len: offset,
        })
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Always false for a constructed table
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// All channels in declaration (and buffer) order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Iterate over channels
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Total buffer size, which is also the LoadPixelData payload size
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Index of the channel with the most bytes (first one on ties)
    pub fn longest(&self) -> usize {
        let mut best = 0;
        for (index, channel) in self.channels.iter().enumerate() {
            if channel.len > self.channels[best].len {
                best = index;
            }
        }
        best
    }

    /// Combined pin mask of every channel
    pub fn pin_mask(&self) -> u32 {
        self.channels.iter().fold(0, |mask, c| mask | c.pin_mask())
    }
}
