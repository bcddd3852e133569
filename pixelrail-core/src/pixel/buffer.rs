//! Flat pixel buffer
//!
//! Bytes are stored exactly as the host sent them (wire order). The buffer
//! borrows its storage so the firmware can hand out `'static` memory that a
//! DMA engine may keep reading after `emit()` returns.

use crate::config::ConfigError;
use crate::pixel::{Channel, ChannelTable};

/// Shared byte store for every channel
#[derive(Debug)]
pub struct PixelBuffer<'a> {
    bytes: &'a mut [u8],
}

impl<'a> PixelBuffer<'a> {
    /// Wrap `storage`, using exactly `table.total_len()` bytes of it
    ///
    /// Storage is zeroed so the first emission is blank.
    pub fn new(storage: &'a mut [u8], table: &ChannelTable) -> Result<Self, ConfigError> {
        let needed = table.total_len();
        let available = storage.len();
        if available < needed {
            return Err(ConfigError::StorageTooSmall { needed, available });
        }

        let (bytes, _) = storage.split_at_mut(needed);
        bytes.fill(0);
        Ok(Self { bytes })
    }

    /// Total size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when no channel is configured
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whole buffer, wire order
    pub fn as_slice(&self) -> &[u8] {
        self.bytes
    }

    /// One channel's range
    pub fn channel(&self, channel: &Channel) -> &[u8] {
        &self.bytes[channel.range()]
    }

    /// One channel's range, for writing
    pub fn channel_mut(&mut self, channel: &Channel) -> &mut [u8] {
        &mut self.bytes[channel.range()]
    }

    /// Zero every byte
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// True when every byte is zero
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::pixel::ColorOrder;

    fn table() -> ChannelTable {
        ChannelTable::new(&[
            ChannelConfig::new(2, 2, ColorOrder::Grb),
            ChannelConfig::new(3, 1, ColorOrder::Rgb),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_zeroes_and_trims_storage() {
        let table = table();
        let mut storage = [0xAAu8; 16];
        let buffer = PixelBuffer::new(&mut storage, &table).unwrap();
        assert_eq!(buffer.len(), 9);
        assert!(buffer.is_blank());
    }

    #[test]
    fn test_storage_too_small() {
        let table = table();
        let mut storage = [0u8; 8];
        assert_eq!(
            PixelBuffer::new(&mut storage, &table).unwrap_err(),
            ConfigError::StorageTooSmall {
                needed: 9,
                available: 8
            }
        );
    }

    #[test]
    fn test_channel_views() {
        let table = table();
        let mut storage = [0u8; 9];
        let mut buffer = PixelBuffer::new(&mut storage, &table).unwrap();

        buffer.channel_mut(&table.channels()[1]).copy_from_slice(&[7, 8, 9]);
        assert_eq!(buffer.channel(&table.channels()[0]), &[0; 6]);
        assert_eq!(buffer.as_slice(), &[0, 0, 0, 0, 0, 0, 7, 8, 9]);
        assert!(!buffer.is_blank());

        buffer.clear();
        assert!(buffer.is_blank());
    }
}
