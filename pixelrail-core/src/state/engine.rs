//! Engine state aggregate

use crate::config::ConfigError;
use crate::pixel::{ChannelTable, PixelBuffer};
use crate::safety::Watchdog;
use crate::traits::{EmitError, Serializer};

/// Everything the control loop mutates
#[derive(Debug)]
pub struct EngineState<'a> {
    channels: ChannelTable,
    buffer: PixelBuffer<'a>,
    /// New pixel data waiting for a Commit
    dirty: bool,
    /// Strip power rail state
    powered: bool,
    watchdog: Watchdog,
}

impl<'a> EngineState<'a> {
    /// Build the state over `storage`
    ///
    /// Starts unpowered with a blank, clean buffer.
    pub fn new(
        channels: ChannelTable,
        storage: &'a mut [u8],
        watchdog: Watchdog,
    ) -> Result<Self, ConfigError> {
        let buffer = PixelBuffer::new(storage, &channels)?;
        Ok(Self {
            channels,
            buffer,
            dirty: false,
            powered: false,
            watchdog,
        })
    }

    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    pub fn buffer(&self) -> &PixelBuffer<'a> {
        &self.buffer
    }

    /// Channel table, writable buffer and watchdog, borrowed together
    pub(crate) fn split_mut(&mut self) -> (&ChannelTable, &mut PixelBuffer<'a>, &mut Watchdog) {
        (&self.channels, &mut self.buffer, &mut self.watchdog)
    }

    /// True when a Commit would emit
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub(crate) fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub(crate) fn watchdog_mut(&mut self) -> &mut Watchdog {
        &mut self.watchdog
    }

    /// Zero the buffer and emit it
    pub(crate) fn blank<S: Serializer>(&mut self, serializer: &mut S) -> Result<(), EmitError> {
        self.buffer.clear();
        self.show(serializer)
    }

    /// Emit the buffer and clear the pending flag
    ///
    /// An unpowered strip is always sent zeros. The flag stays set if the
    /// serializer fails. Nothing else runs between the emission and the
    /// flag update, so no write can slip in between.
    pub(crate) fn show<S: Serializer>(&mut self, serializer: &mut S) -> Result<(), EmitError> {
        if !self.powered {
            self.buffer.clear();
        }
        serializer.emit(self.buffer.as_slice())?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::pixel::ColorOrder;
    use crate::sim::RecordingSerializer;

    fn state(storage: &mut [u8]) -> EngineState<'_> {
        let table = ChannelTable::new(&[ChannelConfig::new(0, 1, ColorOrder::Grb)]).unwrap();
        EngineState::new(table, storage, Watchdog::new(1000, 0)).unwrap()
    }

    #[test]
    fn test_starts_clean_and_unpowered() {
        let mut storage = [0xFFu8; 3];
        let state = state(&mut storage);
        assert!(!state.is_dirty());
        assert!(!state.is_powered());
        assert!(state.buffer().is_blank());
    }

    #[test]
    fn test_show_clears_dirty() {
        let mut storage = [0u8; 3];
        let mut state = state(&mut storage);
        let mut serializer = RecordingSerializer::default();

        state.set_powered(true);
        let (table, buffer, _) = state.split_mut();
        let channel = table.channels()[0];
        buffer.channel_mut(&channel).copy_from_slice(&[1, 2, 3]);
        state.mark_dirty();
        state.show(&mut serializer).unwrap();

        assert!(!state.is_dirty());
        assert_eq!(serializer.frames, [std::vec![1, 2, 3]]);
    }

    #[test]
    fn test_unpowered_show_is_blank() {
        let mut storage = [0u8; 3];
        let mut state = state(&mut storage);
        let mut serializer = RecordingSerializer::default();

        let (table, buffer, _) = state.split_mut();
        let channel = table.channels()[0];
        buffer.channel_mut(&channel).copy_from_slice(&[9, 9, 9]);
        state.mark_dirty();
        state.show(&mut serializer).unwrap();

        assert_eq!(serializer.frames, [std::vec![0, 0, 0]]);
    }
}
