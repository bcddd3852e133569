//! Waveform serializer trait
//!
//! Abstracts over the two backends: the cycle-counted bit-bang loop and the
//! state machine + DMA engine.

/// Errors surfaced by a serializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmitError {
    /// The buffer handed to `emit()` does not match the channel table
    FrameSizeMismatch { expected: usize, actual: usize },
}

/// Turns the pixel buffer into waveforms on every channel
pub trait Serializer {
    /// Emit one full frame
    ///
    /// `pixels` is the whole buffer in wire order; the serializer applies
    /// each channel's color order. Returns once the frame has been sent (or,
    /// for DMA backends, once the longest channel's transfer has finished).
    /// Consecutive frames are always separated by at least the latch time.
    fn emit(&mut self, pixels: &[u8]) -> Result<(), EmitError>;

    /// Block until nothing still reads channel `index`'s buffer range
    ///
    /// Called before the buffer range is overwritten. Backends that finish
    /// emission synchronously return immediately.
    fn wait_channel_idle(&mut self, index: usize) {
        let _ = index;
    }
}

impl<S: Serializer + ?Sized> Serializer for &mut S {
    fn emit(&mut self, pixels: &[u8]) -> Result<(), EmitError> {
        (**self).emit(pixels)
    }

    fn wait_channel_idle(&mut self, index: usize) {
        (**self).wait_channel_idle(index)
    }
}
