//! GPIO abstractions
//!
//! Two flavours of output are needed by the firmware: a plain pin for the
//! strip power rail, and a whole-port view for the bit-banged data lines,
//! where several lines must change within the same instruction.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;
}

/// A shared output port driven through set/clear masks
///
/// Bit `n` of a mask addresses line `n` of the port. Every call must take
/// effect atomically for all lines in the mask: lines outside the mask are
/// left untouched, and lines inside it change together.
///
/// Implementations are called from inside the bit-bang hot loop, so they
/// must be a single register store where the hardware allows it.
pub trait OutputPort {
    /// Drive every line in `mask` high
    fn set_mask(&mut self, mask: u32);

    /// Drive every line in `mask` low
    fn clear_mask(&mut self, mask: u32);
}
