//! Host link
//!
//! Pairs the serial transport with the millisecond clock and provides the
//! one blocking primitive the protocol needs: read a byte, giving up at a
//! deadline.

use pixelrail_hal::{Clock, UartRx, UartTx};

/// Link errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// Deadline passed without a byte
    Timeout,
    /// The transport reported an error
    Transport(E),
}

/// Serial transport plus time base
pub struct Link<T, C> {
    transport: T,
    clock: C,
}

impl<T, C, E> Link<T, C>
where
    T: UartRx<Error = E> + UartTx<Error = E>,
    C: Clock,
{
    pub fn new(transport: T, clock: C) -> Self {
        Self { transport, clock }
    }

    /// Current time
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Take a byte if one is waiting
    pub fn try_read(&mut self) -> Result<Option<u8>, LinkError<E>> {
        self.transport.try_read_byte().map_err(LinkError::Transport)
    }

    /// Wait for a byte until `deadline_ms` has passed
    pub fn read_until(&mut self, deadline_ms: u64) -> Result<u8, LinkError<E>> {
        loop {
            if let Some(byte) = self.try_read()? {
                return Ok(byte);
            }
            if self.clock.now_ms() > deadline_ms {
                return Err(LinkError::Timeout);
            }
        }
    }

    /// Send one byte and flush it out
    pub fn write_byte(&mut self, byte: u8) -> Result<(), LinkError<E>> {
        self.transport.write_byte(byte).map_err(LinkError::Transport)?;
        self.transport.flush().map_err(LinkError::Transport)
    }

    /// Drop everything already received
    pub fn drain(&mut self) -> Result<usize, LinkError<E>> {
        self.transport.drain().map_err(LinkError::Transport)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
