//! UART serial communication abstractions
//!
//! Provides traits for serial communication that can be implemented by
//! chip-specific HALs. Reads are non-blocking at this level; the timed,
//! blocking read used by the command protocol is built on top of
//! [`UartRx::try_read_byte`] and a [`Clock`](crate::time::Clock).

/// UART transmitter
pub trait UartTx {
    /// Error type for transmit operations
    type Error;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write a single byte to the UART
    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.write_blocking(&[byte])
    }
}

/// UART receiver
pub trait UartRx {
    /// Error type for receive operations
    type Error;

    /// Take one byte from the receive FIFO if one is available
    ///
    /// Returns `Ok(None)` immediately when nothing has arrived.
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Discard everything currently waiting in the receive FIFO
    ///
    /// Returns the number of bytes dropped.
    fn drain(&mut self) -> Result<usize, Self::Error> {
        let mut dropped = 0;
        while self.try_read_byte()?.is_some() {
            dropped += 1;
        }
        Ok(dropped)
    }
}
