//! Host link over a buffered UART
//!
//! Adapts any blocking `embedded-io` reader/writer pair (in practice the two
//! halves of an `embassy_rp::uart::BufferedUart`) to the non-blocking
//! [`UartRx`] and blocking [`UartTx`] traits the command dispatcher uses.

use embedded_io::{Error as _, ErrorKind, Read, ReadReady, Write};
use pixelrail_hal::{UartRx, UartTx};

/// Serial link built from separate RX and TX halves
pub struct SerialLink<R, W> {
    rx: R,
    tx: W,
}

impl<R, W> SerialLink<R, W> {
    /// Join the receive and transmit halves
    pub fn new(rx: R, tx: W) -> Self {
        Self { rx, tx }
    }
}

impl<R: Read + ReadReady, W> UartRx for SerialLink<R, W> {
    type Error = ErrorKind;

    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        if !self.rx.read_ready().map_err(|e| e.kind())? {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        match self.rx.read(&mut byte).map_err(|e| e.kind())? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }
}

impl<R, W: Write> UartTx for SerialLink<R, W> {
    type Error = ErrorKind;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.write_all(data).map_err(|e| e.kind())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx.flush().map_err(|e| e.kind())
    }
}
