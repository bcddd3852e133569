//! Host-side command encoding
//!
//! The firmware never needs to build commands, but host tooling and the
//! firmware's own tests do. Encoding here keeps both sides byte-exact.

use heapless::Vec;

use crate::opcode::Opcode;

/// Errors that can occur while encoding a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer is smaller than the encoded command
    BufferTooSmall,
}

/// A command as sent by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostCommand<'a> {
    /// Switch the strip power rail on or off
    SetPower(bool),
    /// Replace the whole pixel buffer (wire order)
    LoadPixelData(&'a [u8]),
    /// Show pending data; firmware answers with one ACK byte
    Commit,
}

impl<'a> HostCommand<'a> {
    /// The opcode this command is sent with
    pub fn opcode(&self) -> Opcode {
        match self {
            HostCommand::SetPower(_) => Opcode::SetPower,
            HostCommand::LoadPixelData(_) => Opcode::LoadPixelData,
            HostCommand::Commit => Opcode::Commit,
        }
    }

    /// Total encoded size, opcode byte included
    pub fn encoded_len(&self) -> usize {
        match self {
            HostCommand::SetPower(_) => 2,
            HostCommand::LoadPixelData(data) => 1 + data.len(),
            HostCommand::Commit => 1,
        }
    }

    /// Encode this command into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode_into(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(EncodeError::BufferTooSmall);
        }

        buffer[0] = self.opcode().to_byte();
        match self {
            HostCommand::SetPower(on) => buffer[1] = u8::from(*on),
            HostCommand::LoadPixelData(data) => buffer[1..len].copy_from_slice(data),
            HostCommand::Commit => {}
        }

        Ok(len)
    }

    /// Encode this command into a heapless Vec
    pub fn encode_to_vec<const N: usize>(&self) -> Result<Vec<u8, N>, EncodeError> {
        let mut vec = Vec::new();
        vec.resize(self.encoded_len(), 0)
            .map_err(|_| EncodeError::BufferTooSmall)?;
        self.encode_into(&mut vec)?;
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::{OP_COMMIT, OP_LOAD_PIXEL_DATA, OP_SET_POWER};
    use proptest::prelude::*;

    #[test]
    fn test_encode_set_power() {
        let mut buffer = [0xEEu8; 4];
        let len = HostCommand::SetPower(true).encode_into(&mut buffer).unwrap();
        assert_eq!(len, 2);
        assert_eq!(&buffer[..2], &[OP_SET_POWER, 1]);

        let len = HostCommand::SetPower(false).encode_into(&mut buffer).unwrap();
        assert_eq!(&buffer[..len], &[OP_SET_POWER, 0]);
    }

    #[test]
    fn test_encode_commit() {
        let encoded: Vec<u8, 4> = HostCommand::Commit.encode_to_vec().unwrap();
        assert_eq!(&encoded[..], &[OP_COMMIT]);
    }

    #[test]
    fn test_encode_pixel_data() {
        let pixels = [0xFF, 0x00, 0x00, 0x11, 0x22, 0x33];
        let encoded: Vec<u8, 16> = HostCommand::LoadPixelData(&pixels).encode_to_vec().unwrap();
        assert_eq!(encoded[0], OP_LOAD_PIXEL_DATA);
        assert_eq!(&encoded[1..], &pixels);
    }

    #[test]
    fn test_buffer_too_small() {
        let pixels = [0u8; 6];
        let mut buffer = [0u8; 6];
        assert_eq!(
            HostCommand::LoadPixelData(&pixels).encode_into(&mut buffer),
            Err(EncodeError::BufferTooSmall)
        );
        assert_eq!(
            HostCommand::LoadPixelData(&pixels).encode_to_vec::<4>(),
            Err(EncodeError::BufferTooSmall)
        );
    }

    proptest! {
        #[test]
        fn prop_pixel_data_is_verbatim(pixels in proptest::collection::vec(any::<u8>(), 0..200)) {
            let mut buffer = [0u8; 256];
            let cmd = HostCommand::LoadPixelData(&pixels);
            let len = cmd.encode_into(&mut buffer).unwrap();
            prop_assert_eq!(len, pixels.len() + 1);
            prop_assert_eq!(Opcode::from_byte(buffer[0]), Some(Opcode::LoadPixelData));
            prop_assert_eq!(&buffer[1..len], &pixels[..]);
        }
    }
}
