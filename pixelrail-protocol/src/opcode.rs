//! Opcode table for the host link
//!
//! | Opcode | Name          | Payload                         | Reply     |
//! |--------|---------------|---------------------------------|-----------|
//! | 0x00   | SetPower      | 1 byte: 0 = off, nonzero = on   | none      |
//! | 0x01   | LoadPixelData | N bytes, wire pixel order       | none      |
//! | 0x02   | Commit        | none                            | [`ACK`]   |

// Opcode byte values: Host → Firmware
pub const OP_SET_POWER: u8 = 0x00;
pub const OP_LOAD_PIXEL_DATA: u8 = 0x01;
pub const OP_COMMIT: u8 = 0x02;

// Reply byte values: Firmware → Host
/// Sent after every Commit, whether or not a frame was shown
pub const ACK: u8 = 0x00;
/// Sent once at boot when the firmware starts listening
pub const READY: u8 = 0x01;

/// Recognized opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// Switch the strip power rail
    SetPower,
    /// Overwrite the whole pixel buffer
    LoadPixelData,
    /// Show pending pixel data and acknowledge
    Commit,
}

impl Opcode {
    /// Decode an opcode byte
    ///
    /// Returns `None` for bytes outside the table. Such bytes are ignored by
    /// the firmware.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            OP_SET_POWER => Some(Opcode::SetPower),
            OP_LOAD_PIXEL_DATA => Some(Opcode::LoadPixelData),
            OP_COMMIT => Some(Opcode::Commit),
            _ => None,
        }
    }

    /// Encode this opcode as its wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::SetPower => OP_SET_POWER,
            Opcode::LoadPixelData => OP_LOAD_PIXEL_DATA,
            Opcode::Commit => OP_COMMIT,
        }
    }

    /// Payload length following the opcode byte
    ///
    /// `buffer_len` is the firmware's total pixel buffer size in bytes.
    pub fn payload_len(self, buffer_len: usize) -> usize {
        match self {
            Opcode::SetPower => 1,
            Opcode::LoadPixelData => buffer_len,
            Opcode::Commit => 0,
        }
    }
}
