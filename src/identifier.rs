//! Token identifier frame and its CRC-8 validation.
//!
//! A frame is the 64-bit ROM code a token returns to READ ROM: one family
//! byte, a 48-bit serial number and a trailing CRC-8 (Dallas/Maxim 1-Wire
//! polynomial) over the first seven bytes.

use crate::error::DetectorError;
use arrayvec::ArrayString;
use core::fmt::{self, Write};
use crc::{Crc, CRC_8_MAXIM_DOW};

pub const IDENTIFIER_SIZE: usize = 8;
const CHECKED_LEN: usize = IDENTIFIER_SIZE - 1;

const CRC_COMPUTER: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// CRC-8/MAXIM-DOW of `data`.
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    CRC_COMPUTER.checksum(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

/// Check a raw frame. Anything that is not exactly eight bytes is `Invalid`.
pub fn validate(frame: &[u8]) -> Validity {
    if frame.len() != IDENTIFIER_SIZE {
        return Validity::Invalid;
    }
    if crc8(&frame[..CHECKED_LEN]) == frame[CHECKED_LEN] {
        Validity::Valid
    } else {
        Validity::Invalid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identifier([u8; IDENTIFIER_SIZE]);

impl Identifier {
    pub const fn from_bytes(bytes: [u8; IDENTIFIER_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a frame whose check byte is correct for the given family and serial.
    pub fn with_check_byte(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; IDENTIFIER_SIZE];
        bytes[0] = family;
        bytes[1..CHECKED_LEN].copy_from_slice(&serial);
        bytes[CHECKED_LEN] = crc8(&bytes[..CHECKED_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_SIZE] {
        &self.0
    }

    pub fn family_code(&self) -> u8 {
        self.0[0]
    }

    pub fn serial(&self) -> &[u8] {
        &self.0[1..CHECKED_LEN]
    }

    pub fn check_byte(&self) -> u8 {
        self.0[CHECKED_LEN]
    }

    /// A zero family code means the read was spurious or incomplete.
    pub fn is_present(&self) -> bool {
        self.0[0] != 0
    }

    pub fn validity(&self) -> Validity {
        validate(&self.0)
    }

    pub fn verify(&self) -> Result<(), DetectorError> {
        let calculated = crc8(&self.0[..CHECKED_LEN]);
        if calculated == self.check_byte() {
            Ok(())
        } else {
            Err(DetectorError::IdentifierCrcMismatch {
                expected: self.check_byte(),
                calculated,
            })
        }
    }

    /// Hex rendering, most-significant (check) byte first.
    pub fn to_hex(&self) -> ArrayString<{ IDENTIFIER_SIZE * 3 }> {
        let mut out = ArrayString::new();
        for (i, byte) in self.0.iter().rev().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            // 8 bytes * "XX " always fits
            let _ = write!(out, "{:02X}", byte);
        }
        out
    }
}

impl From<[u8; IDENTIFIER_SIZE]> for Identifier {
    fn from(bytes: [u8; IDENTIFIER_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
