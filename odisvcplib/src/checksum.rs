//! The `checksum` module computes the CRC-32 that ODIS datasets carry in their last 4 bytes.
//!
//! The source tooling describes the algorithm as polynomial `0x104C11DB7`, init `0` and
//! xor-out `0xFFFFFFFF` over a reflected register, with the init value given already XORed
//! with the xor-out. That is the standard CRC-32 (ISO-HDLC, as used by zlib and Ethernet).

use crc::{CRC_32_ISO_HDLC, Crc};

/// Polynomial including the implicit top bit
pub const POLYNOMIAL: u64 = 0x1_04C1_1DB7;
/// Initial value as stated by the dataset tooling (pre-XORed with [`XOR_OUT`])
pub const INIT_VALUE: u32 = 0;
pub const XOR_OUT: u32 = 0xFFFF_FFFF;
/// Number of trailing payload bytes occupied by the checksum
pub const FOOTER_LEN: usize = 4;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the dataset CRC-32 over `bytes`.
///
/// # Example
/// ```
/// use odisvcplib::checksum;
///
/// assert_eq!(checksum::compute(b"123456789"), 0xCBF4_3926);
/// ```
#[must_use]
pub fn compute(bytes: &[u8]) -> u32 {
    CRC32.checksum(bytes)
}

/// Encode a checksum the way it is stored in the payload footer.
#[must_use]
pub const fn to_le_bytes(checksum: u32) -> [u8; FOOTER_LEN] {
    checksum.to_le_bytes()
}
