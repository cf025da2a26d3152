//! Frame checksum algorithms.
//!
//! Both algorithms cover the bytes from the length field through the end of
//! the payload. The sync byte is never included.

/// CRC-14 seed value.
pub const CRC14_SEED: u16 = 0x3FFF;

/// CRC-14 feedback polynomial (reflected form).
pub const CRC14_POLY: u16 = 0x2001;

/// CRC-14 result mask.
pub const CRC14_MASK: u16 = 0x3FFF;

/// Offset added to each transmitted 7-bit CRC field.
///
/// Keeps both trailer characters above the `'!'` sync byte (0x21).
pub const CRC14_FIELD_OFFSET: u8 = 34;

/// A computed checksum: one or two trailer bytes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum {
    bytes: [u8; 2],
    len: u8,
}

impl Checksum {
    /// A single-byte checksum.
    pub const fn one(byte: u8) -> Self {
        Self {
            bytes: [byte, 0],
            len: 1,
        }
    }

    /// A two-byte checksum, in transmission order.
    pub const fn two(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
        }
    }

    /// Trailer bytes in transmission order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of trailer bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; a checksum has at least one byte.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Checksum algorithm bound to a protocol variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStrategy {
    /// Sum of all bytes modulo 256; one trailer byte.
    Modulo256,
    /// 14-bit CRC split into two 7-bit fields, each shifted up by `offset`.
    Crc14Custom { offset: u8 },
}

impl ChecksumStrategy {
    /// CRC-14 with the standard +34 field offset.
    pub const fn crc14() -> Self {
        ChecksumStrategy::Crc14Custom {
            offset: CRC14_FIELD_OFFSET,
        }
    }

    /// Number of trailer bytes this strategy produces.
    pub const fn width(self) -> usize {
        match self {
            ChecksumStrategy::Modulo256 => 1,
            ChecksumStrategy::Crc14Custom { .. } => 2,
        }
    }

    /// Compute the trailer for `data`.
    pub fn compute(self, data: &[u8]) -> Checksum {
        match self {
            ChecksumStrategy::Modulo256 => Checksum::one(modulo256(data)),
            ChecksumStrategy::Crc14Custom { offset } => {
                let [low, high] = crc14_fields(crc14(data), offset);
                Checksum::two(low, high)
            }
        }
    }

    /// Check `trailer` against the checksum of `data`.
    ///
    /// A trailer of the wrong width never verifies.
    pub fn verify(self, data: &[u8], trailer: &[u8]) -> bool {
        self.compute(data).as_bytes() == trailer
    }
}

/// Sum of all bytes, wrapping at 256.
pub fn modulo256(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Raw 14-bit CRC of `data`.
pub fn crc14(data: &[u8]) -> u16 {
    let mut crc = CRC14_SEED;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC14_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc & CRC14_MASK
}

/// Split a 14-bit CRC into `[low7 + offset, high7 + offset]`.
pub fn crc14_fields(crc: u16, offset: u8) -> [u8; 2] {
    let low = (crc & 0x7F) as u8;
    let high = ((crc >> 7) & 0x7F) as u8;
    [low.wrapping_add(offset), high.wrapping_add(offset)]
}
