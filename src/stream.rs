//! A byte- and bit-granular input cursor.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The order in which bits are taken out of a byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BitOrder {
    /// The most significant bit of each byte is read first.
    MsbFirst,

    /// The least significant bit of each byte is read first.
    LsbFirst,
}

/// The order in which the bytes of a multi-byte field are combined.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ByteOrder {
    /// Earlier bytes are more significant.
    BigEndian,

    /// Earlier bytes are less significant.
    LittleEndian,
}

/// How integer fields are assembled from the input.
///
/// The default is network order: big-endian bytes, most significant bit
/// first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Endianness {
    /// Bit order within a byte.
    pub bits: BitOrder,

    /// Byte order within a field.
    pub bytes: ByteOrder,
}

impl Endianness {
    /// Big-endian bytes, most significant bit first.
    pub const NETWORK: Endianness = Endianness {
        bits: BitOrder::MsbFirst,
        bytes: ByteOrder::BigEndian,
    };

    /// Little-endian bytes, least significant bit first.
    pub const LITTLE: Endianness = Endianness {
        bits: BitOrder::LsbFirst,
        bytes: ByteOrder::LittleEndian,
    };
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::NETWORK
    }
}

/// A position in an input buffer.
///
/// Cursors are plain values: saving one is a copy, and backtracking is
/// assigning the saved copy back. Once a read has overrun the input, every
/// further read fails until an earlier copy is restored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InputStream<'i> {
    input: &'i [u8],
    index: usize,
    bit_offset: u8,
    endianness: Endianness,
    overrun: bool,
}

impl<'i> InputStream<'i> {
    /// Creates a cursor at the start of `input`.
    pub fn new(input: &'i [u8], endianness: Endianness) -> Self {
        InputStream {
            input,
            index: 0,
            bit_offset: 0,
            endianness,
            overrun: false,
        }
    }

    /// The whole underlying buffer.
    pub fn input(&self) -> &'i [u8] {
        self.input
    }

    /// The current byte index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bits already consumed from the byte at [`index`](Self::index), in `0..8`.
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Absolute position in bits.
    pub fn position_bits(&self) -> u64 {
        self.index as u64 * 8 + u64::from(self.bit_offset)
    }

    /// Total length of the input in bits.
    pub fn len_bits(&self) -> u64 {
        self.input.len() as u64 * 8
    }

    /// Bits left before the end of input.
    pub fn remaining_bits(&self) -> u64 {
        self.len_bits() - self.position_bits()
    }

    /// Whether the cursor sits at the end of the input.
    pub fn is_at_end(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Whether a read has run past the end of the input.
    pub fn is_overrun(&self) -> bool {
        self.overrun
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// The endianness used by integer reads.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Changes the endianness used by subsequent reads.
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// The unread remainder of the input, if the cursor is byte-aligned.
    pub fn rest(&self) -> Option<&'i [u8]> {
        if self.is_byte_aligned() {
            Some(&self.input[self.index..])
        } else {
            None
        }
    }

    /// Skips `count` whole bytes. The cursor must be byte-aligned.
    ///
    /// Returns `false`, and marks the cursor overrun, if fewer than `count`
    /// bytes remain.
    pub fn skip_bytes(&mut self, count: usize) -> bool {
        debug_assert!(self.is_byte_aligned());
        if self.overrun || self.input.len() - self.index < count {
            self.overrun = true;
            return false;
        }
        self.index += count;
        true
    }

    /// Reads the next eight bits, which need not be byte-aligned.
    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bits(8, false).map(|b| b as u8)
    }

    /// Reads `count` bits, `1 <= count <= 64`, as an integer.
    ///
    /// Signed reads are sign-extended from `count` bits and returned as the
    /// two's complement bit pattern. Returns `None`, and marks the cursor
    /// overrun, if fewer than `count` bits remain.
    pub fn read_bits(&mut self, count: u32, signed: bool) -> Option<u64> {
        debug_assert!((1..=64).contains(&count));

        if self.overrun || u64::from(count) > self.remaining_bits() {
            self.overrun = true;
            return None;
        }

        let mut acc = 0u64;
        let mut shift = 0u32;
        let mut left = count;

        while left > 0 {
            let byte = self.input[self.index];
            let avail = 8 - u32::from(self.bit_offset);
            let take = avail.min(left);
            let mask = (1u64 << take) - 1;

            let seg = match self.endianness.bits {
                BitOrder::MsbFirst => u64::from(byte >> (avail - take)) & mask,
                BitOrder::LsbFirst => u64::from(byte >> self.bit_offset) & mask,
            };

            match self.endianness.bytes {
                ByteOrder::BigEndian => acc = (acc << take) | seg,
                ByteOrder::LittleEndian => {
                    acc |= seg << shift;
                    shift += take;
                }
            }

            left -= take;
            self.advance_bits(take);
        }

        if signed && count < 64 && acc & (1 << (count - 1)) != 0 {
            acc |= !0u64 << count;
        }

        Some(acc)
    }

    fn advance_bits(&mut self, count: u32) {
        let total = u32::from(self.bit_offset) + count;
        self.index += (total / 8) as usize;
        self.bit_offset = (total % 8) as u8;
    }
}
