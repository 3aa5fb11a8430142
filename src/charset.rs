//! A set of byte values.

use std::{fmt, ops::RangeInclusive};

/// A set of byte values, stored as a 256-bit map.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteSet {
    bits: [u64; 4],
}

impl ByteSet {
    /// The empty set.
    pub const fn new() -> Self {
        ByteSet { bits: [0; 4] }
    }

    /// The set of every byte value.
    pub const fn full() -> Self {
        ByteSet { bits: [!0; 4] }
    }

    /// The set containing exactly `b`.
    pub fn single(b: u8) -> Self {
        let mut set = ByteSet::new();
        set.insert(b);
        set
    }

    /// The set of bytes in `range`.
    pub fn range(range: RangeInclusive<u8>) -> Self {
        range.collect()
    }

    /// Adds `b` to the set.
    pub fn insert(&mut self, b: u8) {
        self.bits[usize::from(b >> 6)] |= 1 << (b & 63);
    }

    /// Whether `b` is in the set.
    pub fn contains(&self, b: u8) -> bool {
        self.bits[usize::from(b >> 6)] & (1 << (b & 63)) != 0
    }

    /// The complement of this set.
    pub fn complement(&self) -> Self {
        let [a, b, c, d] = self.bits;
        ByteSet {
            bits: [!a, !b, !c, !d],
        }
    }

    /// The number of byte values in the set.
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == [0; 4]
    }

    /// The members of the set in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |b| self.contains(*b))
    }
}

impl FromIterator<u8> for ByteSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = ByteSet::new();
        for b in iter {
            set.insert(b);
        }
        set
    }
}

impl<'s> From<&'s [u8]> for ByteSet {
    fn from(bytes: &'s [u8]) -> Self {
        bytes.iter().copied().collect()
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Print as a list of inclusive ranges, e.g. {0x30-0x39, 0x41}.
        let mut runs: Vec<(u8, u8)> = Vec::new();
        for b in self.iter() {
            match runs.last_mut() {
                Some((_, hi)) if *hi as u16 + 1 == b as u16 => *hi = b,
                _ => runs.push((b, b)),
            }
        }

        write!(f, "{{")?;
        for (i, (lo, hi)) in runs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lo == hi {
                write!(f, "{:#04x}", lo)?;
            } else {
                write!(f, "{:#04x}-{:#04x}", lo, hi)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let digits = ByteSet::range(b'0'..=b'9');
        assert_eq!(digits.len(), 10);
        assert!(digits.contains(b'5'));
        assert!(!digits.contains(b'a'));

        let not_digits = digits.complement();
        assert_eq!(not_digits.len(), 246);
        assert!(not_digits.contains(0xff));
        assert!(!not_digits.contains(b'0'));

        assert!(ByteSet::new().is_empty());
        assert_eq!(ByteSet::full().len(), 256);
        assert_eq!(ByteSet::from(&b"aab"[..]).len(), 2);
    }

    #[test]
    fn test_debug() {
        let mut set = ByteSet::range(0x30..=0x39);
        set.insert(0x41);
        assert_eq!(format!("{:?}", set), "{0x30-0x39, 0x41}");
        assert_eq!(format!("{:?}", ByteSet::single(0xff)), "{0xff}");
    }
}
