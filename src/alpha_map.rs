use crate::serial::{ByteReader, ByteSink};
use crate::{FormatError, TrieError};

/// An external character code, as supplied by callers.
pub type AlphaChar = u32;

/// A dense internal character code. Code 0 is the key terminator.
pub(crate) type TrieChar = u32;

/// Internal code that terminates every stored key.
pub(crate) const TERMINATOR: TrieChar = 0;

/// Upper bound on the number of internal codes an alphabet may hold.
///
/// Large enough to register the whole Unicode scalar range.
pub const MAX_ALPHABET_SIZE: u32 = 0x11_0000;

/// A registered `[low, high]` range of external codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AlphaRange {
    /// Lowest external code in the range.
    pub low: AlphaChar,
    /// Highest external code in the range (inclusive).
    pub high: AlphaChar,
    /// Internal code assigned to `low`.
    first_code: TrieChar,
}

impl AlphaRange {
    #[inline]
    fn len(&self) -> u32 {
        self.high - self.low + 1
    }

    #[inline]
    fn last_code(&self) -> TrieChar {
        self.first_code + self.len() - 1
    }
}

/// Maps external character codes to a dense, gap-free internal alphabet.
///
/// Each range registered with [`add_range`](Self::add_range) receives the next
/// contiguous block of internal codes, starting at 1. Code 0 is reserved for
/// the key terminator. Registration order therefore decides internal order,
/// which in turn decides iteration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlphaMap {
    /// Ranges in registration order; `first_code` is strictly increasing.
    ranges: Vec<AlphaRange>,
    /// The same ranges sorted by `low`, for external lookups.
    by_low: Vec<AlphaRange>,
    /// Number of internal codes assigned, excluding the terminator.
    size: u32,
}

impl AlphaMap {
    /// Creates an empty alphabet. Nothing can be stored until a range is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The byte alphabet `[1, 255]`, internal code equal to the byte value.
    pub fn bytes() -> Self {
        let range = AlphaRange {
            low: 1,
            high: 0xFF,
            first_code: 1,
        };
        Self {
            ranges: vec![range],
            by_low: vec![range],
            size: 0xFF,
        }
    }

    /// Registers `[low, high]` and assigns it the next block of internal codes.
    ///
    /// # Errors
    ///
    /// - [`TrieError::InvalidRange`] if `low` is 0, `low > high`, or the
    ///   alphabet would exceed [`MAX_ALPHABET_SIZE`].
    /// - [`TrieError::OverlappingRange`] if the range intersects one already registered.
    pub fn add_range(&mut self, low: AlphaChar, high: AlphaChar) -> Result<(), TrieError> {
        if low == 0 || low > high {
            return Err(TrieError::InvalidRange { low, high });
        }
        let len = (high - low).saturating_add(1);
        if len > MAX_ALPHABET_SIZE - self.size {
            return Err(TrieError::InvalidRange { low, high });
        }
        if self.ranges.iter().any(|r| low <= r.high && r.low <= high) {
            return Err(TrieError::OverlappingRange { low, high });
        }

        let range = AlphaRange {
            low,
            high,
            first_code: self.size + 1,
        };
        self.size += len;
        self.ranges.push(range);
        let pos = self.by_low.partition_point(|r| r.low < low);
        self.by_low.insert(pos, range);
        Ok(())
    }

    /// Builder-style variant of [`add_range`](Self::add_range).
    pub fn with_range(mut self, low: AlphaChar, high: AlphaChar) -> Result<Self, TrieError> {
        self.add_range(low, high)?;
        Ok(self)
    }

    /// Returns the internal code for `c`, or `None` if no range covers it.
    #[inline]
    pub(crate) fn to_internal(&self, c: AlphaChar) -> Option<TrieChar> {
        let pos = self.by_low.partition_point(|r| r.low <= c);
        let range = self.by_low.get(pos.checked_sub(1)?)?;
        (c <= range.high).then(|| range.first_code + (c - range.low))
    }

    /// Returns the external code for an assigned internal code.
    ///
    /// Total over `1..=alphabet_size()`; returns `None` for the terminator and
    /// for codes that were never assigned.
    #[inline]
    pub(crate) fn to_external(&self, code: TrieChar) -> Option<AlphaChar> {
        let pos = self.ranges.partition_point(|r| r.first_code <= code);
        let range = self.ranges.get(pos.checked_sub(1)?)?;
        (code <= range.last_code()).then(|| range.low + (code - range.first_code))
    }

    /// Translates a whole key, failing on the first uncovered code.
    pub(crate) fn map_key<L: crate::Label>(&self, key: &[L]) -> Result<Vec<TrieChar>, TrieError> {
        key.iter()
            .map(|&label| {
                let code: u32 = label.into();
                self.to_internal(code)
                    .ok_or(TrieError::UnmappedCharacter { code })
            })
            .collect()
    }

    /// Returns `true` if `c` is covered by a registered range.
    pub fn contains(&self, c: AlphaChar) -> bool {
        self.to_internal(c).is_some()
    }

    /// The number of internal codes assigned, excluding the terminator.
    #[inline]
    pub fn alphabet_size(&self) -> u32 {
        self.size
    }

    /// The registered ranges in registration order.
    pub fn ranges(&self) -> impl ExactSizeIterator<Item = (AlphaChar, AlphaChar)> + '_ {
        self.ranges.iter().map(|r| (r.low, r.high))
    }

    /// Returns the serialised size in bytes (without allocating).
    #[inline]
    pub(crate) fn serialized_size(&self) -> usize {
        4 + self.ranges.len() * 8
    }

    /// Writes the range count followed by `(low, high)` pairs in registration order.
    pub(crate) fn write_to<W: ByteSink>(&self, out: &mut W) {
        out.put_u32(self.ranges.len() as u32);
        for r in &self.ranges {
            out.put_u32(r.low);
            out.put_u32(r.high);
        }
    }

    /// Rebuilds an alphabet by replaying `add_range` in stored order.
    pub(crate) fn read_from(reader: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let count = reader.read_u32()?;
        reader.ensure_remaining(count as usize, 8)?;
        let mut map = Self::new();
        for _ in 0..count {
            let low = reader.read_u32()?;
            let high = reader.read_u32()?;
            map.add_range(low, high)
                .map_err(|_| FormatError::InvalidRange { low, high })?;
        }
        Ok(map)
    }
}
