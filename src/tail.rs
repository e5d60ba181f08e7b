use crate::alpha_map::{TrieChar, TERMINATOR};
use crate::node::TailIndex;
use crate::serial::{ByteReader, ByteSink};
use crate::FormatError;

/// A key suffix that diverged from every other key, plus the key's value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct TailEntry {
    /// Internal codes, without the terminator.
    suffix: Vec<TrieChar>,
    value: i32,
}

/// Side table of unshared key suffixes, referenced from double-array leaves.
///
/// Entries are never shared between keys and never removed. When a new key
/// diverges inside an entry's suffix, the entry keeps its index and only the
/// part past the divergence point stays in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct TailStore {
    entries: Vec<TailEntry>,
}

impl TailStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Stores a suffix and its value, returning the new entry's index.
    pub(crate) fn append(&mut self, suffix: &[TrieChar], value: i32) -> TailIndex {
        let index = self.entries.len() as TailIndex;
        self.entries.push(TailEntry {
            suffix: suffix.to_vec(),
            value,
        });
        index
    }

    /// The stored suffix, without the terminator. Unknown indices read as empty.
    #[inline]
    pub(crate) fn suffix(&self, index: TailIndex) -> &[TrieChar] {
        self.entries
            .get(index as usize)
            .map(|e| e.suffix.as_slice())
            .unwrap_or_default()
    }

    #[inline]
    pub(crate) fn value(&self, index: TailIndex) -> Option<i32> {
        self.entries.get(index as usize).map(|e| e.value)
    }

    pub(crate) fn set_value(&mut self, index: TailIndex, value: i32) {
        if let Some(e) = self.entries.get_mut(index as usize) {
            e.value = value;
        }
    }

    /// Drops the first `len` codes of an entry's suffix.
    pub(crate) fn consume_prefix(&mut self, index: TailIndex, len: usize) {
        if let Some(e) = self.entries.get_mut(index as usize) {
            e.suffix.drain(..len.min(e.suffix.len()));
        }
    }

    /// Returns the serialised size in bytes (without allocating).
    pub(crate) fn serialized_size(&self) -> usize {
        4 + self
            .entries
            .iter()
            .map(|e| 12 + e.suffix.len() * 4)
            .sum::<usize>()
    }

    /// Writes the entry count, then per entry: suffix length, the codes,
    /// a 0 terminator, and the value.
    pub(crate) fn write_to<W: ByteSink>(&self, out: &mut W) {
        out.put_u32(self.entries.len() as u32);
        for e in &self.entries {
            out.put_u32(e.suffix.len() as u32);
            for &code in &e.suffix {
                out.put_u32(code);
            }
            out.put_u32(TERMINATOR);
            out.put_i32(e.value);
        }
    }

    /// Reads the tail section. Every suffix code must lie in `1..=max_code`.
    pub(crate) fn read_from(
        reader: &mut ByteReader<'_>,
        max_code: TrieChar,
    ) -> Result<Self, FormatError> {
        let count = reader.read_u32()?;
        reader.ensure_remaining(count as usize, 12)?;
        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            let len = reader.read_u32()? as usize;
            reader.ensure_remaining(len, 4)?;
            let mut suffix = Vec::with_capacity(len);
            for _ in 0..len {
                let code = reader.read_u32()?;
                if code == TERMINATOR || code > max_code {
                    return Err(FormatError::InvalidSuffix { index });
                }
                suffix.push(code);
            }
            if reader.read_u32()? != TERMINATOR {
                return Err(FormatError::InvalidSuffix { index });
            }
            let value = reader.read_i32()?;
            entries.push(TailEntry { suffix, value });
        }
        Ok(Self { entries })
    }
}
