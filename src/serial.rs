use crate::double_array::DoubleArray;
use crate::tail::TailStore;
use crate::{AlphaMap, FormatError, Trie, TrieError};

const MAGIC: &[u8; 4] = b"DATR";
const VERSION: u32 = 1;

/// magic (4) + version (4) + total length (4)
pub(crate) const HEADER_SIZE: usize = 12;

/// Little-endian cursor over a serialized trie image.
pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self.pos.checked_add(n).ok_or(FormatError::Truncated)?;
        let chunk = self.bytes.get(self.pos..end).ok_or(FormatError::Truncated)?;
        self.pos = end;
        Ok(chunk)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, FormatError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, FormatError> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Fails early when fewer than `count * width` bytes remain, before any
    /// allocation sized from untrusted counts.
    pub(crate) fn ensure_remaining(&self, count: usize, width: usize) -> Result<(), FormatError> {
        let needed = count.checked_mul(width).ok_or(FormatError::Truncated)?;
        if self.bytes.len() - self.pos < needed {
            return Err(FormatError::Truncated);
        }
        Ok(())
    }
}

/// Destination for the little-endian image.
pub(crate) trait ByteSink {
    fn put(&mut self, bytes: &[u8]);

    fn put_u32(&mut self, v: u32) {
        self.put(&v.to_le_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.put(&v.to_le_bytes());
    }
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Writes into a caller buffer that is known to hold the whole image.
struct SliceSink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl ByteSink for SliceSink<'_> {
    fn put(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }
}

impl Trie {
    /// Returns the size in bytes of [`dump`](Self::dump)'s output.
    pub fn serialized_size(&self) -> usize {
        HEADER_SIZE
            + self.alpha_map.serialized_size()
            + self.da.serialized_size()
            + self.tails.serialized_size()
    }

    /// Serializes the trie into a new byte vector.
    ///
    /// Layout (all integers little-endian, no padding):
    ///
    /// ```text
    /// header:    "DATR" | version: u32 | total length: u32
    /// alphabet:  range count: u32 | (low: u32, high: u32)*
    /// cells:     cell count: u32  | (base: i32, check: i32)*
    /// tails:     entry count: u32 | (len: u32, code: u32 * len, 0: u32, value: i32)*
    /// ```
    ///
    /// A leaf cell stores `-(tail index + 1)` as its base.
    pub fn dump(&self) -> Vec<u8> {
        let total = self.serialized_size();
        let mut buf = Vec::with_capacity(total);
        self.write_image(&mut buf, total);
        debug_assert_eq!(buf.len(), total);
        tracing::debug!(
            bytes = total,
            cells = self.da.len(),
            keys = self.tails.len(),
            "dumped trie"
        );
        buf
    }

    /// Serializes the trie into a caller-provided buffer and returns the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::BufferTooSmall`] without writing anything if `dest`
    /// is shorter than [`serialized_size`](Self::serialized_size).
    pub fn dump_into(&self, dest: &mut [u8]) -> Result<usize, TrieError> {
        let required = self.serialized_size();
        if dest.len() < required {
            return Err(TrieError::BufferTooSmall {
                required,
                available: dest.len(),
            });
        }
        let mut sink = SliceSink {
            buf: &mut dest[..required],
            pos: 0,
        };
        self.write_image(&mut sink, required);
        debug_assert_eq!(sink.pos, required);
        tracing::debug!(bytes = required, available = dest.len(), "dumped trie into buffer");
        Ok(required)
    }

    fn write_image<W: ByteSink>(&self, out: &mut W, total: usize) {
        out.put(MAGIC);
        out.put_u32(VERSION);
        out.put_u32(total as u32);
        self.alpha_map.write_to(out);
        self.da.write_to(out);
        self.tails.write_to(out);
    }

    /// Rebuilds a trie from the output of [`dump`](Self::dump).
    ///
    /// Bytes past the declared total length are ignored, so a fixed-size
    /// buffer filled by [`dump_into`](Self::dump_into) can be passed whole.
    ///
    /// # Errors
    ///
    /// Returns [`TrieError::InvalidFormat`] on any structural inconsistency;
    /// no partially built trie is returned.
    pub fn parse(bytes: &[u8]) -> Result<Self, TrieError> {
        Self::parse_image(bytes).map_err(|e| {
            tracing::debug!(error = %e, len = bytes.len(), "rejected trie image");
            TrieError::from(e)
        })
    }

    fn parse_image(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::Truncated);
        }
        if &bytes[0..4] != MAGIC {
            return Err(FormatError::InvalidMagic);
        }

        let mut header = ByteReader::new(&bytes[4..HEADER_SIZE]);
        let version = header.read_u32()?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let declared = header.read_u32()? as usize;
        if declared > bytes.len() {
            return Err(FormatError::Truncated);
        }

        let mut reader = ByteReader::new(&bytes[..declared]);
        reader.pos = HEADER_SIZE;
        let alpha_map = AlphaMap::read_from(&mut reader)?;
        let max_code = alpha_map.alphabet_size();
        let da = DoubleArray::read_from(&mut reader, max_code)?;
        let tails = TailStore::read_from(&mut reader, max_code)?;
        da.validate(&tails)?;

        if reader.position() != declared {
            return Err(FormatError::LengthMismatch {
                declared,
                actual: reader.position(),
            });
        }

        tracing::debug!(
            bytes = declared,
            cells = da.len(),
            keys = tails.len(),
            "parsed trie"
        );
        Ok(Self::from_parts(alpha_map, da, tails))
    }
}
