//! A dynamic double-array trie with a tail suffix store.
//!
//! This crate provides [`Trie`], an ordered map from sequences of character
//! codes to `i32` values. Transitions live in a packed `base`/`check` array;
//! once a key no longer shares a prefix with any other key, its remaining
//! characters are kept in a separate tail store instead of one node each.
//! The whole structure can be written to and rebuilt from a single byte buffer.
//!
//! # Quick start
//!
//! ```
//! use datrie::Trie;
//!
//! let mut trie = Trie::new();
//! trie.store(b"hoge", 1).unwrap();
//! trie.store(b"hog", 2).unwrap();
//! assert_eq!(trie.retrieve(b"hoge"), Some(1));
//! assert_eq!(trie.retrieve(b"ho"), None);
//!
//! let copy = Trie::parse(&trie.dump()).unwrap();
//! let keys: Vec<Vec<u8>> = copy.iter::<u8>().map(|e| e.key).collect();
//! assert_eq!(keys, vec![b"hog".to_vec(), b"hoge".to_vec()]);
//! ```
//!
//! # Concurrency
//!
//! `Trie` has no interior mutability. [`Trie::store`] takes `&mut self`, so
//! cursors ([`TrieState`]) and iterators ([`TrieIterator`]), which borrow the
//! trie, cannot outlive or overlap a write.

#![warn(missing_docs)]

mod alpha_map;
mod double_array;
mod iter;
mod label;
mod node;
mod search;
mod serial;
mod state;
mod store;
mod tail;

#[cfg(test)]
mod proptests;

pub use alpha_map::{AlphaChar, AlphaMap, MAX_ALPHABET_SIZE};
pub use iter::TrieIterator;
pub use label::Label;
pub use search::{Entry, PrefixMatch};
pub use state::TrieState;

use double_array::DoubleArray;
use tail::TailStore;

/// Errors that can occur during trie operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TrieError {
    /// A key contains a code outside every registered alphabet range.
    #[error("character code {code:#x} is not covered by the alphabet")]
    UnmappedCharacter {
        /// The offending external code.
        code: AlphaChar,
    },
    /// A range intersects one that is already registered.
    #[error("range [{low:#x}, {high:#x}] overlaps a registered range")]
    OverlappingRange {
        /// Lowest code of the rejected range.
        low: AlphaChar,
        /// Highest code of the rejected range.
        high: AlphaChar,
    },
    /// A range is empty, starts at the reserved code 0, or overflows the alphabet.
    #[error("invalid alphabet range [{low:#x}, {high:#x}]")]
    InvalidRange {
        /// Lowest code of the rejected range.
        low: AlphaChar,
        /// Highest code of the rejected range.
        high: AlphaChar,
    },
    /// A fixed-size dump destination cannot hold the serialized trie.
    #[error("buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall {
        /// Bytes the serialized trie needs.
        required: usize,
        /// Bytes the destination offers.
        available: usize,
    },
    /// Serialized input is corrupt or inconsistent.
    #[error("invalid trie image: {0}")]
    InvalidFormat(#[from] FormatError),
    /// No free base could be found for a node's children.
    #[error("no free base for the children of node {node}")]
    RelocationFailure {
        /// The node whose children could not be placed.
        node: u32,
    },
}

/// Why a serialized trie image was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// The image does not start with the expected magic bytes.
    #[error("invalid magic number")]
    InvalidMagic,
    /// The image uses a format version this crate does not read.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    /// The image ends before a section or the declared length does.
    #[error("truncated data")]
    Truncated,
    /// The sections do not add up to the declared total length.
    #[error("sections end at byte {actual}, header declares {declared}")]
    LengthMismatch {
        /// Total length from the header.
        declared: usize,
        /// Where the last section actually ended.
        actual: usize,
    },
    /// An alphabet range is invalid or overlaps an earlier one.
    #[error("invalid alphabet range [{low:#x}, {high:#x}]")]
    InvalidRange {
        /// Lowest code of the range.
        low: u32,
        /// Highest code of the range.
        high: u32,
    },
    /// The cell table is too short or its reserved cells are malformed.
    #[error("missing or malformed root cell")]
    MissingRoot,
    /// A cell's `check` is not a valid node id.
    #[error("cell {index} has check {check} outside the array")]
    CheckOutOfRange {
        /// The cell.
        index: u32,
        /// Its raw `check` value.
        check: i32,
    },
    /// A cell's `base` points at a reserved cell or past the end of the array.
    #[error("cell {index} has base {base} outside the allocatable cells")]
    BaseOutOfRange {
        /// The cell.
        index: u32,
        /// Its raw `base` value.
        base: i32,
    },
    /// An occupied cell has no parent.
    #[error("cell {index} is occupied but has no parent")]
    OrphanCell {
        /// The cell.
        index: u32,
    },
    /// An occupied cell's parent is not an inner node with children, or the
    /// cell does not sit at the parent's base plus an alphabet code.
    #[error("cell {index} is not a child of the node its check names")]
    MisplacedCell {
        /// The cell.
        index: u32,
    },
    /// An occupied cell cannot be reached from the root.
    #[error("cell {index} is unreachable from the root")]
    UnreachableCell {
        /// The cell.
        index: u32,
    },
    /// The transition on the terminator code does not lead to a leaf with an
    /// empty suffix.
    #[error("cell {index} is a malformed key terminator")]
    InvalidTerminal {
        /// The cell reached through the terminator.
        index: u32,
    },
    /// Two leaves reference the same tail entry.
    #[error("tail entry {tail} is referenced by more than one leaf")]
    SharedTail {
        /// The tail entry.
        tail: u32,
    },
    /// A tail entry is referenced by no leaf.
    #[error("tail entry {tail} is referenced by no leaf")]
    UnusedTail {
        /// The tail entry.
        tail: u32,
    },
    /// A leaf references a tail entry that does not exist.
    #[error("cell {index} references missing tail entry {tail}")]
    TailOutOfRange {
        /// The leaf cell.
        index: u32,
        /// The referenced tail entry.
        tail: u32,
    },
    /// A tail suffix holds a code outside the alphabet or lacks its terminator.
    #[error("tail entry {index} has a malformed suffix")]
    InvalidSuffix {
        /// The tail entry.
        index: u32,
    },
}

/// A double-array trie mapping character-code keys to `i32` values.
///
/// The trie owns its alphabet, transition table and tail store. Keys may be
/// given as any [`Label`] slice (`&[u8]`, `&[char]`, `&[u32]`); every code
/// must be covered by the alphabet and none may be 0.
#[derive(Clone, Debug)]
pub struct Trie {
    pub(crate) alpha_map: AlphaMap,
    pub(crate) da: DoubleArray,
    pub(crate) tails: TailStore,
}

impl Trie {
    /// Creates an empty trie over the byte alphabet `[1, 255]`.
    pub fn new() -> Self {
        Self::with_alpha_map(AlphaMap::bytes())
    }

    /// Creates an empty trie over the given alphabet.
    pub fn with_alpha_map(alpha_map: AlphaMap) -> Self {
        let da = DoubleArray::new(alpha_map.alphabet_size());
        Self {
            alpha_map,
            da,
            tails: TailStore::new(),
        }
    }

    /// Creates a trie from already-validated parts.
    pub(crate) fn from_parts(alpha_map: AlphaMap, da: DoubleArray, tails: TailStore) -> Self {
        Self {
            alpha_map,
            da,
            tails,
        }
    }

    /// The alphabet this trie was created with.
    pub fn alpha_map(&self) -> &AlphaMap {
        &self.alpha_map
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    /// Returns `true` if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.tails.len() == 0
    }

    /// Returns the number of cells in the transition table, free ones included.
    pub fn num_cells(&self) -> usize {
        self.da.len()
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}
