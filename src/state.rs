use crate::alpha_map::{TrieChar, TERMINATOR};
use crate::double_array::ROOT;
use crate::node::{NodeId, TailIndex};
use crate::{AlphaChar, Label, Trie, TrieIterator};

/// A read-only cursor into a [`Trie`].
///
/// A state is either at a double-array node, or inside the tail suffix of the
/// leaf it walked into. Walking is pure: [`walk`](Self::walk) returns a new
/// state and leaves `self` where it was, so any number of states can share one trie.
#[derive(Clone, Copy, Debug)]
pub struct TrieState<'a> {
    pub(crate) trie: &'a Trie,
    pub(crate) node: NodeId,
    /// `(entry, offset)` once the cursor is inside a tail suffix.
    pub(crate) tail: Option<(TailIndex, usize)>,
}

impl PartialEq for TrieState<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.trie, other.trie) && self.node == other.node && self.tail == other.tail
    }
}

impl Eq for TrieState<'_> {}

impl Trie {
    /// Returns a cursor at the root.
    pub fn root(&self) -> TrieState<'_> {
        TrieState {
            trie: self,
            node: ROOT,
            tail: None,
        }
    }
}

impl<'a> TrieState<'a> {
    /// Advances by one external character, or returns `None` if no stored key
    /// continues with it.
    pub fn walk(&self, c: AlphaChar) -> Option<Self> {
        let code = self.trie.alpha_map.to_internal(c)?;
        self.walk_code(code)
    }

    /// Walks a whole key, character by character.
    pub fn walk_key<L: Label>(&self, key: &[L]) -> Option<Self> {
        key.iter()
            .try_fold(*self, |state, &label| state.walk(label.into()))
    }

    pub(crate) fn walk_code(&self, code: TrieChar) -> Option<Self> {
        match self.tail {
            Some((tail, offset)) => {
                let suffix = self.trie.tails.suffix(tail);
                (suffix.get(offset) == Some(&code)).then_some(Self {
                    tail: Some((tail, offset + 1)),
                    ..*self
                })
            }
            None => {
                let t = self.trie.da.walk(self.node, code)?;
                let tail = self.trie.da.node(t).tail().map(|tail| (tail, 0));
                Some(Self {
                    trie: self.trie,
                    node: t,
                    tail,
                })
            }
        }
    }

    /// Returns `true` if [`walk`](Self::walk) with `c` would succeed.
    pub fn is_walkable(&self, c: AlphaChar) -> bool {
        self.walk(c).is_some()
    }

    /// Returns `true` if the cursor is inside a tail suffix, where exactly one
    /// continuation exists.
    pub fn is_single(&self) -> bool {
        self.tail.is_some()
    }

    /// Returns `true` if the characters walked so far form a stored key.
    pub fn is_terminal(&self) -> bool {
        self.value().is_some()
    }

    /// Returns `true` if the cursor is at the end of a stored key that no
    /// other key extends.
    pub fn is_leaf(&self) -> bool {
        self.tail
            .is_some_and(|(tail, offset)| offset == self.trie.tails.suffix(tail).len())
    }

    /// The value of the stored key ending here, if any.
    pub fn value(&self) -> Option<i32> {
        match self.tail {
            Some((tail, offset)) if offset == self.trie.tails.suffix(tail).len() => {
                self.trie.tails.value(tail)
            }
            Some(_) => None,
            None => {
                let t = self.trie.da.walk(self.node, TERMINATOR)?;
                self.trie.tails.value(self.trie.da.node(t).tail()?)
            }
        }
    }

    /// Enumerates every stored key that continues from this state.
    ///
    /// Keys are relative to this state: iterating from [`Trie::root`] yields
    /// whole keys.
    pub fn iter<L: Label>(&self) -> TrieIterator<'a, L> {
        TrieIterator::new(*self)
    }
}
