use crate::alpha_map::{TrieChar, TERMINATOR};
use crate::double_array::ROOT;
use crate::node::{NodeId, TailIndex};
use crate::{Label, Trie, TrieError};

impl Trie {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - [`TrieError::UnmappedCharacter`] if a code of `key` is outside the
    ///   alphabet. The trie is left untouched.
    /// - [`TrieError::RelocationFailure`] if the transition table cannot place
    ///   a node's children.
    pub fn store<L: Label>(&mut self, key: &[L], value: i32) -> Result<(), TrieError> {
        let codes = self.alpha_map.map_key(key)?;

        let mut s = ROOT;
        // Index of the next code to consume; `codes.len()` stands for the terminator.
        let mut i = 0;
        loop {
            if let Some(tail) = self.da.node(s).tail() {
                let rest = codes.get(i..).unwrap_or_default();
                return self.branch_in_tail(s, tail, rest, value);
            }
            let c = codes.get(i).copied().unwrap_or(TERMINATOR);
            match self.da.walk(s, c) {
                Some(t) => {
                    s = t;
                    i += 1;
                }
                None => {
                    let t = self.da.insert_branch(s, c)?;
                    let rest = codes.get(i + 1..).unwrap_or_default();
                    let tail = self.tails.append(rest, value);
                    self.da.mark_leaf(t, tail);
                    return Ok(());
                }
            }
        }
    }

    /// Handles a key that reached the leaf `s`, whose tail entry holds the
    /// suffix of an existing key. `rest` is what remains of the new key.
    ///
    /// On an exact match the value is replaced. Otherwise the shared prefix
    /// is pushed back into the double-array as a chain of nodes, ending in
    /// a branch with one leaf for each key.
    fn branch_in_tail(
        &mut self,
        s: NodeId,
        tail: TailIndex,
        rest: &[TrieChar],
        value: i32,
    ) -> Result<(), TrieError> {
        let suffix = self.tails.suffix(tail);
        if suffix == rest {
            self.tails.set_value(tail, value);
            return Ok(());
        }

        let shared = suffix
            .iter()
            .zip(rest)
            .take_while(|(a, b)| a == b)
            .count();
        let old_code = suffix.get(shared).copied().unwrap_or(TERMINATOR);
        let new_code = rest.get(shared).copied().unwrap_or(TERMINATOR);
        let chain = suffix[..shared].to_vec();

        self.da.clear_leaf(s);
        let new_leaf = match self.grow_branch(s, &chain, old_code, new_code, tail) {
            Ok(leaf) => leaf,
            Err(e) => {
                // Put the existing key back the way it was.
                self.da.release_subtree(s);
                self.da.mark_leaf(s, tail);
                return Err(e);
            }
        };
        self.tails.consume_prefix(tail, shared + 1);

        let new_tail = self
            .tails
            .append(rest.get(shared + 1..).unwrap_or_default(), value);
        self.da.mark_leaf(new_leaf, new_tail);
        Ok(())
    }

    /// Builds the chain of shared codes under the cleared leaf `s` and the two
    /// branch points at its end. The old key's leaf is marked with `tail`
    /// before the second insertion, which may relocate it along with its
    /// siblings. Returns the new key's leaf.
    fn grow_branch(
        &mut self,
        s: NodeId,
        chain: &[TrieChar],
        old_code: TrieChar,
        new_code: TrieChar,
        tail: TailIndex,
    ) -> Result<NodeId, TrieError> {
        let mut s = s;
        for &c in chain {
            s = self.da.insert_branch(s, c)?;
        }
        let old_leaf = self.da.insert_branch(s, old_code)?;
        self.da.mark_leaf(old_leaf, tail);
        self.da.insert_branch(s, new_code)
    }
}
