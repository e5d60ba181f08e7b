use crate::alpha_map::TERMINATOR;
use crate::double_array::ROOT;
use crate::node::TailIndex;
use crate::{Label, Trie, TrieIterator, TrieState};

/// Result of a common prefix search match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMatch {
    /// Length of the matched prefix (in labels).
    pub len: usize,
    /// The value stored under the matched key.
    pub value: i32,
}

/// A stored key and its value, as produced by iteration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<L> {
    /// The key, relative to the state iteration started from.
    pub key: Vec<L>,
    /// The value stored under the key.
    pub value: i32,
}

impl Trie {
    /// Returns the value stored under `key`.
    ///
    /// Returns `None` for keys that were never stored, including keys with
    /// codes outside the alphabet.
    pub fn retrieve<L: Label>(&self, key: &[L]) -> Option<i32> {
        let mut s = ROOT;
        for (i, &label) in key.iter().enumerate() {
            if let Some(tail) = self.da.node(s).tail() {
                return self.match_tail(tail, &key[i..]);
            }
            let code = self.alpha_map.to_internal(label.into())?;
            s = self.da.walk(s, code)?;
        }
        if let Some(tail) = self.da.node(s).tail() {
            return self.match_tail::<L>(tail, &[]);
        }
        let t = self.da.walk(s, TERMINATOR)?;
        self.match_tail::<L>(self.da.node(t).tail()?, &[])
    }

    /// Returns `true` if `key` is stored.
    pub fn contains<L: Label>(&self, key: &[L]) -> bool {
        self.retrieve(key).is_some()
    }

    /// Compares the remaining labels of a key against a tail suffix.
    fn match_tail<L: Label>(&self, tail: TailIndex, rest: &[L]) -> Option<i32> {
        let suffix = self.tails.suffix(tail);
        if suffix.len() != rest.len() {
            return None;
        }
        let same = suffix
            .iter()
            .zip(rest)
            .all(|(&code, &label)| self.alpha_map.to_internal(label.into()) == Some(code));
        if same {
            self.tails.value(tail)
        } else {
            None
        }
    }

    /// Common prefix search. Returns an iterator over all prefixes of `query`
    /// that exist as keys in the trie, shortest first.
    pub fn common_prefix_search<'a, L: Label>(
        &'a self,
        query: &'a [L],
    ) -> impl Iterator<Item = PrefixMatch> + 'a {
        CommonPrefixIter {
            state: Some(self.root()),
            query,
            pos: 0,
        }
    }

    /// Predictive search. Returns an iterator over all keys that start with
    /// `prefix`, in ascending internal-code order. Keys are returned whole.
    pub fn predictive_search<L: Label>(&self, prefix: &[L]) -> TrieIterator<'_, L> {
        match self.root().walk_key(prefix) {
            Some(state) => TrieIterator::with_prefix(state, prefix.to_vec()),
            None => TrieIterator::exhausted(self.root()),
        }
    }

    /// Enumerates every stored key in ascending internal-code order.
    pub fn iter<L: Label>(&self) -> TrieIterator<'_, L> {
        self.root().iter()
    }
}

struct CommonPrefixIter<'a, L: Label> {
    /// `None` once the query can no longer be followed.
    state: Option<TrieState<'a>>,
    query: &'a [L],
    pos: usize,
}

impl<L: Label> Iterator for CommonPrefixIter<'_, L> {
    type Item = PrefixMatch;

    fn next(&mut self) -> Option<PrefixMatch> {
        while let Some(state) = self.state {
            let result = state.value().map(|value| PrefixMatch {
                len: self.pos,
                value,
            });
            self.state = self
                .query
                .get(self.pos)
                .and_then(|&label| state.walk(label.into()));
            self.pos += 1;
            if result.is_some() {
                return result;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlphaMap;

    fn build(keys: &[&[u8]]) -> Trie {
        let mut trie = Trie::new();
        for (i, key) in keys.iter().enumerate() {
            trie.store(key, i as i32).unwrap();
        }
        trie
    }

    // === retrieve tests ===

    #[test]
    fn retrieve_found() {
        let trie = build(&[b"abc", b"abd", b"xyz"]);
        assert_eq!(trie.retrieve(b"abc"), Some(0));
        assert_eq!(trie.retrieve(b"abd"), Some(1));
        assert_eq!(trie.retrieve(b"xyz"), Some(2));
    }

    #[test]
    fn retrieve_not_found() {
        let trie = build(&[b"abc", b"abd"]);
        assert_eq!(trie.retrieve(b"ab"), None);
        assert_eq!(trie.retrieve(b"abcd"), None);
        assert_eq!(trie.retrieve(b"zzz"), None);
        assert_eq!(trie.retrieve(b""), None);
    }

    #[test]
    fn retrieve_inside_tail() {
        // A lone key keeps everything after its first character in the tail.
        let trie = build(&[b"abcdef"]);
        assert_eq!(trie.retrieve(b"abcdef"), Some(0));
        assert_eq!(trie.retrieve(b"abcde"), None);
        assert_eq!(trie.retrieve(b"abcdefg"), None);
        assert_eq!(trie.retrieve(b"abcdeg"), None);
        assert_eq!(trie.retrieve(b"a"), None);
    }

    #[test]
    fn retrieve_empty_trie() {
        let trie = Trie::new();
        assert_eq!(trie.retrieve(b"abc"), None);
        assert!(!trie.contains(b""));
    }

    #[test]
    fn retrieve_unmapped_is_a_miss() {
        let map = AlphaMap::new().with_range('a' as u32, 'z' as u32).unwrap();
        let mut trie = Trie::with_alpha_map(map);
        trie.store(&['a', 'b'], 1).unwrap();
        let before = trie.dump();
        assert_eq!(trie.retrieve(&['a', 'B']), None);
        assert_eq!(trie.retrieve(&['Z']), None);
        assert_eq!(trie.dump(), before);
    }

    #[test]
    fn retrieve_all_keys_round_trip() {
        let keys: Vec<&[u8]> = vec![b"a", b"ab", b"abc", b"b", b"bc", b"bcd"];
        let trie = build(&keys);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(
                trie.retrieve(key),
                Some(i as i32),
                "key {:?} should have value {}",
                std::str::from_utf8(key).unwrap(),
                i
            );
        }
    }

    // === common_prefix_search tests ===

    #[test]
    fn common_prefix_search_basic() {
        let trie = build(&[b"a", b"ab", b"abc", b"b"]);
        let results: Vec<PrefixMatch> = trie.common_prefix_search(b"abcd").collect();
        assert_eq!(
            results,
            vec![
                PrefixMatch { len: 1, value: 0 },
                PrefixMatch { len: 2, value: 1 },
                PrefixMatch { len: 3, value: 2 },
            ]
        );
    }

    #[test]
    fn common_prefix_search_through_tail() {
        let trie = build(&[b"ab", b"abcdef"]);
        let results: Vec<PrefixMatch> = trie.common_prefix_search(b"abcdefgh").collect();
        assert_eq!(
            results,
            vec![
                PrefixMatch { len: 2, value: 0 },
                PrefixMatch { len: 6, value: 1 },
            ]
        );
    }

    #[test]
    fn common_prefix_search_empty_key() {
        let trie = build(&[b"", b"a"]);
        let results: Vec<PrefixMatch> = trie.common_prefix_search(b"ab").collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], PrefixMatch { len: 0, value: 0 });
    }

    #[test]
    fn common_prefix_search_no_match() {
        let trie = build(&[b"abc"]);
        assert_eq!(trie.common_prefix_search(b"xyz").count(), 0);
        assert_eq!(trie.common_prefix_search(b"").count(), 0);
        assert_eq!(trie.common_prefix_search(b"ab").count(), 0);
    }

    // === predictive_search tests ===

    #[test]
    fn predictive_search_returns_whole_keys() {
        let trie = build(&[b"a", b"ab", b"abc", b"b", b"bc"]);
        let results: Vec<Entry<u8>> = trie.predictive_search(b"a").collect();
        assert_eq!(
            results,
            vec![
                Entry { key: b"a".to_vec(), value: 0 },
                Entry { key: b"ab".to_vec(), value: 1 },
                Entry { key: b"abc".to_vec(), value: 2 },
            ]
        );
    }

    #[test]
    fn predictive_search_prefix_inside_tail() {
        let trie = build(&[b"hoge", b"fuga"]);
        let results: Vec<Entry<u8>> = trie.predictive_search(b"hog").collect();
        assert_eq!(results, vec![Entry { key: b"hoge".to_vec(), value: 0 }]);
    }

    #[test]
    fn predictive_search_no_match() {
        let trie = build(&[b"abc"]);
        assert_eq!(trie.predictive_search(b"abd").count(), 0);
        assert_eq!(trie.predictive_search(b"x").count(), 0);
    }

    #[test]
    fn predictive_search_empty_prefix_is_full_iteration() {
        let trie = build(&[b"b", b"a"]);
        let keys: Vec<Vec<u8>> = trie.predictive_search::<u8>(&[]).map(|e| e.key).collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
