use crate::alpha_map::{TrieChar, TERMINATOR};
use crate::node::{NodeId, TailIndex};
use crate::{Entry, Label, TrieState};

/// One level of the depth-first walk: a node and the next code to try out of it.
#[derive(Clone, Copy, Debug)]
struct Frame {
    node: NodeId,
    next_code: TrieChar,
    /// Length of the key path when this node was entered.
    depth: usize,
}

/// Depth-first enumerator over the keys reachable from a [`TrieState`].
///
/// Keys come out in ascending internal-code order, which is ascending
/// external-code order when the alphabet's ranges were registered in
/// increasing order. A shorter key comes before the keys it prefixes.
///
/// The iterator can be driven cursor-style with [`advance`](Self::advance)
/// and [`current`](Self::current), or as a regular [`Iterator`].
#[derive(Debug)]
pub struct TrieIterator<'a, L: Label> {
    start: TrieState<'a>,
    /// Labels prepended to every produced key.
    prefix: Vec<L>,
    /// Set while the single key of a start state inside a tail is pending.
    pending_tail: Option<(TailIndex, usize)>,
    stack: Vec<Frame>,
    /// Internal codes from `start` to the current position.
    path: Vec<TrieChar>,
    current: Option<Entry<L>>,
}

impl<'a, L: Label> TrieIterator<'a, L> {
    pub(crate) fn new(start: TrieState<'a>) -> Self {
        Self::with_prefix(start, Vec::new())
    }

    pub(crate) fn with_prefix(start: TrieState<'a>, prefix: Vec<L>) -> Self {
        let (pending_tail, stack) = match start.tail {
            Some(tail) => (Some(tail), Vec::new()),
            None => (
                None,
                vec![Frame {
                    node: start.node,
                    next_code: TERMINATOR,
                    depth: 0,
                }],
            ),
        };
        Self {
            start,
            prefix,
            pending_tail,
            stack,
            path: Vec::new(),
            current: None,
        }
    }

    /// An iterator that yields nothing.
    pub(crate) fn exhausted(start: TrieState<'a>) -> Self {
        Self {
            start,
            prefix: Vec::new(),
            pending_tail: None,
            stack: Vec::new(),
            path: Vec::new(),
            current: None,
        }
    }

    /// Moves to the next key. Returns `false` once every key has been visited.
    pub fn advance(&mut self) -> bool {
        self.current = None;
        let trie = self.start.trie;

        if let Some((tail, offset)) = self.pending_tail.take() {
            self.path.clear();
            self.path
                .extend_from_slice(trie.tails.suffix(tail).get(offset..).unwrap_or_default());
            self.current = trie.tails.value(tail).and_then(|value| self.entry(value));
            return self.current.is_some();
        }

        while let Some(&Frame {
            node,
            next_code,
            depth,
        }) = self.stack.last()
        {
            let Some((code, child)) = trie.da.next_child(node, next_code) else {
                self.stack.pop();
                continue;
            };
            if let Some(top) = self.stack.last_mut() {
                top.next_code = code + 1;
            }

            self.path.truncate(depth);
            if code != TERMINATOR {
                self.path.push(code);
            }
            match trie.da.node(child).tail() {
                Some(tail) => {
                    self.path.extend_from_slice(trie.tails.suffix(tail));
                    // Keys the label type cannot represent are skipped.
                    self.current = trie.tails.value(tail).and_then(|value| self.entry(value));
                    if self.current.is_some() {
                        return true;
                    }
                }
                None => self.stack.push(Frame {
                    node: child,
                    next_code: TERMINATOR,
                    depth: self.path.len(),
                }),
            }
        }
        false
    }

    /// The key and value at the current position; `None` before the first
    /// successful [`advance`](Self::advance) and after the last one.
    pub fn current(&self) -> Option<&Entry<L>> {
        self.current.as_ref()
    }

    /// The current key, if positioned.
    pub fn key(&self) -> Option<&[L]> {
        self.current.as_ref().map(|e| e.key.as_slice())
    }

    /// The current value, if positioned.
    pub fn value(&self) -> Option<i32> {
        self.current.as_ref().map(|e| e.value)
    }

    fn entry(&self, value: i32) -> Option<Entry<L>> {
        let alpha_map = &self.start.trie.alpha_map;
        let mut key = self.prefix.clone();
        key.reserve(self.path.len());
        for &code in &self.path {
            let c = alpha_map.to_external(code)?;
            key.push(L::try_from(c).ok()?);
        }
        Some(Entry { key, value })
    }
}

impl<L: Label> Iterator for TrieIterator<'_, L> {
    type Item = Entry<L>;

    fn next(&mut self) -> Option<Entry<L>> {
        if self.advance() {
            self.current.clone()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{AlphaMap, Entry, Trie};

    fn entries(trie: &Trie) -> Vec<(String, i32)> {
        trie.iter::<char>()
            .map(|e| (e.key.into_iter().collect(), e.value))
            .collect()
    }

    #[test]
    fn yields_keys_in_order() {
        let mut trie = Trie::new();
        for (i, key) in ["fuga", "hoge", "piyo"].iter().enumerate() {
            trie.store(key.as_bytes(), i as i32).unwrap();
        }
        assert_eq!(
            entries(&trie),
            vec![
                ("fuga".to_string(), 0),
                ("hoge".to_string(), 1),
                ("piyo".to_string(), 2)
            ]
        );
    }

    #[test]
    fn order_does_not_depend_on_insertion_order() {
        let mut trie = Trie::new();
        for (i, key) in ["piyo", "hoge", "fuga", "hog", "ho", "hogera"].iter().enumerate() {
            trie.store(key.as_bytes(), i as i32).unwrap();
        }
        let keys: Vec<String> = entries(&trie).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["fuga", "ho", "hog", "hoge", "hogera", "piyo"]);
    }

    #[test]
    fn cursor_protocol() {
        let mut trie = Trie::new();
        trie.store(b"b", 2).unwrap();
        trie.store(b"a", 1).unwrap();

        let mut it = trie.iter::<u8>();
        assert!(it.current().is_none());
        assert!(it.advance());
        assert_eq!(it.key(), Some(b"a".as_slice()));
        assert_eq!(it.value(), Some(1));
        assert!(it.advance());
        assert_eq!(
            it.current(),
            Some(&Entry {
                key: b"b".to_vec(),
                value: 2
            })
        );
        assert!(!it.advance());
        assert!(it.current().is_none());
        assert!(!it.advance());
    }

    #[test]
    fn empty_trie_yields_nothing() {
        let trie = Trie::new();
        let mut it = trie.iter::<u8>();
        assert!(!it.advance());
        assert!(it.current().is_none());
    }

    #[test]
    fn empty_key_comes_first() {
        let mut trie = Trie::new();
        trie.store(b"a", 1).unwrap();
        trie.store(b"", 0).unwrap();
        let all: Vec<Entry<u8>> = trie.iter().collect();
        assert_eq!(all[0], Entry { key: vec![], value: 0 });
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn keys_are_relative_to_start_state() {
        let mut trie = Trie::new();
        for (i, key) in ["hoge", "hog", "hoa", "fuga"].iter().enumerate() {
            trie.store(key.as_bytes(), i as i32).unwrap();
        }
        let ho = trie.root().walk_key(b"ho").unwrap();
        let rel: Vec<Entry<u8>> = ho.iter().collect();
        assert_eq!(
            rel,
            vec![
                Entry { key: b"a".to_vec(), value: 2 },
                Entry { key: b"g".to_vec(), value: 1 },
                Entry { key: b"ge".to_vec(), value: 0 },
            ]
        );
    }

    #[test]
    fn iterate_from_inside_tail() {
        let mut trie = Trie::new();
        trie.store(b"hoge", 1).unwrap();
        trie.store(b"fuga", 2).unwrap();
        let fu = trie.root().walk_key(b"fu").unwrap();
        assert!(fu.is_single());
        let rel: Vec<Entry<u8>> = fu.iter().collect();
        assert_eq!(rel, vec![Entry { key: b"ga".to_vec(), value: 2 }]);

        let fuga = fu.walk_key(b"ga").unwrap();
        let rel: Vec<Entry<u8>> = fuga.iter().collect();
        assert_eq!(rel, vec![Entry { key: vec![], value: 2 }]);
    }

    #[test]
    fn order_follows_range_registration() {
        // Digits registered after letters sort after them.
        let map = AlphaMap::new()
            .with_range('a' as u32, 'z' as u32)
            .unwrap()
            .with_range('0' as u32, '9' as u32)
            .unwrap();
        let mut trie = Trie::with_alpha_map(map);
        for (i, key) in ["a1", "1a", "b", "a"].iter().enumerate() {
            let key: Vec<char> = key.chars().collect();
            trie.store(&key, i as i32).unwrap();
        }
        let keys: Vec<String> = entries(&trie).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "a1", "b", "1a"]);
    }

    #[test]
    fn unrepresentable_keys_are_skipped() {
        let map = AlphaMap::new()
            .with_range('a' as u32, 'z' as u32)
            .unwrap()
            .with_range(0x3041, 0x3096)
            .unwrap();
        let mut trie = Trie::with_alpha_map(map);
        trie.store(&['a'], 1).unwrap();
        trie.store(&['あ'], 2).unwrap();
        let bytes: Vec<Entry<u8>> = trie.iter().collect();
        assert_eq!(bytes, vec![Entry { key: b"a".to_vec(), value: 1 }]);
        assert_eq!(trie.iter::<char>().count(), 2);
    }
}
