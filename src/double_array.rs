use crate::alpha_map::{TrieChar, TERMINATOR};
use crate::node::{Node, NodeId, NodeKind, TailIndex};
use crate::serial::{ByteReader, ByteSink};
use crate::tail::TailStore;
use crate::{FormatError, TrieError};

/// Id of the root node. Cell 0 is a never-used sentinel.
pub(crate) const ROOT: NodeId = 1;

/// Lowest id the allocator hands out.
const FIRST_CELL: NodeId = 2;

/// Largest id a serialized `base`/`check` can express.
const MAX_CELL: u32 = i32::MAX as u32;

/// The `base`/`check` transition table.
///
/// From node `s` on internal code `c` the candidate target is `base(s) + c`;
/// the transition exists iff that cell's `check` equals `s`. Collisions on
/// insertion are resolved by relocating all children of `s` to a new base.
#[derive(Clone, Debug)]
pub(crate) struct DoubleArray {
    cells: Vec<Node>,
    /// Highest internal code (the alphabet size); codes run `0..=max_code`.
    max_code: TrieChar,
    /// Every cell in `FIRST_CELL..free_hint` is occupied.
    free_hint: NodeId,
    /// Highest id a child may be placed at.
    cell_limit: NodeId,
}

impl DoubleArray {
    pub(crate) fn new(max_code: TrieChar) -> Self {
        let mut cells = vec![Node::default(); FIRST_CELL as usize];
        cells[ROOT as usize].kind = NodeKind::Internal { base: 0 };
        Self {
            cells,
            max_code,
            free_hint: FIRST_CELL,
            cell_limit: MAX_CELL,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_cell_limit(&mut self, limit: NodeId) {
        self.cell_limit = limit;
    }

    /// Number of cells, free ones included.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub(crate) fn node(&self, s: NodeId) -> Node {
        self.cells.get(s as usize).copied().unwrap_or_default()
    }

    /// Follows the transition from `s` on `c`.
    #[inline]
    pub(crate) fn walk(&self, s: NodeId, c: TrieChar) -> Option<NodeId> {
        let base = self.cells.get(s as usize)?.base()?;
        if base == 0 {
            return None;
        }
        let t = base.checked_add(c)?;
        (self.cells.get(t as usize)?.check == s).then_some(t)
    }

    /// Returns the smallest code `>= from` with a transition out of `s`, and its target.
    pub(crate) fn next_child(&self, s: NodeId, from: TrieChar) -> Option<(TrieChar, NodeId)> {
        let base = self.node(s).base()?;
        if base == 0 {
            return None;
        }
        (from..=self.max_code)
            .map(|c| (c, base + c))
            .take_while(|&(_, t)| (t as usize) < self.cells.len())
            .find(|&(_, t)| self.cells[t as usize].check == s)
    }

    /// Codes of all transitions out of `s`, ascending.
    pub(crate) fn children(&self, s: NodeId) -> Vec<TrieChar> {
        let mut codes = Vec::new();
        let mut from = 0;
        while let Some((c, _)) = self.next_child(s, from) {
            codes.push(c);
            from = c + 1;
        }
        codes
    }

    /// Ensures a transition from `s` on `c` exists and returns its target.
    ///
    /// A newly created target is a childless inner node. When the natural
    /// target is owned by another parent, every child of `s` is moved to a
    /// base where all of them, and `c`, fit.
    pub(crate) fn insert_branch(&mut self, s: NodeId, c: TrieChar) -> Result<NodeId, TrieError> {
        debug_assert!(!self.node(s).is_leaf(), "cannot branch out of a leaf");
        let base = self.node(s).base().unwrap_or(0);

        let target = if base != 0 {
            let t = base + c;
            if self.node(t).check == s {
                return Ok(t);
            }
            if self.is_free(t) {
                t
            } else {
                let mut codes = self.children(s);
                codes.push(c);
                codes.sort_unstable();
                let new_base = self.find_free_base(&codes, s)?;
                self.relocate(s, new_base);
                new_base + c
            }
        } else {
            let new_base = self.find_free_base(&[c], s)?;
            self.set_base(s, new_base);
            new_base + c
        };

        self.occupy(target, Node::child_of(s));
        Ok(target)
    }

    /// Turns `s` into a leaf pointing at tail entry `tail`.
    #[inline]
    pub(crate) fn mark_leaf(&mut self, s: NodeId, tail: TailIndex) {
        self.cells[s as usize].kind = NodeKind::Leaf { tail };
    }

    /// Turns the leaf `s` back into a childless inner node.
    #[inline]
    pub(crate) fn clear_leaf(&mut self, s: NodeId) {
        debug_assert!(self.node(s).is_leaf());
        self.cells[s as usize].kind = NodeKind::Internal { base: 0 };
    }

    #[inline]
    fn set_base(&mut self, s: NodeId, base: u32) {
        self.cells[s as usize].kind = NodeKind::Internal { base };
    }

    #[inline]
    fn is_free(&self, t: NodeId) -> bool {
        t >= FIRST_CELL
            && self
                .cells
                .get(t as usize)
                .is_none_or(|n| n.kind == NodeKind::Free)
    }

    /// First-fit search for a base where every code in `codes` lands on a free cell.
    ///
    /// `codes` must be sorted ascending and non-empty.
    fn find_free_base(&self, codes: &[TrieChar], s: NodeId) -> Result<u32, TrieError> {
        let first = codes[0];
        let last = codes[codes.len() - 1];
        let mut t = self.free_hint.max(first + FIRST_CELL);
        loop {
            let base = t - first;
            if base > self.cell_limit.saturating_sub(last) {
                return Err(TrieError::RelocationFailure { node: s });
            }
            if t as usize >= self.cells.len() {
                return Ok(base);
            }
            if self.cells[t as usize].kind == NodeKind::Free
                && codes[1..].iter().all(|&c| self.is_free(base + c))
            {
                return Ok(base);
            }
            t += 1;
        }
    }

    /// Moves every child of `s` to `new_base + code` and re-parents grandchildren.
    fn relocate(&mut self, s: NodeId, new_base: u32) {
        let old_base = self.node(s).base().unwrap_or(0);
        let codes = self.children(s);
        for &c in &codes {
            let old = old_base + c;
            let new = new_base + c;
            let moved = self.cells[old as usize];
            let grandchildren = self.children(old);
            self.occupy(new, moved);
            if let NodeKind::Internal { base } = moved.kind {
                for d in grandchildren {
                    self.cells[(base + d) as usize].check = new;
                }
            }
            self.release(old);
        }
        self.set_base(s, new_base);
        tracing::trace!(node = s, old_base, new_base, moved = codes.len(), "relocated children");
    }

    /// Frees every descendant of `s` and leaves `s` a childless inner node.
    pub(crate) fn release_subtree(&mut self, s: NodeId) {
        let mut stack = vec![s];
        let mut doomed = Vec::new();
        while let Some(p) = stack.pop() {
            let mut from = 0;
            while let Some((c, t)) = self.next_child(p, from) {
                stack.push(t);
                doomed.push(t);
                from = c + 1;
            }
        }
        for t in doomed {
            self.release(t);
        }
        self.set_base(s, 0);
    }

    fn occupy(&mut self, t: NodeId, node: Node) {
        self.ensure_len(t as usize + 1);
        self.cells[t as usize] = node;
        if t == self.free_hint {
            self.advance_hint();
        }
    }

    fn release(&mut self, t: NodeId) {
        self.cells[t as usize] = Node::default();
        self.free_hint = self.free_hint.min(t);
    }

    fn advance_hint(&mut self) {
        while (self.free_hint as usize) < self.cells.len()
            && self.cells[self.free_hint as usize].kind != NodeKind::Free
        {
            self.free_hint += 1;
        }
    }

    /// Grows by doubling until `len` cells exist.
    fn ensure_len(&mut self, len: usize) {
        if len <= self.cells.len() {
            return;
        }
        let new_len = (self.cells.len() * 2).max(len);
        tracing::trace!(from = self.cells.len(), to = new_len, "growing double-array");
        self.cells.resize(new_len, Node::default());
    }

    /// Panics unless every occupied cell is reachable from its parent by
    /// exactly one code, and the allocation hint is accurate. Returns the
    /// tail indices of all leaves.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) -> Vec<TailIndex> {
        let mut tails = Vec::new();
        assert_eq!(self.cells[0], Node::default(), "sentinel cell must stay free");
        for (t, node) in self.cells.iter().enumerate() {
            if node.kind == NodeKind::Free || t as NodeId == ROOT {
                continue;
            }
            let t = t as NodeId;
            assert!(t >= FIRST_CELL);
            let parent = node.check;
            let base = self
                .node(parent)
                .base()
                .unwrap_or_else(|| panic!("parent {parent} of {t} must be inner"));
            assert!(base >= FIRST_CELL && t >= base, "cell {t} below its parent's base");
            let code = t - base;
            assert!(code <= self.max_code);
            assert_eq!(self.walk(parent, code), Some(t));
            tails.extend(node.tail());
        }
        for t in FIRST_CELL..self.free_hint {
            assert_ne!(self.cells[t as usize].kind, NodeKind::Free, "hint skipped free cell {t}");
        }
        tails
    }

    /// Returns the serialised size in bytes (without allocating).
    #[inline]
    pub(crate) fn serialized_size(&self) -> usize {
        4 + self.cells.len() * 8
    }

    /// Writes the cell count followed by `(base, check)` pairs.
    pub(crate) fn write_to<W: ByteSink>(&self, out: &mut W) {
        out.put_u32(self.cells.len() as u32);
        for node in &self.cells {
            let (base, check) = node.to_raw();
            out.put_i32(base);
            out.put_i32(check);
        }
    }

    /// Reads the cell table and checks each cell on its own. The tree shape
    /// is checked by [`validate`](Self::validate) once the tails are known.
    pub(crate) fn read_from(
        reader: &mut ByteReader<'_>,
        max_code: TrieChar,
    ) -> Result<Self, FormatError> {
        let count = reader.read_u32()? as usize;
        if count < FIRST_CELL as usize {
            return Err(FormatError::MissingRoot);
        }
        reader.ensure_remaining(count, 8)?;

        let mut cells = Vec::with_capacity(count);
        for index in 0..count {
            let base = reader.read_i32()?;
            let check = reader.read_i32()?;
            let mut node = Node::from_raw(base, check);
            if check < 0 || check as usize >= count {
                return Err(FormatError::CheckOutOfRange {
                    index: index as u32,
                    check,
                });
            }
            match index as NodeId {
                0 if (base, check) != (0, 0) => return Err(FormatError::MissingRoot),
                ROOT => {
                    if check != 0 || base < 0 {
                        return Err(FormatError::MissingRoot);
                    }
                    node.kind = NodeKind::Internal { base: base as u32 };
                }
                i if i >= FIRST_CELL && check == 0 && node.kind != NodeKind::Free => {
                    return Err(FormatError::OrphanCell { index: i });
                }
                _ => {}
            }
            if base > 0 && (base < FIRST_CELL as i32 || base as usize >= count) {
                return Err(FormatError::BaseOutOfRange {
                    index: index as u32,
                    base,
                });
            }
            cells.push(node);
        }

        let mut da = Self {
            cells,
            max_code,
            free_hint: FIRST_CELL,
            cell_limit: MAX_CELL,
        };
        da.advance_hint();
        Ok(da)
    }

    /// Checks that the occupied cells form a single tree under the root and
    /// that its leaves and the tail entries correspond one to one.
    pub(crate) fn validate(&self, tails: &TailStore) -> Result<(), FormatError> {
        for (index, node) in self.cells.iter().enumerate().skip(FIRST_CELL as usize) {
            if node.kind == NodeKind::Free {
                continue;
            }
            let index = index as NodeId;
            let placed = self
                .node(node.check)
                .base()
                .filter(|&base| base != 0)
                .and_then(|base| index.checked_sub(base))
                .is_some_and(|code| code <= self.max_code);
            if !placed {
                return Err(FormatError::MisplacedCell { index });
            }
        }

        let mut reached = vec![false; self.cells.len()];
        let mut owned = vec![false; tails.len()];
        let mut stack = vec![ROOT];
        while let Some(s) = stack.pop() {
            let mut from = 0;
            while let Some((c, t)) = self.next_child(s, from) {
                from = c + 1;
                reached[t as usize] = true;
                match self.cells[t as usize].kind {
                    NodeKind::Leaf { tail } => {
                        let Some(slot) = owned.get_mut(tail as usize) else {
                            return Err(FormatError::TailOutOfRange { index: t, tail });
                        };
                        if std::mem::replace(slot, true) {
                            return Err(FormatError::SharedTail { tail });
                        }
                        if c == TERMINATOR && !tails.suffix(tail).is_empty() {
                            return Err(FormatError::InvalidTerminal { index: t });
                        }
                    }
                    _ if c == TERMINATOR => {
                        return Err(FormatError::InvalidTerminal { index: t });
                    }
                    _ => stack.push(t),
                }
            }
        }

        if let Some(index) = (FIRST_CELL as usize..self.cells.len())
            .find(|&i| !reached[i] && self.cells[i].kind != NodeKind::Free)
        {
            return Err(FormatError::UnreachableCell {
                index: index as NodeId,
            });
        }
        if let Some(tail) = owned.iter().position(|&used| !used) {
            return Err(FormatError::UnusedTail {
                tail: tail as TailIndex,
            });
        }
        Ok(())
    }
}
