/// Index of a cell in the double-array.
pub(crate) type NodeId = u32;

/// Index of an entry in the tail store.
pub(crate) type TailIndex = u32;

/// What a double-array cell holds.
///
/// In memory a leaf is a tagged variant; the serialized image folds the tag
/// into the sign bit of `base` (see [`Node::to_raw`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// An inner node. `base == 0` means it has no children yet.
    Internal { base: u32 },
    /// The rest of the key and its value live in the tail store.
    Leaf { tail: TailIndex },
    /// An unassigned cell.
    #[default]
    Free,
}

/// A cell of the double-array: what it holds plus the id of its parent.
///
/// `check == 0` marks an unassigned cell. Cell 0 is never used and the root
/// (cell 1) has no parent, so no real parent id is ever 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) check: NodeId,
}

impl Node {
    /// A freshly allocated childless node under `parent`.
    #[inline]
    pub(crate) fn child_of(parent: NodeId) -> Self {
        Self {
            kind: NodeKind::Internal { base: 0 },
            check: parent,
        }
    }

    /// Returns the base of an inner node, or `None` for leaves and free cells.
    #[inline]
    pub(crate) fn base(&self) -> Option<u32> {
        match self.kind {
            NodeKind::Internal { base } => Some(base),
            _ => None,
        }
    }

    /// Returns the tail index of a leaf.
    #[inline]
    pub(crate) fn tail(&self) -> Option<TailIndex> {
        match self.kind {
            NodeKind::Leaf { tail } => Some(tail),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Encodes the cell as the serialized `(base, check)` pair.
    ///
    /// Leaves store `-(tail + 1)`; free cells are `(0, 0)`.
    pub(crate) fn to_raw(self) -> (i32, i32) {
        let base = match self.kind {
            NodeKind::Internal { base } => base as i32,
            NodeKind::Leaf { tail } => -(tail as i32) - 1,
            NodeKind::Free => 0,
        };
        (base, self.check as i32)
    }

    /// Decodes a serialized `(base, check)` pair. Range checks are the caller's job.
    pub(crate) fn from_raw(base: i32, check: i32) -> Self {
        let check = check as u32;
        let kind = if base < 0 {
            NodeKind::Leaf {
                tail: (-(base + 1)) as u32,
            }
        } else if check == 0 && base == 0 {
            NodeKind::Free
        } else {
            NodeKind::Internal { base: base as u32 }
        };
        Self { kind, check }
    }
}
