/// A label type for use as trie keys.
///
/// Labels must be copyable and convertible to/from `u32` external character
/// codes ([`AlphaChar`](crate::AlphaChar)). Which codes are accepted is decided
/// by the trie's [`AlphaMap`](crate::AlphaMap), not by the label type.
pub trait Label: Copy + Into<u32> + TryFrom<u32> {}

impl Label for u8 {}

impl Label for char {}

impl Label for u32 {}
