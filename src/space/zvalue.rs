//! Z-value encoding.
//!
//! A z-value packs a cell address and its resolution into one `u64`:
//!
//! ```text
//!  63 | 62 ............................ 6 | 5 ..... 0
//!   0 | address bits, most significant 1st | level
//! ```
//!
//! Address bits past the level are zero. With this layout plain integer
//! ordering is the Z-order curve: a cell sorts before all of its
//! descendants, and the descendants of `a` occupy exactly `[a, a.hi()]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of address bits a z-value can hold.
pub const MAX_Z_BITS: u32 = 57;

const LEVEL_BITS: u32 = 6;
const LEVEL_MASK: u64 = (1 << LEVEL_BITS) - 1;
const ADDRESS_MASK: u64 = ((1 << MAX_Z_BITS) - 1) << LEVEL_BITS;
/// Bit position of the most significant address bit.
const TOP_BIT: u32 = 62;

/// A cell of the Z-order curve at some resolution.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ZValue(u64);

impl ZValue {
    /// The cell covering the whole space.
    pub const ROOT: ZValue = ZValue(0);

    /// Largest possible z-value; no cell sorts after it.
    pub const MAX: ZValue = ZValue(ADDRESS_MASK | MAX_Z_BITS as u64);

    /// Build a z-value from left-justified address bits and a level.
    ///
    /// `address` uses the same bit positions as the encoded form (bits
    /// 62..6). Bits beyond `level` are cleared.
    pub fn new(address: u64, level: u32) -> Self {
        debug_assert!(level <= MAX_Z_BITS);
        ZValue((address & prefix_mask(level)) | level as u64)
    }

    /// Reinterpret a raw encoded value, e.g. one read back from storage.
    ///
    /// Returns `None` if the value is not in canonical form.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let level = (raw & LEVEL_MASK) as u32;
        if level > MAX_Z_BITS || raw & !(prefix_mask(level) | LEVEL_MASK) != 0 {
            return None;
        }
        Some(ZValue(raw))
    }

    /// The encoded value.
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Number of defined address bits.
    pub fn level(self) -> u32 {
        (self.0 & LEVEL_MASK) as u32
    }

    /// Address bits, left justified, level field cleared.
    pub fn address(self) -> u64 {
        self.0 & ADDRESS_MASK
    }

    /// Address bit `position` (0 = most significant).
    pub fn bit(self, position: u32) -> bool {
        debug_assert!(position < MAX_Z_BITS);
        self.0 & (1 << (TOP_BIT - position)) != 0
    }

    /// Upper end of the numeric range occupied by this cell and its
    /// descendants.
    pub fn hi(self) -> ZValue {
        let free = ADDRESS_MASK & !prefix_mask(self.level());
        ZValue(self.address() | free | MAX_Z_BITS as u64)
    }

    /// True if `other` is this cell or one of its descendants.
    pub fn contains(self, other: ZValue) -> bool {
        let level = self.level();
        level <= other.level() && other.0 & prefix_mask(level) == self.address()
    }

    /// The ancestor (or self) at `level`.
    pub fn ancestor(self, level: u32) -> ZValue {
        debug_assert!(level <= self.level());
        ZValue::new(self.0, level)
    }

    /// The enclosing cell one level up, `None` for the root.
    pub fn parent(self) -> Option<ZValue> {
        match self.level() {
            0 => None,
            level => Some(self.ancestor(level - 1)),
        }
    }

    /// One of the two cells one level down.
    pub fn child(self, bit: bool) -> ZValue {
        let level = self.level();
        debug_assert!(level < MAX_Z_BITS);
        let address = if bit {
            self.address() | 1 << (TOP_BIT - level)
        } else {
            self.address()
        };
        ZValue(address | (level + 1) as u64)
    }

    /// Cells at `levels` levels below this one, in z order.
    pub fn descendants(self, levels: u32) -> impl Iterator<Item = ZValue> {
        let level = self.level();
        debug_assert!(level + levels <= MAX_Z_BITS);
        let shift = TOP_BIT + 1 - level - levels;
        let base = self.address();
        (0..1u64 << levels)
            .map(move |i| ZValue((base | i << shift) | (level + levels) as u64))
    }

    /// True if both cells have the same parent and differ.
    pub fn is_sibling(self, other: ZValue) -> bool {
        self != other
            && self.level() == other.level()
            && self.level() > 0
            && self.parent() == other.parent()
    }

    /// Finest cell containing both `self` and `other`.
    pub fn common_ancestor(self, other: ZValue) -> ZValue {
        let max_level = self.level().min(other.level());
        let differing = (self.address() ^ other.address()) << 1;
        let shared = differing.leading_zeros().min(max_level);
        self.ancestor(shared)
    }
}

/// Mask of the top `level` address bits.
fn prefix_mask(level: u32) -> u64 {
    if level == 0 {
        0
    } else {
        ((1u64 << level) - 1) << (TOP_BIT + 1 - level)
    }
}

impl fmt::Display for ZValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z(")?;
        for position in 0..self.level() {
            f.write_str(if self.bit(position) { "1" } else { "0" })?;
        }
        write!(f, "/{})", self.level())
    }
}

impl fmt::Debug for ZValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
