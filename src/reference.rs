use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::utils::MyHash;

/// Handle to a node in the [`Bdd`][crate::bdd::Bdd] manager.
///
/// The sign encodes a complement edge: `-r` is the negation of `r`.
/// Index `1` is the terminal node, so `+1` is the constant true and `-1` the constant false.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const ONE: Ref = Ref(1);
    pub const ZERO: Ref = Ref(-1);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The node index, ignoring the complement bit.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Signed internal representation.
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// The same node without the complement bit.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        // Zig-zag so that `r` and `-r` land in different buckets.
        ((self.0 as i64) << 1 ^ ((self.0 as i64) >> 63)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(Ref::ZERO.index(), 1);
        assert!(Ref::ZERO.is_negated());
        assert_eq!(Ref::ZERO.regular(), Ref::ONE);
    }

    #[test]
    fn test_hash_distinguishes_sign() {
        let r = Ref::positive(5);
        assert_ne!(MyHash::hash(&r), MyHash::hash(&-r));
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::positive(7).to_string(), "@7");
        assert_eq!((-Ref::positive(7)).to_string(), "~@7");
    }
}
