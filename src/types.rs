//! Type-safe wrappers for decision-diagram variables and literals.
//!
//! Variables are 1-indexed (0 is reserved for the terminal node), which lines up
//! with DIMACS numbering used by the satisfiability oracle.
use std::fmt;
use std::ops::Neg;

/// A variable identifier (1-indexed).
///
/// In a translation session variable `i` stands for the atomic proposition
/// with index `i - 1`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a new variable with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if `id == 0`. Variables must be 1-indexed.
    pub fn new(id: u32) -> Self {
        assert_ne!(id, 0, "Variable IDs must be >= 1");
        Var(id)
    }

    /// Variable standing for the atomic proposition with the given 0-based index.
    pub fn from_ap(ap: usize) -> Self {
        Var::new(ap as u32 + 1)
    }

    /// Returns the raw variable ID.
    pub fn id(self) -> u32 {
        self.0
    }

    /// Returns the 0-based index of the atomic proposition this variable encodes.
    pub fn ap(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn pos(self) -> Lit {
        Lit::new(self, false)
    }

    pub fn neg(self) -> Lit {
        Lit::new(self, true)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

/// A literal: a variable together with its polarity.
///
/// Stored in signed DIMACS form, so `Lit::from(-3)` is `¬x3`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Lit(i32);

impl Lit {
    pub fn new(var: Var, negated: bool) -> Self {
        let v = var.id() as i32;
        Lit(if negated { -v } else { v })
    }

    /// Creates a literal from a non-zero signed DIMACS integer.
    ///
    /// # Panics
    ///
    /// Panics if `value == 0`.
    pub fn from_dimacs(value: i32) -> Self {
        assert_ne!(value, 0, "Literal must be non-zero");
        Lit(value)
    }

    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negated(self) -> bool {
        self.0 < 0
    }

    pub fn to_dimacs(self) -> i32 {
        self.0
    }

    /// Truth value of this literal under the given value of its variable.
    pub fn eval(self, value: bool) -> bool {
        value == self.is_positive()
    }
}

impl From<i32> for Lit {
    fn from(value: i32) -> Self {
        Lit::from_dimacs(value)
    }
}

impl Neg for Lit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated() {
            write!(f, "~{}", self.var())
        } else {
            write!(f, "{}", self.var())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_creation() {
        let v1 = Var::new(1);
        let v2 = Var::new(2);
        assert_eq!(v1.id(), 1);
        assert_eq!(v2.id(), 2);
        assert!(v1 < v2);
        assert_eq!(Var::from_ap(0), v1);
        assert_eq!(v2.ap(), 1);
    }

    #[test]
    #[should_panic(expected = "Variable IDs must be >= 1")]
    fn test_var_zero_panics() {
        Var::new(0);
    }

    #[test]
    fn test_lit_polarity() {
        let x = Var::new(3);
        assert_eq!(x.pos().to_dimacs(), 3);
        assert_eq!(x.neg().to_dimacs(), -3);
        assert_eq!(-x.pos(), x.neg());
        assert_eq!(Lit::from(-3).var(), x);
        assert!(x.pos().eval(true));
        assert!(x.neg().eval(false));
        assert!(!x.neg().eval(true));
        assert_eq!(x.neg().to_string(), "~x3");
    }
}
