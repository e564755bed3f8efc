//! Transition guards detached from the diagram manager.
//!
//! A frozen automaton must not hold [`Ref`]s into a session's [`Bdd`], so guards
//! are stored as the list of path cubes of their diagram. Because the cubes of a
//! reduced ordered diagram are pairwise disjoint and enumerated in a fixed
//! order, two guards built over the same variable order are equal iff they
//! denote the same Boolean function.

use std::fmt;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::reference::Ref;
use crate::types::Lit;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guard {
    cubes: Vec<Vec<Lit>>,
}

impl Guard {
    pub fn tt() -> Self {
        Self { cubes: vec![Vec::new()] }
    }

    pub fn ff() -> Self {
        Self { cubes: Vec::new() }
    }

    pub fn from_bdd(bdd: &Bdd, f: Ref) -> Self {
        Self {
            cubes: bdd.paths(f).collect(),
        }
    }

    pub fn to_bdd(&self, bdd: &Bdd) -> Ref {
        bdd.apply_or_many(self.cubes.iter().map(|c| bdd.cube(c.iter().copied())))
    }

    pub fn cubes(&self) -> &[Vec<Lit>] {
        &self.cubes
    }

    pub fn is_true(&self) -> bool {
        self.cubes.len() == 1 && self.cubes[0].is_empty()
    }

    pub fn is_false(&self) -> bool {
        self.cubes.is_empty()
    }

    /// Evaluate on a letter, given as the set of atomic propositions that hold.
    pub fn eval(&self, letter: &BitSet) -> bool {
        self.cubes
            .iter()
            .any(|cube| cube.iter().all(|lit| lit.eval(letter.contains(lit.var().ap()))))
    }

    /// Whether some letter satisfies both guards.
    pub fn intersects(&self, other: &Guard) -> bool {
        self.cubes.iter().any(|a| {
            other
                .cubes
                .iter()
                .any(|b| a.iter().all(|&l| !b.contains(&-l)))
        })
    }

    /// Number of letters over `num_aps` propositions satisfying the guard.
    pub fn letters(&self, num_aps: usize) -> BigUint {
        self.cubes
            .iter()
            .map(|cube| BigUint::from(1u32) << (num_aps - cube.len()))
            .sum()
    }

    /// Render with proposition names instead of indices.
    pub fn named<'a>(&'a self, aps: &'a [String]) -> NamedGuard<'a> {
        NamedGuard { guard: self, aps }
    }

    fn write_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        and: &str,
        or: &str,
        name: impl Fn(&mut fmt::Formatter<'_>, usize) -> fmt::Result,
    ) -> fmt::Result {
        if self.is_false() {
            return write!(f, "f");
        }
        if self.is_true() {
            return write!(f, "t");
        }
        for (i, cube) in self.cubes.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", or)?;
            }
            for (j, lit) in cube.iter().enumerate() {
                if j > 0 {
                    write!(f, "{}", and)?;
                }
                if lit.is_negated() {
                    write!(f, "!")?;
                }
                name(f, lit.var().ap())?;
            }
        }
        Ok(())
    }
}

/// HOA label syntax: proposition indices, `&`, `|`, `!`, `t` and `f`.
impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, "&", " | ", |f, ap| write!(f, "{}", ap))
    }
}

pub struct NamedGuard<'a> {
    guard: &'a Guard,
    aps: &'a [String],
}

impl fmt::Display for NamedGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.guard.write_with(f, " & ", " | ", |f, ap| match self.aps.get(ap) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "p{}", ap),
        })
    }
}
