//! Iterator over satisfying paths in a BDD.
//!
//! Each path is a conjunction of literals (a cube) leading from the root to the
//! constant true. Distinct paths differ in the value of at least one variable, so
//! the cubes of a diagram are pairwise disjoint and their disjunction is the
//! function itself. [`Guard`][crate::guard::Guard] relies on this to obtain a
//! canonical, manager-free form of a transition guard.
//!
//! # Example
//!
//! ```
//! use ltl_rs::bdd::Bdd;
//! use ltl_rs::types::Var;
//!
//! let bdd = Bdd::default();
//! let x = bdd.mk_var(Var::new(1));
//! let y = bdd.mk_var(Var::new(2));
//!
//! // f = x XOR y (true when exactly one is true)
//! let f = bdd.apply_xor(x, y);
//! let paths: Vec<_> = bdd.paths(f).collect();
//! assert_eq!(paths.len(), 2);
//! ```

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::{Lit, Var};

impl Bdd {
    /// Returns an iterator over all paths to true in the diagram of `f`.
    ///
    /// Literals of a path are ordered by variable. High branches are explored
    /// before low branches, which makes the enumeration order deterministic.
    pub fn paths(&self, f: Ref) -> BddPaths<'_> {
        BddPaths::new(self, f)
    }

    /// Returns one satisfying path for `f`, if any exists.
    pub fn one_sat(&self, f: Ref) -> Option<Vec<Lit>> {
        if self.is_zero(f) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = f;
        while !self.is_one(current) {
            let var = Var::new(self.variable(current));
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push(var.pos());
                current = high;
            } else {
                path.push(var.neg());
                current = self.low_node(current);
            }
        }
        Some(path)
    }
}

#[derive(Debug, Clone, Copy)]
enum Branch {
    High,
    Low,
    Done,
}

#[derive(Debug)]
struct StackFrame {
    node: Ref,
    next_branch: Branch,
}

/// An iterator over satisfying paths in a BDD.
///
/// Created by [`Bdd::paths()`]. The current path is kept in a single vector that
/// grows and shrinks with the traversal stack.
pub struct BddPaths<'a> {
    bdd: &'a Bdd,
    stack: Vec<StackFrame>,
    current_path: Vec<Lit>,
}

impl<'a> BddPaths<'a> {
    pub fn new(bdd: &'a Bdd, f: Ref) -> Self {
        BddPaths {
            bdd,
            stack: vec![StackFrame {
                node: f,
                next_branch: Branch::High,
            }],
            current_path: Vec::new(),
        }
    }

    fn backtrack(&mut self) {
        self.stack.pop();
        // Pop the literal that led here, unless this was the root.
        if !self.stack.is_empty() {
            self.current_path.pop();
        }
    }
}

impl Iterator for BddPaths<'_> {
    type Item = Vec<Lit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node = frame.node;

            if self.bdd.is_one(node) {
                let result = self.current_path.clone();
                self.backtrack();
                return Some(result);
            }
            if self.bdd.is_zero(node) {
                self.backtrack();
                continue;
            }

            let var = Var::new(self.bdd.variable(node));
            let branch = frame.next_branch;
            match branch {
                Branch::High => {
                    frame.next_branch = Branch::Low;
                    self.current_path.push(var.pos());
                    self.stack.push(StackFrame {
                        node: self.bdd.high_node(node),
                        next_branch: Branch::High,
                    });
                }
                Branch::Low => {
                    frame.next_branch = Branch::Done;
                    self.current_path.push(var.neg());
                    self.stack.push(StackFrame {
                        node: self.bdd.low_node(node),
                        next_branch: Branch::High,
                    });
                }
                Branch::Done => self.backtrack(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_path(lits: impl IntoIterator<Item = i32>) -> Vec<Lit> {
        lits.into_iter().map(Lit::from).collect()
    }

    #[test]
    fn test_paths_single_cube() {
        let bdd = Bdd::default();
        let f = bdd.cube(mk_path([1, -2, 3]));
        let paths: Vec<_> = bdd.paths(f).collect();
        assert_eq!(paths, vec![mk_path([1, -2, 3])]);
    }

    #[test]
    fn test_paths_terminals() {
        let bdd = Bdd::default();
        assert_eq!(bdd.paths(bdd.one()).collect::<Vec<_>>(), vec![vec![]]);
        assert_eq!(bdd.paths(bdd.zero()).count(), 0);
    }

    #[test]
    fn test_paths_cover_function() {
        let bdd = Bdd::default();
        let c1 = bdd.cube(mk_path([1, -2, 3]));
        let c2 = bdd.cube(mk_path([1, 2, -3]));
        let c3 = bdd.cube(mk_path([-1, 3]));
        let f = bdd.apply_or_many([c1, c2, c3]);

        let paths: Vec<_> = bdd.paths(f).collect();
        let cubes: Vec<Ref> = paths.iter().map(|p| bdd.cube(p.iter().copied())).collect();
        assert_eq!(bdd.apply_or_many(cubes.iter().copied()), f);
        for (i, &a) in cubes.iter().enumerate() {
            for &b in &cubes[i + 1..] {
                assert!(bdd.is_zero(bdd.apply_and(a, b)));
            }
        }
    }

    #[test]
    fn test_paths_complement_edges() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(Var::new(1));
        let y = bdd.mk_var(Var::new(2));
        let f = -bdd.apply_and(x, y);
        let paths: Vec<_> = bdd.paths(f).collect();
        assert_eq!(paths, vec![mk_path([1, -2]), mk_path([-1])]);
    }

    #[test]
    fn test_one_sat() {
        let bdd = Bdd::default();
        let f = bdd.cube(mk_path([-1, 2]));
        assert_eq!(bdd.one_sat(f), Some(mk_path([-1, 2])));
        assert_eq!(bdd.one_sat(bdd.zero()), None);
        assert_eq!(bdd.one_sat(bdd.one()), Some(vec![]));
    }
}
