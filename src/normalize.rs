//! Formula normalization.
//!
//! [`normalize`] imports a raw [`Ltl`] tree into a [`FormulaArena`], expanding
//! the derived operators and pushing negation to the atoms, and then rewrites the
//! result to a fixpoint with a fixed set of semantics-preserving rules:
//!
//! - `G a ∧ a → G a`, `F a ∧ a → a`, `(a U b) ∧ b → b`, `(a R b) ∧ a → a ∧ b`
//! - `F a ∨ a → F a`, `G a ∨ a → a`, `(a R b) ∨ b → b`, `(a U b) ∨ a → a ∨ b`
//! - absorption, and pruning of literals contradicted by a sibling literal
//! - `a U b → b` when `b` is a pure eventuality, `a R b → b` when `b` is purely universal
//! - `¬b U b → F b`, `¬b R b → G b`, `X a U X b → X (a U b)`, `X a R X b → X (a R b)`
//!
//! All nodes are created through the arena, so the result is maximally shared and
//! normalizing a normalized formula returns the same node.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::Result;
use crate::formula::{Formula, FormulaArena, FormulaNode};
use crate::ltl::Ltl;

/// Upper bound on whole-formula rewrite passes.
const MAX_PASSES: usize = 32;

/// Import and simplify `ltl`.
///
/// Propositions not yet known to the arena are declared in order of first occurrence.
pub fn normalize(arena: &FormulaArena, ltl: &Ltl) -> Result<Formula> {
    let f = import(arena, ltl)?;
    Ok(Normalizer::new(arena).normalize_formula(f))
}

/// Import `ltl` into negation normal form without further simplification.
pub fn import(arena: &FormulaArena, ltl: &Ltl) -> Result<Formula> {
    ltl.validate(None)?;
    for name in ltl.atoms() {
        arena.declare_atom(&name);
    }
    Ok(nnf(arena, ltl, false))
}

fn nnf(arena: &FormulaArena, ltl: &Ltl, negated: bool) -> Formula {
    let pos = |x: &Ltl| nnf(arena, x, false);
    let neg = |x: &Ltl| nnf(arena, x, true);
    let go = |x: &Ltl| nnf(arena, x, negated);

    match ltl {
        Ltl::True => arena.mk_bool(!negated),
        Ltl::False => arena.mk_bool(negated),
        Ltl::Atom(name) => {
            let p = arena.declare_atom(name);
            arena.mk_atom(p, !negated)
        }
        Ltl::Not(a) => nnf(arena, a, !negated),
        Ltl::And(xs) if !negated => arena.mk_and(xs.iter().map(go)),
        Ltl::And(xs) => arena.mk_or(xs.iter().map(go)),
        Ltl::Or(xs) if !negated => arena.mk_or(xs.iter().map(go)),
        Ltl::Or(xs) => arena.mk_and(xs.iter().map(go)),
        // a → b ≡ ¬a ∨ b
        Ltl::Implies(a, b) if !negated => arena.mk_or([neg(a), pos(b)]),
        Ltl::Implies(a, b) => arena.mk_and([pos(a), neg(b)]),
        // a ↔ b ≡ (a ∧ b) ∨ (¬a ∧ ¬b), and a ⊕ b ≡ ¬(a ↔ b)
        Ltl::Iff(a, b) | Ltl::Xor(a, b) => {
            let equiv = matches!(ltl, Ltl::Iff(..)) != negated;
            let (pa, na, pb, nb) = (pos(a), neg(a), pos(b), neg(b));
            if equiv {
                arena.mk_or([arena.mk_and([pa, pb]), arena.mk_and([na, nb])])
            } else {
                arena.mk_or([arena.mk_and([pa, nb]), arena.mk_and([na, pb])])
            }
        }
        Ltl::Next(a) => arena.mk_next(go(a)),
        Ltl::Finally(a) if !negated => arena.mk_finally(go(a)),
        Ltl::Finally(a) => arena.mk_globally(go(a)),
        Ltl::Globally(a) if !negated => arena.mk_globally(go(a)),
        Ltl::Globally(a) => arena.mk_finally(go(a)),
        Ltl::Until(a, b) if !negated => arena.mk_until(go(a), go(b)),
        Ltl::Until(a, b) => arena.mk_release(go(a), go(b)),
        Ltl::Release(a, b) if !negated => arena.mk_release(go(a), go(b)),
        Ltl::Release(a, b) => arena.mk_until(go(a), go(b)),
        // a W b ≡ b R (a ∨ b), ¬(a W b) ≡ ¬b U (¬a ∧ ¬b)
        Ltl::WeakUntil(a, b) if !negated => arena.mk_release(pos(b), arena.mk_or([pos(a), pos(b)])),
        Ltl::WeakUntil(a, b) => arena.mk_until(neg(b), arena.mk_and([neg(a), neg(b)])),
        // a M b ≡ b U (a ∧ b), ¬(a M b) ≡ ¬b R (¬a ∨ ¬b)
        Ltl::StrongRelease(a, b) if !negated => arena.mk_until(pos(b), arena.mk_and([pos(a), pos(b)])),
        Ltl::StrongRelease(a, b) => arena.mk_release(neg(b), arena.mk_or([neg(a), neg(b)])),
    }
}

/// Rewrites arena formulas to their simplified fixpoint.
pub struct Normalizer<'a> {
    arena: &'a FormulaArena,
    memo: HashMap<Formula, Formula>,
    eventual: HashMap<Formula, bool>,
    universal: HashMap<Formula, bool>,
}

impl<'a> Normalizer<'a> {
    pub fn new(arena: &'a FormulaArena) -> Self {
        Self {
            arena,
            memo: HashMap::new(),
            eventual: HashMap::new(),
            universal: HashMap::new(),
        }
    }

    /// Apply the rewrite rules until the formula no longer changes.
    pub fn normalize_formula(&mut self, f: Formula) -> Formula {
        let mut current = f;
        for pass in 0..MAX_PASSES {
            let next = self.rewrite(current);
            if next == current {
                debug!("normalize: fixpoint after {} pass(es)", pass + 1);
                return current;
            }
            current = next;
        }
        debug!("normalize: pass limit reached");
        current
    }

    fn rewrite(&mut self, f: Formula) -> Formula {
        if let Some(&r) = self.memo.get(&f) {
            return r;
        }
        let arena = self.arena;
        let r = match arena.node(f) {
            FormulaNode::True | FormulaNode::False | FormulaNode::Atom(_) | FormulaNode::NegAtom(_) => f,
            FormulaNode::And(xs) => {
                let ys: Vec<_> = xs.into_iter().map(|x| self.rewrite(x)).collect();
                self.simplify_junction(ys, true)
            }
            FormulaNode::Or(xs) => {
                let ys: Vec<_> = xs.into_iter().map(|x| self.rewrite(x)).collect();
                self.simplify_junction(ys, false)
            }
            FormulaNode::Next(a) => {
                let a = self.rewrite(a);
                arena.mk_next(a)
            }
            FormulaNode::Until(a, b) => {
                let (a, b) = (self.rewrite(a), self.rewrite(b));
                self.simplify_until(a, b)
            }
            FormulaNode::Release(a, b) => {
                let (a, b) = (self.rewrite(a), self.rewrite(b));
                self.simplify_release(a, b)
            }
        };
        self.memo.insert(f, r);
        r
    }

    fn simplify_until(&mut self, a: Formula, b: Formula) -> Formula {
        let arena = self.arena;
        if self.is_eventual(b) {
            return b;
        }
        if a != Formula::TRUE && arena.mk_not(b) == a {
            return arena.mk_finally(b);
        }
        if let (FormulaNode::Next(x), FormulaNode::Next(y)) = (arena.node(a), arena.node(b)) {
            return arena.mk_next(arena.mk_until(x, y));
        }
        arena.mk_until(a, b)
    }

    fn simplify_release(&mut self, a: Formula, b: Formula) -> Formula {
        let arena = self.arena;
        if self.is_universal(b) {
            return b;
        }
        if a != Formula::FALSE && arena.mk_not(b) == a {
            return arena.mk_globally(b);
        }
        if let (FormulaNode::Next(x), FormulaNode::Next(y)) = (arena.node(a), arena.node(b)) {
            return arena.mk_next(arena.mk_release(x, y));
        }
        arena.mk_release(a, b)
    }

    /// Simplify a conjunction (`conjunction = true`) or a disjunction of simplified operands.
    fn simplify_junction(&mut self, operands: Vec<Formula>, conjunction: bool) -> Formula {
        let arena = self.arena;
        let join = |xs: Vec<Formula>| {
            if conjunction {
                arena.mk_and(xs)
            } else {
                arena.mk_or(xs)
            }
        };

        let mut f = join(operands);
        loop {
            let xs = match arena.node(f) {
                FormulaNode::And(xs) if conjunction => xs,
                FormulaNode::Or(xs) if !conjunction => xs,
                _ => return f,
            };
            match self.junction_step(&xs, conjunction) {
                Some(ys) => f = join(ys),
                None => return f,
            }
        }
    }

    /// Apply the first applicable rule to the operand list, if any.
    fn junction_step(&mut self, xs: &[Formula], conjunction: bool) -> Option<Vec<Formula>> {
        let arena = self.arena;
        let present: HashSet<Formula> = xs.iter().copied().collect();
        let without = |i: usize| -> Vec<Formula> {
            xs.iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &x)| x)
                .collect()
        };
        let replaced = |i: usize, y: Formula| -> Vec<Formula> {
            let mut ys = xs.to_vec();
            ys[i] = y;
            ys
        };

        for (i, &x) in xs.iter().enumerate() {
            match arena.node(x) {
                // ∧: (a U b) ∧ b → b
                FormulaNode::Until(_, b) if conjunction && present.contains(&b) => {
                    return Some(without(i));
                }
                // ∧: (a R b) ∧ a → a ∧ b
                FormulaNode::Release(a, b) if conjunction && present.contains(&a) => {
                    return Some(replaced(i, b));
                }
                // ∨: (a U b) ∨ a → a ∨ b
                FormulaNode::Until(a, b) if !conjunction && present.contains(&a) => {
                    return Some(replaced(i, b));
                }
                // ∨: (a R b) ∨ b → b
                FormulaNode::Release(_, b) if !conjunction && present.contains(&b) => {
                    return Some(without(i));
                }
                FormulaNode::Or(ys) if conjunction => {
                    if let Some(inner) = self.prune_nested(&ys, &present, false) {
                        return Some(inner.map_or_else(|| without(i), |y| replaced(i, y)));
                    }
                }
                FormulaNode::And(ys) if !conjunction => {
                    if let Some(inner) = self.prune_nested(&ys, &present, true) {
                        return Some(inner.map_or_else(|| without(i), |y| replaced(i, y)));
                    }
                }
                _ => {}
            }

            // ∧: (x R b) ∧ b → x R b
            // ∨: (x U b) ∨ b → x U b
            let dominated = xs.iter().any(|&y| match arena.node(y) {
                FormulaNode::Release(_, b) => conjunction && b == x,
                FormulaNode::Until(_, b) => !conjunction && b == x,
                _ => false,
            });
            if dominated {
                return Some(without(i));
            }
        }
        None
    }

    /// Simplify a nested junction against its siblings.
    ///
    /// Returns `Some(None)` when the nested operand is absorbed and can be
    /// dropped, `Some(Some(y))` when it shrinks to `y`, and `None` otherwise.
    fn prune_nested(
        &mut self,
        ys: &[Formula],
        siblings: &HashSet<Formula>,
        conjunction: bool,
    ) -> Option<Option<Formula>> {
        let arena = self.arena;
        // Absorption: a ∧ (a ∨ c) → a, a ∨ (a ∧ c) → a.
        if ys.iter().any(|y| siblings.contains(y)) {
            return Some(None);
        }
        // Contradicted literals: a ∧ (¬a ∨ c) → a ∧ c, a ∨ (¬a ∧ c) → a ∨ c.
        let kept: Vec<Formula> = ys
            .iter()
            .copied()
            .filter(|&y| !(arena.is_literal(y) && siblings.contains(&arena.mk_not(y))))
            .collect();
        if kept.len() == ys.len() {
            return None;
        }
        Some(Some(if conjunction {
            arena.mk_and(kept)
        } else {
            arena.mk_or(kept)
        }))
    }

    /// Pure eventualities satisfy `F φ ≡ φ`.
    pub fn is_eventual(&mut self, f: Formula) -> bool {
        if let Some(&r) = self.eventual.get(&f) {
            return r;
        }
        let r = match self.arena.node(f) {
            FormulaNode::True | FormulaNode::False => true,
            FormulaNode::Atom(_) | FormulaNode::NegAtom(_) => false,
            FormulaNode::Until(a, b) => a == Formula::TRUE || self.is_eventual(b),
            FormulaNode::Release(a, b) => a == Formula::FALSE && self.is_eventual(b),
            FormulaNode::Next(a) => self.is_eventual(a),
            FormulaNode::And(xs) | FormulaNode::Or(xs) => xs.into_iter().all(|x| self.is_eventual(x)),
        };
        self.eventual.insert(f, r);
        r
    }

    /// Purely universal formulas satisfy `G φ ≡ φ`.
    pub fn is_universal(&mut self, f: Formula) -> bool {
        if let Some(&r) = self.universal.get(&f) {
            return r;
        }
        let r = match self.arena.node(f) {
            FormulaNode::True | FormulaNode::False => true,
            FormulaNode::Atom(_) | FormulaNode::NegAtom(_) => false,
            FormulaNode::Release(a, b) => a == Formula::FALSE || self.is_universal(b),
            FormulaNode::Until(a, b) => a == Formula::TRUE && self.is_universal(b),
            FormulaNode::Next(a) => self.is_universal(a),
            FormulaNode::And(xs) | FormulaNode::Or(xs) => xs.into_iter().all(|x| self.is_universal(x)),
        };
        self.universal.insert(f, r);
        r
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn a() -> Ltl {
        Ltl::atom("a")
    }
    fn b() -> Ltl {
        Ltl::atom("b")
    }

    fn show(ltl: &Ltl) -> String {
        let arena = FormulaArena::new();
        let f = normalize(&arena, ltl).unwrap();
        arena.display(f).to_string()
    }

    fn imported(ltl: &Ltl) -> String {
        let arena = FormulaArena::new();
        let f = import(&arena, ltl).unwrap();
        arena.display(f).to_string()
    }

    #[test]
    fn test_nnf_of_derived_operators() {
        assert_eq!(imported(&a().implies(b()).not()), "(a & !b)");
        assert_eq!(imported(&a().weak_until(b())), "(b R (b | a))");
        assert_eq!(imported(&a().strong_release(b()).not()), "(!b R (!b | !a))");
        assert_eq!(imported(&a().xor(b())), "((a & !b) | (!a & b))");
        assert_eq!(imported(&a().finally().not()), "G !a");
        assert_eq!(imported(&a().iff(b()).not()), "((a & !b) | (!a & b))");
    }

    #[test]
    fn test_conjunction_rules() {
        assert_eq!(show(&a().globally().and(a())), "G a");
        assert_eq!(show(&a().finally().and(a())), "a");
        assert_eq!(show(&Ltl::all([a().until(b()), b()])), "b");
        assert_eq!(show(&Ltl::all([a().release(b()), a()])), "(a & b)");
        assert_eq!(show(&Ltl::all([a(), a().or(b().next())])), "a");
        assert_eq!(show(&Ltl::all([a(), a().not().or(b())])), "(a & b)");
    }

    #[test]
    fn test_disjunction_rules() {
        assert_eq!(show(&a().finally().or(a())), "F a");
        assert_eq!(show(&a().globally().or(a())), "a");
        assert_eq!(show(&Ltl::any([a().until(b()), a()])), "(a | b)");
        assert_eq!(show(&Ltl::any([a(), a().not().and(b())])), "(a | b)");
        assert_eq!(show(&Ltl::any([a(), a().and(b())])), "a");
    }

    #[test]
    fn test_temporal_rules() {
        assert_eq!(show(&a().until(b().finally())), "F b");
        assert_eq!(show(&a().release(b().globally())), "G b");
        assert_eq!(show(&b().not().until(b())), "F b");
        assert_eq!(show(&b().not().release(b())), "G b");
        assert_eq!(show(&a().next().until(b().next())), "X (a U b)");
        assert_eq!(show(&Ltl::True.next()), "true");
        assert_eq!(show(&a().finally().globally().finally()), "G F a");
        assert_eq!(show(&a().globally().finally().globally()), "F G a");
    }

    #[test]
    fn test_idempotent() {
        let arena = FormulaArena::new();
        let ltl = Ltl::all([
            a().until(b()).globally(),
            a().finally().or(b().next()),
            a().implies(b().finally()).globally(),
        ]);
        let f = normalize(&arena, &ltl).unwrap();
        let mut normalizer = Normalizer::new(&arena);
        assert_eq!(normalizer.normalize_formula(f), f);
        let mut fresh = Normalizer::new(&arena);
        assert_eq!(fresh.normalize_formula(f), f);
    }

    #[test]
    fn test_deterministic_across_arenas() {
        let ltl = a().until(b()).and(b().release(a().next()));
        assert_eq!(show(&ltl), show(&ltl.clone()));
    }

    #[test]
    fn test_invalid_formula() {
        let arena = FormulaArena::new();
        assert!(normalize(&arena, &Ltl::Or(vec![])).is_err());
    }
}
