//! Hash-consed formulas in negation normal form.
//!
//! Every [`Formula`] is an index into a [`FormulaArena`]. The arena stores each
//! structurally distinct node once, so two formulas of the same arena are
//! syntactically equal iff their indices are equal. Nodes are immutable and live
//! as long as the arena, which is owned by a translation session.
//!
//! The `mk_*` constructors apply cheap canonicalizations on the fly: conjunctions
//! and disjunctions are flattened, sorted and deduplicated, constants are folded,
//! and complementary literals collapse the connective. These never change the
//! meaning of a formula.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use crate::ltl::Ltl;
use crate::table::Table;
use crate::utils::{hash_sequence, MyHash};

/// Handle to a node of a [`FormulaArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Formula(u32);

impl Formula {
    pub const TRUE: Formula = Formula(1);
    pub const FALSE: Formula = Formula(2);

    pub fn id(self) -> u32 {
        self.0
    }
}

/// A node in negation normal form. Negation only occurs on atoms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormulaNode {
    #[default]
    True,
    False,
    /// Atomic proposition by its index in the arena's alphabet.
    Atom(u32),
    NegAtom(u32),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Next(Formula),
    Until(Formula, Formula),
    Release(Formula, Formula),
}

impl MyHash for FormulaNode {
    fn hash(&self) -> u64 {
        match self {
            FormulaNode::True => hash_sequence(0, []),
            FormulaNode::False => hash_sequence(1, []),
            FormulaNode::Atom(p) => hash_sequence(2, [*p as u64]),
            FormulaNode::NegAtom(p) => hash_sequence(3, [*p as u64]),
            FormulaNode::And(xs) => hash_sequence(4, xs.iter().map(|x| x.0 as u64)),
            FormulaNode::Or(xs) => hash_sequence(5, xs.iter().map(|x| x.0 as u64)),
            FormulaNode::Next(a) => hash_sequence(6, [a.0 as u64]),
            FormulaNode::Until(a, b) => hash_sequence(7, [a.0 as u64, b.0 as u64]),
            FormulaNode::Release(a, b) => hash_sequence(8, [a.0 as u64, b.0 as u64]),
        }
    }
}

pub struct FormulaArena {
    table: RefCell<Table<FormulaNode>>,
    atoms: RefCell<Vec<String>>,
    atom_index: RefCell<HashMap<String, u32>>,
}

impl Default for FormulaArena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormulaArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaArena")
            .field("nodes", &self.len())
            .field("atoms", &self.atoms.borrow())
            .finish()
    }
}

impl FormulaArena {
    pub fn new() -> Self {
        let mut table = Table::new(10);
        let t = table.put(FormulaNode::True);
        let f = table.put(FormulaNode::False);
        assert_eq!((t, f), (1, 2));
        Self {
            table: RefCell::new(table),
            atoms: RefCell::new(Vec::new()),
            atom_index: RefCell::new(HashMap::new()),
        }
    }

    /// Number of distinct nodes.
    pub fn len(&self) -> usize {
        self.table.borrow().real_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, f: Formula) -> FormulaNode {
        self.table.borrow().value(f.0 as usize).clone()
    }

    fn intern(&self, node: FormulaNode) -> Formula {
        Formula(self.table.borrow_mut().put(node) as u32)
    }

    /// Register an atomic proposition, returning its index.
    ///
    /// Indices are assigned in registration order and fix the variable order of
    /// the session's decision diagrams.
    pub fn declare_atom(&self, name: &str) -> u32 {
        if let Some(&i) = self.atom_index.borrow().get(name) {
            return i;
        }
        let mut atoms = self.atoms.borrow_mut();
        let i = atoms.len() as u32;
        atoms.push(name.to_string());
        self.atom_index.borrow_mut().insert(name.to_string(), i);
        i
    }

    pub fn atom_index(&self, name: &str) -> Option<u32> {
        self.atom_index.borrow().get(name).copied()
    }

    pub fn atoms(&self) -> Vec<String> {
        self.atoms.borrow().clone()
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.borrow().len()
    }

    pub fn mk_bool(&self, value: bool) -> Formula {
        if value {
            Formula::TRUE
        } else {
            Formula::FALSE
        }
    }

    pub fn mk_atom(&self, ap: u32, positive: bool) -> Formula {
        if positive {
            self.intern(FormulaNode::Atom(ap))
        } else {
            self.intern(FormulaNode::NegAtom(ap))
        }
    }

    /// Negation, pushed down to the atoms.
    pub fn mk_not(&self, f: Formula) -> Formula {
        match self.node(f) {
            FormulaNode::True => Formula::FALSE,
            FormulaNode::False => Formula::TRUE,
            FormulaNode::Atom(p) => self.mk_atom(p, false),
            FormulaNode::NegAtom(p) => self.mk_atom(p, true),
            FormulaNode::And(xs) => {
                let ys: Vec<_> = xs.into_iter().map(|x| self.mk_not(x)).collect();
                self.mk_or(ys)
            }
            FormulaNode::Or(xs) => {
                let ys: Vec<_> = xs.into_iter().map(|x| self.mk_not(x)).collect();
                self.mk_and(ys)
            }
            FormulaNode::Next(a) => {
                let na = self.mk_not(a);
                self.mk_next(na)
            }
            FormulaNode::Until(a, b) => {
                let (na, nb) = (self.mk_not(a), self.mk_not(b));
                self.mk_release(na, nb)
            }
            FormulaNode::Release(a, b) => {
                let (na, nb) = (self.mk_not(a), self.mk_not(b));
                self.mk_until(na, nb)
            }
        }
    }

    fn collect_operands(
        &self,
        operands: impl IntoIterator<Item = Formula>,
        conjunction: bool,
    ) -> Option<Vec<Formula>> {
        let (unit, zero) = if conjunction {
            (Formula::TRUE, Formula::FALSE)
        } else {
            (Formula::FALSE, Formula::TRUE)
        };
        let mut flat = Vec::new();
        let mut stack: Vec<Formula> = operands.into_iter().collect();
        stack.reverse();
        while let Some(x) = stack.pop() {
            if x == unit {
                continue;
            }
            if x == zero {
                return None;
            }
            match self.node(x) {
                FormulaNode::And(ys) if conjunction => stack.extend(ys.into_iter().rev()),
                FormulaNode::Or(ys) if !conjunction => stack.extend(ys.into_iter().rev()),
                _ => flat.push(x),
            }
        }
        flat.sort_unstable();
        flat.dedup();

        // Complementary literals.
        for &x in &flat {
            if let FormulaNode::Atom(p) = self.node(x) {
                let neg = self.table.borrow().find(&FormulaNode::NegAtom(p));
                if let Some(neg) = neg {
                    if flat.binary_search(&Formula(neg as u32)).is_ok() {
                        return None;
                    }
                }
            }
        }
        Some(flat)
    }

    pub fn mk_and(&self, operands: impl IntoIterator<Item = Formula>) -> Formula {
        match self.collect_operands(operands, true) {
            None => Formula::FALSE,
            Some(xs) if xs.is_empty() => Formula::TRUE,
            Some(xs) if xs.len() == 1 => xs[0],
            Some(xs) => self.intern(FormulaNode::And(xs)),
        }
    }

    pub fn mk_or(&self, operands: impl IntoIterator<Item = Formula>) -> Formula {
        match self.collect_operands(operands, false) {
            None => Formula::TRUE,
            Some(xs) if xs.is_empty() => Formula::FALSE,
            Some(xs) if xs.len() == 1 => xs[0],
            Some(xs) => self.intern(FormulaNode::Or(xs)),
        }
    }

    pub fn mk_next(&self, a: Formula) -> Formula {
        if a == Formula::TRUE || a == Formula::FALSE {
            return a;
        }
        self.intern(FormulaNode::Next(a))
    }

    pub fn mk_until(&self, a: Formula, b: Formula) -> Formula {
        if b == Formula::TRUE || b == Formula::FALSE || a == Formula::FALSE || a == b {
            return b;
        }
        self.intern(FormulaNode::Until(a, b))
    }

    pub fn mk_release(&self, a: Formula, b: Formula) -> Formula {
        if b == Formula::TRUE || b == Formula::FALSE || a == Formula::TRUE || a == b {
            return b;
        }
        self.intern(FormulaNode::Release(a, b))
    }

    pub fn mk_finally(&self, a: Formula) -> Formula {
        self.mk_until(Formula::TRUE, a)
    }

    pub fn mk_globally(&self, a: Formula) -> Formula {
        self.mk_release(Formula::FALSE, a)
    }

    pub fn is_literal(&self, f: Formula) -> bool {
        matches!(self.node(f), FormulaNode::Atom(_) | FormulaNode::NegAtom(_))
    }

    /// Direct subformulas.
    pub fn children(&self, f: Formula) -> Vec<Formula> {
        match self.node(f) {
            FormulaNode::True | FormulaNode::False | FormulaNode::Atom(_) | FormulaNode::NegAtom(_) => {
                vec![]
            }
            FormulaNode::And(xs) | FormulaNode::Or(xs) => xs,
            FormulaNode::Next(a) => vec![a],
            FormulaNode::Until(a, b) | FormulaNode::Release(a, b) => vec![a, b],
        }
    }

    /// Number of nodes of the formula viewed as a tree.
    pub fn size(&self, f: Formula) -> usize {
        1 + self.children(f).into_iter().map(|c| self.size(c)).sum::<usize>()
    }

    /// Convert back to a raw [`Ltl`] tree.
    pub fn to_ltl(&self, f: Formula) -> Ltl {
        let name = |p: u32| Ltl::Atom(self.atoms.borrow()[p as usize].clone());
        match self.node(f) {
            FormulaNode::True => Ltl::True,
            FormulaNode::False => Ltl::False,
            FormulaNode::Atom(p) => name(p),
            FormulaNode::NegAtom(p) => name(p).not(),
            FormulaNode::And(xs) => Ltl::all(xs.into_iter().map(|x| self.to_ltl(x))),
            FormulaNode::Or(xs) => Ltl::any(xs.into_iter().map(|x| self.to_ltl(x))),
            FormulaNode::Next(a) => self.to_ltl(a).next(),
            FormulaNode::Until(a, b) => self.to_ltl(a).until(self.to_ltl(b)),
            FormulaNode::Release(a, b) => self.to_ltl(a).release(self.to_ltl(b)),
        }
    }

    pub fn display(&self, f: Formula) -> FormulaDisplay<'_> {
        FormulaDisplay { arena: self, formula: f }
    }
}

pub struct FormulaDisplay<'a> {
    arena: &'a FormulaArena,
    formula: Formula,
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arena = self.arena;
        let sub = |x: Formula| arena.display(x);
        let join = |f: &mut fmt::Formatter<'_>, xs: &[Formula], op: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, &x) in xs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", sub(x))?;
            }
            write!(f, ")")
        };
        match arena.node(self.formula) {
            FormulaNode::True => write!(f, "true"),
            FormulaNode::False => write!(f, "false"),
            FormulaNode::Atom(p) => write!(f, "{}", arena.atoms.borrow()[p as usize]),
            FormulaNode::NegAtom(p) => write!(f, "!{}", arena.atoms.borrow()[p as usize]),
            FormulaNode::And(xs) => join(f, &xs, "&"),
            FormulaNode::Or(xs) => join(f, &xs, "|"),
            FormulaNode::Next(a) => write!(f, "X {}", sub(a)),
            FormulaNode::Until(a, b) if a == Formula::TRUE => write!(f, "F {}", sub(b)),
            FormulaNode::Release(a, b) if a == Formula::FALSE => write!(f, "G {}", sub(b)),
            FormulaNode::Until(a, b) => write!(f, "({} U {})", sub(a), sub(b)),
            FormulaNode::Release(a, b) => write!(f, "({} R {})", sub(a), sub(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (FormulaArena, Formula, Formula) {
        let arena = FormulaArena::new();
        let a = arena.declare_atom("a");
        let b = arena.declare_atom("b");
        let fa = arena.mk_atom(a, true);
        let fb = arena.mk_atom(b, true);
        (arena, fa, fb)
    }

    #[test]
    fn test_hash_consing() {
        let (arena, a, b) = setup();
        let u1 = arena.mk_until(a, b);
        let u2 = arena.mk_until(a, b);
        assert_eq!(u1, u2);
        assert_ne!(u1, arena.mk_release(a, b));
        assert_eq!(arena.declare_atom("a"), 0);
        assert_eq!(arena.atom_index("b"), Some(1));
    }

    #[test]
    fn test_and_is_flat_sorted_and_deduplicated() {
        let (arena, a, b) = setup();
        let ab = arena.mk_and([a, b]);
        let ba = arena.mk_and([b, a, b]);
        assert_eq!(ab, ba);
        let nested = arena.mk_and([a, arena.mk_and([b, Formula::TRUE])]);
        assert_eq!(nested, ab);
        assert_eq!(arena.mk_and([a, Formula::FALSE]), Formula::FALSE);
        assert_eq!(arena.mk_and([]), Formula::TRUE);
        assert_eq!(arena.mk_and([a]), a);
    }

    #[test]
    fn test_complementary_literals() {
        let (arena, a, b) = setup();
        let na = arena.mk_not(a);
        assert_eq!(arena.mk_and([a, b, na]), Formula::FALSE);
        assert_eq!(arena.mk_or([na, b, a]), Formula::TRUE);
    }

    #[test]
    fn test_negation_is_involutive() {
        let (arena, a, b) = setup();
        let f = arena.mk_or([arena.mk_until(a, arena.mk_next(b)), arena.mk_globally(a)]);
        let nf = arena.mk_not(f);
        assert_eq!(arena.mk_not(nf), f);
        assert_eq!(arena.display(nf).to_string(), "((!a R X !b) & F !a)");
    }

    #[test]
    fn test_temporal_constants() {
        let (arena, a, _) = setup();
        assert_eq!(arena.mk_next(Formula::TRUE), Formula::TRUE);
        assert_eq!(arena.mk_until(a, Formula::FALSE), Formula::FALSE);
        assert_eq!(arena.mk_release(Formula::TRUE, a), a);
        assert_eq!(arena.mk_until(Formula::FALSE, a), a);
        assert_eq!(arena.mk_until(a, a), a);
    }

    #[test]
    fn test_display_and_to_ltl() {
        let (arena, a, b) = setup();
        let f = arena.mk_globally(arena.mk_finally(arena.mk_and([a, b])));
        assert_eq!(arena.display(f).to_string(), "G F (a & b)");
        let ltl = Ltl::False.release(Ltl::True.until(Ltl::all([Ltl::atom("a"), Ltl::atom("b")])));
        assert_eq!(arena.to_ltl(f), ltl);
        assert_eq!(arena.size(f), 7);
    }
}
