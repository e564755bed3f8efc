//! Binary decision diagram manager used for transition guards.
//!
//! All operations go through a [`Bdd`] value, which owns the unique table and the
//! computed table. Nodes are addressed by [`Ref`] handles with complement edges:
//! the high child of a stored node is never complemented, which keeps the
//! representation canonical. Two handles from the same manager denote the same
//! Boolean function iff they are equal.
//!
//! The manager uses interior mutability and is therefore neither `Sync` nor meant
//! to be shared across threads. Each translation session owns one.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::types::{Lit, Var};
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::ZERO,
            high: Ref::ZERO,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            MyHash::hash(&self.low),
            MyHash::hash(&self.high),
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(
            MyHash::hash(&self.0),
            MyHash::hash(&self.1),
            MyHash::hash(&self.2),
        )
    }
}

/// Sizing of a [`Bdd`] manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BddConfig {
    /// Initial room for `2^storage_bits` nodes. The table grows beyond it on demand.
    pub storage_bits: usize,
    /// The computed table has `2^cache_bits` slots.
    pub cache_bits: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            cache_bits: 14,
        }
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    protected: RefCell<HashMap<Ref, usize>>,
    gc_runs: Cell<usize>,
}

impl Bdd {
    pub fn new(config: BddConfig) -> Self {
        assert!(
            config.storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let mut storage = Table::new(config.storage_bits);
        // The terminal node is the only node with variable 0.
        let one = storage.put(Node {
            variable: 0,
            low: Ref::ONE,
            high: Ref::ONE,
        });
        assert_eq!(one, 1, "Terminal node must have index 1");

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(config.cache_bits)),
            protected: RefCell::new(HashMap::new()),
            gc_runs: Cell::new(0),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("size", &storage.size())
            .field("real_size", &storage.real_size())
            .field("gc_runs", &self.gc_runs.get())
            .finish()
    }
}

impl Bdd {
    pub fn one(&self) -> Ref {
        Ref::ONE
    }
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == 1
    }

    /// Variable labelling the node (0 for the terminal).
    pub fn variable(&self, node: Ref) -> u32 {
        self.storage.borrow().value(node.index() as usize).variable
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.storage.borrow().value(node.index() as usize).low;
        if node.is_negated() {
            -low
        } else {
            low
        }
    }

    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.storage.borrow().value(node.index() as usize).high;
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    /// Number of live nodes, including the terminal.
    pub fn node_count(&self) -> usize {
        self.storage.borrow().real_size()
    }

    pub fn cache_hits(&self) -> usize {
        self.cache.borrow().hits()
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: Var) -> Ref {
        self.mk_node(v.id(), Ref::ZERO, Ref::ONE)
    }

    pub fn mk_lit(&self, lit: Lit) -> Ref {
        let x = self.mk_var(lit.var());
        if lit.is_negated() {
            -x
        } else {
            x
        }
    }

    /// Conjunction of the given literals.
    ///
    /// Contradictory literals yield the constant false.
    pub fn cube(&self, literals: impl IntoIterator<Item = Lit>) -> Ref {
        let mut literals: Vec<Lit> = literals.into_iter().collect();
        literals.sort_by_key(|lit| std::cmp::Reverse(lit.var()));
        debug!("cube(literals = {:?})", literals);
        let mut current = Ref::ONE;
        let mut last: Option<Lit> = None;
        for lit in literals {
            if let Some(prev) = last {
                if prev.var() == lit.var() {
                    if prev != lit {
                        return Ref::ZERO;
                    }
                    continue;
                }
            }
            last = Some(lit);
            let v = lit.var().id();
            current = if lit.is_negated() {
                self.mk_node(v, current, Ref::ZERO)
            } else {
                self.mk_node(v, Ref::ZERO, current)
            };
        }
        current
    }

    /// Disjunction of the given literals.
    pub fn clause(&self, literals: impl IntoIterator<Item = Lit>) -> Ref {
        -self.cube(literals.into_iter().map(|lit| -lit))
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use ltl_rs::bdd::Bdd;
    /// use ltl_rs::types::Var;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(Var::new(1));
    /// let y = bdd.mk_var(Var::new(2));
    /// let z = bdd.mk_var(Var::new(3));
    /// let f = bdd.apply_ite(x, y, z);
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, Ref::ONE, h);
        }
        if h == f {
            return self.apply_ite(f, g, Ref::ZERO);
        }
        if g == -f {
            return self.apply_ite(f, Ref::ZERO, h);
        }
        if h == -f {
            return self.apply_ite(f, g, Ref::ONE);
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: apply_ite{:?} -> {}", key, res);
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let m = [f, g, h]
            .iter()
            .filter(|r| !self.is_terminal(**r))
            .map(|&r| self.variable(r))
            .min()
            .unwrap_or(0);
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        debug!("computed: apply_ite{:?} -> {}", key, res);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ONE)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Check whether `f` implies `g`, i.e. `f ∧ ¬g` is unsatisfiable.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_and(f, -g))
    }

    /// Restrict `f` by the literals of a cube.
    pub fn cofactor_cube(&self, f: Ref, cube: &[Lit]) -> Ref {
        let mut cube = cube.to_vec();
        cube.sort_by_key(|lit| lit.var());
        cube.dedup();
        let mut cache = HashMap::new();
        self.cofactor_cube_(f, &cube, &mut cache)
    }

    fn cofactor_cube_(&self, f: Ref, cube: &[Lit], cache: &mut HashMap<(Ref, usize), Ref>) -> Ref {
        if self.is_terminal(f) || cube.is_empty() {
            return f;
        }
        let key = (f, cube.len());
        if let Some(&res) = cache.get(&key) {
            return res;
        }
        let t = self.variable(f);
        let lit = cube[0];
        let u = lit.var().id();
        let res = match t.cmp(&u) {
            Ordering::Greater => self.cofactor_cube_(f, &cube[1..], cache),
            Ordering::Equal => {
                let (f0, f1) = self.top_cofactors(f, u);
                let next = if lit.is_positive() { f1 } else { f0 };
                self.cofactor_cube_(next, &cube[1..], cache)
            }
            Ordering::Less => {
                let (f0, f1) = self.top_cofactors(f, t);
                let low = self.cofactor_cube_(f0, cube, cache);
                let high = self.cofactor_cube_(f1, cube, cache);
                self.mk_node(t, low, high)
            }
        };
        cache.insert(key, res);
        res
    }

    /// Evaluate `f` under a total assignment given as a predicate on variables.
    pub fn eval(&self, f: Ref, value: impl Fn(Var) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = Var::new(self.variable(current));
            current = if value(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    /// All node indices reachable from the given roots, including the terminal.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(1);
        let mut stack: Vec<Ref> = nodes.into_iter().collect();

        while let Some(node) = stack.pop() {
            if visited.insert(node.index()) {
                stack.push(self.low_node(node));
                stack.push(self.high_node(node));
            }
        }

        visited
    }

    /// Number of nodes in the diagram of `f`, including the terminal.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    /// Register `f` as a garbage-collection root. Calls nest.
    pub fn protect(&self, f: Ref) {
        *self.protected.borrow_mut().entry(f.regular()).or_insert(0) += 1;
    }

    /// Undo one [`protect`][Bdd::protect] call for `f`.
    pub fn release(&self, f: Ref) {
        let mut protected = self.protected.borrow_mut();
        let key = f.regular();
        if let Some(count) = protected.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                protected.remove(&key);
            }
        }
    }

    /// Free every node unreachable from `roots` and the protected set.
    ///
    /// Handles to surviving nodes stay valid. Returns the number of freed nodes.
    pub fn collect_garbage(&self, roots: &[Ref]) -> usize {
        let protected: Vec<Ref> = self.protected.borrow().keys().copied().collect();
        let alive = self.descendants(roots.iter().copied().chain(protected));

        self.cache.borrow_mut().clear();
        let freed = self
            .storage
            .borrow_mut()
            .retain(|index, _| alive.contains(&(index as u32)));
        self.gc_runs.set(self.gc_runs.get() + 1);
        debug!("collect_garbage: freed {} nodes, {} alive", freed, alive.len());
        freed
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        format!(
            "{}:(x{}, {}, {})",
            node,
            self.variable(node),
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
    }
}
