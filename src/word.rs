//! Ultimately periodic words and their reference semantics.
//!
//! A [`LassoWord`] `u·v^ω` is finite data, so both the truth of an [`Ltl`] formula
//! and the acceptance by an [`Automaton`] are decidable on it. The former is
//! computed by fixpoint iteration over the positions of the lasso, the latter by
//! an emptiness check of the automaton × lasso product.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::automaton::{Automaton, MarkSet};
use crate::bitset::BitSet;
use crate::emptiness::{productive_nodes, MarkedEdge};
use crate::ltl::Ltl;

/// The word `prefix · cycle^ω`. Letters are sets of true propositions, given as
/// indices into `alphabet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LassoWord {
    alphabet: Vec<String>,
    prefix: Vec<BitSet>,
    cycle: Vec<BitSet>,
}

impl LassoWord {
    pub fn new(alphabet: Vec<String>, prefix: Vec<BitSet>, cycle: Vec<BitSet>) -> Self {
        assert!(!cycle.is_empty(), "the periodic part of a lasso must not be empty");
        Self { alphabet, prefix, cycle }
    }

    /// Build a word from letters given as lists of true proposition names.
    pub fn from_names(alphabet: &[&str], prefix: &[&[&str]], cycle: &[&[&str]]) -> Self {
        let letter = |names: &&[&str]| -> BitSet {
            names
                .iter()
                .filter_map(|n| alphabet.iter().position(|a| a == n))
                .collect()
        };
        Self::new(
            alphabet.iter().map(|s| s.to_string()).collect(),
            prefix.iter().map(letter).collect(),
            cycle.iter().map(letter).collect(),
        )
    }

    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn prefix(&self) -> &[BitSet] {
        &self.prefix
    }

    pub fn cycle(&self) -> &[BitSet] {
        &self.cycle
    }

    /// Number of distinct positions.
    pub fn len(&self) -> usize {
        self.prefix.len() + self.cycle.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn letter(&self, position: usize) -> &BitSet {
        if position < self.prefix.len() {
            &self.prefix[position]
        } else {
            &self.cycle[position - self.prefix.len()]
        }
    }

    /// Position following `position`; the last one loops back into the cycle.
    pub fn next_position(&self, position: usize) -> usize {
        if position + 1 < self.len() {
            position + 1
        } else {
            self.prefix.len()
        }
    }

    /// Truth of `formula` at the first position.
    pub fn satisfies(&self, formula: &Ltl) -> bool {
        self.values(formula)[0]
    }

    /// Truth of `formula` at every position.
    pub fn values(&self, formula: &Ltl) -> Vec<bool> {
        let n = self.len();
        let next = |v: &[bool]| -> Vec<bool> { (0..n).map(|i| v[self.next_position(i)]).collect() };
        let zip = |a: Vec<bool>, b: Vec<bool>, op: fn(bool, bool) -> bool| -> Vec<bool> {
            a.into_iter().zip(b).map(|(x, y)| op(x, y)).collect()
        };
        match formula {
            Ltl::True => vec![true; n],
            Ltl::False => vec![false; n],
            Ltl::Atom(name) => match self.alphabet.iter().position(|a| a == name) {
                Some(k) => (0..n).map(|i| self.letter(i).contains(k)).collect(),
                None => vec![false; n],
            },
            Ltl::Not(a) => self.values(a).into_iter().map(|x| !x).collect(),
            Ltl::And(xs) => xs
                .iter()
                .fold(vec![true; n], |acc, x| zip(acc, self.values(x), |p, q| p && q)),
            Ltl::Or(xs) => xs
                .iter()
                .fold(vec![false; n], |acc, x| zip(acc, self.values(x), |p, q| p || q)),
            Ltl::Implies(a, b) => zip(self.values(a), self.values(b), |p, q| !p || q),
            Ltl::Iff(a, b) => zip(self.values(a), self.values(b), |p, q| p == q),
            Ltl::Xor(a, b) => zip(self.values(a), self.values(b), |p, q| p != q),
            Ltl::Next(a) => next(&self.values(a)),
            Ltl::Finally(a) => self.until(&vec![true; n], &self.values(a)),
            Ltl::Globally(a) => self.release(&vec![false; n], &self.values(a)),
            Ltl::Until(a, b) => self.until(&self.values(a), &self.values(b)),
            Ltl::Release(a, b) => self.release(&self.values(a), &self.values(b)),
            Ltl::WeakUntil(a, b) => {
                let (a, b) = (self.values(a), self.values(b));
                zip(self.until(&a, &b), self.release(&vec![false; n], &a), |p, q| p || q)
            }
            Ltl::StrongRelease(a, b) => {
                let (a, b) = (self.values(a), self.values(b));
                let both = zip(a, b.clone(), |p, q| p && q);
                self.until(&b, &both)
            }
        }
    }

    /// Least fixpoint of `x = b | (a & X x)`.
    fn until(&self, a: &[bool], b: &[bool]) -> Vec<bool> {
        let n = self.len();
        let mut x = vec![false; n];
        loop {
            let y: Vec<bool> = (0..n).map(|i| b[i] || (a[i] && x[self.next_position(i)])).collect();
            if y == x {
                return x;
            }
            x = y;
        }
    }

    /// Greatest fixpoint of `x = b & (a | X x)`.
    fn release(&self, a: &[bool], b: &[bool]) -> Vec<bool> {
        let n = self.len();
        let mut x = vec![true; n];
        loop {
            let y: Vec<bool> = (0..n).map(|i| b[i] && (a[i] || x[self.next_position(i)])).collect();
            if y == x {
                return x;
            }
            x = y;
        }
    }
}

impl fmt::Display for LassoWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = |l: &BitSet| -> String {
            let names: Vec<&str> = l.iter().map(|k| self.alphabet[k].as_str()).collect();
            format!("{{{}}}", names.join(","))
        };
        for l in &self.prefix {
            write!(f, "{}", letter(l))?;
        }
        write!(f, "(")?;
        for l in &self.cycle {
            write!(f, "{}", letter(l))?;
        }
        write!(f, ")^w")
    }
}

impl Automaton {
    /// Whether some run on `word` is accepting.
    pub fn accepts(&self, word: &LassoWord) -> bool {
        // Letters of the word re-indexed by this automaton's propositions.
        let mapping: Vec<Option<usize>> = self
            .atoms()
            .iter()
            .map(|a| word.alphabet().iter().position(|b| b == a))
            .collect();
        let letters: Vec<BitSet> = (0..word.len())
            .map(|i| {
                let l = word.letter(i);
                mapping
                    .iter()
                    .enumerate()
                    .filter(|(_, k)| k.is_some_and(|k| l.contains(k)))
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();

        let mut index: HashMap<(usize, usize), usize> = HashMap::new();
        let mut nodes: Vec<(usize, usize)> = Vec::new();
        let mut queue = VecDeque::new();
        let mut edges: Vec<MarkedEdge> = Vec::new();
        let start = (self.initial(), 0);
        index.insert(start, 0);
        nodes.push(start);
        queue.push_back(0);
        while let Some(u) = queue.pop_front() {
            let (q, i) = nodes[u];
            let j = word.next_position(i);
            for t in &self.state(q).transitions {
                if !t.guard.eval(&letters[i]) {
                    continue;
                }
                for e in &t.edges {
                    let key = (e.target, j);
                    let v = *index.entry(key).or_insert_with(|| {
                        nodes.push(key);
                        queue.push_back(nodes.len() - 1);
                        nodes.len() - 1
                    });
                    let marks: &MarkSet = &e.marks;
                    edges.push((u, v, marks));
                }
            }
        }
        productive_nodes(nodes.len(), &edges, self.acceptance())[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Ltl {
        Ltl::atom("a")
    }

    fn b() -> Ltl {
        Ltl::atom("b")
    }

    #[test]
    fn test_positions() {
        let w = LassoWord::from_names(&["a"], &[&["a"]], &[&[], &["a"]]);
        assert_eq!(w.len(), 3);
        assert_eq!(w.next_position(0), 1);
        assert_eq!(w.next_position(2), 1);
        assert_eq!(w.to_string(), "{a}({}{a})^w");
    }

    #[test]
    fn test_temporal_operators() {
        // a, then (b, {})^w
        let w = LassoWord::from_names(&["a", "b"], &[&["a"]], &[&["b"], &[]]);
        assert!(w.satisfies(&a()));
        assert!(w.satisfies(&b().next()));
        assert!(w.satisfies(&b().finally().globally()));
        assert!(!w.satisfies(&b().globally().finally()));
        assert!(w.satisfies(&a().until(b())));
        assert!(!w.satisfies(&a().globally()));
        assert!(w.satisfies(&b().release(a().or(b()).or(a().not()))));
        assert!(!w.satisfies(&a().release(b())));
        assert!(w.satisfies(&a().not().globally().next()));
    }

    #[test]
    fn test_weak_operators() {
        // a^w
        let w = LassoWord::from_names(&["a", "b"], &[], &[&["a"]]);
        assert!(w.satisfies(&a().weak_until(b())));
        assert!(!w.satisfies(&a().until(b())));
        assert!(!w.satisfies(&a().strong_release(b())));
        let v = LassoWord::from_names(&["a", "b"], &[&["b"], &["a", "b"]], &[&[]]);
        assert!(v.satisfies(&a().strong_release(b())));
        assert!(v.satisfies(&a().implies(b()).globally().not().not().or(Ltl::True)));
    }

    #[test]
    fn test_unknown_atom_is_false() {
        let w = LassoWord::from_names(&["a"], &[], &[&["a"]]);
        assert!(!w.satisfies(&Ltl::atom("z").finally()));
    }

    #[test]
    fn test_automaton_accepts() {
        let aut = crate::automaton::tests::gfa();
        let inf_a = LassoWord::from_names(&["a"], &[&[]], &[&["a"], &[]]);
        let fin_a = LassoWord::from_names(&["a"], &[&["a"]], &[&[]]);
        assert!(aut.accepts(&inf_a));
        assert!(!aut.accepts(&fin_a));
    }
}
