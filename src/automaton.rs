//! Frozen ω-automata.
//!
//! An [`Automaton`] is an immutable arena of states indexed `0..n`. Each state owns
//! a list of [`Transition`]s whose guards are pairwise disjoint and together
//! cover every letter; a transition may branch to several [`Edge`]s, each
//! carrying its own acceptance marks. Guards are manager-free [`Guard`]s, so an
//! automaton holds no reference into the session that produced it and is
//! `Send + Sync`.

use std::fmt;

use num_bigint::BigUint;

use crate::acceptance::Acceptance;
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::guard::Guard;

pub type StateId = usize;

/// Acceptance marks of an edge.
pub type MarkSet = BitSet;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub target: StateId,
    pub marks: MarkSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub guard: Guard,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Human-readable label, typically the residual obligation.
    pub name: Option<String>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    atoms: Vec<String>,
    states: Vec<State>,
    initial: StateId,
    acceptance: Acceptance,
}

/// Size summary of an automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomatonStats {
    pub states: usize,
    pub transitions: usize,
    pub edges: usize,
    /// Edges counted once per letter that enables them.
    pub letter_edges: BigUint,
    pub acceptance_sets: usize,
    pub deterministic: bool,
}

impl fmt::Display for AutomatonStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "states: {}, transitions: {}, edges: {} ({} letter-expanded), acceptance sets: {}, deterministic: {}",
            self.states,
            self.transitions,
            self.edges,
            self.letter_edges,
            self.acceptance_sets,
            self.deterministic
        )
    }
}

impl Automaton {
    /// Assemble an automaton from its parts.
    ///
    /// Use [`validate`][Automaton::validate] to check the structural invariants.
    pub fn new(atoms: Vec<String>, states: Vec<State>, initial: StateId, acceptance: Acceptance) -> Self {
        Self {
            atoms,
            states,
            initial,
            acceptance,
        }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn acceptance(&self) -> &Acceptance {
        &self.acceptance
    }

    pub fn num_edges(&self) -> usize {
        self.states
            .iter()
            .flat_map(|s| &s.transitions)
            .map(|t| t.edges.len())
            .sum()
    }

    /// Successor lists with marks, ignoring guards.
    pub fn successors(&self) -> Vec<Vec<(StateId, &MarkSet)>> {
        self.states
            .iter()
            .map(|s| {
                s.transitions
                    .iter()
                    .flat_map(|t| t.edges.iter().map(|e| (e.target, &e.marks)))
                    .collect()
            })
            .collect()
    }

    /// Every transition has exactly one edge.
    pub fn is_deterministic(&self) -> bool {
        self.states
            .iter()
            .flat_map(|s| &s.transitions)
            .all(|t| t.edges.len() == 1)
    }

    /// The guards of every state cover all letters.
    pub fn is_total(&self) -> bool {
        let bdd = Bdd::default();
        self.states.iter().all(|s| {
            let union = bdd.apply_or_many(s.transitions.iter().map(|t| t.guard.to_bdd(&bdd)));
            bdd.is_one(union)
        })
    }

    pub fn stats(&self) -> AutomatonStats {
        let n = self.atoms.len();
        let transitions: Vec<&Transition> = self.states.iter().flat_map(|s| &s.transitions).collect();
        AutomatonStats {
            states: self.states.len(),
            transitions: transitions.len(),
            edges: self.num_edges(),
            letter_edges: transitions
                .iter()
                .map(|t| t.guard.letters(n) * BigUint::from(t.edges.len()))
                .sum(),
            acceptance_sets: self.acceptance.num_sets(),
            deterministic: self.is_deterministic(),
        }
    }

    /// Check the structural invariants.
    ///
    /// Guards must be satisfiable, pairwise disjoint within a state and cover all
    /// letters; every transition has at least one edge; targets and marks are in range.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.states.len();
        if self.initial >= n {
            return Err(format!("initial state {} out of range (0..{})", self.initial, n));
        }
        let sets = self.acceptance.num_sets();
        let bdd = Bdd::default();
        for (i, state) in self.states.iter().enumerate() {
            let mut union = bdd.zero();
            for t in &state.transitions {
                for lit in t.guard.cubes().iter().flatten() {
                    if lit.var().ap() >= self.atoms.len() {
                        return Err(format!("state {}: guard mentions unknown proposition {}", i, lit.var().ap()));
                    }
                }
                let g = t.guard.to_bdd(&bdd);
                if bdd.is_zero(g) {
                    return Err(format!("state {}: unsatisfiable guard", i));
                }
                if !bdd.is_zero(bdd.apply_and(union, g)) {
                    return Err(format!("state {}: overlapping guards", i));
                }
                union = bdd.apply_or(union, g);
                if t.edges.is_empty() {
                    return Err(format!("state {}: transition without successors", i));
                }
                for e in &t.edges {
                    if e.target >= n {
                        return Err(format!("state {}: target {} out of range", i, e.target));
                    }
                    if e.marks.iter().any(|m| m >= sets) {
                        return Err(format!("state {}: mark out of range {:?}", i, e.marks));
                    }
                    if matches!(self.acceptance, Acceptance::Parity { .. }) && e.marks.len() != 1 {
                        return Err(format!("state {}: parity edge must carry exactly one colour", i));
                    }
                }
            }
            if !bdd.is_one(union) {
                return Err(format!("state {}: guards do not cover all letters", i));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Var;

    /// Two-state automaton for `G F a` over a single proposition.
    pub(crate) fn gfa() -> Automaton {
        let bdd = Bdd::default();
        let a = bdd.mk_var(Var::from_ap(0));
        let ga = Guard::from_bdd(&bdd, a);
        let gna = Guard::from_bdd(&bdd, -a);
        let edge = |target, marks: &[usize]| Edge {
            target,
            marks: marks.iter().copied().collect(),
        };
        let state = |seen: bool| State {
            name: Some(format!("seen={}", seen)),
            transitions: vec![
                Transition {
                    guard: ga.clone(),
                    edges: vec![edge(1, &[0])],
                },
                Transition {
                    guard: gna.clone(),
                    edges: vec![edge(0, &[])],
                },
            ],
        };
        Automaton::new(
            vec!["a".to_string()],
            vec![state(false), state(true)],
            0,
            Acceptance::GeneralizedBuchi { sets: 1 },
        )
    }

    #[test]
    fn test_valid_automaton() {
        let aut = gfa();
        assert_eq!(aut.validate(), Ok(()));
        assert!(aut.is_total());
        assert!(aut.is_deterministic());
        let stats = aut.stats();
        assert_eq!(stats.states, 2);
        assert_eq!(stats.transitions, 4);
        assert_eq!(stats.edges, 4);
        assert_eq!(stats.letter_edges, BigUint::from(4u32));
    }

    #[test]
    fn test_validate_detects_partial_state() {
        let mut states = gfa().states().to_vec();
        states[1].transitions.pop();
        let aut = Automaton::new(
            vec!["a".to_string()],
            states,
            0,
            Acceptance::GeneralizedBuchi { sets: 1 },
        );
        assert!(!aut.is_total());
        assert!(aut.validate().unwrap_err().contains("cover"));
    }

    #[test]
    fn test_validate_detects_bad_mark() {
        let aut = gfa();
        let aut = Automaton::new(
            aut.atoms().to_vec(),
            aut.states().to_vec(),
            0,
            Acceptance::GeneralizedBuchi { sets: 0 },
        );
        assert!(aut.validate().unwrap_err().contains("mark"));
    }

    #[test]
    fn test_automaton_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Automaton>();
    }
}
