//! Language emptiness for transition-based acceptance conditions.
//!
//! All checks work on a plain marked graph (source, target, marks), so they serve
//! both automata and the automaton × lasso products built by [`word`][crate::word].

use crate::acceptance::Acceptance;
use crate::automaton::{Automaton, MarkSet};
use crate::scc::{component_index, coreachable, strongly_connected_components};

/// Edge of a marked graph.
pub type MarkedEdge<'a> = (usize, usize, &'a MarkSet);

/// Nodes lying on some accepting cycle.
pub fn accepting_cycle_nodes(n: usize, edges: &[MarkedEdge], acceptance: &Acceptance) -> Vec<bool> {
    let mut result = vec![false; n];
    match *acceptance {
        Acceptance::GeneralizedBuchi { sets } => {
            let all: Vec<&MarkedEdge> = edges.iter().collect();
            mark_sccs(n, &all, &mut result, |internal| {
                !internal.is_empty() && (0..sets).all(|i| internal.iter().any(|e| e.2.contains(i)))
            });
        }
        Acceptance::Rabin { pairs } => {
            for i in 0..pairs {
                let (fin, inf) = (2 * i, 2 * i + 1);
                let allowed: Vec<&MarkedEdge> = edges.iter().filter(|e| !e.2.contains(fin)).collect();
                mark_sccs(n, &allowed, &mut result, |internal| internal.iter().any(|e| e.2.contains(inf)));
            }
        }
        Acceptance::Parity { colours } => {
            for p in (0..colours).step_by(2) {
                let allowed: Vec<&MarkedEdge> = edges.iter().filter(|e| colour(e, colours) >= p).collect();
                mark_sccs(n, &allowed, &mut result, |internal| {
                    internal.iter().any(|e| colour(e, colours) == p)
                });
            }
        }
    }
    result
}

/// Least colour of a parity edge. Uncoloured edges rank above every colour.
fn colour(edge: &MarkedEdge, colours: usize) -> usize {
    edge.2.first().unwrap_or(colours)
}

/// Mark every node of an SCC (of the sub-graph `edges`) whose internal edges pass `accepting`.
fn mark_sccs(n: usize, edges: &[&MarkedEdge], result: &mut [bool], accepting: impl Fn(&[&MarkedEdge]) -> bool) {
    let mut adjacency = vec![Vec::new(); n];
    for e in edges {
        adjacency[e.0].push(e.1);
    }
    let components = strongly_connected_components(&adjacency);
    let index = component_index(&components, n);
    let mut internal: Vec<Vec<&MarkedEdge>> = vec![Vec::new(); components.len()];
    for &e in edges {
        if index[e.0] == index[e.1] {
            internal[index[e.0]].push(e);
        }
    }
    for (c, component) in components.iter().enumerate() {
        if accepting(internal[c].as_slice()) {
            for &v in component {
                result[v] = true;
            }
        }
    }
}

/// Nodes from which an accepting run starts.
pub fn productive_nodes(n: usize, edges: &[MarkedEdge], acceptance: &Acceptance) -> Vec<bool> {
    let cycles = accepting_cycle_nodes(n, edges, acceptance);
    let mut adjacency = vec![Vec::new(); n];
    for e in edges {
        adjacency[e.0].push(e.1);
    }
    coreachable(&adjacency, &cycles)
}

/// Edges of `automaton` as a marked graph.
pub fn marked_edges(automaton: &Automaton) -> Vec<MarkedEdge<'_>> {
    automaton
        .successors()
        .into_iter()
        .enumerate()
        .flat_map(|(source, succ)| succ.into_iter().map(move |(target, marks)| (source, target, marks)))
        .collect()
}

impl Automaton {
    /// States with a non-empty language.
    pub fn productive_states(&self) -> Vec<bool> {
        productive_nodes(self.num_states(), &marked_edges(self), self.acceptance())
    }

    /// No word is accepted.
    pub fn is_empty(&self) -> bool {
        !self.productive_states()[self.initial()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitset::BitSet;

    fn marks(xs: &[usize]) -> MarkSet {
        xs.iter().copied().collect()
    }

    #[test]
    fn test_generalized_buchi_needs_all_sets() {
        let m0 = marks(&[0]);
        let m1 = marks(&[1]);
        let acc = Acceptance::GeneralizedBuchi { sets: 2 };
        // 0 <-> 1, sets split across the cycle.
        let edges = vec![(0, 1, &m0), (1, 0, &m1)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![true, true]);
        // Only set 0 on the cycle.
        let edges = vec![(0, 1, &m0), (1, 0, &m0)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, false]);
    }

    #[test]
    fn test_zero_sets_need_a_cycle() {
        let none = BitSet::new();
        let acc = Acceptance::GeneralizedBuchi { sets: 0 };
        let edges = vec![(0, 1, &none)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, false]);
        let edges = vec![(0, 1, &none), (1, 1, &none)];
        assert_eq!(productive_nodes(2, &edges, &acc), vec![true, true]);
    }

    #[test]
    fn test_rabin_fin_removes_edges() {
        let fin_inf = marks(&[0, 1]);
        let inf = marks(&[1]);
        let plain = BitSet::new();
        let acc = Acceptance::Rabin { pairs: 1 };
        // A cycle through a Fin edge is rejecting, the inner self-loop is not.
        let edges = vec![(0, 1, &fin_inf), (1, 0, &plain)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, false]);
        let edges = vec![(0, 1, &fin_inf), (1, 0, &plain), (1, 1, &inf)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, true]);
        assert_eq!(productive_nodes(2, &edges, &acc), vec![true, true]);
    }

    #[test]
    fn test_parity_min_even() {
        let c0 = marks(&[0]);
        let c1 = marks(&[1]);
        let c2 = marks(&[2]);
        let acc = Acceptance::Parity { colours: 3 };
        // Cycle with colours 1 and 2: min is odd.
        let edges = vec![(0, 1, &c1), (1, 0, &c2)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, false]);
        // Adding a colour-2 self-loop at 1 gives an accepting cycle.
        let edges = vec![(0, 1, &c1), (1, 0, &c2), (1, 1, &c2)];
        assert_eq!(accepting_cycle_nodes(2, &edges, &acc), vec![false, true]);
        let edges = vec![(0, 0, &c0)];
        assert_eq!(accepting_cycle_nodes(1, &edges, &acc), vec![true]);
    }
}
