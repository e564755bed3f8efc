//! Acceptance conditions and their construction from an explored state graph.
//!
//! The builder records, on every edge, which until-obligations are still pending
//! after the step. An until-obligation that stays pending forever is never
//! fulfilled, so the generalized Büchi condition asks for every obligation to be
//! *not pending* infinitely often. Rabin and parity conditions start from a
//! counter (degeneralization) construction that yields a Büchi automaton. When
//! that automaton is already deterministic its accepting edges are relabelled
//! directly; otherwise it is determinized (see [`crate::determinize`]).

use std::collections::{HashMap, VecDeque};
use std::fmt;

use log::debug;

use crate::automaton::{Automaton, Edge, MarkSet, State, StateId, Transition};
use crate::bitset::BitSet;
use crate::builder::{GraphEdge, StateGraph};
use crate::determinize::{determinize, Bounds};
use crate::error::{Result, TranslationError};
use crate::oracle::CancelToken;

/// Which kind of acceptance condition to construct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcceptanceStrategy {
    #[default]
    GeneralizedBuchi,
    Rabin,
    Parity,
}

impl fmt::Display for AcceptanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptanceStrategy::GeneralizedBuchi => write!(f, "generalized-buchi"),
            AcceptanceStrategy::Rabin => write!(f, "rabin"),
            AcceptanceStrategy::Parity => write!(f, "parity"),
        }
    }
}

/// Acceptance condition over transition marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acceptance {
    /// `Inf(0) & ... & Inf(sets-1)`. With zero sets every infinite run is accepting.
    GeneralizedBuchi { sets: usize },
    /// Pair `i` is `Fin(2i) & Inf(2i+1)`; the condition is the disjunction of pairs.
    Rabin { pairs: usize },
    /// `parity min even`: the least colour seen infinitely often is even.
    Parity { colours: usize },
}

impl Acceptance {
    pub fn num_sets(&self) -> usize {
        match *self {
            Acceptance::GeneralizedBuchi { sets } => sets,
            Acceptance::Rabin { pairs } => 2 * pairs,
            Acceptance::Parity { colours } => colours,
        }
    }

    pub fn strategy(&self) -> AcceptanceStrategy {
        match self {
            Acceptance::GeneralizedBuchi { .. } => AcceptanceStrategy::GeneralizedBuchi,
            Acceptance::Rabin { .. } => AcceptanceStrategy::Rabin,
            Acceptance::Parity { .. } => AcceptanceStrategy::Parity,
        }
    }

    /// The condition only uses `Inf` terms, so more marks never hurt.
    pub fn is_inf_only(&self) -> bool {
        matches!(self, Acceptance::GeneralizedBuchi { .. })
    }

    /// Marks that make a self-loop of a dead state rejecting.
    pub fn rejecting_marks(&self) -> MarkSet {
        match *self {
            Acceptance::GeneralizedBuchi { .. } => BitSet::new(),
            Acceptance::Rabin { pairs } => (0..pairs).map(|i| 2 * i).collect(),
            Acceptance::Parity { colours } => {
                // Least odd colour, or nothing if the condition has no odd colour.
                if colours >= 2 {
                    [1].into_iter().collect()
                } else {
                    BitSet::new()
                }
            }
        }
    }

    /// Value of the `acc-name:` header line.
    pub fn hoa_name(&self) -> String {
        match *self {
            Acceptance::GeneralizedBuchi { sets: 0 } => "all".to_string(),
            Acceptance::GeneralizedBuchi { sets: 1 } => "Buchi".to_string(),
            Acceptance::GeneralizedBuchi { sets } => format!("generalized-Buchi {}", sets),
            Acceptance::Rabin { pairs } => format!("Rabin {}", pairs),
            Acceptance::Parity { colours } => format!("parity min even {}", colours),
        }
    }

    /// Value of the `Acceptance:` header line.
    pub fn hoa_condition(&self) -> String {
        let condition = match *self {
            Acceptance::GeneralizedBuchi { sets: 0 } => "t".to_string(),
            Acceptance::GeneralizedBuchi { sets } => (0..sets)
                .map(|i| format!("Inf({})", i))
                .collect::<Vec<_>>()
                .join("&"),
            Acceptance::Rabin { pairs: 0 } => "f".to_string(),
            Acceptance::Rabin { pairs } => (0..pairs)
                .map(|i| format!("(Fin({})&Inf({}))", 2 * i, 2 * i + 1))
                .collect::<Vec<_>>()
                .join(" | "),
            Acceptance::Parity { colours } => parity_condition(0, colours),
        };
        format!("{} {}", self.num_sets(), condition)
    }
}

fn parity_condition(colour: usize, colours: usize) -> String {
    if colours == 0 {
        return "f".to_string();
    }
    let term = if colour % 2 == 0 {
        format!("Inf({})", colour)
    } else {
        format!("Fin({})", colour)
    };
    if colour + 1 == colours {
        return term;
    }
    let op = if colour % 2 == 0 { "|" } else { "&" };
    let rest = parity_condition(colour + 1, colours);
    if colour + 2 == colours {
        format!("{} {} {}", term, op, rest)
    } else {
        format!("{} {} ({})", term, op, rest)
    }
}

impl fmt::Display for Acceptance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hoa_name())
    }
}

/// Assign acceptance marks to a frozen state graph.
pub fn construct(graph: &StateGraph, strategy: AcceptanceStrategy) -> Result<Automaton> {
    construct_within(graph, strategy, &Bounds::unbounded(&CancelToken::new()))
}

/// Like [`construct`], observing the limits of `bounds` while determinizing.
pub fn construct_within(graph: &StateGraph, strategy: AcceptanceStrategy, bounds: &Bounds) -> Result<Automaton> {
    if !graph.is_frozen() {
        return Err(TranslationError::InternalInvariantViolation(
            "acceptance requested for a state graph that is still under construction".to_string(),
        ));
    }
    let gba = generalized_buchi(graph);
    let automaton = match strategy {
        AcceptanceStrategy::GeneralizedBuchi => gba,
        AcceptanceStrategy::Rabin | AcceptanceStrategy::Parity => {
            let (nba, sink) = degeneralize(&gba, graph.sink());
            if nba.is_deterministic() {
                relabel(&nba, sink, strategy)
            } else {
                determinize(&nba, strategy, bounds)?
            }
        }
    };
    automaton
        .validate()
        .map_err(TranslationError::InternalInvariantViolation)?;
    debug!(
        "constructed {} acceptance: {} states, {} edges",
        automaton.acceptance(),
        automaton.num_states(),
        automaton.num_edges()
    );
    Ok(automaton)
}

/// Number of generalized Büchi sets used for `graph`.
fn gba_sets(graph: &StateGraph) -> usize {
    graph.num_untils().max(1)
}

/// Generalized Büchi marks of a graph edge.
fn gba_marks(graph: &StateGraph, edge: &GraphEdge) -> MarkSet {
    if Some(edge.target) == graph.sink() {
        return BitSet::new();
    }
    let mut marks = BitSet::full(gba_sets(graph));
    for i in edge.pending.iter() {
        marks.remove(i);
    }
    marks
}

fn generalized_buchi(graph: &StateGraph) -> Automaton {
    let states = graph
        .states()
        .iter()
        .map(|s| State {
            name: Some(s.name.clone()),
            transitions: s
                .transitions
                .iter()
                .map(|t| Transition {
                    guard: t.guard.clone(),
                    edges: t
                        .edges
                        .iter()
                        .map(|e| Edge {
                            target: e.target,
                            marks: gba_marks(graph, e),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    Automaton::new(
        graph.atoms().to_vec(),
        states,
        graph.initial(),
        Acceptance::GeneralizedBuchi { sets: gba_sets(graph) },
    )
}

/// Counter construction: a product state `(q, level)` waits for set `level`.
///
/// An edge whose marks cover the awaited set advances the level, possibly past
/// several sets at once; completing the round marks the edge with `Inf(0)` and
/// resets the level to zero. The rejecting `sink` keeps level zero. Returns the
/// Büchi automaton and the id of its sink.
pub fn degeneralize(gba: &Automaton, sink: Option<StateId>) -> (Automaton, Option<StateId>) {
    let k = gba.acceptance().num_sets().max(1);
    let normalize = |(q, level): (StateId, usize)| if Some(q) == sink { (q, 0) } else { (q, level) };

    let mut index: HashMap<(StateId, usize), StateId> = HashMap::new();
    let mut product: Vec<(StateId, usize)> = Vec::new();
    let mut queue = VecDeque::new();
    let mut intern = |key: (StateId, usize),
                      product: &mut Vec<(StateId, usize)>,
                      queue: &mut VecDeque<StateId>|
     -> StateId {
        *index.entry(key).or_insert_with(|| {
            product.push(key);
            queue.push_back(product.len() - 1);
            product.len() - 1
        })
    };

    let initial = intern(normalize((gba.initial(), 0)), &mut product, &mut queue);
    let mut states: Vec<State> = Vec::new();
    let mut buchi_sink = None;
    while let Some(id) = queue.pop_front() {
        let (q, level) = product[id];
        if Some(q) == sink {
            buchi_sink = Some(id);
        }
        let source = gba.state(q);
        let mut transitions = Vec::with_capacity(source.transitions.len());
        for t in &source.transitions {
            let mut edges: Vec<Edge> = Vec::new();
            for e in &t.edges {
                let mut next = level;
                while next < k && e.marks.contains(next) {
                    next += 1;
                }
                let (key, marks) = if next == k {
                    ((e.target, 0), BitSet::from_iter([0]))
                } else {
                    ((e.target, next), BitSet::new())
                };
                let target = intern(normalize(key), &mut product, &mut queue);
                let edge = Edge { target, marks };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
            transitions.push(Transition {
                guard: t.guard.clone(),
                edges,
            });
        }
        let name = source.name.clone().unwrap_or_else(|| q.to_string());
        debug_assert_eq!(states.len(), id);
        states.push(State {
            name: Some(if k > 1 { format!("{} [{}]", name, level) } else { name }),
            transitions,
        });
    }

    let nba = Automaton::new(
        gba.atoms().to_vec(),
        states,
        initial,
        Acceptance::GeneralizedBuchi { sets: 1 },
    );
    (nba, buchi_sink)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum EdgeKind {
    Plain,
    Accepting,
    Sink,
}

/// One-pair Rabin or two-colour parity marks for a deterministic Büchi automaton.
fn relabel(nba: &Automaton, sink: Option<StateId>, strategy: AcceptanceStrategy) -> Automaton {
    let states = nba
        .states()
        .iter()
        .map(|s| State {
            name: s.name.clone(),
            transitions: s
                .transitions
                .iter()
                .map(|t| Transition {
                    guard: t.guard.clone(),
                    edges: t
                        .edges
                        .iter()
                        .map(|e| {
                            let kind = if Some(e.target) == sink {
                                EdgeKind::Sink
                            } else if e.marks.contains(0) {
                                EdgeKind::Accepting
                            } else {
                                EdgeKind::Plain
                            };
                            Edge {
                                target: e.target,
                                marks: marks_of(strategy, kind),
                            }
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    let acceptance = match strategy {
        AcceptanceStrategy::Rabin => Acceptance::Rabin { pairs: 1 },
        _ => Acceptance::Parity { colours: 2 },
    };
    Automaton::new(nba.atoms().to_vec(), states, nba.initial(), acceptance)
}

fn marks_of(strategy: AcceptanceStrategy, kind: EdgeKind) -> MarkSet {
    let mark = match (strategy, kind) {
        (AcceptanceStrategy::Rabin, EdgeKind::Accepting) => Some(1),
        (AcceptanceStrategy::Rabin, EdgeKind::Sink) => Some(0),
        (AcceptanceStrategy::Rabin, EdgeKind::Plain) => None,
        (_, EdgeKind::Accepting) => Some(0),
        (_, _) => Some(1),
    };
    mark.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphState, GraphTransition};
    use crate::guard::Guard;

    #[test]
    fn test_hoa_names() {
        let gba = Acceptance::GeneralizedBuchi { sets: 2 };
        assert_eq!(gba.hoa_name(), "generalized-Buchi 2");
        assert_eq!(gba.hoa_condition(), "2 Inf(0)&Inf(1)");
        let buchi = Acceptance::GeneralizedBuchi { sets: 1 };
        assert_eq!(buchi.hoa_name(), "Buchi");
        assert_eq!(buchi.hoa_condition(), "1 Inf(0)");
        let rabin = Acceptance::Rabin { pairs: 1 };
        assert_eq!(rabin.hoa_name(), "Rabin 1");
        assert_eq!(rabin.hoa_condition(), "2 (Fin(0)&Inf(1))");
        let parity = Acceptance::Parity { colours: 2 };
        assert_eq!(parity.hoa_name(), "parity min even 2");
        assert_eq!(parity.hoa_condition(), "2 Inf(0) | Fin(1)");
    }

    #[test]
    fn test_parity_condition_nests() {
        let parity = Acceptance::Parity { colours: 4 };
        assert_eq!(parity.hoa_condition(), "4 Inf(0) | (Fin(1) & (Inf(2) | Fin(3)))");
    }

    #[test]
    fn test_rejecting_marks() {
        assert!(Acceptance::GeneralizedBuchi { sets: 3 }.rejecting_marks().is_empty());
        let rabin: Vec<usize> = Acceptance::Rabin { pairs: 2 }.rejecting_marks().iter().collect();
        assert_eq!(rabin, vec![0, 2]);
        let parity: Vec<usize> = Acceptance::Parity { colours: 2 }.rejecting_marks().iter().collect();
        assert_eq!(parity, vec![1]);
    }

    fn unfrozen_graph() -> StateGraph {
        StateGraph {
            atoms: vec![],
            states: vec![GraphState {
                formula: crate::formula::Formula::TRUE,
                name: "true".to_string(),
                transitions: vec![GraphTransition {
                    guard: Guard::tt(),
                    edges: vec![GraphEdge {
                        target: 0,
                        pending: BitSet::new(),
                    }],
                }],
            }],
            initial: 0,
            sink: None,
            untils: vec![],
            frozen: false,
        }
    }

    #[test]
    fn test_construct_rejects_unfrozen_graph() {
        let graph = unfrozen_graph();
        assert!(matches!(
            construct(&graph, AcceptanceStrategy::GeneralizedBuchi),
            Err(TranslationError::InternalInvariantViolation(_))
        ));
    }

    #[test]
    fn test_construct_every_strategy() {
        let mut graph = unfrozen_graph();
        graph.frozen = true;
        let gba = construct(&graph, AcceptanceStrategy::GeneralizedBuchi).unwrap();
        assert_eq!(*gba.acceptance(), Acceptance::GeneralizedBuchi { sets: 1 });
        assert_eq!(gba.states()[0].transitions[0].edges[0].marks.len(), 1);

        let rabin = construct(&graph, AcceptanceStrategy::Rabin).unwrap();
        let marks: Vec<usize> = rabin.states()[0].transitions[0].edges[0].marks.iter().collect();
        assert_eq!(marks, vec![1]);

        let parity = construct(&graph, AcceptanceStrategy::Parity).unwrap();
        let marks: Vec<usize> = parity.states()[0].transitions[0].edges[0].marks.iter().collect();
        assert_eq!(marks, vec![0]);
    }
}
