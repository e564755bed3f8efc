//! Language-preserving state reduction.
//!
//! The pipeline is:
//!
//! 1. drop unreachable states;
//! 2. collapse states with an empty language into a single rejecting sink;
//! 3. merge bisimilar states by signature refinement (marks included);
//! 4. optionally, ask a SAT oracle whether pairs of remaining states simulate
//!    each other, and merge the pairs it proves mutually similar;
//! 5. repeat the bisimulation quotient and renumber states breadth-first.
//!
//! Every step keeps the accepted language. Oracle trouble (timeouts, missing
//! solver, bogus models) only stops the oracle step early and is reported as an
//! [`Advisory`]; it never fails the minimization.
//!
//! # Oracle queries
//!
//! For states `p` and `q` the query is a CNF over pair variables `s(x, y)`,
//! read as "`y` simulates `x`", created lazily from `(p, q)` and `(q, p)`. For
//! every edge `x -[g, M]-> x'` and every transition of `y` whose guard meets `g`,
//! the clause `¬s(x,y) ∨ ⋁ s(x', y')` lists the edges `y -[h, N]-> y'` of that
//! transition with compatible marks: `N ⊇ M` for conditions built from `Inf`
//! terms only, `N = M` otherwise. Any model is a direct simulation relation, so
//! every mutually related pair in it may be merged.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::automaton::{Automaton, Edge, MarkSet, State, StateId, Transition};
use crate::bdd::Bdd;
use crate::error::Advisory;
use crate::guard::Guard;
use crate::oracle::{dispatch, CancelToken, CnfQuery, SatOracle, Verdict};
use crate::reference::Ref;
use crate::sat::Cnf;
use crate::types::{Lit, Var};

/// Limits on oracle use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleBudget {
    /// Wall-clock bound per query.
    pub time_per_query: Option<Duration>,
    /// Maximum number of queries.
    pub max_queries: usize,
    /// Maximum number of pair variables in one query.
    pub max_pair_vars: usize,
    /// The oracle step stops once this instant has passed.
    pub deadline: Option<Instant>,
}

impl Default for OracleBudget {
    fn default() -> Self {
        Self {
            time_per_query: Some(Duration::from_secs(1)),
            max_queries: 256,
            max_pair_vars: 4096,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimized {
    pub automaton: Automaton,
    pub advisories: Vec<Advisory>,
    /// Number of oracle queries issued.
    pub queries: usize,
}

/// Reduce `automaton`, using `oracle` for simulation questions if given.
pub fn minimize(
    automaton: &Automaton,
    oracle: Option<&Arc<dyn SatOracle>>,
    budget: &OracleBudget,
    cancel: &CancelToken,
) -> Minimized {
    let input_states = automaton.num_states();
    let trimmed = trim_unreachable(automaton);
    let collapsed = collapse_dead(&trimmed);
    let mut current = bisimulation_quotient(&collapsed);
    debug!(
        "minimize: {} -> {} (trim) -> {} (dead) -> {} (bisimulation)",
        input_states,
        trimmed.num_states(),
        collapsed.num_states(),
        current.num_states()
    );

    let mut advisories = Vec::new();
    let mut queries = 0;
    if let Some(oracle) = oracle {
        let mut phase = OraclePhase::new(&current, oracle, budget, cancel);
        let classes = phase.run();
        queries = phase.queries;
        advisories = phase.advisories;
        current = quotient(&current, &classes);
        current = bisimulation_quotient(&current);
    }
    let result = renumber(&current);

    if result.num_states() > input_states {
        warn!("minimization produced more states than its input, keeping the input");
        return Minimized {
            automaton: automaton.clone(),
            advisories,
            queries,
        };
    }
    info!(
        "minimized {} -> {} states ({} oracle queries)",
        input_states,
        result.num_states(),
        queries
    );
    Minimized {
        automaton: result,
        advisories,
        queries,
    }
}

/// Keep the states reachable from the initial state, in original order.
pub fn trim_unreachable(automaton: &Automaton) -> Automaton {
    let adjacency: Vec<Vec<StateId>> = automaton
        .successors()
        .into_iter()
        .map(|succ| succ.into_iter().map(|(t, _)| t).collect())
        .collect();
    let reachable = crate::scc::reachable(&adjacency, automaton.initial());
    let mut new_id = vec![None; automaton.num_states()];
    let mut next = 0;
    for (q, &r) in reachable.iter().enumerate() {
        if r {
            new_id[q] = Some(next);
            next += 1;
        }
    }
    let states = automaton
        .states()
        .iter()
        .enumerate()
        .filter(|&(q, _)| reachable[q])
        .map(|(_, s)| State {
            name: s.name.clone(),
            transitions: s
                .transitions
                .iter()
                .map(|t| Transition {
                    guard: t.guard.clone(),
                    edges: t
                        .edges
                        .iter()
                        .filter_map(|e| {
                            new_id[e.target].map(|target| Edge {
                                target,
                                marks: e.marks.clone(),
                            })
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();
    let initial = new_id[automaton.initial()].unwrap_or(0);
    Automaton::new(
        automaton.atoms().to_vec(),
        states,
        initial,
        *automaton.acceptance(),
    )
}

/// Redirect every edge into an empty-language state to one rejecting sink.
pub fn collapse_dead(automaton: &Automaton) -> Automaton {
    let productive = automaton.productive_states();
    if productive.iter().all(|&p| p) {
        return automaton.clone();
    }
    let acceptance = *automaton.acceptance();
    let rejecting = acceptance.rejecting_marks();

    // Productive states keep their relative order; the sink comes last.
    let mut new_id = vec![0; automaton.num_states()];
    let mut next = 0;
    for (q, &p) in productive.iter().enumerate() {
        if p {
            new_id[q] = next;
            next += 1;
        }
    }
    let sink = next;
    for (q, &p) in productive.iter().enumerate() {
        if !p {
            new_id[q] = sink;
        }
    }

    let mut states: Vec<State> = Vec::with_capacity(sink + 1);
    for (q, s) in automaton.states().iter().enumerate() {
        if !productive[q] {
            continue;
        }
        let transitions = s
            .transitions
            .iter()
            .map(|t| {
                let mut edges: Vec<Edge> = Vec::with_capacity(t.edges.len());
                for e in &t.edges {
                    let edge = if productive[e.target] {
                        Edge {
                            target: new_id[e.target],
                            marks: e.marks.clone(),
                        }
                    } else {
                        Edge {
                            target: sink,
                            marks: rejecting.clone(),
                        }
                    };
                    if !edges.contains(&edge) {
                        edges.push(edge);
                    }
                }
                Transition {
                    guard: t.guard.clone(),
                    edges,
                }
            })
            .collect();
        states.push(State {
            name: s.name.clone(),
            transitions,
        });
    }
    states.push(State {
        name: Some("false".to_string()),
        transitions: vec![Transition {
            guard: Guard::tt(),
            edges: vec![Edge {
                target: sink,
                marks: rejecting,
            }],
        }],
    });
    debug!("collapsed {} dead states", productive.iter().filter(|&&p| !p).count());
    Automaton::new(
        automaton.atoms().to_vec(),
        states,
        new_id[automaton.initial()],
        acceptance,
    )
}

/// Letter-wise successor sets, as `(edge set, guard)` pairs sorted by edge set.
type Signature = Vec<(Vec<(usize, MarkSet)>, Ref)>;

fn signature(bdd: &Bdd, state: &State, class: &[usize]) -> Signature {
    let mut groups: Vec<(Vec<(usize, MarkSet)>, Ref)> = Vec::new();
    for t in &state.transitions {
        let mut key: Vec<(usize, MarkSet)> = t.edges.iter().map(|e| (class[e.target], e.marks.clone())).collect();
        key.sort();
        key.dedup();
        let g = t.guard.to_bdd(bdd);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, guard)) => *guard = bdd.apply_or(*guard, g),
            None => groups.push((key, g)),
        }
    }
    groups.sort();
    groups
}

/// Coarsest partition into classes with equal letter-wise successor sets.
pub fn bisimulation_classes(automaton: &Automaton) -> Vec<usize> {
    let bdd = Bdd::default();
    let n = automaton.num_states();
    let mut class = vec![0; n];
    let mut count = 1.min(n);
    loop {
        let mut index: HashMap<(usize, Signature), usize> = HashMap::new();
        let mut refined = vec![0; n];
        for q in 0..n {
            let key = (class[q], signature(&bdd, automaton.state(q), &class));
            let next = index.len();
            refined[q] = *index.entry(key).or_insert(next);
        }
        let new_count = index.len();
        class = refined;
        if new_count == count {
            return class;
        }
        count = new_count;
    }
}

pub fn bisimulation_quotient(automaton: &Automaton) -> Automaton {
    let classes = bisimulation_classes(automaton);
    quotient(automaton, &classes)
}

/// Merge states by `class`, keeping the transitions of the first member of each class.
///
/// Edges are deduplicated and transitions with equal edge sets are merged.
pub fn quotient(automaton: &Automaton, class: &[usize]) -> Automaton {
    let num_classes = class.iter().map(|&c| c + 1).max().unwrap_or(0);
    let mut representative: Vec<Option<StateId>> = vec![None; num_classes];
    for (q, &c) in class.iter().enumerate() {
        if representative[c].is_none() {
            representative[c] = Some(q);
        }
    }
    let bdd = Bdd::default();
    let states = representative
        .iter()
        .map(|rep| {
            let Some(rep) = *rep else {
                return State {
                    name: None,
                    transitions: Vec::new(),
                };
            };
            let source = automaton.state(rep);
            let mut merged: Vec<(Vec<Edge>, Ref)> = Vec::new();
            for t in &source.transitions {
                let mut edges: Vec<Edge> = t
                    .edges
                    .iter()
                    .map(|e| Edge {
                        target: class[e.target],
                        marks: e.marks.clone(),
                    })
                    .collect();
                edges.sort();
                edges.dedup();
                let g = t.guard.to_bdd(&bdd);
                match merged.iter_mut().find(|(es, _)| *es == edges) {
                    Some((_, guard)) => *guard = bdd.apply_or(*guard, g),
                    None => merged.push((edges, g)),
                }
            }
            State {
                name: source.name.clone(),
                transitions: merged
                    .into_iter()
                    .map(|(edges, g)| Transition {
                        guard: Guard::from_bdd(&bdd, g),
                        edges,
                    })
                    .collect(),
            }
        })
        .collect();
    Automaton::new(
        automaton.atoms().to_vec(),
        states,
        class[automaton.initial()],
        *automaton.acceptance(),
    )
}

/// Renumber states in breadth-first order from the initial state, dropping unreachable ones.
pub fn renumber(automaton: &Automaton) -> Automaton {
    let n = automaton.num_states();
    let mut order = Vec::with_capacity(n);
    let mut new_id: Vec<Option<StateId>> = vec![None; n];
    let mut queue = VecDeque::new();
    new_id[automaton.initial()] = Some(0);
    order.push(automaton.initial());
    queue.push_back(automaton.initial());
    while let Some(q) = queue.pop_front() {
        for t in &automaton.state(q).transitions {
            for e in &t.edges {
                if new_id[e.target].is_none() {
                    new_id[e.target] = Some(order.len());
                    order.push(e.target);
                    queue.push_back(e.target);
                }
            }
        }
    }
    let states = order
        .iter()
        .map(|&q| {
            let s = automaton.state(q);
            State {
                name: s.name.clone(),
                transitions: s
                    .transitions
                    .iter()
                    .map(|t| Transition {
                        guard: t.guard.clone(),
                        edges: t
                            .edges
                            .iter()
                            .filter_map(|e| {
                                new_id[e.target].map(|target| Edge {
                                    target,
                                    marks: e.marks.clone(),
                                })
                            })
                            .collect(),
                    })
                    .collect(),
            }
        })
        .collect();
    Automaton::new(automaton.atoms().to_vec(), states, 0, *automaton.acceptance())
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut x = x;
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }

    /// Union keeping the smaller root, so classes are represented by their first member.
    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }

    /// Dense class numbers in order of first member.
    fn classes(&mut self) -> Vec<usize> {
        let n = self.parent.len();
        let mut number: HashMap<usize, usize> = HashMap::new();
        (0..n)
            .map(|x| {
                let root = self.find(x);
                let next = number.len();
                *number.entry(root).or_insert(next)
            })
            .collect()
    }
}

/// The CNF of a mutual-simulation question, with the meaning of its variables.
#[derive(Debug)]
pub struct SimulationQuery {
    pub cnf: Cnf,
    /// `pairs[v - 1] = (x, y)` for variable `v`, read "y simulates x".
    pub pairs: Vec<(StateId, StateId)>,
}

/// Lazily allocated pair variables of a [`SimulationQuery`].
struct PairVars {
    cnf: Cnf,
    pairs: Vec<(StateId, StateId)>,
    vars: HashMap<(StateId, StateId), Var>,
    queue: VecDeque<(StateId, StateId)>,
    max_vars: usize,
}

impl PairVars {
    fn var(&mut self, pair: (StateId, StateId)) -> Option<Var> {
        if let Some(&v) = self.vars.get(&pair) {
            return Some(v);
        }
        if self.pairs.len() >= self.max_vars {
            return None;
        }
        let v = self.cnf.new_var();
        self.vars.insert(pair, v);
        self.pairs.push(pair);
        self.queue.push_back(pair);
        Some(v)
    }
}

/// Encode "`p` and `q` simulate each other" with at most `max_vars` pair variables.
///
/// Pairs beyond the cap are treated as not simulating, which only strengthens
/// the query.
pub fn simulation_query(automaton: &Automaton, p: StateId, q: StateId, max_vars: usize) -> SimulationQuery {
    let inf_only = automaton.acceptance().is_inf_only();
    let compatible = |m: &MarkSet, n: &MarkSet| if inf_only { m.is_subset(n) } else { m == n };

    let mut vars = PairVars {
        cnf: Cnf::new(),
        pairs: Vec::new(),
        vars: HashMap::new(),
        queue: VecDeque::new(),
        max_vars,
    };
    for pair in [(p, q), (q, p)] {
        match vars.var(pair) {
            Some(v) => vars.cnf.add_clause([v.pos()]),
            None => vars.cnf.add_clause(Vec::<Lit>::new()),
        }
    }

    while let Some((x, y)) = vars.queue.pop_front() {
        let Some(&sxy) = vars.vars.get(&(x, y)) else {
            continue;
        };
        for tx in &automaton.state(x).transitions {
            for ty in &automaton.state(y).transitions {
                if !tx.guard.intersects(&ty.guard) {
                    continue;
                }
                for e in &tx.edges {
                    let mut clause: Vec<Lit> = vec![sxy.neg()];
                    let mut trivial = false;
                    for f in &ty.edges {
                        if !compatible(&e.marks, &f.marks) {
                            continue;
                        }
                        if e.target == f.target {
                            trivial = true;
                            break;
                        }
                        if let Some(v) = vars.var((e.target, f.target)) {
                            clause.push(v.pos());
                        }
                    }
                    if !trivial {
                        vars.cnf.add_clause(clause);
                    }
                }
            }
        }
    }
    SimulationQuery {
        cnf: vars.cnf,
        pairs: vars.pairs,
    }
}

struct OraclePhase<'a> {
    automaton: &'a Automaton,
    oracle: &'a Arc<dyn SatOracle>,
    budget: &'a OracleBudget,
    cancel: &'a CancelToken,
    union_find: UnionFind,
    queries: usize,
    timeouts: usize,
    invalid_witness: bool,
    advisories: Vec<Advisory>,
}

impl<'a> OraclePhase<'a> {
    fn new(
        automaton: &'a Automaton,
        oracle: &'a Arc<dyn SatOracle>,
        budget: &'a OracleBudget,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            automaton,
            oracle,
            budget,
            cancel,
            union_find: UnionFind::new(automaton.num_states()),
            queries: 0,
            timeouts: 0,
            invalid_witness: false,
            advisories: Vec::new(),
        }
    }

    fn expired(&self) -> bool {
        self.cancel.is_cancelled() || self.budget.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn time_budget(&self) -> Option<Duration> {
        let left = self
            .budget
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()));
        match (self.budget.time_per_query, left) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Ask about every candidate pair and return the resulting classes.
    fn run(&mut self) -> Vec<usize> {
        let n = self.automaton.num_states();
        let candidates: Vec<(StateId, StateId)> = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .collect();
        debug!("oracle {}: {} candidate pairs", self.oracle.name(), candidates.len());

        for (i, &(p, q)) in candidates.iter().enumerate() {
            if self.union_find.find(p) == self.union_find.find(q) {
                continue;
            }
            if self.expired() {
                let skipped = candidates.len() - i;
                warn!("oracle step interrupted, {} candidate pairs skipped", skipped);
                self.timeouts += skipped;
                break;
            }
            if self.queries >= self.budget.max_queries {
                warn!("oracle query budget of {} exhausted", self.budget.max_queries);
                self.advisories.push(Advisory::OracleBudgetExhausted {
                    queries: self.budget.max_queries,
                });
                break;
            }
            if !self.ask(p, q) {
                break;
            }
        }

        if self.timeouts > 0 {
            self.advisories.push(Advisory::OracleTimeout { pairs: self.timeouts });
        }
        if self.invalid_witness {
            self.advisories.push(Advisory::OracleInvalidWitness);
        }
        self.union_find.classes()
    }

    /// Issue one query. Returns `false` when the phase must stop.
    fn ask(&mut self, p: StateId, q: StateId) -> bool {
        let SimulationQuery { cnf, pairs } = simulation_query(self.automaton, p, q, self.budget.max_pair_vars);
        let query = CnfQuery {
            cnf,
            time_budget: self.time_budget(),
        };
        self.queries += 1;
        match dispatch(self.oracle, query.clone(), self.cancel) {
            Verdict::Sat(model) => {
                if !model.satisfies(&query.cnf) {
                    warn!("oracle {} returned an invalid model for ({}, {})", self.oracle.name(), p, q);
                    self.invalid_witness = true;
                    return true;
                }
                let related: HashMap<(StateId, StateId), bool> = pairs
                    .iter()
                    .enumerate()
                    .map(|(k, &pair)| (pair, model.value(Var::new(k as u32 + 1))))
                    .collect();
                let mut merged = 0;
                for (&(x, y), &holds) in &related {
                    if holds && x < y && related.get(&(y, x)).copied().unwrap_or(false) {
                        self.union_find.union(x, y);
                        merged += 1;
                    }
                }
                debug!("oracle: ({}, {}) mutually similar, {} pairs merged", p, q, merged);
                true
            }
            Verdict::Unsat => true,
            Verdict::Timeout => {
                self.timeouts += 1;
                true
            }
            Verdict::Unavailable(reason) => {
                warn!("oracle {} unavailable: {}", self.oracle.name(), reason);
                self.advisories.push(Advisory::OracleUnavailable { reason });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptance::Acceptance;
    use crate::oracle::CadicalOracle;
    use crate::types::Var;
    use crate::word::LassoWord;

    use test_log::test;

    /// Three states over `a`, where states 1 and 2 are copies: both accept `G F a`.
    fn redundant() -> Automaton {
        let bdd = Bdd::default();
        let a = bdd.mk_var(Var::from_ap(0));
        let ga = Guard::from_bdd(&bdd, a);
        let gna = Guard::from_bdd(&bdd, -a);
        let edge = |target, marks: &[usize]| Edge {
            target,
            marks: marks.iter().copied().collect(),
        };
        let state = |hit: StateId, miss: StateId| State {
            name: None,
            transitions: vec![
                Transition {
                    guard: ga.clone(),
                    edges: vec![edge(hit, &[0])],
                },
                Transition {
                    guard: gna.clone(),
                    edges: vec![edge(miss, &[])],
                },
            ],
        };
        Automaton::new(
            vec!["a".to_string()],
            vec![state(1, 2), state(2, 1), state(1, 2)],
            0,
            Acceptance::GeneralizedBuchi { sets: 1 },
        )
    }

    fn words() -> Vec<LassoWord> {
        vec![
            LassoWord::from_names(&["a"], &[], &[&["a"]]),
            LassoWord::from_names(&["a"], &[&["a"]], &[&[]]),
            LassoWord::from_names(&["a"], &[&[]], &[&["a"], &[]]),
            LassoWord::from_names(&["a"], &[&[], &[]], &[&[]]),
        ]
    }

    #[test]
    fn test_bisimulation_merges_copies() {
        let aut = redundant();
        let m = minimize(&aut, None, &OracleBudget::default(), &CancelToken::new());
        assert_eq!(m.automaton.num_states(), 1);
        assert!(m.advisories.is_empty());
        assert_eq!(m.automaton.validate(), Ok(()));
        for w in words() {
            assert_eq!(aut.accepts(&w), m.automaton.accepts(&w), "{}", w);
        }
    }

    #[test]
    fn test_collapse_dead_states() {
        // 0 --a--> 1 (dead, loops without marks), 0 --!a--> 0 with mark.
        let bdd = Bdd::default();
        let a = bdd.mk_var(Var::from_ap(0));
        let aut = Automaton::new(
            vec!["a".to_string()],
            vec![
                State {
                    name: None,
                    transitions: vec![
                        Transition {
                            guard: Guard::from_bdd(&bdd, a),
                            edges: vec![Edge {
                                target: 1,
                                marks: MarkSet::new(),
                            }],
                        },
                        Transition {
                            guard: Guard::from_bdd(&bdd, -a),
                            edges: vec![Edge {
                                target: 0,
                                marks: [0].into_iter().collect(),
                            }],
                        },
                    ],
                },
                State {
                    name: None,
                    transitions: vec![Transition {
                        guard: Guard::tt(),
                        edges: vec![Edge {
                            target: 1,
                            marks: MarkSet::new(),
                        }],
                    }],
                },
            ],
            0,
            Acceptance::GeneralizedBuchi { sets: 1 },
        );
        let collapsed = collapse_dead(&aut);
        assert_eq!(collapsed.num_states(), 2);
        assert_eq!(collapsed.productive_states(), vec![true, false]);
        assert_eq!(collapsed.validate(), Ok(()));
    }

    #[test]
    fn test_renumber_is_breadth_first() {
        let aut = redundant();
        let reversed = quotient(&aut, &[2, 1, 0]);
        assert_eq!(reversed.initial(), 2);
        let renumbered = renumber(&reversed);
        assert_eq!(renumbered.initial(), 0);
        assert_eq!(renumbered.num_states(), 3);
        assert_eq!(renumbered.validate(), Ok(()));
    }

    #[test]
    fn test_simulation_query_shape() {
        let aut = redundant();
        let q = simulation_query(&aut, 1, 2, 100);
        // Units for both directions come first.
        assert_eq!(q.pairs[0], (1, 2));
        assert_eq!(q.pairs[1], (2, 1));
        let model = crate::sat::solve(&q.cnf, &CancelToken::new(), None).unwrap();
        assert!(model.is_some());
    }

    #[test]
    fn test_simulation_query_respects_cap() {
        let aut = redundant();
        let q = simulation_query(&aut, 1, 2, 1);
        assert_eq!(q.pairs.len(), 1);
        assert_eq!(q.cnf.num_vars(), 1);
    }

    #[test]
    fn test_oracle_merges_simulation_equivalent_states() {
        // 0 -a-> 1, 0 -!a-> 2; 1 -> 3; 2 -> {3, 4}; 3 accepts everything; 4 accepts G F a.
        // 1 and 2 simulate each other but are not bisimilar.
        let bdd = Bdd::default();
        let a = bdd.mk_var(Var::from_ap(0));
        let ga = Guard::from_bdd(&bdd, a);
        let gna = Guard::from_bdd(&bdd, -a);
        let edge = |target, marks: &[usize]| Edge {
            target,
            marks: marks.iter().copied().collect(),
        };
        let single = |guard: Guard, edges: Vec<Edge>| Transition { guard, edges };
        let aut = Automaton::new(
            vec!["a".to_string()],
            vec![
                State {
                    name: None,
                    transitions: vec![single(ga.clone(), vec![edge(1, &[])]), single(gna.clone(), vec![edge(2, &[])])],
                },
                State {
                    name: None,
                    transitions: vec![single(Guard::tt(), vec![edge(3, &[])])],
                },
                State {
                    name: None,
                    transitions: vec![single(Guard::tt(), vec![edge(3, &[]), edge(4, &[])])],
                },
                State {
                    name: None,
                    transitions: vec![single(Guard::tt(), vec![edge(3, &[0])])],
                },
                State {
                    name: None,
                    transitions: vec![single(ga, vec![edge(4, &[0])]), single(gna, vec![edge(4, &[])])],
                },
            ],
            0,
            Acceptance::GeneralizedBuchi { sets: 1 },
        );
        assert_eq!(aut.validate(), Ok(()));
        let oracle: Arc<dyn SatOracle> = Arc::new(CadicalOracle);
        let plain = minimize(&aut, None, &OracleBudget::default(), &CancelToken::new());
        let with_oracle = minimize(&aut, Some(&oracle), &OracleBudget::default(), &CancelToken::new());
        assert_eq!(plain.automaton.num_states(), 5);
        assert_eq!(with_oracle.automaton.num_states(), 3);
        assert!(with_oracle.queries >= 1);
        assert!(with_oracle.advisories.is_empty());
        assert_eq!(with_oracle.automaton.validate(), Ok(()));
        for w in words() {
            assert_eq!(aut.accepts(&w), with_oracle.automaton.accepts(&w), "{}", w);
        }
    }
}
