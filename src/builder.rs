//! On-the-fly state-space construction.
//!
//! Every state stands for a residual obligation: a canonical [`Formula`] that
//! must hold on the rest of the word. Expanding a state enumerates its *covers*:
//! ways of satisfying the obligation now, each given by a guard over the current
//! letter, the conjunction of obligations left for the next step, and the set of
//! until-obligations it postpones. Covers with the same successor are merged by
//! OR-ing their guards, and [`Bdd::partition`][crate::bdd::Bdd::partition] turns the
//! overlapping guards into disjoint regions. Each region becomes one transition
//! whose edges lead to every successor enabled on it.
//!
//! Successors are canonicalized by the formula arena's smart constructors and
//! memoized, so the obligation to state mapping is a bijection and exploration
//! terminates on the closure of the input formula.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::{debug, info};

use crate::acceptance::{self, AcceptanceStrategy};
use crate::automaton::{Automaton, StateId};
use crate::bitset::BitSet;
use crate::determinize::Bounds;
use crate::error::{Limit, Resource, Result, TranslationError};
use crate::formula::{Formula, FormulaNode};
use crate::guard::Guard;
use crate::oracle::CancelToken;
use crate::reference::Ref;
use crate::translate::{ResourceLimits, Session};
use crate::types::Var;

/// Explored state graph, before acceptance marks are assigned.
#[derive(Debug, Clone)]
pub struct StateGraph {
    pub(crate) atoms: Vec<String>,
    pub(crate) states: Vec<GraphState>,
    pub(crate) initial: StateId,
    pub(crate) sink: Option<StateId>,
    pub(crate) untils: Vec<Formula>,
    pub(crate) frozen: bool,
}

#[derive(Debug, Clone)]
pub struct GraphState {
    pub formula: Formula,
    pub name: String,
    pub transitions: Vec<GraphTransition>,
}

#[derive(Debug, Clone)]
pub struct GraphTransition {
    pub guard: Guard,
    pub edges: Vec<GraphEdge>,
}

/// Successor together with the until-obligations still pending after the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub target: StateId,
    pub pending: BitSet,
}

impl StateGraph {
    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn states(&self) -> &[GraphState] {
        &self.states
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    /// The state of the `false` obligation, if it was reached.
    pub fn sink(&self) -> Option<StateId> {
        self.sink
    }

    /// Number of distinct until-obligations tracked by `pending` sets.
    pub fn num_untils(&self) -> usize {
        self.untils.len()
    }

    pub fn untils(&self) -> &[Formula] {
        &self.untils
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

/// Explore `formula` and attach the acceptance condition chosen by `strategy`.
pub fn build(
    session: &Session,
    formula: Formula,
    strategy: AcceptanceStrategy,
    limits: &ResourceLimits,
    cancel: &CancelToken,
) -> Result<Automaton> {
    let graph = StateSpaceBuilder::new(session, limits, cancel).explore(formula)?;
    let bounds = Bounds {
        max_states: limits.max_states,
        deadline: limits.deadline.map(|d| (session.started() + d, d)),
        cancel,
    };
    acceptance::construct_within(&graph, strategy, &bounds)
}

/// One way of satisfying a state's obligation in the current step.
#[derive(Debug)]
struct Cover {
    guard: Ref,
    next: Vec<Formula>,
    pending: BitSet,
}

#[derive(Debug, Clone)]
struct Partial {
    todo: Vec<Formula>,
    guard: Ref,
    next: Vec<Formula>,
    pending: BitSet,
    processed: HashSet<Formula>,
}

/// Successor obligation together with its guard.
#[derive(Debug)]
struct Successor {
    formula: Formula,
    pending: BitSet,
    guard: Ref,
}

pub struct StateSpaceBuilder<'a> {
    session: &'a Session,
    limits: &'a ResourceLimits,
    cancel: &'a CancelToken,
    deadline: Option<Instant>,
    states: Vec<GraphState>,
    index: HashMap<Formula, StateId>,
    queue: VecDeque<StateId>,
    untils: Vec<Formula>,
    until_index: HashMap<Formula, usize>,
    literals: Vec<Ref>,
}

impl<'a> StateSpaceBuilder<'a> {
    pub fn new(session: &'a Session, limits: &'a ResourceLimits, cancel: &'a CancelToken) -> Self {
        let bdd = session.bdd();
        let literals: Vec<Ref> = (0..session.arena().num_atoms())
            .map(|ap| bdd.mk_var(Var::from_ap(ap)))
            .collect();
        for &lit in &literals {
            bdd.protect(lit);
        }
        Self {
            session,
            limits,
            cancel,
            deadline: limits.deadline.map(|d| session.started() + d),
            states: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
            untils: Vec::new(),
            until_index: HashMap::new(),
            literals,
        }
    }

    /// Run the worklist until every reachable obligation is expanded.
    ///
    /// The returned graph is frozen. On error nothing is returned.
    pub fn explore(mut self, formula: Formula) -> Result<StateGraph> {
        let result = self.run(formula);
        let session = self.session;
        let bdd = session.bdd();
        for &lit in &self.literals {
            bdd.release(lit);
        }
        let initial = result?;

        let sink = self.index.get(&Formula::FALSE).copied();
        info!(
            "explored {} states ({} until-obligations, {} diagram nodes)",
            self.states.len(),
            self.untils.len(),
            bdd.node_count()
        );
        Ok(StateGraph {
            atoms: session.arena().atoms(),
            states: self.states,
            initial,
            sink,
            untils: self.untils,
            frozen: true,
        })
    }

    fn run(&mut self, formula: Formula) -> Result<StateId> {
        let initial = self.intern(formula)?;
        while let Some(id) = self.queue.pop_front() {
            self.check_interrupt()?;
            let transitions = self.expand_state(self.states[id].formula)?;
            self.states[id].transitions = transitions;
            self.check_nodes()?;
        }
        Ok(initial)
    }

    fn intern(&mut self, formula: Formula) -> Result<StateId> {
        if let Some(&id) = self.index.get(&formula) {
            return Ok(id);
        }
        if self.states.len() >= self.limits.max_states {
            return Err(TranslationError::ResourceExhausted {
                resource: Resource::States,
                limit: Limit::Count(self.limits.max_states),
            });
        }
        let id = self.states.len();
        let name = self.session.arena().display(formula).to_string();
        debug!("state {}: {}", id, name);
        self.states.push(GraphState {
            formula,
            name,
            transitions: Vec::new(),
        });
        self.index.insert(formula, id);
        self.queue.push_back(id);
        Ok(id)
    }

    fn until_index(&mut self, until: Formula) -> usize {
        if let Some(&i) = self.until_index.get(&until) {
            return i;
        }
        let i = self.untils.len();
        self.untils.push(until);
        self.until_index.insert(until, i);
        i
    }

    fn check_interrupt(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }
        if let (Some(deadline), Some(limit)) = (self.deadline, self.limits.deadline) {
            if Instant::now() >= deadline {
                return Err(TranslationError::ResourceExhausted {
                    resource: Resource::Time,
                    limit: Limit::Duration(limit),
                });
            }
        }
        Ok(())
    }

    fn check_nodes(&self) -> Result<()> {
        let bdd = self.session.bdd();
        let limit = self.limits.max_diagram_nodes;
        if bdd.node_count() <= limit {
            return Ok(());
        }
        // Guards already live in manager-free form, so only the literals are roots.
        let freed = bdd.collect_garbage(&[]);
        debug!("collected {} diagram nodes, {} remain", freed, bdd.node_count());
        if bdd.node_count() > limit {
            return Err(TranslationError::ResourceExhausted {
                resource: Resource::DiagramNodes,
                limit: Limit::Count(limit),
            });
        }
        Ok(())
    }

    /// Compute the outgoing transitions of the state for `formula`.
    fn expand_state(&mut self, formula: Formula) -> Result<Vec<GraphTransition>> {
        let covers = self.covers(formula)?;
        let successors = self.group(covers);
        let session = self.session;
        let bdd = session.bdd();
        let guards: Vec<Ref> = successors.iter().map(|s| s.guard).collect();
        let regions = bdd.partition(&guards);

        let mut transitions = Vec::with_capacity(regions.len());
        for (region, members) in regions {
            let mut edges = Vec::with_capacity(members.len().max(1));
            for m in members {
                let target = self.intern(successors[m].formula)?;
                edges.push(GraphEdge {
                    target,
                    pending: successors[m].pending.clone(),
                });
            }
            if edges.is_empty() {
                // No cover applies: the obligation is violated on this region.
                let sink = self.intern(Formula::FALSE)?;
                edges.push(GraphEdge {
                    target: sink,
                    pending: BitSet::new(),
                });
            }
            transitions.push(GraphTransition {
                guard: Guard::from_bdd(bdd, region),
                edges,
            });
        }
        Ok(transitions)
    }

    /// Merge covers with the same successor and pending set, keeping first-seen order.
    fn group(&self, covers: Vec<Cover>) -> Vec<Successor> {
        let arena = self.session.arena();
        let bdd = self.session.bdd();
        let mut index: HashMap<(Formula, BitSet), usize> = HashMap::new();
        let mut successors: Vec<Successor> = Vec::new();
        for cover in covers {
            let formula = arena.mk_and(cover.next);
            if formula == Formula::FALSE {
                continue;
            }
            match index.get(&(formula, cover.pending.clone())) {
                Some(&i) => {
                    successors[i].guard = bdd.apply_or(successors[i].guard, cover.guard);
                }
                None => {
                    index.insert((formula, cover.pending.clone()), successors.len());
                    successors.push(Successor {
                        formula,
                        pending: cover.pending,
                        guard: cover.guard,
                    });
                }
            }
        }
        successors
    }

    /// Enumerate the covers of `formula` depth-first, left branch first.
    fn covers(&mut self, formula: Formula) -> Result<Vec<Cover>> {
        let session = self.session;
        let arena = session.arena();
        let bdd = session.bdd();
        let mut covers = Vec::new();
        let mut stack = vec![Partial {
            todo: vec![formula],
            guard: bdd.one(),
            next: Vec::new(),
            pending: BitSet::new(),
            processed: HashSet::new(),
        }];
        let mut steps = 0usize;

        while let Some(mut p) = stack.pop() {
            steps += 1;
            if steps % 4096 == 0 {
                self.check_interrupt()?;
            }
            let Some(f) = p.todo.pop() else {
                covers.push(Cover {
                    guard: p.guard,
                    next: p.next,
                    pending: p.pending,
                });
                continue;
            };
            if !p.processed.insert(f) {
                stack.push(p);
                continue;
            }
            match arena.node(f) {
                FormulaNode::True => stack.push(p),
                FormulaNode::False => {}
                FormulaNode::Atom(ap) => {
                    p.guard = bdd.apply_and(p.guard, self.literals[ap as usize]);
                    if !bdd.is_zero(p.guard) {
                        stack.push(p);
                    }
                }
                FormulaNode::NegAtom(ap) => {
                    p.guard = bdd.apply_and(p.guard, -self.literals[ap as usize]);
                    if !bdd.is_zero(p.guard) {
                        stack.push(p);
                    }
                }
                FormulaNode::And(xs) => {
                    p.todo.extend(xs.into_iter().rev());
                    stack.push(p);
                }
                FormulaNode::Or(xs) => {
                    for x in xs.into_iter().rev() {
                        let mut q = p.clone();
                        q.todo.push(x);
                        stack.push(q);
                    }
                }
                FormulaNode::Next(a) => {
                    p.next.push(a);
                    stack.push(p);
                }
                FormulaNode::Until(a, b) => {
                    // a U b  =  b | (a & X(a U b)), the second branch postponing it.
                    let mut postpone = p.clone();
                    if a != Formula::TRUE {
                        postpone.todo.push(a);
                    }
                    postpone.next.push(f);
                    postpone.pending.insert(self.until_index(f));
                    stack.push(postpone);
                    p.todo.push(b);
                    stack.push(p);
                }
                FormulaNode::Release(a, b) => {
                    // a R b  =  (a & b) | (b & X(a R b))
                    let mut postpone = p.clone();
                    postpone.todo.push(b);
                    postpone.next.push(f);
                    stack.push(postpone);
                    if a != Formula::FALSE {
                        p.todo.push(b);
                        p.todo.push(a);
                        stack.push(p);
                    }
                }
            }
        }
        Ok(covers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltl::Ltl;
    use crate::normalize::normalize;

    use test_log::test;

    fn explore(ltl: &Ltl) -> StateGraph {
        let session = Session::new();
        let f = normalize(session.arena(), ltl).unwrap();
        let limits = ResourceLimits::default();
        StateSpaceBuilder::new(&session, &limits, &CancelToken::new())
            .explore(f)
            .unwrap()
    }

    fn total(graph: &StateGraph) -> bool {
        let bdd = crate::bdd::Bdd::default();
        graph.states().iter().all(|s| {
            let union = bdd.apply_or_many(s.transitions.iter().map(|t| t.guard.to_bdd(&bdd)));
            bdd.is_one(union)
        })
    }

    #[test]
    fn test_true_is_single_state() {
        let graph = explore(&Ltl::True);
        assert_eq!(graph.states().len(), 1);
        assert!(graph.sink().is_none());
        let t = &graph.states()[0].transitions;
        assert_eq!(t.len(), 1);
        assert!(t[0].guard.is_true());
        assert_eq!(t[0].edges[0].target, 0);
    }

    #[test]
    fn test_false_is_sink() {
        let graph = explore(&Ltl::False);
        assert_eq!(graph.states().len(), 1);
        assert_eq!(graph.sink(), Some(0));
        assert!(graph.is_frozen());
    }

    #[test]
    fn test_next_atom() {
        // X a: initial -> a -> true / sink
        let graph = explore(&Ltl::atom("a").next());
        assert_eq!(graph.states().len(), 4);
        assert_eq!(graph.states()[0].transitions.len(), 1);
        let a = graph.states()[0].transitions[0].edges[0].target;
        assert_eq!(graph.states()[a].transitions.len(), 2);
        assert!(total(&graph));
    }

    #[test]
    fn test_until_tracks_pending() {
        let graph = explore(&Ltl::atom("a").until(Ltl::atom("b")));
        assert_eq!(graph.num_untils(), 1);
        let initial = &graph.states()[graph.initial()];
        let self_loops: Vec<&GraphEdge> = initial
            .transitions
            .iter()
            .flat_map(|t| &t.edges)
            .filter(|e| e.target == graph.initial())
            .collect();
        assert!(!self_loops.is_empty());
        assert!(self_loops.iter().all(|e| e.pending.contains(0)));
        assert!(total(&graph));
    }

    #[test]
    fn test_guards_are_disjoint() {
        let f = Ltl::atom("a")
            .until(Ltl::atom("b"))
            .or(Ltl::atom("c").globally())
            .and(Ltl::atom("a").finally().globally());
        let graph = explore(&f);
        for s in graph.states() {
            for (i, t) in s.transitions.iter().enumerate() {
                for u in &s.transitions[i + 1..] {
                    assert!(!t.guard.intersects(&u.guard));
                }
            }
        }
        assert!(total(&graph));
    }

    #[test]
    fn test_state_limit() {
        let session = Session::new();
        let f = normalize(session.arena(), &Ltl::atom("a").next().next().next()).unwrap();
        let limits = ResourceLimits {
            max_states: 2,
            ..ResourceLimits::default()
        };
        let result = StateSpaceBuilder::new(&session, &limits, &CancelToken::new()).explore(f);
        assert_eq!(
            result.unwrap_err(),
            TranslationError::ResourceExhausted {
                resource: Resource::States,
                limit: Limit::Count(2),
            }
        );
    }

    #[test]
    fn test_cancelled_before_start() {
        let session = Session::new();
        let f = normalize(session.arena(), &Ltl::atom("a").globally()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let limits = ResourceLimits::default();
        let result = StateSpaceBuilder::new(&session, &limits, &cancel).explore(f);
        assert_eq!(result.unwrap_err(), TranslationError::Cancelled);
    }

    #[test]
    fn test_exploration_is_deterministic() {
        let f = Ltl::atom("p")
            .implies(Ltl::atom("q").finally())
            .globally();
        let g1 = explore(&f);
        let g2 = explore(&f);
        let shape = |g: &StateGraph| -> Vec<(String, Vec<(String, Vec<usize>)>)> {
            g.states()
                .iter()
                .map(|s| {
                    (
                        s.name.clone(),
                        s.transitions
                            .iter()
                            .map(|t| (t.guard.to_string(), t.edges.iter().map(|e| e.target).collect()))
                            .collect(),
                    )
                })
                .collect()
        };
        assert_eq!(shape(&g1), shape(&g2));
    }
}
