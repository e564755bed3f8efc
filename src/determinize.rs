//! Determinization of transition-based Büchi automata.
//!
//! States of the result are Safra trees in Piterman's compact form. Every node
//! carries a set of Büchi states; siblings are disjoint and a child holds a strict
//! subset of its parent. Nodes are named by age, so a parent and every older
//! sibling carry smaller names than a node, and names are compacted after each
//! step. A step reports the least name whose node was removed or renamed and the
//! names whose nodes became accepting. The parity colour (or the Rabin marks) of
//! the deterministic transition is read off these two facts.
//!
//! A run is accepted iff some name is eventually never renamed and is accepting
//! infinitely often.

use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::acceptance::{Acceptance, AcceptanceStrategy};
use crate::automaton::{Automaton, Edge, MarkSet, State, StateId, Transition};
use crate::bdd::Bdd;
use crate::bitset::BitSet;
use crate::error::{Limit, Resource, Result, TranslationError};
use crate::guard::Guard;
use crate::oracle::CancelToken;
use crate::reference::Ref;

/// Limits observed while determinizing.
#[derive(Debug, Clone, Copy)]
pub struct Bounds<'a> {
    pub max_states: usize,
    /// Point in time after which construction stops, with the budget it came from.
    pub deadline: Option<(Instant, Duration)>,
    pub cancel: &'a CancelToken,
}

impl<'a> Bounds<'a> {
    pub fn unbounded(cancel: &'a CancelToken) -> Self {
        Self {
            max_states: usize::MAX,
            deadline: None,
            cancel,
        }
    }

    fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }
        if let Some((deadline, limit)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(TranslationError::ResourceExhausted {
                    resource: Resource::Time,
                    limit: Limit::Duration(limit),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    parent: Option<usize>,
    label: BitSet,
}

/// Safra tree whose node `i` has name `i`. Node 0 is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct SafraTree {
    nodes: Vec<Node>,
}

/// Outcome of one deterministic step.
#[derive(Debug)]
struct Step {
    tree: SafraTree,
    /// Number of names of the source tree.
    names: usize,
    /// Least source name whose node was removed or renamed.
    renamed: Option<usize>,
    /// Source names whose nodes became accepting.
    accepting: BitSet,
}

impl Step {
    /// Least name that became accepting without being renamed.
    fn good(&self) -> Option<usize> {
        let bound = self.renamed.unwrap_or(self.names);
        self.accepting.first().filter(|&g| g < bound)
    }
}

impl SafraTree {
    fn singleton(q: StateId) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                label: [q].into_iter().collect(),
            }],
        }
    }

    /// States of the whole tree.
    fn states(&self) -> Option<&BitSet> {
        self.nodes.first().map(|root| &root.label)
    }

    /// Successor tree, given the successors of every state (`next`) and the part
    /// of them reached by accepting edges (`accepting`).
    fn step(&self, next: &[BitSet], accepting: &[BitSet]) -> Step {
        let k = self.nodes.len();
        let mut parent: Vec<Option<usize>> = self.nodes.iter().map(|n| n.parent).collect();
        let mut label: Vec<BitSet> = Vec::with_capacity(2 * k);
        let mut spawned: Vec<(usize, BitSet)> = Vec::new();
        for (v, node) in self.nodes.iter().enumerate() {
            let mut all = BitSet::new();
            let mut acc = BitSet::new();
            for q in node.label.iter() {
                all.union_with(&next[q]);
                acc.union_with(&accepting[q]);
            }
            label.push(all);
            if !acc.is_empty() {
                spawned.push((v, acc));
            }
        }
        // New nodes are the youngest children of their parents.
        for (v, acc) in spawned {
            parent.push(Some(v));
            label.push(acc);
        }

        let total = label.len();
        let mut children = vec![Vec::new(); total];
        for (c, p) in parent.iter().enumerate() {
            if let Some(p) = *p {
                children[p].push(c);
            }
        }

        if total > 0 {
            keep_oldest(0, &children, &mut label, &BitSet::new());
        }

        let mut alive: Vec<bool> = label.iter().map(|l| !l.is_empty()).collect();
        let mut accepting_names = BitSet::new();
        // Parents precede their children in name order.
        for v in 0..total {
            if !alive[v] {
                continue;
            }
            let kids: Vec<usize> = children[v].iter().copied().filter(|&c| alive[c]).collect();
            if kids.is_empty() {
                continue;
            }
            let mut covered = BitSet::new();
            for &c in &kids {
                covered.union_with(&label[c]);
            }
            if covered == label[v] {
                accepting_names.insert(v);
                let mut stack = kids;
                while let Some(c) = stack.pop() {
                    alive[c] = false;
                    stack.extend(children[c].iter().copied());
                }
            }
        }

        let renamed = (0..k).find(|&v| !alive[v]);
        let mut rename: Vec<Option<usize>> = vec![None; total];
        let mut nodes = Vec::new();
        for v in 0..total {
            if alive[v] {
                rename[v] = Some(nodes.len());
                nodes.push(Node {
                    parent: parent[v].and_then(|p| rename[p]),
                    label: std::mem::take(&mut label[v]),
                });
            }
        }
        Step {
            tree: SafraTree { nodes },
            names: k,
            renamed,
            accepting: accepting_names,
        }
    }

    /// Tree rendered with state ids, children in parentheses.
    fn render(&self) -> String {
        if self.nodes.is_empty() {
            return "false".to_string();
        }
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (c, node) in self.nodes.iter().enumerate() {
            if let Some(p) = node.parent {
                children[p].push(c);
            }
        }
        let mut out = String::new();
        self.render_node(0, &children, &mut out);
        out
    }

    fn render_node(&self, v: usize, children: &[Vec<usize>], out: &mut String) {
        let ids: Vec<String> = self.nodes[v].label.iter().map(|q| q.to_string()).collect();
        write!(out, "{{{}}}", ids.join(" ")).ok();
        for &c in &children[v] {
            out.push('(');
            self.render_node(c, children, out);
            out.push(')');
        }
    }
}

/// Drop from node `v` and its subtree every state claimed by an older branch.
/// Returns the states the subtree of `v` keeps.
fn keep_oldest(v: usize, children: &[Vec<usize>], label: &mut [BitSet], claimed: &BitSet) -> BitSet {
    label[v].difference_with(claimed);
    let mut inner = claimed.clone();
    for &c in &children[v] {
        let kept = keep_oldest(c, children, label, &inner);
        inner.union_with(&kept);
    }
    label[v].clone()
}

/// Colour given to steps where nothing happens. It is odd and above every other colour.
const NEUTRAL: usize = usize::MAX;

fn parity_colour(step: &Step) -> usize {
    match (step.good(), step.renamed) {
        (Some(g), _) => 2 * g,
        (None, Some(r)) => 2 * r + 1,
        (None, None) => NEUTRAL,
    }
}

/// Pair `i` fails when name `i` is renamed and succeeds when it becomes accepting.
fn rabin_marks(step: &Step) -> MarkSet {
    let bound = step.renamed.unwrap_or(step.names);
    let mut marks: MarkSet = (bound..step.names).map(|i| 2 * i).collect();
    for i in step.accepting.iter().filter(|&i| i < bound) {
        marks.insert(2 * i + 1);
    }
    marks
}

/// Renumber parity colours densely, keeping their order and parity.
fn compact_colours(states: &mut [State]) -> usize {
    let mut used: Vec<usize> = states
        .iter()
        .flat_map(|s| s.transitions.iter())
        .flat_map(|t| t.edges.iter())
        .filter_map(|e| e.marks.first())
        .collect();
    used.sort_unstable();
    used.dedup();

    let mut map: HashMap<usize, usize> = HashMap::new();
    let mut current: Option<usize> = None;
    for c in used {
        let mapped = match current {
            None => c % 2,
            Some(m) if m % 2 == c % 2 => m,
            Some(m) => m + 1,
        };
        map.insert(c, mapped);
        current = Some(mapped);
    }
    for state in states.iter_mut() {
        for t in state.transitions.iter_mut() {
            for e in t.edges.iter_mut() {
                if let Some(c) = e.marks.first() {
                    e.marks = [map[&c]].into_iter().collect();
                }
            }
        }
    }
    current.map_or(1, |m| m + 1)
}

/// Deterministic Rabin or parity automaton equivalent to the Büchi automaton `nba`.
///
/// `nba` must use a single `Inf(0)` set on its edges.
pub fn determinize(nba: &Automaton, strategy: AcceptanceStrategy, bounds: &Bounds) -> Result<Automaton> {
    if *nba.acceptance() != (Acceptance::GeneralizedBuchi { sets: 1 }) {
        return Err(TranslationError::InternalInvariantViolation(format!(
            "determinization expects a Büchi automaton, got {}",
            nba.acceptance()
        )));
    }
    if strategy == AcceptanceStrategy::GeneralizedBuchi {
        return Err(TranslationError::InternalInvariantViolation(
            "determinization produces Rabin or parity acceptance".to_string(),
        ));
    }

    // States with an empty language never contribute to acceptance.
    let productive = nba.productive_states();
    let n = nba.num_states();
    let bdd = Bdd::default();
    let guards: Vec<Vec<Ref>> = nba
        .states()
        .iter()
        .map(|s| s.transitions.iter().map(|t| t.guard.to_bdd(&bdd)).collect())
        .collect();

    let mut trees: Vec<SafraTree> = Vec::new();
    let mut index: HashMap<SafraTree, StateId> = HashMap::new();
    let mut queue: VecDeque<StateId> = VecDeque::new();
    let mut intern = |tree: SafraTree, trees: &mut Vec<SafraTree>, queue: &mut VecDeque<StateId>| -> Result<StateId> {
        if let Some(&id) = index.get(&tree) {
            return Ok(id);
        }
        if trees.len() >= bounds.max_states {
            return Err(TranslationError::ResourceExhausted {
                resource: Resource::States,
                limit: Limit::Count(bounds.max_states),
            });
        }
        let id = trees.len();
        trees.push(tree.clone());
        index.insert(tree, id);
        queue.push_back(id);
        Ok(id)
    };

    let start = if productive[nba.initial()] {
        SafraTree::singleton(nba.initial())
    } else {
        SafraTree::default()
    };
    let initial = intern(start, &mut trees, &mut queue)?;
    let mut names = 1;
    let mut states: Vec<State> = Vec::new();

    while let Some(id) = queue.pop_front() {
        bounds.check()?;
        let tree = trees[id].clone();
        names = names.max(tree.nodes.len());

        // Distinct guards of the member states, with the transitions using them.
        let mut functions: Vec<Ref> = Vec::new();
        let mut owners: Vec<Vec<(StateId, usize)>> = Vec::new();
        for q in tree.states().into_iter().flat_map(|s| s.iter()) {
            for (t, &g) in guards[q].iter().enumerate() {
                match functions.iter().position(|&f| f == g) {
                    Some(i) => owners[i].push((q, t)),
                    None => {
                        functions.push(g);
                        owners.push(vec![(q, t)]);
                    }
                }
            }
        }

        let mut outgoing: Vec<(Ref, StateId, MarkSet)> = Vec::new();
        for (region, members) in bdd.partition(&functions) {
            let mut next = vec![BitSet::new(); n];
            let mut acc = vec![BitSet::new(); n];
            for m in members {
                for &(q, t) in &owners[m] {
                    for e in &nba.states()[q].transitions[t].edges {
                        if productive[e.target] {
                            next[q].insert(e.target);
                            if e.marks.contains(0) {
                                acc[q].insert(e.target);
                            }
                        }
                    }
                }
            }
            let step = tree.step(&next, &acc);
            let marks: MarkSet = match strategy {
                AcceptanceStrategy::Parity => [parity_colour(&step)].into_iter().collect(),
                _ => rabin_marks(&step),
            };
            let target = intern(step.tree, &mut trees, &mut queue)?;
            match outgoing.iter_mut().find(|(_, t, m)| *t == target && *m == marks) {
                Some(entry) => entry.0 = bdd.apply_or(entry.0, region),
                None => outgoing.push((region, target, marks)),
            }
        }

        debug_assert_eq!(states.len(), id);
        states.push(State {
            name: Some(tree.render()),
            transitions: outgoing
                .into_iter()
                .map(|(guard, target, marks)| Transition {
                    guard: Guard::from_bdd(&bdd, guard),
                    edges: vec![Edge { target, marks }],
                })
                .collect(),
        });
    }

    let acceptance = match strategy {
        AcceptanceStrategy::Parity => Acceptance::Parity {
            colours: compact_colours(&mut states),
        },
        _ => Acceptance::Rabin { pairs: names },
    };
    info!(
        "determinized {} Büchi states into {} {} states",
        n,
        states.len(),
        acceptance
    );
    debug!("largest Safra tree: {} nodes", names);
    Ok(Automaton::new(nba.atoms().to_vec(), states, initial, acceptance))
}
