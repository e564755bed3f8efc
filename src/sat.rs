//! Clause sets and the in-process CaDiCaL backend.
//!
//! The minimizer phrases its merge questions as [`Cnf`] formulas. Variables are
//! 1-indexed [`Var`]s, clauses are lists of [`Lit`]s, and the DIMACS numbering is
//! shared by CaDiCaL and by external solvers.

use std::fmt::Write as _;
use std::time::Instant;

use crate::oracle::CancelToken;
use crate::types::{Lit, Var};

/// Formula in conjunctive normal form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cnf {
    num_vars: u32,
    clauses: Vec<Vec<Lit>>,
}

impl Cnf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn clauses(&self) -> &[Vec<Lit>] {
        &self.clauses
    }

    /// Allocate a fresh variable.
    pub fn new_var(&mut self) -> Var {
        self.num_vars += 1;
        Var::new(self.num_vars)
    }

    pub fn add_clause(&mut self, clause: impl IntoIterator<Item = Lit>) {
        let clause: Vec<Lit> = clause.into_iter().collect();
        for lit in &clause {
            assert!(
                lit.var().id() <= self.num_vars,
                "literal {} refers to an unallocated variable",
                lit
            );
        }
        self.clauses.push(clause);
    }

    /// DIMACS `p cnf` text.
    pub fn to_dimacs(&self) -> String {
        let mut out = String::new();
        writeln!(out, "p cnf {} {}", self.num_vars, self.clauses.len()).ok();
        for clause in &self.clauses {
            for lit in clause {
                write!(out, "{} ", lit.to_dimacs()).ok();
            }
            out.push_str("0\n");
        }
        out
    }
}

/// Total assignment of the variables of a [`Cnf`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    // Index 0 is unused.
    values: Vec<bool>,
}

impl Assignment {
    /// All variables false except those given as positive literals.
    pub fn from_literals(num_vars: u32, literals: impl IntoIterator<Item = Lit>) -> Self {
        let mut values = vec![false; num_vars as usize + 1];
        for lit in literals {
            let v = lit.var().id() as usize;
            if v < values.len() {
                values[v] = lit.is_positive();
            }
        }
        Self { values }
    }

    pub fn num_vars(&self) -> u32 {
        (self.values.len() - 1) as u32
    }

    /// Value of `v`. Variables beyond the assignment are false.
    pub fn value(&self, v: Var) -> bool {
        self.values.get(v.id() as usize).copied().unwrap_or(false)
    }

    pub fn lit_value(&self, lit: Lit) -> bool {
        lit.eval(self.value(lit.var()))
    }

    pub fn satisfies(&self, cnf: &Cnf) -> bool {
        cnf.clauses()
            .iter()
            .all(|clause| clause.iter().any(|&lit| self.lit_value(lit)))
    }
}

/// Why a search stopped without an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Cancelled,
    Timeout,
}

/// Terminate hook polled by CaDiCaL during search.
struct Terminate {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl cadical::Callbacks for Terminate {
    fn terminate(&mut self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Solve `cnf` with CaDiCaL.
///
/// Returns `Ok(Some(model))` if satisfiable and `Ok(None)` if not. The search is
/// abandoned once `cancel` fires or `deadline` passes.
pub fn solve(cnf: &Cnf, cancel: &CancelToken, deadline: Option<Instant>) -> Result<Option<Assignment>, Interrupted> {
    if cancel.is_cancelled() {
        return Err(Interrupted::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(Interrupted::Timeout);
    }
    if cnf.clauses().iter().any(|c| c.is_empty()) {
        return Ok(None);
    }
    let mut solver: cadical::Solver<Terminate> = cadical::Solver::new();
    solver.set_callbacks(Some(Terminate {
        cancel: cancel.clone(),
        deadline,
    }));
    for clause in cnf.clauses() {
        solver.add_clause(clause.iter().map(|lit| lit.to_dimacs()));
    }
    match solver.solve() {
        Some(true) => {
            // Variables CaDiCaL never saw are unconstrained.
            let max = solver.max_variable();
            let literals: Vec<Lit> = (1..=cnf.num_vars())
                .filter(|&v| (v as i32) <= max && solver.value(v as i32) == Some(true))
                .map(|v| Var::new(v).pos())
                .collect();
            Ok(Some(Assignment::from_literals(cnf.num_vars(), literals)))
        }
        Some(false) => Ok(None),
        None if cancel.is_cancelled() => Err(Interrupted::Cancelled),
        None => Err(Interrupted::Timeout),
    }
}
