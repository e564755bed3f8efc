//! Satisfiability oracles.
//!
//! An oracle answers a self-contained [`CnfQuery`] with a [`Verdict`]. The
//! minimizer never trusts a model blindly: a `Sat` verdict is checked against the
//! query before it is acted upon. Queries are issued through [`dispatch`], which
//! runs the oracle on a worker thread, bounds the wait by the query's time budget
//! and propagates cancellation into the worker.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::sat::{self, Assignment, Cnf};
use crate::types::Lit;

/// Cooperative cancellation flag.
///
/// A child token observes its parent's cancellation but can be cancelled on its
/// own without affecting the parent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    parent: Option<CancelToken>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst) || self.inner.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    pub fn child(&self) -> CancelToken {
        CancelToken {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnfQuery {
    pub cnf: Cnf,
    pub time_budget: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Sat(Assignment),
    Unsat,
    Timeout,
    Unavailable(String),
}

/// Pluggable decision procedure for CNF queries.
pub trait SatOracle: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, query: &CnfQuery, cancel: &CancelToken) -> Verdict;

    /// Answer several independent queries. The default solves them one by one.
    fn solve_batch(&self, queries: &[CnfQuery], cancel: &CancelToken) -> Vec<Verdict> {
        queries.iter().map(|q| self.solve(q, cancel)).collect()
    }
}

/// The built-in in-process solver, backed by CaDiCaL.
#[derive(Debug, Default, Clone, Copy)]
pub struct CadicalOracle;

impl SatOracle for CadicalOracle {
    fn name(&self) -> &str {
        "cadical"
    }

    fn solve(&self, query: &CnfQuery, cancel: &CancelToken) -> Verdict {
        let deadline = query.time_budget.map(|b| Instant::now() + b);
        let verdict = match sat::solve(&query.cnf, cancel, deadline) {
            Ok(Some(model)) => Verdict::Sat(model),
            Ok(None) => Verdict::Unsat,
            Err(reason) => {
                debug!("cadical: interrupted ({:?})", reason);
                Verdict::Timeout
            }
        };
        debug!(
            "cadical: {} vars, {} clauses",
            query.cnf.num_vars(),
            query.cnf.clauses().len()
        );
        verdict
    }
}

/// External solver speaking DIMACS on stdin and SAT-competition output on stdout.
#[derive(Debug, Clone)]
pub struct ProcessOracle {
    program: PathBuf,
    args: Vec<String>,
    poll_interval: Duration,
}

impl ProcessOracle {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            poll_interval: Duration::from_millis(5),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl SatOracle for ProcessOracle {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("external solver")
    }

    fn solve(&self, query: &CnfQuery, cancel: &CancelToken) -> Verdict {
        let deadline = query.time_budget.map(|b| Instant::now() + b);
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Verdict::Unavailable(format!("cannot start {}: {}", self.program.display(), e)),
        };

        // Feed and drain on separate threads so a full pipe cannot stall us.
        let input = query.cnf.to_dimacs();
        if let Some(mut stdin) = child.stdin.take() {
            thread::spawn(move || {
                if let Err(e) = stdin.write_all(input.as_bytes()) {
                    debug!("writing the query to the solver failed: {}", e);
                }
            });
        }
        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            thread::spawn(move || {
                let mut output = String::new();
                let _ = stdout.read_to_string(&mut output);
                let _ = tx.send(output);
            });
        }

        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {}
                Err(e) => return Verdict::Unavailable(e.to_string()),
            }
            let expired = deadline.is_some_and(|d| Instant::now() >= d);
            if expired || cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Verdict::Timeout;
            }
            thread::sleep(self.poll_interval);
        }

        match rx.recv() {
            Ok(output) => parse_solver_output(&output, query.cnf.num_vars()),
            Err(_) => Verdict::Unavailable("solver produced no output".to_string()),
        }
    }
}

/// Parse `s ...` and `v ...` lines of SAT-competition output.
pub fn parse_solver_output(output: &str, num_vars: u32) -> Verdict {
    let mut status = None;
    let mut literals = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("s ") {
            status = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("v ") {
            for token in rest.split_whitespace() {
                match token.parse::<i32>() {
                    Ok(0) => {}
                    Ok(x) => literals.push(Lit::from_dimacs(x)),
                    Err(_) => return Verdict::Unavailable(format!("bad value token '{}'", token)),
                }
            }
        }
    }
    match status.as_deref() {
        Some("SATISFIABLE") => Verdict::Sat(Assignment::from_literals(num_vars, literals)),
        Some("UNSATISFIABLE") => Verdict::Unsat,
        Some("UNKNOWN") => Verdict::Timeout,
        Some(other) => Verdict::Unavailable(format!("unexpected status '{}'", other)),
        None => Verdict::Unavailable("missing status line".to_string()),
    }
}

/// Run one query on a worker thread.
///
/// The wait is bounded by `query.time_budget`; when it elapses or `cancel` fires,
/// the worker's token is cancelled and [`Verdict::Timeout`] is returned without
/// waiting for the worker to notice.
pub fn dispatch(oracle: &Arc<dyn SatOracle>, query: CnfQuery, cancel: &CancelToken) -> Verdict {
    if cancel.is_cancelled() {
        return Verdict::Timeout;
    }
    let token = cancel.child();
    let budget = query.time_budget;
    let (tx, rx) = mpsc::channel();
    let worker_oracle = Arc::clone(oracle);
    let worker_token = token.clone();
    let spawned = thread::Builder::new()
        .name("sat-oracle".to_string())
        .spawn(move || {
            let verdict = worker_oracle.solve(&query, &worker_token);
            let _ = tx.send(verdict);
        });
    if let Err(e) = spawned {
        return Verdict::Unavailable(format!("cannot start oracle worker: {}", e));
    }

    let started = Instant::now();
    let slice = Duration::from_millis(20);
    loop {
        let wait = match budget {
            Some(b) => match b.checked_sub(started.elapsed()) {
                Some(left) => left.min(slice),
                None => {
                    token.cancel();
                    warn!("oracle {} exceeded its budget of {:?}", oracle.name(), b);
                    return Verdict::Timeout;
                }
            },
            None => slice,
        };
        match rx.recv_timeout(wait) {
            // A verdict that raced with cancellation is not trusted.
            Ok(_) if cancel.is_cancelled() => return Verdict::Timeout,
            Ok(verdict) => return verdict,
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    token.cancel();
                    return Verdict::Timeout;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Verdict::Unavailable(format!("oracle {} worker stopped without an answer", oracle.name()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn query(clauses: &[&[i32]], num_vars: u32) -> CnfQuery {
        let mut cnf = Cnf::new();
        for _ in 0..num_vars {
            cnf.new_var();
        }
        for c in clauses {
            cnf.add_clause(c.iter().copied().map(Lit::from_dimacs));
        }
        CnfQuery { cnf, time_budget: None }
    }

    struct Sleepy;

    impl SatOracle for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn solve(&self, _query: &CnfQuery, cancel: &CancelToken) -> Verdict {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Verdict::Unsat
        }
    }

    #[test]
    fn test_cancel_token_hierarchy() {
        let root = CancelToken::new();
        let child = root.child();
        let grandchild = child.child();
        child.cancel();
        assert!(!root.is_cancelled());
        assert!(grandchild.is_cancelled());
        let other = root.child();
        root.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_cadical_oracle() {
        let oracle: Arc<dyn SatOracle> = Arc::new(CadicalOracle);
        let q = query(&[&[1, 2], &[-1]], 2);
        match dispatch(&oracle, q.clone(), &CancelToken::new()) {
            Verdict::Sat(model) => assert!(model.satisfies(&q.cnf)),
            v => panic!("unexpected verdict {:?}", v),
        }
        let q = query(&[&[1], &[-1]], 1);
        assert_eq!(dispatch(&oracle, q, &CancelToken::new()), Verdict::Unsat);
    }

    #[test]
    fn test_dispatch_times_out() {
        let oracle: Arc<dyn SatOracle> = Arc::new(Sleepy);
        let mut q = query(&[&[1]], 1);
        q.time_budget = Some(Duration::from_millis(30));
        assert_eq!(dispatch(&oracle, q, &CancelToken::new()), Verdict::Timeout);
    }

    #[test]
    fn test_dispatch_observes_cancellation() {
        let oracle: Arc<dyn SatOracle> = Arc::new(Sleepy);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(dispatch(&oracle, query(&[&[1]], 1), &cancel), Verdict::Timeout);
    }

    /// Answers at once, but with a wrong verdict once its token is cancelled.
    struct Eager;

    impl SatOracle for Eager {
        fn name(&self) -> &str {
            "eager"
        }

        fn solve(&self, _query: &CnfQuery, cancel: &CancelToken) -> Verdict {
            if cancel.is_cancelled() {
                Verdict::Unsat
            } else {
                Verdict::Sat(Assignment::from_literals(1, [Lit::from_dimacs(1)]))
            }
        }
    }

    #[test]
    fn test_dispatch_discards_answers_after_cancellation() {
        let oracle: Arc<dyn SatOracle> = Arc::new(Eager);
        let cancel = CancelToken::new();
        assert!(matches!(dispatch(&oracle, query(&[&[1]], 1), &cancel), Verdict::Sat(_)));
        cancel.cancel();
        assert_eq!(dispatch(&oracle, query(&[&[1]], 1), &cancel), Verdict::Timeout);
    }

    /// Cancels the caller's token, then answers.
    struct Racing {
        caller: CancelToken,
    }

    impl SatOracle for Racing {
        fn name(&self) -> &str {
            "racing"
        }

        fn solve(&self, _query: &CnfQuery, _cancel: &CancelToken) -> Verdict {
            self.caller.cancel();
            Verdict::Unsat
        }
    }

    #[test]
    fn test_dispatch_discards_verdict_received_after_cancellation() {
        let cancel = CancelToken::new();
        let oracle: Arc<dyn SatOracle> = Arc::new(Racing { caller: cancel.clone() });
        assert_eq!(dispatch(&oracle, query(&[&[1]], 1), &cancel), Verdict::Timeout);
    }

    #[test]
    fn test_batch_default() {
        let oracle = CadicalOracle;
        let qs = vec![query(&[&[1]], 1), query(&[&[1], &[-1]], 1)];
        let verdicts = oracle.solve_batch(&qs, &CancelToken::new());
        assert!(matches!(verdicts[0], Verdict::Sat(_)));
        assert_eq!(verdicts[1], Verdict::Unsat);
    }

    #[test]
    fn test_parse_solver_output() {
        let out = "c comment\ns SATISFIABLE\nv 1 -2\nv 3 0\n";
        match parse_solver_output(out, 3) {
            Verdict::Sat(model) => {
                assert_eq!(model.num_vars(), 3);
                assert!(model.lit_value(Lit::from_dimacs(1)));
                assert!(model.lit_value(Lit::from_dimacs(-2)));
                assert!(model.lit_value(Lit::from_dimacs(3)));
            }
            v => panic!("unexpected verdict {:?}", v),
        }
        assert_eq!(parse_solver_output("s UNSATISFIABLE\n", 1), Verdict::Unsat);
        assert!(matches!(parse_solver_output("", 1), Verdict::Unavailable(_)));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let oracle = ProcessOracle::new("/nonexistent/sat-solver");
        let verdict = oracle.solve(&query(&[&[1]], 1), &CancelToken::new());
        assert!(matches!(verdict, Verdict::Unavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_solver_exiting_without_reading() {
        // `true` closes its end of the pipe at once; the failed write is only logged.
        let clauses: Vec<Vec<i32>> = (1..=2000).map(|v| vec![v, -(v % 2000 + 1)]).collect();
        let clauses: Vec<&[i32]> = clauses.iter().map(|c| c.as_slice()).collect();
        let oracle = ProcessOracle::new("true");
        let verdict = oracle.solve(&query(&clauses, 2000), &CancelToken::new());
        assert_eq!(verdict, Verdict::Unavailable("missing status line".to_string()));
    }
}
