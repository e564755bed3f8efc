//! Translation API.
//!
//! A translation runs one sequential pipeline inside a fresh [`Session`]:
//! normalize, build the state space, attach acceptance marks, minimize. The
//! session owns the formula arena and the decision-diagram manager, and both are
//! dropped when the translation returns, so nothing handed to the caller refers
//! into them. The returned [`Automaton`] is a plain value.
//!
//! ```
//! use ltl_rs::acceptance::AcceptanceStrategy;
//! use ltl_rs::ltl::Ltl;
//! use ltl_rs::translate::{translate, TranslationOptions};
//!
//! let f = Ltl::atom("request").implies(Ltl::atom("grant").finally()).globally();
//! let options = TranslationOptions::default().with_acceptance(AcceptanceStrategy::Parity);
//! let t = translate(&f, &options).unwrap();
//! assert!(t.automaton.is_total());
//! println!("{}", t.automaton.to_hoa());
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::acceptance::AcceptanceStrategy;
use crate::automaton::Automaton;
use crate::bdd::{Bdd, BddConfig};
use crate::builder;
use crate::error::{Advisory, Result, TranslationError};
use crate::formula::FormulaArena;
use crate::ltl::{validate_name, Ltl};
use crate::minimize::{minimize, OracleBudget};
use crate::normalize::{import, normalize};
use crate::oracle::{CancelToken, CadicalOracle, SatOracle};

/// Per-translation state: the formula arena and the diagram manager.
///
/// A session is single-threaded. Independent translations each get their own.
#[derive(Debug)]
pub struct Session {
    arena: FormulaArena,
    bdd: Bdd,
    started: Instant,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(BddConfig::default())
    }

    pub fn with_config(config: BddConfig) -> Self {
        Self {
            arena: FormulaArena::new(),
            bdd: Bdd::new(config),
            started: Instant::now(),
        }
    }

    pub fn arena(&self) -> &FormulaArena {
        &self.arena
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    /// Creation time; deadlines are measured from here.
    pub fn started(&self) -> Instant {
        self.started
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_states: usize,
    /// Live nodes of the diagram manager, checked after garbage collection.
    pub max_diagram_nodes: usize,
    /// Wall-clock bound for each oracle query.
    pub oracle_time_budget: Option<Duration>,
    pub oracle_query_budget: usize,
    /// Pair variables allowed in one oracle query.
    pub oracle_pair_budget: usize,
    /// Wall-clock bound for the whole translation.
    pub deadline: Option<Duration>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_states: 10_000,
            max_diagram_nodes: 1 << 20,
            oracle_time_budget: Some(Duration::from_secs(1)),
            oracle_query_budget: 256,
            oracle_pair_budget: 4096,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Minimization {
    Off,
    #[default]
    SimulationOnly,
    SimulationAndOracle,
}

impl fmt::Display for Minimization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Minimization::Off => write!(f, "off"),
            Minimization::SimulationOnly => write!(f, "simulation"),
            Minimization::SimulationAndOracle => write!(f, "simulation+oracle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOptions {
    pub acceptance: AcceptanceStrategy,
    pub minimization: Minimization,
    pub limits: ResourceLimits,
    /// Alphabet of the automaton, in variable order. Propositions outside it are
    /// rejected. When absent, the formula's propositions in order of first occurrence.
    pub atomic_propositions: Option<Vec<String>>,
    /// Apply the rewrite rules of [`normalize`]; otherwise only negation normal form.
    pub simplify: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            acceptance: AcceptanceStrategy::default(),
            minimization: Minimization::default(),
            limits: ResourceLimits::default(),
            atomic_propositions: None,
            simplify: true,
        }
    }
}

impl TranslationOptions {
    pub fn with_acceptance(mut self, acceptance: AcceptanceStrategy) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn with_minimization(mut self, minimization: Minimization) -> Self {
        self.minimization = minimization;
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_atomic_propositions(mut self, aps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.atomic_propositions = Some(aps.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }
}

/// Result of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub automaton: Automaton,
    /// Minimization problems that were absorbed.
    pub advisories: Vec<Advisory>,
    /// The normalized formula.
    pub formula: String,
    /// States before minimization.
    pub explored_states: usize,
    pub oracle_queries: usize,
}

impl Translation {
    /// Minimization ran to completion without oracle trouble.
    pub fn is_clean(&self) -> bool {
        self.advisories.is_empty()
    }
}

/// Reusable translation front end carrying options, oracle and cancellation.
pub struct Translator {
    options: TranslationOptions,
    oracle: Option<Arc<dyn SatOracle>>,
    cancel: CancelToken,
}

impl fmt::Debug for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Translator")
            .field("options", &self.options)
            .field("oracle", &self.oracle.as_ref().map(|o| o.name()))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(TranslationOptions::default())
    }
}

impl Translator {
    /// Translator using the built-in CaDiCaL oracle.
    pub fn new(options: TranslationOptions) -> Self {
        Self {
            options,
            oracle: Some(Arc::new(CadicalOracle)),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn SatOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn without_oracle(mut self) -> Self {
        self.oracle = None;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    /// Token observed by every translation of this translator.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn translate(&self, ltl: &Ltl) -> Result<Translation> {
        let options = &self.options;
        let limits = &options.limits;
        ltl.validate(options.atomic_propositions.as_deref())?;
        if self.cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        let session = Session::new();
        if let Some(aps) = &options.atomic_propositions {
            for ap in aps {
                validate_name(ap)?;
                session.arena().declare_atom(ap);
            }
        }
        let formula = if options.simplify {
            normalize(session.arena(), ltl)?
        } else {
            import(session.arena(), ltl)?
        };
        let text = session.arena().display(formula).to_string();
        debug!("translate: {} => {}", ltl, text);

        let automaton = builder::build(&session, formula, options.acceptance, limits, &self.cancel)?;
        let explored_states = automaton.num_states();

        let mut advisories = Vec::new();
        let mut oracle_queries = 0;
        let automaton = match options.minimization {
            Minimization::Off => automaton,
            Minimization::SimulationOnly | Minimization::SimulationAndOracle => {
                let oracle = match options.minimization {
                    Minimization::SimulationAndOracle => {
                        if self.oracle.is_none() {
                            advisories.push(Advisory::OracleUnavailable {
                                reason: "no oracle configured".to_string(),
                            });
                        }
                        self.oracle.as_ref()
                    }
                    _ => None,
                };
                let budget = OracleBudget {
                    time_per_query: limits.oracle_time_budget,
                    max_queries: limits.oracle_query_budget,
                    max_pair_vars: limits.oracle_pair_budget,
                    deadline: limits.deadline.map(|d| session.started() + d),
                };
                let minimized = minimize(&automaton, oracle, &budget, &self.cancel);
                advisories.extend(minimized.advisories);
                oracle_queries = minimized.queries;
                minimized.automaton
            }
        };
        if self.cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }
        automaton
            .validate()
            .map_err(TranslationError::InternalInvariantViolation)?;

        for advisory in &advisories {
            warn!("{}", advisory);
        }
        info!(
            "translated {} into {} states ({} explored, {}, minimization {})",
            text,
            automaton.num_states(),
            explored_states,
            options.acceptance,
            options.minimization
        );
        Ok(Translation {
            automaton,
            advisories,
            formula: text,
            explored_states,
            oracle_queries,
        })
    }
}

/// Translate `ltl` with a default [`Translator`] for `options`.
pub fn translate(ltl: &Ltl, options: &TranslationOptions) -> Result<Translation> {
    Translator::new(options.clone()).translate(ltl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Limit, Resource};
    use crate::word::LassoWord;

    use test_log::test;

    fn a() -> Ltl {
        Ltl::atom("a")
    }

    fn b() -> Ltl {
        Ltl::atom("b")
    }

    #[test]
    fn test_true_and_false() {
        let t = translate(&Ltl::True, &TranslationOptions::default()).unwrap();
        assert_eq!(t.automaton.num_states(), 1);
        assert!(t.automaton.accepts(&LassoWord::from_names(&[], &[], &[&[]])));

        let f = translate(&Ltl::False, &TranslationOptions::default()).unwrap();
        assert!(f.automaton.is_empty());
        assert!(f.automaton.is_total());
    }

    #[test]
    fn test_until_words() {
        for strategy in [
            AcceptanceStrategy::GeneralizedBuchi,
            AcceptanceStrategy::Rabin,
            AcceptanceStrategy::Parity,
        ] {
            let options = TranslationOptions::default().with_acceptance(strategy);
            let t = translate(&a().until(b()), &options).unwrap();
            let aut = &t.automaton;
            assert_eq!(aut.acceptance().strategy(), strategy);
            let yes = LassoWord::from_names(&["a", "b"], &[&["a"], &["b"]], &[&[]]);
            let no = LassoWord::from_names(&["a", "b"], &[], &[&["a"]]);
            assert!(aut.accepts(&yes), "{}", strategy);
            assert!(!aut.accepts(&no), "{}", strategy);
        }
    }

    #[test]
    fn test_declared_alphabet() {
        let options = TranslationOptions::default().with_atomic_propositions(["b", "a", "c"]);
        let t = translate(&a().finally(), &options).unwrap();
        assert_eq!(t.automaton.atoms(), &["b", "a", "c"]);

        let options = TranslationOptions::default().with_atomic_propositions(["b"]);
        assert!(matches!(
            translate(&a(), &options),
            Err(TranslationError::InvalidFormula(_))
        ));
    }

    #[test]
    fn test_minimization_does_not_grow() {
        let f = a().globally().finally().and(b().finally().globally());
        let off = translate(&f, &TranslationOptions::default().with_minimization(Minimization::Off)).unwrap();
        let sim = translate(&f, &TranslationOptions::default()).unwrap();
        let full = translate(
            &f,
            &TranslationOptions::default().with_minimization(Minimization::SimulationAndOracle),
        )
        .unwrap();
        assert!(sim.automaton.num_states() <= off.automaton.num_states());
        assert!(full.automaton.num_states() <= sim.automaton.num_states());
        assert_eq!(off.explored_states, off.automaton.num_states());
    }

    #[test]
    fn test_without_oracle_is_advised() {
        let options = TranslationOptions::default().with_minimization(Minimization::SimulationAndOracle);
        let t = Translator::new(options).without_oracle().translate(&a().finally()).unwrap();
        assert!(!t.is_clean());
        assert!(matches!(t.advisories[0], Advisory::OracleUnavailable { .. }));
    }

    #[test]
    fn test_state_limit() {
        let limits = ResourceLimits {
            max_states: 2,
            ..ResourceLimits::default()
        };
        let f = a().next().next().next();
        let result = translate(&f, &TranslationOptions::default().with_limits(limits));
        assert_eq!(
            result.unwrap_err(),
            TranslationError::ResourceExhausted {
                resource: Resource::States,
                limit: Limit::Count(2),
            }
        );
    }

    #[test]
    fn test_diagram_node_limit() {
        // Four protected literals alone exceed three live nodes.
        let limits = ResourceLimits {
            max_diagram_nodes: 3,
            ..ResourceLimits::default()
        };
        let f = Ltl::all([a(), b(), Ltl::atom("c"), Ltl::atom("d")]).finally();
        let result = translate(&f, &TranslationOptions::default().with_limits(limits));
        assert_eq!(
            result.unwrap_err(),
            TranslationError::ResourceExhausted {
                resource: Resource::DiagramNodes,
                limit: Limit::Count(3),
            }
        );
    }

    #[test]
    fn test_zero_deadline() {
        let limits = ResourceLimits {
            deadline: Some(Duration::ZERO),
            ..ResourceLimits::default()
        };
        for strategy in [AcceptanceStrategy::GeneralizedBuchi, AcceptanceStrategy::Parity] {
            let options = TranslationOptions::default()
                .with_acceptance(strategy)
                .with_limits(limits.clone());
            assert_eq!(
                translate(&a().until(b()), &options).unwrap_err(),
                TranslationError::ResourceExhausted {
                    resource: Resource::Time,
                    limit: Limit::Duration(Duration::ZERO),
                }
            );
        }
    }

    #[test]
    fn test_cancelled_before_start() {
        let translator = Translator::default();
        translator.cancel_token().cancel();
        assert_eq!(translator.translate(&a()).unwrap_err(), TranslationError::Cancelled);
    }

    #[test]
    fn test_without_simplification() {
        let f = a().and(a().globally());
        let plain = translate(&f, &TranslationOptions::default().with_simplify(false)).unwrap();
        let simple = translate(&f, &TranslationOptions::default()).unwrap();
        assert_ne!(plain.formula, simple.formula);
        let w = LassoWord::from_names(&["a"], &[], &[&["a"]]);
        assert!(plain.automaton.accepts(&w));
        assert!(simple.automaton.accepts(&w));
    }
}
