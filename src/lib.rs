//! # ltl-rs: LTL to ω-automata over decision diagrams
//!
//! **`ltl-rs`** translates formulas of linear temporal logic into automata over infinite words.
//! Transition guards are built with a small manager-centric **Binary Decision Diagram** package,
//! and the result is a frozen, self-contained [`Automaton`][crate::automaton::Automaton].
//!
//! ## Pipeline
//!
//! Each translation runs in its own session and goes through four stages:
//!
//! 1. **Normalization** ([`normalize`]): the raw [`Ltl`][crate::ltl::Ltl] tree is put into negation
//!    normal form inside a hash-consing [`FormulaArena`][crate::formula::FormulaArena] and rewritten
//!    to a fixpoint. Equal formulas are equal handles.
//! 2. **Exploration** ([`builder`]): every state is a residual obligation. Successors are computed
//!    symbolically and guards are split into disjoint regions with [`Bdd::partition`][crate::bdd::Bdd::partition].
//! 3. **Acceptance** ([`acceptance`]): generalized Büchi marks from pending until-obligations, or a
//!    deterministic Rabin or parity automaton ([`determinize`]).
//! 4. **Minimization** ([`minimize`]): dead-state collapse, bisimulation, and optionally merges
//!    proved by a SAT oracle ([`oracle`]). Oracle trouble never fails a translation; it is reported
//!    as an [`Advisory`][crate::error::Advisory].
//!
//! ## Basic Usage
//!
//! ```rust
//! use ltl_rs::ltl::Ltl;
//! use ltl_rs::translate::{translate, TranslationOptions};
//! use ltl_rs::word::LassoWord;
//!
//! // G F a
//! let f = Ltl::atom("a").finally().globally();
//! let t = translate(&f, &TranslationOptions::default()).unwrap();
//!
//! // Infinitely many `a`s: accepted
//! let w = LassoWord::from_names(&["a"], &[], &[&["a"], &[]]);
//! assert!(t.automaton.accepts(&w));
//!
//! // Finitely many `a`s: rejected
//! let w = LassoWord::from_names(&["a"], &[&["a"]], &[&[]]);
//! assert!(!t.automaton.accepts(&w));
//!
//! // Serialize in HOA format
//! println!("{}", t.automaton.to_hoa());
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: The decision-diagram manager used for guards.
//! - **[`translate`]**: Options, sessions and the [`Translator`][crate::translate::Translator].
//! - **[`hoa`]** and **[`dot`]**: Serialization and visualization of automata.
//! - **[`boundary`]**: Owned-value entry points with numeric error codes.

pub mod acceptance;
pub mod automaton;
pub mod bdd;
pub mod bitset;
pub mod boundary;
pub mod builder;
pub mod cache;
pub mod determinize;
pub mod dot;
pub mod emptiness;
pub mod error;
pub mod formula;
pub mod guard;
pub mod hoa;
pub mod ltl;
pub mod minimize;
pub mod normalize;
pub mod oracle;
pub mod partition;
pub mod paths;
pub mod reference;
pub mod sat;
pub mod scc;
pub mod table;
pub mod translate;
pub mod types;
pub mod utils;
pub mod word;
