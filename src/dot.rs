//! Automaton to DOT (Graphviz) conversion.
//!
//! The generated graph follows these conventions:
//! - **States** are circles labelled with their id and, if present, their name
//! - **The initial state** is pointed to by an invisible source node
//! - **Edges** are labelled with the guard over proposition names followed by the
//!   acceptance marks, e.g. `a & !b {0,1}`
//!
//! ```
//! use ltl_rs::ltl::Ltl;
//! use ltl_rs::translate::{translate, TranslationOptions};
//!
//! let t = translate(&Ltl::atom("a").finally(), &TranslationOptions::default()).unwrap();
//! let dot = t.automaton.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph {"));
//! ```

use std::fmt::Write as _;

use crate::automaton::{Automaton, MarkSet};

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for states (default: "circle")
    pub state_shape: &'static str,
    /// Graph direction (default: "LR")
    pub rankdir: &'static str,
    /// Whether to show state names next to ids (default: true)
    pub show_names: bool,
    /// Whether to colour marked edges (default: true)
    pub colour_marks: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            state_shape: "circle",
            rankdir: "LR",
            show_names: true,
            colour_marks: true,
        }
    }
}

/// Palette for mark colours, cycled by the least mark of an edge.
const PALETTE: &[&str] = &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn marks_label(marks: &MarkSet) -> String {
    let marks: Vec<String> = marks.iter().map(|m| m.to_string()).collect();
    format!("{{{}}}", marks.join(","))
}

impl Automaton {
    /// Converts the automaton to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the automaton to DOT format with custom configuration.
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir={};", config.rankdir)?;
        writeln!(
            dot,
            "label=\"{}\";",
            escape(&format!("{}: {}", self.acceptance().hoa_name(), self.acceptance().hoa_condition()))
        )?;
        writeln!(dot, "labelloc=top;")?;
        writeln!(dot, "node [shape={}];", config.state_shape)?;

        // Initial arrow
        writeln!(dot, "init [shape=point, style=invis];")?;
        writeln!(dot, "init -> {};", self.initial())?;

        for (id, state) in self.states().iter().enumerate() {
            let label = match &state.name {
                Some(name) if config.show_names => format!("{}\\n{}", id, escape(name)),
                _ => id.to_string(),
            };
            writeln!(dot, "{} [label=\"{}\"];", id, label)?;
        }

        for (id, state) in self.states().iter().enumerate() {
            for t in &state.transitions {
                let guard = escape(&t.guard.named(self.atoms()).to_string());
                for e in &t.edges {
                    if e.marks.is_empty() {
                        writeln!(dot, "{} -> {} [label=\"{}\"];", id, e.target, guard)?;
                        continue;
                    }
                    let label = format!("{} {}", guard, marks_label(&e.marks));
                    match e.marks.first() {
                        Some(m) if config.colour_marks => writeln!(
                            dot,
                            "{} -> {} [label=\"{}\", color=\"{}\"];",
                            id,
                            e.target,
                            label,
                            PALETTE[m % PALETTE.len()]
                        )?,
                        _ => writeln!(dot, "{} -> {} [label=\"{}\"];", id, e.target, label)?,
                    }
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dot_basic() {
        let aut = crate::automaton::tests::gfa();
        let dot = aut.to_dot().unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("init -> 0;"));
        assert!(dot.contains("0 -> 1 [label=\"a {0}\", color=\"#1f77b4\"];"));
        assert!(dot.contains("0 -> 0 [label=\"!a\"];"));
        assert!(dot.contains("seen=true"));
    }

    #[test]
    fn test_to_dot_with_config() {
        let aut = crate::automaton::tests::gfa();
        let config = DotConfig {
            show_names: false,
            colour_marks: false,
            ..DotConfig::default()
        };
        let dot = aut.to_dot_with_config(&config).unwrap();
        assert!(!dot.contains("seen="));
        assert!(dot.contains("0 -> 1 [label=\"a {0}\"];"));
    }

    /// Helper test to write DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let aut = crate::automaton::tests::gfa();
        let dot = aut.to_dot().unwrap();
        std::fs::write("test_output.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);
    }
}
