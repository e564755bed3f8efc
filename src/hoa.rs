//! HOA v1 serialization.
//!
//! The writer emits transition-based acceptance with explicit labels; each edge
//! of a transition becomes one `[guard] target {marks}` line. The reader accepts
//! the same fragment (one initial state, explicit labels, transition marks, the
//! acceptance conditions of [`Acceptance`]) and rebuilds guards through a
//! decision diagram, so equivalent labels written differently are recognized.

use std::fmt::Write as _;

use thiserror::Error;

use crate::acceptance::Acceptance;
use crate::automaton::{Automaton, Edge, MarkSet, State, StateId, Transition};
use crate::bdd::Bdd;
use crate::guard::Guard;
use crate::reference::Ref;
use crate::types::Var;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HoaError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unsupported HOA feature: {0}")]
    Unsupported(String),

    #[error("inconsistent automaton: {0}")]
    Inconsistent(String),
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn write_marks(out: &mut String, marks: &MarkSet) {
    if marks.is_empty() {
        return;
    }
    let marks: Vec<String> = marks.iter().map(|m| m.to_string()).collect();
    write!(out, " {{{}}}", marks.join(" ")).ok();
}

impl Automaton {
    pub fn to_hoa(&self) -> String {
        let mut out = String::new();
        writeln!(out, "HOA: v1").ok();
        writeln!(out, "States: {}", self.num_states()).ok();
        writeln!(out, "Start: {}", self.initial()).ok();
        write!(out, "AP: {}", self.atoms().len()).ok();
        for ap in self.atoms() {
            write!(out, " {}", quote(ap)).ok();
        }
        out.push('\n');
        writeln!(out, "acc-name: {}", self.acceptance().hoa_name()).ok();
        writeln!(out, "Acceptance: {}", self.acceptance().hoa_condition()).ok();
        write!(out, "properties: trans-labels explicit-labels trans-acc complete").ok();
        if self.is_deterministic() {
            write!(out, " deterministic").ok();
        }
        out.push('\n');
        writeln!(out, "--BODY--").ok();
        for (i, state) in self.states().iter().enumerate() {
            write!(out, "State: {}", i).ok();
            if let Some(name) = &state.name {
                write!(out, " {}", quote(name)).ok();
            }
            out.push('\n');
            for t in &state.transitions {
                for e in &t.edges {
                    write!(out, "[{}] {}", t.guard, e.target).ok();
                    write_marks(&mut out, &e.marks);
                    out.push('\n');
                }
            }
        }
        writeln!(out, "--END--").ok();
        out
    }

    pub fn from_hoa(text: &str) -> Result<Automaton, HoaError> {
        Reader::new(text).read()
    }
}

/// Parse an `acc-name:` value.
fn parse_acc_name(value: &str) -> Option<Acceptance> {
    let words: Vec<&str> = value.split_whitespace().collect();
    let number = |s: &str| s.parse::<usize>().ok();
    match words.as_slice() {
        ["all"] => Some(Acceptance::GeneralizedBuchi { sets: 0 }),
        ["Buchi"] => Some(Acceptance::GeneralizedBuchi { sets: 1 }),
        ["generalized-Buchi", k] => number(k).map(|sets| Acceptance::GeneralizedBuchi { sets }),
        ["Rabin", k] => number(k)
            .filter(|k| k.checked_mul(2).is_some())
            .map(|pairs| Acceptance::Rabin { pairs }),
        ["parity", "min", "even", k] => number(k).map(|colours| Acceptance::Parity { colours }),
        _ => None,
    }
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

struct PendingState {
    name: Option<String>,
    edges: Vec<(Ref, Edge)>,
}

struct Reader<'t> {
    text: &'t str,
    bdd: Bdd,
}

impl<'t> Reader<'t> {
    fn new(text: &'t str) -> Self {
        Self { text, bdd: Bdd::default() }
    }

    fn syntax(line: usize, message: impl Into<String>) -> HoaError {
        HoaError::Syntax {
            line,
            message: message.into(),
        }
    }

    fn read(self) -> Result<Automaton, HoaError> {
        let mut lines = self
            .text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let mut num_states: Option<usize> = None;
        let mut initial: Option<StateId> = None;
        let mut atoms: Option<Vec<String>> = None;
        let mut acc_name: Option<(usize, String)> = None;
        let mut condition: Option<(usize, String)> = None;

        match lines.next() {
            Some((_, l)) if without_whitespace(l) == "HOA:v1" => {}
            Some((n, _)) => return Err(Self::syntax(n, "expected 'HOA: v1'")),
            None => return Err(Self::syntax(0, "empty input")),
        }

        // Header
        loop {
            let Some((n, line)) = lines.next() else {
                return Err(Self::syntax(0, "missing --BODY--"));
            };
            if line == "--BODY--" {
                break;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(Self::syntax(n, format!("expected 'name: value', found '{}'", line)));
            };
            let value = value.trim();
            match key.trim() {
                "States" => num_states = Some(parse_number(n, value)?),
                "Start" => {
                    if initial.is_some() || value.contains('&') {
                        return Err(HoaError::Unsupported("more than one initial state".to_string()));
                    }
                    initial = Some(parse_number(n, value)?);
                }
                "AP" => atoms = Some(parse_ap(n, value)?),
                "acc-name" => acc_name = Some((n, value.to_string())),
                "Acceptance" => condition = Some((n, value.to_string())),
                "Alias" => return Err(HoaError::Unsupported("aliases".to_string())),
                _ => {}
            }
        }

        let atoms = atoms.unwrap_or_default();
        let Some((acc_line, acc_name)) = acc_name else {
            return Err(HoaError::Unsupported("acceptance without acc-name".to_string()));
        };
        let acceptance = parse_acc_name(&acc_name)
            .ok_or_else(|| HoaError::Unsupported(format!("acceptance '{}' (line {})", acc_name, acc_line)))?;
        let Some((cond_line, condition)) = condition else {
            return Err(Self::syntax(0, "missing Acceptance"));
        };
        // Each set occupies several characters of the condition.
        if acceptance.num_sets() > condition.len() {
            return Err(HoaError::Inconsistent(format!(
                "{} uses more sets than condition '{}' can mention",
                acceptance, condition
            )));
        }
        if without_whitespace(&condition) != without_whitespace(&acceptance.hoa_condition()) {
            return Err(HoaError::Unsupported(format!(
                "condition '{}' for {} (line {})",
                condition, acceptance, cond_line
            )));
        }
        let num_sets = acceptance.num_sets();
        let initial = initial.ok_or_else(|| HoaError::Inconsistent("no initial state".to_string()))?;

        // Body. Every state needs a line of its own, so no valid id reaches the line count.
        let num_lines = self.text.lines().count();
        let mut states: Vec<Option<PendingState>> = Vec::new();
        let mut current: Option<usize> = None;
        let mut ended = false;
        for (n, line) in lines.by_ref() {
            if line == "--END--" {
                ended = true;
                break;
            }
            if let Some(rest) = line.strip_prefix("State:") {
                let (id, rest) = split_number(n, rest.trim())?;
                let (name, rest) = if rest.starts_with('"') {
                    let (s, rest) = parse_string(n, rest)?;
                    (Some(s), rest.trim())
                } else {
                    (None, rest)
                };
                if !rest.is_empty() {
                    return Err(HoaError::Unsupported("state-based acceptance or state labels".to_string()));
                }
                if let Some(k) = num_states.filter(|&k| id >= k) {
                    return Err(HoaError::Inconsistent(format!("state {} beyond declared count {}", id, k)));
                }
                if id >= num_lines {
                    return Err(HoaError::Inconsistent(format!(
                        "state {} leaves lower states undefined",
                        id
                    )));
                }
                if states.len() <= id {
                    states.resize_with(id + 1, || None);
                }
                if states[id].is_some() {
                    return Err(Self::syntax(n, format!("state {} defined twice", id)));
                }
                states[id] = Some(PendingState { name, edges: Vec::new() });
                current = Some(id);
            } else if let Some(rest) = line.strip_prefix('[') {
                let Some(state) = current else {
                    return Err(Self::syntax(n, "edge outside of a state"));
                };
                let Some((label, rest)) = rest.split_once(']') else {
                    return Err(Self::syntax(n, "unterminated label"));
                };
                let guard = self.parse_label(n, label, atoms.len())?;
                let rest = rest.trim();
                if rest.contains('&') {
                    return Err(HoaError::Unsupported("universal branching".to_string()));
                }
                let (target, rest) = split_number(n, rest)?;
                let marks = parse_marks(n, rest, num_sets)?;
                if let Some(s) = states[state].as_mut() {
                    s.edges.push((guard, Edge { target, marks }));
                }
            } else {
                return Err(HoaError::Unsupported(format!("implicit labels or unknown body line '{}'", line)));
            }
        }
        if !ended {
            return Err(Self::syntax(0, "missing --END--"));
        }

        let num_states = num_states.unwrap_or(states.len());
        if states.len() < num_states {
            return Err(HoaError::Inconsistent(format!("state {} has no definition", states.len())));
        }

        let mut result = Vec::with_capacity(num_states);
        for (i, state) in states.into_iter().enumerate() {
            let state = state.ok_or_else(|| HoaError::Inconsistent(format!("state {} has no definition", i)))?;
            result.push(self.group(state));
        }
        let automaton = Automaton::new(atoms, result, initial, acceptance);
        automaton.validate().map_err(HoaError::Inconsistent)?;
        Ok(automaton)
    }

    /// Turn labelled edges into disjoint transitions.
    fn group(&self, state: PendingState) -> State {
        let mut guards: Vec<Ref> = Vec::new();
        let mut edges: Vec<Vec<Edge>> = Vec::new();
        for (g, e) in state.edges {
            match guards.iter().position(|&h| h == g) {
                Some(k) => {
                    if !edges[k].contains(&e) {
                        edges[k].push(e)
                    }
                }
                None => {
                    guards.push(g);
                    edges.push(vec![e]);
                }
            }
        }
        let transitions = self
            .bdd
            .partition(&guards)
            .into_iter()
            .map(|(region, members)| {
                let mut merged: Vec<Edge> = Vec::new();
                for m in members {
                    for e in &edges[m] {
                        if !merged.contains(e) {
                            merged.push(e.clone());
                        }
                    }
                }
                Transition {
                    guard: Guard::from_bdd(&self.bdd, region),
                    edges: merged,
                }
            })
            .collect();
        State {
            name: state.name,
            transitions,
        }
    }

    fn parse_label(&self, line: usize, label: &str, num_aps: usize) -> Result<Ref, HoaError> {
        let tokens: Vec<char> = label.chars().filter(|c| !c.is_whitespace()).collect();
        let mut parser = LabelParser {
            bdd: &self.bdd,
            tokens: &tokens,
            pos: 0,
            line,
            num_aps,
        };
        let f = parser.disjunction()?;
        if parser.pos != tokens.len() {
            return Err(Self::syntax(line, format!("trailing input in label '{}'", label)));
        }
        Ok(f)
    }
}

struct LabelParser<'a> {
    bdd: &'a Bdd,
    tokens: &'a [char],
    pos: usize,
    line: usize,
    num_aps: usize,
}

impl LabelParser<'_> {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> HoaError {
        HoaError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn disjunction(&mut self) -> Result<Ref, HoaError> {
        let mut f = self.conjunction()?;
        while self.peek() == Some('|') {
            self.pos += 1;
            let g = self.conjunction()?;
            f = self.bdd.apply_or(f, g);
        }
        Ok(f)
    }

    fn conjunction(&mut self) -> Result<Ref, HoaError> {
        let mut f = self.unary()?;
        while self.peek() == Some('&') {
            self.pos += 1;
            let g = self.unary()?;
            f = self.bdd.apply_and(f, g);
        }
        Ok(f)
    }

    fn unary(&mut self) -> Result<Ref, HoaError> {
        match self.peek() {
            Some('!') => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some('(') => {
                self.pos += 1;
                let f = self.disjunction()?;
                if self.peek() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                self.pos += 1;
                Ok(f)
            }
            Some('t') => {
                self.pos += 1;
                Ok(self.bdd.one())
            }
            Some('f') => {
                self.pos += 1;
                Ok(self.bdd.zero())
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.tokens[start..self.pos].iter().collect();
                let ap: usize = digits.parse().map_err(|_| self.error("bad proposition index"))?;
                if ap >= self.num_aps {
                    return Err(HoaError::Inconsistent(format!(
                        "label refers to proposition {} but only {} are declared",
                        ap, self.num_aps
                    )));
                }
                Ok(self.bdd.mk_var(Var::from_ap(ap)))
            }
            Some('@') => Err(HoaError::Unsupported("aliases".to_string())),
            Some(c) => Err(self.error(format!("unexpected '{}' in label", c))),
            None => Err(self.error("unexpected end of label")),
        }
    }
}

fn parse_number(line: usize, s: &str) -> Result<usize, HoaError> {
    s.trim().parse().map_err(|_| HoaError::Syntax {
        line,
        message: format!("expected a number, found '{}'", s),
    })
}

/// Leading number and the trimmed rest.
fn split_number(line: usize, s: &str) -> Result<(usize, &str), HoaError> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let value = parse_number(line, &s[..end])?;
    Ok((value, s[end..].trim()))
}

/// A quoted string at the start of `s` and the rest after it.
fn parse_string(line: usize, s: &str) -> Result<(String, &str), HoaError> {
    let mut chars = s.char_indices();
    if chars.next().map(|(_, c)| c) != Some('"') {
        return Err(HoaError::Syntax {
            line,
            message: "expected '\"'".to_string(),
        });
    }
    let mut out = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Ok((out, &s[i + 1..]));
        } else {
            out.push(c);
        }
    }
    Err(HoaError::Syntax {
        line,
        message: "unterminated string".to_string(),
    })
}

fn parse_ap(line: usize, value: &str) -> Result<Vec<String>, HoaError> {
    let (count, mut rest) = split_number(line, value)?;
    let mut names = Vec::new();
    while !rest.is_empty() {
        let (name, tail) = parse_string(line, rest)?;
        names.push(name);
        rest = tail.trim();
    }
    if names.len() != count {
        return Err(HoaError::Inconsistent(format!(
            "AP declares {} propositions but names {}",
            count,
            names.len()
        )));
    }
    Ok(names)
}

fn parse_marks(line: usize, s: &str, num_sets: usize) -> Result<MarkSet, HoaError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(MarkSet::new());
    }
    let inner = s
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| HoaError::Syntax {
            line,
            message: format!("expected acceptance marks, found '{}'", s),
        })?;
    inner
        .split_whitespace()
        .map(|m| {
            let mark = parse_number(line, m)?;
            if mark >= num_sets {
                return Err(HoaError::Inconsistent(format!(
                    "mark {} but only {} acceptance sets",
                    mark, num_sets
                )));
            }
            Ok(mark)
        })
        .collect()
}
