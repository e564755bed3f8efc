//! Raw linear temporal logic formulas, as handed over by a parser.
//!
//! [`Ltl`] is a plain owned tree with the full operator set, including the
//! derived ones. It is the input type of the translation API; the normalizer
//! turns it into a hash-consed [`Formula`][crate::formula::Formula] in negation
//! normal form.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, TranslationError};

/// Linear temporal logic formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ltl {
    True,
    False,
    /// Atomic proposition.
    Atom(String),
    Not(Box<Ltl>),
    /// N-ary conjunction. Must have at least one operand.
    And(Vec<Ltl>),
    /// N-ary disjunction. Must have at least one operand.
    Or(Vec<Ltl>),
    Implies(Box<Ltl>, Box<Ltl>),
    Iff(Box<Ltl>, Box<Ltl>),
    Xor(Box<Ltl>, Box<Ltl>),

    // Temporal operators
    /// Next: X φ
    Next(Box<Ltl>),
    /// Finally: F φ
    Finally(Box<Ltl>),
    /// Globally: G φ
    Globally(Box<Ltl>),
    /// Until: φ U ψ
    Until(Box<Ltl>, Box<Ltl>),
    /// Release: φ R ψ
    Release(Box<Ltl>, Box<Ltl>),
    /// Weak until: φ W ψ ≡ (φ U ψ) ∨ G φ
    WeakUntil(Box<Ltl>, Box<Ltl>),
    /// Strong release: φ M ψ ≡ ψ U (φ ∧ ψ)
    StrongRelease(Box<Ltl>, Box<Ltl>),
}

const RESERVED: &[&str] = &["true", "false"];

impl Ltl {
    pub fn atom(s: impl Into<String>) -> Self {
        Ltl::Atom(s.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Ltl::Not(Box::new(self))
    }

    pub fn and(self, other: Self) -> Self {
        Ltl::And(vec![self, other])
    }

    pub fn or(self, other: Self) -> Self {
        Ltl::Or(vec![self, other])
    }

    pub fn all(operands: impl IntoIterator<Item = Ltl>) -> Self {
        Ltl::And(operands.into_iter().collect())
    }

    pub fn any(operands: impl IntoIterator<Item = Ltl>) -> Self {
        Ltl::Or(operands.into_iter().collect())
    }

    pub fn implies(self, other: Self) -> Self {
        Ltl::Implies(Box::new(self), Box::new(other))
    }

    pub fn iff(self, other: Self) -> Self {
        Ltl::Iff(Box::new(self), Box::new(other))
    }

    pub fn xor(self, other: Self) -> Self {
        Ltl::Xor(Box::new(self), Box::new(other))
    }

    pub fn next(self) -> Self {
        Ltl::Next(Box::new(self))
    }

    pub fn finally(self) -> Self {
        Ltl::Finally(Box::new(self))
    }

    pub fn globally(self) -> Self {
        Ltl::Globally(Box::new(self))
    }

    pub fn until(self, other: Self) -> Self {
        Ltl::Until(Box::new(self), Box::new(other))
    }

    pub fn release(self, other: Self) -> Self {
        Ltl::Release(Box::new(self), Box::new(other))
    }

    pub fn weak_until(self, other: Self) -> Self {
        Ltl::WeakUntil(Box::new(self), Box::new(other))
    }

    pub fn strong_release(self, other: Self) -> Self {
        Ltl::StrongRelease(Box::new(self), Box::new(other))
    }

    /// Direct subformulas, left to right.
    pub fn children(&self) -> Vec<&Ltl> {
        match self {
            Ltl::True | Ltl::False | Ltl::Atom(_) => vec![],
            Ltl::Not(a) | Ltl::Next(a) | Ltl::Finally(a) | Ltl::Globally(a) => vec![&**a],
            Ltl::And(xs) | Ltl::Or(xs) => xs.iter().collect(),
            Ltl::Implies(a, b)
            | Ltl::Iff(a, b)
            | Ltl::Xor(a, b)
            | Ltl::Until(a, b)
            | Ltl::Release(a, b)
            | Ltl::WeakUntil(a, b)
            | Ltl::StrongRelease(a, b) => vec![&**a, &**b],
        }
    }

    /// Atomic propositions in order of first occurrence.
    pub fn atoms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            if let Ltl::Atom(name) = f {
                if seen.insert(name.as_str()) {
                    result.push(name.clone());
                }
            }
            // Reverse so that the leftmost child is visited first.
            stack.extend(f.children().into_iter().rev());
        }
        result
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(Ltl::size).sum::<usize>()
    }

    /// Check that the formula is well formed.
    ///
    /// Rejects empty n-ary operators, malformed or reserved proposition names,
    /// and, when `alphabet` is given, propositions outside of it.
    pub fn validate(&self, alphabet: Option<&[String]>) -> Result<()> {
        let mut stack = vec![self];
        while let Some(f) = stack.pop() {
            match f {
                Ltl::And(xs) if xs.is_empty() => {
                    return Err(TranslationError::InvalidFormula("empty conjunction".into()));
                }
                Ltl::Or(xs) if xs.is_empty() => {
                    return Err(TranslationError::InvalidFormula("empty disjunction".into()));
                }
                Ltl::Atom(name) => {
                    validate_name(name)?;
                    if let Some(alphabet) = alphabet {
                        if !alphabet.iter().any(|a| a == name) {
                            return Err(TranslationError::InvalidFormula(format!(
                                "proposition '{}' is not in the declared alphabet",
                                name
                            )));
                        }
                    }
                }
                _ => {}
            }
            stack.extend(f.children());
        }
        Ok(())
    }
}

/// Check a proposition name: `[A-Za-z_][A-Za-z0-9_.]*`, not a reserved word.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    };
    if !valid {
        return Err(TranslationError::InvalidFormula(format!(
            "ill-formed proposition name '{}'",
            name
        )));
    }
    if RESERVED.contains(&name) {
        return Err(TranslationError::InvalidFormula(format!(
            "proposition name '{}' is reserved",
            name
        )));
    }
    Ok(())
}

impl fmt::Display for Ltl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, xs: &[Ltl], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, x) in xs.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", x)?;
            }
            write!(f, ")")
        }

        match self {
            Ltl::True => write!(f, "true"),
            Ltl::False => write!(f, "false"),
            Ltl::Atom(s) => write!(f, "{}", s),
            Ltl::Not(a) => write!(f, "!{}", a),
            Ltl::And(xs) => join(f, xs, "&"),
            Ltl::Or(xs) => join(f, xs, "|"),
            Ltl::Implies(a, b) => write!(f, "({} -> {})", a, b),
            Ltl::Iff(a, b) => write!(f, "({} <-> {})", a, b),
            Ltl::Xor(a, b) => write!(f, "({} ^ {})", a, b),
            Ltl::Next(a) => write!(f, "X {}", a),
            Ltl::Finally(a) => write!(f, "F {}", a),
            Ltl::Globally(a) => write!(f, "G {}", a),
            Ltl::Until(a, b) => write!(f, "({} U {})", a, b),
            Ltl::Release(a, b) => write!(f, "({} R {})", a, b),
            Ltl::WeakUntil(a, b) => write!(f, "({} W {})", a, b),
            Ltl::StrongRelease(a, b) => write!(f, "({} M {})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let f = Ltl::atom("a").until(Ltl::atom("b").not()).globally();
        assert_eq!(f.to_string(), "G (a U !b)");
        let g = Ltl::all([Ltl::atom("a"), Ltl::True, Ltl::atom("c").finally()]);
        assert_eq!(g.to_string(), "(a & true & F c)");
    }

    #[test]
    fn test_atoms_in_first_occurrence_order() {
        let f = Ltl::atom("b")
            .until(Ltl::atom("a"))
            .and(Ltl::atom("b").next().or(Ltl::atom("c")));
        assert_eq!(f.atoms(), vec!["b", "a", "c"]);
        assert_eq!(f.size(), 8);
    }

    #[test]
    fn test_validate_rejects_empty_operators() {
        assert!(matches!(
            Ltl::And(vec![]).validate(None),
            Err(TranslationError::InvalidFormula(_))
        ));
        assert!(matches!(
            Ltl::atom("a").or(Ltl::Or(vec![])).next().validate(None),
            Err(TranslationError::InvalidFormula(_))
        ));
    }

    #[test]
    fn test_validate_names() {
        assert!(Ltl::atom("req_1.ok").validate(None).is_ok());
        assert!(Ltl::atom("").validate(None).is_err());
        assert!(Ltl::atom("1a").validate(None).is_err());
        assert!(Ltl::atom("a b").validate(None).is_err());
        assert!(Ltl::atom("true").validate(None).is_err());
    }

    #[test]
    fn test_validate_alphabet() {
        let alphabet = vec!["a".to_string(), "b".to_string()];
        let f = Ltl::atom("a").until(Ltl::atom("b"));
        assert!(f.validate(Some(&alphabet)).is_ok());
        let g = f.and(Ltl::atom("c"));
        assert!(g.validate(Some(&alphabet)).is_err());
    }
}
