//! HOA round trips and the foreign boundary.

use ltl_rs::acceptance::{Acceptance, AcceptanceStrategy};
use ltl_rs::automaton::Automaton;
use ltl_rs::boundary::{parse_hoa, translate_to_hoa, ErrorCode};
use ltl_rs::hoa::HoaError;
use ltl_rs::ltl::Ltl;
use ltl_rs::translate::{translate, Minimization, ResourceLimits, TranslationOptions};
use ltl_rs::word::LassoWord;
use test_log::test;

fn formulas() -> Vec<Ltl> {
    let a = || Ltl::atom("a");
    let b = || Ltl::atom("b");
    let c = || Ltl::atom("c");
    vec![
        Ltl::True,
        Ltl::False,
        a(),
        a().until(b()).globally(),
        a().finally().globally().and(b().finally().globally()).and(c().not().finally()),
        a().weak_until(b()).or(c().strong_release(a())),
        a().implies(b().next().next()).globally(),
    ]
}

#[test]
fn test_exact_round_trip() {
    for f in formulas() {
        for strategy in [
            AcceptanceStrategy::GeneralizedBuchi,
            AcceptanceStrategy::Rabin,
            AcceptanceStrategy::Parity,
        ] {
            for minimization in [Minimization::Off, Minimization::SimulationAndOracle] {
                let options = TranslationOptions::default()
                    .with_acceptance(strategy)
                    .with_minimization(minimization);
                let aut = translate(&f, &options).unwrap().automaton;
                let text = aut.to_hoa();
                let back = Automaton::from_hoa(&text).unwrap();
                assert_eq!(back, aut, "{}", text);
                assert_eq!(back.to_hoa(), text);
            }
        }
    }
}

#[test]
fn test_header() {
    let options = TranslationOptions::default().with_acceptance(AcceptanceStrategy::Rabin);
    // The tableau of a & X b is deterministic, so one Rabin pair suffices.
    let aut = translate(&Ltl::atom("a").and(Ltl::atom("b").next()), &options)
        .unwrap()
        .automaton;
    let text = aut.to_hoa();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "HOA: v1");
    assert_eq!(lines[1], format!("States: {}", aut.num_states()));
    assert_eq!(lines[2], format!("Start: {}", aut.initial()));
    assert_eq!(lines[3], "AP: 2 \"a\" \"b\"");
    assert_eq!(lines[4], "acc-name: Rabin 1");
    assert_eq!(lines[5], "Acceptance: 2 (Fin(0)&Inf(1))");
    assert!(text.ends_with("--END--\n"));
}

#[test]
fn test_read_foreign_output() {
    // G F a, as written by another tool: extra headers, state-less names,
    // marks on the !a edge.
    let text = r#"HOA: v1
name: "G F a"
States: 1
Start: 0
AP: 1 "a"
acc-name: Buchi
Acceptance: 1 Inf(0)
properties: trans-labels explicit-labels trans-acc complete
properties: deterministic stutter-invariant
tool: "other" "1.0"
--BODY--
State: 0
[!0] 0
[0] 0 {0}
--END--
"#;
    let aut = Automaton::from_hoa(text).unwrap();
    assert_eq!(*aut.acceptance(), Acceptance::GeneralizedBuchi { sets: 1 });
    assert!(aut.is_deterministic());
    assert!(aut.accepts(&LassoWord::from_names(&["a"], &[], &[&["a"], &[]])));
    assert!(!aut.accepts(&LassoWord::from_names(&["a"], &[&["a"]], &[&[]])));
}

#[test]
fn test_malformed_input() {
    let ok = translate(&Ltl::atom("a").finally(), &TranslationOptions::default())
        .unwrap()
        .automaton
        .to_hoa();
    assert!(Automaton::from_hoa(&ok).is_ok());

    let no_body = ok.replace("--BODY--", "--BODIES--");
    assert!(matches!(Automaton::from_hoa(&no_body), Err(HoaError::Syntax { .. })));

    let two_starts = ok.replace("Start: 0", "Start: 0\nStart: 1");
    assert!(matches!(Automaton::from_hoa(&two_starts), Err(HoaError::Unsupported(_))));

    let bad_target = ok.replacen("] 1", "] 7", 1);
    if bad_target != ok {
        assert!(matches!(Automaton::from_hoa(&bad_target), Err(HoaError::Inconsistent(_))));
    }

    let implicit = ok.replace("[t] ", "");
    if implicit != ok {
        assert!(Automaton::from_hoa(&implicit).is_err());
    }
}

#[test]
fn test_boundary() {
    let out = translate_to_hoa(Ltl::atom("x").release(Ltl::atom("y")), TranslationOptions::default()).unwrap();
    assert!(out.advisories.is_empty());
    let aut = parse_hoa(&out.hoa).unwrap();
    assert_eq!(aut.atoms(), &["x", "y"]);

    let err = translate_to_hoa(Ltl::atom("not valid"), TranslationOptions::default()).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFormula);

    let limits = ResourceLimits {
        max_states: 1,
        ..ResourceLimits::default()
    };
    let err = translate_to_hoa(
        Ltl::atom("a").next().next(),
        TranslationOptions::default().with_limits(limits),
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::ResourceExhausted);
    assert_eq!(err.code.code(), 2);

    let err = parse_hoa("HOA: v1\n--BODY--\n--END--\n").unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedAutomaton);

    let huge = out.hoa.replacen("State: 0", &format!("State: {}", usize::MAX), 1);
    let err = parse_hoa(&huge).unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedAutomaton);
}

#[test]
fn test_determinized_header() {
    // a U b needs two names on the letter a & b.
    let options = TranslationOptions::default()
        .with_acceptance(AcceptanceStrategy::Rabin)
        .with_minimization(Minimization::Off);
    let aut = translate(&Ltl::atom("a").until(Ltl::atom("b")), &options)
        .unwrap()
        .automaton;
    assert!(aut.is_deterministic());
    assert_eq!(*aut.acceptance(), Acceptance::Rabin { pairs: 2 });
    let text = aut.to_hoa();
    assert!(text.contains("acc-name: Rabin 2\n"));
    assert_eq!(Automaton::from_hoa(&text).unwrap(), aut);
}
