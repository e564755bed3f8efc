use std::time::Instant;

use clap::{Parser, ValueEnum};

use ltl_rs::acceptance::AcceptanceStrategy;
use ltl_rs::ltl::Ltl;
use ltl_rs::oracle::ProcessOracle;
use ltl_rs::translate::{Minimization, ResourceLimits, TranslationOptions, Translator};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Family {
    /// G F p1 & ... & G F pn
    GfAnd,
    /// F G p1 | ... | F G pn
    FgOr,
    /// (((p1 U p2) U p3) ... U pn)
    ULeft,
    /// p1 U (p2 U (... U pn))
    URight,
    /// G (p1 -> F p2) & ... & G (p(n-1) -> F pn)
    Response,
    /// X X ... X p1
    XChain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Acceptance {
    Gba,
    Rabin,
    Parity,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Reduce {
    Off,
    Simulation,
    Oracle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Hoa,
    Dot,
    Stats,
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Formula family.
    #[arg(value_enum)]
    family: Family,

    /// Family parameter.
    #[arg(value_name = "INT", default_value = "3")]
    n: usize,

    #[clap(long, value_enum, default_value = "gba")]
    acceptance: Acceptance,

    #[clap(long, value_enum, default_value = "simulation")]
    reduce: Reduce,

    #[clap(long, value_enum, default_value = "hoa")]
    format: Format,

    /// External DIMACS solver for the oracle step (built-in CaDiCaL otherwise).
    #[clap(long, value_name = "PATH")]
    solver: Option<String>,

    /// Maximum number of automaton states.
    #[clap(long, value_name = "INT", default_value = "10000")]
    max_states: usize,
}

fn p(i: usize) -> Ltl {
    Ltl::atom(format!("p{}", i))
}

fn family(family: Family, n: usize) -> Ltl {
    let n = n.max(1);
    match family {
        Family::GfAnd => Ltl::all((1..=n).map(|i| p(i).finally().globally())),
        Family::FgOr => Ltl::any((1..=n).map(|i| p(i).globally().finally())),
        Family::ULeft => (2..=n).fold(p(1), |acc, i| acc.until(p(i))),
        Family::URight => (1..n).rev().fold(p(n), |acc, i| p(i).until(acc)),
        Family::Response => {
            if n < 2 {
                p(1).finally().globally()
            } else {
                Ltl::all((1..n).map(|i| p(i).implies(p(i + 1).finally()).globally()))
            }
        }
        Family::XChain => (0..n).fold(p(1), |acc, _| acc.next()),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    eprintln!("args = {:?}", args);

    let formula = family(args.family, args.n);
    eprintln!("formula = {}", formula);

    let options = TranslationOptions::default()
        .with_acceptance(match args.acceptance {
            Acceptance::Gba => AcceptanceStrategy::GeneralizedBuchi,
            Acceptance::Rabin => AcceptanceStrategy::Rabin,
            Acceptance::Parity => AcceptanceStrategy::Parity,
        })
        .with_minimization(match args.reduce {
            Reduce::Off => Minimization::Off,
            Reduce::Simulation => Minimization::SimulationOnly,
            Reduce::Oracle => Minimization::SimulationAndOracle,
        })
        .with_limits(ResourceLimits {
            max_states: args.max_states,
            ..ResourceLimits::default()
        });

    let mut translator = Translator::new(options);
    if let Some(solver) = &args.solver {
        translator = translator.with_oracle(std::sync::Arc::new(ProcessOracle::new(solver)));
    }

    let translation = translator.translate(&formula)?;
    for advisory in &translation.advisories {
        eprintln!("advisory: {}", advisory);
    }

    match args.format {
        Format::Hoa => print!("{}", translation.automaton.to_hoa()),
        Format::Dot => print!("{}", translation.automaton.to_dot()?),
        Format::Stats => {
            println!("normalized: {}", translation.formula);
            println!("explored: {} states", translation.explored_states);
            println!("oracle queries: {}", translation.oracle_queries);
            println!("{}", translation.automaton.stats());
        }
    }

    eprintln!("All done in {:.3} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
