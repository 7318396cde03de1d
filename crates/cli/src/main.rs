//! nock - a thin command-line wrapper around `nock-runtime`.
//!
//! Parses a subject and a formula, each in the diagnostic bracket format
//! (`atom := decimal`, `cell := '[' noun ' ' noun ']'`), evaluates
//! `*[subject formula]`, and prints the result in the same format. This
//! binary has no logic of its own beyond parsing and printing: the CLI is
//! explicitly not part of the core's contract (spec.md §6).

use clap::Parser;
use nock_core::{parse_external_noun, print_external, ExternalNoun};
use nock_runtime::{GcConfig, NockContext};

#[derive(Parser)]
#[command(name = "nock")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Evaluate *[subject formula] for the twelve Nock combinators", long_about = None)]
struct Args {
    /// Subject noun in bracket format, e.g. "[4 5]" or "42"
    subject: String,

    /// Formula noun in bracket format, e.g. "[0 2]"
    formula: String,

    /// Emit tracing output (evaluator steps and GC collections) to stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    if args.debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env().add_directive("nock=trace".parse().unwrap()),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(err) = run(&args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let subject = parse(&args.subject)?;
    let formula = parse(&args.formula)?;

    let config = GcConfig::new().with_debug(args.debug);
    let mut ctx = NockContext::with_config(config);
    let result = ctx
        .nock(&subject, &formula)
        .map_err(|e| format!("evaluation fault: {e}"))?;
    println!("{}", print_external(&result));
    Ok(())
}

fn parse(input: &str) -> Result<ExternalNoun, String> {
    parse_external_noun(input).map_err(|e| format!("could not parse {input:?}: {e}"))
}
