//! The `apex` command: no arguments starts the REPL, `apex <file> [args…]`
//! runs a script (spec.md §6).
//!
//! The REPL loop is grounded in `ouros/src/bin/ouros-repl.rs`'s manual
//! stdin read/print loop, adapted to `apex::ReplSession`'s own
//! incompleteness signal instead of a bracket-balance heuristic.

use std::io::{self, Write};
use std::process::ExitCode;

use apex::{program_args, run_script, ReplOutcome, ReplSession, Value};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        run_file(&args[1], &args[2..])
    } else {
        run_repl()
    }
}

fn run_file(path: &str, trailing: &[String]) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error reading {path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let argv = program_args(path, trailing);
    match run_script(&source, path, &argv) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Interactive mode never sets `@args` (`original_source/main.c`'s
/// `start_repl()` branch does not build the `args` array at all, unlike the
/// file-execution branch), so the REPL session starts with an empty argv.
fn run_repl() -> ExitCode {
    let mut session = ReplSession::new(&[], "<stdin>");
    let mut source = String::new();

    loop {
        let prompt = if source.is_empty() { ">> " } else { ".. " };
        let Some(line) = read_line(prompt) else {
            println!();
            return ExitCode::SUCCESS;
        };

        if source.is_empty() && line.trim().is_empty() {
            continue;
        }
        if !source.is_empty() {
            source.push('\n');
        }
        source.push_str(&line);

        match session.submit(&source) {
            ReplOutcome::Incomplete => continue,
            ReplOutcome::Value(value) => {
                if !matches!(value, Value::Null) {
                    println!("{}", describe(&value));
                }
            }
            ReplOutcome::SyntaxError(errors) => report_all(&errors),
            ReplOutcome::CompileError(errors) => report_all(&errors),
            ReplOutcome::RuntimeError(err) => eprint!("{err}"),
        }
        source.clear();
    }
}

/// Bare `Value` display for REPL echo: container internals aren't resolvable
/// here without the VM's heap/interner, so non-primitive values fall back to
/// their tag name instead of rendering contents.
fn describe(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Flt(f) => f.to_string(),
        Value::Dbl(d) => d.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_owned(),
        other => format!("<{}>", other.type_name()),
    }
}

fn report_all(errors: &[impl std::fmt::Display]) {
    for err in errors {
        eprintln!("{err}");
    }
}

fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
