//! The `flowc` command-line driver: a thin dispatcher over the
//! `flow_ir`/`flow_cfg`/`flow_analysis`/`flow_opt`/`flow_codec` library
//! crates.
//!
//! Every subcommand reads a JSON program from stdin and writes a JSON (or,
//! for `graph-cfg`, Graphviz `dot`) result to stdout. Parse/usage/pass
//! failures are reported on stderr with a non-zero exit code rather than
//! partial output.

pub mod commands;
mod config;
mod error;
pub mod tracing_setup;

pub use config::Config;
pub use error::DriverError;

use std::io::{Read, Write};

const USAGE: &str = "\
flowc <command> [options]

Commands:
  blocks                 split every function into basic blocks
  cfg                    attach each function's successor map (needs blocks)
  graph-cfg              render each function's CFG as Graphviz dot
  df <defined|live|cprop> run a dataflow analysis
  dom <dom|tree|front>   report dominator sets, tree, or frontier
  lvn [-c|--cprop]       local value numbering (optionally folding constants)
  ssa <to|out>           convert into or out of SSA form
  tdce                   remove dead definitions, one global pass
  tdce+                  remove dead definitions, iterated to a fixed point
  version                print the version string
  help                   print this message

All commands read a JSON program from stdin and write to stdout.";

/// Dispatches a parsed argument list to the matching subcommand and returns
/// the process exit code.
#[must_use]
pub fn run(args: &[String]) -> i32 {
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        return 1;
    };

    match command.as_str() {
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            0
        }
        "version" | "--version" => {
            println!("flowc {}", env!("CARGO_PKG_VERSION"));
            0
        }
        "blocks" => run_stdin_command(commands::blocks),
        "cfg" => run_stdin_command(commands::cfg),
        "graph-cfg" => run_stdin_command(commands::graph_cfg),
        "df" => match args.get(1) {
            Some(analysis) => run_stdin_command(|input| commands::df(input, analysis)),
            None => usage_error("`df` requires an analysis name: defined, live, or cprop"),
        },
        "dom" => match args.get(1) {
            Some(sub) => run_stdin_command(|input| commands::dom(input, sub)),
            None => usage_error("`dom` requires a command: dom, tree, or front"),
        },
        "lvn" => {
            let config = Config {
                cprop: args[1..].iter().any(|a| a == "-c" || a == "--cprop"),
                extended_tdce: false,
            };
            run_stdin_command(|input| commands::lvn(input, &config))
        }
        "ssa" => match args.get(1) {
            Some(direction) => run_stdin_command(|input| commands::ssa(input, direction)),
            None => usage_error("`ssa` requires a direction: to or out"),
        },
        "tdce" => {
            let config = Config::default();
            run_stdin_command(|input| commands::tdce(input, &config))
        }
        "tdce+" => {
            let config = Config {
                cprop: false,
                extended_tdce: true,
            };
            run_stdin_command(|input| commands::tdce(input, &config))
        }
        other => {
            eprintln!("flowc: unknown command `{other}`\n\n{USAGE}");
            1
        }
    }
}

fn usage_error(msg: &str) -> i32 {
    eprintln!("flowc: {msg}");
    1
}

/// Reads all of stdin, runs `f` over it, and prints the result to stdout
/// (exit 0) or the error to stderr (exit 1).
fn run_stdin_command(f: impl FnOnce(&str) -> Result<String, DriverError>) -> i32 {
    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("flowc: failed to read stdin: {err}");
        return 1;
    }

    match f(&input) {
        Ok(output) => {
            let mut stdout = std::io::stdout();
            if writeln!(stdout, "{output}").is_err() {
                return 1;
            }
            0
        }
        Err(err) => {
            eprintln!("flowc: {err}");
            1
        }
    }
}
