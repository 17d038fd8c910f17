//! Subcommand bodies: each one decodes a program, runs one pass over every
//! function, and re-encodes the result.
//!
//! Per-function work in `lvn`/`ssa`/`tdce` runs under `rayon`'s
//! `par_iter_mut`/`try_for_each` — passes neither read nor write any
//! state shared across functions, so farming them out to the thread pool is
//! a pure win on multi-function programs.

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::info;

use flow_analysis::{
    constant_propagation, dominance_frontier, dominator_tree, dominators, live_variables,
    reaching_definitions, ConstValue,
};
use flow_cfg::Cfg;
use flow_codec::{decode_program, encode_program_pretty, OrderedMap, ProgramDoc};
use flow_ir::{Function, Program};

use crate::config::Config;
use crate::error::DriverError;

fn parse_program_doc(input: &str) -> Result<ProgramDoc, DriverError> {
    Ok(serde_json::from_str(input)?)
}

/// `blocks`: splits every function's flat instruction stream into basic
/// blocks and attaches the result as each function's `blocks` section,
/// keyed by block name in the order blocks appear in the CFG.
pub fn blocks(input: &str) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let mut doc = parse_program_doc(input)?;

    for (func_doc, func) in doc.functions.iter_mut().zip(program.functions.iter()) {
        let cfg = Cfg::new(&func.name, &func.instrs)?;
        let mut blocks = OrderedMap::new();
        for name in cfg.block_names() {
            let body = cfg.block(name).unwrap_or(&[]);
            blocks.push(name.clone(), body.iter().map(flow_codec::instr_to_doc).collect());
        }
        func_doc.blocks = Some(blocks);
    }

    info!(functions = doc.functions.len(), "formed basic blocks");
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// `cfg`: attaches each function's successor map, keyed in CFG block order.
/// Requires a prior `blocks` pass — `cfg` depends on `blocks`
/// because it reads the block partition `blocks` produced rather than
/// re-deriving it.
pub fn cfg(input: &str) -> Result<String, DriverError> {
    let mut doc = parse_program_doc(input)?;
    let program = decode_program(input)?;

    for (func_doc, func) in doc.functions.iter_mut().zip(program.functions.iter()) {
        if func_doc.blocks.is_none() {
            return Err(DriverError::MissingSection(format!(
                "function `{}` has no `blocks` section; run `blocks` first",
                func.name
            )));
        }
        let graph = Cfg::new(&func.name, &func.instrs)?;
        let mut cfg_map = OrderedMap::new();
        for name in graph.block_names() {
            cfg_map.push(name.clone(), graph.successors_of(name).to_vec());
        }
        func_doc.cfg = Some(cfg_map);
    }

    Ok(serde_json::to_string_pretty(&doc)?)
}

/// `graph-cfg`: renders every function's control-flow graph as Graphviz
/// `dot` source, one `digraph` per function.
pub fn graph_cfg(input: &str) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let mut out = String::new();

    for func in &program.functions {
        let graph = Cfg::new(&func.name, &func.instrs)?;
        out.push_str(&format!("digraph {} {{\n", func.name));
        for name in graph.block_names() {
            out.push_str(&format!("  \"{name}\";\n"));
        }
        for name in graph.block_names() {
            for succ in graph.successors_of(name) {
                out.push_str(&format!("  \"{name}\" -> \"{succ}\";\n"));
            }
        }
        out.push_str("}\n");
    }

    Ok(out)
}

fn const_to_text(value: &ConstValue) -> String {
    match value {
        ConstValue::Unknown => "?".to_string(),
        ConstValue::Known(lit) => lit.to_string(),
    }
}

/// `df <analysis>`: runs `defined` (reaching definitions), `live` (live
/// variables), or `cprop` (constant propagation) and prints each block's
/// `in`/`out` facts as a text report — not JSON, per the ground-truth
/// `df.py`'s own `print` calls: one `<block>:` line, then `  in:  …` and
/// `  out: …` lines with comma-separated (and, for set analyses, sorted)
/// members.
///
/// # Errors
///
/// Returns [`DriverError::Usage`] for any analysis name other than those
/// three.
pub fn df(input: &str, analysis: &str) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let mut out = String::new();

    for func in &program.functions {
        let graph = Cfg::new(&func.name, &func.instrs)?;
        match analysis {
            "defined" => render_set_result(&graph, &reaching_definitions(&graph), &mut out),
            "live" => render_set_result(&graph, &live_variables(&graph), &mut out),
            "cprop" => render_const_result(&graph, &constant_propagation(&graph), &mut out),
            other => {
                return Err(DriverError::Usage(format!(
                    "unknown `df` analysis `{other}`; expected one of: defined, live, cprop"
                )))
            }
        }
    }

    Ok(out)
}

fn render_set_result(
    graph: &Cfg,
    result: &flow_analysis::DataflowResult<rustc_hash::FxHashSet<String>>,
    out: &mut String,
) {
    for name in graph.block_names() {
        let mut ins: Vec<&str> = result.ins[name].iter().map(String::as_str).collect();
        let mut outs: Vec<&str> = result.outs[name].iter().map(String::as_str).collect();
        ins.sort_unstable();
        outs.sort_unstable();
        out.push_str(&format!("{name}:\n"));
        out.push_str(&format!("  in:  {}\n", ins.join(", ")));
        out.push_str(&format!("  out: {}\n", outs.join(", ")));
    }
}

fn render_const_result(
    graph: &Cfg,
    result: &flow_analysis::DataflowResult<flow_analysis::ConstMap>,
    out: &mut String,
) {
    let render = |map: &flow_analysis::ConstMap| -> String {
        map.iter()
            .map(|(var, value)| format!("{var}: {}", const_to_text(value)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    for name in graph.block_names() {
        out.push_str(&format!("{name}:\n"));
        out.push_str(&format!("  in:  {}\n", render(&result.ins[name])));
        out.push_str(&format!("  out: {}\n", render(&result.outs[name])));
    }
}

/// `dom <cmd>`: reports each block's dominator set (`dom`), immediate
/// dominator tree (`tree`), or dominance frontier (`front`).
///
/// # Errors
///
/// Returns [`DriverError::Usage`] for any `cmd` other than those three.
pub fn dom(input: &str, cmd: &str) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let mut functions = Map::new();

    for func in &program.functions {
        let graph = Cfg::new(&func.name, &func.instrs)?;
        let doms = dominators(&graph);
        let fact = match cmd {
            "dom" => map_of_sorted_vecs(doms.iter().map(|(k, v)| {
                (k.clone(), v.iter().cloned().collect::<Vec<_>>())
            })),
            "tree" => {
                let idom = flow_analysis::immediate_dominators(&graph, &doms);
                let tree = dominator_tree(&graph, &idom);
                map_of_sorted_vecs(tree.into_iter())
            }
            "front" => {
                let front = dominance_frontier(&graph, &doms);
                map_of_sorted_vecs(front.into_iter().map(|(k, v)| {
                    (k, v.into_iter().collect::<Vec<_>>())
                }))
            }
            other => {
                return Err(DriverError::Usage(format!(
                    "unknown `dom` command `{other}`; expected one of: dom, tree, front"
                )))
            }
        };
        functions.insert(func.name.clone(), fact);
    }

    Ok(serde_json::to_string_pretty(&Value::Object(functions))?)
}

fn map_of_sorted_vecs(entries: impl Iterator<Item = (String, Vec<String>)>) -> Value {
    let mut obj = Map::new();
    for (k, mut v) in entries {
        v.sort_unstable();
        obj.insert(k, Value::from(v));
    }
    Value::Object(obj)
}

/// `lvn [-c|--cprop]`: runs local value numbering over every function's
/// blocks, optionally folding constants while doing so.
pub fn lvn(input: &str, config: &Config) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let functions = run_per_function(program, |func| {
        let mut graph = Cfg::new(&func.name, &func.instrs)?;
        flow_opt::local_value_numbering(&mut graph, config.cprop);
        func.instrs = graph.flatten();
        Ok(())
    })?;
    Ok(encode_program_pretty(&Program { functions })?)
}

/// `ssa <to|out>`: converts every function into or out of SSA form.
///
/// # Errors
///
/// Returns [`DriverError::Usage`] for any `direction` other than `to`/`out`.
pub fn ssa(input: &str, direction: &str) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let functions = run_per_function(program, |func| {
        match direction {
            "to" => flow_opt::into_ssa(func),
            "out" => flow_opt::out_of_ssa(func),
            other => {
                return Err(DriverError::Usage(format!(
                    "unknown `ssa` direction `{other}`; expected one of: to, out"
                )))
            }
        }
        Ok(())
    })?;
    Ok(encode_program_pretty(&Program { functions })?)
}

/// `tdce`/`tdce+`: removes dead definitions, a single global pass for plain
/// `tdce` or iterated global+local removal to a fixed point for `tdce+`.
pub fn tdce(input: &str, config: &Config) -> Result<String, DriverError> {
    let program = decode_program(input)?;
    let functions = run_per_function(program, |func| {
        if config.extended_tdce {
            flow_opt::tdce(func);
        } else {
            flow_opt::tdce_once(func);
        }
        Ok(())
    })?;
    Ok(encode_program_pretty(&Program { functions })?)
}

fn run_per_function(
    program: Program,
    f: impl Fn(&mut Function) -> Result<(), DriverError> + Sync,
) -> Result<Vec<Function>, DriverError> {
    let mut functions = program.functions;
    functions.par_iter_mut().try_for_each(|func| f(func))?;
    Ok(functions)
}
