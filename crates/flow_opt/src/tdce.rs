//! Trivial dead code elimination: global use-less-def removal plus
//! block-local dead-store elimination.

use flow_cfg::Cfg;
use flow_ir::{Function, Instr};
use rustc_hash::FxHashMap;
use tracing::trace;

/// A single pass of global dead-def removal, run once rather than to a
/// fixed point. This is the CLI's plain `tdce`: it catches defs that are
/// never used anywhere, but won't chase the chains a removal can expose
/// (that's what [`tdce`] is for).
pub fn tdce_once(func: &mut Function) {
    global_dead_def_pass(&mut func.instrs);
    trace!(function = %func.name, "single tdce pass complete");
}

/// Runs TDCE to a fixed point: alternates a whole-function global dead-def
/// pass with a per-block local dead-store pass, since either one can expose
/// new opportunities for the other, until neither removes anything. This is
/// the CLI's `tdce+`.
pub fn tdce(func: &mut Function) {
    loop {
        let removed_global = global_dead_def_pass(&mut func.instrs);
        let removed_local = local_dead_store_pass(&func.name, &mut func.instrs);
        if !removed_global && !removed_local {
            break;
        }
    }
    trace!(function = %func.name, "tdce converged");
}

/// Drops any instruction with a `dest` that is never read as an `args`
/// entry anywhere in the function, iterated to a fixed point (removing one
/// dead def can make another instruction's def dead too). Returns whether
/// anything was removed.
fn global_dead_def_pass(instrs: &mut Vec<Instr>) -> bool {
    let mut any_removed = false;
    loop {
        let used: rustc_hash::FxHashSet<&str> = instrs
            .iter()
            .flat_map(|i| i.args.iter().map(String::as_str))
            .collect();

        let before = instrs.len();
        instrs.retain(|i| i.dest.as_deref().is_none_or(|d| used.contains(d)));
        if instrs.len() == before {
            break;
        }
        any_removed = true;
    }
    any_removed
}

/// Per block, walks forward tracking the most recent dead-candidate
/// instruction for each variable; a later redefinition before any
/// intervening use marks the earlier one dead. Runs over every
/// block of the function's current CFG and writes the result back.
fn local_dead_store_pass(function: &str, instrs: &mut Vec<Instr>) -> bool {
    let Ok(mut cfg) = Cfg::new(function, instrs) else {
        return false;
    };

    let mut any_removed = false;
    for name in cfg.block_names().to_vec() {
        let Some(body) = cfg.block(&name) else { continue };
        let (rewritten, removed) = local_dead_store_block(body);
        if removed {
            any_removed = true;
            if let Some(slot) = cfg.block_mut(&name) {
                *slot = rewritten;
            }
        }
    }

    if any_removed {
        *instrs = cfg.flatten();
    }
    any_removed
}

fn local_dead_store_block(body: &[Instr]) -> (Vec<Instr>, bool) {
    let mut unused: FxHashMap<String, usize> = FxHashMap::default();
    let mut dead: rustc_hash::FxHashSet<usize> = rustc_hash::FxHashSet::default();

    for (idx, instr) in body.iter().enumerate() {
        for arg in &instr.args {
            unused.remove(arg);
        }
        if let Some(dest) = &instr.dest {
            if let Some(&prior_idx) = unused.get(dest) {
                dead.insert(prior_idx);
            }
            unused.insert(dest.clone(), idx);
        }
    }

    if dead.is_empty() {
        return (body.to_vec(), false);
    }
    let rewritten = body
        .iter()
        .enumerate()
        .filter(|(idx, _)| !dead.contains(idx))
        .map(|(_, i)| i.clone())
        .collect();
    (rewritten, true)
}
