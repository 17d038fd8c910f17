//! SSA construction: dominance-frontier-based φ placement followed by
//! dominator-tree-guided renaming.

use std::collections::VecDeque;

use flow_analysis::{dominance_frontier, dominator_tree, dominators, immediate_dominators};
use flow_cfg::Cfg;
use flow_ir::{Function, Instr, Op, Ty};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Converts `func` into SSA form in place. Unreachable blocks are
/// dropped first: dominance is only sound over the reachable subgraph,
/// and SSA renaming walks the dominator tree, so an unreachable
/// block would have no dominator-tree position to visit from.
pub fn into_ssa(func: &mut Function) {
    #[expect(clippy::expect_used, reason = "Invariant: func.instrs was already built into a Cfg upstream")]
    let mut cfg = Cfg::new(&func.name, &func.instrs).expect("CFG already validated upstream");
    cfg.remove_unreachable_blocks();

    let mut defsites = defsites(&cfg);
    let orig = def_origins(&cfg);

    for arg in &func.args {
        defsites
            .entry(arg.name.clone())
            .or_default()
            .insert(cfg.entry().to_string());
    }

    let dom = dominators(&cfg);
    let df = dominance_frontier(&cfg, &dom);

    let arg_types: FxHashMap<String, Ty> =
        func.args.iter().map(|a| (a.name.clone(), a.ty.clone())).collect();
    place_phis(&mut cfg, &defsites, &orig, &df, &arg_types);

    let idom = immediate_dominators(&cfg, &dom);
    let tree = dominator_tree(&cfg, &idom);
    rename(&mut cfg, &tree, &func.args);

    func.instrs = cfg.flatten();
    trace!(function = %func.name, "converted to SSA form");
}

/// `defsites[v]` = the set of blocks that define `v`.
fn defsites(cfg: &Cfg) -> FxHashMap<String, FxHashSet<String>> {
    let mut map: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
    for (name, body) in cfg.blocks() {
        for instr in body {
            if let Some(dest) = &instr.dest {
                map.entry(dest.clone()).or_default().insert(name.to_string());
            }
        }
    }
    map
}

/// `orig[B]` = the set of variables originally defined in block B, used to tell a genuinely-new φ site from a block that already
/// had its own definition of `v`.
fn def_origins(cfg: &Cfg) -> FxHashMap<String, FxHashSet<String>> {
    let mut map: FxHashMap<String, FxHashSet<String>> = cfg
        .block_names()
        .iter()
        .map(|n| (n.clone(), FxHashSet::default()))
        .collect();
    for (name, body) in cfg.blocks() {
        for instr in body {
            if let Some(dest) = &instr.dest {
                #[expect(clippy::expect_used, reason = "Invariant: map was seeded with every block name above")]
                map.get_mut(name).expect("every block name is a key").insert(dest.clone());
            }
        }
    }
    map
}

fn type_of(var: &str, def_block: &[Instr]) -> Option<Ty> {
    def_block
        .iter()
        .find(|i| i.dest.as_deref() == Some(var))
        .and_then(|i| i.ty.clone())
}

/// Inserts φ-nodes by the standard worklist-over-dominance-frontiers
/// algorithm: for each variable, every dominance-frontier
/// block of one of its defining blocks gets a φ, which is itself a new
/// definition that may require further φs further out.
fn place_phis(
    cfg: &mut Cfg,
    defsites: &FxHashMap<String, FxHashSet<String>>,
    orig: &FxHashMap<String, FxHashSet<String>>,
    df: &FxHashMap<String, FxHashSet<String>>,
    arg_types: &FxHashMap<String, Ty>,
) {
    let mut orig = orig.clone();
    let mut has_phi: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();

    for (var, sites) in defsites {
        let mut worklist: VecDeque<String> = sites.iter().cloned().collect();
        let mut queued: FxHashSet<String> = worklist.iter().cloned().collect();

        while let Some(d) = worklist.pop_front() {
            queued.remove(&d);
            let Some(frontier) = df.get(&d) else { continue };
            for f in frontier.clone() {
                if has_phi.entry(f.clone()).or_default().contains(var) {
                    continue;
                }
                let preds = cfg.predecessors_of(&f).to_vec();
                let ty = defsites
                    .get(var)
                    .into_iter()
                    .flatten()
                    .find_map(|block| cfg.block(block).and_then(|b| type_of(var, b)))
                    .or_else(|| arg_types.get(var).cloned());
                let phi = Instr {
                    op: Some(Op::Phi),
                    dest: Some(var.clone()),
                    ty,
                    args: vec![var.clone(); preds.len()],
                    labels: preds,
                    ..Default::default()
                };
                if let Some(body) = cfg.block_mut(&f) {
                    body.insert(0, phi);
                }
                has_phi.entry(f.clone()).or_default().insert(var.clone());

                let f_orig = orig.entry(f.clone()).or_default();
                if !f_orig.contains(var) {
                    if queued.insert(f.clone()) {
                        worklist.push_back(f.clone());
                    }
                }
            }
        }
    }
}

/// Dominator-tree-guided renaming: one stack per original
/// variable name, seeded for function arguments with their own name so the
/// first dominator-tree-preorder use of an argument resolves to itself.
fn rename(cfg: &mut Cfg, tree: &FxHashMap<String, Vec<String>>, args: &[flow_ir::Arg]) {
    let mut stack: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut counter: FxHashMap<String, usize> = FxHashMap::default();
    for arg in args {
        stack.entry(arg.name.clone()).or_default().push(arg.name.clone());
    }

    rename_block(cfg, tree, cfg.entry().to_string(), &mut stack, &mut counter);
}

fn old_name(var: &str) -> &str {
    var.rsplit_once('.').map_or(var, |(base, _)| base)
}

fn rename_block(
    cfg: &mut Cfg,
    tree: &FxHashMap<String, Vec<String>>,
    block: String,
    stack: &mut FxHashMap<String, Vec<String>>,
    counter: &mut FxHashMap<String, usize>,
) {
    let mut pushed: FxHashMap<String, usize> = FxHashMap::default();

    if let Some(body) = cfg.block_mut(&block) {
        for instr in body.iter_mut() {
            if !instr.is_phi() {
                for arg in &mut instr.args {
                    if let Some(top) = stack.get(old_name(arg)).and_then(|s| s.last()) {
                        *arg = top.clone();
                    }
                }
            }
            if let Some(dest) = instr.dest.clone() {
                let n = counter.entry(dest.clone()).or_insert(0);
                let fresh = format!("{dest}.{n}");
                *n += 1;
                stack.entry(dest.clone()).or_default().push(fresh.clone());
                *pushed.entry(dest).or_insert(0) += 1;
                instr.dest = Some(fresh);
            }
        }
    }

    for succ in cfg.successors_of(&block).to_vec() {
        if let Some(body) = cfg.block_mut(&succ) {
            for phi in body.iter_mut() {
                if !phi.is_phi() {
                    continue;
                }
                for (label, arg) in phi.labels.clone().iter().zip(phi.args.iter_mut()) {
                    if label == &block {
                        let original = old_name(arg).to_string();
                        *arg = stack
                            .get(&original)
                            .and_then(|s| s.last())
                            .cloned()
                            .unwrap_or_else(|| format!("{arg}.undef"));
                    }
                }
            }
        }
    }

    for child in tree.get(&block).cloned().unwrap_or_default() {
        rename_block(cfg, tree, child, stack, counter);
    }

    for (var, count) in pushed {
        if let Some(s) = stack.get_mut(&var) {
            for _ in 0..count {
                s.pop();
            }
        }
    }
}
