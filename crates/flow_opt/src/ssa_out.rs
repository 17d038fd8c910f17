//! SSA destruction: φ-nodes are replaced by copies inserted on each
//! incoming edge, with swap-cycles resolved through a temporary rather than
//! dropped.
//!
//! A naive translation would detect swap-cycles among the synthesized
//! copies and discard every copy in a cycle outright — correct for simple
//! 2-cycles but silently drops definitions for longer ones. This module
//! instead sequentializes each edge's parallel copies properly, breaking
//! any cycle by relocating the value about to be clobbered into a fresh
//! temporary first, which is the standard out-of-SSA translation technique
//! and loses nothing.

use flow_cfg::Cfg;
use flow_ir::{Function, Instr, Ty};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

/// Destroys SSA form in `func` in place.
pub fn out_of_ssa(func: &mut Function) {
    #[expect(clippy::expect_used, reason = "Invariant: func.instrs was already built into a Cfg upstream")]
    let mut cfg = Cfg::new(&func.name, &func.instrs).expect("CFG already validated upstream");

    // (predecessor, block) -> copies to synthesize on that edge.
    let mut edges: FxHashMap<(String, String), Vec<(String, Ty, String)>> = FxHashMap::default();

    for name in cfg.block_names().to_vec() {
        let Some(body) = cfg.block(&name) else { continue };
        for instr in body {
            if !instr.is_phi() {
                continue;
            }
            #[expect(clippy::expect_used, reason = "Invariant: is_phi() only matches instructions with a dest")]
            let dest = instr.dest.clone().expect("phi always has a dest");
            let ty = instr.ty.clone().unwrap_or_default();
            for (label, arg) in instr.labels.iter().zip(instr.args.iter()) {
                if arg.ends_with(".undef") {
                    continue;
                }
                edges
                    .entry((label.clone(), name.clone()))
                    .or_default()
                    .push((dest.clone(), ty.clone(), arg.clone()));
            }
        }
    }

    for name in cfg.block_names().to_vec() {
        if let Some(body) = cfg.block_mut(&name) {
            body.retain(|i| !i.is_phi());
        }
    }

    for ((pred, succ), copies) in edges {
        if copies.is_empty() {
            continue;
        }
        let mut body = sequentialize(copies);
        body.push(Instr::jmp(succ.clone()));
        cfg.insert_between(&pred, &succ, body);
    }

    func.instrs = cfg.flatten();
    trace!(function = %func.name, "destroyed SSA form");
}

/// Sequentializes a set of parallel copies (`dest := src`, all `dest`s
/// distinct) into an ordered list of plain `id` instructions that has the
/// same effect as if every copy read its source simultaneously.
///
/// Tracks, for each variable, how many not-yet-emitted copies still need
/// its *original* value (`remaining_uses`) and where that original value
/// currently lives (`loc`, defaulting to the variable itself). A copy is
/// safe to emit once nothing still needs its destination's original
/// content; when every remaining copy is mutually blocking (a cycle),
/// relocating one variable's value to a fresh temporary before overwriting
/// it breaks the deadlock without losing any value.
fn sequentialize(copies: Vec<(String, Ty, String)>) -> Vec<Instr> {
    let mut pred: FxHashMap<String, (Ty, String)> = FxHashMap::default();
    for (dest, ty, src) in copies {
        if dest != src {
            pred.insert(dest, (ty, src));
        }
    }
    if pred.is_empty() {
        return Vec::new();
    }

    let mut remaining_uses: FxHashMap<String, usize> = FxHashMap::default();
    for (_, src) in pred.values() {
        *remaining_uses.entry(src.clone()).or_insert(0) += 1;
    }

    let mut todo: FxHashSet<String> = pred.keys().cloned().collect();
    let mut loc: FxHashMap<String, String> = FxHashMap::default();
    let mut ready: Vec<String> = todo
        .iter()
        .filter(|d| remaining_uses.get(d.as_str()).copied().unwrap_or(0) == 0)
        .cloned()
        .collect();

    let mut out = Vec::new();
    let mut temp_counter = 0usize;

    while !todo.is_empty() {
        while let Some(dest) = ready.pop() {
            if !todo.remove(&dest) {
                continue;
            }
            let (ty, src) = pred[&dest].clone();
            let cur_src = loc.get(&src).cloned().unwrap_or_else(|| src.clone());
            out.push(Instr::id(dest, Some(ty), cur_src));

            if let Some(u) = remaining_uses.get_mut(&src) {
                *u = u.saturating_sub(1);
            }
            if todo.contains(&src) && remaining_uses.get(&src).copied().unwrap_or(0) == 0 {
                ready.push(src);
            }
        }

        let Some(dest) = todo.iter().next().cloned() else {
            break;
        };
        let ty = pred[&dest].0.clone();
        let tmp = format!("{dest}.ssa_tmp.{temp_counter}");
        temp_counter += 1;
        let cur = loc.get(&dest).cloned().unwrap_or_else(|| dest.clone());
        out.push(Instr::id(tmp.clone(), Some(ty), cur));
        loc.insert(dest.clone(), tmp);
        remaining_uses.insert(dest.clone(), 0);
        ready.push(dest);
    }
    out
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#[expect(clippy::expect_used, reason = "Tests use expect for clarity")]
mod tests {
    use super::*;
    use flow_ir::{Literal, Op};

    fn contains_copy(instrs: &[Instr], dest: &str, src: &str) -> bool {
        instrs
            .iter()
            .any(|i| i.op == Some(Op::Id) && i.dest.as_deref() == Some(dest) && i.args == vec![src.to_string()])
    }

    /// A φ at the join of a diamond becomes two `id` copies on
    /// synthesized `b.<pred>.<join>` edge blocks.
    #[test]
    fn phi_becomes_edge_copies() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::br("cond", "a", "b"),
            Instr::label("a"),
            Instr::constant("v1", "int", Literal::Int(1)),
            Instr::jmp("join"),
            Instr::label("b"),
            Instr::constant("v2", "int", Literal::Int(2)),
            Instr::jmp("join"),
            Instr::label("join"),
            Instr {
                op: Some(Op::Phi),
                dest: Some("x".to_string()),
                ty: Some("int".to_string()),
                args: vec!["v1".to_string(), "v2".to_string()],
                labels: vec!["a".to_string(), "b".to_string()],
                ..Default::default()
            },
            Instr::ret(None),
        ];
        let mut func = Function::new("f", vec![], instrs);
        out_of_ssa(&mut func);

        let cfg = Cfg::new(&func.name, &func.instrs).unwrap();
        assert!(cfg.block("b.a.join").is_some());
        assert!(cfg.block("b.b.join").is_some());
        assert!(contains_copy(cfg.block("b.a.join").unwrap(), "x", "v1"));
        assert!(contains_copy(cfg.block("b.b.join").unwrap(), "x", "v2"));
        assert!(cfg.block("join").unwrap().iter().all(|i| !i.is_phi()));
    }

    #[test]
    fn undef_sources_are_skipped() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::br("cond", "a", "b"),
            Instr::label("a"),
            Instr::jmp("join"),
            Instr::label("b"),
            Instr::constant("v2", "int", Literal::Int(2)),
            Instr::jmp("join"),
            Instr::label("join"),
            Instr {
                op: Some(Op::Phi),
                dest: Some("x".to_string()),
                ty: Some("int".to_string()),
                args: vec!["x.undef".to_string(), "v2".to_string()],
                labels: vec!["a".to_string(), "b".to_string()],
                ..Default::default()
            },
            Instr::ret(None),
        ];
        let mut func = Function::new("f", vec![], instrs);
        out_of_ssa(&mut func);
        let cfg = Cfg::new(&func.name, &func.instrs).unwrap();
        assert!(cfg.block("b.a.join").is_none());
        assert!(cfg.block("b.b.join").is_some());
    }

    #[test]
    fn swap_cycle_is_resolved_with_a_temporary_not_dropped() {
        let copies = vec![
            ("a".to_string(), "int".to_string(), "b".to_string()),
            ("b".to_string(), "int".to_string(), "a".to_string()),
        ];
        let seq = sequentialize(copies);
        // Both original copies must be represented (possibly via a temp),
        // never silently dropped.
        assert!(seq.iter().any(|i| i.dest.as_deref() == Some("a")));
        assert!(seq.iter().any(|i| i.dest.as_deref() == Some("b")));
        assert!(seq.len() >= 3, "a 2-cycle needs at least a temp + two copies");
    }

    #[test]
    fn non_cyclic_copies_pass_through_unchanged() {
        let copies = vec![
            ("x".to_string(), "int".to_string(), "p".to_string()),
            ("y".to_string(), "int".to_string(), "q".to_string()),
        ];
        let seq = sequentialize(copies);
        assert_eq!(seq.len(), 2);
        assert!(contains_copy(&seq, "x", "p"));
        assert!(contains_copy(&seq, "y", "q"));
    }

    #[test]
    fn tail_feeding_into_a_cycle_reads_the_pre_swap_value() {
        // c := a ; a := b ; b := a  (a <-> b swap, c depends on original a)
        let copies = vec![
            ("c".to_string(), "int".to_string(), "a".to_string()),
            ("a".to_string(), "int".to_string(), "b".to_string()),
            ("b".to_string(), "int".to_string(), "a".to_string()),
        ];
        let seq = sequentialize(copies);
        // `c` must read a value that traces back to the original `a`,
        // either directly or through whatever temporary preserved it.
        let c_copy = seq.iter().find(|i| i.dest.as_deref() == Some("c")).unwrap();
        assert_eq!(c_copy.args, vec!["a".to_string()]);
        // `c`'s copy must be emitted before `a` is overwritten.
        let c_index = seq.iter().position(|i| i.dest.as_deref() == Some("c")).unwrap();
        let a_overwrite_index = seq
            .iter()
            .position(|i| i.dest.as_deref() == Some("a") && i.args != vec!["a".to_string()])
            .unwrap();
        assert!(c_index < a_overwrite_index);
    }
}
