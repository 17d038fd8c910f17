//! Property tests for block formation and CFG construction, run over
//! randomly generated small well-formed instruction streams rather than
//! fixed fixtures.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#![expect(clippy::expect_used, reason = "Tests use expect for clarity")]

use flow_cfg::{form_blocks, name_blocks, Cfg};
use flow_ir::{Instr, Literal};
use proptest::prelude::*;
use rustc_hash::FxHashSet;

/// Builds a chain of `depth` diamonds: each branches on a fresh bool
/// constant, assigns `x` to a different int constant on either arm, joins,
/// and (for all but the last diamond) uses the joined `x` to seed the next
/// branch. Every label is introduced before it is ever targeted, so the
/// resulting stream is well-formed by construction.
fn diamond_chain_strategy(depth: usize) -> impl Strategy<Value = Vec<Instr>> {
    (
        prop::collection::vec(any::<bool>(), depth),
        prop::collection::vec(-100i64..100, depth),
        prop::collection::vec(-100i64..100, depth),
    )
        .prop_map(move |(conds, true_vals, false_vals)| {
            let mut instrs = vec![Instr::label("entry")];
            for i in 0..depth {
                let cond = format!("cond{i}");
                let t = format!("t{i}");
                let f = format!("f{i}");
                let j = format!("j{i}");
                instrs.push(Instr::constant(&cond, "bool", Literal::Bool(conds[i])));
                instrs.push(Instr::br(cond, t.clone(), f.clone()));
                instrs.push(Instr::label(t));
                instrs.push(Instr::constant("x", "int", Literal::Int(true_vals[i])));
                instrs.push(Instr::jmp(j.clone()));
                instrs.push(Instr::label(f));
                instrs.push(Instr::constant("x", "int", Literal::Int(false_vals[i])));
                instrs.push(Instr::jmp(j.clone()));
                instrs.push(Instr::label(j));
            }
            instrs.push(Instr::ret(Some("x".to_string())));
            instrs
        })
}

fn cfg_from_chain(depth: usize) -> impl Strategy<Value = Cfg> {
    diamond_chain_strategy(depth).prop_map(|raw| {
        let blocks = form_blocks(&raw);
        let named = name_blocks(blocks);
        let flat: Vec<Instr> = named.into_iter().flat_map(|(_, body)| body).collect();
        Cfg::new("f", &flat).expect("diamond chain is well-formed by construction")
    })
}

fn any_diamond_chain_cfg() -> impl Strategy<Value = Cfg> {
    (1usize..4).prop_flat_map(cfg_from_chain)
}

proptest! {
    /// Every block a formed-and-named instruction stream produces ends in
    /// exactly one terminator, and that terminator is its last instruction.
    #[test]
    fn every_block_ends_in_a_terminator(cfg in any_diamond_chain_cfg()) {
        for name in cfg.block_names() {
            let body = cfg.block(name).expect("named block exists");
            prop_assert!(!body.is_empty(), "block {name} must not be empty");
            prop_assert!(body.last().expect("non-empty").is_terminator(), "block {name} must end in a terminator");
            prop_assert!(
                body[..body.len() - 1].iter().all(|i| !i.is_terminator()),
                "block {name} must not contain an internal terminator"
            );
        }
    }

    /// `successors_of`/`predecessors_of` always agree with each other: `B`
    /// is a predecessor of `S` exactly when `S` is a successor of `B`.
    #[test]
    fn successor_and_predecessor_edges_are_symmetric(cfg in any_diamond_chain_cfg()) {
        for name in cfg.block_names() {
            for succ in cfg.successors_of(name) {
                prop_assert!(
                    cfg.predecessors_of(succ).iter().any(|p| p == name),
                    "{name} -> {succ} has no matching predecessor edge"
                );
            }
            for pred in cfg.predecessors_of(name) {
                prop_assert!(
                    cfg.successors_of(pred).iter().any(|s| s == name),
                    "{pred} -> {name} has no matching successor edge"
                );
            }
        }
    }

    /// Flattening a CFG and rebuilding one from the flattened stream
    /// reproduces the same block names, in the same order, with the same
    /// edges: `flatten` is a faithful inverse of `Cfg::new`.
    #[test]
    fn flatten_round_trips_through_cfg_new(cfg in any_diamond_chain_cfg()) {
        let flat = cfg.flatten();
        let rebuilt = Cfg::new(cfg.function_name(), &flat).expect("flattened output is well-formed");
        prop_assert_eq!(cfg.block_names(), rebuilt.block_names());
        for name in cfg.block_names() {
            prop_assert_eq!(
                cfg.successors_of(name).to_vec(),
                rebuilt.successors_of(name).to_vec(),
                "successors of {name} changed across a flatten round-trip"
            );
        }
    }

    /// A block that jumps back to the function's first block forces a
    /// synthetic entry to be canonicalized in; once inserted, the entry
    /// block the CFG reports always has zero predecessors.
    #[test]
    fn synthetic_entry_has_no_predecessors(target_true in -50i64..50, target_false in -50i64..50) {
        let instrs = vec![
            Instr::label("loop"),
            Instr::constant("cond", "bool", Literal::Bool(true)),
            Instr::br("cond", "body", "exit"),
            Instr::label("body"),
            Instr::constant("x", "int", Literal::Int(target_true)),
            Instr::jmp("loop"),
            Instr::label("exit"),
            Instr::constant("y", "int", Literal::Int(target_false)),
            Instr::ret(Some("y".to_string())),
        ];
        let cfg = Cfg::new("f", &instrs).expect("well-formed by construction");
        prop_assert!(cfg.predecessors_of(cfg.entry()).is_empty());
    }

    /// Every block name a CFG reports is distinct: `block_names` never
    /// contains a duplicate even when the source program repeats a label.
    #[test]
    fn block_names_are_unique(cfg in any_diamond_chain_cfg()) {
        let seen: FxHashSet<&String> = cfg.block_names().iter().collect();
        prop_assert_eq!(seen.len(), cfg.block_names().len());
    }
}
