//! Local Value Numbering: per-block redundancy elimination with optional
//! constant folding and reassignment-aware renaming.

use flow_analysis::{cprop_out, fold, ConstMap, ConstValue};
use flow_cfg::Cfg;
use flow_ir::{Instr, Literal, Op, Ty};
use rustc_hash::FxHashMap;
use tracing::trace;

/// A value key: an operator together with the row numbers of its operand's
/// defining entries (or the raw variable name when the operand is defined
/// outside the block). `const` carries its literal and type directly,
/// since a bare row-number key would conflate the operator `const` across
/// unrelated literals.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum ValueKey {
    Const(Literal, Ty),
    Op(String, Vec<Operand>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Operand {
    Row(usize),
    External(String),
}

impl Operand {
    fn sort_key(&self) -> String {
        match self {
            Operand::Row(n) => n.to_string(),
            Operand::External(s) => s.clone(),
        }
    }
}

/// One block's value table: insertion-ordered `var -> row` and `row ->
/// canonical variable` maps, plus the `value -> canonical variable` lookup
///. `FxHashMap` does not preserve insertion order by itself;
/// this table never iterates its maps, only looks values up by key, so
/// order doesn't need to be tracked here — the instruction stream itself
/// carries the order LVN must respect.
#[derive(Default)]
struct ValueTable {
    val2var: FxHashMap<ValueKey, String>,
    var2row: FxHashMap<String, usize>,
    row2var: FxHashMap<usize, String>,
    next_row: usize,
}

impl ValueTable {
    fn value_key(&self, op: &Op, funcs: &[String], args: &[String]) -> ValueKey {
        let mut op_name = op.as_str().to_string();
        if op == &Op::Call {
            if let Some(callee) = funcs.first() {
                op_name.push_str(callee);
            }
        }
        let mut operands: Vec<Operand> = args
            .iter()
            .map(|a| match self.var2row.get(a) {
                Some(row) => Operand::Row(*row),
                None => Operand::External(a.clone()),
            })
            .collect();
        if op.is_commutative() {
            operands.sort_by_key(Operand::sort_key);
        }
        ValueKey::Op(op_name, operands)
    }

    fn canonical_args(&self, args: &[String]) -> Vec<String> {
        args.iter()
            .map(|a| match self.var2row.get(a) {
                Some(row) => self.row2var[row].clone(),
                None => a.clone(),
            })
            .collect()
    }
}

/// Runs LVN over every block of `cfg`, in place. When `cprop` is set,
/// attempts to fold each instruction against the constants known so far in
/// the block before value-numbering it; constants are seeded
/// from the block's `cprop` `in` set so folding sees cross-block constants
/// too.
pub fn local_value_numbering(cfg: &mut Cfg, cprop: bool) {
    let cprop_ins = if cprop {
        Some(flow_analysis::constant_propagation(cfg).ins)
    } else {
        None
    };

    let names = cfg.block_names().to_vec();
    for name in names {
        let mut known: ConstMap = cprop_ins
            .as_ref()
            .and_then(|ins| ins.get(&name))
            .cloned()
            .unwrap_or_default();
        let Some(body) = cfg.block(&name) else { continue };
        let rewritten = run_block(body, cprop, &mut known);
        if let Some(slot) = cfg.block_mut(&name) {
            *slot = rewritten;
        }
    }
    trace!(function = %cfg.function_name(), "local value numbering complete");
}

fn run_block(body: &[Instr], cprop: bool, known: &mut ConstMap) -> Vec<Instr> {
    // A mutable working copy: renaming a reassigned `dest` must rewrite the
    // not-yet-processed instructions that reference it under the old name,
    // so the whole block is edited in place rather than built incrementally
    // from an immutable slice.
    let mut work: Vec<Instr> = body.to_vec();
    let mut table = ValueTable::default();
    let mut lvn_number = 0usize;

    let mut i = 0;
    while i < work.len() {
        if work[i].is_label() {
            i += 1;
            continue;
        }

        work[i].args = table.canonical_args(&work[i].args);

        let Some(dest) = work[i].dest.clone() else {
            i += 1;
            continue;
        };

        if cprop {
            if let Some(lit) = fold_or_lookup(&work[i], known) {
                work[i].op = Some(Op::Const);
                work[i].value = Some(lit);
                work[i].args.clear();
                work[i].funcs.clear();
            }
            *known = cprop_out(std::slice::from_ref(&work[i]), known);
        }

        #[expect(clippy::expect_used, reason = "Invariant: labels were skipped above via continue")]
        let op = work[i].op.clone().expect("non-label instruction has an op");

        // Synthetic row for an `id` of an externally-defined source, so
        // later `id`s of the same source copy-propagate.
        // Skipped if the source is reassigned later in this block: there
        // would be no way to retarget the synthetic row at that point.
        if op == Op::Id {
            if let Some(src) = work[i].args.first().cloned() {
                let reassigned_later = work[i..]
                    .iter()
                    .any(|later| later.dest.as_deref() == Some(src.as_str()));
                if !table.var2row.contains_key(&src) && !reassigned_later {
                    let row = table.next_row;
                    table.next_row += 1;
                    table
                        .val2var
                        .insert(ValueKey::Op("id".to_string(), vec![Operand::Row(row)]), src.clone());
                    table.var2row.insert(src.clone(), row);
                    table.row2var.insert(row, src);
                }
            }
        }

        #[expect(clippy::expect_used, reason = "Invariant: the wire codec rejects `const` without a value")]
        let key = if op == Op::Const {
            let ty = work[i].ty.clone().unwrap_or_default();
            ValueKey::Const(work[i].value.expect("const instruction carries a value"), ty)
        } else {
            table.value_key(&op, &work[i].funcs, &work[i].args)
        };

        if let Some(canonical) = table.val2var.get(&key).cloned() {
            if !op.has_side_effects() {
                let row = table.var2row[&canonical];
                if op != Op::Const {
                    work[i].op = Some(Op::Id);
                    work[i].args = vec![canonical.clone()];
                    work[i].funcs.clear();
                }
                table.var2row.insert(dest, row);
                i += 1;
                continue;
            }
        }

        // A new value. If `dest` is reassigned later in the block, rename
        // it — and every not-yet-processed reference to it up to and
        // including the reassignment — so the row stays addressable under
        // its first name once the name is reused.
        let final_dest = rename_if_reassigned(&mut work, i, &dest, &mut lvn_number);
        work[i].dest = Some(final_dest.clone());

        // Copy propagation: an `id` of an operand with an existing row
        // reuses that row rather than allocating a fresh one, and leaves
        // the row's canonical variable untouched — only a freshly
        // allocated row is stamped with this instruction's own dest — only
        // a genuinely new row gets that stamp, not when an `id` reuses one
        // that already exists.
        let existing_id_row = (op == Op::Id)
            .then(|| work[i].args.first().map_or("", String::as_str))
            .and_then(|arg| table.var2row.get(arg).copied());

        let row = match existing_id_row {
            Some(row) => row,
            None => {
                let row = table.next_row;
                table.next_row += 1;
                table.row2var.insert(row, final_dest.clone());
                row
            }
        };
        let canonical = table.row2var[&row].clone();
        table.val2var.insert(key, canonical);
        table.var2row.insert(final_dest, row);

        i += 1;
    }
    work
}

/// Attempts to fold given `known` constants, plus `id`-of-known-constant
/// propagation, matching the standalone `cprop` analysis's `out` step
/// exactly so LVN's optional folding and that analysis never disagree.
fn fold_or_lookup(instr: &Instr, known: &ConstMap) -> Option<Literal> {
    match instr.op {
        Some(Op::Id) => {
            let src = instr.args.first()?;
            match known.get(src) {
                Some(ConstValue::Known(lit)) => Some(*lit),
                _ => None,
            }
        }
        _ => fold(instr, known),
    }
}

/// If `dest` will be the destination of a later instruction in `work`,
/// renames it to `dest.<n>` and rewrites every argument reference between
/// here and that reassignment (inclusive — the reassignment instruction
/// itself may read the old value, e.g. `x = add x 1`), so the renamed
/// value stays addressable once the name is reused.
fn rename_if_reassigned(work: &mut [Instr], from: usize, dest: &str, lvn_number: &mut usize) -> String {
    let Some(reassign_at) = work[from + 1..]
        .iter()
        .position(|later| later.dest.as_deref() == Some(dest))
    else {
        return dest.to_string();
    };
    let new_name = format!("{dest}.{lvn_number}");
    *lvn_number += 1;

    for later in &mut work[from + 1..=from + 1 + reassign_at] {
        for arg in &mut later.args {
            if arg == dest {
                *arg = new_name.clone();
            }
        }
    }
    new_name
}
