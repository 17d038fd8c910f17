//! Reaching-definitions, live-variables, and constant-propagation, each
//! instantiated on top of the generic [`DataflowSolver`](crate::DataflowSolver)
//!.

use std::collections::BTreeMap;

use flow_cfg::Cfg;
use flow_ir::{Instr, Literal, Op};
use rustc_hash::FxHashSet as Set;

use crate::dataflow::{DataflowResult, DataflowSolver, Direction};

fn set_union(values: &[Set<String>]) -> Set<String> {
    let mut out = Set::default();
    for v in values {
        out.extend(v.iter().cloned());
    }
    out
}

/// `transfer(B, IN) = defs(B) ∪ (IN ∖ kills(B))`, `defs = kills = {dest}`,
/// merge = union, forward.
#[must_use]
pub fn reaching_definitions(cfg: &Cfg) -> DataflowResult<Set<String>> {
    let transfer = |body: &[Instr], in_: Set<String>| {
        let mut out = in_;
        for instr in body {
            if let Some(dest) = &instr.dest {
                out.remove(dest);
                out.insert(dest.clone());
            }
        }
        out
    };
    DataflowSolver::new(cfg, Direction::Forward, Set::default(), transfer, set_union).solve()
}

/// `transfer(B, OUT) = uses(B) ∪ (OUT ∖ kills(B))`, scanning the block in
/// reverse so a use after a def within the block does not count, merge =
/// union, backward.
#[must_use]
pub fn live_variables(cfg: &Cfg) -> DataflowResult<Set<String>> {
    let transfer = |body: &[Instr], out: Set<String>| {
        let mut live = out;
        for instr in body.iter().rev() {
            if let Some(dest) = &instr.dest {
                live.remove(dest);
            }
            for arg in &instr.args {
                live.insert(arg.clone());
            }
        }
        live
    };
    DataflowSolver::new(cfg, Direction::Backward, Set::default(), transfer, set_union).solve()
}

/// A constant-propagation lattice value: either a known literal or
/// [`ConstValue::Unknown`]. Kept distinct from `Option<Literal>` so the
/// lattice's bottom/top distinction is explicit at call sites.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstValue {
    Known(Literal),
    Unknown,
}

impl ConstValue {
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, ConstValue::Known(_))
    }
}

/// `variable -> ConstValue`, ordered so `df cprop` output is deterministic
/// without an extra sort at the CLI layer.
pub type ConstMap = BTreeMap<String, ConstValue>;

/// Attempts to fold `instr` given the constants known so far in this block
///.
///
/// Returns `None` when the instruction cannot be folded (non-foldable op,
/// unknown operand, or an explicitly-skipped case like `div` by zero);
/// `Some(value)` otherwise.
///
/// # Panics
///
/// Panics if `instr.op` reports [`Op::is_foldable`] but isn't one of the
/// operators handled below — an internal-invariant violation, since the
/// foldable set is closed and known at compile time.
#[must_use]
pub fn fold(instr: &Instr, known: &ConstMap) -> Option<Literal> {
    let op = instr.op.as_ref()?;
    if !op.is_foldable() {
        return None;
    }

    let lookup = |arg: &str| -> ConstValue {
        known
            .get(arg)
            .cloned()
            .unwrap_or(ConstValue::Unknown)
    };

    match op {
        Op::Eq | Op::Le | Op::Ge if instr.args.len() == 2 && instr.args[0] == instr.args[1] => {
            Some(Literal::Bool(true))
        }
        Op::Lt | Op::Gt if instr.args.len() == 2 && instr.args[0] == instr.args[1] => {
            Some(Literal::Bool(false))
        }
        Op::And if instr.args.iter().any(|a| lookup(a) == ConstValue::Known(Literal::Bool(false))) => {
            Some(Literal::Bool(false))
        }
        Op::Or if instr.args.iter().any(|a| lookup(a) == ConstValue::Known(Literal::Bool(true))) => {
            Some(Literal::Bool(true))
        }
        _ => {
            let values: Vec<Literal> = instr
                .args
                .iter()
                .map(|a| match lookup(a) {
                    ConstValue::Known(v) => Some(v),
                    ConstValue::Unknown => None,
                })
                .collect::<Option<_>>()?;
            eval(op, &values)
        }
    }
}

/// Integer floor division, matching Python's `//` rather than Rust's
/// truncating `/`: rounds toward negative infinity, so `-7 / -2` is `3`,
/// not `4`. Caller must exclude `b == 0` and the `i64::MIN / -1` overflow.
fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn eval(op: &Op, values: &[Literal]) -> Option<Literal> {
    match op {
        Op::Add => Some(Literal::Int(values[0].as_int()? + values[1].as_int()?)),
        Op::Sub => Some(Literal::Int(values[0].as_int()? - values[1].as_int()?)),
        Op::Mul => Some(Literal::Int(values[0].as_int()? * values[1].as_int()?)),
        Op::Div => {
            let dividend = values[0].as_int()?;
            let divisor = values[1].as_int()?;
            if divisor == 0 || (divisor == -1 && dividend == i64::MIN) {
                return None;
            }
            Some(Literal::Int(floor_div(dividend, divisor)))
        }
        Op::Eq => Some(Literal::Bool(values[0] == values[1])),
        Op::Lt => Some(Literal::Bool(values[0].as_int()? < values[1].as_int()?)),
        Op::Gt => Some(Literal::Bool(values[0].as_int()? > values[1].as_int()?)),
        Op::Le => Some(Literal::Bool(values[0].as_int()? <= values[1].as_int()?)),
        Op::Ge => Some(Literal::Bool(values[0].as_int()? >= values[1].as_int()?)),
        Op::Not => Some(Literal::Bool(!values[0].as_bool()?)),
        Op::And => Some(Literal::Bool(values[0].as_bool()? && values[1].as_bool()?)),
        Op::Or => Some(Literal::Bool(values[0].as_bool()? || values[1].as_bool()?)),
        other => panic!("internal error: unhandled foldable operator `{other}`"),
    }
}

/// Computes a block's `out` constant map given its `in` map. Shared
/// by the standalone `cprop` dataflow instantiation and by LVN's optional
/// constant-folding step.
#[must_use]
pub fn cprop_out(body: &[Instr], in_: &ConstMap) -> ConstMap {
    let mut known = in_.clone();
    for instr in body {
        let Some(dest) = &instr.dest else { continue };
        let Some(op) = &instr.op else { continue };

        let value = match op {
            Op::Const => instr.value,
            Op::Id => instr
                .args
                .first()
                .and_then(|a| known.get(a))
                .and_then(|v| match v {
                    ConstValue::Known(lit) => Some(*lit),
                    ConstValue::Unknown => None,
                }),
            _ => fold(instr, &known),
        };
        match value {
            Some(lit) => known.insert(dest.clone(), ConstValue::Known(lit)),
            None => known.insert(dest.clone(), ConstValue::Unknown),
        };
    }
    known
}

fn cprop_merge(values: &[ConstMap]) -> ConstMap {
    let mut out = ConstMap::new();
    for map in values {
        for (k, v) in map {
            out.entry(k.clone())
                .and_modify(|existing| {
                    if existing != v {
                        *existing = ConstValue::Unknown;
                    }
                })
                .or_insert_with(|| v.clone());
        }
    }
    out
}

/// Forward constant-propagation dataflow. Function arguments are
/// `Unknown` at entry: they are simply absent from `init`, and `cprop_out`
/// only ever narrows a present key to `Unknown`, never invents one, so a
/// missing key and an explicit `Unknown` are observationally identical for
/// every consumer in this crate.
#[must_use]
pub fn constant_propagation(cfg: &Cfg) -> DataflowResult<ConstMap> {
    let transfer = |body: &[Instr], in_: ConstMap| cprop_out(body, &in_);
    DataflowSolver::new(cfg, Direction::Forward, ConstMap::new(), transfer, cprop_merge).solve()
}
