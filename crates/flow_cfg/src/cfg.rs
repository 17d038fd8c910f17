use flow_ir::{Instr, Op};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::block_former::{form_blocks, name_blocks};
use crate::error::CfgError;

/// A control-flow graph built from one function's flat instruction stream.
///
/// `order` is the parallel ordering vector that keeps insertion order explicit:
/// `blocks`/`successors`/`predecessors` are plain hash maps keyed by block
/// name, and `order` is the single source of truth for "insertion order",
/// i.e. the order blocks appeared in the original IR (with any synthetic
/// entry block prepended).
#[derive(Clone, Debug)]
pub struct Cfg {
    function: String,
    order: Vec<String>,
    blocks: FxHashMap<String, Vec<Instr>>,
    successors: FxHashMap<String, Vec<String>>,
    predecessors: FxHashMap<String, Vec<String>>,
}

impl Cfg {
    /// Builds a CFG from a function's flat instruction stream: forms basic
    /// blocks, derives successor/predecessor relations from each block's
    /// terminator, then canonicalizes the entry block.
    ///
    /// # Errors
    ///
    /// Returns [`CfgError`] if a `br` or `jmp` terminator does not carry the
    /// label arity the wire format requires.
    pub fn new(function: impl Into<String>, instrs: &[Instr]) -> Result<Self, CfgError> {
        let function = function.into();
        let named = name_blocks(form_blocks(instrs));
        debug!(function = %function, blocks = named.len(), "formed basic blocks");

        let order: Vec<String> = named.iter().map(|(n, _)| n.clone()).collect();
        let blocks: FxHashMap<String, Vec<Instr>> = named.into_iter().collect();

        let mut successors: FxHashMap<String, Vec<String>> = FxHashMap::default();
        for (i, name) in order.iter().enumerate() {
            let body = &blocks[name];
            #[expect(clippy::expect_used, reason = "Invariant: name_blocks never emits an empty block")]
            let last = body
                .last()
                .expect("name_blocks guarantees every block is non-empty");
            let succs = match &last.op {
                Some(Op::Jmp) => {
                    if last.labels.len() != 1 {
                        return Err(CfgError::BadJumpArity {
                            function: function.clone(),
                            block: name.clone(),
                            found: last.labels.len(),
                        });
                    }
                    last.labels.clone()
                }
                Some(Op::Br) => {
                    if last.labels.len() != 2 {
                        return Err(CfgError::BadBranchArity {
                            function: function.clone(),
                            block: name.clone(),
                            found: last.labels.len(),
                        });
                    }
                    last.labels.clone()
                }
                Some(Op::Ret) => Vec::new(),
                _ => {
                    // Unreachable once add_terminators has run, but fall
                    // through to the textually-next block defensively.
                    if i + 1 == order.len() {
                        Vec::new()
                    } else {
                        vec![order[i + 1].clone()]
                    }
                }
            };
            successors.insert(name.clone(), succs);
        }

        let predecessors = invert(&order, &successors);

        let mut cfg = Cfg {
            function,
            order,
            blocks,
            successors,
            predecessors,
        };
        cfg.canonicalize_entry();
        Ok(cfg)
    }

    /// If the entry block has predecessors, prepends a synthetic entry
    /// block with a single `jmp` to the original entry, so algorithms that
    /// assume an unreachable-into entry (dominance chief among them) hold.
    ///
    /// The synthetic name is `entry.1`, or the first `entry.<k>` that
    /// doesn't collide with an existing block name.
    fn canonicalize_entry(&mut self) {
        let Some(original_entry) = self.order.first().cloned() else {
            return;
        };
        if self
            .predecessors
            .get(&original_entry)
            .is_none_or(Vec::is_empty)
        {
            return;
        }

        let mut k = 1usize;
        let mut synthetic = format!("entry.{k}");
        while self.blocks.contains_key(&synthetic) {
            k += 1;
            synthetic = format!("entry.{k}");
        }
        debug!(function = %self.function, name = %synthetic, "inserted synthetic entry block");

        self.blocks
            .insert(synthetic.clone(), vec![Instr::jmp(original_entry.clone())]);
        self.successors
            .insert(synthetic.clone(), vec![original_entry.clone()]);
        self.predecessors.insert(synthetic.clone(), Vec::new());
        #[expect(clippy::expect_used, reason = "Invariant: every block inserted above has a predecessor list")]
        self.predecessors
            .get_mut(&original_entry)
            .expect("original entry always has a predecessor list")
            .push(synthetic.clone());
        self.order.insert(0, synthetic);
    }

    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function
    }

    /// Block names in CFG (original IR) order.
    #[must_use]
    pub fn block_names(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn block(&self, name: &str) -> Option<&[Instr]> {
        self.blocks.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn block_mut(&mut self, name: &str) -> Option<&mut Vec<Instr>> {
        self.blocks.get_mut(name)
    }

    #[must_use]
    pub fn blocks(&self) -> impl Iterator<Item = (&str, &[Instr])> {
        self.order
            .iter()
            .map(|n| (n.as_str(), self.blocks[n].as_slice()))
    }

    #[must_use]
    pub fn entry(&self) -> &str {
        self.order.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn exit(&self) -> &str {
        self.order.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn successors_of(&self, block: &str) -> &[String] {
        self.successors.get(block).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn predecessors_of(&self, block: &str) -> &[String] {
        self.predecessors.get(block).map_or(&[], Vec::as_slice)
    }

    /// Emits the CFG back into a flat instruction stream, one label marker
    /// per block followed by its body, in CFG order.
    #[must_use]
    pub fn flatten(&self) -> Vec<Instr> {
        let mut out = Vec::new();
        for name in &self.order {
            out.push(Instr::label(name.clone()));
            out.extend(self.blocks[name].iter().cloned());
        }
        out
    }

    /// Creates a new block on the edge `pred -> succ`, redirects `pred`'s
    /// terminator to target it instead of `succ`, and returns its fresh
    /// name `b.<pred>.<succ>`. Used by SSA destruction to host copy
    /// instructions synthesized for a φ edge.
    pub fn insert_between(&mut self, pred: &str, succ: &str, body: Vec<Instr>) -> String {
        let new_name = format!("b.{pred}.{succ}");

        if let Some(term) = self
            .blocks
            .get_mut(pred)
            .and_then(|b| b.last_mut())
        {
            for label in &mut term.labels {
                if label == succ {
                    *label = new_name.clone();
                }
            }
        }

        for s in self.successors.entry(pred.to_string()).or_default() {
            if s == succ {
                *s = new_name.clone();
            }
        }

        if let Some(preds) = self.predecessors.get_mut(succ) {
            if let Some(slot) = preds.iter_mut().find(|p| p.as_str() == pred) {
                *slot = new_name.clone();
            }
        }

        self.blocks.insert(new_name.clone(), body);
        self.successors
            .insert(new_name.clone(), vec![succ.to_string()]);
        self.predecessors
            .insert(new_name.clone(), vec![pred.to_string()]);

        let succ_pos = self
            .order
            .iter()
            .position(|n| n == succ)
            .unwrap_or(self.order.len());
        self.order.insert(succ_pos, new_name.clone());

        new_name
    }

    /// Drops every block not reachable from `entry()` by forward traversal
    /// of successor edges, and rebuilds predecessor relations from what
    /// remains.
    pub fn remove_unreachable_blocks(&mut self) {
        let mut reachable = rustc_hash::FxHashSet::default();
        let mut stack = vec![self.entry().to_string()];
        while let Some(name) = stack.pop() {
            if !reachable.insert(name.clone()) {
                continue;
            }
            for succ in self.successors_of(&name) {
                if !reachable.contains(succ) {
                    stack.push(succ.clone());
                }
            }
        }

        let dropped = self.order.len() - reachable.len();
        if dropped > 0 {
            debug!(function = %self.function, dropped, "pruned unreachable blocks");
        }

        self.order.retain(|n| reachable.contains(n));
        self.blocks.retain(|n, _| reachable.contains(n));
        self.successors.retain(|n, _| reachable.contains(n));
        for succs in self.successors.values_mut() {
            succs.retain(|s| reachable.contains(s));
        }
        self.predecessors = invert(&self.order, &self.successors);
    }
}

fn invert(
    order: &[String],
    successors: &FxHashMap<String, Vec<String>>,
) -> FxHashMap<String, Vec<String>> {
    let mut predecessors: FxHashMap<String, Vec<String>> =
        order.iter().map(|n| (n.clone(), Vec::new())).collect();
    for name in order {
        for succ in successors.get(name).into_iter().flatten() {
            if let Some(preds) = predecessors.get_mut(succ) {
                preds.push(name.clone());
            }
        }
    }
    predecessors
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#[expect(clippy::expect_used, reason = "Tests use expect for clarity")]
mod tests {
    use super::*;
    use flow_ir::Literal;

    #[test]
    fn blocks_and_successors_from_literal_diamond() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::constant("x", "int", Literal::Int(1)),
            Instr::jmp("end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let cfg = Cfg::new("main", &instrs).unwrap();
        assert_eq!(cfg.block_names(), &["entry".to_string(), "end".to_string()]);
        assert_eq!(cfg.successors_of("entry"), &["end".to_string()]);
        assert!(cfg.successors_of("end").is_empty());
    }

    #[test]
    fn entry_with_predecessors_gets_synthetic_prefix() {
        // A loop back-edge to the entry block forces canonicalization.
        let instrs = vec![
            Instr::label("loop"),
            Instr::br("cond", "loop", "end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let cfg = Cfg::new("f", &instrs).unwrap();
        assert_eq!(cfg.entry(), "entry.1");
        assert!(cfg.predecessors_of("entry.1").is_empty());
        assert_eq!(cfg.predecessors_of("loop"), &["loop".to_string(), "entry.1".to_string()]);
    }

    #[test]
    fn edge_symmetry_holds() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::br("c", "a", "b"),
            Instr::label("a"),
            Instr::jmp("end"),
            Instr::label("b"),
            Instr::jmp("end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let cfg = Cfg::new("f", &instrs).unwrap();
        for a in cfg.block_names().to_vec() {
            for b in cfg.successors_of(&a).to_vec() {
                assert!(
                    cfg.predecessors_of(&b).contains(&a),
                    "{b} should list {a} as predecessor"
                );
            }
        }
    }

    #[test]
    fn flatten_round_trip_preserves_successors() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::br("c", "a", "b"),
            Instr::label("a"),
            Instr::jmp("end"),
            Instr::label("b"),
            Instr::jmp("end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let cfg = Cfg::new("f", &instrs).unwrap();
        let flat = cfg.flatten();
        let cfg2 = Cfg::new("f", &flat).unwrap();
        assert_eq!(cfg.block_names(), cfg2.block_names());
        for name in cfg.block_names() {
            assert_eq!(cfg.successors_of(name), cfg2.successors_of(name));
        }
    }

    #[test]
    fn remove_unreachable_blocks_prunes_and_keeps_edges_symmetric() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::ret(None),
            Instr::label("dead"),
            Instr::jmp("entry"),
        ];
        let mut cfg = Cfg::new("f", &instrs).unwrap();
        cfg.remove_unreachable_blocks();
        assert_eq!(cfg.block_names(), &["entry".to_string()]);
        assert!(cfg.predecessors_of("entry").is_empty());
    }

    #[test]
    fn insert_between_redirects_terminator_and_preserves_symmetry() {
        let instrs = vec![
            Instr::label("entry"),
            Instr::jmp("end"),
            Instr::label("end"),
            Instr::ret(None),
        ];
        let mut cfg = Cfg::new("f", &instrs).unwrap();
        let new_name = cfg.insert_between("entry", "end", vec![Instr::jmp("end")]);
        assert_eq!(new_name, "b.entry.end");
        assert_eq!(cfg.successors_of("entry"), &[new_name.clone()]);
        assert_eq!(cfg.predecessors_of("end"), &[new_name.clone()]);
        assert_eq!(cfg.successors_of(&new_name), &["end".to_string()]);
    }

    #[test]
    fn bad_branch_arity_is_rejected() {
        let instrs = vec![Instr {
            op: Some(Op::Br),
            args: vec!["c".to_string()],
            labels: vec!["only_one".to_string()],
            ..Default::default()
        }];
        let err = Cfg::new("f", &instrs).unwrap_err();
        assert!(matches!(err, CfgError::BadBranchArity { found: 1, .. }));
    }
}
