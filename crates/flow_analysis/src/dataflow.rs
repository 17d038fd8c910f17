use flow_cfg::Cfg;
use rustc_hash::FxHashSet;
use tracing::trace;

/// Which direction a dataflow analysis propagates information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A generic worklist dataflow solver, parameterized over direction,
/// lattice element, transfer function, and merge function.
///
/// `L` is the lattice element type. Equality on `L` must be structural: the
/// worklist only re-propagates a block's successors when its `out` set
/// actually changes.
pub struct DataflowSolver<'a, L, Transfer, Merge>
where
    L: Clone + PartialEq,
    Transfer: Fn(&[flow_ir::Instr], L) -> L,
    Merge: Fn(&[L]) -> L,
{
    cfg: &'a Cfg,
    direction: Direction,
    init: L,
    transfer: Transfer,
    merge: Merge,
}

/// The `in`/`out` maps a solved dataflow analysis produces, keyed by block
/// name.
#[derive(Clone, Debug)]
pub struct DataflowResult<L> {
    pub ins: rustc_hash::FxHashMap<String, L>,
    pub outs: rustc_hash::FxHashMap<String, L>,
}

impl<'a, L, Transfer, Merge> DataflowSolver<'a, L, Transfer, Merge>
where
    L: Clone + PartialEq,
    Transfer: Fn(&[flow_ir::Instr], L) -> L,
    Merge: Fn(&[L]) -> L,
{
    #[must_use]
    pub fn new(cfg: &'a Cfg, direction: Direction, init: L, transfer: Transfer, merge: Merge) -> Self {
        DataflowSolver {
            cfg,
            direction,
            init,
            transfer,
            merge,
        }
    }

    /// Runs the worklist to a fixed point. Pop order is unspecified;
    /// this implementation pops from the back of a `Vec` used as a set,
    /// which is sufficient because the transfer function is monotone and
    /// the lattice has bounded height.
    #[must_use]
    pub fn solve(&self) -> DataflowResult<L> {
        let (succ_of, pred_of): (Box<dyn Fn(&str) -> &[String]>, Box<dyn Fn(&str) -> &[String]>) =
            match self.direction {
                Direction::Forward => (
                    Box::new(|b: &str| self.cfg.successors_of(b)),
                    Box::new(|b: &str| self.cfg.predecessors_of(b)),
                ),
                Direction::Backward => (
                    Box::new(|b: &str| self.cfg.predecessors_of(b)),
                    Box::new(|b: &str| self.cfg.successors_of(b)),
                ),
            };

        let entry = match self.direction {
            Direction::Forward => self.cfg.entry(),
            Direction::Backward => self.cfg.exit(),
        };

        let mut ins: rustc_hash::FxHashMap<String, L> = rustc_hash::FxHashMap::default();
        let mut outs: rustc_hash::FxHashMap<String, L> = self
            .cfg
            .block_names()
            .iter()
            .map(|b| (b.clone(), self.init.clone()))
            .collect();
        ins.insert(entry.to_string(), self.init.clone());

        let mut worklist: Vec<String> = self.cfg.block_names().to_vec();
        let mut in_worklist: FxHashSet<String> = worklist.iter().cloned().collect();
        let mut iterations = 0usize;

        while let Some(block_name) = worklist.pop() {
            in_worklist.remove(&block_name);
            iterations += 1;

            let preds = pred_of(&block_name);
            let in_values: Vec<L> = preds.iter().map(|p| outs[p].clone()).collect();
            let new_in = (self.merge)(&in_values);

            let body = self.cfg.block(&block_name).unwrap_or(&[]);
            let new_out = (self.transfer)(body, new_in.clone());

            if new_out != outs[&block_name] {
                for succ in succ_of(&block_name) {
                    if in_worklist.insert(succ.clone()) {
                        worklist.push(succ.clone());
                    }
                }
            }
            ins.insert(block_name.clone(), new_in);
            outs.insert(block_name, new_out);
        }

        trace!(function = %self.cfg.function_name(), iterations, "dataflow converged");

        if self.direction == Direction::Backward {
            std::mem::swap(&mut ins, &mut outs);
        }
        DataflowResult { ins, outs }
    }
}
