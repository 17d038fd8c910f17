//! Dominance, the generic dataflow solver, and its three instantiations:
//! reaching definitions, live variables, and constant propagation.
//!
//! # Pipeline Position
//!
//! Every analysis in this crate is a pure function of a [`flow_cfg::Cfg`]:
//! none of them mutate it, and none maintain state across calls.

mod analyses;
mod dataflow;
mod dominance;

pub use analyses::{
    constant_propagation, cprop_out, fold, live_variables, reaching_definitions, ConstMap,
    ConstValue,
};
pub use dataflow::{DataflowResult, DataflowSolver, Direction};
pub use dominance::{
    dominance_frontier, dominator_tree, dominators, immediate_dominators, DomSets, IdomMap,
};
