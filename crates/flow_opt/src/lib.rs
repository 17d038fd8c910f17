//! Local value numbering, SSA construction/destruction, and trivial dead
//! code elimination: the transformation passes that rewrite a function's
//! instruction stream in place.
//!
//! # Pipeline Position
//!
//! Unlike `flow_analysis`, these passes mutate: each one takes ownership of
//! a `&mut flow_cfg::Cfg` or `&mut flow_ir::Function`, rewrites it, and
//! writes the result back via `Cfg::flatten`. None of them maintain state
//! across calls — every invocation rebuilds whatever CFG/dominance
//! structure it needs from scratch.

mod lvn;
mod ssa_in;
mod ssa_out;
mod tdce;

pub use lvn::local_value_numbering;
pub use ssa_in::into_ssa;
pub use ssa_out::out_of_ssa;
pub use tdce::{tdce, tdce_once};
