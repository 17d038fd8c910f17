//! Basic-block formation and control-flow graph construction.
//!
//! # Pipeline Position
//!
//! ```text
//! flow_ir::Function -> form_blocks -> name_blocks -> Cfg -> (analyses / opt passes)
//! ```
//!
//! [`Cfg`] owns block bodies once built; every later pass (dominance,
//! dataflow, LVN, SSA, TDCE) borrows block names and mutates bodies through
//! it rather than re-deriving block structure itself.

mod block_former;
mod cfg;
mod error;

pub use block_former::{form_blocks, name_blocks};
pub use cfg::Cfg;
pub use error::CfgError;
