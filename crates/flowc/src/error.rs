use std::fmt;

use flow_cfg::CfgError;
use flow_codec::CodecError;

/// Errors the driver can surface to a subcommand's caller: a usage
/// mistake, a missing precondition section, a malformed-IR/codec problem,
/// or a CFG invariant violation. Every variant maps to a single
/// stderr line and a non-zero exit code; none of them retry or produce
/// partial output.
#[derive(Debug)]
pub enum DriverError {
    /// Bad subcommand arguments (unknown `df`/`dom`/`ssa` variant, etc.).
    Usage(String),
    /// A pass's precondition section (e.g. `cfg` needing a prior `blocks`)
    /// is absent from the input.
    MissingSection(String),
    /// The instruction stream doesn't form a valid CFG.
    Cfg(CfgError),
    /// The JSON payload is malformed or doesn't decode to well-formed IR.
    Codec(CodecError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Usage(msg) => write!(f, "usage error: {msg}"),
            DriverError::MissingSection(msg) => write!(f, "{msg}"),
            DriverError::Cfg(err) => write!(f, "{err}"),
            DriverError::Codec(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<CfgError> for DriverError {
    fn from(err: CfgError) -> Self {
        DriverError::Cfg(err)
    }
}

impl From<CodecError> for DriverError {
    fn from(err: CodecError) -> Self {
        DriverError::Codec(err)
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Codec(CodecError::from(err))
    }
}
