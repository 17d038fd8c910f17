use std::fmt;

/// Errors surfaced while decoding or encoding the JSON wire format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The top-level payload was not valid JSON, or didn't match the
    /// `{"functions": [...]}` shape at all.
    Json(String),
    /// A record carried both `op` and `label`, or neither — the wire
    /// format requires exactly one of the two.
    AmbiguousRecord { function: String, index: usize },
    /// A `const` instruction is missing the `value` field it requires.
    MissingConstValue { function: String, index: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Json(msg) => write!(f, "malformed JSON: {msg}"),
            CodecError::AmbiguousRecord { function, index } => write!(
                f,
                "function `{function}`, instruction {index}: record must carry exactly one of `op`/`label`"
            ),
            CodecError::MissingConstValue { function, index } => write!(
                f,
                "function `{function}`, instruction {index}: `const` requires a `value` field"
            ),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}
