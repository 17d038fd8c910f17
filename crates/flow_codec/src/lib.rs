//! JSON wire codec for the flowc IR: the boundary between the analysis core
//! and everything outside it.
//!
//! # Pipeline Position
//!
//! ```text
//! stdin JSON -> decode_program -> flow_ir::Program -> (core passes) -> flow_ir::Program -> encode_program -> stdout JSON
//! ```
//!
//! The mirror types ([`ProgramDoc`], [`FunctionDoc`], [`InstrDoc`],
//! [`ArgDoc`]) exist only at this boundary: every core crate works with
//! `flow_ir`'s types directly and has no notion of JSON. The CLI driver is
//! the only consumer that reaches for [`FunctionDoc::blocks`]/`cfg` to
//! attach a pass's output sections before re-serializing.

mod doc;
mod error;
mod ordered_map;

pub use doc::{
    arg_to_doc, doc_to_arg, doc_to_function, doc_to_instr, doc_to_program, function_to_doc,
    instr_to_doc, program_to_doc, ArgDoc, FunctionDoc, InstrDoc, LiteralDoc, ProgramDoc,
};
pub use error::CodecError;
pub use ordered_map::OrderedMap;

use flow_ir::Program;

/// Parses a JSON `Program` document from `input` into the core model.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if `input` isn't valid JSON or doesn't match
/// the wire shape, or a structured decode error naming the offending
/// function and instruction index if a record is malformed.
pub fn decode_program(input: &str) -> Result<Program, CodecError> {
    let doc: ProgramDoc = serde_json::from_str(input)?;
    doc_to_program(doc)
}

/// Serializes `program` to its JSON wire form, preserving field insertion
/// order and omitting fields that were never set.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on the (practically unreachable) case that
/// `serde_json` fails to serialize the document.
pub fn encode_program(program: &Program) -> Result<String, CodecError> {
    let doc = program_to_doc(program);
    Ok(serde_json::to_string(&doc)?)
}

/// Pretty-printed variant of [`encode_program`], used by the CLI driver
/// when writing to a terminal.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on the (practically unreachable) case that
/// `serde_json` fails to serialize the document.
pub fn encode_program_pretty(program: &Program) -> Result<String, CodecError> {
    let doc = program_to_doc(program);
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
#[expect(clippy::expect_used, reason = "Tests use expect for clarity")]
mod tests {
    use super::*;
    use flow_ir::{Instr, Literal};

    #[test]
    fn decodes_label_and_op_records() {
        let json = r#"{"functions":[{"name":"main","instrs":[
            {"label":"entry"},
            {"op":"const","dest":"x","type":"int","value":1},
            {"op":"jmp","labels":["end"]},
            {"label":"end"},
            {"op":"ret","args":[]}
        ]}]}"#;
        let program = decode_program(json).unwrap();
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].instrs.len(), 5);
        assert_eq!(program.functions[0].instrs[1].value, Some(Literal::Int(1)));
    }

    #[test]
    fn round_trip_preserves_instruction_shape() {
        let program = flow_ir::Program {
            functions: vec![flow_ir::Function::new(
                "f",
                vec![],
                vec![
                    Instr::label("entry"),
                    Instr::constant("x", "int", Literal::Bool(false)),
                    Instr::ret(None),
                ],
            )],
        };
        let json = encode_program(&program).unwrap();
        let back = decode_program(&json).unwrap();
        assert_eq!(program, back);
    }

    #[test]
    fn omitted_optional_fields_stay_omitted_on_the_way_out() {
        let json = r#"{"functions":[{"name":"f","instrs":[{"op":"ret"}]}]}"#;
        let program = decode_program(json).unwrap();
        let out = encode_program(&program).unwrap();
        assert!(!out.contains("\"args\""));
        assert!(!out.contains("\"labels\""));
        assert!(!out.contains("\"funcs\""));
        assert!(!out.contains("\"value\""));
    }

    #[test]
    fn malformed_json_surfaces_as_codec_error() {
        let err = decode_program("not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn blocks_section_round_trips_key_order() {
        let mut func = function_to_doc(&flow_ir::Function::new(
            "f",
            vec![],
            vec![Instr::label("entry"), Instr::ret(None)],
        ));
        let mut blocks = OrderedMap::new();
        blocks.push("entry", vec![instr_to_doc(&Instr::ret(None))]);
        func.blocks = Some(blocks);

        let json = serde_json::to_string(&func).unwrap();
        let back: FunctionDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(back.blocks.unwrap().0.len(), 1);
    }
}
