//! Wire-format mirror types and their conversions to/from `flow_ir`'s core
//! model.
//!
//! Struct field declaration order is serde's emission order for a
//! non-map struct, so every `*Doc` type below is declared in exactly the
//! field order the wire format specifies, and every optional field is
//! `skip_serializing_if`-gated so an input field that was absent comes back
//! out absent rather than as an explicit `null`.

use serde::{Deserialize, Serialize};

use flow_ir::{Arg, Function, Instr, Literal, Op, Program};

use crate::error::CodecError;
use crate::ordered_map::OrderedMap;

/// `{"functions": [FunctionDoc, ...]}` — the top-level wire document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramDoc {
    pub functions: Vec<FunctionDoc>,
}

/// One function's wire record. `blocks`/`cfg` are populated by the CLI
/// driver after running the relevant pass — the core `Program` type never
/// carries them, so [`function_to_doc`]/[`doc_to_function`] only ever touch
/// `name`/`args`/`instrs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instrs: Vec<InstrDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<OrderedMap<Vec<InstrDoc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg: Option<OrderedMap<Vec<String>>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArgDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A label marker `{"label": str}` or an operation record
/// `{"op": str, "dest"?: str, "type"?: str, "args"?: [str], "labels"?:
/// [str], "funcs"?: [str], "value"?: Literal}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InstrDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funcs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<LiteralDoc>,
}

/// `const`/folded-value literals. Untagged: a JSON boolean only ever
/// matches [`LiteralDoc::Bool`] and a JSON number only ever matches
/// [`LiteralDoc::Int`], so there's no ambiguity to resolve by variant
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralDoc {
    Bool(bool),
    Int(i64),
}

impl From<Literal> for LiteralDoc {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Int(v) => LiteralDoc::Int(v),
            Literal::Bool(v) => LiteralDoc::Bool(v),
        }
    }
}

impl From<LiteralDoc> for Literal {
    fn from(value: LiteralDoc) -> Self {
        match value {
            LiteralDoc::Int(v) => Literal::Int(v),
            LiteralDoc::Bool(v) => Literal::Bool(v),
        }
    }
}

#[must_use]
pub fn instr_to_doc(instr: &Instr) -> InstrDoc {
    InstrDoc {
        op: instr.op.as_ref().map(Op::to_string),
        label: instr.label.clone(),
        dest: instr.dest.clone(),
        ty: instr.ty.clone(),
        args: instr.args.clone(),
        labels: instr.labels.clone(),
        funcs: instr.funcs.clone(),
        value: instr.value.map(LiteralDoc::from),
    }
}

/// Converts one wire record back to the core model, validating the
/// label-xor-op shape and `const`'s required `value` field.
pub fn doc_to_instr(doc: InstrDoc, function: &str, index: usize) -> Result<Instr, CodecError> {
    match (&doc.op, &doc.label) {
        (Some(_), Some(_)) | (None, None) => {
            return Err(CodecError::AmbiguousRecord {
                function: function.to_string(),
                index,
            })
        }
        _ => {}
    }

    let op = doc.op.map(Op::from);
    if op.as_ref() == Some(&Op::Const) && doc.value.is_none() {
        return Err(CodecError::MissingConstValue {
            function: function.to_string(),
            index,
        });
    }

    Ok(Instr {
        op,
        label: doc.label,
        dest: doc.dest,
        ty: doc.ty,
        args: doc.args,
        labels: doc.labels,
        funcs: doc.funcs,
        value: doc.value.map(Literal::from),
    })
}

#[must_use]
pub fn arg_to_doc(arg: &Arg) -> ArgDoc {
    ArgDoc {
        name: arg.name.clone(),
        ty: arg.ty.clone(),
    }
}

#[must_use]
pub fn doc_to_arg(doc: ArgDoc) -> Arg {
    Arg {
        name: doc.name,
        ty: doc.ty,
    }
}

/// Converts a core `Function` to its wire record, leaving `blocks`/`cfg`
/// unset — those are attached by the CLI driver for the passes that
/// produce them.
#[must_use]
pub fn function_to_doc(func: &Function) -> FunctionDoc {
    FunctionDoc {
        name: func.name.clone(),
        args: func.args.iter().map(arg_to_doc).collect(),
        instrs: func.instrs.iter().map(instr_to_doc).collect(),
        blocks: None,
        cfg: None,
    }
}

/// Converts a wire record back to a core `Function`, ignoring any
/// `blocks`/`cfg` sections present on the input.
pub fn doc_to_function(doc: FunctionDoc) -> Result<Function, CodecError> {
    let instrs = doc
        .instrs
        .into_iter()
        .enumerate()
        .map(|(index, instr_doc)| doc_to_instr(instr_doc, &doc.name, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Function {
        name: doc.name,
        args: doc.args.into_iter().map(doc_to_arg).collect(),
        instrs,
    })
}

#[must_use]
pub fn program_to_doc(program: &Program) -> ProgramDoc {
    ProgramDoc {
        functions: program.functions.iter().map(function_to_doc).collect(),
    }
}

pub fn doc_to_program(doc: ProgramDoc) -> Result<Program, CodecError> {
    Ok(Program {
        functions: doc
            .functions
            .into_iter()
            .map(doc_to_function)
            .collect::<Result<Vec<_>, _>>()?,
    })
}
