use crate::{Literal, Op};

/// A type name as it appears in the wire format (`"int"`, `"bool"`, ...).
///
/// Kept as an opaque string rather than a closed enum: the core never
/// interprets types beyond comparing and copying them; unrecognized type
/// names are preserved opaquely like everything else in this module.
pub type Ty = String;

/// A single record of a function body: either a label marker or an
/// operation.
///
/// This mirrors the heterogeneous wire-format JSON record directly rather than
/// splitting into a label/instruction enum, because most passes need to
/// rewrite a handful of fields (`op`, `dest`, `args`) in place while leaving
/// the rest untouched; an enum-per-shape would force every pass to
/// reconstruct the whole record for a one-field edit.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Instr {
    /// Present for operations; absent for label markers.
    pub op: Option<Op>,
    /// Present only for label markers.
    pub label: Option<String>,
    pub dest: Option<String>,
    pub ty: Option<Ty>,
    pub args: Vec<String>,
    pub labels: Vec<String>,
    pub funcs: Vec<String>,
    pub value: Option<Literal>,
}

impl Instr {
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Instr {
            label: Some(name.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn jmp(target: impl Into<String>) -> Self {
        Instr {
            op: Some(Op::Jmp),
            labels: vec![target.into()],
            ..Default::default()
        }
    }

    #[must_use]
    pub fn br(cond: impl Into<String>, then: impl Into<String>, els: impl Into<String>) -> Self {
        Instr {
            op: Some(Op::Br),
            args: vec![cond.into()],
            labels: vec![then.into(), els.into()],
            ..Default::default()
        }
    }

    #[must_use]
    pub fn ret(value: Option<String>) -> Self {
        Instr {
            op: Some(Op::Ret),
            args: value.into_iter().collect(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn constant(dest: impl Into<String>, ty: impl Into<Ty>, value: Literal) -> Self {
        Instr {
            op: Some(Op::Const),
            dest: Some(dest.into()),
            ty: Some(ty.into()),
            value: Some(value),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn id(dest: impl Into<String>, ty: Option<Ty>, src: impl Into<String>) -> Self {
        Instr {
            op: Some(Op::Id),
            dest: Some(dest.into()),
            ty,
            args: vec![src.into()],
            ..Default::default()
        }
    }

    /// A record with no `op` is a label marker; everything else is an
    /// operation, possibly an unrecognized one.
    #[must_use]
    pub fn is_label(&self) -> bool {
        self.op.is_none()
    }

    #[must_use]
    pub fn is_terminator(&self) -> bool {
        self.op.as_ref().is_some_and(Op::is_terminator)
    }

    /// Value-producing instructions carry a `dest`.
    #[must_use]
    pub fn is_assignment(&self) -> bool {
        self.dest.is_some()
    }

    #[must_use]
    pub fn is_phi(&self) -> bool {
        self.op.as_ref() == Some(&Op::Phi)
    }
}

/// A formal parameter of a [`Function`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arg {
    pub name: String,
    pub ty: Ty,
}

/// A function: a name, its formal arguments, and its body.
///
/// `instrs` is always the flat, linear form. Passes that need block structure build a
/// `flow_cfg::Cfg` on demand and write the result back with
/// `func.instrs = cfg.flatten()`; no pass owns block structure across calls,
/// since dominator sets and dataflow maps are always recomputed from scratch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub args: Vec<Arg>,
    pub instrs: Vec<Instr>,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<Arg>, instrs: Vec<Instr>) -> Self {
        Function {
            name: name.into(),
            args,
            instrs,
        }
    }
}

/// An ordered list of functions: the unit the core consumes and returns.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Program {
    pub functions: Vec<Function>,
}
