//! String template AST.
//!
//! Attribute values that contain `${...}` interpolation spans, and bare
//! reference expressions like `model.llama2_instance`, are parsed into a
//! small AST of literal and reference segments instead of being re-split
//! from strings at resolution time. Conditional expressions
//! (`cond ? then : else`) get their own node with a restricted comparison
//! condition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::Path;
use crate::span::Span;

/// An unresolved string template: literal text mixed with references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
    pub span: Span,
}

/// One segment of a [`Template`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    /// Literal text, emitted verbatim.
    Literal(String),
    /// A `${...}` reference span (or a bare dotted reference).
    Ref(Path),
}

/// A conditional template: `cond ? then : else`.
///
/// The condition is deliberately restricted: one operand, optionally
/// compared against another. There is no general expression language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    pub cond: Condition,
    pub when_true: Template,
    pub when_false: Template,
    pub span: Span,
}

/// The condition of a [`Conditional`].
///
/// With no comparison, the operand itself must resolve to a bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub lhs: Operand,
    pub cmp: Option<(CmpOp, Operand)>,
}

/// A condition operand: a reference or a scalar literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Ref(Path),
    Str(String),
    Num(f64),
    Bool(bool),
}

/// Comparison operators allowed in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Template {
    /// Create a template from its parts.
    pub fn new(parts: Vec<TemplatePart>, span: Span) -> Self {
        Self { parts, span }
    }

    /// If the template is exactly one reference with no surrounding text,
    /// return that reference.
    ///
    /// Whole-reference templates resolve to the referenced value with its
    /// type intact; mixed templates concatenate into a string.
    pub fn as_single_ref(&self) -> Option<&Path> {
        match self.parts.as_slice() {
            [TemplatePart::Ref(path)] => Some(path),
            _ => None,
        }
    }

    /// Every reference mentioned by this template, in order.
    pub fn refs(&self) -> impl Iterator<Item = &Path> {
        self.parts.iter().filter_map(|part| match part {
            TemplatePart::Ref(path) => Some(path),
            TemplatePart::Literal(_) => None,
        })
    }
}

/// Display reconstructs the `${...}` surface syntax. Used for error
/// messages and debug output only.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => write!(f, "{}", text)?,
                TemplatePart::Ref(path) => write!(f, "${{{}}}", path)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ref(path) => write!(f, "${{{}}}", path),
            Operand::Str(s) => write!(f, "'{}'", s),
            Operand::Num(n) => write!(f, "{}", n),
            Operand::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}
