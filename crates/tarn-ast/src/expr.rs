//! Expression nodes.
//!
//! Every expression carries three annotation slots next to its kind: the
//! source range, the resolved type, and the declaration back-reference.
//! The parser leaves `ty` and `decl` as `None`; semantic analysis fills
//! them in exactly once (contextual type propagation being the one
//! sanctioned re-write).

use tarn_common::{Identifier, SourceRange};

use crate::decl::{DeclRef, ParamDecl, TypeAnnotation};
use crate::op::BuiltinOperator;
use crate::stmt::CompoundStmt;
use crate::ty::DataType;

/// An expression with its annotation slots.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Option<SourceRange>,
    /// The resolved type. After analysis this is `Some` on every
    /// expression unless an error was reported for its subtree.
    pub ty: Option<DataType>,
    /// The declaration this expression refers to, for names, calls,
    /// operators, subscripts, and property references.
    pub decl: Option<DeclRef>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind, range: None, ty: None, decl: None }
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = Some(range);
        self
    }

    // ── Literal constructors ────────────────────────────────────────────

    pub fn num(value: i64) -> Self {
        Expr::new(ExprKind::Num { value, raw: value.to_string() })
    }

    pub fn float(value: f64) -> Self {
        Expr::new(ExprKind::Float { value })
    }

    pub fn char_lit(value: u8) -> Self {
        Expr::new(ExprKind::Char { value })
    }

    pub fn bool_lit(value: bool) -> Self {
        Expr::new(ExprKind::Bool { value })
    }

    pub fn string(text: impl Into<String>) -> Self {
        Expr::new(ExprKind::Str { segments: vec![StringSegment::Literal(text.into())] })
    }

    pub fn nil() -> Self {
        Expr::new(ExprKind::Nil)
    }

    // ── Structural constructors ─────────────────────────────────────────

    pub fn var(name: impl Into<Identifier>) -> Self {
        Expr::new(ExprKind::Var { name: name.into() })
    }

    pub fn paren(value: Expr) -> Self {
        Expr::new(ExprKind::Paren { value: Box::new(value) })
    }

    pub fn tuple(elements: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Tuple { elements })
    }

    pub fn array(elements: Vec<Expr>) -> Self {
        Expr::new(ExprKind::Array { elements })
    }

    pub fn property(base: Expr, name: impl Into<Identifier>) -> Self {
        Expr::new(ExprKind::PropertyRef { base: Box::new(base), name: name.into() })
    }

    pub fn tuple_field(base: Expr, index: usize) -> Self {
        Expr::new(ExprKind::TupleField { base: Box::new(base), index })
    }

    pub fn subscript(base: Expr, args: Vec<Argument>) -> Self {
        Expr::new(ExprKind::Subscript { base: Box::new(base), args })
    }

    pub fn call(callee: Expr, args: Vec<Argument>) -> Self {
        Expr::new(ExprKind::Call { callee: Box::new(callee), args })
    }

    pub fn prefix(op: BuiltinOperator, operand: Expr) -> Self {
        Expr::new(ExprKind::Prefix { op, operand: Box::new(operand) })
    }

    pub fn infix(op: BuiltinOperator, lhs: Expr, rhs: Expr) -> Self {
        Expr::new(ExprKind::Infix { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    pub fn ternary(condition: Expr, then_value: Expr, else_value: Expr) -> Self {
        Expr::new(ExprKind::Ternary {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    pub fn coercion(value: Expr, target: DataType) -> Self {
        Expr::new(ExprKind::Coercion {
            value: Box::new(value),
            target: TypeAnnotation::new(target),
        })
    }

    pub fn type_check(value: Expr, target: DataType) -> Self {
        Expr::new(ExprKind::TypeCheck {
            value: Box::new(value),
            target: TypeAnnotation::new(target),
        })
    }

    pub fn sizeof(operand: Expr) -> Self {
        Expr::new(ExprKind::Sizeof { operand: Box::new(operand) })
    }

    pub fn type_ref(ty: DataType) -> Self {
        Expr::new(ExprKind::TypeRef { annotation: TypeAnnotation::new(ty) })
    }

    /// Whether this expression is a literal whose type is still negotiable
    /// by context (numeric, string, nil, or a container of such).
    pub fn is_literal_bearing(&self) -> bool {
        match &self.kind {
            ExprKind::Num { .. }
            | ExprKind::Float { .. }
            | ExprKind::Char { .. }
            | ExprKind::Str { .. }
            | ExprKind::Nil => true,
            ExprKind::Paren { value } => value.is_literal_bearing(),
            ExprKind::Array { elements } | ExprKind::Tuple { elements } => {
                elements.iter().any(Expr::is_literal_bearing)
            }
            ExprKind::Infix { lhs, rhs, .. } => {
                lhs.is_literal_bearing() && rhs.is_literal_bearing()
            }
            ExprKind::Ternary { then_value, else_value, .. } => {
                then_value.is_literal_bearing() || else_value.is_literal_bearing()
            }
            _ => false,
        }
    }
}

/// One piece of a string literal: literal text or an interpolated
/// expression.
#[derive(Clone, Debug)]
pub enum StringSegment {
    Literal(String),
    Interpolation(Expr),
}

/// A call or subscript argument with its optional label.
#[derive(Clone, Debug)]
pub struct Argument {
    pub label: Option<Identifier>,
    pub value: Expr,
}

impl Argument {
    pub fn unlabeled(value: Expr) -> Self {
        Argument { label: None, value }
    }

    pub fn labeled(label: impl Into<Identifier>, value: Expr) -> Self {
        Argument { label: Some(label.into()), value }
    }
}

/// A closure literal. The capture list is populated during analysis as
/// referenced outer bindings are resolved.
#[derive(Clone, Debug)]
pub struct ClosureExpr {
    pub params: Vec<ParamDecl>,
    pub return_type: Option<TypeAnnotation>,
    pub body: CompoundStmt,
    pub captures: Vec<DeclRef>,
}

/// The closed expression sum.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// An integer literal. `raw` preserves the source spelling for
    /// overflow diagnostics.
    Num { value: i64, raw: String },
    Float { value: f64 },
    Char { value: u8 },
    Bool { value: bool },
    /// A string literal, possibly with interpolation segments.
    Str { segments: Vec<StringSegment> },
    /// `#function`: the enclosing function's name as a string literal.
    PoundFunction,
    Nil,
    /// The empty value; the result of a `Void` call in value position.
    Void,
    Var { name: Identifier },
    Paren { value: Box<Expr> },
    Tuple { elements: Vec<Expr> },
    Array { elements: Vec<Expr> },
    /// `tuple.0` -- field access by position.
    TupleField { base: Box<Expr>, index: usize },
    /// `value.name` -- property or method reference.
    PropertyRef { base: Box<Expr>, name: Identifier },
    Subscript { base: Box<Expr>, args: Vec<Argument> },
    Call { callee: Box<Expr>, args: Vec<Argument> },
    Prefix { op: BuiltinOperator, operand: Box<Expr> },
    Infix { op: BuiltinOperator, lhs: Box<Expr>, rhs: Box<Expr> },
    Ternary { condition: Box<Expr>, then_value: Box<Expr>, else_value: Box<Expr> },
    Closure(ClosureExpr),
    /// `sizeof(expr)` or `sizeof(Type)` (the operand is a `TypeRef` in the
    /// latter case).
    Sizeof { operand: Box<Expr> },
    /// `value as Target`.
    Coercion { value: Box<Expr>, target: TypeAnnotation },
    /// `value is Target`.
    TypeCheck { value: Box<Expr>, target: TypeAnnotation },
    /// A type used in expression position (static member access, sizeof).
    TypeRef { annotation: TypeAnnotation },
    /// Implicit promotion of a concrete value into an `Any` context.
    /// Inserted by contextual type propagation, never by the parser.
    PromoteToAny { value: Box<Expr> },
}
