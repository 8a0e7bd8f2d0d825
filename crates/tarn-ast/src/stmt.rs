//! Statement nodes.

use tarn_common::{Severity, SourceRange};

use crate::decl::VarAssignDecl;
use crate::expr::Expr;

/// Any statement.
#[derive(Clone, Debug)]
pub enum Stmt {
    Return(ReturnStmt),
    Break(SourceRangeOnly),
    Continue(SourceRangeOnly),
    Compound(CompoundStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    Expr(Expr),
    Decl(VarAssignDecl),
    PoundDiagnostic(PoundDiagnosticStmt),
}

impl Stmt {
    pub fn range(&self) -> Option<&SourceRange> {
        match self {
            Stmt::Return(s) => s.range.as_ref(),
            Stmt::Break(s) | Stmt::Continue(s) => s.range.as_ref(),
            Stmt::Compound(s) => s.range.as_ref(),
            Stmt::If(s) => s.range.as_ref(),
            Stmt::While(s) => s.range.as_ref(),
            Stmt::For(s) => s.range.as_ref(),
            Stmt::Switch(s) => s.range.as_ref(),
            Stmt::Expr(e) => e.range.as_ref(),
            Stmt::Decl(d) => d.range.as_ref(),
            Stmt::PoundDiagnostic(s) => s.range.as_ref(),
        }
    }
}

/// A statement that carries nothing but its source range
/// (`break`, `continue`).
#[derive(Clone, Debug, Default)]
pub struct SourceRangeOnly {
    pub range: Option<SourceRange>,
}

#[derive(Clone, Debug)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub range: Option<SourceRange>,
}

impl ReturnStmt {
    pub fn new(value: Option<Expr>) -> Self {
        ReturnStmt { value, range: None }
    }
}

/// A `{ ... }` block.
///
/// `has_return` is written once by path-return analysis: true when every
/// path through the block ends in a `return` or a call to a `noreturn`
/// function.
#[derive(Clone, Debug, Default)]
pub struct CompoundStmt {
    pub stmts: Vec<Stmt>,
    pub has_return: bool,
    pub range: Option<SourceRange>,
}

impl CompoundStmt {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        CompoundStmt { stmts, has_return: false, range: None }
    }
}

/// An `if`/`else if`/`else` chain. Each entry in `blocks` is one
/// condition + body pair, in source order.
#[derive(Clone, Debug)]
pub struct IfStmt {
    pub blocks: Vec<(Expr, CompoundStmt)>,
    pub else_block: Option<CompoundStmt>,
    pub range: Option<SourceRange>,
}

#[derive(Clone, Debug)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: CompoundStmt,
    pub range: Option<SourceRange>,
}

/// A C-style `for` loop; each header slot is optional.
#[derive(Clone, Debug)]
pub struct ForStmt {
    pub initializer: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub increment: Option<Expr>,
    pub body: CompoundStmt,
    pub range: Option<SourceRange>,
}

#[derive(Clone, Debug)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<CaseStmt>,
    pub default_body: Option<CompoundStmt>,
    pub range: Option<SourceRange>,
}

/// One `case constant:` arm of a switch.
#[derive(Clone, Debug)]
pub struct CaseStmt {
    pub constant: Expr,
    pub body: CompoundStmt,
    pub range: Option<SourceRange>,
}

/// A `#error "..."` or `#warning "..."` directive. Re-emitted verbatim as a
/// diagnostic at the start of analysis.
#[derive(Clone, Debug)]
pub struct PoundDiagnosticStmt {
    pub severity: Severity,
    pub text: String,
    pub range: Option<SourceRange>,
}
