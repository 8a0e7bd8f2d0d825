//! The Tarn abstract syntax tree.
//!
//! Three closed node families (declarations, statements, expressions) plus
//! the structural type algebra [`DataType`] and the builtin operator set.
//! The tree is owning: parents exclusively own children, and references
//! *into* the declaration arenas (owned by the compilation context) are
//! typed indices, never pointers, so no reference cycles can form.
//!
//! The parser builds these nodes; semantic analysis is the only pass that
//! mutates them, filling in `ty`, `decl`, `kind`, and `has_return` fields.

pub mod decl;
pub mod expr;
pub mod op;
pub mod stmt;
pub mod ty;
pub mod walk;

pub use decl::{
    Accessor, AliasId, DeclKind, DeclModifier, DeclRef, ExtensionDecl, ExtensionId, FuncDecl,
    FuncId, FunctionKind, GenericParamDecl, GlobalId, LocalId, ModifierSet, ParamDecl,
    PropertyDecl, ProtocolDecl, ProtocolId, TypeAliasDecl, TypeAnnotation, TypeDecl, TypeId,
    VarAssignDecl, VarKind,
};
pub use expr::{Argument, ClosureExpr, Expr, ExprKind, StringSegment};
pub use op::BuiltinOperator;
pub use stmt::{
    CaseStmt, CompoundStmt, ForStmt, IfStmt, PoundDiagnosticStmt, ReturnStmt, Stmt, SwitchStmt,
    WhileStmt,
};
pub use ty::{DataType, FloatKind};
pub use walk::Walker;
