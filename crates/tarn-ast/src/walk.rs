//! Generic mutable traversal over statements and expressions.
//!
//! A pass implements [`Walker`] and overrides the `visit_*` hooks it cares
//! about; every hook defaults to the structural `walk_*` function so
//! unhandled variants recurse automatically. Because the hooks take `&mut`
//! nodes, passes annotate the tree in place. Declaration-level iteration is
//! not part of the trait: declarations live in context arenas and each pass
//! drives its own order over them.

use crate::decl::VarAssignDecl;
use crate::expr::{Expr, ExprKind, StringSegment};
use crate::stmt::{CompoundStmt, Stmt};

pub trait Walker: Sized {
    fn visit_expr(&mut self, expr: &mut Expr) {
        walk_expr(self, expr);
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_compound(&mut self, block: &mut CompoundStmt) {
        walk_compound(self, block);
    }

    fn visit_var_decl(&mut self, decl: &mut VarAssignDecl) {
        walk_var_decl(self, decl);
    }
}

/// Recurse into every child expression of `expr`.
pub fn walk_expr<W: Walker>(walker: &mut W, expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Num { .. }
        | ExprKind::Float { .. }
        | ExprKind::Char { .. }
        | ExprKind::Bool { .. }
        | ExprKind::PoundFunction
        | ExprKind::Nil
        | ExprKind::Void
        | ExprKind::Var { .. }
        | ExprKind::TypeRef { .. } => {}
        ExprKind::Str { segments } => {
            for segment in segments {
                if let StringSegment::Interpolation(inner) = segment {
                    walker.visit_expr(inner);
                }
            }
        }
        ExprKind::Paren { value } => walker.visit_expr(value),
        ExprKind::Tuple { elements } | ExprKind::Array { elements } => {
            for element in elements {
                walker.visit_expr(element);
            }
        }
        ExprKind::TupleField { base, .. } => walker.visit_expr(base),
        ExprKind::PropertyRef { base, .. } => walker.visit_expr(base),
        ExprKind::Subscript { base, args } => {
            walker.visit_expr(base);
            for arg in args {
                walker.visit_expr(&mut arg.value);
            }
        }
        ExprKind::Call { callee, args } => {
            walker.visit_expr(callee);
            for arg in args {
                walker.visit_expr(&mut arg.value);
            }
        }
        ExprKind::Prefix { operand, .. } => walker.visit_expr(operand),
        ExprKind::Infix { lhs, rhs, .. } => {
            walker.visit_expr(lhs);
            walker.visit_expr(rhs);
        }
        ExprKind::Ternary { condition, then_value, else_value } => {
            walker.visit_expr(condition);
            walker.visit_expr(then_value);
            walker.visit_expr(else_value);
        }
        ExprKind::Closure(closure) => walker.visit_compound(&mut closure.body),
        ExprKind::Sizeof { operand } => walker.visit_expr(operand),
        ExprKind::Coercion { value, .. } | ExprKind::TypeCheck { value, .. } => {
            walker.visit_expr(value)
        }
        ExprKind::PromoteToAny { value } => walker.visit_expr(value),
    }
}

/// Recurse into every child of `stmt`.
pub fn walk_stmt<W: Walker>(walker: &mut W, stmt: &mut Stmt) {
    match stmt {
        Stmt::Return(ret) => {
            if let Some(value) = &mut ret.value {
                walker.visit_expr(value);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::PoundDiagnostic(_) => {}
        Stmt::Compound(block) => walker.visit_compound(block),
        Stmt::If(if_stmt) => {
            for (condition, body) in &mut if_stmt.blocks {
                walker.visit_expr(condition);
                walker.visit_compound(body);
            }
            if let Some(else_block) = &mut if_stmt.else_block {
                walker.visit_compound(else_block);
            }
        }
        Stmt::While(while_stmt) => {
            walker.visit_expr(&mut while_stmt.condition);
            walker.visit_compound(&mut while_stmt.body);
        }
        Stmt::For(for_stmt) => {
            if let Some(initializer) = &mut for_stmt.initializer {
                walker.visit_stmt(initializer);
            }
            if let Some(condition) = &mut for_stmt.condition {
                walker.visit_expr(condition);
            }
            if let Some(increment) = &mut for_stmt.increment {
                walker.visit_expr(increment);
            }
            walker.visit_compound(&mut for_stmt.body);
        }
        Stmt::Switch(switch) => {
            walker.visit_expr(&mut switch.subject);
            for case in &mut switch.cases {
                walker.visit_expr(&mut case.constant);
                walker.visit_compound(&mut case.body);
            }
            if let Some(default_body) = &mut switch.default_body {
                walker.visit_compound(default_body);
            }
        }
        Stmt::Expr(expr) => walker.visit_expr(expr),
        Stmt::Decl(decl) => walker.visit_var_decl(decl),
    }
}

pub fn walk_compound<W: Walker>(walker: &mut W, block: &mut CompoundStmt) {
    for stmt in &mut block.stmts {
        walker.visit_stmt(stmt);
    }
}

pub fn walk_var_decl<W: Walker>(walker: &mut W, decl: &mut VarAssignDecl) {
    if let Some(rhs) = &mut decl.rhs {
        walker.visit_expr(rhs);
    }
}
