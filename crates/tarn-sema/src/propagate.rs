//! Contextual type propagation.
//!
//! Two pieces live here. `Context::propagate_contextual_type` reshapes a
//! literal-bearing expression in place when a contextual type admits it
//! (an `Int8` parameter turns the literal `1` into an `Int8`, an array
//! context types its elements, and so on). The `TypePropagator` is the
//! post-resolution walker that pushes every parent's chosen type back
//! down into literal children -- call arguments from parameter types,
//! operands from operator signatures, elements from container types --
//! and wraps concrete values flowing into `Any` contexts in an implicit
//! promotion node.

use tarn_ast::walk::{walk_expr, Walker};
use tarn_ast::{DataType, DeclRef, Expr, ExprKind, FuncId, VarAssignDecl};

use crate::context::Context;

impl Context {
    /// Reshape a literal-bearing expression to the contextual type.
    /// Returns whether anything changed. Non-literal expressions and
    /// incompatible contexts are left untouched.
    pub fn propagate_contextual_type(&self, contextual: &DataType, expr: &mut Expr) -> bool {
        let contextual = self.canonicalize(contextual);
        self.propagate_canonical(&contextual, expr)
    }

    fn propagate_canonical(&self, contextual: &DataType, expr: &mut Expr) -> bool {
        let admitted = match &mut expr.kind {
            ExprKind::Num { .. } | ExprKind::Char { .. } => contextual.is_numeric(),
            ExprKind::Float { .. } => contextual.is_floating(),
            ExprKind::Str { .. } => matches!(
                contextual,
                DataType::Pointer(inner)
                    if **inner == DataType::int8() || **inner == DataType::uint8()
            ),
            ExprKind::Nil => self.can_be_nil(contextual),
            ExprKind::Paren { value } => {
                let changed = self.propagate_canonical(contextual, value);
                if changed {
                    expr.ty = Some(contextual.clone());
                }
                return changed;
            }
            ExprKind::Array { elements } => {
                let DataType::Array { element, .. } = contextual else {
                    return false;
                };
                let mut changed = false;
                for elem in elements.iter_mut() {
                    changed |= self.propagate_canonical(element, elem);
                }
                if changed {
                    expr.ty = Some(DataType::Array {
                        element: element.clone(),
                        length: Some(elements.len()),
                    });
                }
                return changed;
            }
            ExprKind::Tuple { elements } => {
                let DataType::Tuple(fields) = contextual else {
                    return false;
                };
                if fields.len() != elements.len() {
                    return false;
                }
                let mut changed = false;
                for (field, elem) in fields.iter().zip(elements.iter_mut()) {
                    changed |= self.propagate_canonical(field, elem);
                }
                if changed {
                    expr.ty = Some(contextual.clone());
                }
                return changed;
            }
            ExprKind::Infix { lhs, rhs, op } => {
                // Arithmetic over two literals follows the context.
                if !op.is_overloadable() || op.is_comparison() {
                    return false;
                }
                if !(lhs.is_literal_bearing() && rhs.is_literal_bearing()) {
                    return false;
                }
                let changed = self.propagate_canonical(contextual, lhs)
                    | self.propagate_canonical(contextual, rhs);
                if changed {
                    expr.ty = Some(contextual.clone());
                }
                return changed;
            }
            ExprKind::Ternary { then_value, else_value, .. } => {
                let changed = self.propagate_canonical(contextual, then_value)
                    | self.propagate_canonical(contextual, else_value);
                if changed {
                    expr.ty = Some(contextual.clone());
                }
                return changed;
            }
            _ => false,
        };

        if !admitted {
            return false;
        }
        let changed = expr.ty.as_ref() != Some(contextual);
        if changed {
            expr.ty = Some(contextual.clone());
        }
        changed
    }
}

/// Run the propagation post-pass over every function body and global
/// initializer in the context.
pub fn run(ctx: &mut Context) {
    for index in 0..ctx.funcs.len() {
        let id = FuncId(index as u32);
        let Some(mut body) = ctx.funcs[id.index()].body.take() else {
            continue;
        };
        let return_type = ctx.funcs[id.index()].return_type.ty.clone();
        TypePropagator { ctx, return_type }.visit_compound(&mut body);
        ctx.funcs[id.index()].body = Some(body);
    }

    for index in 0..ctx.globals.len() {
        let Some(mut rhs) = ctx.globals[index].rhs.take() else {
            continue;
        };
        let declared = ctx.globals[index].type_annotation.as_ref().map(|t| t.ty.clone());
        if let Some(declared) = &declared {
            push_context(ctx, declared, &mut rhs);
        }
        TypePropagator { ctx, return_type: DataType::Void }.visit_expr(&mut rhs);
        ctx.globals[index].rhs = Some(rhs);
    }
}

/// Push one contextual type into one child: promote into `Any` contexts,
/// otherwise reshape literals.
fn push_context(ctx: &Context, contextual: &DataType, child: &mut Expr) {
    let contextual_canonical = ctx.canonicalize(contextual);
    if contextual_canonical == DataType::Any {
        promote_to_any(child);
        return;
    }
    if child.is_literal_bearing() {
        ctx.propagate_contextual_type(&contextual_canonical, child);
    }
}

/// Wrap a concrete value in the implicit existential promotion node.
/// Idempotent: already-`Any` values and existing wrappers are left alone.
fn promote_to_any(child: &mut Expr) {
    if child.ty.as_ref() == Some(&DataType::Any)
        || matches!(child.kind, ExprKind::PromoteToAny { .. })
    {
        return;
    }
    let range = child.range.clone();
    let inner = std::mem::replace(child, Expr::new(ExprKind::Void));
    *child = Expr {
        kind: ExprKind::PromoteToAny { value: Box::new(inner) },
        range,
        ty: Some(DataType::Any),
        decl: None,
    };
}

/// The post-pass walker. Parents push their resolved expectations into
/// children before recursion continues downward.
struct TypePropagator<'a> {
    ctx: &'a Context,
    return_type: DataType,
}

impl TypePropagator<'_> {
    /// The parameter types a resolved call imposes on its arguments,
    /// implicit self excluded.
    fn param_types(&self, func: FuncId) -> Vec<DataType> {
        self.ctx
            .func(func)
            .explicit_params()
            .iter()
            .map(|p| p.type_annotation.ty.clone())
            .collect()
    }
}

impl Walker for TypePropagator<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        match (&mut expr.kind, expr.decl) {
            (ExprKind::Call { args, .. }, Some(DeclRef::Func(func))) => {
                let params = self.param_types(func);
                for (param, arg) in params.iter().zip(args.iter_mut()) {
                    push_context(self.ctx, param, &mut arg.value);
                }
            }
            (ExprKind::Infix { lhs, rhs, op }, decl) => {
                if let Some(DeclRef::Func(func)) = decl {
                    let params = self.param_types(func);
                    if params.len() == 2 {
                        push_context(self.ctx, &params[0], lhs);
                        push_context(self.ctx, &params[1], rhs);
                    }
                } else if op.is_assignment() {
                    if let Some(lhs_ty) = lhs.ty.clone() {
                        push_context(self.ctx, &lhs_ty, rhs);
                    }
                } else if matches!(op, tarn_ast::BuiltinOperator::Add | tarn_ast::BuiltinOperator::Sub)
                {
                    // Pointer arithmetic: the offset operand is an Int.
                    let lhs_is_pointer = lhs
                        .ty
                        .as_ref()
                        .is_some_and(|t| self.ctx.canonicalize(t).is_pointer());
                    if lhs_is_pointer && rhs.is_literal_bearing() {
                        push_context(self.ctx, &DataType::int(), rhs);
                    }
                }
            }
            (ExprKind::Subscript { args, .. }, Some(DeclRef::Func(func))) => {
                let params = self.param_types(func);
                for (param, arg) in params.iter().zip(args.iter_mut()) {
                    push_context(self.ctx, param, &mut arg.value);
                }
            }
            (ExprKind::Array { elements }, _) => {
                if let Some(DataType::Array { element, .. }) =
                    expr.ty.as_ref().map(|t| self.ctx.canonicalize(t))
                {
                    for elem in elements.iter_mut() {
                        push_context(self.ctx, &element, elem);
                    }
                }
            }
            (ExprKind::Tuple { elements }, _) => {
                if let Some(DataType::Tuple(fields)) =
                    expr.ty.as_ref().map(|t| self.ctx.canonicalize(t))
                {
                    if fields.len() == elements.len() {
                        for (field, elem) in fields.iter().zip(elements.iter_mut()) {
                            push_context(self.ctx, field, elem);
                        }
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }

    fn visit_stmt(&mut self, stmt: &mut tarn_ast::Stmt) {
        if let tarn_ast::Stmt::Return(ret) = stmt {
            if let Some(value) = &mut ret.value {
                let return_type = self.return_type.clone();
                push_context(self.ctx, &return_type, value);
            }
        }
        tarn_ast::walk::walk_stmt(self, stmt);
    }

    fn visit_var_decl(&mut self, decl: &mut VarAssignDecl) {
        if let (Some(annotation), Some(rhs)) = (&decl.type_annotation, &mut decl.rhs) {
            push_context(self.ctx, &annotation.ty.clone(), rhs);
        }
        tarn_ast::walk::walk_var_decl(self, decl);
    }
}
