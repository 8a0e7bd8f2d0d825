//! Expression analysis: name resolution, type checking, call and operator
//! overload resolution, mutability enforcement.
//!
//! `check_expr` is the single entry point. It computes the expression's
//! type bottom-up, consults the overload machinery at calls, subscripts,
//! and operators, and annotates `ty` and `decl` in place. Failed subtrees
//! get the poison `Error` type, which every later check treats as
//! already-reported.

use tarn_ast::{
    Argument, BuiltinOperator, DataType, DeclRef, Expr, ExprKind, FuncId, FunctionKind,
    StringSegment, TypeId,
};
use tarn_common::SourceRange;

use super::{ClosureFrame, SemanticAnalyzer};
use crate::context::LocalBinding;
use crate::error::SemaError;
use crate::overload::{formatted_candidates, resolve_call, OverloadResolution};
use crate::scope::Binding;

/// What a call site resolved to: a declaration from an overload set, or a
/// function-typed value (closure variable, function-typed property).
enum CallTarget {
    Decl(FuncId),
    Value,
}

impl SemanticAnalyzer<'_> {
    /// Annotate and return; the first write wins.
    fn annotate(&self, expr: &mut Expr, ty: DataType) -> DataType {
        if expr.ty.is_none() {
            expr.ty = Some(ty.clone());
        }
        ty
    }

    /// Assignment compatibility: used by `=`, variable declarations, and
    /// `return`. Downcasts from `Any` demand an explicit cast.
    pub(crate) fn check_assignable(
        &mut self,
        target: &DataType,
        found: &DataType,
        range: Option<SourceRange>,
    ) {
        if *found == DataType::Error || *target == DataType::Error {
            return;
        }
        let target_canonical = self.ctx.canonicalize(target);
        let found_canonical = self.ctx.canonicalize(found);
        if found_canonical == DataType::Any && target_canonical != DataType::Any {
            self.report(SemaError::CannotDowncastFromAny { target: target_canonical, range });
            return;
        }
        if found_canonical == DataType::NilLiteral {
            if !self.ctx.can_be_nil(&target_canonical) {
                self.report(SemaError::NonPointerNil { ty: Some(target_canonical), range });
            }
            return;
        }
        if self.ctx.match_rank(&target_canonical, &found_canonical).is_none() {
            self.report(SemaError::TypeMismatch {
                expected: target_canonical,
                found: found_canonical,
                range,
            });
        }
    }

    pub(crate) fn check_expr(&mut self, expr: &mut Expr, expected: Option<&DataType>) -> DataType {
        if let Some(existing) = &expr.ty {
            return existing.clone();
        }
        let range = expr.range.clone();
        let ty = match &mut expr.kind {
            ExprKind::Num { value, raw } => {
                let (value, raw) = (*value, raw.clone());
                self.check_int_literal(value, &raw, expected, range)
            }
            ExprKind::Float { .. } => match expected.map(|e| self.ctx.canonicalize(e)) {
                Some(e) if e.is_floating() => e,
                _ => DataType::double(),
            },
            ExprKind::Char { .. } => match expected.map(|e| self.ctx.canonicalize(e)) {
                Some(e) if e.is_integer() => e,
                _ => DataType::int8(),
            },
            ExprKind::Bool { .. } => DataType::Bool,
            ExprKind::Str { segments } => {
                for segment in segments.iter_mut() {
                    if let StringSegment::Interpolation(inner) = segment {
                        self.check_expr(inner, None);
                    }
                }
                DataType::string()
            }
            ExprKind::PoundFunction => {
                if self.current_function().is_none() {
                    self.report(SemaError::PoundFunctionOutsideFunction { range: range.clone() });
                }
                DataType::string()
            }
            ExprKind::Nil => match expected.map(|e| self.ctx.canonicalize(e)) {
                Some(e) if self.ctx.can_be_nil(&e) => e,
                other => {
                    self.report(SemaError::NonPointerNil { ty: other, range: range.clone() });
                    DataType::Error
                }
            },
            ExprKind::Void => DataType::Void,
            ExprKind::Var { .. } => return self.check_var(expr, expected),
            ExprKind::Paren { value } => self.check_expr(value, expected),
            ExprKind::Tuple { elements } => {
                let expected_fields = match expected.map(|e| self.ctx.canonicalize(e)) {
                    Some(DataType::Tuple(fields)) if fields.len() == elements.len() => {
                        Some(fields)
                    }
                    _ => None,
                };
                let mut fields = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter_mut().enumerate() {
                    let element_expected = expected_fields.as_ref().map(|f| f[index].clone());
                    fields.push(self.check_expr(element, element_expected.as_ref()));
                }
                DataType::Tuple(fields)
            }
            ExprKind::Array { elements } => self.check_array(elements, expected),
            ExprKind::TupleField { base, index } => {
                let index = *index;
                let base_ty = self.check_expr(base, None);
                match self.ctx.canonicalize(&base_ty) {
                    DataType::Tuple(fields) => {
                        if index < fields.len() {
                            fields[index].clone()
                        } else {
                            self.report(SemaError::TupleIndexOutOfBounds {
                                index,
                                arity: fields.len(),
                                range: range.clone(),
                            });
                            DataType::Error
                        }
                    }
                    DataType::Error => DataType::Error,
                    other => {
                        self.report(SemaError::TypeMismatch {
                            expected: DataType::Tuple(vec![]),
                            found: other,
                            range: range.clone(),
                        });
                        DataType::Error
                    }
                }
            }
            ExprKind::PropertyRef { .. } => return self.check_property_ref(expr),
            ExprKind::Subscript { .. } => return self.check_subscript(expr),
            ExprKind::Call { .. } => return self.check_call(expr),
            ExprKind::Prefix { .. } => return self.check_prefix(expr, expected),
            ExprKind::Infix { .. } => return self.check_infix(expr, expected),
            ExprKind::Ternary { condition, then_value, else_value } => {
                let cond_ty = self.check_expr(condition, Some(&DataType::Bool));
                if self.ctx.canonicalize(&cond_ty) != DataType::Bool && cond_ty != DataType::Error
                {
                    self.report(SemaError::NonBoolTernary {
                        found: cond_ty,
                        range: condition.range.clone(),
                    });
                }
                let then_ty = self.check_expr(then_value, expected);
                let else_expected = expected.cloned().or_else(|| Some(then_ty.clone()));
                let else_ty = self.check_expr(else_value, else_expected.as_ref());
                if then_ty == DataType::Error || else_ty == DataType::Error {
                    DataType::Error
                } else if self.ctx.match_rank(&then_ty, &else_ty).is_some() {
                    if self.ctx.canonicalize(&then_ty) == DataType::Any
                        || self.ctx.canonicalize(&else_ty) == DataType::Any
                    {
                        DataType::Any
                    } else {
                        then_ty
                    }
                } else {
                    self.report(SemaError::TypeMismatch {
                        expected: then_ty,
                        found: else_ty,
                        range: else_value.range.clone().or_else(|| range.clone()),
                    });
                    DataType::Error
                }
            }
            ExprKind::Closure(_) => return self.check_closure(expr),
            ExprKind::Sizeof { operand } => {
                match &operand.kind {
                    ExprKind::TypeRef { annotation } => {
                        let ty = annotation.ty.clone();
                        if !self.ctx.is_valid_type(&ty) {
                            self.report(SemaError::UnknownType {
                                ty,
                                range: operand.range.clone().or_else(|| range.clone()),
                            });
                        }
                    }
                    _ => {
                        self.check_expr(operand, None);
                    }
                }
                DataType::int()
            }
            ExprKind::Coercion { value, target } => {
                let target_ty = target.ty.clone();
                let target_range = target.range.clone();
                let value_ty = self.check_expr(value, None);
                if !self.ctx.is_valid_type(&target_ty) {
                    self.report(SemaError::UnknownType {
                        ty: target_ty,
                        range: target_range.or_else(|| range.clone()),
                    });
                    DataType::Error
                } else {
                    if value_ty != DataType::Error && !self.ctx.can_coerce(&value_ty, &target_ty)
                    {
                        self.report(SemaError::CannotCoerce {
                            from: value_ty,
                            to: target_ty.clone(),
                            range: range.clone(),
                        });
                    }
                    target_ty
                }
            }
            ExprKind::TypeCheck { value, target } => {
                let target_ty = target.ty.clone();
                let target_range = target.range.clone();
                let value_ty = self.check_expr(value, None);
                if !self.ctx.is_valid_type(&target_ty) {
                    self.report(SemaError::UnknownType {
                        ty: target_ty,
                        range: target_range.or_else(|| range.clone()),
                    });
                } else if value_ty != DataType::Error
                    && self.ctx.canonicalize(&value_ty) != DataType::Any
                {
                    // The outcome is statically known unless the value is
                    // an existential.
                    let always = self.ctx.match_rank(&value_ty, &target_ty).is_some();
                    self.report(SemaError::StaticTypeCheck { always, range: range.clone() });
                }
                DataType::Bool
            }
            ExprKind::TypeRef { annotation } => {
                let ty = annotation.ty.clone();
                if !self.ctx.is_valid_type(&ty) {
                    self.report(SemaError::UnknownType { ty: ty.clone(), range: range.clone() });
                    DataType::Error
                } else {
                    if let Some(tid) = self.ctx.type_decl_for(&ty) {
                        expr.decl = Some(DeclRef::Type(tid));
                    }
                    ty
                }
            }
            ExprKind::PromoteToAny { value } => {
                self.check_expr(value, None);
                DataType::Any
            }
        };
        self.annotate(expr, ty)
    }

    fn check_int_literal(
        &mut self,
        value: i64,
        raw: &str,
        expected: Option<&DataType>,
        range: Option<SourceRange>,
    ) -> DataType {
        let ty = match expected.map(|e| self.ctx.canonicalize(e)) {
            Some(e) if e.is_numeric() => e,
            _ => DataType::int(),
        };
        if let DataType::Int { width, signed } = &ty {
            let (width, signed) = (*width, *signed);
            if width < 64 || !signed {
                let (min, max) = if signed {
                    (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
                } else {
                    (0, (1i128 << width) - 1)
                };
                if i128::from(value) > max {
                    self.report(SemaError::Overflow {
                        raw: raw.to_string(),
                        ty: ty.clone(),
                        range,
                    });
                } else if i128::from(value) < min {
                    self.report(SemaError::Underflow {
                        raw: raw.to_string(),
                        ty: ty.clone(),
                        range,
                    });
                }
            }
        }
        ty
    }

    fn check_array(&mut self, elements: &mut [Expr], expected: Option<&DataType>) -> DataType {
        let expected_element = match expected.map(|e| self.ctx.canonicalize(e)) {
            Some(DataType::Array { element, .. }) => Some(*element),
            _ => None,
        };

        let mut element_ty: Option<DataType> = expected_element;
        for element in elements.iter_mut() {
            let found = self.check_expr(element, element_ty.as_ref());
            match &element_ty {
                None => element_ty = Some(found),
                Some(elem) => {
                    if found != DataType::Error && self.ctx.match_rank(elem, &found).is_none() {
                        self.report(SemaError::NonMatchingElementType {
                            expected: elem.clone(),
                            found,
                            range: element.range.clone(),
                        });
                    }
                }
            }
        }

        let element = element_ty.unwrap_or(DataType::Any);
        DataType::Array { element: Box::new(element), length: Some(elements.len()) }
    }

    // ── Names ───────────────────────────────────────────────────────────

    /// Resolution order: local bindings, globals, function overload sets,
    /// type names. `self` inside an initializer synthesizes the implicit
    /// binding on first use.
    fn check_var(&mut self, expr: &mut Expr, expected: Option<&DataType>) -> DataType {
        let range = expr.range.clone();
        let ExprKind::Var { name } = &expr.kind else { unreachable!("check_var on non-var") };
        let name = name.name.clone();

        if let Some((binding, frame)) = self.scopes.lookup(&name) {
            let binding = binding.clone();
            self.note_capture(&binding.decl, frame);
            expr.decl = Some(binding.decl);
            return self.annotate(expr, binding.ty);
        }

        // Implicit self inside an initializer.
        if name == "self" {
            if let (Some(type_id), Some(func)) = (self.current_type(), self.current_function()) {
                if matches!(self.ctx.func(func).kind, FunctionKind::Initializer(_)) {
                    let ty = self.ctx.type_decl(type_id).ty();
                    let local = self.ctx.add_local(LocalBinding {
                        name: tarn_common::Identifier::new("self"),
                        ty: ty.clone(),
                        mutable: true,
                    });
                    self.scopes.insert(
                        "self",
                        Binding { decl: DeclRef::Local(local), ty: ty.clone(), mutable: true },
                    );
                    expr.decl = Some(DeclRef::Local(local));
                    return self.annotate(expr, ty);
                }
            }
        }

        if let Some(global) = self.ctx.global_named(&name) {
            let ty = self
                .ctx
                .global(global)
                .type_annotation
                .as_ref()
                .map(|t| t.ty.clone())
                .unwrap_or(DataType::Error);
            expr.decl = Some(DeclRef::Global(global));
            return self.annotate(expr, ty);
        }

        let overloads = self.ctx.overloads(&name).to_vec();
        match overloads.as_slice() {
            [] => {}
            [only] => {
                expr.decl = Some(DeclRef::Func(*only));
                let ty = self.ctx.func(*only).call_type();
                return self.annotate(expr, ty);
            }
            _ => {
                // An overloaded name in value position needs a function
                // context to disambiguate.
                if let Some(expected) = expected {
                    let wanted = self.ctx.canonicalize(expected);
                    let matching: Vec<FuncId> = overloads
                        .iter()
                        .copied()
                        .filter(|id| {
                            self.ctx.canonicalize(&self.ctx.func(*id).call_type()) == wanted
                        })
                        .collect();
                    if let [only] = matching.as_slice() {
                        expr.decl = Some(DeclRef::Func(*only));
                        let ty = self.ctx.func(*only).call_type();
                        return self.annotate(expr, ty);
                    }
                }
                self.report(SemaError::AmbiguousOverload {
                    name,
                    candidates: formatted_candidates(self.ctx, &overloads),
                    range,
                });
                return self.annotate(expr, DataType::Error);
            }
        }

        if self.ctx.is_type_name(&name) {
            let ty = DataType::from_builtin_name(&name)
                .unwrap_or_else(|| DataType::Custom(name.clone()));
            if let Some(tid) = self.ctx.type_decl_for(&ty) {
                expr.decl = Some(DeclRef::Type(tid));
            }
            return self.annotate(expr, ty);
        }

        self.report(SemaError::UnknownVariable { name, range });
        self.annotate(expr, DataType::Error)
    }

    /// Record a capture when a binding from outside the innermost closure
    /// boundary is referenced.
    fn note_capture(&mut self, decl: &DeclRef, frame: usize) {
        if !matches!(decl, DeclRef::Local(_) | DeclRef::Param(..)) {
            return;
        }
        if let Some(closure) = self.closure_frames.last_mut() {
            if frame < closure.barrier && !closure.captures.contains(decl) {
                closure.captures.push(*decl);
            }
        }
    }

    // ── Property references ─────────────────────────────────────────────

    /// A `base.name` reference in value position: stored properties,
    /// unambiguous methods, and static members through a type name.
    fn check_property_ref(&mut self, expr: &mut Expr) -> DataType {
        let range = expr.range.clone();
        let ExprKind::PropertyRef { base, name } = &mut expr.kind else {
            unreachable!("check_property_ref on non-property")
        };
        let name = name.name.clone();
        let base_ty = self.check_expr(base, None);
        let is_static = matches!(base.decl, Some(DeclRef::Type(_)));

        let Some((type_id, type_name)) = self.property_base_type(&base_ty, range.clone()) else {
            return self.annotate(expr, DataType::Error);
        };

        if is_static {
            let statics: Vec<FuncId> = self
                .ctx
                .type_decl(type_id)
                .static_methods
                .iter()
                .copied()
                .filter(|id| self.ctx.func(*id).name == *name.as_str())
                .collect();
            if let [only] = statics.as_slice() {
                expr.decl = Some(DeclRef::Func(*only));
                let ty = self.ctx.func(*only).call_type();
                return self.annotate(expr, ty);
            }
            self.report(SemaError::UnknownProperty { type_name, name, range });
            return self.annotate(expr, DataType::Error);
        }

        if let Some(index) = self.ctx.type_decl(type_id).property_index(&name) {
            let ty = self.ctx.type_decl(type_id).properties[index].type_annotation.ty.clone();
            expr.decl = Some(DeclRef::Property(type_id, index));
            return self.annotate(expr, ty);
        }

        let methods: Vec<FuncId> = self
            .ctx
            .type_decl(type_id)
            .methods
            .iter()
            .copied()
            .filter(|id| self.ctx.func(*id).name == *name.as_str())
            .collect();
        match methods.as_slice() {
            [] => {
                self.report(SemaError::UnknownProperty { type_name, name, range });
                self.annotate(expr, DataType::Error)
            }
            [only] => {
                expr.decl = Some(DeclRef::Func(*only));
                let ty = self.ctx.func(*only).call_type();
                self.annotate(expr, ty)
            }
            _ => {
                self.report(SemaError::AmbiguousOverload {
                    name,
                    candidates: formatted_candidates(self.ctx, &methods),
                    range,
                });
                self.annotate(expr, DataType::Error)
            }
        }
    }

    /// Property access demands a nominal base: pointers must be
    /// dereferenced, tuples use field indices, functions have no fields.
    fn property_base_type(
        &mut self,
        base_ty: &DataType,
        range: Option<SourceRange>,
    ) -> Option<(TypeId, String)> {
        let canonical = self.ctx.canonicalize(base_ty);
        match canonical {
            DataType::Error => None,
            DataType::Pointer(_) => {
                self.report(SemaError::PointerPropertyAccess { ty: canonical, range });
                None
            }
            DataType::Tuple(_) => {
                self.report(SemaError::TuplePropertyAccess { ty: canonical, range });
                None
            }
            DataType::Function { .. } => {
                self.report(SemaError::FieldOfFunctionType { name: canonical.to_string(), range });
                None
            }
            ref other => match self.ctx.type_decl_for(other) {
                Some(tid) => Some((tid, self.ctx.type_decl(tid).name.name.clone())),
                None => {
                    self.report(SemaError::UnknownType { ty: canonical, range });
                    None
                }
            },
        }
    }

    // ── Subscripts ──────────────────────────────────────────────────────

    fn check_subscript(&mut self, expr: &mut Expr) -> DataType {
        let range = expr.range.clone();
        let ExprKind::Subscript { base, args } = &mut expr.kind else {
            unreachable!("check_subscript on non-subscript")
        };
        let base_ty = self.check_expr(base, None);
        for arg in args.iter_mut() {
            self.check_expr(&mut arg.value, None);
        }

        let canonical = self.ctx.canonicalize(&base_ty);
        let result = match canonical {
            DataType::Error => DataType::Error,
            DataType::Pointer(ref pointee) => {
                let pointee = (**pointee).clone();
                self.check_index_args(args, range);
                pointee
            }
            DataType::Array { ref element, .. } => {
                let element = (**element).clone();
                self.check_index_args(args, range);
                element
            }
            DataType::Custom(_) => {
                match self.ctx.type_decl_for(&canonical) {
                    Some(type_id) => {
                        let candidates = self.ctx.type_decl(type_id).subscripts.clone();
                        if candidates.is_empty() {
                            self.report(SemaError::CannotSubscript { ty: canonical, range });
                            DataType::Error
                        } else {
                            match self.resolve_candidates("subscript", &candidates, args, range)
                            {
                                Some((func, return_type)) => {
                                    expr.decl = Some(DeclRef::Func(func));
                                    return_type
                                }
                                None => DataType::Error,
                            }
                        }
                    }
                    None => {
                        self.report(SemaError::UnknownType { ty: canonical, range });
                        DataType::Error
                    }
                }
            }
            other => {
                self.report(SemaError::CannotSubscript { ty: other, range });
                DataType::Error
            }
        };
        self.annotate(expr, result)
    }

    /// Pointer and array subscripts take one integer index.
    fn check_index_args(&mut self, args: &[Argument], range: Option<SourceRange>) {
        if args.len() != 1 {
            self.report(SemaError::ArityMismatch { expected: 1, found: args.len(), range });
            return;
        }
        let index_ty = args[0].value.ty.clone().unwrap_or(DataType::Error);
        let canonical = self.ctx.canonicalize(&index_ty);
        if !canonical.is_integer() && canonical != DataType::Error {
            self.report(SemaError::TypeMismatch {
                expected: DataType::int(),
                found: canonical,
                range: args[0].value.range.clone(),
            });
        }
    }

    // ── Calls ───────────────────────────────────────────────────────────

    /// Calls classify by callee shape: `name(...)` reaches locals,
    /// overload sets, and initializers; `base.name(...)` reaches methods
    /// and static methods; anything else must be a function-typed value.
    fn check_call(&mut self, expr: &mut Expr) -> DataType {
        let range = expr.range.clone();

        {
            let ExprKind::Call { args, .. } = &mut expr.kind else {
                unreachable!("check_call on non-call")
            };
            for arg in args.iter_mut() {
                self.check_expr(&mut arg.value, None);
            }
        }

        enum Shape {
            Named(String),
            Method,
            Value,
        }
        let shape = {
            let ExprKind::Call { callee, .. } = &expr.kind else { unreachable!() };
            match &callee.kind {
                ExprKind::Var { name } => Shape::Named(name.name.clone()),
                ExprKind::PropertyRef { .. } => Shape::Method,
                _ => Shape::Value,
            }
        };

        let resolved = match shape {
            Shape::Named(name) => {
                let ExprKind::Call { callee, args } = &mut expr.kind else { unreachable!() };
                self.resolve_named_call(callee, &name, args, range.clone())
            }
            Shape::Method => {
                let ExprKind::Call { callee, args } = &mut expr.kind else { unreachable!() };
                self.resolve_method_call(callee, args, range.clone())
            }
            Shape::Value => {
                let callee_ty = {
                    let ExprKind::Call { callee, .. } = &mut expr.kind else { unreachable!() };
                    self.check_expr(callee, None)
                };
                let ret = {
                    let ExprKind::Call { args, .. } = &mut expr.kind else { unreachable!() };
                    self.check_args_against_function(&callee_ty, args, range)
                };
                let ty = ret.unwrap_or(DataType::Error);
                return self.annotate(expr, ty);
            }
        };

        match resolved {
            Some((CallTarget::Decl(func), return_type)) => {
                {
                    let ExprKind::Call { callee, .. } = &mut expr.kind else { unreachable!() };
                    if callee.decl.is_none() {
                        callee.decl = Some(DeclRef::Func(func));
                    }
                    if callee.ty.is_none() {
                        callee.ty = Some(self.ctx.func(func).call_type());
                    }
                }
                expr.decl = Some(DeclRef::Func(func));
                self.annotate(expr, return_type)
            }
            Some((CallTarget::Value, return_type)) => self.annotate(expr, return_type),
            None => self.annotate(expr, DataType::Error),
        }
    }

    /// `name(args)`: a function-typed binding, a free-function overload
    /// set, or a type name (an initializer call).
    fn resolve_named_call(
        &mut self,
        callee: &mut Expr,
        name: &str,
        args: &mut [Argument],
        range: Option<SourceRange>,
    ) -> Option<(CallTarget, DataType)> {
        if let Some((binding, frame)) = self.scopes.lookup(name) {
            let binding = binding.clone();
            self.note_capture(&binding.decl, frame);
            callee.decl = Some(binding.decl);
            callee.ty = Some(binding.ty.clone());
            let ret = self.check_args_against_function(&binding.ty, args, range)?;
            return Some((CallTarget::Value, ret));
        }

        if let Some(global) = self.ctx.global_named(name) {
            let ty = self
                .ctx
                .global(global)
                .type_annotation
                .as_ref()
                .map(|t| t.ty.clone())
                .unwrap_or(DataType::Error);
            callee.decl = Some(DeclRef::Global(global));
            callee.ty = Some(ty.clone());
            let ret = self.check_args_against_function(&ty, args, range)?;
            return Some((CallTarget::Value, ret));
        }

        let overloads = self.ctx.overloads(name).to_vec();
        if !overloads.is_empty() {
            return self
                .resolve_candidates(name, &overloads, args, range)
                .map(|(func, ret)| (CallTarget::Decl(func), ret));
        }

        if self.ctx.is_type_name(name) {
            let ty = DataType::from_builtin_name(name)
                .unwrap_or_else(|| DataType::Custom(name.to_string()));
            if let Some(tid) = self.ctx.type_decl_for(&ty) {
                callee.decl = Some(DeclRef::Type(tid));
                callee.ty = Some(ty);
                let initializers = self.ctx.type_decl(tid).initializers.clone();
                let label = self.ctx.type_decl(tid).name.name.clone();
                return self
                    .resolve_candidates(&label, &initializers, args, range)
                    .map(|(func, ret)| (CallTarget::Decl(func), ret));
            }
        }

        self.report(SemaError::UnknownFunction { name: name.to_string(), range });
        None
    }

    /// `base.name(args)`: instance methods, function-typed properties, or
    /// static methods when the base is a type name.
    fn resolve_method_call(
        &mut self,
        callee: &mut Expr,
        args: &mut [Argument],
        range: Option<SourceRange>,
    ) -> Option<(CallTarget, DataType)> {
        let ExprKind::PropertyRef { base, name } = &mut callee.kind else {
            unreachable!("resolve_method_call on non-property callee")
        };
        let method_name = name.name.clone();
        let base_ty = self.check_expr(base, None);
        let is_static = matches!(base.decl, Some(DeclRef::Type(_)));

        let (type_id, type_name) = self.property_base_type(&base_ty, range.clone())?;

        let pool: Vec<FuncId> = if is_static {
            self.ctx.type_decl(type_id).static_methods.clone()
        } else {
            self.ctx.type_decl(type_id).methods.clone()
        };
        let candidates: Vec<FuncId> = pool
            .into_iter()
            .filter(|id| self.ctx.func(*id).name == *method_name.as_str())
            .collect();

        if candidates.is_empty() {
            // A function-typed stored property called through the sugar.
            if !is_static {
                if let Some(index) = self.ctx.type_decl(type_id).property_index(&method_name) {
                    let prop_ty =
                        self.ctx.type_decl(type_id).properties[index].type_annotation.ty.clone();
                    if prop_ty.is_function() {
                        callee.decl = Some(DeclRef::Property(type_id, index));
                        callee.ty = Some(prop_ty.clone());
                        let ret = self.check_args_against_function(&prop_ty, args, range)?;
                        return Some((CallTarget::Value, ret));
                    }
                }
            }
            self.report(SemaError::UnknownProperty { type_name, name: method_name, range });
            return None;
        }

        let resolved = self.resolve_candidates(&method_name, &candidates, args, range.clone());

        if let Some((func, _)) = &resolved {
            if self.ctx.func(*func).is_mutating() {
                let base_mutable = self.expr_mutability(base).unwrap_or(false);
                if !base_mutable {
                    self.report(SemaError::MutatingOnImmutable { method: method_name, range });
                }
            }
        }
        resolved.map(|(func, ret)| (CallTarget::Decl(func), ret))
    }

    /// Run overload resolution and translate failures into diagnostics.
    fn resolve_candidates(
        &mut self,
        name: &str,
        candidates: &[FuncId],
        args: &[Argument],
        range: Option<SourceRange>,
    ) -> Option<(FuncId, DataType)> {
        match resolve_call(self.ctx, candidates, args, range.as_ref()) {
            OverloadResolution::Resolved { func, return_type, .. } => Some((func, return_type)),
            OverloadResolution::NoCandidates => {
                self.report(SemaError::UnknownFunction { name: name.to_string(), range });
                None
            }
            OverloadResolution::NoMatchingCandidates => {
                self.report(SemaError::NoViableOverload {
                    name: name.to_string(),
                    candidates: formatted_candidates(self.ctx, candidates),
                    range,
                });
                None
            }
            OverloadResolution::Ambiguity(tied) => {
                self.report(SemaError::AmbiguousOverload {
                    name: name.to_string(),
                    candidates: formatted_candidates(self.ctx, &tied),
                    range,
                });
                None
            }
        }
    }

    /// Check arguments against a function-typed value (a closure in a
    /// variable, a function-typed property): arity then pairwise
    /// assignability. No overloading and no labels here.
    fn check_args_against_function(
        &mut self,
        callee_ty: &DataType,
        args: &mut [Argument],
        range: Option<SourceRange>,
    ) -> Option<DataType> {
        let canonical = self.ctx.canonicalize(callee_ty);
        let DataType::Function { args: params, ret, has_varargs } = canonical else {
            if canonical != DataType::Error {
                self.report(SemaError::NotCallable { ty: canonical, range });
            }
            return None;
        };
        let arity_ok =
            if has_varargs { args.len() >= params.len() } else { args.len() == params.len() };
        if !arity_ok {
            self.report(SemaError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
                range,
            });
            return None;
        }
        for (param, arg) in params.iter().zip(args.iter_mut()) {
            self.ctx.propagate_contextual_type(param, &mut arg.value);
            let found = arg.value.ty.clone().unwrap_or(DataType::Error);
            self.check_assignable(param, &found, arg.value.range.clone());
        }
        Some(*ret)
    }

    // ── Operators ───────────────────────────────────────────────────────

    fn check_prefix(&mut self, expr: &mut Expr, expected: Option<&DataType>) -> DataType {
        let range = expr.range.clone();
        let ExprKind::Prefix { op, operand } = &mut expr.kind else {
            unreachable!("check_prefix on non-prefix")
        };
        let op = *op;

        let operand_expected = match op {
            BuiltinOperator::Sub => expected,
            _ => None,
        };
        let operand_ty = self.check_expr(operand, operand_expected);
        let canonical = self.ctx.canonicalize(&operand_ty);
        if canonical == DataType::Error {
            return self.annotate(expr, DataType::Error);
        }

        let ty = match op {
            BuiltinOperator::Mul => match canonical {
                DataType::Pointer(pointee) => *pointee,
                other => {
                    self.report(SemaError::InvalidOperands { op, lhs: other, rhs: None, range });
                    DataType::Error
                }
            },
            BuiltinOperator::BitAnd => {
                if self.expr_mutability(operand).is_none() {
                    self.report(SemaError::AddressOfRValue { range });
                    DataType::Error
                } else {
                    DataType::pointer_to(operand_ty)
                }
            }
            BuiltinOperator::Not => {
                if canonical == DataType::Bool {
                    DataType::Bool
                } else {
                    self.report(SemaError::InvalidOperands {
                        op,
                        lhs: canonical,
                        rhs: None,
                        range,
                    });
                    DataType::Error
                }
            }
            BuiltinOperator::BitNot => {
                if canonical.is_integer() {
                    operand_ty
                } else {
                    self.report(SemaError::InvalidOperands {
                        op,
                        lhs: canonical,
                        rhs: None,
                        range,
                    });
                    DataType::Error
                }
            }
            BuiltinOperator::Sub => {
                if canonical.is_numeric() {
                    operand_ty
                } else {
                    self.report(SemaError::InvalidOperands {
                        op,
                        lhs: canonical,
                        rhs: None,
                        range,
                    });
                    DataType::Error
                }
            }
            other => {
                self.report(SemaError::InvalidOperands {
                    op: other,
                    lhs: canonical,
                    rhs: None,
                    range,
                });
                DataType::Error
            }
        };
        self.annotate(expr, ty)
    }

    fn check_infix(&mut self, expr: &mut Expr, expected: Option<&DataType>) -> DataType {
        let range = expr.range.clone();
        let ExprKind::Infix { op, lhs, rhs } = &mut expr.kind else {
            unreachable!("check_infix on non-infix")
        };
        let op = *op;

        if op.is_assignment() {
            return self.check_assignment(expr, op);
        }

        // `nil` comparisons synthesize a nullable-equality overload.
        if matches!(op, BuiltinOperator::Equal | BuiltinOperator::NotEqual) {
            let lhs_is_nil = matches!(lhs.kind, ExprKind::Nil);
            let rhs_is_nil = matches!(rhs.kind, ExprKind::Nil);
            if lhs_is_nil != rhs_is_nil {
                let (nil_side, value_side) = if lhs_is_nil { (lhs, rhs) } else { (rhs, lhs) };
                let value_ty = self.check_expr(value_side, None);
                let canonical = self.ctx.canonicalize(&value_ty);
                if canonical == DataType::Error {
                    return self.annotate(expr, DataType::Error);
                }
                if !self.ctx.can_be_nil(&canonical) {
                    self.report(SemaError::NonPointerNil { ty: Some(canonical), range });
                    return self.annotate(expr, DataType::Error);
                }
                let candidate = self.ctx.nullable_equality_candidate(op, &canonical);
                nil_side.ty = Some(canonical);
                expr.decl = Some(DeclRef::Func(candidate));
                return self.annotate(expr, DataType::Bool);
            }
        }

        // Literal operands take their type from the other side.
        let lhs_ty = if lhs.is_literal_bearing() && !rhs.is_literal_bearing() {
            let rhs_probe = self.check_expr(rhs, None);
            self.check_expr(lhs, Some(&rhs_probe))
        } else {
            self.check_expr(lhs, expected.filter(|_| !op.is_comparison()))
        };
        let rhs_ty = if rhs.ty.is_none() && rhs.is_literal_bearing() {
            self.check_expr(rhs, Some(&lhs_ty))
        } else {
            self.check_expr(rhs, None)
        };

        if lhs_ty == DataType::Error || rhs_ty == DataType::Error {
            return self.annotate(expr, DataType::Error);
        }

        let lhs_canonical = self.ctx.canonicalize(&lhs_ty);
        let rhs_canonical = self.ctx.canonicalize(&rhs_ty);

        // Pointer arithmetic: pointer ± integer offset, pointer - pointer
        // distance.
        if matches!(op, BuiltinOperator::Add | BuiltinOperator::Sub) && lhs_canonical.is_pointer()
        {
            if rhs_canonical.is_integer() {
                return self.annotate(expr, lhs_ty);
            }
            if op == BuiltinOperator::Sub && rhs_canonical == lhs_canonical {
                return self.annotate(expr, DataType::int());
            }
        }

        if matches!(op, BuiltinOperator::LeftShift | BuiltinOperator::RightShift) {
            self.check_shift_width(&lhs_canonical, rhs, range.clone());
        }

        let candidates = self.ctx.operator_overloads(op).to_vec();
        let mut args = [
            Argument::unlabeled(std::mem::replace(&mut **lhs, Expr::new(ExprKind::Void))),
            Argument::unlabeled(std::mem::replace(&mut **rhs, Expr::new(ExprKind::Void))),
        ];
        let resolved = self.resolve_operator(op, &candidates, &mut args, range);
        let [lhs_back, rhs_back] = args;
        **lhs = lhs_back.value;
        **rhs = rhs_back.value;

        match resolved {
            Some((func, return_type)) => {
                expr.decl = Some(DeclRef::Func(func));
                self.annotate(expr, return_type)
            }
            None => self.annotate(expr, DataType::Error),
        }
    }

    /// Operator overload search, with `InvalidOperands` rather than the
    /// call-site diagnostics on failure.
    fn resolve_operator(
        &mut self,
        op: BuiltinOperator,
        candidates: &[FuncId],
        args: &mut [Argument; 2],
        range: Option<SourceRange>,
    ) -> Option<(FuncId, DataType)> {
        match resolve_call(self.ctx, candidates, args.as_slice(), range.as_ref()) {
            OverloadResolution::Resolved { func, return_type, .. } => Some((func, return_type)),
            OverloadResolution::Ambiguity(tied) => {
                self.report(SemaError::AmbiguousOverload {
                    name: op.symbol().to_string(),
                    candidates: formatted_candidates(self.ctx, &tied),
                    range,
                });
                None
            }
            _ => {
                self.report(SemaError::InvalidOperands {
                    op,
                    lhs: args[0].value.ty.clone().unwrap_or(DataType::Error),
                    rhs: Some(args[1].value.ty.clone().unwrap_or(DataType::Error)),
                    range,
                });
                None
            }
        }
    }

    fn check_shift_width(
        &mut self,
        lhs_canonical: &DataType,
        rhs: &Expr,
        range: Option<SourceRange>,
    ) {
        if let (DataType::Int { width, .. }, ExprKind::Num { value, .. }) =
            (lhs_canonical, &rhs.kind)
        {
            if *value >= i64::from(*width) {
                self.report(SemaError::ShiftPastBitWidth { amount: *value, width: *width, range });
            }
        }
    }

    fn check_assignment(&mut self, expr: &mut Expr, op: BuiltinOperator) -> DataType {
        let range = expr.range.clone();
        let ExprKind::Infix { lhs, rhs, .. } = &mut expr.kind else {
            unreachable!("check_assignment on non-infix")
        };

        let lhs_ty = self.check_expr(lhs, None);

        if self.expr_mutability(lhs) != Some(true) {
            // r-values and immutable bindings both reject assignment.
            let name = Self::assignable_name(lhs);
            self.report(SemaError::AssignToConstant { name, range: range.clone() });
        }

        let rhs_ty = self.check_expr(rhs, Some(&lhs_ty));
        if lhs_ty != DataType::Error && rhs_ty != DataType::Error {
            if matches!(rhs.kind, ExprKind::Nil) {
                if !self.ctx.can_be_nil(&lhs_ty) {
                    self.report(SemaError::NonPointerNil {
                        ty: Some(self.ctx.canonicalize(&lhs_ty)),
                        range: range.clone(),
                    });
                }
            } else if let Some(underlying) = op.underlying_op() {
                // Compound assignment resolves through the underlying
                // operator.
                let candidates = self.ctx.operator_overloads(underlying).to_vec();
                let mut args = [
                    Argument::unlabeled(std::mem::replace(&mut **lhs, Expr::new(ExprKind::Void))),
                    Argument::unlabeled(std::mem::replace(&mut **rhs, Expr::new(ExprKind::Void))),
                ];
                let resolved = self.resolve_operator(underlying, &candidates, &mut args, range);
                let [lhs_back, rhs_back] = args;
                **lhs = lhs_back.value;
                **rhs = rhs_back.value;
                if let Some((func, _)) = resolved {
                    expr.decl = Some(DeclRef::Func(func));
                }
            } else {
                self.check_assignable(&lhs_ty, &rhs_ty, range);
            }
        }

        self.annotate(expr, DataType::Void)
    }

    /// The name shown in assign-to-constant diagnostics.
    fn assignable_name(expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Var { name } => Some(name.name.clone()),
            ExprKind::PropertyRef { name, .. } => Some(name.name.clone()),
            ExprKind::Paren { value } => Self::assignable_name(value),
            _ => None,
        }
    }

    /// L-value analysis: `Some(mutable)` for places, `None` for
    /// temporaries.
    pub(crate) fn expr_mutability(&self, expr: &Expr) -> Option<bool> {
        match &expr.kind {
            ExprKind::Var { .. } => match expr.decl? {
                DeclRef::Local(id) => Some(self.ctx.local(id).mutable),
                DeclRef::Global(id) => Some(self.ctx.global(id).mutable),
                DeclRef::Param(func, index) => {
                    let param = &self.ctx.func(func).params[index];
                    Some(self.binding_mutability(&param.type_annotation.ty, param.is_implicit_self))
                }
                _ => None,
            },
            ExprKind::Paren { value } => self.expr_mutability(value),
            ExprKind::PropertyRef { base, .. } => {
                let base_canonical =
                    self.ctx.canonicalize(base.ty.as_ref().unwrap_or(&DataType::Error));
                // Properties of an indirect instance are reachable through
                // the pointer regardless of the binding's own mutability.
                let base_indirect = self
                    .ctx
                    .type_decl_for(&base_canonical)
                    .is_some_and(|tid| self.ctx.type_decl(tid).is_indirect());
                let property_mutable = match expr.decl? {
                    DeclRef::Property(type_id, index) => {
                        self.ctx.type_decl(type_id).properties[index].mutable
                    }
                    _ => return None,
                };
                if base_indirect {
                    Some(property_mutable)
                } else {
                    Some(property_mutable && self.expr_mutability(base)?)
                }
            }
            ExprKind::TupleField { base, .. } => self.expr_mutability(base),
            ExprKind::Subscript { base, .. } => {
                let base_canonical =
                    self.ctx.canonicalize(base.ty.as_ref().unwrap_or(&DataType::Error));
                if base_canonical.is_pointer() {
                    Some(true)
                } else {
                    self.expr_mutability(base)
                }
            }
            ExprKind::Prefix { op: BuiltinOperator::Mul, .. } => Some(true),
            _ => None,
        }
    }

    // ── Closures ────────────────────────────────────────────────────────

    fn check_closure(&mut self, expr: &mut Expr) -> DataType {
        let closure_range = expr.range.clone();
        let ExprKind::Closure(closure) = &mut expr.kind else {
            unreachable!("check_closure on non-closure")
        };

        let param_types: Vec<DataType> =
            closure.params.iter().map(|p| p.type_annotation.ty.clone()).collect();
        let ret = closure.return_type.as_ref().map(|t| t.ty.clone()).unwrap_or(DataType::Void);

        for (param, ty) in closure.params.iter().zip(&param_types) {
            if !self.ctx.is_valid_type(ty) {
                self.report(SemaError::UnknownType {
                    ty: ty.clone(),
                    range: param.type_annotation.range.clone(),
                });
            }
        }

        // A closure body is its own island: loops outside it are not
        // break targets, and outer locals reached from it are captures.
        let frame = ClosureFrame {
            barrier: self.scopes.depth(),
            captures: Vec::new(),
            saved_loop_depth: std::mem::take(&mut self.loop_depth),
        };
        self.closure_frames.push(frame);
        self.return_stack.push(ret.clone());
        self.scopes.push_frame();

        for (param, ty) in closure.params.iter().zip(&param_types) {
            let mutable = self.binding_mutability(ty, false);
            let local = self.ctx.add_local(LocalBinding {
                name: param.name.clone(),
                ty: ty.clone(),
                mutable,
            });
            self.scopes.insert(
                param.name.name.clone(),
                Binding { decl: DeclRef::Local(local), ty: ty.clone(), mutable },
            );
        }

        self.check_compound(&mut closure.body);

        self.scopes.pop_frame();
        self.return_stack.pop();
        let frame = self.closure_frames.pop().expect("closure frame pushed above");
        self.loop_depth = frame.saved_loop_depth;
        closure.captures = frame.captures;

        let has_return = closure.body.has_return;
        let returns_value = !matches!(self.ctx.canonicalize(&ret), DataType::Void);
        if returns_value && !has_return {
            self.report(SemaError::NotAllPathsReturn {
                name: "closure".to_string(),
                range: closure_range,
            });
        }

        let ty = DataType::function(param_types, ret);
        self.annotate(expr, ty)
    }
}
