//! Declaration-level checks: functions, operators, globals, protocols,
//! type members, locals, and path-return analysis.

use tarn_ast::{
    CompoundStmt, DataType, DeclRef, FuncId, FunctionKind, GlobalId, ProtocolId, Stmt, TypeId,
    VarAssignDecl, VarKind,
};

use super::SemanticAnalyzer;
use crate::context::LocalBinding;
use crate::error::SemaError;
use crate::scope::Binding;

impl SemanticAnalyzer<'_> {
    // ── Functions ───────────────────────────────────────────────────────

    /// Validate one function-like declaration and analyze its body.
    pub(crate) fn check_function(&mut self, id: FuncId) {
        self.check_function_signature(id);
        self.check_function_body(id);
    }

    pub(crate) fn check_function_signature(&mut self, id: FuncId) {
        self.check_function_signature_with(id, false);
    }

    /// `allow_bodiless` exempts protocol method requirements from the
    /// body-presence rule.
    fn check_function_signature_with(&mut self, id: FuncId, allow_bodiless: bool) {
        let decl = self.ctx.func(id);
        let name = decl.name.name.clone();
        let range = decl.range.clone();

        let mut errors = Vec::new();

        for modifier in decl.modifiers.iter() {
            if !modifier.is_valid_on(decl.decl_kind()) {
                errors.push(SemaError::InvalidModifier {
                    modifier: modifier.spelling().to_string(),
                    decl: format!("`{}`", name),
                    range: range.clone(),
                });
            }
        }

        if decl.is_foreign() && decl.body.is_some() {
            errors.push(SemaError::ForeignWithBody { name: name.clone(), range: range.clone() });
        }
        if !decl.is_foreign() && !decl.is_implicit() && decl.body.is_none() && !allow_bodiless {
            errors.push(SemaError::NonForeignWithoutBody {
                name: name.clone(),
                range: range.clone(),
            });
        }
        if decl.has_varargs && !decl.is_foreign() {
            errors.push(SemaError::VarArgsOnNonForeign { name: name.clone(), range: range.clone() });
        }

        if let FunctionKind::Deinitializer(parent) = &decl.kind {
            let parent = parent.clone();
            let indirect = self
                .ctx
                .type_decl_for(&parent)
                .is_some_and(|tid| self.ctx.type_decl(tid).is_indirect());
            if !indirect {
                errors.push(SemaError::DeinitOnNonIndirect {
                    type_name: parent.to_string(),
                    range: range.clone(),
                });
            }
        }

        // Parameter and return types must resolve.
        let decl = self.ctx.func(id);
        let param_types: Vec<(DataType, Option<tarn_common::SourceRange>)> = decl
            .params
            .iter()
            .map(|p| (p.type_annotation.ty.clone(), p.type_annotation.range.clone()))
            .collect();
        let ret = (decl.return_type.ty.clone(), decl.return_type.range.clone());
        for (ty, ty_range) in param_types.into_iter().chain(std::iter::once(ret)) {
            if !self.type_is_valid_in_signature(id, &ty) {
                errors.push(SemaError::UnknownType {
                    ty,
                    range: ty_range.or_else(|| range.clone()),
                });
            }
        }

        for error in errors {
            self.report(error);
        }
    }

    /// Signature types may also mention the declaration's own generic
    /// parameters.
    fn type_is_valid_in_signature(&self, id: FuncId, ty: &DataType) -> bool {
        if self.ctx.is_valid_type(ty) {
            return true;
        }
        let decl = self.ctx.func(id);
        match self.ctx.canonicalize(ty) {
            DataType::Custom(name) | DataType::TypeVariable(name) => {
                decl.generic_params.iter().any(|g| g.name == *name)
            }
            _ => false,
        }
    }

    /// Validate an operator declaration: exactly two parameters, never an
    /// assignment operator, then the usual function checks.
    pub(crate) fn check_operator(&mut self, id: FuncId) {
        let decl = self.ctx.func(id);
        if let FunctionKind::Operator(op) = decl.kind {
            let range = decl.range.clone();
            if !op.is_overloadable() {
                self.report(SemaError::OperatorCannotBeOverloaded { op, range: range.clone() });
            }
            let arity = self.ctx.func(id).explicit_params().len();
            if arity != 2 {
                self.report(SemaError::OperatorArity { op, found: arity, range });
            }
        }
        self.check_function(id);
    }

    /// Analyze a function body: bind parameters, walk statements, then run
    /// path-return analysis against the declared return type.
    fn check_function_body(&mut self, id: FuncId) {
        let Some(mut body) = self.ctx.func_mut(id).body.take() else {
            return;
        };

        let decl = self.ctx.func(id);
        let params = decl.params.clone();
        let ret = decl.return_type.ty.clone();
        let name = decl.name.name.clone();
        let noreturn = decl.is_noreturn();
        let range = decl.range.clone();

        self.with_function(id, ret.clone(), |this| {
            for (index, param) in params.iter().enumerate() {
                let ty = param.type_annotation.ty.clone();
                let mutable = this.binding_mutability(&ty, param.is_implicit_self);
                this.scopes.insert(
                    param.name.name.clone(),
                    Binding { decl: DeclRef::Param(id, index), ty, mutable },
                );
            }
            this.check_compound(&mut body);
        });

        let returns_value =
            !matches!(self.ctx.canonicalize(&ret), DataType::Void | DataType::Error);
        if returns_value && !noreturn && !body.has_return {
            self.report(SemaError::NotAllPathsReturn { name, range });
        }

        self.ctx.func_mut(id).body = Some(body);
    }

    /// Indirect instances live behind a pointer, so their bindings are
    /// implicitly mutable; everything else starts immutable.
    pub(crate) fn binding_mutability(&self, ty: &DataType, is_implicit_self: bool) -> bool {
        let canonical = self.ctx.canonicalize(ty);
        let indirect = self
            .ctx
            .type_decl_for(&canonical)
            .is_some_and(|tid| self.ctx.type_decl(tid).is_indirect());
        indirect || (is_implicit_self && canonical.is_pointer())
    }

    // ── Globals ─────────────────────────────────────────────────────────

    pub(crate) fn check_global(&mut self, id: GlobalId) {
        let global = self.ctx.global(id);
        let name = global.name.name.clone();
        let range = global.range.clone();
        let declared = global.type_annotation.as_ref().map(|t| t.ty.clone());
        let foreign = global.is_foreign();

        if let Some(declared) = &declared {
            if !self.ctx.is_valid_type(declared) {
                self.report(SemaError::UnknownType { ty: declared.clone(), range: range.clone() });
            }
        }

        let mut rhs = self.ctx.global_mut(id).rhs.take();
        if let Some(rhs_expr) = &mut rhs {
            if foreign {
                self.report(SemaError::ForeignVarWithValue { name, range: range.clone() });
            }
            let found = self.check_expr(rhs_expr, declared.as_ref());
            match &declared {
                Some(declared) => self.check_assignable(declared, &found, range),
                None => {
                    self.ctx.global_mut(id).type_annotation =
                        Some(tarn_ast::TypeAnnotation::new(found));
                }
            }
        }
        self.ctx.global_mut(id).rhs = rhs;

        // Indirect-typed globals are implicitly mutable.
        let global = self.ctx.global(id);
        if let Some(annotation) = &global.type_annotation {
            let ty = annotation.ty.clone();
            if self.binding_mutability(&ty, false) {
                self.ctx.global_mut(id).mutable = true;
            }
        }
    }

    // ── Protocols ───────────────────────────────────────────────────────

    pub(crate) fn check_protocol(&mut self, id: ProtocolId) {
        let requirements = self.ctx.protocol(id).requirements.clone();
        for req in requirements {
            // Requirements are signatures only; bodies are not analyzed
            // and absence of a body is not an error here.
            self.check_function_signature_with(req, true);
        }
    }

    // ── Type members ────────────────────────────────────────────────────

    pub(crate) fn check_type_members(&mut self, id: TypeId) {
        let decl = self.ctx.type_decl(id);
        let member_ids: Vec<FuncId> = decl
            .initializers
            .iter()
            .chain(decl.methods.iter())
            .chain(decl.static_methods.iter())
            .chain(decl.subscripts.iter())
            .chain(decl.deinitializer.iter())
            .copied()
            .collect();
        let property_count = decl.properties.len();

        // Property types and default values.
        for index in 0..property_count {
            let property = &self.ctx.type_decl(id).properties[index];
            let ty = property.type_annotation.ty.clone();
            let ty_range = property.type_annotation.range.clone();
            let accessors: Vec<FuncId> =
                property.getter.iter().chain(property.setter.iter()).copied().collect();
            if !self.ctx.is_valid_type(&ty) {
                self.report(SemaError::UnknownType { ty: ty.clone(), range: ty_range });
            }
            let mut default = self.ctx.type_decl_mut(id).properties[index].default_value.take();
            if let Some(default_expr) = &mut default {
                let found = self.check_expr(default_expr, Some(&ty));
                let range = default_expr.range.clone();
                self.check_assignable(&ty, &found, range);
            }
            self.ctx.type_decl_mut(id).properties[index].default_value = default;
            self.with_type(id, |this| {
                for accessor in accessors {
                    this.check_function(accessor);
                }
            });
        }

        self.with_type(id, |this| {
            for member in member_ids {
                if this.extension_methods.contains(&member) {
                    continue; // analyzed in the extensions pass
                }
                let is_implicit = this.ctx.func(member).is_implicit();
                if is_implicit {
                    continue;
                }
                this.check_function(member);
            }
        });
    }

    // ── Local variable declarations ─────────────────────────────────────

    pub(crate) fn check_local_decl(&mut self, decl: &mut VarAssignDecl) {
        let name = decl.name.name.clone();
        let range = decl.range.clone();

        if self.scopes.declared_in_current_frame(&name) {
            self.report(SemaError::DuplicateVar { name: name.clone(), range: range.clone() });
        }

        for modifier in decl.modifiers.iter() {
            if !modifier.is_valid_on(tarn_ast::DeclKind::Var) {
                self.report(SemaError::InvalidModifier {
                    modifier: modifier.spelling().to_string(),
                    decl: format!("`{}`", name),
                    range: range.clone(),
                });
            }
        }

        let declared = decl.type_annotation.as_ref().map(|t| t.ty.clone());
        if let Some(declared) = &declared {
            if !self.ctx.is_valid_type(declared) {
                self.report(SemaError::UnknownType {
                    ty: declared.clone(),
                    range: decl.type_annotation.as_ref().and_then(|t| t.range.clone()),
                });
            }
        }

        if decl.is_foreign() && decl.rhs.is_some() {
            self.report(SemaError::ForeignVarWithValue { name: name.clone(), range: range.clone() });
        }

        let ty = match (&declared, &mut decl.rhs) {
            (Some(declared), Some(rhs)) => {
                let found = self.check_expr(rhs, Some(declared));
                self.check_assignable(declared, &found, rhs.range.clone());
                declared.clone()
            }
            (Some(declared), None) => declared.clone(),
            (None, Some(rhs)) => {
                let inferred = self.check_expr(rhs, None);
                decl.type_annotation = Some(tarn_ast::TypeAnnotation::new(inferred.clone()));
                inferred
            }
            (None, None) => DataType::Error,
        };

        if self.binding_mutability(&ty, false) {
            decl.mutable = true;
        }

        decl.kind = VarKind::Local;
        let local = self.ctx.add_local(LocalBinding {
            name: decl.name.clone(),
            ty: ty.clone(),
            mutable: decl.mutable,
        });
        decl.local = Some(local);
        self.scopes.insert(name, Binding { decl: DeclRef::Local(local), ty, mutable: decl.mutable });
    }

    // ── Path-return analysis ────────────────────────────────────────────

    /// Does every path through the block end in a `return` or a call to a
    /// `noreturn` function? An `if` chain counts only when it has an
    /// `else` and every branch returns.
    pub(crate) fn block_always_returns(&self, block: &CompoundStmt) -> bool {
        block.stmts.iter().any(|stmt| self.stmt_always_returns(stmt))
    }

    pub(crate) fn stmt_always_returns(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Return(_) => true,
            Stmt::Expr(expr) => self.expr_is_noreturn_call(expr),
            Stmt::Compound(block) => self.block_always_returns(block),
            Stmt::If(if_stmt) => {
                let Some(else_block) = &if_stmt.else_block else {
                    return false;
                };
                if_stmt.blocks.iter().all(|(_, body)| self.block_always_returns(body))
                    && self.block_always_returns(else_block)
            }
            _ => false,
        }
    }

    fn expr_is_noreturn_call(&self, expr: &tarn_ast::Expr) -> bool {
        matches!(
            (&expr.kind, expr.decl),
            (tarn_ast::ExprKind::Call { .. }, Some(DeclRef::Func(id)))
                if self.ctx.func(id).is_noreturn()
        )
    }
}
