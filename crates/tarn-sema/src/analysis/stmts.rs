//! Statement analysis and control-flow checks.

use tarn_ast::{CompoundStmt, DataType, ExprKind, Stmt};
use tarn_common::Diagnostic;

use super::SemanticAnalyzer;
use crate::error::SemaError;

impl SemanticAnalyzer<'_> {
    /// Analyze a block in a fresh scope frame, warn about statements that
    /// follow a terminator, and record whether every path returns.
    pub(crate) fn check_compound(&mut self, block: &mut CompoundStmt) {
        self.scopes.push_frame();

        let mut terminated = false;
        let mut dead_code_reported = false;
        for stmt in &mut block.stmts {
            if terminated && !dead_code_reported {
                self.report(SemaError::DeadCode { range: stmt.range().cloned() });
                dead_code_reported = true;
            }
            self.check_stmt(stmt);
            if !terminated && self.stmt_terminates(stmt) {
                terminated = true;
            }
        }

        self.scopes.pop_frame();
        block.has_return = self.block_always_returns(block);
    }

    /// A statement after which the rest of the block is unreachable.
    fn stmt_terminates(&self, stmt: &Stmt) -> bool {
        matches!(stmt, Stmt::Break(_) | Stmt::Continue(_)) || self.stmt_always_returns(stmt)
    }

    pub(crate) fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Return(ret) => {
                let expected = self.current_return_type().cloned();
                let range = ret.range.clone();
                match (&mut ret.value, expected) {
                    (Some(value), Some(expected)) => {
                        let found = self.check_expr(value, Some(&expected));
                        if self.ctx.canonicalize(&expected) == DataType::Void {
                            self.report(SemaError::TypeMismatch {
                                expected: DataType::Void,
                                found,
                                range: value.range.clone().or(range),
                            });
                        } else {
                            self.check_assignable(&expected, &found, value.range.clone());
                        }
                    }
                    (None, Some(expected)) => {
                        if self.ctx.canonicalize(&expected) != DataType::Void {
                            self.report(SemaError::TypeMismatch {
                                expected,
                                found: DataType::Void,
                                range,
                            });
                        }
                    }
                    (Some(value), None) => {
                        self.check_expr(value, None);
                    }
                    (None, None) => {}
                }
            }

            Stmt::Break(s) => {
                if !self.in_loop() {
                    self.report(SemaError::BreakOutsideLoop { range: s.range.clone() });
                }
            }
            Stmt::Continue(s) => {
                if !self.in_loop() {
                    self.report(SemaError::ContinueOutsideLoop { range: s.range.clone() });
                }
            }

            Stmt::Compound(block) => self.check_compound(block),

            Stmt::If(if_stmt) => {
                for (condition, body) in &mut if_stmt.blocks {
                    self.check_condition(condition);
                    self.check_compound(body);
                }
                if let Some(else_block) = &mut if_stmt.else_block {
                    self.check_compound(else_block);
                }
            }

            Stmt::While(while_stmt) => {
                self.check_condition(&mut while_stmt.condition);
                self.with_loop(|this| this.check_compound(&mut while_stmt.body));
            }

            Stmt::For(for_stmt) => {
                self.scopes.push_frame();
                if let Some(initializer) = &mut for_stmt.initializer {
                    self.check_stmt(initializer);
                }
                if let Some(condition) = &mut for_stmt.condition {
                    self.check_condition(condition);
                }
                if let Some(increment) = &mut for_stmt.increment {
                    self.check_expr(increment, None);
                }
                self.with_loop(|this| this.check_compound(&mut for_stmt.body));
                self.scopes.pop_frame();
            }

            Stmt::Switch(switch) => self.check_switch(switch),

            Stmt::Expr(expr) => {
                self.check_expr(expr, None);
            }

            Stmt::Decl(decl) => self.check_local_decl(decl),

            Stmt::PoundDiagnostic(pd) => {
                let mut diag = Diagnostic::new(pd.severity, pd.text.clone());
                if let Some(range) = &pd.range {
                    diag = diag.highlighting(range.clone());
                }
                self.engine.add(diag);
            }
        }
    }

    fn check_condition(&mut self, condition: &mut tarn_ast::Expr) {
        let found = self.check_expr(condition, Some(&DataType::Bool));
        if self.ctx.canonicalize(&found) != DataType::Bool && found != DataType::Error {
            self.report(SemaError::NonBoolCondition { found, range: condition.range.clone() });
        }
    }

    /// Switch checking: the subject is analyzed, then every case constant
    /// must be a compile-time constant whose type supports `==` with the
    /// subject. A pointer subject admits only `nil` cases.
    fn check_switch(&mut self, switch: &mut tarn_ast::SwitchStmt) {
        let subject_ty = self.check_expr(&mut switch.subject, None);
        let subject_canonical = self.ctx.canonicalize(&subject_ty);

        if subject_canonical == DataType::Error {
            // Already reported; still walk the arms.
            for case in &mut switch.cases {
                if !matches!(case.constant.kind, ExprKind::Nil) {
                    self.check_expr(&mut case.constant, None);
                }
                self.check_compound(&mut case.body);
            }
            if let Some(default_body) = &mut switch.default_body {
                self.check_compound(default_body);
            }
            return;
        }

        for case in &mut switch.cases {
            let constant_range = case.constant.range.clone();

            if !Self::is_constant_case(&case.constant) {
                self.report(SemaError::NonConstantCase { range: constant_range.clone() });
                self.check_expr(&mut case.constant, None);
                self.check_compound(&mut case.body);
                continue;
            }

            if subject_canonical.is_pointer() {
                if matches!(case.constant.kind, ExprKind::Nil) {
                    // Pointer equality against nil is synthesized.
                    let candidate = self.ctx.nullable_equality_candidate(
                        tarn_ast::BuiltinOperator::Equal,
                        &subject_canonical,
                    );
                    case.constant.ty = Some(subject_canonical.clone());
                    case.constant.decl = Some(tarn_ast::DeclRef::Func(candidate));
                } else {
                    self.report(SemaError::CannotSwitch {
                        ty: subject_canonical.clone(),
                        range: constant_range.clone(),
                    });
                    self.check_expr(&mut case.constant, None);
                }
                self.check_compound(&mut case.body);
                continue;
            }

            let case_ty = self.check_expr(&mut case.constant, Some(&subject_ty));
            if case_ty != DataType::Error
                && !self.case_resolves_to_global_constant(&case.constant)
            {
                self.report(SemaError::NonConstantCase { range: constant_range });
                self.check_compound(&mut case.body);
                continue;
            }
            if !self.supports_equality(&subject_canonical, &case_ty) {
                self.report(SemaError::CannotSwitch {
                    ty: subject_canonical.clone(),
                    range: constant_range,
                });
            }
            self.check_compound(&mut case.body);
        }

        if let Some(default_body) = &mut switch.default_body {
            self.check_compound(default_body);
        }
    }

    /// Case constants: literals, or references to immutable globals.
    fn is_constant_case(expr: &tarn_ast::Expr) -> bool {
        match &expr.kind {
            ExprKind::Num { .. }
            | ExprKind::Float { .. }
            | ExprKind::Char { .. }
            | ExprKind::Bool { .. }
            | ExprKind::Str { .. }
            | ExprKind::Nil => true,
            ExprKind::Prefix { operand, .. } => Self::is_constant_case(operand),
            ExprKind::Var { .. } => true, // checked against its resolution below
            _ => false,
        }
    }

    /// A name used as a case constant must have resolved to an immutable
    /// global; locals and parameters are not constants.
    fn case_resolves_to_global_constant(&self, expr: &tarn_ast::Expr) -> bool {
        match &expr.kind {
            ExprKind::Var { .. } => match expr.decl {
                Some(tarn_ast::DeclRef::Global(id)) => !self.ctx.global(id).mutable,
                _ => false,
            },
            ExprKind::Prefix { operand, .. } => self.case_resolves_to_global_constant(operand),
            _ => true, // literals
        }
    }

    /// Is there an `==` overload whose operand types match the pair?
    fn supports_equality(&self, subject: &DataType, case: &DataType) -> bool {
        if *case == DataType::Error {
            return true; // already reported
        }
        self.ctx
            .operator_overloads(tarn_ast::BuiltinOperator::Equal)
            .iter()
            .any(|id| {
                let decl = self.ctx.func(*id);
                decl.params.len() == 2
                    && self.ctx.match_rank(&decl.params[0].type_annotation.ty, subject).is_some()
                    && self.ctx.match_rank(&decl.params[1].type_annotation.ty, case).is_some()
            })
    }
}
