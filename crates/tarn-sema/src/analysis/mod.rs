//! The semantic analyzer.
//!
//! One instance walks a populated context exactly once, in a fixed pass
//! order that users observe through diagnostic order: pound diagnostics,
//! globals, protocols, types, aliases, functions, operators, extensions.
//! A registration phase runs first (extension merging, duplicate member
//! detection, layout-circularity, implicit initializer synthesis), and the
//! contextual type propagator runs after everything else.
//!
//! Scoped state (current function, current type, loop depth, closure
//! frames) is kept on the analyzer and updated through save-restore
//! helpers, so the previous value comes back on every exit path.

mod conformance;
mod decls;
mod exprs;
mod registration;
mod stmts;

use rustc_hash::FxHashSet;

use tarn_ast::{DataType, DeclRef, FuncId, TypeId};
use tarn_common::{Diagnostic, DiagnosticEngine};

use crate::context::Context;
use crate::error::SemaError;
use crate::scope::ScopeStack;

/// Captures being collected for one closure under analysis.
struct ClosureFrame {
    /// Scope depth at closure entry; bindings resolved in frames below
    /// this boundary are captures.
    barrier: usize,
    captures: Vec<DeclRef>,
    /// Loop depth saved at closure entry; `break` cannot cross a closure.
    saved_loop_depth: u32,
}

pub struct SemanticAnalyzer<'ctx> {
    pub ctx: &'ctx mut Context,
    pub engine: DiagnosticEngine,
    scopes: ScopeStack,
    current_function: Option<FuncId>,
    current_type: Option<TypeId>,
    /// Expected return type of the innermost function or closure body.
    return_stack: Vec<DataType>,
    loop_depth: u32,
    closure_frames: Vec<ClosureFrame>,
    /// Function ids contributed by extensions; their bodies are analyzed
    /// in the extensions pass rather than the types pass.
    extension_methods: FxHashSet<FuncId>,
}

impl<'ctx> SemanticAnalyzer<'ctx> {
    pub fn new(ctx: &'ctx mut Context) -> Self {
        SemanticAnalyzer {
            ctx,
            engine: DiagnosticEngine::new(),
            scopes: ScopeStack::new(),
            current_function: None,
            current_type: None,
            return_stack: Vec::new(),
            loop_depth: 0,
            closure_frames: Vec::new(),
            extension_methods: FxHashSet::default(),
        }
    }

    /// Record an error and keep going.
    pub(crate) fn report(&mut self, error: SemaError) {
        error.emit(&mut self.engine);
    }

    /// Run every pass over the context.
    pub fn run(&mut self) {
        registration::run(self);

        self.emit_pound_diagnostics();
        self.check_globals();
        self.check_protocols();
        self.check_types();
        self.check_aliases();
        self.check_free_functions();
        self.check_operators();
        self.check_extensions();
    }

    // ── Scoped-state helpers ────────────────────────────────────────────

    /// Install `id` as the current function with `ret` as the expected
    /// return type, run `f` in a fresh scope frame, restore everything.
    pub(crate) fn with_function<R>(
        &mut self,
        id: FuncId,
        ret: DataType,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.current_function.replace(id);
        self.return_stack.push(ret);
        self.scopes.push_frame();
        let result = f(self);
        self.scopes.pop_frame();
        self.return_stack.pop();
        self.current_function = previous;
        result
    }

    pub(crate) fn with_type<R>(&mut self, id: TypeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.current_type.replace(id);
        let result = f(self);
        self.current_type = previous;
        result
    }

    pub(crate) fn with_loop<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    pub(crate) fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub(crate) fn current_return_type(&self) -> Option<&DataType> {
        self.return_stack.last()
    }

    pub(crate) fn current_function(&self) -> Option<FuncId> {
        self.current_function
    }

    pub(crate) fn current_type(&self) -> Option<TypeId> {
        self.current_type
    }

    // ── Passes ──────────────────────────────────────────────────────────

    fn emit_pound_diagnostics(&mut self) {
        for pd in self.ctx.pound_diagnostics.clone() {
            let mut diag = Diagnostic::new(pd.severity, pd.text);
            if let Some(range) = pd.range {
                diag = diag.highlighting(range);
            }
            self.engine.add(diag);
        }
    }

    fn check_globals(&mut self) {
        for index in 0..self.ctx.globals.len() {
            self.check_global(tarn_ast::GlobalId(index as u32));
        }
    }

    fn check_protocols(&mut self) {
        for index in 0..self.ctx.protocols.len() {
            self.check_protocol(tarn_ast::ProtocolId(index as u32));
        }
    }

    fn check_types(&mut self) {
        for index in 0..self.ctx.types.len() {
            self.check_type_members(TypeId(index as u32));
        }
        for index in 0..self.ctx.types.len() {
            self.check_conformances(TypeId(index as u32));
        }
    }

    fn check_aliases(&mut self) {
        for index in 0..self.ctx.aliases.len() {
            let alias = &self.ctx.aliases[index];
            let target = alias.target.ty.clone();
            let range = alias.target.range.clone().or_else(|| alias.range.clone());
            if !self.ctx.is_valid_type(&target) {
                self.report(SemaError::UnknownType { ty: target, range });
            }
        }
    }

    fn check_free_functions(&mut self) {
        for index in 0..self.ctx.funcs.len() {
            let id = FuncId(index as u32);
            let decl = self.ctx.func(id);
            if matches!(decl.kind, tarn_ast::FunctionKind::Free) && !decl.is_implicit() {
                self.check_function(id);
            }
        }
    }

    fn check_operators(&mut self) {
        for index in 0..self.ctx.funcs.len() {
            let id = FuncId(index as u32);
            let decl = self.ctx.func(id);
            if matches!(decl.kind, tarn_ast::FunctionKind::Operator(_)) && !decl.is_implicit() {
                self.check_operator(id);
            }
        }
    }

    fn check_extensions(&mut self) {
        for index in 0..self.ctx.extensions.len() {
            let extension = &self.ctx.extensions[index];
            let extended = extension.extended.ty.clone();
            let members: Vec<FuncId> = extension
                .methods
                .iter()
                .chain(extension.subscripts.iter())
                .copied()
                .collect();
            let Some(type_id) = self.ctx.type_decl_for(&extended) else {
                // Reported during registration.
                continue;
            };
            self.with_type(type_id, |this| {
                for id in members {
                    this.check_function(id);
                }
            });
        }
    }
}
