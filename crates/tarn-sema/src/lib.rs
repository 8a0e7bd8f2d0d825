//! Semantic analysis for the Tarn compiler.
//!
//! The parser populates a [`Context`] with declarations; [`analyze`] then
//! runs the whole front-end pipeline over it: registration, declaration
//! checks, name resolution, constraint-based type checking with overload
//! resolution, control-flow analysis, protocol conformance, and the
//! contextual type propagation post-pass. Afterwards every expression
//! carries a resolved type (or an error was reported) and every name,
//! call, operator, and property reference carries a declaration handle,
//! which is the contract the code generator relies on.

pub mod analysis;
pub mod builtins;
pub mod constraint;
pub mod context;
pub mod error;
pub mod overload;
pub mod propagate;
pub mod scope;
pub mod solve;

pub use analysis::SemanticAnalyzer;
pub use constraint::{CoercionKind, Constraint, ConstraintGenerator, ConstraintKind, Punishments};
pub use context::{Context, LocalBinding, MainFuncFlags, SourceFile, TypeRank};
pub use error::SemaError;
pub use overload::{resolve_call, OverloadResolution};
pub use solve::{solve_system, ConstraintSolution, SolveError};

use tarn_common::DiagnosticEngine;

/// Run semantic analysis over a populated context and return the
/// diagnostics, in emission order.
pub fn analyze(ctx: &mut Context) -> DiagnosticEngine {
    let engine = {
        let mut analyzer = SemanticAnalyzer::new(ctx);
        analyzer.run();
        std::mem::take(&mut analyzer.engine)
    };
    propagate::run(ctx);
    engine
}
