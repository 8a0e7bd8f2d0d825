//! Overload resolution.
//!
//! A call site filters its candidate set by shape (arity and argument
//! labels), then attempts a constraint solve per surviving candidate with
//! that candidate provisionally installed. Successful solutions are
//! compared lexicographically by punishment severity; a unique minimum
//! wins, equal minima are ambiguous.

use tarn_ast::{Argument, DataType, FuncId};
use tarn_common::{Identifier, SourceRange};

use crate::constraint::ConstraintGenerator;
use crate::context::Context;
use crate::solve::{solve_system, ConstraintSolution};

/// The outcome of resolving a call site.
#[derive(Debug)]
pub enum OverloadResolution {
    Resolved { func: FuncId, solution: ConstraintSolution, return_type: DataType },
    /// The candidate set was empty: the name resolves to nothing callable.
    NoCandidates,
    /// Candidates existed but none solved.
    NoMatchingCandidates,
    /// More than one candidate solved equally well.
    Ambiguity(Vec<FuncId>),
}

/// Does the argument list fit the candidate's shape? Checks arity (exact,
/// or at-least for varargs), argument labels against declared external
/// names in order, and that a vararg tail is unlabeled. Implicit self is
/// skipped throughout.
fn matches_shape(ctx: &Context, candidate: FuncId, args: &[Argument]) -> bool {
    let decl = ctx.func(candidate);
    let params = decl.explicit_params();

    if decl.has_varargs {
        if args.len() < params.len() {
            return false;
        }
    } else if args.len() != params.len() {
        return false;
    }

    for (param, arg) in params.iter().zip(args) {
        let param_label = param.external_name.as_ref().map(Identifier::as_str);
        let arg_label = arg.label.as_ref().map(Identifier::as_str);
        if param_label != arg_label {
            return false;
        }
    }

    // The vararg tail is always unlabeled.
    args[params.len()..].iter().all(|arg| arg.label.is_none())
}

/// Resolve `args` against `candidates`.
///
/// `range` anchors the constraints generated for the call so solver
/// failures report at the call site.
pub fn resolve_call(
    ctx: &Context,
    candidates: &[FuncId],
    args: &[Argument],
    range: Option<&SourceRange>,
) -> OverloadResolution {
    if candidates.is_empty() {
        return OverloadResolution::NoCandidates;
    }

    let shaped: Vec<FuncId> = candidates
        .iter()
        .copied()
        .filter(|c| matches_shape(ctx, *c, args))
        .collect();
    if shaped.is_empty() {
        return OverloadResolution::NoMatchingCandidates;
    }

    // Solve once per candidate; discard candidates whose system fails.
    let mut solved: Vec<(FuncId, ConstraintSolution, DataType)> = Vec::new();
    for candidate in shaped {
        let decl = ctx.func(candidate);
        let params = decl.explicit_params();

        let mut generator = ConstraintGenerator::new(ctx);
        let result_meta = generator.fresh_meta();

        let mut arg_goals = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let expected = params.get(index).map(|p| &p.type_annotation.ty);
            arg_goals.push(generator.goal(&arg.value, expected));
        }

        let call_shape = DataType::Function {
            args: arg_goals,
            ret: Box::new(result_meta.clone()),
            has_varargs: false,
        };
        generator.constrain_equal(
            call_shape,
            decl.call_type(),
            range.cloned(),
            "call_site",
        );

        // Whatever a constrained generic parameter binds to must conform
        // to its declared protocols.
        for generic in &decl.generic_params {
            for constraint in &generic.constraints {
                generator.constrain_conforms(
                    generic.ty(),
                    DataType::Custom(constraint.name.clone()),
                    range.cloned(),
                    "generic_constraint",
                );
            }
        }

        let punishments = generator.punishments;
        if let Ok(solution) = solve_system(ctx, &generator.constraints, punishments) {
            let return_type = ctx.canonicalize(&solution.apply(&result_meta));
            solved.push((candidate, solution, return_type));
        }
    }

    if solved.is_empty() {
        return OverloadResolution::NoMatchingCandidates;
    }

    // Pick the minimum by punishments; ties are ambiguous.
    let best = solved
        .iter()
        .map(|(_, solution, _)| solution.punishments)
        .min()
        .expect("solved is non-empty");
    let mut winners: Vec<(FuncId, ConstraintSolution, DataType)> = solved
        .into_iter()
        .filter(|(_, solution, _)| solution.punishments == best)
        .collect();

    if winners.len() > 1 {
        return OverloadResolution::Ambiguity(winners.into_iter().map(|(id, _, _)| id).collect());
    }
    let (func, solution, return_type) = winners.remove(0);
    OverloadResolution::Resolved { func, solution, return_type }
}

/// Format every candidate's signature for the `candidates` note attached
/// to resolution failures.
pub fn formatted_candidates(ctx: &Context, candidates: &[FuncId]) -> Vec<String> {
    candidates
        .iter()
        .map(|id| ctx.func(*id).formatted_signature())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_ast::{Expr, FuncDecl, ParamDecl};

    fn context_with_f() -> (Context, Vec<FuncId>) {
        let mut ctx = Context::new();
        let by_int = ctx
            .add_function(FuncDecl::new(
                "f",
                vec![ParamDecl::unlabeled("x", DataType::int())],
                DataType::int(),
            ))
            .unwrap();
        let by_double = ctx
            .add_function(FuncDecl::new(
                "f",
                vec![ParamDecl::unlabeled("x", DataType::double())],
                DataType::int(),
            ))
            .unwrap();
        (ctx, vec![by_int, by_double])
    }

    #[test]
    fn integer_literal_prefers_int_overload() {
        let (ctx, candidates) = context_with_f();
        let args = [Argument::unlabeled(Expr::num(1))];
        match resolve_call(&ctx, &candidates, &args, None) {
            OverloadResolution::Resolved { func, return_type, solution } => {
                assert_eq!(func, candidates[0]);
                assert_eq!(return_type, DataType::int());
                assert!(solution.punishments.is_empty());
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn float_literal_prefers_double_overload() {
        let (ctx, candidates) = context_with_f();
        let args = [Argument::unlabeled(Expr::float(1.0))];
        match resolve_call(&ctx, &candidates, &args, None) {
            OverloadResolution::Resolved { func, .. } => assert_eq!(func, candidates[1]),
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn string_argument_matches_nothing() {
        let (ctx, candidates) = context_with_f();
        let args = [Argument::unlabeled(Expr::string("oops"))];
        assert!(matches!(
            resolve_call(&ctx, &candidates, &args, None),
            OverloadResolution::NoMatchingCandidates
        ));
        let formatted = formatted_candidates(&ctx, &candidates);
        assert_eq!(formatted, vec!["f(_: Int) -> Int", "f(_: Double) -> Int"]);
    }

    #[test]
    fn empty_candidate_set() {
        let ctx = Context::new();
        assert!(matches!(
            resolve_call(&ctx, &[], &[], None),
            OverloadResolution::NoCandidates
        ));
    }

    #[test]
    fn labels_must_match_exactly_in_order() {
        let mut ctx = Context::new();
        let id = ctx
            .add_function(FuncDecl::new(
                "move",
                vec![
                    ParamDecl::labeled("from", DataType::int()),
                    ParamDecl::labeled("to", DataType::int()),
                ],
                DataType::Void,
            ))
            .unwrap();

        let good = [
            Argument::labeled("from", Expr::num(1)),
            Argument::labeled("to", Expr::num(2)),
        ];
        assert!(matches!(
            resolve_call(&ctx, &[id], &good, None),
            OverloadResolution::Resolved { .. }
        ));

        let swapped = [
            Argument::labeled("to", Expr::num(1)),
            Argument::labeled("from", Expr::num(2)),
        ];
        assert!(matches!(
            resolve_call(&ctx, &[id], &swapped, None),
            OverloadResolution::NoMatchingCandidates
        ));

        let unlabeled = [Argument::unlabeled(Expr::num(1)), Argument::unlabeled(Expr::num(2))];
        assert!(matches!(
            resolve_call(&ctx, &[id], &unlabeled, None),
            OverloadResolution::NoMatchingCandidates
        ));
    }

    #[test]
    fn varargs_accepts_unlabeled_tail() {
        let mut ctx = Context::new();
        let mut decl = FuncDecl::new(
            "printf",
            vec![ParamDecl::unlabeled("fmt", DataType::string())],
            DataType::int32(),
        );
        decl.has_varargs = true;
        decl.modifiers.insert(tarn_ast::decl::DeclModifier::Foreign);
        let id = ctx.add_function(decl).unwrap();

        let args = [
            Argument::unlabeled(Expr::string("%d %d")),
            Argument::unlabeled(Expr::num(1)),
            Argument::unlabeled(Expr::num(2)),
        ];
        match resolve_call(&ctx, &[id], &args, None) {
            OverloadResolution::Resolved { return_type, .. } => {
                assert_eq!(return_type, DataType::int32());
            }
            other => panic!("expected resolution, got {:?}", other),
        }

        let labeled_tail = [
            Argument::unlabeled(Expr::string("%d")),
            Argument::labeled("value", Expr::num(1)),
        ];
        assert!(matches!(
            resolve_call(&ctx, &[id], &labeled_tail, None),
            OverloadResolution::NoMatchingCandidates
        ));
    }

    #[test]
    fn exact_tie_is_ambiguous() {
        let mut ctx = Context::new();
        // Same call shape through an alias: distinct mangles, identical
        // canonical signatures.
        ctx.add_alias(tarn_ast::TypeAliasDecl::new("Id", DataType::int())).unwrap();
        let a = ctx
            .add_function(FuncDecl::new(
                "g",
                vec![ParamDecl::unlabeled("x", DataType::int())],
                DataType::Void,
            ))
            .unwrap();
        let b = ctx
            .add_function(FuncDecl::new(
                "g",
                vec![ParamDecl::unlabeled("x", DataType::custom("Id"))],
                DataType::Void,
            ))
            .unwrap();
        let args = [Argument::unlabeled(Expr::num(7))];
        match resolve_call(&ctx, &[a, b], &args, None) {
            OverloadResolution::Ambiguity(ids) => assert_eq!(ids, vec![a, b]),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn any_parameter_loses_to_exact_match() {
        let mut ctx = Context::new();
        let any = ctx
            .add_function(FuncDecl::new(
                "h",
                vec![ParamDecl::unlabeled("x", DataType::Any)],
                DataType::Void,
            ))
            .unwrap();
        let exact = ctx
            .add_function(FuncDecl::new(
                "h",
                vec![ParamDecl::unlabeled("x", DataType::int())],
                DataType::Void,
            ))
            .unwrap();
        let args = [Argument::unlabeled(Expr::num(1))];
        match resolve_call(&ctx, &[any, exact], &args, None) {
            OverloadResolution::Resolved { func, .. } => assert_eq!(func, exact),
            other => panic!("expected resolution, got {:?}", other),
        }
    }
}
