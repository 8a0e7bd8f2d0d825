//! Integration tests for overload resolution at call sites: literal
//! ranking, candidate notes, labels, and ambiguity.

use tarn_ast::{
    Argument, CompoundStmt, DataType, DeclRef, Expr, ExprKind, FuncDecl, FuncId, ParamDecl, Stmt,
};
use tarn_ast::stmt::ReturnStmt;
use tarn_common::{DiagnosticEngine, Severity};
use tarn_sema::{analyze, Context};

// ── Helpers ────────────────────────────────────────────────────────────

fn assert_no_errors(engine: &DiagnosticEngine) {
    assert!(
        !engine.has_errors(),
        "expected no errors, got: {:?}",
        engine.diagnostics()
    );
}

/// Register `func f(_ x: Int) -> Int` and `func f(_ x: Double) -> Int`.
fn register_f_overloads(ctx: &mut Context) -> (FuncId, FuncId) {
    let by_int = ctx
        .add_function(
            FuncDecl::new("f", vec![ParamDecl::unlabeled("x", DataType::int())], DataType::int())
                .with_body(CompoundStmt::new(vec![Stmt::Return(ReturnStmt::new(Some(
                    Expr::var("x"),
                )))])),
        )
        .unwrap();
    let by_double = ctx
        .add_function(
            FuncDecl::new(
                "f",
                vec![ParamDecl::unlabeled("x", DataType::double())],
                DataType::int(),
            )
            .with_body(CompoundStmt::new(vec![Stmt::Return(ReturnStmt::new(Some(
                Expr::num(0),
            )))])),
        )
        .unwrap();
    (by_int, by_double)
}

/// Wrap a single expression statement in a `main` body and register it.
fn register_main_with(ctx: &mut Context, stmts: Vec<Stmt>) -> FuncId {
    ctx.add_function(
        FuncDecl::new("main", vec![], DataType::Void).with_body(CompoundStmt::new(stmts)),
    )
    .unwrap()
}

/// Dig the first expression statement back out of a function body.
fn first_expr(ctx: &Context, func: FuncId) -> &Expr {
    let body = ctx.func(func).body.as_ref().expect("body survives analysis");
    match &body.stmts[0] {
        Stmt::Expr(expr) => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

// ── Literal ranking ────────────────────────────────────────────────────

/// 7a. `f(1)` resolves to the `Int` overload; no literal promotion is
///     needed so the exact match wins.
#[test]
fn integer_literal_selects_int_overload() {
    let mut ctx = Context::new();
    let (by_int, _) = register_f_overloads(&mut ctx);
    let call = Expr::call(Expr::var("f"), vec![Argument::unlabeled(Expr::num(1))]);
    let main = register_main_with(&mut ctx, vec![Stmt::Expr(call)]);

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);

    let call = first_expr(&ctx, main);
    assert_eq!(call.decl, Some(DeclRef::Func(by_int)));
    assert_eq!(call.ty, Some(DataType::int()));
}

/// 7b. `f(1.0)` resolves to the `Double` overload.
#[test]
fn float_literal_selects_double_overload() {
    let mut ctx = Context::new();
    let (_, by_double) = register_f_overloads(&mut ctx);
    let call = Expr::call(Expr::var("f"), vec![Argument::unlabeled(Expr::float(1.0))]);
    let main = register_main_with(&mut ctx, vec![Stmt::Expr(call)]);

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);

    let call = first_expr(&ctx, main);
    assert_eq!(call.decl, Some(DeclRef::Func(by_double)));
}

/// 7c. `f("")` matches neither overload; the error lists both candidates
///     as notes.
#[test]
fn string_argument_lists_both_candidates() {
    let mut ctx = Context::new();
    register_f_overloads(&mut ctx);
    let call = Expr::call(Expr::var("f"), vec![Argument::unlabeled(Expr::string(""))]);
    register_main_with(&mut ctx, vec![Stmt::Expr(call)]);

    let engine = analyze(&mut ctx);
    assert!(engine.has_errors());
    let diags = engine.diagnostics();
    let error_index = diags
        .iter()
        .position(|d| d.message.contains("no viable overload of `f`"))
        .expect("overload failure reported");
    let notes: Vec<_> = diags[error_index + 1..]
        .iter()
        .take_while(|d| d.severity == Severity::Note)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        notes,
        vec!["candidate: f(_: Int) -> Int", "candidate: f(_: Double) -> Int"]
    );
}

// ── Labels ─────────────────────────────────────────────────────────────

/// Argument labels are part of the signature: they must match the
/// declared external names exactly and in order.
#[test]
fn labels_participate_in_resolution() {
    let mut ctx = Context::new();
    ctx.add_function(
        FuncDecl::new(
            "move_to",
            vec![ParamDecl::labeled("x", DataType::int()), ParamDecl::labeled("y", DataType::int())],
            DataType::Void,
        )
        .with_body(CompoundStmt::new(vec![])),
    )
    .unwrap();

    let good = Expr::call(
        Expr::var("move_to"),
        vec![
            Argument::labeled("x", Expr::num(1)),
            Argument::labeled("y", Expr::num(2)),
        ],
    );
    let bad = Expr::call(
        Expr::var("move_to"),
        vec![
            Argument::labeled("y", Expr::num(1)),
            Argument::labeled("x", Expr::num(2)),
        ],
    );
    register_main_with(&mut ctx, vec![Stmt::Expr(good), Stmt::Expr(bad)]);

    let engine = analyze(&mut ctx);
    assert_eq!(engine.error_count(), 1, "only the swapped labels fail: {:?}", engine.diagnostics());
}

// ── Ambiguity ──────────────────────────────────────────────────────────

/// Two overloads that solve equally well are ambiguous.
#[test]
fn equal_solutions_are_ambiguous() {
    let mut ctx = Context::new();
    ctx.add_alias(tarn_ast::TypeAliasDecl::new("Id", DataType::int())).unwrap();
    ctx.add_function(
        FuncDecl::new("g", vec![ParamDecl::unlabeled("x", DataType::int())], DataType::Void)
            .with_body(CompoundStmt::new(vec![])),
    )
    .unwrap();
    ctx.add_function(
        FuncDecl::new("g", vec![ParamDecl::unlabeled("x", DataType::custom("Id"))], DataType::Void)
            .with_body(CompoundStmt::new(vec![])),
    )
    .unwrap();

    let call = Expr::call(Expr::var("g"), vec![Argument::unlabeled(Expr::num(3))]);
    register_main_with(&mut ctx, vec![Stmt::Expr(call)]);

    let engine = analyze(&mut ctx);
    assert!(
        engine.diagnostics().iter().any(|d| d.message.contains("ambiguous reference to `g`")),
        "expected ambiguity, got: {:?}",
        engine.diagnostics()
    );
}

// ── Ranking against Any ────────────────────────────────────────────────

/// An exact parameter beats an `Any` parameter; with only the `Any`
/// overload present the call still succeeds.
#[test]
fn any_overload_is_last_resort() {
    let mut ctx = Context::new();
    let any_id = ctx
        .add_function(
            FuncDecl::new("show", vec![ParamDecl::unlabeled("x", DataType::Any)], DataType::Void)
                .with_body(CompoundStmt::new(vec![])),
        )
        .unwrap();
    let int_id = ctx
        .add_function(
            FuncDecl::new("show", vec![ParamDecl::unlabeled("x", DataType::int())], DataType::Void)
                .with_body(CompoundStmt::new(vec![])),
        )
        .unwrap();

    let exact = Expr::call(Expr::var("show"), vec![Argument::unlabeled(Expr::num(1))]);
    let fallback = Expr::call(Expr::var("show"), vec![Argument::unlabeled(Expr::string("hi"))]);
    let main = register_main_with(&mut ctx, vec![Stmt::Expr(exact), Stmt::Expr(fallback)]);

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);

    let body = ctx.func(main).body.as_ref().unwrap();
    let decls: Vec<_> = body
        .stmts
        .iter()
        .map(|s| match s {
            Stmt::Expr(e) => e.decl,
            _ => None,
        })
        .collect();
    assert_eq!(decls[0], Some(DeclRef::Func(int_id)));
    assert_eq!(decls[1], Some(DeclRef::Func(any_id)));

    // The string argument flowing into the Any parameter is wrapped in
    // the implicit promotion node by the propagation pass.
    let Stmt::Expr(fallback) = &body.stmts[1] else { unreachable!() };
    let ExprKind::Call { args, .. } = &fallback.kind else { unreachable!() };
    assert!(matches!(args[0].value.kind, ExprKind::PromoteToAny { .. }));
}

/// A constrained generic parameter accepts conforming types and rejects
/// the rest.
#[test]
fn generic_constraints_gate_candidates() {
    let mut ctx = Context::new();

    // protocol Drawable { func draw() }
    let requirement = FuncDecl::new("draw", vec![], DataType::Void)
        .with_kind(tarn_ast::FunctionKind::Method(DataType::custom("Drawable")));
    let req_id = ctx.insert_func(requirement);
    let mut drawable = tarn_ast::ProtocolDecl::new("Drawable");
    drawable.requirements.push(req_id);
    ctx.add_protocol(drawable).unwrap();

    // type Circle: Drawable { func draw() {} }, type Blob {}
    let circle_ty = DataType::custom("Circle");
    let draw = FuncDecl::new(
        "draw",
        vec![ParamDecl::implicit_self(circle_ty.clone())],
        DataType::Void,
    )
    .with_kind(tarn_ast::FunctionKind::Method(circle_ty))
    .with_body(CompoundStmt::new(vec![]));
    let draw_id = ctx.insert_func(draw);
    let mut circle = tarn_ast::TypeDecl::new("Circle");
    circle.conformances.push(tarn_common::Identifier::new("Drawable"));
    circle.methods.push(draw_id);
    ctx.add_type(circle).unwrap();
    ctx.add_type(tarn_ast::TypeDecl::new("Blob")).unwrap();

    // func render<T: Drawable>(_ x: T) { }
    let mut generic = tarn_ast::GenericParamDecl::new("T");
    generic.constraints.push(tarn_common::Identifier::new("Drawable"));
    let mut render = FuncDecl::new(
        "render",
        vec![ParamDecl::unlabeled("x", DataType::TypeVariable("T".into()))],
        DataType::Void,
    )
    .with_body(CompoundStmt::new(vec![]));
    render.generic_params.push(generic);
    ctx.add_function(render).unwrap();

    let good = Expr::call(
        Expr::var("render"),
        vec![Argument::unlabeled(Expr::call(Expr::var("Circle"), vec![]))],
    );
    let bad = Expr::call(
        Expr::var("render"),
        vec![Argument::unlabeled(Expr::call(Expr::var("Blob"), vec![]))],
    );
    register_main_with(&mut ctx, vec![Stmt::Expr(good), Stmt::Expr(bad)]);

    let engine = analyze(&mut ctx);
    assert_eq!(engine.error_count(), 1, "{:?}", engine.diagnostics());
    assert!(engine
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("no viable overload of `render`")));
}

/// Initializer calls resolve through the type name, including the
/// implicit memberwise initializer.
#[test]
fn memberwise_initializer_resolves_through_type_name() {
    let mut ctx = Context::new();
    let mut point = tarn_ast::TypeDecl::new("Point");
    point.properties.push(tarn_ast::PropertyDecl::new("x", DataType::int(), true));
    point.properties.push(tarn_ast::PropertyDecl::new("y", DataType::int(), true));
    ctx.add_type(point).unwrap();

    let call = Expr::call(
        Expr::var("Point"),
        vec![
            Argument::labeled("x", Expr::num(1)),
            Argument::labeled("y", Expr::num(2)),
        ],
    );
    let main = register_main_with(&mut ctx, vec![Stmt::Expr(call)]);

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
    let call = first_expr(&ctx, main);
    assert_eq!(call.ty, Some(DataType::custom("Point")));
    assert!(matches!(call.decl, Some(DeclRef::Func(_))));
}
