//! Integration tests for mutability, existential downcasts, nil handling,
//! switch constraints, and protocol conformance.

use tarn_ast::decl::DeclModifier;
use tarn_ast::stmt::{CaseStmt, ReturnStmt, SwitchStmt};
use tarn_ast::{
    Argument, BuiltinOperator, CompoundStmt, DataType, Expr, FuncDecl, FunctionKind, ParamDecl,
    PropertyDecl, ProtocolDecl, Stmt, TypeDecl, VarAssignDecl,
};
use tarn_common::{DiagnosticEngine, Identifier, Severity};
use tarn_sema::{analyze, Context};

// ── Helpers ────────────────────────────────────────────────────────────

fn assert_no_errors(engine: &DiagnosticEngine) {
    assert!(
        !engine.has_errors(),
        "expected no errors, got: {:?}",
        engine.diagnostics()
    );
}

fn assert_error_containing(engine: &DiagnosticEngine, needle: &str) {
    assert!(
        engine
            .diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error && d.message.contains(needle)),
        "expected an error containing `{}`, got: {:?}",
        needle,
        engine.diagnostics()
    );
}

fn assert_note_containing(engine: &DiagnosticEngine, needle: &str) {
    assert!(
        engine
            .diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Note && d.message.contains(needle)),
        "expected a note containing `{}`, got: {:?}",
        needle,
        engine.diagnostics()
    );
}

fn register_main_with(ctx: &mut Context, stmts: Vec<Stmt>) {
    ctx.add_function(
        FuncDecl::new("main", vec![], DataType::Void).with_body(CompoundStmt::new(stmts)),
    )
    .unwrap();
}

fn let_decl(name: &str, ty: Option<DataType>, rhs: Expr) -> Stmt {
    let mut decl = VarAssignDecl::new(name, false).with_rhs(rhs);
    if let Some(ty) = ty {
        decl = decl.with_type(ty);
    }
    Stmt::Decl(decl)
}

// ── Mutability ─────────────────────────────────────────────────────────

/// 8. `let x = 1; x = 2` is rejected: `x` is a constant.
#[test]
fn assignment_to_let_binding_is_rejected() {
    let mut ctx = Context::new();
    register_main_with(
        &mut ctx,
        vec![
            let_decl("x", None, Expr::num(1)),
            Stmt::Expr(Expr::infix(BuiltinOperator::Assign, Expr::var("x"), Expr::num(2))),
        ],
    );
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "cannot assign to constant `x`");
}

/// `var` bindings assign fine, including compound assignment.
#[test]
fn assignment_to_var_binding_is_accepted() {
    let mut ctx = Context::new();
    let mut decl = VarAssignDecl::new("x", true).with_rhs(Expr::num(1));
    decl.type_annotation = Some(tarn_ast::TypeAnnotation::new(DataType::int()));
    register_main_with(
        &mut ctx,
        vec![
            Stmt::Decl(decl),
            Stmt::Expr(Expr::infix(BuiltinOperator::Assign, Expr::var("x"), Expr::num(2))),
            Stmt::Expr(Expr::infix(BuiltinOperator::AddAssign, Expr::var("x"), Expr::num(3))),
        ],
    );
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

/// A mutating method cannot be called on a `let` receiver.
#[test]
fn mutating_method_on_immutable_receiver_is_rejected() {
    let mut ctx = Context::new();

    let counter_ty = DataType::custom("Counter");
    let bump = FuncDecl::new(
        "bump",
        vec![ParamDecl::implicit_self(counter_ty.clone())],
        DataType::Void,
    )
    .with_kind(FunctionKind::Method(counter_ty.clone()))
    .with_modifiers(tarn_ast::ModifierSet::new().with(DeclModifier::Mutating))
    .with_body(CompoundStmt::new(vec![]));
    let bump_id = ctx.insert_func(bump);

    let mut counter = TypeDecl::new("Counter");
    counter.properties.push(PropertyDecl::new("count", DataType::int(), true));
    counter.methods.push(bump_id);
    ctx.add_type(counter).unwrap();

    register_main_with(
        &mut ctx,
        vec![
            let_decl(
                "c",
                None,
                Expr::call(Expr::var("Counter"), vec![Argument::labeled("count", Expr::num(0))]),
            ),
            Stmt::Expr(Expr::call(Expr::property(Expr::var("c"), "bump"), vec![])),
        ],
    );

    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "cannot call mutating method `bump`");
}

// ── Existentials ───────────────────────────────────────────────────────

/// 9a. `var a: Any = 1; let b: Int = a` is rejected and suggests an
///     explicit cast.
#[test]
fn implicit_downcast_from_any_is_rejected() {
    let mut ctx = Context::new();
    let mut global = VarAssignDecl::new("a", true).with_rhs(Expr::num(1));
    global.type_annotation = Some(tarn_ast::TypeAnnotation::new(DataType::Any));
    ctx.add_global(global).unwrap();

    register_main_with(&mut ctx, vec![let_decl("b", Some(DataType::int()), Expr::var("a"))]);

    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "cannot downcast `Any` to `Int`");
    assert_note_containing(&engine, "add an explicit cast: `as Int`");
}

/// 9b. `let b: Int = a as Int` is accepted.
#[test]
fn explicit_downcast_from_any_is_accepted() {
    let mut ctx = Context::new();
    let mut global = VarAssignDecl::new("a", true).with_rhs(Expr::num(1));
    global.type_annotation = Some(tarn_ast::TypeAnnotation::new(DataType::Any));
    ctx.add_global(global).unwrap();

    register_main_with(
        &mut ctx,
        vec![let_decl(
            "b",
            Some(DataType::int()),
            Expr::coercion(Expr::var("a"), DataType::int()),
        )],
    );

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

/// `is` on a non-existential value warns that the outcome is static.
#[test]
fn is_check_on_concrete_value_warns() {
    let mut ctx = Context::new();
    register_main_with(
        &mut ctx,
        vec![
            let_decl("x", Some(DataType::int()), Expr::num(1)),
            Stmt::Expr(Expr::type_check(Expr::var("x"), DataType::int())),
        ],
    );
    let engine = analyze(&mut ctx);
    assert!(!engine.has_errors());
    assert!(
        engine
            .diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Warning
                && d.message.contains("`is` check always succeeds")),
        "expected a static `is` warning, got: {:?}",
        engine.diagnostics()
    );
}

// ── nil ────────────────────────────────────────────────────────────────

/// `p == nil` on a pointer synthesizes a nullable-equality overload;
/// `x == nil` on an Int does not.
#[test]
fn nil_comparison_requires_nil_compatible_type() {
    let mut ctx = Context::new();
    let mut pointer_global = VarAssignDecl::new("p", false);
    pointer_global.type_annotation =
        Some(tarn_ast::TypeAnnotation::new(DataType::pointer_to(DataType::int())));
    pointer_global.modifiers.insert(DeclModifier::Foreign);
    ctx.add_global(pointer_global).unwrap();

    register_main_with(
        &mut ctx,
        vec![
            Stmt::Expr(Expr::infix(BuiltinOperator::Equal, Expr::var("p"), Expr::nil())),
            let_decl("x", Some(DataType::int()), Expr::num(1)),
            Stmt::Expr(Expr::infix(BuiltinOperator::NotEqual, Expr::var("x"), Expr::nil())),
        ],
    );

    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "`nil` requires a pointer or indirect type, found `Int`");
    // Exactly one error: the pointer comparison is fine.
    assert_eq!(engine.error_count(), 1, "{:?}", engine.diagnostics());
}

// ── switch ─────────────────────────────────────────────────────────────

fn switch_on(subject: Expr, constant: Expr) -> Stmt {
    Stmt::Switch(SwitchStmt {
        subject,
        cases: vec![CaseStmt {
            constant,
            body: CompoundStmt::new(vec![]),
            range: None,
        }],
        default_body: None,
        range: None,
    })
}

/// 10a. `switch p { case nil: ... }` over a pointer is accepted.
#[test]
fn switch_on_pointer_accepts_nil_case() {
    let mut ctx = Context::new();
    let mut pointer_global = VarAssignDecl::new("p", false);
    pointer_global.type_annotation =
        Some(tarn_ast::TypeAnnotation::new(DataType::pointer_to(DataType::int())));
    pointer_global.modifiers.insert(DeclModifier::Foreign);
    ctx.add_global(pointer_global).unwrap();

    register_main_with(&mut ctx, vec![switch_on(Expr::var("p"), Expr::nil())]);
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

/// 10b. `switch p { case 0: ... }` over a pointer is rejected.
#[test]
fn switch_on_pointer_rejects_non_nil_case() {
    let mut ctx = Context::new();
    let mut pointer_global = VarAssignDecl::new("p", false);
    pointer_global.type_annotation =
        Some(tarn_ast::TypeAnnotation::new(DataType::pointer_to(DataType::int())));
    pointer_global.modifiers.insert(DeclModifier::Foreign);
    ctx.add_global(pointer_global).unwrap();

    register_main_with(&mut ctx, vec![switch_on(Expr::var("p"), Expr::num(0))]);
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "cannot switch over value of type `*Int`");
}

/// Case constants must be literals or immutable globals: a local
/// variable or a call in case position is rejected.
#[test]
fn switch_cases_must_be_constants() {
    let mut ctx = Context::new();
    ctx.add_global(
        VarAssignDecl::new("limit", false).with_type(DataType::int()).with_rhs(Expr::num(10)),
    )
    .unwrap();
    register_main_with(
        &mut ctx,
        vec![
            let_decl("x", Some(DataType::int()), Expr::num(1)),
            let_decl("y", Some(DataType::int()), Expr::num(2)),
            switch_on(Expr::var("x"), Expr::num(2)),
            switch_on(Expr::var("x"), Expr::var("limit")),
            // A local variable is not a constant.
            switch_on(Expr::var("x"), Expr::var("y")),
            // Neither is a call.
            switch_on(Expr::var("x"), Expr::call(Expr::var("Int"), vec![])),
        ],
    );
    let engine = analyze(&mut ctx);
    let constant_errors = engine
        .diagnostics()
        .iter()
        .filter(|d| d.message.contains("switch cases must be compile-time constants"))
        .count();
    assert_eq!(constant_errors, 2, "{:?}", engine.diagnostics());
}

// ── Protocol conformance ───────────────────────────────────────────────

fn drawable_protocol(ctx: &mut Context) {
    let requirement = FuncDecl::new("draw", vec![], DataType::Void)
        .with_kind(FunctionKind::Method(DataType::custom("Drawable")));
    let req_id = ctx.insert_func(requirement);
    let mut protocol = ProtocolDecl::new("Drawable");
    protocol.requirements.push(req_id);
    ctx.add_protocol(protocol).unwrap();
}

/// A type providing every requirement conforms; the witness records the
/// protocol it satisfies.
#[test]
fn satisfied_conformance_records_witness() {
    let mut ctx = Context::new();
    drawable_protocol(&mut ctx);

    let circle_ty = DataType::custom("Circle");
    let draw = FuncDecl::new(
        "draw",
        vec![ParamDecl::implicit_self(circle_ty.clone())],
        DataType::Void,
    )
    .with_kind(FunctionKind::Method(circle_ty))
    .with_body(CompoundStmt::new(vec![]));
    let draw_id = ctx.insert_func(draw);

    let mut circle = TypeDecl::new("Circle");
    circle.conformances.push(Identifier::new("Drawable"));
    circle.methods.push(draw_id);
    ctx.add_type(circle).unwrap();

    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
    assert_eq!(ctx.func(draw_id).satisfied_protocols.len(), 1);
}

/// A missing requirement produces a conformance error plus one note per
/// absent method.
#[test]
fn missing_requirement_is_reported_with_notes() {
    let mut ctx = Context::new();
    drawable_protocol(&mut ctx);

    let mut blob = TypeDecl::new("Blob");
    blob.conformances.push(Identifier::new("Drawable"));
    ctx.add_type(blob).unwrap();

    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "type `Blob` does not conform to protocol `Drawable`");
    assert_note_containing(&engine, "missing implementation: draw()");
}

/// Requirements of parent protocols are inherited.
#[test]
fn parent_protocol_requirements_are_inherited() {
    let mut ctx = Context::new();
    drawable_protocol(&mut ctx);

    let mut shaded = ProtocolDecl::new("Shaded");
    shaded.parents.push(Identifier::new("Drawable"));
    ctx.add_protocol(shaded).unwrap();

    let mut blob = TypeDecl::new("Blob");
    blob.conformances.push(Identifier::new("Shaded"));
    ctx.add_type(blob).unwrap();

    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "type `Blob` does not conform to protocol `Shaded`");
    assert_note_containing(&engine, "missing implementation: draw()");
}

// ── return type checking ───────────────────────────────────────────────

/// A return value must be assignable to the declared return type.
#[test]
fn return_type_mismatch_is_reported() {
    let mut ctx = Context::new();
    ctx.add_function(
        FuncDecl::new("answer", vec![], DataType::int()).with_body(CompoundStmt::new(vec![
            Stmt::Return(ReturnStmt::new(Some(Expr::bool_lit(true)))),
        ])),
    )
    .unwrap();
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "type mismatch: expected `Int`, found `Bool`");
}
