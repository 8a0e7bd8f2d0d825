//! Integration tests for control-flow analysis: loop context, dead code,
//! and path-return checking.

use tarn_ast::decl::DeclModifier;
use tarn_ast::stmt::{IfStmt, ReturnStmt, SourceRangeOnly, WhileStmt};
use tarn_ast::{
    Argument, CompoundStmt, DataType, Expr, FuncDecl, ModifierSet, Stmt,
};
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

fn assert_warning_containing(engine: &DiagnosticEngine, needle: &str) {
    assert!(
        engine
            .diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Warning && d.message.contains(needle)),
        "expected a warning containing `{}`, got: {:?}",
        needle,
        engine.diagnostics()
    );
}

fn register_fn(ctx: &mut Context, name: &str, ret: DataType, stmts: Vec<Stmt>) {
    ctx.add_function(FuncDecl::new(name, vec![], ret).with_body(CompoundStmt::new(stmts)))
        .unwrap();
}

fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(ReturnStmt::new(value))
}

fn while_true(body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt {
        condition: Expr::bool_lit(true),
        body: CompoundStmt::new(body),
        range: None,
    })
}

// ── break / continue ───────────────────────────────────────────────────

/// `break` and `continue` must appear inside a loop.
#[test]
fn break_and_continue_outside_loop_are_rejected() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::Void,
        vec![Stmt::Break(SourceRangeOnly::default())],
    );
    register_fn(
        &mut ctx,
        "g",
        DataType::Void,
        vec![Stmt::Continue(SourceRangeOnly::default())],
    );
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "`break` outside of a loop");
    assert_error_containing(&engine, "`continue` outside of a loop");
}

/// The same statements inside a `while` body are fine.
#[test]
fn break_and_continue_inside_loop_are_accepted() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::Void,
        vec![while_true(vec![
            Stmt::Break(SourceRangeOnly::default()),
        ])],
    );
    register_fn(
        &mut ctx,
        "g",
        DataType::Void,
        vec![while_true(vec![
            Stmt::Continue(SourceRangeOnly::default()),
        ])],
    );
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

// ── Dead code ──────────────────────────────────────────────────────────

/// Statements after a `return` in the same block warn once.
#[test]
fn code_after_return_warns_once() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::int(),
        vec![
            ret(Some(Expr::num(0))),
            Stmt::Expr(Expr::num(1)),
            Stmt::Expr(Expr::num(2)),
        ],
    );
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
    let dead_warnings = engine
        .diagnostics()
        .iter()
        .filter(|d| d.message.contains("never be executed"))
        .count();
    assert_eq!(dead_warnings, 1);
}

/// Statements after `break` also warn.
#[test]
fn code_after_break_warns() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::Void,
        vec![while_true(vec![
            Stmt::Break(SourceRangeOnly::default()),
            Stmt::Expr(Expr::num(1)),
        ])],
    );
    let engine = analyze(&mut ctx);
    assert_warning_containing(&engine, "never be executed");
}

// ── Path-return analysis ───────────────────────────────────────────────

/// A non-void function whose `if` has no `else` does not return on every
/// path.
#[test]
fn if_without_else_is_not_a_full_return() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::int(),
        vec![Stmt::If(IfStmt {
            blocks: vec![(
                Expr::bool_lit(true),
                CompoundStmt::new(vec![ret(Some(Expr::num(1)))]),
            )],
            else_block: None,
            range: None,
        })],
    );
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "not all paths through `f` return a value");
}

/// An `if`/`else` chain where every branch returns satisfies the check.
#[test]
fn fully_returning_if_else_is_accepted() {
    let mut ctx = Context::new();
    register_fn(
        &mut ctx,
        "f",
        DataType::int(),
        vec![Stmt::If(IfStmt {
            blocks: vec![(
                Expr::bool_lit(true),
                CompoundStmt::new(vec![ret(Some(Expr::num(1)))]),
            )],
            else_block: Some(CompoundStmt::new(vec![ret(Some(Expr::num(2)))])),
            range: None,
        })],
    );
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

/// A call to a `noreturn` function terminates the path.
#[test]
fn noreturn_call_counts_as_return() {
    let mut ctx = Context::new();
    ctx.add_function(
        FuncDecl::new("halt", vec![], DataType::Void).with_modifiers(
            ModifierSet::new().with(DeclModifier::Foreign).with(DeclModifier::Noreturn),
        ),
    )
    .unwrap();
    register_fn(
        &mut ctx,
        "f",
        DataType::int(),
        vec![Stmt::Expr(Expr::call(Expr::var("halt"), Vec::<Argument>::new()))],
    );
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
}

/// Without the `noreturn` modifier the same shape fails the check.
#[test]
fn plain_void_call_does_not_count_as_return() {
    let mut ctx = Context::new();
    ctx.add_function(
        FuncDecl::new("pause", vec![], DataType::Void)
            .with_modifiers(ModifierSet::new().with(DeclModifier::Foreign)),
    )
    .unwrap();
    register_fn(
        &mut ctx,
        "f",
        DataType::int(),
        vec![Stmt::Expr(Expr::call(Expr::var("pause"), Vec::<Argument>::new()))],
    );
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "not all paths through `f` return a value");
}

/// `has_return` is recorded on the block itself.
#[test]
fn has_return_flag_is_written_to_blocks() {
    let mut ctx = Context::new();
    let id = ctx
        .add_function(
            FuncDecl::new("f", vec![], DataType::int())
                .with_body(CompoundStmt::new(vec![ret(Some(Expr::num(0)))])),
        )
        .unwrap();
    let engine = analyze(&mut ctx);
    assert_no_errors(&engine);
    assert!(ctx.func(id).body.as_ref().unwrap().has_return);
}

/// A non-void function with an empty body fails the check; a warning-free
/// void function does not.
#[test]
fn empty_bodies() {
    let mut ctx = Context::new();
    register_fn(&mut ctx, "f", DataType::int(), vec![]);
    register_fn(&mut ctx, "g", DataType::Void, vec![]);
    let engine = analyze(&mut ctx);
    assert_error_containing(&engine, "not all paths through `f`");
    assert!(
        !engine.diagnostics().iter().any(|d| d.message.contains("`g`")),
        "void function with empty body should be fine: {:?}",
        engine.diagnostics()
    );
}
