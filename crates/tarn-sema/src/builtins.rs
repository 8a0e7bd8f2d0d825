//! Builtin type and operator seeding.
//!
//! Registers a type declaration for every builtin scalar type and the
//! implicit operator overloads: arithmetic and comparisons over every
//! numeric type, bitwise and shift operators over the integer types, and
//! the boolean operators. User-declared operator overloads are checked for
//! duplicates against this set.

use tarn_ast::decl::DeclModifier;
use tarn_ast::{
    BuiltinOperator, DataType, FuncDecl, FunctionKind, ModifierSet, ParamDecl, TypeDecl,
};

use crate::context::Context;

/// Every numeric type, integers first.
fn numeric_types() -> Vec<DataType> {
    let mut types = Vec::new();
    for signed in [true, false] {
        for width in [8u8, 16, 32, 64] {
            types.push(DataType::Int { width, signed });
        }
    }
    types.push(DataType::float());
    types.push(DataType::double());
    types.push(DataType::float80());
    types
}

/// Seed the context. Called once from `Context::new`.
pub fn register(ctx: &mut Context) {
    register_scalar_type_decls(ctx);
    register_implicit_operators(ctx);
}

/// A `TypeDecl` per builtin scalar name, so extensions can attach methods
/// to builtins and `type_decl_for` is total over scalar types.
fn register_scalar_type_decls(ctx: &mut Context) {
    for name in DataType::builtin_names() {
        let decl = TypeDecl::new(*name);
        ctx.add_type(decl)
            .expect("builtin type names are seeded before any user declaration");
    }
}

fn implicit_operator(op: BuiltinOperator, operand: DataType, result: DataType) -> FuncDecl {
    FuncDecl::new(
        op.symbol(),
        vec![
            ParamDecl::unlabeled("lhs", operand.clone()),
            ParamDecl::unlabeled("rhs", operand),
        ],
        result,
    )
    .with_kind(FunctionKind::Operator(op))
    .with_modifiers(ModifierSet::new().with(DeclModifier::Implicit))
}

fn register_implicit_operators(ctx: &mut Context) {
    use BuiltinOperator::*;

    let arithmetic = [Add, Sub, Mul, Div];
    let integral = [Mod, BitAnd, BitOr, Xor, LeftShift, RightShift];
    let comparisons = [Equal, NotEqual, Less, LessOrEqual, Greater, GreaterOrEqual];

    for ty in numeric_types() {
        for op in arithmetic {
            ctx.add_operator(implicit_operator(op, ty.clone(), ty.clone()))
                .expect("implicit overloads are distinct");
        }
        if ty.is_integer() {
            for op in integral {
                ctx.add_operator(implicit_operator(op, ty.clone(), ty.clone()))
                    .expect("implicit overloads are distinct");
            }
        }
        for op in comparisons {
            ctx.add_operator(implicit_operator(op, ty.clone(), DataType::Bool))
                .expect("implicit overloads are distinct");
        }
    }

    for op in [Equal, NotEqual, And, Or] {
        ctx.add_operator(implicit_operator(op, DataType::Bool, DataType::Bool))
            .expect("implicit overloads are distinct");
    }
}
