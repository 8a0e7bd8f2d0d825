//! Deterministic symbol mangling.
//!
//! Every declaration and type maps to a unique, stable symbol string. The
//! code generator and linker consume these names; the compilation context
//! also compares mangled strings to detect duplicate declarations, so two
//! declarations collide exactly when they would be indistinguishable at an
//! overload site.
//!
//! Symbol grammar:
//!
//! - `_WF` function, followed by an optional variant sigil (`D` deinit,
//!   `I` initializer, `M`/`m` instance/static method, `g`/`s` property
//!   getter/setter, `O` operator, `S` subscript), the mangled parent type
//!   for member kinds, the length-prefixed basename, one entry per
//!   non-implicit-self argument (label tag then type), and `R<ret>` when
//!   the return type is not `Void`.
//! - `_WT` type declaration, `_WP` protocol declaration.
//! - `_WW` witness table: conforming type then protocol name.
//! - `_WG` global initializer, `_Wg` global accessor.
//!
//! Types encode as `F<args>R<ret>` functions, `t<fields>T` tuples,
//! `A<elt>` arrays, `s{i,u}<width>` integers, `sf`/`sd`/`sF` floats,
//! `sb`/`sv`/`sa` bool/void/any, `P<level>T<root>` pointers, and
//! length-prefixed names for everything nominal.

use std::fmt::Write;

use tarn_ast::{Accessor, DataType, FloatKind, FuncDecl, FunctionKind, ProtocolDecl, TypeDecl};

/// Append the UTF-8 length-prefixed spelling of `name`.
fn push_name(out: &mut String, name: &str) {
    let _ = write!(out, "{}{}", name.len(), name);
}

/// Encode a type into `out`.
fn push_type(out: &mut String, ty: &DataType) {
    match ty {
        DataType::Int { width, signed } => {
            let _ = write!(out, "s{}{}", if *signed { 'i' } else { 'u' }, width);
        }
        DataType::Floating(FloatKind::Float) => out.push_str("sf"),
        DataType::Floating(FloatKind::Double) => out.push_str("sd"),
        DataType::Floating(FloatKind::Float80) => out.push_str("sF"),
        DataType::Bool => out.push_str("sb"),
        DataType::Void => out.push_str("sv"),
        DataType::Any => out.push_str("sa"),
        DataType::Pointer(_) => {
            let (level, root) = ty.pointer_root();
            let _ = write!(out, "P{}T", level);
            push_type(out, root);
        }
        DataType::Array { element, .. } => {
            out.push('A');
            push_type(out, element);
        }
        DataType::Tuple(fields) => {
            out.push('t');
            for field in fields {
                push_type(out, field);
            }
            out.push('T');
        }
        DataType::Function { args, ret, .. } => {
            out.push('F');
            for arg in args {
                push_type(out, arg);
            }
            out.push('R');
            push_type(out, ret);
        }
        DataType::Custom(name) | DataType::TypeVariable(name) | DataType::MetaVariable(name) => {
            push_name(out, name);
        }
        DataType::NilLiteral => push_name(out, "nil"),
        DataType::Error => push_name(out, "error"),
    }
}

/// Mangle a type on its own (the encoding used inside symbols).
pub fn mangle_type(ty: &DataType) -> String {
    let mut out = String::new();
    push_type(&mut out, ty);
    out
}

/// Mangle any function-like declaration.
pub fn mangle_function(decl: &FuncDecl) -> String {
    let mut out = String::from("_WF");

    match &decl.kind {
        FunctionKind::Free => {}
        FunctionKind::Deinitializer(parent) => {
            out.push('D');
            push_type(&mut out, parent);
        }
        FunctionKind::Initializer(parent) => {
            out.push('I');
            push_type(&mut out, parent);
        }
        FunctionKind::Method(parent) => {
            out.push('M');
            push_type(&mut out, parent);
        }
        FunctionKind::StaticMethod(parent) => {
            out.push('m');
            push_type(&mut out, parent);
        }
        FunctionKind::Property(parent, Accessor::Getter) => {
            out.push('g');
            push_type(&mut out, parent);
        }
        FunctionKind::Property(parent, Accessor::Setter) => {
            out.push('s');
            push_type(&mut out, parent);
        }
        FunctionKind::Subscript(parent) => {
            out.push('S');
            push_type(&mut out, parent);
        }
        FunctionKind::Operator(op) => {
            // The basename of an operator is its symbolic spelling.
            out.push('O');
            push_name(&mut out, op.symbol());
        }
    }

    if !matches!(decl.kind, FunctionKind::Operator(_)) {
        push_name(&mut out, decl.name.as_str());
    }

    for param in &decl.params {
        if param.is_implicit_self {
            continue;
        }
        match &param.external_name {
            Some(label) => push_name(&mut out, label.as_str()),
            None => out.push('_'),
        }
        push_type(&mut out, &param.type_annotation.ty);
    }

    if decl.return_type.ty != DataType::Void {
        out.push('R');
        push_type(&mut out, &decl.return_type.ty);
    }

    out
}

/// Mangle a type declaration.
pub fn mangle_type_decl(decl: &TypeDecl) -> String {
    let mut out = String::from("_WT");
    push_type(&mut out, &decl.ty());
    out
}

/// Mangle a protocol declaration.
pub fn mangle_protocol(decl: &ProtocolDecl) -> String {
    let mut out = String::from("_WP");
    push_name(&mut out, decl.name.as_str());
    out
}

/// Mangle the witness table binding `conformer` to `protocol`.
pub fn mangle_witness_table(conformer: &DataType, protocol: &str) -> String {
    let mut out = String::from("_WW");
    push_type(&mut out, conformer);
    push_name(&mut out, protocol);
    out
}

/// Mangle a global variable's one-time initializer symbol.
pub fn mangle_global_initializer(name: &str) -> String {
    let mut out = String::from("_WG");
    push_name(&mut out, name);
    out
}

/// Mangle a global variable's accessor symbol.
pub fn mangle_global_accessor(name: &str) -> String {
    let mut out = String::from("_Wg");
    push_name(&mut out, name);
    out
}
