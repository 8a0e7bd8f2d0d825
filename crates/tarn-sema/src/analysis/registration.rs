//! The registration phase.
//!
//! Runs before any body is analyzed: extensions transfer their members
//! onto the extended type, types are checked for duplicate members and
//! layout circularity, protocols have their parents resolved, and types
//! without an explicit initializer get an implicit memberwise one.

use rustc_hash::FxHashMap;

use tarn_ast::decl::DeclModifier;
use tarn_ast::{
    DataType, ExtensionId, FuncDecl, FuncId, FunctionKind, ModifierSet, ParamDecl, ProtocolId,
    TypeId,
};

use super::SemanticAnalyzer;
use crate::error::SemaError;

pub(super) fn run(analyzer: &mut SemanticAnalyzer<'_>) {
    merge_extensions(analyzer);
    for index in 0..analyzer.ctx.types.len() {
        let id = TypeId(index as u32);
        check_duplicate_members(analyzer, id);
        check_layout_circularity(analyzer, id);
        synthesize_implicit_initializer(analyzer, id);
    }
    for index in 0..analyzer.ctx.protocols.len() {
        check_protocol_parents(analyzer, ProtocolId(index as u32));
    }
}

/// Move every extension's methods and subscripts onto the extended type
/// declaration. Members of an unknown type are reported and dropped.
fn merge_extensions(analyzer: &mut SemanticAnalyzer<'_>) {
    for index in 0..analyzer.ctx.extensions.len() {
        let extension = &analyzer.ctx.extensions[ExtensionId(index as u32).index()];
        let extended = extension.extended.ty.clone();
        let range = extension.extended.range.clone().or_else(|| extension.range.clone());
        let methods = extension.methods.clone();
        let subscripts = extension.subscripts.clone();

        let Some(type_id) = analyzer.ctx.type_decl_for(&extended) else {
            analyzer.report(SemaError::UnknownType { ty: extended, range });
            continue;
        };

        for id in methods.iter().chain(subscripts.iter()) {
            analyzer.extension_methods.insert(*id);
        }

        for id in methods {
            let is_static = matches!(analyzer.ctx.func(id).kind, FunctionKind::StaticMethod(_));
            if is_static {
                analyzer.ctx.type_decl_mut(type_id).static_methods.push(id);
            } else {
                analyzer.ctx.type_decl_mut(type_id).methods.push(id);
            }
        }
        analyzer.ctx.type_decl_mut(type_id).subscripts.extend(subscripts);
    }
}

/// Properties collide by name; methods collide by mangled signature, so
/// overloading a method name with different parameters is fine.
fn check_duplicate_members(analyzer: &mut SemanticAnalyzer<'_>, id: TypeId) {
    let decl = analyzer.ctx.type_decl(id);
    let type_name = decl.name.name.clone();

    let mut errors = Vec::new();

    let mut seen_properties: FxHashMap<&str, ()> = FxHashMap::default();
    for property in &decl.properties {
        if seen_properties.insert(property.name.as_str(), ()).is_some() {
            errors.push(SemaError::DuplicateField {
                type_name: type_name.clone(),
                name: property.name.name.clone(),
                range: property.range.clone(),
            });
        }
    }

    let mut seen_methods: FxHashMap<String, FuncId> = FxHashMap::default();
    let method_ids: Vec<FuncId> = decl
        .methods
        .iter()
        .chain(decl.static_methods.iter())
        .chain(decl.initializers.iter())
        .chain(decl.subscripts.iter())
        .copied()
        .collect();
    for method_id in method_ids {
        let method = analyzer.ctx.func(method_id);
        let mangled = tarn_mangle::mangle_function(method);
        if seen_methods.insert(mangled, method_id).is_some() {
            errors.push(SemaError::DuplicateMethod {
                type_name: type_name.clone(),
                name: method.name.name.clone(),
                range: method.range.clone(),
            });
        }
    }

    for error in errors {
        analyzer.report(error);
    }
}

/// A type may not transitively contain itself by value. Pointers and
/// indirect types break the cycle; everything else recurses.
fn check_layout_circularity(analyzer: &mut SemanticAnalyzer<'_>, id: TypeId) {
    let decl = analyzer.ctx.type_decl(id);
    if decl.is_indirect() {
        return;
    }
    let type_name = decl.name.name.clone();

    let mut offender = None;
    for property in &decl.properties {
        let mut visiting = vec![type_name.clone()];
        if contains_by_value(analyzer, &property.type_annotation.ty, &type_name, &mut visiting) {
            offender = Some((property.name.name.clone(), property.range.clone()));
            break;
        }
    }
    if let Some((property, range)) = offender {
        analyzer.report(SemaError::ReferenceSelfInProperty { type_name, property, range });
    }
}

fn contains_by_value(
    analyzer: &SemanticAnalyzer<'_>,
    ty: &DataType,
    target: &str,
    visiting: &mut Vec<String>,
) -> bool {
    match analyzer.ctx.canonicalize(ty) {
        DataType::Custom(name) => {
            if name == target {
                return true;
            }
            if visiting.iter().any(|v| *v == name) {
                return false;
            }
            let Some(inner_id) = analyzer.ctx.type_decl_for(&DataType::Custom(name.clone()))
            else {
                return false;
            };
            let inner = analyzer.ctx.type_decl(inner_id);
            if inner.is_indirect() {
                return false;
            }
            visiting.push(name);
            let hit = inner
                .properties
                .iter()
                .any(|p| contains_by_value(analyzer, &p.type_annotation.ty, target, visiting));
            visiting.pop();
            hit
        }
        DataType::Array { element, .. } => {
            contains_by_value(analyzer, &element, target, visiting)
        }
        DataType::Tuple(fields) => fields
            .iter()
            .any(|f| contains_by_value(analyzer, f, target, visiting)),
        // Pointers (and everything scalar) end the recursion.
        _ => false,
    }
}

/// A type with no written initializer gets an implicit memberwise one:
/// one labeled parameter per stored property, in declaration order.
fn synthesize_implicit_initializer(analyzer: &mut SemanticAnalyzer<'_>, id: TypeId) {
    let decl = analyzer.ctx.type_decl(id);
    if !decl.initializers.is_empty() {
        return;
    }
    // Builtin scalar decls have no properties and need no initializer.
    if decl.properties.is_empty() && DataType::from_builtin_name(decl.name.as_str()).is_some() {
        return;
    }
    let ty = decl.ty();
    let params: Vec<ParamDecl> = decl
        .properties
        .iter()
        .map(|p| ParamDecl::labeled(p.name.clone(), p.type_annotation.ty.clone()))
        .collect();
    let init = FuncDecl::new("init", params, ty.clone())
        .with_kind(FunctionKind::Initializer(ty))
        .with_modifiers(ModifierSet::new().with(DeclModifier::Implicit));
    let init_id = analyzer.ctx.insert_func(init);
    analyzer.ctx.type_decl_mut(id).initializers.push(init_id);
}

fn check_protocol_parents(analyzer: &mut SemanticAnalyzer<'_>, id: ProtocolId) {
    let decl = analyzer.ctx.protocol(id);
    let unknown: Vec<_> = decl
        .parents
        .iter()
        .filter(|parent| analyzer.ctx.protocol_named(parent.as_str()).is_none())
        .map(|parent| SemaError::UnknownProtocol {
            name: parent.name.clone(),
            range: parent.range.clone().or_else(|| decl.range.clone()),
        })
        .collect();
    for error in unknown {
        analyzer.report(error);
    }
}
