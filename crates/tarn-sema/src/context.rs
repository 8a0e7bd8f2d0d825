//! The compilation context: the single mutable store for one compilation.
//!
//! Declarations live in arenas here and are referred to by typed indices
//! everywhere else, so the AST stays an acyclic owning tree. Name indices
//! (overload sets, type/protocol/global/alias tables) are hash maps whose
//! values point back into the arenas; arena order is insertion order, which
//! keeps diagnostics deterministic.
//!
//! The context is populated by the parser through the `add_*` operations,
//! then mutated by semantic analysis (type annotations, main detection,
//! minted local bindings, synthesized operator candidates). Everything
//! happens on one thread; nothing here is shared.

use rustc_hash::FxHashMap;

use tarn_ast::{
    BuiltinOperator, DataType, ExtensionDecl, ExtensionId, FuncDecl, FuncId, FunctionKind,
    GlobalId, LocalId, ProtocolDecl, ProtocolId, TypeAliasDecl, TypeDecl, TypeId,
    VarAssignDecl, VarKind,
};
use tarn_ast::decl::AliasId;
use tarn_ast::stmt::PoundDiagnosticStmt;
use tarn_common::Identifier;

use crate::error::SemaError;

/// Which of the optional `main` conveniences the entry point uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MainFuncFlags {
    /// `main` takes `(argc: Int, argv: **Int8)`.
    pub args: bool,
    /// `main` returns `Int`, used as the process exit code.
    pub exit_code: bool,
}

/// A binding minted during analysis for a local declaration, closure
/// parameter, or implicit `self`. `DeclRef::Local` indexes into this arena.
#[derive(Clone, Debug)]
pub struct LocalBinding {
    pub name: Identifier,
    pub ty: DataType,
    pub mutable: bool,
}

/// One source file fed into the compilation.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

/// How close two canonical types are, for overload ranking. `Equal` beats
/// `Any`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeRank {
    Any,
    Equal,
}

/// The process-wide declaration registry for one compilation.
#[derive(Debug, Default)]
pub struct Context {
    // Arenas; insertion order is declaration order.
    pub funcs: Vec<FuncDecl>,
    pub types: Vec<TypeDecl>,
    pub protocols: Vec<ProtocolDecl>,
    pub globals: Vec<VarAssignDecl>,
    pub aliases: Vec<TypeAliasDecl>,
    pub extensions: Vec<ExtensionDecl>,
    pub locals: Vec<LocalBinding>,

    /// Top-level `#error` / `#warning` directives, re-emitted first.
    pub pound_diagnostics: Vec<PoundDiagnosticStmt>,
    pub source_files: Vec<SourceFile>,

    // Name indices.
    func_map: FxHashMap<String, Vec<FuncId>>,
    operator_map: FxHashMap<BuiltinOperator, Vec<FuncId>>,
    type_decl_map: FxHashMap<DataType, TypeId>,
    protocol_map: FxHashMap<String, ProtocolId>,
    global_map: FxHashMap<String, GlobalId>,
    alias_map: FxHashMap<String, AliasId>,
    /// Mangled signatures of every registered function-like declaration,
    /// for duplicate detection.
    mangled_funcs: FxHashMap<String, FuncId>,

    pub main_function: Option<FuncId>,
    pub main_flags: MainFuncFlags,
}

impl Context {
    /// An empty context with the builtin types and implicit operator
    /// overloads seeded.
    pub fn new() -> Self {
        let mut ctx = Context::default();
        crate::builtins::register(&mut ctx);
        ctx
    }

    // ── Arena access ────────────────────────────────────────────────────

    pub fn func(&self, id: FuncId) -> &FuncDecl {
        &self.funcs[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncDecl {
        &mut self.funcs[id.index()]
    }

    pub fn type_decl(&self, id: TypeId) -> &TypeDecl {
        &self.types[id.index()]
    }

    pub fn type_decl_mut(&mut self, id: TypeId) -> &mut TypeDecl {
        &mut self.types[id.index()]
    }

    pub fn protocol(&self, id: ProtocolId) -> &ProtocolDecl {
        &self.protocols[id.index()]
    }

    pub fn global(&self, id: GlobalId) -> &VarAssignDecl {
        &self.globals[id.index()]
    }

    pub fn global_mut(&mut self, id: GlobalId) -> &mut VarAssignDecl {
        &mut self.globals[id.index()]
    }

    pub fn local(&self, id: LocalId) -> &LocalBinding {
        &self.locals[id.index()]
    }

    /// Mint a binding for a local declaration, closure parameter, or
    /// implicit self.
    pub fn add_local(&mut self, binding: LocalBinding) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(binding);
        id
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Push a function-like declaration into the arena without any
    /// registration checks. Member functions, protocol requirements, and
    /// accessors enter here; the owning declaration holds the id.
    pub fn insert_func(&mut self, decl: FuncDecl) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(decl);
        id
    }

    /// Register a free function. Detects duplicate signatures by mangling
    /// equivalence; a function named `main` additionally goes through main
    /// validation. On error the declaration is not added.
    pub fn add_function(&mut self, decl: FuncDecl) -> Result<FuncId, SemaError> {
        let mangled = tarn_mangle::mangle_function(&decl);
        if self.mangled_funcs.contains_key(&mangled) {
            return Err(SemaError::DuplicateFunction {
                name: decl.name.name.clone(),
                range: decl.range.clone(),
            });
        }

        let is_main = decl.name == *"main" && matches!(decl.kind, FunctionKind::Free);
        if is_main {
            self.validate_main(&decl)?;
        }

        let name = decl.name.name.clone();
        let id = self.insert_func(decl);
        self.mangled_funcs.insert(mangled, id);
        self.func_map.entry(name).or_default().push(id);
        if is_main {
            self.main_function = Some(id);
        }
        Ok(id)
    }

    /// Accepted `main` shapes: `() -> Void`, `() -> Int`,
    /// `(Int, **Int8) -> Void`, `(Int, **Int8) -> Int`.
    fn validate_main(&mut self, decl: &FuncDecl) -> Result<(), SemaError> {
        if self.main_function.is_some() {
            return Err(SemaError::DuplicateMain { range: decl.range.clone() });
        }

        let params = decl.explicit_params();
        let argv = DataType::pointer_to(DataType::string());
        let args_ok = match params.len() {
            0 => Some(false),
            2 if self.canonicalize(&params[0].type_annotation.ty) == DataType::int()
                && self.canonicalize(&params[1].type_annotation.ty) == argv =>
            {
                Some(true)
            }
            _ => None,
        };
        let ret = self.canonicalize(&decl.return_type.ty);
        let ret_ok = match ret {
            DataType::Void => Some(false),
            ref t if *t == DataType::int() => Some(true),
            _ => None,
        };

        match (args_ok, ret_ok) {
            (Some(args), Some(exit_code)) => {
                self.main_flags = MainFuncFlags { args, exit_code };
                Ok(())
            }
            _ => Err(SemaError::InvalidMain {
                got: decl.type_of(),
                range: decl.range.clone(),
            }),
        }
    }

    /// Register an operator overload. Duplicate detection runs against the
    /// union of implicit and user-declared overloads.
    pub fn add_operator(&mut self, decl: FuncDecl) -> Result<FuncId, SemaError> {
        let op = match decl.kind {
            FunctionKind::Operator(op) => op,
            _ => unreachable!("add_operator requires an operator declaration"),
        };
        let mangled = tarn_mangle::mangle_function(&decl);
        if self.mangled_funcs.contains_key(&mangled) {
            return Err(SemaError::DuplicateOperatorOverload {
                op,
                range: decl.range.clone(),
            });
        }
        let id = self.insert_func(decl);
        self.mangled_funcs.insert(mangled, id);
        self.operator_map.entry(op).or_default().push(id);
        Ok(id)
    }

    pub fn add_type(&mut self, decl: TypeDecl) -> Result<TypeId, SemaError> {
        // Builtin scalar declarations are keyed at their scalar type, so
        // `type_decl_for(Int)` finds the `Int` declaration; user types are
        // keyed at their nominal type.
        let ty = DataType::from_builtin_name(decl.name.as_str()).unwrap_or_else(|| decl.ty());
        if self.type_decl_map.contains_key(&ty) || self.alias_map.contains_key(decl.name.as_str())
        {
            return Err(SemaError::DuplicateType {
                name: decl.name.name.clone(),
                range: decl.range.clone(),
            });
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(decl);
        self.type_decl_map.insert(ty, id);
        Ok(id)
    }

    pub fn add_protocol(&mut self, decl: ProtocolDecl) -> Result<ProtocolId, SemaError> {
        if self.protocol_map.contains_key(decl.name.as_str()) {
            return Err(SemaError::DuplicateProtocol {
                name: decl.name.name.clone(),
                range: decl.range.clone(),
            });
        }
        let id = ProtocolId(self.protocols.len() as u32);
        let name = decl.name.name.clone();
        self.protocols.push(decl);
        self.protocol_map.insert(name, id);
        Ok(id)
    }

    pub fn add_global(&mut self, mut decl: VarAssignDecl) -> Result<GlobalId, SemaError> {
        if self.global_map.contains_key(decl.name.as_str()) {
            return Err(SemaError::DuplicateVar {
                name: decl.name.name.clone(),
                range: decl.range.clone(),
            });
        }
        decl.kind = VarKind::Global;
        let id = GlobalId(self.globals.len() as u32);
        let name = decl.name.name.clone();
        self.globals.push(decl);
        self.global_map.insert(name, id);
        Ok(id)
    }

    /// Register a type alias. The circular-alias check runs here, at
    /// registration, so canonicalisation can expand aliases without a
    /// visited set.
    pub fn add_alias(&mut self, decl: TypeAliasDecl) -> Result<AliasId, SemaError> {
        let name = decl.name.name.clone();
        if self.alias_map.contains_key(&name)
            || self.type_decl_map.contains_key(&DataType::Custom(name.clone()))
        {
            return Err(SemaError::DuplicateType { name, range: decl.range.clone() });
        }
        if self.alias_introduces_cycle(&name, &decl.target.ty) {
            return Err(SemaError::CircularAlias { name, range: decl.range.clone() });
        }
        let id = AliasId(self.aliases.len() as u32);
        self.aliases.push(decl);
        self.alias_map.insert(name, id);
        Ok(id)
    }

    /// Would registering `name = target` let alias expansion revisit a
    /// name? Walks existing aliases as if the new one were present.
    fn alias_introduces_cycle(&self, name: &str, target: &DataType) -> bool {
        fn visit(ctx: &Context, new_name: &str, ty: &DataType, seen: &mut Vec<String>) -> bool {
            match ty {
                DataType::Custom(n) => {
                    if seen.iter().any(|s| s == n) {
                        return true;
                    }
                    seen.push(n.clone());
                    let hit = if n == new_name {
                        // The alias being registered; its target is the
                        // one under test, already traversed from the root.
                        false
                    } else if let Some(alias) = ctx.alias_named(n) {
                        visit(ctx, new_name, &alias.target.ty, seen)
                    } else {
                        false
                    };
                    seen.pop();
                    hit
                }
                DataType::Pointer(inner) => visit(ctx, new_name, inner, seen),
                DataType::Array { element, .. } => visit(ctx, new_name, element, seen),
                DataType::Tuple(fields) => {
                    fields.iter().any(|f| visit(ctx, new_name, f, seen))
                }
                DataType::Function { args, ret, .. } => {
                    args.iter().any(|a| visit(ctx, new_name, a, seen))
                        || visit(ctx, new_name, ret, seen)
                }
                _ => false,
            }
        }
        let mut seen = vec![name.to_string()];
        visit(self, name, target, &mut seen)
    }

    pub fn add_extension(&mut self, decl: ExtensionDecl) -> ExtensionId {
        let id = ExtensionId(self.extensions.len() as u32);
        self.extensions.push(decl);
        id
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// The overload set sharing a base name.
    pub fn overloads(&self, name: &str) -> &[FuncId] {
        self.func_map.get(name).map_or(&[], Vec::as_slice)
    }

    /// All overloads (implicit and user-declared) of an infix operator.
    /// Compound assignments search their underlying operator.
    pub fn operator_overloads(&self, op: BuiltinOperator) -> &[FuncId] {
        let op = op.underlying_op().unwrap_or(op);
        self.operator_map.get(&op).map_or(&[], Vec::as_slice)
    }

    /// The type declaration for a canonical type, if any.
    pub fn type_decl_for(&self, ty: &DataType) -> Option<TypeId> {
        let canonical = self.canonicalize(ty);
        self.type_decl_map.get(&canonical).copied()
    }

    pub fn protocol_named(&self, name: &str) -> Option<ProtocolId> {
        self.protocol_map.get(name).copied()
    }

    pub fn global_named(&self, name: &str) -> Option<GlobalId> {
        self.global_map.get(name).copied()
    }

    pub fn alias_named(&self, name: &str) -> Option<&TypeAliasDecl> {
        self.alias_map.get(name).map(|id| &self.aliases[id.index()])
    }

    /// Whether the name denotes a type in the type namespace: a builtin, a
    /// declared type, or an alias.
    pub fn is_type_name(&self, name: &str) -> bool {
        DataType::from_builtin_name(name).is_some()
            || self.type_decl_map.contains_key(&DataType::Custom(name.to_string()))
            || self.alias_map.contains_key(name)
    }

    // ── The type algebra, context-dependent half ────────────────────────

    /// Expand aliases and canonicalise recursively. Idempotent; alias
    /// registration guarantees expansion terminates.
    pub fn canonicalize(&self, ty: &DataType) -> DataType {
        match ty {
            DataType::Custom(name) => match self.alias_named(name) {
                Some(alias) => self.canonicalize(&alias.target.ty),
                None => ty.clone(),
            },
            DataType::Pointer(inner) => DataType::pointer_to(self.canonicalize(inner)),
            DataType::Array { element, length } => {
                DataType::Array { element: Box::new(self.canonicalize(element)), length: *length }
            }
            DataType::Tuple(fields) => {
                DataType::Tuple(fields.iter().map(|f| self.canonicalize(f)).collect())
            }
            DataType::Function { args, ret, has_varargs } => DataType::Function {
                args: args.iter().map(|a| self.canonicalize(a)).collect(),
                ret: Box::new(self.canonicalize(ret)),
                has_varargs: *has_varargs,
            },
            other => other.clone(),
        }
    }

    /// A type is valid when every leaf is builtin or resolves to a known
    /// type declaration, protocol, or in-scope generic parameter.
    pub fn is_valid_type(&self, ty: &DataType) -> bool {
        match self.canonicalize(ty) {
            DataType::Int { .. }
            | DataType::Floating(_)
            | DataType::Bool
            | DataType::Void
            | DataType::Any
            | DataType::TypeVariable(_) => true,
            DataType::NilLiteral | DataType::Error | DataType::MetaVariable(_) => false,
            DataType::Custom(name) => {
                self.type_decl_map.contains_key(&DataType::Custom(name.clone()))
                    || self.protocol_map.contains_key(&name)
            }
            DataType::Pointer(inner) => self.is_valid_type(&inner),
            DataType::Array { element, .. } => self.is_valid_type(&element),
            DataType::Tuple(fields) => fields.iter().all(|f| self.is_valid_type(f)),
            DataType::Function { args, ret, .. } => {
                args.iter().all(|a| self.is_valid_type(a)) && self.is_valid_type(&ret)
            }
        }
    }

    /// Rank how well two types match. Symmetric. `Equal` for structural
    /// equality after canonicalisation, `Any` when either side is `Any`
    /// (taking the weakest rank through tuples and pointers), `None` when
    /// the types are incompatible.
    pub fn match_rank(&self, a: &DataType, b: &DataType) -> Option<TypeRank> {
        let a = self.canonicalize(a);
        let b = self.canonicalize(b);
        self.match_rank_canonical(&a, &b)
    }

    fn match_rank_canonical(&self, a: &DataType, b: &DataType) -> Option<TypeRank> {
        if a == &DataType::Any || b == &DataType::Any {
            return Some(TypeRank::Any);
        }
        match (a, b) {
            (DataType::Tuple(xs), DataType::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return None;
                }
                let mut weakest = TypeRank::Equal;
                for (x, y) in xs.iter().zip(ys) {
                    weakest = weakest.min(self.match_rank_canonical(x, y)?);
                }
                Some(weakest)
            }
            (DataType::Pointer(x), DataType::Pointer(y)) => self.match_rank_canonical(x, y),
            _ if a == b => Some(TypeRank::Equal),
            _ => None,
        }
    }

    /// `nil` inhabits pointers and indirect types.
    pub fn can_be_nil(&self, ty: &DataType) -> bool {
        let canonical = self.canonicalize(ty);
        match canonical {
            DataType::Pointer(_) => true,
            DataType::Custom(_) => self
                .type_decl_for(&canonical)
                .is_some_and(|id| self.type_decl(id).is_indirect()),
            _ => false,
        }
    }

    /// The explicit coercion relation backing `as`.
    pub fn can_coerce(&self, from: &DataType, to: &DataType) -> bool {
        let from = self.canonicalize(from);
        let to = self.canonicalize(to);
        if from == to {
            return true;
        }
        match (&from, &to) {
            (DataType::Any, _) | (_, DataType::Any) => true,
            (DataType::Int { .. }, DataType::Int { .. }) => true,
            (DataType::Int { .. }, DataType::Floating(_))
            | (DataType::Floating(_), DataType::Int { .. }) => true,
            (DataType::Floating(_), DataType::Floating(_)) => true,
            (DataType::Int { .. }, DataType::Pointer(_))
            | (DataType::Pointer(_), DataType::Int { .. }) => true,
            (DataType::Pointer(_), DataType::Pointer(_)) => true,
            (DataType::NilLiteral, _) => self.can_be_nil(&to),
            // An indirect type and a pointer interconvert: instances
            // already live behind a pointer.
            (DataType::Custom(_), DataType::Pointer(_)) => {
                self.type_decl_for(&from).is_some_and(|id| self.type_decl(id).is_indirect())
            }
            (DataType::Pointer(_), DataType::Custom(_)) => {
                self.type_decl_for(&to).is_some_and(|id| self.type_decl(id).is_indirect())
            }
            _ => false,
        }
    }

    /// Whether `ty`'s declared conformances (directly or through protocol
    /// parents) include `protocol`.
    pub fn type_conforms_to(&self, type_id: TypeId, protocol_id: ProtocolId) -> bool {
        let wanted = self.protocol(protocol_id).name.as_str();
        self.type_decl(type_id).conformances.iter().any(|declared| {
            declared.as_str() == wanted
                || self
                    .protocol_named(declared.as_str())
                    .is_some_and(|pid| self.protocol_inherits(pid, wanted, &mut Vec::new()))
        })
    }

    fn protocol_inherits(&self, id: ProtocolId, wanted: &str, seen: &mut Vec<ProtocolId>) -> bool {
        if seen.contains(&id) {
            return false;
        }
        seen.push(id);
        self.protocol(id).parents.iter().any(|parent| {
            parent.as_str() == wanted
                || self
                    .protocol_named(parent.as_str())
                    .is_some_and(|pid| self.protocol_inherits(pid, wanted, seen))
        })
    }

    /// Find or synthesize the nullable-equality overload used for
    /// `p == nil` / `p != nil` on a nil-compatible type.
    pub fn nullable_equality_candidate(
        &mut self,
        op: BuiltinOperator,
        operand: &DataType,
    ) -> FuncId {
        use tarn_ast::ParamDecl;
        let operand = self.canonicalize(operand);
        if let Some(existing) = self.operator_overloads(op).iter().copied().find(|id| {
            let decl = self.func(*id);
            decl.params.len() == 2 && decl.params[0].type_annotation.ty == operand
        }) {
            return existing;
        }
        let decl = FuncDecl::new(
            op.symbol(),
            vec![
                ParamDecl::unlabeled("lhs", operand.clone()),
                ParamDecl::unlabeled("rhs", operand),
            ],
            DataType::Bool,
        )
        .with_kind(FunctionKind::Operator(op))
        .with_modifiers(
            tarn_ast::ModifierSet::new().with(tarn_ast::decl::DeclModifier::Implicit),
        );
        let id = self.insert_func(decl);
        self.operator_map.entry(op).or_default().push(id);
        id
    }

    /// Whether an entry point has been registered.
    pub fn has_main(&self) -> bool {
        self.main_function.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_ast::ParamDecl;

    #[test]
    fn canonicalize_is_idempotent() {
        let mut ctx = Context::new();
        ctx.add_alias(TypeAliasDecl::new("Byte", DataType::uint8())).unwrap();
        ctx.add_alias(TypeAliasDecl::new("Buffer", DataType::pointer_to(DataType::custom("Byte"))))
            .unwrap();

        let samples = [
            DataType::custom("Buffer"),
            DataType::array_of(DataType::custom("Byte"), Some(4)),
            DataType::function(vec![DataType::custom("Buffer")], DataType::Void),
            DataType::Tuple(vec![DataType::int(), DataType::custom("Byte")]),
        ];
        for ty in &samples {
            let once = ctx.canonicalize(ty);
            assert_eq!(ctx.canonicalize(&once), once, "canonicalize({}) not idempotent", ty);
        }
        assert_eq!(
            ctx.canonicalize(&DataType::custom("Buffer")),
            DataType::pointer_to(DataType::uint8())
        );
    }

    #[test]
    fn circular_alias_rejected_at_registration() {
        let mut ctx = Context::new();
        ctx.add_alias(TypeAliasDecl::new("A", DataType::custom("B"))).unwrap();
        let err = ctx
            .add_alias(TypeAliasDecl::new("B", DataType::custom("A")))
            .unwrap_err();
        assert!(matches!(err, SemaError::CircularAlias { ref name, .. } if name == "B"));
        // Self-alias is the one-step cycle.
        let err = ctx
            .add_alias(TypeAliasDecl::new("C", DataType::pointer_to(DataType::custom("C"))))
            .unwrap_err();
        assert!(matches!(err, SemaError::CircularAlias { ref name, .. } if name == "C"));
    }

    #[test]
    fn match_rank_is_symmetric() {
        let ctx = Context::new();
        let pairs = [
            (DataType::int(), DataType::int()),
            (DataType::int(), DataType::double()),
            (DataType::Any, DataType::Bool),
            (
                DataType::Tuple(vec![DataType::int(), DataType::Any]),
                DataType::Tuple(vec![DataType::int(), DataType::Bool]),
            ),
            (DataType::pointer_to(DataType::int()), DataType::pointer_to(DataType::Any)),
        ];
        for (a, b) in &pairs {
            assert_eq!(ctx.match_rank(a, b), ctx.match_rank(b, a), "{} vs {}", a, b);
        }
        assert_eq!(ctx.match_rank(&DataType::int(), &DataType::int()), Some(TypeRank::Equal));
        assert_eq!(ctx.match_rank(&DataType::int(), &DataType::double()), None);
        assert_eq!(ctx.match_rank(&DataType::Any, &DataType::Bool), Some(TypeRank::Any));
        assert_eq!(
            ctx.match_rank(
                &DataType::Tuple(vec![DataType::int(), DataType::Any]),
                &DataType::Tuple(vec![DataType::int(), DataType::Bool]),
            ),
            Some(TypeRank::Any)
        );
    }

    #[test]
    fn main_shapes() {
        // () -> Int: exit code only.
        let mut ctx = Context::new();
        ctx.add_function(FuncDecl::new("main", vec![], DataType::int())).unwrap();
        assert_eq!(ctx.main_flags, MainFuncFlags { args: false, exit_code: true });

        // (Int, **Int8) -> Void: args only.
        let mut ctx = Context::new();
        ctx.add_function(FuncDecl::new(
            "main",
            vec![
                ParamDecl::labeled("argc", DataType::int()),
                ParamDecl::labeled("argv", DataType::pointer_to(DataType::string())),
            ],
            DataType::Void,
        ))
        .unwrap();
        assert_eq!(ctx.main_flags, MainFuncFlags { args: true, exit_code: false });

        // Bad return type.
        let mut ctx = Context::new();
        let err = ctx
            .add_function(FuncDecl::new("main", vec![], DataType::string()))
            .unwrap_err();
        assert!(matches!(err, SemaError::InvalidMain { .. }));

        // Second main.
        let mut ctx = Context::new();
        ctx.add_function(FuncDecl::new("main", vec![], DataType::Void)).unwrap();
        let err = ctx
            .add_function(FuncDecl::new("main", vec![], DataType::int()))
            .unwrap_err();
        assert!(matches!(err, SemaError::DuplicateMain { .. }));
    }

    #[test]
    fn duplicate_function_by_mangling() {
        let mut ctx = Context::new();
        ctx.add_function(FuncDecl::new(
            "f",
            vec![ParamDecl::unlabeled("x", DataType::int())],
            DataType::int(),
        ))
        .unwrap();
        // Same signature, different binding name: duplicate.
        let err = ctx
            .add_function(FuncDecl::new(
                "f",
                vec![ParamDecl::unlabeled("y", DataType::int())],
                DataType::int(),
            ))
            .unwrap_err();
        assert!(matches!(err, SemaError::DuplicateFunction { .. }));
        // Different parameter type: a new overload.
        ctx.add_function(FuncDecl::new(
            "f",
            vec![ParamDecl::unlabeled("x", DataType::double())],
            DataType::int(),
        ))
        .unwrap();
        assert_eq!(ctx.overloads("f").len(), 2);
    }

    #[test]
    fn nil_compatibility() {
        let mut ctx = Context::new();
        assert!(ctx.can_be_nil(&DataType::pointer_to(DataType::int())));
        assert!(!ctx.can_be_nil(&DataType::int()));

        let mut node = TypeDecl::new("Node");
        node.modifiers.insert(tarn_ast::decl::DeclModifier::Indirect);
        ctx.add_type(node).unwrap();
        assert!(ctx.can_be_nil(&DataType::custom("Node")));

        ctx.add_type(TypeDecl::new("Point")).unwrap();
        assert!(!ctx.can_be_nil(&DataType::custom("Point")));
    }

    #[test]
    fn coercion_relation() {
        let ctx = Context::new();
        assert!(ctx.can_coerce(&DataType::int(), &DataType::int8()));
        assert!(ctx.can_coerce(&DataType::int(), &DataType::double()));
        assert!(ctx.can_coerce(&DataType::int(), &DataType::string()));
        assert!(ctx.can_coerce(&DataType::string(), &DataType::pointer_to(DataType::Void)));
        assert!(ctx.can_coerce(&DataType::Any, &DataType::int()));
        assert!(ctx.can_coerce(&DataType::Bool, &DataType::Any));
        assert!(!ctx.can_coerce(&DataType::Bool, &DataType::int()));
        assert!(!ctx.can_coerce(&DataType::string(), &DataType::double()));
    }

    #[test]
    fn builtin_operator_overloads_are_seeded() {
        let ctx = Context::new();
        assert!(!ctx.operator_overloads(BuiltinOperator::Add).is_empty());
        assert!(!ctx.operator_overloads(BuiltinOperator::Equal).is_empty());
        // Compound assignment searches its underlying operator.
        assert_eq!(
            ctx.operator_overloads(BuiltinOperator::AddAssign).len(),
            ctx.operator_overloads(BuiltinOperator::Add).len()
        );
    }

    #[test]
    fn nullable_equality_is_synthesized_once() {
        let mut ctx = Context::new();
        let ptr = DataType::pointer_to(DataType::int());
        let first = ctx.nullable_equality_candidate(BuiltinOperator::Equal, &ptr);
        let second = ctx.nullable_equality_candidate(BuiltinOperator::Equal, &ptr);
        assert_eq!(first, second);
        let decl = ctx.func(first);
        assert_eq!(decl.return_type.ty, DataType::Bool);
        assert!(decl.is_implicit());
    }
}
