//! Declaration nodes.
//!
//! All function-like declarations (free functions, operators, initializers,
//! deinitializers, methods, subscripts, property accessors) share one node,
//! [`FuncDecl`], discriminated by [`FunctionKind`]. Declarations live in
//! arenas owned by the compilation context; the rest of the tree refers to
//! them through the typed indices defined here, which keeps the AST an
//! acyclic owning tree even though a method and its enclosing type mention
//! each other.

use std::fmt;

use tarn_common::{Identifier, SourceRange};

use crate::expr::Expr;
use crate::op::BuiltinOperator;
use crate::stmt::CompoundStmt;
use crate::ty::DataType;

// ── Arena handles ────────────────────────────────────────────────────────

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(
    /// Index of a function-like declaration in the context's function arena.
    FuncId
);
arena_id!(
    /// Index of a type declaration in the context's type arena.
    TypeId
);
arena_id!(
    /// Index of a protocol declaration in the context's protocol arena.
    ProtocolId
);
arena_id!(
    /// Index of a global variable declaration in the context's global arena.
    GlobalId
);
arena_id!(
    /// Index of a type alias in the context's alias arena.
    AliasId
);
arena_id!(
    /// Index of an extension in the context's extension arena.
    ExtensionId
);
arena_id!(
    /// Index of a local binding minted during semantic analysis.
    LocalId
);

/// A non-owning back-reference from an expression to the declaration it
/// resolved to. Installed by semantic analysis; the back-end requires one
/// on every name, call, operator, and property reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclRef {
    Func(FuncId),
    Global(GlobalId),
    Local(LocalId),
    /// Parameter `usize` of function `FuncId`.
    Param(FuncId, usize),
    /// Stored property `usize` of type `TypeId`.
    Property(TypeId, usize),
    Type(TypeId),
    Protocol(ProtocolId),
}

// ── Modifiers ────────────────────────────────────────────────────────────

/// The kinds of declaration a modifier can attach to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    Operator,
    Initializer,
    Deinitializer,
    Method,
    Subscript,
    Property,
    Param,
    Var,
    Type,
    TypeAlias,
    Protocol,
    Extension,
    GenericParam,
}

/// A declaration modifier tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclModifier {
    /// Declared elsewhere; no body, linked by symbol name.
    Foreign,
    /// Member of the type itself rather than of instances.
    Static,
    /// A method allowed to reassign `self` or stored properties.
    Mutating,
    /// Instances live behind a pointer; enables `deinit` and `nil`.
    Indirect,
    /// The function never returns; calls terminate the enclosing path.
    Noreturn,
    /// Synthesized by the compiler, exempt from body requirements.
    Implicit,
}

impl DeclModifier {
    /// Whether this modifier is legal on the given declaration kind.
    pub fn is_valid_on(self, kind: DeclKind) -> bool {
        use DeclKind::*;
        match self {
            DeclModifier::Foreign => matches!(kind, Function | Var | Type),
            DeclModifier::Static => matches!(kind, Method | Property | Subscript),
            DeclModifier::Mutating => matches!(kind, Method | Subscript),
            DeclModifier::Indirect => matches!(kind, Type),
            DeclModifier::Noreturn => matches!(kind, Function | Method),
            DeclModifier::Implicit => !matches!(kind, Extension | GenericParam),
        }
    }

    pub fn spelling(self) -> &'static str {
        match self {
            DeclModifier::Foreign => "foreign",
            DeclModifier::Static => "static",
            DeclModifier::Mutating => "mutating",
            DeclModifier::Indirect => "indirect",
            DeclModifier::Noreturn => "noreturn",
            DeclModifier::Implicit => "implicit",
        }
    }

    fn bit(self) -> u8 {
        match self {
            DeclModifier::Foreign => 1 << 0,
            DeclModifier::Static => 1 << 1,
            DeclModifier::Mutating => 1 << 2,
            DeclModifier::Indirect => 1 << 3,
            DeclModifier::Noreturn => 1 << 4,
            DeclModifier::Implicit => 1 << 5,
        }
    }

    const ALL: [DeclModifier; 6] = [
        DeclModifier::Foreign,
        DeclModifier::Static,
        DeclModifier::Mutating,
        DeclModifier::Indirect,
        DeclModifier::Noreturn,
        DeclModifier::Implicit,
    ];
}

impl fmt::Display for DeclModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

/// A small set of modifier tags.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, modifier: DeclModifier) -> Self {
        self.insert(modifier);
        self
    }

    pub fn insert(&mut self, modifier: DeclModifier) {
        self.0 |= modifier.bit();
    }

    pub fn contains(self, modifier: DeclModifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = DeclModifier> {
        DeclModifier::ALL
            .into_iter()
            .filter(move |m| self.contains(*m))
    }
}

impl FromIterator<DeclModifier> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = DeclModifier>>(iter: I) -> Self {
        let mut set = ModifierSet::new();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

// ── Type annotations ─────────────────────────────────────────────────────

/// A type written in source: the resolved structural type plus the range it
/// was spelled at. The parser lowers pointer/array/tuple/function type
/// syntax directly into the `DataType`.
#[derive(Clone, Debug)]
pub struct TypeAnnotation {
    pub ty: DataType,
    pub range: Option<SourceRange>,
}

impl TypeAnnotation {
    pub fn new(ty: DataType) -> Self {
        TypeAnnotation { ty, range: None }
    }

    pub fn with_range(ty: DataType, range: SourceRange) -> Self {
        TypeAnnotation { ty, range: Some(range) }
    }
}

impl From<DataType> for TypeAnnotation {
    fn from(ty: DataType) -> Self {
        TypeAnnotation::new(ty)
    }
}

// ── Function-like declarations ───────────────────────────────────────────

/// Which property accessor a `FunctionKind::Property` entry is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Accessor {
    Getter,
    Setter,
}

/// What flavor of function-like declaration a `FuncDecl` is. Member kinds
/// carry the parent type so a declaration is self-describing without a
/// back-pointer to its `TypeDecl`.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionKind {
    Free,
    Initializer(DataType),
    Deinitializer(DataType),
    Method(DataType),
    StaticMethod(DataType),
    Subscript(DataType),
    Property(DataType, Accessor),
    Operator(BuiltinOperator),
}

impl FunctionKind {
    /// The enclosing type, for member kinds.
    pub fn parent_type(&self) -> Option<&DataType> {
        match self {
            FunctionKind::Free | FunctionKind::Operator(_) => None,
            FunctionKind::Initializer(parent)
            | FunctionKind::Deinitializer(parent)
            | FunctionKind::Method(parent)
            | FunctionKind::StaticMethod(parent)
            | FunctionKind::Subscript(parent)
            | FunctionKind::Property(parent, _) => Some(parent),
        }
    }

    pub fn is_member(&self) -> bool {
        self.parent_type().is_some()
    }
}

/// Any function-like declaration.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: Identifier,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeAnnotation,
    pub has_varargs: bool,
    pub body: Option<CompoundStmt>,
    pub modifiers: ModifierSet,
    pub kind: FunctionKind,
    pub generic_params: Vec<GenericParamDecl>,
    /// Protocols whose requirement this method satisfies. Recorded during
    /// conformance checking; consumed by witness-table emission.
    pub satisfied_protocols: Vec<ProtocolId>,
    pub range: Option<SourceRange>,
}

impl FuncDecl {
    pub fn new(name: impl Into<Identifier>, params: Vec<ParamDecl>, ret: DataType) -> Self {
        FuncDecl {
            name: name.into(),
            params,
            return_type: TypeAnnotation::new(ret),
            has_varargs: false,
            body: None,
            modifiers: ModifierSet::new(),
            kind: FunctionKind::Free,
            generic_params: Vec::new(),
            satisfied_protocols: Vec::new(),
            range: None,
        }
    }

    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_body(mut self, body: CompoundStmt) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_modifiers(mut self, modifiers: ModifierSet) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn has_modifier(&self, modifier: DeclModifier) -> bool {
        self.modifiers.contains(modifier)
    }

    pub fn is_foreign(&self) -> bool {
        self.has_modifier(DeclModifier::Foreign)
    }

    pub fn is_implicit(&self) -> bool {
        self.has_modifier(DeclModifier::Implicit)
    }

    pub fn is_noreturn(&self) -> bool {
        self.has_modifier(DeclModifier::Noreturn)
    }

    pub fn is_mutating(&self) -> bool {
        self.has_modifier(DeclModifier::Mutating)
    }

    /// The parameters a call site supplies, i.e. everything after the
    /// implicit `self` slot (if any).
    pub fn explicit_params(&self) -> &[ParamDecl] {
        match self.params.first() {
            Some(first) if first.is_implicit_self => &self.params[1..],
            _ => &self.params,
        }
    }

    /// The function's structural type over all parameters, implicit self
    /// included.
    pub fn type_of(&self) -> DataType {
        DataType::Function {
            args: self.params.iter().map(|p| p.type_annotation.ty.clone()).collect(),
            ret: Box::new(self.return_type.ty.clone()),
            has_varargs: self.has_varargs,
        }
    }

    /// The function's type from a call site's perspective: implicit self
    /// stripped.
    pub fn call_type(&self) -> DataType {
        DataType::Function {
            args: self
                .explicit_params()
                .iter()
                .map(|p| p.type_annotation.ty.clone())
                .collect(),
            ret: Box::new(self.return_type.ty.clone()),
            has_varargs: self.has_varargs,
        }
    }

    /// Render the signature the way candidate notes print it:
    /// `name(label: Int, _: Double) -> Bool`.
    pub fn formatted_signature(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let _ = write!(out, "{}(", self.name);
        for (i, param) in self.explicit_params().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            match &param.external_name {
                Some(label) => {
                    let _ = write!(out, "{}: {}", label, param.type_annotation.ty);
                }
                None => {
                    let _ = write!(out, "_: {}", param.type_annotation.ty);
                }
            }
        }
        if self.has_varargs {
            if !self.explicit_params().is_empty() {
                out.push_str(", ");
            }
            out.push_str("...");
        }
        out.push(')');
        if self.return_type.ty != DataType::Void {
            let _ = write!(out, " -> {}", self.return_type.ty);
        }
        out
    }

    /// The `DeclKind` used for modifier validation.
    pub fn decl_kind(&self) -> DeclKind {
        match self.kind {
            FunctionKind::Free => DeclKind::Function,
            FunctionKind::Operator(_) => DeclKind::Operator,
            FunctionKind::Initializer(_) => DeclKind::Initializer,
            FunctionKind::Deinitializer(_) => DeclKind::Deinitializer,
            FunctionKind::Method(_) | FunctionKind::StaticMethod(_) => DeclKind::Method,
            FunctionKind::Subscript(_) => DeclKind::Subscript,
            FunctionKind::Property(..) => DeclKind::Property,
        }
    }
}

/// One parameter of a function-like declaration.
///
/// `external_name` is the label a call site must write (`None` means the
/// argument is unlabeled); `name` is the binding visible in the body.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub external_name: Option<Identifier>,
    pub name: Identifier,
    pub type_annotation: TypeAnnotation,
    pub is_implicit_self: bool,
    pub range: Option<SourceRange>,
}

impl ParamDecl {
    /// An unlabeled parameter.
    pub fn unlabeled(name: impl Into<Identifier>, ty: DataType) -> Self {
        ParamDecl {
            external_name: None,
            name: name.into(),
            type_annotation: TypeAnnotation::new(ty),
            is_implicit_self: false,
            range: None,
        }
    }

    /// A parameter whose external label equals its binding name.
    pub fn labeled(name: impl Into<Identifier>, ty: DataType) -> Self {
        let name = name.into();
        ParamDecl {
            external_name: Some(name.clone()),
            name,
            type_annotation: TypeAnnotation::new(ty),
            is_implicit_self: false,
            range: None,
        }
    }

    /// The synthetic `self` parameter of a member function.
    pub fn implicit_self(ty: DataType) -> Self {
        ParamDecl {
            external_name: None,
            name: Identifier::new("self"),
            type_annotation: TypeAnnotation::new(ty),
            is_implicit_self: true,
            range: None,
        }
    }
}

// ── Variables and properties ─────────────────────────────────────────────

/// Where a variable declaration lives. Finalized by semantic analysis.
#[derive(Clone, Debug, PartialEq)]
pub enum VarKind {
    Local,
    Global,
    Property(TypeId),
    ImplicitSelf,
}

/// A `let` or `var` declaration, local or global.
#[derive(Clone, Debug)]
pub struct VarAssignDecl {
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub rhs: Option<Expr>,
    pub mutable: bool,
    pub modifiers: ModifierSet,
    pub kind: VarKind,
    /// The binding handle minted for this declaration during analysis.
    pub local: Option<LocalId>,
    pub range: Option<SourceRange>,
}

impl VarAssignDecl {
    pub fn new(name: impl Into<Identifier>, mutable: bool) -> Self {
        VarAssignDecl {
            name: name.into(),
            type_annotation: None,
            rhs: None,
            mutable,
            modifiers: ModifierSet::new(),
            kind: VarKind::Local,
            local: None,
            range: None,
        }
    }

    pub fn with_type(mut self, ty: DataType) -> Self {
        self.type_annotation = Some(TypeAnnotation::new(ty));
        self
    }

    pub fn with_rhs(mut self, rhs: Expr) -> Self {
        self.rhs = Some(rhs);
        self
    }

    pub fn is_foreign(&self) -> bool {
        self.modifiers.contains(DeclModifier::Foreign)
    }
}

/// A stored property of a type, with optional computed accessors.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    pub name: Identifier,
    pub type_annotation: TypeAnnotation,
    pub default_value: Option<Expr>,
    pub mutable: bool,
    pub getter: Option<FuncId>,
    pub setter: Option<FuncId>,
    pub range: Option<SourceRange>,
}

impl PropertyDecl {
    pub fn new(name: impl Into<Identifier>, ty: DataType, mutable: bool) -> Self {
        PropertyDecl {
            name: name.into(),
            type_annotation: TypeAnnotation::new(ty),
            default_value: None,
            mutable,
            getter: None,
            setter: None,
            range: None,
        }
    }
}

// ── Nominal types, protocols, aliases, extensions ────────────────────────

/// A nominal type declaration.
#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: Identifier,
    pub generic_params: Vec<GenericParamDecl>,
    /// Protocols this type declares conformance to.
    pub conformances: Vec<Identifier>,
    pub modifiers: ModifierSet,
    pub properties: Vec<PropertyDecl>,
    pub initializers: Vec<FuncId>,
    pub methods: Vec<FuncId>,
    pub static_methods: Vec<FuncId>,
    pub subscripts: Vec<FuncId>,
    pub deinitializer: Option<FuncId>,
    pub range: Option<SourceRange>,
}

impl TypeDecl {
    pub fn new(name: impl Into<Identifier>) -> Self {
        TypeDecl {
            name: name.into(),
            generic_params: Vec::new(),
            conformances: Vec::new(),
            modifiers: ModifierSet::new(),
            properties: Vec::new(),
            initializers: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
            subscripts: Vec::new(),
            deinitializer: None,
            range: None,
        }
    }

    /// The structural type naming this declaration.
    pub fn ty(&self) -> DataType {
        DataType::Custom(self.name.name.clone())
    }

    pub fn is_indirect(&self) -> bool {
        self.modifiers.contains(DeclModifier::Indirect)
    }

    /// Index of the stored property with the given name.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == *name)
    }
}

/// A protocol declaration: a named bundle of method requirements.
#[derive(Clone, Debug)]
pub struct ProtocolDecl {
    pub name: Identifier,
    /// Parent protocols whose requirements this one inherits.
    pub parents: Vec<Identifier>,
    /// Method requirements; bodiless `FuncDecl`s in the function arena.
    pub requirements: Vec<FuncId>,
    pub range: Option<SourceRange>,
}

impl ProtocolDecl {
    pub fn new(name: impl Into<Identifier>) -> Self {
        ProtocolDecl {
            name: name.into(),
            parents: Vec::new(),
            requirements: Vec::new(),
            range: None,
        }
    }
}

/// A `type alias` declaration.
#[derive(Clone, Debug)]
pub struct TypeAliasDecl {
    pub name: Identifier,
    pub target: TypeAnnotation,
    pub range: Option<SourceRange>,
}

impl TypeAliasDecl {
    pub fn new(name: impl Into<Identifier>, target: DataType) -> Self {
        TypeAliasDecl {
            name: name.into(),
            target: TypeAnnotation::new(target),
            range: None,
        }
    }
}

/// An extension contributing methods and subscripts to an existing type.
#[derive(Clone, Debug)]
pub struct ExtensionDecl {
    pub extended: TypeAnnotation,
    pub methods: Vec<FuncId>,
    pub subscripts: Vec<FuncId>,
    pub range: Option<SourceRange>,
}

/// A generic parameter with optional protocol constraints.
#[derive(Clone, Debug)]
pub struct GenericParamDecl {
    pub name: Identifier,
    pub constraints: Vec<Identifier>,
    pub range: Option<SourceRange>,
}

impl GenericParamDecl {
    pub fn new(name: impl Into<Identifier>) -> Self {
        GenericParamDecl { name: name.into(), constraints: Vec::new(), range: None }
    }

    /// The type variable this parameter introduces into its scope.
    pub fn ty(&self) -> DataType {
        DataType::TypeVariable(self.name.name.clone())
    }
}
