//! The structural type algebra for the Tarn type system.
//!
//! Defines the core `DataType` sum type together with its context-free
//! operations: constructors, predicates, pointer-level counting, builtin
//! name mapping, and display. Anything that needs the alias table or the
//! type-declaration registry (canonicalisation, validity, coercibility)
//! lives on the compilation context instead.

use std::fmt;

/// The three floating-point widths.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// 32-bit IEEE float (`Float`).
    Float,
    /// 64-bit IEEE float (`Double`).
    Double,
    /// 80-bit x87 extended float (`Float80`).
    Float80,
}

/// A Tarn type.
///
/// `TypeVariable` and `MetaVariable` are placeholders that only exist while
/// the constraint solver is running: type variables come from generic
/// parameter declarations, metavariables are minted fresh during constraint
/// generation. Neither survives into a fully-typed tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A fixed-width integer. Valid widths are 8, 16, 32, and 64.
    Int { width: u8, signed: bool },
    /// A floating-point number.
    Floating(FloatKind),
    Bool,
    Void,
    /// The top type: every canonical type coerces to and from `Any`.
    Any,
    /// The type of a bare `nil` literal before context gives it a pointer
    /// or indirect type.
    NilLiteral,
    /// The poison type assigned to expressions that failed to check.
    /// Propagates silently so one mistake does not cascade.
    Error,
    /// A nominal type reference, resolved through the type-declaration
    /// table or the alias table.
    Custom(String),
    Pointer(Box<DataType>),
    /// An array. `length: None` means the length is not yet known
    /// (an incomplete array type).
    Array { element: Box<DataType>, length: Option<usize> },
    Tuple(Vec<DataType>),
    Function { args: Vec<DataType>, ret: Box<DataType>, has_varargs: bool },
    /// A generic parameter, identified by its declared name.
    TypeVariable(String),
    /// A solver-introduced placeholder, identified by a generated name.
    MetaVariable(String),
}

impl DataType {
    // ── Constructors ────────────────────────────────────────────────────

    /// The default integer type, `Int` (64-bit signed).
    pub fn int() -> DataType {
        DataType::Int { width: 64, signed: true }
    }

    pub fn int8() -> DataType {
        DataType::Int { width: 8, signed: true }
    }

    pub fn int16() -> DataType {
        DataType::Int { width: 16, signed: true }
    }

    pub fn int32() -> DataType {
        DataType::Int { width: 32, signed: true }
    }

    pub fn uint() -> DataType {
        DataType::Int { width: 64, signed: false }
    }

    pub fn uint8() -> DataType {
        DataType::Int { width: 8, signed: false }
    }

    pub fn uint16() -> DataType {
        DataType::Int { width: 16, signed: false }
    }

    pub fn uint32() -> DataType {
        DataType::Int { width: 32, signed: false }
    }

    pub fn float() -> DataType {
        DataType::Floating(FloatKind::Float)
    }

    pub fn double() -> DataType {
        DataType::Floating(FloatKind::Double)
    }

    pub fn float80() -> DataType {
        DataType::Floating(FloatKind::Float80)
    }

    /// A pointer to `pointee`.
    pub fn pointer_to(pointee: DataType) -> DataType {
        DataType::Pointer(Box::new(pointee))
    }

    /// The type of string literals: `*Int8`.
    pub fn string() -> DataType {
        DataType::pointer_to(DataType::int8())
    }

    pub fn custom(name: impl Into<String>) -> DataType {
        DataType::Custom(name.into())
    }

    pub fn array_of(element: DataType, length: Option<usize>) -> DataType {
        DataType::Array { element: Box::new(element), length }
    }

    pub fn function(args: Vec<DataType>, ret: DataType) -> DataType {
        DataType::Function { args, ret: Box::new(ret), has_varargs: false }
    }

    pub fn varargs_function(args: Vec<DataType>, ret: DataType) -> DataType {
        DataType::Function { args, ret: Box::new(ret), has_varargs: true }
    }

    // ── Builtin names ───────────────────────────────────────────────────

    /// Resolve a builtin type name (`Int`, `UInt8`, `Float80`, ...) to its
    /// type. Returns `None` for names that are not builtin.
    pub fn from_builtin_name(name: &str) -> Option<DataType> {
        let ty = match name {
            "Int" => DataType::int(),
            "Int8" => DataType::int8(),
            "Int16" => DataType::int16(),
            "Int32" => DataType::int32(),
            "Int64" => DataType::int(),
            "UInt" => DataType::uint(),
            "UInt8" => DataType::uint8(),
            "UInt16" => DataType::uint16(),
            "UInt32" => DataType::uint32(),
            "UInt64" => DataType::uint(),
            "Bool" => DataType::Bool,
            "Void" => DataType::Void,
            "Float" => DataType::float(),
            "Double" => DataType::double(),
            "Float80" => DataType::float80(),
            "Any" => DataType::Any,
            _ => return None,
        };
        Some(ty)
    }

    /// The names seeded into the type namespace before any user code.
    pub fn builtin_names() -> &'static [&'static str] {
        &[
            "Int", "Int8", "Int16", "Int32", "UInt", "UInt8", "UInt16", "UInt32", "Bool",
            "Void", "Float", "Double", "Float80", "Any",
        ]
    }

    // ── Predicates ──────────────────────────────────────────────────────

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int { .. })
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Floating(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating()
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, DataType::Pointer(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, DataType::Function { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DataType::TypeVariable(_) | DataType::MetaVariable(_))
    }

    /// How many pointer layers wrap this type. `**Int8` has level 2.
    pub fn pointer_level(&self) -> usize {
        match self {
            DataType::Pointer(inner) => 1 + inner.pointer_level(),
            _ => 0,
        }
    }

    /// Strip all pointer layers, returning `(level, root)`.
    pub fn pointer_root(&self) -> (usize, &DataType) {
        match self {
            DataType::Pointer(inner) => {
                let (level, root) = inner.pointer_root();
                (level + 1, root)
            }
            other => (0, other),
        }
    }

    /// The pointee, if this is a pointer.
    pub fn pointee(&self) -> Option<&DataType> {
        match self {
            DataType::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int { width: 64, signed: true } => write!(f, "Int"),
            DataType::Int { width: 64, signed: false } => write!(f, "UInt"),
            DataType::Int { width, signed: true } => write!(f, "Int{}", width),
            DataType::Int { width, signed: false } => write!(f, "UInt{}", width),
            DataType::Floating(FloatKind::Float) => write!(f, "Float"),
            DataType::Floating(FloatKind::Double) => write!(f, "Double"),
            DataType::Floating(FloatKind::Float80) => write!(f, "Float80"),
            DataType::Bool => write!(f, "Bool"),
            DataType::Void => write!(f, "Void"),
            DataType::Any => write!(f, "Any"),
            DataType::NilLiteral => write!(f, "nil"),
            DataType::Error => write!(f, "<error>"),
            DataType::Custom(name) => write!(f, "{}", name),
            DataType::Pointer(inner) => write!(f, "*{}", inner),
            DataType::Array { element, length: Some(n) } => write!(f, "[{}; {}]", element, n),
            DataType::Array { element, length: None } => write!(f, "[{}]", element),
            DataType::Tuple(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", field)?;
                }
                write!(f, ")")
            }
            DataType::Function { args, ret, has_varargs } => {
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                if *has_varargs {
                    if !args.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ") -> {}", ret)
            }
            DataType::TypeVariable(name) => write!(f, "{}", name),
            DataType::MetaVariable(name) => write!(f, "{}", name),
        }
    }
}
