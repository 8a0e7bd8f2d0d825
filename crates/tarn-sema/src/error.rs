//! The semantic error taxonomy.
//!
//! Every diagnostic the analyzer can produce is a variant here, carrying
//! the data needed for a precise message plus the source range it anchors
//! to. Errors are values: the analyzer records them into the diagnostic
//! engine and keeps walking, so one mistake reports once and later cascade
//! errors are tolerated.

use std::fmt;

use tarn_ast::{BuiltinOperator, DataType};
use tarn_common::{Diagnostic, DiagnosticEngine, Severity, SourceRange};

/// A semantic error or warning.
#[derive(Clone, Debug)]
pub enum SemaError {
    // ── Lookup ──────────────────────────────────────────────────────────
    UnknownType { ty: DataType, range: Option<SourceRange> },
    UnknownFunction { name: String, range: Option<SourceRange> },
    UnknownVariable { name: String, range: Option<SourceRange> },
    UnknownProperty { type_name: String, name: String, range: Option<SourceRange> },
    UnknownProtocol { name: String, range: Option<SourceRange> },

    // ── Redeclaration ───────────────────────────────────────────────────
    DuplicateVar { name: String, range: Option<SourceRange> },
    DuplicateType { name: String, range: Option<SourceRange> },
    DuplicateFunction { name: String, range: Option<SourceRange> },
    DuplicateOperatorOverload { op: BuiltinOperator, range: Option<SourceRange> },
    DuplicateMethod { type_name: String, name: String, range: Option<SourceRange> },
    DuplicateField { type_name: String, name: String, range: Option<SourceRange> },
    DuplicateMain { range: Option<SourceRange> },
    DuplicateProtocol { name: String, range: Option<SourceRange> },

    // ── Signature ───────────────────────────────────────────────────────
    ArityMismatch { expected: usize, found: usize, range: Option<SourceRange> },
    MissingArgumentLabel { label: String, range: Option<SourceRange> },
    ExtraArgumentLabel { label: String, range: Option<SourceRange> },
    IncorrectArgumentLabel { expected: String, found: String, range: Option<SourceRange> },
    NonMatchingElementType { expected: DataType, found: DataType, range: Option<SourceRange> },
    TupleIndexOutOfBounds { index: usize, arity: usize, range: Option<SourceRange> },
    CircularAlias { name: String, range: Option<SourceRange> },
    ReferenceSelfInProperty { type_name: String, property: String, range: Option<SourceRange> },
    InvalidMain { got: DataType, range: Option<SourceRange> },

    // ── Types ───────────────────────────────────────────────────────────
    TypeMismatch { expected: DataType, found: DataType, range: Option<SourceRange> },
    InvalidOperands {
        op: BuiltinOperator,
        lhs: DataType,
        rhs: Option<DataType>,
        range: Option<SourceRange>,
    },
    CannotCoerce { from: DataType, to: DataType, range: Option<SourceRange> },
    CannotDowncastFromAny { target: DataType, range: Option<SourceRange> },
    CannotSubscript { ty: DataType, range: Option<SourceRange> },
    CannotSwitch { ty: DataType, range: Option<SourceRange> },
    NonConstantCase { range: Option<SourceRange> },
    NotCallable { ty: DataType, range: Option<SourceRange> },
    Overflow { raw: String, ty: DataType, range: Option<SourceRange> },
    Underflow { raw: String, ty: DataType, range: Option<SourceRange> },
    ShiftPastBitWidth { amount: i64, width: u8, range: Option<SourceRange> },
    NonBoolCondition { found: DataType, range: Option<SourceRange> },
    NonBoolTernary { found: DataType, range: Option<SourceRange> },
    PointerPropertyAccess { ty: DataType, range: Option<SourceRange> },
    TuplePropertyAccess { ty: DataType, range: Option<SourceRange> },
    FieldOfFunctionType { name: String, range: Option<SourceRange> },
    NonPointerNil { ty: Option<DataType>, range: Option<SourceRange> },
    /// `is` where the result is statically known (warning).
    StaticTypeCheck { always: bool, range: Option<SourceRange> },

    // ── Flow ────────────────────────────────────────────────────────────
    BreakOutsideLoop { range: Option<SourceRange> },
    ContinueOutsideLoop { range: Option<SourceRange> },
    /// Statements after a terminator in the same block (warning).
    DeadCode { range: Option<SourceRange> },
    NotAllPathsReturn { name: String, range: Option<SourceRange> },
    PoundFunctionOutsideFunction { range: Option<SourceRange> },

    // ── Declarations ────────────────────────────────────────────────────
    ForeignWithBody { name: String, range: Option<SourceRange> },
    NonForeignWithoutBody { name: String, range: Option<SourceRange> },
    VarArgsOnNonForeign { name: String, range: Option<SourceRange> },
    ForeignVarWithValue { name: String, range: Option<SourceRange> },
    DeinitOnNonIndirect { type_name: String, range: Option<SourceRange> },
    AssignToConstant { name: Option<String>, range: Option<SourceRange> },
    AddressOfRValue { range: Option<SourceRange> },
    OperatorCannotBeOverloaded { op: BuiltinOperator, range: Option<SourceRange> },
    OperatorArity { op: BuiltinOperator, found: usize, range: Option<SourceRange> },
    InvalidModifier { modifier: String, decl: String, range: Option<SourceRange> },
    MutatingOnImmutable { method: String, range: Option<SourceRange> },

    // ── Conformance & overloads ─────────────────────────────────────────
    TypeDoesNotConform {
        type_name: String,
        protocol: String,
        missing: Vec<String>,
        range: Option<SourceRange>,
    },
    NoViableOverload {
        name: String,
        candidates: Vec<String>,
        range: Option<SourceRange>,
    },
    AmbiguousOverload {
        name: String,
        candidates: Vec<String>,
        range: Option<SourceRange>,
    },
    InfiniteType { var: String, ty: DataType, range: Option<SourceRange> },
}

impl SemaError {
    pub fn severity(&self) -> Severity {
        match self {
            SemaError::DeadCode { .. } | SemaError::StaticTypeCheck { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn range(&self) -> Option<&SourceRange> {
        use SemaError::*;
        match self {
            UnknownType { range, .. }
            | UnknownFunction { range, .. }
            | UnknownVariable { range, .. }
            | UnknownProperty { range, .. }
            | UnknownProtocol { range, .. }
            | DuplicateVar { range, .. }
            | DuplicateType { range, .. }
            | DuplicateFunction { range, .. }
            | DuplicateOperatorOverload { range, .. }
            | DuplicateMethod { range, .. }
            | DuplicateField { range, .. }
            | DuplicateMain { range }
            | DuplicateProtocol { range, .. }
            | ArityMismatch { range, .. }
            | MissingArgumentLabel { range, .. }
            | ExtraArgumentLabel { range, .. }
            | IncorrectArgumentLabel { range, .. }
            | NonMatchingElementType { range, .. }
            | TupleIndexOutOfBounds { range, .. }
            | CircularAlias { range, .. }
            | ReferenceSelfInProperty { range, .. }
            | InvalidMain { range, .. }
            | TypeMismatch { range, .. }
            | InvalidOperands { range, .. }
            | CannotCoerce { range, .. }
            | CannotDowncastFromAny { range, .. }
            | CannotSubscript { range, .. }
            | CannotSwitch { range, .. }
            | NonConstantCase { range }
            | NotCallable { range, .. }
            | Overflow { range, .. }
            | Underflow { range, .. }
            | ShiftPastBitWidth { range, .. }
            | NonBoolCondition { range, .. }
            | NonBoolTernary { range, .. }
            | PointerPropertyAccess { range, .. }
            | TuplePropertyAccess { range, .. }
            | FieldOfFunctionType { range, .. }
            | NonPointerNil { range, .. }
            | StaticTypeCheck { range, .. }
            | BreakOutsideLoop { range }
            | ContinueOutsideLoop { range }
            | DeadCode { range }
            | NotAllPathsReturn { range, .. }
            | PoundFunctionOutsideFunction { range }
            | ForeignWithBody { range, .. }
            | NonForeignWithoutBody { range, .. }
            | VarArgsOnNonForeign { range, .. }
            | ForeignVarWithValue { range, .. }
            | DeinitOnNonIndirect { range, .. }
            | AssignToConstant { range, .. }
            | AddressOfRValue { range }
            | OperatorCannotBeOverloaded { range, .. }
            | OperatorArity { range, .. }
            | InvalidModifier { range, .. }
            | MutatingOnImmutable { range, .. }
            | TypeDoesNotConform { range, .. }
            | NoViableOverload { range, .. }
            | AmbiguousOverload { range, .. }
            | InfiniteType { range, .. } => range.as_ref(),
        }
    }

    /// Notes that follow the primary diagnostic: candidate listings, fix
    /// hints, missing-requirement details.
    pub fn notes(&self) -> Vec<String> {
        match self {
            SemaError::NoViableOverload { candidates, .. }
            | SemaError::AmbiguousOverload { candidates, .. } => candidates
                .iter()
                .map(|c| format!("candidate: {}", c))
                .collect(),
            SemaError::CannotDowncastFromAny { target, .. } => {
                vec![format!("add an explicit cast: `as {}`", target)]
            }
            SemaError::TypeDoesNotConform { missing, .. } => missing
                .iter()
                .map(|m| format!("missing implementation: {}", m))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Record this error (plus its notes) into the engine.
    pub fn emit(&self, engine: &mut DiagnosticEngine) {
        let mut diag = Diagnostic::new(self.severity(), self.to_string());
        if let Some(range) = self.range() {
            diag = diag.highlighting(range.clone());
        }
        engine.add(diag);
        for note in self.notes() {
            engine.note(note);
        }
    }
}

impl fmt::Display for SemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SemaError::*;
        match self {
            UnknownType { ty, .. } => write!(f, "unknown type `{}`", ty),
            UnknownFunction { name, .. } => write!(f, "unknown function `{}`", name),
            UnknownVariable { name, .. } => write!(f, "unknown variable `{}`", name),
            UnknownProperty { type_name, name, .. } => {
                write!(f, "type `{}` has no property `{}`", type_name, name)
            }
            UnknownProtocol { name, .. } => write!(f, "unknown protocol `{}`", name),

            DuplicateVar { name, .. } => write!(f, "redeclaration of variable `{}`", name),
            DuplicateType { name, .. } => write!(f, "redeclaration of type `{}`", name),
            DuplicateFunction { name, .. } => {
                write!(f, "redeclaration of function `{}` with the same signature", name)
            }
            DuplicateOperatorOverload { op, .. } => {
                write!(f, "redeclaration of operator `{}` with the same operand types", op)
            }
            DuplicateMethod { type_name, name, .. } => {
                write!(f, "redeclaration of method `{}` on type `{}`", name, type_name)
            }
            DuplicateField { type_name, name, .. } => {
                write!(f, "redeclaration of property `{}` on type `{}`", name, type_name)
            }
            DuplicateMain { .. } => write!(f, "redeclaration of `main`"),
            DuplicateProtocol { name, .. } => {
                write!(f, "redeclaration of protocol `{}`", name)
            }

            ArityMismatch { expected, found, .. } => {
                write!(f, "expected {} argument(s), found {}", expected, found)
            }
            MissingArgumentLabel { label, .. } => {
                write!(f, "missing argument label `{}:`", label)
            }
            ExtraArgumentLabel { label, .. } => {
                write!(f, "extraneous argument label `{}:`", label)
            }
            IncorrectArgumentLabel { expected, found, .. } => {
                write!(f, "incorrect argument label: expected `{}:`, found `{}:`", expected, found)
            }
            NonMatchingElementType { expected, found, .. } => {
                write!(f, "array element type `{}` does not match `{}`", found, expected)
            }
            TupleIndexOutOfBounds { index, arity, .. } => {
                write!(f, "tuple field index {} is out of bounds for a {}-element tuple", index, arity)
            }
            CircularAlias { name, .. } => {
                write!(f, "type alias `{}` is circular", name)
            }
            ReferenceSelfInProperty { type_name, property, .. } => {
                write!(
                    f,
                    "type `{}` stores itself in property `{}`; mark the type `indirect` or store a pointer",
                    type_name, property
                )
            }
            InvalidMain { got, .. } => {
                write!(f, "invalid signature for `main`: got `{}`", got)
            }

            TypeMismatch { expected, found, .. } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", expected, found)
            }
            InvalidOperands { op, lhs, rhs: Some(rhs), .. } => {
                write!(f, "invalid operands to `{}`: `{}` and `{}`", op, lhs, rhs)
            }
            InvalidOperands { op, lhs, rhs: None, .. } => {
                write!(f, "invalid operand to `{}`: `{}`", op, lhs)
            }
            CannotCoerce { from, to, .. } => {
                write!(f, "cannot coerce `{}` to `{}`", from, to)
            }
            CannotDowncastFromAny { target, .. } => {
                write!(f, "cannot downcast `Any` to `{}` without an explicit cast", target)
            }
            CannotSubscript { ty, .. } => write!(f, "cannot subscript value of type `{}`", ty),
            CannotSwitch { ty, .. } => write!(f, "cannot switch over value of type `{}`", ty),
            NonConstantCase { .. } => {
                write!(f, "switch cases must be compile-time constants")
            }
            NotCallable { ty, .. } => write!(f, "cannot call value of type `{}`", ty),
            Overflow { raw, ty, .. } => {
                write!(f, "literal `{}` overflows `{}`", raw, ty)
            }
            Underflow { raw, ty, .. } => {
                write!(f, "literal `{}` underflows `{}`", raw, ty)
            }
            ShiftPastBitWidth { amount, width, .. } => {
                write!(f, "shift amount {} exceeds the {}-bit operand width", amount, width)
            }
            NonBoolCondition { found, .. } => {
                write!(f, "condition must be `Bool`, found `{}`", found)
            }
            NonBoolTernary { found, .. } => {
                write!(f, "ternary condition must be `Bool`, found `{}`", found)
            }
            PointerPropertyAccess { ty, .. } => {
                write!(f, "cannot access a property on pointer type `{}`; dereference it first", ty)
            }
            TuplePropertyAccess { ty, .. } => {
                write!(f, "cannot access a named property on tuple type `{}`; use a field index", ty)
            }
            FieldOfFunctionType { name, .. } => {
                write!(f, "cannot access field `{}` on a function value", name)
            }
            NonPointerNil { ty: Some(ty), .. } => {
                write!(f, "`nil` requires a pointer or indirect type, found `{}`", ty)
            }
            NonPointerNil { ty: None, .. } => {
                write!(f, "`nil` requires a pointer or indirect type context")
            }
            StaticTypeCheck { always: true, .. } => {
                write!(f, "`is` check always succeeds")
            }
            StaticTypeCheck { always: false, .. } => {
                write!(f, "`is` check always fails")
            }

            BreakOutsideLoop { .. } => write!(f, "`break` outside of a loop"),
            ContinueOutsideLoop { .. } => write!(f, "`continue` outside of a loop"),
            DeadCode { .. } => write!(f, "code after this point will never be executed"),
            NotAllPathsReturn { name, .. } => {
                write!(f, "not all paths through `{}` return a value", name)
            }
            PoundFunctionOutsideFunction { .. } => {
                write!(f, "`#function` used outside of a function")
            }

            ForeignWithBody { name, .. } => {
                write!(f, "foreign function `{}` cannot have a body", name)
            }
            NonForeignWithoutBody { name, .. } => {
                write!(f, "function `{}` must have a body", name)
            }
            VarArgsOnNonForeign { name, .. } => {
                write!(f, "only foreign functions may be variadic; `{}` is not foreign", name)
            }
            ForeignVarWithValue { name, .. } => {
                write!(f, "foreign variable `{}` cannot have an initial value", name)
            }
            DeinitOnNonIndirect { type_name, .. } => {
                write!(f, "`deinit` requires `{}` to be an indirect type", type_name)
            }
            AssignToConstant { name: Some(name), .. } => {
                write!(f, "cannot assign to constant `{}`", name)
            }
            AssignToConstant { name: None, .. } => {
                write!(f, "cannot assign to an immutable value")
            }
            AddressOfRValue { .. } => {
                write!(f, "cannot take the address of a temporary value")
            }
            OperatorCannotBeOverloaded { op, .. } => {
                write!(f, "operator `{}` cannot be overloaded", op)
            }
            OperatorArity { op, found, .. } => {
                write!(f, "operator `{}` must take exactly 2 parameters, found {}", op, found)
            }
            InvalidModifier { modifier, decl, .. } => {
                write!(f, "modifier `{}` is not valid on {}", modifier, decl)
            }
            MutatingOnImmutable { method, .. } => {
                write!(f, "cannot call mutating method `{}` on an immutable value", method)
            }

            TypeDoesNotConform { type_name, protocol, .. } => {
                write!(f, "type `{}` does not conform to protocol `{}`", type_name, protocol)
            }
            NoViableOverload { name, .. } => {
                write!(f, "no viable overload of `{}` for the given arguments", name)
            }
            AmbiguousOverload { name, .. } => {
                write!(f, "ambiguous reference to `{}`", name)
            }
            InfiniteType { var, ty, .. } => {
                write!(f, "infinite type: `{}` occurs in `{}`", var, ty)
            }
        }
    }
}
