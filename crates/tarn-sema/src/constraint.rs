//! Constraint generation.
//!
//! The generator walks an expression computing a *goal* type, emitting
//! equality and conformance constraints along the way. Each constraint
//! records the source range of the node it came from and the name of the
//! generating routine, so solver failures point somewhere useful.
//!
//! Overload resolution re-runs the generator once per candidate: the
//! candidate's parameter types flow in as expected types, and every
//! coercion the generator has to assume (a literal re-typed, a concrete
//! value promoted to `Any`, a generic parameter bound) is tallied as a
//! punishment. Solutions are compared by punishment severity, worst level
//! first.

use std::cmp::Ordering;

use tarn_ast::{DataType, Expr, ExprKind};
use tarn_common::SourceRange;

use crate::context::Context;

/// One coercion step a solution had to assume, ordered worst-first.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CoercionKind {
    AnyPromotion,
    ExistentialPromotion,
    GenericPromotion,
    StringLiteralPromotion,
    NumericLiteralPromotion,
}

impl CoercionKind {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            CoercionKind::AnyPromotion => 0,
            CoercionKind::ExistentialPromotion => 1,
            CoercionKind::GenericPromotion => 2,
            CoercionKind::StringLiteralPromotion => 3,
            CoercionKind::NumericLiteralPromotion => 4,
        }
    }
}

/// A multiset of coercion tags. Comparison is lexicographic across
/// severity levels, worst level first: a solution is better exactly when,
/// at the first level where the counts differ, it has the lower count.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Punishments([u32; CoercionKind::COUNT]);

impl Punishments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: CoercionKind) {
        self.0[kind.index()] += 1;
    }

    pub fn count(&self, kind: CoercionKind) -> u32 {
        self.0[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }
}

impl PartialOrd for Punishments {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Punishments {
    fn cmp(&self, other: &Self) -> Ordering {
        // Array Ord is lexicographic; lower at the first differing
        // severity level means a better (smaller) solution.
        self.0.cmp(&other.0)
    }
}

/// What a constraint demands.
#[derive(Clone, Debug)]
pub enum ConstraintKind {
    /// Structural equality after canonicalisation.
    Equal(DataType, DataType),
    /// The left type must be a declared type conforming to the protocol
    /// named by the right type.
    Conforms(DataType, DataType),
}

/// A single constraint with its provenance.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub range: Option<SourceRange>,
    /// The generating routine, for diagnostics and solver traces.
    pub caller: &'static str,
}

/// A byte-pointer or byte-array shape a string literal can take on.
fn byte_string_shape(ty: &DataType) -> bool {
    match ty {
        DataType::Pointer(inner) => {
            **inner == DataType::int8() || **inner == DataType::uint8()
        }
        DataType::Array { element, .. } => {
            **element == DataType::int8() || **element == DataType::uint8()
        }
        _ => false,
    }
}

/// The constraint generator. One instance per solve attempt; overload
/// resolution resets it by constructing a fresh one per candidate.
pub struct ConstraintGenerator<'ctx> {
    ctx: &'ctx Context,
    pub constraints: Vec<Constraint>,
    pub punishments: Punishments,
    fresh_counter: u32,
}

impl<'ctx> ConstraintGenerator<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        ConstraintGenerator {
            ctx,
            constraints: Vec::new(),
            punishments: Punishments::new(),
            fresh_counter: 0,
        }
    }

    /// Mint a fresh metavariable.
    pub fn fresh_meta(&mut self) -> DataType {
        let name = format!("${}", self.fresh_counter);
        self.fresh_counter += 1;
        DataType::MetaVariable(name)
    }

    pub fn constrain_equal(
        &mut self,
        a: DataType,
        b: DataType,
        range: Option<SourceRange>,
        caller: &'static str,
    ) {
        self.constraints.push(Constraint { kind: ConstraintKind::Equal(a, b), range, caller });
    }

    pub fn constrain_conforms(
        &mut self,
        ty: DataType,
        protocol: DataType,
        range: Option<SourceRange>,
        caller: &'static str,
    ) {
        self.constraints
            .push(Constraint { kind: ConstraintKind::Conforms(ty, protocol), range, caller });
    }

    /// Compute the goal type of `expr` under an optional expected type.
    ///
    /// Resolved expressions contribute their annotated type. Literal
    /// expressions negotiate with the expected type: a numeric literal
    /// takes on any expected numeric type (tallying a numeric-literal
    /// promotion when that changes it), `nil` takes on any nil-compatible
    /// expected type, string literals follow byte-pointer shapes. The
    /// expected type also drives `Any`, existential, and generic
    /// promotion tallies.
    pub fn goal(&mut self, expr: &Expr, expected: Option<&DataType>) -> DataType {
        let expected = expected.map(|e| self.ctx.canonicalize(e));
        let base = self.base_goal(expr, expected.as_ref());
        match expected {
            Some(expected) => self.adjust(expr, base, expected),
            None => base,
        }
    }

    /// The goal before expectation adjustment.
    fn base_goal(&mut self, expr: &Expr, expected: Option<&DataType>) -> DataType {
        if let Some(ty) = &expr.ty {
            return ty.clone();
        }
        match &expr.kind {
            ExprKind::Num { .. } => DataType::int(),
            ExprKind::Float { .. } => DataType::double(),
            ExprKind::Char { .. } => DataType::int8(),
            ExprKind::Bool { .. } => DataType::Bool,
            ExprKind::Str { .. } | ExprKind::PoundFunction => DataType::string(),
            ExprKind::Nil => DataType::NilLiteral,
            ExprKind::Void => DataType::Void,
            ExprKind::Paren { value } => self.base_goal(value, expected),
            ExprKind::Tuple { elements } => {
                let expected_fields = match expected {
                    Some(DataType::Tuple(fields)) if fields.len() == elements.len() => {
                        Some(fields.clone())
                    }
                    _ => None,
                };
                DataType::Tuple(
                    elements
                        .iter()
                        .enumerate()
                        .map(|(i, e)| {
                            self.goal(e, expected_fields.as_ref().map(|f| &f[i]))
                        })
                        .collect(),
                )
            }
            ExprKind::Array { elements } => {
                let expected_element = match expected {
                    Some(DataType::Array { element, .. }) => Some((**element).clone()),
                    _ => None,
                };
                let element = match elements.first() {
                    Some(first) => self.goal(first, expected_element.as_ref()),
                    None => expected_element.clone().unwrap_or_else(|| self.fresh_meta()),
                };
                for rest in elements.iter().skip(1) {
                    let rest_goal = self.goal(rest, expected_element.as_ref());
                    self.constrain_equal(
                        element.clone(),
                        rest_goal,
                        rest.range.clone(),
                        "array_literal",
                    );
                }
                DataType::Array { element: Box::new(element), length: Some(elements.len()) }
            }
            ExprKind::Ternary { then_value, else_value, .. } => {
                let result = self.fresh_meta();
                let then_goal = self.goal(then_value, expected);
                let else_goal = self.goal(else_value, expected);
                self.constrain_equal(
                    result.clone(),
                    then_goal,
                    then_value.range.clone(),
                    "ternary",
                );
                self.constrain_equal(
                    result.clone(),
                    else_goal,
                    else_value.range.clone(),
                    "ternary",
                );
                result
            }
            // Anything unresolved gets a metavariable; the surrounding
            // constraints pin it down or the solve fails.
            _ => self.fresh_meta(),
        }
    }

    /// Reconcile a goal with the expected type, tallying punishments and
    /// emitting conformance constraints. Returns the adjusted goal.
    fn adjust(&mut self, expr: &Expr, base: DataType, expected: DataType) -> DataType {
        use CoercionKind::*;

        if base == expected {
            return base;
        }

        // Any swallows every concrete value, at the worst rank.
        if expected == DataType::Any {
            if base != DataType::Any {
                self.punishments.add(AnyPromotion);
            }
            return expected;
        }

        // An expected protocol type is an existential: demand conformance
        // and pass the value at the protocol type.
        if let DataType::Custom(name) = &expected {
            if self.ctx.protocol_named(name).is_some() {
                self.punishments.add(ExistentialPromotion);
                self.constrain_conforms(
                    base,
                    expected.clone(),
                    expr.range.clone(),
                    "existential",
                );
                return expected;
            }
        }

        // A generic parameter binds to whatever the argument is.
        if matches!(expected, DataType::TypeVariable(_)) {
            self.punishments.add(GenericPromotion);
            return base;
        }

        // Literal negotiation.
        if let ExprKind::Paren { value } = &expr.kind {
            return self.adjust(value, base, expected);
        }
        match &expr.kind {
            ExprKind::Num { .. } | ExprKind::Char { .. } if expected.is_numeric() => {
                self.punishments.add(NumericLiteralPromotion);
                return expected;
            }
            ExprKind::Float { .. } if expected.is_floating() => {
                self.punishments.add(NumericLiteralPromotion);
                return expected;
            }
            ExprKind::Str { .. } if byte_string_shape(&expected) => {
                self.punishments.add(StringLiteralPromotion);
                return expected;
            }
            ExprKind::Nil if self.ctx.can_be_nil(&expected) => return expected,
            _ => {}
        }

        base
    }
}
