//! The constraint solver: unification with an occurs check.
//!
//! Metavariables and type variables are keyed into an `ena` union-find
//! table by their generated names. Solving walks the constraint list,
//! canonicalises both sides, and unifies structurally; binding a variable
//! to a type that mentions it is an infinite type and fails the solve.
//! The surviving bindings become the solution's substitution.

use ena::unify::InPlaceUnificationTable;
use rustc_hash::FxHashMap;

use tarn_ast::DataType;
use tarn_common::SourceRange;

use crate::constraint::{Constraint, ConstraintKind, Punishments};
use crate::context::Context;
use crate::error::SemaError;

// ── ena plumbing ────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct MetaKey(u32);

/// A type bound to a unification key.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Bound(DataType);

impl ena::unify::UnifyKey for MetaKey {
    type Value = Option<Bound>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        MetaKey(u)
    }

    fn tag() -> &'static str {
        "MetaKey"
    }
}

impl ena::unify::EqUnifyValue for Bound {}

// ── Errors and solutions ────────────────────────────────────────────────

/// Why a solve failed.
#[derive(Clone, Debug)]
pub enum SolveError {
    CannotConvert { from: DataType, to: DataType, range: Option<SourceRange> },
    InfiniteType { var: String, ty: DataType, range: Option<SourceRange> },
    DoesNotConform { ty: DataType, protocol: DataType, range: Option<SourceRange> },
}

impl SolveError {
    /// Lower into the analyzer's error taxonomy.
    pub fn into_sema_error(self) -> SemaError {
        match self {
            SolveError::CannotConvert { from, to, range } => {
                SemaError::TypeMismatch { expected: to, found: from, range }
            }
            SolveError::InfiniteType { var, ty, range } => {
                SemaError::InfiniteType { var, ty, range }
            }
            SolveError::DoesNotConform { ty, protocol, range } => SemaError::TypeDoesNotConform {
                type_name: ty.to_string(),
                protocol: protocol.to_string(),
                missing: Vec::new(),
                range,
            },
        }
    }
}

/// A successful solve: the substitution for every bound variable plus the
/// punishments accumulated on the way to it.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSolution {
    pub substitution: FxHashMap<String, DataType>,
    pub punishments: Punishments,
}

impl ConstraintSolution {
    /// Apply the substitution throughout a type. Unbound variables stay.
    pub fn apply(&self, ty: &DataType) -> DataType {
        match ty {
            DataType::MetaVariable(name) | DataType::TypeVariable(name) => {
                match self.substitution.get(name) {
                    Some(bound) => self.apply(bound),
                    None => ty.clone(),
                }
            }
            DataType::Pointer(inner) => DataType::pointer_to(self.apply(inner)),
            DataType::Array { element, length } => {
                DataType::Array { element: Box::new(self.apply(element)), length: *length }
            }
            DataType::Tuple(fields) => {
                DataType::Tuple(fields.iter().map(|f| self.apply(f)).collect())
            }
            DataType::Function { args, ret, has_varargs } => DataType::Function {
                args: args.iter().map(|a| self.apply(a)).collect(),
                ret: Box::new(self.apply(ret)),
                has_varargs: *has_varargs,
            },
            other => other.clone(),
        }
    }
}

// ── Solver ──────────────────────────────────────────────────────────────

/// Solve a constraint system. `seed` carries the punishments the generator
/// tallied while producing the constraints.
pub fn solve_system(
    ctx: &Context,
    constraints: &[Constraint],
    seed: Punishments,
) -> Result<ConstraintSolution, SolveError> {
    let mut solver = Solver {
        ctx,
        table: InPlaceUnificationTable::new(),
        keys: FxHashMap::default(),
    };

    // Equality constraints first so conformance checks see bound
    // variables; relative order within each group is generation order.
    for constraint in constraints {
        if let ConstraintKind::Equal(a, b) = &constraint.kind {
            solver.unify(a.clone(), b.clone(), constraint.range.as_ref())?;
        }
    }
    for constraint in constraints {
        if let ConstraintKind::Conforms(ty, protocol) = &constraint.kind {
            solver.check_conforms(ty.clone(), protocol.clone(), constraint.range.as_ref())?;
        }
    }

    let mut substitution = FxHashMap::default();
    let names: Vec<String> = solver.keys.keys().cloned().collect();
    for name in names {
        let key = solver.keys[&name];
        if let Some(Bound(ty)) = solver.table.probe_value(key) {
            let resolved = solver.resolve(ty);
            substitution.insert(name, resolved);
        }
    }

    Ok(ConstraintSolution { substitution, punishments: seed })
}

struct Solver<'ctx> {
    ctx: &'ctx Context,
    table: InPlaceUnificationTable<MetaKey>,
    keys: FxHashMap<String, MetaKey>,
}

impl<'ctx> Solver<'ctx> {
    fn key_for(&mut self, name: &str) -> MetaKey {
        if let Some(key) = self.keys.get(name) {
            return *key;
        }
        let key = self.table.new_key(None);
        self.keys.insert(name.to_string(), key);
        key
    }

    /// Follow union-find bindings through a type.
    fn resolve(&mut self, ty: DataType) -> DataType {
        match ty {
            DataType::MetaVariable(ref name) | DataType::TypeVariable(ref name) => {
                let key = self.key_for(name);
                match self.table.probe_value(key) {
                    Some(Bound(inner)) => self.resolve(inner),
                    None => ty,
                }
            }
            DataType::Pointer(inner) => DataType::pointer_to(self.resolve(*inner)),
            DataType::Array { element, length } => {
                DataType::Array { element: Box::new(self.resolve(*element)), length }
            }
            DataType::Tuple(fields) => {
                DataType::Tuple(fields.into_iter().map(|f| self.resolve(f)).collect())
            }
            DataType::Function { args, ret, has_varargs } => DataType::Function {
                args: args.into_iter().map(|a| self.resolve(a)).collect(),
                ret: Box::new(self.resolve(*ret)),
                has_varargs,
            },
            other => other,
        }
    }

    /// Does `name` occur anywhere in `ty` (following bindings)? Binding a
    /// variable to a type mentioning itself would build an infinite type.
    fn occurs_in(&mut self, name: &str, ty: &DataType) -> bool {
        match ty {
            DataType::MetaVariable(other) | DataType::TypeVariable(other) => {
                if other == name {
                    return true;
                }
                let key = self.key_for(other);
                match self.table.probe_value(key) {
                    Some(Bound(inner)) => self.occurs_in(name, &inner),
                    None => false,
                }
            }
            DataType::Pointer(inner) => self.occurs_in(name, inner),
            DataType::Array { element, .. } => self.occurs_in(name, element),
            DataType::Tuple(fields) => fields.iter().any(|f| self.occurs_in(name, f)),
            DataType::Function { args, ret, .. } => {
                args.iter().any(|a| self.occurs_in(name, a)) || self.occurs_in(name, ret)
            }
            _ => false,
        }
    }

    fn unify(
        &mut self,
        a: DataType,
        b: DataType,
        range: Option<&SourceRange>,
    ) -> Result<(), SolveError> {
        let a = self.resolve(self.ctx.canonicalize(&a));
        let b = self.resolve(self.ctx.canonicalize(&b));

        if a == b {
            return Ok(());
        }

        match (a, b) {
            // Two unbound variables: union their keys.
            (
                DataType::MetaVariable(n1) | DataType::TypeVariable(n1),
                DataType::MetaVariable(n2) | DataType::TypeVariable(n2),
            ) => {
                let k1 = self.key_for(&n1);
                let k2 = self.key_for(&n2);
                self.table
                    .unify_var_var(k1, k2)
                    .expect("unifying two unbound variables cannot conflict");
                Ok(())
            }

            // Variable meets concrete type: occurs check, then bind.
            (DataType::MetaVariable(name) | DataType::TypeVariable(name), ty)
            | (ty, DataType::MetaVariable(name) | DataType::TypeVariable(name)) => {
                if self.occurs_in(&name, &ty) {
                    return Err(SolveError::InfiniteType {
                        var: name,
                        ty,
                        range: range.cloned(),
                    });
                }
                let key = self.key_for(&name);
                self.table
                    .unify_var_value(key, Some(Bound(ty)))
                    .expect("binding an unbound variable cannot conflict");
                Ok(())
            }

            // Functions: arities must agree unless one side is variadic;
            // then the shared prefix and returns unify pairwise.
            (
                DataType::Function { args: a_args, ret: a_ret, has_varargs: a_var },
                DataType::Function { args: b_args, ret: b_ret, has_varargs: b_var },
            ) => {
                let arity_ok = if a_var || b_var {
                    if a_var && !b_var {
                        b_args.len() >= a_args.len()
                    } else if b_var && !a_var {
                        a_args.len() >= b_args.len()
                    } else {
                        true
                    }
                } else {
                    a_args.len() == b_args.len()
                };
                if !arity_ok {
                    return Err(SolveError::CannotConvert {
                        from: DataType::Function { args: a_args, ret: a_ret, has_varargs: a_var },
                        to: DataType::Function { args: b_args, ret: b_ret, has_varargs: b_var },
                        range: range.cloned(),
                    });
                }
                let shared = a_args.len().min(b_args.len());
                for (x, y) in a_args.into_iter().take(shared).zip(b_args.into_iter()) {
                    self.unify(x, y, range)?;
                }
                self.unify(*a_ret, *b_ret, range)
            }

            // Pointers are mutually compatible without binding.
            (DataType::Pointer(_), DataType::Pointer(_)) => Ok(()),

            // Bool and integers interconvert.
            (DataType::Bool, DataType::Int { .. }) | (DataType::Int { .. }, DataType::Bool) => {
                Ok(())
            }

            // Any matches everything.
            (DataType::Any, _) | (_, DataType::Any) => Ok(()),

            // nil matches any nil-compatible type.
            (DataType::NilLiteral, ty) | (ty, DataType::NilLiteral)
                if self.ctx.can_be_nil(&ty) =>
            {
                Ok(())
            }

            (DataType::Tuple(xs), DataType::Tuple(ys)) => {
                if xs.len() != ys.len() {
                    return Err(SolveError::CannotConvert {
                        from: DataType::Tuple(xs),
                        to: DataType::Tuple(ys),
                        range: range.cloned(),
                    });
                }
                for (x, y) in xs.into_iter().zip(ys.into_iter()) {
                    self.unify(x, y, range)?;
                }
                Ok(())
            }

            (
                DataType::Array { element: x, length: xl },
                DataType::Array { element: y, length: yl },
            ) => {
                if let (Some(xl), Some(yl)) = (xl, yl) {
                    if xl != yl {
                        return Err(SolveError::CannotConvert {
                            from: DataType::Array { element: x, length: Some(xl) },
                            to: DataType::Array { element: y, length: Some(yl) },
                            range: range.cloned(),
                        });
                    }
                }
                self.unify(*x, *y, range)
            }

            (from, to) => Err(SolveError::CannotConvert { from, to, range: range.cloned() }),
        }
    }

    /// A conformance constraint reduces to "the type may stand where the
    /// protocol existential is expected" once the declared conformance is
    /// verified.
    fn check_conforms(
        &mut self,
        ty: DataType,
        protocol: DataType,
        range: Option<&SourceRange>,
    ) -> Result<(), SolveError> {
        let resolved = self.resolve(self.ctx.canonicalize(&ty));
        let protocol_canonical = self.ctx.canonicalize(&protocol);

        // Any already is an existential.
        if resolved == DataType::Any {
            return Ok(());
        }

        let protocol_id = match &protocol_canonical {
            DataType::Custom(name) => self.ctx.protocol_named(name),
            _ => None,
        };
        let Some(protocol_id) = protocol_id else {
            return Err(SolveError::DoesNotConform {
                ty: resolved,
                protocol: protocol_canonical,
                range: range.cloned(),
            });
        };

        let type_id = self.ctx.type_decl_for(&resolved);
        match type_id {
            Some(type_id) if self.ctx.type_conforms_to(type_id, protocol_id) => Ok(()),
            _ => Err(SolveError::DoesNotConform {
                ty: resolved,
                protocol: protocol_canonical,
                range: range.cloned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ConstraintGenerator;
    use tarn_ast::{ProtocolDecl, TypeDecl};
    use tarn_common::Identifier;

    fn equal(a: DataType, b: DataType) -> Constraint {
        Constraint { kind: ConstraintKind::Equal(a, b), range: None, caller: "test" }
    }

    fn meta(name: &str) -> DataType {
        DataType::MetaVariable(name.to_string())
    }

    #[test]
    fn binds_meta_to_concrete() {
        let ctx = Context::new();
        let system = [equal(meta("$0"), DataType::int())];
        let solution = solve_system(&ctx, &system, Punishments::new()).unwrap();
        assert_eq!(solution.substitution["$0"], DataType::int());
        assert_eq!(solution.apply(&meta("$0")), DataType::int());
    }

    #[test]
    fn chained_variables_share_a_binding() {
        let ctx = Context::new();
        let system = [
            equal(meta("$0"), meta("$1")),
            equal(meta("$1"), DataType::Bool),
        ];
        let solution = solve_system(&ctx, &system, Punishments::new()).unwrap();
        assert_eq!(solution.apply(&meta("$0")), DataType::Bool);
        assert_eq!(solution.apply(&meta("$1")), DataType::Bool);
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let ctx = Context::new();
        let system = [equal(
            meta("$0"),
            DataType::function(vec![meta("$0")], DataType::int()),
        )];
        let err = solve_system(&ctx, &system, Punishments::new()).unwrap_err();
        assert!(matches!(err, SolveError::InfiniteType { ref var, .. } if var == "$0"));
    }

    #[test]
    fn no_binding_mentions_its_own_variable() {
        let ctx = Context::new();
        let system = [
            equal(meta("$0"), DataType::Tuple(vec![meta("$1"), DataType::int()])),
            equal(meta("$1"), DataType::Bool),
        ];
        let solution = solve_system(&ctx, &system, Punishments::new()).unwrap();
        for (name, ty) in &solution.substitution {
            let mut probe = Solver {
                ctx: &ctx,
                table: InPlaceUnificationTable::new(),
                keys: FxHashMap::default(),
            };
            assert!(
                !probe.occurs_in(name, ty),
                "substitution binds {} to {} which mentions it",
                name,
                ty
            );
        }
    }

    #[test]
    fn function_mismatch_fails() {
        let ctx = Context::new();
        let system = [equal(
            DataType::function(vec![DataType::int()], DataType::int()),
            DataType::function(vec![DataType::string()], DataType::int()),
        )];
        assert!(solve_system(&ctx, &system, Punishments::new()).is_err());
    }

    #[test]
    fn varargs_absorbs_extra_arguments() {
        let ctx = Context::new();
        let call = DataType::function(
            vec![DataType::string(), DataType::int(), DataType::int()],
            meta("$r"),
        );
        let callee = DataType::varargs_function(vec![DataType::string()], DataType::int32());
        let solution =
            solve_system(&ctx, &[equal(call, callee)], Punishments::new()).unwrap();
        assert_eq!(solution.apply(&meta("$r")), DataType::int32());
    }

    #[test]
    fn incompatible_scalars_fail() {
        let ctx = Context::new();
        let err = solve_system(
            &ctx,
            &[equal(DataType::int(), DataType::double())],
            Punishments::new(),
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::CannotConvert { .. }));
    }

    #[test]
    fn any_is_universal() {
        let ctx = Context::new();
        assert!(solve_system(
            &ctx,
            &[equal(DataType::Any, DataType::int())],
            Punishments::new()
        )
        .is_ok());
        assert!(solve_system(
            &ctx,
            &[equal(DataType::string(), DataType::Any)],
            Punishments::new()
        )
        .is_ok());
    }

    #[test]
    fn conformance_reduces_to_membership() {
        let mut ctx = Context::new();
        let mut proto = ProtocolDecl::new("Drawable");
        proto.range = None;
        ctx.add_protocol(proto).unwrap();
        let mut shape = TypeDecl::new("Circle");
        shape.conformances.push(Identifier::new("Drawable"));
        ctx.add_type(shape).unwrap();
        ctx.add_type(TypeDecl::new("Blob")).unwrap();

        let conforms = |ty: &str| Constraint {
            kind: ConstraintKind::Conforms(
                DataType::custom(ty),
                DataType::custom("Drawable"),
            ),
            range: None,
            caller: "test",
        };
        assert!(solve_system(&ctx, &[conforms("Circle")], Punishments::new()).is_ok());
        let err = solve_system(&ctx, &[conforms("Blob")], Punishments::new()).unwrap_err();
        assert!(matches!(err, SolveError::DoesNotConform { .. }));
    }

    #[test]
    fn generator_and_solver_agree_on_literals() {
        let ctx = Context::new();
        let mut gen = ConstraintGenerator::new(&ctx);
        let arr = tarn_ast::Expr::array(vec![
            tarn_ast::Expr::num(1),
            tarn_ast::Expr::num(2),
        ]);
        let goal = gen.goal(&arr, None);
        let solution = solve_system(&ctx, &gen.constraints, gen.punishments).unwrap();
        assert_eq!(
            solution.apply(&goal),
            DataType::Array { element: Box::new(DataType::int()), length: Some(2) }
        );
    }
}
