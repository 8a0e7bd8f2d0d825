//! Protocol conformance checking.
//!
//! For every conformance a type declares, the requirements of the protocol
//! and all of its parents are collected, and each is matched against the
//! type's methods by name, arity, external labels, and pairwise type
//! compatibility (`Any` in a requirement accepts any concrete type).
//! Matching methods record the protocol they satisfy; missing ones produce
//! one conformance error with a note per absent requirement.

use rustc_hash::FxHashSet;

use tarn_ast::{FuncId, ProtocolId, TypeId};

use super::SemanticAnalyzer;
use crate::error::SemaError;

impl SemanticAnalyzer<'_> {
    pub(crate) fn check_conformances(&mut self, type_id: TypeId) {
        let conformances = self.ctx.type_decl(type_id).conformances.clone();
        for declared in conformances {
            let Some(protocol_id) = self.ctx.protocol_named(declared.as_str()) else {
                self.report(SemaError::UnknownProtocol {
                    name: declared.name.clone(),
                    range: declared
                        .range
                        .clone()
                        .or_else(|| self.ctx.type_decl(type_id).range.clone()),
                });
                continue;
            };
            self.check_one_conformance(type_id, protocol_id);
        }
    }

    fn check_one_conformance(&mut self, type_id: TypeId, protocol_id: ProtocolId) {
        let requirements = self.collect_requirements(protocol_id);

        let mut missing = Vec::new();
        for requirement in requirements {
            match self.find_witness(type_id, requirement) {
                Some(witness) => {
                    let satisfied = &mut self.ctx.func_mut(witness).satisfied_protocols;
                    if !satisfied.contains(&protocol_id) {
                        satisfied.push(protocol_id);
                    }
                }
                None => {
                    missing.push(self.ctx.func(requirement).formatted_signature());
                }
            }
        }

        if !missing.is_empty() {
            let type_name = self.ctx.type_decl(type_id).name.name.clone();
            let protocol = self.ctx.protocol(protocol_id).name.name.clone();
            let range = self.ctx.type_decl(type_id).range.clone();
            self.report(SemaError::TypeDoesNotConform { type_name, protocol, missing, range });
        }
    }

    /// All requirements of a protocol and its parents, transitively.
    /// Parent cycles are tolerated here; parent resolution already
    /// reported unknown names.
    fn collect_requirements(&self, protocol_id: ProtocolId) -> Vec<FuncId> {
        let mut requirements = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![protocol_id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let protocol = self.ctx.protocol(current);
            requirements.extend(protocol.requirements.iter().copied());
            for parent in &protocol.parents {
                if let Some(parent_id) = self.ctx.protocol_named(parent.as_str()) {
                    stack.push(parent_id);
                }
            }
        }
        requirements
    }

    /// A witness matches a requirement when the names agree, the explicit
    /// arities agree, the external labels agree position by position, and
    /// every parameter and the return type are pairwise compatible.
    fn find_witness(&self, type_id: TypeId, requirement: FuncId) -> Option<FuncId> {
        let required = self.ctx.func(requirement);
        let type_decl = self.ctx.type_decl(type_id);

        type_decl
            .methods
            .iter()
            .chain(type_decl.static_methods.iter())
            .copied()
            .find(|candidate| {
                let method = self.ctx.func(*candidate);
                if method.name != required.name {
                    return false;
                }
                let required_params = required.explicit_params();
                let method_params = method.explicit_params();
                if required_params.len() != method_params.len() {
                    return false;
                }
                let labels_match = required_params.iter().zip(method_params).all(|(r, m)| {
                    r.external_name.as_ref().map(|l| l.as_str())
                        == m.external_name.as_ref().map(|l| l.as_str())
                });
                if !labels_match {
                    return false;
                }
                let params_match = required_params.iter().zip(method_params).all(|(r, m)| {
                    self.ctx
                        .match_rank(&r.type_annotation.ty, &m.type_annotation.ty)
                        .is_some()
                });
                params_match
                    && self
                        .ctx
                        .match_rank(&required.return_type.ty, &method.return_type.ty)
                        .is_some()
            })
    }
}
