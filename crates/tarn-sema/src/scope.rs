//! Lexical scopes for local name resolution.
//!
//! A stack of frames mapping names to bindings. Function bodies, blocks,
//! and closures each push a frame; lookup walks innermost-out. The frame
//! index a name resolved in lets the closure machinery decide whether the
//! reference crosses a closure boundary and must be captured.

use rustc_hash::FxHashMap;

use tarn_ast::{DataType, DeclRef};

/// One resolved name binding.
#[derive(Clone, Debug)]
pub struct Binding {
    pub decl: DeclRef,
    pub ty: DataType,
    pub mutable: bool,
}

/// The scope stack. Frames are pushed and popped with strict stack
/// discipline; helpers on the analyzer guarantee the pop happens on every
/// exit path.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<FxHashMap<String, Binding>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop_frame(&mut self) {
        debug_assert!(!self.frames.is_empty(), "unbalanced scope pop");
        self.frames.pop();
    }

    /// Number of live frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame, shadowing any outer binding.
    pub fn insert(&mut self, name: impl Into<String>, binding: Binding) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), binding);
        }
    }

    /// Whether `name` is already bound in the innermost frame
    /// (a same-scope redeclaration).
    pub fn declared_in_current_frame(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains_key(name))
    }

    /// Resolve `name`, innermost frame first. Returns the binding and the
    /// index of the frame it was found in.
    pub fn lookup(&self, name: &str) -> Option<(&Binding, usize)> {
        for (index, frame) in self.frames.iter().enumerate().rev() {
            if let Some(binding) = frame.get(name) {
                return Some((binding, index));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarn_ast::LocalId;

    fn local(id: u32, ty: DataType, mutable: bool) -> Binding {
        Binding { decl: DeclRef::Local(LocalId(id)), ty, mutable }
    }

    #[test]
    fn shadowing_resolves_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.push_frame();
        scopes.insert("x", local(0, DataType::int(), false));
        scopes.push_frame();
        scopes.insert("x", local(1, DataType::Bool, true));

        let (binding, frame) = scopes.lookup("x").unwrap();
        assert_eq!(binding.decl, DeclRef::Local(LocalId(1)));
        assert_eq!(frame, 1);

        scopes.pop_frame();
        let (binding, frame) = scopes.lookup("x").unwrap();
        assert_eq!(binding.decl, DeclRef::Local(LocalId(0)));
        assert_eq!(frame, 0);
    }

    #[test]
    fn current_frame_redeclaration_check() {
        let mut scopes = ScopeStack::new();
        scopes.push_frame();
        scopes.insert("x", local(0, DataType::int(), false));
        scopes.push_frame();
        assert!(!scopes.declared_in_current_frame("x"));
        scopes.insert("x", local(1, DataType::int(), false));
        assert!(scopes.declared_in_current_frame("x"));
    }

    #[test]
    fn lookup_missing() {
        let mut scopes = ScopeStack::new();
        scopes.push_frame();
        assert!(scopes.lookup("ghost").is_none());
    }
}
