//! Lexically nested name → value scopes.
//!
//! Scopes form a parent-linked chain: local → enclosing → global. Closures
//! keep their defining scope alive through the shared `Rc`, and `global` /
//! `nonlocal` declarations redirect writes to outer scopes.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::{AHashMap, AHashSet};

use crate::{
    exception::{ExcType, Exception},
    object::Object,
};

pub(crate) type ScopeRef = Rc<RefCell<Namespace>>;

pub(crate) struct Namespace {
    store: AHashMap<String, Object>,
    parent: Option<ScopeRef>,
    /// Names declared `global` in this scope.
    globals: AHashSet<String>,
    /// Names declared `nonlocal` in this scope.
    nonlocals: AHashSet<String>,
}

impl Namespace {
    pub fn new_root() -> ScopeRef {
        Rc::new(RefCell::new(Self {
            store: AHashMap::new(),
            parent: None,
            globals: AHashSet::new(),
            nonlocals: AHashSet::new(),
        }))
    }

    pub fn new_child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            store: AHashMap::new(),
            parent: Some(Rc::clone(parent)),
            globals: AHashSet::new(),
            nonlocals: AHashSet::new(),
        }))
    }

    /// Walks outward to the root (global) scope.
    pub fn root(scope: &ScopeRef) -> ScopeRef {
        let mut current = Rc::clone(scope);
        loop {
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Looks a name up through the scope chain.
    pub fn get(scope: &ScopeRef, name: &str) -> Option<Object> {
        let mut current = Rc::clone(scope);
        loop {
            if let Some(value) = current.borrow().store.get(name) {
                return Some(value.clone());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Binds a name, honoring `global`/`nonlocal` declarations made in the
    /// current scope.
    pub fn set(scope: &ScopeRef, name: &str, value: Object) {
        let (is_global, is_nonlocal) = {
            let scope_ref = scope.borrow();
            (scope_ref.globals.contains(name), scope_ref.nonlocals.contains(name))
        };
        if is_global {
            Self::root(scope).borrow_mut().store.insert(name.to_owned(), value);
            return;
        }
        if is_nonlocal {
            // Validated at declaration time; fall back to local on a stale
            // declaration rather than corrupting an unrelated scope.
            if let Some(target) = Self::find_nonlocal_target(scope, name) {
                target.borrow_mut().store.insert(name.to_owned(), value);
                return;
            }
        }
        scope.borrow_mut().store.insert(name.to_owned(), value);
    }

    /// Binds a name directly in this scope, ignoring declarations.
    pub fn set_local(scope: &ScopeRef, name: &str, value: Object) {
        scope.borrow_mut().store.insert(name.to_owned(), value);
    }

    /// Marks a name as referring to the global scope.
    pub fn declare_global(scope: &ScopeRef, name: &str) {
        scope.borrow_mut().globals.insert(name.to_owned());
    }

    /// Marks a name as referring to the nearest enclosing non-global scope
    /// that already defines it. A missing target is an error.
    pub fn declare_nonlocal(scope: &ScopeRef, name: &str) -> Result<(), Exception> {
        if Self::find_nonlocal_target(scope, name).is_none() {
            return Err(Exception::new(
                ExcType::NameError,
                format!("no binding for nonlocal '{name}' found"),
            ));
        }
        scope.borrow_mut().nonlocals.insert(name.to_owned());
        Ok(())
    }

    /// Nearest enclosing non-root scope that defines `name`.
    fn find_nonlocal_target(scope: &ScopeRef, name: &str) -> Option<ScopeRef> {
        let mut current = scope.borrow().parent.clone()?;
        loop {
            let parent = current.borrow().parent.clone();
            let Some(parent) = parent else {
                // `current` is the root scope: nonlocal never targets it.
                return None;
            };
            if current.borrow().store.contains_key(name) {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Names bound directly in this scope, for collecting class bodies and
    /// script-library exports.
    pub fn local_names(scope: &ScopeRef) -> Vec<String> {
        scope.borrow().store.keys().cloned().collect()
    }

    pub fn get_local(scope: &ScopeRef, name: &str) -> Option<Object> {
        scope.borrow().store.get(name).cloned()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values may cycle back through closures; print names only.
        let mut names: Vec<&str> = self.store.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Namespace")
            .field("names", &names)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
