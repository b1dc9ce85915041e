//! Classes, instances, and `super()` dispatch.
//!
//! Inheritance is single: a class has at most one base, and method lookup
//! walks the chain until found or exhausted. Methods may be script functions
//! or host builtins interchangeably, including mixed chains where a script
//! class extends a host class or vice versa.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::object::Object;

pub struct Class {
    pub(crate) name: String,
    pub(crate) base: Option<Rc<Class>>,
    /// Method name → `Function` or `Builtin`, in definition order.
    pub(crate) methods: IndexMap<String, Object>,
    pub(crate) doc: Option<String>,
}

impl Class {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base(&self) -> Option<&Rc<Class>> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Finds a method by walking the inheritance chain, returning the method
    /// and the class that defines it (the latter anchors `super()`).
    pub(crate) fn find_method(class: &Rc<Self>, name: &str) -> Option<(Object, Rc<Self>)> {
        let mut current = Rc::clone(class);
        loop {
            if let Some(method) = current.methods.get(name) {
                return Some((method.clone(), current));
            }
            let Some(base) = current.base.clone() else {
                return None;
            };
            current = base;
        }
    }

    /// True when `class` is `ancestor` or inherits from it.
    pub(crate) fn is_subclass_of(class: &Rc<Self>, ancestor: &Rc<Self>) -> bool {
        let mut current = Rc::clone(class);
        loop {
            if Rc::ptr_eq(&current, ancestor) {
                return true;
            }
            let Some(base) = current.base.clone() else {
                return false;
            };
            current = base;
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.name)
    }
}

/// A value produced by calling a class.
pub struct Instance {
    pub(crate) class: Rc<Class>,
    pub(crate) fields: IndexMap<String, Object>,
}

impl Instance {
    #[must_use]
    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Object> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: &str, value: Object) {
        self.fields.insert(name.to_owned(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}

/// The value of `super()` inside a method: dispatches method calls to the
/// base-class chain, passing the current instance as `self`.
pub struct SuperProxy {
    pub(crate) instance: Weak<RefCell<Instance>>,
    /// First class searched for methods (the immediate base of the class
    /// defining the calling method).
    pub(crate) start: Rc<Class>,
}

impl fmt::Debug for SuperProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<super: {}>", self.start.name)
    }
}
