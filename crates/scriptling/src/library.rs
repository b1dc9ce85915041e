//! Libraries and the import resolver.
//!
//! A library is a named, immutable bundle of functions, constants and
//! sub-libraries. Native libraries are assembled by a [`LibraryBuilder`];
//! script libraries are registered as name + source and evaluated lazily on
//! first import. Importing materializes a library into the current
//! environment as a dict keyed by member name, plus `__doc__`.

use std::{rc::Rc, sync::Arc};

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    args::ArgValues,
    cache::{ProgramCache, SourceKey},
    context::Context,
    eval::{collect_exports, eval_program},
    exception::{ExcType, Exception},
    function::Builtin,
    namespace::{Namespace, ScopeRef},
    object::{Dict, Object},
    parse::parse,
    signature::NativeFunction,
};

/// Maximum nesting of sub-libraries inside one library.
const MAX_LIBRARY_NESTING: usize = 5;
/// Maximum dotted-path depth accepted by the import resolver.
const MAX_IMPORT_DEPTH: usize = 10;

/// A named, immutable bundle of host functionality.
pub struct Library {
    name: String,
    description: String,
    functions: IndexMap<String, Builtin>,
    constants: IndexMap<String, Object>,
    children: Vec<Library>,
}

impl Library {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for native libraries.
///
/// ```
/// use scriptling::LibraryBuilder;
///
/// let lib = LibraryBuilder::new("mathx")
///     .description("extra math helpers")
///     .function("double", |n: i64| n * 2)
///     .constant("answer", 42i64)
///     .build();
/// assert_eq!(lib.name(), "mathx");
/// ```
pub struct LibraryBuilder {
    inner: Library,
}

impl LibraryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Library {
                name: name.into(),
                description: String::new(),
                functions: IndexMap::new(),
                constants: IndexMap::new(),
                children: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.inner.description = text.into();
        self
    }

    /// Adds a function with a native Rust signature.
    #[must_use]
    pub fn function<M>(mut self, name: &str, func: impl NativeFunction<M>) -> Self {
        let builtin = Builtin {
            name: name.to_owned(),
            func: func.into_builtin_impl(),
            help: None,
        };
        self.inner.functions.insert(name.to_owned(), builtin);
        self
    }

    /// Adds a function with help text.
    #[must_use]
    pub fn function_with_help<M>(mut self, name: &str, help: &str, func: impl NativeFunction<M>) -> Self {
        let builtin = Builtin {
            name: name.to_owned(),
            func: func.into_builtin_impl(),
            help: Some(help.to_owned()),
        };
        self.inner.functions.insert(name.to_owned(), builtin);
        self
    }

    /// Adds a function using the raw builtin contract directly.
    #[must_use]
    pub fn raw_function(
        mut self,
        name: &str,
        help: Option<&str>,
        func: impl Fn(&mut Context, ArgValues) -> Result<Object, Exception> + 'static,
    ) -> Self {
        self.inner.functions.insert(name.to_owned(), Builtin::new(name, help, func));
        self
    }

    #[must_use]
    pub fn constant(mut self, name: &str, value: impl Into<Object>) -> Self {
        self.inner.constants.insert(name.to_owned(), value.into());
        self
    }

    #[must_use]
    pub fn sub_library(mut self, library: Library) -> Self {
        self.inner.children.push(library);
        self
    }

    #[must_use]
    pub fn build(self) -> Library {
        self.inner
    }
}

/// A library supplied by the host's on-demand loader callback.
pub enum OnDemandLibrary {
    Native(Library),
    Script(String),
}

enum LibrarySource {
    Native {
        lib: Rc<Library>,
        instance_data: Option<Object>,
    },
    Script(String),
}

struct LibraryEntry {
    source: LibrarySource,
    /// Materialized dict, shared by every import of this library.
    loaded: Option<Object>,
}

type OnDemandCallback = Box<dyn FnMut(&str) -> Option<OnDemandLibrary>>;

/// Per-interpreter registry of native and script libraries.
#[derive(Default)]
pub(crate) struct LibraryRegistry {
    entries: AHashMap<String, LibraryEntry>,
    on_demand: Option<OnDemandCallback>,
}

impl LibraryRegistry {
    pub(crate) fn register_native(&mut self, library: Library, instance_data: Option<Object>) {
        let name = library.name.clone();
        self.entries.insert(
            name,
            LibraryEntry {
                source: LibrarySource::Native {
                    lib: Rc::new(library),
                    instance_data,
                },
                loaded: None,
            },
        );
    }

    pub(crate) fn register_script(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(
            name.into(),
            LibraryEntry {
                source: LibrarySource::Script(source.into()),
                loaded: None,
            },
        );
    }

    pub(crate) fn set_on_demand(&mut self, callback: OnDemandCallback) {
        self.on_demand = Some(callback);
    }

    pub(crate) fn is_registered(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered library names, for `help()`.
    pub(crate) fn catalog(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// A real (fully loaded) library dict carries `__doc__`; a placeholder
/// mounted for a child path does not.
fn is_real_library_dict(obj: &Object) -> bool {
    match obj {
        Object::Dict(dict) => dict.borrow().contains_string("__doc__"),
        _ => false,
    }
}

fn placeholder_dict() -> Object {
    Object::dict(Dict::new())
}

/// Resolves `import a.b.c [as alias]` per the import protocol:
/// existing real bindings are a no-op, parents load lazily before children,
/// the registries are consulted before the host's on-demand callback, and
/// intermediate placeholders are mounted and later preserved when filled.
pub(crate) fn import_path(
    ctx: &mut Context,
    scope: &ScopeRef,
    path: &str,
    alias: Option<&str>,
) -> Result<Object, Exception> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(Exception::new(ExcType::ImportError, format!("invalid import path '{path}'")));
    }
    if segments.len() > MAX_IMPORT_DEPTH {
        return Err(Exception::new(
            ExcType::ImportError,
            format!("import path '{path}' exceeds {MAX_IMPORT_DEPTH} levels"),
        ));
    }

    // Already imported and bound to a real library dict: nothing to do.
    if alias.is_none() {
        if let Some(existing) = resolve_existing(scope, &segments) {
            if is_real_library_dict(&existing) {
                return Ok(existing);
            }
        }
    }

    // Load every level that is registered, parents first.
    let mut levels: Vec<Option<Object>> = Vec::with_capacity(segments.len());
    for i in 0..segments.len() {
        let full = segments[..=i].join(".");
        let mut dict = load_registered(ctx, scope, &full)?;
        if dict.is_none() && i > 0 {
            // A parent library may carry this level as a nested sub-library.
            if let Some(Object::Dict(parent)) = levels[i - 1].as_ref() {
                if let Some(child) = parent.borrow().get_by_string(segments[i]) {
                    if is_real_library_dict(&child) {
                        dict = Some(child);
                    }
                }
            }
        }
        levels.push(dict);
    }

    // The full path must resolve; ask the host loader once, then retry.
    if levels.last().is_none_or(Option::is_none) {
        let full = path.to_owned();
        let callback_result = {
            let mut callback = ctx.registry.borrow_mut().on_demand.take();
            let result = callback.as_mut().and_then(|cb| cb(&full));
            ctx.registry.borrow_mut().on_demand = callback;
            result
        };
        match callback_result {
            Some(OnDemandLibrary::Native(lib)) => {
                let mut library = lib;
                library.name = full.clone();
                ctx.registry.borrow_mut().register_native(library, None);
            }
            Some(OnDemandLibrary::Script(source)) => {
                ctx.registry.borrow_mut().register_script(full.clone(), source);
            }
            None => {
                return Err(Exception::new(
                    ExcType::ImportError,
                    format!("no library named '{path}'"),
                ));
            }
        }
        let retried = load_registered(ctx, scope, &full)?;
        if retried.is_none() {
            return Err(Exception::new(
                ExcType::ImportError,
                format!("no library named '{path}'"),
            ));
        }
        if let Some(last) = levels.last_mut() {
            *last = retried;
        }
    }

    // Mount the dotted structure, creating placeholders for missing levels.
    let root_name = segments[0];
    let mut current = match Namespace::get(scope, root_name) {
        Some(existing @ Object::Dict(_)) => {
            let merged = merge_level(existing, levels[0].clone());
            Namespace::set(scope, root_name, merged.clone());
            merged
        }
        _ => {
            let fresh = levels[0].clone().unwrap_or_else(placeholder_dict);
            Namespace::set(scope, root_name, fresh.clone());
            fresh
        }
    };

    for (i, segment) in segments.iter().enumerate().skip(1) {
        let Object::Dict(parent) = &current else {
            return Err(Exception::new(
                ExcType::ImportError,
                format!("'{}' is not a library", segments[..i].join(".")),
            ));
        };
        let existing = parent.borrow().get_by_string(segment);
        let next = match existing {
            Some(child @ Object::Dict(_)) => merge_level(child, levels[i].clone()),
            _ => levels[i].clone().unwrap_or_else(placeholder_dict),
        };
        parent.borrow_mut().set_by_string(segment, next.clone());
        current = next;
    }

    if let Some(alias) = alias {
        Namespace::set(scope, alias, current.clone());
    }
    Ok(current)
}

/// Combines an already-mounted dict with a freshly loaded one.
///
/// When a placeholder is filled by its real library, sub-library entries
/// mounted earlier move into the loaded dict so they are preserved.
fn merge_level(existing: Object, loaded: Option<Object>) -> Object {
    let Some(loaded) = loaded else {
        return existing;
    };
    let (Object::Dict(existing_dict), Object::Dict(loaded_dict)) = (&existing, &loaded) else {
        return loaded;
    };
    if Rc::ptr_eq(existing_dict, loaded_dict) {
        return loaded;
    }
    if is_real_library_dict(&existing) {
        // Already filled; keep the established binding.
        return existing;
    }
    let entries: Vec<(Object, Object)> = existing_dict
        .borrow()
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    {
        let mut target = loaded_dict.borrow_mut();
        for (key, value) in entries {
            let canonical = Dict::canonical_key(&key);
            if !target.contains_string(&canonical) {
                target.insert(key, value);
            }
        }
    }
    loaded
}

fn resolve_existing(scope: &ScopeRef, segments: &[&str]) -> Option<Object> {
    let mut current = Namespace::get(scope, segments[0])?;
    for segment in &segments[1..] {
        let Object::Dict(dict) = &current else {
            return None;
        };
        let next = dict.borrow().get_by_string(segment)?;
        current = next;
    }
    Some(current)
}

/// Loads a registered library by full name, caching the materialized dict.
fn load_registered(ctx: &mut Context, scope: &ScopeRef, full_name: &str) -> Result<Option<Object>, Exception> {
    enum Pending {
        Native { lib: Rc<Library>, instance_data: Option<Object> },
        Script(String),
    }

    let pending = {
        let registry = ctx.registry.borrow();
        let Some(entry) = registry.entries.get(full_name) else {
            return Ok(None);
        };
        if let Some(loaded) = &entry.loaded {
            return Ok(Some(loaded.clone()));
        }
        match &entry.source {
            LibrarySource::Native { lib, instance_data } => Pending::Native {
                lib: Rc::clone(lib),
                instance_data: instance_data.clone(),
            },
            LibrarySource::Script(source) => Pending::Script(source.clone()),
        }
    };

    let dict = match pending {
        Pending::Native { lib, instance_data } => materialize_library(&lib, instance_data.as_ref(), 0)?,
        Pending::Script(source) => {
            // Mark as loaded before evaluating so a self-importing library
            // sees a placeholder instead of recursing without bound.
            let marker = placeholder_dict();
            if let Some(entry) = ctx.registry.borrow_mut().entries.get_mut(full_name) {
                entry.loaded = Some(marker);
            }
            let result = load_script_library(ctx, scope, full_name, &source);
            if result.is_err() {
                if let Some(entry) = ctx.registry.borrow_mut().entries.get_mut(full_name) {
                    entry.loaded = None;
                }
            }
            result?
        }
    };

    if let Some(entry) = ctx.registry.borrow_mut().entries.get_mut(full_name) {
        entry.loaded = Some(dict.clone());
    }
    Ok(Some(dict))
}

/// Builds the dict form of a native library: functions, constants,
/// sub-libraries, and `__doc__`.
fn materialize_library(library: &Library, instance_data: Option<&Object>, depth: usize) -> Result<Object, Exception> {
    if depth >= MAX_LIBRARY_NESTING {
        return Err(Exception::new(
            ExcType::ImportError,
            format!("library '{}' nests deeper than {MAX_LIBRARY_NESTING} levels", library.name),
        ));
    }
    let mut dict = Dict::new();
    dict.set_by_string("__doc__", Object::str(&library.description));
    for (name, builtin) in &library.functions {
        let builtin = match instance_data {
            Some(data) => wrap_with_instance_data(builtin, data.clone()),
            None => builtin.clone(),
        };
        dict.set_by_string(name, Object::Builtin(Rc::new(builtin)));
    }
    for (name, value) in &library.constants {
        dict.set_by_string(name, value.clone());
    }
    for child in &library.children {
        let child_dict = materialize_library(child, instance_data, depth + 1)?;
        dict.set_by_string(&child.name, child_dict);
    }
    Ok(Object::dict(dict))
}

/// Wraps a builtin so calls into this library instance see its instance data
/// on the context. Different interpreters hosting the same library template
/// each wrap with their own data, so concurrent use cannot cross-contaminate.
fn wrap_with_instance_data(builtin: &Builtin, data: Object) -> Builtin {
    let inner = Rc::clone(&builtin.func);
    Builtin {
        name: builtin.name.clone(),
        help: builtin.help.clone(),
        func: Rc::new(move |ctx: &mut Context, args: ArgValues| {
            let previous = ctx.swap_instance_data(Some(data.clone()));
            let result = inner(ctx, args);
            ctx.swap_instance_data(previous);
            result
        }),
    }
}

/// Evaluates a script library's source in a fresh scope under the root
/// environment, then collects its top-level bindings as the library dict.
fn load_script_library(
    ctx: &mut Context,
    scope: &ScopeRef,
    name: &str,
    source: &str,
) -> Result<Object, Exception> {
    let key = SourceKey::of(source);
    let cache = ProgramCache::global();
    let program = match cache.get(key) {
        Some(program) => program,
        None => {
            let program = Arc::new(parse(source).map_err(|errors| {
                let detail = errors
                    .first()
                    .map_or_else(|| "parse error".to_owned(), |e| e.message.clone());
                Exception::new(ExcType::ImportError, format!("library '{name}' failed to parse: {detail}"))
            })?);
            cache.insert(key, Arc::clone(&program));
            program
        }
    };

    let library_scope = Namespace::new_child(&Namespace::root(scope));
    eval_program(ctx, &library_scope, program.as_ref())?;

    let mut exports = collect_exports(&library_scope);
    let doc = match program.statements.first() {
        Some(crate::ast::Stmt {
            kind: crate::ast::StmtKind::Expr(crate::ast::Expr {
                kind: crate::ast::ExprKind::Str(text),
                ..
            }),
            ..
        }) => text.clone(),
        _ => String::new(),
    };
    exports.set_by_string("__doc__", Object::str(doc));
    Ok(Object::dict(exports))
}
