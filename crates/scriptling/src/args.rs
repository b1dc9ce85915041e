//! Call-argument bundling shared by script calls and host builtins.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    exception::{ExcType, Exception},
    object::Object,
};

/// Keyword arguments for a call, in source order.
///
/// This type also serves as the host-side marker distinguishing "these are
/// keyword arguments" from "this is a positional dict argument" when calling
/// into scripts or receiving arguments in a native function signature.
#[derive(Debug, Clone, Default)]
pub struct Kwargs {
    entries: IndexMap<String, Object>,
}

impl Kwargs {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// Inserts a keyword argument; duplicates are a `TypeError`.
    pub fn insert(&mut self, name: impl Into<String>, value: Object) -> Result<(), Exception> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("duplicate keyword argument '{name}'"),
            ));
        }
        self.entries.insert(name, value);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Object> {
        self.entries.shift_remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub(crate) fn into_iter_ordered(self) -> impl Iterator<Item = (String, Object)> {
        self.entries.into_iter()
    }

    /// First remaining keyword name, for "unexpected keyword" errors.
    pub(crate) fn first_name(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }
}

impl<const N: usize> From<[(&str, Object); N]> for Kwargs {
    fn from(pairs: [(&str, Object); N]) -> Self {
        let mut kwargs = Self::new();
        for (name, value) in pairs {
            kwargs.entries.insert(name.to_owned(), value);
        }
        kwargs
    }
}

/// Evaluated arguments for one call: positionals in order plus kwargs.
///
/// Most calls carry at most a few positionals, so the buffer is inline.
#[derive(Debug, Default)]
pub struct ArgValues {
    positional: SmallVec<[Object; 4]>,
    kwargs: Kwargs,
}

impl ArgValues {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn positional(args: impl IntoIterator<Item = Object>) -> Self {
        Self {
            positional: args.into_iter().collect(),
            kwargs: Kwargs::new(),
        }
    }

    pub(crate) fn with_kwargs(args: impl IntoIterator<Item = Object>, kwargs: Kwargs) -> Self {
        Self {
            positional: args.into_iter().collect(),
            kwargs,
        }
    }

    pub(crate) fn push(&mut self, value: Object) {
        self.positional.push(value);
    }

    /// Prepends `self` for bound-method dispatch.
    pub(crate) fn prepend(&mut self, value: Object) {
        self.positional.insert(0, value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    #[must_use]
    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    pub fn kwargs_mut(&mut self) -> &mut Kwargs {
        &mut self.kwargs
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Object> {
        self.positional.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.positional.iter()
    }

    pub(crate) fn into_parts(self) -> (SmallVec<[Object; 4]>, Kwargs) {
        (self.positional, self.kwargs)
    }

    /// Rejects any keyword arguments, for builtins that take none.
    pub fn reject_kwargs(&self, name: &str) -> Result<(), Exception> {
        if let Some(kw) = self.kwargs.first_name() {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("{name}() got an unexpected keyword argument '{kw}'"),
            ));
        }
        Ok(())
    }

    /// Checks that no arguments at all were passed.
    pub fn check_zero_args(&self, name: &str) -> Result<(), Exception> {
        self.reject_kwargs(name)?;
        if self.positional.is_empty() {
            Ok(())
        } else {
            Err(ExcType::type_error_arg_count(name, 0, self.positional.len()))
        }
    }

    /// Checks that exactly one positional argument was passed, returning it.
    pub fn get_one_arg(self, name: &str) -> Result<Object, Exception> {
        self.reject_kwargs(name)?;
        let (mut positional, _) = self.into_parts();
        if positional.len() == 1 {
            Ok(positional.remove(0))
        } else {
            Err(ExcType::type_error_arg_count(name, 1, positional.len()))
        }
    }

    /// Checks that exactly two positional arguments were passed.
    pub fn get_two_args(self, name: &str) -> Result<(Object, Object), Exception> {
        self.reject_kwargs(name)?;
        let (positional, _) = self.into_parts();
        if positional.len() == 2 {
            let mut iter = positional.into_iter();
            let first = iter.next().unwrap_or(Object::None);
            let second = iter.next().unwrap_or(Object::None);
            Ok((first, second))
        } else {
            Err(ExcType::type_error_arg_count(name, 2, positional.len()))
        }
    }

    /// Checks that one or two positional arguments were passed.
    pub fn get_one_two_args(self, name: &str) -> Result<(Object, Option<Object>), Exception> {
        self.reject_kwargs(name)?;
        let (positional, _) = self.into_parts();
        match positional.len() {
            1 | 2 => {
                let mut iter = positional.into_iter();
                let first = iter.next().unwrap_or(Object::None);
                Ok((first, iter.next()))
            }
            0 => Err(ExcType::type_error_at_least(name, 1, 0)),
            n => Err(ExcType::type_error_at_most(name, 2, n)),
        }
    }

    /// Checks for zero or one positional argument.
    pub fn get_zero_one_args(self, name: &str) -> Result<Option<Object>, Exception> {
        self.reject_kwargs(name)?;
        let (positional, _) = self.into_parts();
        match positional.len() {
            0 => Ok(None),
            1 => Ok(positional.into_iter().next()),
            n => Err(ExcType::type_error_at_most(name, 1, n)),
        }
    }
}

impl From<Vec<Object>> for ArgValues {
    fn from(args: Vec<Object>) -> Self {
        Self::positional(args)
    }
}
