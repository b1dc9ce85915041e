//! Adapters between native Rust signatures and the builtin call contract.
//!
//! `register_fn` and `LibraryBuilder::function` accept ordinary Rust
//! closures; the [`NativeFunction`] trait maps their declared parameter
//! kinds onto `(ctx, args)` dispatch. Supported leaf types are the integer
//! widths, floats, `bool`, `String`, `Vec<T>`, string-keyed maps, [`Object`]
//! itself, an optional leading `&mut Context`, an optional trailing
//! [`Kwargs`], and plain or `Result` returns. Unsupported shapes fail to
//! compile rather than misbehave at run time.

use std::{collections::HashMap, fmt::Display, rc::Rc};

use indexmap::IndexMap;

use crate::{
    args::{ArgValues, Kwargs},
    class::Class,
    context::Context,
    exception::{ExcType, Exception},
    function::{Builtin, BuiltinImpl},
    object::{Dict, Object},
};

/// Conversion from a script value into a native parameter type.
pub trait FromObject: Sized {
    fn from_object(obj: Object) -> Result<Self, Exception>;
}

impl FromObject for Object {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        Ok(obj)
    }
}

fn conversion_error(expected: &str, got: &Object) -> Exception {
    Exception::new(
        ExcType::TypeError,
        format!("expected {expected}, got {}", got.type_name()),
    )
}

impl FromObject for i64 {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        match obj {
            Object::Int(n) => Ok(n),
            Object::Bool(b) => Ok(Self::from(b)),
            other => Err(conversion_error("int", &other)),
        }
    }
}

macro_rules! int_from_object {
    ($($ty:ty),*) => {$(
        impl FromObject for $ty {
            fn from_object(obj: Object) -> Result<Self, Exception> {
                let wide = i64::from_object(obj)?;
                Self::try_from(wide).map_err(|_| {
                    Exception::new(ExcType::ValueError, format!("{wide} is out of range"))
                })
            }
        }
    )*};
}

int_from_object!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromObject for f64 {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        obj.as_f64().ok_or_else(|| conversion_error("float", &obj))
    }
}

impl FromObject for f32 {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        f64::from_object(obj).map(|f| f as Self)
    }
}

impl FromObject for bool {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        match obj {
            Object::Bool(b) => Ok(b),
            other => Err(conversion_error("bool", &other)),
        }
    }
}

impl FromObject for String {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        match obj {
            Object::Str(s) => Ok(s.to_string()),
            other => Err(conversion_error("str", &other)),
        }
    }
}

impl<T: FromObject> FromObject for Vec<T> {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        let items: Self = match obj {
            Object::List(items) => items
                .borrow()
                .iter()
                .cloned()
                .map(T::from_object)
                .collect::<Result<_, _>>()?,
            Object::Tuple(items) => items.iter().cloned().map(T::from_object).collect::<Result<_, _>>()?,
            other => return Err(conversion_error("list", &other)),
        };
        Ok(items)
    }
}

impl<T: FromObject> FromObject for HashMap<String, T> {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        let Object::Dict(dict) = &obj else {
            return Err(conversion_error("dict", &obj));
        };
        let dict = dict.borrow();
        let mut out = Self::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            out.insert(Dict::canonical_key(key), T::from_object(value.clone())?);
        }
        Ok(out)
    }
}

impl<T: FromObject> FromObject for IndexMap<String, T> {
    fn from_object(obj: Object) -> Result<Self, Exception> {
        let Object::Dict(dict) = &obj else {
            return Err(conversion_error("dict", &obj));
        };
        let dict = dict.borrow();
        let mut out = Self::with_capacity(dict.len());
        for (key, value) in dict.iter() {
            out.insert(Dict::canonical_key(key), T::from_object(value.clone())?);
        }
        Ok(out)
    }
}

/// A Rust callable usable as a script builtin.
///
/// `Marker` is inferred and only disambiguates the impl families (with or
/// without a leading context, trailing kwargs, and `Result` returns).
pub trait NativeFunction<Marker>: 'static {
    fn into_builtin_impl(self) -> Rc<BuiltinImpl>;
}

/// Marker for impls taking a leading `&mut Context`.
pub struct CtxArg;
/// Marker for impls taking a trailing [`Kwargs`].
pub struct KwargsArg;
/// Marker for impls returning `Result`.
pub struct FallibleReturn;

fn check_arity(got: usize, expected: usize) -> Result<(), Exception> {
    if got == expected {
        Ok(())
    } else {
        Err(Exception::new(
            ExcType::TypeError,
            format!(
                "native function takes {expected} argument{} ({got} given)",
                if expected == 1 { "" } else { "s" }
            ),
        ))
    }
}

fn check_no_kwargs(kwargs: &Kwargs) -> Result<(), Exception> {
    match kwargs.first_name() {
        Some(name) => Err(Exception::new(
            ExcType::TypeError,
            format!("unexpected keyword argument '{name}'"),
        )),
        None => Ok(()),
    }
}

fn host_error(err: impl Display) -> Exception {
    Exception::new(ExcType::RuntimeError, err.to_string())
}

macro_rules! impl_native_function {
    ($count:expr; $($arg:ident),*) => {
        #[allow(non_snake_case)]
        impl<FN, RET, $($arg,)*> NativeFunction<fn($($arg,)*) -> RET> for FN
        where
            FN: Fn($($arg),*) -> RET + 'static,
            RET: Into<Object>,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |_ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_no_kwargs(&kwargs)?;
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    Ok(self($($arg),*).into())
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, ERR, $($arg,)*> NativeFunction<(FallibleReturn, fn($($arg,)*) -> (RET, ERR))> for FN
        where
            FN: Fn($($arg),*) -> Result<RET, ERR> + 'static,
            RET: Into<Object>,
            ERR: Display,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |_ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_no_kwargs(&kwargs)?;
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    self($($arg),*).map(Into::into).map_err(host_error)
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, $($arg,)*> NativeFunction<(CtxArg, fn($($arg,)*) -> RET)> for FN
        where
            FN: Fn(&mut Context, $($arg),*) -> RET + 'static,
            RET: Into<Object>,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_no_kwargs(&kwargs)?;
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    Ok(self(ctx, $($arg),*).into())
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, ERR, $($arg,)*> NativeFunction<(CtxArg, FallibleReturn, fn($($arg,)*) -> (RET, ERR))> for FN
        where
            FN: Fn(&mut Context, $($arg),*) -> Result<RET, ERR> + 'static,
            RET: Into<Object>,
            ERR: Display,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_no_kwargs(&kwargs)?;
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    self(ctx, $($arg),*).map(Into::into).map_err(host_error)
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, $($arg,)*> NativeFunction<(KwargsArg, fn($($arg,)*) -> RET)> for FN
        where
            FN: Fn($($arg,)* Kwargs) -> RET + 'static,
            RET: Into<Object>,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |_ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    Ok(self($($arg,)* kwargs).into())
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, ERR, $($arg,)*> NativeFunction<(KwargsArg, FallibleReturn, fn($($arg,)*) -> (RET, ERR))> for FN
        where
            FN: Fn($($arg,)* Kwargs) -> Result<RET, ERR> + 'static,
            RET: Into<Object>,
            ERR: Display,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |_ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    self($($arg,)* kwargs).map(Into::into).map_err(host_error)
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, $($arg,)*> NativeFunction<(CtxArg, KwargsArg, fn($($arg,)*) -> RET)> for FN
        where
            FN: Fn(&mut Context, $($arg,)* Kwargs) -> RET + 'static,
            RET: Into<Object>,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    Ok(self(ctx, $($arg,)* kwargs).into())
                })
            }
        }

        #[allow(non_snake_case)]
        impl<FN, RET, ERR, $($arg,)*> NativeFunction<(CtxArg, KwargsArg, FallibleReturn, fn($($arg,)*) -> (RET, ERR))> for FN
        where
            FN: Fn(&mut Context, $($arg,)* Kwargs) -> Result<RET, ERR> + 'static,
            RET: Into<Object>,
            ERR: Display,
            $($arg: FromObject + 'static,)*
        {
            fn into_builtin_impl(self) -> Rc<BuiltinImpl> {
                Rc::new(move |ctx: &mut Context, args: ArgValues| {
                    let (positional, kwargs) = args.into_parts();
                    check_arity(positional.len(), $count)?;
                    let mut iter = positional.into_iter();
                    $(let $arg = $arg::from_object(iter.next().unwrap_or(Object::None))?;)*
                    self(ctx, $($arg,)* kwargs).map(Into::into).map_err(host_error)
                })
            }
        }
    };
}

impl_native_function!(0;);
impl_native_function!(1; A1);
impl_native_function!(2; A1, A2);
impl_native_function!(3; A1, A2, A3);
impl_native_function!(4; A1, A2, A3, A4);
impl_native_function!(5; A1, A2, A3, A4, A5);

/// Assembles a host class from native closures.
///
/// A method's first parameter receives the instance (as an [`Object`]);
/// further parameters follow the same conversion rules as `register_fn`.
/// Host classes participate in inheritance exactly like script classes.
///
/// ```
/// use scriptling::{ClassBuilder, Object};
///
/// let greeter = ClassBuilder::new("Greeter")
///     .method("hello", |_this: Object, name: String| format!("hello {name}"))
///     .build();
/// assert_eq!(greeter.type_name(), "class");
/// ```
pub struct ClassBuilder {
    name: String,
    base: Option<Rc<Class>>,
    methods: IndexMap<String, Object>,
    doc: Option<String>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            methods: IndexMap::new(),
            doc: None,
        }
    }

    #[must_use]
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Sets the base class. The argument must be a class object (typically
    /// obtained from `get_var` after registering or defining it).
    pub fn base_class(mut self, base: &Object) -> Result<Self, Exception> {
        match base {
            Object::Class(class) => {
                self.base = Some(Rc::clone(class));
                Ok(self)
            }
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("base class must be a class, not '{}'", other.type_name()),
            )),
        }
    }

    /// Adds a method with a native Rust signature; the first parameter is
    /// the instance.
    #[must_use]
    pub fn method<M>(mut self, name: &str, func: impl NativeFunction<M>) -> Self {
        let builtin = Builtin {
            name: name.to_owned(),
            func: func.into_builtin_impl(),
            help: None,
        };
        self.methods.insert(name.to_owned(), Object::Builtin(Rc::new(builtin)));
        self
    }

    /// Adds a method using the raw builtin contract directly.
    #[must_use]
    pub fn raw_method(
        mut self,
        name: &str,
        help: Option<&str>,
        func: impl Fn(&mut Context, ArgValues) -> Result<Object, Exception> + 'static,
    ) -> Self {
        self.methods
            .insert(name.to_owned(), Object::Builtin(Rc::new(Builtin::new(name, help, func))));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the class, producing a class object ready to register.
    #[must_use]
    pub fn build(self) -> Object {
        Object::Class(Rc::new(Class {
            name: self.name,
            base: self.base,
            methods: self.methods,
            doc: self.doc,
        }))
    }
}
