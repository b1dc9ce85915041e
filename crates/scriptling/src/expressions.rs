//! Expression evaluation: literals, operators, comprehensions, f-strings,
//! attribute access, and the call machinery shared with the embedding layer.

use std::{
    cell::RefCell,
    cmp::Ordering,
    rc::Rc,
};

use crate::{
    args::{ArgValues, Kwargs},
    ast::{BinOp, CmpOp, Expr, ExprKind, Param, PrefixOp},
    class::{Class, Instance, SuperProxy},
    context::Context,
    eval::eval_block,
    exception::{ExcType, Exception, RunError},
    fstring::format_with_spec,
    function::{BoundMethod, Function, LambdaFn},
    methods::builtin_method,
    namespace::{Namespace, ScopeRef},
    object::{Dict, Object},
};

pub(crate) fn eval_expr(ctx: &mut Context, scope: &ScopeRef, expr: &Expr) -> Result<Object, Exception> {
    match &expr.kind {
        ExprKind::Ident(name) => Namespace::get(scope, name).ok_or_else(|| {
            Exception::new(ExcType::NameError, format!("name '{name}' is not defined")).with_line(expr.line)
        }),
        ExprKind::Int(n) => Ok(Object::Int(*n)),
        ExprKind::Float(f) => Ok(Object::Float(*f)),
        ExprKind::Str(s) => Ok(Object::str(s)),
        ExprKind::Bool(b) => Ok(Object::Bool(*b)),
        ExprKind::NoneLit => Ok(Object::None),
        ExprKind::FString(parts) => eval_fstring(ctx, scope, parts, expr.line),
        ExprKind::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(ctx, scope, item)?);
            }
            Ok(Object::tuple(values))
        }
        ExprKind::List(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(eval_expr(ctx, scope, item)?);
            }
            Ok(Object::list(values))
        }
        ExprKind::Dict(entries) => {
            let mut dict = Dict::new();
            for (key_expr, value_expr) in entries {
                let key = eval_expr(ctx, scope, key_expr)?;
                let value = eval_expr(ctx, scope, value_expr)?;
                dict.insert(key, value);
            }
            Ok(Object::dict(dict))
        }
        ExprKind::ListComp {
            value,
            targets,
            iterable,
            cond,
        } => {
            let source = eval_expr(ctx, scope, iterable)?;
            let mut iter = iter_object(ctx, source, expr.line)?;
            let comp_scope = Namespace::new_child(scope);
            let mut out = Vec::new();
            while let Some(item) = iter.next(ctx)? {
                ctx.check_cancelled()?;
                bind_loop_targets(&comp_scope, targets, item, expr.line)?;
                if let Some(cond) = cond {
                    if !eval_expr(ctx, &comp_scope, cond)?.is_truthy() {
                        continue;
                    }
                }
                out.push(eval_expr(ctx, &comp_scope, value)?);
            }
            Ok(Object::list(out))
        }
        ExprKind::DictComp {
            key,
            value,
            targets,
            iterable,
            cond,
        } => {
            let source = eval_expr(ctx, scope, iterable)?;
            let mut iter = iter_object(ctx, source, expr.line)?;
            let comp_scope = Namespace::new_child(scope);
            let mut out = Dict::new();
            while let Some(item) = iter.next(ctx)? {
                ctx.check_cancelled()?;
                bind_loop_targets(&comp_scope, targets, item, expr.line)?;
                if let Some(cond) = cond {
                    if !eval_expr(ctx, &comp_scope, cond)?.is_truthy() {
                        continue;
                    }
                }
                let k = eval_expr(ctx, &comp_scope, key)?;
                let v = eval_expr(ctx, &comp_scope, value)?;
                out.insert(k, v);
            }
            Ok(Object::dict(out))
        }
        ExprKind::Lambda { params, body } => Ok(Object::Lambda(Rc::new(LambdaFn {
            params: params.clone(),
            body: Rc::new((**body).clone()),
            env: Rc::clone(scope),
        }))),
        ExprKind::Prefix { op, operand } => {
            let value = eval_expr(ctx, scope, operand)?;
            eval_prefix(*op, &value, expr.line)
        }
        ExprKind::Infix { op, left, right } => {
            let lhs = eval_expr(ctx, scope, left)?;
            let rhs = eval_expr(ctx, scope, right)?;
            binary_op(*op, &lhs, &rhs, expr.line)
        }
        ExprKind::BoolOp { and, left, right } => {
            let lhs = eval_expr(ctx, scope, left)?;
            // Short-circuit, yielding the deciding operand itself.
            if *and != lhs.is_truthy() {
                return Ok(lhs);
            }
            eval_expr(ctx, scope, right)
        }
        ExprKind::Compare { first, rest } => {
            let mut left = eval_expr(ctx, scope, first)?;
            for (op, right_expr) in rest {
                let right = eval_expr(ctx, scope, right_expr)?;
                if !compare(*op, &left, &right, expr.line)? {
                    return Ok(Object::Bool(false));
                }
                left = right;
            }
            Ok(Object::Bool(true))
        }
        ExprKind::Call { callee, args, kwargs } => eval_call(ctx, scope, callee, args, kwargs, expr.line),
        ExprKind::Index { obj, index } => {
            let obj = eval_expr(ctx, scope, obj)?;
            let index = eval_expr(ctx, scope, index)?;
            index_get(&obj, &index, expr.line)
        }
        ExprKind::Slice { obj, start, end, step } => {
            let obj = eval_expr(ctx, scope, obj)?;
            let start = eval_slice_part(ctx, scope, start.as_deref())?;
            let end = eval_slice_part(ctx, scope, end.as_deref())?;
            let step = eval_slice_part(ctx, scope, step.as_deref())?;
            slice_get(&obj, start, end, step, expr.line)
        }
        ExprKind::Attr { obj, name } => {
            let obj = eval_expr(ctx, scope, obj)?;
            get_attr(&obj, name, expr.line)
        }
    }
}

fn eval_slice_part(ctx: &mut Context, scope: &ScopeRef, part: Option<&Expr>) -> Result<Option<i64>, Exception> {
    let Some(part) = part else {
        return Ok(None);
    };
    let value = eval_expr(ctx, scope, part)?;
    match value {
        Object::Int(n) => Ok(Some(n)),
        Object::Bool(b) => Ok(Some(i64::from(b))),
        Object::None => Ok(None),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("slice indices must be integers, not {}", other.type_name()),
        )
        .with_line(part.line)),
    }
}

fn eval_fstring(
    ctx: &mut Context,
    scope: &ScopeRef,
    parts: &[crate::ast::FStringPart],
    line: u32,
) -> Result<Object, Exception> {
    let mut out = String::new();
    for part in parts {
        match part {
            crate::ast::FStringPart::Literal(text) => out.push_str(text),
            crate::ast::FStringPart::Expr { expr, spec } => {
                let value = eval_expr(ctx, scope, expr)?;
                match spec {
                    Some(spec) => out.push_str(&format_with_spec(&value, spec).map_err(|e| e.with_line(line))?),
                    None => out.push_str(&value.to_string()),
                }
            }
        }
    }
    Ok(Object::str(out))
}

fn eval_prefix(op: PrefixOp, value: &Object, line: u32) -> Result<Object, Exception> {
    match op {
        PrefixOp::Not => Ok(Object::Bool(!value.is_truthy())),
        PrefixOp::Neg => match value {
            Object::Int(n) => n.checked_neg().map(Object::Int).ok_or_else(|| {
                Exception::new(ExcType::OverflowError, "integer negation overflows").with_line(line)
            }),
            Object::Float(f) => Ok(Object::Float(-f)),
            Object::Bool(b) => Ok(Object::Int(-i64::from(*b))),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("bad operand type for unary -: '{}'", other.type_name()),
            )
            .with_line(line)),
        },
    }
}

/// Arithmetic and sequence operators with the usual numeric promotions:
/// int op int stays integral (except `/`), any float operand promotes.
pub(crate) fn binary_op(op: BinOp, left: &Object, right: &Object, line: u32) -> Result<Object, Exception> {
    // Sequence and string forms first.
    match (op, left, right) {
        (BinOp::Add, Object::Str(a), Object::Str(b)) => {
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(b);
            return Ok(Object::str(out));
        }
        (BinOp::Add, Object::List(a), Object::List(b)) => {
            let mut out = a.borrow().clone();
            out.extend(b.borrow().iter().cloned());
            return Ok(Object::list(out));
        }
        (BinOp::Add, Object::Tuple(a), Object::Tuple(b)) => {
            let mut out = a.as_ref().clone();
            out.extend(b.iter().cloned());
            return Ok(Object::tuple(out));
        }
        (BinOp::Mul, Object::Str(s), n) | (BinOp::Mul, n, Object::Str(s)) if n.is_numeric() => {
            let count = int_for_repeat(n, line)?;
            return Ok(Object::str(s.repeat(count)));
        }
        (BinOp::Mul, Object::List(items), n) | (BinOp::Mul, n, Object::List(items)) if n.is_numeric() => {
            let count = int_for_repeat(n, line)?;
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            return Ok(Object::list(out));
        }
        (BinOp::Mul, Object::Tuple(items), n) | (BinOp::Mul, n, Object::Tuple(items)) if n.is_numeric() => {
            let count = int_for_repeat(n, line)?;
            let mut out = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            return Ok(Object::tuple(out));
        }
        _ => {}
    }

    if !left.is_numeric() || !right.is_numeric() {
        return Err(Exception::new(
            ExcType::TypeError,
            format!(
                "unsupported operand type(s) for {}: '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )
        .with_line(line));
    }

    // True division always yields a float.
    if op == BinOp::Div {
        let a = left.as_f64().unwrap_or(0.0);
        let b = right.as_f64().unwrap_or(0.0);
        if b == 0.0 {
            return Err(Exception::new(ExcType::ZeroDivisionError, "division by zero").with_line(line));
        }
        return Ok(Object::Float(a / b));
    }

    let ints = (int_value(left), int_value(right));
    if let (Some(a), Some(b)) = ints {
        return int_binary_op(op, a, b, line);
    }

    let a = left.as_f64().unwrap_or(0.0);
    let b = right.as_f64().unwrap_or(0.0);
    match op {
        BinOp::Add => Ok(Object::Float(a + b)),
        BinOp::Sub => Ok(Object::Float(a - b)),
        BinOp::Mul => Ok(Object::Float(a * b)),
        BinOp::Mod => {
            if b == 0.0 {
                return Err(Exception::new(ExcType::ZeroDivisionError, "float modulo").with_line(line));
            }
            // Result takes the sign of the divisor.
            Ok(Object::Float(a - b * (a / b).floor()))
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(Exception::new(
                    ExcType::ZeroDivisionError,
                    "0.0 cannot be raised to a negative power",
                )
                .with_line(line));
            }
            Ok(Object::Float(a.powf(b)))
        }
        BinOp::Div => unreachable!("handled above"),
    }
}

fn int_value(obj: &Object) -> Option<i64> {
    match obj {
        Object::Int(n) => Some(*n),
        Object::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn int_for_repeat(obj: &Object, line: u32) -> Result<usize, Exception> {
    match obj {
        Object::Int(n) => Ok(usize::try_from(*n).unwrap_or(0)),
        Object::Bool(b) => Ok(usize::from(*b)),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("can't multiply sequence by non-int of type '{}'", other.type_name()),
        )
        .with_line(line)),
    }
}

fn int_binary_op(op: BinOp, a: i64, b: i64, line: u32) -> Result<Object, Exception> {
    let overflow = || Exception::new(ExcType::OverflowError, "integer result overflows").with_line(line);
    match op {
        BinOp::Add => a.checked_add(b).map(Object::Int).ok_or_else(overflow),
        BinOp::Sub => a.checked_sub(b).map(Object::Int).ok_or_else(overflow),
        BinOp::Mul => a.checked_mul(b).map(Object::Int).ok_or_else(overflow),
        BinOp::Mod => {
            if b == 0 {
                return Err(Exception::new(
                    ExcType::ZeroDivisionError,
                    "integer modulo by zero",
                )
                .with_line(line));
            }
            // Result takes the sign of the divisor.
            let r = a % b;
            Ok(Object::Int(if r != 0 && (r < 0) != (b < 0) { r + b } else { r }))
        }
        BinOp::Pow => {
            if b < 0 {
                if a == 0 {
                    return Err(Exception::new(
                        ExcType::ZeroDivisionError,
                        "0 cannot be raised to a negative power",
                    )
                    .with_line(line));
                }
                return Ok(Object::Float((a as f64).powf(b as f64)));
            }
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            a.checked_pow(exp).map(Object::Int).ok_or_else(overflow)
        }
        BinOp::Div => unreachable!("handled by the float path"),
    }
}

fn compare(op: CmpOp, left: &Object, right: &Object, line: u32) -> Result<bool, Exception> {
    match op {
        CmpOp::Eq => Ok(left.py_eq(right)),
        CmpOp::NotEq => Ok(!left.py_eq(right)),
        CmpOp::In => membership(left, right, line),
        CmpOp::NotIn => Ok(!membership(left, right, line)?),
        CmpOp::Lt | CmpOp::Gt | CmpOp::LtEq | CmpOp::GtEq => {
            let Some(ordering) = ordering_of(left, right, line)? else {
                // NaN involved: all ordering comparisons are false.
                return Ok(false);
            };
            Ok(match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::LtEq => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

/// Orders two values, failing with a `TypeError` for incompatible kinds.
pub(crate) fn ordering_of(left: &Object, right: &Object, line: u32) -> Result<Option<Ordering>, Exception> {
    if left.is_numeric() && right.is_numeric() {
        let a = left.as_f64().unwrap_or(f64::NAN);
        let b = right.as_f64().unwrap_or(f64::NAN);
        return Ok(a.partial_cmp(&b));
    }
    match (left, right) {
        (Object::Str(a), Object::Str(b)) => Ok(Some(a.cmp(b))),
        (Object::List(a), Object::List(b)) => {
            let (a, b) = (a.borrow().clone(), b.borrow().clone());
            ordering_of_sequences(&a, &b, line)
        }
        (Object::Tuple(a), Object::Tuple(b)) => ordering_of_sequences(a, b, line),
        _ => Err(Exception::new(
            ExcType::TypeError,
            format!(
                "'<' not supported between instances of '{}' and '{}'",
                left.type_name(),
                right.type_name()
            ),
        )
        .with_line(line)),
    }
}

fn ordering_of_sequences(a: &[Object], b: &[Object], line: u32) -> Result<Option<Ordering>, Exception> {
    for (x, y) in a.iter().zip(b.iter()) {
        if x.py_eq(y) {
            continue;
        }
        return ordering_of(x, y, line);
    }
    Ok(Some(a.len().cmp(&b.len())))
}

/// `in` / `not in`: substring for strings, element membership for sequences,
/// key membership for dicts.
fn membership(item: &Object, container: &Object, line: u32) -> Result<bool, Exception> {
    match container {
        Object::Str(haystack) => match item {
            Object::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(Exception::new(
                ExcType::TypeError,
                format!("'in <string>' requires string as left operand, not {}", other.type_name()),
            )
            .with_line(line)),
        },
        Object::List(items) => Ok(items.borrow().iter().any(|v| v.py_eq(item))),
        Object::Tuple(items) => Ok(items.iter().any(|v| v.py_eq(item))),
        Object::Dict(dict) => Ok(dict.borrow().contains_string(&Dict::canonical_key(item))),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("argument of type '{}' is not iterable", other.type_name()),
        )
        .with_line(line)),
    }
}

// === Indexing and slicing ===

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let wrapped = if index < 0 { index + len } else { index };
    if wrapped < 0 || wrapped >= len {
        None
    } else {
        Some(wrapped as usize)
    }
}

pub(crate) fn index_get(obj: &Object, index: &Object, line: u32) -> Result<Object, Exception> {
    match obj {
        Object::List(items) => {
            let items = items.borrow();
            let i = index_int(index, obj, line)?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| Exception::new(ExcType::IndexError, "list index out of range").with_line(line))
        }
        Object::Tuple(items) => {
            let i = index_int(index, obj, line)?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| Exception::new(ExcType::IndexError, "tuple index out of range").with_line(line))
        }
        Object::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = index_int(index, obj, line)?;
            normalize_index(i, chars.len())
                .map(|i| Object::str(chars[i].to_string()))
                .ok_or_else(|| Exception::new(ExcType::IndexError, "string index out of range").with_line(line))
        }
        Object::Dict(dict) => {
            let key = Dict::canonical_key(index);
            dict.borrow()
                .get_by_string(&key)
                .ok_or_else(|| Exception::new(ExcType::KeyError, index.repr()).with_line(line))
        }
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("'{}' object is not subscriptable", other.type_name()),
        )
        .with_line(line)),
    }
}

fn index_int(index: &Object, container: &Object, line: u32) -> Result<i64, Exception> {
    match index {
        Object::Int(n) => Ok(*n),
        Object::Bool(b) => Ok(i64::from(*b)),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!(
                "{} indices must be integers, not {}",
                container.type_name(),
                other.type_name()
            ),
        )
        .with_line(line)),
    }
}

/// Index sequence for `[start:end:step]` over a sequence of length `len`.
/// Out-of-range bounds clamp rather than error.
fn slice_index_sequence(start: Option<i64>, end: Option<i64>, step: Option<i64>, len: usize, line: u32) -> Result<Vec<usize>, Exception> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Exception::new(ExcType::ValueError, "slice step cannot be zero").with_line(line));
    }
    let len = len as i64;
    let clamp = |i: i64, low: i64, high: i64| i.clamp(low, high);
    let resolve = |i: i64| if i < 0 { i + len } else { i };

    let mut out = Vec::new();
    if step > 0 {
        let start = clamp(start.map_or(0, resolve), 0, len);
        let end = clamp(end.map_or(len, resolve), 0, len);
        let mut i = start;
        while i < end {
            out.push(i as usize);
            i += step;
        }
    } else {
        let start = clamp(start.map_or(len - 1, resolve), -1, len - 1);
        let end = end.map_or(-1, resolve).clamp(-1, len - 1);
        let mut i = start;
        while i > end {
            if i >= 0 {
                out.push(i as usize);
            }
            i += step;
        }
    }
    Ok(out)
}

pub(crate) fn slice_get(
    obj: &Object,
    start: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
    line: u32,
) -> Result<Object, Exception> {
    match obj {
        Object::List(items) => {
            let items = items.borrow();
            let indices = slice_index_sequence(start, end, step, items.len(), line)?;
            Ok(Object::list(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Object::Tuple(items) => {
            let indices = slice_index_sequence(start, end, step, items.len(), line)?;
            Ok(Object::tuple(indices.into_iter().map(|i| items[i].clone()).collect()))
        }
        Object::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = slice_index_sequence(start, end, step, chars.len(), line)?;
            Ok(Object::str(indices.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("'{}' object is not sliceable", other.type_name()),
        )
        .with_line(line)),
    }
}

// === Attribute access ===

pub(crate) fn get_attr(obj: &Object, name: &str, line: u32) -> Result<Object, Exception> {
    match obj {
        Object::Instance(instance) => {
            if let Some(value) = instance.borrow().get_field(name) {
                return Ok(value.clone());
            }
            let class = Rc::clone(&instance.borrow().class);
            if let Some((method, defining)) = Class::find_method(&class, name) {
                return Ok(Object::BoundMethod(Rc::new(BoundMethod {
                    instance: Rc::downgrade(instance),
                    func: method,
                    defining,
                })));
            }
            Err(Exception::new(
                ExcType::AttributeError,
                format!("'{}' object has no attribute '{name}'", class.name),
            )
            .with_line(line))
        }
        Object::Class(class) => {
            if name == "__doc__" {
                return Ok(class.doc.as_deref().map_or(Object::None, Object::str));
            }
            Class::find_method(class, name).map(|(method, _)| method).ok_or_else(|| {
                Exception::new(
                    ExcType::AttributeError,
                    format!("class '{}' has no attribute '{name}'", class.name),
                )
                .with_line(line)
            })
        }
        Object::Super(proxy) => {
            let Some(instance) = proxy.instance.upgrade() else {
                return Err(Exception::new(ExcType::RuntimeError, "super(): instance is gone").with_line(line));
            };
            Class::find_method(&proxy.start, name)
                .map(|(method, defining)| {
                    Object::BoundMethod(Rc::new(BoundMethod {
                        instance: Rc::downgrade(&instance),
                        func: method,
                        defining,
                    }))
                })
                .ok_or_else(|| {
                    Exception::new(
                        ExcType::AttributeError,
                        format!("'super' object has no attribute '{name}'"),
                    )
                    .with_line(line)
                })
        }
        Object::Dict(dict) => {
            if let Some(method) = builtin_method(obj, name) {
                return Ok(method);
            }
            dict.borrow().get_by_string(name).ok_or_else(|| {
                Exception::new(ExcType::AttributeError, format!("'dict' object has no attribute '{name}'"))
                    .with_line(line)
            })
        }
        Object::Exception(exc) => match name {
            "message" => Ok(Object::str(exc.message())),
            "kind" => Ok(Object::str(exc.kind().name())),
            "exit_code" => Ok(exc.exit_code().map_or(Object::None, Object::Int)),
            _ => Err(Exception::new(
                ExcType::AttributeError,
                format!("'{}' object has no attribute '{name}'", exc.kind().name()),
            )
            .with_line(line)),
        },
        other => builtin_method(other, name).ok_or_else(|| {
            Exception::new(
                ExcType::AttributeError,
                format!("'{}' object has no attribute '{name}'", other.type_name()),
            )
            .with_line(line)
        }),
    }
}

// === Calls ===

fn eval_call(
    ctx: &mut Context,
    scope: &ScopeRef,
    callee: &Expr,
    arg_exprs: &[Expr],
    kwarg_exprs: &[(String, Expr)],
    line: u32,
) -> Result<Object, Exception> {
    // `super()` resolves against the enclosing method scope.
    if let ExprKind::Ident(name) = &callee.kind {
        if name == "super" && arg_exprs.is_empty() && kwarg_exprs.is_empty() {
            if let Some(proxy) = resolve_super(scope, line)? {
                return Ok(proxy);
            }
        }
    }

    let callee = eval_expr(ctx, scope, callee)?;

    let mut args = ArgValues::new();
    for arg in arg_exprs {
        args.push(eval_expr(ctx, scope, arg)?);
    }
    let mut kwargs = Kwargs::new();
    for (name, value_expr) in kwarg_exprs {
        let value = eval_expr(ctx, scope, value_expr)?;
        kwargs.insert(name.clone(), value).map_err(|e| e.with_line(line))?;
    }
    *args.kwargs_mut() = kwargs;

    call_object(ctx, &callee, args, line)
}

fn resolve_super(scope: &ScopeRef, line: u32) -> Result<Option<Object>, Exception> {
    let Some(self_obj) = Namespace::get(scope, "self") else {
        return Ok(None);
    };
    let Some(Object::Class(defining)) = Namespace::get(scope, "__class__") else {
        return Ok(None);
    };
    let Object::Instance(instance) = &self_obj else {
        return Ok(None);
    };
    let Some(base) = defining.base.clone() else {
        return Err(Exception::new(
            ExcType::TypeError,
            format!("super(): '{}' has no base class", defining.name),
        )
        .with_line(line));
    };
    Ok(Some(Object::Super(Rc::new(SuperProxy {
        instance: Rc::downgrade(instance),
        start: base,
    }))))
}

/// Dispatches a call to any callable object.
pub(crate) fn call_object(ctx: &mut Context, callee: &Object, args: ArgValues, line: u32) -> Result<Object, Exception> {
    match callee {
        Object::Function(func) => call_function(ctx, func, args, None, line),
        Object::Lambda(lambda) => call_lambda(ctx, lambda, args, line),
        Object::Builtin(builtin) => builtin.call(ctx, args).map_err(|e| e.with_line(line)),
        Object::Class(class) => instantiate(ctx, class, args, line),
        Object::BoundMethod(method) => call_bound_method(ctx, method, args, line),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("'{}' object is not callable", other.type_name()),
        )
        .with_line(line)),
    }
}

fn call_bound_method(ctx: &mut Context, method: &BoundMethod, mut args: ArgValues, line: u32) -> Result<Object, Exception> {
    let Some(instance) = method.instance.upgrade() else {
        return Err(Exception::new(ExcType::RuntimeError, "method call on dropped instance").with_line(line));
    };
    args.prepend(Object::Instance(instance));
    match &method.func {
        Object::Function(func) => call_function(ctx, func, args, Some(Rc::clone(&method.defining)), line),
        Object::Builtin(builtin) => builtin.call(ctx, args).map_err(|e| e.with_line(line)),
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("'{}' object is not callable", other.type_name()),
        )
        .with_line(line)),
    }
}

/// Calls a script function: fresh child scope of the captured environment,
/// parameters bound positionally, then by keyword, then from defaults.
pub(crate) fn call_function(
    ctx: &mut Context,
    func: &Rc<Function>,
    args: ArgValues,
    defining: Option<Rc<Class>>,
    line: u32,
) -> Result<Object, Exception> {
    ctx.enter_call().map_err(|e| e.with_line(line))?;
    let result = run_function(ctx, func, args, defining);
    ctx.exit_call();
    result
}

fn run_function(
    ctx: &mut Context,
    func: &Rc<Function>,
    args: ArgValues,
    defining: Option<Rc<Class>>,
) -> Result<Object, Exception> {
    let call_scope = Namespace::new_child(&func.env);
    bind_params(ctx, &func.name, &func.params, args, &call_scope, &func.env)?;
    if let Some(class) = defining {
        Namespace::set_local(&call_scope, "__class__", Object::Class(class));
    }
    match eval_block(ctx, &call_scope, &func.body) {
        Ok(_) => Ok(Object::None),
        Err(RunError::Return(value)) => Ok(value),
        Err(other) => Err(other.into_exception()),
    }
}

fn call_lambda(ctx: &mut Context, lambda: &Rc<LambdaFn>, args: ArgValues, line: u32) -> Result<Object, Exception> {
    ctx.enter_call().map_err(|e| e.with_line(line))?;
    let call_scope = Namespace::new_child(&lambda.env);
    let result = bind_params(ctx, "<lambda>", &lambda.params, args, &call_scope, &lambda.env)
        .and_then(|()| eval_expr(ctx, &call_scope, &lambda.body));
    ctx.exit_call();
    result
}

/// Binds call arguments to parameters: positionals in order, surplus into a
/// trailing `*args` tuple, then keywords by name, then defaults (evaluated in
/// the defining environment). Missing required parameters are a `TypeError`.
fn bind_params(
    ctx: &mut Context,
    func_name: &str,
    params: &[Param],
    args: ArgValues,
    call_scope: &ScopeRef,
    defining_env: &ScopeRef,
) -> Result<(), Exception> {
    let (positional, kwargs) = args.into_parts();
    let variadic = params.last().filter(|p| p.variadic);
    let regular: &[Param] = if variadic.is_some() {
        &params[..params.len() - 1]
    } else {
        params
    };

    let mut bound: Vec<Option<Object>> = vec![None; regular.len()];

    let mut positional = positional.into_iter();
    for slot in &mut bound {
        match positional.next() {
            Some(value) => *slot = Some(value),
            None => break,
        }
    }
    let surplus: Vec<Object> = positional.collect();
    if let Some(variadic) = variadic {
        Namespace::set_local(call_scope, &variadic.name, Object::tuple(surplus));
    } else if !surplus.is_empty() {
        return Err(Exception::new(
            ExcType::TypeError,
            format!(
                "{func_name}() takes {} positional argument{} but {} were given",
                regular.len(),
                if regular.len() == 1 { "" } else { "s" },
                regular.len() + surplus.len()
            ),
        ));
    }

    for (name, value) in kwargs.into_iter_ordered() {
        let Some(index) = regular.iter().position(|p| p.name == name) else {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("{func_name}() got an unexpected keyword argument '{name}'"),
            ));
        };
        if bound[index].is_some() {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("{func_name}() got multiple values for argument '{name}'"),
            ));
        }
        bound[index] = Some(value);
    }

    for (param, slot) in regular.iter().zip(bound.into_iter()) {
        let value = match slot {
            Some(value) => value,
            None => match &param.default {
                Some(default) => eval_expr(ctx, defining_env, default)?,
                None => {
                    return Err(Exception::new(
                        ExcType::TypeError,
                        format!("{func_name}() missing required argument: '{}'", param.name),
                    ));
                }
            },
        };
        Namespace::set_local(call_scope, &param.name, value);
    }
    Ok(())
}

/// Calls a class: fresh instance, then `__init__(self, ...)` when defined.
pub(crate) fn instantiate(ctx: &mut Context, class: &Rc<Class>, args: ArgValues, line: u32) -> Result<Object, Exception> {
    let instance = Rc::new(RefCell::new(Instance {
        class: Rc::clone(class),
        fields: indexmap::IndexMap::new(),
    }));
    let instance_obj = Object::Instance(Rc::clone(&instance));

    if let Some((init, defining)) = Class::find_method(class, "__init__") {
        let mut init_args = args;
        init_args.prepend(instance_obj.clone());
        match init {
            Object::Function(func) => {
                call_function(ctx, &func, init_args, Some(defining), line)?;
            }
            Object::Builtin(builtin) => {
                builtin.call(ctx, init_args).map_err(|e| e.with_line(line))?;
            }
            other => {
                return Err(Exception::new(
                    ExcType::TypeError,
                    format!("__init__ must be callable, not '{}'", other.type_name()),
                )
                .with_line(line));
            }
        }
    } else if !args.is_empty() || !args.kwargs().is_empty() {
        return Err(Exception::new(
            ExcType::TypeError,
            format!("{}() takes no arguments", class.name),
        )
        .with_line(line));
    }
    Ok(instance_obj)
}

// === Iteration ===

/// A materialized or protocol-driven iteration source.
pub(crate) enum IterSource {
    Items(std::vec::IntoIter<Object>),
    /// Iterator object driving `__next__` until `StopIteration`.
    Protocol(Object),
}

impl IterSource {
    pub(crate) fn next(&mut self, ctx: &mut Context) -> Result<Option<Object>, Exception> {
        match self {
            Self::Items(iter) => Ok(iter.next()),
            Self::Protocol(iterator) => {
                let next = get_attr(iterator, "__next__", 0)?;
                match call_object(ctx, &next, ArgValues::new(), 0) {
                    Ok(value) => Ok(Some(value)),
                    Err(exc) if exc.exc_type() == Some(ExcType::StopIteration) => Ok(None),
                    Err(exc) => Err(exc),
                }
            }
        }
    }
}

/// Starts iteration over a value: strings char-by-char, lists/tuples
/// element-by-element, dicts by key, and instances through the
/// `__iter__`/`__next__` protocol.
pub(crate) fn iter_object(ctx: &mut Context, obj: Object, line: u32) -> Result<IterSource, Exception> {
    match &obj {
        Object::Str(s) => Ok(IterSource::Items(
            s.chars().map(|c| Object::str(c.to_string())).collect::<Vec<_>>().into_iter(),
        )),
        Object::List(items) => Ok(IterSource::Items(items.borrow().clone().into_iter())),
        Object::Tuple(items) => Ok(IterSource::Items(items.as_ref().clone().into_iter())),
        Object::Dict(dict) => Ok(IterSource::Items(dict.borrow().keys().into_iter())),
        Object::Instance(_) => {
            let iter_method = get_attr(&obj, "__iter__", line).map_err(|_| {
                Exception::new(
                    ExcType::TypeError,
                    format!("'{}' object is not iterable", obj.type_name()),
                )
                .with_line(line)
            })?;
            let iterator = call_object(ctx, &iter_method, ArgValues::new(), line)?;
            Ok(IterSource::Protocol(iterator))
        }
        other => Err(Exception::new(
            ExcType::TypeError,
            format!("'{}' object is not iterable", other.type_name()),
        )
        .with_line(line)),
    }
}

/// Binds one loop element to the loop target(s), unpacking when several
/// targets are given.
pub(crate) fn bind_loop_targets(scope: &ScopeRef, targets: &[String], item: Object, line: u32) -> Result<(), Exception> {
    if targets.len() == 1 {
        Namespace::set(scope, &targets[0], item);
        return Ok(());
    }
    let values: Vec<Object> = match &item {
        Object::Tuple(items) => items.as_ref().clone(),
        Object::List(items) => items.borrow().clone(),
        other => {
            return Err(Exception::new(
                ExcType::TypeError,
                format!("cannot unpack non-sequence {}", other.type_name()),
            )
            .with_line(line));
        }
    };
    if values.len() != targets.len() {
        return Err(Exception::new(
            ExcType::ValueError,
            format!("expected {} values to unpack, got {}", targets.len(), values.len()),
        )
        .with_line(line));
    }
    for (target, value) in targets.iter().zip(values) {
        Namespace::set(scope, target, value);
    }
    Ok(())
}
