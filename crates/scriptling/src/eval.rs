//! Statement evaluation: control flow, assignment, functions, classes,
//! exception handling, and the top-level program driver.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{AssignTarget, Block, Expr, ExprKind, Program, Stmt, StmtKind},
    class::Class,
    context::Context,
    exception::{ExcKind, ExcType, Exception, RunError, RunResult},
    expressions::{binary_op, bind_loop_targets, eval_expr, get_attr, index_get, iter_object},
    function::Function,
    library::import_path,
    namespace::{Namespace, ScopeRef},
    object::{Dict, Object},
};

/// Runs a parsed program to completion in the given scope.
///
/// The value of the last expression statement is the program's result, so
/// `Eval("1 + 2")` hands `3` back to the host.
pub(crate) fn eval_program(ctx: &mut Context, scope: &ScopeRef, program: &Program) -> Result<Object, Exception> {
    let mut last = Object::None;
    for stmt in &program.statements {
        let value = eval_stmt(ctx, scope, stmt).map_err(RunError::into_exception)?;
        if matches!(stmt.kind, StmtKind::Expr(_)) {
            last = value;
        }
    }
    Ok(last)
}

/// Evaluates the statements of a suite, yielding the last expression value.
pub(crate) fn eval_block(ctx: &mut Context, scope: &ScopeRef, block: &[Stmt]) -> RunResult<Object> {
    let mut last = Object::None;
    for stmt in block {
        let value = eval_stmt(ctx, scope, stmt)?;
        if matches!(stmt.kind, StmtKind::Expr(_)) {
            last = value;
        }
    }
    Ok(last)
}

fn eval_stmt(ctx: &mut Context, scope: &ScopeRef, stmt: &Stmt) -> RunResult<Object> {
    ctx.check_cancelled().map_err(|e| e.with_line(stmt.line))?;
    let line = stmt.line;
    match &stmt.kind {
        StmtKind::Expr(expr) => Ok(eval_expr(ctx, scope, expr).map_err(|e| e.with_line(line))?),
        StmtKind::Assign { target, value } => {
            let value = eval_expr(ctx, scope, value).map_err(|e| e.with_line(line))?;
            assign_target(ctx, scope, target, value, line)?;
            Ok(Object::None)
        }
        StmtKind::MultiAssign { targets, value } => {
            let value = eval_expr(ctx, scope, value).map_err(|e| e.with_line(line))?;
            let values: Vec<Object> = match &value {
                Object::Tuple(items) => items.as_ref().clone(),
                Object::List(items) => items.borrow().clone(),
                other => {
                    return Err(Exception::new(
                        ExcType::TypeError,
                        format!("cannot unpack non-sequence {}", other.type_name()),
                    )
                    .with_line(line)
                    .into());
                }
            };
            if values.len() != targets.len() {
                return Err(Exception::new(
                    ExcType::ValueError,
                    format!("expected {} values to unpack, got {}", targets.len(), values.len()),
                )
                .with_line(line)
                .into());
            }
            for (target, value) in targets.iter().zip(values) {
                assign_target(ctx, scope, target, value, line)?;
            }
            Ok(Object::None)
        }
        StmtKind::AugAssign { target, op, value } => {
            let current = read_target(ctx, scope, target, line)?;
            let rhs = eval_expr(ctx, scope, value).map_err(|e| e.with_line(line))?;
            let updated = binary_op(*op, &current, &rhs, line)?;
            assign_target(ctx, scope, target, updated, line)?;
            Ok(Object::None)
        }
        StmtKind::If { branches, else_block } => {
            for (cond, block) in branches {
                if eval_expr(ctx, scope, cond).map_err(|e| e.with_line(line))?.is_truthy() {
                    return eval_block(ctx, scope, block).map(|_| Object::None);
                }
            }
            if let Some(block) = else_block {
                eval_block(ctx, scope, block)?;
            }
            Ok(Object::None)
        }
        StmtKind::While { cond, body } => {
            loop {
                ctx.check_cancelled().map_err(|e| e.with_line(line))?;
                if !eval_expr(ctx, scope, cond).map_err(|e| e.with_line(line))?.is_truthy() {
                    break;
                }
                match eval_block(ctx, scope, body) {
                    Ok(_) => {}
                    Err(RunError::Break) => break,
                    Err(RunError::Continue) => {}
                    Err(other) => return Err(other),
                }
            }
            Ok(Object::None)
        }
        StmtKind::For { targets, iterable, body } => {
            let source = eval_expr(ctx, scope, iterable).map_err(|e| e.with_line(line))?;
            let mut iter = iter_object(ctx, source, line)?;
            loop {
                ctx.check_cancelled().map_err(|e| e.with_line(line))?;
                let Some(item) = iter.next(ctx)? else {
                    break;
                };
                bind_loop_targets(scope, targets, item, line)?;
                match eval_block(ctx, scope, body) {
                    Ok(_) => {}
                    Err(RunError::Break) => break,
                    Err(RunError::Continue) => {}
                    Err(other) => return Err(other),
                }
            }
            Ok(Object::None)
        }
        StmtKind::Def(def) => {
            let function = Function {
                name: def.name.clone(),
                params: def.params.clone(),
                body: Rc::new(def.body.clone()),
                env: Rc::clone(scope),
                doc: def.doc.clone(),
            };
            Namespace::set(scope, &def.name, Object::Function(Rc::new(function)));
            Ok(Object::None)
        }
        StmtKind::Class { name, base, body } => {
            let class = build_class(ctx, scope, name, base.as_ref(), body, line)?;
            Namespace::set(scope, name, Object::Class(class));
            Ok(Object::None)
        }
        StmtKind::Return(value) => {
            let value = match value {
                Some(expr) => eval_expr(ctx, scope, expr).map_err(|e| e.with_line(line))?,
                None => Object::None,
            };
            Err(RunError::Return(value))
        }
        StmtKind::Break => Err(RunError::Break),
        StmtKind::Continue => Err(RunError::Continue),
        StmtKind::Pass => Ok(Object::None),
        StmtKind::Try { body, handlers, finally } => {
            let outcome = run_try(ctx, scope, body, handlers);
            if let Some(finally_block) = finally {
                // `finally` runs on every exit path; its own non-local exit
                // replaces the pending one.
                eval_block(ctx, scope, finally_block)?;
            }
            outcome.map(|_| Object::None)
        }
        StmtKind::Raise(value) => Err(RunError::Exc(build_raised(ctx, scope, value.as_ref(), line)?)),
        StmtKind::Import { path, alias } => {
            import_path(ctx, scope, path, alias.as_deref()).map_err(|e| e.with_line(line))?;
            Ok(Object::None)
        }
        StmtKind::Global(names) => {
            for name in names {
                Namespace::declare_global(scope, name);
            }
            Ok(Object::None)
        }
        StmtKind::Nonlocal(names) => {
            for name in names {
                Namespace::declare_nonlocal(scope, name).map_err(|e| e.with_line(line))?;
            }
            Ok(Object::None)
        }
        StmtKind::Assert { cond, message } => {
            if eval_expr(ctx, scope, cond).map_err(|e| e.with_line(line))?.is_truthy() {
                return Ok(Object::None);
            }
            let text = match message {
                Some(expr) => eval_expr(ctx, scope, expr)
                    .map_err(|e| e.with_line(line))?
                    .to_string(),
                None => String::new(),
            };
            Err(Exception::new(ExcType::AssertionError, text).with_line(line).into())
        }
    }
}

fn run_try(
    ctx: &mut Context,
    scope: &ScopeRef,
    body: &Block,
    handlers: &[crate::ast::ExceptHandler],
) -> RunResult<Object> {
    match eval_block(ctx, scope, body) {
        Err(RunError::Exc(exc)) => {
            for handler in handlers {
                if !handler_matches(handler.kind.as_deref(), &exc) {
                    continue;
                }
                if let Some(alias) = &handler.alias {
                    Namespace::set(scope, alias, Object::Exception(Rc::new(exc.clone())));
                }
                // Make the exception available to bare `raise` in the handler.
                let saved = ctx.current_exception.replace(exc);
                let result = eval_block(ctx, scope, &handler.body);
                ctx.current_exception = saved;
                return result;
            }
            Err(RunError::Exc(exc))
        }
        other => other,
    }
}

fn handler_matches(kind: Option<&str>, exc: &Exception) -> bool {
    match kind {
        None => true,
        Some(name) => exc.kind().is_caught_by(&ExcKind::from_name(name)),
    }
}

/// Builds the exception for a `raise` statement.
///
/// `raise ValueError("msg")` and `raise CustomKind("msg")` construct an
/// exception of that kind even when the name is not bound; `raise expr`
/// otherwise renders the value into the message; bare `raise` re-raises the
/// exception the innermost handler is processing.
fn build_raised(
    ctx: &mut Context,
    scope: &ScopeRef,
    value: Option<&Expr>,
    line: u32,
) -> RunResult<Exception> {
    let Some(expr) = value else {
        return match &ctx.current_exception {
            Some(exc) => Ok(exc.clone()),
            None => Err(Exception::new(ExcType::RuntimeError, "no active exception to re-raise")
                .with_line(line)
                .into()),
        };
    };

    // Exception-constructor form: Name(...) where Name is an exception kind
    // or an unbound capitalized name supplied by the host.
    if let ExprKind::Call { callee, args, kwargs } = &expr.kind {
        if let ExprKind::Ident(name) = &callee.kind {
            let known_kind = name.parse::<ExcType>().is_ok();
            let unbound = Namespace::get(scope, name).is_none();
            if kwargs.is_empty() && (known_kind || unbound) {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(eval_expr(ctx, scope, arg).map_err(|e| e.with_line(line))?);
                }
                if name == "SystemExit" {
                    let code = match rendered.first() {
                        Some(Object::Int(code)) => *code,
                        Some(_) => 1,
                        None => 0,
                    };
                    return Ok(Exception::system_exit(code).with_line(line));
                }
                let message = rendered
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Ok(Exception::custom(name, message).with_line(line));
            }
        }
    }

    if let ExprKind::Ident(name) = &expr.kind {
        if name.parse::<ExcType>().is_ok() && Namespace::get(scope, name).is_none() {
            return Ok(Exception::custom(name, "").with_line(line));
        }
    }

    let value = eval_expr(ctx, scope, expr).map_err(|e| e.with_line(line))?;
    match value {
        Object::Exception(exc) => Ok((*exc).clone().with_line(line)),
        other => Ok(Exception::new(ExcType::Exception, other.to_string()).with_line(line)),
    }
}

fn build_class(
    ctx: &mut Context,
    scope: &ScopeRef,
    name: &str,
    base: Option<&Expr>,
    body: &Block,
    line: u32,
) -> RunResult<Rc<Class>> {
    let base = match base {
        Some(expr) => {
            let value = eval_expr(ctx, scope, expr).map_err(|e| e.with_line(line))?;
            match value {
                Object::Class(class) => Some(class),
                other => {
                    return Err(Exception::new(
                        ExcType::TypeError,
                        format!("base class must be a class, not '{}'", other.type_name()),
                    )
                    .with_line(line)
                    .into());
                }
            }
        }
        None => None,
    };

    // The class body runs in its own scope; definitions become methods.
    let class_scope = Namespace::new_child(scope);
    match eval_block(ctx, &class_scope, body) {
        Ok(_) => {}
        Err(RunError::Exc(exc)) => return Err(RunError::Exc(exc)),
        Err(_) => {
            return Err(Exception::new(ExcType::ParseError, "invalid statement in class body")
                .with_line(line)
                .into());
        }
    }

    let mut methods = IndexMap::new();
    for stmt in body {
        if let StmtKind::Def(def) = &stmt.kind {
            if let Some(method) = Namespace::get_local(&class_scope, &def.name) {
                methods.insert(def.name.clone(), method);
            }
        }
    }

    let doc = match body.first() {
        Some(Stmt {
            kind: StmtKind::Expr(Expr {
                kind: ExprKind::Str(text),
                ..
            }),
            ..
        }) => Some(text.clone()),
        _ => None,
    };

    Ok(Rc::new(Class {
        name: name.to_owned(),
        base,
        methods,
        doc,
    }))
}

/// Reads the current value of an assignment target, for augmented assigns.
fn read_target(ctx: &mut Context, scope: &ScopeRef, target: &AssignTarget, line: u32) -> RunResult<Object> {
    let value = match target {
        AssignTarget::Name(name) => Namespace::get(scope, name).ok_or_else(|| {
            Exception::new(ExcType::NameError, format!("name '{name}' is not defined")).with_line(line)
        })?,
        AssignTarget::Index { obj, index } => {
            let obj = eval_expr(ctx, scope, obj).map_err(|e| e.with_line(line))?;
            let index = eval_expr(ctx, scope, index).map_err(|e| e.with_line(line))?;
            index_get(&obj, &index, line)?
        }
        AssignTarget::Attr { obj, name } => {
            let obj = eval_expr(ctx, scope, obj).map_err(|e| e.with_line(line))?;
            get_attr(&obj, name, line)?
        }
    };
    Ok(value)
}

pub(crate) fn assign_target(
    ctx: &mut Context,
    scope: &ScopeRef,
    target: &AssignTarget,
    value: Object,
    line: u32,
) -> RunResult<()> {
    match target {
        AssignTarget::Name(name) => {
            Namespace::set(scope, name, value);
            Ok(())
        }
        AssignTarget::Index { obj, index } => {
            let container = eval_expr(ctx, scope, obj).map_err(|e| e.with_line(line))?;
            let index = eval_expr(ctx, scope, index).map_err(|e| e.with_line(line))?;
            match &container {
                Object::List(items) => {
                    let mut items = items.borrow_mut();
                    let len = items.len();
                    let i = match &index {
                        Object::Int(n) => *n,
                        Object::Bool(b) => i64::from(*b),
                        other => {
                            return Err(Exception::new(
                                ExcType::TypeError,
                                format!("list indices must be integers, not {}", other.type_name()),
                            )
                            .with_line(line)
                            .into());
                        }
                    };
                    let wrapped = if i < 0 { i + len as i64 } else { i };
                    if wrapped < 0 || wrapped >= len as i64 {
                        return Err(Exception::new(ExcType::IndexError, "list assignment index out of range")
                            .with_line(line)
                            .into());
                    }
                    items[wrapped as usize] = value;
                    Ok(())
                }
                Object::Dict(dict) => {
                    dict.borrow_mut().insert(index, value);
                    Ok(())
                }
                other => Err(Exception::new(
                    ExcType::TypeError,
                    format!("'{}' object does not support item assignment", other.type_name()),
                )
                .with_line(line)
                .into()),
            }
        }
        AssignTarget::Attr { obj, name } => {
            let target_obj = eval_expr(ctx, scope, obj).map_err(|e| e.with_line(line))?;
            match &target_obj {
                Object::Instance(instance) => {
                    instance.borrow_mut().set_field(name, value);
                    Ok(())
                }
                other => Err(Exception::new(
                    ExcType::AttributeError,
                    format!("cannot set attribute '{name}' on '{}'", other.type_name()),
                )
                .with_line(line)
                .into()),
            }
        }
    }
}

/// Materializes a dict of canonical string keys from local bindings, used
/// when a script library's top level has been evaluated.
pub(crate) fn collect_exports(scope: &ScopeRef) -> Dict {
    let mut dict = Dict::new();
    let mut names = Namespace::local_names(scope);
    names.sort_unstable();
    for name in names {
        if name.starts_with("__") {
            continue;
        }
        if let Some(value) = Namespace::get_local(scope, &name) {
            dict.set_by_string(&name, value);
        }
    }
    dict
}
