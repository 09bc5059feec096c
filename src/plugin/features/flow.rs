//! `flow(instance, *functions)`
//!
//! Threads the instance type through each function in order; the refined
//! type is what the last function returns.

use crate::core::{ArgKind, CallableType, Substitution, Type};
use crate::errors::{ErrorKind, TypeError};
use crate::plugin::context::FunctionContext;

const INSTANCE: usize = 0;
const FUNCTIONS: usize = 1;

pub fn analyze(ctx: &FunctionContext) -> Result<Type, TypeError> {
    let Some(instance) = ctx.arg_type(INSTANCE) else {
        return Ok(ctx.default_return_type.clone());
    };

    let unpacked = ctx
        .arg_kinds
        .get(FUNCTIONS)
        .map_or(false, |kinds| kinds.iter().any(|k| *k == ArgKind::Star));
    if unpacked {
        return Ok(ctx.default_return_type.clone());
    }

    let functions = ctx.args(FUNCTIONS);
    if functions.is_empty() {
        return Err(ctx.fail(ErrorKind::TooFewArguments { callee: ctx.short_name().to_string() }));
    }

    let mut current = instance.clone();
    for (i, function) in functions.iter().enumerate() {
        // Argument 1 is the instance.
        current = step(ctx, &current, function, i + 2)?;
    }
    Ok(current)
}

fn step(ctx: &FunctionContext, value: &Type, function: &Type, index: usize) -> Result<Type, TypeError> {
    let applied = match function {
        Type::Any | Type::Var(_) => return Ok(Type::Any),
        Type::Callable(callable) => apply(callable, value),
        Type::Overloaded(items) => items.iter().find_map(|item| apply(item, value)),
        other => {
            return Err(ctx.fail(ErrorKind::NonCallable { ty: other.to_string() }));
        }
    };

    applied.ok_or_else(|| {
        let expected = Type::Callable(CallableType::positional(vec![value.clone()], Type::Any));
        TypeError::invalid_arg_type(index, ctx.short_name(), &expected, function, ctx.location.clone())
            .with_file(ctx.file.clone())
    })
}

/// Return type of `function(value)`, if that call is valid.
fn apply(function: &CallableType, value: &Type) -> Option<Type> {
    if !function.accepts_single_positional() {
        return None;
    }
    let param = function.first_positional_type()?;

    let mut subst = Substitution::new();
    if subst.bind(param, value) {
        Some(subst.instantiate(function, &function.ret))
    } else {
        None
    }
}
