//! Decorators that wrap a function's return value.
//!
//! `@safe` is declared as `Callable[..., R] -> Callable[..., Result[R, Exception]]`,
//! so the checker's own inference forgets the decorated function's
//! parameters. The refined type is the decorated signature with only the
//! return type replaced.

use crate::core::{CallableType, Substitution, Type};
use crate::errors::TypeError;
use crate::plugin::context::FunctionContext;

pub fn analyze(ctx: &FunctionContext) -> Result<Type, TypeError> {
    let Type::Callable(wrapped) = &ctx.default_return_type else {
        return Ok(ctx.default_return_type.clone());
    };

    match ctx.arg_type(0) {
        Some(Type::Callable(function)) => {
            Ok(Type::Callable(function.with_ret((*wrapped.ret).clone())))
        }
        Some(Type::Overloaded(items)) => {
            // The default type only reflects the first matching item, so
            // each item's return is derived from the declared signature.
            let refined = items
                .iter()
                .map(|item| {
                    let ret = decorated_return(ctx, item).unwrap_or_else(|| (*wrapped.ret).clone());
                    item.with_ret(ret)
                })
                .collect();
            Ok(Type::Overloaded(refined))
        }
        _ => Ok(ctx.default_return_type.clone()),
    }
}

/// Return type the decorator gives `function`, from its declared signature.
fn decorated_return(ctx: &FunctionContext, function: &CallableType) -> Option<Type> {
    let declared = ctx.callee_callable()?;
    let param = declared.first_positional_type()?;

    let mut subst = Substitution::new();
    if !subst.bind(param, &Type::Callable(function.clone())) {
        return None;
    }
    match subst.instantiate(declared, &declared.ret) {
        Type::Callable(result) => Some(*result.ret),
        _ => None,
    }
}
