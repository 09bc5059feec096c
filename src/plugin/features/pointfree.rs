//! Pointfree helpers such as `map_`
//!
//! `map_(f)` returns a function over any container kind. The checker solves
//! the type variables determined by `f` and erases the rest, which would
//! pin the container to `Never`. The refined type keeps the unsolved
//! variables generic so the result can later be applied to a `Result`, a
//! `Maybe`, an `IO` and so on.

use crate::core::{Substitution, Type};
use crate::errors::TypeError;
use crate::plugin::context::FunctionContext;
use tracing::debug;

pub fn analyze(ctx: &FunctionContext) -> Result<Type, TypeError> {
    let (Some(declared), Some(function)) = (ctx.callee_callable(), ctx.arg_type(0)) else {
        return Ok(ctx.default_return_type.clone());
    };
    let Some(param) = declared.first_positional_type() else {
        return Ok(ctx.default_return_type.clone());
    };

    let mut subst = Substitution::new();
    if !subst.bind(param, function) {
        // Already reported by the checker as an argument error.
        debug!(fullname = %ctx.fullname, "pointfree argument does not match declaration");
        return Ok(ctx.default_return_type.clone());
    }

    Ok(subst.apply(&declared.ret))
}
