//! `@curry`
//!
//! A curried function accepts its parameters in any sequence of groups:
//! `f(1, 2, 3)`, `f(1)(2, 3)`, `f(1, 2)(3)` and `f(1)(2)(3)`. The refined
//! type is an overload with one nested callable per grouping.

use crate::core::{ArgKind, CallableType, Param, Type};
use crate::errors::{ErrorKind, TypeError};
use crate::plugin::context::FunctionContext;
use tracing::debug;

/// Widest function curried precisely. `n` parameters give `2^(n-1)` overload
/// items; wider functions keep the declared `Callable[..., R]`.
pub const MAX_CURRIED_PARAMS: usize = 10;

pub fn analyze(ctx: &FunctionContext) -> Result<Type, TypeError> {
    match ctx.arg_type(0) {
        Some(Type::Callable(function)) => curry(ctx, function),
        _ => Ok(ctx.default_return_type.clone()),
    }
}

fn curry(ctx: &FunctionContext, function: &CallableType) -> Result<Type, TypeError> {
    if function.is_ellipsis() {
        return Ok(Type::Callable(function.clone()));
    }
    if let Some(param) = function.params.iter().find(|p| !p.kind.is_positional()) {
        let reason = match param.kind {
            ArgKind::Star | ArgKind::StarStar => "variadic parameters cannot be curried",
            _ => "keyword-only parameters cannot be curried",
        };
        return Err(ctx.fail(ErrorKind::UnsupportedSignature {
            callee: ctx.short_name().to_string(),
            reason: reason.to_string(),
        }));
    }

    let params = &function.params;
    if params.len() <= 1 {
        return Ok(Type::Callable(function.clone()));
    }
    if params.len() > MAX_CURRIED_PARAMS {
        debug!(params = params.len(), "too many parameters to curry, keeping default type");
        return Ok(ctx.default_return_type.clone());
    }

    let items = groupings(params.len())
        .into_iter()
        .map(|sizes| nest(params, &sizes, &function.ret))
        .collect();
    Ok(Type::Overloaded(items))
}

/// Ordered splits of `n` parameters into non-empty groups, widest first
/// group first.
fn groupings(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    for first in (1..=n).rev() {
        for mut rest in groupings(n - first) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

/// `def (group 1) -> def (group 2) -> ... -> ret`
fn nest(params: &[Param], sizes: &[usize], ret: &Type) -> CallableType {
    let mut bounds = Vec::with_capacity(sizes.len());
    let mut start = 0;
    for size in sizes {
        bounds.push((start, start + size));
        start += size;
    }

    let mut bounds = bounds.into_iter().rev();
    let (first_start, first_end) = bounds.next().unwrap_or((0, params.len()));
    let mut current = CallableType::new(params[first_start..first_end].to_vec(), ret.clone());
    for (start, end) in bounds {
        current = CallableType::new(params[start..end].to_vec(), Type::Callable(current));
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(function: Type) -> FunctionContext {
        FunctionContext::positional(
            "returns.curry.curry",
            vec![vec![function]],
            Type::Callable(CallableType::ellipsis(Type::Any)),
        )
    }

    #[test]
    fn test_groupings() {
        assert_eq!(groupings(1), vec![vec![1]]);
        assert_eq!(groupings(3), vec![vec![3], vec![2, 1], vec![1, 2], vec![1, 1, 1]]);
        assert_eq!(groupings(5).len(), 16);
    }

    #[test]
    fn test_curry_two_arguments() {
        let function = Type::callable(
            vec![Param::positional("a", Type::Int), Param::positional("b", Type::Str)],
            Type::Float,
        );
        assert_eq!(
            analyze(&context(function)).unwrap().to_string(),
            "Overload(def (a: int, b: str) -> float, def (a: int) -> def (b: str) -> float)"
        );
    }

    #[test]
    fn test_curry_three_arguments_count() {
        let function = Type::callable(
            vec![
                Param::positional("a", Type::Int),
                Param::positional("b", Type::Int),
                Param::optional("c", Type::Int),
            ],
            Type::Int,
        );
        match analyze(&context(function)).unwrap() {
            Type::Overloaded(items) => {
                assert_eq!(items.len(), 4);
                assert_eq!(items[3].to_string(), "def (a: int) -> def (b: int) -> def (c: int =) -> int");
            }
            other => panic!("expected overload, got {}", other),
        }
    }

    fn wide(n: usize) -> Type {
        let params = (0..n).map(|i| Param::positional(format!("a{}", i), Type::Int)).collect();
        Type::callable(params, Type::Int)
    }

    #[test]
    fn test_arity_cap() {
        match analyze(&context(wide(MAX_CURRIED_PARAMS))).unwrap() {
            Type::Overloaded(items) => assert_eq!(items.len(), 1 << (MAX_CURRIED_PARAMS - 1)),
            other => panic!("expected overload, got {}", other),
        }

        for n in [MAX_CURRIED_PARAMS + 1, 65, 200] {
            let ctx = context(wide(n));
            assert_eq!(analyze(&ctx).unwrap(), ctx.default_return_type);
        }
    }

    #[test]
    fn test_single_argument_is_unchanged() {
        let function = Type::callable(vec![Param::positional("a", Type::Int)], Type::Int);
        assert_eq!(analyze(&context(function.clone())).unwrap(), function);
    }

    #[test]
    fn test_variadic_is_rejected() {
        let function = Type::callable(
            vec![Param::positional("a", Type::Int), Param::star(Type::Int)],
            Type::Int,
        );
        let error = analyze(&context(function)).unwrap_err();
        assert_eq!(
            error.message(),
            "\"curry\" cannot be applied here: variadic parameters cannot be curried"
        );
    }

    #[test]
    fn test_non_callable_keeps_default() {
        let ctx = context(Type::Int);
        assert_eq!(analyze(&ctx).unwrap(), ctx.default_return_type);
    }
}
