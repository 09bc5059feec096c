//! `partial(func, *args, **kwargs)`
//!
//! The declared result is `Callable[..., R]`. The refined result is `func`'s
//! signature minus the parameters the extra arguments fill, with the type
//! variables those arguments solve substituted.

use crate::core::{ArgKind, CallableType, Param, Substitution, Type};
use crate::errors::{ErrorKind, TypeError};
use crate::plugin::context::FunctionContext;
use tracing::debug;

const FUNCTION: usize = 0;
const ARGS: usize = 1;
const KWARGS: usize = 2;

pub fn analyze(ctx: &FunctionContext) -> Result<Type, TypeError> {
    let Some(function) = ctx.arg_type(FUNCTION) else {
        return Ok(ctx.default_return_type.clone());
    };

    let Some(applied) = Applied::from_context(ctx) else {
        debug!("partial called with unpacked arguments, keeping default type");
        return Ok(ctx.default_return_type.clone());
    };

    match function {
        Type::Callable(callable) => applied.apply(ctx, callable).map(Type::Callable),
        Type::Overloaded(items) => {
            let mut accepted: Vec<CallableType> =
                items.iter().filter_map(|item| applied.apply(ctx, item).ok()).collect();
            match accepted.len() {
                0 => Err(ctx.fail(ErrorKind::NoMatchingOverload { callee: ctx.short_name().to_string() })),
                1 => Ok(Type::Callable(accepted.remove(0))),
                _ => Ok(Type::Overloaded(accepted)),
            }
        }
        _ => Ok(ctx.default_return_type.clone()),
    }
}

/// Extra arguments given to `partial`, after the function itself.
struct Applied<'a> {
    positional: &'a [Type],
    keywords: Vec<(&'a str, &'a Type)>,
}

impl<'a> Applied<'a> {
    /// `None` when `*xs` or `**kw` unpacking hides how many arguments there are.
    fn from_context(ctx: &'a FunctionContext) -> Option<Self> {
        let kinds_known = |formal: usize, expected: ArgKind| {
            ctx.arg_kinds
                .get(formal)
                .map_or(true, |kinds| kinds.iter().all(|k| *k == expected))
        };
        if !kinds_known(ARGS, ArgKind::Positional) || !kinds_known(KWARGS, ArgKind::Named) {
            return None;
        }

        let keywords = ctx
            .args(KWARGS)
            .iter()
            .enumerate()
            .map(|(i, ty)| ctx.arg_name(KWARGS, i).map(|name| (name, ty)))
            .collect::<Option<Vec<_>>>()?;

        Some(Self { positional: ctx.args(ARGS), keywords })
    }

    fn apply(&self, ctx: &FunctionContext, function: &CallableType) -> Result<CallableType, TypeError> {
        if function.is_ellipsis() {
            return Ok(function.clone());
        }

        let params = &function.params;
        let mut subst = Substitution::new();
        let mut bound = vec![Binding::Free; params.len()];

        // Positional arguments, numbered from 2: `func` is argument 1.
        let mut next = 0;
        for (i, param) in params.iter().enumerate() {
            if next >= self.positional.len() {
                break;
            }
            match param.kind {
                ArgKind::Positional | ArgKind::Optional => {
                    check(ctx, &mut subst, param, &self.positional[next], next + 2)?;
                    bound[i] = Binding::Positional;
                    next += 1;
                }
                ArgKind::Star => {
                    while next < self.positional.len() {
                        check(ctx, &mut subst, param, &self.positional[next], next + 2)?;
                        next += 1;
                    }
                }
                _ => {}
            }
        }
        if next < self.positional.len() {
            return Err(ctx.fail(ErrorKind::TooManyArguments { callee: ctx.short_name().to_string() }));
        }

        for (k, (name, ty)) in self.keywords.iter().enumerate() {
            let index = self.positional.len() + k + 2;
            let by_name = params
                .iter()
                .position(|p| !p.kind.is_variadic() && p.name.as_deref() == Some(*name));

            match by_name {
                Some(i) if bound[i] != Binding::Free => {
                    return Err(ctx.fail(ErrorKind::Custom {
                        message: format!(
                            "\"{}\" gets multiple values for keyword argument \"{}\"",
                            ctx.short_name(),
                            name
                        ),
                    }));
                }
                Some(i) => {
                    check(ctx, &mut subst, &params[i], ty, index)?;
                    bound[i] = Binding::Keyword;
                }
                None => match function.star_star_param() {
                    Some(kwargs) => check(ctx, &mut subst, kwargs, ty, index)?,
                    None => {
                        let candidates: Vec<String> =
                            params.iter().filter_map(|p| p.name.clone()).collect();
                        return Err(TypeError::unexpected_keyword(
                            ctx.short_name(),
                            name,
                            ctx.location.clone(),
                            &candidates,
                        )
                        .with_file(ctx.file.clone()));
                    }
                },
            }
        }

        // A positional parameter filled by keyword can no longer be passed
        // positionally, nor can anything after it.
        let mut keyword_only = false;
        let mut remaining = Vec::with_capacity(params.len());
        for (param, binding) in params.iter().zip(&bound) {
            match binding {
                Binding::Keyword if param.kind.is_positional() => keyword_only = true,
                Binding::Keyword | Binding::Positional => {}
                Binding::Free => {
                    let kind = if keyword_only { param.kind.to_named() } else { param.kind };
                    remaining.push(Param::new(param.name.clone(), kind, subst.apply(&param.ty)));
                }
            }
        }

        Ok(CallableType::new(remaining, subst.apply(&function.ret)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Free,
    Positional,
    Keyword,
}

fn check(
    ctx: &FunctionContext,
    subst: &mut Substitution,
    param: &Param,
    actual: &Type,
    index: usize,
) -> Result<(), TypeError> {
    if subst.bind(&param.ty, actual) {
        Ok(())
    } else {
        Err(TypeError::invalid_arg_type(
            index,
            ctx.short_name(),
            &subst.apply(&param.ty),
            actual,
            ctx.location.clone(),
        )
        .with_file(ctx.file.clone()))
    }
}
