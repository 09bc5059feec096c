//! Solving declared type variables against actual argument types
//!
//! A call to a generic signature binds each `TypeVar` in the formal
//! parameter types to the matching part of the argument type. The resulting
//! `Substitution` is then applied to the return type.

use crate::core::types::{CallableType, Param, Type};
use std::collections::HashMap;

/// Higher-kinded emulation used by `returns`: `KindN[Container, A, B, C]`.
pub const KIND_N: &str = "KindN";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    bindings: HashMap<String, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.insert(name.into(), ty);
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Match `actual` against `pattern`, recording bindings for the type
    /// variables in `pattern`. Returns `false` when the types are
    /// incompatible; bindings made before the mismatch are kept.
    pub fn bind(&mut self, pattern: &Type, actual: &Type) -> bool {
        match (pattern, actual) {
            (Type::TypeVar(name), _) => self.bind_var(name, actual),
            (Type::Any, _) => true,
            (_, Type::Any) | (_, Type::Var(_)) => {
                self.bind_free_to_any(pattern);
                true
            }
            (_, Type::Never) => true,

            (Type::Union(members), _) if members.iter().any(|m| m.contains_type_vars()) => {
                self.bind_union(members, actual)
            }

            (Type::List(p), Type::List(a)) => self.bind(p, a),
            (Type::Dict(pk, pv), Type::Dict(ak, av)) => self.bind(pk, ak) && self.bind(pv, av),
            (Type::Tuple(ps), Type::Tuple(as_)) => {
                ps.len() == as_.len() && ps.iter().zip(as_).all(|(p, a)| self.bind(p, a))
            }

            (Type::Generic(kind, params), Type::Generic(name, args)) if kind == KIND_N && name != KIND_N => {
                self.bind_kind(params, name, args)
            }
            (Type::Generic(n1, ps), Type::Generic(n2, as_)) => {
                n1 == n2 && ps.len() == as_.len() && ps.iter().zip(as_).all(|(p, a)| self.bind(p, a))
            }

            (Type::Callable(p), Type::Callable(a)) => self.bind_callable(p, a),
            (Type::Callable(p), Type::Overloaded(items)) => {
                // First overload item that fits wins; bindings of failed
                // attempts are discarded.
                for item in items {
                    let mut attempt = self.clone();
                    if attempt.bind_callable(p, item) {
                        *self = attempt;
                        return true;
                    }
                }
                false
            }

            (p, a) => a.is_subtype(p),
        }
    }

    fn bind_var(&mut self, name: &str, actual: &Type) -> bool {
        match self.bindings.get(name) {
            None => {
                self.bindings.insert(name.to_string(), actual.clone());
                true
            }
            Some(bound) if actual.is_subtype(bound) => true,
            Some(bound) if bound.is_subtype(actual) => {
                self.bindings.insert(name.to_string(), actual.clone());
                true
            }
            Some(_) => false,
        }
    }

    fn bind_free_to_any(&mut self, pattern: &Type) {
        for var in free_type_vars(pattern) {
            self.bindings.entry(var).or_insert(Type::Any);
        }
    }

    fn bind_union(&mut self, members: &[Type], actual: &Type) -> bool {
        let (generic, concrete): (Vec<&Type>, Vec<&Type>) =
            members.iter().partition(|m| m.contains_type_vars());

        let actual_members: Vec<Type> = match actual {
            Type::Union(types) => types.clone(),
            other => vec![other.clone()],
        };
        let remainder: Vec<Type> = actual_members
            .into_iter()
            .filter(|a| !concrete.iter().any(|c| a.is_subtype(c)))
            .collect();

        match generic.as_slice() {
            [single] if remainder.is_empty() => {
                self.bind_free_to_any(single);
                true
            }
            [single] => self.bind(single, &Type::union(remainder)),
            _ => remainder.iter().all(|a| generic.iter().any(|g| self.clone().bind(g, a))),
        }
    }

    fn bind_kind(&mut self, params: &[Type], name: &str, args: &[Type]) -> bool {
        let Some((ctor, rest)) = params.split_first() else {
            return false;
        };
        if !self.bind(ctor, &Type::Class(name.to_string())) {
            return false;
        }
        rest.iter().zip(args).all(|(p, a)| self.bind(p, a))
    }

    fn bind_callable(&mut self, pattern: &CallableType, actual: &CallableType) -> bool {
        if pattern.is_ellipsis() || actual.is_ellipsis() {
            return self.bind(&pattern.ret, &actual.ret);
        }

        let formal: Vec<&Param> = pattern.positional_params().collect();
        let given: Vec<&Param> = actual.positional_params().collect();
        let required = given.iter().filter(|p| p.kind.is_required()).count();

        if formal.len() < required {
            return false;
        }
        if formal.len() > given.len() && actual.star_param().is_none() {
            return false;
        }

        for (i, param) in formal.iter().enumerate() {
            let actual_ty = given
                .get(i)
                .map(|p| &p.ty)
                .or_else(|| actual.star_param().map(|p| &p.ty));
            match actual_ty {
                Some(actual_ty) => {
                    if !self.bind(&param.ty, actual_ty) {
                        return false;
                    }
                }
                None => return false,
            }
        }

        self.bind(&pattern.ret, &actual.ret)
    }

    /// Substitute every bound variable in `ty`. Unbound variables are left
    /// in place.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::TypeVar(name) => self.bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
            Type::List(t) => Type::List(Box::new(self.apply(t))),
            Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| self.apply(t)).collect()),
            Type::Dict(k, v) => Type::Dict(Box::new(self.apply(k)), Box::new(self.apply(v))),
            Type::Union(ts) => Type::union(ts.iter().map(|t| self.apply(t)).collect()),
            Type::Generic(name, args) => {
                let args: Vec<Type> = args.iter().map(|t| self.apply(t)).collect();
                if name == KIND_N {
                    collapse_kind(args)
                } else {
                    Type::Generic(name.clone(), args)
                }
            }
            Type::Callable(c) => Type::Callable(self.apply_callable(c)),
            Type::Overloaded(items) => {
                Type::Overloaded(items.iter().map(|c| self.apply_callable(c)).collect())
            }
            other => other.clone(),
        }
    }

    pub fn apply_callable(&self, callable: &CallableType) -> CallableType {
        CallableType {
            params: callable
                .params
                .iter()
                .map(|p| Param::new(p.name.clone(), p.kind, self.apply(&p.ty)))
                .collect(),
            ret: Box::new(self.apply(&callable.ret)),
        }
    }

    /// Apply the bindings to `ty`, then erase the variables of `declared`
    /// that are still unbound. Variables carried in by the bound types stay.
    pub fn instantiate(&self, declared: &CallableType, ty: &Type) -> Type {
        let mut vars = Vec::new();
        collect_callable_vars(declared, &mut vars);

        let mut erased = Substitution::new();
        for var in vars.into_iter().filter(|v| !self.bindings.contains_key(v)) {
            erased.insert(var, Type::Never);
        }
        erased.apply(&self.apply(ty))
    }
}

/// `KindN[Result, int, str, _T]` becomes `Result[int, str]` once the
/// container is known. Trailing unsolved arguments belong to kinds of a
/// lower arity and are dropped.
fn collapse_kind(args: Vec<Type>) -> Type {
    let mut iter = args.into_iter();
    match iter.next() {
        Some(Type::Class(name)) | Some(Type::Generic(name, _)) => {
            let mut rest: Vec<Type> = iter.collect();
            while matches!(rest.last(), Some(Type::TypeVar(_))) {
                rest.pop();
            }
            Type::Generic(name, rest)
        }
        Some(ctor) => {
            let mut all = vec![ctor];
            all.extend(iter);
            Type::Generic(KIND_N.to_string(), all)
        }
        None => Type::Generic(KIND_N.to_string(), Vec::new()),
    }
}

/// Names of the type variables occurring in `ty`, in first-occurrence order.
pub fn free_type_vars(ty: &Type) -> Vec<String> {
    let mut out = Vec::new();
    collect_type_vars(ty, &mut out);
    out
}

fn collect_type_vars(ty: &Type, out: &mut Vec<String>) {
    match ty {
        Type::TypeVar(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Type::List(t) => collect_type_vars(t, out),
        Type::Tuple(ts) | Type::Union(ts) | Type::Generic(_, ts) => {
            ts.iter().for_each(|t| collect_type_vars(t, out))
        }
        Type::Dict(k, v) => {
            collect_type_vars(k, out);
            collect_type_vars(v, out);
        }
        Type::Callable(c) => collect_callable_vars(c, out),
        Type::Overloaded(items) => items.iter().for_each(|c| collect_callable_vars(c, out)),
        _ => {}
    }
}

fn collect_callable_vars(callable: &CallableType, out: &mut Vec<String>) {
    callable.params.iter().for_each(|p| collect_type_vars(&p.ty, out));
    collect_type_vars(&callable.ret, out);
}

/// Replace unsolved type variables with `Never`.
pub fn erase_unsolved(ty: &Type) -> Type {
    let mut erased = Substitution::new();
    for var in free_type_vars(ty) {
        erased.insert(var, Type::Never);
    }
    erased.apply(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(name: &str) -> Type {
        Type::type_var(name)
    }

    #[test]
    fn test_bind_and_apply() {
        let mut subst = Substitution::new();
        assert!(subst.bind(&Type::List(Box::new(tv("T"))), &Type::List(Box::new(Type::Int))));
        assert_eq!(subst.apply(&tv("T")), Type::Int);
        assert_eq!(subst.apply(&tv("U")), tv("U"));
    }

    #[test]
    fn test_rebinding_widens() {
        let mut subst = Substitution::new();
        assert!(subst.bind(&tv("T"), &Type::Int));
        assert!(subst.bind(&tv("T"), &Type::Float));
        assert_eq!(subst.get("T"), Some(&Type::Float));
        assert!(!subst.bind(&tv("T"), &Type::Str));
    }

    #[test]
    fn test_optional_pattern_strips_none() {
        let mut subst = Substitution::new();
        let pattern = Type::Union(vec![tv("V"), Type::None]);
        assert!(subst.bind(&pattern, &Type::Union(vec![Type::Str, Type::None])));
        assert_eq!(subst.get("V"), Some(&Type::Str));
    }

    #[test]
    fn test_ellipsis_callable_binds_return() {
        let mut subst = Substitution::new();
        let pattern = Type::Callable(CallableType::ellipsis(tv("R")));
        let actual = Type::callable(vec![Param::positional("x", Type::Int)], Type::Str);
        assert!(subst.bind(&pattern, &actual));
        assert_eq!(subst.get("R"), Some(&Type::Str));
    }

    #[test]
    fn test_callable_arity_mismatch() {
        let mut subst = Substitution::new();
        let pattern = Type::Callable(CallableType::positional(vec![tv("A")], tv("B")));
        let actual = Type::Callable(CallableType::positional(vec![Type::Int, Type::Int], Type::Int));
        assert!(!subst.bind(&pattern, &actual));
    }

    #[test]
    fn test_kind_collapses_to_container() {
        let mut subst = Substitution::new();
        let pattern = Type::generic(KIND_N, vec![tv("K"), Type::Int, tv("S"), tv("T")]);
        let actual = Type::generic("Result", vec![Type::Int, Type::Str]);
        assert!(subst.bind(&pattern, &actual));

        let ret = Type::generic(KIND_N, vec![tv("K"), Type::Bool, tv("S"), tv("T")]);
        assert_eq!(subst.apply(&ret), Type::generic("Result", vec![Type::Bool, Type::Str]));
    }

    #[test]
    fn test_any_binds_free_vars() {
        let mut subst = Substitution::new();
        assert!(subst.bind(&Type::List(Box::new(tv("T"))), &Type::Any));
        assert_eq!(subst.get("T"), Some(&Type::Any));
    }

    #[test]
    fn test_instantiate_keeps_argument_vars() {
        // def (function: Callable[..., V]) -> Callable[..., Result[V, E]]
        let declared = CallableType::positional(
            vec![Type::Callable(CallableType::ellipsis(tv("V")))],
            Type::Callable(CallableType::ellipsis(Type::generic("Result", vec![tv("V"), tv("E")]))),
        );
        let actual = Type::callable(vec![Param::positional("x", tv("T"))], tv("T"));

        let mut subst = Substitution::new();
        assert!(subst.bind(&declared.params[0].ty, &actual));
        assert_eq!(
            subst.instantiate(&declared, &declared.ret).to_string(),
            "def (*Any, **Any) -> Result[T, Never]"
        );
    }

    #[test]
    fn test_instantiate_drops_unsolved_kind_arguments() {
        let declared = CallableType::positional(
            vec![Type::generic(KIND_N, vec![tv("K"), Type::Int, tv("S"), tv("T")])],
            Type::generic(KIND_N, vec![tv("K"), Type::Str, tv("S"), tv("T")]),
        );
        let mut subst = Substitution::new();
        assert!(subst.bind(&declared.params[0].ty, &Type::generic("Result", vec![Type::Int, Type::Any])));
        assert_eq!(
            subst.instantiate(&declared, &declared.ret),
            Type::generic("Result", vec![Type::Str, Type::Any])
        );
    }

    #[test]
    fn test_erase_unsolved() {
        let ty = Type::generic("Result", vec![Type::Int, tv("E")]);
        assert_eq!(erase_unsolved(&ty), Type::generic("Result", vec![Type::Int, Type::Never]));
        assert_eq!(free_type_vars(&ty), vec!["E".to_string()]);
    }
}
