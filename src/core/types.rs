use std::fmt;
use dashmap::DashMap;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Any,
    Never,
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,

    // Composite types
    List(Box<Type>),
    Tuple(Vec<Type>),
    Dict(Box<Type>, Box<Type>),

    Union(Vec<Type>),

    /// Parameterized nominal type, e.g. `Result[int, Exception]`
    Generic(String, Vec<Type>),

    // Nominal types
    Class(String),

    /// Inference placeholder for names the checker knows nothing about
    Var(u64),

    /// Declared generic parameter (`_ValueType = TypeVar('_ValueType')`)
    TypeVar(String),

    Callable(CallableType),
    Overloaded(Vec<CallableType>),
}

/// Kind of a formal parameter or of an actual argument at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgKind {
    /// `x`
    Positional,
    /// `x=default`
    Optional,
    /// `*args`
    Star,
    /// keyword-only `x`
    Named,
    /// keyword-only `x=default`
    NamedOptional,
    /// `**kwargs`
    StarStar,
}

impl ArgKind {
    pub fn is_positional(self) -> bool {
        matches!(self, ArgKind::Positional | ArgKind::Optional)
    }

    pub fn is_named(self) -> bool {
        matches!(self, ArgKind::Named | ArgKind::NamedOptional)
    }

    pub fn is_required(self) -> bool {
        matches!(self, ArgKind::Positional | ArgKind::Named)
    }

    pub fn is_variadic(self) -> bool {
        matches!(self, ArgKind::Star | ArgKind::StarStar)
    }

    /// Keyword-only counterpart of a positional kind.
    pub fn to_named(self) -> ArgKind {
        match self {
            ArgKind::Positional => ArgKind::Named,
            ArgKind::Optional => ArgKind::NamedOptional,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    pub name: Option<String>,
    pub kind: ArgKind,
    pub ty: Type,
}

impl Param {
    pub fn new(name: Option<String>, kind: ArgKind, ty: Type) -> Self {
        Self { name, kind, ty }
    }

    pub fn positional(name: impl Into<String>, ty: Type) -> Self {
        Self::new(Some(name.into()), ArgKind::Positional, ty)
    }

    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Self::new(Some(name.into()), ArgKind::Optional, ty)
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self::new(Some(name.into()), ArgKind::Named, ty)
    }

    pub fn star(ty: Type) -> Self {
        Self::new(None, ArgKind::Star, ty)
    }

    pub fn star_star(ty: Type) -> Self {
        Self::new(None, ArgKind::StarStar, ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallableType {
    pub params: Vec<Param>,
    pub ret: Box<Type>,
}

impl CallableType {
    pub fn new(params: Vec<Param>, ret: Type) -> Self {
        Self { params, ret: Box::new(ret) }
    }

    /// `Callable[..., ret]`
    pub fn ellipsis(ret: Type) -> Self {
        Self::new(vec![Param::star(Type::Any), Param::star_star(Type::Any)], ret)
    }

    /// `Callable[[a, b], ret]` with anonymous positional parameters
    pub fn positional(params: Vec<Type>, ret: Type) -> Self {
        Self::new(
            params.into_iter().map(|ty| Param::new(None, ArgKind::Positional, ty)).collect(),
            ret,
        )
    }

    pub fn is_ellipsis(&self) -> bool {
        self.params.len() == 2
            && self.params[0].kind == ArgKind::Star
            && self.params[0].ty == Type::Any
            && self.params[1].kind == ArgKind::StarStar
            && self.params[1].ty == Type::Any
    }

    pub fn with_ret(&self, ret: Type) -> Self {
        Self { params: self.params.clone(), ret: Box::new(ret) }
    }

    pub fn positional_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| p.kind.is_positional())
    }

    pub fn star_param(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.kind == ArgKind::Star)
    }

    pub fn star_star_param(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.kind == ArgKind::StarStar)
    }

    /// Type of the parameter that receives the first positional argument.
    pub fn first_positional_type(&self) -> Option<&Type> {
        self.positional_params()
            .next()
            .or_else(|| self.star_param())
            .map(|p| &p.ty)
    }

    /// Whether one positional argument may be passed with all other
    /// parameters left at their defaults.
    pub fn accepts_single_positional(&self) -> bool {
        let mut positional = 0;
        for param in &self.params {
            match param.kind {
                ArgKind::Positional => positional += 1,
                ArgKind::Named => return false,
                _ => {}
            }
        }
        positional == 1 || (positional == 0 && self.first_positional_type().is_some())
    }
}

impl Type {
    pub fn callable(params: Vec<Param>, ret: Type) -> Type {
        Type::Callable(CallableType::new(params, ret))
    }

    pub fn generic(name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::Generic(name.into(), args)
    }

    pub fn type_var(name: impl Into<String>) -> Type {
        Type::TypeVar(name.into())
    }

    pub fn as_callable(&self) -> Option<&CallableType> {
        match self {
            Type::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    pub fn is_gradual(&self) -> bool {
        matches!(self, Type::Any | Type::Var(_))
    }

    fn is_open(&self) -> bool {
        matches!(self, Type::Var(_)) || self.contains_type_vars()
    }

    pub fn contains_type_vars(&self) -> bool {
        match self {
            Type::TypeVar(_) => true,
            Type::List(t) => t.contains_type_vars(),
            Type::Tuple(ts) | Type::Union(ts) | Type::Generic(_, ts) => {
                ts.iter().any(|t| t.contains_type_vars())
            }
            Type::Dict(k, v) => k.contains_type_vars() || v.contains_type_vars(),
            Type::Callable(c) => callable_contains_type_vars(c),
            Type::Overloaded(items) => items.iter().any(callable_contains_type_vars),
            _ => false,
        }
    }

    pub fn is_subtype(&self, other: &Type) -> bool {
        use Type::*;

        match (self, other) {
            (_, Any) | (Any, _) => true,
            (Var(_), _) | (_, Var(_)) => true,
            (TypeVar(_), _) | (_, TypeVar(_)) => true,
            (Never, _) => true,
            (a, b) if a == b => true,

            // Python numeric tower
            (Bool, Int) | (Bool, Float) | (Int, Float) => true,
            (_, Class(name)) if name == "object" => true,

            // Union handling: A <: B | C if A <: B or A <: C
            (Union(types), b) => types.iter().all(|t| t.is_subtype(b)),
            (a, Union(types)) => types.iter().any(|t| a.is_subtype(t)),

            (List(a), List(b)) => a.is_subtype(b),
            (Dict(k1, v1), Dict(k2, v2)) => k1.is_subtype(k2) && v1.is_subtype(v2),

            // Tuple covariance
            (Tuple(a), Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_subtype(y))
            }

            // Generic containers are treated as covariant
            (Generic(n1, a1), Generic(n2, a2)) => {
                n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| x.is_subtype(y))
            }
            (Generic(n1, _), Class(n2)) | (Class(n1), Generic(n2, _)) => n1 == n2,

            (Callable(c1), Callable(c2)) => callable_is_subtype(c1, c2),
            (Overloaded(items), Callable(c2)) => items.iter().any(|c1| callable_is_subtype(c1, c2)),
            (Callable(c1), Overloaded(items)) => items.iter().all(|c2| callable_is_subtype(c1, c2)),

            _ => false,
        }
    }

    pub fn union(types: Vec<Type>) -> Type {
        let mut simplified = Vec::new();

        // Flatten nested unions
        for ty in types {
            if let Type::Union(inner) = ty {
                simplified.extend(inner);
            } else if ty != Type::Never {
                simplified.push(ty);
            }
        }

        if simplified.iter().any(|t| *t == Type::Any) {
            return Type::Any;
        }

        // Open members (type variables, placeholders) only merge with equal
        // members, or `Optional[T]` would collapse.
        let absorbs = |sup: &Type, sub: &Type| {
            sup == sub || (!sup.is_open() && !sub.is_open() && sub.is_subtype(sup))
        };

        let mut result: Vec<Type> = Vec::new();
        for ty in simplified {
            if !result.iter().any(|t| absorbs(t, &ty)) {
                result.retain(|t| !absorbs(&ty, t));
                result.push(ty);
            }
        }

        match result.len() {
            0 => Type::Never,
            1 => result.pop().unwrap_or(Type::Never),
            _ => Type::Union(result),
        }
    }

    /// `t` without its `None` members.
    pub fn remove_none(&self) -> Type {
        match self {
            Type::Union(types) => {
                Type::union(types.iter().filter(|t| **t != Type::None).cloned().collect())
            }
            Type::None => Type::Never,
            other => other.clone(),
        }
    }
}

fn callable_contains_type_vars(callable: &CallableType) -> bool {
    callable.ret.contains_type_vars() || callable.params.iter().any(|p| p.ty.contains_type_vars())
}

// Function contravariance in params, covariance in return
fn callable_is_subtype(sub: &CallableType, sup: &CallableType) -> bool {
    if !sub.ret.is_subtype(&sup.ret) {
        return false;
    }
    if sub.is_ellipsis() || sup.is_ellipsis() {
        return true;
    }

    let sub_positional: Vec<&Param> = sub.positional_params().collect();
    let sup_positional: Vec<&Param> = sup.positional_params().collect();

    if sup_positional.len() > sub_positional.len() && sub.star_param().is_none() {
        return false;
    }
    let required_extra = sub_positional
        .iter()
        .skip(sup_positional.len())
        .any(|p| p.kind == ArgKind::Positional);
    if required_extra && sup.star_param().is_none() {
        return false;
    }

    sup_positional.iter().enumerate().all(|(i, sup_param)| {
        let sub_ty = sub_positional
            .get(i)
            .map(|p| &p.ty)
            .or_else(|| sub.star_param().map(|p| &p.ty));
        match sub_ty {
            Some(sub_ty) => sup_param.ty.is_subtype(sub_ty),
            None => false,
        }
    })
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Never => write!(f, "Never"),
            Type::None => write!(f, "None"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "str"),
            Type::Bytes => write!(f, "bytes"),
            Type::List(t) => write!(f, "list[{}]", t),
            Type::Tuple(ts) => write!(f, "tuple[{}]", join(ts, ", ")),
            Type::Dict(k, v) => write!(f, "dict[{}, {}]", k, v),
            Type::Union(ts) => write!(f, "{}", join(ts, " | ")),
            Type::Generic(name, args) => {
                if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    write!(f, "{}[{}]", name, join(args, ", "))
                }
            }
            Type::Class(name) => write!(f, "{}", name),
            Type::Var(id) => write!(f, "T{}", id),
            Type::TypeVar(name) => write!(f, "{}", name),
            Type::Callable(callable) => write!(f, "{}", callable),
            Type::Overloaded(items) => write!(f, "Overload({})", join(items, ", ")),
        }
    }
}

impl fmt::Display for CallableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(self.params.len() + 1);
        let mut seen_star = false;

        for param in &self.params {
            if param.kind.is_named() && !seen_star {
                parts.push("*".to_string());
                seen_star = true;
            }
            let rendered = match (param.kind, &param.name) {
                (ArgKind::Star, name) => {
                    seen_star = true;
                    match name {
                        Some(name) => format!("*{}: {}", name, param.ty),
                        None => format!("*{}", param.ty),
                    }
                }
                (ArgKind::StarStar, Some(name)) => format!("**{}: {}", name, param.ty),
                (ArgKind::StarStar, None) => format!("**{}", param.ty),
                (ArgKind::Optional | ArgKind::NamedOptional, Some(name)) => {
                    format!("{}: {} =", name, param.ty)
                }
                (ArgKind::Optional | ArgKind::NamedOptional, None) => format!("{} =", param.ty),
                (_, Some(name)) => format!("{}: {}", name, param.ty),
                (_, None) => format!("{}", param.ty),
            };
            parts.push(rendered);
        }

        write!(f, "def ({}) -> {}", parts.join(", "), self.ret)
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(sep)
}

/// Symbol table for one analysis unit: names in scope to their static types.
pub struct TypeContext {
    types: DashMap<String, Type>,
    next_var: std::sync::atomic::AtomicU64,
}

impl TypeContext {
    pub fn new() -> Self {
        Self {
            types: DashMap::new(),
            next_var: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn fresh_var(&self) -> Type {
        let id = self.next_var.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Type::Var(id)
    }

    pub fn set_type(&self, name: String, ty: Type) {
        self.types.insert(name, ty);
    }

    pub fn get_type(&self, name: &str) -> Option<Type> {
        self.types.get(name).map(|r| r.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Type> {
        self.types.remove(name).map(|(_, ty)| ty)
    }

    pub fn names(&self) -> Vec<String> {
        self.types.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_to_str() -> CallableType {
        CallableType::new(vec![Param::positional("x", Type::Int)], Type::Str)
    }

    #[test]
    fn test_callable_display() {
        let callable = CallableType::new(
            vec![
                Param::positional("x", Type::Int),
                Param::optional("y", Type::Str),
                Param::star(Type::Float),
                Param::named("flag", Type::Bool),
                Param::star_star(Type::Any),
            ],
            Type::generic("Result", vec![Type::Int, Type::Class("Exception".into())]),
        );
        assert_eq!(
            callable.to_string(),
            "def (x: int, y: str =, *float, flag: bool, **Any) -> Result[int, Exception]"
        );
    }

    #[test]
    fn test_keyword_only_display_inserts_marker() {
        let callable = CallableType::new(vec![Param::named("key", Type::Str)], Type::None);
        assert_eq!(callable.to_string(), "def (*, key: str) -> None");
    }

    #[test]
    fn test_ellipsis_callable() {
        let callable = CallableType::ellipsis(Type::Int);
        assert!(callable.is_ellipsis());
        assert_eq!(callable.to_string(), "def (*Any, **Any) -> int");
        assert!(!int_to_str().is_ellipsis());
    }

    #[test]
    fn test_numeric_tower() {
        assert!(Type::Bool.is_subtype(&Type::Int));
        assert!(Type::Int.is_subtype(&Type::Float));
        assert!(!Type::Float.is_subtype(&Type::Int));
        assert!(!Type::Str.is_subtype(&Type::Int));
    }

    #[test]
    fn test_generic_subtyping() {
        let ok = Type::generic("Result", vec![Type::Int, Type::Str]);
        let wide = Type::generic("Result", vec![Type::Float, Type::Str]);
        let other = Type::generic("Maybe", vec![Type::Int]);
        assert!(ok.is_subtype(&wide));
        assert!(!wide.is_subtype(&ok));
        assert!(!ok.is_subtype(&other));
    }

    #[test]
    fn test_callable_variance() {
        let takes_float = CallableType::new(vec![Param::positional("x", Type::Float)], Type::Int);
        let takes_int = CallableType::new(vec![Param::positional("x", Type::Int)], Type::Float);
        assert!(Type::Callable(takes_float.clone()).is_subtype(&Type::Callable(takes_int.clone())));
        assert!(!Type::Callable(takes_int).is_subtype(&Type::Callable(takes_float)));
    }

    #[test]
    fn test_union_simplification() {
        assert_eq!(Type::union(vec![Type::Int, Type::Bool]), Type::Int);
        assert_eq!(Type::union(vec![]), Type::Never);
        assert_eq!(
            Type::union(vec![Type::Int, Type::None]),
            Type::Union(vec![Type::Int, Type::None])
        );
        assert_eq!(Type::Union(vec![Type::Int, Type::None]).remove_none(), Type::Int);
    }

    #[test]
    fn test_union_keeps_type_var_members() {
        let optional = Type::union(vec![Type::type_var("V"), Type::None]);
        assert_eq!(optional, Type::Union(vec![Type::type_var("V"), Type::None]));
        assert_eq!(optional.to_string(), "V | None");
    }

    #[test]
    fn test_accepts_single_positional() {
        assert!(int_to_str().accepts_single_positional());
        let two = CallableType::positional(vec![Type::Int, Type::Int], Type::Int);
        assert!(!two.accepts_single_positional());
        let defaults = CallableType::new(
            vec![Param::positional("x", Type::Int), Param::optional("y", Type::Int)],
            Type::Int,
        );
        assert!(defaults.accepts_single_positional());
    }

    #[test]
    fn test_context_fresh_vars_are_distinct() {
        let ctx = TypeContext::new();
        assert_ne!(ctx.fresh_var(), ctx.fresh_var());
        ctx.set_type("x".to_string(), Type::Int);
        assert_eq!(ctx.get_type("x"), Some(Type::Int));
        assert_eq!(ctx.get_type("y"), None);
    }
}
