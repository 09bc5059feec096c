//! Annotation expressions to static types

use crate::core::{CallableType, Type};
use crate::frontend::parse_expression;
use rustpython_parser::ast::{Constant, Expr, Operator};
use std::collections::HashSet;

/// Reads annotations in a scope where `type_vars` are the declared
/// `TypeVar` names.
pub struct AnnotationReader<'a> {
    type_vars: &'a HashSet<String>,
}

impl<'a> AnnotationReader<'a> {
    pub fn new(type_vars: &'a HashSet<String>) -> Self {
        Self { type_vars }
    }

    pub fn read(&self, expr: &Expr) -> Type {
        match expr {
            Expr::Name(name) => self.named(name.id.as_str()),
            Expr::Attribute(attr) => self.named(attr.attr.as_str()),

            Expr::Constant(c) => match &c.value {
                Constant::None => Type::None,
                // Forward reference
                Constant::Str(source) => match parse_expression(source) {
                    Ok(parsed) => self.read(&parsed),
                    Err(_) => Type::Any,
                },
                _ => Type::Any,
            },

            Expr::Subscript(subscript) => match annotation_name(&subscript.value) {
                Some(name) => self.subscript(name, &subscript.slice),
                None => Type::Any,
            },

            Expr::BinOp(binop) if matches!(binop.op, Operator::BitOr) => {
                Type::union(vec![self.read(&binop.left), self.read(&binop.right)])
            }

            _ => Type::Any,
        }
    }

    fn named(&self, name: &str) -> Type {
        if self.type_vars.contains(name) {
            return Type::type_var(name);
        }
        match name {
            "int" => Type::Int,
            "float" => Type::Float,
            "str" => Type::Str,
            "bool" => Type::Bool,
            "bytes" => Type::Bytes,
            "None" => Type::None,
            "Any" => Type::Any,
            "Never" | "NoReturn" => Type::Never,
            "list" | "List" => Type::List(Box::new(Type::Any)),
            "dict" | "Dict" => Type::Dict(Box::new(Type::Any), Box::new(Type::Any)),
            "Callable" => Type::Callable(CallableType::ellipsis(Type::Any)),
            other => Type::Class(other.to_string()),
        }
    }

    fn subscript(&self, name: &str, slice: &Expr) -> Type {
        let items = slice_items(slice);
        match name {
            "list" | "List" => Type::List(Box::new(self.first(&items))),
            "dict" | "Dict" => match items.as_slice() {
                [key, value] => Type::Dict(Box::new(self.read(key)), Box::new(self.read(value))),
                _ => Type::Dict(Box::new(Type::Any), Box::new(Type::Any)),
            },
            "tuple" | "Tuple" => {
                if items.iter().any(|item| is_ellipsis(item)) {
                    Type::generic("tuple", vec![self.first(&items)])
                } else {
                    Type::Tuple(items.iter().map(|item| self.read(item)).collect())
                }
            }
            "Optional" => Type::union(vec![self.first(&items), Type::None]),
            "Union" => Type::union(items.iter().map(|item| self.read(item)).collect()),
            "Callable" => self.callable(&items),
            other => Type::generic(other, items.iter().map(|item| self.read(item)).collect()),
        }
    }

    /// `Callable[[A, B], R]` or `Callable[..., R]`
    fn callable(&self, items: &[&Expr]) -> Type {
        let [params, ret] = items else {
            return Type::Callable(CallableType::ellipsis(Type::Any));
        };
        let ret = self.read(ret);
        match params {
            Expr::List(list) => Type::Callable(CallableType::positional(
                list.elts.iter().map(|e| self.read(e)).collect(),
                ret,
            )),
            _ => Type::Callable(CallableType::ellipsis(ret)),
        }
    }

    fn first(&self, items: &[&Expr]) -> Type {
        items.first().map_or(Type::Any, |item| self.read(item))
    }
}

fn annotation_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name(name) => Some(name.id.as_str()),
        Expr::Attribute(attr) => Some(attr.attr.as_str()),
        _ => None,
    }
}

fn slice_items(slice: &Expr) -> Vec<&Expr> {
    match slice {
        Expr::Tuple(tuple) => tuple.elts.iter().collect(),
        other => vec![other],
    }
}

fn is_ellipsis(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(c) if matches!(c.value, Constant::Ellipsis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(source: &str, vars: &[&str]) -> Type {
        let vars: HashSet<String> = vars.iter().map(|v| v.to_string()).collect();
        let expr = parse_expression(source).unwrap();
        AnnotationReader::new(&vars).read(&expr)
    }

    #[test]
    fn test_builtins() {
        assert_eq!(read("int", &[]), Type::Int);
        assert_eq!(read("None", &[]), Type::None);
        assert_eq!(read("list[str]", &[]), Type::List(Box::new(Type::Str)));
        assert_eq!(read("dict[str, int]", &[]).to_string(), "dict[str, int]");
        assert_eq!(read("tuple[int, str]", &[]).to_string(), "tuple[int, str]");
    }

    #[test]
    fn test_optional_and_unions() {
        assert_eq!(read("Optional[int]", &[]).to_string(), "int | None");
        assert_eq!(read("int | str", &[]).to_string(), "int | str");
        assert_eq!(read("typing.Union[int, bool]", &[]), Type::Int);
        assert_eq!(read("Optional[_V]", &["_V"]).to_string(), "_V | None");
    }

    #[test]
    fn test_callables() {
        assert_eq!(read("Callable[[int, str], bool]", &[]).to_string(), "def (int, str) -> bool");
        assert_eq!(read("Callable[..., T]", &["T"]).to_string(), "def (*Any, **Any) -> T");
    }

    #[test]
    fn test_generics_and_classes() {
        assert_eq!(read("Result[int, Exception]", &[]).to_string(), "Result[int, Exception]");
        assert_eq!(read("Exception", &[]), Type::Class("Exception".to_string()));
        assert_eq!(read("'Maybe[str]'", &[]).to_string(), "Maybe[str]");
    }

    #[test]
    fn test_unreadable_is_any() {
        assert_eq!(read("1 + 2", &[]), Type::Any);
    }
}
