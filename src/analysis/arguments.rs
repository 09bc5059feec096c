//! Mapping call-site arguments onto the callee's formal parameters

use crate::core::{ArgKind, Param, Type};
use crate::errors::{ErrorKind, SourceLocation, TypeError};
use std::fmt;

/// One argument expression at a call site.
#[derive(Debug, Clone, PartialEq)]
pub struct Actual {
    /// `Positional`, `Star` (`*xs`), `Named` (`k=v`) or `StarStar` (`**kw`)
    pub kind: ArgKind,
    pub name: Option<String>,
    pub ty: Type,
}

impl Actual {
    pub fn positional(ty: Type) -> Self {
        Self { kind: ArgKind::Positional, name: None, ty }
    }

    pub fn star(ty: Type) -> Self {
        Self { kind: ArgKind::Star, name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self { kind: ArgKind::Named, name: Some(name.into()), ty }
    }

    pub fn star_star(ty: Type) -> Self {
        Self { kind: ArgKind::StarStar, name: None, ty }
    }

    /// Type each value contributes: the element type for `*xs`, the value
    /// type for `**kw`.
    pub fn value_type(&self) -> Type {
        match (self.kind, &self.ty) {
            (ArgKind::Star, Type::List(elem)) => (**elem).clone(),
            (ArgKind::Star, Type::Tuple(items)) => Type::union(items.clone()),
            (ArgKind::Star, Type::Generic(_, args)) if args.len() == 1 => args[0].clone(),
            (ArgKind::StarStar, Type::Dict(_, value)) => (**value).clone(),
            (ArgKind::Star | ArgKind::StarStar, _) => Type::Any,
            (_, ty) => ty.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    TooMany,
    TooFew,
    UnexpectedKeyword(String),
    MultipleValues(String),
}

impl ArgumentError {
    pub fn into_type_error(self, callee: &str, formals: &[Param], location: SourceLocation) -> TypeError {
        let callee_owned = callee.to_string();
        match self {
            ArgumentError::TooMany => {
                TypeError::new(ErrorKind::TooManyArguments { callee: callee_owned }, location)
            }
            ArgumentError::TooFew => {
                TypeError::new(ErrorKind::TooFewArguments { callee: callee_owned }, location)
            }
            ArgumentError::UnexpectedKeyword(name) => {
                let candidates: Vec<String> = formals
                    .iter()
                    .filter(|p| !p.kind.is_variadic())
                    .filter_map(|p| p.name.clone())
                    .collect();
                TypeError::unexpected_keyword(callee, &name, location, &candidates)
            }
            ArgumentError::MultipleValues(name) => TypeError::new(
                ErrorKind::Custom {
                    message: format!(
                        "\"{}\" gets multiple values for keyword argument \"{}\"",
                        callee, name
                    ),
                },
                location,
            ),
        }
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::TooMany => write!(f, "too many arguments"),
            ArgumentError::TooFew => write!(f, "too few arguments"),
            ArgumentError::UnexpectedKeyword(name) => write!(f, "unexpected keyword \"{}\"", name),
            ArgumentError::MultipleValues(name) => write!(f, "multiple values for \"{}\"", name),
        }
    }
}

/// For each formal, the indices of the actuals it receives.
pub fn map_actuals(actuals: &[Actual], formals: &[Param]) -> Result<Vec<Vec<usize>>, ArgumentError> {
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); formals.len()];

    let positional: Vec<usize> = formals
        .iter()
        .enumerate()
        .filter(|(_, p)| p.kind.is_positional())
        .map(|(i, _)| i)
        .collect();
    let star = formals.iter().position(|p| p.kind == ArgKind::Star);
    let star_star = formals.iter().position(|p| p.kind == ArgKind::StarStar);
    let mut cursor = 0;

    for (i, actual) in actuals.iter().enumerate() {
        match actual.kind {
            ArgKind::Star => {
                // Unknown length: may fill every remaining positional formal.
                for &formal in &positional[cursor..] {
                    groups[formal].push(i);
                }
                cursor = positional.len();
                if let Some(formal) = star {
                    groups[formal].push(i);
                }
            }
            ArgKind::StarStar => {
                for (formal, param) in formals.iter().enumerate() {
                    if !param.kind.is_variadic() && param.name.is_some() && groups[formal].is_empty() {
                        groups[formal].push(i);
                    }
                }
                if let Some(formal) = star_star {
                    groups[formal].push(i);
                }
            }
            ArgKind::Named | ArgKind::NamedOptional => {
                let name = actual.name.clone().unwrap_or_default();
                let by_name = formals
                    .iter()
                    .position(|p| !p.kind.is_variadic() && p.name.as_deref() == Some(name.as_str()));
                match by_name {
                    Some(formal) => {
                        let explicit = groups[formal].iter().any(|&j| !actuals[j].kind.is_variadic());
                        if explicit {
                            return Err(ArgumentError::MultipleValues(name));
                        }
                        groups[formal].push(i);
                    }
                    None => match star_star {
                        Some(formal) => groups[formal].push(i),
                        None => return Err(ArgumentError::UnexpectedKeyword(name)),
                    },
                }
            }
            ArgKind::Positional | ArgKind::Optional => {
                if let Some(&formal) = positional.get(cursor) {
                    groups[formal].push(i);
                    cursor += 1;
                } else if let Some(formal) = star {
                    groups[formal].push(i);
                } else {
                    return Err(ArgumentError::TooMany);
                }
            }
        }
    }

    let missing = formals
        .iter()
        .zip(&groups)
        .any(|(param, group)| param.kind.is_required() && group.is_empty());
    if missing {
        return Err(ArgumentError::TooFew);
    }

    Ok(groups)
}
