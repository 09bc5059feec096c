//! Name-to-strategy dispatch table
//!
//! The registry is assembled once from a fixed table and is read-only
//! afterwards. `lookup` runs for every call expression the host analyzes, so
//! a miss is a single hash lookup with no allocation and no logging.

use crate::core::Type;
use crate::errors::TypeError;
use crate::plugin::context::FunctionContext;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{trace, warn};

/// Signature every analyzer exposes as `analyze`.
pub type AnalyzeFn = fn(&FunctionContext) -> Result<Type, TypeError>;

/// A named refinement strategy.
#[derive(Clone, Copy)]
pub struct Strategy {
    name: &'static str,
    analyze: AnalyzeFn,
}

impl Strategy {
    pub const fn new(name: &'static str, analyze: AnalyzeFn) -> Self {
        Self { name, analyze }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the strategy. Errors are the strategy's own diagnostics and are
    /// returned untouched.
    pub fn invoke(&self, ctx: &FunctionContext) -> Result<Type, TypeError> {
        trace!(strategy = self.name, fullname = %ctx.fullname, "invoking strategy");
        (self.analyze)(ctx)
    }
}

impl PartialEq for Strategy {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.analyze as usize == other.analyze as usize
    }
}

impl Eq for Strategy {}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicateName { name: &'static str, first: &'static str, second: &'static str },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateName { name, first, second } => write!(
                f,
                "'{}' is registered to both '{}' and '{}'",
                name, first, second
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Immutable mapping from fully-qualified call target to strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    hooks: HashMap<&'static str, Strategy>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Exact, case-sensitive match on `fullname`. `None` means the host
    /// keeps its own inference.
    #[inline]
    pub fn lookup(&self, fullname: &str) -> Option<Strategy> {
        self.hooks.get(fullname).copied()
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.hooks.contains_key(fullname)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.hooks.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Collects registrations in order. Nothing is validated until `build`.
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    entries: Vec<(&'static str, Strategy)>,
}

impl RegistryBuilder {
    pub fn register(mut self, name: &'static str, strategy: Strategy) -> Self {
        self.entries.push((name, strategy));
        self
    }

    /// Map every name in `names` to the same strategy.
    pub fn register_all<I>(mut self, names: I, strategy: Strategy) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.entries.extend(names.into_iter().map(|name| (name, strategy)));
        self
    }

    /// Names that were registered more than once, in registration order.
    pub fn duplicates(&self) -> Vec<&'static str> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut repeated = Vec::new();
        for (name, _) in &self.entries {
            if !seen.insert(*name) && !repeated.contains(name) {
                repeated.push(*name);
            }
        }
        repeated
    }

    /// Later registrations of a name replace earlier ones.
    pub fn build(self) -> Registry {
        let mut hooks = HashMap::with_capacity(self.entries.len());
        for (name, strategy) in self.entries {
            if let Some(previous) = hooks.insert(name, strategy) {
                warn!(
                    name,
                    replaced = previous.name(),
                    by = strategy.name(),
                    "call target registered twice, keeping the later strategy"
                );
            }
        }
        Registry { hooks }
    }

    /// Like `build`, but any repeated name is an error.
    pub fn build_strict(self) -> Result<Registry, RegistryError> {
        let mut hooks: HashMap<&'static str, Strategy> = HashMap::with_capacity(self.entries.len());
        for (name, strategy) in self.entries {
            if let Some(previous) = hooks.get(name) {
                return Err(RegistryError::DuplicateName {
                    name,
                    first: previous.name(),
                    second: strategy.name(),
                });
            }
            hooks.insert(name, strategy);
        }
        Ok(Registry { hooks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn wrap_in_result(ctx: &FunctionContext) -> Result<Type, TypeError> {
        match ctx.arg_type(0) {
            Some(Type::Int) => Ok(Type::generic(
                "Result",
                vec![Type::Int, Type::Class("Exception".to_string())],
            )),
            _ => Err(ctx.fail(ErrorKind::Custom { message: "expected an int".to_string() })),
        }
    }

    fn keep_default(ctx: &FunctionContext) -> Result<Type, TypeError> {
        Ok(ctx.default_return_type.clone())
    }

    const S1: Strategy = Strategy::new("safe", wrap_in_result);
    const S2: Strategy = Strategy::new("partial", keep_default);

    fn scenario() -> Registry {
        Registry::builder()
            .register("pkg.safe", S1)
            .register("pkg.partial", S2)
            .build()
    }

    #[test]
    fn test_lookup_scenario() {
        let registry = scenario();
        assert_eq!(registry.lookup("pkg.safe"), Some(S1));
        assert_eq!(registry.lookup("pkg.partial"), Some(S2));
        assert_eq!(registry.lookup("pkg.other"), None);
    }

    #[test]
    fn test_invoke_refines_and_propagates() {
        let registry = scenario();
        let strategy = registry.lookup("pkg.safe").unwrap();

        let ok = FunctionContext::positional("pkg.safe", vec![vec![Type::Int]], Type::Any);
        assert_eq!(strategy.invoke(&ok).unwrap().to_string(), "Result[int, Exception]");

        let bad = FunctionContext::positional("pkg.safe", vec![vec![Type::Str]], Type::Any);
        let direct = wrap_in_result(&bad).unwrap_err();
        assert_eq!(strategy.invoke(&bad).unwrap_err(), direct);
    }

    #[test]
    fn test_exact_case_sensitive_matching() {
        let registry = scenario();
        assert_eq!(registry.lookup("PKG.SAFE"), None);
        assert_eq!(registry.lookup("pkg.saf"), None);
        assert_eq!(registry.lookup("safe"), None);
        assert_eq!(registry.lookup("pkg.safe.inner"), None);
        assert_eq!(registry.lookup(""), None);
    }

    #[test]
    fn test_many_to_one() {
        let registry = Registry::builder()
            .register_all(["pkg.a", "pkg.b", "pkg.c"], S1)
            .build();
        assert_eq!(registry.len(), 3);

        let ctx = FunctionContext::positional("pkg.a", vec![vec![Type::Int]], Type::Any);
        let results: Vec<Type> = ["pkg.a", "pkg.b", "pkg.c"]
            .iter()
            .map(|name| registry.lookup(name).unwrap().invoke(&ctx).unwrap())
            .collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_last_write_wins() {
        let builder = Registry::builder()
            .register("pkg.safe", S1)
            .register("pkg.safe", S2);
        assert_eq!(builder.duplicates(), vec!["pkg.safe"]);

        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("pkg.safe"), Some(S2));
    }

    #[test]
    fn test_strict_build_rejects_duplicates() {
        let error = Registry::builder()
            .register("pkg.safe", S1)
            .register_all(["pkg.x", "pkg.safe"], S2)
            .build_strict()
            .unwrap_err();
        assert_eq!(
            error,
            RegistryError::DuplicateName { name: "pkg.safe", first: "safe", second: "partial" }
        );
        assert!(scenario_builder().build_strict().is_ok());
    }

    fn scenario_builder() -> RegistryBuilder {
        Registry::builder()
            .register("pkg.safe", S1)
            .register("pkg.partial", S2)
    }

    #[test]
    fn test_equality_compares_functions() {
        assert_eq!(S1, Strategy::new("safe", wrap_in_result));
        assert_ne!(S1, Strategy::new("safe", keep_default));
        assert_ne!(S1, Strategy::new("partial", wrap_in_result));

        let swapped = Registry::builder()
            .register("pkg.safe", Strategy::new("safe", keep_default))
            .register("pkg.partial", S2)
            .build();
        assert_ne!(swapped, scenario());
    }

    #[test]
    fn test_construction_is_repeatable() {
        assert_eq!(scenario(), scenario());
        assert_eq!(scenario().names(), vec!["pkg.partial", "pkg.safe"]);
    }
}
