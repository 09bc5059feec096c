//! Plugin for the `returns` library
//!
//! Call targets are matched by their defining module, not by the public
//! re-export: `returns.pipeline.flow` is defined as
//! `returns._generated.pipeline.flow._flow`, and the checker resolves the
//! import before asking for a hook.

use crate::plugin::features::{curry, decorators, flow, partial, pointfree};
use crate::plugin::registry::{Registry, RegistryBuilder, Strategy};
use crate::plugin::Plugin;
use once_cell::sync::Lazy;
use tracing::debug;

/// Decorators whose result keeps the decorated function's signature.
pub const TYPED_DECORATORS: &[&str] = &[
    "returns.result.safe",
    "returns.io.impure",
    "returns.io.impure_safe",
    "returns.maybe.maybe",
    "returns.future.future",
    "returns.future.asyncify",
    "returns.future.future_safe",
    "returns.functions.not_",
];

pub const TYPED_POINTFREE_FUNCTIONS: &[&str] = &["returns._generated.pointfree.map._map"];

pub const TYPED_PARTIAL_FUNCTION: &str = "returns.curry.partial";

pub const TYPED_CURRY_FUNCTION: &str = "returns.curry.curry";

pub const TYPED_FLOW_FUNCTION: &str = "returns._generated.pipeline.flow._flow";

pub const PARTIAL: Strategy = Strategy::new("partial", partial::analyze);
pub const CURRY: Strategy = Strategy::new("curry", curry::analyze);
pub const FLOW: Strategy = Strategy::new("flow", flow::analyze);
pub const POINTFREE: Strategy = Strategy::new("pointfree", pointfree::analyze);
pub const DECORATORS: Strategy = Strategy::new("decorators", decorators::analyze);

/// The registration table, in registration order.
pub fn returns_table() -> RegistryBuilder {
    Registry::builder()
        .register(TYPED_PARTIAL_FUNCTION, PARTIAL)
        .register(TYPED_CURRY_FUNCTION, CURRY)
        .register(TYPED_FLOW_FUNCTION, FLOW)
        .register_all(TYPED_POINTFREE_FUNCTIONS.iter().copied(), POINTFREE)
        .register_all(TYPED_DECORATORS.iter().copied(), DECORATORS)
}

/// Build the registry. Every call gives an equal registry.
pub fn returns_registry() -> Registry {
    returns_table().build()
}

static REGISTRY: Lazy<Registry> = Lazy::new(returns_registry);

/// Dispatcher for `returns` call sites. Cheap to copy; all instances share
/// the process-wide registry.
#[derive(Debug, Clone, Copy)]
pub struct ReturnsPlugin {
    registry: &'static Registry,
}

impl ReturnsPlugin {
    pub fn new() -> Self {
        Self { registry: Lazy::force(&REGISTRY) }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    /// Strategy for `fullname`, or `None` to keep the checker's inference.
    pub fn lookup(&self, fullname: &str) -> Option<Strategy> {
        self.registry.lookup(fullname)
    }
}

impl Default for ReturnsPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ReturnsPlugin {
    fn name(&self) -> &str {
        "returns"
    }

    fn get_function_hook(&self, fullname: &str) -> Option<Strategy> {
        self.lookup(fullname)
    }
}

/// Plugin entrypoint. Every checker version gets the same dispatcher.
pub fn plugin(version: &str) -> ReturnsPlugin {
    debug!(version, "returns plugin requested");
    ReturnsPlugin::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_no_duplicates() {
        assert!(returns_table().duplicates().is_empty());
        assert_eq!(returns_table().build_strict(), Ok(returns_registry()));
    }

    #[test]
    fn test_every_name_is_registered() {
        let plugin = plugin("1.0.0");
        for name in TYPED_DECORATORS {
            assert_eq!(plugin.lookup(name), Some(DECORATORS), "{}", name);
        }
        for name in TYPED_POINTFREE_FUNCTIONS {
            assert_eq!(plugin.lookup(name), Some(POINTFREE), "{}", name);
        }
        assert_eq!(plugin.lookup(TYPED_PARTIAL_FUNCTION), Some(PARTIAL));
        assert_eq!(plugin.lookup(TYPED_CURRY_FUNCTION), Some(CURRY));
        assert_eq!(plugin.lookup(TYPED_FLOW_FUNCTION), Some(FLOW));
        assert_eq!(plugin.registry().len(), TYPED_DECORATORS.len() + TYPED_POINTFREE_FUNCTIONS.len() + 3);
    }

    #[test]
    fn test_public_reexports_are_not_keys() {
        let plugin = ReturnsPlugin::new();
        assert!(plugin.lookup("returns.pipeline.flow").is_none());
        assert!(plugin.lookup("returns.pointfree.map_").is_none());
        assert!(plugin.lookup("returns.result.Success").is_none());
    }

    #[test]
    fn test_version_does_not_change_behavior() {
        let a = plugin("0.1.0");
        let b = plugin("99.0-dev");
        assert_eq!(a.registry(), b.registry());
        assert_eq!(returns_registry(), *a.registry());
    }
}
