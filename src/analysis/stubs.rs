//! Bundled declarations for the `returns` library
//!
//! Stubs are ordinary `.pyi` sources checked by [`TypeChecker`]. Each stub's
//! top-level definitions become `module.name` entries of a [`ModuleIndex`];
//! its imports become aliases, so `returns.pipeline.flow` resolves to
//! `returns._generated.pipeline.flow._flow`.

use crate::analysis::checker::TypeChecker;
use crate::core::Type;
use crate::frontend::parse_module_at;
use crate::plugin::PluginChain;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

pub const BUNDLED_STUBS: &[(&str, &str)] = &[
    ("builtins", include_str!("stubs/builtins.pyi")),
    ("returns.result", include_str!("stubs/returns/result.pyi")),
    ("returns.io", include_str!("stubs/returns/io.pyi")),
    ("returns.maybe", include_str!("stubs/returns/maybe.pyi")),
    ("returns.future", include_str!("stubs/returns/future.pyi")),
    ("returns.functions", include_str!("stubs/returns/functions.pyi")),
    ("returns.curry", include_str!("stubs/returns/curry.pyi")),
    ("returns._generated.pipeline.flow", include_str!("stubs/returns/_generated/pipeline/flow.pyi")),
    ("returns.pipeline", include_str!("stubs/returns/pipeline.pyi")),
    ("returns._generated.pointfree.map", include_str!("stubs/returns/_generated/pointfree/map.pyi")),
    ("returns.pointfree", include_str!("stubs/returns/pointfree.pyi")),
];

/// Re-export chains longer than this are treated as unresolved.
const MAX_ALIAS_DEPTH: usize = 16;

/// What one checked module makes visible to importers.
#[derive(Debug, Clone, Default)]
pub struct ModuleExports {
    pub definitions: Vec<(String, Type)>,
    /// Local name to the fully-qualified name it was imported from.
    pub aliases: Vec<(String, String)>,
}

/// Fully-qualified names of every stub definition.
#[derive(Debug, Clone, Default)]
pub struct ModuleIndex {
    definitions: HashMap<String, Type>,
    aliases: HashMap<String, String>,
    modules: HashSet<String>,
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: &str, exports: ModuleExports) {
        for (name, ty) in exports.definitions {
            self.definitions.insert(format!("{}.{}", module, name), ty);
        }
        for (name, target) in exports.aliases {
            self.aliases.insert(format!("{}.{}", module, name), target);
        }
        self.modules.insert(module.to_string());
    }

    /// Follow re-exports to the defining module.
    pub fn canonical(&self, fullname: &str) -> String {
        let mut current = fullname;
        for _ in 0..MAX_ALIAS_DEPTH {
            match self.aliases.get(current) {
                Some(target) => current = target.as_str(),
                None => break,
            }
        }
        current.to_string()
    }

    pub fn lookup(&self, fullname: &str) -> Option<&Type> {
        self.definitions.get(&self.canonical(fullname))
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.lookup(fullname).is_some()
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Check `stubs` in order and index their exports. Stubs never trigger
/// plugin hooks.
#[instrument(skip(stubs), fields(count = stubs.len()))]
pub fn load_stubs(stubs: &[(&str, &str)]) -> ModuleIndex {
    let mut index = ModuleIndex::new();
    let no_plugins = PluginChain::new();

    for (module, source) in stubs {
        let ast = match parse_module_at(source, module) {
            Ok(ast) => ast,
            Err(e) => {
                warn!(module, error = %e, "Skipping unparsable stub");
                continue;
            }
        };

        let exports = {
            let mut checker = TypeChecker::new(*module, &no_plugins, &index)
                .with_file(format!("<stub {}>", module));
            let diagnostics = checker.check(&ast, source);
            if !diagnostics.is_empty() {
                warn!(module, count = diagnostics.len(), "Stub produced diagnostics");
            }
            checker.exports()
        };
        index.add_module(module, exports);
    }

    debug!(definitions = index.len(), "Stubs loaded");
    index
}

static BUNDLED: Lazy<ModuleIndex> = Lazy::new(|| load_stubs(BUNDLED_STUBS));

/// Index of the bundled stubs, loaded on first use.
pub fn bundled() -> &'static ModuleIndex {
    Lazy::force(&BUNDLED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_declarations() {
        let index = bundled();
        assert!(index.has_module("returns.result"));
        assert_eq!(
            index.lookup("returns.result.safe").map(|t| t.to_string()).as_deref(),
            Some("def (function: def (*Any, **Any) -> _ValueType) -> def (*Any, **Any) -> Result[_ValueType, Exception]")
        );
        assert_eq!(
            index.lookup("returns.curry.partial").map(|t| t.to_string()).as_deref(),
            Some("def (func: def (*Any, **Any) -> _ReturnType, *args: Any, **kwargs: Any) -> def (*Any, **Any) -> _ReturnType")
        );
        assert_eq!(
            index.lookup("returns.maybe.Nothing").map(|t| t.to_string()).as_deref(),
            Some("Maybe[Never]")
        );
    }

    #[test]
    fn test_reexports_resolve_to_definitions() {
        let index = bundled();
        assert_eq!(index.canonical("returns.pipeline.flow"), "returns._generated.pipeline.flow._flow");
        assert_eq!(index.canonical("returns.pointfree.map_"), "returns._generated.pointfree.map._map");
        assert!(index.contains("returns.pointfree.map_"));
        assert_eq!(index.canonical("returns.result.nothing_here"), "returns.result.nothing_here");
    }

    #[test]
    fn test_type_var_declarations_are_not_exported() {
        assert!(!bundled().contains("returns.result._ValueType"));
    }

    #[test]
    fn test_alias_cycles_terminate() {
        let mut index = ModuleIndex::new();
        index.add_module(
            "a",
            ModuleExports { definitions: vec![], aliases: vec![("x".into(), "b.x".into())] },
        );
        index.add_module(
            "b",
            ModuleExports { definitions: vec![], aliases: vec![("x".into(), "a.x".into())] },
        );
        assert!(index.lookup("a.x").is_none());
    }
}
