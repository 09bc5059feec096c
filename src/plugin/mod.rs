//! Call-site refinement plugins
//!
//! The checker asks each loaded plugin for a hook on every call expression
//! it analyzes, keyed by the fully-qualified name of the callee. A plugin is
//! a read-only [`Registry`] behind the [`Plugin`] trait; the hook it returns
//! is a [`Strategy`] the checker runs with a [`FunctionContext`].

pub mod context;
pub mod features;
pub mod registry;
pub mod returns;

pub use context::FunctionContext;
pub use registry::{AnalyzeFn, Registry, RegistryBuilder, RegistryError, Strategy};
pub use returns::{plugin, ReturnsPlugin};

use crate::errors::find_similar_names;
use tracing::{debug, info};

/// Extension point implemented by every plugin the checker can load.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Strategy overriding the inferred type of a call to `fullname`, if any.
    fn get_function_hook(&self, fullname: &str) -> Option<Strategy>;
}

/// Entrypoint a plugin exposes: receives the checker version.
pub type PluginEntrypoint = fn(&str) -> Box<dyn Plugin>;

fn returns_entrypoint(version: &str) -> Box<dyn Plugin> {
    Box::new(plugin(version))
}

/// Plugins known to this build, by configuration name.
const BUILTIN_PLUGINS: &[(&str, PluginEntrypoint)] = &[("returns", returns_entrypoint)];

pub fn builtin_plugin_names() -> Vec<String> {
    BUILTIN_PLUGINS.iter().map(|(name, _)| name.to_string()).collect()
}

/// Plugins in configuration order. The first plugin with a hook wins.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn get_function_hook(&self, fullname: &str) -> Option<Strategy> {
        self.plugins.iter().find_map(|p| p.get_function_hook(fullname))
    }
}

impl std::fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginChain").field("plugins", &self.names()).finish()
    }
}

/// Resolve configured plugin names into a chain.
pub fn load_plugins(names: &[String], version: &str) -> Result<PluginChain, String> {
    let mut chain = PluginChain::new();

    for name in names {
        let entry = BUILTIN_PLUGINS.iter().find(|(known, _)| known == name);
        match entry {
            Some((_, entrypoint)) => {
                debug!(plugin = %name, version, "loading plugin");
                chain = chain.with_plugin(entrypoint(version));
            }
            None => {
                let similar = find_similar_names(name, &builtin_plugin_names(), 3);
                let mut message = format!("Unknown plugin: {}", name);
                if let Some(best) = similar.first() {
                    message.push_str(&format!(" (did you mean '{}'?)", best));
                }
                return Err(message);
            }
        }
    }

    info!(plugins = ?chain.names(), "plugins loaded");
    Ok(chain)
}
