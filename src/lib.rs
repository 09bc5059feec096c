//! Static call-site refinement for the `returns` library
//!
//! A small Python type checker whose call expressions can be refined by
//! plugins. The bundled `returns` plugin maps fully-qualified call targets
//! (`returns.curry.partial`, `returns.result.safe`, ...) to strategies that
//! compute a more precise type than the declared signatures give.

pub mod analysis;
pub mod ast;
pub mod core;
pub mod errors;
pub mod frontend;
pub mod infrastructure;
pub mod plugin;

pub use analysis::{check_source, check_source_with, CheckReport, TypeChecker};
pub use core::{ArgKind, CallableType, Param, Type, TypeContext};
pub use errors::{ErrorCollector, ErrorKind, SourceLocation, TypeError};
pub use frontend::{cli_main, parse_module, Config};
pub use infrastructure::{init_dev_logging, init_logging, init_prod_logging, LogConfig, LogFormat, LogOutput};
pub use plugin::{load_plugins, plugin, FunctionContext, Plugin, PluginChain, Registry, ReturnsPlugin, Strategy};

/// Version handed to plugin entrypoints.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
