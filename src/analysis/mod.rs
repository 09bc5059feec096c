//! Type analysis and checking
//!
//! The checker, the readers it relies on for annotations and call
//! arguments, and the bundled `returns` declarations it resolves imports
//! against.

pub mod annotations;
pub mod arguments;
pub mod checker;
pub mod stubs;

pub use annotations::AnnotationReader;
pub use arguments::{map_actuals, Actual, ArgumentError};
pub use checker::{check_source, check_source_with, CheckReport, TypeChecker, MAIN_MODULE};
pub use stubs::{bundled, load_stubs, ModuleExports, ModuleIndex};
