pub mod cli;
pub mod config;
pub mod parser;

pub use cli::{cli_main, Cli, CliConfig};
pub use config::{Config, ErrorFormat};
pub use parser::{parse_expression, parse_module, parse_module_at};
