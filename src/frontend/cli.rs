use crate::analysis::checker::{check_source_with, CheckReport};
use crate::errors::TypeError;
use crate::frontend::config::{Config, ErrorFormat, CONFIG_FILE_NAMES};
use crate::infrastructure::{init_dev_logging, init_logging, LogConfig, LogFormat};
use crate::plugin::{load_plugins, PluginChain};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};

/// Command-line options. `None` fields fall back to the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub paths: Vec<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub plugins: Option<Vec<String>>,
    pub max_errors: Option<usize>,
    pub color: Option<bool>,
    pub format: Option<ErrorFormat>,
    pub show_revealed_types: Option<bool>,
    pub parallel: bool,
    pub verbose: bool,
    /// Write a default configuration file instead of checking.
    pub init: bool,
    /// Print usage and exit.
    pub help: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            config_path: None,
            plugins: None,
            max_errors: None,
            color: None,
            format: None,
            show_revealed_types: None,
            parallel: true,
            verbose: false,
            init: false,
            help: false,
        }
    }
}

impl CliConfig {
    /// Overlay the command-line options on `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(plugins) = &self.plugins {
            config.plugins = plugins.clone();
        }
        if let Some(max_errors) = self.max_errors {
            config.errors.max_errors = max_errors;
        }
        if let Some(color) = self.color {
            config.errors.color = color;
        }
        if let Some(format) = self.format {
            config.errors.format = format;
        }
        if let Some(show) = self.show_revealed_types {
            config.check.show_revealed_types = show;
        }
    }
}

pub struct Cli {
    config: CliConfig,
}

impl Cli {
    pub fn new(config: CliConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<i32, String> {
        if self.config.init {
            return self.write_default_config();
        }
        if self.config.paths.is_empty() {
            return Err("No paths specified".to_string());
        }

        let config = self.resolve_config()?;
        let plugins = load_plugins(&config.plugins, crate::VERSION)?;
        let files = self.collect_files(&config)?;
        info!(files = files.len(), plugins = ?plugins.names(), "Checking");

        let results = self.check_files(&files, &config, &plugins);

        let mut reports = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(message) => failures.push(message),
            }
        }

        self.print_reports(&reports, &config);
        for failure in &failures {
            self.print_error(failure, config.errors.color);
        }

        let error_count: usize =
            reports.iter().map(CheckReport::error_count).sum::<usize>() + failures.len();
        if config.errors.format != ErrorFormat::Json {
            self.print_summary(files.len(), error_count, config.errors.color);
        }

        Ok(if error_count == 0 { 0 } else { 1 })
    }

    /// The configuration file named on the command line, or the nearest
    /// one found from the current directory, with command-line overrides.
    pub fn resolve_config(&self) -> Result<Config, String> {
        let mut config = match &self.config.config_path {
            Some(path) => Config::load(path)?,
            None => Config::discover(),
        };
        self.config.apply(&mut config);
        Ok(config)
    }

    /// Files named directly are always checked; files found in directories
    /// are filtered by the configured patterns.
    pub fn collect_files(&self, config: &Config) -> Result<Vec<PathBuf>, String> {
        let mut files = Vec::new();

        for path in &self.config.paths {
            if path.is_file() {
                files.push(path.clone());
            } else if path.is_dir() {
                files.extend(self.files_in(path, config)?);
            } else {
                return Err(format!("Path not found: {}", path.display()));
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }

    fn files_in(&self, dir: &Path, config: &Config) -> Result<Vec<PathBuf>, String> {
        let pattern = format!("{}/**/*.py", dir.display());
        let mut files = Vec::new();

        for entry in glob::glob(&pattern).map_err(|e| format!("Glob pattern error: {}", e))? {
            match entry {
                Ok(path) if path.is_file() && config.should_check(&path) => files.push(path),
                Ok(path) => debug!(path = %path.display(), "Skipping"),
                Err(e) => warn!(error = %e, "Error accessing path"),
            }
        }
        Ok(files)
    }

    pub fn check_files(
        &self,
        files: &[PathBuf],
        config: &Config,
        plugins: &PluginChain,
    ) -> Vec<Result<CheckReport, String>> {
        if self.config.parallel {
            files.par_iter().map(|path| check_file(path, config, plugins)).collect()
        } else {
            files.iter().map(|path| check_file(path, config, plugins)).collect()
        }
    }

    fn write_default_config(&self) -> Result<i32, String> {
        let path = self
            .config
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAMES[0]));
        if path.exists() {
            return Err(format!("{} already exists", path.display()));
        }
        fs::write(&path, Config::generate_default())
            .map_err(|e| format!("Failed to write config: {}", e))?;
        println!("Wrote {}", path.display());
        Ok(0)
    }

    fn print_reports(&self, reports: &[CheckReport], config: &Config) {
        match config.errors.format {
            ErrorFormat::Json => match serde_json::to_string_pretty(reports) {
                Ok(json) => println!("{}", json),
                Err(e) => self.print_error(&format!("Failed to serialize diagnostics: {}", e), false),
            },
            ErrorFormat::Default | ErrorFormat::Compact => {
                for diagnostic in reports.iter().flat_map(|r| &r.diagnostics) {
                    let line = render(diagnostic, config.errors.format);
                    if diagnostic.is_error() {
                        self.print_error(&line, config.errors.color);
                    } else {
                        self.print_note(&line, config.errors.color);
                    }
                }
            }
        }
    }

    fn print_summary(&self, file_count: usize, error_count: usize, color: bool) {
        if error_count == 0 {
            self.print_success(
                &format!("Checked {} file{}, no errors found", file_count, plural(file_count)),
                color,
            );
        } else {
            eprintln!();
            self.print_error(
                &format!(
                    "Found {} error{} in {} file{}",
                    error_count,
                    plural(error_count),
                    file_count,
                    plural(file_count)
                ),
                color,
            );
        }
    }

    fn print_error(&self, msg: &str, color: bool) {
        if color {
            eprintln!("\x1b[31m{}\x1b[0m", msg);
        } else {
            eprintln!("{}", msg);
        }
    }

    fn print_note(&self, msg: &str, color: bool) {
        if color {
            println!("\x1b[36m{}\x1b[0m", msg);
        } else {
            println!("{}", msg);
        }
    }

    fn print_success(&self, msg: &str, color: bool) {
        if color {
            println!("\x1b[32m{}\x1b[0m", msg);
        } else {
            println!("{}", msg);
        }
    }
}

fn check_file(path: &Path, config: &Config, plugins: &PluginChain) -> Result<CheckReport, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let file = path.display().to_string();
    check_source_with(&file, &source, config, plugins)
        .map_err(|e| format!("{}: {}", file, e))
}

/// One diagnostic as printed in the default and compact formats.
pub fn render(diagnostic: &TypeError, format: ErrorFormat) -> String {
    match format {
        ErrorFormat::Compact => format!(
            "{}:{}:{}: {}: {}",
            diagnostic.file,
            diagnostic.location.line,
            diagnostic.location.col,
            diagnostic.severity,
            diagnostic.kind
        ),
        _ => diagnostic.to_string(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

pub fn usage(prog: &str) -> String {
    format!(
        "Type checker with call-site plugins for the returns library\n\n\
        USAGE:\n    {} [OPTIONS] <path>...\n\n\
        OPTIONS:\n    \
        -h, --help            Print help information\n    \
        -v, --verbose         Debug logging\n    \
        --config <FILE>       Configuration file (default: nearest .typyrc)\n    \
        --plugin <NAME>       Load a plugin; may be repeated\n    \
        --no-plugins          Check without plugins\n    \
        --max-errors <N>      Maximum errors to report per file\n    \
        --format <FORMAT>     default, compact or json\n    \
        --no-color            Disable colored output\n    \
        --no-reveal           Hide reveal_type notes\n    \
        --no-parallel         Check files one at a time\n    \
        --init                Write a default configuration file",
        prog
    )
}

/// Parse arguments, not including the program name.
pub fn parse_args_from(args: &[String]) -> Result<CliConfig, String> {
    let mut config = CliConfig::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |option: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} requires an argument", option))
        };

        match arg.as_str() {
            "--help" | "-h" => {
                config.help = true;
                return Ok(config);
            }
            "--verbose" | "-v" => config.verbose = true,
            "--no-color" => config.color = Some(false),
            "--no-parallel" => config.parallel = false,
            "--no-reveal" => config.show_revealed_types = Some(false),
            "--no-plugins" => config.plugins = Some(Vec::new()),
            "--init" => config.init = true,
            "--config" => config.config_path = Some(PathBuf::from(value("--config")?)),
            "--plugin" => {
                let name = value("--plugin")?;
                config.plugins.get_or_insert_with(Vec::new).push(name);
            }
            "--max-errors" => {
                config.max_errors = Some(
                    value("--max-errors")?
                        .parse()
                        .map_err(|_| "Invalid value for --max-errors".to_string())?,
                );
            }
            "--format" => config.format = Some(value("--format")?.parse()?),
            option if option.starts_with('-') => {
                return Err(format!("Unknown option: {}", option));
            }
            path => config.paths.push(PathBuf::from(path)),
        }
    }

    if config.paths.is_empty() && !config.init {
        return Err("No paths specified".to_string());
    }

    Ok(config)
}

pub fn parse_args() -> Result<CliConfig, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&args)
}

/// Entry point for the binary. Returns the process exit status.
pub fn cli_main() -> Result<i32, String> {
    let config = parse_args()?;
    if config.help {
        println!("{}", usage("typthon-returns"));
        return Ok(0);
    }

    let _guard = if config.verbose {
        init_dev_logging()
    } else {
        init_logging(LogConfig::new().with_level(Level::WARN).with_format(LogFormat::Compact))
    };
    debug!(?config, "Arguments parsed");

    // The log guard drops on return, before the binary exits.
    Cli::new(config).run()
}
