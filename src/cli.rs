// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::engine::DEFAULT_MAX_PARALLELISM;

/// Command-line arguments for `task-core`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "task-core",
    version,
    about = "Deploy services to hosts by running their tasks as a dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory holding one TOML file per service definition.
    #[arg(short = 's', long = "services-dir", value_name = "DIR")]
    pub services_dir: PathBuf,

    /// Inventory file mapping hosts to roles.
    #[arg(short = 'i', long = "inventory-file", alias = "inventory", value_name = "FILE")]
    pub inventory: PathBuf,

    /// Roles file mapping roles to services.
    #[arg(short = 'r', long = "roles-file", alias = "roles", value_name = "FILE")]
    pub roles: PathBuf,

    /// Shorthand for `--log-level debug`.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Build the graph and write it to `--graph-output`, but run nothing.
    #[arg(long)]
    pub noop: bool,

    /// Maximum number of tasks running at once.
    #[arg(
        short = 'p',
        long = "max-parallelism",
        value_name = "N",
        default_value_t = DEFAULT_MAX_PARALLELISM
    )]
    pub max_parallelism: usize,

    /// Where `--noop` writes the graph; the extension picks the format
    /// (`json`, `dot`, or anything Graphviz understands).
    #[arg(long, value_name = "PATH", default_value = "noop.svg")]
    pub graph_output: PathBuf,

    /// Write the run result as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Takes precedence over `--debug` and `TASK_CORE_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Arguments for `task-core-example`, which runs the bundled demo deployment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "task-core-example",
    version,
    about = "Run the bundled framework deployment with debug logging and print the result.",
    long_about = None
)]
pub struct ExampleArgs {
    /// Deployment directory holding `services/`, `inventory.toml` and `roles.toml`.
    #[arg(
        value_name = "DIR",
        default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/framework")
    )]
    pub framework_dir: PathBuf,

    /// Maximum number of tasks running at once.
    #[arg(
        short = 'p',
        long = "max-parallelism",
        value_name = "N",
        default_value_t = DEFAULT_MAX_PARALLELISM
    )]
    pub max_parallelism: usize,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
