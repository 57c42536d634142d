// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `treemirror`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "treemirror",
    version,
    about = "Mirror a directory tree through a per-file transform, once or continuously.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Treemirror.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Treemirror.toml")]
    pub config: String,

    /// Watch the input tree for changes instead of crawling it once.
    #[arg(long)]
    pub watch: bool,

    /// With `--watch`: crawl the existing tree first, then start watching.
    #[arg(long, requires = "watch")]
    pub crawl_first: bool,

    /// Stop the run after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TREEMIRROR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the config and list the files a crawl would process, without
    /// running any transform.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
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
