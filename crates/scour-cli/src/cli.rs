use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (cascade expansion, compilation)
    Debug,
    /// Trace-level messages (skipped parameters)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Output format for `scour config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Json,
}

#[derive(Parser)]
#[command(name = "scour")]
#[command(about = "scour - compile HTTP search query strings into search engine query documents")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace); logs go to stderr
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (TOML)
    #[arg(short = 'C', long, global = true, env = "SCOUR_CONFIG")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Effective log level: explicit flag, then `-v`, then off
    pub fn level_filter(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => LevelFilter::DEBUG,
            (None, false) => LevelFilter::OFF,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a query string (e.g. "query=golang&filter=-status:draft") into a document
    Compile {
        /// Raw HTTP query string, with or without the leading '?'
        query: String,

        /// JSON file holding a raw query clause (or a document with a "query" key)
        /// to combine with the compiled query
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// Pretty-print the document
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the effective configuration
    Config {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}
