use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Builds a program guide from the configured provider lineups.
#[derive(Debug, Parser)]
#[command(name = "guidebuilder", version, about)]
pub struct Args {
    /// TOML configuration file (defaults to `guidebuilder.toml` when present).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the assembled guide, overriding the configured path.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Keep cache entries that were not used during this run.
    #[arg(long)]
    pub no_cache_prune: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable, colored output
    Pretty,
    /// One JSON object per event
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}
