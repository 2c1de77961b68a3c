use std::path::PathBuf;

use clap::Parser;

use crate::config::LogFormat;

/// Batch threat analysis over web-server access logs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Access log to analyze (overrides the config file)
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,

    /// Log format: nginx, apache or json (overrides the config file)
    #[arg(short, long)]
    pub format: Option<LogFormat>,

    /// Directory for generated reports (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
