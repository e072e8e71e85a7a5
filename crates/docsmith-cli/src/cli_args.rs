//! CLI argument parsing for docsmith.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Clone, Debug)]
#[command(name = "docsmith")]
#[command(about = "Turn API documentation into an integration configuration")]
#[command(version)]
pub struct Cli {
    /// URL of the API documentation to read
    pub url: String,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Maximum number of completion requests before giving up
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<u32>,

    /// Write the configuration here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Show the Chrome window
    #[arg(long)]
    pub no_headless: bool,

    /// Report tool failures to the model instead of aborting the run
    #[arg(long)]
    pub soft_tool_failures: bool,

    /// Override the configured model
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,
}
