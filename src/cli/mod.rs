//! CLI argument parsing for the report generator
//!
//! Defines command-line interface using clap.

use clap::Parser;
use std::path::PathBuf;

/// Render test-run journals as HTML reports
#[derive(Parser, Debug)]
#[command(name = "journal-report")]
#[command(author = "hephaex@gmail.com")]
#[command(version)]
#[command(about = "Render test-run journals as HTML reports")]
#[command(long_about = None)]
pub struct ReportArgs {
    /// Journal files to render; each report is written next to its journal
    #[arg(required = true)]
    pub journals: Vec<PathBuf>,

    /// Do not rewrite index.html in the report directories
    #[arg(long)]
    pub noindex: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
