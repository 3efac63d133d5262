//! journal-report - HTML reports for test-run journals
//!
//! Invoked by the test runner after a run finishes, and usable by hand to
//! re-render older journals.
//!
//! ## Usage
//!
//! ```bash
//! # Render one journal, leaving the directory index alone
//! journal-report --noindex /tmp/x/run1.journal
//!
//! # Render several and refresh index.html in their directories
//! journal-report runs/*.journal
//! ```

use anyhow::Result;
use clap::Parser;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

use journal_runner::cli::ReportArgs;
use journal_runner::results::{write_html_report, write_index};
use journal_runner::utils::{init_logger, LogLevel};

fn main() -> Result<()> {
    let args = ReportArgs::parse();

    init_logger(if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    });

    let mut dirs = BTreeSet::new();
    for journal in &args.journals {
        let html = write_html_report(journal)?;
        println!("Wrote {}", html.display());

        let dir = journal
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        dirs.insert(dir.to_path_buf());
    }

    if !args.noindex {
        for dir in dirs {
            let index = write_index(&dir)?;
            debug!("Updated {}", index.display());
        }
    }

    Ok(())
}
