//! HTML rendering of journals

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::journal::{read_journal, JournalRecord, RecordKind};

/// `<journal without extension>.html`
pub fn html_path_for(journal: &Path) -> PathBuf {
    journal.with_extension("html")
}

/// Render the records of one journal as a standalone page
pub fn render_journal_html(title: &str, records: &[JournalRecord]) -> String {
    let snapshots = records
        .iter()
        .filter(|r| r.kind == RecordKind::Snapshot)
        .count();
    let messages = records.len() - snapshots;

    let mut output = String::new();

    writeln!(output, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Journal - {}</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 40px; background: #f5f5f5; }}
        .container {{ max-width: 1200px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}
        table {{ width: 100%; border-collapse: collapse; margin: 20px 0; }}
        th, td {{ padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; vertical-align: top; }}
        th {{ background: #007bff; color: white; }}
        tr.message td {{ color: #666; }}
        tr.ERROR td, tr.WARN td {{ color: #dc3545; }}
        pre {{ margin: 0; white-space: pre-wrap; }}
        .stat-card {{ display: inline-block; background: #f8f9fa; padding: 20px; margin: 10px; border-radius: 8px; min-width: 150px; text-align: center; }}
        .stat-value {{ font-size: 24px; font-weight: bold; color: #007bff; }}
        .stat-label {{ color: #666; font-size: 14px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{}</h1>
        <div class="stat-card">
            <div class="stat-value">{}</div>
            <div class="stat-label">Snapshots</div>
        </div>
        <div class="stat-card">
            <div class="stat-value">{}</div>
            <div class="stat-label">Log Messages</div>
        </div>
        <table>
            <tr><th>#</th><th>Time</th><th>Kind</th><th>Title</th><th>Data</th></tr>"#,
        escape_html(title), escape_html(title), snapshots, messages).unwrap();

    for record in records {
        let (row_class, body) = match record.kind {
            RecordKind::Snapshot => (
                "snapshot".to_string(),
                serde_json::to_string_pretty(&record.data).unwrap_or_default(),
            ),
            RecordKind::Message => (
                format!(
                    "message {}",
                    record.data["level"].as_str().unwrap_or("INFO")
                ),
                record.data["message"].as_str().unwrap_or_default().to_string(),
            ),
        };

        writeln!(
            output,
            r#"            <tr class="{}"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><pre>{}</pre></td></tr>"#,
            row_class,
            record.sequence,
            format_datetime(&record.timestamp),
            record.kind,
            escape_html(&record.title),
            escape_html(&body)
        )
        .unwrap();
    }

    writeln!(
        output,
        r#"        </table>
    </div>
</body>
</html>"#
    )
    .unwrap();

    output
}

/// Render `journal` next to itself; returns the HTML path
pub fn write_html_report(journal: &Path) -> Result<PathBuf> {
    let records = read_journal(journal)
        .with_context(|| format!("Failed to read journal {}", journal.display()))?;

    let title = journal
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "journal".to_string());

    let path = html_path_for(journal);
    fs::write(&path, render_journal_html(&title, &records))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Wrote report {}", path.display());
    Ok(path)
}

/// Rewrite `index.html` in `dir`, linking every report found there
pub fn write_index(dir: &Path) -> Result<PathBuf> {
    let mut reports: Vec<String> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".html") && name != "index.html")
        .collect();
    reports.sort();

    let mut output = String::new();
    writeln!(
        output,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Reports</title></head>\n<body>\n<h1>Reports</h1>\n<ul>"
    )
    .unwrap();
    for name in &reports {
        let name = escape_html(name);
        writeln!(output, "  <li><a href=\"{name}\">{name}</a></li>").unwrap();
    }
    writeln!(output, "</ul>\n</body>\n</html>").unwrap();

    let path = dir.join("index.html");
    fs::write(&path, output).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}
