use std::io::Write;

use anyhow::{Context, Result};
use bincmp_core::report::{ComparisonReport, ReportWriter, TextReportWriter};
use log::LevelFilter;

/// Log level for the number of `-v` flags given; `RUST_LOG` still wins.
pub fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Set up `env_logger` on stderr. Safe to call more than once.
pub fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level(verbose)).parse_default_env();
    let _ = builder.try_init();
}

/// Write `report` as pretty JSON or as the tab-separated text tables.
pub fn write_report<W: Write>(report: &ComparisonReport, json: bool, mut out: W) -> Result<()> {
    if json {
        let serialized =
            serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;
        writeln!(out, "{serialized}")?;
        return Ok(());
    }

    let mut writer = TextReportWriter::new(out);
    writer.write_report(report).context("Failed to write report")?;
    writer.into_inner().flush()?;
    Ok(())
}
