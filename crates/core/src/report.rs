//! Comparison report types and the tab-separated text writer.
//!
//! Every table uses the columns `name, delta, old, new, percent`. Rows are
//! tab-separated so they can be fed to any column aligner.

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::align::AlignedListing;
use crate::diff::{EntryDiff, KindSummary, Percent, SizeTotals};
use crate::model::SymbolKind;

/// Longest name printed before it is shortened in the middle.
pub const MAX_NAME_LEN: usize = 60;

/// One input binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl FileInfo {
    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Whole-file comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDiff {
    pub old: FileInfo,
    pub new: FileInfo,
    pub delta: i64,
    pub percent: Percent,
    /// Both files hash to the same digest.
    pub identical: bool,
}

impl FileDiff {
    pub fn new(old: FileInfo, new: FileInfo) -> Self {
        let totals = SizeTotals::new(old.size, new.size);
        let identical = old.sha256 == new.sha256;
        Self { old, new, delta: totals.delta, percent: totals.percent, identical }
    }
}

/// A changed symbol, with its side-by-side disassembly when requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolEntry {
    #[serde(flatten)]
    pub diff: EntryDiff,
    pub kind: SymbolKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disassembly: Option<AlignedListing>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub entries: Vec<SymbolEntry>,
    pub total: SizeTotals,
    pub kinds: KindSummary,
    /// Bytes of trailing padding removed from function sizes (old, new).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding_removed: Option<(u64, u64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionReport {
    pub entries: Vec<EntryDiff>,
    pub total: SizeTotals,
}

/// Result of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub generated_at: String,
    pub file: FileDiff,
    /// Absent when the run was restricted to sections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<SymbolReport>,
    pub sections: SectionReport,
}

/// Consumer of a comparison report.
pub trait ReportWriter {
    fn write_file(&mut self, file: &FileDiff) -> io::Result<()>;
    fn write_symbols(&mut self, symbols: &SymbolReport) -> io::Result<()>;
    fn write_sections(&mut self, sections: &SectionReport) -> io::Result<()>;

    fn write_report(&mut self, report: &ComparisonReport) -> io::Result<()> {
        self.write_file(&report.file)?;
        if let Some(symbols) = &report.symbols {
            self.write_symbols(symbols)?;
        }
        self.write_sections(&report.sections)
    }
}

/// Shorten `name` to [`MAX_NAME_LEN`] characters by eliding its middle.
pub fn truncate_name(name: &str) -> String {
    let len = name.chars().count();
    if len <= MAX_NAME_LEN {
        return name.to_string();
    }
    let head = (MAX_NAME_LEN - 3) / 2;
    let tail = MAX_NAME_LEN - 3 - head;
    let start: String = name.chars().take(head).collect();
    let end: String = name.chars().skip(len - tail).collect();
    format!("{start}...{end}")
}

fn size_cell(size: Option<u64>) -> String {
    size.map(|s| s.to_string()).unwrap_or_default()
}

/// Plain-text writer producing tab-separated rows.
pub struct TextReportWriter<W: Write> {
    out: W,
}

impl<W: Write> TextReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn header(&mut self, first: &str) -> io::Result<()> {
        writeln!(self.out, "{first}\tdelta\told\tnew\tpercent")
    }

    fn entry_row(&mut self, entry: &EntryDiff) -> io::Result<()> {
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}",
            truncate_name(&entry.name),
            entry.delta,
            size_cell(entry.old),
            size_cell(entry.new),
            entry.percent
        )
    }

    fn totals_row(&mut self, label: &str, totals: &SizeTotals) -> io::Result<()> {
        writeln!(
            self.out,
            "{label}\t{}\t{}\t{}\t{}",
            totals.delta, totals.old, totals.new, totals.percent
        )
    }
}

impl<W: Write> ReportWriter for TextReportWriter<W> {
    fn write_file(&mut self, file: &FileDiff) -> io::Result<()> {
        self.header("binary")?;
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}",
            file.new.display_name(),
            file.delta,
            file.old.size,
            file.new.size,
            file.percent
        )?;
        if file.identical {
            writeln!(self.out, "(files are identical)")?;
        }
        writeln!(self.out)
    }

    fn write_symbols(&mut self, symbols: &SymbolReport) -> io::Result<()> {
        if !symbols.entries.is_empty() {
            self.header("symbol name")?;
            for entry in &symbols.entries {
                self.entry_row(&entry.diff)?;
                if let Some(listing) = &entry.disassembly {
                    for line in listing.render_lines() {
                        writeln!(self.out, "{line}")?;
                    }
                    writeln!(self.out)?;
                }
            }
            self.totals_row("total", &symbols.total)?;
            writeln!(self.out)?;
        }

        self.header("kind")?;
        for row in &symbols.kinds.rows {
            self.totals_row(row.kind.label(), &row.totals)?;
        }
        self.totals_row("total", &symbols.kinds.total)?;
        if let Some((old, new)) = symbols.padding_removed {
            writeln!(self.out, "(padding removed: {old} old, {new} new)")?;
        }
        writeln!(self.out)
    }

    fn write_sections(&mut self, sections: &SectionReport) -> io::Result<()> {
        if sections.entries.is_empty() {
            return Ok(());
        }
        self.header("section name")?;
        for entry in &sections.entries {
            self.entry_row(entry)?;
        }
        self.totals_row("total", &sections.total)
    }
}
