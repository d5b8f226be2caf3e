use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::align::align_functions;
use crate::config::{CompareConfig, ValidatedConfig};
use crate::diff::{diff_tables, summarize_kinds, total_of, DiffOptions};
use crate::error::CompareError;
use crate::model::SymbolKind;
use crate::parsers::{trim_padding, FunctionSet, X86Int3};
use crate::report::{
    ComparisonReport, FileDiff, FileInfo, SectionReport, SymbolEntry, SymbolReport,
};
use crate::services::providers::{BinaryInspector, ToolInspector};

/// Compares two binaries: `old` is the baseline, `new` the build under test.
pub struct Comparer {
    old: PathBuf,
    new: PathBuf,
    config: ValidatedConfig,
    inspector: Box<dyn BinaryInspector>,
}

impl Comparer {
    /// Validate the config and both inputs, using the external tools for
    /// inspection.
    pub fn new(
        old: impl Into<PathBuf>,
        new: impl Into<PathBuf>,
        config: CompareConfig,
    ) -> Result<Self, CompareError> {
        let inspector = ToolInspector::new(config.tools.clone(), config.disasm_format);
        Self::with_inspector(old, new, config, Box::new(inspector))
    }

    pub fn with_inspector(
        old: impl Into<PathBuf>,
        new: impl Into<PathBuf>,
        config: CompareConfig,
        inspector: Box<dyn BinaryInspector>,
    ) -> Result<Self, CompareError> {
        let config = config.validate()?;
        let (old, new) = (old.into(), new.into());
        for path in [&old, &new] {
            if !path.is_file() {
                return Err(CompareError::MissingInput(path.clone()));
            }
        }
        Ok(Self { old, new, config, inspector })
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn run(&self) -> Result<ComparisonReport, CompareError> {
        let file = self.compare_files()?;
        let symbols = if self.config.config.sections_only {
            None
        } else {
            Some(self.compare_symbols()?)
        };
        let sections = self.compare_sections()?;
        Ok(ComparisonReport { generated_at: Utc::now().to_rfc3339(), file, symbols, sections })
    }

    pub fn compare_files(&self) -> Result<FileDiff, CompareError> {
        Ok(FileDiff::new(file_info(&self.old)?, file_info(&self.new)?))
    }

    pub fn compare_symbols(&self) -> Result<SymbolReport, CompareError> {
        let filter = &self.config.filter;
        let mut old_syms = self.inspector.symbols(&self.old)?.retain_names(filter);
        let mut new_syms = self.inspector.symbols(&self.new)?.retain_names(filter);
        info!("symbols: {} old, {} new", old_syms.len(), new_syms.len());

        let (mut old_fns, mut new_fns) = (FunctionSet::default(), FunctionSet::default());
        if self.config.needs_disassembly() {
            let keep = |name: &str| filter.is_match(name);
            old_fns = self.inspector.functions(&self.old, &keep)?;
            new_fns = self.inspector.functions(&self.new, &keep)?;
            info!("functions: {} old, {} new", old_fns.len(), new_fns.len());
        }

        let mut padding_removed = None;
        if self.config.config.exact {
            let old_pad = trim_padding(&mut old_fns, &mut old_syms, &X86Int3);
            let new_pad = trim_padding(&mut new_fns, &mut new_syms, &X86Int3);
            debug!("padding removed: {old_pad} old, {new_pad} new");
            padding_removed = Some((old_pad, new_pad));
        }

        let options = DiffOptions {
            filter,
            sort: &self.config.config.sort,
            only_larger: self.config.config.only_larger,
        };
        let diffs = diff_tables(&old_syms.symbols, &new_syms.symbols, &options);
        let total = total_of(&diffs);

        let entries = diffs
            .into_iter()
            .map(|diff| {
                let kind = new_syms
                    .get(&diff.name)
                    .or_else(|| old_syms.get(&diff.name))
                    .map_or(SymbolKind::Unknown, |s| s.kind);
                let disassembly = if self.config.config.disassemble {
                    align_functions(old_fns.get(&diff.name), new_fns.get(&diff.name))
                } else {
                    None
                };
                SymbolEntry { diff, kind, disassembly }
            })
            .collect();

        Ok(SymbolReport {
            entries,
            total,
            kinds: summarize_kinds(&old_syms.kind_totals, &new_syms.kind_totals),
            padding_removed,
        })
    }

    pub fn compare_sections(&self) -> Result<SectionReport, CompareError> {
        let old = self.inspector.sections(&self.old)?;
        let new = self.inspector.sections(&self.new)?;
        info!("sections: {} old, {} new", old.len(), new.len());

        let options = DiffOptions {
            filter: &self.config.filter,
            sort: &self.config.config.sort,
            only_larger: self.config.config.only_larger,
        };
        let entries = diff_tables(&old.sections, &new.sections, &options);
        let total = total_of(&entries);
        Ok(SectionReport { entries, total })
    }
}

fn file_info(path: &Path) -> Result<FileInfo, CompareError> {
    let io_err = |source| CompareError::Io { path: path.to_path_buf(), source };
    let size = fs::metadata(path).map_err(io_err)?.len();
    Ok(FileInfo { path: path.to_path_buf(), size, sha256: sha256_file(path).map_err(io_err)? })
}

/// SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
