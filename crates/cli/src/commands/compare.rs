use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bincmp_core::config::{CompareConfig, DisasmFormat};
use bincmp_core::diff::SortPolicy;
use bincmp_core::services::Comparer;
use log::info;

use crate::commands::write_report;

/// Flags of one `bincmp OLD NEW` invocation.
///
/// Anything left unset falls back to the config file, then to the defaults.
#[derive(Debug, Clone, Default)]
pub struct CompareArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    pub config: Option<PathBuf>,
    pub pattern: Option<String>,
    pub disassemble: bool,
    pub exact: bool,
    pub sort: Vec<SortPolicy>,
    pub larger: bool,
    pub no_symtab: bool,
    pub disasm_format: Option<DisasmFormat>,
    pub json: bool,
}

/// Load the config file (if any) and layer the command-line flags on top.
pub fn build_config(args: &CompareArgs) -> Result<CompareConfig> {
    let mut config = match &args.config {
        Some(path) => CompareConfig::load(path)?,
        None => CompareConfig::default(),
    };

    if let Some(pattern) = &args.pattern {
        config.pattern = pattern.clone();
    }
    if !args.sort.is_empty() {
        config.sort = args.sort.clone();
    }
    if let Some(format) = args.disasm_format {
        config.disasm_format = format;
    }
    config.disassemble |= args.disassemble;
    config.exact |= args.exact;
    config.only_larger |= args.larger;
    config.sections_only |= args.no_symtab;

    Ok(config)
}

/// Compare two binaries and print the report to stdout.
pub fn compare_command(args: &CompareArgs) -> Result<()> {
    let config = build_config(args)?;
    info!("comparing {} -> {}", args.old.display(), args.new.display());

    let comparer = Comparer::new(&args.old, &args.new, config)?;
    let filter = &comparer.config().filter;
    if !filter.is_match_all() {
        info!("name filter: {}", filter.pattern());
    }
    let report = comparer.run().with_context(|| {
        format!("Failed to compare {} and {}", args.old.display(), args.new.display())
    })?;

    write_report(&report, args.json, io::stdout().lock())
}
