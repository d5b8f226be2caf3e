use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::diff::{NameFilter, SortPolicy};
use crate::error::ConfigError;
use crate::parsers::{DisassemblyGrammar, GnuObjdumpGrammar, GoObjdumpGrammar};

/// Which disassembly provider (and therefore which grammar) to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisasmFormat {
    /// GNU `objdump -d`.
    #[default]
    Gnu,
    /// `go tool objdump`.
    Go,
}

impl DisasmFormat {
    pub fn grammar(self) -> Box<dyn DisassemblyGrammar> {
        match self {
            DisasmFormat::Gnu => Box::new(GnuObjdumpGrammar),
            DisasmFormat::Go => Box::new(GoObjdumpGrammar),
        }
    }
}

/// Optional explicit paths for the external tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub nm: Option<PathBuf>,
    pub readelf: Option<PathBuf>,
    pub objdump: Option<PathBuf>,
    pub go: Option<PathBuf>,
}

impl ToolPaths {
    pub fn nm(&self) -> PathBuf {
        resolve_tool(self.nm.as_ref(), "BINCMP_NM", platform_tool("nm"))
    }

    pub fn readelf(&self) -> PathBuf {
        resolve_tool(self.readelf.as_ref(), "BINCMP_READELF", "readelf")
    }

    pub fn objdump(&self) -> PathBuf {
        resolve_tool(self.objdump.as_ref(), "BINCMP_OBJDUMP", platform_tool("objdump"))
    }

    pub fn go(&self) -> PathBuf {
        resolve_tool(self.go.as_ref(), "BINCMP_GO", "go")
    }
}

/// Explicit path, then environment override, then the default name on `PATH`.
fn resolve_tool(explicit: Option<&PathBuf>, env_var: &str, default: &str) -> PathBuf {
    explicit
        .cloned()
        .or_else(|| std::env::var_os(env_var).filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

/// macOS ships BSD tools; the GNU ones are installed with a `g` prefix.
fn platform_tool(name: &'static str) -> &'static str {
    if cfg!(target_os = "macos") {
        match name {
            "nm" => "gnm",
            "objdump" => "gobjdump",
            other => other,
        }
    } else {
        name
    }
}

fn default_sort() -> Vec<SortPolicy> {
    vec![SortPolicy::SizeDelta]
}

/// Everything that shapes a comparison run.
///
/// Can be loaded from a YAML or JSON file; CLI flags are layered on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Regular expression matched anywhere in symbol/section names.
    pub pattern: String,
    /// Show side-by-side disassembly of changed functions.
    pub disassemble: bool,
    /// Remove trailing padding bytes from function sizes.
    pub exact: bool,
    /// Stable sort passes applied after the base name order.
    pub sort: Vec<SortPolicy>,
    /// Only report entries that grew.
    pub only_larger: bool,
    /// Skip the symbol table and report sections only.
    pub sections_only: bool,
    pub disasm_format: DisasmFormat,
    pub tools: ToolPaths,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            disassemble: false,
            exact: false,
            sort: default_sort(),
            only_larger: false,
            sections_only: false,
            disasm_format: DisasmFormat::default(),
            tools: ToolPaths::default(),
        }
    }
}

impl CompareConfig {
    /// Load a config file; the format follows the extension (`yaml`, `yml`, `json`).
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        match ext {
            "yaml" | "yml" => serde_yaml::from_str(&body).context("Failed to parse config YAML"),
            "json" => serde_json::from_str(&body).context("Failed to parse config JSON"),
            other => Err(anyhow!(
                "Unsupported config format '{}' for {} (expected yaml, yml or json)",
                other,
                path.display()
            )),
        }
    }

    /// Check option combinations and compile the name pattern.
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.sections_only && self.disassemble {
            return Err(ConfigError::IncompatibleOptions(
                "disassembly needs the symbol table; it cannot be combined with sections-only"
                    .into(),
            ));
        }
        if self.sections_only && self.exact {
            return Err(ConfigError::IncompatibleOptions(
                "exact sizes adjust symbols; it cannot be combined with sections-only".into(),
            ));
        }
        let filter = NameFilter::new(&self.pattern)?;
        Ok(ValidatedConfig { config: self, filter })
    }
}

/// A config that passed [`CompareConfig::validate`].
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: CompareConfig,
    pub filter: NameFilter,
}

impl ValidatedConfig {
    /// Whether the disassembly provider has to run at all.
    pub fn needs_disassembly(&self) -> bool {
        self.config.disassemble || self.config.exact
    }
}
