use std::ffi::OsStr;
use std::io::BufReader;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, warn};

use crate::config::{DisasmFormat, ToolPaths};
use crate::error::{ParseError, ProviderError};
use crate::parsers::{
    parse_functions, parse_sections, parse_symbols, FunctionSet, SectionTable, SymbolTable,
};

/// Source of parsed records for one binary.
///
/// The default implementation shells out to the inspection tools; tests and
/// other frontends can supply records from elsewhere.
pub trait BinaryInspector {
    fn symbols(&self, binary: &Path) -> Result<SymbolTable, ProviderError>;

    fn sections(&self, binary: &Path) -> Result<SectionTable, ProviderError>;

    /// Disassemble `binary`, keeping only functions whose names pass `keep`.
    fn functions(
        &self,
        binary: &Path,
        keep: &dyn Fn(&str) -> bool,
    ) -> Result<FunctionSet, ProviderError>;
}

/// Runs `nm`, `readelf` and `objdump` (or `go tool objdump`) as subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ToolInspector {
    pub tools: ToolPaths,
    pub format: DisasmFormat,
}

impl ToolInspector {
    pub fn new(tools: ToolPaths, format: DisasmFormat) -> Self {
        Self { tools, format }
    }
}

impl BinaryInspector for ToolInspector {
    fn symbols(&self, binary: &Path) -> Result<SymbolTable, ProviderError> {
        let nm = self.tools.nm();
        run_streaming(
            "nm",
            &nm,
            &[OsStr::new("-S"), OsStr::new("--size-sort"), binary.as_os_str()],
            parse_symbols,
        )
    }

    fn sections(&self, binary: &Path) -> Result<SectionTable, ProviderError> {
        let readelf = self.tools.readelf();
        run_streaming("readelf", &readelf, &[OsStr::new("-S"), binary.as_os_str()], parse_sections)
    }

    fn functions(
        &self,
        binary: &Path,
        keep: &dyn Fn(&str) -> bool,
    ) -> Result<FunctionSet, ProviderError> {
        let grammar = self.format.grammar();
        match self.format {
            DisasmFormat::Gnu => {
                let objdump = self.tools.objdump();
                run_streaming(
                    "objdump",
                    &objdump,
                    &[OsStr::new("-d"), OsStr::new("--no-show-raw-insn"), binary.as_os_str()],
                    |reader| parse_functions(reader, grammar.as_ref(), keep),
                )
            }
            DisasmFormat::Go => {
                let go = self.tools.go();
                run_streaming(
                    "go tool objdump",
                    &go,
                    &[OsStr::new("tool"), OsStr::new("objdump"), binary.as_os_str()],
                    |reader| parse_functions(reader, grammar.as_ref(), keep),
                )
            }
        }
    }
}

/// Spawn `program`, hand its stdout to `parse` as it is produced, then check
/// the exit status.
fn run_streaming<T>(
    tool: &str,
    program: &Path,
    args: &[&OsStr],
    parse: impl FnOnce(BufReader<ChildStdout>) -> Result<T, ParseError>,
) -> Result<T, ProviderError> {
    debug!("running {} {:?}", program.display(), args);
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| ProviderError::Spawn { tool: tool.to_string(), source })?;

    stream_child(&mut child, tool, parse)
}

/// Feed `child`'s stdout to `parse` and check the exit status. The child is
/// always reaped, whichever way this returns.
fn stream_child<T>(
    child: &mut Child,
    tool: &str,
    parse: impl FnOnce(BufReader<ChildStdout>) -> Result<T, ParseError>,
) -> Result<T, ProviderError> {
    let Some(stdout) = child.stdout.take() else {
        stop_child(child, tool);
        return Err(ProviderError::Spawn {
            tool: tool.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "stdout was not captured"),
        });
    };

    let parsed = match parse(BufReader::new(stdout)) {
        Ok(parsed) => parsed,
        Err(source) => {
            // The child may still be blocked writing to the pipe we stopped reading.
            stop_child(child, tool);
            return Err(ProviderError::Parse { tool: tool.to_string(), source });
        }
    };

    let status = child
        .wait()
        .map_err(|source| ProviderError::Spawn { tool: tool.to_string(), source })?;
    if !status.success() {
        return Err(ProviderError::Failed { tool: tool.to_string(), status });
    }
    Ok(parsed)
}

fn stop_child(child: &mut Child, tool: &str) {
    if let Err(e) = child.kill() {
        warn!("failed to stop {tool}: {e}");
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap {tool}: {e}");
    }
}
