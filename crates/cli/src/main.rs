use std::path::PathBuf;

use anyhow::Result;
use bincmp::commands::{compare_command, init_logging, CompareArgs};
use bincmp_core::config::DisasmFormat;
use bincmp_core::diff::SortPolicy;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};

/// Compare two builds of a binary by file, symbol and section size.
///
/// The first binary is the baseline (old), the second the build under test
/// (new); every delta is new minus old. Symbol and section tables are read
/// with `nm`, `readelf` and `objdump` (or `go tool objdump`).
#[derive(Parser, Debug)]
#[command(
    name = "bincmp",
    version,
    about = "Compare file, symbol and section sizes of two binaries",
    long_about = None
)]
struct Cli {
    /// The old and new binary.
    #[arg(value_name = "BINARY")]
    binaries: Vec<PathBuf>,

    /// Only report symbols and sections whose names match this regular expression.
    #[arg(short, long)]
    pattern: Option<String>,

    /// Show side-by-side disassembly of changed functions.
    #[arg(short, long, default_value_t = false)]
    disassemble: bool,

    /// Exclude trailing int3 padding from function sizes.
    #[arg(short, long, default_value_t = false)]
    exact: bool,

    /// Sort order; repeat to apply several stable passes in turn.
    #[arg(short, long, value_enum)]
    sort: Vec<SortArg>,

    /// Only report entries that grew.
    #[arg(short, long, default_value_t = false)]
    larger: bool,

    /// Skip the symbol table and compare sections only.
    #[arg(long, default_value_t = false)]
    no_symtab: bool,

    /// Disassembler output to read.
    #[arg(long, value_enum)]
    disasm_format: Option<FormatArg>,

    /// YAML or JSON config file; flags override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON instead of tab-separated text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Name,
    Size,
    Delta,
    Percent,
}

impl From<SortArg> for SortPolicy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortPolicy::Name,
            SortArg::Size => SortPolicy::NewSize,
            SortArg::Delta => SortPolicy::SizeDelta,
            SortArg::Percent => SortPolicy::PercentDelta,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Gnu,
    Go,
}

impl From<FormatArg> for DisasmFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Gnu => DisasmFormat::Gnu,
            FormatArg::Go => DisasmFormat::Go,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let [old, new] = match <[PathBuf; 2]>::try_from(cli.binaries) {
        Ok(pair) => pair,
        Err(_) => {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    compare_command(&CompareArgs {
        old,
        new,
        config: cli.config,
        pattern: cli.pattern,
        disassemble: cli.disassemble,
        exact: cli.exact,
        sort: cli.sort.into_iter().map(SortPolicy::from).collect(),
        larger: cli.larger,
        no_symtab: cli.no_symtab,
        disasm_format: cli.disasm_format.map(DisasmFormat::from),
        json: cli.json,
    })
}
