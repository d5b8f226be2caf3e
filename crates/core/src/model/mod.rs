//! Core data model for the records parsed out of provider output.
//!
//! Everything here is plain data: symbols from the symbol table, sections from
//! the section-header table, and functions with their disassembled
//! instructions. Records are parsed fresh for every comparison run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of a symbol, decoded from the one-character nm code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Bss,
    GlobalBss,
    Data,
    GlobalData,
    Text,
    GlobalText,
    ReadOnlyData,
    GlobalReadOnlyData,
    /// Any code nm may print that we do not classify (`U`, `W`, `V`, ...).
    Unknown,
}

impl SymbolKind {
    /// Decode an nm type code.
    pub fn from_code(code: char) -> Self {
        match code {
            'b' => SymbolKind::Bss,
            'B' => SymbolKind::GlobalBss,
            'd' => SymbolKind::Data,
            'D' => SymbolKind::GlobalData,
            't' => SymbolKind::Text,
            'T' => SymbolKind::GlobalText,
            'r' => SymbolKind::ReadOnlyData,
            'R' => SymbolKind::GlobalReadOnlyData,
            _ => SymbolKind::Unknown,
        }
    }

    /// Human-readable label used in the summary table.
    pub fn label(self) -> &'static str {
        match self {
            SymbolKind::Bss => "bss",
            SymbolKind::GlobalBss => "global bss",
            SymbolKind::Data => "data",
            SymbolKind::GlobalData => "global data",
            SymbolKind::Text => "text (code)",
            SymbolKind::GlobalText => "global text (code)",
            SymbolKind::ReadOnlyData => "read-only data",
            SymbolKind::GlobalReadOnlyData => "global read-only data",
            SymbolKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named, sized unit (function or data object) reported by the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub size: u64,
    pub address: u64,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, size: u64, address: u64) -> Self {
        Self { name: name.into(), kind, size, address }
    }
}

/// A named region of the binary layout reported by the section-header table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Raw type tag as printed by the provider (e.g. `PROGBITS`, `NOBITS`).
    pub kind: String,
    pub address: u64,
    pub offset: u64,
    pub size: u64,
    pub entry_size: u64,
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Source file annotation, when the provider emits one.
    pub source_file: String,
    /// Source line annotation; 0 when unknown.
    pub source_line: u64,
    /// Address of the instruction.
    pub offset: u64,
    /// Raw encoding as hex text; empty when the provider omits it.
    pub encoded_bytes: String,
    /// Mnemonic and operands.
    pub text: String,
}

impl Instruction {
    /// Render the instruction as shown in side-by-side listings.
    pub fn render(&self) -> String {
        format!("{:x}:    {}", self.offset, self.text)
    }

    /// Width of [`Instruction::render`] in characters.
    pub fn rendered_width(&self) -> usize {
        self.render().chars().count()
    }
}

/// A disassembled function and its instructions in address order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub source_file: String,
    pub instructions: Vec<Instruction>,
    /// Widest rendered instruction, kept up to date while instructions are pushed.
    pub render_width: usize,
}

impl Function {
    pub fn new(name: impl Into<String>, source_file: impl Into<String>) -> Self {
        Self { name: name.into(), source_file: source_file.into(), ..Self::default() }
    }

    /// Append an instruction and widen the render column if needed.
    pub fn push(&mut self, instruction: Instruction) {
        self.render_width = self.render_width.max(instruction.rendered_width());
        self.instructions.push(instruction);
    }

    /// Recompute `render_width` after the instruction list was edited.
    pub fn refresh_render_width(&mut self) {
        self.render_width =
            self.instructions.iter().map(Instruction::rendered_width).max().unwrap_or(0);
    }
}
