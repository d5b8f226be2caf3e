//! Parsers for the text emitted by the external inspection tools.
//!
//! Each parser consumes a `BufRead` line by line so provider output can be
//! streamed straight from a child process without buffering it whole.

pub mod disasm;
pub mod nm;
pub mod padding;
pub mod readelf;

use std::io::BufRead;

pub use disasm::{
    parse_functions, Boundary, DisassemblyGrammar, FunctionSet, GnuObjdumpGrammar,
    GoObjdumpGrammar, MalformedLinePolicy,
};
pub use nm::{parse_symbols, SymbolTable};
pub use padding::{trim_padding, FillerSignature, X86Int3};
pub use readelf::{parse_sections, SectionTable};

/// Line iterator yielding `(1-based line number, line)`.
///
/// Invalid UTF-8 is replaced rather than rejected: tool output occasionally
/// carries raw bytes in symbol names.
pub(crate) struct NumberedLines<R> {
    reader: R,
    line_no: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> NumberedLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, line_no: 0, buf: Vec::new() }
    }
}

impl<R: BufRead> Iterator for NumberedLines<R> {
    type Item = std::io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                self.line_no += 1;
                Some(Ok((self.line_no, String::from_utf8_lossy(&self.buf).into_owned())))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Parse a hexadecimal field, tolerating an optional `0x` prefix.
pub(crate) fn parse_hex(field: &str) -> Result<u64, std::num::ParseIntError> {
    let digits = field.strip_prefix("0x").unwrap_or(field);
    u64::from_str_radix(digits, 16)
}
