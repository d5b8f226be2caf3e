use log::debug;

use crate::model::Instruction;
use crate::parsers::{FunctionSet, SymbolTable};

/// Recognises compiler-inserted filler at the end of a function body.
///
/// Implement this for other architectures or toolchains; only x86 `int3`
/// ships today.
pub trait FillerSignature {
    /// Bytes of padding the instruction accounts for, or `None` when it is
    /// real code.
    fn filler_bytes(&self, instruction: &Instruction) -> Option<u64>;
}

/// The single-byte x86 trap (`0xcc`) the Go toolchain pads functions with.
///
/// GNU objdump spells it `int3`, `go tool objdump` spells it `INT $0x3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86Int3;

impl FillerSignature for X86Int3 {
    fn filler_bytes(&self, instruction: &Instruction) -> Option<u64> {
        let text = instruction.text.trim();
        let is_trap = text.ends_with("int3")
            || text.eq_ignore_ascii_case("INT $0x3")
            || instruction.encoded_bytes.eq_ignore_ascii_case("cc");
        is_trap.then_some(1)
    }
}

/// Strip trailing filler from every function and shrink the matching symbol
/// sizes by the bytes removed.
///
/// The scan runs backwards from the last instruction and stops at the first
/// real instruction; the instruction list is truncated right after it.
/// Returns the total number of bytes removed.
pub fn trim_padding(
    functions: &mut FunctionSet,
    symbols: &mut SymbolTable,
    signature: &dyn FillerSignature,
) -> u64 {
    let mut total = 0;
    for (name, function) in functions.functions.iter_mut() {
        let mut padding = 0;
        let mut keep = function.instructions.len();
        while keep > 0 {
            match signature.filler_bytes(&function.instructions[keep - 1]) {
                Some(bytes) => {
                    padding += bytes;
                    keep -= 1;
                }
                None => break,
            }
        }
        if keep == function.instructions.len() {
            continue;
        }
        function.instructions.truncate(keep);
        function.refresh_render_width();
        if symbols.shrink(name, padding) {
            total += padding;
        } else {
            debug!("padding: {name} has no symbol table entry, size left unchanged");
        }
    }
    total
}
