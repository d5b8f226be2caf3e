//! Positional side-by-side alignment of two disassembled functions.
//!
//! Rows are paired by index only. An inserted or deleted instruction shifts
//! everything after it, so every later row shows up as different.

use serde::Serialize;

use crate::model::Function;

/// One row of the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedRow {
    pub left: Option<String>,
    pub right: Option<String>,
    /// Instruction text differs (addresses are not compared).
    pub differs: bool,
}

/// Two functions laid out next to each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedListing {
    /// Width of the left column before the separator.
    pub left_width: usize,
    pub rows: Vec<AlignedRow>,
}

impl AlignedListing {
    pub fn differing_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.differs).count()
    }

    /// Render every row as `left<pad> <mark> right`, where the mark is `!` on
    /// rows that differ.
    pub fn render_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| {
                let left = row.left.as_deref().unwrap_or("");
                let right = row.right.as_deref().unwrap_or("");
                let mark = if row.differs { '!' } else { ' ' };
                let line = format!("{left:<width$} {mark} {right}", width = self.left_width);
                line.trim_end().to_string()
            })
            .collect()
    }
}

/// Align `old` and `new` by instruction index.
///
/// Returns `None` when neither side has any instructions. A missing side is
/// rendered as a blank column.
pub fn align_functions(old: Option<&Function>, new: Option<&Function>) -> Option<AlignedListing> {
    let left = old.map(|f| f.instructions.as_slice()).unwrap_or_default();
    let right = new.map(|f| f.instructions.as_slice()).unwrap_or_default();
    if left.is_empty() && right.is_empty() {
        return None;
    }

    let rows = (0..left.len().max(right.len()))
        .map(|i| {
            let (l, r) = (left.get(i), right.get(i));
            AlignedRow {
                left: l.map(|insn| insn.render()),
                right: r.map(|insn| insn.render()),
                differs: l.map(|insn| insn.text.as_str()) != r.map(|insn| insn.text.as_str()),
            }
        })
        .collect();

    Some(AlignedListing { left_width: old.map_or(0, |f| f.render_width), rows })
}
