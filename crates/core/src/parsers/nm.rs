use std::collections::BTreeMap;
use std::io::BufRead;

use log::{debug, warn};
use serde::Serialize;

use crate::diff::NameFilter;
use crate::error::ParseError;
use crate::model::{Symbol, SymbolKind};
use crate::parsers::{parse_hex, NumberedLines};

/// Symbols of one binary keyed by name, plus the summed size of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymbolTable {
    pub symbols: BTreeMap<String, Symbol>,
    pub kind_totals: BTreeMap<SymbolKind, u64>,
}

impl SymbolTable {
    /// Insert a parsed symbol. The latest record for a name wins, while every
    /// record counts towards its kind total.
    pub fn insert(&mut self, symbol: Symbol) {
        *self.kind_totals.entry(symbol.kind).or_insert(0) += symbol.size;
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Keep only symbols whose names match `filter`; kind totals are rebuilt
    /// from what remains.
    pub fn retain_names(self, filter: &NameFilter) -> SymbolTable {
        if filter.is_match_all() {
            return self;
        }
        let mut out = SymbolTable::default();
        for symbol in self.symbols.into_values() {
            if filter.is_match(&symbol.name) {
                out.insert(symbol);
            }
        }
        out
    }

    /// Shrink a symbol's recorded size by `bytes`, keeping its kind total in step.
    pub fn shrink(&mut self, name: &str, bytes: u64) -> bool {
        let Some(symbol) = self.symbols.get_mut(name) else {
            return false;
        };
        let removed = bytes.min(symbol.size);
        symbol.size -= removed;
        if let Some(total) = self.kind_totals.get_mut(&symbol.kind) {
            *total = total.saturating_sub(removed);
        }
        true
    }
}

/// Parse `nm -S` output.
///
/// Each useful line reads `<hex address> <hex size> <kind char> <name...>`.
/// Lines with fewer than four fields or a kind wider than one character are
/// skipped; lines whose numbers do not parse are logged and dropped. Only an
/// I/O error on the stream aborts the parse.
pub fn parse_symbols<R: BufRead>(reader: R) -> Result<SymbolTable, ParseError> {
    let mut table = SymbolTable::default();
    for line in NumberedLines::new(reader) {
        let (line_no, line) = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 || fields[2].chars().count() != 1 {
            if !fields.is_empty() {
                debug!("nm: skipping line {line_no}: {line:?}");
            }
            continue;
        }
        match parse_symbol_fields(line_no, &line, &fields) {
            Ok(symbol) => table.insert(symbol),
            Err(e) => warn!("nm: {e}"),
        }
    }
    Ok(table)
}

fn parse_symbol_fields(line_no: usize, line: &str, fields: &[&str]) -> Result<Symbol, ParseError> {
    let address = parse_hex(fields[0]).map_err(|e| {
        ParseError::malformed(line_no, line, format!("couldn't parse address {}: {e}", fields[0]))
    })?;
    let size = parse_hex(fields[1]).map_err(|e| {
        ParseError::malformed(line_no, line, format!("couldn't parse size {}: {e}", fields[1]))
    })?;
    let kind = fields[2].chars().next().map(SymbolKind::from_code).unwrap_or(SymbolKind::Unknown);
    let name = fields[3..].join(" ");
    Ok(Symbol { name, kind, size, address })
}
