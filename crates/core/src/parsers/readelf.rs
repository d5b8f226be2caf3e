use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::OnceLock;

use log::{debug, warn};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::ParseError;
use crate::model::Section;
use crate::parsers::{parse_hex, NumberedLines};

const FRAME_START: &str = "Section Headers:";
const FRAME_END: &str = "Key to Flags:";

/// Sections of one binary keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionTable {
    pub sections: BTreeMap<String, Section>,
}

impl SectionTable {
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// [Nr] Name Type Address Offset
fn header_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\s*(\d+)\]\s+(\S+)?\s+(\S+)\s+([[:xdigit:]]+)\s+([[:xdigit:]]+)")
            .expect("static regex")
    })
}

// Size EntSize Flags Link Info Align
fn detail_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([[:xdigit:]]+)\s+([[:xdigit:]]+)\s+(\w+)?\s+(\d+)\s+(\d+)\s+(\d+)")
            .expect("static regex")
    })
}

/// Parse `readelf -S` output.
///
/// Only lines between `Section Headers:` and `Key to Flags:` are considered.
/// Inside that frame every record takes two lines. A pair that does not match
/// is skipped and parsing continues with the line after it.
pub fn parse_sections<R: BufRead>(reader: R) -> Result<SectionTable, ParseError> {
    let mut table = SectionTable::default();
    let mut lines = NumberedLines::new(reader);
    let mut in_frame = false;

    while let Some(first) = lines.next() {
        let (first_no, first) = first?;
        if first.starts_with(FRAME_START) {
            in_frame = true;
            continue;
        }
        if first.starts_with(FRAME_END) {
            in_frame = false;
            continue;
        }
        if !in_frame {
            continue;
        }

        let Some(second) = lines.next() else {
            warn!("readelf: output ended after line {first_no} without its second line");
            break;
        };
        let (second_no, second) = second?;
        if second.starts_with(FRAME_END) {
            warn!("readelf: section table ended after line {first_no} without its second line");
            in_frame = false;
            continue;
        }

        let Some(head) = header_line().captures(&first) else {
            // Column headings, not a record.
            debug!("readelf: skipping lines {first_no}-{second_no}: {first:?}");
            continue;
        };
        let Some(detail) = detail_line().captures(&second) else {
            warn!("readelf: skipping bad parse on line {second_no}: {second:?}");
            continue;
        };

        match section_from_captures(&head, &detail, second_no, &second) {
            Ok(section) if section.name.is_empty() => {
                debug!("readelf: skipping unnamed section on line {first_no}");
            }
            Ok(section) => {
                table.sections.insert(section.name.clone(), section);
            }
            Err(e) => warn!("readelf: {e}"),
        }
    }

    Ok(table)
}

fn section_from_captures(
    head: &Captures<'_>,
    detail: &Captures<'_>,
    line_no: usize,
    line: &str,
) -> Result<Section, ParseError> {
    let hex = |caps: &Captures<'_>, idx: usize, what: &str| -> Result<u64, ParseError> {
        let field = caps.get(idx).map(|m| m.as_str()).unwrap_or_default();
        parse_hex(field).map_err(|e| {
            ParseError::malformed(line_no, line, format!("couldn't parse {what} {field:?}: {e}"))
        })
    };

    Ok(Section {
        name: head.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        kind: head.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        address: hex(head, 4, "address")?,
        offset: hex(head, 5, "offset")?,
        size: hex(detail, 1, "size")?,
        entry_size: hex(detail, 2, "entry size")?,
    })
}
