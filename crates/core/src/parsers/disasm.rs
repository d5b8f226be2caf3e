//! Disassembly listings.
//!
//! Two providers are supported, each described by a [`DisassemblyGrammar`]:
//! `go tool objdump` ([`GoObjdumpGrammar`]) and GNU `objdump -d`
//! ([`GnuObjdumpGrammar`]). The grammar is picked by configuration; the
//! parser never guesses.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;
use serde::Serialize;

use crate::error::ParseError;
use crate::model::{Function, Instruction};
use crate::parsers::{parse_hex, NumberedLines};

/// What to do with an instruction line the grammar cannot read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedLinePolicy {
    /// Abort the parse with [`ParseError::Malformed`].
    Strict,
    /// Log and drop the line.
    Lenient,
}

/// Start of a function in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub name: String,
    pub source_file: String,
}

/// Line grammar of one disassembly provider.
pub trait DisassemblyGrammar {
    /// Short provider name used in diagnostics.
    fn name(&self) -> &'static str;

    fn policy(&self) -> MalformedLinePolicy;

    /// Recognise a function header line.
    fn parse_boundary_line(&self, line: &str) -> Option<Boundary>;

    /// Parse an instruction line. `Ok(None)` means the line carries no
    /// instruction and is dropped.
    fn parse_instruction_line(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<Option<Instruction>, ParseError>;
}

/// Functions of one binary keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionSet {
    pub functions: BTreeMap<String, Function>,
}

impl FunctionSet {
    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

enum State {
    Idle,
    /// Inside a function the caller did not ask for.
    Skipping,
    In(Function),
}

/// Parse a disassembly listing, keeping the functions whose names pass `keep`.
///
/// A boundary line opens a function; instruction lines are appended to it; a
/// blank line or the next boundary closes it. Unreadable lines are handled
/// according to the grammar's [`MalformedLinePolicy`].
pub fn parse_functions<R, G>(
    reader: R,
    grammar: &G,
    keep: impl Fn(&str) -> bool,
) -> Result<FunctionSet, ParseError>
where
    R: BufRead,
    G: DisassemblyGrammar + ?Sized,
{
    let mut set = FunctionSet::default();
    let mut state = State::Idle;
    let strict = grammar.policy() == MalformedLinePolicy::Strict;

    for line in NumberedLines::new(reader) {
        let (line_no, line) = line?;
        if line.trim().is_empty() {
            close(&mut state, &mut set);
            continue;
        }

        if let Some(boundary) = grammar.parse_boundary_line(&line) {
            close(&mut state, &mut set);
            state = if keep(&boundary.name) {
                State::In(Function::new(boundary.name, boundary.source_file))
            } else {
                State::Skipping
            };
            continue;
        }

        let function = match &mut state {
            State::In(function) => Some(function),
            State::Skipping => None,
            State::Idle if strict => {
                return Err(ParseError::malformed(line_no, &line, "input outside of a function"));
            }
            State::Idle => {
                trace!("{}: dropping line {line_no} outside of a function", grammar.name());
                continue;
            }
        };

        match grammar.parse_instruction_line(line_no, &line) {
            Ok(Some(instruction)) => {
                if let Some(function) = function {
                    function.push(instruction);
                }
            }
            Ok(None) => trace!("{}: dropping line {line_no}: {line:?}", grammar.name()),
            Err(e) if strict => return Err(e),
            Err(e) => debug!("{}: {e}", grammar.name()),
        }
    }
    close(&mut state, &mut set);

    Ok(set)
}

fn close(state: &mut State, set: &mut FunctionSet) {
    if let State::In(function) = std::mem::replace(state, State::Idle) {
        if !function.name.is_empty() {
            set.functions.insert(function.name.clone(), function);
        }
    }
}

/// `go tool objdump` listings.
///
/// ```text
/// TEXT strings.EqualFold(SB) /usr/lib/go/src/strings/strings.go
///   strings.go:128   0x5997a0   4883ec30   SUBQ $0x30, SP
/// ```
///
/// The instruction grammar is fully specified, so unreadable lines are fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoObjdumpGrammar;

fn go_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^TEXT (.+)\(SB\) (.*)$").expect("static regex"))
}

fn go_instruction() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s+([^:]*):(\d*)\s+(0x[[:xdigit:]]+)\s+([[:xdigit:]]+)\s+(.*)$")
            .expect("static regex")
    })
}

impl DisassemblyGrammar for GoObjdumpGrammar {
    fn name(&self) -> &'static str {
        "go objdump"
    }

    fn policy(&self) -> MalformedLinePolicy {
        MalformedLinePolicy::Strict
    }

    fn parse_boundary_line(&self, line: &str) -> Option<Boundary> {
        let caps = go_boundary().captures(line)?;
        Some(Boundary { name: caps[1].to_string(), source_file: caps[2].to_string() })
    }

    fn parse_instruction_line(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<Option<Instruction>, ParseError> {
        let caps = go_instruction()
            .captures(line)
            .ok_or_else(|| ParseError::malformed(line_no, line, "unrecognised instruction"))?;
        let source_line = match &caps[2] {
            "" => 0,
            digits => digits.parse().map_err(|e| {
                ParseError::malformed(line_no, line, format!("bad source line: {e}"))
            })?,
        };
        let offset = parse_hex(&caps[3])
            .map_err(|e| ParseError::malformed(line_no, line, format!("bad address: {e}")))?;
        Ok(Some(Instruction {
            source_file: caps[1].to_string(),
            source_line,
            offset,
            encoded_bytes: caps[4].to_string(),
            text: caps[5].trim().to_string(),
        }))
    }
}

/// GNU `objdump -d` listings.
///
/// ```text
/// 0000000000401000 <main.init.1>:
///   401013:	48 83 ec 48          	sub    $0x48,%rsp
/// ```
///
/// Section banners, file headers and byte-continuation lines are mixed into
/// the listing, so anything unreadable is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct GnuObjdumpGrammar;

fn gnu_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]+ <(.*?)>:$").expect("static regex"))
}

/// Normalise one objdump line: tabs become spaces, the trailing `# ...`
/// comment and any `<symbol+off>` annotation are removed.
pub fn clean_line(line: &str) -> String {
    let mut code = line.replace('\t', "    ");
    if let Some(idx) = code.find("# ") {
        code.truncate(idx);
    } else if code.ends_with('#') {
        code.pop();
    }
    if let Some(idx) = code.find('<') {
        code.truncate(idx);
    }
    code.trim().to_string()
}

/// Raw-encoding tokens: single x86 bytes or 32-bit instruction words.
fn is_encoding_token(token: &str) -> bool {
    matches!(token.len(), 2 | 8) && token.bytes().all(|b| b.is_ascii_hexdigit())
}

fn split_encoding(rest: &str) -> (String, &str) {
    let mut bytes = Vec::new();
    let mut remaining = rest.trim_start();
    loop {
        let end = remaining.find(char::is_whitespace).unwrap_or(remaining.len());
        let token = &remaining[..end];
        if token.is_empty() || !is_encoding_token(token) {
            break;
        }
        bytes.push(token);
        remaining = remaining[end..].trim_start();
    }
    (bytes.join(" "), remaining.trim_end())
}

impl DisassemblyGrammar for GnuObjdumpGrammar {
    fn name(&self) -> &'static str {
        "objdump"
    }

    fn policy(&self) -> MalformedLinePolicy {
        MalformedLinePolicy::Lenient
    }

    fn parse_boundary_line(&self, line: &str) -> Option<Boundary> {
        let caps = gnu_boundary().captures(line)?;
        Some(Boundary { name: caps[1].to_string(), source_file: String::new() })
    }

    fn parse_instruction_line(
        &self,
        line_no: usize,
        line: &str,
    ) -> Result<Option<Instruction>, ParseError> {
        let code = clean_line(line);
        let Some((address, rest)) = code.split_once(':') else {
            return Ok(None);
        };
        let address = address.trim();
        if address.is_empty() || !address.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(None);
        }
        let offset = parse_hex(address)
            .map_err(|e| ParseError::malformed(line_no, line, format!("bad address: {e}")))?;
        let (encoded_bytes, text) = split_encoding(rest);
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Instruction {
            source_file: String::new(),
            source_line: 0,
            offset,
            encoded_bytes,
            text: text.to_string(),
        }))
    }
}
