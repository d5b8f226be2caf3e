//! bincmp-core
//!
//! Core library for comparing two builds of a binary by file size, symbol
//! size and section size, with optional side-by-side disassembly of the
//! functions that changed.
//!
//! The library consumes the text printed by `nm`, `readelf` and `objdump`
//! (or `go tool objdump`). Parsing, diffing and alignment live here so they
//! are testable without the tools installed; the CLI only wires flags to a
//! [`config::CompareConfig`] and prints the [`report::ComparisonReport`].

pub mod align;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod parsers;
pub mod report;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
