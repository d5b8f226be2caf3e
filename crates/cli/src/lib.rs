//! Command implementations for the `bincmp` binary.
//!
//! `main.rs` only parses flags; everything it runs lives here so it can be
//! exercised from tests without spawning the binary.

pub mod commands;
