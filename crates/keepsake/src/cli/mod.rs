//! Command-line interface for inspecting and maintaining the ledger.
//!
//! Handlers return their rendered output instead of printing it, so the
//! binary decides where it goes.

mod commands;
mod handlers;
mod render;

pub use commands::{Cli, Commands, OutputFormat};
pub use handlers::{execute, open_ledger};
