//! CLI command implementations for svasm.
//!
//! Each submodule implements one subcommand:
//!
//! - [`annotate`] - annotate breakend calls with locally assembled
//!   breakpoint evidence and re-emit a coordinate-sorted call file

pub mod annotate;
pub mod command;
