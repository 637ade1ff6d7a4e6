//! Breakpoint assembly: per-locus de Bruijn graph and the evidence
//! annotation transform built on top of it.
//!
//! - [`graph`] - index-based k-mer graph arena
//! - [`debruijn`] - the per-locus assembler with its explicit lifecycle
//! - [`annotator`] - the `BreakendTransform` strategy wiring assembly into
//!   the call-stream pipeline

pub mod annotator;
pub mod debruijn;
pub mod graph;

pub use annotator::AssemblyAnnotator;
pub use debruijn::{BreakpointCall, DeBruijnAssembler, ASSEMBLER_NAME};
