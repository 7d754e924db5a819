//! Metadata normalization engine and harvest pipeline.
//!
//! Turns an ERDDAP catalog plus per-dataset attribute tables into
//! MCF-shaped records ready for ISO 19115 XML generation.

pub mod assembler;
pub mod contacts;
pub mod filter;
pub mod generator;
pub mod lookup;
pub mod pipeline;
pub mod reposition;
pub mod sanitize;
pub mod temporal;
pub mod writer;
