//! Semantic parameter analysis.
//!
//! Translates a free-text terrain description into a full
//! [`TerrainParameters`](crate::params::TerrainParameters) set by calling an
//! external language-model service. Callers fall back to the fixed default
//! parameter set when analysis fails; a failed analysis never aborts a
//! generation request.

pub mod analyzer;

pub use analyzer::{AnalyzerError, ClaudeAnalyzer, DescriptionAnalyzer, DisabledAnalyzer};
