//! # Trellis Support
//!
//! Small helpers shared by the trellis crates.
//!
//! Currently this is only text rendering for diagnostics: resolution
//! chains, shortened type names and "did you mean?" suggestions.

pub mod rendering;
