//! Core Module
//!
//! Pure text processing shared by every execution context.

pub mod text_normalizer;

pub use text_normalizer::*;
