//! Source file loading and syntax highlighting.

pub mod types;
pub mod worker;
