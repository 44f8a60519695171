//! CLI command implementations.

pub mod bundle;
pub mod check;
