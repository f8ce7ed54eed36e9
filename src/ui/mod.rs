//! ui
//!
//! Terminal output for the `vcb` binary.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! All terminal output goes through this module so the quiet flag is honored
//! in one place.

pub mod output;
