//! Plan display and execution for the CLI
//!
//! The reconciliation itself lives in the `declarative` crate. This module
//! adds the terminal side: diff display, a progress bar, confirmation and
//! the final summary.

pub mod differ;
pub mod executor;

pub use executor::{ApplyOptions, apply, status};
