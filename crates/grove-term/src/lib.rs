#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Terminal output primitives for grove frontends.
//!
//! This crate isolates terminal rendering and spinners so libgrove can remain
//! UI-agnostic. Implementations of [`Output`]:
//!
//! - [`Terminal`]: a color-capable, width-aware renderer for production use
//! - [`Quiet`]: a silent implementation that suppresses output

/// Terminal output abstractions and implementations.
mod output;

pub use output::{Output, OutputError, Quiet, Result, Spinner, Terminal};
