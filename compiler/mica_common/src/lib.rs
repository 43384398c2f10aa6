//! Shared infrastructure for the mica C compiler

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod span;

pub use context::{Context, Options};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{MicaError, MicaResult};
pub use span::{FileId, SourceLocation, SourceMap};
