//! Per-translation-unit state threaded through every phase

use crate::{Diagnostics, SourceMap};

/// Translation options shared by all phases
#[derive(Debug, Clone)]
pub struct Options {
    /// Translate the nine C trigraphs in phase 1
    pub trigraphs: bool,
    /// Columns a tab advances when computing token indent
    pub tab_size: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self { trigraphs: true, tab_size: 4 }
    }
}

/// Everything a phase needs besides its own stream state: the registered
/// source files, the diagnostic sink and the translation options.
#[derive(Debug, Default)]
pub struct Context {
    pub options: Options,
    pub files: SourceMap,
    pub diags: Diagnostics,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Self { options, files: SourceMap::new(), diags: Diagnostics::new() }
    }
}
