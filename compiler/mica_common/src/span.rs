//! Source location tracking for the mica compiler

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a registered source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub u32);

/// A byte range in a source file: every token and diagnostic carries one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: FileId,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

impl SourceLocation {
    pub fn start(file: FileId) -> Self {
        Self { file, line: 1, column: 0, length: 0 }
    }

    /// A zero-length location at the same position
    pub fn collapsed(mut self) -> Self {
        self.length = 0;
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Registry of source file names, addressed by `FileId`
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    names: Vec<String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>) -> FileId {
        let id = FileId(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    pub fn name(&self, id: FileId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map_registration() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.c");
        let b = map.add_file("b.h");
        assert_eq!(map.name(a), "a.c");
        assert_eq!(map.name(b), "b.h");
        assert_ne!(a, b);
    }

    #[test]
    fn test_location_display() {
        let loc = SourceLocation { file: FileId(0), line: 3, column: 14, length: 2 };
        assert_eq!(loc.to_string(), "3:14");
    }
}
