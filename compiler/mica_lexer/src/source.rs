//! Byte-level source reader with per-byte location tracking

use mica_common::{FileId, SourceLocation};

/// Owns the raw bytes of one source file and tracks the location of the
/// span being consumed. `advance_overwrite` starts a new span at the next
/// byte; `advance` extends the current span over it, leaving the span's
/// start line and column in place.
#[derive(Debug)]
pub struct SourceReader {
    bytes: Vec<u8>,
    consumed: usize,
    location: SourceLocation,
    /// 1-based column of the next unconsumed byte
    column_cursor: u32,
    line_cursor: u32,
    // set to the partner character after '\n' or '\r' so that "\n\r" and
    // "\r\n" advance the line counter once
    ignore_newline: u8,
}

impl SourceReader {
    pub fn new(bytes: Vec<u8>, file: FileId) -> Self {
        Self {
            bytes,
            consumed: 0,
            location: SourceLocation::start(file),
            column_cursor: 1,
            line_cursor: 1,
            ignore_newline: 0,
        }
    }

    /// Location spanning the bytes consumed since the last overwrite
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.consumed).copied()
    }

    pub fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.consumed + 1).copied()
    }

    // "\n", "\r", "\n\r" and "\r\n" each count as a single line advance
    fn count_newline(&mut self, c: u8) {
        if self.ignore_newline != 0 {
            let partner = self.ignore_newline;
            self.ignore_newline = 0;
            if c == partner {
                return;
            }
        }
        if c == b'\n' {
            self.ignore_newline = b'\r';
            self.line_cursor += 1;
            self.column_cursor = 1;
        } else if c == b'\r' {
            self.ignore_newline = b'\n';
            self.line_cursor += 1;
            self.column_cursor = 1;
        }
    }

    fn consume(&mut self) -> Option<u8> {
        let c = *self.bytes.get(self.consumed)?;
        self.consumed += 1;
        if !matches!(c, b'\n' | b'\r') {
            self.ignore_newline = 0;
            self.column_cursor += 1;
        }
        self.count_newline(c);
        Some(c)
    }

    /// Consume one byte, extending the current span over it
    pub fn advance(&mut self) -> Option<u8> {
        let c = self.consume()?;
        self.location.length += 1;
        Some(c)
    }

    /// Consume one byte, starting a new span at it
    pub fn advance_overwrite(&mut self) -> Option<u8> {
        let line = self.line_cursor;
        let column = self.column_cursor;
        let c = self.consume()?;
        self.location.line = line;
        self.location.column = column;
        self.location.length = 1;
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> SourceReader {
        SourceReader::new(text.as_bytes().to_vec(), FileId(0))
    }

    #[test]
    fn test_span_keeps_start_column() {
        let mut r = reader("abc");
        assert_eq!(r.advance_overwrite(), Some(b'a'));
        assert_eq!(r.location().column, 1);
        assert_eq!(r.advance(), Some(b'b'));
        // extending the span leaves the start column in place
        assert_eq!(r.location().column, 1);
        assert_eq!(r.location().length, 2);
        assert_eq!(r.advance_overwrite(), Some(b'c'));
        assert_eq!(r.location().column, 3);
        assert_eq!(r.location().length, 1);
        assert_eq!(r.advance(), None);
    }

    #[test]
    fn test_mixed_line_endings_count_once() {
        let mut r = reader("a\r\nb\n\rc\nd\re");
        let mut last = r.location();
        while r.advance_overwrite().is_some() {
            last = r.location();
        }
        // 'e' sits on the fifth line: four terminators of three styles
        assert_eq!(last.line, 5);
        assert_eq!(last.column, 1);
    }

    #[test]
    fn test_columns_reset_per_line() {
        let mut r = reader("ab\ncd");
        r.advance_overwrite(); // a
        r.advance_overwrite(); // b
        assert_eq!(r.location().column, 2);
        r.advance_overwrite(); // newline
        r.advance_overwrite(); // c
        assert_eq!(r.location().line, 2);
        assert_eq!(r.location().column, 1);
    }
}
