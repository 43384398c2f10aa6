//! Translation phase 1: physical characters to the source character set
//!
//! Strips a leading UTF-8 BOM, rejects bytes that can never appear in valid
//! UTF-8 text, rejects control characters other than the C whitespace set
//! and translates the nine trigraphs when enabled.

use crate::source::SourceReader;
use mica_common::{Context, SourceLocation};

fn trigraph_translation(c: u8) -> Option<u8> {
    Some(match c {
        b'=' => b'#',
        b'(' => b'[',
        b'/' => b'\\',
        b')' => b']',
        b'\'' => b'^',
        b'<' => b'{',
        b'!' => b'|',
        b'>' => b'}',
        b'-' => b'~',
        _ => return None,
    })
}

#[derive(Debug)]
pub struct Phase1 {
    reader: SourceReader,
}

impl Phase1 {
    pub fn new(reader: SourceReader) -> Self {
        Self { reader }
    }

    /// Location of the character(s) most recently returned
    pub fn location(&self) -> SourceLocation {
        self.reader.location()
    }

    /// Produce the next source character, or `None` at end of file
    pub fn next(&mut self, ctx: &mut Context) -> Option<u8> {
        loop {
            let c = self.reader.advance_overwrite()?;

            if self.reader.consumed() == 1
                && c == 0xEF
                && self.reader.peek() == Some(0xBB)
                && self.reader.peek_next() == Some(0xBF)
            {
                self.reader.advance();
                self.reader.advance();
                continue;
            }

            if c == 0xC0 || c == 0xC1 || c >= 0xF5 {
                ctx.diags.error("found invalid byte for utf8 text", self.location());
                continue;
            }

            if (c <= 0x1F || c == 0x7F)
                && !matches!(c, b'\n' | b'\r' | b'\t' | 0x0B | 0x0C)
            {
                ctx.diags.error("found control character in source file", self.location());
                continue;
            }

            if ctx.options.trigraphs && c == b'?' && self.reader.peek() == Some(b'?') {
                if let Some(mapped) = self.reader.peek_next().and_then(trigraph_translation) {
                    self.reader.advance();
                    self.reader.advance();
                    return Some(mapped);
                }
            }

            return Some(c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mica_common::FileId;
    use pretty_assertions::assert_eq;

    fn phase1(ctx: &mut Context, text: &[u8]) -> Phase1 {
        let file = ctx.files.add_file("test.c");
        Phase1::new(SourceReader::new(text.to_vec(), file))
    }

    fn collect(ctx: &mut Context, text: &[u8]) -> Vec<u8> {
        let mut p = phase1(ctx, text);
        let mut out = Vec::new();
        while let Some(c) = p.next(ctx) {
            out.push(c);
        }
        out
    }

    #[test]
    fn test_trigraph_translation() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, b"??=define"), b"#define");
        assert_eq!(collect(&mut ctx, b"a??(b??)c"), b"a[b]c");
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_trigraphs_disabled() {
        let mut ctx = Context::default();
        ctx.options.trigraphs = false;
        assert_eq!(collect(&mut ctx, b"??="), b"??=");
    }

    #[test]
    fn test_incomplete_trigraph_passes_through() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, b"??x"), b"??x");
        assert_eq!(collect(&mut ctx, b"?="), b"?=");
    }

    #[test]
    fn test_trigraph_location_starts_at_first_question_mark() {
        let mut ctx = Context::default();
        let mut p = phase1(&mut ctx, b"ab??=");
        p.next(&mut ctx);
        p.next(&mut ctx);
        assert_eq!(p.next(&mut ctx), Some(b'#'));
        assert_eq!(p.location().column, 3);
        assert_eq!(p.location().length, 3);
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, b"\xEF\xBB\xBFint"), b"int");
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        let mut ctx = Context::default();
        collect(&mut ctx, b"a\xC0b");
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_control_character_rejected() {
        let mut ctx = Context::default();
        collect(&mut ctx, b"a\x01b");
        assert!(ctx.diags.has_errors());

        let mut ctx = Context::default();
        collect(&mut ctx, b"a\tb\x0C\x0B\n");
        assert!(!ctx.diags.has_errors());
    }
}
