//! Translation phase 2: backslash-newline splicing
//!
//! Removes `\`-newline pairs so logical lines span physical lines. A `\`
//! immediately before end of file is an error; a file whose last character
//! is not a newline gets a warning.

use crate::phase1::Phase1;
use mica_common::{Context, SourceLocation};

#[derive(Debug)]
pub struct Phase2 {
    phase1: Phase1,
    peek: Option<u8>,
    peek_loc: SourceLocation,
    current_loc: SourceLocation,
    previous: Option<u8>,
    reported_eof: bool,
}

impl Phase2 {
    pub fn new(mut phase1: Phase1, ctx: &mut Context) -> Self {
        let peek = phase1.next(ctx);
        let peek_loc = phase1.location();
        Self {
            phase1,
            peek,
            peek_loc,
            current_loc: peek_loc,
            previous: None,
            reported_eof: false,
        }
    }

    /// Location of the character(s) most recently returned
    pub fn location(&self) -> SourceLocation {
        self.current_loc
    }

    // extend the current location over the consumed character
    fn advance(&mut self, ctx: &mut Context) -> Option<u8> {
        let ret = self.peek;
        self.current_loc.length += self.peek_loc.length;
        self.peek = self.phase1.next(ctx);
        self.peek_loc = self.phase1.location();
        ret
    }

    // restart the current location at the consumed character
    fn advance_overwrite(&mut self, ctx: &mut Context) -> Option<u8> {
        let ret = self.peek;
        self.current_loc = self.peek_loc;
        self.peek = self.phase1.next(ctx);
        self.peek_loc = self.phase1.location();
        ret
    }

    /// Produce the next spliced character, or `None` at end of file
    pub fn next(&mut self, ctx: &mut Context) -> Option<u8> {
        let mut c = self.advance_overwrite(ctx);
        loop {
            match c {
                Some(b'\\') => match self.peek {
                    None => {
                        ctx.diags.error("unexpected '\\' at end of file", self.current_loc);
                        self.reported_eof = true;
                        return None;
                    }
                    Some(b'\n') => {
                        // splice: drop both characters and continue
                        self.advance(ctx);
                    }
                    Some(_) => {
                        self.previous = Some(b'\\');
                        return Some(b'\\');
                    }
                },
                None => {
                    if self.previous != Some(b'\n') && self.previous.is_some() && !self.reported_eof
                    {
                        ctx.diags
                            .warning("ISO C11 requires newline at end of file", self.current_loc);
                        self.reported_eof = true;
                    }
                    return None;
                }
                Some(other) => {
                    self.previous = Some(other);
                    return Some(other);
                }
            }
            c = self.advance(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceReader;
    use pretty_assertions::assert_eq;

    fn collect(ctx: &mut Context, text: &str) -> String {
        let file = ctx.files.add_file("test.c");
        let phase1 = Phase1::new(SourceReader::new(text.as_bytes().to_vec(), file));
        let mut p = Phase2::new(phase1, ctx);
        let mut out = Vec::new();
        while let Some(c) = p.next(ctx) {
            out.push(c);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_splice_fuses_lines() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, "ab\\\ncd\n"), "abcd\n");
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_consecutive_splices() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, "a\\\n\\\nb\n"), "ab\n");
    }

    #[test]
    fn test_backslash_not_before_newline_survives() {
        let mut ctx = Context::default();
        assert_eq!(collect(&mut ctx, "a\\b\n"), "a\\b\n");
    }

    #[test]
    fn test_trailing_backslash_is_error() {
        let mut ctx = Context::default();
        collect(&mut ctx, "ab\\");
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_missing_final_newline_warns() {
        let mut ctx = Context::default();
        collect(&mut ctx, "ab");
        assert!(!ctx.diags.has_errors());
        assert_eq!(ctx.diags.warning_count(), 1);
    }
}
