//! Translation phase 3: characters to preprocessing tokens
//!
//! Two characters of lookahead, maximal-munch punctuators (including the
//! digraphs), deferred-escape string and character literals, pp-numbers,
//! identifiers with universal-character-name decoding, and comment
//! stripping. Header-name tokens are produced only while the preprocessor
//! has switched the stream into header-name mode for an `#include`
//! argument.

use crate::intern::Interner;
use crate::phase2::Phase2;
use crate::token::{StringEncoding, Token, TokenKind};
use mica_common::{Context, SourceLocation};

/// Whether `<...>` and `"..."` lex as header names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    NoHeader,
    MaybeHeader,
}

// token flag accumulator filled while skipping whitespace
#[derive(Debug, Clone, Copy, Default)]
struct Leading {
    start_of_line: bool,
    render_start_of_line: bool,
    whitespace_before: bool,
    indent: u32,
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_nondigit(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphabetic()
}

fn is_hex_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

#[derive(Debug)]
pub struct Phase3 {
    phase2: Phase2,
    peek: Option<u8>,
    peek_loc: SourceLocation,
    peek_next: Option<u8>,
    peek_next_loc: SourceLocation,
    current: SourceLocation,
    at_start: bool,
    pub mode: LexMode,
}

impl Phase3 {
    pub fn new(mut phase2: Phase2, ctx: &mut Context) -> Self {
        let peek = phase2.next(ctx);
        let peek_loc = phase2.location();
        let peek_next = phase2.next(ctx);
        let peek_next_loc = phase2.location();
        let current = peek_loc.collapsed();
        Self {
            phase2,
            peek,
            peek_loc,
            peek_next,
            peek_next_loc,
            current,
            at_start: true,
            mode: LexMode::NoHeader,
        }
    }

    fn at_end(&self) -> bool {
        self.peek.is_none()
    }

    // extend the current token location over the consumed character
    fn advance(&mut self, ctx: &mut Context) -> Option<u8> {
        let ret = self.peek;
        self.current.length += self.peek_loc.length;
        self.peek = self.peek_next;
        self.peek_loc = self.peek_next_loc;
        self.peek_next = self.phase2.next(ctx);
        self.peek_next_loc = self.phase2.location();
        ret
    }

    // restart the current token location at the consumed character
    fn advance_overwrite(&mut self, ctx: &mut Context) -> Option<u8> {
        let ret = self.peek;
        self.current = self.peek_loc;
        self.peek = self.peek_next;
        self.peek_loc = self.peek_next_loc;
        self.peek_next = self.phase2.next(ctx);
        self.peek_next_loc = self.phase2.location();
        ret
    }

    fn matches(&mut self, ctx: &mut Context, c: u8) -> bool {
        if self.peek == Some(c) {
            self.advance(ctx);
            true
        } else {
            false
        }
    }

    // consume a newline of either byte order and mark the line break
    fn newline(&mut self, ctx: &mut Context, leading: &mut Leading, partner: u8) {
        self.advance(ctx);
        if self.peek == Some(partner) {
            self.advance(ctx);
        }
        leading.start_of_line = true;
        leading.render_start_of_line = true;
        leading.whitespace_before = true;
        leading.indent = 0;
    }

    // skip whitespace and comments, recording the flags of the next token;
    // a block comment counts as a single whitespace character
    fn skip_whitespace(&mut self, ctx: &mut Context) -> Leading {
        let mut leading = Leading::default();

        if self.at_start {
            leading.start_of_line = true;
            leading.render_start_of_line = true;
            self.at_start = false;
        }

        while let Some(c) = self.peek {
            match c {
                b' ' | b'\t' | 0x0B | 0x0C => {
                    leading.whitespace_before = true;
                    self.advance(ctx);
                    if c == b' ' {
                        leading.indent += 1;
                    } else if c == b'\t' {
                        leading.indent += ctx.options.tab_size;
                    }
                }
                b'\n' => self.newline(ctx, &mut leading, b'\r'),
                b'\r' => self.newline(ctx, &mut leading, b'\n'),
                b'/' if self.peek_next == Some(b'/') => {
                    self.advance_overwrite(ctx);
                    while let Some(c) = self.peek {
                        if c == b'\n' || c == b'\r' {
                            break;
                        }
                        self.advance(ctx);
                    }
                    match self.peek {
                        Some(b'\n') => self.newline(ctx, &mut leading, b'\r'),
                        Some(b'\r') => self.newline(ctx, &mut leading, b'\n'),
                        _ => {}
                    }
                    leading.whitespace_before = true;
                }
                b'/' if self.peek_next == Some(b'*') => {
                    self.advance_overwrite(ctx);
                    self.advance(ctx);
                    loop {
                        match self.peek {
                            None => {
                                ctx.diags.error(
                                    "Unterminated multi-line comment",
                                    self.current,
                                );
                                return leading;
                            }
                            Some(b'*') if self.peek_next == Some(b'/') => break,
                            Some(b'\n') => self.newline(ctx, &mut leading, b'\r'),
                            Some(b'\r') => self.newline(ctx, &mut leading, b'\n'),
                            Some(_) => {
                                self.advance(ctx);
                            }
                        }
                    }
                    self.advance(ctx);
                    self.advance(ctx);
                    leading.whitespace_before = true;
                    leading.indent += 1;
                }
                _ => break,
            }
        }

        leading
    }

    /// Produce the next preprocessing token
    pub fn next(&mut self, interner: &mut Interner, ctx: &mut Context) -> Token {
        let leading = self.skip_whitespace(ctx);

        if self.at_end() {
            let mut tok = Token::eof(self.peek_loc.collapsed());
            apply(&mut tok, leading);
            return tok;
        }

        let c = self.advance_overwrite(ctx).expect("checked not at end");
        let kind = self.lex_kind(interner, ctx, c);

        let mut tok = Token::new(kind, self.current);
        apply(&mut tok, leading);
        tok
    }

    fn lex_kind(&mut self, interner: &mut Interner, ctx: &mut Context, c: u8) -> TokenKind {
        use TokenKind::*;

        match c {
            b'[' => return LeftSquare,
            b']' => return RightSquare,
            b'(' => return LeftParen,
            b')' => return RightParen,
            b'{' => return LeftBrace,
            b'}' => return RightBrace,
            b'?' => return Question,
            b';' => return Semicolon,
            b',' => return Comma,
            b'~' => return Tilde,

            b'*' => return if self.matches(ctx, b'=') { StarEqual } else { Star },
            b'/' => return if self.matches(ctx, b'=') { SlashEqual } else { Slash },
            b'^' => return if self.matches(ctx, b'=') { CaretEqual } else { Caret },
            b'=' => return if self.matches(ctx, b'=') { EqualEqual } else { Equal },
            b'!' => return if self.matches(ctx, b'=') { BangEqual } else { Bang },
            b'#' => return if self.matches(ctx, b'#') { HashHash } else { Hash },
            b':' => return if self.matches(ctx, b'>') { ColonGreater } else { Colon },

            b'+' => {
                return if self.matches(ctx, b'+') {
                    PlusPlus
                } else if self.matches(ctx, b'=') {
                    PlusEqual
                } else {
                    Plus
                }
            }
            b'|' => {
                return if self.matches(ctx, b'|') {
                    PipePipe
                } else if self.matches(ctx, b'=') {
                    PipeEqual
                } else {
                    Pipe
                }
            }
            b'&' => {
                return if self.matches(ctx, b'&') {
                    AmpAmp
                } else if self.matches(ctx, b'=') {
                    AmpEqual
                } else {
                    Amp
                }
            }
            b'-' => {
                return if self.matches(ctx, b'>') {
                    Arrow
                } else if self.matches(ctx, b'-') {
                    MinusMinus
                } else if self.matches(ctx, b'=') {
                    MinusEqual
                } else {
                    Minus
                }
            }
            b'>' => {
                return if self.matches(ctx, b'=') {
                    GreaterEqual
                } else if self.matches(ctx, b'>') {
                    if self.matches(ctx, b'=') {
                        GreaterGreaterEqual
                    } else {
                        GreaterGreater
                    }
                } else {
                    Greater
                }
            }
            b'<' => {
                if self.mode == LexMode::MaybeHeader {
                    return self.lex_header_name(ctx, b'>');
                }
                return if self.matches(ctx, b'=') {
                    LessEqual
                } else if self.matches(ctx, b':') {
                    LessColon
                } else if self.matches(ctx, b'%') {
                    LessPercent
                } else if self.matches(ctx, b'<') {
                    if self.matches(ctx, b'=') {
                        LessLessEqual
                    } else {
                        LessLess
                    }
                } else {
                    Less
                };
            }
            b'%' => {
                return if self.matches(ctx, b'=') {
                    PercentEqual
                } else if self.matches(ctx, b'>') {
                    PercentGreater
                } else if self.matches(ctx, b':') {
                    if self.peek == Some(b'%') && self.peek_next == Some(b':') {
                        self.advance(ctx);
                        self.advance(ctx);
                        PercentColonPercentColon
                    } else {
                        PercentColon
                    }
                } else {
                    Percent
                };
            }
            b'.' => {
                if !self.peek.map_or(false, is_digit) {
                    return if self.peek == Some(b'.') && self.peek_next == Some(b'.') {
                        self.advance(ctx);
                        self.advance(ctx);
                        Ellipsis
                    } else {
                        Dot
                    };
                }
                // fall through: `.` followed by a digit starts a pp-number
            }
            _ => {}
        }

        if self.mode == LexMode::MaybeHeader && c == b'"' {
            return self.lex_header_name(ctx, b'"');
        }

        if self.is_string_like(c, b'"') {
            return self.lex_string(ctx, c, b'"');
        }
        if self.is_string_like(c, b'\'') {
            return self.lex_string(ctx, c, b'\'');
        }

        if is_nondigit(c)
            || (c == b'\\' && matches!(self.peek, Some(b'u') | Some(b'U')))
        {
            return self.lex_identifier(interner, ctx, c);
        }

        if is_digit(c) || c == b'.' {
            return self.lex_pp_number(ctx, c);
        }

        TokenKind::Unknown(c)
    }

    // encoding prefixes are only recognised immediately before the quote
    fn is_string_like(&self, c: u8, quote: u8) -> bool {
        c == quote
            || (matches!(c, b'u' | b'U' | b'L') && self.peek == Some(quote))
            || (c == b'u' && self.peek == Some(b'8') && self.peek_next == Some(quote))
    }

    // string and character literals; `\X` is kept as two raw characters,
    // escape interpretation belongs to a later phase
    fn lex_string(&mut self, ctx: &mut Context, c: u8, quote: u8) -> TokenKind {
        let encoding = if c == quote {
            StringEncoding::None
        } else if c == b'u' && self.peek == Some(b'8') {
            StringEncoding::Utf8
        } else if c == b'u' {
            StringEncoding::Char16
        } else if c == b'U' {
            StringEncoding::Char32
        } else {
            StringEncoding::Wide
        };

        match encoding {
            StringEncoding::Utf8 => {
                self.advance(ctx);
                self.advance(ctx);
            }
            StringEncoding::Char16 | StringEncoding::Char32 | StringEncoding::Wide => {
                self.advance(ctx);
            }
            StringEncoding::None => {}
        }

        let literal_kind = if quote == b'\'' { "character" } else { "string" };
        let mut text = Vec::new();
        while let Some(c) = self.peek {
            if c == quote {
                break;
            }
            self.advance(ctx);
            text.push(c);

            if c == b'\\' {
                if let Some(escaped) = self.advance(ctx) {
                    text.push(escaped);
                }
            } else if c == b'\n' {
                ctx.diags.error(
                    format!("{literal_kind} literal unterminated at end of line"),
                    self.current,
                );
                return TokenKind::Error;
            }
        }

        if quote == b'\'' && text.is_empty() {
            ctx.diags.error(
                "character literal requires at least one character",
                self.current,
            );
            return TokenKind::Error;
        }

        if self.advance(ctx) != Some(quote) {
            ctx.diags.error(
                format!("{literal_kind} literal unterminated at end of file"),
                self.current,
            );
            return TokenKind::Error;
        }

        let text = String::from_utf8_lossy(&text).into_owned();
        if quote == b'\'' {
            TokenKind::CharLit { text, encoding }
        } else {
            TokenKind::StringLit { text, encoding }
        }
    }

    // `<h-chars>` or `"q-chars"` per n1570 6.4.7
    fn lex_header_name(&mut self, ctx: &mut Context, end: u8) -> TokenKind {
        let mut text = Vec::new();
        loop {
            match self.peek {
                None => {
                    ctx.diags
                        .error("end of file while parsing header name", self.current);
                    return TokenKind::Error;
                }
                Some(b'\n') => {
                    ctx.diags
                        .error("new-line while parsing header name", self.current);
                    return TokenKind::Error;
                }
                Some(c) if c == end => {
                    self.advance(ctx);
                    break;
                }
                Some(c) => {
                    self.advance(ctx);
                    if c == b'\'' || c == b'\\' || (end == b'>' && c == b'"') {
                        ctx.diags.error(
                            format!(
                                "encountered `{}` while parsing header name - this is undefined behaviour",
                                c as char
                            ),
                            self.current,
                        );
                        return TokenKind::Error;
                    }
                    text.push(c);
                }
            }
        }

        if text.is_empty() {
            ctx.diags.error("empty file name in header file name", self.current);
            return TokenKind::Error;
        }

        let text = String::from_utf8_lossy(&text).into_owned();
        if end == b'>' {
            TokenKind::SysHeaderName(text)
        } else {
            TokenKind::HeaderName(text)
        }
    }

    // decode `\uXXXX` / `\UXXXXXXXX` after the backslash has been consumed,
    // range-check it and append its UTF-8 encoding
    fn lex_ucn(&mut self, ctx: &mut Context, text: &mut String) -> Result<(), ()> {
        let initial = self.advance(ctx);
        let digits = if initial == Some(b'u') { 4 } else { 8 };

        let mut value: u32 = 0;
        for _ in 0..digits {
            match self.advance(ctx) {
                Some(c) if is_hex_digit(c) => {
                    value = value << 4 | (c as char).to_digit(16).expect("hex digit");
                }
                _ => {
                    ctx.diags.error(
                        "non-hex digit found in universal character name",
                        self.current,
                    );
                    return Err(());
                }
            }
        }

        if (0xD800..=0xDFFF).contains(&value) {
            ctx.diags.error(
                "surrogate pair specified by universal character name",
                self.current,
            );
            return Err(());
        }
        if value < 0x00A0 && !matches!(value, 0x24 | 0x40 | 0x60) {
            ctx.diags.error(
                "universal character specified out of allowable range",
                self.current,
            );
            return Err(());
        }
        match char::from_u32(value) {
            Some(decoded) => {
                text.push(decoded);
                Ok(())
            }
            None => {
                ctx.diags.error(
                    "UCS code point out of range: Maximum = 0x10FFFF",
                    self.current,
                );
                Err(())
            }
        }
    }

    fn lex_identifier(
        &mut self,
        interner: &mut Interner,
        ctx: &mut Context,
        c: u8,
    ) -> TokenKind {
        let mut text = String::new();

        if c == b'\\' {
            if self.lex_ucn(ctx, &mut text).is_err() {
                return TokenKind::Error;
            }
        } else {
            text.push(c as char);
        }

        loop {
            match self.peek {
                Some(c) if is_nondigit(c) || is_digit(c) => {
                    self.advance(ctx);
                    text.push(c as char);
                }
                Some(b'\\') if matches!(self.peek_next, Some(b'u') | Some(b'U')) => {
                    self.advance(ctx);
                    if self.lex_ucn(ctx, &mut text).is_err() {
                        return TokenKind::Error;
                    }
                }
                _ => break,
            }
        }

        TokenKind::Identifier(interner.intern(&text))
    }

    fn lex_pp_number(&mut self, ctx: &mut Context, c: u8) -> TokenKind {
        let mut text = String::new();
        text.push(c as char);

        while let Some(c) = self.peek {
            if matches!(c, b'e' | b'E' | b'p' | b'P')
                && matches!(self.peek_next, Some(b'+') | Some(b'-'))
            {
                self.advance(ctx);
                let sign = self.advance(ctx).expect("peeked sign");
                text.push(c as char);
                text.push(sign as char);
            } else if is_digit(c) || is_nondigit(c) || c == b'.' {
                self.advance(ctx);
                text.push(c as char);
            } else {
                break;
            }
        }

        TokenKind::PpNumber(text)
    }
}

fn apply(tok: &mut Token, leading: Leading) {
    tok.start_of_line = leading.start_of_line;
    tok.render_start_of_line = leading.render_start_of_line;
    tok.whitespace_before = leading.whitespace_before;
    tok.indent = leading.indent;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase1::Phase1;
    use crate::source::SourceReader;
    use pretty_assertions::assert_eq;

    fn lex(text: &str) -> (Vec<Token>, Interner, Context) {
        let mut ctx = Context::default();
        let mut interner = Interner::new();
        let file = ctx.files.add_file("test.c");
        let phase1 = Phase1::new(SourceReader::new(text.as_bytes().to_vec(), file));
        let phase2 = Phase2::new(phase1, &mut ctx);
        let mut phase3 = Phase3::new(phase2, &mut ctx);

        let mut tokens = Vec::new();
        loop {
            let tok = phase3.next(&mut interner, &mut ctx);
            let eof = tok.is_eof();
            tokens.push(tok);
            if eof {
                break;
            }
        }
        (tokens, interner, ctx)
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_single_punctuators() {
        use TokenKind::*;
        assert_eq!(
            kinds("[](){};,~?:\n"),
            vec![
                LeftSquare, RightSquare, LeftParen, RightParen, LeftBrace, RightBrace,
                Semicolon, Comma, Tilde, Question, Colon, Eof
            ]
        );
    }

    #[test]
    fn test_maximal_munch() {
        use TokenKind::*;
        assert_eq!(
            kinds(">>= <<= ... ->\n"),
            vec![GreaterGreaterEqual, LessLessEqual, Ellipsis, Arrow, Eof]
        );
        assert_eq!(kinds("+++\n"), vec![PlusPlus, Plus, Eof]);
        assert_eq!(kinds("|= | ||\n"), vec![PipeEqual, Pipe, PipePipe, Eof]);
    }

    #[test]
    fn test_digraphs() {
        use TokenKind::*;
        assert_eq!(
            kinds("<: :> <% %> %: %:%:\n"),
            vec![
                LessColon, ColonGreater, LessPercent, PercentGreater, PercentColon,
                PercentColonPercentColon, Eof
            ]
        );
    }

    #[test]
    fn test_identifiers_interned() {
        let (tokens, interner, _) = lex("foo bar foo\n");
        match (&tokens[0].kind, &tokens[2].kind) {
            (TokenKind::Identifier(a), TokenKind::Identifier(b)) => {
                assert_eq!(a, b);
                assert_eq!(interner.name(*a), "foo");
            }
            other => panic!("expected identifiers, got {other:?}"),
        }
    }

    #[test]
    fn test_pp_numbers() {
        assert_eq!(
            kinds("1 .5 3e+7 0x1f 1.e4\n"),
            vec![
                TokenKind::PpNumber("1".into()),
                TokenKind::PpNumber(".5".into()),
                TokenKind::PpNumber("3e+7".into()),
                TokenKind::PpNumber("0x1f".into()),
                TokenKind::PpNumber("1.e4".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_string_literals_with_prefixes() {
        assert_eq!(
            kinds("\"abc\" u8\"x\" u\"y\" U\"z\" L\"w\"\n"),
            vec![
                TokenKind::StringLit { text: "abc".into(), encoding: StringEncoding::None },
                TokenKind::StringLit { text: "x".into(), encoding: StringEncoding::Utf8 },
                TokenKind::StringLit { text: "y".into(), encoding: StringEncoding::Char16 },
                TokenKind::StringLit { text: "z".into(), encoding: StringEncoding::Char32 },
                TokenKind::StringLit { text: "w".into(), encoding: StringEncoding::Wide },
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_prefix_requires_adjacency() {
        // `u8 "x"` is an identifier then a plain string
        let ks = kinds("u8 \"x\"\n");
        assert!(matches!(ks[0], TokenKind::Identifier(_)));
        assert_eq!(
            ks[1],
            TokenKind::StringLit { text: "x".into(), encoding: StringEncoding::None }
        );
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        assert_eq!(
            kinds("\"a\\\"b\"\n")[0],
            TokenKind::StringLit { text: "a\\\"b".into(), encoding: StringEncoding::None }
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let (tokens, _, ctx) = lex("\"abc\nx\n");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_comments_are_whitespace() {
        let (tokens, _, ctx) = lex("a/*x*/b//y\nc\n");
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(_)));
        assert!(matches!(tokens[1].kind, TokenKind::Identifier(_)));
        assert!(tokens[1].whitespace_before);
        assert!(tokens[2].start_of_line);
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, _, ctx) = lex("a /* no end\n");
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_start_of_line_and_indent() {
        let (tokens, _, _) = lex("a\n   b\n");
        assert!(tokens[0].start_of_line);
        assert!(tokens[1].start_of_line);
        assert_eq!(tokens[1].indent, 3);
        assert!(tokens[1].whitespace_before);
    }

    #[test]
    fn test_ucn_identifier() {
        let (tokens, interner, ctx) = lex("a\\u00E9b\n");
        match &tokens[0].kind {
            TokenKind::Identifier(id) => assert_eq!(interner.name(*id), "a\u{e9}b"),
            other => panic!("expected identifier, got {other:?}"),
        }
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_ucn_surrogate_rejected() {
        let (tokens, _, ctx) = lex("\\uD800\n");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_ucn_low_codepoints_rejected_except_special() {
        let (_, _, ctx) = lex("\\u0041\n");
        assert!(ctx.diags.has_errors());

        let (tokens, interner, ctx) = lex("\\u0024\n");
        match &tokens[0].kind {
            TokenKind::Identifier(id) => assert_eq!(interner.name(*id), "$"),
            other => panic!("expected identifier, got {other:?}"),
        }
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_trigraph_hash_position() {
        let (tokens, _, _) = lex("\n??=define\n");
        assert_eq!(tokens[0].kind, TokenKind::Hash);
        assert_eq!(tokens[0].loc.line, 2);
        assert_eq!(tokens[0].loc.column, 1);
        assert!(tokens[0].start_of_line);
    }

    #[test]
    fn test_line_splice_inside_identifier() {
        let (tokens, interner, _) = lex("ab\\\ncd\n");
        match &tokens[0].kind {
            TokenKind::Identifier(id) => assert_eq!(interner.name(*id), "abcd"),
            other => panic!("expected identifier, got {other:?}"),
        }
    }
}
