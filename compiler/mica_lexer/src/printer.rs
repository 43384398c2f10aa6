//! Token stream printer
//!
//! Reconstructs source text from a token stream using the recorded line and
//! whitespace flags. When two adjacent tokens carry no whitespace between
//! them but re-lexing their concatenation would change the token sequence,
//! a single space is inserted (paste avoidance).

use crate::intern::Interner;
use crate::token::{Token, TokenKind};
use std::fmt::{self, Write};

/// Is a space required between `left` and `right` so the printed stream
/// re-lexes to the same tokens? Approximate equivalence classes: two
/// identifier-like tokens, two punctuator-like tokens, a pp-number followed
/// by anything that could extend it, and a prefixed literal after an
/// identifier-like token.
pub fn paste_avoidance(left: &Token, right: &Token) -> bool {
    if let TokenKind::PpNumber(text) = &left.kind {
        if right.kind == TokenKind::Dot {
            return true;
        }
        if matches!(text.bytes().last(), Some(b'e' | b'E' | b'p' | b'P'))
            && right.kind.could_extend_number()
        {
            return true;
        }
    }

    if let TokenKind::StringLit { encoding, .. } | TokenKind::CharLit { encoding, .. } =
        &right.kind
    {
        // only a name or number pastes onto an encoding prefix
        return matches!(left.kind, TokenKind::PpNumber(_) | TokenKind::Identifier(_))
            && *encoding != crate::token::StringEncoding::None;
    }

    (left.kind.is_identifier_like() && right.kind.is_identifier_like())
        || (left.kind.is_punctuator_like() && right.kind.is_punctuator_like())
}

fn punctuator_spelling(kind: &TokenKind) -> Option<&'static str> {
    use TokenKind::*;
    Some(match kind {
        LeftSquare => "[",
        RightSquare => "]",
        LeftParen => "(",
        RightParen => ")",
        LeftBrace => "{",
        RightBrace => "}",
        Dot => ".",
        Arrow => "->",
        PlusPlus => "++",
        MinusMinus => "--",
        Amp => "&",
        Star => "*",
        Plus => "+",
        Minus => "-",
        Tilde => "~",
        Bang => "!",
        Slash => "/",
        Percent => "%",
        LessLess => "<<",
        GreaterGreater => ">>",
        Less => "<",
        Greater => ">",
        LessEqual => "<=",
        GreaterEqual => ">=",
        EqualEqual => "==",
        BangEqual => "!=",
        Caret => "^",
        Pipe => "|",
        AmpAmp => "&&",
        PipePipe => "||",
        Question => "?",
        Colon => ":",
        Semicolon => ";",
        Ellipsis => "...",
        Equal => "=",
        StarEqual => "*=",
        SlashEqual => "/=",
        PercentEqual => "%=",
        PlusEqual => "+=",
        MinusEqual => "-=",
        LessLessEqual => "<<=",
        GreaterGreaterEqual => ">>=",
        AmpEqual => "&=",
        CaretEqual => "^=",
        PipeEqual => "|=",
        Comma => ",",
        Hash => "#",
        HashHash => "##",
        LessColon => "<:",
        ColonGreater => ":>",
        LessPercent => "<%",
        PercentGreater => "%>",
        PercentColon => "%:",
        PercentColonPercentColon => "%:%:",
        _ => return None,
    })
}

/// Stateful printer for a stream of preprocessing tokens
#[derive(Debug)]
pub struct TokenPrinter {
    at_start: bool,
    previous: Option<Token>,
}

impl Default for TokenPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenPrinter {
    pub fn new() -> Self {
        Self { at_start: true, previous: None }
    }

    pub fn print(
        &mut self,
        out: &mut impl Write,
        interner: &Interner,
        tok: &Token,
    ) -> fmt::Result {
        let mut printed_whitespace = false;
        if tok.render_start_of_line && !self.at_start {
            out.write_char('\n')?;
            printed_whitespace = true;
        }
        self.at_start = false;
        if tok.whitespace_before {
            for _ in 0..tok.indent {
                out.write_char(' ')?;
            }
            printed_whitespace |= tok.indent > 0;
        }
        if !printed_whitespace {
            if let Some(prev) = &self.previous {
                if paste_avoidance(prev, tok) {
                    out.write_char(' ')?;
                }
            }
        }

        match &tok.kind {
            TokenKind::HeaderName(name) => write!(out, "\"{name}\"")?,
            TokenKind::SysHeaderName(name) => write!(out, "<{name}>")?,
            TokenKind::PpNumber(text) => out.write_str(text)?,
            TokenKind::Identifier(id) => out.write_str(interner.name(*id))?,
            TokenKind::Integer(value) => write!(out, "{value}")?,
            TokenKind::Floating(text) => out.write_str(text)?,
            TokenKind::CharLit { text, encoding } => {
                write!(out, "{}'{text}'", encoding.prefix())?
            }
            TokenKind::StringLit { text, encoding } => {
                write!(out, "{}\"{text}\"", encoding.prefix())?
            }
            TokenKind::MacroArg(index) => write!(out, "argument({index})")?,
            TokenKind::Unknown(c) => out.write_char(*c as char)?,
            TokenKind::Error => out.write_str("error token")?,
            TokenKind::Eof => {}
            punct => {
                out.write_str(punctuator_spelling(punct).expect("punctuator spelling"))?
            }
        }

        self.previous = Some(tok.clone());
        Ok(())
    }
}
