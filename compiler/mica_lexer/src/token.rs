//! Preprocessing token definitions

use crate::intern::NodeId;
use mica_common::SourceLocation;
use serde::{Deserialize, Serialize};

/// Encoding prefix of a string or character literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringEncoding {
    None,
    Utf8,
    Char16,
    Char32,
    Wide,
}

impl StringEncoding {
    pub fn prefix(self) -> &'static str {
        match self {
            StringEncoding::None => "",
            StringEncoding::Utf8 => "u8",
            StringEncoding::Char16 => "u",
            StringEncoding::Char32 => "U",
            StringEncoding::Wide => "L",
        }
    }
}

/// Preprocessing token kinds. Keywords do not exist at this level; they are
/// recognised from identifier spellings when tokens are cooked for the
/// parser. Floating payloads keep their spelling so tokens stay comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Punctuators
    LeftSquare,
    RightSquare,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Dot,
    Arrow,
    PlusPlus,
    MinusMinus,
    Amp,
    Star,
    Plus,
    Minus,
    Tilde,
    Bang,
    Slash,
    Percent,
    LessLess,
    GreaterGreater,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    BangEqual,
    Caret,
    Pipe,
    AmpAmp,
    PipePipe,
    Question,
    Colon,
    Semicolon,
    Ellipsis,
    Equal,
    StarEqual,
    SlashEqual,
    PercentEqual,
    PlusEqual,
    MinusEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    AmpEqual,
    CaretEqual,
    PipeEqual,
    Comma,
    Hash,
    HashHash,
    // Digraphs keep their own kinds so the printer can reproduce them
    LessColon,            // [
    ColonGreater,         // ]
    LessPercent,          // {
    PercentGreater,       // }
    PercentColon,         // #
    PercentColonPercentColon, // ##

    HeaderName(String),
    SysHeaderName(String),
    PpNumber(String),
    Identifier(NodeId),
    Integer(i64),
    Floating(String),
    CharLit { text: String, encoding: StringEncoding },
    StringLit { text: String, encoding: StringEncoding },
    /// Placeholder for parameter `n` inside a function-macro replacement list
    MacroArg(usize),
    Unknown(u8),
    Error,
    Eof,
}

impl TokenKind {
    pub fn is_eof(&self) -> bool {
        matches!(self, TokenKind::Eof)
    }

    /// Tokens that re-lex as one unit when run together with another
    /// identifier-like token
    pub fn is_identifier_like(&self) -> bool {
        matches!(
            self,
            TokenKind::PpNumber(_)
                | TokenKind::Identifier(_)
                | TokenKind::CharLit { .. }
                | TokenKind::StringLit { .. }
        )
    }

    /// Punctuators that can extend into longer punctuators
    pub fn is_punctuator_like(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Dot | Arrow
                | PlusPlus
                | MinusMinus
                | Amp
                | Star
                | Plus
                | Minus
                | Tilde
                | Bang
                | Slash
                | Percent
                | LessLess
                | GreaterGreater
                | Less
                | Greater
                | LessEqual
                | GreaterEqual
                | EqualEqual
                | BangEqual
                | Caret
                | Pipe
                | AmpAmp
                | PipePipe
                | Question
                | Colon
                | Ellipsis
                | Equal
                | StarEqual
                | SlashEqual
                | PercentEqual
                | PlusEqual
                | MinusEqual
                | LessLessEqual
                | GreaterGreaterEqual
                | AmpEqual
                | CaretEqual
                | PipeEqual
                | Hash
                | HashHash
                | LessColon
                | ColonGreater
                | LessPercent
                | PercentGreater
                | PercentColon
                | PercentColonPercentColon
        )
    }

    /// Tokens that could continue a pp-number if pasted directly after one
    pub fn could_extend_number(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Arrow | PlusPlus | MinusMinus | Plus | Minus | PlusEqual | MinusEqual
        )
    }
}

/// A preprocessing token with its location and whitespace bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLocation,

    /// First token on a logical line; directives key off this
    pub start_of_line: bool,
    /// Should the printer start a new line before this token
    pub render_start_of_line: bool,
    /// Any whitespace (including comments) preceded this token
    pub whitespace_before: bool,
    /// Column count of leading whitespace on the token's line
    pub indent: u32,
}

impl Token {
    pub fn new(kind: TokenKind, loc: SourceLocation) -> Self {
        Self {
            kind,
            loc,
            start_of_line: false,
            render_start_of_line: false,
            whitespace_before: false,
            indent: 0,
        }
    }

    pub fn eof(loc: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, loc)
    }

    pub fn is_eof(&self) -> bool {
        self.kind.is_eof()
    }

    /// Copy the whitespace presentation of `other` onto this token; used
    /// when the first token of a macro expansion replaces the macro name
    pub fn inherit_spacing(&mut self, other: &Token) {
        self.indent = other.indent;
        self.render_start_of_line = other.render_start_of_line;
        self.whitespace_before = other.whitespace_before;
    }
}
