//! Token cooking: preprocessing tokens to parse tokens
//!
//! The later translation phases folded into one conversion: keyword
//! recognition over identifier spellings, pp-number to integer constant
//! conversion, and digraphs folded onto their primary punctuators. Tokens
//! the C subset has no use for come out as error tokens for the parser to
//! report.

use crate::token::{CToken, CTokenKind};
use mica_common::Context;
use mica_lexer::{Preprocessor, TokenKind};

fn keyword(name: &str) -> Option<CTokenKind> {
    Some(match name {
        "int" => CTokenKind::Int,
        "if" => CTokenKind::If,
        "else" => CTokenKind::Else,
        "while" => CTokenKind::While,
        "for" => CTokenKind::For,
        "do" => CTokenKind::Do,
        "break" => CTokenKind::Break,
        "continue" => CTokenKind::Continue,
        "return" => CTokenKind::Return,
        "sizeof" => CTokenKind::Sizeof,
        _ => return None,
    })
}

/// Pulls phase-4 tokens and converts them to parse tokens on demand
#[derive(Debug)]
pub struct TokenCooker {
    pp: Preprocessor,
}

impl TokenCooker {
    pub fn new(pp: Preprocessor) -> Self {
        Self { pp }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.pp
    }

    pub fn next(&mut self, ctx: &mut Context) -> CToken {
        let tok = self.pp.next_token(ctx);
        let loc = tok.loc;

        let kind = match tok.kind {
            TokenKind::Identifier(id) => {
                let name = self.pp.interner().name(id);
                keyword(name).unwrap_or_else(|| CTokenKind::Identifier(name.to_owned()))
            }
            TokenKind::PpNumber(text) => match text.parse::<i64>() {
                Ok(value) => CTokenKind::IntegerLit(value),
                Err(_) => {
                    ctx.diags.error(
                        format!("unsupported integer literal '{text}'"),
                        loc,
                    );
                    CTokenKind::Error
                }
            },
            TokenKind::Integer(value) => CTokenKind::IntegerLit(value),

            TokenKind::LeftParen => CTokenKind::LeftParen,
            TokenKind::RightParen => CTokenKind::RightParen,
            TokenKind::LeftBrace | TokenKind::LessPercent => CTokenKind::LeftBrace,
            TokenKind::RightBrace | TokenKind::PercentGreater => CTokenKind::RightBrace,
            TokenKind::LeftSquare | TokenKind::LessColon => CTokenKind::LeftSquare,
            TokenKind::RightSquare | TokenKind::ColonGreater => CTokenKind::RightSquare,
            TokenKind::Semicolon => CTokenKind::Semicolon,
            TokenKind::Comma => CTokenKind::Comma,
            TokenKind::Question => CTokenKind::Question,
            TokenKind::Colon => CTokenKind::Colon,

            TokenKind::Plus => CTokenKind::Plus,
            TokenKind::Minus => CTokenKind::Minus,
            TokenKind::Star => CTokenKind::Star,
            TokenKind::Slash => CTokenKind::Slash,
            TokenKind::Percent => CTokenKind::Percent,
            TokenKind::Tilde => CTokenKind::Tilde,
            TokenKind::Bang => CTokenKind::Bang,
            TokenKind::Amp => CTokenKind::Amp,
            TokenKind::Pipe => CTokenKind::Pipe,
            TokenKind::Caret => CTokenKind::Caret,
            TokenKind::LessLess => CTokenKind::LessLess,
            TokenKind::GreaterGreater => CTokenKind::GreaterGreater,
            TokenKind::AmpAmp => CTokenKind::AmpAmp,
            TokenKind::PipePipe => CTokenKind::PipePipe,
            TokenKind::Less => CTokenKind::Less,
            TokenKind::LessEqual => CTokenKind::LessEqual,
            TokenKind::Greater => CTokenKind::Greater,
            TokenKind::GreaterEqual => CTokenKind::GreaterEqual,
            TokenKind::EqualEqual => CTokenKind::EqualEqual,
            TokenKind::BangEqual => CTokenKind::BangEqual,

            TokenKind::Equal => CTokenKind::Equal,
            TokenKind::PlusEqual => CTokenKind::PlusEqual,
            TokenKind::MinusEqual => CTokenKind::MinusEqual,
            TokenKind::StarEqual => CTokenKind::StarEqual,
            TokenKind::SlashEqual => CTokenKind::SlashEqual,
            TokenKind::PercentEqual => CTokenKind::PercentEqual,
            TokenKind::LessLessEqual => CTokenKind::LessLessEqual,
            TokenKind::GreaterGreaterEqual => CTokenKind::GreaterGreaterEqual,
            TokenKind::AmpEqual => CTokenKind::AmpEqual,
            TokenKind::CaretEqual => CTokenKind::CaretEqual,
            TokenKind::PipeEqual => CTokenKind::PipeEqual,

            TokenKind::PlusPlus => CTokenKind::PlusPlus,
            TokenKind::MinusMinus => CTokenKind::MinusMinus,

            TokenKind::Eof => CTokenKind::Eof,

            // everything else has no place in the accepted subset
            _ => CTokenKind::Error,
        };

        CToken::new(kind, loc)
    }
}
