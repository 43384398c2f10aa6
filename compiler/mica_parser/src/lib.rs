//! Syntax analysis for the mica C compiler
//!
//! Cooks preprocessing tokens into parse tokens, then builds a typed AST
//! with a Pratt expression parser and declarator disambiguation via
//! token-stack replay. A lexically scoped symbol table is built alongside
//! the AST.

pub mod ast;
pub mod cook;
pub mod parser;
pub mod serialization;
pub mod symbol_table;
pub mod token;

pub use ast::*;
pub use cook::TokenCooker;
pub use parser::Parser;
pub use symbol_table::{Symbol, SymbolId, SymbolTable};
pub use token::{CToken, CTokenKind};

use mica_common::Context;
use mica_lexer::{Preprocessor, SearchPaths};

/// Run the full front half of the pipeline over one source buffer:
/// phases 1-4, token cooking and parsing. Errors land in `ctx.diags`.
pub fn parse_source(
    name: &str,
    bytes: Vec<u8>,
    search: SearchPaths,
    ctx: &mut Context,
) -> (TranslationUnit, SymbolTable) {
    let pp = Preprocessor::new(name, bytes, search, ctx);
    let cooker = TokenCooker::new(pp);
    let mut parser = Parser::new(cooker, ctx);
    let unit = parser.parse();
    let (_, symbols) = parser.into_parts();
    (unit, symbols)
}
