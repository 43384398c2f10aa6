//! Lexical pipeline for the mica C compiler
//!
//! Implements the first four C translation phases as pull-driven streams:
//! phase 1 (charset handling and trigraphs), phase 2 (line splicing),
//! phase 3 (preprocessing tokens) and phase 4 (macro expansion and
//! directive execution). Each phase exposes the next unit on demand; the
//! consumer drives the whole stack.

pub mod includes;
pub mod intern;
pub mod phase1;
pub mod phase2;
pub mod phase3;
pub mod phase4;
pub mod printer;
pub mod source;
pub mod token;

pub use includes::{IncludeSearchState, SearchPaths};
pub use intern::{string_hash, FnMacro, HashNode, Interner, MacroDef, NodeId};
pub use phase1::Phase1;
pub use phase2::Phase2;
pub use phase3::{LexMode, Phase3};
pub use phase4::Preprocessor;
pub use printer::TokenPrinter;
pub use source::SourceReader;
pub use token::{StringEncoding, Token, TokenKind};
