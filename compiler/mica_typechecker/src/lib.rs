//! Semantic analysis for the mica C compiler
//!
//! A single post-order walk over the AST that resolves every expression's
//! type, enforces the lvalue rules, fuses `&*e` pairs, and checks that
//! `break`/`continue` appear inside a loop. Analysis mutates the AST in
//! place; after a clean run every expression node carries a type.

mod analyzer;

pub use analyzer::analyze;
