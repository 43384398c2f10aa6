//! Preprocessor behaviour: expansion, blue paint, includes, built-ins

use mica_common::Context;
use mica_lexer::{Preprocessor, SearchPaths, Token, TokenKind};
use pretty_assertions::assert_eq;
use std::fs;

fn preprocess_with(search: SearchPaths, text: &str) -> (Vec<Token>, Preprocessor, Context) {
    let mut ctx = Context::default();
    let mut pp = Preprocessor::new("test.c", text.as_bytes().to_vec(), search, &mut ctx);
    let mut tokens = Vec::new();
    loop {
        let tok = pp.next_token(&mut ctx);
        let eof = tok.is_eof();
        tokens.push(tok);
        if eof {
            break;
        }
    }
    (tokens, pp, ctx)
}

fn preprocess(text: &str) -> (Vec<Token>, Preprocessor, Context) {
    preprocess_with(SearchPaths::new(), text)
}

// token kinds with identifier spellings resolved
fn spellings(tokens: &[Token], pp: &Preprocessor) -> Vec<String> {
    tokens
        .iter()
        .map(|t| match &t.kind {
            TokenKind::Identifier(id) => pp.interner().name(*id).to_owned(),
            TokenKind::PpNumber(text) => text.clone(),
            TokenKind::Integer(value) => value.to_string(),
            TokenKind::StringLit { text, .. } => format!("\"{text}\""),
            other => format!("{other:?}"),
        })
        .collect()
}

#[test]
fn test_object_macro_expansion() {
    let (tokens, pp, ctx) = preprocess("#define X 1+2\nX*3\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(
        spellings(&tokens, &pp),
        vec!["1", "Plus", "2", "Star", "3", "Eof"]
    );
}

#[test]
fn test_function_macro_expansion() {
    let (tokens, pp, ctx) = preprocess("#define F(a,b) a+b\nF(1,2)\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["1", "Plus", "2", "Eof"]);
}

#[test]
fn test_function_macro_parenthesised_argument() {
    let (tokens, pp, ctx) = preprocess("#define F(a,b) a+b\nF((1,2),3)\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(
        spellings(&tokens, &pp),
        vec!["LeftParen", "1", "Comma", "2", "RightParen", "Plus", "3", "Eof"]
    );
}

#[test]
fn test_function_macro_without_call_is_left_alone() {
    let (tokens, pp, ctx) = preprocess("#define F(a) a\nF;\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["F", "Semicolon", "Eof"]);
}

#[test]
fn test_self_reference_blue_paint() {
    let (tokens, pp, ctx) = preprocess("#define X X+1\nX\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["X", "Plus", "1", "Eof"]);
}

#[test]
fn test_mutual_recursion_stops() {
    let (tokens, pp, ctx) = preprocess("#define A B\n#define B A\nA\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["A", "Eof"]);
}

#[test]
fn test_rescan_consumes_following_call() {
    // G expands to F; the rescans picks up the () from the stream
    let (tokens, pp, ctx) = preprocess("#define F() 7\n#define G F\nG()\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["7", "Eof"]);
}

#[test]
fn test_variadic_macro() {
    let (tokens, pp, ctx) = preprocess("#define V(a, ...) a: __VA_ARGS__\nV(1, 2, 3)\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(
        spellings(&tokens, &pp),
        vec!["1", "Colon", "2", "Comma", "3", "Eof"]
    );
}

#[test]
fn test_va_args_outside_variadic_macro_errors() {
    let (_, _, ctx) = preprocess("#define X __VA_ARGS__\n");
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_undef() {
    let (tokens, pp, ctx) = preprocess("#define X 1\n#undef X\nX\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["X", "Eof"]);
}

#[test]
fn test_empty_expansion_disappears() {
    let (tokens, pp, ctx) = preprocess("#define NOTHING\na NOTHING b\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["a", "b", "Eof"]);
}

#[test]
fn test_unterminated_call_is_error() {
    let (_, _, ctx) = preprocess("#define F(a) a\nF(1\n");
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_predefined_macros() {
    let (tokens, pp, ctx) = preprocess("__STDC__ __STDC_VERSION__\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["1", "201112", "Eof"]);
}

#[test]
fn test_line_macro() {
    let (tokens, pp, ctx) = preprocess("a\nb __LINE__\n");
    assert!(!ctx.diags.has_errors());
    // evaluated against the previous base-layer token, which is `b` on line 2
    assert_eq!(spellings(&tokens, &pp), vec!["a", "b", "2", "Eof"]);
}

fn include_tree() -> (tempfile::TempDir, SearchPaths) {
    let dir = tempfile::tempdir().unwrap();
    let mut search = SearchPaths::new();
    search.add_user(dir.path().to_path_buf());
    (dir, search)
}

#[test]
fn test_include_expansion() {
    let (dir, search) = include_tree();
    fs::write(dir.path().join("val.h"), "#define VALUE 42\n").unwrap();

    let (tokens, pp, ctx) = preprocess_with(search, "#include \"val.h\"\nVALUE\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["42", "Eof"]);
}

#[test]
fn test_unresolved_include_is_error() {
    let (_, _, ctx) = preprocess("#include \"missing.h\"\n");
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_file_macro_tracks_includes() {
    let (dir, search) = include_tree();
    fs::write(dir.path().join("inner.h"), "x __FILE__\n").unwrap();

    let (tokens, pp, ctx) =
        preprocess_with(search, "#include \"inner.h\"\ny __FILE__\n");
    assert!(!ctx.diags.has_errors());

    let spelled = spellings(&tokens, &pp);
    assert_eq!(spelled[0], "x");
    assert!(spelled[1].contains("inner.h"), "got {:?}", spelled[1]);
    assert_eq!(spelled[2], "y");
    assert_eq!(spelled[3], "\"test.c\"");
}

fn include_chain(depth: usize) -> (tempfile::TempDir, SearchPaths, String) {
    let (dir, search) = include_tree();
    for i in 1..depth {
        fs::write(
            dir.path().join(format!("f{i}.h")),
            format!("#include \"f{}.h\"\n", i + 1),
        )
        .unwrap();
    }
    fs::write(dir.path().join(format!("f{depth}.h")), "ok\n").unwrap();
    (dir, search, "#include \"f1.h\"\n".to_owned())
}

#[test]
fn test_include_depth_fifteen_succeeds() {
    let (_dir, search, main) = include_chain(15);
    let (tokens, pp, ctx) = preprocess_with(search, &main);
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["ok", "Eof"]);
}

#[test]
fn test_include_depth_sixteen_fails() {
    let (_dir, search, main) = include_chain(16);
    let (_, _, ctx) = preprocess_with(search, &main);
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_include_next_continues_search() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    // the wrapper header in the first directory defers to the real header
    // of the same name further down the search path
    fs::write(first.path().join("x.h"), "one\n#include_next \"x.h\"\n").unwrap();
    fs::write(second.path().join("x.h"), "two\n").unwrap();

    let mut search = SearchPaths::new();
    search.add_user(first.path().to_path_buf());
    search.add_user(second.path().to_path_buf());

    let (tokens, pp, ctx) = preprocess_with(search, "#include \"x.h\"\n");
    assert!(!ctx.diags.has_errors());
    assert_eq!(spellings(&tokens, &pp), vec!["one", "two", "Eof"]);
}

#[test]
fn test_null_and_unknown_directives() {
    let (tokens, pp, ctx) = preprocess("#\n#pragma once\nx\n");
    assert!(!ctx.diags.has_errors());
    // the unknown directive is passed through
    assert_eq!(
        spellings(&tokens, &pp),
        vec!["Hash", "pragma", "once", "x", "Eof"]
    );
}
