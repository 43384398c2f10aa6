//! AST serialization
//!
//! The whole AST derives `Serialize`, so a parse tree can be dumped as JSON
//! for tooling and for the `--print-ast` flag.

use crate::ast::TranslationUnit;

pub fn to_json(unit: &TranslationUnit) -> serde_json::Result<String> {
    serde_json::to_string_pretty(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;
    use mica_common::Context;
    use mica_lexer::SearchPaths;

    #[test]
    fn test_ast_serializes_to_json() {
        let mut ctx = Context::default();
        let (unit, _) = parse_source(
            "test.c",
            b"int f(int a) { return a + 1; }\n".to_vec(),
            SearchPaths::new(),
            &mut ctx,
        );
        assert!(!ctx.diags.has_errors());

        let json = to_json(&unit).unwrap();
        assert!(json.contains("\"declarations\""));
        assert!(json.contains("Binary"));
        assert!(json.contains("Return"));
    }
}
