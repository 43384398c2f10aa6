//! Parser integration tests over the full lexical pipeline

use mica_common::Context;
use mica_lexer::SearchPaths;
use mica_parser::*;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn parse(text: &str) -> (TranslationUnit, SymbolTable, Context) {
    let mut ctx = Context::default();
    let (unit, symbols) =
        parse_source("test.c", text.as_bytes().to_vec(), SearchPaths::new(), &mut ctx);
    (unit, symbols, ctx)
}

fn parse_ok(text: &str) -> (TranslationUnit, SymbolTable) {
    let (unit, symbols, ctx) = parse(text);
    assert!(
        !ctx.diags.has_errors(),
        "unexpected errors: {:?}",
        ctx.diags.messages
    );
    (unit, symbols)
}

// the sole expression statement of `int f() { ...; }`
fn only_statement(unit: &TranslationUnit) -> &Stmt {
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected a function definition");
    };
    match &body.items[body.items.len() - 1] {
        BlockItem::Statement(stmt) => stmt,
        other => panic!("expected statement, got {other:?}"),
    }
}

#[test]
fn test_function_definition_parses() {
    let (unit, _) = parse_ok("int main() { return 0; }\n");
    assert_eq!(unit.declarations.len(), 1);
    let init = &unit.declarations[0].declarators[0];
    assert!(matches!(init.kind, InitDeclKind::Function(Some(_))));
    assert!(init.declarator.ty.is_function());
}

#[test]
fn test_declarator_pointer_to_function() {
    // pointer to function(int) returning pointer to int
    let (unit, _) = parse_ok("int *(*f)(int);\n");
    let ty = &unit.declarations[0].declarators[0].declarator.ty;

    let expected: TypeRef = Rc::new(VarType::Pointer(Rc::new(VarType::Function(FnType {
        ret: Rc::new(VarType::Pointer(VarType::int())),
        params: vec![Declarator {
            symbol: None,
            ty: VarType::int(),
            loc: mica_common::SourceLocation::start(mica_common::FileId(0)),
            redeclared: false,
        }],
    }))));

    assert_eq!(**ty, *expected);
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let (unit, _) = parse_ok("int f() { return 1 + 2 * 3; }\n");
    let Stmt::Jump(JumpStmt::Return { expr, .. }) = only_statement(&unit) else {
        panic!("expected return");
    };
    let ExprKind::Binary { op, right, .. } = &expr.kind else {
        panic!("expected binary, got {:?}", expr.kind);
    };
    assert_eq!(op.kind, CTokenKind::Plus);
    assert!(matches!(
        &right.kind,
        ExprKind::Binary { op, .. } if op.kind == CTokenKind::Star
    ));
}

#[test]
fn test_assignment_is_right_associative() {
    let (unit, _) = parse_ok("int f() { int a; int b; a = b = 1; return a; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Expression(expr)) = &body.items[2] else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { value, .. } = &expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(&value.kind, ExprKind::Assign { .. }));
}

#[test]
fn test_pre_increment_desugars_to_compound_assign() {
    let (unit, _) = parse_ok("int f() { int x = 0; ++x; return x; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Expression(expr)) = &body.items[1] else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { op, value, .. } = &expr.kind else {
        panic!("expected assignment, got {:?}", expr.kind);
    };
    assert_eq!(op.kind, CTokenKind::PlusEqual);
    assert!(matches!(
        &value.kind,
        ExprKind::Constant(Constant::Integer { value: 1, .. })
    ));
}

#[test]
fn test_post_increment_is_postfix_node() {
    let (unit, _) = parse_ok("int f() { int x = 0; x++; return x; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Expression(expr)) = &body.items[1] else {
        panic!("expected expression statement");
    };
    assert!(matches!(&expr.kind, ExprKind::Postfix { .. }));
}

#[test]
fn test_ternary_parses() {
    let (unit, _) = parse_ok("int f(int c) { return c ? 1 : 2; }\n");
    let Stmt::Jump(JumpStmt::Return { expr, .. }) = only_statement(&unit) else {
        panic!("expected return");
    };
    assert!(matches!(&expr.kind, ExprKind::Ternary { .. }));
}

#[test]
fn test_loop_statements_parse() {
    parse_ok("int f(int n) { while (n) n = n - 1; return n; }\n");
    parse_ok("int f(int n) { do n = n - 1; while (n); return n; }\n");
    parse_ok("int f() { for (int i = 0; i < 10; ++i) ; return 0; }\n");
    parse_ok("int f() { for (;;) break; return 0; }\n");
    parse_ok("int f(int n) { while (n) { if (n == 2) continue; n = n - 1; } return n; }\n");
}

#[test]
fn test_scopes_shadow_and_pop() {
    let (unit, _) = parse_ok("int f() { int x = 1; { int x = 2; x; } return x; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Compound(inner)) = &body.items[1] else {
        panic!("expected compound statement");
    };
    assert_eq!(inner.pop_count, 1);
}

#[test]
fn test_undeclared_variable_is_error() {
    let (_, _, ctx) = parse("int f() { return y; }\n");
    assert!(ctx.diags.has_errors());
}

#[test]
fn test_recovery_reports_multiple_errors() {
    let (unit, _, ctx) = parse(
        "int f() { return @; }\nint g() { return 1; }\n",
    );
    assert!(ctx.diags.has_errors());
    // the second function survives recovery
    assert_eq!(unit.declarations.len(), 2);
    let second = &unit.declarations[1].declarators[0];
    assert!(matches!(second.kind, InitDeclKind::Function(Some(_))));
}

#[test]
fn test_prototype_then_definition_share_symbol() {
    let (unit, _) = parse_ok("int f(int a);\nint f(int a) { return a; }\n");
    let proto = &unit.declarations[0].declarators[0];
    let def = &unit.declarations[1].declarators[0];
    assert!(matches!(proto.kind, InitDeclKind::Function(None)));
    assert!(matches!(def.kind, InitDeclKind::Function(Some(_))));
    assert!(def.declarator.redeclared);
    assert_eq!(proto.declarator.symbol, def.declarator.symbol);
}

#[test]
fn test_call_parses_arguments() {
    let (unit, _) = parse_ok(
        "int add(int a, int b) { return a + b; }\nint f() { return add(1, 2); }\n",
    );
    let decl = &unit.declarations[1].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Jump(JumpStmt::Return { expr, .. })) = &body.items[0]
    else {
        panic!("expected return");
    };
    let ExprKind::Call { args, .. } = &expr.kind else {
        panic!("expected call, got {:?}", expr.kind);
    };
    assert_eq!(args.len(), 2);
}

#[test]
fn test_comma_in_call_needs_parentheses() {
    let (unit, _) = parse_ok(
        "int one(int a) { return a; }\nint f() { return one((1, 2)); }\n",
    );
    let decl = &unit.declarations[1].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Jump(JumpStmt::Return { expr, .. })) = &body.items[0]
    else {
        panic!("expected return");
    };
    let ExprKind::Call { args, .. } = &expr.kind else {
        panic!("expected call");
    };
    // `(1, 2)` is one argument: a parenthesised comma expression
    assert_eq!(args.len(), 1);
    assert!(matches!(
        &args[0].kind,
        ExprKind::Binary { op, .. } if op.kind == CTokenKind::Comma
    ));
}
