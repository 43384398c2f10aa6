//! Semantic analysis integration tests

use mica_common::Context;
use mica_lexer::SearchPaths;
use mica_parser::{
    parse_source, BlockItem, CTokenKind, ExprKind, InitDeclKind, JumpStmt, Stmt,
    TranslationUnit, VarType,
};
use mica_typechecker::analyze;

fn check(text: &str) -> (TranslationUnit, Context) {
    let mut ctx = Context::default();
    let (mut unit, symbols) =
        parse_source("test.c", text.as_bytes().to_vec(), SearchPaths::new(), &mut ctx);
    if !ctx.diags.has_errors() {
        analyze(&mut unit, &symbols, &mut ctx);
    }
    (unit, ctx)
}

fn check_ok(text: &str) -> TranslationUnit {
    let (unit, ctx) = check(text);
    assert!(
        !ctx.diags.has_errors(),
        "unexpected errors: {:?}",
        ctx.diags.messages
    );
    unit
}

fn check_err(text: &str, needle: &str) {
    let (_, ctx) = check(text);
    assert!(
        ctx.diags.errors().any(|d| d.message.contains(needle)),
        "expected error containing {needle:?}, got {:?}",
        ctx.diags.messages
    );
}

#[test]
fn test_assignment_type_checks() {
    check_ok("int f() { int x; x = 1; return x; }\n");
}

#[test]
fn test_assignment_to_rvalue_rejected() {
    check_err("int f() { int x; 1 = x; return x; }\n", "Operand must be an lvalue");
}

#[test]
fn test_deref_assignment_is_lvalue_of_pointee_type() {
    let unit = check_ok("int f(int* p) { *p = 1; return *p; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Expression(assign)) = &body.items[0] else {
        panic!("expected expression statement");
    };
    let ExprKind::Assign { target, .. } = &assign.kind else {
        panic!("expected assignment");
    };
    assert!(target.is_lvalue);
    assert!(matches!(target.ty.as_deref(), Some(VarType::Int)));
}

#[test]
fn test_deref_of_non_pointer_rejected() {
    check_err("int f() { int x; *x; return 0; }\n", "Cannot dereference non pointer");
}

#[test]
fn test_break_outside_loop_rejected() {
    check_err("int f() { break; return 0; }\n", "break or continue");
    check_err("int f() { continue; return 0; }\n", "break or continue");
}

#[test]
fn test_break_inside_loops_accepted() {
    check_ok("int f(int n) { while (n) break; return n; }\n");
    check_ok("int f() { for (;;) break; return 0; }\n");
    check_ok("int f(int n) { do break; while (n); return n; }\n");
    check_ok("int f(int n) { while (n) { if (n) continue; } return n; }\n");
}

#[test]
fn test_address_of_deref_is_elided() {
    let unit = check_ok("int f(int* p) { return *&*p; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Jump(JumpStmt::Return { expr, .. })) = &body.items[0]
    else {
        panic!("expected return");
    };
    // outermost is `*`, whose operand `&*p` has both halves flagged
    let ExprKind::Unary { operand: amp, elide: false, .. } = &expr.kind else {
        panic!("expected deref, got {:?}", expr.kind);
    };
    let ExprKind::Unary { op, operand: star, elide: true } = &amp.kind else {
        panic!("expected elided address-of, got {:?}", amp.kind);
    };
    assert_eq!(op.kind, CTokenKind::Amp);
    assert!(matches!(
        &star.kind,
        ExprKind::Unary { elide: true, .. }
    ));
}

#[test]
fn test_address_of_expression_rejected() {
    check_err("int f() { int x; return *&(x + 1); }\n", "Cannot take address of not variable");
}

#[test]
fn test_mixed_type_assignment_rejected() {
    check_err(
        "int f(int* p) { int x; x = p; return x; }\n",
        "different type",
    );
}

#[test]
fn test_pointer_arithmetic_rejected() {
    check_err(
        "int f(int* p) { return p + 1; }\n",
        "Binary operator types must be equal",
    );
}

#[test]
fn test_compound_assignment_on_pointer_rejected() {
    check_err(
        "int f(int* p, int* q) { p += q; return 0; }\n",
        "arithmetic assignment",
    );
}

#[test]
fn test_call_checks_target_only() {
    // arity mismatches pass analysis by design
    check_ok("int add(int a, int b) { return a + b; }\nint f() { return add(1); }\n");
    check_err("int f() { int x; return x(); }\n", "Cannot call non function");
}

#[test]
fn test_call_result_type_is_return_type() {
    check_ok(
        "int* id(int* p) { return p; }\nint f(int* p) { return *id(p); }\n",
    );
}

#[test]
fn test_ternary_arms_must_agree() {
    check_ok("int f(int c) { return c ? 1 : 2; }\n");
    check_err(
        "int f(int c, int* p) { return c ? 1 : p; }\n",
        "same type",
    );
}

#[test]
fn test_every_expression_is_typed_after_analysis() {
    let unit = check_ok("int f(int a, int b) { return a + b * 2; }\n");
    let decl = &unit.declarations[0].declarators[0];
    let InitDeclKind::Function(Some(body)) = &decl.kind else {
        panic!("expected function");
    };
    let BlockItem::Statement(Stmt::Jump(JumpStmt::Return { expr, .. })) = &body.items[0]
    else {
        panic!("expected return");
    };
    fn assert_typed(expr: &mica_parser::Expr) {
        assert!(expr.ty.is_some(), "untyped expression: {:?}", expr.kind);
        if let ExprKind::Binary { left, right, .. } = &expr.kind {
            assert_typed(left);
            assert_typed(right);
        }
    }
    assert_typed(expr);
}
