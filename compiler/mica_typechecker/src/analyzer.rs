//! Type checking and lvalue analysis

use mica_common::Context;
use mica_parser::{
    BlockItem, CTokenKind, Constant, Declaration, Expr, ExprKind, FnBody, InitDeclKind,
    IterationStmt, JumpStmt, SelectionStmt, Stmt, SymbolTable, TranslationUnit, TypeRef,
    VarType,
};
use std::rc::Rc;

struct Analyzer<'a> {
    ctx: &'a mut Context,
    symbols: &'a SymbolTable,
    in_loop: bool,
    int_type: TypeRef,
}

/// Type-check a translation unit in place. Diagnostics land in `ctx.diags`;
/// a unit with errors must not be lowered.
pub fn analyze(unit: &mut TranslationUnit, symbols: &SymbolTable, ctx: &mut Context) {
    let mut analyzer = Analyzer {
        ctx,
        symbols,
        in_loop: false,
        int_type: VarType::int(),
    };
    for declaration in &mut unit.declarations {
        analyzer.declaration(declaration);
    }
}

impl Analyzer<'_> {
    fn is_int(&self, ty: &Option<TypeRef>) -> bool {
        matches!(ty.as_deref(), Some(VarType::Int))
    }

    fn types_equal(a: &Option<TypeRef>, b: &Option<TypeRef>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn declaration(&mut self, declaration: &mut Declaration) {
        for init in &mut declaration.declarators {
            match &mut init.kind {
                InitDeclKind::Function(Some(body)) => self.fn_body(body),
                InitDeclKind::Function(None) => {}
                InitDeclKind::Initialized { value, .. } => self.expression(value),
                InitDeclKind::Plain => {}
            }
        }
    }

    fn fn_body(&mut self, body: &mut FnBody) {
        for item in &mut body.items {
            self.block_item(item);
        }
    }

    fn block_item(&mut self, item: &mut BlockItem) {
        match item {
            BlockItem::Statement(stmt) => self.statement(stmt),
            BlockItem::Declaration(declaration) => self.declaration(declaration),
        }
    }

    fn statement(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.expression(expr),
            Stmt::Selection(selection) => self.selection(selection),
            Stmt::Iteration(iteration) => self.iteration(iteration),
            Stmt::Compound(compound) => {
                for item in &mut compound.items {
                    self.block_item(item);
                }
            }
            Stmt::Jump(jump) => self.jump(jump),
            Stmt::Null => {}
        }
    }

    fn selection(&mut self, selection: &mut SelectionStmt) {
        self.expression(&mut selection.condition);
        self.statement(&mut selection.then_block);
        if let Some(else_block) = &mut selection.else_block {
            self.statement(else_block);
        }
    }

    fn iteration(&mut self, iteration: &mut IterationStmt) {
        let outer = self.in_loop;
        self.in_loop = true;
        self.expression(&mut iteration.control);
        if let Some(post) = &mut iteration.post {
            self.expression(post);
        }
        if let Some(pre) = &mut iteration.pre_expr {
            self.expression(pre);
        }
        if let Some(pre_decl) = &mut iteration.pre_decl {
            self.declaration(pre_decl);
        }
        self.statement(&mut iteration.body);
        self.in_loop = outer;
    }

    fn jump(&mut self, jump: &mut JumpStmt) {
        match jump {
            JumpStmt::Break { keyword } | JumpStmt::Continue { keyword } => {
                if !self.in_loop {
                    let loc = keyword.loc;
                    self.ctx
                        .diags
                        .error("Cannot break or continue outside of a loop", loc);
                }
            }
            JumpStmt::Return { expr, .. } => self.expression(expr),
        }
    }

    fn expression(&mut self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Assign { .. } => self.assign(expr),
            ExprKind::Binary { .. } => self.binary(expr),
            ExprKind::Call { .. } => self.call(expr),
            ExprKind::Constant(_) => self.constant(expr),
            ExprKind::Postfix { .. } => self.postfix(expr),
            ExprKind::Ternary { .. } => self.ternary(expr),
            ExprKind::Unary { .. } => self.unary(expr),
        }
    }

    fn assign(&mut self, expr: &mut Expr) {
        let ExprKind::Assign { op, target, value } = &mut expr.kind else {
            unreachable!();
        };
        if !target.is_lvalue {
            self.ctx.diags.error("Operand must be an lvalue", op.loc);
        }

        let op = op.clone();
        self.expression(target);
        self.expression(value);

        let ExprKind::Assign { target, value, .. } = &expr.kind else {
            unreachable!();
        };
        if !Self::types_equal(&target.ty, &value.ty) {
            self.ctx
                .diags
                .error("Cannot assign value to target of different type", op.loc);
        }
        if op.kind != CTokenKind::Equal && !self.is_int(&value.ty) {
            self.ctx.diags.error(
                "Cannot do arithmetic assignment with non arithmetic type",
                op.loc,
            );
        }

        let ExprKind::Assign { target, .. } = &expr.kind else { unreachable!() };
        expr.ty = target.ty.clone();
    }

    fn binary(&mut self, expr: &mut Expr) {
        let ExprKind::Binary { op, left, right } = &mut expr.kind else {
            unreachable!();
        };
        let op = op.clone();
        self.expression(left);
        self.expression(right);

        let ExprKind::Binary { left, right, .. } = &expr.kind else { unreachable!() };
        // TODO: pointer arithmetic needs relaxing here before the lowerer's
        // get_element_pointer path can ever fire
        if !Self::types_equal(&left.ty, &right.ty) {
            self.ctx
                .diags
                .error("Binary operator types must be equal", op.loc);
        }
        if !self.is_int(&left.ty) {
            self.ctx
                .diags
                .error("Cannot use operator on non arithmetic type", op.loc);
        }

        let ExprKind::Binary { left, .. } = &expr.kind else { unreachable!() };
        expr.ty = left.ty.clone();
    }

    fn call(&mut self, expr: &mut Expr) {
        // arity and parameter types are deliberately not checked; the only
        // requirement is that the target has function type
        let ExprKind::Call { target, args, open } = &mut expr.kind else {
            unreachable!();
        };
        let open = open.clone();
        self.expression(target);
        for arg in args.iter_mut() {
            self.expression(arg);
        }

        let ExprKind::Call { target, .. } = &expr.kind else { unreachable!() };
        match target.ty.as_deref() {
            Some(VarType::Function(fn_type)) => {
                expr.ty = Some(fn_type.ret.clone());
            }
            _ => {
                self.ctx.diags.error("Cannot call non function", open.loc);
            }
        }
    }

    fn constant(&mut self, expr: &mut Expr) {
        let ExprKind::Constant(constant) = &expr.kind else { unreachable!() };
        match constant {
            Constant::Integer { .. } => expr.ty = Some(self.int_type.clone()),
            Constant::Local { symbol, .. } => {
                expr.ty = self.symbols.symbol(*symbol).ty.clone();
            }
        }
    }

    fn postfix(&mut self, expr: &mut Expr) {
        let ExprKind::Postfix { op, operand } = &mut expr.kind else {
            unreachable!();
        };
        let op = op.clone();
        if !operand.is_lvalue {
            self.ctx.diags.error("Operand must be an lvalue", op.loc);
        }
        self.expression(operand);

        let ExprKind::Postfix { operand, .. } = &expr.kind else { unreachable!() };
        // ++ and -- are the only postfix operators
        if !self.is_int(&operand.ty) {
            self.ctx.diags.error(
                "Cannot increment/decrement non arithmetic type",
                op.loc,
            );
        }
        expr.ty = Some(self.int_type.clone());
    }

    fn ternary(&mut self, expr: &mut Expr) {
        let ExprKind::Ternary { op, second_op, condition, then, otherwise } =
            &mut expr.kind
        else {
            unreachable!();
        };
        let op = op.clone();
        let second_op = second_op.clone();
        self.expression(condition);
        self.expression(then);
        self.expression(otherwise);

        let ExprKind::Ternary { condition, then, otherwise, .. } = &expr.kind else {
            unreachable!();
        };
        if !self.is_int(&condition.ty) {
            self.ctx
                .diags
                .error("Condition must have scalar type", op.loc);
        }
        if !Self::types_equal(&then.ty, &otherwise.ty) {
            self.ctx
                .diags
                .error("condition values must have same type", second_op.loc);
        }

        let ExprKind::Ternary { then, .. } = &expr.kind else { unreachable!() };
        expr.ty = then.ty.clone();
    }

    fn unary(&mut self, expr: &mut Expr) {
        let ExprKind::Unary { op, operand, .. } = &mut expr.kind else {
            unreachable!();
        };
        let op = op.clone();
        self.expression(operand);

        if op.kind == CTokenKind::Amp {
            // `&*e` cancels out; otherwise the operand must be a variable
            let ExprKind::Unary { operand, elide, .. } = &mut expr.kind else {
                unreachable!();
            };
            let inner_is_elidable_deref = matches!(
                &operand.kind,
                ExprKind::Unary { op, elide: false, .. } if op.kind == CTokenKind::Star
            );
            if inner_is_elidable_deref {
                *elide = true;
                let ExprKind::Unary { elide: inner_elide, .. } = &mut operand.kind else {
                    unreachable!();
                };
                *inner_elide = true;
            } else if !matches!(
                &operand.kind,
                ExprKind::Constant(Constant::Local { .. })
            ) {
                // disallow &1, &(5+6), etc
                self.ctx
                    .diags
                    .error("Cannot take address of not variable", op.loc);
            }
        }

        let ExprKind::Unary { operand, .. } = &expr.kind else { unreachable!() };
        match op.kind {
            CTokenKind::Minus | CTokenKind::Tilde | CTokenKind::Bang => {
                if !self.is_int(&operand.ty) {
                    self.ctx
                        .diags
                        .error("Cannot use operator on non arithmetic type", op.loc);
                }
                expr.ty = operand.ty.clone();
            }
            CTokenKind::Amp => {
                if let Some(inner) = &operand.ty {
                    expr.ty = Some(Rc::new(VarType::Pointer(inner.clone())));
                }
            }
            CTokenKind::Star => match operand.ty.as_deref() {
                Some(VarType::Pointer(pointee)) => expr.ty = Some(pointee.clone()),
                _ => {
                    self.ctx
                        .diags
                        .error("Cannot dereference non pointer", op.loc);
                }
            },
            _ => unreachable!("no other unary operators are parsed"),
        }
    }
}
