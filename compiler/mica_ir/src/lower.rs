//! AST to SSA lowering
//!
//! One walk over the analysed AST. Scalar locals live in the SSA variable
//! table; locals whose address is taken are backed by an `alloca` and
//! accessed through loads and stores, so `&x` has a value to produce.
//! Control flow seals blocks as soon as their predecessor set is final:
//! immediately for forward branches, after the loop body for headers.

use crate::ir::*;
use hashbrown::{HashMap, HashSet};
use mica_common::Context;
use mica_parser::{
    BlockItem, CTokenKind, Constant, Declaration, Expr, ExprKind, FnBody, InitDeclKind,
    IterationKind, IterationStmt, JumpStmt, SelectionStmt, Stmt, SymbolId, SymbolTable,
    TranslationUnit, VarType,
};

fn comparison_of(kind: &CTokenKind) -> Option<Comparison> {
    Some(match kind {
        CTokenKind::Less => Comparison::Less,
        CTokenKind::LessEqual => Comparison::LessEqual,
        CTokenKind::Greater => Comparison::Greater,
        CTokenKind::GreaterEqual => Comparison::GreaterEqual,
        CTokenKind::EqualEqual => Comparison::Equal,
        CTokenKind::BangEqual => Comparison::NotEqual,
        _ => return None,
    })
}

fn compound_opcode(kind: &CTokenKind) -> Option<Opcode> {
    Some(match kind {
        CTokenKind::PlusEqual => Opcode::Add,
        CTokenKind::MinusEqual => Opcode::Sub,
        CTokenKind::StarEqual => Opcode::Smul,
        CTokenKind::SlashEqual => Opcode::Sdiv,
        CTokenKind::PercentEqual => Opcode::Srem,
        CTokenKind::LessLessEqual => Opcode::Shl,
        CTokenKind::GreaterGreaterEqual => Opcode::Asr,
        CTokenKind::AmpEqual => Opcode::And,
        CTokenKind::CaretEqual => Opcode::Xor,
        CTokenKind::PipeEqual => Opcode::Or,
        _ => return None,
    })
}

fn lower_type(ty: &VarType) -> IrType {
    match ty {
        VarType::Int => IrType::integer(32),
        VarType::Pointer(pointee) => lower_type(pointee).pointer_to(),
        VarType::Function(fn_type) => IrType::function(
            lower_type(&fn_type.ret),
            fn_type.params.iter().map(|p| lower_type(&p.ty)).collect(),
        ),
    }
}

// walk a function body marking locals whose address is taken with a real
// (non-elided) `&`
fn collect_addressed(items: &[BlockItem], addressed: &mut HashSet<SymbolId>) {
    fn expr(e: &Expr, addressed: &mut HashSet<SymbolId>) {
        match &e.kind {
            ExprKind::Unary { op, operand, elide } => {
                if op.kind == CTokenKind::Amp && !*elide {
                    if let ExprKind::Constant(Constant::Local { symbol, .. }) = &operand.kind
                    {
                        addressed.insert(*symbol);
                    }
                }
                expr(operand, addressed);
            }
            ExprKind::Binary { left, right, .. } => {
                expr(left, addressed);
                expr(right, addressed);
            }
            ExprKind::Ternary { condition, then, otherwise, .. } => {
                expr(condition, addressed);
                expr(then, addressed);
                expr(otherwise, addressed);
            }
            ExprKind::Postfix { operand, .. } => expr(operand, addressed),
            ExprKind::Assign { target, value, .. } => {
                expr(target, addressed);
                expr(value, addressed);
            }
            ExprKind::Call { target, args, .. } => {
                expr(target, addressed);
                for arg in args {
                    expr(arg, addressed);
                }
            }
            ExprKind::Constant(_) => {}
        }
    }

    fn stmt(s: &Stmt, addressed: &mut HashSet<SymbolId>) {
        match s {
            Stmt::Expression(e) => expr(e, addressed),
            Stmt::Selection(selection) => {
                expr(&selection.condition, addressed);
                stmt(&selection.then_block, addressed);
                if let Some(else_block) = &selection.else_block {
                    stmt(else_block, addressed);
                }
            }
            Stmt::Iteration(iteration) => {
                expr(&iteration.control, addressed);
                if let Some(pre) = &iteration.pre_expr {
                    expr(pre, addressed);
                }
                if let Some(pre_decl) = &iteration.pre_decl {
                    declaration(pre_decl, addressed);
                }
                if let Some(post) = &iteration.post {
                    expr(post, addressed);
                }
                stmt(&iteration.body, addressed);
            }
            Stmt::Compound(compound) => collect_addressed(&compound.items, addressed),
            Stmt::Jump(JumpStmt::Return { expr: e, .. }) => expr(e, addressed),
            Stmt::Jump(_) | Stmt::Null => {}
        }
    }

    fn declaration(d: &Declaration, addressed: &mut HashSet<SymbolId>) {
        for init in &d.declarators {
            if let InitDeclKind::Initialized { value, .. } = &init.kind {
                expr(value, addressed);
            }
        }
    }

    for item in items {
        match item {
            BlockItem::Statement(s) => stmt(s, addressed),
            BlockItem::Declaration(d) => declaration(d, addressed),
        }
    }
}

// break and continue targets of the innermost enclosing loop
#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    break_target: BlockId,
    continue_target: BlockId,
}

struct FnLower<'a> {
    f: IrFunction,
    ctx: &'a mut Context,
    globals: &'a HashMap<SymbolId, (TopId, IrType)>,
    /// address-taken locals, mapped to their alloca result
    addressed: HashMap<SymbolId, Operand>,
    addressed_set: HashSet<SymbolId>,
    cur: BlockId,
    loops: Vec<LoopTargets>,
}

impl FnLower<'_> {
    // ---- statements ----

    fn item(&mut self, item: &BlockItem) {
        match item {
            BlockItem::Statement(stmt) => self.stmt(stmt),
            BlockItem::Declaration(declaration) => self.declaration(declaration),
        }
    }

    fn declaration(&mut self, declaration: &Declaration) {
        for init in &declaration.declarators {
            let Some(symbol) = init.declarator.symbol else { continue };

            match &init.kind {
                InitDeclKind::Function(_) => {
                    self.ctx.diags.error(
                        "local function declarations are not supported",
                        init.declarator.loc,
                    );
                }
                InitDeclKind::Initialized { value, .. } => {
                    let value = self.expr(value);
                    self.define_local(symbol, &init.declarator.ty, value);
                }
                InitDeclKind::Plain => {
                    self.define_local(symbol, &init.declarator.ty, Operand::undefined());
                }
            }
        }
    }

    fn define_local(&mut self, symbol: SymbolId, ty: &VarType, value: Operand) {
        if self.addressed_set.contains(&symbol) {
            let slot = self.f.add_inst(
                self.cur,
                Opcode::Alloca,
                vec![Operand::Type(lower_type(ty))],
                None,
            );
            self.f.add_void_inst(
                self.cur,
                Opcode::Store,
                vec![slot.clone(), value],
                None,
            );
            self.addressed.insert(symbol, slot);
        } else {
            self.f.write_variable(symbol, self.cur, value);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => {
                self.expr(expr);
            }
            Stmt::Null => {}
            Stmt::Compound(compound) => {
                for item in &compound.items {
                    self.item(item);
                }
            }
            Stmt::Selection(selection) => self.selection(selection),
            Stmt::Iteration(iteration) => self.iteration(iteration),
            Stmt::Jump(jump) => self.jump(jump),
        }
    }

    fn jump(&mut self, jump: &JumpStmt) {
        match jump {
            JumpStmt::Return { expr, .. } => {
                let value = self.expr(expr);
                self.f.add_void_inst(self.cur, Opcode::Return, vec![value], None);
            }
            JumpStmt::Break { .. } => {
                let target = self.loops.last().expect("analysis checked loop context");
                let target = target.break_target;
                self.f.add_void_inst(
                    self.cur,
                    Opcode::Jump,
                    vec![Operand::Block(target)],
                    None,
                );
            }
            JumpStmt::Continue { .. } => {
                let target = self.loops.last().expect("analysis checked loop context");
                let target = target.continue_target;
                self.f.add_void_inst(
                    self.cur,
                    Opcode::Jump,
                    vec![Operand::Block(target)],
                    None,
                );
            }
        }
    }

    fn selection(&mut self, selection: &SelectionStmt) {
        let cond = self.expr(&selection.condition);

        if let Some(else_block) = &selection.else_block {
            let then_b = self.f.new_block();
            let else_b = self.f.new_block();
            let join = self.f.new_block();

            self.f.add_void_inst(
                self.cur,
                Opcode::JumpIf,
                vec![cond, Operand::Block(then_b), Operand::Block(else_b)],
                None,
            );
            self.f.seal_block(then_b);
            self.f.seal_block(else_b);

            self.cur = then_b;
            self.stmt(&selection.then_block);
            self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(join)], None);

            self.cur = else_b;
            self.stmt(else_block);
            self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(join)], None);

            self.cur = join;
            self.f.seal_block(join);
        } else {
            let then_b = self.f.new_block();
            let join = self.f.new_block();

            self.f.add_void_inst(
                self.cur,
                Opcode::JumpIf,
                vec![cond, Operand::Block(then_b), Operand::Block(join)],
                None,
            );
            self.f.seal_block(then_b);

            self.cur = then_b;
            self.stmt(&selection.then_block);
            self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(join)], None);

            self.cur = join;
            self.f.seal_block(join);
        }
    }

    fn iteration(&mut self, iteration: &IterationStmt) {
        match iteration.kind {
            IterationKind::While => self.while_loop(iteration),
            IterationKind::DoWhile => self.do_while_loop(iteration),
            IterationKind::ForExpr | IterationKind::ForDecl => self.for_loop(iteration),
        }
    }

    fn while_loop(&mut self, iteration: &IterationStmt) {
        let header = self.f.new_block();
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(header)], None);

        // the header stays unsealed until the back edge exists
        self.cur = header;
        let cond = self.expr(&iteration.control);

        let body = self.f.new_block();
        let after = self.f.new_block();
        self.f.add_void_inst(
            self.cur,
            Opcode::JumpIf,
            vec![cond, Operand::Block(body), Operand::Block(after)],
            None,
        );
        self.f.seal_block(body);

        self.loops.push(LoopTargets { break_target: after, continue_target: header });
        self.cur = body;
        self.stmt(&iteration.body);
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(header)], None);
        self.loops.pop();

        self.f.seal_block(header);
        self.cur = after;
        self.f.seal_block(after);
    }

    fn do_while_loop(&mut self, iteration: &IterationStmt) {
        let body = self.f.new_block();
        let cond_block = self.f.new_block();
        let after = self.f.new_block();

        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(body)], None);

        // body runs before the condition; its back edge comes from the
        // condition block, so it stays unsealed for now
        self.loops.push(LoopTargets { break_target: after, continue_target: cond_block });
        self.cur = body;
        self.stmt(&iteration.body);
        self.f.add_void_inst(
            self.cur,
            Opcode::Jump,
            vec![Operand::Block(cond_block)],
            None,
        );
        self.loops.pop();

        self.f.seal_block(cond_block);
        self.cur = cond_block;
        let cond = self.expr(&iteration.control);
        self.f.add_void_inst(
            self.cur,
            Opcode::JumpIf,
            vec![cond, Operand::Block(body), Operand::Block(after)],
            None,
        );

        self.f.seal_block(body);
        self.cur = after;
        self.f.seal_block(after);
    }

    fn for_loop(&mut self, iteration: &IterationStmt) {
        if let Some(pre_decl) = &iteration.pre_decl {
            self.declaration(pre_decl);
        }
        if let Some(pre) = &iteration.pre_expr {
            self.expr(pre);
        }

        let header = self.f.new_block();
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(header)], None);

        self.cur = header;
        let cond = self.expr(&iteration.control);

        let body = self.f.new_block();
        let latch = self.f.new_block();
        let after = self.f.new_block();
        self.f.add_void_inst(
            self.cur,
            Opcode::JumpIf,
            vec![cond, Operand::Block(body), Operand::Block(after)],
            None,
        );
        self.f.seal_block(body);

        // continue re-runs the post expression, not the condition
        self.loops.push(LoopTargets { break_target: after, continue_target: latch });
        self.cur = body;
        self.stmt(&iteration.body);
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(latch)], None);
        self.loops.pop();

        self.f.seal_block(latch);
        self.cur = latch;
        if let Some(post) = &iteration.post {
            self.expr(post);
        }
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(header)], None);

        self.f.seal_block(header);
        self.cur = after;
        self.f.seal_block(after);
    }

    // ---- expressions ----

    fn expr(&mut self, expr: &Expr) -> Operand {
        match &expr.kind {
            ExprKind::Constant(constant) => self.constant(constant),
            ExprKind::Binary { op, left, right } => self.binary(op, left, right),
            ExprKind::Unary { op, operand, elide } => self.unary(op, operand, *elide),
            ExprKind::Postfix { op, operand } => self.postfix(op, operand),
            ExprKind::Assign { op, target, value } => self.assign(op, target, value),
            ExprKind::Ternary { condition, then, otherwise, .. } => {
                self.ternary(condition, then, otherwise)
            }
            ExprKind::Call { target, args, .. } => self.call(target, args),
        }
    }

    fn constant(&mut self, constant: &Constant) -> Operand {
        match constant {
            Constant::Integer { value, .. } => Operand::int(*value as i32),
            Constant::Local { symbol, .. } => self.read_symbol(*symbol),
        }
    }

    // the current value of a named symbol as an rvalue
    fn read_symbol(&mut self, symbol: SymbolId) -> Operand {
        if let Some((id, ty)) = self.globals.get(&symbol) {
            let top = Operand::TopLevel { id: *id, ty: ty.clone() };
            if matches!(ty.kind, IrTypeKind::Function { .. }) {
                return top;
            }
            // globals hold an address; rvalue use loads through it
            return self.f.add_inst(self.cur, Opcode::Load, vec![top], None);
        }
        if let Some(slot) = self.addressed.get(&symbol).cloned() {
            return self.f.add_inst(self.cur, Opcode::Load, vec![slot], None);
        }
        self.f.read_variable(symbol, self.cur)
    }

    // the storage location of a symbol, when it has one
    fn symbol_address(&mut self, symbol: SymbolId) -> Option<Operand> {
        if let Some((id, ty)) = self.globals.get(&symbol) {
            return Some(Operand::TopLevel { id: *id, ty: ty.clone() });
        }
        self.addressed.get(&symbol).cloned()
    }

    fn binary(&mut self, op: &mica_parser::CToken, left: &Expr, right: &Expr) -> Operand {
        use CTokenKind::*;

        // the comma operator evaluates and discards its left operand
        if op.kind == Comma {
            self.expr(left);
            return self.expr(right);
        }

        if matches!(op.kind, AmpAmp | PipePipe) {
            return self.logical(op, left, right);
        }

        let lhs = self.expr(left);
        let rhs = self.expr(right);

        if let Some(comparison) = comparison_of(&op.kind) {
            return self.f.add_inst(
                self.cur,
                Opcode::Compare,
                vec![lhs, rhs],
                Some(comparison),
            );
        }

        let opcode = match op.kind {
            Plus => Opcode::Add,
            Minus => Opcode::Sub,
            Star => Opcode::Smul,
            Slash => Opcode::Sdiv,
            Percent => Opcode::Srem,
            LessLess => Opcode::Shl,
            GreaterGreater => Opcode::Asr,
            Amp => Opcode::And,
            Pipe => Opcode::Or,
            Caret => Opcode::Xor,
            _ => unreachable!("no lowering for binary operator {:?}", op.kind),
        };
        self.f.add_inst(self.cur, opcode, vec![lhs, rhs], None)
    }

    // both operands are normalised against zero and combined bitwise; the
    // result is widened back to int
    fn logical(&mut self, op: &mica_parser::CToken, left: &Expr, right: &Expr) -> Operand {
        let lhs = self.expr(left);
        let rhs = self.expr(right);
        let lhs_flag = self.truthy(lhs);
        let rhs_flag = self.truthy(rhs);
        let opcode = if op.kind == CTokenKind::AmpAmp { Opcode::And } else { Opcode::Or };
        let flag = self.f.add_inst(self.cur, opcode, vec![lhs_flag, rhs_flag], None);
        self.widen(flag)
    }

    fn truthy(&mut self, value: Operand) -> Operand {
        self.f.add_inst(
            self.cur,
            Opcode::Compare,
            vec![value, Operand::int(0)],
            Some(Comparison::NotEqual),
        )
    }

    fn widen(&mut self, value: Operand) -> Operand {
        self.f.add_inst(
            self.cur,
            Opcode::Cast,
            vec![Operand::Type(IrType::integer(32)), value],
            None,
        )
    }

    fn unary(&mut self, op: &mica_parser::CToken, operand: &Expr, elide: bool) -> Operand {
        use CTokenKind::*;

        // `&*e` lowers as plain `e`
        if elide {
            return self.expr(operand);
        }

        match op.kind {
            Minus => {
                let value = self.expr(operand);
                self.f.add_inst(self.cur, Opcode::Negate, vec![value], None)
            }
            Tilde => {
                let value = self.expr(operand);
                self.f.add_inst(self.cur, Opcode::Not, vec![value], None)
            }
            Bang => {
                let value = self.expr(operand);
                let flag = self.f.add_inst(
                    self.cur,
                    Opcode::Compare,
                    vec![value, Operand::int(0)],
                    Some(Comparison::Equal),
                );
                self.widen(flag)
            }
            Star => {
                let address = self.expr(operand);
                self.f.add_inst(self.cur, Opcode::Load, vec![address], None)
            }
            Amp => {
                let ExprKind::Constant(Constant::Local { symbol, .. }) = &operand.kind
                else {
                    // analysis rejected everything else
                    return Operand::undefined();
                };
                match self.symbol_address(*symbol) {
                    Some(address) => address,
                    None => Operand::undefined(),
                }
            }
            _ => unreachable!("no lowering for unary operator {:?}", op.kind),
        }
    }

    fn postfix(&mut self, op: &mica_parser::CToken, operand: &Expr) -> Operand {
        let opcode = if op.kind == CTokenKind::PlusPlus { Opcode::Add } else { Opcode::Sub };
        let old = self.expr(operand);
        let new = self.f.add_inst(
            self.cur,
            opcode,
            vec![old.clone(), Operand::int(1)],
            None,
        );
        self.store_into(operand, new);
        old
    }

    fn assign(&mut self, op: &mica_parser::CToken, target: &Expr, value: &Expr) -> Operand {
        let new = if let Some(opcode) = compound_opcode(&op.kind) {
            let old = self.expr(target);
            let rhs = self.expr(value);
            self.f.add_inst(self.cur, opcode, vec![old, rhs], None)
        } else {
            self.expr(value)
        };
        self.store_into(target, new.clone());
        new
    }

    // write a value through an lvalue expression
    fn store_into(&mut self, target: &Expr, value: Operand) {
        match &target.kind {
            ExprKind::Constant(Constant::Local { symbol, .. }) => {
                if let Some(address) = self.symbol_address(*symbol) {
                    self.f.add_void_inst(
                        self.cur,
                        Opcode::Store,
                        vec![address, value],
                        None,
                    );
                } else {
                    self.f.write_variable(*symbol, self.cur, value);
                }
            }
            ExprKind::Unary { op, operand, .. } if op.kind == CTokenKind::Star => {
                let address = self.expr(operand);
                self.f.add_void_inst(
                    self.cur,
                    Opcode::Store,
                    vec![address, value],
                    None,
                );
            }
            _ => {
                // analysis enforced lvalue-ness already
            }
        }
    }

    fn ternary(&mut self, condition: &Expr, then: &Expr, otherwise: &Expr) -> Operand {
        let cond = self.expr(condition);

        let then_b = self.f.new_block();
        let else_b = self.f.new_block();
        let join = self.f.new_block();

        self.f.add_void_inst(
            self.cur,
            Opcode::JumpIf,
            vec![cond, Operand::Block(then_b), Operand::Block(else_b)],
            None,
        );
        self.f.seal_block(then_b);
        self.f.seal_block(else_b);

        self.cur = then_b;
        let then_value = self.expr(then);
        let then_end = self.cur;
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(join)], None);

        self.cur = else_b;
        let else_value = self.expr(otherwise);
        let else_end = self.cur;
        self.f.add_void_inst(self.cur, Opcode::Jump, vec![Operand::Block(join)], None);

        self.cur = join;
        self.f.seal_block(join);

        // the merged value has no source variable; build its φ directly
        let phi = self.f.phi_create(join, None);
        self.f.phi_add_operand(phi, then_end, then_value);
        self.f.phi_add_operand(phi, else_end, else_value);
        self.f.try_remove_trivial_phi(phi)
    }

    fn call(&mut self, target: &Expr, args: &[Expr]) -> Operand {
        let callee = self.expr(target);
        let mut params = vec![callee];
        for arg in args {
            let value = self.expr(arg);
            params.push(value);
        }
        self.f.add_inst(self.cur, Opcode::Call, params, None)
    }
}

/// Lower an analysed translation unit to an IR module
pub fn lower(
    unit: &TranslationUnit,
    symbols: &SymbolTable,
    ctx: &mut Context,
) -> IrModule {
    let mut module = IrModule::new();
    let mut globals: HashMap<SymbolId, (TopId, IrType)> = HashMap::new();

    // first pass: create every top-level entity so forward references and
    // recursion resolve
    for declaration in &unit.declarations {
        for init in &declaration.declarators {
            let Some(symbol) = init.declarator.symbol else { continue };
            if globals.contains_key(&symbol) {
                continue;
            }

            let id = TopId(module.top_levels.len() as u32);
            let name = symbols.symbol(symbol).name.clone();
            let ty = lower_type(&init.declarator.ty);

            let top = if init.declarator.ty.is_function() {
                let IrTypeKind::Function { ret, params } = ty.kind.clone() else {
                    unreachable!();
                };
                globals.insert(symbol, (id, ty));
                IrTopLevel::Function(IrFunction::new(name, id, *ret, params))
            } else {
                // a global's operand type is the address of its storage
                let address_ty = ty.pointer_to();
                globals.insert(symbol, (id, address_ty.clone()));

                let value = match &init.kind {
                    InitDeclKind::Initialized { value, .. } => match &value.kind {
                        ExprKind::Constant(Constant::Integer { value, .. }) => {
                            Some(*value as i32)
                        }
                        _ => {
                            ctx.diags.error(
                                "global initializer must be a constant integer",
                                init.declarator.loc,
                            );
                            None
                        }
                    },
                    _ => None,
                };
                IrTopLevel::Global { name, id, ty: address_ty, value }
            };
            module.top_levels.push(top);
        }
    }

    // second pass: lower function bodies
    for declaration in &unit.declarations {
        for init in &declaration.declarators {
            let Some(symbol) = init.declarator.symbol else { continue };
            let InitDeclKind::Function(Some(body)) = &init.kind else { continue };
            let VarType::Function(fn_type) = &*init.declarator.ty else { continue };

            let (id, _) = globals[&symbol];
            let name = symbols.symbol(symbol).name.clone();
            let function = lower_function(id, name, fn_type, body, &globals, ctx);
            module.top_levels[id.0 as usize] = IrTopLevel::Function(function);
        }
    }

    module
}

fn lower_function(
    id: TopId,
    name: String,
    fn_type: &mica_parser::FnType,
    body: &FnBody,
    globals: &HashMap<SymbolId, (TopId, IrType)>,
    ctx: &mut Context,
) -> IrFunction {
    log::debug!("lowering function {name}");

    let return_type = lower_type(&fn_type.ret);
    let param_types: Vec<IrType> =
        fn_type.params.iter().map(|p| lower_type(&p.ty)).collect();
    let f = IrFunction::new(name, id, return_type, param_types);

    let mut addressed_set = HashSet::new();
    collect_addressed(&body.items, &mut addressed_set);

    let mut lower = FnLower {
        f,
        ctx,
        globals,
        addressed: HashMap::new(),
        addressed_set,
        cur: BlockId(0),
        loops: Vec::new(),
    };

    let entry = lower.f.new_block();
    lower.f.seal_entry(entry);
    lower.cur = entry;

    for (index, param) in fn_type.params.iter().enumerate() {
        let value = lower.f.add_inst(
            entry,
            Opcode::Parameter,
            vec![Operand::int(index as i32)],
            None,
        );
        if let Some(symbol) = param.symbol {
            lower.define_local(symbol, &param.ty, value);
        }
    }

    for item in &body.items {
        lower.item(item);
    }

    // falling off the end returns an undefined value
    lower.f.add_void_inst(lower.cur, Opcode::Return, vec![Operand::undefined()], None);

    let mut f = lower.f;
    f.remove_unused_blocks();
    f
}
