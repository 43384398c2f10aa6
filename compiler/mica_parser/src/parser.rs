//! Pratt parser with declarator disambiguation
//!
//! Expressions use precedence climbing over a prefix/infix rule table;
//! declarators are parsed with a token-stack replay (prefix `(` and `*`
//! pushed, postfix parameter lists read left to right, the stack popped
//! right to left). On a parse error the parser enters panic mode and
//! resynchronises at the next statement boundary.

use crate::ast::*;
use crate::cook::TokenCooker;
use crate::symbol_table::SymbolTable;
use crate::token::{CToken, CTokenKind};
use mica_common::{Context, SourceLocation};
use smallvec::SmallVec;
use std::rc::Rc;

/// Operator precedence, low to high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None = 0,
    Comma,
    Assign,
    Conditional,
    LogicOr,
    LogicAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relation,
    Shift,
    Additive,
    Multiplicative,
    Cast,
    Unary,
    Postfix,
    Primary,
}

impl Precedence {
    // the next-higher level, for left-associative infix operators
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Comma,
            Comma => Assign,
            Assign => Conditional,
            Conditional => LogicOr,
            LogicOr => LogicAnd,
            LogicAnd => BitOr,
            BitOr => BitXor,
            BitXor => BitAnd,
            BitAnd => Equality,
            Equality => Relation,
            Relation => Shift,
            Shift => Additive,
            Additive => Multiplicative,
            Multiplicative => Cast,
            Cast => Unary,
            Unary => Postfix,
            Postfix => Primary,
            Primary => Primary,
        }
    }
}

type PrefixFn = for<'a, 'b> fn(&'a mut Parser<'b>) -> Option<Expr>;
type InfixFn = for<'a, 'b> fn(&'a mut Parser<'b>, Expr) -> Option<Expr>;

struct ParseRule {
    prefix: Option<PrefixFn>,
    infix: Option<InfixFn>,
    precedence: Precedence,
}

impl ParseRule {
    const fn new(
        prefix: Option<PrefixFn>,
        infix: Option<InfixFn>,
        precedence: Precedence,
    ) -> Self {
        Self { prefix, infix, precedence }
    }
}

fn rule_of(kind: &CTokenKind) -> ParseRule {
    use CTokenKind::*;
    use Precedence as P;
    match kind {
        Identifier(_) => ParseRule::new(Some(variable), None, P::None),
        IntegerLit(_) => ParseRule::new(Some(constant), None, P::None),
        LeftParen => ParseRule::new(Some(grouping), Some(call), P::Postfix),
        Minus => ParseRule::new(Some(unary), Some(binary), P::Additive),
        Plus => ParseRule::new(None, Some(binary), P::Additive),
        Tilde | Bang => ParseRule::new(Some(unary), None, P::None),
        Star => ParseRule::new(Some(unary), Some(binary), P::Multiplicative),
        Slash | Percent => ParseRule::new(None, Some(binary), P::Multiplicative),
        AmpAmp => ParseRule::new(None, Some(binary), P::LogicAnd),
        PipePipe => ParseRule::new(None, Some(binary), P::LogicOr),
        EqualEqual | BangEqual => ParseRule::new(None, Some(binary), P::Equality),
        Less | LessEqual | Greater | GreaterEqual => {
            ParseRule::new(None, Some(binary), P::Relation)
        }
        Amp => ParseRule::new(Some(unary), Some(binary), P::BitAnd),
        Pipe => ParseRule::new(None, Some(binary), P::BitOr),
        Caret => ParseRule::new(None, Some(binary), P::BitXor),
        LessLess | GreaterGreater => ParseRule::new(None, Some(binary), P::Shift),
        Comma => ParseRule::new(None, Some(binary), P::Comma),
        PlusPlus | MinusMinus => {
            ParseRule::new(Some(pre_inc_dec), Some(post_inc_dec), P::Postfix)
        }
        Equal | PlusEqual | MinusEqual | StarEqual | SlashEqual | PercentEqual
        | LessLessEqual | GreaterGreaterEqual | AmpEqual | CaretEqual | PipeEqual => {
            ParseRule::new(None, Some(assign), P::Assign)
        }
        Question => ParseRule::new(None, Some(condition), P::Conditional),
        _ => ParseRule::new(None, None, P::None),
    }
}

// ---- prefix rules ----

fn variable(p: &mut Parser) -> Option<Expr> {
    let CTokenKind::Identifier(name) = &p.previous.kind else {
        unreachable!("rule table routes only identifiers here");
    };
    let name = name.clone();
    let loc = p.previous.loc;

    match p.symbols.get_local(&name) {
        Some(symbol) => Some(Expr::lvalue(ExprKind::Constant(Constant::Local {
            symbol,
            loc,
        }))),
        None => {
            p.error("Variable name not declared");
            None
        }
    }
}

fn constant(p: &mut Parser) -> Option<Expr> {
    let CTokenKind::IntegerLit(value) = &p.previous.kind else {
        unreachable!("rule table routes only integer literals here");
    };
    Some(Expr::integer(*value, p.previous.loc))
}

fn grouping(p: &mut Parser) -> Option<Expr> {
    let expr = p.expression()?;
    p.consume(&CTokenKind::RightParen, "Expected ')'");
    Some(expr)
}

fn unary(p: &mut Parser) -> Option<Expr> {
    let op = p.previous.clone();
    let operand = p.parse_precedence(Precedence::Unary)?;
    let is_deref = op.kind == CTokenKind::Star;
    let mut expr = Expr::new(ExprKind::Unary { op, operand: Box::new(operand), elide: false });
    expr.is_lvalue = is_deref;
    Some(expr)
}

// `++e` desugars to `e += 1`, `--e` to `e -= 1`
fn pre_inc_dec(p: &mut Parser) -> Option<Expr> {
    let loc = p.previous.loc;
    let op_kind = if p.previous.kind == CTokenKind::PlusPlus {
        CTokenKind::PlusEqual
    } else {
        CTokenKind::MinusEqual
    };
    let op = CToken::synthesized(op_kind, loc);
    let one = Expr::integer(1, loc);
    let target = p.parse_precedence(Precedence::Unary)?;
    Some(Expr::new(ExprKind::Assign {
        op,
        target: Box::new(target),
        value: Box::new(one),
    }))
}

// ---- infix rules ----

fn binary(p: &mut Parser, left: Expr) -> Option<Expr> {
    let op = p.previous.clone();
    let precedence = rule_of(&op.kind).precedence;
    let right = p.parse_precedence(precedence.next())?;
    Some(Expr::new(ExprKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }))
}

fn assign(p: &mut Parser, target: Expr) -> Option<Expr> {
    let op = p.previous.clone();
    let value = p.parse_precedence(Precedence::Assign)?;
    Some(Expr::new(ExprKind::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
    }))
}

fn post_inc_dec(p: &mut Parser, operand: Expr) -> Option<Expr> {
    let op = p.previous.clone();
    Some(Expr::new(ExprKind::Postfix { op, operand: Box::new(operand) }))
}

fn condition(p: &mut Parser, cond: Expr) -> Option<Expr> {
    let op = p.previous.clone();
    let then = p.expression()?;
    p.consume(&CTokenKind::Colon, "Expected ':' in conditional expression");
    let second_op = p.previous.clone();
    let otherwise = p.parse_precedence(Precedence::Conditional)?;
    Some(Expr::new(ExprKind::Ternary {
        op,
        second_op,
        condition: Box::new(cond),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }))
}

fn call(p: &mut Parser, target: Expr) -> Option<Expr> {
    let open = p.previous.clone();
    let mut args = Vec::new();

    if !p.matches(&CTokenKind::RightParen) {
        loop {
            args.push(p.parse_precedence(Precedence::Assign)?);
            if p.matches(&CTokenKind::RightParen) {
                break;
            }
            p.consume(&CTokenKind::Comma, "Expected ','");
            if p.panic_mode || p.check(&CTokenKind::Eof) {
                return None;
            }
        }
    }

    Some(Expr::new(ExprKind::Call { target: Box::new(target), open, args }))
}

// a type under construction: constructors in hole-filling order
enum TypeCtor {
    Pointer,
    Function(Vec<Declarator>),
}

/// Parser over cooked tokens
pub struct Parser<'a> {
    ctx: &'a mut Context,
    source: TokenCooker,
    pub symbols: SymbolTable,
    current: CToken,
    previous: CToken,
    panic_mode: bool,
    had_error: bool,
}

impl<'a> Parser<'a> {
    pub fn new(source: TokenCooker, ctx: &'a mut Context) -> Self {
        Self {
            ctx,
            source,
            symbols: SymbolTable::new(),
            current: CToken::placeholder(),
            previous: CToken::placeholder(),
            panic_mode: false,
            had_error: false,
        }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn into_parts(self) -> (TokenCooker, SymbolTable) {
        (self.source, self.symbols)
    }

    // ---- token plumbing ----

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, CToken::placeholder());
        loop {
            self.current = self.source.next(self.ctx);
            if self.current.kind != CTokenKind::Error {
                break;
            }
            self.error_at_current("Unexpected token");
        }
    }

    fn check(&self, kind: &CTokenKind) -> bool {
        self.current.kind == *kind
    }

    fn matches(&mut self, kind: &CTokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_identifier(&mut self) -> Option<(String, SourceLocation)> {
        if let CTokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            let loc = self.current.loc;
            self.advance();
            Some((name, loc))
        } else {
            None
        }
    }

    fn consume(&mut self, kind: &CTokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // ---- error handling ----

    fn error_at(&mut self, loc: SourceLocation, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        self.ctx.diags.error(message, loc);
    }

    fn error(&mut self, message: &str) {
        self.error_at(self.previous.loc, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current.loc, message);
    }

    // skip ahead to the next statement boundary and leave panic mode
    fn synchronize(&mut self) {
        use CTokenKind::*;
        self.panic_mode = false;
        while self.current.kind != Eof {
            if self.previous.kind == Semicolon {
                return;
            }
            match self.current.kind {
                Int | If | While | For | Do | Return | Break | Continue | LeftBrace
                | RightBrace => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- expressions ----

    fn parse_precedence(&mut self, precedence: Precedence) -> Option<Expr> {
        self.advance();
        let Some(prefix) = rule_of(&self.previous.kind).prefix else {
            self.error("Expected expression");
            return None;
        };

        let mut expr = prefix(self)?;

        while precedence <= rule_of(&self.current.kind).precedence {
            self.advance();
            let infix = rule_of(&self.previous.kind)
                .infix
                .expect("tokens with a precedence always have an infix rule");
            expr = infix(self, expr)?;
        }

        Some(expr)
    }

    fn expression(&mut self) -> Option<Expr> {
        self.parse_precedence(Precedence::Comma)
    }

    // ---- declarators ----

    fn declarator(&mut self, allow_anonymous: bool) -> Option<Declarator> {
        use CTokenKind::*;

        // store prefix tokens to replay once the identifier is known;
        // the nesting depth keeps a prototype's last parameter from
        // consuming the prototype's closing ')'
        let mut stack: SmallVec<[CToken; 8]> = SmallVec::new();
        let mut nesting = 0usize;
        loop {
            if self.matches(&LeftParen) {
                nesting += 1;
                stack.push(self.previous.clone());
            } else if self.matches(&Star) {
                stack.push(self.previous.clone());
            } else {
                break;
            }
        }

        let named = match self.match_identifier() {
            Some(found) => Some(found),
            None if allow_anonymous => None,
            None => {
                self.error_at_current("Expected variable name");
                return None;
            }
        };

        // top-level prototypes may legitimately redeclare the name;
        // duplicate definitions are caught by analysis
        let (symbol, name_loc, redeclared) = match &named {
            Some((name, loc)) => match self.symbols.add_local(name) {
                Some(id) => (Some(id), *loc, false),
                None => (
                    Some(self.symbols.get_local(name).expect("duplicate implies existing")),
                    *loc,
                    true,
                ),
            },
            None => (None, self.current.loc, false),
        };

        let mut ctors: Vec<TypeCtor> = Vec::new();
        let mut seek_forward = true;
        let mut reached_forward_end = false;

        while !stack.is_empty() || self.check(&LeftParen) {
            if seek_forward && nesting > 0 && self.matches(&RightParen) {
                // a needed ')' arrived; switch to draining the stack
                seek_forward = false;
                nesting -= 1;
            } else if seek_forward && self.matches(&LeftParen) {
                let params = self.parameter_list()?;
                ctors.push(TypeCtor::Function(params));
            } else if seek_forward {
                // nothing else can follow the declarator going forward
                reached_forward_end = true;
                seek_forward = false;
            } else {
                let Some(next) = stack.pop() else { break };
                match next.kind {
                    LeftParen => {
                        seek_forward = true;
                        if reached_forward_end {
                            self.error("Unexpected end of type definition");
                            break;
                        }
                    }
                    Star => ctors.push(TypeCtor::Pointer),
                    _ => {
                        self.error_at(next.loc, "Expected '(' or '*' in type");
                        break;
                    }
                }
            }
        }

        // the first constructor recorded is the outermost
        let mut ty: TypeRef = VarType::int();
        for ctor in ctors.into_iter().rev() {
            ty = match ctor {
                TypeCtor::Pointer => Rc::new(VarType::Pointer(ty)),
                TypeCtor::Function(params) => {
                    Rc::new(VarType::Function(FnType { ret: ty, params }))
                }
            };
        }

        if let Some(symbol) = symbol {
            self.symbols.set_type(symbol, ty.clone());
        }
        Some(Declarator { symbol, ty, loc: name_loc, redeclared })
    }

    // parameters live in their own scope, which is left open so a
    // following function body can see them; the init-declarator that
    // owns this declarator unwinds it
    fn parameter_list(&mut self) -> Option<Vec<Declarator>> {
        use CTokenKind::*;

        self.symbols.enter();
        let depth = self.symbols.depth();

        let mut params = Vec::new();
        if !self.check(&RightParen) {
            loop {
                self.consume(&Int, "Expected int");
                if self.panic_mode {
                    break;
                }
                match self.declarator(true) {
                    Some(param) => params.push(param),
                    None => break,
                }
                if !self.matches(&Comma) {
                    break;
                }
            }
        }
        self.consume(&RightParen, "Expected ')' after function type");

        // nested declarators may have opened further scopes
        while self.symbols.depth() > depth {
            self.symbols.exit();
        }

        Some(params)
    }

    // ---- declarations ----

    fn init_declarator(&mut self, found_fndef: &mut bool) -> Option<InitDeclarator> {
        let depth = self.symbols.depth();
        let result = self.init_declarator_inner(found_fndef);
        while self.symbols.depth() > depth {
            self.symbols.exit();
        }
        result
    }

    fn init_declarator_inner(&mut self, found_fndef: &mut bool) -> Option<InitDeclarator> {
        use CTokenKind::*;

        let declarator = self.declarator(false)?;
        *found_fndef = false;

        let kind = if self.matches(&Equal) {
            let start = self.previous.clone();
            let value = self.parse_precedence(Precedence::Assign)?;
            InitDeclKind::Initialized { start, value }
        } else if self.matches(&LeftBrace) {
            if !declarator.ty.is_function() {
                self.error("Cannot define function after non function type");
            }
            let body = self.fn_compound()?;
            *found_fndef = true;
            InitDeclKind::Function(Some(body))
        } else if declarator.ty.is_function() {
            InitDeclKind::Function(None)
        } else {
            InitDeclKind::Plain
        };

        Some(InitDeclarator { declarator, kind })
    }

    fn declaration(&mut self) -> Option<Declaration> {
        use CTokenKind::*;

        let mut declarators = Vec::new();
        let mut found_fndef = false;

        loop {
            let starts_declarator = matches!(self.current.kind, Identifier(_))
                || self.check(&Star)
                || self.check(&LeftParen);
            if !starts_declarator {
                break;
            }

            declarators.push(self.init_declarator(&mut found_fndef)?);

            // no more init-declarators after a function definition, and no
            // ';' after one either
            if !self.matches(&Comma) {
                break;
            }
            if found_fndef {
                break;
            }
        }

        if !found_fndef {
            self.consume(&Semicolon, "Expected ';'");
        }

        Some(Declaration { declarators })
    }

    // ---- statements ----

    fn fn_compound(&mut self) -> Option<FnBody> {
        use CTokenKind::*;

        let mut items = Vec::new();
        while !self.check(&RightBrace) && !self.check(&Eof) {
            if let Some(item) = self.block_item() {
                items.push(item);
            }
            if self.panic_mode {
                self.synchronize();
            }
        }
        self.consume(&RightBrace, "Expected '}'");
        Some(FnBody { items })
    }

    fn block_item(&mut self) -> Option<BlockItem> {
        if self.matches(&CTokenKind::Int) {
            Some(BlockItem::Declaration(self.declaration()?))
        } else {
            Some(BlockItem::Statement(self.statement()?))
        }
    }

    fn compound_statement(&mut self) -> Option<CompoundStmt> {
        use CTokenKind::*;

        self.symbols.enter();
        let mut items = Vec::new();
        while !self.check(&RightBrace) && !self.check(&Eof) {
            if let Some(item) = self.block_item() {
                items.push(item);
            }
            if self.panic_mode {
                self.synchronize();
            }
        }
        self.consume(&RightBrace, "Expected '}'");
        let pop_count = self.symbols.exit().len();
        Some(CompoundStmt { items, pop_count })
    }

    fn selection_statement(&mut self) -> Option<SelectionStmt> {
        use CTokenKind::*;

        let keyword = self.previous.clone();
        self.consume(&LeftParen, "Expected '('");
        let condition = self.expression()?;
        self.consume(&RightParen, "Expected ')'");
        let then_block = Box::new(self.statement()?);
        let else_block = if self.matches(&Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Some(SelectionStmt { keyword, condition, then_block, else_block })
    }

    fn while_statement(&mut self) -> Option<IterationStmt> {
        use CTokenKind::*;

        let keyword = self.previous.clone();
        self.consume(&LeftParen, "Expected '('");
        let control = self.expression()?;
        self.consume(&RightParen, "Expected ')'");
        let body = self.statement()?;

        Some(IterationStmt {
            kind: IterationKind::While,
            keyword,
            control,
            pre_expr: None,
            pre_decl: None,
            post: None,
            body,
            pop_count: 0,
        })
    }

    fn do_while_statement(&mut self) -> Option<IterationStmt> {
        use CTokenKind::*;

        let body = self.statement()?;
        self.consume(&While, "Expected 'while'");
        let keyword = self.previous.clone();
        self.consume(&LeftParen, "Expected '('");
        let control = self.expression()?;
        self.consume(&RightParen, "Expected ')'");
        self.consume(&Semicolon, "Expected ';'");

        Some(IterationStmt {
            kind: IterationKind::DoWhile,
            keyword,
            control,
            pre_expr: None,
            pre_decl: None,
            post: None,
            body,
            pop_count: 0,
        })
    }

    fn for_statement(&mut self) -> Option<IterationStmt> {
        let keyword = self.previous.clone();
        self.symbols.enter();
        let result = self.for_statement_inner(keyword);
        let pop_count = self.symbols.exit().len();
        let mut iteration = result?;
        iteration.pop_count = pop_count;
        Some(iteration)
    }

    fn for_statement_inner(&mut self, keyword: CToken) -> Option<IterationStmt> {
        use CTokenKind::*;

        self.consume(&LeftParen, "Expected '('");

        let (kind, pre_expr, pre_decl) = if self.matches(&Int) {
            (IterationKind::ForDecl, None, Some(self.declaration()?))
        } else if self.matches(&Semicolon) {
            (IterationKind::ForExpr, None, None)
        } else {
            let pre = self.expression()?;
            self.consume(&Semicolon, "Expected ';'");
            (IterationKind::ForExpr, Some(pre), None)
        };

        // an omitted controlling expression is an always-true loop
        let control = if self.matches(&Semicolon) {
            Expr::integer(1, self.previous.loc)
        } else {
            let control = self.expression()?;
            self.consume(&Semicolon, "Expected ';'");
            control
        };

        let post = if self.matches(&RightParen) {
            None
        } else {
            let post = self.expression()?;
            self.consume(&RightParen, "Expected ')'");
            Some(post)
        };

        let body = self.statement()?;

        Some(IterationStmt {
            kind,
            keyword,
            control,
            pre_expr,
            pre_decl,
            post,
            body,
            pop_count: 0,
        })
    }

    fn statement(&mut self) -> Option<Stmt> {
        use CTokenKind::*;

        if self.matches(&Return) {
            let keyword = self.previous.clone();
            let expr = self.expression()?;
            self.consume(&Semicolon, "Expected ';'");
            Some(Stmt::Jump(JumpStmt::Return { keyword, expr }))
        } else if self.matches(&If) {
            Some(Stmt::Selection(Box::new(self.selection_statement()?)))
        } else if self.matches(&Semicolon) {
            Some(Stmt::Null)
        } else if self.matches(&LeftBrace) {
            Some(Stmt::Compound(self.compound_statement()?))
        } else if self.matches(&While) {
            Some(Stmt::Iteration(Box::new(self.while_statement()?)))
        } else if self.matches(&For) {
            Some(Stmt::Iteration(Box::new(self.for_statement()?)))
        } else if self.matches(&Do) {
            Some(Stmt::Iteration(Box::new(self.do_while_statement()?)))
        } else if self.matches(&Break) {
            let keyword = self.previous.clone();
            self.consume(&Semicolon, "Expected ';'");
            Some(Stmt::Jump(JumpStmt::Break { keyword }))
        } else if self.matches(&Continue) {
            let keyword = self.previous.clone();
            self.consume(&Semicolon, "Expected ';'");
            Some(Stmt::Jump(JumpStmt::Continue { keyword }))
        } else {
            let expr = self.expression()?;
            self.consume(&Semicolon, "Expected ';'");
            Some(Stmt::Expression(expr))
        }
    }

    // ---- entry point ----

    pub fn parse(&mut self) -> TranslationUnit {
        use CTokenKind::*;

        self.advance();
        let mut declarations = Vec::new();

        while !self.check(&Eof) {
            if self.matches(&Int) {
                if let Some(declaration) = self.declaration() {
                    declarations.push(declaration);
                }
            } else {
                self.error_at_current("Expected 'int'");
                self.advance();
            }
            if self.panic_mode {
                self.synchronize();
            }
        }

        TranslationUnit { declarations }
    }
}
