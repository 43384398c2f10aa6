//! Abstract syntax tree for the accepted C subset
//!
//! Types are reference-counted so they can be shared between symbols and
//! expression nodes; equality is structural. Every expression node carries
//! its resolved type and lvalue-ness, filled in by semantic analysis.

use crate::symbol_table::SymbolId;
use crate::token::CToken;
use mica_common::SourceLocation;
use serde::Serialize;
use std::rc::Rc;

pub type TypeRef = Rc<VarType>;

#[derive(Debug, Serialize)]
pub enum VarType {
    Int,
    Pointer(TypeRef),
    Function(FnType),
}

#[derive(Debug, Serialize)]
pub struct FnType {
    pub ret: TypeRef,
    pub params: Vec<Declarator>,
}

impl PartialEq for VarType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VarType::Int, VarType::Int) => true,
            (VarType::Pointer(a), VarType::Pointer(b)) => a == b,
            (VarType::Function(a), VarType::Function(b)) => {
                // parameter names do not take part in type identity
                a.ret == b.ret
                    && a.params.len() == b.params.len()
                    && a.params.iter().zip(&b.params).all(|(x, y)| x.ty == y.ty)
            }
            _ => false,
        }
    }
}

impl VarType {
    pub fn is_function(&self) -> bool {
        matches!(self, VarType::Function(_))
    }

    pub fn int() -> TypeRef {
        Rc::new(VarType::Int)
    }
}

/// A declared name together with its derived type. Parameter declarators
/// in a prototype may be anonymous.
#[derive(Debug, Clone, Serialize)]
pub struct Declarator {
    pub symbol: Option<SymbolId>,
    pub ty: TypeRef,
    pub loc: SourceLocation,
    pub redeclared: bool,
}

#[derive(Debug, Serialize)]
pub enum Constant {
    Integer { value: i64, loc: SourceLocation },
    Local { symbol: SymbolId, loc: SourceLocation },
}

impl Constant {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Constant::Integer { loc, .. } | Constant::Local { loc, .. } => *loc,
        }
    }
}

#[derive(Debug, Serialize)]
pub enum ExprKind {
    Binary {
        op: CToken,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        op: CToken,
        second_op: CToken,
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Unary {
        op: CToken,
        operand: Box<Expr>,
        /// set on both halves of an `&*e` pair so neither lowers
        elide: bool,
    },
    Postfix {
        op: CToken,
        operand: Box<Expr>,
    },
    Constant(Constant),
    Assign {
        op: CToken,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        target: Box<Expr>,
        /// the `(`, where an indirect-call error is reported
        open: CToken,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// resolved by semantic analysis; non-null after it completes
    pub ty: Option<TypeRef>,
    pub is_lvalue: bool,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, ty: None, is_lvalue: false }
    }

    pub fn lvalue(kind: ExprKind) -> Self {
        Self { kind, ty: None, is_lvalue: true }
    }

    pub fn integer(value: i64, loc: SourceLocation) -> Self {
        Self::new(ExprKind::Constant(Constant::Integer { value, loc }))
    }
}

#[derive(Debug, Serialize)]
pub struct SelectionStmt {
    pub keyword: CToken,
    pub condition: Expr,
    pub then_block: Box<Stmt>,
    pub else_block: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IterationKind {
    While,
    DoWhile,
    ForExpr,
    ForDecl,
}

#[derive(Debug, Serialize)]
pub struct IterationStmt {
    pub kind: IterationKind,
    pub keyword: CToken,
    pub control: Expr,
    pub pre_expr: Option<Expr>,
    pub pre_decl: Option<Declaration>,
    pub post: Option<Expr>,
    pub body: Stmt,
    /// locals leaving scope at the end of a `for` statement
    pub pop_count: usize,
}

#[derive(Debug, Serialize)]
pub enum JumpStmt {
    Return { keyword: CToken, expr: Expr },
    Break { keyword: CToken },
    Continue { keyword: CToken },
}

#[derive(Debug, Serialize)]
pub struct CompoundStmt {
    pub items: Vec<BlockItem>,
    /// locals leaving scope at the closing brace
    pub pop_count: usize,
}

#[derive(Debug, Serialize)]
pub enum Stmt {
    Expression(Expr),
    Selection(Box<SelectionStmt>),
    Iteration(Box<IterationStmt>),
    Compound(CompoundStmt),
    Jump(JumpStmt),
    Null,
}

/// A function definition's body; unlike a compound statement it shares the
/// parameter scope rather than opening its own
#[derive(Debug, Serialize)]
pub struct FnBody {
    pub items: Vec<BlockItem>,
}

#[derive(Debug, Serialize)]
pub enum InitDeclKind {
    Initialized { start: CToken, value: Expr },
    /// a function declarator: `Some` for a definition, `None` for a prototype
    Function(Option<FnBody>),
    Plain,
}

#[derive(Debug, Serialize)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub kind: InitDeclKind,
}

#[derive(Debug, Serialize)]
pub struct Declaration {
    pub declarators: Vec<InitDeclarator>,
}

#[derive(Debug, Serialize)]
pub enum BlockItem {
    Statement(Stmt),
    Declaration(Declaration),
}

#[derive(Debug, Default, Serialize)]
pub struct TranslationUnit {
    pub declarations: Vec<Declaration>,
}
