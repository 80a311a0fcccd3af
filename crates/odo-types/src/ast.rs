//! AST node types for the Odo language.
//!
//! Every node carries a [`Span`] for error reporting. Function and module
//! declarations sit behind [`Rc`] so runtime values and deferred entries can
//! hold on to them after the owning [`Program`] is dropped.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::{Span, TypeId};

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed Odo program: a list of top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// `{ stmts }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Type Annotations
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub kind: TypeAnnotationKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeAnnotationKind {
    /// `int`, `Color`, `shapes::Kind`
    Named(Vec<Ident>),
    /// `<int, double?: text>`
    Function {
        params: Vec<FunctionTypeParam>,
        ret: Option<Box<TypeAnnotation>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub ty: TypeAnnotation,
    pub optional: bool,
}

impl fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeAnnotationKind::Named(path) => {
                for (i, part) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str("::")?;
                    }
                    f.write_str(&part.name)?;
                }
                Ok(())
            }
            TypeAnnotationKind::Function { params, ret } => {
                f.write_str("<")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", param.ty)?;
                    if param.optional {
                        f.write_str("?")?;
                    }
                }
                f.write_str(":")?;
                if let Some(ret) = ret {
                    write!(f, " {ret}")?;
                }
                f.write_str(">")
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `var x: T = e` / `const x: T = e`
    VarDecl(VarDecl),
    /// `if cond { } else ...`
    If(IfStmt),
    /// `{ ... }`
    Block(Block),
    /// `loop { ... }`
    Loop(Block),
    /// `while cond { ... }`
    While { cond: Expr, body: Block },
    /// `forange i : a, b { ... }`
    Forange(Forange),
    /// `func name(params): R { ... }`
    Func(Rc<FuncDecl>),
    Break,
    Continue,
    /// `return [expr]`
    Return(Option<Expr>),
    /// `module Name { ... }`
    Module(Rc<ModuleDecl>),
    /// `enum Name { A B }`
    Enum(EnumDecl),
    Expr(Expr),
}

/// A variable, constant or parameter declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    /// `None` means `any`.
    pub ty: Option<TypeAnnotation>,
    pub init: Option<Expr>,
    pub constant: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    ElseIf(Box<IfStmt>),
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forange {
    pub ident: Option<Ident>,
    pub reversed: bool,
    /// Upper bound when `second` is absent, lower bound otherwise.
    pub first: Expr,
    pub second: Option<Expr>,
    pub body: Block,
}

/// A function declaration or an anonymous function literal (`name == None`).
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: Option<Ident>,
    pub params: Vec<VarDecl>,
    pub ret: Option<TypeAnnotation>,
    pub body: Block,
    pub span: Span,
}

impl FuncDecl {
    /// Name used in diagnostics and value display.
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("anonymous", |n| n.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub name: Ident,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Ident,
    pub cases: Vec<Ident>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Double(f64),
    Text(String),
    Bool(bool),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `cond ? then_expr : else_expr`
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        /// Static type of the whole expression, recorded by the analyzer.
        result_ty: Cell<Option<TypeId>>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `target::name`
    StaticAccess {
        target: Box<Expr>,
        name: Ident,
    },
    /// `target = value`; the target is a variable or a static access.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `func (params): R { ... }`
    Func(Rc<FuncDecl>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
}

/// Operator families, each with its own typing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Arithmetic,
    Logic,
    Equality,
    Relational,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    pub fn class(self) -> OpClass {
        match self {
            BinOp::Or | BinOp::And => OpClass::Logic,
            BinOp::Eq | BinOp::NotEq => OpClass::Equality,
            BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq => {
                OpClass::Relational
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => OpClass::Arithmetic,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}
