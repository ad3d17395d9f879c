//! The abstract syntax tree produced by the parser.
//!
//! Grounded in `original_source/apexAST.h`'s node-kind list, but redesigned
//! per spec.md §9 ("AST nesting vs ownership"): instead of one `AST` struct
//! with a `val_is_ast` flag distinguishing a string payload from a nested
//! AST child, each node kind is its own variant with statically known child
//! arity. This removes the flag and the ambiguity the original note calls out.

use crate::error::SrcLoc;
use crate::intern::StringId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BitAnd,
    BitOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Compound assignment operators; plain `=` is `AssignOp::Assign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

/// An assignable location: a bare name, an indexed element, or a member field.
#[derive(Debug, Clone)]
pub enum LValue {
    Var(StringId),
    Index { container: Box<Expr>, index: Box<Expr> },
    Member { object: Box<Expr>, name: StringId },
}

/// One element of an array literal (spec.md §4.1).
#[derive(Debug, Clone)]
pub enum ArrayElement {
    Bare(Expr),
    KeyValue(Expr, Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64, SrcLoc),
    Flt(f32, SrcLoc),
    Dbl(f64, SrcLoc),
    Str(StringId, SrcLoc),
    Bool(bool, SrcLoc),
    Null(SrcLoc),
    Var(StringId, SrcLoc),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        loc: SrcLoc,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        loc: SrcLoc,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        loc: SrcLoc,
    },
    IncDec {
        op: IncDecOp,
        target: Box<LValue>,
        loc: SrcLoc,
    },
    Assign {
        op: AssignOp,
        target: Box<LValue>,
        value: Box<Expr>,
        loc: SrcLoc,
    },
    Index {
        container: Box<Expr>,
        index: Box<Expr>,
        loc: SrcLoc,
    },
    Member {
        object: Box<Expr>,
        name: StringId,
        loc: SrcLoc,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
    MemberCall {
        object: Box<Expr>,
        name: StringId,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
    LibCall {
        lib: StringId,
        name: StringId,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
    /// `<receiver>.new(args)` — parsed as a distinct node from `MemberCall`
    /// per spec.md §4.1's disambiguation rule.
    New {
        type_name: StringId,
        args: Vec<Expr>,
        loc: SrcLoc,
    },
    ArrayLit {
        elements: Vec<ArrayElement>,
        loc: SrcLoc,
    },
    /// `Name { k = v, ... }`. Doubles as a type declaration the first time
    /// the compiler sees `Name` (spec.md §4.2 "Objects and types").
    ObjectLit {
        type_name: StringId,
        fields: Vec<(StringId, Expr)>,
        loc: SrcLoc,
    },
}

impl Expr {
    #[must_use]
    pub fn srcloc(&self) -> &SrcLoc {
        match self {
            Self::Binary { loc, .. }
            | Self::Logical { loc, .. }
            | Self::Unary { loc, .. }
            | Self::IncDec { loc, .. }
            | Self::Assign { loc, .. }
            | Self::Index { loc, .. }
            | Self::Member { loc, .. }
            | Self::Call { loc, .. }
            | Self::MemberCall { loc, .. }
            | Self::LibCall { loc, .. }
            | Self::New { loc, .. }
            | Self::ArrayLit { loc, .. }
            | Self::ObjectLit { loc, .. } => loc,
            Self::Int(_, loc)
            | Self::Flt(_, loc)
            | Self::Dbl(_, loc)
            | Self::Str(_, loc)
            | Self::Bool(_, loc)
            | Self::Null(loc)
            | Self::Var(_, loc) => loc,
        }
    }
}

/// Either a plain top-level function name, or a member-function declaration
/// target (covers both ordinary methods and constructors — `fn T.new(...)`
/// is just a method named `new`, per spec.md §4.2).
#[derive(Debug, Clone, Copy)]
pub enum FnName {
    Plain(StringId),
    Member { type_name: StringId, method_name: StringId },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Block(Vec<Stmt>),
    /// Else-if chains are flattened into `branches` (condition, body) pairs in
    /// source order, with at most one trailing `else_branch`. Spec.md §4.1:
    /// "Else-if chains are nested recursively" — this flattening is
    /// semantically equivalent and easier for the compiler to emit
    /// iteratively instead of recursing through nested `If` nodes.
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
        loc: SrcLoc,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        loc: SrcLoc,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        loc: SrcLoc,
    },
    Foreach {
        key: Option<StringId>,
        value: StringId,
        iterable: Expr,
        body: Vec<Stmt>,
        loc: SrcLoc,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<(Expr, Vec<Stmt>)>,
        default: Option<Vec<Stmt>>,
        loc: SrcLoc,
    },
    Return(Option<Expr>, SrcLoc),
    Break(SrcLoc),
    Continue(SrcLoc),
    FnDecl {
        name: FnName,
        params: Vec<StringId>,
        variadic: bool,
        body: Vec<Stmt>,
        loc: SrcLoc,
    },
    Include {
        path: String,
        loc: SrcLoc,
    },
}

/// A parsed program: a flat list of top-level statements.
pub type Program = Vec<Stmt>;
