//! Syntax tree produced by the parser and walked by the evaluator.
//!
//! Nodes are plain owned data so a parsed [`Program`] can live in the shared
//! program cache behind an `Arc` and be evaluated concurrently by independent
//! interpreters.

/// A parsed script: the unit stored in the program cache.
#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub statements: Vec<Stmt>,
}

pub(crate) type Block = Vec<Stmt>;

#[derive(Debug, Clone)]
pub(crate) struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub(crate) enum StmtKind {
    Expr(Expr),
    Assign {
        target: AssignTarget,
        value: Expr,
    },
    /// `a, b = expr` — the right-hand side must evaluate to a sequence of
    /// matching arity. `a, b = c, d` is packed into a tuple by the parser.
    MultiAssign {
        targets: Vec<AssignTarget>,
        value: Expr,
    },
    AugAssign {
        target: AssignTarget,
        op: BinOp,
        value: Expr,
    },
    If {
        /// `if` plus any `elif` arms, in source order.
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        targets: Vec<String>,
        iterable: Expr,
        body: Block,
    },
    Def(FunctionDef),
    Class {
        name: String,
        base: Option<Expr>,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Pass,
    Try {
        body: Block,
        handlers: Vec<ExceptHandler>,
        finally: Option<Block>,
    },
    /// `raise expr`, or bare `raise` to re-raise the caught exception.
    Raise(Option<Expr>),
    Import {
        path: String,
        alias: Option<String>,
    },
    Global(Vec<String>),
    Nonlocal(Vec<String>),
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
}

/// An assignable location: name, subscript, or attribute.
#[derive(Debug, Clone)]
pub(crate) enum AssignTarget {
    Name(String),
    Index { obj: Expr, index: Expr },
    Attr { obj: Expr, name: String },
}

#[derive(Debug, Clone)]
pub(crate) struct ExceptHandler {
    /// Exception kind name to match, or `None` for a bare `except:`.
    pub kind: Option<String>,
    /// Variable bound to the caught exception (`except E as var`).
    pub alias: Option<String>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub name: String,
    pub default: Option<Expr>,
    /// `*args`: collects surplus positional arguments into a tuple.
    pub variadic: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub(crate) enum ExprKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,
    FString(Vec<FStringPart>),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    ListComp {
        value: Box<Expr>,
        targets: Vec<String>,
        iterable: Box<Expr>,
        cond: Option<Box<Expr>>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        targets: Vec<String>,
        iterable: Box<Expr>,
        cond: Option<Box<Expr>>,
    },
    Lambda {
        params: Vec<Param>,
        body: Box<Expr>,
    },
    Prefix {
        op: PrefixOp,
        operand: Box<Expr>,
    },
    Infix {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuiting `and` / `or`; yields the operand value, not a bool.
    BoolOp {
        and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a < b < c` as one node so each middle term is evaluated exactly once.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        obj: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Attr {
        obj: Box<Expr>,
        name: String,
    },
}

#[derive(Debug, Clone)]
pub(crate) enum FStringPart {
    Literal(String),
    Expr {
        expr: Box<Expr>,
        /// Raw format spec captured after `:` inside the braces.
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrefixOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    NotIn,
}

impl CmpOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}
