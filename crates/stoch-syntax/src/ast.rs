//! Abstract syntax tree for PRISM programs.

use crate::token::Span;
use std::fmt;

/// The model type declared at the top of a PRISM program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Discrete-time Markov chain.
    Dtmc,
    /// Continuous-time Markov chain.
    Ctmc,
    /// Markov decision process.
    Mdp,
}

impl ModelType {
    /// The PRISM keyword for this model type.
    pub fn keyword(self) -> &'static str {
        match self {
            ModelType::Dtmc => "dtmc",
            ModelType::Ctmc => "ctmc",
            ModelType::Mdp => "mdp",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Dtmc => write!(f, "DTMC"),
            ModelType::Ctmc => write!(f, "CTMC"),
            ModelType::Mdp => write!(f, "MDP"),
        }
    }
}

/// An identifier with its source span.
#[derive(Debug, Clone)]
pub struct Ident {
    /// The identifier name.
    pub name: String,
    /// Source span.
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

/// A complete PRISM program.
#[derive(Debug, Clone)]
pub struct Program {
    /// Declared model type.
    pub model_type: ModelType,
    /// Constant declarations, in source order.
    pub constants: Vec<ConstantDecl>,
    /// Global variable declarations.
    pub globals: Vec<VarDecl>,
    /// Formula (macro) declarations.
    pub formulas: Vec<FormulaDecl>,
    /// Label declarations.
    pub labels: Vec<LabelDecl>,
    /// Module declarations, in source order.
    pub modules: Vec<ModuleDecl>,
    /// Reward structure declarations.
    pub rewards: Vec<RewardsDecl>,
    /// Span covering the entire program.
    pub span: Span,
}

impl Program {
    /// Number of modules in the program.
    pub fn nr_modules(&self) -> usize {
        self.modules.len()
    }

    /// The declared model type.
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Whether any declared constant is left without a defining expression.
    pub fn has_undefined_constants(&self) -> bool {
        self.constants.iter().any(|c| c.value.is_none())
    }

    /// Look up a constant declaration by name.
    pub fn constant(&self, name: &str) -> Option<&ConstantDecl> {
        self.constants.iter().find(|c| c.name.name == name)
    }

    /// Look up a formula declaration by name.
    pub fn formula(&self, name: &str) -> Option<&FormulaDecl> {
        self.formulas.iter().find(|f| f.name.name == name)
    }

    /// Look up a label declaration by (unquoted) name.
    pub fn label(&self, name: &str) -> Option<&LabelDecl> {
        self.labels.iter().find(|l| l.name == name)
    }

    /// Iterate over all variable declarations: globals first, then module
    /// variables in source order. This is also the state vector layout used
    /// by the model builder.
    pub fn all_variables(&self) -> impl Iterator<Item = &VarDecl> {
        self.globals
            .iter()
            .chain(self.modules.iter().flat_map(|m| m.vars.iter()))
    }

    /// Look up a variable declaration by name.
    pub fn variable(&self, name: &str) -> Option<&VarDecl> {
        self.all_variables().find(|v| v.name.name == name)
    }
}

/// The type of a constant declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstType {
    Int,
    Double,
    Bool,
}

impl fmt::Display for ConstType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstType::Int => write!(f, "int"),
            ConstType::Double => write!(f, "double"),
            ConstType::Bool => write!(f, "bool"),
        }
    }
}

/// `const int N = 5;` — `value` is `None` for undefined constants
/// (`const double p;`) that must be supplied externally or, for doubles,
/// may remain as parameters of a parametric model.
#[derive(Debug, Clone)]
pub struct ConstantDecl {
    pub name: Ident,
    pub ty: ConstType,
    pub value: Option<Expr>,
    pub span: Span,
}

/// The declared range of a state variable.
#[derive(Debug, Clone)]
pub enum VarRange {
    /// `[lo..hi]` — bounds are constant expressions.
    BoundedInt { low: Expr, high: Expr },
    /// `bool`
    Bool,
}

/// `x : [0..7] init 0;` — `init` is `None` when the variable starts at its
/// lower bound (`false` for booleans).
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Ident,
    pub range: VarRange,
    pub init: Option<Expr>,
    pub span: Span,
}

/// `module NAME ... endmodule`
#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub name: Ident,
    pub vars: Vec<VarDecl>,
    pub commands: Vec<Command>,
    pub span: Span,
}

impl ModuleDecl {
    /// Whether any command of this module carries the given action label.
    pub fn has_action(&self, action: &str) -> bool {
        self.commands
            .iter()
            .any(|c| c.action.as_ref().is_some_and(|a| a.name == action))
    }
}

/// A guarded command `[action] guard -> p1 : u1 + ... + pn : un;`.
#[derive(Debug, Clone)]
pub struct Command {
    /// Action label for synchronization, `None` for `[]`.
    pub action: Option<Ident>,
    pub guard: Expr,
    pub updates: Vec<Update>,
    pub span: Span,
}

/// One probabilistic branch of a command. A missing probability expression
/// means probability (or rate) 1.
#[derive(Debug, Clone)]
pub struct Update {
    pub probability: Option<Expr>,
    /// Assignments applied atomically; an empty list is the `true` update.
    pub assignments: Vec<Assignment>,
    pub span: Span,
}

/// `(x'=e)`
#[derive(Debug, Clone)]
pub struct Assignment {
    pub var: Ident,
    pub value: Expr,
    pub span: Span,
}

/// `label "name" = expr;`
#[derive(Debug, Clone)]
pub struct LabelDecl {
    /// Unquoted label name.
    pub name: String,
    pub expr: Expr,
    pub span: Span,
}

/// `formula name = expr;`
#[derive(Debug, Clone)]
pub struct FormulaDecl {
    pub name: Ident,
    pub expr: Expr,
    pub span: Span,
}

/// `rewards ["name"] ... endrewards`
#[derive(Debug, Clone)]
pub struct RewardsDecl {
    pub name: Option<String>,
    pub items: Vec<RewardItem>,
    pub span: Span,
}

/// One item of a reward structure.
#[derive(Debug, Clone)]
pub enum RewardItem {
    /// `guard : value;` — accumulated in states satisfying the guard.
    State { guard: Expr, value: Expr, span: Span },
    /// `[action] guard : value;` — accumulated on transitions.
    Action {
        action: Option<Ident>,
        guard: Expr,
        value: Expr,
        span: Span,
    },
}

/// An expression.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of expression.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Decimal literal.
    Double(f64),
    /// Identifier (variable, constant, or formula reference).
    Ident(String),
    /// Unary operation.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Binary operation.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Conditional `cond ? a : b`.
    Ite {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// Built-in function call `min(a, b)`, `floor(x)`, ...
    Call { func: Func, args: Vec<Expr> },
    /// Parenthesized expression, kept for faithful re-rendering.
    Paren(Box<Expr>),
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Min,
    Max,
    Floor,
    Ceil,
    Pow,
    Mod,
    Log,
}

impl Func {
    pub fn name(self) -> &'static str {
        match self {
            Func::Min => "min",
            Func::Max => "max",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Pow => "pow",
            Func::Mod => "mod",
            Func::Log => "log",
        }
    }

    /// Number of arguments the function expects.
    pub fn arity(self) -> usize {
        match self {
            Func::Min | Func::Max | Func::Pow | Func::Mod | Func::Log => 2,
            Func::Floor | Func::Ceil => 1,
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Logical
    Iff,
    Implies,
    Or,
    And,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Get the precedence of this operator (higher = binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Iff => 1,
            BinOp::Implies => 2,
            BinOp::Or => 3,
            BinOp::And => 4,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 5,
            BinOp::Add | BinOp::Sub => 6,
            BinOp::Mul | BinOp::Div => 7,
        }
    }

    /// Check if this operator is right-associative.
    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinOp::Implies | BinOp::Iff)
    }

    /// Surface syntax for this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Iff => "<=>",
            BinOp::Implies => "=>",
            BinOp::Or => "|",
            BinOp::And => "&",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}
