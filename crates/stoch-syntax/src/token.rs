//! Token types and source span tracking for the PRISM lexer.

use std::fmt;

/// A span in the source code, tracking byte offsets and line/column.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, in characters not bytes).
    pub column: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Create a dummy span for synthesized nodes.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            column: if self.line <= other.line {
                self.column
            } else {
                other.column
            },
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The kind of token.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // === Model type keywords ===
    /// `dtmc` (or the legacy alias `probabilistic`)
    Dtmc,
    /// `ctmc` (or the legacy alias `stochastic`)
    Ctmc,
    /// `mdp` (or the legacy alias `nondeterministic`)
    Mdp,

    // === Structure keywords ===
    /// `module`
    Module,
    /// `endmodule`
    Endmodule,
    /// `const`
    Const,
    /// `global`
    Global,
    /// `init`
    Init,
    /// `label`
    Label,
    /// `formula`
    Formula,
    /// `rewards`
    Rewards,
    /// `endrewards`
    Endrewards,

    // === Type keywords ===
    /// `int`
    Int,
    /// `double`
    Double,
    /// `bool`
    Bool,

    // === Boolean literals ===
    /// `true`
    True,
    /// `false`
    False,

    // === Built-in functions ===
    /// `min`
    Min,
    /// `max`
    Max,
    /// `floor`
    Floor,
    /// `ceil`
    Ceil,
    /// `pow`
    Pow,
    /// `mod`
    Mod,
    /// `log`
    Log,

    // === Punctuation ===
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{` (reward structure references in properties)
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `'` (prime for update targets)
    Prime,
    /// `?`
    Question,
    /// `..`
    DotDot,
    /// `->`
    Arrow,

    // === Comparison operators (`=` is equality in PRISM) ===
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,

    // === Boolean operators ===
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `!`
    Bang,
    /// `=>`
    Implies,
    /// `<=>`
    Iff,

    // === Arithmetic operators ===
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,

    // === Literals ===
    /// Integer literal
    IntLit(i64),
    /// Decimal literal
    DoubleLit(f64),
    /// Quoted string (label name, reward structure name)
    StringLit(String),
    /// Identifier
    Ident(String),

    // === Comments ===
    /// `// ...` or `/* ... */`
    Comment(String),

    // === Special ===
    /// End of file
    Eof,
    /// Lexer error
    Error(String),
}

impl TokenKind {
    /// Get the keyword for a given identifier, if any.
    pub fn keyword(ident: &str) -> Option<TokenKind> {
        Some(match ident {
            "dtmc" | "probabilistic" => TokenKind::Dtmc,
            "ctmc" | "stochastic" => TokenKind::Ctmc,
            "mdp" | "nondeterministic" => TokenKind::Mdp,
            "module" => TokenKind::Module,
            "endmodule" => TokenKind::Endmodule,
            "const" => TokenKind::Const,
            "global" => TokenKind::Global,
            "init" => TokenKind::Init,
            "label" => TokenKind::Label,
            "formula" => TokenKind::Formula,
            "rewards" => TokenKind::Rewards,
            "endrewards" => TokenKind::Endrewards,
            "int" => TokenKind::Int,
            "double" => TokenKind::Double,
            "bool" => TokenKind::Bool,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "min" => TokenKind::Min,
            "max" => TokenKind::Max,
            "floor" => TokenKind::Floor,
            "ceil" => TokenKind::Ceil,
            "pow" => TokenKind::Pow,
            "mod" => TokenKind::Mod,
            "log" => TokenKind::Log,
            _ => return None,
        })
    }

    /// Check if this is a trivia token (comments only; whitespace never
    /// becomes a token).
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Dtmc => write!(f, "dtmc"),
            TokenKind::Ctmc => write!(f, "ctmc"),
            TokenKind::Mdp => write!(f, "mdp"),
            TokenKind::Module => write!(f, "module"),
            TokenKind::Endmodule => write!(f, "endmodule"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Global => write!(f, "global"),
            TokenKind::Init => write!(f, "init"),
            TokenKind::Label => write!(f, "label"),
            TokenKind::Formula => write!(f, "formula"),
            TokenKind::Rewards => write!(f, "rewards"),
            TokenKind::Endrewards => write!(f, "endrewards"),
            TokenKind::Int => write!(f, "int"),
            TokenKind::Double => write!(f, "double"),
            TokenKind::Bool => write!(f, "bool"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Min => write!(f, "min"),
            TokenKind::Max => write!(f, "max"),
            TokenKind::Floor => write!(f, "floor"),
            TokenKind::Ceil => write!(f, "ceil"),
            TokenKind::Pow => write!(f, "pow"),
            TokenKind::Mod => write!(f, "mod"),
            TokenKind::Log => write!(f, "log"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Prime => write!(f, "'"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::DotDot => write!(f, ".."),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Ne => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Le => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Implies => write!(f, "=>"),
            TokenKind::Iff => write!(f, "<=>"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::IntLit(n) => write!(f, "{}", n),
            TokenKind::DoubleLit(x) => write!(f, "{}", x),
            TokenKind::StringLit(s) => write!(f, "\"{}\"", s),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::Comment(s) => write!(f, "// {}", s),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Error(msg) => write!(f, "ERROR: {}", msg),
        }
    }
}

/// A token with its span in the source code.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the source code.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Check if this is the end of file.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Check if this is an error token.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }
}
