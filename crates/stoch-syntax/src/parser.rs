//! Recursive descent parser for the PRISM modelling language.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use std::collections::HashSet;
use thiserror::Error;

/// Parser error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token at {span}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("unexpected end of file at {span}")]
    UnexpectedEof { span: Span },
    #[error("invalid syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },
    #[error("lexical error at {span}: {message}")]
    Lex { message: String, span: Span },
    #[error("duplicate declaration of '{name}' at {span}")]
    Duplicate { name: String, span: Span },
}

impl ParseError {
    /// Get the source span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::UnexpectedEof { span } => *span,
            ParseError::InvalidSyntax { span, .. } => *span,
            ParseError::Lex { span, .. } => *span,
            ParseError::Duplicate { span, .. } => *span,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a PRISM program from source text.
pub fn parse(source: &str) -> ParseResult<Program> {
    Parser::new(source)?.parse_program()
}

/// Parser for PRISM source code.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from source text. Fails on lexical errors.
    pub fn new(source: &str) -> ParseResult<Self> {
        let tokens: Vec<_> = Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        for token in &tokens {
            if let TokenKind::Error(message) = &token.kind {
                return Err(ParseError::Lex {
                    message: message.clone(),
                    span: token.span,
                });
            }
        }
        Ok(Self { tokens, pos: 0 })
    }

    /// Create a parser from an already-lexed token stream. Used by the
    /// property parser, which shares this lexer and expression grammar.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete program.
    pub fn parse_program(&mut self) -> ParseResult<Program> {
        let start = self.current_span();
        let model_type = self.parse_model_type()?;

        let mut constants = Vec::new();
        let mut globals = Vec::new();
        let mut formulas = Vec::new();
        let mut labels = Vec::new();
        let mut modules = Vec::new();
        let mut rewards = Vec::new();

        while !self.is_at_end() {
            match self.peek_kind() {
                TokenKind::Const => constants.push(self.parse_constant_decl()?),
                TokenKind::Global => globals.push(self.parse_global_decl()?),
                TokenKind::Formula => formulas.push(self.parse_formula_decl()?),
                TokenKind::Label => labels.push(self.parse_label_decl()?),
                TokenKind::Module => modules.push(self.parse_module_decl()?),
                TokenKind::Rewards => rewards.push(self.parse_rewards_decl()?),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "declaration".to_string(),
                        found: self.peek_kind().to_string(),
                        span: self.current_span(),
                    })
                }
            }
        }

        let span = start.merge(self.prev_span());
        let program = Program {
            model_type,
            constants,
            globals,
            formulas,
            labels,
            modules,
            rewards,
            span,
        };
        check_duplicates(&program)?;
        Ok(program)
    }

    fn parse_model_type(&mut self) -> ParseResult<ModelType> {
        let kind = self.peek_kind();
        let model_type = match kind {
            TokenKind::Dtmc => ModelType::Dtmc,
            TokenKind::Ctmc => ModelType::Ctmc,
            TokenKind::Mdp => ModelType::Mdp,
            _ => {
                return Err(ParseError::UnexpectedToken {
                    expected: "model type (dtmc, ctmc, or mdp)".to_string(),
                    found: kind.to_string(),
                    span: self.current_span(),
                })
            }
        };
        self.advance();
        Ok(model_type)
    }

    /// Parse `const [int|double|bool] NAME [= expr];`. The type keyword
    /// defaults to `int` when omitted.
    fn parse_constant_decl(&mut self) -> ParseResult<ConstantDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Const)?;

        let ty = match self.peek_kind() {
            TokenKind::Int => {
                self.advance();
                ConstType::Int
            }
            TokenKind::Double => {
                self.advance();
                ConstType::Double
            }
            TokenKind::Bool => {
                self.advance();
                ConstType::Bool
            }
            _ => ConstType::Int,
        };

        let name = self.parse_ident()?;
        let value = if self.peek_kind() == TokenKind::Eq {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(self.prev_span());
        Ok(ConstantDecl {
            name,
            ty,
            value,
            span,
        })
    }

    fn parse_global_decl(&mut self) -> ParseResult<VarDecl> {
        self.expect(TokenKind::Global)?;
        self.parse_var_decl()
    }

    /// Parse `name : [lo..hi] init e;` or `name : bool init e;`.
    fn parse_var_decl(&mut self) -> ParseResult<VarDecl> {
        let start = self.current_span();
        let name = self.parse_ident()?;
        self.expect(TokenKind::Colon)?;

        let range = if self.peek_kind() == TokenKind::Bool {
            self.advance();
            VarRange::Bool
        } else {
            self.expect(TokenKind::LBracket)?;
            let low = self.parse_expr()?;
            self.expect(TokenKind::DotDot)?;
            let high = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            VarRange::BoundedInt { low, high }
        };

        let init = if self.peek_kind() == TokenKind::Init {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(self.prev_span());
        Ok(VarDecl {
            name,
            range,
            init,
            span,
        })
    }

    fn parse_formula_decl(&mut self) -> ParseResult<FormulaDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Formula)?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        let span = start.merge(self.prev_span());
        Ok(FormulaDecl { name, expr, span })
    }

    fn parse_label_decl(&mut self) -> ParseResult<LabelDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Label)?;
        let name = self.parse_string()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        let span = start.merge(self.prev_span());
        Ok(LabelDecl { name, expr, span })
    }

    fn parse_module_decl(&mut self) -> ParseResult<ModuleDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Module)?;
        let name = self.parse_ident()?;

        let mut vars = Vec::new();
        let mut commands = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Endmodule => {
                    self.advance();
                    break;
                }
                TokenKind::LBracket => commands.push(self.parse_command()?),
                TokenKind::Ident(_) => vars.push(self.parse_var_decl()?),
                other => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "variable declaration, command, or endmodule".to_string(),
                        found: other.to_string(),
                        span: self.current_span(),
                    })
                }
            }
        }

        let span = start.merge(self.prev_span());
        Ok(ModuleDecl {
            name,
            vars,
            commands,
            span,
        })
    }

    /// Parse `[action] guard -> p1 : u1 + ... + pn : un;`.
    fn parse_command(&mut self) -> ParseResult<Command> {
        let start = self.current_span();
        self.expect(TokenKind::LBracket)?;
        let action = if matches!(self.peek_kind(), TokenKind::Ident(_)) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::RBracket)?;

        let guard = self.parse_expr()?;
        self.expect(TokenKind::Arrow)?;

        let mut updates = vec![self.parse_update()?];
        while self.peek_kind() == TokenKind::Plus {
            self.advance();
            updates.push(self.parse_update()?);
        }
        self.expect(TokenKind::Semicolon)?;

        let span = start.merge(self.prev_span());
        Ok(Command {
            action,
            guard,
            updates,
            span,
        })
    }

    /// Parse one update branch: `prob : assignments`, a bare assignment
    /// list (probability 1), or `true` (no change).
    fn parse_update(&mut self) -> ParseResult<Update> {
        let start = self.current_span();

        // Bare assignment list: `(x'=e) & ...` with implicit probability 1.
        let bare_assignment = self.peek_kind() == TokenKind::LParen
            && matches!(self.peek_ahead_kind(1), TokenKind::Ident(_))
            && self.peek_ahead_kind(2) == TokenKind::Prime;
        if bare_assignment {
            let assignments = self.parse_assignments()?;
            let span = start.merge(self.prev_span());
            return Ok(Update {
                probability: None,
                assignments,
                span,
            });
        }

        // Bare `true` update with implicit probability 1.
        if self.peek_kind() == TokenKind::True
            && matches!(
                self.peek_ahead_kind(1),
                TokenKind::Semicolon | TokenKind::Plus
            )
        {
            self.advance();
            let span = start.merge(self.prev_span());
            return Ok(Update {
                probability: None,
                assignments: Vec::new(),
                span,
            });
        }

        let probability = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let assignments = if self.peek_kind() == TokenKind::True {
            self.advance();
            Vec::new()
        } else {
            self.parse_assignments()?
        };
        let span = start.merge(self.prev_span());
        Ok(Update {
            probability: Some(probability),
            assignments,
            span,
        })
    }

    /// Parse `(x'=e) & (y'=e) & ...`.
    fn parse_assignments(&mut self) -> ParseResult<Vec<Assignment>> {
        let mut assignments = vec![self.parse_assignment()?];
        while self.peek_kind() == TokenKind::Amp {
            self.advance();
            assignments.push(self.parse_assignment()?);
        }
        Ok(assignments)
    }

    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        let start = self.current_span();
        self.expect(TokenKind::LParen)?;
        let var = self.parse_ident()?;
        self.expect(TokenKind::Prime)?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let span = start.merge(self.prev_span());
        Ok(Assignment { var, value, span })
    }

    fn parse_rewards_decl(&mut self) -> ParseResult<RewardsDecl> {
        let start = self.current_span();
        self.expect(TokenKind::Rewards)?;
        let name = if matches!(self.peek_kind(), TokenKind::StringLit(_)) {
            Some(self.parse_string()?)
        } else {
            None
        };

        let mut items = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Endrewards => {
                    self.advance();
                    break;
                }
                TokenKind::LBracket => {
                    let item_start = self.current_span();
                    self.advance();
                    let action = if matches!(self.peek_kind(), TokenKind::Ident(_)) {
                        Some(self.parse_ident()?)
                    } else {
                        None
                    };
                    self.expect(TokenKind::RBracket)?;
                    let guard = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    items.push(RewardItem::Action {
                        action,
                        guard,
                        value,
                        span: item_start.merge(self.prev_span()),
                    });
                }
                _ => {
                    let item_start = self.current_span();
                    let guard = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    self.expect(TokenKind::Semicolon)?;
                    items.push(RewardItem::State {
                        guard,
                        value,
                        span: item_start.merge(self.prev_span()),
                    });
                }
            }
        }

        let span = start.merge(self.prev_span());
        Ok(RewardsDecl { name, items, span })
    }

    // === Expressions ===

    /// Parse an expression (entry point: ternary has lowest precedence).
    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let cond = self.parse_binary_expr(0)?;
        if self.peek_kind() != TokenKind::Question {
            return Ok(cond);
        }
        self.advance();
        let then_branch = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let else_branch = self.parse_expr()?;
        let span = start.merge(self.prev_span());
        Ok(Expr::new(
            ExprKind::Ite {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    /// Precedence-climbing binary expression parser.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let start = self.current_span();
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = binop_for(&self.peek_kind()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            let span = start.merge(self.prev_span());
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        match self.peek_kind() {
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                let span = start.merge(self.prev_span());
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary_expr()?;
                let span = start.merge(self.prev_span());
                Ok(Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_span();
        let kind = self.peek_kind();
        match kind {
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Bool(false), start))
            }
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Expr::new(ExprKind::Int(n), start))
            }
            TokenKind::DoubleLit(x) => {
                self.advance();
                Ok(Expr::new(ExprKind::Double(x), start))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), start))
            }
            TokenKind::Min => self.parse_call(Func::Min),
            TokenKind::Max => self.parse_call(Func::Max),
            TokenKind::Floor => self.parse_call(Func::Floor),
            TokenKind::Ceil => self.parse_call(Func::Ceil),
            TokenKind::Pow => self.parse_call(Func::Pow),
            TokenKind::Mod => self.parse_call(Func::Mod),
            TokenKind::Log => self.parse_call(Func::Log),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let span = start.merge(self.prev_span());
                Ok(Expr::new(ExprKind::Paren(Box::new(inner)), span))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof {
                span: self.current_span(),
            }),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    fn parse_call(&mut self, func: Func) -> ParseResult<Expr> {
        let start = self.current_span();
        self.advance();
        self.expect(TokenKind::LParen)?;
        let mut args = vec![self.parse_expr()?];
        while self.peek_kind() == TokenKind::Comma {
            self.advance();
            args.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RParen)?;
        let span = start.merge(self.prev_span());

        if args.len() != func.arity() {
            return Err(ParseError::InvalidSyntax {
                message: format!(
                    "{} expects {} argument(s), got {}",
                    func.name(),
                    func.arity(),
                    args.len()
                ),
                span,
            });
        }
        Ok(Expr::new(ExprKind::Call { func, args }, span))
    }

    /// Parse an expression at comparison precedence, stopping before the
    /// boolean connectives. The property grammar in `stoch-logic` uses this
    /// for atoms, keeping `&`, `|`, and `=>` as formula-level operators.
    pub fn parse_comparison_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary_expr(BinOp::Eq.precedence())
    }

    // === Token helpers ===

    /// Current position in the token stream, for backtracking.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Rewind to a previously saved position.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.tokens.len());
    }

    /// Peek at the current token kind.
    pub fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    /// Peek `n` tokens ahead.
    pub fn peek_ahead_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    /// Span of the current token.
    pub fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Span of the previous token.
    pub fn prev_span(&self) -> Span {
        if self.pos == 0 {
            return Span::dummy();
        }
        self.tokens
            .get(self.pos - 1)
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Advance past the current token.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Check whether the parser is at the end of input.
    pub fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Consume the expected token kind or fail.
    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek_kind() == kind {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: kind.to_string(),
                found: self.peek_kind().to_string(),
                span: self.current_span(),
            })
        }
    }

    /// Parse an identifier token.
    pub fn parse_ident(&mut self) -> ParseResult<Ident> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let span = self.current_span();
                self.advance();
                Ok(Ident::new(name, span))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "identifier".to_string(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    /// Parse a quoted string token.
    pub fn parse_string(&mut self) -> ParseResult<String> {
        match self.peek_kind() {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "quoted string".to_string(),
                found: other.to_string(),
                span: self.current_span(),
            }),
        }
    }
}

/// Map a token to its binary operator, if any.
fn binop_for(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::Iff => BinOp::Iff,
        TokenKind::Implies => BinOp::Implies,
        TokenKind::Pipe => BinOp::Or,
        TokenKind::Amp => BinOp::And,
        TokenKind::Eq => BinOp::Eq,
        TokenKind::Ne => BinOp::Ne,
        TokenKind::Lt => BinOp::Lt,
        TokenKind::Le => BinOp::Le,
        TokenKind::Gt => BinOp::Gt,
        TokenKind::Ge => BinOp::Ge,
        TokenKind::Plus => BinOp::Add,
        TokenKind::Minus => BinOp::Sub,
        TokenKind::Star => BinOp::Mul,
        TokenKind::Slash => BinOp::Div,
        _ => return None,
    })
}

/// Reject duplicate declarations. Constants, variables, and formulas share
/// one identifier namespace; module names and label names each have their
/// own.
fn check_duplicates(program: &Program) -> ParseResult<()> {
    let mut idents: HashSet<&str> = HashSet::new();
    for c in &program.constants {
        if !idents.insert(&c.name.name) {
            return Err(ParseError::Duplicate {
                name: c.name.name.clone(),
                span: c.name.span,
            });
        }
    }
    for f in &program.formulas {
        if !idents.insert(&f.name.name) {
            return Err(ParseError::Duplicate {
                name: f.name.name.clone(),
                span: f.name.span,
            });
        }
    }
    for v in program.all_variables() {
        if !idents.insert(&v.name.name) {
            return Err(ParseError::Duplicate {
                name: v.name.name.clone(),
                span: v.name.span,
            });
        }
    }

    let mut modules: HashSet<&str> = HashSet::new();
    for m in &program.modules {
        if !modules.insert(&m.name.name) {
            return Err(ParseError::Duplicate {
                name: m.name.name.clone(),
                span: m.name.span,
            });
        }
    }

    let mut labels: HashSet<&str> = HashSet::new();
    for l in &program.labels {
        if !labels.insert(&l.name) {
            return Err(ParseError::Duplicate {
                name: l.name.clone(),
                span: l.span,
            });
        }
    }
    Ok(())
}
