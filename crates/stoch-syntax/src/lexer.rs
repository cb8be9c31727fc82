//! Lexer for the PRISM modelling language.
//!
//! Converts source text into a stream of tokens. The same lexer backs the
//! property parser in `stoch-logic`, which treats `P`, `R`, `F`, `G`, `X`
//! and `U` as plain identifiers with contextual meaning.

use crate::token::{Span, Token, TokenKind};
use std::str::Chars;

/// Lexer for PRISM source code.
pub struct Lexer<'a> {
    /// Source text being lexed.
    source: &'a str,
    /// Character iterator.
    chars: Chars<'a>,
    /// Current byte position.
    pos: usize,
    /// Current line number (1-indexed).
    line: u32,
    /// Current column number (1-indexed).
    column: u32,
    /// Start position of current token.
    token_start: usize,
    /// Start line of current token.
    token_start_line: u32,
    /// Start column of current token.
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars(),
            pos: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Tokenize the entire source, returning all tokens including EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.mark_token_start();

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        // Single-line comment
        if c == '/' && self.peek_next() == Some('/') {
            return self.lex_comment();
        }

        // Multi-line comment
        if c == '/' && self.peek_next() == Some('*') {
            return self.lex_multiline_comment();
        }

        // Quoted string (label names)
        if c == '"' {
            return self.lex_string();
        }

        // Number literal (integer or decimal)
        if c.is_ascii_digit() {
            return self.lex_number();
        }

        // Identifier or keyword
        if c.is_alphabetic() || c == '_' {
            return self.lex_identifier();
        }

        // Operators and punctuation
        self.lex_operator_or_punctuation()
    }

    /// Skip whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Mark the start of a new token.
    fn mark_token_start(&mut self) {
        self.token_start = self.pos;
        self.token_start_line = self.line;
        self.token_start_column = self.column;
    }

    /// Peek at the current character without consuming it.
    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Peek at the next character (after current) without consuming.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.chars.clone();
        chars.next();
        chars.next()
    }

    /// Advance to the next character, returning the current one.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Create a token with the current span.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            Span::new(
                self.token_start,
                self.pos,
                self.token_start_line,
                self.token_start_column,
            ),
        )
    }

    /// Get the text of the current token.
    fn token_text(&self) -> &'a str {
        &self.source[self.token_start..self.pos]
    }

    /// Lex a single-line comment.
    fn lex_comment(&mut self) -> Token {
        // Skip //
        self.advance();
        self.advance();

        // Skip optional leading space
        if self.peek() == Some(' ') {
            self.advance();
        }

        let content_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }

        let content = self.source[content_start..self.pos].to_string();
        self.make_token(TokenKind::Comment(content))
    }

    /// Lex a multi-line comment (non-nesting, as in PRISM).
    fn lex_multiline_comment(&mut self) -> Token {
        // Skip /*
        self.advance();
        self.advance();

        let content_start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return self.make_token(TokenKind::Error(
                        "unterminated multi-line comment".to_string(),
                    ));
                }
                Some('*') if self.peek_next() == Some('/') => {
                    let content = self.source[content_start..self.pos].to_string();
                    self.advance();
                    self.advance();
                    return self.make_token(TokenKind::Comment(content));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Lex a quoted string. PRISM label names have no escape sequences.
    fn lex_string(&mut self) -> Token {
        // Skip opening quote
        self.advance();

        let content_start = self.pos;
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return self
                        .make_token(TokenKind::Error("unterminated string literal".to_string()));
                }
                Some('"') => {
                    let content = self.source[content_start..self.pos].to_string();
                    self.advance();
                    return self.make_token(TokenKind::StringLit(content));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// Lex a number literal: an integer, or a decimal if a `.` follows that
    /// is not the start of a `..` range.
    fn lex_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // `0..7` must lex as IntLit DotDot IntLit, so only consume the dot
        // when a digit follows it.
        let is_decimal = self.peek() == Some('.')
            && self.peek_next().map_or(false, |c| c.is_ascii_digit());
        if is_decimal {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
            let text = self.token_text();
            return match text.parse::<f64>() {
                Ok(x) => self.make_token(TokenKind::DoubleLit(x)),
                Err(_) => self.make_token(TokenKind::Error(format!("invalid decimal: {}", text))),
            };
        }

        let text = self.token_text();
        match text.parse::<i64>() {
            Ok(n) => self.make_token(TokenKind::IntLit(n)),
            Err(_) => self.make_token(TokenKind::Error(format!("invalid integer: {}", text))),
        }
    }

    /// Lex an identifier or keyword.
    fn lex_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let text = self.token_text();
        if let Some(keyword) = TokenKind::keyword(text) {
            self.make_token(keyword)
        } else {
            self.make_token(TokenKind::Ident(text.to_string()))
        }
    }

    /// Lex an operator or punctuation.
    fn lex_operator_or_punctuation(&mut self) -> Token {
        let c = match self.advance() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        match c {
            '(' => self.make_token(TokenKind::LParen),
            ')' => self.make_token(TokenKind::RParen),
            '[' => self.make_token(TokenKind::LBracket),
            ']' => self.make_token(TokenKind::RBracket),
            '{' => self.make_token(TokenKind::LBrace),
            '}' => self.make_token(TokenKind::RBrace),
            ',' => self.make_token(TokenKind::Comma),
            ':' => self.make_token(TokenKind::Colon),
            ';' => self.make_token(TokenKind::Semicolon),
            '\'' => self.make_token(TokenKind::Prime),
            '?' => self.make_token(TokenKind::Question),
            '&' => self.make_token(TokenKind::Amp),
            '|' => self.make_token(TokenKind::Pipe),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '.' => {
                if self.peek() == Some('.') {
                    self.advance();
                    self.make_token(TokenKind::DotDot)
                } else {
                    self.make_token(TokenKind::Error("unexpected character: .".to_string()))
                }
            }
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::Arrow)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            '=' => {
                if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::Implies)
                } else {
                    self.make_token(TokenKind::Eq)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::Ne)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    if self.peek_next() == Some('>') {
                        self.advance();
                        self.advance();
                        self.make_token(TokenKind::Iff)
                    } else {
                        self.advance();
                        self.make_token(TokenKind::Le)
                    }
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::Ge)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            _ => self.make_token(TokenKind::Error(format!("unexpected character: {}", c))),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            lex("dtmc module endmodule"),
            vec![
                TokenKind::Dtmc,
                TokenKind::Module,
                TokenKind::Endmodule,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_model_type_aliases() {
        assert_eq!(lex("probabilistic"), vec![TokenKind::Dtmc, TokenKind::Eof]);
        assert_eq!(lex("stochastic"), vec![TokenKind::Ctmc, TokenKind::Eof]);
        assert_eq!(
            lex("nondeterministic"),
            vec![TokenKind::Mdp, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("0 42 0.5 13.25"),
            vec![
                TokenKind::IntLit(0),
                TokenKind::IntLit(42),
                TokenKind::DoubleLit(0.5),
                TokenKind::DoubleLit(13.25),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_range_is_not_a_decimal() {
        assert_eq!(
            lex("0..7"),
            vec![
                TokenKind::IntLit(0),
                TokenKind::DotDot,
                TokenKind::IntLit(7),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex(r#""one" "coin_flips""#),
            vec![
                TokenKind::StringLit("one".to_string()),
                TokenKind::StringLit("coin_flips".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            lex("= != < <= > >= => <=> & | !"),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Implies,
                TokenKind::Iff,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::Bang,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_command_shape() {
        assert_eq!(
            lex("[] s=0 -> 0.5 : (s'=1) + 0.5 : (s'=2);"),
            vec![
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Ident("s".to_string()),
                TokenKind::Eq,
                TokenKind::IntLit(0),
                TokenKind::Arrow,
                TokenKind::DoubleLit(0.5),
                TokenKind::Colon,
                TokenKind::LParen,
                TokenKind::Ident("s".to_string()),
                TokenKind::Prime,
                TokenKind::Eq,
                TokenKind::IntLit(1),
                TokenKind::RParen,
                TokenKind::Plus,
                TokenKind::DoubleLit(0.5),
                TokenKind::Colon,
                TokenKind::LParen,
                TokenKind::Ident("s".to_string()),
                TokenKind::Prime,
                TokenKind::Eq,
                TokenKind::IntLit(2),
                TokenKind::RParen,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = lex("dtmc // the model type\nmodule");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Dtmc,
                TokenKind::Comment("the model type".to_string()),
                TokenKind::Module,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_multiline_comment() {
        let tokens = lex("dtmc /* Knuth-Yao */ module");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Dtmc,
                TokenKind::Comment(" Knuth-Yao ".to_string()),
                TokenKind::Module,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_span_tracking() {
        let tokens = Lexer::new("dtmc\nmodule die").tokenize();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 1);
        assert_eq!(tokens[2].span.line, 2);
        assert_eq!(tokens[2].span.column, 8);
    }

    #[test]
    fn test_error_token() {
        let tokens = lex("s @ 0");
        assert!(matches!(tokens[1], TokenKind::Error(_)));
        assert_eq!(tokens[2], TokenKind::IntLit(0));
    }
}
