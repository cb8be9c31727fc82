//! Parser for PCTL/CSL properties.
//!
//! Reuses the PRISM lexer and expression grammar from `stoch-syntax`; the
//! contextual identifiers `P`, `R`, `X`, `F`, `G`, `U`, and `C` become
//! operators here.

use crate::ast::*;
use crate::resolve::resolve_property;
use stoch_syntax::{Lexer, ParseError, Parser, Program, Span, TokenKind};
use thiserror::Error;

/// Property parsing or resolution error.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown identifier '{name}' at {span}")]
    UnknownIdentifier { name: String, span: Span },

    #[error("unknown label \"{name}\" at {span}")]
    UnknownLabel { name: String, span: Span },

    #[error("unknown reward structure \"{name}\" at {span}")]
    UnknownRewardModel { name: String, span: Span },

    #[error("invalid property at {span}: {message}")]
    Invalid { message: String, span: Span },
}

impl PropertyError {
    /// Source span of the offending construct.
    pub fn span(&self) -> Span {
        match self {
            PropertyError::Parse(e) => e.span(),
            PropertyError::UnknownIdentifier { span, .. }
            | PropertyError::UnknownLabel { span, .. }
            | PropertyError::UnknownRewardModel { span, .. }
            | PropertyError::Invalid { span, .. } => *span,
        }
    }
}

pub type PropertyResult<T> = Result<T, PropertyError>;

/// Parse a list of properties separated by `;` or newlines, resolving all
/// names against the given program. Input order is preserved.
pub fn parse_properties(text: &str, program: &Program) -> PropertyResult<Vec<Property>> {
    let mut properties = Vec::new();
    for segment in text.split(|c| c == ';' || c == '\n') {
        if segment.trim().is_empty() {
            continue;
        }
        properties.push(parse_property(segment, program)?);
    }
    Ok(properties)
}

/// Parse a single property and resolve its names against the program.
pub fn parse_property(text: &str, program: &Program) -> PropertyResult<Property> {
    let tokens: Vec<_> = Lexer::new(text)
        .tokenize()
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    for token in &tokens {
        if let TokenKind::Error(message) = &token.kind {
            return Err(PropertyError::Parse(ParseError::Lex {
                message: message.clone(),
                span: token.span,
            }));
        }
    }

    let mut parser = PropertyParser {
        inner: Parser::from_tokens(tokens),
    };
    let formula = parser.parse_state_formula()?;
    if !parser.inner.is_at_end() {
        return Err(PropertyError::Invalid {
            message: format!("trailing input: {}", parser.inner.peek_kind()),
            span: parser.inner.current_span(),
        });
    }

    let property = Property { formula };
    resolve_property(&property, program)?;
    Ok(property)
}

struct PropertyParser {
    inner: Parser,
}

impl PropertyParser {
    // Formula-level precedence: iff/implies < or < and < not < primary.
    // PRISM has no formula-level iff, so implies is the floor.

    fn parse_state_formula(&mut self) -> PropertyResult<StateFormula> {
        self.parse_implies()
    }

    fn parse_implies(&mut self) -> PropertyResult<StateFormula> {
        let left = self.parse_or()?;
        if self.inner.peek_kind() == TokenKind::Implies {
            self.inner.advance();
            // Right-associative.
            let right = self.parse_implies()?;
            return Ok(StateFormula::Implies(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> PropertyResult<StateFormula> {
        let mut left = self.parse_and()?;
        while self.inner.peek_kind() == TokenKind::Pipe {
            self.inner.advance();
            let right = self.parse_and()?;
            left = StateFormula::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PropertyResult<StateFormula> {
        let mut left = self.parse_unary()?;
        while self.inner.peek_kind() == TokenKind::Amp {
            self.inner.advance();
            let right = self.parse_unary()?;
            left = StateFormula::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PropertyResult<StateFormula> {
        if self.inner.peek_kind() == TokenKind::Bang {
            self.inner.advance();
            let inner = self.parse_unary()?;
            return Ok(StateFormula::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PropertyResult<StateFormula> {
        match self.inner.peek_kind() {
            TokenKind::StringLit(name) => {
                self.inner.advance();
                Ok(StateFormula::Label(name))
            }
            TokenKind::Ident(name) if name == "P" || name == "Pmin" || name == "Pmax" => {
                self.parse_prob_operator(&name)
            }
            TokenKind::Ident(name) if name == "R" || name == "Rmin" || name == "Rmax" => {
                self.parse_reward_operator(&name)
            }
            TokenKind::LParen => {
                // Either a parenthesized atom expression (`(x+1)=2`) or a
                // parenthesized formula (`(x=1 & "one")`). The expression
                // grammar cannot contain labels or P/R operators, so try it
                // first and backtrack on failure.
                let checkpoint = self.inner.position();
                match self.parse_atom() {
                    Ok(atom) => Ok(atom),
                    Err(_) => {
                        self.inner.set_position(checkpoint);
                        self.inner.expect(TokenKind::LParen)?;
                        let formula = self.parse_state_formula()?;
                        self.inner.expect(TokenKind::RParen)?;
                        Ok(StateFormula::Paren(Box::new(formula)))
                    }
                }
            }
            TokenKind::True if !self.atom_continues(1) => {
                self.inner.advance();
                Ok(StateFormula::True)
            }
            TokenKind::False if !self.atom_continues(1) => {
                self.inner.advance();
                Ok(StateFormula::False)
            }
            _ => self.parse_atom(),
        }
    }

    /// Whether the token at offset `n` continues an atom expression
    /// (comparison or arithmetic), so `true = x` stays one atom.
    fn atom_continues(&self, n: usize) -> bool {
        matches!(
            self.inner.peek_ahead_kind(n),
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
        )
    }

    /// Parse an atomic expression at comparison precedence, so the
    /// formula-level connectives `&`, `|`, `=>` stay formula operators.
    fn parse_atom(&mut self) -> PropertyResult<StateFormula> {
        let expr = self.inner.parse_comparison_expr()?;
        Ok(StateFormula::Atom(expr))
    }

    fn parse_prob_operator(&mut self, head: &str) -> PropertyResult<StateFormula> {
        self.inner.advance();
        let opt = match head {
            "Pmin" => Some(OptimalityType::Min),
            "Pmax" => Some(OptimalityType::Max),
            _ => None,
        };
        let bound = self.parse_bound()?;
        self.inner.expect(TokenKind::LBracket)?;
        let path = self.parse_path_formula()?;
        self.inner.expect(TokenKind::RBracket)?;
        Ok(StateFormula::Prob {
            opt,
            bound,
            path: Box::new(path),
        })
    }

    fn parse_reward_operator(&mut self, head: &str) -> PropertyResult<StateFormula> {
        self.inner.advance();
        let opt = match head {
            "Rmin" => Some(OptimalityType::Min),
            "Rmax" => Some(OptimalityType::Max),
            _ => None,
        };
        let reward_model = if self.inner.peek_kind() == TokenKind::LBrace {
            self.inner.advance();
            let name = self.inner.parse_string().map_err(PropertyError::Parse)?;
            self.inner.expect(TokenKind::RBrace)?;
            Some(name)
        } else {
            None
        };
        let bound = self.parse_bound()?;
        self.inner.expect(TokenKind::LBracket)?;
        let path = self.parse_reward_path()?;
        self.inner.expect(TokenKind::RBracket)?;
        Ok(StateFormula::Reward {
            opt,
            reward_model,
            bound,
            path: Box::new(path),
        })
    }

    /// Parse `=?` or a comparison against a numeric threshold.
    fn parse_bound(&mut self) -> PropertyResult<Bound> {
        let op = match self.inner.peek_kind() {
            TokenKind::Eq => {
                self.inner.advance();
                self.inner.expect(TokenKind::Question)?;
                return Ok(Bound::Query);
            }
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            other => {
                return Err(PropertyError::Invalid {
                    message: format!("expected probability bound, found {}", other),
                    span: self.inner.current_span(),
                })
            }
        };
        self.inner.advance();
        let value = self.parse_number()?;
        Ok(Bound::Threshold { op, value })
    }

    fn parse_number(&mut self) -> PropertyResult<f64> {
        match self.inner.peek_kind() {
            TokenKind::IntLit(n) => {
                self.inner.advance();
                Ok(n as f64)
            }
            TokenKind::DoubleLit(x) => {
                self.inner.advance();
                Ok(x)
            }
            other => Err(PropertyError::Invalid {
                message: format!("expected number, found {}", other),
                span: self.inner.current_span(),
            }),
        }
    }

    fn parse_path_formula(&mut self) -> PropertyResult<PathFormula> {
        match self.inner.peek_kind() {
            TokenKind::Ident(name) if name == "X" => {
                self.inner.advance();
                Ok(PathFormula::Next(self.parse_state_formula()?))
            }
            TokenKind::Ident(name) if name == "F" => {
                self.inner.advance();
                match self.parse_step_bound()? {
                    Some(k) => Ok(PathFormula::BoundedEventually(
                        self.parse_state_formula()?,
                        k,
                    )),
                    None => Ok(PathFormula::Eventually(self.parse_state_formula()?)),
                }
            }
            TokenKind::Ident(name) if name == "G" => {
                self.inner.advance();
                match self.parse_step_bound()? {
                    Some(k) => Ok(PathFormula::BoundedGlobally(self.parse_state_formula()?, k)),
                    None => Ok(PathFormula::Globally(self.parse_state_formula()?)),
                }
            }
            _ => {
                let left = self.parse_state_formula()?;
                match self.inner.peek_kind() {
                    TokenKind::Ident(name) if name == "U" => {
                        self.inner.advance();
                        match self.parse_step_bound()? {
                            Some(k) => {
                                Ok(PathFormula::BoundedUntil(left, self.parse_state_formula()?, k))
                            }
                            None => Ok(PathFormula::Until(left, self.parse_state_formula()?)),
                        }
                    }
                    other => Err(PropertyError::Invalid {
                        message: format!("expected temporal operator, found {}", other),
                        span: self.inner.current_span(),
                    }),
                }
            }
        }
    }

    /// Parse the optional `<=k` step bound of F, G, and U.
    fn parse_step_bound(&mut self) -> PropertyResult<Option<i64>> {
        if self.inner.peek_kind() != TokenKind::Le {
            return Ok(None);
        }
        self.inner.advance();
        match self.inner.peek_kind() {
            TokenKind::IntLit(k) if k >= 0 => {
                self.inner.advance();
                Ok(Some(k))
            }
            other => Err(PropertyError::Invalid {
                message: format!("expected non-negative step bound, found {}", other),
                span: self.inner.current_span(),
            }),
        }
    }

    fn parse_reward_path(&mut self) -> PropertyResult<RewardPath> {
        match self.inner.peek_kind() {
            TokenKind::Ident(name) if name == "F" => {
                self.inner.advance();
                Ok(RewardPath::Reachability(self.parse_state_formula()?))
            }
            TokenKind::Ident(name) if name == "C" => {
                self.inner.advance();
                self.inner.expect(TokenKind::Le)?;
                match self.inner.peek_kind() {
                    TokenKind::IntLit(k) if k >= 0 => {
                        self.inner.advance();
                        Ok(RewardPath::Cumulative(k))
                    }
                    other => Err(PropertyError::Invalid {
                        message: format!("expected non-negative step bound, found {}", other),
                        span: self.inner.current_span(),
                    }),
                }
            }
            other => Err(PropertyError::Invalid {
                message: format!("expected reward path formula, found {}", other),
                span: self.inner.current_span(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoch_syntax::parse;

    fn die_program() -> Program {
        parse(
            r#"
dtmc
module die
    s : [0..7] init 0;
    d : [0..6] init 0;
    [] s=0 -> 0.5 : (s'=1) + 0.5 : (s'=2);
    [] s=7 -> (s'=7);
endmodule
rewards "coin_flips"
    [] s<7 : 1;
endrewards
label "one" = s=7&d=1;
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_reachability_query() {
        let program = die_program();
        let props = parse_properties("P=? [F \"one\"]", &program).unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].to_string(), "P=? [F \"one\"]");
    }

    #[test]
    fn test_whitespace_is_not_significant() {
        let program = die_program();
        let props = parse_properties("P=? [ F \"one\" ]", &program).unwrap();
        assert_eq!(props.len(), 1);
        // Non-canonical input renders canonically.
        assert_eq!(props[0].to_string(), "P=? [F \"one\"]");
    }

    #[test]
    fn test_multiple_properties_preserve_order() {
        let program = die_program();
        let props =
            parse_properties("P=? [F \"one\"]; P<=0.5 [X s=1]; R=? [F s=7]", &program).unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props[0].to_string(), "P=? [F \"one\"]");
        assert_eq!(props[1].to_string(), "P<=0.5 [X s=1]");
        assert_eq!(props[2].to_string(), "R=? [F s=7]");
    }

    #[test]
    fn test_newline_separator() {
        let program = die_program();
        let props = parse_properties("P=? [F \"one\"]\nP>=1 [G s<8]", &program).unwrap();
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn test_until_and_bounded_operators() {
        let program = die_program();
        let props = parse_properties(
            "P=? [s<7 U \"one\"]; P=? [F<=5 \"one\"]; P=? [s=0 U<=3 s=1]",
            &program,
        )
        .unwrap();
        assert_eq!(props[0].to_string(), "P=? [s<7 U \"one\"]");
        assert_eq!(props[1].to_string(), "P=? [F<=5 \"one\"]");
        assert_eq!(props[2].to_string(), "P=? [s=0 U<=3 s=1]");
    }

    #[test]
    fn test_named_reward_operator() {
        let program = die_program();
        let props = parse_properties("R{\"coin_flips\"}=? [F s=7]", &program).unwrap();
        assert_eq!(props[0].to_string(), "R{\"coin_flips\"}=? [F s=7]");
        assert_eq!(
            props[0].referenced_reward_models(),
            vec!["coin_flips".to_string()]
        );
    }

    #[test]
    fn test_cumulative_reward() {
        let program = die_program();
        let props = parse_properties("R=? [C<=10]", &program).unwrap();
        assert_eq!(props[0].to_string(), "R=? [C<=10]");
    }

    #[test]
    fn test_unknown_label_rejected() {
        let program = die_program();
        let err = parse_properties("P=? [F \"six\"]", &program).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownLabel { .. }));
    }

    #[test]
    fn test_unknown_identifier_rejected() {
        let program = die_program();
        let err = parse_properties("P=? [F t=7]", &program).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_unknown_reward_model_rejected() {
        let program = die_program();
        let err = parse_properties("R{\"steps\"}=? [F s=7]", &program).unwrap_err();
        assert!(matches!(err, PropertyError::UnknownRewardModel { .. }));
    }

    #[test]
    fn test_boolean_structure_over_labels() {
        let program = die_program();
        let props = parse_properties("P=? [F \"one\" | \"init\"]", &program).unwrap();
        assert_eq!(props[0].to_string(), "P=? [F \"one\" | \"init\"]");
        let labels = props[0].referenced_labels();
        assert_eq!(labels, vec!["one".to_string(), "init".to_string()]);
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let program = die_program();
        assert!(parse_properties("P=? [F \"one\"] extra", &program).is_err());
    }

    #[test]
    fn test_pmax_for_mdp() {
        let program = parse(
            "mdp\nmodule m\nx : [0..2] init 0;\n[a] x=0 -> (x'=1);\n[b] x=0 -> (x'=2);\nendmodule\nlabel \"goal\" = x=2;\n",
        )
        .unwrap();
        let props = parse_properties("Pmax=? [F \"goal\"]", &program).unwrap();
        assert_eq!(props[0].to_string(), "Pmax=? [F \"goal\"]");
    }

    #[test]
    fn test_threshold_bounds() {
        let program = die_program();
        let props = parse_properties("P<0.1 [F \"one\"]; P>=1 [F s=7]", &program).unwrap();
        assert_eq!(props[0].to_string(), "P<0.1 [F \"one\"]");
        assert_eq!(props[1].to_string(), "P>=1 [F s=7]");
    }
}
