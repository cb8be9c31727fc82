//! Concrete evaluation of PRISM expressions.
//!
//! Guards, bounds, label expressions and defined constants all evaluate to
//! a concrete [`Value`]. Probability expressions go through the generic
//! path in [`crate::value`] instead, so that parametric builds can leave
//! parameters symbolic.

use crate::state::VarLayout;
use ahash::AHashMap;
use stoch_syntax::{BinOp, Expr, ExprKind, Func, Span, UnaryOp};
use thiserror::Error;

/// A concrete PRISM value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl Value {
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
        }
    }

    /// Numeric view, promoting integers.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(n as f64),
            Value::Double(x) => Some(x),
            Value::Bool(_) => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unknown identifier `{name}`")]
    UnknownIdentifier { name: String, span: Span },
    #[error("constant `{name}` has no value")]
    UndefinedConstant { name: String, span: Span },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("division by zero")]
    DivisionByZero { span: Span },
    #[error("integer overflow")]
    Overflow { span: Span },
    #[error("literal {value} is not representable as an exact rational")]
    InexactLiteral { value: f64, span: Span },
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::UnknownIdentifier { span, .. }
            | EvalError::UndefinedConstant { span, .. }
            | EvalError::TypeMismatch { span, .. }
            | EvalError::DivisionByZero { span }
            | EvalError::Overflow { span }
            | EvalError::InexactLiteral { span, .. } => *span,
        }
    }
}

/// Evaluation environment: elaborated constants, formula macros, and
/// (during exploration) the current state.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    pub constants: &'a AHashMap<String, Value>,
    pub formulas: &'a AHashMap<String, Expr>,
    pub vars: Option<(&'a VarLayout, &'a [i64])>,
}

impl<'a> Env<'a> {
    /// An environment without state variables, for constant elaboration and
    /// variable bounds.
    pub fn constants_only(
        constants: &'a AHashMap<String, Value>,
        formulas: &'a AHashMap<String, Expr>,
    ) -> Self {
        Self {
            constants,
            formulas,
            vars: None,
        }
    }

    pub fn with_state(self, layout: &'a VarLayout, state: &'a [i64]) -> Self {
        Self {
            vars: Some((layout, state)),
            ..self
        }
    }

    /// Resolve an identifier: state variable, then constant, then formula
    /// macro.
    fn lookup(&self, name: &str, span: Span) -> Result<Value, EvalError> {
        if let Some((layout, state)) = self.vars {
            if let Some(slot) = layout.slot(name) {
                let raw = state[slot];
                return Ok(if layout.info(slot).is_bool {
                    Value::Bool(raw != 0)
                } else {
                    Value::Int(raw)
                });
            }
        }
        if let Some(value) = self.constants.get(name) {
            return Ok(*value);
        }
        if let Some(expr) = self.formulas.get(name) {
            return eval(expr, self);
        }
        Err(EvalError::UnknownIdentifier {
            name: name.to_string(),
            span,
        })
    }
}

/// Evaluate an expression to a concrete value.
pub fn eval(expr: &Expr, env: &Env) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Int(n) => Ok(Value::Int(*n)),
        ExprKind::Double(x) => Ok(Value::Double(*x)),
        ExprKind::Ident(name) => env.lookup(name, expr.span),
        ExprKind::Paren(inner) => eval(inner, env),
        ExprKind::Unary { op, operand } => {
            let value = eval(operand, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!expect_bool(value, operand.span)?)),
                UnaryOp::Neg => match value {
                    Value::Int(n) => n
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or(EvalError::Overflow { span: expr.span }),
                    Value::Double(x) => Ok(Value::Double(-x)),
                    Value::Bool(_) => Err(type_mismatch("int or double", value, operand.span)),
                },
            }
        }
        ExprKind::Binary { op, left, right } => eval_binary(*op, left, right, env, expr.span),
        ExprKind::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = expect_bool(eval(cond, env)?, cond.span)?;
            if c {
                eval(then_branch, env)
            } else {
                eval(else_branch, env)
            }
        }
        ExprKind::Call { func, args } => eval_call(*func, args, env, expr.span),
    }
}

/// Evaluate an expression that must be boolean (a guard or label).
pub fn eval_bool(expr: &Expr, env: &Env) -> Result<bool, EvalError> {
    expect_bool(eval(expr, env)?, expr.span)
}

/// Evaluate an expression that must be an integer (a bound or assignment
/// target value).
pub fn eval_int(expr: &Expr, env: &Env) -> Result<i64, EvalError> {
    let value = eval(expr, env)?;
    match value {
        Value::Int(n) => Ok(n),
        _ => Err(type_mismatch("int", value, expr.span)),
    }
}

fn expect_bool(value: Value, span: Span) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(type_mismatch("bool", other, span)),
    }
}

fn type_mismatch(expected: &'static str, found: Value, span: Span) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: found.type_name(),
        span,
    }
}

fn eval_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    env: &Env,
    span: Span,
) -> Result<Value, EvalError> {
    match op {
        BinOp::And => {
            // Short-circuiting, like the reference tools.
            if !eval_bool(left, env)? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval_bool(right, env)?))
        }
        BinOp::Or => {
            if eval_bool(left, env)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_bool(right, env)?))
        }
        BinOp::Implies => {
            if !eval_bool(left, env)? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_bool(right, env)?))
        }
        BinOp::Iff => Ok(Value::Bool(eval_bool(left, env)? == eval_bool(right, env)?)),
        BinOp::Eq | BinOp::Ne => {
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            let equal = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Int(a), Value::Int(b)) => a == b,
                _ => match (l.as_f64(), r.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => return Err(type_mismatch(l.type_name(), r, right.span)),
                },
            };
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            let (a, b) = numeric_pair(l, r, left.span, right.span)?;
            Ok(Value::Bool(match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                _ => a >= b,
            }))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul => {
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => {
                    let result = match op {
                        BinOp::Add => a.checked_add(b),
                        BinOp::Sub => a.checked_sub(b),
                        _ => a.checked_mul(b),
                    };
                    result.map(Value::Int).ok_or(EvalError::Overflow { span })
                }
                _ => {
                    let (a, b) = numeric_pair(l, r, left.span, right.span)?;
                    Ok(Value::Double(match op {
                        BinOp::Add => a + b,
                        BinOp::Sub => a - b,
                        _ => a * b,
                    }))
                }
            }
        }
        BinOp::Div => {
            // Division always yields a double, matching PRISM.
            let l = eval(left, env)?;
            let r = eval(right, env)?;
            let (a, b) = numeric_pair(l, r, left.span, right.span)?;
            if b == 0.0 {
                return Err(EvalError::DivisionByZero { span });
            }
            Ok(Value::Double(a / b))
        }
    }
}

fn numeric_pair(l: Value, r: Value, lspan: Span, rspan: Span) -> Result<(f64, f64), EvalError> {
    let a = l
        .as_f64()
        .ok_or_else(|| type_mismatch("int or double", l, lspan))?;
    let b = r
        .as_f64()
        .ok_or_else(|| type_mismatch("int or double", r, rspan))?;
    Ok((a, b))
}

fn eval_call(func: Func, args: &[Expr], env: &Env, span: Span) -> Result<Value, EvalError> {
    match func {
        Func::Min | Func::Max => {
            let l = eval(&args[0], env)?;
            let r = eval(&args[1], env)?;
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(if func == Func::Min {
                    a.min(b)
                } else {
                    a.max(b)
                })),
                _ => {
                    let (a, b) = numeric_pair(l, r, args[0].span, args[1].span)?;
                    Ok(Value::Double(if func == Func::Min {
                        a.min(b)
                    } else {
                        a.max(b)
                    }))
                }
            }
        }
        Func::Floor | Func::Ceil => {
            let value = eval(&args[0], env)?;
            let x = value
                .as_f64()
                .ok_or_else(|| type_mismatch("int or double", value, args[0].span))?;
            let rounded = if func == Func::Floor {
                x.floor()
            } else {
                x.ceil()
            };
            Ok(Value::Int(rounded as i64))
        }
        Func::Pow => {
            let base = eval(&args[0], env)?;
            let exp = eval(&args[1], env)?;
            match (base, exp) {
                (Value::Int(b), Value::Int(e)) if e >= 0 => {
                    let e = u32::try_from(e).map_err(|_| EvalError::Overflow { span })?;
                    b.checked_pow(e)
                        .map(Value::Int)
                        .ok_or(EvalError::Overflow { span })
                }
                _ => {
                    let (b, e) = numeric_pair(base, exp, args[0].span, args[1].span)?;
                    Ok(Value::Double(b.powf(e)))
                }
            }
        }
        Func::Mod => {
            let l = eval(&args[0], env)?;
            let r = eval(&args[1], env)?;
            match (l, r) {
                (Value::Int(a), Value::Int(b)) => {
                    if b == 0 {
                        Err(EvalError::DivisionByZero { span })
                    } else {
                        Ok(Value::Int(a.rem_euclid(b)))
                    }
                }
                _ => Err(type_mismatch("int", if matches!(l, Value::Int(_)) { r } else { l }, span)),
            }
        }
        Func::Log => {
            let (x, base) = numeric_pair(
                eval(&args[0], env)?,
                eval(&args[1], env)?,
                args[0].span,
                args[1].span,
            )?;
            Ok(Value::Double(x.ln() / base.ln()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoch_syntax::parse;

    fn eval_formula(src: &str) -> Result<Value, EvalError> {
        let program = parse(&format!(
            "dtmc\nformula f = {src};\nmodule m\nx : [0..9] init 3;\n[] true -> true;\nendmodule\n"
        ))
        .unwrap();
        let constants = AHashMap::new();
        let formulas = AHashMap::new();
        let env = Env::constants_only(&constants, &formulas);
        let mut layout = VarLayout::new();
        layout.push(crate::state::VarInfo {
            name: "x".to_string(),
            low: 0,
            high: 9,
            init: 3,
            is_bool: false,
        });
        let state = vec![3];
        let env = env.with_state(&layout, &state);
        eval(&program.formulas[0].expr, &env)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_formula("1+2*3"), Ok(Value::Int(7)));
        assert_eq!(eval_formula("x-1"), Ok(Value::Int(2)));
        assert_eq!(eval_formula("1/2"), Ok(Value::Double(0.5)));
        assert_eq!(eval_formula("pow(2,10)"), Ok(Value::Int(1024)));
        assert_eq!(eval_formula("mod(7,3)"), Ok(Value::Int(1)));
        assert_eq!(eval_formula("floor(1.9)"), Ok(Value::Int(1)));
        assert_eq!(eval_formula("ceil(1.1)"), Ok(Value::Int(2)));
        assert_eq!(eval_formula("min(x,2)"), Ok(Value::Int(2)));
        assert_eq!(eval_formula("max(0.5,1)"), Ok(Value::Double(1.0)));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval_formula("x=3 & x<4"), Ok(Value::Bool(true)));
        assert_eq!(eval_formula("x!=3 | false"), Ok(Value::Bool(false)));
        assert_eq!(eval_formula("x>9 => x=0"), Ok(Value::Bool(true)));
        assert_eq!(eval_formula("x>2 ? 1 : 0"), Ok(Value::Int(1)));
        assert_eq!(eval_formula("x=3.0"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            eval_formula("1/(x-3)"),
            Err(EvalError::DivisionByZero { .. })
        ));
        assert!(matches!(
            eval_formula("mod(1,0)"),
            Err(EvalError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            eval_formula("true+1"),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert!(matches!(
            eval_formula("!x"),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_identifier() {
        assert!(matches!(
            eval_formula("y+1"),
            Err(EvalError::UnknownIdentifier { name, .. }) if name == "y"
        ));
    }
}
