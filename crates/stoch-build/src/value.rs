//! The value types a model can be built over.
//!
//! Probability (and rate, and reward) expressions evaluate to a
//! [`ModelValue`]. The `f64` instance produces concrete models; the
//! [`RationalFunction`] instance produces parametric models, turning
//! undefined `double` constants into symbolic parameters and float
//! literals into exact rationals.

use crate::eval::{self, Env, EvalError, Value};
use num_traits::{One, Zero};
use std::collections::BTreeSet;
use std::fmt::{Debug, Display};
use std::ops::{Add, Mul, Sub};
use stoch_storage::RationalFunction;
use stoch_syntax::{BinOp, Expr, ExprKind, Span, UnaryOp};

/// Value type of a model under construction.
pub trait ModelValue:
    Clone
    + PartialEq
    + Debug
    + Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Zero
    + One
    + 'static
{
    /// Whether models built over this type report themselves parametric.
    const PARAMETRIC: bool;

    fn from_int(n: i64) -> Self;

    fn from_double(x: f64, span: Span) -> Result<Self, EvalError>;

    /// The symbolic parameter `name`; `None` if this value type cannot
    /// carry parameters.
    fn parameter(name: &str) -> Option<Self>;

    fn checked_div(&self, rhs: &Self) -> Option<Self>;

    /// Numeric view, `None` when parameters remain.
    fn to_f64(&self) -> Option<f64>;
}

impl ModelValue for f64 {
    const PARAMETRIC: bool = false;

    fn from_int(n: i64) -> Self {
        n as f64
    }

    fn from_double(x: f64, _span: Span) -> Result<Self, EvalError> {
        Ok(x)
    }

    fn parameter(_name: &str) -> Option<Self> {
        None
    }

    fn checked_div(&self, rhs: &Self) -> Option<Self> {
        (*rhs != 0.0).then(|| self / rhs)
    }

    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl ModelValue for RationalFunction {
    const PARAMETRIC: bool = true;

    fn from_int(n: i64) -> Self {
        RationalFunction::from_integer(n)
    }

    fn from_double(x: f64, span: Span) -> Result<Self, EvalError> {
        RationalFunction::from_f64(x).ok_or(EvalError::InexactLiteral { value: x, span })
    }

    fn parameter(name: &str) -> Option<Self> {
        Some(RationalFunction::parameter(name))
    }

    fn checked_div(&self, rhs: &Self) -> Option<Self> {
        RationalFunction::checked_div(self, rhs)
    }

    fn to_f64(&self) -> Option<f64> {
        self.constant_value()
            .map(|r| *r.numer() as f64 / *r.denom() as f64)
    }
}

/// Evaluate a probability, rate or reward expression.
///
/// Arithmetic over parameters stays symbolic; everything that steers
/// control flow (conditions, function arguments, comparisons) must
/// evaluate concretely and therefore may not mention a parameter.
pub fn eval_value<T: ModelValue>(
    expr: &Expr,
    env: &Env,
    parameters: &BTreeSet<String>,
) -> Result<T, EvalError> {
    match &expr.kind {
        ExprKind::Int(n) => Ok(T::from_int(*n)),
        ExprKind::Double(x) => T::from_double(*x, expr.span),
        ExprKind::Ident(name) if parameters.contains(name) => {
            T::parameter(name).ok_or_else(|| EvalError::UndefinedConstant {
                name: name.clone(),
                span: expr.span,
            })
        }
        ExprKind::Paren(inner) => eval_value(inner, env, parameters),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => Ok(T::zero() - eval_value(operand, env, parameters)?),
        ExprKind::Binary { op, left, right }
            if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div) =>
        {
            let l: T = eval_value(left, env, parameters)?;
            let r: T = eval_value(right, env, parameters)?;
            match op {
                BinOp::Add => Ok(l + r),
                BinOp::Sub => Ok(l - r),
                BinOp::Mul => Ok(l * r),
                _ => l
                    .checked_div(&r)
                    .ok_or(EvalError::DivisionByZero { span: expr.span }),
            }
        }
        ExprKind::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval::eval_bool(cond, env)? {
                eval_value(then_branch, env, parameters)
            } else {
                eval_value(else_branch, env, parameters)
            }
        }
        // Identifiers, calls and comparisons evaluate concretely.
        _ => match eval::eval(expr, env)? {
            Value::Int(n) => Ok(T::from_int(n)),
            Value::Double(x) => T::from_double(x, expr.span),
            found @ Value::Bool(_) => Err(EvalError::TypeMismatch {
                expected: "int or double",
                found: found.type_name(),
                span: expr.span,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;
    use num_rational::Rational64;
    use stoch_syntax::parse;

    fn probability_expr(src: &str) -> Expr {
        let program = parse(&format!(
            "dtmc\nmodule m\nx : [0..1] init 0;\n[] x=0 -> {src} : (x'=1);\nendmodule\n"
        ))
        .unwrap();
        program.modules[0].commands[0].updates[0]
            .probability
            .clone()
            .unwrap()
    }

    #[test]
    fn test_concrete_evaluation() {
        let constants = AHashMap::new();
        let formulas = AHashMap::new();
        let env = Env::constants_only(&constants, &formulas);
        let params = BTreeSet::new();
        let expr = probability_expr("0.5*0.5+0.25");
        assert_eq!(eval_value::<f64>(&expr, &env, &params), Ok(0.5));
    }

    #[test]
    fn test_parameters_stay_symbolic() {
        let constants = AHashMap::new();
        let formulas = AHashMap::new();
        let env = Env::constants_only(&constants, &formulas);
        let params: BTreeSet<String> = ["p".to_string()].into();
        let expr = probability_expr("1-p");
        let value: RationalFunction = eval_value(&expr, &env, &params).unwrap();
        assert!(!value.is_constant());
        assert_eq!(value.to_string(), "1 - p");
    }

    #[test]
    fn test_float_literals_become_exact_rationals() {
        let constants = AHashMap::new();
        let formulas = AHashMap::new();
        let env = Env::constants_only(&constants, &formulas);
        let params = BTreeSet::new();
        let expr = probability_expr("0.1+0.2");
        let value: RationalFunction = eval_value(&expr, &env, &params).unwrap();
        // Exact: 1/10 + 1/5, not the float 0.30000000000000004.
        assert_eq!(value.constant_value(), Some(Rational64::new(3, 10)));
    }

    #[test]
    fn test_parameter_in_concrete_build_is_an_error() {
        let constants = AHashMap::new();
        let formulas = AHashMap::new();
        let env = Env::constants_only(&constants, &formulas);
        let params: BTreeSet<String> = ["p".to_string()].into();
        let expr = probability_expr("p");
        assert!(matches!(
            eval_value::<f64>(&expr, &env, &params),
            Err(EvalError::UndefinedConstant { .. })
        ));
    }
}
