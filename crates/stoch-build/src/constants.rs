//! Constant elaboration.
//!
//! Defined constants are evaluated in dependency order (with cycle
//! detection), command-line overrides are applied, and whatever remains
//! undefined is reported to the builder, which decides whether that is an
//! error or a parameter.

use crate::builder::BuildError;
use crate::eval::{self, Env, Value};
use ahash::AHashMap;
use stoch_syntax::{ConstType, ConstantDecl, Expr, ExprKind, Program};

/// The elaborated constants of a program.
#[derive(Debug, Default)]
pub struct Constants {
    /// Fully evaluated constants by name.
    pub values: AHashMap<String, Value>,
    /// Constants still without a value, in declaration order.
    pub undefined: Vec<(String, ConstType)>,
}

/// Evaluate all constants of `program`, applying `overrides` (raw
/// `NAME=VALUE` strings, already split) to undefined or defined constants
/// alike.
pub fn elaborate(
    program: &Program,
    overrides: &[(String, String)],
) -> Result<Constants, BuildError> {
    for (name, _) in overrides {
        if program.constant(name).is_none() {
            return Err(BuildError::UnknownConstantOverride { name: name.clone() });
        }
    }

    let mut constants = Constants::default();
    for decl in &program.constants {
        let overridden = overrides
            .iter()
            .find(|(name, _)| *name == decl.name.name)
            .map(|(_, raw)| parse_override(decl, raw))
            .transpose()?;
        if let Some(value) = overridden {
            constants.values.insert(decl.name.name.clone(), value);
            continue;
        }
        if decl.value.is_none() {
            constants
                .undefined
                .push((decl.name.name.clone(), decl.ty));
        }
    }

    // Remaining defined constants, in dependency order.
    let mut visiting = Vec::new();
    for decl in &program.constants {
        elaborate_one(program, decl, &mut constants, &mut visiting)?;
    }
    Ok(constants)
}

fn elaborate_one(
    program: &Program,
    decl: &ConstantDecl,
    constants: &mut Constants,
    visiting: &mut Vec<String>,
) -> Result<(), BuildError> {
    let name = &decl.name.name;
    if constants.values.contains_key(name) {
        return Ok(());
    }
    let Some(expr) = &decl.value else {
        return Ok(());
    };
    if visiting.iter().any(|n| n == name) {
        return Err(BuildError::CyclicConstant { name: name.clone() });
    }
    visiting.push(name.clone());
    // Elaborate constants this one depends on first. Depending on an
    // undefined constant is an error even in parametric builds; only
    // directly undefined doubles become parameters.
    for dep in referenced_names(expr) {
        if let Some(dep_decl) = program.constant(&dep) {
            if dep_decl.value.is_none()
                && constants.undefined.iter().any(|(n, _)| *n == dep)
            {
                return Err(crate::eval::EvalError::UndefinedConstant {
                    name: dep,
                    span: expr.span,
                }
                .into());
            }
            elaborate_one(program, dep_decl, constants, visiting)?;
        }
    }
    visiting.pop();

    let formulas = AHashMap::new();
    let env = Env::constants_only(&constants.values, &formulas);
    let value = eval::eval(expr, &env)?;
    let value = coerce(decl, value)?;
    constants.values.insert(name.clone(), value);
    Ok(())
}

/// Check the evaluated value against the declared type, promoting ints to
/// doubles where declared as such.
fn coerce(decl: &ConstantDecl, value: Value) -> Result<Value, BuildError> {
    match (decl.ty, value) {
        (ConstType::Int, Value::Int(_))
        | (ConstType::Bool, Value::Bool(_))
        | (ConstType::Double, Value::Double(_)) => Ok(value),
        (ConstType::Double, Value::Int(n)) => Ok(Value::Double(n as f64)),
        _ => Err(BuildError::ConstantTypeMismatch {
            name: decl.name.name.clone(),
            declared: decl.ty,
            found: value.type_name(),
        }),
    }
}

fn parse_override(decl: &ConstantDecl, raw: &str) -> Result<Value, BuildError> {
    let value = match decl.ty {
        ConstType::Int => raw.parse::<i64>().ok().map(Value::Int),
        ConstType::Double => raw.parse::<f64>().ok().map(Value::Double),
        ConstType::Bool => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
    };
    value.ok_or_else(|| BuildError::InvalidConstantOverride {
        name: decl.name.name.clone(),
        value: raw.to_string(),
    })
}

/// All identifiers occurring in an expression.
fn referenced_names(expr: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(expr, &mut names);
    names
}

fn collect_names(expr: &Expr, out: &mut Vec<String>) {
    match &expr.kind {
        ExprKind::Ident(name) => out.push(name.clone()),
        ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::Double(_) => {}
        ExprKind::Unary { operand, .. } => collect_names(operand, out),
        ExprKind::Binary { left, right, .. } => {
            collect_names(left, out);
            collect_names(right, out);
        }
        ExprKind::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_names(cond, out);
            collect_names(then_branch, out);
            collect_names(else_branch, out);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                collect_names(arg, out);
            }
        }
        ExprKind::Paren(inner) => collect_names(inner, out),
    }
}

/// Reject mutually recursive formula macros up front so expression
/// evaluation can expand them freely.
pub fn check_formula_cycles(program: &Program) -> Result<(), BuildError> {
    for formula in &program.formulas {
        let mut visiting = vec![formula.name.name.clone()];
        check_formula_expr(program, &formula.expr, &mut visiting)?;
    }
    Ok(())
}

fn check_formula_expr(
    program: &Program,
    expr: &Expr,
    visiting: &mut Vec<String>,
) -> Result<(), BuildError> {
    for name in referenced_names(expr) {
        let Some(decl) = program.formula(&name) else {
            continue;
        };
        if visiting.iter().any(|n| *n == name) {
            return Err(BuildError::CyclicFormula { name });
        }
        visiting.push(name);
        check_formula_expr(program, &decl.expr, visiting)?;
        visiting.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoch_syntax::parse;

    fn program(consts: &str) -> Program {
        parse(&format!(
            "dtmc\n{consts}\nmodule m\nx : [0..1];\n[] true -> true;\nendmodule\n"
        ))
        .unwrap()
    }

    #[test]
    fn test_dependency_order() {
        let p = program("const int B = A+1;\nconst int A = 1;");
        let c = elaborate(&p, &[]).unwrap();
        assert_eq!(c.values.get("B"), Some(&Value::Int(2)));
        assert!(c.undefined.is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let p = program("const int A = B;\nconst int B = A;");
        assert!(matches!(
            elaborate(&p, &[]),
            Err(BuildError::CyclicConstant { .. })
        ));
    }

    #[test]
    fn test_undefined_reported() {
        let p = program("const double q;\nconst int K = 2;");
        let c = elaborate(&p, &[]).unwrap();
        assert_eq!(c.undefined, vec![("q".to_string(), ConstType::Double)]);
        assert_eq!(c.values.get("K"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_override_fills_undefined() {
        let p = program("const double q;");
        let c = elaborate(&p, &[("q".to_string(), "0.5".to_string())]).unwrap();
        assert!(c.undefined.is_empty());
        assert_eq!(c.values.get("q"), Some(&Value::Double(0.5)));
    }

    #[test]
    fn test_bad_overrides() {
        let p = program("const int K = 2;");
        assert!(matches!(
            elaborate(&p, &[("missing".to_string(), "1".to_string())]),
            Err(BuildError::UnknownConstantOverride { .. })
        ));
        assert!(matches!(
            elaborate(&p, &[("K".to_string(), "nope".to_string())]),
            Err(BuildError::InvalidConstantOverride { .. })
        ));
    }

    #[test]
    fn test_int_promotes_to_declared_double() {
        let p = program("const double half = 1/2;\nconst double two = 2;");
        let c = elaborate(&p, &[]).unwrap();
        assert_eq!(c.values.get("half"), Some(&Value::Double(0.5)));
        assert_eq!(c.values.get("two"), Some(&Value::Double(2.0)));
    }

    #[test]
    fn test_formula_cycle_detected() {
        let p = program("");
        assert!(check_formula_cycles(&p).is_ok());
        let cyclic = parse(
            "dtmc\nformula a = b;\nformula b = a;\nmodule m\nx : [0..1];\n[] true -> true;\nendmodule\n",
        )
        .unwrap();
        assert!(matches!(
            check_formula_cycles(&cyclic),
            Err(BuildError::CyclicFormula { .. })
        ));
    }
}
