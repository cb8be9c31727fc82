//! Name resolution of properties against a program.
//!
//! Every identifier in an atom must be a declared variable, constant, or
//! formula; every label must be declared (or one of the built-ins `init`
//! and `deadlock` that the model builder always provides); every named
//! reward operator must refer to a declared reward structure.

use crate::ast::{PathFormula, Property, RewardPath, StateFormula};
use crate::parser::{PropertyError, PropertyResult};
use stoch_syntax::{Expr, ExprKind, Program, Span};

/// Labels the model builder defines on every model.
const BUILTIN_LABELS: [&str; 2] = ["init", "deadlock"];

/// Check that all names in the property resolve against the program.
pub fn resolve_property(property: &Property, program: &Program) -> PropertyResult<()> {
    resolve_state_formula(&property.formula, program)
}

fn resolve_state_formula(formula: &StateFormula, program: &Program) -> PropertyResult<()> {
    match formula {
        StateFormula::True | StateFormula::False => Ok(()),
        StateFormula::Label(name) => {
            if program.label(name).is_some() || BUILTIN_LABELS.contains(&name.as_str()) {
                Ok(())
            } else {
                Err(PropertyError::UnknownLabel {
                    name: name.clone(),
                    span: Span::dummy(),
                })
            }
        }
        StateFormula::Atom(expr) => resolve_expr(expr, program),
        StateFormula::Not(inner) | StateFormula::Paren(inner) => {
            resolve_state_formula(inner, program)
        }
        StateFormula::And(l, r) | StateFormula::Or(l, r) | StateFormula::Implies(l, r) => {
            resolve_state_formula(l, program)?;
            resolve_state_formula(r, program)
        }
        StateFormula::Prob { path, .. } => resolve_path_formula(path, program),
        StateFormula::Reward {
            reward_model, path, ..
        } => {
            if let Some(name) = reward_model {
                let known = program
                    .rewards
                    .iter()
                    .any(|r| r.name.as_deref() == Some(name.as_str()));
                if !known {
                    return Err(PropertyError::UnknownRewardModel {
                        name: name.clone(),
                        span: Span::dummy(),
                    });
                }
            }
            match path.as_ref() {
                RewardPath::Reachability(sf) => resolve_state_formula(sf, program),
                RewardPath::Cumulative(_) => Ok(()),
            }
        }
    }
}

fn resolve_path_formula(path: &PathFormula, program: &Program) -> PropertyResult<()> {
    match path {
        PathFormula::Next(sf)
        | PathFormula::Eventually(sf)
        | PathFormula::BoundedEventually(sf, _)
        | PathFormula::Globally(sf)
        | PathFormula::BoundedGlobally(sf, _) => resolve_state_formula(sf, program),
        PathFormula::Until(l, r) | PathFormula::BoundedUntil(l, r, _) => {
            resolve_state_formula(l, program)?;
            resolve_state_formula(r, program)
        }
    }
}

fn resolve_expr(expr: &Expr, program: &Program) -> PropertyResult<()> {
    match &expr.kind {
        ExprKind::Bool(_) | ExprKind::Int(_) | ExprKind::Double(_) => Ok(()),
        ExprKind::Ident(name) => {
            let known = program.variable(name).is_some()
                || program.constant(name).is_some()
                || program.formula(name).is_some();
            if known {
                Ok(())
            } else {
                Err(PropertyError::UnknownIdentifier {
                    name: name.clone(),
                    span: expr.span,
                })
            }
        }
        ExprKind::Unary { operand, .. } => resolve_expr(operand, program),
        ExprKind::Binary { left, right, .. } => {
            resolve_expr(left, program)?;
            resolve_expr(right, program)
        }
        ExprKind::Ite {
            cond,
            then_branch,
            else_branch,
        } => {
            resolve_expr(cond, program)?;
            resolve_expr(then_branch, program)?;
            resolve_expr(else_branch, program)
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                resolve_expr(arg, program)?;
            }
            Ok(())
        }
        ExprKind::Paren(inner) => resolve_expr(inner, program),
    }
}
