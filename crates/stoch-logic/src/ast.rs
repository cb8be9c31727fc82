//! Property AST with canonical textual rendering.

use std::fmt;
use stoch_syntax::{pretty_print_expr, Expr};

/// A single parsed property.
///
/// The `Display` implementation is the canonical rendering; `parse` of a
/// canonical rendering yields an equal tree, so render-parse-render is the
/// identity.
#[derive(Debug, Clone)]
pub struct Property {
    pub formula: StateFormula,
}

impl Property {
    /// Label names referenced anywhere in the property.
    pub fn referenced_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        self.formula.collect_labels(&mut labels);
        labels
    }

    /// Reward structure names referenced by `R{"name"}` operators.
    pub fn referenced_reward_models(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.formula.collect_reward_models(&mut names);
        names
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.formula.fmt_prec(f, 0)
    }
}

/// A state formula.
#[derive(Debug, Clone)]
pub enum StateFormula {
    /// `true`
    True,
    /// `false`
    False,
    /// `"name"` — an atomic label.
    Label(String),
    /// A boolean expression over program variables and constants.
    Atom(Expr),
    /// `!phi`
    Not(Box<StateFormula>),
    /// `phi & psi`
    And(Box<StateFormula>, Box<StateFormula>),
    /// `phi | psi`
    Or(Box<StateFormula>, Box<StateFormula>),
    /// `phi => psi`
    Implies(Box<StateFormula>, Box<StateFormula>),
    /// `(phi)` — kept so canonical input round-trips.
    Paren(Box<StateFormula>),
    /// `P<bound> [path]`
    Prob {
        opt: Option<OptimalityType>,
        bound: Bound,
        path: Box<PathFormula>,
    },
    /// `R{"name"}<bound> [rewardpath]`
    Reward {
        opt: Option<OptimalityType>,
        reward_model: Option<String>,
        bound: Bound,
        path: Box<RewardPath>,
    },
}

/// Min/max qualifier for nondeterministic models (`Pmax=?`, `Rmin=?`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimalityType {
    Min,
    Max,
}

impl OptimalityType {
    fn suffix(self) -> &'static str {
        match self {
            OptimalityType::Min => "min",
            OptimalityType::Max => "max",
        }
    }
}

/// The bound of a probability or reward operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `=?` — a quantitative query.
    Query,
    /// A qualitative threshold, e.g. `<=0.5`.
    Threshold { op: CmpOp, value: f64 },
}

/// Comparison operator of a threshold bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// A path formula under a `P` operator.
#[derive(Debug, Clone)]
pub enum PathFormula {
    /// `X phi`
    Next(StateFormula),
    /// `F phi`
    Eventually(StateFormula),
    /// `F<=k phi`
    BoundedEventually(StateFormula, i64),
    /// `G phi`
    Globally(StateFormula),
    /// `G<=k phi`
    BoundedGlobally(StateFormula, i64),
    /// `phi U psi`
    Until(StateFormula, StateFormula),
    /// `phi U<=k psi`
    BoundedUntil(StateFormula, StateFormula, i64),
}

/// A reward path under an `R` operator.
#[derive(Debug, Clone)]
pub enum RewardPath {
    /// `F phi` — expected reward accumulated until `phi` holds.
    Reachability(StateFormula),
    /// `C<=k` — expected reward cumulated over `k` steps.
    Cumulative(i64),
}

impl StateFormula {
    /// Precedence of this formula as a parent context (higher binds
    /// tighter). Mirrors the expression precedence in `stoch-syntax`.
    fn precedence(&self) -> u8 {
        match self {
            StateFormula::Implies(..) => 2,
            StateFormula::Or(..) => 3,
            StateFormula::And(..) => 4,
            _ => u8::MAX,
        }
    }

    pub(crate) fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        match self {
            StateFormula::True => write!(f, "true"),
            StateFormula::False => write!(f, "false"),
            StateFormula::Label(name) => write!(f, "\"{}\"", name),
            StateFormula::Atom(expr) => write!(f, "{}", pretty_print_expr(expr)),
            StateFormula::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_prec(f, u8::MAX)
            }
            StateFormula::And(l, r) => self.fmt_binary(f, min_prec, " & ", l, r),
            StateFormula::Or(l, r) => self.fmt_binary(f, min_prec, " | ", l, r),
            StateFormula::Implies(l, r) => self.fmt_binary(f, min_prec, " => ", l, r),
            StateFormula::Paren(inner) => {
                write!(f, "(")?;
                inner.fmt_prec(f, 0)?;
                write!(f, ")")
            }
            StateFormula::Prob { opt, bound, path } => {
                write!(f, "P")?;
                if let Some(opt) = opt {
                    write!(f, "{}", opt.suffix())?;
                }
                write!(f, "{} [{}]", bound, path)
            }
            StateFormula::Reward {
                opt,
                reward_model,
                bound,
                path,
            } => {
                write!(f, "R")?;
                if let Some(name) = reward_model {
                    write!(f, "{{\"{}\"}}", name)?;
                }
                if let Some(opt) = opt {
                    write!(f, "{}", opt.suffix())?;
                }
                write!(f, "{} [{}]", bound, path)
            }
        }
    }

    fn fmt_binary(
        &self,
        f: &mut fmt::Formatter<'_>,
        min_prec: u8,
        symbol: &str,
        left: &StateFormula,
        right: &StateFormula,
    ) -> fmt::Result {
        let prec = self.precedence();
        let parens = prec < min_prec;
        if parens {
            write!(f, "(")?;
        }
        // Implies is right-associative, And/Or are left-associative.
        let (left_min, right_min) = if matches!(self, StateFormula::Implies(..)) {
            (prec + 1, prec)
        } else {
            (prec, prec + 1)
        };
        left.fmt_prec(f, left_min)?;
        write!(f, "{}", symbol)?;
        right.fmt_prec(f, right_min)?;
        if parens {
            write!(f, ")")?;
        }
        Ok(())
    }

    fn collect_labels(&self, out: &mut Vec<String>) {
        match self {
            StateFormula::Label(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            StateFormula::Not(inner) | StateFormula::Paren(inner) => inner.collect_labels(out),
            StateFormula::And(l, r)
            | StateFormula::Or(l, r)
            | StateFormula::Implies(l, r) => {
                l.collect_labels(out);
                r.collect_labels(out);
            }
            StateFormula::Prob { path, .. } => path.collect_labels(out),
            StateFormula::Reward { path, .. } => {
                if let RewardPath::Reachability(sf) = path.as_ref() {
                    sf.collect_labels(out);
                }
            }
            StateFormula::True
            | StateFormula::False
            | StateFormula::Atom(_) => {}
        }
    }

    fn collect_reward_models(&self, out: &mut Vec<String>) {
        match self {
            StateFormula::Reward {
                reward_model, path, ..
            } => {
                if let Some(name) = reward_model {
                    if !out.contains(name) {
                        out.push(name.clone());
                    }
                }
                if let RewardPath::Reachability(sf) = path.as_ref() {
                    sf.collect_reward_models(out);
                }
            }
            StateFormula::Not(inner) | StateFormula::Paren(inner) => {
                inner.collect_reward_models(out)
            }
            StateFormula::And(l, r)
            | StateFormula::Or(l, r)
            | StateFormula::Implies(l, r) => {
                l.collect_reward_models(out);
                r.collect_reward_models(out);
            }
            StateFormula::Prob { path, .. } => path.collect_reward_models(out),
            _ => {}
        }
    }
}

impl PathFormula {
    fn collect_labels(&self, out: &mut Vec<String>) {
        match self {
            PathFormula::Next(sf)
            | PathFormula::Eventually(sf)
            | PathFormula::BoundedEventually(sf, _)
            | PathFormula::Globally(sf)
            | PathFormula::BoundedGlobally(sf, _) => sf.collect_labels(out),
            PathFormula::Until(l, r) | PathFormula::BoundedUntil(l, r, _) => {
                l.collect_labels(out);
                r.collect_labels(out);
            }
        }
    }

    fn collect_reward_models(&self, out: &mut Vec<String>) {
        match self {
            PathFormula::Next(sf)
            | PathFormula::Eventually(sf)
            | PathFormula::BoundedEventually(sf, _)
            | PathFormula::Globally(sf)
            | PathFormula::BoundedGlobally(sf, _) => sf.collect_reward_models(out),
            PathFormula::Until(l, r) | PathFormula::BoundedUntil(l, r, _) => {
                l.collect_reward_models(out);
                r.collect_reward_models(out);
            }
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Query => write!(f, "=?"),
            Bound::Threshold { op, value } => write!(f, "{}{}", op.symbol(), value),
        }
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFormula::Next(sf) => {
                write!(f, "X ")?;
                sf.fmt_prec(f, 0)
            }
            PathFormula::Eventually(sf) => {
                write!(f, "F ")?;
                sf.fmt_prec(f, 0)
            }
            PathFormula::BoundedEventually(sf, k) => {
                write!(f, "F<={} ", k)?;
                sf.fmt_prec(f, 0)
            }
            PathFormula::Globally(sf) => {
                write!(f, "G ")?;
                sf.fmt_prec(f, 0)
            }
            PathFormula::BoundedGlobally(sf, k) => {
                write!(f, "G<={} ", k)?;
                sf.fmt_prec(f, 0)
            }
            PathFormula::Until(l, r) => {
                l.fmt_prec(f, u8::MAX)?;
                write!(f, " U ")?;
                r.fmt_prec(f, u8::MAX)
            }
            PathFormula::BoundedUntil(l, r, k) => {
                l.fmt_prec(f, u8::MAX)?;
                write!(f, " U<={} ", k)?;
                r.fmt_prec(f, u8::MAX)
            }
        }
    }
}

impl fmt::Display for RewardPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardPath::Reachability(sf) => {
                write!(f, "F ")?;
                sf.fmt_prec(f, 0)
            }
            RewardPath::Cumulative(k) => write!(f, "C<={}", k),
        }
    }
}
