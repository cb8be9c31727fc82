//! Breadth-first explicit-state exploration.
//!
//! States are explored in discovery order, which is also their index, so
//! matrix rows can be written as exploration proceeds. Deterministic input
//! yields a deterministic model: for a fixed program, property set and
//! overrides, repeated builds produce identical state and transition
//! counts.

use crate::constants;
use crate::eval::{self, Env, EvalError, Value};
use crate::state::{StateSet, VarInfo, VarLayout};
use crate::value::{eval_value, ModelValue};
use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use stoch_logic::Property;
use stoch_storage::{
    Distribution, LabelingError, MatrixError, ModelKind, SparseMatrixBuilder, SparseModel,
    StandardRewardModel, StateLabeling,
};
use stoch_syntax::{
    Assignment, Command, ConstType, Expr, ModelType, Program, RewardItem, VarRange,
};
use thiserror::Error;
use tracing::{debug, info};

/// Tolerance for the branch-probability sum check on concrete builds.
const PROBABILITY_SUM_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Labeling(#[from] LabelingError),
    #[error("undefined constants: {}", names.join(", "))]
    UndefinedConstants { names: Vec<String> },
    #[error("cyclic constant definition involving `{name}`")]
    CyclicConstant { name: String },
    #[error("cyclic formula definition involving `{name}`")]
    CyclicFormula { name: String },
    #[error("override for unknown constant `{name}`")]
    UnknownConstantOverride { name: String },
    #[error("invalid value `{value}` for constant `{name}`")]
    InvalidConstantOverride { name: String, value: String },
    #[error("constant `{name}` is declared {declared} but evaluates to {found}")]
    ConstantTypeMismatch {
        name: String,
        declared: ConstType,
        found: &'static str,
    },
    #[error("variable `{variable}` has empty range [{low}..{high}]")]
    EmptyVariableRange {
        variable: String,
        low: i64,
        high: i64,
    },
    #[error("initial value {value} of `{variable}` lies outside [{low}..{high}]")]
    InitOutOfBounds {
        variable: String,
        value: i64,
        low: i64,
        high: i64,
    },
    #[error("assignment sets `{variable}` to {value}, outside [{low}..{high}]")]
    AssignmentOutOfBounds {
        variable: String,
        value: i64,
        low: i64,
        high: i64,
    },
    #[error("synchronized update assigns `{variable}` more than once")]
    ConflictingAssignment { variable: String },
    #[error("branch probabilities in state {state} sum to {sum}, expected 1")]
    BadProbabilitySum { state: usize, sum: String },
    #[error("negative probability or rate in state {state}")]
    NegativeProbability { state: usize },
    #[error("property references unknown label \"{name}\"")]
    UnknownLabel { name: String },
}

/// Options for model construction.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// `NAME=VALUE` constant overrides, already split into pairs.
    pub constant_overrides: Vec<(String, String)>,
}

/// Build a sparse model from a program and the properties that will be
/// checked against it.
///
/// The properties only influence which labels the model carries: labels
/// they reference are evaluated onto the state space; with no properties
/// every program label is. Over `T = f64` all constants must be defined;
/// over [`stoch_storage::RationalFunction`] undefined `double` constants
/// become parameters (undefined `int` and `bool` constants are an error
/// either way).
pub fn build<T: ModelValue>(
    program: &Program,
    properties: &[Property],
    options: &BuildOptions,
) -> Result<SparseModel<T>, BuildError> {
    let constants = constants::elaborate(program, &options.constant_overrides)?;
    constants::check_formula_cycles(program)?;

    let mut parameters = BTreeSet::new();
    let mut missing = Vec::new();
    for (name, ty) in &constants.undefined {
        if *ty == ConstType::Double && T::PARAMETRIC {
            parameters.insert(name.clone());
        } else {
            missing.push(name.clone());
        }
    }
    if !missing.is_empty() {
        return Err(BuildError::UndefinedConstants { names: missing });
    }

    let explorer = Explorer {
        program,
        constants: constants.values,
        formulas: program
            .formulas
            .iter()
            .map(|f| (f.name.name.clone(), f.expr.clone()))
            .collect(),
        parameters,
        layout: VarLayout::new(),
        actions: Vec::new(),
        participants: Vec::new(),
    };
    explorer.run(properties)
}

/// One probabilistic branch of a (possibly synchronized) choice. The
/// probability is a product of factors, one per participating command; an
/// empty list means probability 1.
struct Branch<'a> {
    probability: Vec<&'a Expr>,
    assignments: Vec<&'a Assignment>,
}

/// One nondeterministic choice available in a state.
struct Choice<'a> {
    action: Option<&'a str>,
    branches: Vec<Branch<'a>>,
}

struct Explorer<'a> {
    program: &'a Program,
    constants: AHashMap<String, Value>,
    formulas: AHashMap<String, Expr>,
    parameters: BTreeSet<String>,
    layout: VarLayout,
    /// Action labels in order of first appearance.
    actions: Vec<String>,
    /// For each action, the indices of modules declaring it; commands with
    /// that action synchronize across all of them.
    participants: Vec<Vec<usize>>,
}

impl<'a> Explorer<'a> {
    fn env<'s>(&'s self, state: &'s [i64]) -> Env<'s> {
        Env {
            constants: &self.constants,
            formulas: &self.formulas,
            vars: Some((&self.layout, state)),
        }
    }

    fn run<T: ModelValue>(mut self, properties: &[Property]) -> Result<SparseModel<T>, BuildError> {
        self.compute_layout()?;
        self.collect_actions();
        debug!(
            model_type = %self.program.model_type(),
            variables = self.layout.len(),
            parameters = self.parameters.len(),
            "starting state space exploration"
        );

        let nondeterministic = self.program.model_type() == ModelType::Mdp;
        let mut matrix = if nondeterministic {
            SparseMatrixBuilder::with_row_groups()
        } else {
            SparseMatrixBuilder::new()
        };
        let mut states = StateSet::new();
        let mut queue = VecDeque::new();
        let (init_index, _) = states.insert(self.layout.initial_state());
        queue.push_back(init_index);

        let mut row = 0usize;
        let mut deadlocks = Vec::new();
        let mut action_reward_rows: Vec<Vec<T>> = self
            .program
            .rewards
            .iter()
            .map(|_| Vec::new())
            .collect();

        while let Some(index) = queue.pop_front() {
            let state = states.get(index).to_vec();
            if nondeterministic {
                matrix.new_row_group(row)?;
            }
            let choices = self.enabled_choices(&state)?;
            if choices.is_empty() {
                // Fix deadlocks with a self-loop; the state keeps the
                // `deadlock` label so it stays observable.
                matrix.add_next_value(row, index, T::one())?;
                for rewards in action_reward_rows.iter_mut() {
                    rewards.push(T::zero());
                }
                deadlocks.push(index);
                row += 1;
                continue;
            }

            let mut distributions = Vec::with_capacity(choices.len());
            let mut choice_rewards = Vec::with_capacity(choices.len());
            for choice in &choices {
                distributions.push(self.choice_distribution::<T>(
                    &state,
                    index,
                    choice,
                    &mut states,
                    &mut queue,
                )?);
                choice_rewards.push(self.action_rewards_of_choice::<T>(&state, choice)?);
            }

            if nondeterministic {
                for (dist, rewards) in distributions.into_iter().zip(choice_rewards) {
                    for (column, value) in dist.iter() {
                        matrix.add_next_value(row, column, value.clone())?;
                    }
                    for (acc, value) in action_reward_rows.iter_mut().zip(rewards) {
                        acc.push(value);
                    }
                    row += 1;
                }
            } else {
                // DTMC: uniform choice over enabled commands; CTMC: race,
                // rates add up.
                let n = distributions.len();
                let factor = if self.program.model_type() == ModelType::Dtmc && n > 1 {
                    // 1/n with n >= 2; the division cannot fail.
                    T::one()
                        .checked_div(&T::from_int(n as i64))
                        .unwrap_or_else(T::one)
                } else {
                    T::one()
                };
                let mut merged = Distribution::new();
                for dist in &distributions {
                    for (column, value) in dist.iter() {
                        merged.add_probability(column, value.clone() * factor.clone());
                    }
                }
                if merged.is_empty() {
                    merged.add_probability(index, T::one());
                    deadlocks.push(index);
                }
                for (column, value) in merged.iter() {
                    matrix.add_next_value(row, column, value.clone())?;
                }
                for (r, acc) in action_reward_rows.iter_mut().enumerate() {
                    let mut total = T::zero();
                    for rewards in &choice_rewards {
                        total = total + rewards[r].clone() * factor.clone();
                    }
                    acc.push(total);
                }
                row += 1;
            }
        }

        let state_count = states.len();
        let matrix = matrix.build(row);
        info!(
            states = state_count,
            transitions = matrix.entry_count(),
            choices = row,
            "model built"
        );

        let labeling = self.build_labeling(&states, properties, init_index, &deadlocks)?;
        let reward_models = self.build_rewards(&states, action_reward_rows)?;
        Ok(SparseModel::new(
            kind_of(self.program.model_type()),
            matrix,
            labeling,
            reward_models,
        ))
    }

    fn compute_layout(&mut self) -> Result<(), BuildError> {
        let env = Env::constants_only(&self.constants, &self.formulas);
        let mut layout = VarLayout::new();
        for decl in self.program.all_variables() {
            let name = decl.name.name.clone();
            let (low, high, is_bool) = match &decl.range {
                VarRange::Bool => (0, 1, true),
                VarRange::BoundedInt { low, high } => {
                    (eval::eval_int(low, &env)?, eval::eval_int(high, &env)?, false)
                }
            };
            if low > high {
                return Err(BuildError::EmptyVariableRange {
                    variable: name,
                    low,
                    high,
                });
            }
            let init = match &decl.init {
                None => low,
                Some(expr) => {
                    let value = eval::eval(expr, &env)?;
                    match (is_bool, value) {
                        (true, Value::Bool(b)) => b as i64,
                        (false, Value::Int(n)) => n,
                        _ => {
                            return Err(EvalError::TypeMismatch {
                                expected: if is_bool { "bool" } else { "int" },
                                found: value.type_name(),
                                span: expr.span,
                            }
                            .into())
                        }
                    }
                }
            };
            if init < low || init > high {
                return Err(BuildError::InitOutOfBounds {
                    variable: name,
                    value: init,
                    low,
                    high,
                });
            }
            layout.push(VarInfo {
                name,
                low,
                high,
                init,
                is_bool,
            });
        }
        self.layout = layout;
        Ok(())
    }

    fn collect_actions(&mut self) {
        for module in &self.program.modules {
            for command in &module.commands {
                if let Some(action) = &command.action {
                    if !self.actions.contains(&action.name) {
                        self.actions.push(action.name.clone());
                    }
                }
            }
        }
        self.participants = self
            .actions
            .iter()
            .map(|action| {
                self.program
                    .modules
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.has_action(action))
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
    }

    /// The choices enabled in `state`: unlabeled commands interleave, one
    /// choice each; labeled commands synchronize across every module
    /// declaring the action, combined by cartesian product.
    fn enabled_choices(&self, state: &[i64]) -> Result<Vec<Choice<'_>>, BuildError> {
        let env = self.env(state);
        let mut choices = Vec::new();
        for module in &self.program.modules {
            for command in &module.commands {
                if command.action.is_none() && eval::eval_bool(&command.guard, &env)? {
                    choices.push(Choice {
                        action: None,
                        branches: command
                            .updates
                            .iter()
                            .map(|u| Branch {
                                probability: u.probability.as_ref().into_iter().collect(),
                                assignments: u.assignments.iter().collect(),
                            })
                            .collect(),
                    });
                }
            }
        }

        'actions: for (action, modules) in self.actions.iter().zip(&self.participants) {
            let mut per_module: Vec<Vec<&Command>> = Vec::with_capacity(modules.len());
            for &module_index in modules {
                let mut enabled = Vec::new();
                for command in &self.program.modules[module_index].commands {
                    if command.action.as_ref().is_some_and(|a| a.name == *action)
                        && eval::eval_bool(&command.guard, &env)?
                    {
                        enabled.push(command);
                    }
                }
                if enabled.is_empty() {
                    // One participant blocks the whole action.
                    continue 'actions;
                }
                per_module.push(enabled);
            }
            let total: usize = per_module.iter().map(|v| v.len()).product();
            for combination in 0..total {
                choices.push(synchronize(action, &per_module, combination));
            }
        }
        Ok(choices)
    }

    /// Evaluate one choice in `state`: compute each branch's probability
    /// and successor, discovering new states along the way.
    fn choice_distribution<T: ModelValue>(
        &self,
        state: &[i64],
        index: usize,
        choice: &Choice<'_>,
        states: &mut StateSet,
        queue: &mut VecDeque<usize>,
    ) -> Result<Distribution<T>, BuildError> {
        let env = self.env(state);
        let mut dist = Distribution::new();
        let mut sum = T::zero();
        for branch in &choice.branches {
            let mut probability = T::one();
            for factor in &branch.probability {
                probability = probability * eval_value::<T>(factor, &env, &self.parameters)?;
            }
            if let Some(x) = probability.to_f64() {
                if x < 0.0 {
                    return Err(BuildError::NegativeProbability { state: index });
                }
            }
            sum = sum + probability.clone();
            if probability.is_zero() {
                continue;
            }
            let target = self.apply_assignments(state, &env, &branch.assignments)?;
            let (target_index, fresh) = states.insert(target);
            if fresh {
                queue.push_back(target_index);
            }
            dist.add_probability(target_index, probability);
        }
        if self.program.model_type() != ModelType::Ctmc {
            if let Some(total) = sum.to_f64() {
                if (total - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
                    return Err(BuildError::BadProbabilitySum {
                        state: index,
                        sum: total.to_string(),
                    });
                }
            }
        }
        Ok(dist)
    }

    fn apply_assignments(
        &self,
        state: &[i64],
        env: &Env,
        assignments: &[&Assignment],
    ) -> Result<Vec<i64>, BuildError> {
        let mut target = state.to_vec();
        let mut assigned: Vec<usize> = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let name = &assignment.var.name;
            let slot = self
                .layout
                .slot(name)
                .ok_or_else(|| EvalError::UnknownIdentifier {
                    name: name.clone(),
                    span: assignment.var.span,
                })?;
            if assigned.contains(&slot) {
                return Err(BuildError::ConflictingAssignment {
                    variable: name.clone(),
                });
            }
            assigned.push(slot);
            let info = self.layout.info(slot);
            let value = if info.is_bool {
                eval::eval_bool(&assignment.value, env)? as i64
            } else {
                eval::eval_int(&assignment.value, env)?
            };
            if value < info.low || value > info.high {
                return Err(BuildError::AssignmentOutOfBounds {
                    variable: name.clone(),
                    value,
                    low: info.low,
                    high: info.high,
                });
            }
            target[slot] = value;
        }
        Ok(target)
    }

    /// Per-rewards-structure action reward of one choice, aligned with
    /// `program.rewards`.
    fn action_rewards_of_choice<T: ModelValue>(
        &self,
        state: &[i64],
        choice: &Choice<'_>,
    ) -> Result<Vec<T>, BuildError> {
        let env = self.env(state);
        let mut rewards = Vec::with_capacity(self.program.rewards.len());
        for decl in &self.program.rewards {
            let mut total = T::zero();
            for item in &decl.items {
                let RewardItem::Action {
                    action,
                    guard,
                    value,
                    ..
                } = item
                else {
                    continue;
                };
                if action.as_ref().map(|a| a.name.as_str()) != choice.action {
                    continue;
                }
                if eval::eval_bool(guard, &env)? {
                    total = total + eval_value::<T>(value, &env, &self.parameters)?;
                }
            }
            rewards.push(total);
        }
        Ok(rewards)
    }

    fn build_labeling(
        &self,
        states: &StateSet,
        properties: &[Property],
        init_index: usize,
        deadlocks: &[usize],
    ) -> Result<StateLabeling, BuildError> {
        let mut labeling = StateLabeling::new(states.len());
        labeling.add_label("init")?;
        labeling.add_label_to_state("init", init_index)?;
        labeling.add_label("deadlock")?;
        for &state in deadlocks {
            labeling.add_label_to_state("deadlock", state)?;
        }

        let selected: Vec<&stoch_syntax::LabelDecl> = if properties.is_empty() {
            self.program.labels.iter().collect()
        } else {
            let mut names: Vec<String> = Vec::new();
            for property in properties {
                for name in property.referenced_labels() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
            let mut decls = Vec::with_capacity(names.len());
            for name in names {
                if name == "init" || name == "deadlock" {
                    continue;
                }
                decls.push(
                    self.program
                        .label(&name)
                        .ok_or(BuildError::UnknownLabel { name })?,
                );
            }
            decls
        };

        for decl in selected {
            labeling.add_label(&decl.name)?;
            for index in 0..states.len() {
                let env = self.env(states.get(index));
                if eval::eval_bool(&decl.expr, &env)? {
                    labeling.add_label_to_state(&decl.name, index)?;
                }
            }
        }
        Ok(labeling)
    }

    fn build_rewards<T: ModelValue>(
        &self,
        states: &StateSet,
        action_reward_rows: Vec<Vec<T>>,
    ) -> Result<BTreeMap<String, StandardRewardModel<T>>, BuildError> {
        let mut reward_models = BTreeMap::new();
        for (decl, action_rows) in self.program.rewards.iter().zip(action_reward_rows) {
            let has_state = decl
                .items
                .iter()
                .any(|i| matches!(i, RewardItem::State { .. }));
            let has_action = decl
                .items
                .iter()
                .any(|i| matches!(i, RewardItem::Action { .. }));

            let state_rewards = if has_state {
                let mut values = Vec::with_capacity(states.len());
                for index in 0..states.len() {
                    let env = self.env(states.get(index));
                    let mut total = T::zero();
                    for item in &decl.items {
                        let RewardItem::State { guard, value, .. } = item else {
                            continue;
                        };
                        if eval::eval_bool(guard, &env)? {
                            total = total + eval_value::<T>(value, &env, &self.parameters)?;
                        }
                    }
                    values.push(total);
                }
                Some(values)
            } else {
                None
            };
            let state_action_rewards = has_action.then_some(action_rows);
            reward_models.insert(
                decl.name.clone().unwrap_or_default(),
                StandardRewardModel::new(state_rewards, state_action_rewards),
            );
        }
        Ok(reward_models)
    }
}

/// Merge the `combination`-th cartesian pick of commands into one
/// synchronized choice: branch probabilities multiply, assignments
/// concatenate.
fn synchronize<'a>(
    action: &'a str,
    per_module: &[Vec<&'a Command>],
    mut combination: usize,
) -> Choice<'a> {
    let mut branches = vec![Branch {
        probability: Vec::new(),
        assignments: Vec::new(),
    }];
    for options in per_module {
        let command = options[combination % options.len()];
        combination /= options.len();
        let mut next = Vec::with_capacity(branches.len() * command.updates.len());
        for branch in &branches {
            for update in &command.updates {
                let mut merged = Branch {
                    probability: branch.probability.clone(),
                    assignments: branch.assignments.clone(),
                };
                if let Some(p) = &update.probability {
                    merged.probability.push(p);
                }
                merged.assignments.extend(update.assignments.iter());
                next.push(merged);
            }
        }
        branches = next;
    }
    Choice {
        action: Some(action),
        branches,
    }
}

fn kind_of(model_type: ModelType) -> ModelKind {
    match model_type {
        ModelType::Dtmc => ModelKind::Dtmc,
        ModelType::Ctmc => ModelKind::Ctmc,
        ModelType::Mdp => ModelKind::Mdp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoch_storage::RationalFunction;
    use stoch_syntax::parse;

    fn build_f64(src: &str) -> Result<SparseModel<f64>, BuildError> {
        build(&parse(src).unwrap(), &[], &BuildOptions::default())
    }

    #[test]
    fn test_simple_chain() {
        let model = build_f64(
            "dtmc\nmodule m\nx : [0..2] init 0;\n[] x<2 -> 0.5 : (x'=x+1) + 0.5 : (x'=0);\n[] x=2 -> (x'=2);\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.nr_states(), 3);
        assert_eq!(model.nr_transitions(), 5);
        assert_eq!(model.model_type(), ModelKind::Dtmc);
        assert_eq!(model.transition_matrix().row(0).len(), 2);
    }

    #[test]
    fn test_missing_init_defaults_to_lower_bound() {
        // x starts at its lower bound 2, b at false.
        let model = build_f64(
            "dtmc\nmodule m\nx : [2..4];\nb : bool;\n[] x<4 & !b -> (x'=x+1);\n[] x=4 & !b -> (b'=true);\n[] b -> true;\nendmodule\nlabel \"start\" = x=2 & !b;\n",
        )
        .unwrap();
        assert_eq!(model.nr_states(), 4);
        let start = model.labeling().states_with_label("start").unwrap();
        assert!(start.contains(0));
        assert_eq!(start.count(), 1);
        assert!(model.labeling().states_with_label("init").unwrap().contains(0));
    }

    #[test]
    fn test_uniform_choice_over_commands() {
        // Two enabled commands in the initial state, each weighted 1/2.
        let model = build_f64(
            "dtmc\nmodule m\nx : [0..2] init 0;\n[] x=0 -> (x'=1);\n[] x=0 -> (x'=2);\n[] x>0 -> true;\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.nr_states(), 3);
        let row = model.transition_matrix().row(0);
        assert_eq!(row.len(), 2);
        assert_eq!(row[0].value, 0.5);
        assert_eq!(row[1].value, 0.5);
    }

    #[test]
    fn test_ctmc_rates_sum() {
        let model = build_f64(
            "ctmc\nmodule m\nx : [0..1] init 0;\n[] x=0 -> 3.0 : (x'=1);\n[] x=0 -> 2.0 : (x'=1);\n[] x=1 -> 1.0 : (x'=0);\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.model_type(), ModelKind::Ctmc);
        assert_eq!(model.nr_states(), 2);
        let row = model.transition_matrix().row(0);
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].value, 5.0);
    }

    #[test]
    fn test_mdp_row_groups() {
        let model = build_f64(
            "mdp\nmodule m\nx : [0..2] init 0;\n[a] x=0 -> (x'=1);\n[b] x=0 -> (x'=2);\n[] x>0 -> true;\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.model_type(), ModelKind::Mdp);
        assert_eq!(model.nr_states(), 3);
        assert_eq!(model.nr_choices(), 4);
        assert_eq!(model.transition_matrix().row_group(0), 0..2);
    }

    #[test]
    fn test_synchronization_multiplies_probabilities() {
        let model = build_f64(
            "mdp\nmodule m1\nx : [0..1] init 0;\n[go] x=0 -> 0.5 : (x'=0) + 0.5 : (x'=1);\n[] x=1 -> true;\nendmodule\nmodule m2\ny : [0..1] init 0;\n[go] y=0 -> 0.5 : (y'=0) + 0.5 : (y'=1);\n[] y=1 -> true;\nendmodule\n",
        )
        .unwrap();
        // Initial state: one synchronized choice with 4 branches of 1/4.
        let row = model.transition_matrix().row(0);
        assert_eq!(row.len(), 4);
        assert!(row.iter().all(|e| e.value == 0.25));
    }

    #[test]
    fn test_blocked_action_disables_choice() {
        // m2 never enables `go`, so the initial state deadlocks.
        let model = build_f64(
            "mdp\nmodule m1\nx : [0..1] init 0;\n[go] x=0 -> (x'=1);\nendmodule\nmodule m2\ny : [0..1] init 0;\n[go] y=1 -> (y'=0);\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.nr_states(), 1);
        let deadlocked = model.labeling().states_with_label("deadlock").unwrap();
        assert!(deadlocked.contains(0));
    }

    #[test]
    fn test_deadlock_gets_self_loop() {
        let model = build_f64(
            "dtmc\nmodule m\nx : [0..1] init 0;\n[] x=0 -> (x'=1);\nendmodule\n",
        )
        .unwrap();
        assert_eq!(model.nr_states(), 2);
        assert_eq!(model.nr_transitions(), 2);
        let row = model.transition_matrix().row(1);
        assert_eq!(row.len(), 1);
        assert_eq!(row[0].column, 1);
        assert!(model
            .labeling()
            .states_with_label("deadlock")
            .unwrap()
            .contains(1));
    }

    #[test]
    fn test_bad_probability_sum() {
        let err = build_f64(
            "dtmc\nmodule m\nx : [0..1] init 0;\n[] x=0 -> 0.5 : (x'=1) + 0.4 : (x'=0);\nendmodule\n",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::BadProbabilitySum { state: 0, .. }));
    }

    #[test]
    fn test_assignment_out_of_bounds() {
        let err = build_f64(
            "dtmc\nmodule m\nx : [0..1] init 0;\n[] true -> (x'=x+1);\nendmodule\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BuildError::AssignmentOutOfBounds {
                value: 2,
                high: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_undefined_constant_is_error_for_concrete_build() {
        let err = build_f64(
            "dtmc\nconst double p;\nmodule m\nx : [0..1] init 0;\n[] x=0 -> p : (x'=1) + 1-p : (x'=0);\nendmodule\n",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::UndefinedConstants { names } if names == ["p"]));
    }

    #[test]
    fn test_undefined_int_is_error_even_for_parametric_build() {
        // Only undefined doubles become parameters.
        let program = parse(
            "dtmc\nconst int N;\nmodule m\nx : [0..2] init 0;\n[] x<N -> (x'=x+1);\n[] x>=N -> true;\nendmodule\n",
        )
        .unwrap();
        let err = build::<RationalFunction>(&program, &[], &BuildOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::UndefinedConstants { names } if names == ["N"]));
    }

    #[test]
    fn test_parametric_build_keeps_parameter() {
        let program = parse(
            "dtmc\nconst double p;\nmodule m\nx : [0..1] init 0;\n[] x=0 -> p : (x'=1) + 1-p : (x'=0);\n[] x=1 -> true;\nendmodule\n",
        )
        .unwrap();
        let model: SparseModel<RationalFunction> =
            build(&program, &[], &BuildOptions::default()).unwrap();
        assert_eq!(model.nr_states(), 2);
        let row = model.transition_matrix().row(0);
        assert_eq!(row.len(), 2);
        assert!(row.iter().any(|e| !e.value.is_constant()));
    }

    #[test]
    fn test_parametric_sum_check_is_exact() {
        let program = parse(
            "dtmc\nmodule m\nx : [0..1] init 0;\n[] x=0 -> 0.3 : (x'=1) + 0.7 : (x'=0);\n[] x=1 -> true;\nendmodule\n",
        )
        .unwrap();
        // 3/10 + 7/10 is exactly 1 as rationals.
        let model: SparseModel<RationalFunction> =
            build(&program, &[], &BuildOptions::default()).unwrap();
        assert_eq!(model.nr_states(), 2);
    }

    #[test]
    fn test_labels_follow_properties() {
        let src = "dtmc\nmodule m\nx : [0..2] init 0;\n[] x<2 -> (x'=x+1);\n[] x=2 -> true;\nendmodule\nlabel \"done\" = x=2;\nlabel \"mid\" = x=1;\n";
        let program = parse(src).unwrap();

        let all = build::<f64>(&program, &[], &BuildOptions::default()).unwrap();
        assert!(all.labeling().contains_label("done"));
        assert!(all.labeling().contains_label("mid"));

        let property = stoch_logic::parse_property("P=? [F \"done\"]", &program).unwrap();
        let selected =
            build::<f64>(&program, std::slice::from_ref(&property), &BuildOptions::default())
                .unwrap();
        assert!(selected.labeling().contains_label("done"));
        assert!(!selected.labeling().contains_label("mid"));
        assert!(selected
            .labeling()
            .states_with_label("done")
            .unwrap()
            .contains(2));
    }

    #[test]
    fn test_rewards() {
        let src = "dtmc\nmodule m\nx : [0..2] init 0;\n[] x<2 -> (x'=x+1);\n[] x=2 -> true;\nendmodule\nrewards \"steps\"\n[] x<2 : 1;\nendrewards\nrewards \"at_two\"\nx=2 : 5;\nendrewards\n";
        let model = build_f64(src).unwrap();

        let steps = model.reward_model("steps").unwrap();
        assert!(steps.has_state_action_rewards());
        assert!(!steps.has_state_rewards());
        assert_eq!(steps.state_action_rewards().unwrap(), &[1.0, 1.0, 0.0]);

        let at_two = model.reward_model("at_two").unwrap();
        assert_eq!(at_two.state_rewards().unwrap(), &[0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_constant_override_changes_state_space() {
        let src = "dtmc\nconst int N = 2;\nmodule m\nx : [0..N] init 0;\n[] x<N -> (x'=x+1);\n[] x=N -> true;\nendmodule\n";
        let program = parse(src).unwrap();
        let small = build::<f64>(&program, &[], &BuildOptions::default()).unwrap();
        assert_eq!(small.nr_states(), 3);
        let options = BuildOptions {
            constant_overrides: vec![("N".to_string(), "5".to_string())],
        };
        let large = build::<f64>(&program, &[], &options).unwrap();
        assert_eq!(large.nr_states(), 6);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let src = "dtmc\nmodule m\nx : [0..5] init 0;\n[] x<5 -> 0.5 : (x'=x+1) + 0.5 : (x'=0);\n[] x=5 -> true;\nendmodule\n";
        let program = parse(src).unwrap();
        let a = build::<f64>(&program, &[], &BuildOptions::default()).unwrap();
        let b = build::<f64>(&program, &[], &BuildOptions::default()).unwrap();
        assert_eq!(a.nr_states(), b.nr_states());
        assert_eq!(a.nr_transitions(), b.nr_transitions());
        assert_eq!(a.transition_matrix(), b.transition_matrix());
    }
}
