//! The assembled sparse model.

use crate::labeling::StateLabeling;
use crate::matrix::SparseMatrix;
use crate::rewards::StandardRewardModel;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of transition system a model represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Dtmc,
    Ctmc,
    Mdp,
}

impl ModelKind {
    /// Whether states own row groups rather than single rows.
    pub fn is_nondeterministic(self) -> bool {
        matches!(self, ModelKind::Mdp)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Dtmc => write!(f, "DTMC"),
            ModelKind::Ctmc => write!(f, "CTMC"),
            ModelKind::Mdp => write!(f, "MDP"),
        }
    }
}

/// A sparse model: transition matrix, labeling and reward models.
///
/// For DTMCs and CTMCs the matrix has one row per state; for MDPs one row
/// group per state with one row per nondeterministic choice.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseModel<T> {
    kind: ModelKind,
    transitions: SparseMatrix<T>,
    labeling: StateLabeling,
    reward_models: BTreeMap<String, StandardRewardModel<T>>,
}

impl<T> SparseModel<T> {
    pub fn new(
        kind: ModelKind,
        transitions: SparseMatrix<T>,
        labeling: StateLabeling,
        reward_models: BTreeMap<String, StandardRewardModel<T>>,
    ) -> Self {
        Self {
            kind,
            transitions,
            labeling,
            reward_models,
        }
    }

    pub fn model_type(&self) -> ModelKind {
        self.kind
    }

    pub fn nr_states(&self) -> usize {
        self.transitions.row_group_count()
    }

    pub fn nr_transitions(&self) -> usize {
        self.transitions.entry_count()
    }

    /// Number of nondeterministic choices; equals `nr_states` for
    /// deterministic models.
    pub fn nr_choices(&self) -> usize {
        self.transitions.row_count()
    }

    pub fn transition_matrix(&self) -> &SparseMatrix<T> {
        &self.transitions
    }

    pub fn labeling(&self) -> &StateLabeling {
        &self.labeling
    }

    pub fn reward_models(&self) -> &BTreeMap<String, StandardRewardModel<T>> {
        &self.reward_models
    }

    pub fn reward_model(&self, name: &str) -> Option<&StandardRewardModel<T>> {
        self.reward_models.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SparseMatrixBuilder;

    #[test]
    fn test_counts_for_deterministic_model() {
        let mut builder = SparseMatrixBuilder::new();
        builder.add_next_value(0, 1, 1.0).unwrap();
        builder.add_next_value(1, 1, 1.0).unwrap();
        let model = SparseModel::new(
            ModelKind::Dtmc,
            builder.build(2),
            StateLabeling::new(2),
            BTreeMap::new(),
        );
        assert_eq!(model.nr_states(), 2);
        assert_eq!(model.nr_transitions(), 2);
        assert_eq!(model.nr_choices(), 2);
        assert_eq!(model.model_type().to_string(), "DTMC");
    }

    #[test]
    fn test_counts_for_mdp() {
        let mut builder = SparseMatrixBuilder::with_row_groups();
        builder.new_row_group(0).unwrap();
        builder.add_next_value(0, 0, 1.0).unwrap();
        builder.add_next_value(1, 1, 1.0).unwrap();
        builder.new_row_group(2).unwrap();
        builder.add_next_value(2, 1, 1.0).unwrap();
        let model = SparseModel::new(
            ModelKind::Mdp,
            builder.build(3),
            StateLabeling::new(2),
            BTreeMap::new(),
        );
        assert_eq!(model.nr_states(), 2);
        assert_eq!(model.nr_choices(), 3);
        assert_eq!(model.nr_transitions(), 3);
        assert!(model.model_type().is_nondeterministic());
    }
}
