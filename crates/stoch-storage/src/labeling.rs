//! State labelings.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabelingError {
    #[error("label \"{0}\" already exists")]
    DuplicateLabel(String),
    #[error("unknown label \"{0}\"")]
    UnknownLabel(String),
    #[error("state {state} out of bounds for labeling over {state_count} states")]
    StateOutOfBounds { state: usize, state_count: usize },
}

/// A fixed-size bit set over state indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&mut self, index: usize) {
        self.words[index / 64] |= 1 << (index % 64);
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / 64] & (1 << (index % 64)) != 0
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over set bits in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.contains(i))
    }
}

/// Maps label names to the set of states carrying them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLabeling {
    state_count: usize,
    labels: BTreeMap<String, BitSet>,
}

impl StateLabeling {
    pub fn new(state_count: usize) -> Self {
        Self {
            state_count,
            labels: BTreeMap::new(),
        }
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// Register a label with empty extent.
    pub fn add_label(&mut self, name: &str) -> Result<(), LabelingError> {
        if self.labels.contains_key(name) {
            return Err(LabelingError::DuplicateLabel(name.to_string()));
        }
        self.labels
            .insert(name.to_string(), BitSet::new(self.state_count));
        Ok(())
    }

    pub fn contains_label(&self, name: &str) -> bool {
        self.labels.contains_key(name)
    }

    pub fn add_label_to_state(&mut self, name: &str, state: usize) -> Result<(), LabelingError> {
        if state >= self.state_count {
            return Err(LabelingError::StateOutOfBounds {
                state,
                state_count: self.state_count,
            });
        }
        let bits = self
            .labels
            .get_mut(name)
            .ok_or_else(|| LabelingError::UnknownLabel(name.to_string()))?;
        bits.set(state);
        Ok(())
    }

    pub fn states_with_label(&self, name: &str) -> Result<&BitSet, LabelingError> {
        self.labels
            .get(name)
            .ok_or_else(|| LabelingError::UnknownLabel(name.to_string()))
    }

    /// Labels carried by `state`, in name order.
    pub fn labels_of_state(&self, state: usize) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, bits)| bits.contains(state))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All registered label names, in name order.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_extents() {
        let mut labeling = StateLabeling::new(100);
        labeling.add_label("one").unwrap();
        labeling.add_label_to_state("one", 7).unwrap();
        labeling.add_label_to_state("one", 64).unwrap();

        let bits = labeling.states_with_label("one").unwrap();
        assert_eq!(bits.count(), 2);
        assert!(bits.contains(64));
        assert!(!bits.contains(8));
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![7, 64]);
    }

    #[test]
    fn test_duplicate_and_unknown_labels() {
        let mut labeling = StateLabeling::new(4);
        labeling.add_label("goal").unwrap();
        assert_eq!(
            labeling.add_label("goal"),
            Err(LabelingError::DuplicateLabel("goal".to_string()))
        );
        assert_eq!(
            labeling.add_label_to_state("missing", 0),
            Err(LabelingError::UnknownLabel("missing".to_string()))
        );
    }

    #[test]
    fn test_state_bounds_checked() {
        let mut labeling = StateLabeling::new(4);
        labeling.add_label("goal").unwrap();
        assert_eq!(
            labeling.add_label_to_state("goal", 4),
            Err(LabelingError::StateOutOfBounds {
                state: 4,
                state_count: 4
            })
        );
    }

    #[test]
    fn test_labels_of_state() {
        let mut labeling = StateLabeling::new(2);
        labeling.add_label("b").unwrap();
        labeling.add_label("a").unwrap();
        labeling.add_label_to_state("b", 1).unwrap();
        labeling.add_label_to_state("a", 1).unwrap();
        assert_eq!(labeling.labels_of_state(1), vec!["a", "b"]);
        assert!(labeling.labels_of_state(0).is_empty());
    }
}
