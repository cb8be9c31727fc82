//! Probability distributions over state indices.

use std::collections::btree_map::{BTreeMap, Entry};
use std::fmt;
use std::ops::Add;

/// A distribution maps successor state indices to probability mass (or
/// rate). The support is kept ordered so a finished distribution can be
/// written straight into a CSR row.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<T> {
    support: BTreeMap<usize, T>,
}

impl<T> Distribution<T> {
    pub fn new() -> Self {
        Self {
            support: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.support.len()
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    /// Iterate over `(state, value)` pairs in state order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.support.iter().map(|(state, value)| (*state, value))
    }

    pub fn get(&self, state: usize) -> Option<&T> {
        self.support.get(&state)
    }
}

impl<T: Clone + Add<Output = T>> Distribution<T> {
    /// Assign `probability` to `state`, merging with mass already assigned
    /// to the same state.
    pub fn add_probability(&mut self, state: usize, probability: T) {
        match self.support.entry(state) {
            Entry::Vacant(entry) => {
                entry.insert(probability);
            }
            Entry::Occupied(mut entry) => {
                let merged = entry.get().clone() + probability;
                entry.insert(merged);
            }
        }
    }
}

impl<T> Default for Distribution<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Display> fmt::Display for Distribution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (state, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{state}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_on_same_state_merges() {
        let mut d = Distribution::new();
        d.add_probability(3, 0.25);
        d.add_probability(1, 0.5);
        d.add_probability(3, 0.25);
        assert_eq!(d.len(), 2);
        assert_eq!(d.get(3), Some(&0.5));
    }

    #[test]
    fn test_iteration_is_state_ordered() {
        let mut d = Distribution::new();
        d.add_probability(7, 0.1);
        d.add_probability(0, 0.2);
        d.add_probability(4, 0.7);
        let states: Vec<usize> = d.iter().map(|(s, _)| s).collect();
        assert_eq!(states, vec![0, 4, 7]);
    }
}
