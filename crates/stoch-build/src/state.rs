//! State vectors and their layout.
//!
//! A state is a vector of `i64` values, one slot per declared variable:
//! globals first, then module variables in source order. Booleans are
//! stored as 0/1.

use ahash::AHashMap;

/// Metadata for one slot of the state vector.
#[derive(Debug, Clone)]
pub struct VarInfo {
    pub name: String,
    pub low: i64,
    pub high: i64,
    pub init: i64,
    pub is_bool: bool,
}

/// The state vector layout of a program.
#[derive(Debug, Default)]
pub struct VarLayout {
    vars: Vec<VarInfo>,
    index: AHashMap<String, usize>,
}

impl VarLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: VarInfo) {
        self.index.insert(info.name.clone(), self.vars.len());
        self.vars.push(info);
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn info(&self, slot: usize) -> &VarInfo {
        &self.vars[slot]
    }

    pub fn vars(&self) -> &[VarInfo] {
        &self.vars
    }

    /// The single initial state.
    pub fn initial_state(&self) -> Vec<i64> {
        self.vars.iter().map(|v| v.init).collect()
    }
}

/// Deduplicating state store; the index of a state is its discovery order.
#[derive(Debug, Default)]
pub struct StateSet {
    states: Vec<Vec<i64>>,
    index: AHashMap<Vec<i64>, usize>,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a state, returning its index and whether it was new.
    pub fn insert(&mut self, state: Vec<i64>) -> (usize, bool) {
        if let Some(&index) = self.index.get(&state) {
            return (index, false);
        }
        let index = self.states.len();
        self.index.insert(state.clone(), index);
        self.states.push(state);
        (index, true)
    }

    pub fn get(&self, index: usize) -> &[i64] {
        &self.states[index]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
