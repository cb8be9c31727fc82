//! Temporal-logic properties (PCTL/CSL) for PRISM programs.
//!
//! Properties are parsed against a specific program so that every variable,
//! constant, formula, label, and reward structure reference is resolved at
//! parse time. Parsed properties render back to canonical text; for input
//! that is already canonical the rendering reproduces it exactly.

pub mod ast;
pub mod parser;
pub mod resolve;

pub use ast::{Bound, CmpOp, OptimalityType, PathFormula, Property, RewardPath, StateFormula};
pub use parser::{parse_properties, parse_property, PropertyError};
