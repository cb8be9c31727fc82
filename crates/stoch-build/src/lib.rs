//! Explicit-state model construction.
//!
//! Turns a parsed PRISM program (plus the properties that will be checked
//! against it) into a [`stoch_storage::SparseModel`]. The builder explores
//! the reachable state space breadth-first; state indices are discovery
//! order, so matrix rows are emitted in order as exploration proceeds.
//!
//! Construction is generic over the value type: `f64` gives a concrete
//! model, [`stoch_storage::RationalFunction`] a parametric one in which
//! undefined `double` constants appear as parameters.

pub mod builder;
pub mod constants;
pub mod eval;
pub mod state;
pub mod value;

pub use builder::{build, BuildError, BuildOptions};
pub use constants::Constants;
pub use eval::{Env, EvalError, Value};
pub use value::ModelValue;
