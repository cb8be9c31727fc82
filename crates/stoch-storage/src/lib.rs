//! Sparse storage for explicit-state probabilistic models.
//!
//! A built model is a [`SparseModel`]: a compressed-sparse-row transition
//! matrix, a state labeling, and named reward models, all generic over the
//! value type. Concrete models use `f64`; parametric models use
//! [`RationalFunction`], a multivariate polynomial fraction with exact
//! rational coefficients.

pub mod distribution;
pub mod function;
pub mod labeling;
pub mod matrix;
pub mod model;
pub mod rewards;

pub use distribution::Distribution;
pub use function::RationalFunction;
pub use labeling::{BitSet, LabelingError, StateLabeling};
pub use matrix::{MatrixEntry, MatrixError, SparseMatrix, SparseMatrixBuilder};
pub use model::{ModelKind, SparseModel};
pub use rewards::StandardRewardModel;
