//! Flat front end over the parsing and model-building crates.
//!
//! The typical flow is three calls: [`parse_program`] reads and parses a
//! PRISM file, [`parse_formulas`] parses properties against the resulting
//! [`Program`], and [`build_model_from_prism_program`] (or the
//! single-formula [`build_model`]) explores the state space into a sparse
//! model reporting state count, transition count, model type and whether
//! it is parametric.

use std::path::Path;

use stoch_logic::PropertyError;
use thiserror::Error;

pub use stoch_build::{BuildError, BuildOptions};
pub use stoch_logic::Property as Formula;
pub use stoch_storage::{ModelKind, RationalFunction, SparseModel};
pub use stoch_syntax::{ModelType, ParseError, Program};

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// A built model, concrete (`f64`) or parametric ([`RationalFunction`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    Numeric(SparseModel<f64>),
    Parametric(SparseModel<RationalFunction>),
}

impl Model {
    pub fn nr_states(&self) -> usize {
        match self {
            Model::Numeric(m) => m.nr_states(),
            Model::Parametric(m) => m.nr_states(),
        }
    }

    pub fn nr_transitions(&self) -> usize {
        match self {
            Model::Numeric(m) => m.nr_transitions(),
            Model::Parametric(m) => m.nr_transitions(),
        }
    }

    pub fn model_type(&self) -> ModelKind {
        match self {
            Model::Numeric(m) => m.model_type(),
            Model::Parametric(m) => m.model_type(),
        }
    }

    /// Whether the model was built over the parametric value type. This
    /// reflects the construction engine, not whether parameters remain:
    /// models from [`build_model`] report `true` even for fully numeric
    /// programs.
    pub fn parametric(&self) -> bool {
        matches!(self, Model::Parametric(_))
    }

    /// Names of the labels the model carries, sorted.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Model::Numeric(m) => m.labeling().label_names().map(str::to_string).collect(),
            Model::Parametric(m) => m.labeling().label_names().map(str::to_string).collect(),
        }
    }
}

/// A model together with every label name it carries: the labels the
/// supplied formulas selected (or all program labels, with no formulas)
/// plus the builtin `init` and `deadlock`.
#[derive(Debug)]
pub struct BuildResult {
    pub model: Model,
    pub labels: Vec<String>,
}

/// Read and parse a PRISM program from a file.
pub fn parse_program(path: impl AsRef<Path>) -> Result<Program, Error> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(stoch_syntax::parse(&source)?)
}

/// Parse a `;`- or newline-separated list of properties against a program.
/// The result preserves input order; every identifier and label must
/// resolve against the program.
pub fn parse_formulas(text: &str, program: &Program) -> Result<Vec<Formula>, Error> {
    Ok(stoch_logic::parse_properties(text, program)?)
}

/// Build a concrete model. The formulas select which labels the model
/// carries; with an empty slice all program labels are kept.
pub fn build_model_from_prism_program(
    program: &Program,
    formulas: &[Formula],
) -> Result<BuildResult, Error> {
    let model = stoch_build::build::<f64>(program, formulas, &BuildOptions::default())?;
    let labels = model.labeling().label_names().map(str::to_string).collect();
    Ok(BuildResult {
        model: Model::Numeric(model),
        labels,
    })
}

/// Build a parametric model for a list of formulas. Undefined `double`
/// constants become parameters of the transition functions.
pub fn build_parametric_model_from_prism_program(
    program: &Program,
    formulas: &[Formula],
) -> Result<BuildResult, Error> {
    let model =
        stoch_build::build::<RationalFunction>(program, formulas, &BuildOptions::default())?;
    let labels = model.labeling().label_names().map(str::to_string).collect();
    Ok(BuildResult {
        model: Model::Parametric(model),
        labels,
    })
}

/// Single-formula convenience path. Always builds with the parametric
/// engine, so the resulting model reports [`Model::parametric`] even when
/// the program has no undefined constants.
pub fn build_model(program: &Program, formula: &Formula) -> Result<Model, Error> {
    let model = stoch_build::build::<RationalFunction>(
        program,
        std::slice::from_ref(formula),
        &BuildOptions::default(),
    )?;
    Ok(Model::Parametric(model))
}
