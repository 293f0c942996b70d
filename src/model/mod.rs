//! Predictive models
//!
//! Linear models fitted by gradient descent, and the serialized artifact
//! format that carries a fitted model together with its feature schema.

pub mod artifact;
pub mod linear;

pub use artifact::{ModelArtifact, ModelKind};
pub use linear::{fit_logistic, fit_regression, FitOptions, LinearModel, Standardizer};
