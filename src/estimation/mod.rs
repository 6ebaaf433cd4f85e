//! Conditional-expectation estimators.
//!
//! An estimator maps a value observed at some later time to its expectation
//! conditional on the information available at the estimator's evaluation
//! time. The AD layer uses the same estimator twice: forward on the value and
//! backward on the adjoint of a `CONDITIONAL_EXPECTATION` node.

use std::fmt;

use crate::core::RandomVariableError;
use crate::stochastic::RandomVariable;

pub mod regression;

pub use regression::RegressionEstimator;

/// Projection operator supplied by the surrounding simulation.
pub trait ConditionalExpectationEstimator: Send + Sync + fmt::Debug {
    /// Conditional expectation of `value`.
    fn estimate(&self, value: &RandomVariable) -> Result<RandomVariable, RandomVariableError>;
}
